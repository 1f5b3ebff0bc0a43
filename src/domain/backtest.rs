//! FOMO backtest: replays Buy/Sell dates against a target instrument's closes.
//!
//! The stream is sorted by date before scanning, so delivery order does not matter.
//! Each Buy opens the single slot when it is empty; the first later Sell closes it.

use crate::domain::error::VixTriggerError;
use crate::domain::extremum::SignalEngine;
use crate::domain::instrument::Instrument;
use crate::domain::portfolio::{OpenPosition, Portfolio, SellOutcome, Trade};
use crate::domain::series_store::SeriesStore;
use crate::domain::signal::Signal;
use chrono::NaiveDate;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use tracing::{debug, info, warn};

const ISO_DATE: &str = "%Y-%m-%d";

/// Trigger dates keyed by ISO-8601 date. Only Buy and Sell are stored.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct BuySellRecord {
    entries: BTreeMap<String, Signal>,
}

impl BuySellRecord {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `signal` for `date`. `Signal::None` is ignored; a later entry for the same
    /// date overwrites the earlier one.
    pub fn insert(&mut self, date: NaiveDate, signal: Signal) {
        if signal.is_trade() {
            self.entries.insert(date.format(ISO_DATE).to_string(), signal);
        }
    }

    pub fn get(&self, date: &str) -> Option<Signal> {
        self.entries.get(date).copied()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries in chronological order.
    pub fn to_stream(&self) -> Vec<(NaiveDate, Signal)> {
        self.entries
            .iter()
            .filter_map(|(key, &signal)| {
                NaiveDate::parse_from_str(key, ISO_DATE)
                    .ok()
                    .map(|date| (date, signal))
            })
            .collect()
    }
}

impl FromIterator<(NaiveDate, Signal)> for BuySellRecord {
    fn from_iter<I: IntoIterator<Item = (NaiveDate, Signal)>>(iter: I) -> Self {
        let mut record = BuySellRecord::new();
        for (date, signal) in iter {
            record.insert(date, signal);
        }
        record
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Outcome {
    Made,
    BrokeEven,
    Lost,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TradeSummary {
    pub trades: usize,
    pub wins: usize,
    pub losses: usize,
    pub win_rate: f64,
    pub largest_win: f64,
    pub largest_loss: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BacktestReport {
    pub trades: Vec<Trade>,
    /// Trigger dates with no close price for the target.
    pub gaps: Vec<NaiveDate>,
    /// Sells dated on or before the open buy.
    pub rejected_sells: Vec<NaiveDate>,
    /// Buy still waiting for a sell at the end of the stream.
    pub open_position: Option<OpenPosition>,
}

impl BacktestReport {
    pub fn profits(&self) -> Vec<f64> {
        self.trades.iter().map(|t| t.profit).collect()
    }

    pub fn total_profit(&self) -> f64 {
        self.trades.iter().map(|t| t.profit).sum()
    }

    pub fn summary(&self) -> TradeSummary {
        let wins = self.trades.iter().filter(|t| t.profit > 0.0).count();
        let losses = self.trades.iter().filter(|t| t.profit < 0.0).count();
        let largest_win = self.trades.iter().map(|t| t.profit).fold(0.0, f64::max);
        let largest_loss = self
            .trades
            .iter()
            .map(|t| t.profit)
            .fold(0.0, f64::min)
            .abs();
        let win_rate = if self.trades.is_empty() {
            0.0
        } else {
            wins as f64 / self.trades.len() as f64
        };
        TradeSummary {
            trades: self.trades.len(),
            wins,
            losses,
            win_rate,
            largest_win,
            largest_loss,
        }
    }

    pub fn outcome(&self) -> Outcome {
        let total = self.total_profit();
        if total > 0.0 {
            Outcome::Made
        } else if total == 0.0 {
            Outcome::BrokeEven
        } else {
            Outcome::Lost
        }
    }
}

impl fmt::Display for BacktestReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let total = self.total_profit();
        match self.outcome() {
            Outcome::Made => write!(f, "Following the trigger would have made {total:.2}"),
            Outcome::BrokeEven => write!(f, "Following the trigger would have broken even"),
            Outcome::Lost => write!(f, "Following the trigger would have lost {:.2}", total.abs()),
        }
    }
}

/// Pair Buy/Sell dates against `closes` (ISO date → close).
pub fn evaluate(stream: &[(NaiveDate, Signal)], closes: &BTreeMap<String, f64>) -> BacktestReport {
    let mut ordered = stream.to_vec();
    ordered.sort_by_key(|&(date, _)| date);

    let mut portfolio = Portfolio::new();
    let mut report = BacktestReport::default();
    let close_on = |date: NaiveDate| closes.get(&date.format(ISO_DATE).to_string()).copied();

    for (date, signal) in ordered {
        match signal {
            Signal::Buy => {
                if !portfolio.is_flat() {
                    debug!(%date, "buy ignored, position already open");
                    continue;
                }
                let Some(price) = close_on(date) else {
                    warn!(%date, "no close price for buy date");
                    report.gaps.push(date);
                    continue;
                };
                portfolio.buy(date, price);
            }
            Signal::Sell => {
                if portfolio.is_flat() {
                    debug!(%date, "sell ignored, no open position");
                    continue;
                }
                let Some(price) = close_on(date) else {
                    warn!(%date, "no close price for sell date");
                    report.gaps.push(date);
                    continue;
                };
                match portfolio.sell(date, price) {
                    SellOutcome::Closed(trade) => {
                        debug!(buy = %trade.buy_date, sell = %trade.sell_date, profit = trade.profit, "trade closed");
                        report.trades.push(trade);
                    }
                    SellOutcome::Rejected { buy_date } => {
                        warn!(%date, %buy_date, "sell not after buy, rejected");
                        report.rejected_sells.push(date);
                    }
                    SellOutcome::Flat => {}
                }
            }
            Signal::None => {}
        }
    }

    report.open_position = portfolio.open_position();
    report
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FomoRun {
    pub signal_instrument: Instrument,
    pub target_instrument: Instrument,
    pub signals: BuySellRecord,
    /// Days in range without a full lookback window.
    pub skipped_days: usize,
    pub report: BacktestReport,
}

/// Replay the signal engine over `signal_instrument` for `[start, end]` and evaluate the
/// triggers against `target_instrument` closes.
pub fn run_fomo(
    store: &SeriesStore,
    signal_instrument: Instrument,
    target_instrument: Instrument,
    engine: &SignalEngine,
    start: NaiveDate,
    end: NaiveDate,
) -> Result<FomoRun, VixTriggerError> {
    let signal_series = store.require(signal_instrument)?;
    let target_series = store.require(target_instrument)?;

    let stream = engine.signal_stream(signal_series, start, end);
    if !stream.skipped.is_empty() {
        warn!(
            instrument = %signal_instrument,
            days = stream.skipped.len(),
            lookback = engine.lookback(),
            "days skipped for short history"
        );
    }
    let signals: BuySellRecord = stream.entries.iter().copied().collect();
    let report = evaluate(&signals.to_stream(), &target_series.closes_by_date());
    info!(
        signals = signals.len(),
        trades = report.trades.len(),
        total_profit = report.total_profit(),
        "fomo backtest finished"
    );

    Ok(FomoRun {
        signal_instrument,
        target_instrument,
        signals,
        skipped_days: stream.skipped.len(),
        report,
    })
}
