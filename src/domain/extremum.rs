//! Extremum breakout engine.
//!
//! Compares the bar under evaluation against the `lookback` bars strictly before it:
//! - SELL: current above the open while making a new `lookback`-day low
//! - BUY: current below the open while making a new `lookback`-day high

use crate::domain::error::VixTriggerError;
use crate::domain::ohlc::PriceBar;
use crate::domain::series::Series;
use crate::domain::signal::{Signal, is_above_open, is_below_open, is_new_high, is_new_low};
use chrono::NaiveDate;
use serde::Serialize;
use tracing::debug;

pub const DEFAULT_LOOKBACK_DAYS: usize = 14;

/// Price action for the day being evaluated.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Quote {
    pub open: f64,
    /// Candidate for the new-high comparison.
    pub high: f64,
    /// Candidate for the new-low comparison.
    pub low: f64,
    pub current: f64,
}

impl Quote {
    /// Historic replay of a completed day: the close stands in for the current price.
    pub fn from_bar(bar: &PriceBar) -> Self {
        Self {
            open: bar.open(),
            high: bar.high(),
            low: bar.low(),
            current: bar.close(),
        }
    }

    /// Intraday evaluation against a live price.
    pub fn live(open: f64, price: f64) -> Self {
        Self {
            open,
            high: price,
            low: price,
            current: price,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Evaluation {
    pub signal: Signal,
    pub new_high: bool,
    pub new_low: bool,
    pub above_open: bool,
    pub below_open: bool,
}

/// Signals for a date range, in chronological order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SignalStream {
    /// Buy/Sell entries only; `None` days are dropped.
    pub entries: Vec<(NaiveDate, Signal)>,
    /// Days inside the range that lacked a full lookback window.
    pub skipped: Vec<NaiveDate>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SignalEngine {
    lookback: usize,
}

impl Default for SignalEngine {
    fn default() -> Self {
        Self {
            lookback: DEFAULT_LOOKBACK_DAYS,
        }
    }
}

impl SignalEngine {
    pub fn new(lookback: usize) -> Result<Self, VixTriggerError> {
        if lookback == 0 {
            return Err(VixTriggerError::ConfigInvalid {
                section: "signal".into(),
                key: "lookback_window_days".into(),
                reason: "lookback must be at least 1".into(),
            });
        }
        Ok(Self { lookback })
    }

    pub fn lookback(&self) -> usize {
        self.lookback
    }

    /// Evaluate `quote` against the last `lookback` bars of `window`. The window must not
    /// contain the bar being evaluated.
    pub fn evaluate(
        &self,
        window: &[PriceBar],
        quote: &Quote,
    ) -> Result<Evaluation, VixTriggerError> {
        if window.len() < self.lookback {
            return Err(VixTriggerError::insufficient(
                "signal lookback window",
                window.len(),
                self.lookback,
            ));
        }
        let window = &window[window.len() - self.lookback..];
        let highs: Vec<f64> = window.iter().map(PriceBar::high).collect();
        let lows: Vec<f64> = window.iter().map(PriceBar::low).collect();

        let new_high = is_new_high(quote.high, &highs);
        let new_low = is_new_low(quote.low, &lows);
        let above_open = is_above_open(quote.current, quote.open);
        let below_open = is_below_open(quote.current, quote.open);

        let sell = above_open && new_low;
        let buy = below_open && new_high;
        let signal = match (buy, sell) {
            (true, false) => Signal::Buy,
            (false, true) => Signal::Sell,
            _ => Signal::None,
        };

        Ok(Evaluation {
            signal,
            new_high,
            new_low,
            above_open,
            below_open,
        })
    }

    /// Evaluate the bar at `index` against `bars[index - lookback .. index]`.
    pub fn evaluate_at(&self, series: &Series, index: usize) -> Result<Evaluation, VixTriggerError> {
        let bars = series.bars();
        let Some(bar) = bars.get(index) else {
            return Err(VixTriggerError::insufficient(
                format!("{} bar index {index}", series.instrument()),
                bars.len(),
                index + 1,
            ));
        };
        if index < self.lookback {
            return Err(VixTriggerError::insufficient(
                format!("{} history before {}", series.instrument(), bar.date()),
                index,
                self.lookback,
            ));
        }
        self.evaluate(&bars[index - self.lookback..index], &Quote::from_bar(bar))
    }

    /// Evaluate a live price against the latest bar's open, using the `lookback` bars
    /// before it as the reference window.
    pub fn evaluate_live(&self, series: &Series, price: f64) -> Result<Evaluation, VixTriggerError> {
        let bars = series.bars();
        let need = self.lookback + 1;
        if bars.len() < need {
            return Err(VixTriggerError::insufficient(
                format!("{} live evaluation", series.instrument()),
                bars.len(),
                need,
            ));
        }
        let today = bars.len() - 1;
        let quote = Quote::live(bars[today].open(), price);
        self.evaluate(&bars[today - self.lookback..today], &quote)
    }

    /// Replay every bar dated within `[start, end]`.
    pub fn signal_stream(&self, series: &Series, start: NaiveDate, end: NaiveDate) -> SignalStream {
        let mut stream = SignalStream::default();
        for index in series.index_range(start, end) {
            let date = series.bars()[index].date();
            match self.evaluate_at(series, index) {
                Ok(eval) if eval.signal.is_trade() => {
                    debug!(instrument = %series.instrument(), %date, signal = %eval.signal, "signal fired");
                    stream.entries.push((date, eval.signal));
                }
                Ok(_) => {}
                Err(_) => stream.skipped.push(date),
            }
        }
        stream
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::instrument::Instrument;

    fn bar(day: u32, open: f64, high: f64, low: f64, close: f64) -> PriceBar {
        PriceBar::new(
            NaiveDate::from_ymd_opt(2021, 1, day).unwrap(),
            open,
            high,
            low,
            close,
        )
        .unwrap()
    }

    /// Bars with highs at 25 and lows at 20.
    fn range_bound_window(n: u32) -> Vec<PriceBar> {
        (1..=n).map(|d| bar(d, 22.0, 25.0, 20.0, 23.0)).collect()
    }

    #[test]
    fn new_lookback_rejects_zero() {
        assert!(SignalEngine::new(0).is_err());
        assert_eq!(SignalEngine::default().lookback(), DEFAULT_LOOKBACK_DAYS);
    }

    #[test]
    fn buy_on_new_high_closing_below_open() {
        let engine = SignalEngine::new(3).unwrap();
        let window = range_bound_window(3);
        let quote = Quote::from_bar(&bar(4, 27.0, 28.0, 24.0, 26.0));
        let eval = engine.evaluate(&window, &quote).unwrap();
        assert_eq!(eval.signal, Signal::Buy);
        assert!(eval.new_high);
        assert!(eval.below_open);
    }

    #[test]
    fn sell_on_new_low_closing_above_open() {
        let engine = SignalEngine::new(3).unwrap();
        let window = range_bound_window(3);
        let quote = Quote::from_bar(&bar(4, 19.5, 21.0, 19.0, 20.5));
        let eval = engine.evaluate(&window, &quote).unwrap();
        assert_eq!(eval.signal, Signal::Sell);
        assert!(eval.new_low);
        assert!(eval.above_open);
    }

    #[test]
    fn no_signal_when_high_ties_window() {
        let engine = SignalEngine::new(3).unwrap();
        let window = range_bound_window(3);
        let quote = Quote::from_bar(&bar(4, 24.0, 25.0, 22.0, 23.0));
        assert_eq!(engine.evaluate(&window, &quote).unwrap().signal, Signal::None);
    }

    #[test]
    fn outside_day_never_fires_both() {
        // New high and new low on the same bar: only the open comparison decides.
        let engine = SignalEngine::new(3).unwrap();
        let window = range_bound_window(3);

        let closes_up = Quote::from_bar(&bar(4, 22.0, 30.0, 10.0, 23.0));
        let eval = engine.evaluate(&window, &closes_up).unwrap();
        assert!(eval.new_high && eval.new_low);
        assert_eq!(eval.signal, Signal::Sell);

        let flat = Quote::from_bar(&bar(4, 22.0, 30.0, 10.0, 22.0));
        assert_eq!(engine.evaluate(&window, &flat).unwrap().signal, Signal::None);
    }

    #[test]
    fn short_window_is_insufficient() {
        let engine = SignalEngine::new(14).unwrap();
        let window = range_bound_window(13);
        let quote = Quote::live(22.0, 30.0);
        let err = engine.evaluate(&window, &quote).unwrap_err();
        assert!(matches!(err, VixTriggerError::InsufficientData { have: 13, need: 14, .. }));
    }

    #[test]
    fn only_last_lookback_bars_are_used() {
        let engine = SignalEngine::new(2).unwrap();
        // An old spike outside the lookback must not block the breakout.
        let mut window = vec![bar(1, 40.0, 50.0, 39.0, 45.0)];
        window.extend((2..=3).map(|d| bar(d, 22.0, 25.0, 20.0, 23.0)));
        let quote = Quote::from_bar(&bar(4, 27.0, 28.0, 24.0, 26.0));
        assert_eq!(engine.evaluate(&window, &quote).unwrap().signal, Signal::Buy);
    }

    #[test]
    fn evaluate_at_excludes_current_bar() {
        let engine = SignalEngine::new(3).unwrap();
        let mut bars = range_bound_window(3);
        bars.push(bar(4, 27.0, 28.0, 24.0, 26.0));
        let series = Series::new(Instrument::Vix, bars).unwrap();

        // If bar 4 leaked into its own window its high could never be a new high.
        let eval = engine.evaluate_at(&series, 3).unwrap();
        assert_eq!(eval.signal, Signal::Buy);
    }

    #[test]
    fn evaluate_at_without_history_is_insufficient() {
        let engine = SignalEngine::new(3).unwrap();
        let series = Series::new(Instrument::Vix, range_bound_window(5)).unwrap();
        assert!(engine.evaluate_at(&series, 2).is_err());
        assert!(engine.evaluate_at(&series, 3).is_ok());
        assert!(engine.evaluate_at(&series, 5).is_err());
    }

    #[test]
    fn evaluate_live_uses_latest_open() {
        let engine = SignalEngine::new(3).unwrap();
        let mut bars = range_bound_window(3);
        bars.push(bar(4, 24.0, 24.0, 24.0, 24.0));
        let series = Series::new(Instrument::Vix, bars).unwrap();

        let eval = engine.evaluate_live(&series, 19.5).unwrap();
        assert!(eval.new_low);
        assert!(eval.below_open);
        assert_eq!(eval.signal, Signal::None);

        let series_short = Series::new(Instrument::Vix, range_bound_window(3)).unwrap();
        assert!(engine.evaluate_live(&series_short, 19.5).is_err());
    }

    #[test]
    fn signal_stream_records_trades_and_skips() {
        let engine = SignalEngine::new(3).unwrap();
        let mut bars = range_bound_window(3);
        bars.push(bar(4, 27.0, 28.0, 24.0, 26.0));
        bars.push(bar(5, 24.0, 26.0, 22.0, 25.0));
        let series = Series::new(Instrument::Vix, bars).unwrap();

        let start = NaiveDate::from_ymd_opt(2021, 1, 2).unwrap();
        let end = NaiveDate::from_ymd_opt(2021, 1, 31).unwrap();
        let stream = engine.signal_stream(&series, start, end);

        assert_eq!(
            stream.entries,
            vec![(NaiveDate::from_ymd_opt(2021, 1, 4).unwrap(), Signal::Buy)]
        );
        assert_eq!(stream.skipped.len(), 2);
    }
}
