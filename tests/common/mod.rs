#![allow(dead_code)]

use chrono::NaiveDate;
use std::collections::HashMap;
use vixtrigger::domain::error::VixTriggerError;
use vixtrigger::domain::instrument::Instrument;
pub use vixtrigger::domain::ohlc::PriceBar;
use vixtrigger::domain::series::Series;
use vixtrigger::ports::series_port::SeriesPort;

pub struct MockSeriesPort {
    pub data: HashMap<Instrument, Vec<PriceBar>>,
    pub errors: HashMap<Instrument, String>,
}

impl MockSeriesPort {
    pub fn new() -> Self {
        Self {
            data: HashMap::new(),
            errors: HashMap::new(),
        }
    }

    pub fn with_bars(mut self, instrument: Instrument, bars: Vec<PriceBar>) -> Self {
        self.data.insert(instrument, bars);
        self
    }

    pub fn with_error(mut self, instrument: Instrument, reason: &str) -> Self {
        self.errors.insert(instrument, reason.to_string());
        self
    }
}

impl SeriesPort for MockSeriesPort {
    fn fetch_series(
        &self,
        instrument: Instrument,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<Series, VixTriggerError> {
        if let Some(reason) = self.errors.get(&instrument) {
            return Err(VixTriggerError::DataSource {
                reason: reason.clone(),
            });
        }
        let bars = self
            .data
            .get(&instrument)
            .map(|bars| {
                bars.iter()
                    .filter(|b| b.date() >= start_date && b.date() <= end_date)
                    .copied()
                    .collect()
            })
            .unwrap_or_default();
        Series::new(instrument, bars)
    }

    fn list_instruments(&self) -> Result<Vec<Instrument>, VixTriggerError> {
        let mut held: Vec<Instrument> = self.data.keys().copied().collect();
        held.sort();
        Ok(held)
    }
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

pub fn parse_date(s: &str) -> NaiveDate {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
}

pub fn make_bar(date: &str, open: f64, high: f64, low: f64, close: f64) -> PriceBar {
    PriceBar::new(parse_date(date), open, high, low, close).unwrap()
}

/// Bar with a two-point range around `close`.
pub fn close_bar(day: NaiveDate, close: f64) -> PriceBar {
    PriceBar::new(day, close, close + 1.0, close - 1.0, close).unwrap()
}

/// `n` consecutive calendar days of bars with highs at 25 and lows at 20.
pub fn quiet_bars(start: NaiveDate, n: u64) -> Vec<PriceBar> {
    (0..n)
        .map(|i| {
            PriceBar::new(start + chrono::Days::new(i), 22.0, 25.0, 20.0, 23.0).unwrap()
        })
        .collect()
}

/// Closes following `f(i)` for `n` consecutive days.
pub fn curve_bars(start: NaiveDate, n: u64, f: impl Fn(u64) -> f64) -> Vec<PriceBar> {
    (0..n)
        .map(|i| close_bar(start + chrono::Days::new(i), f(i)))
        .collect()
}
