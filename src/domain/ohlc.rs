//! Daily OHLC price bar.

use crate::domain::error::VixTriggerError;
use chrono::NaiveDate;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PriceBar {
    date: NaiveDate,
    open: f64,
    high: f64,
    low: f64,
    close: f64,
}

impl PriceBar {
    /// Build a bar, checking that every price is finite and non-negative and that
    /// `high`/`low` bound `open` and `close`.
    pub fn new(
        date: NaiveDate,
        open: f64,
        high: f64,
        low: f64,
        close: f64,
    ) -> Result<Self, VixTriggerError> {
        let invalid = |reason: String| VixTriggerError::InvalidBar { date, reason };

        for (name, value) in [("open", open), ("high", high), ("low", low), ("close", close)] {
            if !value.is_finite() {
                return Err(invalid(format!("{name} is not a finite number")));
            }
            if value < 0.0 {
                return Err(invalid(format!("{name} is negative ({value})")));
            }
        }
        if high < open.max(close).max(low) {
            return Err(invalid(format!(
                "high {high} below max(open, close, low)"
            )));
        }
        if low > open.min(close).min(high) {
            return Err(invalid(format!("low {low} above min(open, close, high)")));
        }

        Ok(Self {
            date,
            open,
            high,
            low,
            close,
        })
    }

    pub fn date(&self) -> NaiveDate {
        self.date
    }

    pub fn open(&self) -> f64 {
        self.open
    }

    pub fn high(&self) -> f64 {
        self.high
    }

    pub fn low(&self) -> f64 {
        self.low
    }

    pub fn close(&self) -> f64 {
        self.close
    }

    /// Values in the canonical column order `open, high, low, close`.
    pub fn values(&self) -> [f64; 4] {
        [self.open, self.high, self.low, self.close]
    }
}

/// Column names of a bar, in the order returned by [`PriceBar::values`].
pub const OHLC_COLUMNS: [&str; 4] = ["open", "high", "low", "close"];
