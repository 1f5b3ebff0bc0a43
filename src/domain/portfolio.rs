//! Single-slot portfolio for the FOMO backtest.
//!
//! Holds at most one open buy. A sell only closes it when dated strictly after the buy.

use chrono::NaiveDate;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct OpenPosition {
    pub date: NaiveDate,
    pub price: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Trade {
    pub buy_date: NaiveDate,
    pub buy_price: f64,
    pub sell_date: NaiveDate,
    pub sell_price: f64,
    pub profit: f64,
}

/// Result of offering a sell to the portfolio.
#[derive(Debug, Clone, PartialEq)]
pub enum SellOutcome {
    Closed(Trade),
    /// Nothing was open.
    Flat,
    /// The sell is not strictly after the open buy.
    Rejected { buy_date: NaiveDate },
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Portfolio {
    open: Option<OpenPosition>,
}

impl Portfolio {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_flat(&self) -> bool {
        self.open.is_none()
    }

    pub fn open_position(&self) -> Option<OpenPosition> {
        self.open
    }

    /// Record a buy. Returns false and leaves the slot untouched if a position is open.
    pub fn buy(&mut self, date: NaiveDate, price: f64) -> bool {
        if self.open.is_some() {
            return false;
        }
        self.open = Some(OpenPosition { date, price });
        true
    }

    pub fn sell(&mut self, date: NaiveDate, price: f64) -> SellOutcome {
        let Some(open) = self.open else {
            return SellOutcome::Flat;
        };
        if date <= open.date {
            return SellOutcome::Rejected {
                buy_date: open.date,
            };
        }
        self.open = None;
        SellOutcome::Closed(Trade {
            buy_date: open.date,
            buy_price: open.price,
            sell_date: date,
            sell_price: price,
            profit: price - open.price,
        })
    }
}
