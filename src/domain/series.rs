//! Per-instrument price series and the unified date timeline.

use crate::domain::error::VixTriggerError;
use crate::domain::instrument::Instrument;
use crate::domain::ohlc::PriceBar;
use chrono::NaiveDate;
use std::collections::{BTreeMap, BTreeSet, HashMap};

/// Bars for one instrument, strictly increasing by date. Immutable once built.
#[derive(Debug, Clone)]
pub struct Series {
    instrument: Instrument,
    bars: Vec<PriceBar>,
    date_index: HashMap<NaiveDate, usize>,
}

impl Series {
    pub fn new(instrument: Instrument, bars: Vec<PriceBar>) -> Result<Self, VixTriggerError> {
        for pair in bars.windows(2) {
            if pair[1].date() <= pair[0].date() {
                return Err(VixTriggerError::UnorderedSeries {
                    date: pair[1].date(),
                });
            }
        }
        let date_index = bars
            .iter()
            .enumerate()
            .map(|(i, bar)| (bar.date(), i))
            .collect();
        Ok(Self {
            instrument,
            bars,
            date_index,
        })
    }

    pub fn instrument(&self) -> Instrument {
        self.instrument
    }

    pub fn bars(&self) -> &[PriceBar] {
        &self.bars
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    pub fn last(&self) -> Option<&PriceBar> {
        self.bars.last()
    }

    pub fn get(&self, date: NaiveDate) -> Option<&PriceBar> {
        self.date_index.get(&date).map(|&i| &self.bars[i])
    }

    pub fn index_of(&self, date: NaiveDate) -> Option<usize> {
        self.date_index.get(&date).copied()
    }

    /// Indices of the bars dated within `[start, end]`.
    pub fn index_range(&self, start: NaiveDate, end: NaiveDate) -> std::ops::Range<usize> {
        let from = self.bars.partition_point(|b| b.date() < start);
        let to = self.bars.partition_point(|b| b.date() <= end);
        from..to.max(from)
    }

    pub fn range(&self, start: NaiveDate, end: NaiveDate) -> &[PriceBar] {
        &self.bars[self.index_range(start, end)]
    }

    /// Closing prices keyed by ISO-8601 date, as consumed by the backtest.
    pub fn closes_by_date(&self) -> BTreeMap<String, f64> {
        self.bars
            .iter()
            .map(|b| (b.date().format("%Y-%m-%d").to_string(), b.close()))
            .collect()
    }
}

/// Sorted union of the dates of every series.
pub fn build_unified_timeline(series: &[&Series]) -> Vec<NaiveDate> {
    let unique_dates: BTreeSet<NaiveDate> = series
        .iter()
        .flat_map(|s| s.bars.iter().map(|bar| bar.date()))
        .collect();
    unique_dates.into_iter().collect()
}
