//! In-memory store of fetched series, one per instrument.
//!
//! Loading is per instrument: a failed or short fetch is recorded and skipped, and the
//! remaining instruments still load.

use crate::domain::error::VixTriggerError;
use crate::domain::instrument::Instrument;
use crate::domain::series::Series;
use crate::ports::series_port::SeriesPort;
use chrono::NaiveDate;
use std::collections::HashMap;
use std::fmt;
use tracing::{info, warn};

#[derive(Debug, Clone, PartialEq)]
pub enum SkipReason {
    Fetch(String),
    NoData,
    InsufficientBars { bars: usize, minimum: usize },
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::Fetch(reason) => write!(f, "fetch failed: {reason}"),
            SkipReason::NoData => f.write_str("no data found"),
            SkipReason::InsufficientBars { bars, minimum } => {
                write!(f, "only {bars} bars, minimum {minimum} required")
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SkippedInstrument {
    pub instrument: Instrument,
    pub reason: SkipReason,
}

impl SkippedInstrument {
    /// The error a caller that cannot do without this instrument should report.
    pub fn to_error(&self) -> VixTriggerError {
        match &self.reason {
            SkipReason::Fetch(reason) => VixTriggerError::DataSource {
                reason: format!("{}: {reason}", self.instrument),
            },
            SkipReason::NoData => VixTriggerError::NoData {
                instrument: self.instrument.to_string(),
            },
            SkipReason::InsufficientBars { bars, minimum } => VixTriggerError::insufficient(
                format!("{} history", self.instrument),
                *bars,
                *minimum,
            ),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct SeriesStore {
    series: HashMap<Instrument, Series>,
}

impl SeriesStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `series`, replacing whatever was held for its instrument.
    pub fn insert(&mut self, series: Series) -> Option<Series> {
        self.series.insert(series.instrument(), series)
    }

    pub fn get(&self, instrument: Instrument) -> Option<&Series> {
        self.series.get(&instrument)
    }

    /// Like [`SeriesStore::get`], but a missing instrument is an error.
    pub fn require(&self, instrument: Instrument) -> Result<&Series, VixTriggerError> {
        self.get(instrument).ok_or_else(|| VixTriggerError::NoData {
            instrument: instrument.to_string(),
        })
    }

    pub fn contains(&self, instrument: Instrument) -> bool {
        self.series.contains_key(&instrument)
    }

    pub fn len(&self) -> usize {
        self.series.len()
    }

    pub fn is_empty(&self) -> bool {
        self.series.is_empty()
    }

    /// Held instruments in registry order.
    pub fn instruments(&self) -> Vec<Instrument> {
        let mut held: Vec<Instrument> = self.series.keys().copied().collect();
        held.sort();
        held
    }

    /// Fetch every instrument from `port`, keeping those with at least `minimum_bars` bars.
    /// Returns the instruments that were skipped.
    pub fn load(
        &mut self,
        port: &dyn SeriesPort,
        instruments: &[Instrument],
        start_date: NaiveDate,
        end_date: NaiveDate,
        minimum_bars: usize,
    ) -> Vec<SkippedInstrument> {
        let mut skipped = Vec::new();

        for &instrument in instruments {
            let reason = match port.fetch_series(instrument, start_date, end_date) {
                Err(e) => SkipReason::Fetch(e.to_string()),
                Ok(series) if series.is_empty() => SkipReason::NoData,
                Ok(series) if series.len() < minimum_bars => SkipReason::InsufficientBars {
                    bars: series.len(),
                    minimum: minimum_bars,
                },
                Ok(series) => {
                    info!(%instrument, bars = series.len(), "series loaded");
                    self.insert(series);
                    continue;
                }
            };
            warn!(%instrument, %reason, "skipping instrument");
            skipped.push(SkippedInstrument { instrument, reason });
        }

        skipped
    }
}
