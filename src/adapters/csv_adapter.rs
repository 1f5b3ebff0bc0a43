//! CSV price history adapter.
//!
//! Reads one `<NAME>.csv` per instrument (e.g. `VIX.csv`, `Crude_Oil.csv`) with a header
//! row naming `datetime` (or `date`), `open`, `high`, `low` and `close` in any case and
//! order. Other columns are ignored.

use crate::domain::error::VixTriggerError;
use crate::domain::instrument::Instrument;
use crate::domain::ohlc::PriceBar;
use crate::domain::series::Series;
use crate::ports::series_port::SeriesPort;
use chrono::NaiveDate;
use std::fs;
use std::path::PathBuf;
use tracing::debug;

pub struct CsvSeriesAdapter {
    base_path: PathBuf,
}

struct ColumnMap {
    date: usize,
    ohlc: [usize; 4],
}

impl ColumnMap {
    fn from_headers(headers: &csv::StringRecord, file: &str) -> Result<Self, VixTriggerError> {
        let find = |names: &[&str]| {
            headers
                .iter()
                .position(|h| names.iter().any(|n| h.trim().eq_ignore_ascii_case(n)))
        };
        let missing = |column: &str| VixTriggerError::DataSource {
            reason: format!("{file}: missing '{column}' column"),
        };

        let date = find(&["datetime", "date"]).ok_or_else(|| missing("datetime"))?;
        let mut ohlc = [0; 4];
        for (slot, name) in ohlc.iter_mut().zip(["open", "high", "low", "close"]) {
            *slot = find(&[name]).ok_or_else(|| missing(name))?;
        }
        Ok(Self { date, ohlc })
    }
}

impl CsvSeriesAdapter {
    pub fn new(base_path: PathBuf) -> Self {
        Self { base_path }
    }

    fn csv_path(&self, instrument: Instrument) -> PathBuf {
        self.base_path.join(format!("{}.csv", instrument.name()))
    }
}

/// Accepts plain dates and timestamps that start with one (`2021-01-04 00:00:00-05:00`).
fn parse_date(value: &str) -> Option<NaiveDate> {
    let value = value.trim();
    let date_part = value.get(..10).unwrap_or(value);
    NaiveDate::parse_from_str(date_part, "%Y-%m-%d").ok()
}

impl SeriesPort for CsvSeriesAdapter {
    fn fetch_series(
        &self,
        instrument: Instrument,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<Series, VixTriggerError> {
        let path = self.csv_path(instrument);
        let file = path.display().to_string();
        let content = fs::read_to_string(&path).map_err(|e| VixTriggerError::DataSource {
            reason: format!("failed to read {file}: {e}"),
        })?;

        let mut rdr = csv::ReaderBuilder::new()
            .flexible(true)
            .from_reader(content.as_bytes());
        let headers = rdr.headers().map_err(|e| VixTriggerError::DataSource {
            reason: format!("{file}: CSV header error: {e}"),
        })?;
        let columns = ColumnMap::from_headers(headers, &file)?;

        let mut bars = Vec::new();
        for (line, result) in rdr.records().enumerate() {
            let record = result.map_err(|e| VixTriggerError::DataSource {
                reason: format!("{file}: CSV parse error: {e}"),
            })?;
            let row = line + 2;

            let raw_date = record.get(columns.date).unwrap_or_default();
            let date = parse_date(raw_date).ok_or_else(|| VixTriggerError::DataSource {
                reason: format!("{file} row {row}: invalid date '{raw_date}'"),
            })?;
            if date < start_date || date > end_date {
                continue;
            }

            let cells = columns.ohlc.map(|i| record.get(i).unwrap_or_default().trim());
            if cells.iter().any(|c| c.is_empty()) {
                debug!(%instrument, %date, "skipping row with empty price cells");
                continue;
            }
            let mut values = [0.0; 4];
            for (value, cell) in values.iter_mut().zip(cells) {
                *value = cell.parse().map_err(|_| VixTriggerError::DataSource {
                    reason: format!("{file} row {row}: invalid price '{cell}'"),
                })?;
            }
            let [open, high, low, close] = values;
            bars.push(PriceBar::new(date, open, high, low, close)?);
        }

        bars.sort_by_key(|b| b.date());
        Series::new(instrument, bars)
    }

    fn list_instruments(&self) -> Result<Vec<Instrument>, VixTriggerError> {
        let entries = fs::read_dir(&self.base_path).map_err(|e| VixTriggerError::DataSource {
            reason: format!(
                "failed to read directory {}: {}",
                self.base_path.display(),
                e
            ),
        })?;

        let mut instruments = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| VixTriggerError::DataSource {
                reason: format!("directory entry error: {e}"),
            })?;
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("csv") {
                continue;
            }
            if let Some(instrument) = path
                .file_stem()
                .and_then(|s| s.to_str())
                .and_then(|s| s.parse::<Instrument>().ok())
            {
                instruments.push(instrument);
            }
        }

        instruments.sort();
        instruments.dedup();
        Ok(instruments)
    }
}
