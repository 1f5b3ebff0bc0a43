//! Price history port trait.

use crate::domain::error::VixTriggerError;
use crate::domain::instrument::Instrument;
use crate::domain::series::Series;
use chrono::NaiveDate;

pub trait SeriesPort {
    /// Daily bars for `instrument` dated within `[start_date, end_date]`.
    fn fetch_series(
        &self,
        instrument: Instrument,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<Series, VixTriggerError>;

    /// Instruments this source holds any history for.
    fn list_instruments(&self) -> Result<Vec<Instrument>, VixTriggerError>;
}
