//! Domain error types.

use chrono::NaiveDate;

/// Top-level error type for vixtrigger.
#[derive(Debug, thiserror::Error)]
pub enum VixTriggerError {
    #[error("config parse error in {file}: {reason}")]
    ConfigParse { file: String, reason: String },

    #[error("missing config key [{section}] {key}")]
    ConfigMissing { section: String, key: String },

    #[error("invalid config value [{section}] {key}: {reason}")]
    ConfigInvalid {
        section: String,
        key: String,
        reason: String,
    },

    #[error("data source error: {reason}")]
    DataSource { reason: String },

    #[error("no data for {instrument}")]
    NoData { instrument: String },

    #[error("insufficient data for {context}: have {have} rows, need {need}")]
    InsufficientData {
        context: String,
        have: usize,
        need: usize,
    },

    #[error("invalid bar on {date}: {reason}")]
    InvalidBar { date: NaiveDate, reason: String },

    #[error("series is not strictly increasing at {date}")]
    UnorderedSeries { date: NaiveDate },

    #[error("missing value at row {row}, column {column}")]
    MissingValue { row: usize, column: String },

    #[error("scaler misuse: {reason}")]
    ScalerMisuse { reason: String },

    #[error("unknown column: {name}")]
    UnknownColumn { name: String },

    #[error("unknown instrument: {name}")]
    UnknownInstrument { name: String },

    #[error("predictor error: {reason}")]
    Predictor { reason: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl VixTriggerError {
    pub(crate) fn insufficient(context: impl Into<String>, have: usize, need: usize) -> Self {
        VixTriggerError::InsufficientData {
            context: context.into(),
            have,
            need,
        }
    }
}

impl From<&VixTriggerError> for std::process::ExitCode {
    fn from(err: &VixTriggerError) -> Self {
        let code: u8 = match err {
            VixTriggerError::Io(_) => 1,
            VixTriggerError::ConfigParse { .. }
            | VixTriggerError::ConfigMissing { .. }
            | VixTriggerError::ConfigInvalid { .. }
            | VixTriggerError::UnknownInstrument { .. }
            | VixTriggerError::UnknownColumn { .. } => 2,
            VixTriggerError::DataSource { .. } | VixTriggerError::NoData { .. } => 3,
            VixTriggerError::InsufficientData { .. }
            | VixTriggerError::InvalidBar { .. }
            | VixTriggerError::UnorderedSeries { .. }
            | VixTriggerError::MissingValue { .. } => 5,
            VixTriggerError::ScalerMisuse { .. } | VixTriggerError::Predictor { .. } => 6,
        };
        std::process::ExitCode::from(code)
    }
}
