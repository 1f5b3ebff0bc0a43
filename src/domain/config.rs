//! Typed pipeline configuration built from a [`ConfigPort`].
//!
//! Every key has a default except `[backtest] start_date` and `end_date`.

use crate::domain::error::VixTriggerError;
use crate::domain::extremum::{DEFAULT_LOOKBACK_DAYS, SignalEngine};
use crate::domain::features::{DEFAULT_STEPS, FeatureBuilder};
use crate::domain::forecast::DEFAULT_TRAIN_RATIO;
use crate::domain::instrument::{Instrument, parse_instruments};
use crate::domain::ohlc::OHLC_COLUMNS;
use crate::domain::scaling::ScalingRange;
use crate::ports::config_port::ConfigPort;
use chrono::NaiveDate;
use std::path::PathBuf;

pub const DEFAULT_TARGET_COLUMN: &str = "VIX.close";
pub const DEFAULT_RIDGE_ALPHA: f64 = 1.0;

#[derive(Debug, Clone, PartialEq)]
pub struct SignalSettings {
    pub instrument: Instrument,
    pub lookback: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FeatureSettings {
    pub steps: usize,
    pub range: ScalingRange,
    pub target_column: String,
    pub inputs: Vec<Instrument>,
    pub train_ratio: f64,
    pub ridge_alpha: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BacktestSettings {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub target_instrument: Instrument,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PipelineConfig {
    pub data_directory: Option<PathBuf>,
    pub signal: SignalSettings,
    pub features: FeatureSettings,
    pub backtest: BacktestSettings,
}

impl PipelineConfig {
    pub fn signal_engine(&self) -> Result<SignalEngine, VixTriggerError> {
        SignalEngine::new(self.signal.lookback)
    }

    pub fn feature_builder(&self) -> Result<FeatureBuilder, VixTriggerError> {
        FeatureBuilder::new(self.features.steps, self.features.range)
    }

    /// Data directory, required by every command that reads prices.
    pub fn require_data_directory(&self) -> Result<&PathBuf, VixTriggerError> {
        self.data_directory
            .as_ref()
            .ok_or_else(|| VixTriggerError::ConfigMissing {
                section: "data".into(),
                key: "directory".into(),
            })
    }
}

pub fn build_pipeline_config(config: &dyn ConfigPort) -> Result<PipelineConfig, VixTriggerError> {
    let data_directory = config
        .get_string("data", "directory")
        .filter(|s| !s.trim().is_empty())
        .map(PathBuf::from);

    Ok(PipelineConfig {
        data_directory,
        signal: build_signal_settings(config)?,
        features: build_feature_settings(config)?,
        backtest: build_backtest_settings(config)?,
    })
}

/// Build the full configuration and check the data directory is set.
pub fn validate_config(config: &dyn ConfigPort) -> Result<PipelineConfig, VixTriggerError> {
    let pipeline = build_pipeline_config(config)?;
    pipeline.require_data_directory()?;
    Ok(pipeline)
}

fn invalid(section: &str, key: &str, reason: impl Into<String>) -> VixTriggerError {
    VixTriggerError::ConfigInvalid {
        section: section.into(),
        key: key.into(),
        reason: reason.into(),
    }
}

fn positive_count(
    config: &dyn ConfigPort,
    section: &str,
    key: &str,
    default: usize,
) -> Result<usize, VixTriggerError> {
    let value = config.get_int(section, key, default as i64);
    if value < 1 {
        return Err(invalid(section, key, format!("{key} must be at least 1")));
    }
    usize::try_from(value).map_err(|e| invalid(section, key, e.to_string()))
}

fn instrument_or(
    config: &dyn ConfigPort,
    section: &str,
    key: &str,
    default: Instrument,
) -> Result<Instrument, VixTriggerError> {
    match config.get_string(section, key) {
        None => Ok(default),
        Some(s) => s
            .parse()
            .map_err(|_| invalid(section, key, format!("unknown instrument '{}'", s.trim()))),
    }
}

fn build_signal_settings(config: &dyn ConfigPort) -> Result<SignalSettings, VixTriggerError> {
    Ok(SignalSettings {
        instrument: instrument_or(config, "signal", "instrument", Instrument::Vix)?,
        lookback: positive_count(config, "signal", "lookback_window_days", DEFAULT_LOOKBACK_DAYS)?,
    })
}

fn build_feature_settings(config: &dyn ConfigPort) -> Result<FeatureSettings, VixTriggerError> {
    let steps = positive_count(config, "features", "sliding_window_steps", DEFAULT_STEPS)?;

    let low = config.get_double("features", "scaling_low", 0.0);
    let high = config.get_double("features", "scaling_high", 1.0);
    let range = ScalingRange::new(low, high)
        .map_err(|_| invalid("features", "scaling_high", "scaling_low must be below scaling_high"))?;

    let inputs = match config.get_string("features", "inputs") {
        Some(list) => parse_instruments(&list)?,
        None => vec![Instrument::Vix],
    };
    let target_column = config
        .get_string("features", "target_column")
        .unwrap_or_else(|| DEFAULT_TARGET_COLUMN.to_string());
    check_target_column(&target_column, &inputs)?;

    let train_ratio = config.get_double("features", "train_ratio", DEFAULT_TRAIN_RATIO);
    if !(train_ratio > 0.0 && train_ratio < 1.0) {
        return Err(invalid(
            "features",
            "train_ratio",
            "train_ratio must be between 0 and 1 (exclusive)",
        ));
    }

    let ridge_alpha = config.get_double("features", "ridge_alpha", DEFAULT_RIDGE_ALPHA);
    if ridge_alpha.is_nan() || ridge_alpha < 0.0 {
        return Err(invalid("features", "ridge_alpha", "ridge_alpha must be non-negative"));
    }

    Ok(FeatureSettings {
        steps,
        range,
        target_column,
        inputs,
        train_ratio,
        ridge_alpha,
    })
}

/// The target must name one of the joined `NAME.field` columns of the inputs.
pub fn check_target_column(target: &str, inputs: &[Instrument]) -> Result<(), VixTriggerError> {
    let resolvable = target.split_once('.').is_some_and(|(name, field)| {
        let field = field.to_ascii_lowercase();
        OHLC_COLUMNS.contains(&field.as_str())
            && inputs.iter().any(|i| i.name().eq_ignore_ascii_case(name))
    });
    if !resolvable {
        return Err(invalid(
            "features",
            "target_column",
            format!("'{target}' is not a column of the configured inputs"),
        ));
    }
    Ok(())
}

fn build_backtest_settings(config: &dyn ConfigPort) -> Result<BacktestSettings, VixTriggerError> {
    let start_date = parse_date(config.get_string("backtest", "start_date").as_deref(), "start_date")?;
    let end_date = parse_date(config.get_string("backtest", "end_date").as_deref(), "end_date")?;
    if start_date >= end_date {
        return Err(invalid(
            "backtest",
            "start_date",
            "start_date must be before end_date",
        ));
    }

    Ok(BacktestSettings {
        start_date,
        end_date,
        target_instrument: instrument_or(config, "backtest", "target_instrument", Instrument::Tsla)?,
    })
}

fn parse_date(value: Option<&str>, field: &str) -> Result<NaiveDate, VixTriggerError> {
    match value {
        None => Err(VixTriggerError::ConfigMissing {
            section: "backtest".to_string(),
            key: field.to_string(),
        }),
        Some(s) => NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d").map_err(|_| {
            invalid(
                "backtest",
                field,
                format!("invalid {field} format, expected YYYY-MM-DD"),
            )
        }),
    }
}
