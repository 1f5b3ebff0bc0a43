//! Sliding-window feature builder.
//!
//! Turns a multivariate daily frame into supervised tensors: window `i` covers rows
//! `[i - steps, i)` and its target is row `i` of the target column.

use crate::domain::error::VixTriggerError;
use crate::domain::ohlc::OHLC_COLUMNS;
use crate::domain::scaling::{MinMaxScaler, ScalingRange};
use crate::domain::series::{Series, build_unified_timeline};
use chrono::NaiveDate;
use ndarray::{Array1, Array2, Array3, Axis, s};
use std::ops::Range;
use tracing::info;

pub const DEFAULT_STEPS: usize = 15;

/// Rectangular table of daily features, one row per date.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureFrame {
    dates: Vec<NaiveDate>,
    columns: Vec<String>,
    values: Array2<f64>,
}

impl FeatureFrame {
    pub fn new(
        dates: Vec<NaiveDate>,
        columns: Vec<String>,
        values: Array2<f64>,
    ) -> Result<Self, VixTriggerError> {
        if values.nrows() != dates.len() || values.ncols() != columns.len() {
            return Err(VixTriggerError::ScalerMisuse {
                reason: format!(
                    "frame shape {:?} does not match {} dates × {} columns",
                    values.dim(),
                    dates.len(),
                    columns.len()
                ),
            });
        }
        Ok(Self {
            dates,
            columns,
            values,
        })
    }

    /// Join several series side by side on the union of their dates. Columns are named
    /// `NAME.open`, `NAME.high`, `NAME.low`, `NAME.close`; absent days are `NaN`.
    pub fn from_series(series: &[&Series]) -> Self {
        let dates = build_unified_timeline(series);
        let mut columns = Vec::with_capacity(series.len() * OHLC_COLUMNS.len());
        let mut values = Array2::from_elem((dates.len(), series.len() * OHLC_COLUMNS.len()), f64::NAN);

        for (k, s) in series.iter().enumerate() {
            for name in OHLC_COLUMNS {
                columns.push(format!("{}.{}", s.instrument().name(), name));
            }
            for (row, date) in dates.iter().enumerate() {
                if let Some(bar) = s.get(*date) {
                    let offset = k * OHLC_COLUMNS.len();
                    for (c, v) in bar.values().into_iter().enumerate() {
                        values[[row, offset + c]] = v;
                    }
                }
            }
        }

        Self {
            dates,
            columns,
            values,
        }
    }

    /// Replace every non-finite cell with `value`.
    pub fn fill_missing(mut self, value: f64) -> Self {
        self.values.mapv_inplace(|v| if v.is_finite() { v } else { value });
        self
    }

    pub fn dates(&self) -> &[NaiveDate] {
        &self.dates
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn values(&self) -> &Array2<f64> {
        &self.values
    }

    pub fn rows(&self) -> usize {
        self.values.nrows()
    }

    pub fn width(&self) -> usize {
        self.values.ncols()
    }

    /// Case-insensitive column lookup.
    pub fn column_index(&self, name: &str) -> Result<usize, VixTriggerError> {
        self.columns
            .iter()
            .position(|c| c.eq_ignore_ascii_case(name.trim()))
            .ok_or_else(|| VixTriggerError::UnknownColumn {
                name: name.to_string(),
            })
    }

    pub fn slice_rows(&self, rows: Range<usize>) -> Self {
        let end = rows.end.min(self.rows());
        let start = rows.start.min(end);
        Self {
            dates: self.dates[start..end].to_vec(),
            columns: self.columns.clone(),
            values: self.values.slice(s![start..end, ..]).to_owned(),
        }
    }

    /// Error on the first non-finite cell; the builder never repairs data itself.
    pub fn ensure_complete(&self) -> Result<(), VixTriggerError> {
        for ((row, col), v) in self.values.indexed_iter() {
            if !v.is_finite() {
                return Err(VixTriggerError::MissingValue {
                    row,
                    column: self.columns[col].clone(),
                });
            }
        }
        Ok(())
    }
}

/// Scalers fitted once on the training frame and carried unchanged to inference.
#[derive(Debug, Clone, PartialEq)]
pub struct FittedScalers {
    /// Fitted over every column of the frame.
    pub features: MinMaxScaler,
    /// Fitted over the target column alone, for inverse-transforming predictions.
    pub target: MinMaxScaler,
    pub target_column: usize,
}

#[derive(Debug, Clone)]
pub struct TrainingSet {
    /// `examples × steps × features`
    pub x: Array3<f64>,
    /// `examples`
    pub y: Array1<f64>,
    pub scalers: FittedScalers,
}

impl TrainingSet {
    pub fn examples(&self) -> usize {
        self.y.len()
    }
}

/// Number of windows a frame of `rows` rows yields.
pub fn window_count(rows: usize, steps: usize) -> usize {
    rows.saturating_sub(steps)
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FeatureBuilder {
    steps: usize,
    range: ScalingRange,
}

impl FeatureBuilder {
    pub fn new(steps: usize, range: ScalingRange) -> Result<Self, VixTriggerError> {
        if steps == 0 {
            return Err(VixTriggerError::ConfigInvalid {
                section: "features".into(),
                key: "sliding_window_steps".into(),
                reason: "steps must be at least 1".into(),
            });
        }
        Ok(Self { steps, range })
    }

    pub fn steps(&self) -> usize {
        self.steps
    }

    pub fn fit_scalers(
        &self,
        frame: &FeatureFrame,
        target_column: usize,
    ) -> Result<FittedScalers, VixTriggerError> {
        check_target(frame, target_column)?;
        frame.ensure_complete()?;
        let features = MinMaxScaler::fit(frame.values.view(), self.range)?;
        let target = MinMaxScaler::fit(
            frame.values.slice(s![.., target_column..=target_column]),
            self.range,
        )?;
        info!(
            rows = frame.rows(),
            columns = frame.width(),
            target = %frame.columns[target_column],
            "fitted scalers"
        );
        Ok(FittedScalers {
            features,
            target,
            target_column,
        })
    }

    /// Build `(X, y)` for training. Without `scalers`, fresh scalers are fitted on `frame`;
    /// with them, `frame` is only transformed.
    pub fn build_training_set(
        &self,
        frame: &FeatureFrame,
        target_column: usize,
        scalers: Option<&FittedScalers>,
    ) -> Result<TrainingSet, VixTriggerError> {
        check_target(frame, target_column)?;
        self.check_rows(frame)?;
        let scalers = match scalers {
            Some(s) if s.target_column != target_column => {
                return Err(VixTriggerError::ScalerMisuse {
                    reason: format!(
                        "scalers fitted for target column {}, requested {}",
                        s.target_column, target_column
                    ),
                });
            }
            Some(s) => s.clone(),
            None => self.fit_scalers(frame, target_column)?,
        };

        let scaled = self.scale(frame, &scalers)?;
        let x = self.windows(&scaled);
        let y: Array1<f64> = scaled
            .slice(s![self.steps.., target_column])
            .to_owned();

        Ok(TrainingSet { x, y, scalers })
    }

    /// Build `X` for prediction, transforming with the scalers fitted at training time.
    pub fn build_inference_set(
        &self,
        frame: &FeatureFrame,
        scalers: &FittedScalers,
    ) -> Result<Array3<f64>, VixTriggerError> {
        self.check_rows(frame)?;
        let scaled = self.scale(frame, scalers)?;
        Ok(self.windows(&scaled))
    }

    fn check_rows(&self, frame: &FeatureFrame) -> Result<(), VixTriggerError> {
        if window_count(frame.rows(), self.steps) == 0 {
            return Err(VixTriggerError::insufficient(
                format!("{}-step windows", self.steps),
                frame.rows(),
                self.steps + 1,
            ));
        }
        Ok(())
    }

    fn scale(
        &self,
        frame: &FeatureFrame,
        scalers: &FittedScalers,
    ) -> Result<Array2<f64>, VixTriggerError> {
        frame.ensure_complete()?;
        scalers.features.transform(frame.values.view())
    }

    fn windows(&self, scaled: &Array2<f64>) -> Array3<f64> {
        let rows = scaled.nrows();
        let mut x = Array3::zeros((window_count(rows, self.steps), self.steps, scaled.ncols()));
        for (k, mut window) in x.axis_iter_mut(Axis(0)).enumerate() {
            window.assign(&scaled.slice(s![k..k + self.steps, ..]));
        }
        x
    }
}

fn check_target(frame: &FeatureFrame, target_column: usize) -> Result<(), VixTriggerError> {
    if target_column >= frame.width() {
        return Err(VixTriggerError::UnknownColumn {
            name: format!("#{target_column}"),
        });
    }
    Ok(())
}
