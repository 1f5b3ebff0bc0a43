//! Per-column min-max scaling.
//!
//! A [`MinMaxScaler`] only exists in fitted form: [`MinMaxScaler::fit`] freezes the
//! column minima and maxima, and every later [`MinMaxScaler::transform`] reuses them.

use crate::domain::error::VixTriggerError;
use ndarray::{Array2, ArrayView2, Axis};

/// Target range of the scaled values, `(low, high)`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScalingRange {
    pub low: f64,
    pub high: f64,
}

impl Default for ScalingRange {
    fn default() -> Self {
        Self { low: 0.0, high: 1.0 }
    }
}

impl ScalingRange {
    pub fn new(low: f64, high: f64) -> Result<Self, VixTriggerError> {
        if !(low.is_finite() && high.is_finite()) || low >= high {
            return Err(VixTriggerError::ConfigInvalid {
                section: "features".into(),
                key: "scaling_range".into(),
                reason: format!("expected finite low < high, got ({low}, {high})"),
            });
        }
        Ok(Self { low, high })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MinMaxScaler {
    range: ScalingRange,
    mins: Vec<f64>,
    scales: Vec<f64>,
}

impl MinMaxScaler {
    /// Fit on `data` (rows × columns). Constant columns map to `range.low`.
    pub fn fit(data: ArrayView2<'_, f64>, range: ScalingRange) -> Result<Self, VixTriggerError> {
        if data.nrows() == 0 || data.ncols() == 0 {
            return Err(VixTriggerError::insufficient(
                "scaler fit",
                data.nrows(),
                1,
            ));
        }
        let span = range.high - range.low;
        let mut mins = Vec::with_capacity(data.ncols());
        let mut scales = Vec::with_capacity(data.ncols());

        for (j, column) in data.axis_iter(Axis(1)).enumerate() {
            let mut min = f64::INFINITY;
            let mut max = f64::NEG_INFINITY;
            for (i, &v) in column.iter().enumerate() {
                if !v.is_finite() {
                    return Err(VixTriggerError::MissingValue {
                        row: i,
                        column: j.to_string(),
                    });
                }
                min = min.min(v);
                max = max.max(v);
            }
            let data_range = if max - min == 0.0 { 1.0 } else { max - min };
            mins.push(min);
            scales.push(span / data_range);
        }

        Ok(Self {
            range,
            mins,
            scales,
        })
    }

    /// Fit on a single column of values.
    pub fn fit_values(values: &[f64], range: ScalingRange) -> Result<Self, VixTriggerError> {
        let column = ArrayView2::from_shape((values.len(), 1), values).map_err(|e| {
            VixTriggerError::ScalerMisuse {
                reason: e.to_string(),
            }
        })?;
        Self::fit(column, range)
    }

    pub fn width(&self) -> usize {
        self.mins.len()
    }

    pub fn range(&self) -> ScalingRange {
        self.range
    }

    fn check_width(&self, width: usize) -> Result<(), VixTriggerError> {
        if width != self.width() {
            return Err(VixTriggerError::ScalerMisuse {
                reason: format!(
                    "scaler fitted on {} columns, data has {}",
                    self.width(),
                    width
                ),
            });
        }
        Ok(())
    }

    pub fn transform(&self, data: ArrayView2<'_, f64>) -> Result<Array2<f64>, VixTriggerError> {
        self.check_width(data.ncols())?;
        let mut out = data.to_owned();
        for (j, mut column) in out.axis_iter_mut(Axis(1)).enumerate() {
            let (min, scale) = (self.mins[j], self.scales[j]);
            column.mapv_inplace(|v| (v - min) * scale + self.range.low);
        }
        Ok(out)
    }

    pub fn inverse_transform(&self, data: ArrayView2<'_, f64>) -> Result<Array2<f64>, VixTriggerError> {
        self.check_width(data.ncols())?;
        let mut out = data.to_owned();
        for (j, mut column) in out.axis_iter_mut(Axis(1)).enumerate() {
            let (min, scale) = (self.mins[j], self.scales[j]);
            column.mapv_inplace(|v| (v - self.range.low) / scale + min);
        }
        Ok(out)
    }

    /// Scale one value with a single-column scaler.
    pub fn transform_value(&self, value: f64) -> Result<f64, VixTriggerError> {
        self.check_width(1)?;
        Ok((value - self.mins[0]) * self.scales[0] + self.range.low)
    }

    /// Map one scaled value back to original units with a single-column scaler.
    pub fn inverse_value(&self, value: f64) -> Result<f64, VixTriggerError> {
        self.check_width(1)?;
        Ok((value - self.range.low) / self.scales[0] + self.mins[0])
    }
}
