//! Train/forecast pipeline over a joined feature frame.

use crate::domain::error::VixTriggerError;
use crate::domain::features::{FeatureBuilder, FeatureFrame};
use crate::domain::predictor::SequencePredictor;
use chrono::NaiveDate;
use serde::Serialize;
use tracing::info;

pub const DEFAULT_TRAIN_RATIO: f64 = 0.7;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ForecastPoint {
    pub date: NaiveDate,
    pub actual: f64,
    pub predicted: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Forecast {
    pub target: String,
    pub train_rows: usize,
    /// MSE on the training windows, in scaled units.
    pub train_mse: f64,
    pub points: Vec<ForecastPoint>,
}

impl Forecast {
    /// Mean absolute error over the test period, in price units.
    pub fn mean_absolute_error(&self) -> f64 {
        if self.points.is_empty() {
            return 0.0;
        }
        let total: f64 = self.points.iter().map(|p| (p.actual - p.predicted).abs()).sum();
        total / self.points.len() as f64
    }
}

/// Index of the first test row for a chronological split.
pub fn split_index(rows: usize, train_ratio: f64) -> Result<usize, VixTriggerError> {
    if !(train_ratio > 0.0 && train_ratio < 1.0) {
        return Err(VixTriggerError::ConfigInvalid {
            section: "features".into(),
            key: "train_ratio".into(),
            reason: format!("expected 0 < ratio < 1, got {train_ratio}"),
        });
    }
    Ok((rows as f64 * train_ratio) as usize)
}

/// Fit scalers and the predictor on the first `train_ratio` of the rows, then forecast
/// every remaining row from the `steps` rows before it. Inference reuses the training
/// scalers; nothing is refitted on the test period.
pub fn run_forecast(
    frame: &FeatureFrame,
    target_column: usize,
    builder: &FeatureBuilder,
    train_ratio: f64,
    predictor: &mut dyn SequencePredictor,
) -> Result<Forecast, VixTriggerError> {
    let rows = frame.rows();
    let steps = builder.steps();
    let train_end = split_index(rows, train_ratio)?;
    if train_end <= steps || train_end >= rows {
        return Err(VixTriggerError::insufficient(
            format!("forecast with {steps} steps and train ratio {train_ratio}"),
            rows,
            ((steps + 1) as f64 / train_ratio).ceil() as usize + 1,
        ));
    }

    let train = frame.slice_rows(0..train_end);
    let set = builder.build_training_set(&train, target_column, None)?;
    predictor.fit(&set.x, &set.y)?;
    let train_mse = predictor.evaluate(&set.x, &set.y)?;
    info!(examples = set.examples(), train_mse, "predictor trained");

    let inputs = frame.slice_rows(train_end - steps..rows);
    let x_test = builder.build_inference_set(&inputs, &set.scalers)?;
    let scaled = predictor.predict(&x_test)?;

    let target = frame.values().column(target_column);
    let mut points = Vec::with_capacity(rows - train_end);
    for (k, &y_hat) in scaled.iter().enumerate() {
        let row = train_end + k;
        points.push(ForecastPoint {
            date: frame.dates()[row],
            actual: target[row],
            predicted: set.scalers.target.inverse_value(y_hat)?,
        });
    }

    Ok(Forecast {
        target: frame.columns()[target_column].clone(),
        train_rows: train_end,
        train_mse,
        points,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::predictor::RidgeWindowRegressor;
    use crate::domain::scaling::ScalingRange;
    use approx::assert_abs_diff_eq;
    use ndarray::{Array1, Array2, Array3};

    fn ramp_frame(rows: usize) -> FeatureFrame {
        let start = NaiveDate::from_ymd_opt(2022, 1, 1).unwrap();
        FeatureFrame::new(
            (0..rows).map(|i| start + chrono::Days::new(i as u64)).collect(),
            vec!["VIX.close".into()],
            Array2::from_shape_fn((rows, 1), |(i, _)| 20.0 + i as f64),
        )
        .unwrap()
    }

    /// Predicts the last value of each window.
    struct Persistence;

    impl SequencePredictor for Persistence {
        fn fit(&mut self, _x: &Array3<f64>, _y: &Array1<f64>) -> Result<(), VixTriggerError> {
            Ok(())
        }

        fn predict(&self, x: &Array3<f64>) -> Result<Array1<f64>, VixTriggerError> {
            let steps = x.dim().1;
            Ok(Array1::from_shape_fn(x.dim().0, |i| x[[i, steps - 1, 0]]))
        }
    }

    #[test]
    fn split_index_validates_ratio() {
        assert_eq!(split_index(100, 0.75).unwrap(), 75);
        assert!(split_index(100, 0.0).is_err());
        assert!(split_index(100, 1.0).is_err());
        assert!(split_index(100, f64::NAN).is_err());
    }

    #[test]
    fn forecast_covers_test_period() {
        let frame = ramp_frame(40);
        let builder = FeatureBuilder::new(5, ScalingRange::default()).unwrap();
        let forecast = run_forecast(&frame, 0, &builder, 0.75, &mut Persistence).unwrap();

        assert_eq!(forecast.train_rows, 30);
        assert_eq!(forecast.points.len(), 10);
        assert_eq!(forecast.points[0].date, frame.dates()[30]);
        assert_eq!(forecast.target, "VIX.close");
        // Persistence lags the ramp by exactly one unit; the training scaler must be reused
        // for the inverse to land back in price units.
        for p in &forecast.points {
            assert_abs_diff_eq!(p.actual - p.predicted, 1.0, epsilon = 1e-9);
        }
        assert_abs_diff_eq!(forecast.mean_absolute_error(), 1.0, epsilon = 1e-9);
    }

    #[test]
    fn ridge_forecast_extrapolates_ramp() {
        let frame = ramp_frame(60);
        let builder = FeatureBuilder::new(4, ScalingRange::default()).unwrap();
        let mut model = RidgeWindowRegressor::new(1e-8);
        let forecast = run_forecast(&frame, 0, &builder, 0.7, &mut model).unwrap();

        assert!(forecast.train_mse < 1e-8);
        assert!(forecast.mean_absolute_error() < 1e-2);
    }

    #[test]
    fn too_few_rows_is_insufficient() {
        let frame = ramp_frame(8);
        let builder = FeatureBuilder::new(5, ScalingRange::default()).unwrap();
        let err = run_forecast(&frame, 0, &builder, 0.7, &mut Persistence).unwrap_err();
        assert!(matches!(err, VixTriggerError::InsufficientData { have: 8, .. }));
    }
}
