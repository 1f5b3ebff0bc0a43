//! Sequence predictor boundary.
//!
//! Any model that can `fit` on `(examples × steps × features, examples)` tensors and
//! `predict` scaled targets can drive the forecast pipeline.

use crate::domain::error::VixTriggerError;
use ndarray::{Array1, Array2, Array3, Axis};
use tracing::debug;

pub trait SequencePredictor {
    fn fit(&mut self, x: &Array3<f64>, y: &Array1<f64>) -> Result<(), VixTriggerError>;

    /// Predictions in the scaled target space.
    fn predict(&self, x: &Array3<f64>) -> Result<Array1<f64>, VixTriggerError>;

    /// Mean squared error of the predictions on `(x, y)`.
    fn evaluate(&self, x: &Array3<f64>, y: &Array1<f64>) -> Result<f64, VixTriggerError> {
        let y_hat = self.predict(x)?;
        mean_squared_error(y, &y_hat)
    }
}

pub fn mean_squared_error(y: &Array1<f64>, y_hat: &Array1<f64>) -> Result<f64, VixTriggerError> {
    if y.len() != y_hat.len() {
        return Err(VixTriggerError::Predictor {
            reason: format!("{} targets but {} predictions", y.len(), y_hat.len()),
        });
    }
    if y.is_empty() {
        return Ok(0.0);
    }
    let sum: f64 = y.iter().zip(y_hat).map(|(a, b)| (a - b).powi(2)).sum();
    Ok(sum / y.len() as f64)
}

/// Ridge regression over flattened lookback windows.
///
/// Solves `(XᵀX + αI) β = Xᵀy` on centred data, so the intercept is not penalised.
#[derive(Debug, Clone)]
pub struct RidgeWindowRegressor {
    alpha: f64,
    fitted: Option<RidgeFit>,
}

#[derive(Debug, Clone)]
struct RidgeFit {
    window_shape: (usize, usize),
    coefficients: Array1<f64>,
    intercept: f64,
}

impl Default for RidgeWindowRegressor {
    fn default() -> Self {
        Self::new(1.0)
    }
}

impl RidgeWindowRegressor {
    pub fn new(alpha: f64) -> Self {
        Self {
            alpha,
            fitted: None,
        }
    }

    pub fn is_fitted(&self) -> bool {
        self.fitted.is_some()
    }

    fn flatten(x: &Array3<f64>) -> Result<Array2<f64>, VixTriggerError> {
        let (n, steps, features) = x.dim();
        x.as_standard_layout()
            .into_owned()
            .into_shape_with_order((n, steps * features))
            .map_err(|e| VixTriggerError::Predictor {
                reason: e.to_string(),
            })
    }
}

impl SequencePredictor for RidgeWindowRegressor {
    fn fit(&mut self, x: &Array3<f64>, y: &Array1<f64>) -> Result<(), VixTriggerError> {
        if self.alpha.is_nan() || self.alpha < 0.0 {
            return Err(VixTriggerError::Predictor {
                reason: format!("invalid ridge alpha {}", self.alpha),
            });
        }
        let (n, steps, features) = x.dim();
        if n == 0 || n != y.len() {
            return Err(VixTriggerError::Predictor {
                reason: format!("{n} windows for {} targets", y.len()),
            });
        }

        let flat = Self::flatten(x)?;
        let x_mean = flat.mean_axis(Axis(0)).ok_or_else(|| VixTriggerError::Predictor {
            reason: "no training windows".into(),
        })?;
        let y_mean = y.sum() / n as f64;
        let centred = &flat - &x_mean;
        let y_centred = y - y_mean;

        let mut gram = centred.t().dot(&centred);
        for i in 0..gram.nrows() {
            // A tiny floor keeps the system positive definite when alpha is zero.
            gram[[i, i]] += self.alpha.max(1e-10);
        }
        let rhs = centred.t().dot(&y_centred);
        let coefficients = cholesky_solve(&gram, &rhs)?;
        let intercept = y_mean - x_mean.dot(&coefficients);

        debug!(windows = n, steps, features, alpha = self.alpha, "ridge fitted");
        self.fitted = Some(RidgeFit {
            window_shape: (steps, features),
            coefficients,
            intercept,
        });
        Ok(())
    }

    fn predict(&self, x: &Array3<f64>) -> Result<Array1<f64>, VixTriggerError> {
        let fit = self.fitted.as_ref().ok_or_else(|| VixTriggerError::Predictor {
            reason: "predict called before fit".into(),
        })?;
        let (_, steps, features) = x.dim();
        if (steps, features) != fit.window_shape {
            return Err(VixTriggerError::Predictor {
                reason: format!(
                    "window shape {:?} differs from training shape {:?}",
                    (steps, features),
                    fit.window_shape
                ),
            });
        }
        let flat = Self::flatten(x)?;
        Ok(flat.dot(&fit.coefficients) + fit.intercept)
    }
}

fn cholesky_solve(a: &Array2<f64>, b: &Array1<f64>) -> Result<Array1<f64>, VixTriggerError> {
    let n = a.nrows();
    let mut l = Array2::<f64>::zeros((n, n));

    for i in 0..n {
        for j in 0..=i {
            let mut sum = 0.0;
            for k in 0..j {
                sum += l[[i, k]] * l[[j, k]];
            }
            if i == j {
                let diag = a[[i, i]] - sum;
                if diag <= 0.0 {
                    return Err(VixTriggerError::Predictor {
                        reason: "normal equations are not positive definite".into(),
                    });
                }
                l[[i, j]] = diag.sqrt();
            } else {
                l[[i, j]] = (a[[i, j]] - sum) / l[[j, j]];
            }
        }
    }

    // L z = b
    let mut z = Array1::<f64>::zeros(n);
    for i in 0..n {
        let mut sum = 0.0;
        for j in 0..i {
            sum += l[[i, j]] * z[j];
        }
        z[i] = (b[i] - sum) / l[[i, i]];
    }

    // Lᵀ β = z
    let mut beta = Array1::<f64>::zeros(n);
    for i in (0..n).rev() {
        let mut sum = 0.0;
        for j in (i + 1)..n {
            sum += l[[j, i]] * beta[j];
        }
        beta[i] = (z[i] - sum) / l[[i, i]];
    }

    Ok(beta)
}
