//! Regression models used by the training and prediction jobs.

use crate::error::ModelError;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

mod forest;
mod tree;

pub use forest::RandomForestRegressor;
pub use tree::RegressionTree;

/// Common trait of all regressors
pub trait Regressor {
    /// Fit the model on a row major feature matrix
    fn fit(&mut self, x: &[Vec<f64>], y: &[f64]) -> Result<(), ModelError>;

    /// Predict a single sample
    fn predict_one(&self, sample: &[f64]) -> Result<f64, ModelError>;

    fn is_fitted(&self) -> bool;

    fn predict(&self, x: &[Vec<f64>]) -> Result<Vec<f64>, ModelError> {
        x.iter().map(|sample| self.predict_one(sample)).collect()
    }
}

/// Shuffled train/test split over `n` sample indices.
///
/// The test share is rounded up, both sides must keep at least one sample.
pub fn train_test_split(
    n: usize,
    test_size: f64,
    seed: u64,
) -> Result<(Vec<usize>, Vec<usize>), ModelError> {
    if n < 2 {
        return Err(ModelError::InsufficientSamples {
            required: 2,
            actual: n,
        });
    }
    let n_test = ((n as f64 * test_size).ceil() as usize).clamp(1, n - 1);

    let mut indices: Vec<usize> = (0..n).collect();
    indices.shuffle(&mut StdRng::seed_from_u64(seed));
    let train = indices.split_off(n_test);
    Ok((train, indices))
}

pub fn mean_squared_error(y_true: &[f64], y_pred: &[f64]) -> Result<f64, ModelError> {
    if y_true.len() != y_pred.len() {
        return Err(ModelError::LabelMismatch {
            rows: y_pred.len(),
            labels: y_true.len(),
        });
    }
    if y_true.is_empty() {
        return Err(ModelError::InsufficientSamples {
            required: 1,
            actual: 0,
        });
    }
    let sum: f64 = y_true
        .iter()
        .zip(y_pred)
        .map(|(t, p)| (t - p).powi(2))
        .sum();
    Ok(sum / y_true.len() as f64)
}

pub(crate) fn check_shape(x: &[Vec<f64>], y: &[f64]) -> Result<usize, ModelError> {
    if x.is_empty() {
        return Err(ModelError::InsufficientSamples {
            required: 1,
            actual: 0,
        });
    }
    if x.len() != y.len() {
        return Err(ModelError::LabelMismatch {
            rows: x.len(),
            labels: y.len(),
        });
    }
    let width = x[0].len();
    if let Some(row) = x.iter().find(|row| row.len() != width) {
        return Err(ModelError::Shape {
            expected: width,
            actual: row.len(),
        });
    }
    Ok(width)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_split_sizes() {
        let (train, test) = train_test_split(3, 0.2, 42).unwrap();
        assert_eq!(2, train.len());
        assert_eq!(1, test.len());

        let (train, test) = train_test_split(10, 0.2, 42).unwrap();
        assert_eq!(8, train.len());
        assert_eq!(2, test.len());

        let mut all: Vec<usize> = train.into_iter().chain(test).collect();
        all.sort();
        assert_eq!((0..10).collect::<Vec<_>>(), all);
    }

    #[test]
    fn test_split_is_deterministic() {
        assert_eq!(
            train_test_split(20, 0.2, 42).unwrap(),
            train_test_split(20, 0.2, 42).unwrap()
        );
    }

    #[test]
    fn test_split_needs_two_samples() {
        assert_eq!(
            Err(ModelError::InsufficientSamples {
                required: 2,
                actual: 1
            }),
            train_test_split(1, 0.2, 42)
        );
        assert!(train_test_split(0, 0.2, 42).is_err());
    }

    #[test]
    fn test_mean_squared_error() {
        assert_eq!(2.5, mean_squared_error(&[1.0, 2.0], &[2.0, 4.0]).unwrap());
        assert!(mean_squared_error(&[1.0], &[]).is_err());
    }
}
