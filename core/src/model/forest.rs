use super::tree::RegressionTree;
use super::{check_shape, Regressor};
use crate::error::ModelError;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Bagged ensemble of regression trees.
///
/// Every tree is fitted on a bootstrap sample drawn from a seeded RNG, so a
/// fit is reproducible for the same data and seed. Predictions average all
/// trees.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RandomForestRegressor {
    n_estimators: usize,
    seed: u64,
    max_depth: Option<usize>,
    feature_names: Vec<String>,
    trees: Vec<RegressionTree>,
}

impl RandomForestRegressor {
    pub fn new(n_estimators: usize, seed: u64) -> Self {
        RandomForestRegressor {
            n_estimators: n_estimators.max(1),
            seed,
            max_depth: None,
            feature_names: Vec::new(),
            trees: Vec::new(),
        }
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = Some(max_depth);
        self
    }

    /// Names the input columns, in the order `fit` and `predict` expect them.
    pub fn with_feature_names<S: Into<String>>(mut self, names: Vec<S>) -> Self {
        self.feature_names = names.into_iter().map(Into::into).collect();
        self
    }

    pub fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    pub fn n_estimators(&self) -> usize {
        self.n_estimators
    }
}

impl Regressor for RandomForestRegressor {
    fn fit(&mut self, x: &[Vec<f64>], y: &[f64]) -> Result<(), ModelError> {
        let width = check_shape(x, y)?;
        if !self.feature_names.is_empty() && self.feature_names.len() != width {
            return Err(ModelError::Shape {
                expected: self.feature_names.len(),
                actual: width,
            });
        }

        let mut rng = StdRng::seed_from_u64(self.seed);
        let n = x.len();
        let mut trees = Vec::with_capacity(self.n_estimators);
        for _ in 0..self.n_estimators {
            let sample: Vec<usize> = (0..n).map(|_| rng.gen_range(0..n)).collect();
            let mut tree = RegressionTree::new(self.max_depth, 2);
            tree.fit_indices(x, y, &sample)?;
            trees.push(tree);
        }
        debug!(trees = trees.len(), samples = n, "Fitted random forest");
        self.trees = trees;
        Ok(())
    }

    fn predict_one(&self, sample: &[f64]) -> Result<f64, ModelError> {
        if self.trees.is_empty() {
            return Err(ModelError::NotFitted);
        }
        let mut sum = 0.0;
        for tree in self.trees.iter() {
            sum += tree.predict_one(sample)?;
        }
        Ok(sum / self.trees.len() as f64)
    }

    fn is_fitted(&self) -> bool {
        !self.trees.is_empty()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::model::{mean_squared_error, train_test_split};

    fn linear_data(n: usize) -> (Vec<Vec<f64>>, Vec<f64>) {
        let x: Vec<Vec<f64>> = (0..n).map(|i| vec![i as f64, (i % 3) as f64]).collect();
        let y: Vec<f64> = x.iter().map(|row| 2.0 * row[0] + 1.0).collect();
        (x, y)
    }

    #[test]
    fn test_forest_fits_and_predicts() {
        // prepare
        let (x, y) = linear_data(50);
        let mut forest = RandomForestRegressor::new(20, 42);

        // execute
        forest.fit(&x, &y).unwrap();
        let predictions = forest.predict(&x).unwrap();

        // validate
        assert!(forest.is_fitted());
        assert!(mean_squared_error(&y, &predictions).unwrap() < 25.0);
    }

    #[test]
    fn test_forest_is_reproducible() {
        let (x, y) = linear_data(30);
        let mut a = RandomForestRegressor::new(10, 42);
        let mut b = RandomForestRegressor::new(10, 42);
        a.fit(&x, &y).unwrap();
        b.fit(&x, &y).unwrap();

        let sample = vec![12.5, 1.0];
        assert_eq!(a.predict_one(&sample).unwrap(), b.predict_one(&sample).unwrap());
    }

    #[test]
    fn test_forest_roundtrips_through_json() {
        let (x, y) = linear_data(10);
        let mut forest = RandomForestRegressor::new(5, 7).with_feature_names(vec!["a", "b"]);
        forest.fit(&x, &y).unwrap();

        let json = serde_json::to_string(&forest).unwrap();
        let restored: RandomForestRegressor = serde_json::from_str(&json).unwrap();

        assert_eq!(forest.feature_names(), restored.feature_names());
        assert_eq!(
            forest.predict_one(&[3.0, 0.0]).unwrap(),
            restored.predict_one(&[3.0, 0.0]).unwrap()
        );
    }

    #[test]
    fn test_forest_rejects_bad_input() {
        let mut forest = RandomForestRegressor::new(5, 42).with_feature_names(vec!["a"]);
        assert!(forest.fit(&[vec![1.0, 2.0]], &[1.0]).is_err());
        assert_eq!(Err(ModelError::NotFitted), forest.predict_one(&[1.0]));
        assert!(RandomForestRegressor::new(5, 42).fit(&[], &[]).is_err());
    }

    #[test]
    fn test_two_samples_fit_after_split() {
        let (x, y) = linear_data(3);
        let (train, _) = train_test_split(x.len(), 0.2, 42).unwrap();
        let x_train: Vec<Vec<f64>> = train.iter().map(|&i| x[i].clone()).collect();
        let y_train: Vec<f64> = train.iter().map(|&i| y[i]).collect();

        let mut forest = RandomForestRegressor::new(100, 42);
        forest.fit(&x_train, &y_train).unwrap();
        assert!(forest.predict_one(&[1.0, 1.0]).is_ok());
    }
}
