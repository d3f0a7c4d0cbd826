use super::{check_shape, Regressor};
use crate::error::ModelError;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Node {
    Leaf {
        value: f64,
    },
    Split {
        feature: usize,
        threshold: f64,
        left: Box<Node>,
        right: Box<Node>,
    },
}

impl Node {
    fn eval(&self, sample: &[f64]) -> f64 {
        match self {
            Node::Leaf { value } => *value,
            Node::Split {
                feature,
                threshold,
                left,
                right,
            } => {
                if sample[*feature] <= *threshold {
                    left.eval(sample)
                } else {
                    right.eval(sample)
                }
            }
        }
    }
}

/// CART regression tree, splits minimize the summed squared error.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegressionTree {
    max_depth: Option<usize>,
    min_samples_split: usize,
    n_features: usize,
    root: Option<Node>,
}

impl Default for RegressionTree {
    fn default() -> Self {
        RegressionTree::new(None, 2)
    }
}

struct BestSplit {
    feature: usize,
    threshold: f64,
    sse: f64,
}

impl RegressionTree {
    pub fn new(max_depth: Option<usize>, min_samples_split: usize) -> Self {
        RegressionTree {
            max_depth,
            min_samples_split: min_samples_split.max(2),
            n_features: 0,
            root: None,
        }
    }

    /// Fits on the given subset of rows, indices may repeat.
    pub(crate) fn fit_indices(
        &mut self,
        x: &[Vec<f64>],
        y: &[f64],
        indices: &[usize],
    ) -> Result<(), ModelError> {
        self.n_features = check_shape(x, y)?;
        if indices.is_empty() {
            return Err(ModelError::InsufficientSamples {
                required: 1,
                actual: 0,
            });
        }
        self.root = Some(self.build(x, y, indices.to_vec(), 0));
        Ok(())
    }

    fn build(&self, x: &[Vec<f64>], y: &[f64], indices: Vec<usize>, depth: usize) -> Node {
        let n = indices.len() as f64;
        let mean = indices.iter().map(|&i| y[i]).sum::<f64>() / n;
        let pure = indices.iter().all(|&i| y[i] == y[indices[0]]);
        let too_deep = self.max_depth.map_or(false, |max| depth >= max);
        if pure || too_deep || indices.len() < self.min_samples_split {
            return Node::Leaf { value: mean };
        }

        let split = match self.best_split(x, y, &indices) {
            Some(split) => split,
            None => return Node::Leaf { value: mean },
        };
        let (left, right): (Vec<usize>, Vec<usize>) = indices
            .into_iter()
            .partition(|&i| x[i][split.feature] <= split.threshold);

        Node::Split {
            feature: split.feature,
            threshold: split.threshold,
            left: Box::new(self.build(x, y, left, depth + 1)),
            right: Box::new(self.build(x, y, right, depth + 1)),
        }
    }

    fn best_split(&self, x: &[Vec<f64>], y: &[f64], indices: &[usize]) -> Option<BestSplit> {
        let mut best: Option<BestSplit> = None;
        for feature in 0..self.n_features {
            let mut points: Vec<(f64, f64)> = indices.iter().map(|&i| (x[i][feature], y[i])).collect();
            points.sort_by(|a, b| a.0.total_cmp(&b.0));

            let total_sum: f64 = points.iter().map(|p| p.1).sum();
            let total_sq: f64 = points.iter().map(|p| p.1 * p.1).sum();
            let (mut left_sum, mut left_sq) = (0.0, 0.0);

            for pos in 0..points.len() - 1 {
                left_sum += points[pos].1;
                left_sq += points[pos].1 * points[pos].1;
                if points[pos].0 == points[pos + 1].0 {
                    continue;
                }

                let n_left = (pos + 1) as f64;
                let n_right = (points.len() - pos - 1) as f64;
                let right_sum = total_sum - left_sum;
                let right_sq = total_sq - left_sq;
                let sse = (left_sq - left_sum * left_sum / n_left)
                    + (right_sq - right_sum * right_sum / n_right);

                if best.as_ref().map_or(true, |b| sse < b.sse) {
                    best = Some(BestSplit {
                        feature,
                        threshold: (points[pos].0 + points[pos + 1].0) / 2.0,
                        sse,
                    });
                }
            }
        }
        best
    }
}

impl Regressor for RegressionTree {
    fn fit(&mut self, x: &[Vec<f64>], y: &[f64]) -> Result<(), ModelError> {
        let indices: Vec<usize> = (0..x.len()).collect();
        self.fit_indices(x, y, &indices)
    }

    fn predict_one(&self, sample: &[f64]) -> Result<f64, ModelError> {
        let root = self.root.as_ref().ok_or(ModelError::NotFitted)?;
        if sample.len() != self.n_features {
            return Err(ModelError::Shape {
                expected: self.n_features,
                actual: sample.len(),
            });
        }
        Ok(root.eval(sample))
    }

    fn is_fitted(&self) -> bool {
        self.root.is_some()
    }
}
