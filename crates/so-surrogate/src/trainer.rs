//! GBDT training loop and the trained model.
//!
//! Each boosting round computes gradients of the loss at the current
//! predictions, grows one tree against them, sets leaf outputs (renewed by
//! the loss when it has a closed form, Newton step otherwise) scaled by the
//! learning rate, and updates the predictions. The training metric is
//! tracked for early stopping; the returned model keeps the trees up to the
//! best round.

use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::callback::EarlyStopping;
use crate::dataset::{Dataset, FeatureMatrix};
use crate::error::{SurrogateError, SurrogateResult};
use crate::gain::GainParams;
use crate::grower::{GrowerParams, TreeGrower};
use crate::loss::{GradPair, Loss, LossKind};
use crate::metric;
use crate::tree::RegressionTree;

/// A trained model that scores feature rows.
pub trait Regressor {
    fn predict(&self, features: &FeatureMatrix) -> Vec<f64>;
}

/// Builds a fresh [`Regressor`] from a dataset.
pub trait Trainer {
    type Model: Regressor;

    fn train(&self, dataset: &Dataset, num_boost_round: usize) -> SurrogateResult<Self::Model>;
}

// =============================================================================
// GbdtParams
// =============================================================================

/// Parameters for GBDT training.
///
/// The defaults target tiny training sets: one-row leaves are allowed and
/// early stopping watches the training metric itself.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GbdtParams {
    pub loss: LossKind,
    /// Learning rate (shrinkage).
    pub learning_rate: f64,
    /// Maximum leaves per tree.
    pub num_leaves: usize,
    /// Maximum tree depth, `None` for unlimited.
    pub max_depth: Option<usize>,
    pub max_onehot_cats: usize,
    pub cat_smooth: f64,
    pub gain: GainParams,
    /// Rounds without improvement before stopping. 0 disables.
    pub early_stopping_rounds: usize,
}

impl Default for GbdtParams {
    fn default() -> Self {
        Self {
            loss: LossKind::AbsoluteError,
            learning_rate: 0.1,
            num_leaves: 31,
            max_depth: None,
            max_onehot_cats: 4,
            cat_smooth: 10.0,
            gain: GainParams::default(),
            early_stopping_rounds: 10,
        }
    }
}

impl GbdtParams {
    pub fn validate(&self) -> SurrogateResult<()> {
        if !(self.learning_rate > 0.0 && self.learning_rate.is_finite()) {
            return Err(invalid("learning_rate", "must be positive and finite"));
        }
        if self.num_leaves < 2 {
            return Err(invalid("num_leaves", "must be at least 2"));
        }
        if self.max_depth == Some(0) {
            return Err(invalid("max_depth", "must be positive when set"));
        }
        if self.cat_smooth < 0.0 {
            return Err(invalid("cat_smooth", "must not be negative"));
        }
        if self.gain.reg_lambda < 0.0 {
            return Err(invalid("gain.reg_lambda", "must not be negative"));
        }
        if self.gain.min_samples_leaf == 0 {
            return Err(invalid("gain.min_samples_leaf", "must be at least 1"));
        }
        Ok(())
    }

    fn to_grower_params(&self) -> GrowerParams {
        GrowerParams {
            num_leaves: self.num_leaves,
            max_depth: self.max_depth,
            max_onehot_cats: self.max_onehot_cats,
            cat_smooth: self.cat_smooth,
            gain: self.gain.clone(),
        }
    }
}

fn invalid(parameter: &str, message: &str) -> SurrogateError {
    SurrogateError::InvalidParams {
        parameter: parameter.to_string(),
        message: message.to_string(),
    }
}

// =============================================================================
// GbdtTrainer
// =============================================================================

#[derive(Debug, Clone, Default)]
pub struct GbdtTrainer {
    params: GbdtParams,
}

impl GbdtTrainer {
    pub fn new(params: GbdtParams) -> Self {
        Self { params }
    }

    pub fn params(&self) -> &GbdtParams {
        &self.params
    }
}

impl Trainer for GbdtTrainer {
    type Model = GbdtModel;

    fn train(&self, dataset: &Dataset, num_boost_round: usize) -> SurrogateResult<GbdtModel> {
        self.params.validate()?;
        if num_boost_round == 0 {
            return Err(invalid("num_boost_round", "must be at least 1"));
        }

        let loss = self.params.loss;
        let labels = dataset.labels();
        let n_rows = dataset.n_rows();

        let base_score = loss.base_score(labels);
        let mut predictions = vec![base_score; n_rows];
        let mut grads = vec![GradPair::default(); n_rows];

        let grower_params = self.params.to_grower_params();
        let grower = TreeGrower::new(dataset, &grower_params);
        let mut early_stopping = EarlyStopping::new(self.params.early_stopping_rounds);
        let mut trees = Vec::with_capacity(num_boost_round.min(1024));

        for round in 0..num_boost_round {
            loss.compute_gradients(&predictions, labels, &mut grads);
            let grown = grower.grow(&grads);

            let mut tree = grown.tree;
            let mut updates = Vec::with_capacity(grown.leaves.len());
            for (node, rows) in &grown.leaves {
                let raw = loss
                    .renew_leaf(rows, &predictions, labels)
                    .unwrap_or_else(|| {
                        let grad_sum: f64 = rows.iter().map(|&r| grads[r].grad).sum();
                        let hess_sum: f64 = rows.iter().map(|&r| grads[r].hess).sum();
                        self.params.gain.compute_leaf_weight(grad_sum, hess_sum)
                    });
                let value = raw * self.params.learning_rate;
                tree.set_leaf_value(*node, value);
                updates.push((rows, value));
            }
            for (rows, value) in updates {
                for &r in rows {
                    predictions[r] += value;
                }
            }
            trees.push(tree);

            let score = eval_metric(loss, &predictions, labels);
            trace!(round, score, leaves = grown.leaves.len(), "boosting round");

            if early_stopping.should_stop(score) {
                debug!(
                    round,
                    best_round = early_stopping.best_round(),
                    "early stopping"
                );
                break;
            }
        }

        if early_stopping.is_enabled() {
            trees.truncate(early_stopping.best_round() + 1);
        }

        debug!(
            loss = loss.name(),
            rows = n_rows,
            trees = trees.len(),
            best_score = ?early_stopping.best_value(),
            "trained gbdt model"
        );

        Ok(GbdtModel {
            base_score,
            trees,
            n_features: dataset.n_features(),
        })
    }
}

fn eval_metric(loss: LossKind, predictions: &[f64], labels: &[f64]) -> f64 {
    match loss {
        LossKind::AbsoluteError => metric::mae(predictions, labels),
        LossKind::SquaredError => metric::rmse(predictions, labels),
    }
}

// =============================================================================
// GbdtModel
// =============================================================================

/// An additive ensemble of regression trees.
#[derive(Debug, Clone)]
pub struct GbdtModel {
    base_score: f64,
    trees: Vec<RegressionTree>,
    n_features: usize,
}

impl GbdtModel {
    pub fn base_score(&self) -> f64 {
        self.base_score
    }

    pub fn trees(&self) -> &[RegressionTree] {
        &self.trees
    }

    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }

    pub fn n_features(&self) -> usize {
        self.n_features
    }

    pub fn predict_row(&self, row: &[f64]) -> f64 {
        self.base_score + self.trees.iter().map(|t| t.predict_row(row)).sum::<f64>()
    }
}

impl Regressor for GbdtModel {
    fn predict(&self, features: &FeatureMatrix) -> Vec<f64> {
        debug_assert_eq!(features.n_features(), self.n_features);
        features.rows().map(|row| self.predict_row(row)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dataset(rows: Vec<Vec<f64>>, labels: Vec<f64>, categorical: &[usize]) -> Dataset {
        Dataset::new(FeatureMatrix::from_rows(rows).unwrap(), labels, categorical).unwrap()
    }

    #[test]
    fn default_params_are_small_sample_friendly() {
        let params = GbdtParams::default();
        assert_eq!(params.loss, LossKind::AbsoluteError);
        assert_eq!(params.learning_rate, 0.1);
        assert_eq!(params.gain.min_samples_leaf, 1);
        assert_eq!(params.early_stopping_rounds, 10);
        assert!(params.validate().is_ok());
    }

    #[test]
    fn invalid_params_rejected() {
        let params = GbdtParams {
            learning_rate: 0.0,
            ..Default::default()
        };
        let err = params.validate().unwrap_err();
        assert!(matches!(err, SurrogateError::InvalidParams { ref parameter, .. } if parameter == "learning_rate"));

        let ds = dataset(vec![vec![0.0], vec![1.0]], vec![0.0, 1.0], &[]);
        let err = GbdtTrainer::default().train(&ds, 0).unwrap_err();
        assert!(matches!(err, SurrogateError::InvalidParams { .. }));
    }

    #[test]
    fn params_serde_round_trip_with_defaults() {
        let params: GbdtParams = serde_json::from_str(r#"{"learning_rate": 0.05}"#).unwrap();
        assert_eq!(params.learning_rate, 0.05);
        assert_eq!(params.num_leaves, 31);

        let json = serde_json::to_string(&params).unwrap();
        let back: GbdtParams = serde_json::from_str(&json).unwrap();
        assert_eq!(back, params);
    }

    #[test]
    fn learns_step_function() {
        let rows: Vec<Vec<f64>> = (0..20).map(|i| vec![i as f64]).collect();
        let labels: Vec<f64> = (0..20).map(|i| if i < 10 { 1.0 } else { 5.0 }).collect();
        let ds = dataset(rows, labels, &[]);

        let model = GbdtTrainer::default().train(&ds, 200).unwrap();
        assert!(model.n_trees() > 0);
        assert!(model.predict_row(&[2.0]) < model.predict_row(&[15.0]));
        assert!((model.predict_row(&[2.0]) - 1.0).abs() < 0.5);
        assert!((model.predict_row(&[15.0]) - 5.0).abs() < 0.5);
    }

    #[test]
    fn learns_categorical_effect() {
        // feature 0: categorical code, feature 1: irrelevant noise
        let mut rows = Vec::new();
        let mut labels = Vec::new();
        for i in 0..30 {
            let code = (i % 3) as f64;
            rows.push(vec![code, (i % 7) as f64]);
            labels.push(match i % 3 {
                0 => -1.0,
                1 => 2.0,
                _ => 0.0,
            });
        }
        let ds = dataset(rows, labels, &[0]);
        let model = GbdtTrainer::default().train(&ds, 300).unwrap();

        let features =
            FeatureMatrix::from_rows(vec![vec![0.0, 3.0], vec![1.0, 3.0], vec![2.0, 3.0]])
                .unwrap();
        let preds = model.predict(&features);
        assert!(preds[0] < preds[2]);
        assert!(preds[2] < preds[1]);
    }

    #[test]
    fn constant_labels_stop_early_with_flat_model() {
        let rows: Vec<Vec<f64>> = (0..5).map(|i| vec![i as f64]).collect();
        let ds = dataset(rows, vec![0.95; 5], &[]);
        let model = GbdtTrainer::default().train(&ds, 1024).unwrap();

        // best round is the first one; everything after it is discarded
        assert_eq!(model.n_trees(), 1);
        assert_eq!(model.base_score(), 0.95);
        assert!((model.predict_row(&[3.0]) - 0.95).abs() < 1e-12);
    }

    #[test]
    fn two_rows_are_enough_to_rank() {
        let ds = dataset(vec![vec![0.0], vec![1.0]], vec![3.0, 1.0], &[]);
        let model = GbdtTrainer::default().train(&ds, 100).unwrap();
        assert!(model.predict_row(&[1.0]) < model.predict_row(&[0.0]));
    }

    #[test]
    fn squared_loss_trains_too() {
        let rows: Vec<Vec<f64>> = (0..10).map(|i| vec![i as f64]).collect();
        let labels: Vec<f64> = (0..10).map(|i| i as f64).collect();
        let ds = dataset(rows, labels, &[]);
        let trainer = GbdtTrainer::new(GbdtParams {
            loss: LossKind::SquaredError,
            ..Default::default()
        });
        let model = trainer.train(&ds, 100).unwrap();
        assert!(model.predict_row(&[0.0]) < model.predict_row(&[9.0]));
    }
}
