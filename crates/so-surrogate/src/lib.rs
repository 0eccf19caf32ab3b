//! # so-surrogate
//!
//! Gradient-boosted regression trees used by spaceopt to rank unevaluated
//! candidates. Small-sample oriented: exact split search, leaf-wise growth,
//! native categorical splits and an absolute-error objective.
//!
//! The optimizer only sees the [`Trainer`] and [`Regressor`] traits, so any
//! other engine can be plugged in behind them.

mod callback;
mod dataset;
mod error;
mod gain;
mod grower;
mod loss;
mod metric;
mod trainer;
mod tree;

pub use callback::EarlyStopping;
pub use dataset::{category_code, Dataset, FeatureMatrix};
pub use error::{SurrogateError, SurrogateResult};
pub use gain::GainParams;
pub use loss::{median, AbsoluteLoss, GradPair, Loss, LossKind, SquaredLoss};
pub use trainer::{GbdtModel, GbdtParams, GbdtTrainer, Regressor, Trainer};
pub use tree::{Node, RegressionTree, SplitRule};
