//! # so-optimizer
//!
//! Surrogate-guided optimization over discrete search spaces.
//!
//! A [`Space`] is an ordered product of named [`Variable`]s, each with a
//! finite list of values. The [`Optimizer`] proposes unevaluated points,
//! either uniformly at random or by ranking random candidates with a
//! gradient-boosted surrogate trained on the points evaluated so far.

mod config;
mod optimizer;
mod sampler;
mod space;
mod table;
mod variable;

pub use config::OptimizerConfig;
pub use optimizer::{
    Optimizer, Proposal, DEFAULT_MAX_NUM_RETRIES, DEFAULT_NUM_BOOST_ROUND, DEFAULT_SAMPLE_SIZE,
    MIN_EVALUATED_FOR_FIT,
};
pub use space::Space;
pub use table::SpointTable;
pub use variable::Variable;

pub use so_surrogate::{GbdtParams, GbdtTrainer, Regressor, Trainer};
pub use so_types::{
    ErrorKind, Objective, SearchPoint, SpaceOptError, SpaceOptResult, VType, Value,
};
