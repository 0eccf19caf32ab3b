//! Regression losses: gradients, base scores and leaf renewal.

use serde::{Deserialize, Serialize};

/// First and second order gradient for one row.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct GradPair {
    pub grad: f64,
    pub hess: f64,
}

/// A differentiable training loss.
pub trait Loss {
    /// Fill `out` with gradients of the loss at `predictions`.
    fn compute_gradients(&self, predictions: &[f64], targets: &[f64], out: &mut [GradPair]);

    /// Constant prediction the ensemble starts from.
    fn base_score(&self, targets: &[f64]) -> f64;

    /// Optimal output for a leaf holding `rows`, if the Newton step is not
    /// the right answer for this loss.
    fn renew_leaf(&self, _rows: &[usize], _predictions: &[f64], _targets: &[f64]) -> Option<f64> {
        None
    }

    fn name(&self) -> &'static str;
}

/// Loss selector carried in trainer parameters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LossKind {
    /// L1 loss; robust to outliers and to the tiny samples the optimizer
    /// trains on.
    #[default]
    AbsoluteError,
    SquaredError,
}

impl Loss for LossKind {
    fn compute_gradients(&self, predictions: &[f64], targets: &[f64], out: &mut [GradPair]) {
        match self {
            Self::AbsoluteError => AbsoluteLoss.compute_gradients(predictions, targets, out),
            Self::SquaredError => SquaredLoss.compute_gradients(predictions, targets, out),
        }
    }

    fn base_score(&self, targets: &[f64]) -> f64 {
        match self {
            Self::AbsoluteError => AbsoluteLoss.base_score(targets),
            Self::SquaredError => SquaredLoss.base_score(targets),
        }
    }

    fn renew_leaf(&self, rows: &[usize], predictions: &[f64], targets: &[f64]) -> Option<f64> {
        match self {
            Self::AbsoluteError => AbsoluteLoss.renew_leaf(rows, predictions, targets),
            Self::SquaredError => SquaredLoss.renew_leaf(rows, predictions, targets),
        }
    }

    fn name(&self) -> &'static str {
        match self {
            Self::AbsoluteError => AbsoluteLoss.name(),
            Self::SquaredError => SquaredLoss.name(),
        }
    }
}

// =============================================================================
// Absolute Loss (MAE)
// =============================================================================

/// Absolute error loss.
///
/// - Loss: `|pred - target|`
/// - Gradient: `sign(pred - target)`, zero on an exact fit
/// - Hessian: `1.0`
///
/// Leaf outputs are renewed to the median residual of the leaf's rows, which
/// is the L1-optimal constant.
#[derive(Debug, Clone, Copy, Default)]
pub struct AbsoluteLoss;

impl Loss for AbsoluteLoss {
    fn compute_gradients(&self, predictions: &[f64], targets: &[f64], out: &mut [GradPair]) {
        debug_assert_eq!(predictions.len(), targets.len());
        debug_assert_eq!(predictions.len(), out.len());

        for ((pair, &pred), &target) in out.iter_mut().zip(predictions).zip(targets) {
            let diff = pred - target;
            // f64::signum maps 0.0 to 1.0
            pair.grad = if diff == 0.0 { 0.0 } else { diff.signum() };
            pair.hess = 1.0;
        }
    }

    fn base_score(&self, targets: &[f64]) -> f64 {
        median(targets.to_vec()).unwrap_or(0.0)
    }

    fn renew_leaf(&self, rows: &[usize], predictions: &[f64], targets: &[f64]) -> Option<f64> {
        let residuals: Vec<f64> = rows.iter().map(|&r| targets[r] - predictions[r]).collect();
        median(residuals)
    }

    fn name(&self) -> &'static str {
        "absolute"
    }
}

// =============================================================================
// Squared Loss
// =============================================================================

/// Squared error loss: gradient `pred - target`, hessian `1.0`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SquaredLoss;

impl Loss for SquaredLoss {
    fn compute_gradients(&self, predictions: &[f64], targets: &[f64], out: &mut [GradPair]) {
        for ((pair, &pred), &target) in out.iter_mut().zip(predictions).zip(targets) {
            pair.grad = pred - target;
            pair.hess = 1.0;
        }
    }

    fn base_score(&self, targets: &[f64]) -> f64 {
        if targets.is_empty() {
            return 0.0;
        }
        targets.iter().sum::<f64>() / targets.len() as f64
    }

    fn name(&self) -> &'static str {
        "squared"
    }
}

/// Median with the midpoint convention for even lengths.
pub fn median(mut values: Vec<f64>) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    values.sort_by(f64::total_cmp);
    let mid = values.len() / 2;
    if values.len() % 2 == 1 {
        Some(values[mid])
    } else {
        Some(0.5 * (values[mid - 1] + values[mid]))
    }
}
