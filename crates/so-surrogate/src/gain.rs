//! Split gain and leaf weight computation.

use serde::{Deserialize, Serialize};

/// Parameters for split gain computation and leaf weight calculation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GainParams {
    /// L2 regularization (lambda).
    pub reg_lambda: f64,
    /// Minimum split gain (gamma).
    pub min_gain: f64,
    /// Minimum sum of hessians per child.
    pub min_child_weight: f64,
    /// Minimum samples per child.
    pub min_samples_leaf: usize,
}

impl Default for GainParams {
    fn default() -> Self {
        Self {
            reg_lambda: 0.0,
            min_gain: 0.0,
            min_child_weight: 1e-3,
            min_samples_leaf: 1,
        }
    }
}

impl GainParams {
    /// Compute the split gain.
    ///
    /// ```text
    /// gain = 0.5 * [G_L²/(H_L + λ) + G_R²/(H_R + λ) - G_P²/(H_P + λ)] - γ
    /// ```
    #[inline]
    pub fn compute_gain(
        &self,
        grad_left: f64,
        hess_left: f64,
        grad_right: f64,
        hess_right: f64,
    ) -> f64 {
        let lambda = self.reg_lambda;
        let grad_parent = grad_left + grad_right;
        let hess_parent = hess_left + hess_right;

        let score_left = grad_left * grad_left / (hess_left + lambda);
        let score_right = grad_right * grad_right / (hess_right + lambda);
        let score_parent = grad_parent * grad_parent / (hess_parent + lambda);

        0.5 * (score_left + score_right - score_parent) - self.min_gain
    }

    /// Check if a split satisfies minimum constraints.
    #[inline]
    pub fn is_valid_split(
        &self,
        hess_left: f64,
        hess_right: f64,
        count_left: usize,
        count_right: usize,
    ) -> bool {
        hess_left >= self.min_child_weight
            && hess_right >= self.min_child_weight
            && count_left >= self.min_samples_leaf
            && count_right >= self.min_samples_leaf
    }

    /// Newton-step leaf weight: `-G / (H + λ)`.
    #[inline]
    pub fn compute_leaf_weight(&self, grad_sum: f64, hess_sum: f64) -> f64 {
        let denom = hess_sum + self.reg_lambda;
        if denom <= 0.0 {
            return 0.0;
        }
        -grad_sum / denom
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gain_computation() {
        let params = GainParams {
            reg_lambda: 1.0,
            ..Default::default()
        };
        // Left: G=-2, H=2; right: G=2, H=2; parent: G=0, H=4
        let gain = params.compute_gain(-2.0, 2.0, 2.0, 2.0);
        let expected = 0.5 * (4.0 / 3.0 + 4.0 / 3.0 - 0.0);
        assert!((gain - expected).abs() < 1e-12);
    }

    #[test]
    fn test_gain_zero_when_children_agree() {
        let params = GainParams::default();
        let gain = params.compute_gain(1.0, 1.0, 1.0, 1.0);
        assert!(gain.abs() < 1e-12);
    }

    #[test]
    fn test_valid_split_check() {
        let params = GainParams {
            min_samples_leaf: 2,
            ..Default::default()
        };
        assert!(params.is_valid_split(2.0, 2.0, 2, 2));
        assert!(!params.is_valid_split(2.0, 2.0, 1, 3));
    }

    #[test]
    fn test_leaf_weight() {
        let params = GainParams::default();
        assert_eq!(params.compute_leaf_weight(-3.0, 3.0), 1.0);
        assert_eq!(params.compute_leaf_weight(1.0, 0.0), 0.0);
    }
}
