//! Evaluation metrics used for early stopping.

/// Mean Absolute Error: mean(|pred - label|)
pub(crate) fn mae(predictions: &[f64], labels: &[f64]) -> f64 {
    if predictions.is_empty() {
        return 0.0;
    }
    let total: f64 = predictions
        .iter()
        .zip(labels)
        .map(|(p, l)| (p - l).abs())
        .sum();
    total / predictions.len() as f64
}

/// Root Mean Squared Error: sqrt(mean((pred - label)²))
pub(crate) fn rmse(predictions: &[f64], labels: &[f64]) -> f64 {
    if predictions.is_empty() {
        return 0.0;
    }
    let total: f64 = predictions
        .iter()
        .zip(labels)
        .map(|(p, l)| (p - l) * (p - l))
        .sum();
    (total / predictions.len() as f64).sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mae_basic() {
        assert!((mae(&[1.0, 2.0, 3.0], &[1.5, 2.0, 2.0]) - 0.5).abs() < 1e-12);
        assert_eq!(mae(&[], &[]), 0.0);
    }

    #[test]
    fn rmse_basic() {
        assert!((rmse(&[0.0, 0.0], &[3.0, 4.0]) - 12.5f64.sqrt()).abs() < 1e-12);
    }
}
