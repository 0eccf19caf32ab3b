//! Dense feature storage for training and prediction.

use crate::error::{SurrogateError, SurrogateResult};

/// Row-major dense feature matrix.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureMatrix {
    data: Vec<f64>,
    n_rows: usize,
    n_features: usize,
}

impl FeatureMatrix {
    /// Build a matrix from rows of equal width.
    pub fn from_rows(rows: Vec<Vec<f64>>) -> SurrogateResult<Self> {
        let n_rows = rows.len();
        let n_features = rows.first().map_or(0, Vec::len);
        let mut data = Vec::with_capacity(n_rows * n_features);
        for (i, row) in rows.into_iter().enumerate() {
            if row.len() != n_features {
                return Err(SurrogateError::ShapeMismatch {
                    message: format!(
                        "row {i} has {} features, expected {n_features}",
                        row.len()
                    ),
                });
            }
            data.extend(row);
        }
        Ok(Self {
            data,
            n_rows,
            n_features,
        })
    }

    pub fn n_rows(&self) -> usize {
        self.n_rows
    }

    pub fn n_features(&self) -> usize {
        self.n_features
    }

    pub fn row(&self, i: usize) -> &[f64] {
        &self.data[i * self.n_features..(i + 1) * self.n_features]
    }

    #[inline]
    pub fn get(&self, row: usize, feature: usize) -> f64 {
        self.data[row * self.n_features + feature]
    }

    pub fn rows(&self) -> impl Iterator<Item = &[f64]> {
        // chunks_exact panics on a zero chunk size
        let width = self.n_features.max(1);
        self.data.chunks_exact(width).take(self.n_rows)
    }
}

/// Training data: features, labels and which features are categorical.
///
/// Categorical features hold non-negative integral codes.
#[derive(Debug, Clone)]
pub struct Dataset {
    features: FeatureMatrix,
    labels: Vec<f64>,
    categorical: Vec<bool>,
}

impl Dataset {
    pub fn new(
        features: FeatureMatrix,
        labels: Vec<f64>,
        categorical_features: &[usize],
    ) -> SurrogateResult<Self> {
        if features.n_rows() == 0 {
            return Err(SurrogateError::EmptyDataset {
                message: "at least one row is required".to_string(),
            });
        }
        if features.n_features() == 0 {
            return Err(SurrogateError::EmptyDataset {
                message: "at least one feature is required".to_string(),
            });
        }
        if labels.len() != features.n_rows() {
            return Err(SurrogateError::ShapeMismatch {
                message: format!(
                    "{} labels for {} rows",
                    labels.len(),
                    features.n_rows()
                ),
            });
        }
        if let Some((row, &value)) = labels.iter().enumerate().find(|(_, v)| !v.is_finite()) {
            return Err(SurrogateError::InvalidLabel { row, value });
        }

        let mut categorical = vec![false; features.n_features()];
        for &feature in categorical_features {
            if feature >= features.n_features() {
                return Err(SurrogateError::ShapeMismatch {
                    message: format!(
                        "categorical feature index {feature} out of range for {} features",
                        features.n_features()
                    ),
                });
            }
            categorical[feature] = true;
            for row in 0..features.n_rows() {
                let value = features.get(row, feature);
                if category_code(value).is_none() {
                    return Err(SurrogateError::InvalidCategory {
                        feature,
                        row,
                        value,
                    });
                }
            }
        }

        Ok(Self {
            features,
            labels,
            categorical,
        })
    }

    pub fn features(&self) -> &FeatureMatrix {
        &self.features
    }

    pub fn labels(&self) -> &[f64] {
        &self.labels
    }

    pub fn n_rows(&self) -> usize {
        self.features.n_rows()
    }

    pub fn n_features(&self) -> usize {
        self.features.n_features()
    }

    pub fn is_categorical(&self, feature: usize) -> bool {
        self.categorical[feature]
    }

    pub fn categorical_features(&self) -> Vec<usize> {
        (0..self.categorical.len())
            .filter(|&f| self.categorical[f])
            .collect()
    }
}

/// Interpret a feature value as a category code.
#[inline]
pub fn category_code(value: f64) -> Option<u32> {
    if value.is_finite() && value >= 0.0 && value.fract() == 0.0 && value <= u32::MAX as f64 {
        Some(value as u32)
    } else {
        None
    }
}
