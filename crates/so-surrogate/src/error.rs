use thiserror::Error;

/// Errors raised while building datasets or training models.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SurrogateError {
    #[error("Empty dataset: {message}")]
    EmptyDataset { message: String },

    #[error("Shape mismatch: {message}")]
    ShapeMismatch { message: String },

    #[error("Invalid label at row {row}: {value}")]
    InvalidLabel { row: usize, value: f64 },

    #[error("Invalid categorical value {value} in feature {feature} at row {row}")]
    InvalidCategory { feature: usize, row: usize, value: f64 },

    #[error("Invalid parameter {parameter}: {message}")]
    InvalidParams { parameter: String, message: String },
}

pub type SurrogateResult<T> = Result<T, SurrogateError>;
