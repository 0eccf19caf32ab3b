use thiserror::Error;

/// Main error type for spaceopt.
///
/// Every failure falls into exactly one of three categories so callers can
/// branch on [`SpaceOptError::kind`] instead of parsing messages.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SpaceOptError {
    /// A value or argument has the wrong runtime type.
    #[error("{0}")]
    Type(String),

    /// A value is outside its allowed domain, empty, or an unknown choice.
    #[error("{0}")]
    Value(String),

    /// Invariant violation or exhausted resource.
    #[error("{0}")]
    Runtime(String),
}

/// Error category, independent of the message text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Type,
    Value,
    Runtime,
}

impl SpaceOptError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Type(_) => ErrorKind::Type,
            Self::Value(_) => ErrorKind::Value,
            Self::Runtime(_) => ErrorKind::Runtime,
        }
    }

    pub fn message(&self) -> &str {
        match self {
            Self::Type(msg) | Self::Value(msg) | Self::Runtime(msg) => msg,
        }
    }

    pub fn is_type(&self) -> bool {
        self.kind() == ErrorKind::Type
    }

    pub fn is_value(&self) -> bool {
        self.kind() == ErrorKind::Value
    }

    pub fn is_runtime(&self) -> bool {
        self.kind() == ErrorKind::Runtime
    }
}

/// Result type alias for spaceopt operations
pub type SpaceOptResult<T> = Result<T, SpaceOptError>;

/// Macro for creating type errors
#[macro_export]
macro_rules! type_error {
    ($($arg:tt)*) => {
        $crate::SpaceOptError::Type(format!($($arg)*))
    };
}

/// Macro for creating value errors
#[macro_export]
macro_rules! value_error {
    ($($arg:tt)*) => {
        $crate::SpaceOptError::Value(format!($($arg)*))
    };
}

/// Macro for creating runtime errors
#[macro_export]
macro_rules! runtime_error {
    ($($arg:tt)*) => {
        $crate::SpaceOptError::Runtime(format!($($arg)*))
    };
}
