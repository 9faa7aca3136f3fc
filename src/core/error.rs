use thiserror::Error;

/// Custom error types for bittide synchronization
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    #[error("Precondition violated: {0}")]
    Precondition(String),

    #[error("Numerical non-convergence: {0}")]
    NonConvergence(String),

    #[error("Ill-conditioned input: {0}")]
    IllConditioned(String),

    #[error("Invalid clock error model: {0}")]
    InvalidModel(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Unsupported operation: {0}")]
    Unsupported(String),
}

/// Result type alias using our custom Error type
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Creates a new precondition error
    pub fn precondition(msg: impl Into<String>) -> Self {
        Error::Precondition(msg.into())
    }

    /// Creates a new non-convergence error
    pub fn non_convergence(msg: impl Into<String>) -> Self {
        Error::NonConvergence(msg.into())
    }

    /// Creates a new ill-conditioned input error
    pub fn ill_conditioned(msg: impl Into<String>) -> Self {
        Error::IllConditioned(msg.into())
    }

    /// Creates a new invalid model error
    pub fn invalid_model(msg: impl Into<String>) -> Self {
        Error::InvalidModel(msg.into())
    }

    /// Creates a new configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Error::Config(msg.into())
    }

    /// Creates a new unsupported operation error
    pub fn unsupported(msg: impl Into<String>) -> Self {
        Error::Unsupported(msg.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_creation() {
        let err = Error::precondition("matrix is not Metzler");
        assert!(matches!(err, Error::Precondition(_)));
        assert_eq!(err.to_string(), "Precondition violated: matrix is not Metzler");
    }

    #[test]
    fn test_error_display() {
        let err = Error::non_convergence("bisection budget exhausted");
        assert_eq!(
            err.to_string(),
            "Numerical non-convergence: bisection budget exhausted"
        );
    }
}
