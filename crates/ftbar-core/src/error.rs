use thiserror::Error;

/// Top-level error type for the ftbar system.
///
/// Subsystem crates keep their own error types (`EvaluationError`,
/// `ActionError`) and convert into `FtbarError` at crate boundaries so that
/// the `?` operator works in the application binary.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum FtbarError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Template error: {0}")]
    Template(String),

    #[error("Lifecycle error: {0}")]
    Lifecycle(String),

    #[error("Action error: {0}")]
    Action(String),
}

impl From<toml::de::Error> for FtbarError {
    fn from(err: toml::de::Error) -> Self {
        FtbarError::Config(err.to_string())
    }
}

impl From<toml::ser::Error> for FtbarError {
    fn from(err: toml::ser::Error) -> Self {
        FtbarError::Config(err.to_string())
    }
}

impl From<serde_json::Error> for FtbarError {
    fn from(err: serde_json::Error) -> Self {
        FtbarError::Serialization(err.to_string())
    }
}

/// A specialized `Result` type for ftbar operations.
pub type Result<T> = std::result::Result<T, FtbarError>;
