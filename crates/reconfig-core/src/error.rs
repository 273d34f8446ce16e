//! Error types shared by the reconfiguration crates.

use thiserror::Error;

/// Result type alias for core operations.
pub type CoreResult<T> = Result<T, CoreError>;

/// Errors raised while loading or validating configuration.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("invalid duration: {0}")]
    InvalidDuration(String),

    #[error("unknown reconfiguration policy: {0}")]
    UnknownPolicy(String),
}
