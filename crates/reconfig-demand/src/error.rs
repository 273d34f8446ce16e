//! Demand accounting error types.

use thiserror::Error;

/// Errors raised by demand profiles, the registry, and the store.
#[derive(Debug, Error)]
pub enum DemandError {
    #[error("unknown demand profile: {0}")]
    UnknownProfile(String),

    #[error("invalid name pattern {pattern:?}: {reason}")]
    InvalidPattern { pattern: String, reason: String },

    #[error("cannot combine profile for {found} into profile for {expected}")]
    NameMismatch { expected: String, found: String },

    #[error("cannot combine {found} stats into a {expected} profile")]
    KindMismatch { expected: String, found: String },

    #[error("malformed demand stats for {name}: {reason}")]
    MalformedStats { name: String, reason: String },

    #[error("configuration error: {0}")]
    Config(#[from] reconfig_core::CoreError),
}

pub type DemandResult<T> = Result<T, DemandError>;
