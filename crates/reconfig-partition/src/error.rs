//! Partitioning error types.

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PartitionError {
    /// Partitioning over nobody is a configuration error, not an empty result.
    #[error("no reconfigurators configured")]
    NoReconfigurators,

    #[error("virtual node count must be positive")]
    NoVirtualNodes,
}

pub type PartitionResult<T> = Result<T, PartitionError>;
