//! Packet error types.

use thiserror::Error;

/// Errors raised while building, splitting, or decoding packets.
#[derive(Debug, Error)]
pub enum PacketError {
    #[error("batched create needs at least one name")]
    EmptyBatch,

    #[error("batch size must be positive")]
    InvalidBatchSize,

    #[error("failed to decode create request: {0}")]
    Decode(String),

    #[error("failed to encode create request: {0}")]
    Encode(String),
}

pub type PacketResult<T> = Result<T, PacketError>;
