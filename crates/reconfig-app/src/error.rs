//! Application error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("unable to parse request: {0}")]
    Parse(String),

    #[error("unknown request type {0}")]
    UnknownRequestType(u32),
}

pub type AppResult<T> = Result<T, AppError>;
