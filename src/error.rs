use thiserror::Error;

use crate::services::document_client::SubmitError;

#[derive(Debug, Error)]
pub enum GateError {
    #[error("invalid gate configuration: {0}")]
    InvalidConfiguration(String),

    #[error("admission wait cancelled")]
    Cancelled,
}

#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Gate(#[from] GateError),

    #[error(transparent)]
    Submit(#[from] SubmitError),

    #[error("configuration error: {0}")]
    Config(#[from] ::config::ConfigError),
}

pub type ApiResult<T> = Result<T, ApiError>;
