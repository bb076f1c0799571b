use thiserror::Error;
use tonescan_core::TonescanError;
use tonescan_numbers::{ResumeError, ValidationError};
use tonescan_storage::StorageError;
use tonescan_telephony::BackendError;

/// Session engine errors. Each variant wraps the failing subsystem.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("backend failure: {0}")]
    Backend(#[from] BackendError),

    #[error("storage failure: {0}")]
    Storage(#[from] StorageError),

    #[error("invalid number or pattern: {0}")]
    Validation(#[from] ValidationError),

    #[error("resume failure: {0}")]
    Resume(#[from] ResumeError),
}

impl From<SessionError> for TonescanError {
    fn from(err: SessionError) -> Self {
        match err {
            SessionError::Backend(inner) => inner.into(),
            SessionError::Storage(inner) => inner.into(),
            SessionError::Validation(inner) => inner.into(),
            SessionError::Resume(inner) => inner.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, SessionError>;
