use thiserror::Error;
use tonescan_core::TonescanError;

/// Fatal backend errors.
///
/// Transient call outcomes (busy, no answer, timeout) are recorded as
/// `DialResult`s and never surface here; an `Err` from a backend aborts
/// the session.
#[derive(Debug, Error)]
pub enum BackendError {
    #[error("transport error: {0}")]
    Transport(String),

    #[error("modem did not acknowledge init command {command}")]
    InitFailed { command: String },

    #[error("backend not connected")]
    NotConnected,

    #[error("invalid backend state: expected {expected}, was {actual}")]
    InvalidState { expected: String, actual: String },

    #[error("authentication rejected: {0}")]
    Auth(String),

    #[error("voice API error: HTTP {status}: {message}")]
    Api { status: u16, message: String },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<BackendError> for TonescanError {
    fn from(err: BackendError) -> Self {
        TonescanError::Backend(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, BackendError>;
