use thiserror::Error;
use tonescan_core::TonescanError;

/// Errors from validating numbers and patterns.
///
/// Always recoverable at the call site and reported before any dial
/// attempt; never fatal to the process.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("number too short: {got} digits (minimum {min})")]
    TooShort { got: usize, min: usize },

    #[error("number too long: {got} digits (maximum {max})")]
    TooLong { got: usize, max: usize },

    #[error("pattern must include at least the area code ({min} digits), got {got}")]
    PatternTooShort { got: usize, min: usize },

    #[error("area code must start with 2-9: {area_code}")]
    BadAreaCode { area_code: String },

    #[error("area code cannot be an N11 service code: {area_code}")]
    N11AreaCode { area_code: String },

    #[error("exchange code must start with 2-9: {exchange}")]
    BadExchange { exchange: String },

    #[error("number must contain only digits: {input}")]
    NonDigit { input: String },
}

/// Errors from resume-pattern inference.
#[derive(Debug, Error)]
pub enum ResumeError {
    #[error("no dialed numbers found to resume from")]
    NoDialedNumbers,

    #[error("could not infer a pattern from the dialed numbers: {reason}; supply an explicit prefix")]
    NoCommonPrefix { reason: String },

    #[error(transparent)]
    Validation(#[from] ValidationError),
}

impl From<ValidationError> for TonescanError {
    fn from(err: ValidationError) -> Self {
        TonescanError::Validation(err.to_string())
    }
}

impl From<ResumeError> for TonescanError {
    fn from(err: ResumeError) -> Self {
        TonescanError::Resume(err.to_string())
    }
}

pub type Result<T, E = ValidationError> = std::result::Result<T, E>;
