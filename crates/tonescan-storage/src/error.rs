use thiserror::Error;
use tonescan_core::TonescanError;

/// Storage sink errors.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("database error: {0}")]
    Sqlx(#[from] sqlx::Error),

    #[error("migration error: {0}")]
    Migrate(#[from] sqlx::migrate::MigrateError),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("unknown storage kind '{0}'")]
    UnknownKind(String),

    #[error("malformed stored record: {0}")]
    Malformed(String),
}

impl From<StorageError> for TonescanError {
    fn from(err: StorageError) -> Self {
        TonescanError::Storage(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, StorageError>;
