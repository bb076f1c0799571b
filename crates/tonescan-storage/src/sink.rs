//! The storage contract and sink factory.

use crate::csv_file::CsvSink;
use crate::dry_run::DryRunSink;
use crate::error::{Result, StorageError};
use crate::sqlite::SqliteSink;
use async_trait::async_trait;
use std::collections::HashSet;
use std::path::Path;
use std::str::FromStr;
use tonescan_core::{DialResult, SessionMetadata, StorageConfig, StorageKind};

/// A destination for dial results and session metadata.
///
/// Writes happen per call, not batched; the session engine writes each
/// result as soon as the backend returns it.
#[async_trait]
pub trait ResultSink: Send {
    /// Which sink variant this is.
    fn kind(&self) -> StorageKind;

    /// Persist one dial result.
    async fn write_result(&mut self, result: &DialResult) -> Result<()>;

    /// Persist a snapshot of session metadata. Called after every dial
    /// and once at session end; later snapshots replace earlier ones.
    async fn write_session(&mut self, session: &SessionMetadata) -> Result<()>;

    /// Numbers already dialed, optionally restricted to one session.
    /// Resume derives its remaining set from this.
    async fn read_dialed_numbers(&self, session_id: Option<&str>) -> Result<HashSet<String>>;

    /// Push buffered writes to durable storage.
    async fn flush(&mut self) -> Result<()>;

    /// Flush and release the sink.
    async fn close(&mut self) -> Result<()>;
}

/// Construct a sink from storage settings.
///
/// # Errors
/// [`StorageError::UnknownKind`] for an unrecognized kind string; open
/// and migration errors from the SQLite sink.
pub async fn create_sink(config: &StorageConfig) -> Result<Box<dyn ResultSink>> {
    let kind = StorageKind::from_str(&config.kind)
        .map_err(|_| StorageError::UnknownKind(config.kind.clone()))?;
    tracing::info!("Opening {} result sink at {}", kind, config.path);

    match kind {
        StorageKind::Sqlite => Ok(Box::new(SqliteSink::open(Path::new(&config.path)).await?)),
        StorageKind::Csv => Ok(Box::new(CsvSink::open(Path::new(&config.path))?)),
        StorageKind::DryRun => Ok(Box::new(DryRunSink::new())),
    }
}
