//! Dry-run sink: counts writes, stores nothing.

use crate::error::Result;
use crate::sink::ResultSink;
use async_trait::async_trait;
use std::collections::HashSet;
use tonescan_core::{DialResult, SessionMetadata, StorageKind};

/// [`ResultSink`] that discards everything. Lets a session run end to
/// end with no files touched.
#[derive(Debug, Default)]
pub struct DryRunSink {
    results_written: u64,
    sessions_written: u64,
}

impl DryRunSink {
    /// Create an empty dry-run sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// How many results have been discarded.
    #[must_use]
    pub fn results_written(&self) -> u64 {
        self.results_written
    }

    /// How many session snapshots have been discarded.
    #[must_use]
    pub fn sessions_written(&self) -> u64 {
        self.sessions_written
    }
}

#[async_trait]
impl ResultSink for DryRunSink {
    fn kind(&self) -> StorageKind {
        StorageKind::DryRun
    }

    async fn write_result(&mut self, result: &DialResult) -> Result<()> {
        self.results_written += 1;
        tracing::info!(
            "[dry-run] {} {}: {}",
            result.phone_number,
            result.status,
            result.message
        );
        Ok(())
    }

    async fn write_session(&mut self, _session: &SessionMetadata) -> Result<()> {
        self.sessions_written += 1;
        Ok(())
    }

    async fn read_dialed_numbers(&self, _session_id: Option<&str>) -> Result<HashSet<String>> {
        Ok(HashSet::new())
    }

    async fn flush(&mut self) -> Result<()> {
        Ok(())
    }

    async fn close(&mut self) -> Result<()> {
        Ok(())
    }
}
