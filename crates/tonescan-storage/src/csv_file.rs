//! Append-only CSV result sink.
//!
//! One row per dial result. Session metadata has no natural place in a
//! flat file and is logged instead; resume still works because the
//! dialed-number set is recoverable from the result rows.

use crate::error::Result;
use crate::sink::ResultSink;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};
use tonescan_core::{DialResult, SessionMetadata, StorageKind};

#[derive(Serialize, Deserialize)]
struct CsvRecord {
    session_id: String,
    phone_number: String,
    status: String,
    success: bool,
    message: String,
    carrier_detected: bool,
    tone_type: String,
    timestamp: String,
}

impl From<&DialResult> for CsvRecord {
    fn from(result: &DialResult) -> Self {
        Self {
            session_id: result.session_id.clone(),
            phone_number: result.phone_number.clone(),
            status: result.status.to_string(),
            success: result.success,
            message: result.message.clone(),
            carrier_detected: result.carrier_detected,
            tone_type: result
                .tone_type
                .map(|t| t.to_string())
                .unwrap_or_default(),
            timestamp: result.timestamp.to_rfc3339(),
        }
    }
}

/// [`ResultSink`] appending to a CSV file.
pub struct CsvSink {
    writer: csv::Writer<File>,
    path: PathBuf,
}

impl CsvSink {
    /// Open a CSV file for appending, writing the header when the file is
    /// new or empty.
    ///
    /// # Errors
    /// File open and write failures as [`crate::StorageError`].
    pub fn open(path: &Path) -> Result<Self> {
        let new_file = !path.exists() || std::fs::metadata(path)?.len() == 0;
        let file = OpenOptions::new().create(true).append(true).open(path)?;

        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(file);
        if new_file {
            writer.write_record([
                "session_id",
                "phone_number",
                "status",
                "success",
                "message",
                "carrier_detected",
                "tone_type",
                "timestamp",
            ])?;
            writer.flush()?;
        }

        Ok(Self {
            writer,
            path: path.to_path_buf(),
        })
    }
}

#[async_trait]
impl ResultSink for CsvSink {
    fn kind(&self) -> StorageKind {
        StorageKind::Csv
    }

    async fn write_result(&mut self, result: &DialResult) -> Result<()> {
        self.writer.serialize(CsvRecord::from(result))?;
        // Flush per result so a crash loses at most the in-flight call
        self.writer.flush()?;
        Ok(())
    }

    async fn write_session(&mut self, session: &SessionMetadata) -> Result<()> {
        tracing::debug!(
            "Session {}: {} calls, {} successful, {} modem",
            session.session_id,
            session.total_calls,
            session.successful_calls,
            session.modem_detections
        );
        Ok(())
    }

    async fn read_dialed_numbers(&self, session_id: Option<&str>) -> Result<HashSet<String>> {
        if !self.path.exists() {
            return Ok(HashSet::new());
        }
        let mut reader = csv::Reader::from_path(&self.path)?;
        let mut dialed = HashSet::new();
        for record in reader.deserialize::<CsvRecord>() {
            let record = record?;
            if session_id.map_or(true, |id| record.session_id == id) {
                dialed.insert(record.phone_number);
            }
        }
        Ok(dialed)
    }

    async fn flush(&mut self) -> Result<()> {
        self.writer.flush()?;
        Ok(())
    }

    async fn close(&mut self) -> Result<()> {
        self.writer.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tonescan_core::{DialStatus, ToneType};

    fn result(session_id: &str, number: &str, status: DialStatus) -> DialResult {
        DialResult::new(number, status, "test outcome").stamped(session_id)
    }

    #[tokio::test]
    async fn test_header_written_once() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("results.csv");

        {
            let mut sink = CsvSink::open(&path).expect("open");
            sink.write_result(&result("one", "5552345600", DialStatus::Busy))
                .await
                .expect("write");
            sink.close().await.expect("close");
        }
        {
            let mut sink = CsvSink::open(&path).expect("reopen");
            sink.write_result(&result("one", "5552345601", DialStatus::NoAnswer))
                .await
                .expect("write");
            sink.close().await.expect("close");
        }

        let contents = std::fs::read_to_string(&path).expect("read file");
        let headers = contents
            .lines()
            .filter(|line| line.starts_with("session_id"))
            .count();
        assert_eq!(headers, 1);
        assert_eq!(contents.lines().count(), 3);
    }

    #[tokio::test]
    async fn test_read_dialed_numbers() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("results.csv");

        let mut sink = CsvSink::open(&path).expect("open");
        sink.write_result(&result("one", "5552345600", DialStatus::Busy))
            .await
            .expect("write");
        sink.write_result(
            &result("one", "5552345601", DialStatus::Carrier).with_tone(true, ToneType::Modem),
        )
        .await
        .expect("write");
        sink.write_result(&result("two", "5552345699", DialStatus::Voice))
            .await
            .expect("write");

        let all = sink.read_dialed_numbers(None).await.expect("read");
        assert_eq!(all.len(), 3);

        let one = sink.read_dialed_numbers(Some("one")).await.expect("read");
        assert_eq!(one.len(), 2);
        assert!(one.contains("5552345601"));
    }

    #[tokio::test]
    async fn test_tone_type_serialized_when_present() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("results.csv");

        let mut sink = CsvSink::open(&path).expect("open");
        sink.write_result(
            &result("one", "5552345600", DialStatus::Carrier).with_tone(true, ToneType::Modem),
        )
        .await
        .expect("write");
        sink.close().await.expect("close");

        let contents = std::fs::read_to_string(&path).expect("read file");
        assert!(contents.contains("modem"));
        assert!(contents.contains("carrier"));
    }
}
