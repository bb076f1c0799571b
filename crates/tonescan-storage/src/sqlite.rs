//! SQLite result sink.
//!
//! The default sink. Embedded migrations create the schema on first open;
//! every dial appends a `dial_results` row and upserts the owning
//! `sessions` row, so the database is consistent after a hard kill.

use crate::error::{Result, StorageError};
use crate::sink::ResultSink;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Row, SqlitePool};
use std::collections::HashSet;
use std::path::Path;
use tonescan_core::{DialResult, SessionMetadata, StorageKind};

static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("./migrations");

/// [`ResultSink`] over an SQLite database file.
pub struct SqliteSink {
    pool: SqlitePool,
}

impl SqliteSink {
    /// Open (or create) a database file and run pending migrations.
    ///
    /// # Errors
    /// Open and migration failures as [`StorageError`].
    pub async fn open(path: &Path) -> Result<Self> {
        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true);
        Self::connect(options).await
    }

    /// Open an in-memory database. Used by tests.
    ///
    /// # Errors
    /// Migration failures as [`StorageError`].
    pub async fn open_in_memory() -> Result<Self> {
        Self::connect(SqliteConnectOptions::new().in_memory(true)).await
    }

    async fn connect(options: SqliteConnectOptions) -> Result<Self> {
        // One connection: an in-memory database per connection otherwise
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await?;
        MIGRATOR.run(&pool).await?;
        Ok(Self { pool })
    }

    /// Load a session's metadata by id.
    ///
    /// # Errors
    /// Query failures and malformed rows as [`StorageError`].
    pub async fn get_session(&self, session_id: &str) -> Result<Option<SessionMetadata>> {
        let row = sqlx::query(
            "SELECT session_id, start_time, end_time, backend_kind, storage_kind,
                    pattern, calling_code, total_calls, successful_calls,
                    modem_detections, randomized
             FROM sessions WHERE session_id = ?",
        )
        .bind(session_id)
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        Ok(Some(SessionMetadata {
            session_id: row.try_get("session_id")?,
            start_time: row.try_get::<DateTime<Utc>, _>("start_time")?,
            end_time: row.try_get::<Option<DateTime<Utc>>, _>("end_time")?,
            backend_kind: row.try_get("backend_kind")?,
            storage_kind: row.try_get("storage_kind")?,
            pattern: row.try_get("pattern")?,
            calling_code: row.try_get("calling_code")?,
            total_calls: to_counter(row.try_get("total_calls")?),
            successful_calls: to_counter(row.try_get("successful_calls")?),
            modem_detections: to_counter(row.try_get("modem_detections")?),
            randomized: row.try_get("randomized")?,
        }))
    }

    /// Id of the most recently started session, if any.
    ///
    /// # Errors
    /// Query failures as [`StorageError`].
    pub async fn latest_session_id(&self) -> Result<Option<String>> {
        let row = sqlx::query("SELECT session_id FROM sessions ORDER BY start_time DESC LIMIT 1")
            .fetch_optional(&self.pool)
            .await?;
        Ok(match row {
            Some(row) => Some(row.try_get("session_id")?),
            None => None,
        })
    }

    /// All results recorded for a session, in dial order.
    ///
    /// # Errors
    /// Query failures and malformed rows as [`StorageError`].
    pub async fn session_results(&self, session_id: &str) -> Result<Vec<DialResult>> {
        let rows = sqlx::query(
            "SELECT session_id, phone_number, status, success, message,
                    carrier_detected, tone_type, timestamp
             FROM dial_results WHERE session_id = ? ORDER BY id",
        )
        .bind(session_id)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|row| {
                let status: String = row.try_get("status")?;
                let tone_type: Option<String> = row.try_get("tone_type")?;
                Ok(DialResult {
                    session_id: row.try_get("session_id")?,
                    phone_number: row.try_get("phone_number")?,
                    status: status.parse().map_err(StorageError::Malformed)?,
                    success: row.try_get("success")?,
                    message: row.try_get("message")?,
                    carrier_detected: row.try_get("carrier_detected")?,
                    tone_type: tone_type
                        .map(|t| t.parse().map_err(StorageError::Malformed))
                        .transpose()?,
                    timestamp: row.try_get::<DateTime<Utc>, _>("timestamp")?,
                })
            })
            .collect()
    }
}

fn to_counter(value: i64) -> u64 {
    u64::try_from(value).unwrap_or(0)
}

fn from_counter(value: u64) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

#[async_trait]
impl ResultSink for SqliteSink {
    fn kind(&self) -> StorageKind {
        StorageKind::Sqlite
    }

    async fn write_result(&mut self, result: &DialResult) -> Result<()> {
        sqlx::query(
            "INSERT INTO dial_results
                (session_id, phone_number, status, success, message,
                 carrier_detected, tone_type, timestamp)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&result.session_id)
        .bind(&result.phone_number)
        .bind(result.status.to_string())
        .bind(result.success)
        .bind(&result.message)
        .bind(result.carrier_detected)
        .bind(result.tone_type.map(|t| t.to_string()))
        .bind(result.timestamp)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn write_session(&mut self, session: &SessionMetadata) -> Result<()> {
        sqlx::query(
            "INSERT OR REPLACE INTO sessions
                (session_id, start_time, end_time, backend_kind, storage_kind,
                 pattern, calling_code, total_calls, successful_calls,
                 modem_detections, randomized)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&session.session_id)
        .bind(session.start_time)
        .bind(session.end_time)
        .bind(&session.backend_kind)
        .bind(&session.storage_kind)
        .bind(&session.pattern)
        .bind(&session.calling_code)
        .bind(from_counter(session.total_calls))
        .bind(from_counter(session.successful_calls))
        .bind(from_counter(session.modem_detections))
        .bind(session.randomized)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn read_dialed_numbers(&self, session_id: Option<&str>) -> Result<HashSet<String>> {
        let rows = match session_id {
            Some(id) => {
                sqlx::query("SELECT DISTINCT phone_number FROM dial_results WHERE session_id = ?")
                    .bind(id)
                    .fetch_all(&self.pool)
                    .await?
            }
            None => {
                sqlx::query("SELECT DISTINCT phone_number FROM dial_results")
                    .fetch_all(&self.pool)
                    .await?
            }
        };

        rows.into_iter()
            .map(|row| Ok(row.try_get("phone_number")?))
            .collect()
    }

    async fn flush(&mut self) -> Result<()> {
        // Every write autocommits
        Ok(())
    }

    async fn close(&mut self) -> Result<()> {
        self.pool.close().await;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tonescan_core::{DialStatus, ToneType};

    fn carrier_result(session_id: &str, number: &str) -> DialResult {
        DialResult::new(number, DialStatus::Carrier, "Modem carrier at 2400 bps")
            .with_tone(true, ToneType::Modem)
            .stamped(session_id)
    }

    fn test_session(id: &str) -> SessionMetadata {
        SessionMetadata::new(
            "simulated",
            "sqlite",
            "55523456",
            "1",
            false,
            Some(id.to_string()),
        )
    }

    #[tokio::test]
    async fn test_result_round_trip() {
        let mut sink = SqliteSink::open_in_memory().await.expect("open");
        let result = carrier_result("abc12345", "5552345678");
        sink.write_result(&result).await.expect("write");

        let stored = sink.session_results("abc12345").await.expect("read");
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].phone_number, "5552345678");
        assert_eq!(stored[0].status, DialStatus::Carrier);
        assert!(stored[0].carrier_detected);
        assert_eq!(stored[0].tone_type, Some(ToneType::Modem));
    }

    #[tokio::test]
    async fn test_session_upsert() {
        let mut sink = SqliteSink::open_in_memory().await.expect("open");
        let mut session = test_session("abc12345");
        sink.write_session(&session).await.expect("write");

        session.record_call(true, true);
        session.finalize();
        sink.write_session(&session).await.expect("rewrite");

        let stored = sink
            .get_session("abc12345")
            .await
            .expect("get")
            .expect("session exists");
        assert_eq!(stored.total_calls, 1);
        assert_eq!(stored.modem_detections, 1);
        assert!(stored.end_time.is_some());
        assert_eq!(stored.pattern, "55523456");
    }

    #[tokio::test]
    async fn test_missing_session_is_none() {
        let sink = SqliteSink::open_in_memory().await.expect("open");
        assert!(sink.get_session("nope").await.expect("get").is_none());
        assert!(sink.latest_session_id().await.expect("latest").is_none());
    }

    #[tokio::test]
    async fn test_read_dialed_numbers_filters_by_session() {
        let mut sink = SqliteSink::open_in_memory().await.expect("open");
        for number in ["5552345600", "5552345601"] {
            sink.write_result(&carrier_result("one", number))
                .await
                .expect("write");
        }
        sink.write_result(&carrier_result("two", "5552345699"))
            .await
            .expect("write");

        let all = sink.read_dialed_numbers(None).await.expect("read all");
        assert_eq!(all.len(), 3);

        let one = sink
            .read_dialed_numbers(Some("one"))
            .await
            .expect("read one");
        assert_eq!(one.len(), 2);
        assert!(one.contains("5552345600"));
        assert!(!one.contains("5552345699"));
    }

    #[tokio::test]
    async fn test_duplicate_dials_deduplicated() {
        let mut sink = SqliteSink::open_in_memory().await.expect("open");
        for _ in 0..3 {
            sink.write_result(&carrier_result("one", "5552345600"))
                .await
                .expect("write");
        }
        let dialed = sink.read_dialed_numbers(None).await.expect("read");
        assert_eq!(dialed.len(), 1);
    }

    #[tokio::test]
    async fn test_latest_session_id() {
        let mut sink = SqliteSink::open_in_memory().await.expect("open");
        let older = test_session("older111");
        sink.write_session(&older).await.expect("write");

        // Later start_time wins
        let mut newer = test_session("newer222");
        newer.start_time = older.start_time + chrono::Duration::seconds(5);
        sink.write_session(&newer).await.expect("write");

        assert_eq!(
            sink.latest_session_id().await.expect("latest").as_deref(),
            Some("newer222")
        );
    }

    #[tokio::test]
    async fn test_file_database_persists() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("results.db");

        {
            let mut sink = SqliteSink::open(&path).await.expect("open");
            sink.write_result(&carrier_result("abc12345", "5552345678"))
                .await
                .expect("write");
            sink.close().await.expect("close");
        }

        let sink = SqliteSink::open(&path).await.expect("reopen");
        let dialed = sink.read_dialed_numbers(None).await.expect("read");
        assert!(dialed.contains("5552345678"));
    }
}
