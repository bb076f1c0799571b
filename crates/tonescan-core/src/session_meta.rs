//! Session metadata and session-id generation.
//!
//! A session is one continuous or resumed dialing run. Its metadata record
//! carries running counters that only the dial session mutates; storage
//! receives read-only snapshots.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Metadata for one dialing session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionMetadata {
    /// Unique session token (short, e.g. "a3f5c2d1")
    pub session_id: String,
    /// When the session started
    pub start_time: DateTime<Utc>,
    /// When the session ended; None while running
    pub end_time: Option<DateTime<Utc>>,
    /// Telephony backend driving the session
    pub backend_kind: String,
    /// Storage sink receiving the results
    pub storage_kind: String,
    /// Pattern being dialed (e.g. "5552345-6")
    pub pattern: String,
    /// Calling code of the active country profile
    pub calling_code: String,
    /// Total dial attempts so far
    pub total_calls: u64,
    /// Attempts that reached a carrier, fax or voice answer
    pub successful_calls: u64,
    /// Attempts where a modem carrier was detected
    pub modem_detections: u64,
    /// Whether candidates are dialed in shuffled order
    pub randomized: bool,
}

impl SessionMetadata {
    /// Create metadata for a new session.
    ///
    /// Generates a short session id when none is supplied (resumed sessions
    /// pass the prior run's id to continue it).
    #[must_use]
    pub fn new(
        backend_kind: impl Into<String>,
        storage_kind: impl Into<String>,
        pattern: impl Into<String>,
        calling_code: impl Into<String>,
        randomized: bool,
        session_id: Option<String>,
    ) -> Self {
        Self {
            session_id: session_id.unwrap_or_else(generate_session_id),
            start_time: Utc::now(),
            end_time: None,
            backend_kind: backend_kind.into(),
            storage_kind: storage_kind.into(),
            pattern: pattern.into(),
            calling_code: calling_code.into(),
            total_calls: 0,
            successful_calls: 0,
            modem_detections: 0,
            randomized,
        }
    }

    /// Record one completed dial attempt.
    pub fn record_call(&mut self, success: bool, modem_detected: bool) {
        self.total_calls += 1;
        if success {
            self.successful_calls += 1;
        }
        if modem_detected {
            self.modem_detections += 1;
        }
    }

    /// Stamp the end time, closing the session.
    pub fn finalize(&mut self) {
        self.end_time = Some(Utc::now());
    }
}

/// Generate a short session id.
///
/// Uses the first 8 characters of a UUID4 for uniqueness while keeping it
/// readable in result files.
#[must_use]
pub fn generate_session_id() -> String {
    uuid::Uuid::new_v4().to_string()[..8].to_string()
}

/// Generate a session id based on the current timestamp.
///
/// Format: `YYYYMMDD-HHMMSS` (e.g. "20251115-143022").
#[must_use]
pub fn timestamp_session_id() -> String {
    Utc::now().format("%Y%m%d-%H%M%S").to_string()
}
