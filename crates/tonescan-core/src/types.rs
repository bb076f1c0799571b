//! Shared types used across the Tonescan application.
//!
//! This module defines the enums that classify dial outcomes and the
//! per-call [`DialResult`] record that backends produce.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Outcome classification for a single dial attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DialStatus {
    /// Line rang but was never answered before the dial ceiling
    Ringing,
    /// Busy signal
    Busy,
    /// No answer (ringout or remote hangup without carrier)
    NoAnswer,
    /// Data carrier answered (modem handshake)
    Carrier,
    /// A human voice answered
    Voice,
    /// Fax machine answered
    Fax,
    /// The attempt failed (no dial tone, provider failure, bad number)
    Error,
    /// No terminal result before the configured ceiling
    Timeout,
}

impl DialStatus {
    /// Whether this status counts as a successful contact.
    ///
    /// Carrier, fax and voice answers are successes; everything else is not.
    #[must_use]
    pub fn is_success(self) -> bool {
        matches!(self, Self::Carrier | Self::Voice | Self::Fax)
    }
}

impl fmt::Display for DialStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Ringing => "ringing",
            Self::Busy => "busy",
            Self::NoAnswer => "no_answer",
            Self::Carrier => "carrier",
            Self::Voice => "voice",
            Self::Fax => "fax",
            Self::Error => "error",
            Self::Timeout => "timeout",
        };
        write!(f, "{s}")
    }
}

impl std::str::FromStr for DialStatus {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "ringing" => Ok(Self::Ringing),
            "busy" => Ok(Self::Busy),
            "no_answer" => Ok(Self::NoAnswer),
            "carrier" => Ok(Self::Carrier),
            "voice" => Ok(Self::Voice),
            "fax" => Ok(Self::Fax),
            "error" => Ok(Self::Error),
            "timeout" => Ok(Self::Timeout),
            other => Err(format!("unknown dial status '{other}'")),
        }
    }
}

/// Tone classification of an answered call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToneType {
    /// Data modem carrier
    Modem,
    /// Fax CNG/CED tone
    Fax,
    /// Human voice
    Voice,
    /// Answered but unclassifiable
    Unknown,
}

impl fmt::Display for ToneType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Modem => "modem",
            Self::Fax => "fax",
            Self::Voice => "voice",
            Self::Unknown => "unknown",
        };
        write!(f, "{s}")
    }
}

impl std::str::FromStr for ToneType {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "modem" => Ok(Self::Modem),
            "fax" => Ok(Self::Fax),
            "voice" => Ok(Self::Voice),
            "unknown" => Ok(Self::Unknown),
            other => Err(format!("unknown tone type '{other}'")),
        }
    }
}

/// Kinds of telephony backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackendKind {
    /// Hayes-compatible modem on a serial line
    Modem,
    /// Cloud voice-calling REST provider
    CloudVoice,
    /// Weighted-random simulation, no I/O
    Simulated,
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Modem => "modem",
            Self::CloudVoice => "cloud_voice",
            Self::Simulated => "simulated",
        };
        write!(f, "{s}")
    }
}

/// Kinds of result storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StorageKind {
    /// Append-only CSV file
    Csv,
    /// SQLite database
    Sqlite,
    /// Counts results but writes nothing
    DryRun,
}

impl fmt::Display for StorageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Csv => "csv",
            Self::Sqlite => "sqlite",
            Self::DryRun => "dry-run",
        };
        write!(f, "{s}")
    }
}

impl std::str::FromStr for StorageKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "csv" => Ok(Self::Csv),
            "sqlite" => Ok(Self::Sqlite),
            "dry-run" | "dry_run" => Ok(Self::DryRun),
            other => Err(format!("unknown storage kind '{other}'")),
        }
    }
}

/// Result of one dial attempt.
///
/// Created exactly once by a telephony backend. The session stamps the
/// session id with [`DialResult::stamped`] before forwarding the record to
/// storage; nothing mutates a result after that.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DialResult {
    /// Session this result belongs to (stamped by the dial session)
    pub session_id: String,
    /// The number that was dialed, in digit form
    pub phone_number: String,
    /// Outcome classification
    pub status: DialStatus,
    /// Whether the attempt counts as a successful contact
    pub success: bool,
    /// Human-readable detail (e.g. "Modem carrier at 28800 bps (ARQ/V34)")
    pub message: String,
    /// Whether a data carrier was detected
    pub carrier_detected: bool,
    /// Tone classification of an answered call, if any
    pub tone_type: Option<ToneType>,
    /// When the attempt completed
    pub timestamp: DateTime<Utc>,
}

impl DialResult {
    /// Create a result for a dial attempt.
    ///
    /// `success` is derived from the status; carrier detection and tone
    /// default to unset and are filled by the backend when known.
    #[must_use]
    pub fn new(phone_number: impl Into<String>, status: DialStatus, message: impl Into<String>) -> Self {
        Self {
            session_id: String::new(),
            phone_number: phone_number.into(),
            status,
            success: status.is_success(),
            message: message.into(),
            carrier_detected: false,
            tone_type: None,
            timestamp: Utc::now(),
        }
    }

    /// Attach carrier detection and tone classification.
    #[must_use]
    pub fn with_tone(mut self, carrier_detected: bool, tone_type: ToneType) -> Self {
        self.carrier_detected = carrier_detected;
        self.tone_type = Some(tone_type);
        self
    }

    /// Stamp the result with the owning session id.
    #[must_use]
    pub fn stamped(mut self, session_id: &str) -> Self {
        self.session_id = session_id.to_string();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_status_success() {
        assert!(DialStatus::Carrier.is_success());
        assert!(DialStatus::Voice.is_success());
        assert!(DialStatus::Fax.is_success());
        assert!(!DialStatus::Busy.is_success());
        assert!(!DialStatus::NoAnswer.is_success());
        assert!(!DialStatus::Timeout.is_success());
    }

    #[test]
    fn test_status_round_trip() {
        for status in [
            DialStatus::Ringing,
            DialStatus::Busy,
            DialStatus::NoAnswer,
            DialStatus::Carrier,
            DialStatus::Voice,
            DialStatus::Fax,
            DialStatus::Error,
            DialStatus::Timeout,
        ] {
            let parsed = DialStatus::from_str(&status.to_string()).expect("parse status");
            assert_eq!(parsed, status);
        }
        assert!(DialStatus::from_str("answered").is_err());
    }

    #[test]
    fn test_dial_result_stamping() {
        let result = DialResult::new("5552345678", DialStatus::Carrier, "Carrier detected")
            .with_tone(true, ToneType::Modem)
            .stamped("a3f5c2d1");

        assert_eq!(result.session_id, "a3f5c2d1");
        assert!(result.success);
        assert!(result.carrier_detected);
        assert_eq!(result.tone_type, Some(ToneType::Modem));
    }
}
