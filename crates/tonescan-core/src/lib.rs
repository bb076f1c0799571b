//! Tonescan Core - Foundation crate for the Tonescan war dialer.
//!
//! This crate provides shared types, error handling and configuration
//! management that all other Tonescan crates depend on.
//!
//! # Modules
//!
//! - [`error`] - Central error types using thiserror
//! - [`config`] - TOML-based configuration with XDG paths
//! - [`types`] - Shared enums and the per-call [`DialResult`](types::DialResult)
//! - [`session_meta`] - Session metadata and session-id generation
//!
//! # Example
//!
//! ```rust
//! use tonescan_core::{AppConfig, DialStatus};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = AppConfig::default();
//! assert_eq!(config.modem.baud_rate, 57_600);
//! assert!(!DialStatus::Busy.is_success());
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]

pub mod config;
pub mod error;
pub mod session_meta;
pub mod types;

// Re-export commonly used types
pub use config::{AppConfig, CloudConfig, ModemConfig, SessionConfig, StorageConfig};
pub use error::{ConfigError, ConfigResult, Result, TonescanError};
pub use session_meta::{generate_session_id, timestamp_session_id, SessionMetadata};
pub use types::{BackendKind, DialResult, DialStatus, StorageKind, ToneType};
