//! Tonescan telephony backends.
//!
//! One capability, three variants: a Hayes-compatible modem driven over a
//! serial line, a cloud voice-calling REST provider, and a weighted-random
//! simulation for tests and demos. All variants implement
//! [`TelephonyBackend`]; the dial session drives exactly one of them, one
//! call at a time.
//!
//! # Modules
//!
//! - [`backend`] - The `TelephonyBackend` trait and backend factory
//! - [`transport`] - Serial line contract and the `tokio-serial` implementation
//! - [`modem`] - AT-command protocol state machine
//! - [`cloud`] - REST call placement and status polling
//! - [`simulated`] - No-I/O weighted-random outcomes
//! - [`error`] - Backend error types (fatal conditions only; call outcomes
//!   are data, not errors)

pub mod backend;
pub mod cloud;
pub mod error;
pub mod modem;
pub mod simulated;
pub mod transport;

pub use backend::{create_backend, TelephonyBackend};
pub use cloud::{CallStatus, CloudVoiceBackend, RestVoiceApi, VoiceApi};
pub use error::{BackendError, Result};
pub use modem::{ModemBackend, ModemState};
pub use simulated::SimulatedBackend;
pub use transport::{SerialTransport, TtyTransport};
