//! The Tonescan dial session engine.
//!
//! Ties the other crates together: pulls candidates from a number space
//! (or a resume plan), drives one telephony backend sequentially, stamps
//! and persists every result, and reacts to pause/cancel signals at
//! number boundaries.

pub mod control;
pub mod error;
pub mod resume;
pub mod session;

pub use control::{control_channel, ControlSignal, SessionHandle};
pub use error::{Result, SessionError};
pub use resume::{prepare_resume, ResumePlan};
pub use session::{DialSession, SessionReport};
