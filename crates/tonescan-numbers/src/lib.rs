//! Tonescan number-space engine.
//!
//! Compiles a partial phone-number pattern plus a country profile into a
//! validated, lazily enumerable sequence of candidate numbers, and derives
//! the remaining work set when a run is resumed.
//!
//! # Modules
//!
//! - [`profile`] - Per-country validation and formatting rules
//! - [`pattern`] - Eagerly validated partial patterns
//! - [`space`] - Lazy candidate enumeration, sequential or seeded-shuffle order
//! - [`resume`] - Pattern inference and remaining-set computation
//! - [`error`] - Validation and resume error types

pub mod error;
pub mod pattern;
pub mod profile;
pub mod resume;
pub mod space;

pub use error::{ResumeError, ValidationError};
pub use pattern::PatternSpec;
pub use profile::CountryProfile;
pub use resume::{infer_pattern, ResumeIndex};
pub use space::{DialOrder, NumberSpace};
