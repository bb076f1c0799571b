//! Result storage for Tonescan.
//!
//! Three interchangeable sinks behind [`ResultSink`]: an SQLite database
//! (the default, and the only one that supports session lookup), an
//! append-only CSV file, and a dry-run counter. Results are written one
//! at a time as calls complete so an interrupted run loses at most the
//! in-flight call.

pub mod csv_file;
pub mod dry_run;
pub mod error;
pub mod sink;
pub mod sqlite;

pub use csv_file::CsvSink;
pub use dry_run::DryRunSink;
pub use error::{Result, StorageError};
pub use sink::{create_sink, ResultSink};
pub use sqlite::SqliteSink;
