//! Error taxonomy for the search driver.
//!
//! Mirrors the kinds distinguished in the design: configuration mistakes are
//! caught before any work starts, input mismatches are fatal at the point of
//! detection, and worker/resource failures abort the run. Info-level skips
//! (a batch outside `[start_batch, end_batch]`) are not errors and are never
//! represented here; they are plain log lines.

use thiserror::Error;

/// Errors that can abort a [`crate::driver::SearchDriver::run`].
#[derive(Error, Debug)]
pub enum DriverError {
    /// A `RunConfig` field failed validation before any batch was built.
    #[error("invalid configuration: {0}")]
    Validation(String),

    /// The input stream's shape didn't match what was requested (column
    /// count, malformed records, and the like).
    #[error("input error: {0}")]
    Input(String),

    /// The memory arena could not satisfy an allocation within its cap.
    #[error("resource exhausted: {0}")]
    ResourceExhausted(String),

    /// The alignment kernel reported a failure while processing a batch.
    #[error("worker failed on batch {batch_oid}: {source}")]
    Worker {
        batch_oid: u64,
        #[source]
        source: anyhow::Error,
    },

    /// A worker thread panicked instead of returning an error.
    #[error("worker thread for batch {batch_oid} panicked")]
    WorkerPanic { batch_oid: u64 },

    /// I/O failure touching temp files or the final output.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type DriverResult<T> = Result<T, DriverError>;
