//! shortmap — batched, order-preserving search driver for a short-read
//! sequence aligner.
//!
//! This crate implements the driver described in the design: it partitions
//! an input read stream into batches, runs per-batch alignment concurrently
//! under a bounded worker budget, and appends batch outputs to the final
//! output strictly in batch-index order regardless of completion order.
//!
//! The alignment kernel itself (k-mer seeding, extension, scoring) and the
//! real sequence decoders (FASTA/FASTQ/SRA) are out of scope; this crate
//! ships minimal, deterministic stand-ins (`kernel::PassthroughKernel`,
//! `input::DelimitedInputSource`) behind the same trait boundaries a real
//! implementation would use, so the driver's ordering and concurrency
//! properties are exercisable end to end.

pub mod arena;
pub mod batch;
pub mod config;
pub mod driver;
pub mod error;
pub mod input;
pub mod ipam;
pub mod kernel;
pub mod stats;
pub mod tempstore;

pub use config::{RunConfig, SearchMode};
pub use driver::SearchDriver;
pub use error::{DriverError, DriverResult};
