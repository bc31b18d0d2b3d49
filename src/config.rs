//! Run configuration for the search driver.
//!
//! Mirrors the teacher's `Config` (distances, thresholds, tag names) but for
//! the batched aligner: everything the CLI binary can set, bundled into one
//! immutable value that the driver validates once before any batch runs.

use crate::error::{DriverError, DriverResult};
use std::path::PathBuf;

/// Lower/upper bounds enforced by [`RunConfig::validate`].
pub const MIN_RES_LIMIT: u32 = 1;
pub const MAX_RES_LIMIT: u32 = 1_000;
pub const MAX_PAIR_FUZZ: u32 = 100_000;
pub const MIN_QLEN: u32 = 1;
pub const MAX_QLEN: u32 = 10_000;
pub const MAX_N_ERR: u32 = 16;

/// Highest valid index into an IPAM vector; vectors are `MAX_IPAM_IDX + 1` long.
pub const MAX_IPAM_IDX: usize = 3;

/// Search mode, selecting how the (out-of-scope) alignment kernel scores hits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum SearchMode {
    Default,
    SumErr,
    Partial,
    BoundErr,
}

impl std::fmt::Display for SearchMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            SearchMode::Default => "default",
            SearchMode::SumErr => "sum-err",
            SearchMode::Partial => "partial",
            SearchMode::BoundErr => "bound-err",
        };
        write!(f, "{s}")
    }
}

/// Immutable run-wide configuration, built once by the CLI (or a test) and
/// handed to [`crate::driver::SearchDriver::new`].
#[derive(Debug, Clone)]
pub struct RunConfig {
    /// Memory cap in bytes for the shared arena.
    pub mem_cap_bytes: u64,
    /// Maximum reads (or pairs, pre-doubling) per batch.
    pub batch_limit: u64,
    /// First batch_num to execute (inclusive, 1-based).
    pub start_batch: u64,
    /// Last batch_num to execute (inclusive).
    pub end_batch: u64,
    /// Worker count; 1 selects the single-threaded path.
    pub num_workers: u32,
    /// Per-read error budget.
    pub n_err: u32,
    /// Maximum query length accepted.
    pub max_qlen: u32,
    /// Force paired-end input (columns == 2).
    pub force_paired: bool,
    /// Force unpaired input (columns == 1).
    pub force_unpaired: bool,
    /// Expected paired fragment distance.
    pub pair_distance: u32,
    /// Allowed fuzz window around `pair_distance`.
    pub pair_fuzz: u32,
    /// Online insert-size discovery: learns the paired fragment distance
    /// from early batches and may end the run early. Forces the
    /// single-threaded path regardless of `num_workers` (§9).
    pub insert_size_discovery: bool,
    /// Result-configuration string (raw, pre-alias-resolution, pre-swap).
    pub result_config: String,
    /// Search mode.
    pub search_mode: SearchMode,
    /// Signed subject-area window start.
    pub sa_start: i64,
    /// Signed subject-area window end.
    pub sa_end: i64,
    /// Enable randomized tie-breaking among equally-good hits.
    pub randomize: bool,
    /// Seed for the randomization above.
    pub seed: u64,
    /// Path to the input read stream (FASTA/FASTQ/SRA in the real system;
    /// see the `DelimitedInputSource` stand-in in `input.rs`).
    pub input_path: PathBuf,
    /// Base path of the pre-built index (multi-file; opaque).
    pub index_base: PathBuf,
    /// Directory for scratch/spill files.
    pub temp_dir: PathBuf,
    /// Final output path.
    pub output_path: PathBuf,
    /// Skip reads with no reported alignment.
    pub skip_unmapped: bool,
    /// Use query ids (vs. ordinal) in output.
    pub use_query_ids: bool,
    /// Use subject ids (vs. ordinal) in output.
    pub use_subject_ids: bool,
    /// Repeat-region threshold.
    pub repeat_threshold: u32,
    /// Maximum results reported per read.
    pub results_per_read: u32,
    /// When true, a batch only counts toward `batch_num` once it is exactly
    /// `batch_limit` reads (the final short batch is exempt).
    pub strict_batch: bool,
    /// Coarse admission-wait interval for the multi-threaded path; exposed
    /// here (rather than hardcoded) so tests can shrink it.
    pub poll_interval: std::time::Duration,
}

impl RunConfig {
    /// Validate per §4.5. Returns the first failing condition found, in the
    /// order the design lists them.
    pub fn validate(&self) -> DriverResult<()> {
        if self.mem_cap_bytes == 0 {
            return Err(DriverError::Validation("memory limit must be > 0".into()));
        }
        if self.batch_limit == 0 {
            return Err(DriverError::Validation("batch limit must be > 0".into()));
        }
        if self.start_batch < 1 {
            return Err(DriverError::Validation("start batch must be >= 1".into()));
        }
        if self.end_batch < self.start_batch {
            return Err(DriverError::Validation(
                "end batch must be >= start batch".into(),
            ));
        }
        if self.results_per_read < MIN_RES_LIMIT || self.results_per_read > MAX_RES_LIMIT {
            return Err(DriverError::Validation(format!(
                "results-per-read limit must be in [{MIN_RES_LIMIT}, {MAX_RES_LIMIT}], got {}",
                self.results_per_read
            )));
        }
        if self.pair_distance == 0 {
            return Err(DriverError::Validation("pair distance must be > 0".into()));
        }
        if self.pair_fuzz > self.pair_distance {
            return Err(DriverError::Validation(
                "pair fuzz cannot exceed pair distance".into(),
            ));
        }
        if self.pair_fuzz > MAX_PAIR_FUZZ {
            return Err(DriverError::Validation(format!(
                "pair fuzz cannot exceed {MAX_PAIR_FUZZ}"
            )));
        }
        if self.max_qlen < MIN_QLEN || self.max_qlen > MAX_QLEN {
            return Err(DriverError::Validation(format!(
                "max query length must be in [{MIN_QLEN}, {MAX_QLEN}], got {}",
                self.max_qlen
            )));
        }
        if self.n_err > MAX_N_ERR {
            return Err(DriverError::Validation(format!(
                "error budget cannot exceed {MAX_N_ERR}, got {}",
                self.n_err
            )));
        }
        if self.force_paired && self.force_unpaired {
            return Err(DriverError::Validation(
                "cannot request both paired and unpaired search".into(),
            ));
        }
        if self.sa_start == 0 {
            return Err(DriverError::Validation(
                "subject-area start cannot be zero".into(),
            ));
        }
        if self.sa_start > 0 && self.sa_end < self.sa_start {
            return Err(DriverError::Validation(
                "subject-area end must be >= start for a forward window".into(),
            ));
        }
        if self.sa_start < 0 && self.sa_end > self.sa_start {
            return Err(DriverError::Validation(
                "subject-area end must be <= start for a reverse window".into(),
            ));
        }
        Ok(())
    }

    /// The batch-size cap actually applied: doubled under force-paired,
    /// since each logical read there is a pair and the limit counts columns.
    pub fn effective_batch_limit(&self) -> u64 {
        if self.force_paired {
            self.batch_limit * 2
        } else {
            self.batch_limit
        }
    }

    /// Worker count actually used by the driver: insert-size discovery
    /// forces the single-threaded path regardless of the configured value
    /// (§9 — "must not silently disable this path when optimizing").
    pub fn effective_num_workers(&self) -> u32 {
        if self.insert_size_discovery {
            1
        } else {
            self.num_workers
        }
    }
}
