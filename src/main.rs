//! CLI entry point for the `shortmap` batched search driver.
//!
//! Thin `clap` front end: translates flags into a `RunConfig`, builds a
//! driver around the shipped `PassthroughKernel` stand-in, and runs it to
//! completion. Neither this binary nor its logging setup is part of the
//! driver's correctness surface (see the crate's module docs).

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::Parser;

use shortmap::config::SearchMode;
use shortmap::kernel::PassthroughKernel;
use shortmap::{RunConfig, SearchDriver};

/// Batched short-read search driver.
#[derive(Parser, Debug)]
#[command(name = "shortmap")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Input read stream (tab-delimited stand-in for FASTA/FASTQ/SRA).
    #[arg(short = 'i', long = "input")]
    input: PathBuf,

    /// Base path of the pre-built index (opaque; loader out of scope).
    #[arg(short = 'x', long = "index")]
    index: PathBuf,

    /// Final alignment output path.
    #[arg(short = 'o', long = "output")]
    output: PathBuf,

    /// Directory for per-batch spill/scratch files.
    #[arg(long = "temp-dir", default_value_os_t = std::env::temp_dir())]
    temp_dir: PathBuf,

    /// Memory cap in megabytes for the shared arena.
    #[arg(long = "mem-cap-mb", default_value_t = 4096)]
    mem_cap_mb: u64,

    /// Maximum reads (or pairs) per batch.
    #[arg(short = 'b', long = "batch-size", default_value_t = 100_000)]
    batch_size: u64,

    /// First batch_num to execute (1-based, inclusive).
    #[arg(long = "start-batch", default_value_t = 1)]
    start_batch: u64,

    /// Last batch_num to execute (inclusive).
    #[arg(long = "end-batch", default_value_t = u64::MAX)]
    end_batch: u64,

    /// Worker count; 1 selects the single-threaded path. 0 auto-detects
    /// from the available CPUs.
    #[arg(short = 'j', long = "threads", default_value_t = 1)]
    threads: u32,

    /// Per-read error budget.
    #[arg(short = 'n', long = "n-err", default_value_t = 2)]
    n_err: u32,

    /// Maximum accepted query length.
    #[arg(long = "max-qlen", default_value_t = 1024)]
    max_qlen: u32,

    /// Force paired-end search (input must have 2 columns).
    #[arg(long = "paired")]
    paired: bool,

    /// Force unpaired search (input must have 1 column).
    #[arg(long = "unpaired")]
    unpaired: bool,

    /// Expected paired fragment distance.
    #[arg(long = "pair-distance", default_value_t = 500)]
    pair_distance: u32,

    /// Allowed fuzz window around the pair distance.
    #[arg(long = "pair-fuzz", default_value_t = 50)]
    pair_fuzz: u32,

    /// Learn the paired fragment distance online; forces single-threaded.
    #[arg(long = "discover-insert-size")]
    discover_insert_size: bool,

    /// Result-configuration string (or alias: illumina, 454, solid).
    #[arg(long = "result-config", default_value = "0100")]
    result_config: String,

    /// Search mode.
    #[arg(long = "mode", value_enum, default_value_t = SearchMode::Default)]
    mode: SearchMode,

    /// Signed subject-area window start; negative requests reverse-strand
    /// scanning and swaps the result-config string (§4.2).
    #[arg(long = "sa-start", default_value_t = 1)]
    sa_start: i64,

    /// Signed subject-area window end.
    #[arg(long = "sa-end", default_value_t = 1_000_000_000)]
    sa_end: i64,

    /// Randomize tie-breaking among equally-good hits.
    #[arg(long = "randomize")]
    randomize: bool,

    /// Seed for `--randomize`.
    #[arg(long = "seed", default_value_t = 0)]
    seed: u64,

    /// Skip reads with no reported alignment.
    #[arg(long = "skip-unmapped")]
    skip_unmapped: bool,

    /// Use query ids (rather than ordinal) in output.
    #[arg(long = "use-query-ids")]
    use_query_ids: bool,

    /// Use subject ids (rather than ordinal) in output.
    #[arg(long = "use-subject-ids")]
    use_subject_ids: bool,

    /// Repeat-region threshold.
    #[arg(long = "repeat-threshold", default_value_t = 10)]
    repeat_threshold: u32,

    /// Maximum results reported per read.
    #[arg(long = "results-per-read", default_value_t = 10)]
    results_per_read: u32,

    /// Only advance `batch_num` once a counted batch is exactly full.
    #[arg(long = "strict-batch")]
    strict_batch: bool,
}

impl Args {
    fn into_run_config(self) -> Result<RunConfig> {
        let num_workers = if self.threads == 0 {
            num_cpus::get() as u32
        } else {
            self.threads
        };

        Ok(RunConfig {
            mem_cap_bytes: self
                .mem_cap_mb
                .checked_mul(1024 * 1024)
                .context("--mem-cap-mb overflowed bytes")?,
            batch_limit: self.batch_size,
            start_batch: self.start_batch,
            end_batch: self.end_batch,
            num_workers,
            n_err: self.n_err,
            max_qlen: self.max_qlen,
            force_paired: self.paired,
            force_unpaired: self.unpaired,
            pair_distance: self.pair_distance,
            pair_fuzz: self.pair_fuzz,
            insert_size_discovery: self.discover_insert_size,
            result_config: self.result_config,
            search_mode: self.mode,
            sa_start: self.sa_start,
            sa_end: self.sa_end,
            randomize: self.randomize,
            seed: self.seed,
            input_path: self.input,
            index_base: self.index,
            temp_dir: self.temp_dir,
            output_path: self.output,
            skip_unmapped: self.skip_unmapped,
            use_query_ids: self.use_query_ids,
            use_subject_ids: self.use_subject_ids,
            repeat_threshold: self.repeat_threshold,
            results_per_read: self.results_per_read,
            strict_batch: self.strict_batch,
            poll_interval: Duration::from_secs(1),
        })
    }
}

fn main() -> Result<()> {
    env_logger::init();

    let args = Args::parse();
    if !args.input.exists() {
        bail!("input file not found: {}", args.input.display());
    }

    let config = args.into_run_config()?;
    let kernel = Arc::new(PassthroughKernel::new());

    let driver = SearchDriver::new(config, kernel).context("invalid run configuration")?;
    driver.run().context("search driver failed")?;

    log::info!("done");
    Ok(())
}
