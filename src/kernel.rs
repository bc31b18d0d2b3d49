//! Alignment kernel boundary (§4.7). The real k-mer seeding/extension/
//! scoring engine is out of scope; `PassthroughKernel` is a deterministic
//! stand-in that echoes read ids so the driver's ordering and concurrency
//! properties are exercisable without a real aligner.

use crate::batch::BatchSeed;
use crate::input::ReadRecord;
use anyhow::Result;

/// What a batch run produced: bytes to append to the final output, and
/// whether the driver should keep going. `keep_going` is only ever `false`
/// for insert-size-discovery kernels signaling convergence.
pub struct BatchOutcome {
    pub bytes: Vec<u8>,
    pub keep_going: bool,
    pub aligned: u64,
    pub unmapped: u64,
}

impl BatchOutcome {
    fn empty() -> Self {
        BatchOutcome {
            bytes: Vec::new(),
            keep_going: true,
            aligned: 0,
            unmapped: 0,
        }
    }
}

/// Chosen once per batch at construction time (never branched on per-read
/// inside the hot loop, per the design's paired/unpaired specialization
/// note in §9).
pub trait AlignmentKernel: Send + Sync {
    fn run_unpaired(&self, reads: &[ReadRecord], seed: &BatchSeed) -> Result<BatchOutcome>;
    fn run_paired(&self, reads: &[ReadRecord], seed: &BatchSeed) -> Result<BatchOutcome>;
}

/// Deterministic stand-in: for each read, emits one line of the form
/// `<qid>\t<ipam-sum>\t<seq1-len>[\t<seq2-len>]`. Never fails, never asks
/// the driver to stop early.
pub struct PassthroughKernel;

impl PassthroughKernel {
    pub fn new() -> Self {
        PassthroughKernel
    }
}

impl Default for PassthroughKernel {
    fn default() -> Self {
        Self::new()
    }
}

impl AlignmentKernel for PassthroughKernel {
    fn run_unpaired(&self, reads: &[ReadRecord], seed: &BatchSeed) -> Result<BatchOutcome> {
        if reads.is_empty() {
            return Ok(BatchOutcome::empty());
        }
        let ipam_sum: u32 = seed.ipam.iter().map(|&v| v as u32).sum();
        let mut bytes = Vec::new();
        for read in reads {
            bytes.extend_from_slice(
                format!("{}\t{}\t{}\n", read.qid, ipam_sum, read.seq1.len()).as_bytes(),
            );
        }
        Ok(BatchOutcome {
            bytes,
            keep_going: true,
            aligned: reads.len() as u64,
            unmapped: 0,
        })
    }

    fn run_paired(&self, reads: &[ReadRecord], seed: &BatchSeed) -> Result<BatchOutcome> {
        if reads.is_empty() {
            return Ok(BatchOutcome::empty());
        }
        let ipam_sum: u32 = seed.ipam.iter().map(|&v| v as u32).sum();
        let mut bytes = Vec::new();
        for read in reads {
            let len2 = read.seq2.as_ref().map(|s| s.len()).unwrap_or(0);
            bytes.extend_from_slice(
                format!(
                    "{}\t{}\t{}\t{}\n",
                    read.qid,
                    ipam_sum,
                    read.seq1.len(),
                    len2
                )
                .as_bytes(),
            );
        }
        Ok(BatchOutcome {
            bytes,
            keep_going: true,
            aligned: reads.len() as u64,
            unmapped: 0,
        })
    }
}
