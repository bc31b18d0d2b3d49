//! Batch and Batch Factory (§3, §4.1 algorithm step 3b).
//!
//! A `Batch` is a contiguous slice of the input, stamped with a dense
//! `batch_oid` and a (possibly slower-advancing, under `strict_batch`)
//! `batch_num`. `BatchSeed` is the immutable, shareable context every batch
//! runs against.

use crate::arena::MemoryArena;
use crate::config::RunConfig;
use crate::input::{InputSource, ReadRecord};
use crate::kernel::AlignmentKernel;
use crate::stats::Stats;
use crate::error::DriverResult;
use parking_lot::Mutex;
use std::sync::Arc;

/// Run-wide, per-batch-shared context. Cheap to clone (everything inside is
/// an `Arc` or `Copy`).
#[derive(Clone)]
pub struct BatchSeed {
    pub config: Arc<RunConfig>,
    /// The (possibly swapped, per §4.2) IPAM admissibility vector.
    pub ipam: [u8; crate::config::MAX_IPAM_IDX + 1],
    /// The canonical result-config string actually parsed (post-alias,
    /// post-swap).
    pub result_config: String,
    pub arena: MemoryArena,
    pub stats: Arc<Stats>,
    pub kernel: Arc<dyn AlignmentKernel>,
    /// Pre-allocated scratch buffers, only populated on the single-threaded
    /// path (§4.1.1, §9). `None` in the multi-threaded path, where each
    /// worker allocates its own scratch from the shared arena instead. Held
    /// as live arena handles (not copied out) so the reserved budget stays
    /// charged for the driver's lifetime.
    pub scratch_unpaired: Option<Arc<Mutex<crate::arena::ArenaHandle>>>,
    pub scratch_paired: Option<Arc<Mutex<crate::arena::ArenaHandle>>>,
}

/// A contiguous slice of the input read stream, processed as a unit.
pub struct Batch {
    pub batch_oid: u64,
    pub batch_num: u64,
    pub start_qid: u64,
    pub reads: Vec<ReadRecord>,
    pub paired: bool,
    end_qid: Option<u64>,
}

impl Batch {
    /// The query id one past the last read this batch consumed. Only valid
    /// after the batch has been constructed from the input source (it
    /// always is, by the time `BatchFactory::next` returns one).
    pub fn end_qid(&self) -> u64 {
        self.end_qid.unwrap_or(self.start_qid)
    }

    /// True when this batch holds exactly `limit` reads — the condition
    /// under which `strict_batch` lets `batch_num` advance (§4.1 step 3f).
    pub fn filled_exactly(&self, limit: u64) -> bool {
        self.reads.len() as u64 == limit
    }
}

/// Constructs batches by pulling from an `InputSource`, stamping each with
/// the next dense `batch_oid`.
pub struct BatchFactory {
    next_oid: u64,
}

impl BatchFactory {
    pub fn new() -> Self {
        BatchFactory { next_oid: 0 }
    }

    /// Pull up to `capacity` reads for `batch_num`, advancing the input
    /// source. Returns `None` once the source is exhausted (no reads were
    /// available at all); an empty-but-`Some` batch never occurs because
    /// the driver's main loop stops pulling once `take` returns empty.
    pub fn next(
        &mut self,
        input: &mut dyn InputSource,
        batch_num: u64,
        capacity: u64,
        paired: bool,
    ) -> DriverResult<Option<Batch>> {
        let start_qid = input.cur_qid();
        let reads = input.take(capacity as usize)?;
        if reads.is_empty() {
            return Ok(None);
        }
        let end_qid = input.cur_qid();
        let oid = self.next_oid;
        self.next_oid += 1;

        Ok(Some(Batch {
            batch_oid: oid,
            batch_num,
            start_qid,
            reads,
            paired,
            end_qid: Some(end_qid),
        }))
    }
}

impl Default for BatchFactory {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::DelimitedInputSource;
    use std::io::Write;

    fn open_source(contents: &str) -> DelimitedInputSource {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        f.write_all(contents.as_bytes()).unwrap();
        f.flush().unwrap();
        DelimitedInputSource::open(f.path()).unwrap()
    }

    #[test]
    fn oids_are_dense_and_increasing() {
        let mut source = open_source("A\nC\nG\nT\nA\n");
        let mut factory = BatchFactory::new();
        let b0 = factory.next(&mut source, 1, 2, false).unwrap().unwrap();
        let b1 = factory.next(&mut source, 2, 2, false).unwrap().unwrap();
        let b2 = factory.next(&mut source, 3, 2, false).unwrap().unwrap();
        assert_eq!(b0.batch_oid, 0);
        assert_eq!(b1.batch_oid, 1);
        assert_eq!(b2.batch_oid, 2);
        assert_eq!(b2.reads.len(), 1);
        assert!(factory.next(&mut source, 4, 2, false).unwrap().is_none());
    }

    #[test]
    fn filled_exactly_detects_short_final_batch() {
        let mut source = open_source("A\nC\nG\n");
        let mut factory = BatchFactory::new();
        let b0 = factory.next(&mut source, 1, 2, false).unwrap().unwrap();
        assert!(b0.filled_exactly(2));
        let b1 = factory.next(&mut source, 2, 2, false).unwrap().unwrap();
        assert!(!b1.filled_exactly(2));
    }

    #[test]
    fn end_qid_advances_by_reads_consumed() {
        let mut source = open_source("A\nC\nG\nT\n");
        let mut factory = BatchFactory::new();
        let b0 = factory.next(&mut source, 1, 3, false).unwrap().unwrap();
        assert_eq!(b0.start_qid, 0);
        assert_eq!(b0.end_qid(), 3);
    }
}
