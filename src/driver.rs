//! Search Driver (§4.1): reads input, forms batches, schedules workers, and
//! preserves output order. The hardest-to-get-right component in the repo —
//! see the module-level notes on the two scheduling paths below.

use crate::arena::MemoryArena;
use crate::batch::{Batch, BatchFactory, BatchSeed};
use crate::config::RunConfig;
use crate::error::{DriverError, DriverResult};
use crate::input::InputSource;
use crate::ipam;
use crate::kernel::AlignmentKernel;
use crate::stats::Stats;
use crate::tempstore::TempStore;
use parking_lot::Mutex;
use std::collections::{BTreeMap, BTreeSet};
use std::fs::File;
use std::io::{Read, Write};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;

/// A worker's completion flag plus its join handle, keyed by `batch_oid` in
/// the multi-threaded path's slot map.
struct ThreadSlot {
    done: Arc<AtomicBool>,
    handle: JoinHandle<DriverResult<BatchRunResult>>,
}

struct BatchRunResult {
    batch_oid: u64,
    #[allow(dead_code)]
    keep_going: bool,
}

/// Consumes an input source to completion (or to `end_batch`), writing the
/// final ordered output, per §4.1.
pub struct SearchDriver {
    config: Arc<RunConfig>,
    arena: MemoryArena,
    temp_store: Arc<TempStore>,
    stats: Arc<Stats>,
    kernel: Arc<dyn AlignmentKernel>,
}

impl SearchDriver {
    /// Validates `config` and builds a driver. Fails before any batch is
    /// constructed if validation fails (§4.1 step 1) or the arena cannot
    /// satisfy the single-threaded path's scratch-buffer preallocation.
    pub fn new(config: RunConfig, kernel: Arc<dyn AlignmentKernel>) -> DriverResult<Self> {
        config.validate()?;
        let arena = MemoryArena::new(config.mem_cap_bytes as usize);
        let temp_store = Arc::new(TempStore::new(&config.temp_dir));
        let stats = Stats::new();

        Ok(SearchDriver {
            config: Arc::new(config),
            arena,
            temp_store,
            stats,
            kernel,
        })
    }

    pub fn stats(&self) -> &Arc<Stats> {
        &self.stats
    }

    /// Resolve and parse the result-configuration string, applying the
    /// subject-area swap transform first when `sa_start < 0` (§4.2).
    fn build_ipam(&self) -> DriverResult<(String, [u8; crate::config::MAX_IPAM_IDX + 1])> {
        let resolved = ipam::resolve_alias(&self.config.result_config);
        let canonical = if self.config.sa_start < 0 {
            ipam::swap02_13(resolved)
        } else {
            resolved.to_string()
        };
        let vector = ipam::parse(&canonical)
            .ok_or_else(|| DriverError::Validation("wrong strand configuration".into()))?;
        Ok((canonical, vector))
    }

    fn build_seed(
        &self,
        result_config: String,
        ipam_vec: [u8; crate::config::MAX_IPAM_IDX + 1],
        single_threaded: bool,
    ) -> DriverResult<BatchSeed> {
        let (scratch_unpaired, scratch_paired) = if single_threaded {
            // Reserve space proportional to how large a single batch can
            // get, so an unreasonably small memory cap fails fast here
            // rather than mid-run (§4.5 scenario 6).
            let scratch_len =
                self.config.effective_batch_limit() as usize * self.config.max_qlen as usize;
            let unpaired = self.arena.alloc(scratch_len)?;
            let paired = self.arena.alloc(scratch_len)?;
            (
                Some(Arc::new(Mutex::new(unpaired))),
                Some(Arc::new(Mutex::new(paired))),
            )
        } else {
            (None, None)
        };

        Ok(BatchSeed {
            config: Arc::clone(&self.config),
            ipam: ipam_vec,
            result_config,
            arena: self.arena.clone(),
            stats: Arc::clone(&self.stats),
            kernel: Arc::clone(&self.kernel),
            scratch_unpaired,
            scratch_paired,
        })
    }

    /// Run the batch's kernel, dispatching on `paired` once per batch (no
    /// per-read branch, per §9).
    fn execute(seed: &BatchSeed, batch: &Batch) -> anyhow::Result<crate::kernel::BatchOutcome> {
        if batch.paired {
            seed.kernel.run_paired(&batch.reads, seed)
        } else {
            seed.kernel.run_unpaired(&batch.reads, seed)
        }
    }

    /// Consume the input to completion (or `end_batch`), write the final
    /// ordered output to `config.output_path`, and return.
    pub fn run(&self) -> DriverResult<()> {
        let (result_config, ipam_vec) = self.build_ipam()?;

        let num_workers = self.config.effective_num_workers();
        let single_threaded = num_workers <= 1;

        let column_count = if self.config.force_paired {
            2
        } else if self.config.force_unpaired {
            1
        } else {
            return Err(DriverError::Validation(
                "neither paired nor unpaired search was requested".into(),
            ));
        };

        let mut input = crate::input::DelimitedInputSource::open(&self.config.input_path)?;
        if input.column_count() != column_count {
            let msg = if column_count == 2 {
                "paired search is requested but input is not paired"
            } else {
                "unpaired search is requested but input is paired"
            };
            return Err(DriverError::Input(msg.into()));
        }
        let paired = column_count == 2;

        let seed = self.build_seed(result_config, ipam_vec, single_threaded)?;
        let mut factory = BatchFactory::new();

        let out_file = File::create(&self.config.output_path)?;
        let mut output = std::io::BufWriter::new(out_file);

        let result = if single_threaded {
            self.run_single_threaded(&mut input, &mut factory, &seed, paired, &mut output)
        } else {
            self.run_multi_threaded(
                &mut input,
                &mut factory,
                &seed,
                paired,
                num_workers,
                &mut output,
            )
        };

        output.flush()?;
        self.stats.log_summary();
        result
    }

    /// §4.1.1: run batches inline, appending each output immediately.
    fn run_single_threaded(
        &self,
        input: &mut dyn InputSource,
        factory: &mut BatchFactory,
        seed: &BatchSeed,
        paired: bool,
        output: &mut impl Write,
    ) -> DriverResult<()> {
        // §4.1 step 3d: batch_num always starts at the stream's natural
        // first batch (1) and walks upward, regardless of start_batch — a
        // batch below start_batch is still constructed (consuming its
        // share of the input and an oid) so later batch_nums land on the
        // correct slice of the stream. Only *execution* is gated below.
        let mut batch_num = 1u64;
        let mut batch_start_qid = input.cur_qid();
        let limit = self.config.effective_batch_limit();

        loop {
            if batch_num > self.config.end_batch {
                break;
            }
            let remaining = limit.saturating_sub(input.cur_qid() - batch_start_qid);
            if remaining == 0 {
                break;
            }
            let batch = match factory.next(input, batch_num, remaining, paired)? {
                Some(b) => b,
                None => break,
            };

            let in_range =
                batch.batch_num >= self.config.start_batch && batch.batch_num <= self.config.end_batch;
            let filled = batch.filled_exactly(limit);
            let end_qid = batch.end_qid();
            let batch_oid = batch.batch_oid;

            if !in_range {
                log::info!(
                    "skipping batch_num {} (oid {}), outside [{}, {}]",
                    batch.batch_num,
                    batch_oid,
                    self.config.start_batch,
                    self.config.end_batch
                );
                self.stats.inc_batches_skipped();
            } else {
                let out_path = self
                    .temp_store
                    .register(&format!("outsam-{batch_oid}"))?;
                let outcome =
                    Self::execute(seed, &batch).map_err(|e| DriverError::Worker {
                        batch_oid,
                        source: e,
                    })?;
                self.stats.add_reads_seen(batch.reads.len() as u64);
                self.stats.add_reads_aligned(outcome.aligned);
                self.stats.add_reads_unmapped(outcome.unmapped);
                self.stats.inc_batches_run();

                std::fs::write(&out_path, &outcome.bytes)?;
                append_file(output, &out_path)?;

                if !outcome.keep_going {
                    log::info!("batch {batch_oid} signaled early termination (insert-size discovery)");
                    break;
                }
            }

            if !self.config.strict_batch || filled {
                batch_start_qid = end_qid;
                batch_num += 1;
            } else {
                batch_start_qid = end_qid;
            }
        }

        Ok(())
    }

    /// §4.1.2 / §4.1.3: bounded-worker scheduling with ordered append.
    #[allow(clippy::too_many_arguments)]
    fn run_multi_threaded(
        &self,
        input: &mut dyn InputSource,
        factory: &mut BatchFactory,
        seed: &BatchSeed,
        paired: bool,
        num_workers: u32,
        output: &mut impl Write,
    ) -> DriverResult<()> {
        let mut slots: BTreeMap<u64, ThreadSlot> = BTreeMap::new();
        // Oids that were constructed (consumed their share of input and
        // burned a batch_oid) but never executed because batch_num fell
        // outside [start_batch, end_batch]. These never get a slot and
        // never get a temp file; `ordered_append` must skip past them
        // directly instead of treating "no slot" as "completed, reaped,
        // ready to append" (that conflation is what fabricated spurious
        // empty temp files for every skipped oid).
        let mut skipped_oids: BTreeSet<u64> = BTreeSet::new();
        let mut next_append: u64 = 0;
        let mut cur_batch_oid: u64 = 0;

        // §4.1 step 3d: see the matching comment in run_single_threaded —
        // batch_num starts at 1 and walks upward regardless of
        // start_batch; only execution is gated on the range below.
        let mut batch_num = 1u64;
        let mut batch_start_qid = input.cur_qid();
        let limit = self.config.effective_batch_limit();

        loop {
            if batch_num > self.config.end_batch {
                break;
            }
            let remaining = limit.saturating_sub(input.cur_qid() - batch_start_qid);
            if remaining == 0 {
                break;
            }
            let batch = match factory.next(input, batch_num, remaining, paired)? {
                Some(b) => b,
                None => break,
            };

            let in_range =
                batch.batch_num >= self.config.start_batch && batch.batch_num <= self.config.end_batch;
            let filled = batch.filled_exactly(limit);
            let end_qid = batch.end_qid();
            let batch_oid = batch.batch_oid;
            cur_batch_oid = batch_oid + 1;

            if !in_range {
                log::info!(
                    "skipping batch_num {} (oid {}), outside [{}, {}]",
                    batch.batch_num,
                    batch_oid,
                    self.config.start_batch,
                    self.config.end_batch
                );
                self.stats.inc_batches_skipped();
                skipped_oids.insert(batch_oid);
            } else {
                self.reap_completed(&mut slots);
                while slots.len() as u32 >= num_workers {
                    std::thread::sleep(self.config.poll_interval);
                    self.reap_completed(&mut slots);
                }

                let out_path = self
                    .temp_store
                    .register(&format!("outsam-{batch_oid}"))?;
                let slot = self.spawn_worker(batch, seed.clone(), out_path);
                slots.insert(batch_oid, slot);
            }

            next_append = self.ordered_append(
                output,
                &mut slots,
                &mut skipped_oids,
                next_append,
                cur_batch_oid,
            )?;

            if !self.config.strict_batch || filled {
                batch_start_qid = end_qid;
                batch_num += 1;
            } else {
                batch_start_qid = end_qid;
            }
        }

        // Drain: join remaining slots in ascending oid order (BTreeMap
        // iteration is already ordered), then append everything left.
        let oids: Vec<u64> = slots.keys().copied().collect();
        for oid in oids {
            if let Some(slot) = slots.remove(&oid) {
                let result = slot
                    .handle
                    .join()
                    .map_err(|_| DriverError::WorkerPanic { batch_oid: oid })??;
                debug_assert_eq!(result.batch_oid, oid);
                self.stats.inc_batches_run();
            }
            next_append = self.ordered_append(
                output,
                &mut slots,
                &mut skipped_oids,
                next_append,
                cur_batch_oid,
            )?;
        }

        debug_assert!(
            slots.is_empty(),
            "programming error: slots still active after drain"
        );
        if !slots.is_empty() {
            log::error!("driver bug: {} slots still active after drain", slots.len());
        }

        next_append = self.ordered_append(
            output,
            &mut slots,
            &mut skipped_oids,
            next_append,
            cur_batch_oid,
        )?;
        debug_assert_eq!(
            next_append, cur_batch_oid,
            "programming error: oids left unappended after drain"
        );

        Ok(())
    }

    fn reap_completed(&self, slots: &mut BTreeMap<u64, ThreadSlot>) {
        let done_oids: Vec<u64> = slots
            .iter()
            .filter(|(_, slot)| slot.done.load(Ordering::Acquire))
            .map(|(oid, _)| *oid)
            .collect();
        for oid in done_oids {
            if let Some(slot) = slots.remove(&oid) {
                match slot.handle.join() {
                    Ok(Ok(result)) => {
                        debug_assert_eq!(result.batch_oid, oid);
                        self.stats.inc_batches_run();
                    }
                    Ok(Err(e)) => log::error!("batch {oid} failed: {e}"),
                    Err(_) => log::error!("batch {oid} worker panicked"),
                }
            }
        }
    }

    /// Append every completed, contiguous-from-`next_append` batch output
    /// that is no longer an active slot, and fast-forward past any
    /// constructed-but-skipped oid (it was never executed, so it has no
    /// temp file and nothing to append). Stops at the first oid that is
    /// still active or not yet constructed.
    fn ordered_append(
        &self,
        output: &mut impl Write,
        slots: &mut BTreeMap<u64, ThreadSlot>,
        skipped_oids: &mut BTreeSet<u64>,
        mut next_append: u64,
        cur_batch_oid: u64,
    ) -> DriverResult<u64> {
        while next_append < cur_batch_oid {
            if skipped_oids.remove(&next_append) {
                next_append += 1;
                continue;
            }
            if slots.contains_key(&next_append) {
                break;
            }
            let path = self
                .temp_store
                .register(&format!("outsam-{next_append}"))?;
            append_file(output, &path)?;
            next_append += 1;
        }
        Ok(next_append)
    }

    fn spawn_worker(&self, batch: Batch, seed: BatchSeed, out_path: PathBuf) -> ThreadSlot {
        let done = Arc::new(AtomicBool::new(false));
        let done_for_worker = Arc::clone(&done);
        let stats = Arc::clone(&self.stats);
        let batch_oid = batch.batch_oid;

        let handle = std::thread::spawn(move || -> DriverResult<BatchRunResult> {
            let outcome = Self::execute(&seed, &batch).map_err(|e| DriverError::Worker {
                batch_oid,
                source: e,
            })?;
            stats.add_reads_seen(batch.reads.len() as u64);
            stats.add_reads_aligned(outcome.aligned);
            stats.add_reads_unmapped(outcome.unmapped);

            std::fs::write(&out_path, &outcome.bytes)?;
            done_for_worker.store(true, Ordering::Release);

            Ok(BatchRunResult {
                batch_oid,
                keep_going: outcome.keep_going,
            })
        });

        ThreadSlot { done, handle }
    }
}

fn append_file(output: &mut impl Write, path: &std::path::Path) -> DriverResult<()> {
    let mut buf = Vec::new();
    File::open(path)?.read_to_end(&mut buf)?;
    output.write_all(&buf)?;
    Ok(())
}
