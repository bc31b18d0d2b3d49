//! Process-wide statistics aggregator, updated by batches with associative,
//! commutative atomic increments (§5).

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Shared counters. Cheap to clone (an `Arc` around atomics); hand a clone
/// to every batch.
#[derive(Default)]
pub struct Stats {
    reads_seen: AtomicU64,
    batches_run: AtomicU64,
    batches_skipped: AtomicU64,
    reads_aligned: AtomicU64,
    reads_unmapped: AtomicU64,
}

impl Stats {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn add_reads_seen(&self, n: u64) {
        self.reads_seen.fetch_add(n, Ordering::Relaxed);
    }

    pub fn inc_batches_run(&self) {
        self.batches_run.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_batches_skipped(&self) {
        self.batches_skipped.fetch_add(1, Ordering::Relaxed);
    }

    pub fn add_reads_aligned(&self, n: u64) {
        self.reads_aligned.fetch_add(n, Ordering::Relaxed);
    }

    pub fn add_reads_unmapped(&self, n: u64) {
        self.reads_unmapped.fetch_add(n, Ordering::Relaxed);
    }

    pub fn reads_seen(&self) -> u64 {
        self.reads_seen.load(Ordering::Relaxed)
    }

    pub fn batches_run(&self) -> u64 {
        self.batches_run.load(Ordering::Relaxed)
    }

    pub fn batches_skipped(&self) -> u64 {
        self.batches_skipped.load(Ordering::Relaxed)
    }

    pub fn reads_aligned(&self) -> u64 {
        self.reads_aligned.load(Ordering::Relaxed)
    }

    pub fn reads_unmapped(&self) -> u64 {
        self.reads_unmapped.load(Ordering::Relaxed)
    }

    pub fn log_summary(&self) {
        log::info!(
            "stats: {} reads seen, {} batches run, {} batches skipped, {} aligned, {} unmapped",
            self.reads_seen(),
            self.batches_run(),
            self.batches_skipped(),
            self.reads_aligned(),
            self.reads_unmapped(),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn increments_are_commutative_across_threads() {
        let stats = Stats::new();
        let mut handles = Vec::new();
        for _ in 0..8 {
            let stats = Arc::clone(&stats);
            handles.push(thread::spawn(move || {
                for _ in 0..1000 {
                    stats.add_reads_seen(1);
                }
            }));
        }
        for h in handles {
            h.join().unwrap();
        }
        assert_eq!(stats.reads_seen(), 8000);
    }
}
