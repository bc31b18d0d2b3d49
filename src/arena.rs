//! Memory arena: a hard-capped, thread-safe byte budget shared by the
//! driver and every batch (§4.3).
//!
//! Allocation returns an RAII handle so a batch that panics or returns early
//! cannot leak budget; `Drop` always releases its byte count.

use crate::error::{DriverError, DriverResult};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

struct ArenaInner {
    cap_bytes: usize,
    outstanding: Mutex<usize>,
    /// Relaxed peek mirror of `outstanding`, for diagnostics that shouldn't
    /// contend the mutex.
    peek: AtomicUsize,
}

/// A process-wide byte allocator with a hard cap. Cheap to clone (shares the
/// same inner counters).
#[derive(Clone)]
pub struct MemoryArena {
    inner: Arc<ArenaInner>,
}

impl MemoryArena {
    pub fn new(cap_bytes: usize) -> Self {
        MemoryArena {
            inner: Arc::new(ArenaInner {
                cap_bytes,
                outstanding: Mutex::new(0),
                peek: AtomicUsize::new(0),
            }),
        }
    }

    pub fn cap_bytes(&self) -> usize {
        self.inner.cap_bytes
    }

    /// Bytes currently charged against the cap. Approximate under
    /// concurrent allocation; exact once quiescent.
    pub fn outstanding_bytes(&self) -> usize {
        self.inner.peek.load(Ordering::Relaxed)
    }

    /// Allocate a zero-filled buffer of `len` bytes, charged against the cap.
    /// Refuses (without allocating) if the request would exceed the budget.
    pub fn alloc(&self, len: usize) -> DriverResult<ArenaHandle> {
        let mut outstanding = self.inner.outstanding.lock();
        if *outstanding + len > self.inner.cap_bytes {
            return Err(DriverError::ResourceExhausted(format!(
                "arena cap {} bytes exceeded: {} outstanding + {} requested",
                self.inner.cap_bytes, *outstanding, len
            )));
        }
        *outstanding += len;
        self.inner.peek.store(*outstanding, Ordering::Relaxed);
        drop(outstanding);

        Ok(ArenaHandle {
            arena: self.clone(),
            buf: vec![0u8; len],
        })
    }

    fn release(&self, len: usize) {
        let mut outstanding = self.inner.outstanding.lock();
        *outstanding = outstanding.saturating_sub(len);
        self.inner.peek.store(*outstanding, Ordering::Relaxed);
    }
}

/// RAII handle for a buffer allocated from a [`MemoryArena`]. The buffer's
/// byte count is released back to the arena on drop.
pub struct ArenaHandle {
    arena: MemoryArena,
    buf: Vec<u8>,
}

impl ArenaHandle {
    pub fn as_slice(&self) -> &[u8] {
        &self.buf
    }

    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        &mut self.buf
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }
}

impl Drop for ArenaHandle {
    fn drop(&mut self) {
        self.arena.release(self.buf.len());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allocation_within_cap_succeeds() {
        let arena = MemoryArena::new(1024);
        let handle = arena.alloc(512).unwrap();
        assert_eq!(handle.len(), 512);
        assert_eq!(arena.outstanding_bytes(), 512);
    }

    #[test]
    fn over_budget_allocation_is_refused() {
        let arena = MemoryArena::new(100);
        assert!(arena.alloc(101).is_err());
        assert_eq!(arena.outstanding_bytes(), 0);
    }

    #[test]
    fn drop_releases_budget() {
        let arena = MemoryArena::new(100);
        {
            let _handle = arena.alloc(100).unwrap();
            assert_eq!(arena.outstanding_bytes(), 100);
            assert!(arena.alloc(1).is_err());
        }
        assert_eq!(arena.outstanding_bytes(), 0);
        assert!(arena.alloc(100).is_ok());
    }

    #[test]
    fn peak_never_exceeds_cap_under_many_allocations() {
        let arena = MemoryArena::new(1000);
        let mut handles = Vec::new();
        for _ in 0..10 {
            handles.push(arena.alloc(90).unwrap());
        }
        assert!(arena.alloc(200).is_err());
        assert!(arena.outstanding_bytes() <= 1000);
    }
}
