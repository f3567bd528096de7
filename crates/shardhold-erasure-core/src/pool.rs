//! Aligned buffer pool.
//!
//! GF16 requires every shard buffer to be a multiple of 64 bytes and
//! benefits from starting on a 64-byte boundary (spec.md §5: "Buffer pools
//! are shared, lock-free free-lists; callers may hand back a buffer with
//! `cap >= expectedSize` — smaller buffers are discarded rather than
//! stored"). We approximate the free-list with a `parking_lot::Mutex`-
//! guarded `Vec` rather than a literal lock-free structure — contention is
//! low in practice since acquire/release only happens at shard-set
//! boundaries, not per-byte — and get the same externally observable
//! behavior (buffers below the caller's size hint are dropped, not kept).

use parking_lot::Mutex;
use shardhold_common::align::AlignedBuf;

/// A shared pool of zeroed, 64-byte-aligned buffers, reused across
/// Encode/Reconstruct calls to amortize allocation.
pub struct BufferPool {
    align: usize,
    free: Mutex<Vec<AlignedBuf>>,
}

impl BufferPool {
    #[must_use]
    pub fn new(align: usize) -> Self {
        Self {
            align,
            free: Mutex::new(Vec::new()),
        }
    }

    /// Take a buffer of at least `len` bytes from the pool, allocating a
    /// fresh one if none fits.
    #[must_use]
    pub fn acquire(&self, len: usize) -> AlignedBuf {
        let mut free = self.free.lock();
        if let Some(pos) = free.iter().position(|buf| buf.capacity() >= len) {
            let mut buf = free.swap_remove(pos);
            buf.as_mut_slice()[..len.min(buf.len())].fill(0);
            return buf;
        }
        drop(free);
        AlignedBuf::zeroed(len.max(self.align), self.align)
    }

    /// Return a buffer to the pool. Discarded (not stored) if its capacity
    /// is smaller than `expected_size` — a caller handing back a
    /// undersized buffer gets nothing for its trouble, matching the
    /// design's free-list contract.
    pub fn release(&self, buf: AlignedBuf, expected_size: usize) {
        if buf.capacity() >= expected_size {
            self.free.lock().push(buf);
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.free.lock().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reuses_a_released_buffer() {
        let pool = BufferPool::new(64);
        let buf = pool.acquire(128);
        let cap = buf.capacity();
        pool.release(buf, 128);
        assert_eq!(pool.len(), 1);
        let reused = pool.acquire(128);
        assert_eq!(reused.capacity(), cap);
        assert!(pool.is_empty());
    }

    #[test]
    fn discards_undersized_releases() {
        let pool = BufferPool::new(64);
        let small = pool.acquire(64);
        pool.release(small, 4096);
        assert!(pool.is_empty());
    }
}
