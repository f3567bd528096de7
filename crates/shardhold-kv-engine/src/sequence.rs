//! Per-type monotonic sequence allocator.
//!
//! Auto-incrementing integer keys are handed out from an in-memory cache
//! backed by a persisted high-water mark stored at `_bhSeq:<type>`. Each
//! cache refill reserves `bandwidth` values in a single transaction so a
//! hot insert loop does not pay a transaction round-trip per key; a crash
//! between refills only burns the unused tail of the last reservation, it
//! never hands out a value twice.

use dashmap::DashMap;
use parking_lot::Mutex;

use crate::error::Result;
use crate::{Engine, MutableTransaction};

const SEQ_PREFIX: &str = "_bhSeq:";

struct SeqCache {
    next: u64,
    /// One past the last value reserved; once `next` reaches this, the
    /// engine must be consulted again.
    ceiling: u64,
}

/// Holds one [`SeqCache`] per type name behind a `DashMap` so allocation for
/// unrelated types never contends on the same lock.
pub struct SequenceAllocator {
    caches: DashMap<String, Mutex<SeqCache>>,
}

impl SequenceAllocator {
    #[must_use]
    pub fn new() -> Self {
        Self {
            caches: DashMap::new(),
        }
    }

    pub fn next<E: Engine>(&self, engine: &E, type_name: &str, bandwidth: u64) -> Result<u64> {
        let bandwidth = bandwidth.max(1);
        let entry = self
            .caches
            .entry(type_name.to_string())
            .or_insert_with(|| {
                Mutex::new(SeqCache {
                    next: 0,
                    ceiling: 0,
                })
            });
        let mut cache = entry.lock();

        if cache.next >= cache.ceiling {
            let key = format!("{SEQ_PREFIX}{type_name}").into_bytes();
            let reserved_start = engine.update(|txn| {
                let current = match txn.get(&key)? {
                    Some(bytes) => decode_counter(&bytes),
                    None => 0,
                };
                let next_ceiling = current
                    .checked_add(bandwidth)
                    .ok_or_else(|| crate::error::EngineError::SequenceOverflow(type_name.to_string()))?;
                txn.set(&key, &next_ceiling.to_be_bytes())?;
                Ok(current)
            })?;
            cache.next = reserved_start;
            cache.ceiling = reserved_start + bandwidth;
        }

        let value = cache.next;
        cache.next += 1;
        Ok(value)
    }
}

impl Default for SequenceAllocator {
    fn default() -> Self {
        Self::new()
    }
}

fn decode_counter(bytes: &[u8]) -> u64 {
    let mut buf = [0u8; 8];
    let len = bytes.len().min(8);
    buf[..len].copy_from_slice(&bytes[..len]);
    u64::from_be_bytes(buf)
}

#[cfg(test)]
mod tests {
    use crate::Engine;
    use crate::memory::MemoryEngine;

    #[test]
    fn reserves_a_bandwidth_window_then_refills() {
        let engine = MemoryEngine::new();
        let values: Vec<u64> = (0..5).map(|_| engine.next_sequence("Widget", 2)).collect::<Result<_, _>>().unwrap();
        assert_eq!(values, vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn survives_a_forced_conflict_during_refill() {
        let engine = MemoryEngine::new();
        engine.force_next_conflicts(3);
        let value = engine.next_sequence("Widget", 1).unwrap();
        assert_eq!(value, 0);
    }
}
