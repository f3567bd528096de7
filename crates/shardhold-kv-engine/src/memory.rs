//! In-memory [`Engine`] fake used only by this crate's own tests.
//!
//! `shardhold-kv`'s test suite exercises query/index logic against
//! [`RedbEngine`](crate::RedbEngine) directly (via `tempfile`), so this fake
//! exists purely to unit-test the sequence allocator and retry loop without
//! needing a real database file.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU32, Ordering};

use parking_lot::Mutex;

use crate::error::{EngineError, Result};
use crate::sequence::SequenceAllocator;
use crate::{Engine, MutableTransaction, Transaction};

pub struct MemoryEngine {
    data: Mutex<BTreeMap<Vec<u8>, Vec<u8>>>,
    sequences: SequenceAllocator,
    /// Forces the next N `update` closures to fail with a conflict, for
    /// exercising the retry path deterministically.
    force_conflicts: AtomicU32,
}

impl MemoryEngine {
    pub fn new() -> Self {
        Self {
            data: Mutex::new(BTreeMap::new()),
            sequences: SequenceAllocator::new(),
            force_conflicts: AtomicU32::new(0),
        }
    }

    pub fn force_next_conflicts(&self, n: u32) {
        self.force_conflicts.store(n, Ordering::SeqCst);
    }
}

struct MemView<'a> {
    data: &'a BTreeMap<Vec<u8>, Vec<u8>>,
}

impl Transaction for MemView<'_> {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        Ok(self.data.get(key).cloned())
    }

    fn iter_prefix(&self, prefix: &[u8]) -> Result<Vec<(Vec<u8>, Vec<u8>)>> {
        Ok(self
            .data
            .range(prefix.to_vec()..)
            .take_while(|(k, _)| k.starts_with(prefix))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect())
    }
}

struct MemUpdate<'a> {
    data: &'a mut BTreeMap<Vec<u8>, Vec<u8>>,
}

impl Transaction for MemUpdate<'_> {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        Ok(self.data.get(key).cloned())
    }

    fn iter_prefix(&self, prefix: &[u8]) -> Result<Vec<(Vec<u8>, Vec<u8>)>> {
        Ok(self
            .data
            .range(prefix.to_vec()..)
            .take_while(|(k, _)| k.starts_with(prefix))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect())
    }
}

impl MutableTransaction for MemUpdate<'_> {
    fn set(&mut self, key: &[u8], value: &[u8]) -> Result<()> {
        self.data.insert(key.to_vec(), value.to_vec());
        Ok(())
    }

    fn delete(&mut self, key: &[u8]) -> Result<()> {
        self.data.remove(key);
        Ok(())
    }
}

impl Engine for MemoryEngine {
    fn view<R, Err: From<EngineError>>(
        &self,
        f: impl FnOnce(&dyn Transaction) -> std::result::Result<R, Err>,
    ) -> std::result::Result<R, Err> {
        let data = self.data.lock();
        let txn = MemView { data: &data };
        f(&txn)
    }

    fn update<R, Err: From<EngineError>>(
        &self,
        f: impl FnOnce(&mut dyn MutableTransaction) -> std::result::Result<R, Err>,
    ) -> std::result::Result<R, Err> {
        loop {
            let forced_conflict = self
                .force_conflicts
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| {
                    if n > 0 { Some(n - 1) } else { None }
                })
                .is_ok();
            if forced_conflict {
                continue;
            }
            let mut data = self.data.lock();
            let mut txn = MemUpdate { data: &mut data };
            return f(&mut txn);
        }
    }

    fn next_sequence(&self, type_name: &str, bandwidth: u64) -> Result<u64> {
        self.sequences.next(self, type_name, bandwidth)
    }
}

impl Default for MemoryEngine {
    fn default() -> Self {
        Self::new()
    }
}
