//! Cache of decode-matrix inversions, keyed by a bitmap of missing shard
//! positions.
//!
//! spec.md §4.5 describes this as a fixed 32-byte key (one bit per shard,
//! up to 256 shards). This codec's shard ceiling is the full GF(2¹⁶) field
//! (65536), so the key is sized to `ceil(total_shards / 8)` bytes instead
//! of a fixed 32 — the same bit-per-shard encoding, just as wide as this
//! codec's shard range actually requires.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::matrix::Matrix;

#[derive(Default)]
pub struct InversionCache {
    cache: RwLock<HashMap<Vec<u8>, Arc<Matrix>>>,
}

impl InversionCache {
    #[must_use]
    pub fn new() -> Self {
        Self {
            cache: RwLock::new(HashMap::new()),
        }
    }

    #[must_use]
    pub fn bitmap_key(missing: &[usize], total_shards: usize) -> Vec<u8> {
        let mut key = vec![0u8; total_shards.div_ceil(8)];
        for &idx in missing {
            key[idx / 8] |= 1 << (idx % 8);
        }
        key
    }

    #[must_use]
    pub fn get(&self, key: &[u8]) -> Option<Arc<Matrix>> {
        self.cache.read().get(key).cloned()
    }

    pub fn insert(&self, key: Vec<u8>, inverse: Matrix) -> Arc<Matrix> {
        let inverse = Arc::new(inverse);
        self.cache.write().insert(key, Arc::clone(&inverse));
        inverse
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.cache.read().len()
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
    fn bitmap_key_distinguishes_missing_sets() {
        let a = InversionCache::bitmap_key(&[1, 3], 16);
        let b = InversionCache::bitmap_key(&[1, 4], 16);
        assert_ne!(a, b);
        assert_eq!(a.len(), 2);
    }

    #[test]
    fn caches_by_bitmap() {
        let cache = InversionCache::new();
        let key = InversionCache::bitmap_key(&[0, 2], 8);
        assert!(cache.get(&key).is_none());
        cache.insert(key.clone(), Matrix::identity(2));
        assert!(cache.get(&key).is_some());
        assert_eq!(cache.len(), 1);
    }
}
