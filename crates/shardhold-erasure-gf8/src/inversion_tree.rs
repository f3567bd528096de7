//! Cache of decode-matrix inversions, keyed by the ordered list of missing
//! shard indices.
//!
//! `10e272f7_luckyturtle-reed-solomon-erasure__src-lib.rs.rs` keeps this as
//! a literal prefix tree (`InversionTree`) walked one missing-index at a
//! time. We get the same amortized-inversion behavior with a flat
//! `HashMap<Vec<usize>, Arc<Matrix>>` behind a `parking_lot::RwLock` instead
//! of hand-rolling tree node linkage that nothing else in this crate needs —
//! the cache key (the sorted missing-index list) is exactly the tree path,
//! just not stored as one.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::matrix::Matrix;

#[derive(Default)]
pub struct InversionTree {
    cache: RwLock<HashMap<Vec<usize>, Arc<Matrix>>>,
}

impl InversionTree {
    #[must_use]
    pub fn new() -> Self {
        Self {
            cache: RwLock::new(HashMap::new()),
        }
    }

    /// Look up a cached inverse for this exact set of missing indices.
    #[must_use]
    pub fn get(&self, missing: &[usize]) -> Option<Arc<Matrix>> {
        self.cache.read().get(missing).cloned()
    }

    /// Insert (or overwrite) the cached inverse for this set of missing
    /// indices.
    pub fn insert(&self, missing: Vec<usize>, inverse: Matrix) -> Arc<Matrix> {
        let inverse = Arc::new(inverse);
        self.cache.write().insert(missing, Arc::clone(&inverse));
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
    fn caches_by_missing_set() {
        let tree = InversionTree::new();
        assert!(tree.get(&[1, 3]).is_none());
        tree.insert(vec![1, 3], Matrix::identity(2));
        assert!(tree.get(&[1, 3]).is_some());
        assert!(tree.get(&[1, 4]).is_none());
        assert_eq!(tree.len(), 1);
    }
}
