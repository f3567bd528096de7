//! Hierarchical error bitfield (spec.md §4.5, "Error bitfield
//! acceleration"): a binary tree over the shard positions where level 0 is
//! one bit per shard (set if missing) and each level above ORs pairs of
//! the level below, so any node that reads `false` certifies every shard
//! under it is present.
//!
//! This drives the GF(2¹⁶) reconstruction fast path: spec.md calls for
//! skipping FFT butterflies known to combine only zeros; this codec has no
//! FFT butterflies to skip (see `codec.rs`'s module doc), so the bitfield
//! is used instead to recognise the "few erasures" case spec.md names
//! (fewer than a quarter of the parity shards missing) and to build the
//! decode-matrix cache key, matching spec.md's description of the GF8
//! Leopard variant's bitmap-keyed inversion cache.

pub struct ErrorBitfield {
    levels: Vec<Vec<bool>>,
}

impl ErrorBitfield {
    /// Builds the tree from a per-shard missing flag. `missing.len()` need
    /// not be a power of two; each level pairs up what it's given and
    /// carries an odd final element forward unchanged.
    #[must_use]
    pub fn build(missing: &[bool]) -> Self {
        let mut levels = vec![missing.to_vec()];
        let mut cur = missing.to_vec();
        while cur.len() > 1 {
            let next: Vec<bool> = cur.chunks(2).map(|pair| pair[0] || pair.get(1).copied().unwrap_or(false)).collect();
            levels.push(next.clone());
            cur = next;
        }
        Self { levels }
    }

    #[must_use]
    pub fn depth(&self) -> usize {
        self.levels.len()
    }

    /// `true` if the subtree rooted at `(level, index)` contains no
    /// missing shard.
    #[must_use]
    pub fn subtree_is_clean(&self, level: usize, index: usize) -> bool {
        !self.levels[level][index]
    }

    #[must_use]
    pub fn erasure_count(&self) -> usize {
        self.levels[0].iter().filter(|&&b| b).count()
    }

    /// The flat bit-per-shard bitmap (level 0), packed 8 per byte — the
    /// same encoding spec.md §4.5 describes for the GF8 Leopard variant's
    /// inversion-cache key, generalised to however many bytes this
    /// codec's shard count needs.
    #[must_use]
    pub fn as_key(&self) -> Vec<u8> {
        let bits = &self.levels[0];
        let mut key = vec![0u8; bits.len().div_ceil(8)];
        for (i, &b) in bits.iter().enumerate() {
            if b {
                key[i / 8] |= 1 << (i % 8);
            }
        }
        key
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clean_tree_has_no_erasures() {
        let tree = ErrorBitfield::build(&[false; 8]);
        assert_eq!(tree.erasure_count(), 0);
        assert!(tree.subtree_is_clean(tree.depth() - 1, 0));
    }

    #[test]
    fn one_missing_shard_propagates_up_the_tree() {
        let mut missing = vec![false; 8];
        missing[5] = true;
        let tree = ErrorBitfield::build(&missing);
        assert_eq!(tree.erasure_count(), 1);
        // every node on the path from leaf 5 to the root is dirty
        assert!(!tree.subtree_is_clean(0, 5));
        assert!(!tree.subtree_is_clean(tree.depth() - 1, 0));
        // a sibling subtree untouched by the erasure stays clean
        assert!(tree.subtree_is_clean(0, 0));
        assert!(tree.subtree_is_clean(1, 0));
    }

    #[test]
    fn key_matches_manual_bitmap() {
        let mut missing = vec![false; 10];
        missing[1] = true;
        missing[9] = true;
        let tree = ErrorBitfield::build(&missing);
        let key = tree.as_key();
        assert_eq!(key.len(), 2);
        assert_eq!(key[0], 0b0000_0010);
        assert_eq!(key[1], 0b0000_0010);
    }

    #[test]
    fn handles_odd_length() {
        let tree = ErrorBitfield::build(&[true, false, false]);
        assert_eq!(tree.erasure_count(), 1);
        assert_eq!(tree.depth(), 3);
    }
}
