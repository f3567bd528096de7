//! A single erasure-coded shard: a fixed-size, checksummed byte buffer.
//!
//! A shard set for a D/P codec is an array of D+P [`Shard`]s, all of
//! identical length (spec.md §3, "Shard (RS)"). Shards are caller-owned:
//! codecs may borrow pool buffers internally but never retain caller memory
//! past a single call.

use shardhold_common::Checksum;

/// One shard in a shard set, with its position and data/parity role.
#[derive(Clone, Debug)]
pub struct Shard {
    /// Position within the shard set: `0..data_shards` are data,
    /// `data_shards..data_shards+parity_shards` are parity.
    pub index: usize,
    pub is_parity: bool,
    pub data: Vec<u8>,
    pub checksum: Checksum,
}

impl Shard {
    #[must_use]
    pub fn new(index: usize, data: Vec<u8>, is_parity: bool) -> Self {
        let checksum = Checksum::compute(&data);
        Self {
            index,
            is_parity,
            data,
            checksum,
        }
    }

    #[must_use]
    pub fn data_shard(index: usize, data: Vec<u8>) -> Self {
        Self::new(index, data, false)
    }

    #[must_use]
    pub fn parity_shard(index: usize, data: Vec<u8>) -> Self {
        Self::new(index, data, true)
    }

    #[must_use]
    pub fn verify(&self) -> bool {
        self.checksum.verify(&self.data)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn checksum_detects_corruption() {
        let mut shard = Shard::data_shard(0, vec![1, 2, 3, 4]);
        assert!(shard.verify());
        shard.data[0] ^= 0xFF;
        assert!(!shard.verify());
    }
}
