//! Shardhold Erasure Core - shared types for the Reed-Solomon codecs
//!
//! `shardhold-erasure-gf8` and `shardhold-erasure-gf16` both build on the
//! [`Shard`] type and the [`ErasureBackend`] trait seam defined here, the
//! same way `shardhold-kv-engine::Engine` decouples the indexing layer from
//! its storage backend. `shardhold-erasure-stream` drives either backend
//! through the trait alone.

pub mod backend;
pub mod config;
pub mod pool;
pub mod shard;

pub use backend::{BackendCapabilities, ErasureBackend, ReconstructMode};
pub use config::{ErasureConfig, LeopardPolicy};
pub use pool::BufferPool;
pub use shard::Shard;

/// Smallest power of two `>= n`. Used to size the FFT working length for
/// the GF16 codec (spec.md §4.5: `m = ceilPow2(P)`) and shared here since
/// both the stream driver and the GF16 codec need it.
#[must_use]
pub const fn ceil_pow2(n: usize) -> usize {
    if n <= 1 {
        1
    } else {
        1usize << (usize::BITS - (n - 1).leading_zeros())
    }
}

#[cfg(test)]
mod ceil_pow2_tests {
    use super::ceil_pow2;

    #[test]
    fn rounds_up_to_next_power_of_two() {
        assert_eq!(ceil_pow2(0), 1);
        assert_eq!(ceil_pow2(1), 1);
        assert_eq!(ceil_pow2(2), 2);
        assert_eq!(ceil_pow2(3), 4);
        assert_eq!(ceil_pow2(4), 4);
        assert_eq!(ceil_pow2(5), 8);
        assert_eq!(ceil_pow2(65), 128);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shard_round_trips_checksum() {
        let shard = Shard::data_shard(0, vec![9; 16]);
        assert!(shard.verify());
    }
}
