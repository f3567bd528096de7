//! The pluggable erasure-coding trait seam.
//!
//! `shardhold-erasure-gf8` and `shardhold-erasure-gf16` both implement
//! [`ErasureBackend`] so `shardhold-erasure-stream` can drive either codec
//! without knowing which field it runs over. Grounded on
//! `objectio-erasure/src/backend/mod.rs`'s `ErasureBackend` trait shape
//! (capabilities, data/parity/total shard counts, encode/decode/verify),
//! extended with the full GF8 operation set spec.md §4.4 calls for
//! (`encode_idx`, `update`) as default-`NotSupported` methods so GF16 (which
//! explicitly does not support them, §4.5) need not implement them.

use shardhold_common::{Error, Result};

/// Whether [`ErasureBackend::reconstruct`] recovers only the missing data
/// shards, or additionally re-encodes any missing parity shards once the
/// data shards are whole again.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconstructMode {
    DataOnly,
    All,
}

/// Static capability description, surfaced for diagnostics and for callers
/// choosing between backends at runtime.
#[derive(Clone, Debug, Default)]
pub struct BackendCapabilities {
    pub name: &'static str,
    pub max_total_shards: usize,
    pub supports_encode_idx: bool,
    pub supports_update: bool,
}

/// Core erasure-coding operations shared by the GF8 and GF16 backends.
///
/// All operations are pure with respect to the shard buffers they are given
/// and make no I/O; `shardhold-erasure-stream` supplies the streaming loop
/// on top.
pub trait ErasureBackend: Send + Sync {
    fn capabilities(&self) -> BackendCapabilities;

    fn data_shards(&self) -> usize;
    fn parity_shards(&self) -> usize;

    fn total_shards(&self) -> usize {
        self.data_shards() + self.parity_shards()
    }

    /// Overwrite `shards[data_shards..]` as a deterministic function of
    /// `shards[..data_shards]`. Every shard must already be the same,
    /// non-zero length.
    fn encode(&self, shards: &mut [Vec<u8>]) -> Result<()>;

    /// Re-encode the data shards into a scratch buffer and byte-compare
    /// against the supplied parity.
    fn verify(&self, shards: &[Vec<u8>]) -> Result<bool>;

    /// Recover the shards at `missing` (all other `Some` entries are
    /// treated as present and trusted). `mode` controls whether missing
    /// parity positions are also recomputed once the data shards are
    /// whole. Requires at least `data_shards()` present entries.
    fn reconstruct(&self, shards: &mut [Option<Vec<u8>>], mode: ReconstructMode) -> Result<()>;

    /// XOR the contribution of one data shard (at position `idx`) into
    /// `parity_shards`, which must already be zeroed. Not supported by
    /// every backend (§4.5: Leopard does not support it).
    fn encode_idx(&self, _single_data_shard: &[u8], _idx: usize, _parity_shards: &mut [Vec<u8>]) -> Result<()> {
        Err(Error::NotSupported)
    }

    /// For each `(idx, Some(new_data))` pair, XOR `(new - old) * row` into
    /// every parity shard — cheaper than a full re-encode when only a few
    /// data shards changed. Not supported by every backend.
    fn update(&self, _shards: &mut [Vec<u8>], _new_data_shards: &[Option<Vec<u8>>]) -> Result<()> {
        Err(Error::NotSupported)
    }
}
