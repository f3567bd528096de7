//! `ErasureCodec` picks a GF(2⁸) or GF(2¹⁶) backend from an
//! [`ErasureConfig`] and exposes them uniformly.
//!
//! Grounded on `objectio-erasure/src/codec.rs`'s `ErasureCodec`/
//! `CodecBackend` pattern: a high-level facade wraps one of several
//! concrete backends behind an enum, picked at construction time from a
//! config, so callers don't match on backend type themselves.

use shardhold_common::{Error, Result};
use shardhold_erasure_core::{BackendCapabilities, ErasureBackend, ErasureConfig, LeopardPolicy, ReconstructMode};
use shardhold_erasure_gf16::Gf16Codec;
use shardhold_erasure_gf8::Gf8Codec;

pub enum ErasureCodec {
    Gf8(Gf8Codec),
    Gf16(Gf16Codec),
}

impl ErasureCodec {
    /// # Errors
    /// Whatever the chosen backend's constructor returns — in particular
    /// `Error::MaxShardNum` if `with_leopard = Never` but the shard count
    /// exceeds GF8's 256-shard ceiling.
    pub fn new(config: &ErasureConfig) -> Result<Self> {
        for knob in config.inert_knobs() {
            tracing::warn!(knob, "erasure config knob has no effect on the shipped scalar backend");
        }

        let use_gf16 = match config.with_leopard {
            LeopardPolicy::Always => true,
            LeopardPolicy::Never => false,
            LeopardPolicy::Auto => config.total_shards() > Gf8Codec::MAX_TOTAL_SHARDS,
        };

        if use_gf16 {
            Ok(Self::Gf16(Gf16Codec::new(config.data_shards, config.parity_shards)?))
        } else {
            Ok(Self::Gf8(Gf8Codec::new(config.data_shards, config.parity_shards)?))
        }
    }
}

impl ErasureBackend for ErasureCodec {
    fn capabilities(&self) -> BackendCapabilities {
        match self {
            Self::Gf8(c) => c.capabilities(),
            Self::Gf16(c) => c.capabilities(),
        }
    }

    fn data_shards(&self) -> usize {
        match self {
            Self::Gf8(c) => c.data_shards(),
            Self::Gf16(c) => c.data_shards(),
        }
    }

    fn parity_shards(&self) -> usize {
        match self {
            Self::Gf8(c) => c.parity_shards(),
            Self::Gf16(c) => c.parity_shards(),
        }
    }

    fn encode(&self, shards: &mut [Vec<u8>]) -> Result<()> {
        match self {
            Self::Gf8(c) => c.encode(shards),
            Self::Gf16(c) => c.encode(shards),
        }
    }

    fn verify(&self, shards: &[Vec<u8>]) -> Result<bool> {
        match self {
            Self::Gf8(c) => c.verify(shards),
            Self::Gf16(c) => c.verify(shards),
        }
    }

    fn reconstruct(&self, shards: &mut [Option<Vec<u8>>], mode: ReconstructMode) -> Result<()> {
        match self {
            Self::Gf8(c) => c.reconstruct(shards, mode),
            Self::Gf16(c) => c.reconstruct(shards, mode),
        }
    }

    fn encode_idx(&self, single_data_shard: &[u8], idx: usize, parity_shards: &mut [Vec<u8>]) -> Result<()> {
        match self {
            Self::Gf8(c) => c.encode_idx(single_data_shard, idx, parity_shards),
            Self::Gf16(_) => Err(Error::NotSupported),
        }
    }

    fn update(&self, shards: &mut [Vec<u8>], new_data_shards: &[Option<Vec<u8>>]) -> Result<()> {
        match self {
            Self::Gf8(c) => c.update(shards, new_data_shards),
            Self::Gf16(_) => Err(Error::NotSupported),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn auto_policy_picks_gf8_under_the_ceiling() {
        let config = ErasureConfig::new(4, 2);
        let codec = ErasureCodec::new(&config).unwrap();
        assert!(matches!(codec, ErasureCodec::Gf8(_)));
    }

    #[test]
    fn auto_policy_picks_gf16_over_the_ceiling() {
        let config = ErasureConfig::new(250, 10);
        let codec = ErasureCodec::new(&config).unwrap();
        assert!(matches!(codec, ErasureCodec::Gf16(_)));
    }

    #[test]
    fn always_policy_forces_gf16() {
        let mut config = ErasureConfig::new(4, 2);
        config.with_leopard = LeopardPolicy::Always;
        let codec = ErasureCodec::new(&config).unwrap();
        assert!(matches!(codec, ErasureCodec::Gf16(_)));
    }

    #[test]
    fn never_policy_errors_past_gf8_ceiling() {
        let mut config = ErasureConfig::new(250, 10);
        config.with_leopard = LeopardPolicy::Never;
        assert!(matches!(ErasureCodec::new(&config), Err(Error::MaxShardNum)));
    }
}
