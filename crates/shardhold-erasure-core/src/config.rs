//! Typed configuration for the Reed-Solomon codecs (spec.md §6,
//! "Configuration knobs: RS").
//!
//! Every field below is accepted for interface completeness. Matrix-family
//! selection beyond the Vandermonde default (`use_cauchy`,
//! `use_jerasure_matrix`, `use_par1_matrix`, `fast_one_parity`), every
//! SIMD knob (`use_avx2`, `use_avx512`, `use_ssse3`, `use_gfni`), and
//! round-level I/O concurrency (`concurrent_stream_reads`,
//! `concurrent_stream_writes`) are out of scope per spec.md §1 —
//! `shardhold-erasure-stream::StreamCodec` always reads and writes a
//! round's shards sequentially. [`ErasureConfig::inert_knobs`] reports
//! which requested knobs have no effect so callers can log rather than
//! silently lose a setting.

/// Which GF(2¹⁶) (Leopard) backend policy to use for a given shard count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LeopardPolicy {
    /// Use GF(2¹⁶) only when the shard count exceeds GF8's 256-shard
    /// ceiling.
    #[default]
    Auto,
    /// Always use the GF(2¹⁶) backend.
    Always,
    /// Always use the GF(2⁸) backend; errors if the shard count exceeds
    /// its ceiling.
    Never,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErasureConfig {
    pub data_shards: usize,
    pub parity_shards: usize,
    pub min_split_size: usize,
    pub per_round_bytes: usize,
    pub max_worker_threads: usize,
    pub with_leopard: LeopardPolicy,
    pub use_cauchy: bool,
    pub use_jerasure_matrix: bool,
    pub use_par1_matrix: bool,
    pub fast_one_parity: bool,
    pub use_avx2: bool,
    pub use_avx512: bool,
    pub use_ssse3: bool,
    pub use_gfni: bool,
    pub concurrent_stream_reads: bool,
    pub concurrent_stream_writes: bool,
    pub stream_block_size: usize,
    pub shard_size_hint: usize,
    pub inversion_cache: bool,
    pub forced_inversion_cache: bool,
}

impl ErasureConfig {
    #[must_use]
    pub fn new(data_shards: usize, parity_shards: usize) -> Self {
        Self {
            data_shards,
            parity_shards,
            min_split_size: 0,
            per_round_bytes: 4 * 1024 * 1024,
            max_worker_threads: 0,
            with_leopard: LeopardPolicy::Auto,
            use_cauchy: false,
            use_jerasure_matrix: false,
            use_par1_matrix: false,
            fast_one_parity: false,
            use_avx2: false,
            use_avx512: false,
            use_ssse3: false,
            use_gfni: false,
            concurrent_stream_reads: false,
            concurrent_stream_writes: false,
            stream_block_size: 4 * 1024 * 1024,
            shard_size_hint: 0,
            inversion_cache: true,
            forced_inversion_cache: false,
        }
    }

    #[must_use]
    pub fn total_shards(&self) -> usize {
        self.data_shards + self.parity_shards
    }

    /// Names of knobs this config sets that the shipped scalar backends do
    /// not honor, for the caller to log.
    #[must_use]
    pub fn inert_knobs(&self) -> Vec<&'static str> {
        let mut inert = Vec::new();
        if self.use_cauchy {
            inert.push("use_cauchy");
        }
        if self.use_jerasure_matrix {
            inert.push("use_jerasure_matrix");
        }
        if self.use_par1_matrix {
            inert.push("use_par1_matrix");
        }
        if self.fast_one_parity {
            inert.push("fast_one_parity");
        }
        if self.use_avx2 {
            inert.push("use_avx2");
        }
        if self.use_avx512 {
            inert.push("use_avx512");
        }
        if self.use_ssse3 {
            inert.push("use_ssse3");
        }
        if self.use_gfni {
            inert.push("use_gfni");
        }
        if self.concurrent_stream_reads {
            inert.push("concurrent_stream_reads");
        }
        if self.concurrent_stream_writes {
            inert.push("concurrent_stream_writes");
        }
        inert
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_pick_auto_policy_with_no_inert_knobs() {
        let cfg = ErasureConfig::new(4, 2);
        assert_eq!(cfg.with_leopard, LeopardPolicy::Auto);
        assert!(cfg.inert_knobs().is_empty());
        assert_eq!(cfg.total_shards(), 6);
    }

    #[test]
    fn reports_requested_inert_knobs() {
        let mut cfg = ErasureConfig::new(4, 2);
        cfg.use_avx2 = true;
        cfg.use_cauchy = true;
        assert_eq!(cfg.inert_knobs(), vec!["use_cauchy", "use_avx2"]);
    }

    #[test]
    fn reports_inert_concurrency_knobs() {
        let mut cfg = ErasureConfig::new(4, 2);
        cfg.concurrent_stream_reads = true;
        cfg.concurrent_stream_writes = true;
        assert_eq!(
            cfg.inert_knobs(),
            vec!["concurrent_stream_reads", "concurrent_stream_writes"]
        );
    }
}
