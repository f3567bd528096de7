//! Reed-Solomon erasure coding over GF(2¹⁶), for shard counts beyond
//! `shardhold-erasure-gf8`'s 256-shard ceiling.
//!
//! [`Gf16Codec`] does not support `encode_idx`/`update` (spec.md §4.5).

mod bitfield;
mod codec;
mod field16;
mod fwht;
mod inversion_cache;
mod matrix;

pub use codec::Gf16Codec;
