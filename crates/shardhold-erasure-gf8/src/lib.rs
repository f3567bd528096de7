//! Classical Reed-Solomon erasure coding over GF(2⁸).
//!
//! [`Gf8Codec`] supports the full operation set spec.md §4.4 calls for —
//! `Encode`, `Verify`, `Reconstruct`, `EncodeIdx`, `Update` — capped at 256
//! total shards by the field size.

mod codec;
mod galois;
mod inversion_tree;
mod matrix;

pub use codec::Gf8Codec;
