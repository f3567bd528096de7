//! Record and key codecs for the shardhold KV store.
//!
//! The store is generic over a [`Codec`] so the on-disk representation is a
//! deliberate choice rather than a hard-coded format. Neither codec shipped
//! here claims byte-compatibility with any non-Rust reference encoding —
//! each is a fresh, self-contained format, documented as such.

mod bincode_codec;
mod json_codec;

pub use bincode_codec::BincodeCodec;
pub use json_codec::JsonCodec;

use serde::Serialize;
use serde::de::DeserializeOwned;
use shardhold_common::{Error, Result};

/// Encodes and decodes primary keys and records to and from bytes.
///
/// Both `encode_key`/`decode_key` must be deterministic and length-stable
/// for a fixed key type: the same logical key always produces the same
/// bytes, and two keys of the same type never produce encodings one of
/// which is a strict prefix of the other in a way that would break the
/// engine's prefix-scan ordering guarantees for that type's keyspace.
pub trait Codec: Send + Sync + 'static {
    fn encode_key<K: Serialize>(&self, key: &K) -> Result<Vec<u8>>;
    fn decode_key<K: DeserializeOwned>(&self, bytes: &[u8]) -> Result<K>;
    fn encode_record<T: Serialize>(&self, value: &T) -> Result<Vec<u8>>;
    fn decode_record<T: DeserializeOwned>(&self, bytes: &[u8]) -> Result<T>;
}

fn encoding_err(context: &str, err: impl std::fmt::Display) -> Error {
    Error::Encoding(format!("{context}: {err}"))
}
