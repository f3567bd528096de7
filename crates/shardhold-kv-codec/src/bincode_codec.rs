use serde::Serialize;
use serde::de::DeserializeOwned;
use shardhold_common::Result;

use crate::{Codec, encoding_err};

/// Default codec: deterministic, length-stable `bincode` encoding.
///
/// This is the recommended codec for new stores — it is compact and its
/// output for a given value never changes across encodes within the same
/// schema, which the key-ordering and index-dedup logic depend on.
#[derive(Debug, Default, Clone, Copy)]
pub struct BincodeCodec;

impl Codec for BincodeCodec {
    fn encode_key<K: Serialize>(&self, key: &K) -> Result<Vec<u8>> {
        bincode::serialize(key).map_err(|e| encoding_err("bincode encode_key", e))
    }

    fn decode_key<K: DeserializeOwned>(&self, bytes: &[u8]) -> Result<K> {
        bincode::deserialize(bytes).map_err(|e| encoding_err("bincode decode_key", e))
    }

    fn encode_record<T: Serialize>(&self, value: &T) -> Result<Vec<u8>> {
        bincode::serialize(value).map_err(|e| encoding_err("bincode encode_record", e))
    }

    fn decode_record<T: DeserializeOwned>(&self, bytes: &[u8]) -> Result<T> {
        bincode::deserialize(bytes).map_err(|e| encoding_err("bincode decode_record", e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Widget {
        name: String,
        count: u32,
    }

    #[test]
    fn round_trips_a_record() {
        let codec = BincodeCodec;
        let widget = Widget {
            name: "bolt".to_string(),
            count: 12,
        };
        let bytes = codec.encode_record(&widget).unwrap();
        let decoded: Widget = codec.decode_record(&bytes).unwrap();
        assert_eq!(widget, decoded);
    }

    #[test]
    fn encoding_a_key_is_deterministic() {
        let codec = BincodeCodec;
        let a = codec.encode_key(&42u64).unwrap();
        let b = codec.encode_key(&42u64).unwrap();
        assert_eq!(a, b);
    }
}
