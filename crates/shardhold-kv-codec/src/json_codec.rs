use serde::Serialize;
use serde::de::DeserializeOwned;
use shardhold_common::Result;

use crate::{Codec, encoding_err};

/// Alternate human-readable codec. Useful for debugging or interop with
/// tooling that expects JSON; larger and slower than [`crate::BincodeCodec`].
#[derive(Debug, Default, Clone, Copy)]
pub struct JsonCodec;

impl Codec for JsonCodec {
    fn encode_key<K: Serialize>(&self, key: &K) -> Result<Vec<u8>> {
        serde_json::to_vec(key).map_err(|e| encoding_err("json encode_key", e))
    }

    fn decode_key<K: DeserializeOwned>(&self, bytes: &[u8]) -> Result<K> {
        serde_json::from_slice(bytes).map_err(|e| encoding_err("json decode_key", e))
    }

    fn encode_record<T: Serialize>(&self, value: &T) -> Result<Vec<u8>> {
        serde_json::to_vec(value).map_err(|e| encoding_err("json encode_record", e))
    }

    fn decode_record<T: DeserializeOwned>(&self, bytes: &[u8]) -> Result<T> {
        serde_json::from_slice(bytes).map_err(|e| encoding_err("json decode_record", e))
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
        let codec = JsonCodec;
        let widget = Widget {
            name: "bolt".to_string(),
            count: 12,
        };
        let bytes = codec.encode_record(&widget).unwrap();
        let decoded: Widget = codec.decode_record(&bytes).unwrap();
        assert_eq!(widget, decoded);
    }
}
