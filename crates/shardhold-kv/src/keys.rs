//! On-disk key layout (spec.md §6, "KV storage layout (bit-level)").
//!
//! - Primary record: `bh_<TypeName>:<encodedKey>`
//! - Secondary index entry: `_bhIndex:<TypeName>:<IndexName>:<encodedValue>`
//! - Sequence counter: `_bhSeq:<TypeName>`
//!
//! All three live in the same ordered keyspace, distinguished purely by
//! prefix, so a type-prefix scan (`bh_<TypeName>:`) never picks up index or
//! sequence entries belonging to the same type.

pub fn primary_prefix(type_name: &str) -> Vec<u8> {
    format!("bh_{type_name}:").into_bytes()
}

pub fn primary_key(type_name: &str, encoded_key: &[u8]) -> Vec<u8> {
    let mut key = primary_prefix(type_name);
    key.extend_from_slice(encoded_key);
    key
}

pub fn index_prefix(type_name: &str, index_name: &str) -> Vec<u8> {
    format!("_bhIndex:{type_name}:{index_name}:").into_bytes()
}

pub fn index_key(type_name: &str, index_name: &str, encoded_value: &[u8]) -> Vec<u8> {
    let mut key = index_prefix(type_name, index_name);
    key.extend_from_slice(encoded_value);
    key
}

pub fn sequence_key(type_name: &str) -> Vec<u8> {
    format!("_bhSeq:{type_name}").into_bytes()
}

/// The primary key bytes with the `bh_<TypeName>:` prefix stripped.
#[must_use]
pub fn strip_primary_prefix<'a>(type_name: &str, key: &'a [u8]) -> &'a [u8] {
    let prefix = primary_prefix(type_name);
    key.strip_prefix(prefix.as_slice()).unwrap_or(key)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn primary_key_is_prefixed_with_type_name() {
        let key = primary_key("Widget", b"\x00\x00\x00\x01");
        assert!(key.starts_with(b"bh_Widget:"));
    }

    #[test]
    fn index_key_distinguishes_index_from_primary() {
        let idx = index_key("Widget", "Category", b"vehicle");
        assert!(idx.starts_with(b"_bhIndex:Widget:Category:"));
        assert!(!idx.starts_with(b"bh_"));
    }

    #[test]
    fn strip_primary_prefix_roundtrips() {
        let key = primary_key("Widget", b"abc");
        assert_eq!(strip_primary_prefix("Widget", &key), b"abc");
    }
}
