//! `IndexMgr` — keeps secondary indexes consistent with primary records
//! across every mutation (spec.md §4.2).

use shardhold_common::{Error, Result};
use shardhold_kv_engine::MutableTransaction;

use crate::keys;
use crate::meta::{FieldValue, TypeMeta};

/// A sorted, deduplicated sequence of primary-key byte strings: the value
/// type of a secondary index entry. Binary-sorted in the engine's natural
/// byte order so membership and insert/remove are `O(log N)` positional
/// operations with a final shift.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeyList(Vec<Vec<u8>>);

impl KeyList {
    #[must_use]
    pub fn new() -> Self {
        Self(Vec::new())
    }

    #[must_use]
    pub fn from_sorted(keys: Vec<Vec<u8>>) -> Self {
        Self(keys)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[must_use]
    pub fn contains(&self, pk: &[u8]) -> bool {
        self.0.binary_search_by(|k| k.as_slice().cmp(pk)).is_ok()
    }

    #[must_use]
    pub fn as_slice(&self) -> &[Vec<u8>] {
        &self.0
    }

    /// Insert `pk` keeping the list sorted and deduplicated. Returns `false`
    /// if `pk` was already present.
    pub fn insert(&mut self, pk: Vec<u8>) -> bool {
        match self.0.binary_search(&pk) {
            Ok(_) => false,
            Err(pos) => {
                self.0.insert(pos, pk);
                true
            }
        }
    }

    /// Remove `pk`. Returns `false` if it was not present.
    pub fn remove(&mut self, pk: &[u8]) -> bool {
        match self.0.binary_search_by(|k| k.as_slice().cmp(pk)) {
            Ok(pos) => {
                self.0.remove(pos);
                true
            }
            Err(_) => false,
        }
    }

    #[must_use]
    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::new();
        out.extend_from_slice(&(self.0.len() as u32).to_be_bytes());
        for key in &self.0 {
            out.extend_from_slice(&(key.len() as u32).to_be_bytes());
            out.extend_from_slice(key);
        }
        out
    }

    pub fn decode(bytes: &[u8]) -> Result<Self> {
        let mut cursor = 0usize;
        let read_u32 = |bytes: &[u8], cursor: &mut usize| -> Result<u32> {
            let slice = bytes
                .get(*cursor..*cursor + 4)
                .ok_or_else(|| Error::Internal("truncated KeyList".to_string()))?;
            *cursor += 4;
            Ok(u32::from_be_bytes(slice.try_into().expect("4 bytes")))
        };
        let count = read_u32(bytes, &mut cursor)?;
        let mut keys = Vec::with_capacity(count as usize);
        for _ in 0..count {
            let len = read_u32(bytes, &mut cursor)? as usize;
            let slice = bytes
                .get(cursor..cursor + len)
                .ok_or_else(|| Error::Internal("truncated KeyList entry".to_string()))?;
            keys.push(slice.to_vec());
            cursor += len;
        }
        Ok(Self(keys))
    }
}

fn load_key_list(txn: &dyn shardhold_kv_engine::Transaction, key: &[u8]) -> Result<KeyList> {
    match txn.get(key).map_err(shardhold_common::Error::from)? {
        Some(bytes) => KeyList::decode(&bytes),
        None => Ok(KeyList::new()),
    }
}

/// Compute the encoded index value for `field` if `meta` declares an index
/// on it.
fn index_value(record_field: Option<FieldValue>) -> Vec<u8> {
    record_field.unwrap_or(FieldValue::None).encode()
}

/// For each index of `meta`, insert `pk` into that index's `KeyList`.
/// Enforces uniqueness: a unique index whose list would gain a *second*
/// distinct key faults with [`Error::UniqueExists`] and nothing is written
/// (the caller's surrounding engine transaction, if it then errors out,
/// leaves no partial index state since writes only happen after every
/// index has been checked).
pub fn add(
    txn: &mut dyn MutableTransaction,
    meta: &TypeMeta,
    pk: &[u8],
    field_values: impl Fn(&str) -> Option<FieldValue>,
) -> Result<()> {
    // First pass: check every unique constraint before writing anything, so
    // a failure here leaves the transaction's index state untouched.
    for idx in &meta.indexes {
        if !idx.unique {
            continue;
        }
        let value = index_value(field_values(idx.field));
        let list_key = keys::index_key(meta.name, idx.name, &value);
        let list = load_key_list(txn, &list_key)?;
        if !list.is_empty() && !list.contains(pk) {
            return Err(Error::UniqueExists);
        }
    }

    for idx in &meta.indexes {
        let value = index_value(field_values(idx.field));
        let list_key = keys::index_key(meta.name, idx.name, &value);
        let mut list = load_key_list(txn, &list_key)?;
        list.insert(pk.to_vec());
        txn.set(&list_key, &list.encode())
            .map_err(shardhold_common::Error::from)?;
    }
    Ok(())
}

/// Remove `pk` from every index of `meta`, using `prior_field_values` (the
/// record's field values *before* the mutation that is removing it).
/// Deletes an index entry outright once its `KeyList` becomes empty so no
/// orphan entries remain.
pub fn remove(
    txn: &mut dyn MutableTransaction,
    meta: &TypeMeta,
    pk: &[u8],
    prior_field_values: impl Fn(&str) -> Option<FieldValue>,
) -> Result<()> {
    for idx in &meta.indexes {
        let value = index_value(prior_field_values(idx.field));
        let list_key = keys::index_key(meta.name, idx.name, &value);
        let mut list = load_key_list(txn, &list_key)?;
        list.remove(pk);
        if list.is_empty() {
            txn.delete(&list_key)
                .map_err(shardhold_common::Error::from)?;
        } else {
            txn.set(&list_key, &list.encode())
                .map_err(shardhold_common::Error::from)?;
        }
    }
    Ok(())
}

/// Read all primary keys currently listed under `index_name` for `value`.
pub fn lookup(
    txn: &dyn shardhold_kv_engine::Transaction,
    type_name: &str,
    index_name: &str,
    value: &FieldValue,
) -> Result<KeyList> {
    let list_key = keys::index_key(type_name, index_name, &value.encode());
    load_key_list(txn, &list_key)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_list_insert_keeps_sorted_order() {
        let mut list = KeyList::new();
        list.insert(b"b".to_vec());
        list.insert(b"a".to_vec());
        list.insert(b"c".to_vec());
        assert_eq!(
            list.as_slice(),
            &[b"a".to_vec(), b"b".to_vec(), b"c".to_vec()]
        );
    }

    #[test]
    fn key_list_insert_is_idempotent() {
        let mut list = KeyList::new();
        assert!(list.insert(b"a".to_vec()));
        assert!(!list.insert(b"a".to_vec()));
        assert_eq!(list.len(), 1);
    }

    #[test]
    fn key_list_round_trips_through_encode_decode() {
        let mut list = KeyList::new();
        list.insert(b"alpha".to_vec());
        list.insert(b"beta".to_vec());
        let bytes = list.encode();
        let decoded = KeyList::decode(&bytes).unwrap();
        assert_eq!(list, decoded);
    }

    #[test]
    fn key_list_remove_then_empty_reports_empty() {
        let mut list = KeyList::new();
        list.insert(b"a".to_vec());
        assert!(list.remove(b"a"));
        assert!(list.is_empty());
        assert!(!list.remove(b"a"));
    }
}
