//! Type metadata: the typed replacement for the source system's runtime
//! struct-tag reflection (spec design note: "a purely typed reimplementation
//! should expose a `Storer` interface... this mirrors the fast path").
//!
//! User record types implement [`Storer`], normally via
//! `#[derive(shardhold_kv_derive::Storer)]` rather than by hand. The store
//! never inspects a type before it has resolved a [`TypeMeta`] for it, and
//! that resolution happens once (the derive macro caches it in a
//! `OnceLock`), matching the "resolved once at first use and cached"
//! design note.

use shardhold_common::{Error, Result};

/// One secondary index declared on a record type.
#[derive(Debug, Clone, Copy)]
pub struct IndexDescriptor {
    pub name: &'static str,
    pub field: &'static str,
    pub unique: bool,
}

/// Resolved metadata for a record type: its logical name, optional key
/// field, and its index descriptors.
#[derive(Debug, Clone)]
pub struct TypeMeta {
    pub name: &'static str,
    pub key_field: Option<&'static str>,
    pub indexes: Vec<IndexDescriptor>,
}

impl TypeMeta {
    #[must_use]
    pub fn index(&self, name: &str) -> Option<&IndexDescriptor> {
        self.indexes.iter().find(|idx| idx.name == name)
    }
}

/// A type-erased, comparable field value. Query criteria and index encoding
/// operate on this rather than on a record's native field type, since the
/// planner and `IndexMgr` both need to compare and serialize field values
/// without knowing the record type at compile time.
#[derive(Debug, Clone, PartialEq, PartialOrd)]
pub enum FieldValue {
    Bool(bool),
    I64(i64),
    U64(u64),
    F64(f64),
    Str(String),
    Bytes(Vec<u8>),
    StrList(Vec<String>),
    Map(Vec<(String, String)>),
    None,
}

impl FieldValue {
    /// Deterministic, order-preserving-where-possible byte encoding used for
    /// index entry keys. Strings and bytes encode as themselves (UTF-8
    /// order matches string order); numbers encode big-endian with a sign
    /// flip on signed integers so byte order matches numeric order.
    #[must_use]
    pub fn encode(&self) -> Vec<u8> {
        match self {
            Self::Bool(b) => vec![u8::from(*b)],
            Self::I64(n) => (*n as u64 ^ (1 << 63)).to_be_bytes().to_vec(),
            Self::U64(n) => n.to_be_bytes().to_vec(),
            Self::F64(f) => f.to_be_bytes().to_vec(),
            Self::Str(s) => s.as_bytes().to_vec(),
            Self::Bytes(b) => b.clone(),
            Self::StrList(items) => items.join("\u{0}").into_bytes(),
            Self::Map(entries) => entries
                .iter()
                .map(|(k, v)| format!("{k}={v}"))
                .collect::<Vec<_>>()
                .join("\u{0}")
                .into_bytes(),
            Self::None => Vec::new(),
        }
    }

    #[must_use]
    pub fn has_key(&self, key: &str) -> bool {
        match self {
            Self::Map(entries) => entries.iter().any(|(k, _)| k == key),
            _ => false,
        }
    }

    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(s) => Some(s.as_str()),
            _ => None,
        }
    }

    #[must_use]
    pub fn contains(&self, needle: &Self) -> bool {
        match (self, needle) {
            (Self::StrList(items), Self::Str(s)) => items.iter().any(|item| item == s),
            _ => false,
        }
    }
}

macro_rules! from_field_value {
    ($ty:ty, $variant:ident) => {
        impl From<&$ty> for FieldValue {
            fn from(value: &$ty) -> Self {
                Self::$variant(value.clone())
            }
        }
    };
}

impl From<&bool> for FieldValue {
    fn from(value: &bool) -> Self {
        Self::Bool(*value)
    }
}
impl From<&i64> for FieldValue {
    fn from(value: &i64) -> Self {
        Self::I64(*value)
    }
}
impl From<&i32> for FieldValue {
    fn from(value: &i32) -> Self {
        Self::I64(i64::from(*value))
    }
}
impl From<&u64> for FieldValue {
    fn from(value: &u64) -> Self {
        Self::U64(*value)
    }
}
impl From<&u32> for FieldValue {
    fn from(value: &u32) -> Self {
        Self::U64(u64::from(*value))
    }
}
impl From<&f64> for FieldValue {
    fn from(value: &f64) -> Self {
        Self::F64(*value)
    }
}
from_field_value!(String, Str);
from_field_value!(Vec<u8>, Bytes);
from_field_value!(Vec<String>, StrList);
from_field_value!(Vec<(String, String)>, Map);

macro_rules! from_owned_field_value {
    ($ty:ty, $variant:ident) => {
        impl From<$ty> for FieldValue {
            fn from(value: $ty) -> Self {
                Self::$variant(value)
            }
        }
    };
}

from_owned_field_value!(bool, Bool);
from_owned_field_value!(i64, I64);
from_owned_field_value!(u64, U64);
from_owned_field_value!(f64, F64);
from_owned_field_value!(String, Str);
from_owned_field_value!(Vec<u8>, Bytes);
from_owned_field_value!(Vec<String>, StrList);
from_owned_field_value!(Vec<(String, String)>, Map);

impl From<i32> for FieldValue {
    fn from(value: i32) -> Self {
        Self::I64(i64::from(value))
    }
}
impl From<u32> for FieldValue {
    fn from(value: u32) -> Self {
        Self::U64(u64::from(value))
    }
}
impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        Self::Str(value.to_string())
    }
}

impl TryFrom<FieldValue> for u64 {
    type Error = Error;
    fn try_from(value: FieldValue) -> Result<Self> {
        match value {
            FieldValue::U64(n) => Ok(n),
            FieldValue::I64(n) if n >= 0 => Ok(n as u64),
            _ => Err(Error::TypeMismatch),
        }
    }
}

impl TryFrom<FieldValue> for i64 {
    type Error = Error;
    fn try_from(value: FieldValue) -> Result<Self> {
        match value {
            FieldValue::I64(n) => Ok(n),
            FieldValue::U64(n) if n <= i64::MAX as u64 => Ok(n as i64),
            _ => Err(Error::TypeMismatch),
        }
    }
}

impl TryFrom<FieldValue> for String {
    type Error = Error;
    fn try_from(value: FieldValue) -> Result<Self> {
        match value {
            FieldValue::Str(s) => Ok(s),
            _ => Err(Error::TypeMismatch),
        }
    }
}

/// Implemented by every record type usable with [`crate::Store`]. Normally
/// generated via `#[derive(shardhold_kv_derive::Storer)]`.
pub trait Storer: Sized {
    fn type_name() -> &'static str;
    fn meta() -> &'static TypeMeta;
    fn field_value(&self, field: &str) -> Option<FieldValue>;
    fn key_value(&self) -> Option<FieldValue>;
    fn set_key_value(&mut self, value: FieldValue);
}

/// Validates a logical field name per spec.md §4.1: must begin with an
/// uppercase letter, and must not be a dotted (nested) path.
pub fn validate_field_name(name: &str) -> Result<()> {
    if name.contains('.') {
        return Err(Error::DottedIndexPath(name.to_string()));
    }
    match name.chars().next() {
        Some(c) if c.is_uppercase() => Ok(()),
        _ => Err(Error::LowercaseField(name.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_lowercase_field_names() {
        assert!(validate_field_name("category").is_err());
        assert!(validate_field_name("Category").is_ok());
    }

    #[test]
    fn rejects_dotted_field_names() {
        assert!(validate_field_name("Address.City").is_err());
    }

    #[test]
    fn signed_integer_encoding_preserves_order() {
        let neg = FieldValue::I64(-5).encode();
        let zero = FieldValue::I64(0).encode();
        let pos = FieldValue::I64(5).encode();
        assert!(neg < zero);
        assert!(zero < pos);
    }
}
