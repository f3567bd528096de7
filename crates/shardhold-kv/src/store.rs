//! The store façade: ties `Engine`, `Codec`, `TypeMeta`, `IndexMgr`, and the
//! query engine together into the public CRUD + query API.

use serde::Serialize;
use serde::de::DeserializeOwned;
use shardhold_common::{Error, Result};
use shardhold_kv_codec::Codec;
use shardhold_kv_engine::{Engine, MutableTransaction, Transaction};
use tracing::instrument;

use crate::aggregate::{self, Group};
use crate::index;
use crate::keys;
use crate::meta::{FieldValue, Storer};
use crate::query::{self, Query};

/// How a record's primary key is supplied to [`Store::insert`].
pub enum Key {
    /// Use this exact key.
    Explicit(FieldValue),
    /// Allocate the next value from this type's sequence allocator and
    /// write it back into the record's key field.
    AutoSequence,
}

/// Default bandwidth (values reserved per engine round-trip) for
/// [`Key::AutoSequence`] inserts. See spec.md §6 `sequenceBandwidth`.
pub const DEFAULT_SEQUENCE_BANDWIDTH: u64 = 100;

/// An indexed, queryable embedded KV store over engine `E` using codec `C`.
pub struct Store<E, C> {
    engine: E,
    codec: C,
    sequence_bandwidth: u64,
}

impl<E: Engine, C: Codec> Store<E, C> {
    pub fn new(engine: E, codec: C) -> Self {
        Self {
            engine,
            codec,
            sequence_bandwidth: DEFAULT_SEQUENCE_BANDWIDTH,
        }
    }

    #[must_use]
    pub fn with_sequence_bandwidth(mut self, bandwidth: u64) -> Self {
        self.sequence_bandwidth = bandwidth;
        self
    }

    fn encode_key(&self, value: &FieldValue) -> Vec<u8> {
        // Key encoding goes through the value's own canonical byte form
        // rather than the pluggable record codec, so primary-key ordering
        // stays stable regardless of which record codec is configured.
        value.encode()
    }

    /// Insert a new record under `key`. Faults with [`Error::KeyExists`] if
    /// the primary key is already present. Returns the key actually used
    /// (meaningful for [`Key::AutoSequence`]).
    #[instrument(skip(self, record))]
    pub fn insert<R>(&self, key: Key, record: &mut R) -> Result<FieldValue>
    where
        R: Storer + Serialize + DeserializeOwned,
    {
        let meta = R::meta();
        self.engine.update(|txn| {
            let resolved_key = match &key {
                Key::Explicit(k) => k.clone(),
                Key::AutoSequence => {
                    let seq = self
                        .engine
                        .next_sequence(meta.name, self.sequence_bandwidth)
                        .map_err(Error::from)?;
                    FieldValue::U64(seq)
                }
            };
            let encoded_key = self.encode_key(&resolved_key);
            let pk = keys::primary_key(meta.name, &encoded_key);

            if txn.get(&pk).map_err(Error::from)?.is_some() {
                return Err(Error::KeyExists);
            }

            record.set_key_value(resolved_key.clone());
            let field_values = |field: &str| record.field_value(field);
            index::add(txn, meta, &encoded_key, field_values)?;

            let encoded_record = self
                .codec
                .encode_record(record)
                .map_err(|_| Error::Encoding("record encode failed".to_string()))?;
            txn.set(&pk, &encoded_record).map_err(Error::from)?;
            Ok(resolved_key)
        })
    }

    /// Fetch a single record by primary key.
    #[instrument(skip(self))]
    pub fn get<R>(&self, key: &FieldValue) -> Result<Option<R>>
    where
        R: Storer + Serialize + DeserializeOwned,
    {
        let meta = R::meta();
        let encoded_key = self.encode_key(key);
        let pk = keys::primary_key(meta.name, &encoded_key);
        self.engine.view(|txn| {
            let Some(bytes) = txn.get(&pk).map_err(Error::from)? else {
                return Ok(None);
            };
            let mut record: R = self
                .codec
                .decode_record(&bytes)
                .map_err(|_| Error::Encoding("record decode failed".to_string()))?;
            record.set_key_value(key.clone());
            Ok(Some(record))
        })
    }

    /// Replace the record at `key` with `record`, rewriting indexes
    /// (`remove(old) + add(new)`, spec.md §4.2).
    #[instrument(skip(self, record))]
    pub fn update<R>(&self, key: &FieldValue, record: &mut R) -> Result<()>
    where
        R: Storer + Serialize + DeserializeOwned,
    {
        let meta = R::meta();
        let encoded_key = self.encode_key(key);
        let pk = keys::primary_key(meta.name, &encoded_key);
        self.engine.update(|txn| {
            let old_bytes = txn
                .get(&pk)
                .map_err(Error::from)?
                .ok_or(Error::NotFound)?;
            let old_record: R = self
                .codec
                .decode_record(&old_bytes)
                .map_err(|_| Error::Encoding("record decode failed".to_string()))?;
            index::remove(txn, meta, &encoded_key, |field| old_record.field_value(field))?;

            record.set_key_value(key.clone());
            index::add(txn, meta, &encoded_key, |field| record.field_value(field))?;

            let encoded_record = self
                .codec
                .encode_record(record)
                .map_err(|_| Error::Encoding("record encode failed".to_string()))?;
            txn.set(&pk, &encoded_record).map_err(Error::from)?;
            Ok(())
        })
    }

    /// Insert if absent, otherwise `remove(old) + add(new)` (spec.md §4.2).
    #[instrument(skip(self, record))]
    pub fn upsert<R>(&self, key: &FieldValue, record: &mut R) -> Result<()>
    where
        R: Storer + Serialize + DeserializeOwned,
    {
        let meta = R::meta();
        let encoded_key = self.encode_key(key);
        let pk = keys::primary_key(meta.name, &encoded_key);
        self.engine.update(|txn| {
            if let Some(old_bytes) = txn.get(&pk).map_err(Error::from)? {
                let old_record: R = self
                    .codec
                    .decode_record(&old_bytes)
                    .map_err(|_| Error::Encoding("record decode failed".to_string()))?;
                index::remove(txn, meta, &encoded_key, |field| old_record.field_value(field))?;
            }
            record.set_key_value(key.clone());
            index::add(txn, meta, &encoded_key, |field| record.field_value(field))?;
            let encoded_record = self
                .codec
                .encode_record(record)
                .map_err(|_| Error::Encoding("record encode failed".to_string()))?;
            txn.set(&pk, &encoded_record).map_err(Error::from)?;
            Ok(())
        })
    }

    /// Delete the record at `key`, removing it from every index.
    #[instrument(skip(self))]
    pub fn delete<R>(&self, key: &FieldValue) -> Result<()>
    where
        R: Storer + Serialize + DeserializeOwned,
    {
        let meta = R::meta();
        let encoded_key = self.encode_key(key);
        let pk = keys::primary_key(meta.name, &encoded_key);
        self.engine.update(|txn| {
            let Some(bytes) = txn.get(&pk).map_err(Error::from)? else {
                return Err(Error::NotFound);
            };
            let record: R = self
                .codec
                .decode_record(&bytes)
                .map_err(|_| Error::Encoding("record decode failed".to_string()))?;
            index::remove(txn, meta, &encoded_key, |field| record.field_value(field))?;
            txn.delete(&pk).map_err(Error::from)?;
            Ok(())
        })
    }

    /// Run `query` and return every matching decoded record (with its
    /// primary key).
    #[instrument(skip(self, query))]
    pub fn find<R>(&self, query: &Query<R>) -> Result<Vec<(FieldValue, R)>>
    where
        R: Storer + Serialize + DeserializeOwned,
    {
        query.validate()?;
        let meta = R::meta();
        self.engine.view(|txn| {
            let rows = query::execute(txn, meta, query, |bytes| {
                self.codec
                    .decode_record(bytes)
                    .map_err(|_| Error::Encoding("record decode failed".to_string()))
            })?;
            Ok(rows
                .into_iter()
                .map(|(pk, mut record)| {
                    record.set_key_value(FieldValue::Bytes(pk.clone()));
                    (FieldValue::Bytes(pk), record)
                })
                .collect())
        })
    }

    /// `Find(nil-query)` / `Count`: number of records currently matching
    /// `query`.
    pub fn count<R>(&self, query: &Query<R>) -> Result<usize>
    where
        R: Storer + Serialize + DeserializeOwned,
    {
        Ok(self.find(query)?.len())
    }

    /// Execute `query`, group results by `group_by_fields`, and return the
    /// resulting groups (spec.md §4.3 aggregation).
    pub fn find_aggregate<R>(
        &self,
        query: &Query<R>,
        group_by_fields: &[String],
    ) -> Result<Vec<Group<R>>>
    where
        R: Storer + Serialize + DeserializeOwned,
    {
        query.validate()?;
        let meta = R::meta();
        let records = self.engine.view(|txn| {
            query::execute(txn, meta, query, |bytes| {
                self.codec
                    .decode_record(bytes)
                    .map_err(|_| Error::Encoding("record decode failed".to_string()))
            })
        })?;
        Ok(aggregate::group_by(records, group_by_fields))
    }

    /// Read-modify-write every record matching `query` inside one
    /// transaction: decode, remove old indexes, call `mutate`, re-encode,
    /// re-add indexes, write. Aborts the whole transaction (no partial
    /// writes) if `mutate` returns an error.
    #[instrument(skip(self, query, mutate))]
    pub fn update_matching<R>(
        &self,
        query: &Query<R>,
        mutate: impl Fn(&mut R) -> Result<()>,
    ) -> Result<usize>
    where
        R: Storer + Serialize + DeserializeOwned,
    {
        query.validate()?;
        let meta = R::meta();
        self.engine.update(|txn| {
            let rows = query::execute(txn, meta, query, |bytes| {
                self.codec
                    .decode_record(bytes)
                    .map_err(|_| Error::Encoding("record decode failed".to_string()))
            })?;
            let count = rows.len();
            for (pk, mut record) in rows {
                index::remove(txn, meta, &pk, |field| record.field_value(field))?;
                mutate(&mut record)?;
                index::add(txn, meta, &pk, |field| record.field_value(field))?;
                let encoded = self
                    .codec
                    .encode_record(&record)
                    .map_err(|_| Error::Encoding("record encode failed".to_string()))?;
                let full_key = keys::primary_key(meta.name, &pk);
                txn.set(&full_key, &encoded).map_err(Error::from)?;
            }
            Ok(count)
        })
    }

    /// Delete every record matching `query` inside a single transaction.
    #[instrument(skip(self, query))]
    pub fn delete_matching<R>(&self, query: &Query<R>) -> Result<usize>
    where
        R: Storer + Serialize + DeserializeOwned,
    {
        query.validate()?;
        let meta = R::meta();
        self.engine.update(|txn| {
            let rows = query::execute(txn, meta, query, |bytes| {
                self.codec
                    .decode_record(bytes)
                    .map_err(|_| Error::Encoding("record decode failed".to_string()))
            })?;
            let count = rows.len();
            for (pk, record) in rows {
                index::remove(txn, meta, &pk, |field| record.field_value(field))?;
                let full_key = keys::primary_key(meta.name, &pk);
                txn.delete(&full_key).map_err(Error::from)?;
            }
            Ok(count)
        })
    }

    /// Delete every record matching `query` using multiple bounded
    /// transactions of at most `batch_size` records each — the chunked
    /// variant resolving the `TxDeleteMatching` ambiguity flag (see
    /// DESIGN.md). Each batch is atomic; the whole call is not.
    #[instrument(skip(self, query))]
    pub fn delete_matching_batched<R>(&self, query: &Query<R>, batch_size: usize) -> Result<usize>
    where
        R: Storer + Serialize + DeserializeOwned,
    {
        query.validate()?;
        let meta = R::meta();
        let batch_size = batch_size.max(1);
        let mut total = 0usize;
        loop {
            let deleted_this_round = self.engine.update(|txn| {
                let rows = query::execute(txn, meta, query, |bytes| {
                    self.codec
                        .decode_record(bytes)
                        .map_err(|_| Error::Encoding("record decode failed".to_string()))
                })?;
                let batch: Vec<_> = rows.into_iter().take(batch_size).collect();
                let count = batch.len();
                for (pk, record) in batch {
                    index::remove(txn, meta, &pk, |field| record.field_value(field))?;
                    let full_key = keys::primary_key(meta.name, &pk);
                    txn.delete(&full_key).map_err(Error::from)?;
                }
                Ok::<usize, Error>(count)
            })?;
            total += deleted_this_round;
            if deleted_this_round < batch_size {
                break;
            }
        }
        Ok(total)
    }

    pub fn next_sequence(&self, type_name: &str, bandwidth: u64) -> Result<u64> {
        self.engine.next_sequence(type_name, bandwidth).map_err(Error::from)
    }
}
