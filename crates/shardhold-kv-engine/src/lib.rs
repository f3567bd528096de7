//! Shardhold KV Engine - opaque transactional storage binding
//!
//! The indexing layer (`shardhold-kv`) never talks to a concrete storage
//! engine directly. It is written against the [`Engine`] trait, which
//! mirrors exactly the surface the design calls for: `View`, `Update`,
//! `Get`, `Set`, `Delete`, a prefix-ordered iterator, and a monotonic
//! per-type sequence allocator. This crate supplies the one engine
//! implementation this workspace ships, backed by `redb`.
//!
//! Keeping this binding in its own crate (rather than hard-coding `redb`
//! calls inside `shardhold-kv`) is what lets the index manager, query
//! planner, and aggregation code stay storage-agnostic and unit-testable
//! against an in-memory fake.

pub mod error;
pub mod redb_engine;
pub mod sequence;

#[cfg(test)]
pub mod memory;

pub use error::{EngineError, Result};

/// Read access available inside both `View` and `Update` closures.
///
/// Implementors hand back owned `Vec<u8>` rather than borrowed slices so the
/// trait stays object-safe (`&dyn Transaction`) regardless of the backing
/// engine's own borrow shape.
pub trait Transaction {
    /// Point lookup. `Ok(None)` means the key is absent.
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>>;

    /// All entries whose key starts with `prefix`, in the engine's natural
    /// ascending byte order. Materialized eagerly: callers needing a large
    /// scan should narrow `prefix` rather than relying on engine-side
    /// streaming, which this trait intentionally does not expose (see
    /// module docs).
    fn iter_prefix(&self, prefix: &[u8]) -> Result<Vec<(Vec<u8>, Vec<u8>)>>;
}

/// Write access, only available inside an `Update` closure.
pub trait MutableTransaction: Transaction {
    fn set(&mut self, key: &[u8], value: &[u8]) -> Result<()>;
    fn delete(&mut self, key: &[u8]) -> Result<()>;
}

/// The opaque engine contract the indexing layer is written against.
///
/// `view`/`update` take closures rather than returning a transaction handle
/// so the engine keeps full control over when a transaction begins, commits,
/// retries, or aborts — callers can never hold a transaction open across an
/// `.await` point or a lock they forgot to release.
///
/// Both methods are generic over the closure's own error type `Err` rather
/// than fixed to [`EngineError`]: callers like `shardhold-kv` need to fail a
/// transaction with a domain error (`UniqueExists`, `KeyExists`, a failed
/// predicate) that has nothing to do with the storage engine. `Err: From<
/// EngineError>` lets `?` on a `Transaction`/`MutableTransaction` call
/// inside the closure convert automatically.
pub trait Engine: Send + Sync {
    /// Run `f` inside a read-only transaction. Multiple views may run
    /// concurrently with each other and with in-flight updates; each sees a
    /// consistent snapshot.
    fn view<R, Err: From<EngineError>>(
        &self,
        f: impl FnOnce(&dyn Transaction) -> std::result::Result<R, Err>,
    ) -> std::result::Result<R, Err>;

    /// Run `f` inside a single read-write transaction. On
    /// [`EngineError::Conflict`] the *entire* closure is retried from
    /// scratch (no partial retry) per the design's transaction discipline;
    /// `f` must therefore be idempotent with respect to any side effects
    /// outside the transaction.
    fn update<R, Err: From<EngineError>>(
        &self,
        f: impl FnOnce(&mut dyn MutableTransaction) -> std::result::Result<R, Err>,
    ) -> std::result::Result<R, Err>;

    /// Allocate the next value in a per-type monotonic sequence. `bandwidth`
    /// values are reserved from the engine per round-trip and handed out
    /// from an in-memory cache; a process restart starts after the last
    /// persisted high-water mark, so up to `bandwidth - 1` values may be
    /// skipped across a restart but the sequence never goes backwards or
    /// repeats.
    fn next_sequence(&self, type_name: &str, bandwidth: u64) -> Result<u64>;
}

pub use redb_engine::RedbEngine;
