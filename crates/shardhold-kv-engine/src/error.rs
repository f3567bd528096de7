//! Engine-local error type.
//!
//! `redb` surfaces several distinct error enums (`TransactionError`,
//! `TableError`, `StorageError`, `CommitError`) across its API. Rather than
//! leak that shape to callers of [`crate::Engine`], everything collapses
//! into [`EngineError`], which itself converts into the workspace-wide
//! `shardhold_common::Error` at the `shardhold-kv` boundary.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, EngineError>;

#[derive(Debug, Error)]
pub enum EngineError {
    /// The transaction could not be committed because another writer
    /// committed first. Callers of [`crate::Engine::update`] never see this
    /// directly — the engine retries the whole closure internally — but it
    /// is exposed so an in-memory test fake can exercise the retry path.
    #[error("transaction conflict")]
    Conflict,

    #[error("sequence counter for type {0:?} overflowed u64")]
    SequenceOverflow(String),

    #[error("storage backend error: {0}")]
    Backend(String),

    #[error("corrupt stored value: {0}")]
    Corrupt(String),
}

impl EngineError {
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::Conflict)
    }
}

impl From<EngineError> for shardhold_common::Error {
    fn from(err: EngineError) -> Self {
        match err {
            EngineError::Conflict => Self::TxConflict,
            EngineError::SequenceOverflow(t) => {
                Self::Internal(format!("sequence overflow for type {t:?}"))
            }
            EngineError::Backend(msg) | EngineError::Corrupt(msg) => Self::Internal(msg),
        }
    }
}

impl From<redb::TransactionError> for EngineError {
    fn from(err: redb::TransactionError) -> Self {
        Self::Backend(err.to_string())
    }
}

impl From<redb::TableError> for EngineError {
    fn from(err: redb::TableError) -> Self {
        Self::Backend(err.to_string())
    }
}

impl From<redb::StorageError> for EngineError {
    fn from(err: redb::StorageError) -> Self {
        Self::Backend(err.to_string())
    }
}

// `redb` serializes writers internally (`begin_write` blocks until the
// previous writer commits), so it never reports an optimistic-concurrency
// conflict the way an MVCC engine would. `Conflict` is still part of this
// enum for the `Engine` trait's contract and is what the in-memory test
// fake in `memory.rs` uses to exercise `Engine::update`'s retry loop.
impl From<redb::CommitError> for EngineError {
    fn from(err: redb::CommitError) -> Self {
        Self::Backend(err.to_string())
    }
}

impl From<redb::DatabaseError> for EngineError {
    fn from(err: redb::DatabaseError) -> Self {
        Self::Backend(err.to_string())
    }
}
