//! Shared error taxonomy
//!
//! Both the KV core and the erasure core return this error type at their
//! public boundaries so a caller wiring them together (a storage node that
//! indexes shard placement and also erasure-codes object bodies) does not
//! have to juggle two incompatible error hierarchies. Each crate also keeps
//! a narrower crate-local error enum for the failure modes only it can
//! produce; those convert into this one via `From`.

use thiserror::Error;

/// Common result type for shardhold operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Common error type shared by the KV indexing core and the erasure core.
#[derive(Debug, Error)]
pub enum Error {
    // ---- KV: preconditions (fatal programmer errors at the boundary) ----
    #[error("field name must begin with an uppercase letter: {0}")]
    LowercaseField(String),

    #[error("nested/dotted index path is not supported: {0}")]
    DottedIndexPath(String),

    #[error("unknown field: {0}")]
    UnknownField(String),

    #[error("Skip/Limit may appear at most once per query and never inside an Or-branch")]
    DuplicateModifier,

    #[error("type has no declared name (anonymous or non-struct type)")]
    UnnamedType,

    // ---- KV: constraints ----
    #[error("unique index violation")]
    UniqueExists,

    #[error("key not found")]
    NotFound,

    #[error("key already exists")]
    KeyExists,

    #[error("stored value does not match requested type")]
    TypeMismatch,

    #[error("storage engine transaction conflict")]
    TxConflict,

    // ---- RS: data shape ----
    #[error("too few shards provided")]
    TooFewShards,

    #[error("shard size mismatch")]
    ShardSize,

    #[error("all shards have zero length")]
    ShardNoData,

    #[error("shard size is invalid for this codec (must be > 0 and, for GF16, a multiple of 64)")]
    InvalidShardSize,

    #[error("source data shorter than the requested output size")]
    ShortData,

    #[error("inconsistent nil-shard pattern for an in-place update")]
    InvalidInput,

    #[error("requested shard count exceeds this codec's maximum")]
    MaxShardNum,

    #[error("invalid shard count for this codec")]
    InvShardNum,

    #[error("reconstruct() was asked to both read and write the same shard position")]
    ReconstructMismatch,

    #[error("Join() needs Reconstruct() first: a required data shard is missing")]
    ReconstructRequired,

    #[error("operation not supported by this codec")]
    NotSupported,

    #[error("read error on stream {stream}: {source}")]
    StreamRead {
        stream: usize,
        #[source]
        source: std::io::Error,
    },

    #[error("write error on stream {stream}: {source}")]
    StreamWrite {
        stream: usize,
        #[source]
        source: std::io::Error,
    },

    // ---- shared ----
    #[error("user-supplied predicate or callback failed: {0}")]
    Predicate(String),

    #[error("encoding error: {0}")]
    Encoding(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Preconditions and index-tree corruption are fatal faults in the
    /// source design; in Rust we still return `Err` (never panic across an
    /// API boundary) but callers can use this to decide whether a retry is
    /// ever sensible.
    #[must_use]
    pub const fn is_precondition(&self) -> bool {
        matches!(
            self,
            Self::LowercaseField(_)
                | Self::DottedIndexPath(_)
                | Self::DuplicateModifier
                | Self::UnnamedType
        )
    }

    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::TxConflict)
    }
}
