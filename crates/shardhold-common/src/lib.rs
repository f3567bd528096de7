//! Shardhold Common - shared error types and low-level utilities
//!
//! This crate provides the error taxonomy shared by the KV indexing core and
//! the erasure coding core, plus small utilities (checksums, aligned
//! buffers) that both depend on without depending on each other.

pub mod align;
pub mod checksum;
pub mod error;

pub use checksum::Checksum;
pub use error::{Error, Result};
