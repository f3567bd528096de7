//! Streaming and file-backed drivers for the erasure backends in
//! `shardhold-erasure-gf8`/`shardhold-erasure-gf16`.
//!
//! Neither driver knows which field it is coding over — both take any
//! `&dyn ErasureBackend` (or a concrete codec by reference) and loop over
//! readers/writers a block at a time (spec.md §4.6).

mod codec;
mod file;
mod io_util;
mod stream;

pub use codec::ErasureCodec;
pub use file::FileDriver;
pub use stream::StreamCodec;
