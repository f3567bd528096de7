//! Fast checksum helpers used to validate shards and engine payloads.

/// A fast, non-cryptographic checksum pair used to cheaply detect shard
/// corruption before spending cycles on a full Reed-Solomon `Verify`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Checksum {
    pub crc32c: u32,
    pub xxhash64: u64,
}

impl Checksum {
    #[must_use]
    pub fn compute(data: &[u8]) -> Self {
        Self {
            crc32c: crc32c::crc32c(data),
            xxhash64: xxhash_rust::xxh64::xxh64(data, 0),
        }
    }

    #[must_use]
    pub fn verify(&self, data: &[u8]) -> bool {
        crc32c::crc32c(data) == self.crc32c && xxhash_rust::xxh64::xxh64(data, 0) == self.xxhash64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verify_detects_corruption() {
        let data = b"shardhold";
        let sum = Checksum::compute(data);
        assert!(sum.verify(data));
        assert!(!sum.verify(b"shardhole"));
    }
}
