//! Classical GF(2⁸) Vandermonde Reed-Solomon codec.
//!
//! Grounded on `10e272f7_luckyturtle-reed-solomon-erasure__src-lib.rs.rs`'s
//! `ReedSolomon`: `build_matrix` produces an encode matrix whose top
//! `data_shards` rows are the identity and whose remaining rows are parity
//! coefficients; `code_some_slices`/`code_single_slice` compute one output
//! shard as a GF(2⁸) linear combination of the data shards;
//! `reconstruct_internal` inverts the sub-matrix selected by the present
//! shard indices to recover the missing ones, caching the inverse in an
//! [`InversionTree`]. `encode_idx`/`update` (spec.md §4.4) reuse the same
//! matrix rows but touch only the shards they need to.

use rayon::prelude::*;
use shardhold_common::{Error, Result};
use shardhold_erasure_core::{BackendCapabilities, ErasureBackend, ReconstructMode};

use crate::galois;
use crate::inversion_tree::InversionTree;
use crate::matrix::Matrix;

/// Below this many parity rows, a plain sequential loop outruns rayon's
/// task-spawn overhead.
const PARALLEL_THRESHOLD: usize = 4;

/// A configured `(data_shards, parity_shards)` Reed-Solomon codec over
/// GF(2⁸). Shard count is capped at 256 since the field has only 256
/// elements.
pub struct Gf8Codec {
    data_shards: usize,
    parity_shards: usize,
    matrix: Matrix,
    tree: InversionTree,
}

impl Gf8Codec {
    pub const MAX_TOTAL_SHARDS: usize = 256;

    /// # Errors
    /// Returns [`Error::InvShardNum`] if either count is zero, and
    /// [`Error::MaxShardNum`] if `data_shards + parity_shards` exceeds
    /// [`Self::MAX_TOTAL_SHARDS`].
    pub fn new(data_shards: usize, parity_shards: usize) -> Result<Self> {
        if data_shards == 0 || parity_shards == 0 {
            return Err(Error::InvShardNum);
        }
        let total = data_shards + parity_shards;
        if total > Self::MAX_TOTAL_SHARDS {
            return Err(Error::MaxShardNum);
        }

        let vandermonde = Matrix::vandermonde(total, data_shards);
        let top = vandermonde.sub_matrix(0, 0, data_shards, data_shards);
        let top_inv = top.invert()?;
        let matrix = vandermonde.multiply(&top_inv);

        Ok(Self {
            data_shards,
            parity_shards,
            matrix,
            tree: InversionTree::new(),
        })
    }

    fn check_shard_set(&self, shards: &[Vec<u8>]) -> Result<usize> {
        if shards.len() != self.total_shards() {
            return Err(Error::TooFewShards);
        }
        let len = shards.first().map(Vec::len).ok_or(Error::ShardNoData)?;
        if len == 0 {
            return Err(Error::ShardNoData);
        }
        if shards.iter().any(|s| s.len() != len) {
            return Err(Error::ShardSize);
        }
        Ok(len)
    }

    fn encode_one_parity(&self, data: &[Vec<u8>], parity_row: usize, out: &mut [u8]) {
        let row = self.matrix.row(self.data_shards + parity_row);
        galois::mul_slice(row[0], &data[0], out);
        for d in 1..self.data_shards {
            galois::mul_slice_xor(row[d], &data[d], out);
        }
    }

    fn combine(&self, row: &[u8], inputs: &[&[u8]], out: &mut [u8]) {
        galois::mul_slice(row[0], inputs[0], out);
        for k in 1..inputs.len() {
            galois::mul_slice_xor(row[k], inputs[k], out);
        }
    }
}

impl ErasureBackend for Gf8Codec {
    fn capabilities(&self) -> BackendCapabilities {
        BackendCapabilities {
            name: "gf8-vandermonde",
            max_total_shards: Self::MAX_TOTAL_SHARDS,
            supports_encode_idx: true,
            supports_update: true,
        }
    }

    fn data_shards(&self) -> usize {
        self.data_shards
    }

    fn parity_shards(&self) -> usize {
        self.parity_shards
    }

    fn encode(&self, shards: &mut [Vec<u8>]) -> Result<()> {
        self.check_shard_set(shards)?;
        let (data, parity) = shards.split_at_mut(self.data_shards);
        let data_ref = data;

        if self.parity_shards >= PARALLEL_THRESHOLD {
            parity
                .par_iter_mut()
                .enumerate()
                .for_each(|(p, out)| self.encode_one_parity(data_ref, p, out));
        } else {
            for (p, out) in parity.iter_mut().enumerate() {
                self.encode_one_parity(data_ref, p, out);
            }
        }
        Ok(())
    }

    fn verify(&self, shards: &[Vec<u8>]) -> Result<bool> {
        let len = self.check_shard_set(shards)?;
        let mut scratch = vec![vec![0u8; len]; self.parity_shards];
        let data = &shards[..self.data_shards];
        for (p, out) in scratch.iter_mut().enumerate() {
            self.encode_one_parity(data, p, out);
        }
        Ok(scratch
            .iter()
            .zip(&shards[self.data_shards..])
            .all(|(computed, given)| computed == given))
    }

    fn reconstruct(&self, shards: &mut [Option<Vec<u8>>], mode: ReconstructMode) -> Result<()> {
        if shards.len() != self.total_shards() {
            return Err(Error::TooFewShards);
        }
        let shard_len = shards
            .iter()
            .find_map(|s| s.as_ref().map(Vec::len))
            .ok_or(Error::ShardNoData)?;

        let mut present = 0usize;
        for s in shards.iter() {
            if let Some(v) = s {
                if v.len() != shard_len {
                    return Err(Error::ShardSize);
                }
                present += 1;
            }
        }
        if present == self.total_shards() {
            return Ok(());
        }
        if present < self.data_shards {
            return Err(Error::TooFewShards);
        }

        let missing_data: Vec<usize> = (0..self.data_shards).filter(|&i| shards[i].is_none()).collect();

        if !missing_data.is_empty() {
            let valid_indices: Vec<usize> = shards
                .iter()
                .enumerate()
                .filter(|(_, s)| s.is_some())
                .map(|(i, _)| i)
                .take(self.data_shards)
                .collect();

            let decode_matrix = match self.tree.get(&missing_data) {
                Some(m) => m,
                None => {
                    let mut sub = Matrix::new(self.data_shards, self.data_shards);
                    for (r, &idx) in valid_indices.iter().enumerate() {
                        for c in 0..self.data_shards {
                            sub.set(r, c, self.matrix.row(idx)[c]);
                        }
                    }
                    let inv = sub.invert()?;
                    self.tree.insert(missing_data.clone(), inv)
                }
            };

            let valid_refs: Vec<&[u8]> = valid_indices
                .iter()
                .map(|&i| shards[i].as_ref().expect("index selected from present shards").as_slice())
                .collect();

            let mut recovered = Vec::with_capacity(missing_data.len());
            for &md in &missing_data {
                let row = decode_matrix.row(md);
                let mut buf = vec![0u8; shard_len];
                self.combine(row, &valid_refs, &mut buf);
                recovered.push((md, buf));
            }
            for (md, buf) in recovered {
                shards[md] = Some(buf);
            }
        }

        if mode == ReconstructMode::All {
            let data_owned: Vec<Vec<u8>> = shards[..self.data_shards]
                .iter()
                .map(|s| s.clone().expect("data shards are whole at this point"))
                .collect();
            for p in 0..self.parity_shards {
                if shards[self.data_shards + p].is_none() {
                    let mut buf = vec![0u8; shard_len];
                    self.encode_one_parity(&data_owned, p, &mut buf);
                    shards[self.data_shards + p] = Some(buf);
                }
            }
        }

        Ok(())
    }

    fn encode_idx(&self, single_data_shard: &[u8], idx: usize, parity_shards: &mut [Vec<u8>]) -> Result<()> {
        if idx >= self.data_shards {
            return Err(Error::InvalidInput);
        }
        if parity_shards.len() != self.parity_shards {
            return Err(Error::TooFewShards);
        }
        for (p, out) in parity_shards.iter_mut().enumerate() {
            if out.len() != single_data_shard.len() {
                return Err(Error::ShardSize);
            }
            let coeff = self.matrix.row(self.data_shards + p)[idx];
            galois::mul_slice_xor(coeff, single_data_shard, out);
        }
        Ok(())
    }

    fn update(&self, shards: &mut [Vec<u8>], new_data_shards: &[Option<Vec<u8>>]) -> Result<()> {
        let shard_len = self.check_shard_set(shards)?;
        if new_data_shards.len() != self.data_shards {
            return Err(Error::InvalidInput);
        }

        for (idx, new_shard) in new_data_shards.iter().enumerate() {
            let Some(new_shard) = new_shard else { continue };
            if new_shard.len() != shard_len {
                return Err(Error::ShardSize);
            }
            let mut delta = vec![0u8; shard_len];
            for (d, (o, n)) in delta.iter_mut().zip(shards[idx].iter().zip(new_shard)) {
                *d = o ^ n;
            }
            for p in 0..self.parity_shards {
                let coeff = self.matrix.row(self.data_shards + p)[idx];
                let target = &mut shards[self.data_shards + p];
                galois::mul_slice_xor(coeff, &delta, target);
            }
            shards[idx] = new_shard.clone();
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::RngCore;

    fn sample_shards(codec: &Gf8Codec, shard_len: usize) -> Vec<Vec<u8>> {
        let mut rng = rand::thread_rng();
        let mut shards = vec![vec![0u8; shard_len]; codec.total_shards()];
        for s in shards.iter_mut().take(codec.data_shards) {
            rng.fill_bytes(s);
        }
        codec.encode(&mut shards).expect("encode");
        shards
    }

    #[test]
    fn encode_then_verify_succeeds() {
        let codec = Gf8Codec::new(4, 2).unwrap();
        let shards = sample_shards(&codec, 128);
        assert!(codec.verify(&shards).unwrap());
    }

    #[test]
    fn verify_detects_tampering() {
        let codec = Gf8Codec::new(4, 2).unwrap();
        let mut shards = sample_shards(&codec, 128);
        shards[0][0] ^= 0xFF;
        assert!(!codec.verify(&shards).unwrap());
    }

    #[test]
    fn reconstruct_recovers_missing_data_shards() {
        let codec = Gf8Codec::new(4, 2).unwrap();
        let shards = sample_shards(&codec, 64);
        let mut partial: Vec<Option<Vec<u8>>> = shards.iter().cloned().map(Some).collect();
        partial[0] = None;
        partial[2] = None;
        codec.reconstruct(&mut partial, ReconstructMode::DataOnly).unwrap();
        for (i, s) in partial.iter().enumerate().take(codec.data_shards) {
            assert_eq!(s.as_ref().unwrap(), &shards[i]);
        }
    }

    #[test]
    fn reconstruct_mode_all_rebuilds_parity_too() {
        let codec = Gf8Codec::new(4, 2).unwrap();
        let shards = sample_shards(&codec, 64);
        let mut partial: Vec<Option<Vec<u8>>> = shards.iter().cloned().map(Some).collect();
        partial[0] = None;
        partial[4] = None;
        codec.reconstruct(&mut partial, ReconstructMode::All).unwrap();
        for (i, s) in partial.iter().enumerate() {
            assert_eq!(s.as_ref().unwrap(), &shards[i]);
        }
    }

    #[test]
    fn too_few_shards_present_errors() {
        let codec = Gf8Codec::new(4, 2).unwrap();
        let shards = sample_shards(&codec, 32);
        let mut partial: Vec<Option<Vec<u8>>> = shards.iter().cloned().map(Some).collect();
        partial[0] = None;
        partial[1] = None;
        partial[2] = None;
        assert!(matches!(
            codec.reconstruct(&mut partial, ReconstructMode::DataOnly),
            Err(Error::TooFewShards)
        ));
    }

    #[test]
    fn encode_idx_matches_full_encode() {
        let codec = Gf8Codec::new(3, 2).unwrap();
        let mut rng = rand::thread_rng();
        let mut data = vec![vec![0u8; 32]; 3];
        for d in &mut data {
            rng.fill_bytes(d);
        }
        let mut via_idx = vec![vec![0u8; 32]; 2];
        for (idx, d) in data.iter().enumerate() {
            codec.encode_idx(d, idx, &mut via_idx).unwrap();
        }

        let mut full = data.clone();
        full.extend(vec![vec![0u8; 32]; 2]);
        codec.encode(&mut full).unwrap();

        assert_eq!(via_idx, &full[3..]);
    }

    #[test]
    fn update_matches_reencode() {
        let codec = Gf8Codec::new(3, 2).unwrap();
        let shards = sample_shards(&codec, 32);
        let mut updated = shards.clone();
        let new_shard_0 = vec![0xAAu8; 32];
        let mut new_data = vec![None, None, None];
        new_data[0] = Some(new_shard_0.clone());
        codec.update(&mut updated, &new_data).unwrap();

        let mut reencoded = shards.clone();
        reencoded[0] = new_shard_0;
        codec.encode(&mut reencoded).unwrap();

        assert_eq!(updated, reencoded);
    }
}
