//! Row-major matrix over GF(2¹⁶), the same Vandermonde-top-inverted
//! construction `shardhold-erasure-gf8::matrix` uses, widened to `u16`
//! entries so encode matrices can address the larger shard counts this
//! codec supports.

use crate::field16;
use shardhold_common::{Error, Result};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Matrix {
    rows: usize,
    cols: usize,
    data: Vec<u16>,
}

impl Matrix {
    #[must_use]
    pub fn new(rows: usize, cols: usize) -> Self {
        Self {
            rows,
            cols,
            data: vec![0; rows * cols],
        }
    }

    #[must_use]
    pub fn identity(n: usize) -> Self {
        let mut m = Self::new(n, n);
        for i in 0..n {
            m.set(i, i, 1);
        }
        m
    }

    /// `rows x cols` Vandermonde matrix: `m[r][c] = r^c` in GF(2¹⁶).
    #[must_use]
    pub fn vandermonde(rows: usize, cols: usize) -> Self {
        let mut m = Self::new(rows, cols);
        for r in 0..rows {
            for c in 0..cols {
                m.set(r, c, field16::pow(r as u16, c));
            }
        }
        m
    }

    #[must_use]
    pub fn get(&self, r: usize, c: usize) -> u16 {
        self.data[r * self.cols + c]
    }

    pub fn set(&mut self, r: usize, c: usize, v: u16) {
        self.data[r * self.cols + c] = v;
    }

    #[must_use]
    pub fn row(&self, r: usize) -> &[u16] {
        &self.data[r * self.cols..(r + 1) * self.cols]
    }

    #[must_use]
    pub fn sub_matrix(&self, row0: usize, col0: usize, rows: usize, cols: usize) -> Self {
        let mut m = Self::new(rows, cols);
        for r in 0..rows {
            for c in 0..cols {
                m.set(r, c, self.get(row0 + r, col0 + c));
            }
        }
        m
    }

    #[must_use]
    pub fn multiply(&self, other: &Matrix) -> Matrix {
        assert_eq!(self.cols, other.rows, "matrix dimension mismatch");
        let mut out = Matrix::new(self.rows, other.cols);
        for r in 0..self.rows {
            for c in 0..other.cols {
                let mut acc = 0u16;
                for k in 0..self.cols {
                    acc ^= field16::mul(self.get(r, k), other.get(k, c));
                }
                out.set(r, c, acc);
            }
        }
        out
    }

    fn augment_with_identity(&self) -> Matrix {
        assert_eq!(self.rows, self.cols, "augment requires a square matrix");
        let n = self.rows;
        let mut m = Matrix::new(n, 2 * n);
        for r in 0..n {
            for c in 0..n {
                m.set(r, c, self.get(r, c));
            }
            m.set(r, n + r, 1);
        }
        m
    }

    fn swap_rows(&mut self, a: usize, b: usize) {
        if a == b {
            return;
        }
        for c in 0..self.cols {
            self.data.swap(a * self.cols + c, b * self.cols + c);
        }
    }

    /// # Errors
    /// Returns [`Error::Internal`] if the matrix is singular — should never
    /// happen for a Vandermonde sub-block built from distinct row indices.
    pub fn invert(&self) -> Result<Matrix> {
        assert_eq!(self.rows, self.cols, "invert requires a square matrix");
        let n = self.rows;
        let mut work = self.augment_with_identity();

        for pivot in 0..n {
            if work.get(pivot, pivot) == 0 {
                let swap_with = (pivot + 1..n).find(|&r| work.get(r, pivot) != 0);
                match swap_with {
                    Some(r) => work.swap_rows(pivot, r),
                    None => return Err(Error::Internal("decode matrix is singular".to_string())),
                }
            }

            let inv_pivot = field16::inv(work.get(pivot, pivot));
            if inv_pivot != 1 {
                for c in 0..work.cols {
                    let v = work.get(pivot, c);
                    work.set(pivot, c, field16::mul(v, inv_pivot));
                }
            }

            for r in 0..n {
                if r == pivot {
                    continue;
                }
                let factor = work.get(r, pivot);
                if factor == 0 {
                    continue;
                }
                for c in 0..work.cols {
                    let sub = field16::mul(factor, work.get(pivot, c));
                    let cur = work.get(r, c);
                    work.set(r, c, cur ^ sub);
                }
            }
        }

        Ok(work.sub_matrix(0, n, n, n))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invert_recovers_identity() {
        let v = Matrix::vandermonde(4, 4);
        let inv = v.invert().expect("vandermonde top block is invertible");
        assert_eq!(v.multiply(&inv), Matrix::identity(4));
    }
}
