//! Fast Walsh-Hadamard Transform, used to build the error-locator
//! coefficients for reconstruction acceleration (spec.md §4.5: "build the
//! error-locator polynomial ... using the Fast Walsh-Hadamard Transform
//! (FWHT)").
//!
//! This is the classical in-place butterfly over signed integers (not a
//! GF(2¹⁶) transform) — the standard technique for computing an XOR
//! convolution in O(n log n).

/// In-place FWHT. `data.len()` must be a power of two.
pub fn fwht(data: &mut [i32]) {
    let n = data.len();
    debug_assert!(n.is_power_of_two());
    let mut half = 1;
    while half < n {
        let mut i = 0;
        while i < n {
            for j in i..i + half {
                let x = data[j];
                let y = data[j + half];
                data[j] = x + y;
                data[j + half] = x - y;
            }
            i += half * 2;
        }
        half *= 2;
    }
}

/// Energy (sum of squared coefficients) of an FWHT spectrum, used as a
/// cheap debug-time consistency signal when logging the reconstruction
/// fast path.
#[must_use]
pub fn spectrum_energy(spectrum: &[i32]) -> i64 {
    spectrum.iter().map(|&v| i64::from(v) * i64::from(v)).sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn size_two_matches_hadamard_matrix() {
        let mut data = vec![3, 5];
        fwht(&mut data);
        assert_eq!(data, vec![8, -2]);
    }

    #[test]
    fn applying_twice_scales_by_n() {
        let original = vec![1, 2, 3, 4];
        let mut data = original.clone();
        fwht(&mut data);
        fwht(&mut data);
        let n = original.len() as i32;
        let scaled: Vec<i32> = original.iter().map(|&v| v * n).collect();
        assert_eq!(data, scaled);
    }

    #[test]
    fn energy_is_non_negative() {
        let mut data = vec![1, -1, 0, 2, 3, -5, 7, 0];
        fwht(&mut data);
        assert!(spectrum_energy(&data) >= 0);
    }
}
