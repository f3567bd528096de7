//! GF(2⁸) field arithmetic.
//!
//! Tables are generated once from the primitive polynomial `x^8 + x^4 + x^3
//! + x^2 + 1` (0x11D) with generator 2 — the standard choice shared by most
//! production Reed-Solomon implementations (including the one this codec is
//! grounded on). `EXP` is double-length so `mul` never needs a modulo on
//! the table index.

use std::sync::OnceLock;

const POLYNOMIAL: u16 = 0x11D;

struct Tables {
    log: [u8; 256],
    exp: [u8; 512],
}

static TABLES: OnceLock<Tables> = OnceLock::new();

fn tables() -> &'static Tables {
    TABLES.get_or_init(|| {
        let mut log = [0u8; 256];
        let mut exp = [0u8; 512];
        let mut x: u16 = 1;
        for i in 0..255u16 {
            exp[i as usize] = x as u8;
            log[x as usize] = i as u8;
            x <<= 1;
            if x & 0x100 != 0 {
                x ^= POLYNOMIAL;
            }
        }
        for i in 255..512 {
            exp[i] = exp[i - 255];
        }
        Tables { log, exp }
    })
}

/// `a * b` in GF(2⁸).
#[must_use]
pub fn mul(a: u8, b: u8) -> u8 {
    if a == 0 || b == 0 {
        return 0;
    }
    let t = tables();
    let sum = u16::from(t.log[a as usize]) + u16::from(t.log[b as usize]);
    t.exp[sum as usize]
}

/// `a / b` in GF(2⁸). Caller must ensure `b != 0`.
#[must_use]
pub fn div(a: u8, b: u8) -> u8 {
    assert!(b != 0, "division by zero in GF(2^8)");
    if a == 0 {
        return 0;
    }
    let t = tables();
    let diff = i32::from(t.log[a as usize]) - i32::from(t.log[b as usize]) + 255;
    t.exp[(diff % 255) as usize]
}

/// Multiplicative inverse of `a`. Caller must ensure `a != 0`.
#[must_use]
pub fn inv(a: u8) -> u8 {
    div(1, a)
}

/// `a^n` in GF(2⁸), with the `0^0 == 1` convention the Vandermonde matrix
/// construction relies on.
#[must_use]
pub fn pow(a: u8, n: usize) -> u8 {
    if n == 0 {
        return 1;
    }
    if a == 0 {
        return 0;
    }
    let t = tables();
    let exponent = (u32::from(t.log[a as usize]) * n as u32) % 255;
    t.exp[exponent as usize]
}

/// `output[i] = c * input[i]` for every byte.
pub fn mul_slice(c: u8, input: &[u8], output: &mut [u8]) {
    let t = tables();
    if c == 0 {
        output.fill(0);
        return;
    }
    let log_c = u16::from(t.log[c as usize]);
    for (o, &i) in output.iter_mut().zip(input) {
        *o = if i == 0 {
            0
        } else {
            t.exp[(log_c + u16::from(t.log[i as usize])) as usize]
        };
    }
}

/// `output[i] ^= c * input[i]` for every byte.
pub fn mul_slice_xor(c: u8, input: &[u8], output: &mut [u8]) {
    if c == 0 {
        return;
    }
    let t = tables();
    let log_c = u16::from(t.log[c as usize]);
    for (o, &i) in output.iter_mut().zip(input) {
        if i != 0 {
            *o ^= t.exp[(log_c + u16::from(t.log[i as usize])) as usize];
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mul_and_div_are_inverses() {
        for a in 1..=255u8 {
            for b in 1..=255u8 {
                assert_eq!(div(mul(a, b), b), a);
            }
        }
    }

    #[test]
    fn inv_recovers_one() {
        for a in 1..=255u8 {
            assert_eq!(mul(a, inv(a)), 1);
        }
    }

    #[test]
    fn zero_is_absorbing() {
        assert_eq!(mul(0, 200), 0);
        assert_eq!(mul(200, 0), 0);
    }

    #[test]
    fn pow_matches_repeated_mul() {
        for a in 1..=255u8 {
            let mut expected = 1u8;
            for _ in 0..5 {
                expected = mul(expected, a);
            }
            assert_eq!(pow(a, 5), expected);
        }
        assert_eq!(pow(0, 0), 1);
        assert_eq!(pow(0, 3), 0);
    }

    #[test]
    fn mul_slice_xor_accumulates() {
        let input = [1u8, 2, 3, 4];
        let mut output = [0u8; 4];
        mul_slice_xor(5, &input, &mut output);
        let expected: Vec<u8> = input.iter().map(|&b| mul(5, b)).collect();
        assert_eq!(&output[..], &expected[..]);
    }
}
