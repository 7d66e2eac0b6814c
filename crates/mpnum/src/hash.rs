//! CPython-compatible numeric hashing.
//!
//! Values hash with the Mersenne-prime modular algorithm CPython uses for its
//! whole numeric tower, so equal values hash equal regardless of precision:
//! for `±m · 2^e` the hash is `±(m · 2^e mod (2^61 - 1))`, with `2^e` reduced
//! by bit rotation since `2^61 ≡ 1 (mod 2^61 - 1)`. A computed hash of `-1`
//! is remapped to `-2` (CPython reserves `-1` as an error sentinel and the
//! convention is kept for compatibility).

use num_bigint::BigUint;
use num_traits::ToPrimitive;

use crate::fp::Fp;

/// Mersenne prime used for numeric hashing: `2^61 - 1`.
const MODULUS: u64 = (1 << 61) - 1;

/// Hash of positive infinity; negative infinity hashes to its negation.
const INF_HASH: i64 = 314_159;

/// Multiplier combining the imaginary part's hash into a complex hash
/// (CPython's `_PyHASH_IMAG`).
pub(crate) const IMAG_MULTIPLIER: i64 = 1_000_003;

/// Hashes a floating-point magnitude with CPython's modular algorithm.
pub(crate) fn hash_fp(fp: &Fp) -> i64 {
    let raw = match fp {
        Fp::Nan => 0,
        Fp::Zero { .. } => 0,
        Fp::Inf { neg } => {
            if *neg {
                -INF_HASH
            } else {
                INF_HASH
            }
        }
        Fp::Finite { neg, exp, mant } => {
            let reduced = reduce_mantissa(mant);
            // 2^61 ≡ 1, so the power of two becomes a rotation by exp mod 61.
            let rotation = exp.rem_euclid(61) as u32;
            let rotated = ((u128::from(reduced) << rotation) % u128::from(MODULUS)) as i64;
            if *neg { -rotated } else { rotated }
        }
    };
    if raw == -1 { -2 } else { raw }
}

/// Combines part hashes into a complex hash, CPython's `complex.__hash__`
/// formula.
pub(crate) fn combine_complex(real_hash: i64, imag_hash: i64) -> i64 {
    let combined = real_hash.wrapping_add(IMAG_MULTIPLIER.wrapping_mul(imag_hash));
    if combined == -1 { -2 } else { combined }
}

/// Reduces a mantissa modulo `2^61 - 1`.
fn reduce_mantissa(mant: &BigUint) -> u64 {
    (mant % BigUint::from(MODULUS)).to_u64().unwrap_or(0)
}
