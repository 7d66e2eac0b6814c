//! Multiple-precision floating-point primitives.
//!
//! Every primitive takes an explicit precision (in bits) and rounding mode and
//! returns the computed value together with a ternary rounding-outcome code:
//! `Ordering::Less` when the stored result is below the exact mathematical
//! value, `Ordering::Equal` when it is exact, `Ordering::Greater` when it is
//! above. The rest of the crate consumes this module strictly through that
//! contract; context state, flags and traps live above it.
//!
//! Finite values are stored sign/magnitude as `±mant · 2^exp` with an odd
//! (canonical) mantissa, so equal values have equal representations no matter
//! which precision produced them. The magnitude is a `BigUint`; exponent
//! arithmetic is `i64` and is range-checked by the flag engine, not here.

use std::cmp::Ordering;

use num_bigint::{BigInt, BigUint, Sign};
use num_integer::{Integer, Roots};
use num_traits::{One, Zero};
use serde::{Deserialize, Serialize};

use crate::{
    context::RoundMode,
    error::{Error, OpResult},
};

/// A multiple-precision floating-point magnitude.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) enum Fp {
    /// Signed zero.
    Zero { neg: bool },
    /// `±mant · 2^exp` with `mant` odd and nonzero.
    Finite { neg: bool, exp: i64, mant: BigUint },
    /// Signed infinity.
    Inf { neg: bool },
    /// Not a number. NaN carries no sign.
    Nan,
}

impl Fp {
    pub(crate) fn zero(neg: bool) -> Self {
        Self::Zero { neg }
    }

    pub(crate) fn inf(neg: bool) -> Self {
        Self::Inf { neg }
    }

    pub(crate) fn nan() -> Self {
        Self::Nan
    }

    pub(crate) fn is_nan(&self) -> bool {
        matches!(self, Self::Nan)
    }

    pub(crate) fn is_inf(&self) -> bool {
        matches!(self, Self::Inf { .. })
    }

    /// True for zero and finite nonzero values (not Inf, not NaN).
    pub(crate) fn is_finite(&self) -> bool {
        matches!(self, Self::Zero { .. } | Self::Finite { .. })
    }

    pub(crate) fn is_zero(&self) -> bool {
        matches!(self, Self::Zero { .. })
    }

    /// Sign bit; NaN reports false.
    pub(crate) fn is_neg(&self) -> bool {
        match self {
            Self::Zero { neg } | Self::Finite { neg, .. } | Self::Inf { neg } => *neg,
            Self::Nan => false,
        }
    }

    /// Exponent of the most significant bit plus one: a finite nonzero value
    /// lies in `[2^(top-1), 2^top)`. `None` for zero, infinity, NaN.
    pub(crate) fn top_exp(&self) -> Option<i64> {
        match self {
            Self::Finite { exp, mant, .. } => Some(exp + mant.bits() as i64),
            _ => None,
        }
    }

    /// Returns the value with the sign flipped. Exact.
    pub(crate) fn neg(&self) -> Self {
        match self {
            Self::Zero { neg } => Self::Zero { neg: !neg },
            Self::Finite { neg, exp, mant } => Self::Finite {
                neg: !neg,
                exp: *exp,
                mant: mant.clone(),
            },
            Self::Inf { neg } => Self::Inf { neg: !neg },
            Self::Nan => Self::Nan,
        }
    }

    /// Returns the absolute value. Exact.
    pub(crate) fn abs(&self) -> Self {
        match self {
            Self::Zero { .. } => Self::Zero { neg: false },
            Self::Finite { exp, mant, .. } => Self::Finite {
                neg: false,
                exp: *exp,
                mant: mant.clone(),
            },
            Self::Inf { .. } => Self::Inf { neg: false },
            Self::Nan => Self::Nan,
        }
    }

    /// Re-rounds an existing value to `prec` bits.
    pub(crate) fn round(&self, prec: u32, rnd: RoundMode) -> (Self, Ordering) {
        match self {
            Self::Finite { neg, exp, mant } => round_mantissa(*neg, mant.clone(), *exp, prec, rnd),
            special => (special.clone(), Ordering::Equal),
        }
    }

    /// Adds two values.
    pub(crate) fn add(&self, other: &Self, prec: u32, rnd: RoundMode) -> (Self, Ordering) {
        match (self, other) {
            (Self::Nan, _) | (_, Self::Nan) => (Self::Nan, Ordering::Equal),
            (Self::Inf { neg: a }, Self::Inf { neg: b }) => {
                if a == b {
                    (Self::Inf { neg: *a }, Ordering::Equal)
                } else {
                    // Inf + (-Inf) has no useful value.
                    (Self::Nan, Ordering::Equal)
                }
            }
            (Self::Inf { neg }, _) | (_, Self::Inf { neg }) => (Self::Inf { neg: *neg }, Ordering::Equal),
            (Self::Zero { neg: a }, Self::Zero { neg: b }) => {
                // Exact cancellation yields +0 in every mode except Down.
                let neg = if a == b { *a } else { rnd == RoundMode::Down };
                (Self::Zero { neg }, Ordering::Equal)
            }
            (Self::Zero { .. }, x) | (x, Self::Zero { .. }) => x.round(prec, rnd),
            (
                Self::Finite {
                    neg: na,
                    exp: ea,
                    mant: ma,
                },
                Self::Finite {
                    neg: nb,
                    exp: eb,
                    mant: mb,
                },
            ) => add_finite((*na, *ea, ma), (*nb, *eb, mb), prec, rnd),
        }
    }

    /// Subtracts two values.
    pub(crate) fn sub(&self, other: &Self, prec: u32, rnd: RoundMode) -> (Self, Ordering) {
        self.add(&other.neg(), prec, rnd)
    }

    /// Multiplies two values.
    pub(crate) fn mul(&self, other: &Self, prec: u32, rnd: RoundMode) -> (Self, Ordering) {
        match (self, other) {
            (Self::Nan, _) | (_, Self::Nan) => (Self::Nan, Ordering::Equal),
            (Self::Inf { .. }, Self::Zero { .. }) | (Self::Zero { .. }, Self::Inf { .. }) => {
                (Self::Nan, Ordering::Equal)
            }
            (Self::Inf { neg: a }, b) | (b, Self::Inf { neg: a }) => {
                (Self::Inf { neg: a != &b.is_neg() }, Ordering::Equal)
            }
            (Self::Zero { neg: a }, b) | (b, Self::Zero { neg: a }) => {
                (Self::Zero { neg: a != &b.is_neg() }, Ordering::Equal)
            }
            (
                Self::Finite {
                    neg: na,
                    exp: ea,
                    mant: ma,
                },
                Self::Finite {
                    neg: nb,
                    exp: eb,
                    mant: mb,
                },
            ) => round_mantissa(na != nb, ma * mb, ea + eb, prec, rnd),
        }
    }

    /// Multiplies two values exactly, at whatever precision the product needs.
    pub(crate) fn mul_exact(&self, other: &Self) -> Self {
        match (self, other) {
            (
                Self::Finite {
                    neg: na,
                    exp: ea,
                    mant: ma,
                },
                Self::Finite {
                    neg: nb,
                    exp: eb,
                    mant: mb,
                },
            ) => canonical(na != nb, ma * mb, ea + eb),
            _ => self.mul(other, 2, RoundMode::Nearest).0,
        }
    }

    /// Divides two values.
    ///
    /// Division by zero yields a signed infinity (0/0 yields NaN); the caller
    /// is responsible for signaling `divzero`/`invalid` on the context.
    pub(crate) fn div(&self, other: &Self, prec: u32, rnd: RoundMode) -> (Self, Ordering) {
        match (self, other) {
            (Self::Nan, _) | (_, Self::Nan) => (Self::Nan, Ordering::Equal),
            (Self::Inf { .. }, Self::Inf { .. }) => (Self::Nan, Ordering::Equal),
            (Self::Zero { .. }, Self::Zero { .. }) => (Self::Nan, Ordering::Equal),
            (Self::Inf { neg }, b) => (Self::Inf { neg: neg != &b.is_neg() }, Ordering::Equal),
            (a, Self::Inf { neg }) => (Self::Zero { neg: neg != &a.is_neg() }, Ordering::Equal),
            (Self::Zero { neg }, b) => (Self::Zero { neg: neg != &b.is_neg() }, Ordering::Equal),
            (a, Self::Zero { neg }) => (Self::Inf { neg: neg != &a.is_neg() }, Ordering::Equal),
            (
                Self::Finite {
                    neg: na,
                    exp: ea,
                    mant: ma,
                },
                Self::Finite {
                    neg: nb,
                    exp: eb,
                    mant: mb,
                },
            ) => div_ratio(na != nb, ma.clone(), ea - eb, mb, prec, rnd),
        }
    }

    /// Computes the nonnegative square root.
    ///
    /// The square root of a negative value is NaN; the caller decides whether
    /// to signal `invalid` or promote to the complex domain.
    pub(crate) fn sqrt(&self, prec: u32, rnd: RoundMode) -> (Self, Ordering) {
        match self {
            Self::Nan => (Self::Nan, Ordering::Equal),
            // IEEE 754: sqrt(±0) = ±0.
            Self::Zero { neg } => (Self::Zero { neg: *neg }, Ordering::Equal),
            Self::Inf { neg: false } => (Self::Inf { neg: false }, Ordering::Equal),
            Self::Inf { neg: true } => (Self::Nan, Ordering::Equal),
            Self::Finite { neg: true, .. } => (Self::Nan, Ordering::Equal),
            Self::Finite {
                neg: false,
                exp,
                mant,
            } => sqrt_finite(mant, *exp, prec, rnd),
        }
    }

    /// Scales by `2^k`. Exact; the flag engine range-checks the result.
    pub(crate) fn mul_2exp(&self, k: i64) -> Self {
        match self {
            Self::Finite { neg, exp, mant } => Self::Finite {
                neg: *neg,
                exp: exp + k,
                mant: mant.clone(),
            },
            special => special.clone(),
        }
    }

    /// Numeric comparison. `None` when either operand is NaN. Signed zeros
    /// compare equal.
    pub(crate) fn cmp_value(&self, other: &Self) -> Option<Ordering> {
        if self.is_nan() || other.is_nan() {
            return None;
        }
        let sign_class = |fp: &Self| -> i8 {
            if fp.is_zero() {
                0
            } else if fp.is_neg() {
                -1
            } else {
                1
            }
        };
        let (sa, sb) = (sign_class(self), sign_class(other));
        if sa != sb {
            return Some(sa.cmp(&sb));
        }
        if sa == 0 {
            return Some(Ordering::Equal);
        }
        let mag = match (self, other) {
            (Self::Inf { .. }, Self::Inf { .. }) => Ordering::Equal,
            (Self::Inf { .. }, _) => Ordering::Greater,
            (_, Self::Inf { .. }) => Ordering::Less,
            (
                Self::Finite {
                    exp: ea, mant: ma, ..
                },
                Self::Finite {
                    exp: eb, mant: mb, ..
                },
            ) => {
                let top_a = ea + ma.bits() as i64;
                let top_b = eb + mb.bits() as i64;
                match top_a.cmp(&top_b) {
                    Ordering::Equal => {
                        // Same leading bit position: align and compare mantissas.
                        let shift_a = (ea - eb).max(0) as usize;
                        let shift_b = (eb - ea).max(0) as usize;
                        (ma << shift_a).cmp(&(mb << shift_b))
                    }
                    order => order,
                }
            }
            _ => Ordering::Equal,
        };
        Some(if sa < 0 { mag.reverse() } else { mag })
    }

    /// The largest finite value representable at `prec` bits under `emax`.
    pub(crate) fn max_finite(prec: u32, emax: i64, neg: bool) -> Self {
        let mant = (BigUint::one() << prec as usize) - 1u32;
        canonical(neg, mant, emax - i64::from(prec))
    }

    /// Converts a machine integer, rounding to `prec` bits.
    pub(crate) fn from_i64(value: i64, prec: u32, rnd: RoundMode) -> (Self, Ordering) {
        if value == 0 {
            return (Self::Zero { neg: false }, Ordering::Equal);
        }
        let neg = value < 0;
        let mag = BigUint::from(value.unsigned_abs());
        round_mantissa(neg, mag, 0, prec, rnd)
    }

    /// Converts a machine float exactly, then rounds to `prec` bits.
    ///
    /// The bit decomposition mirrors IEEE-754 binary64: `n / 2^k` is exact in
    /// this representation, so only the final rounding can be inexact.
    pub(crate) fn from_f64(value: f64, prec: u32, rnd: RoundMode) -> (Self, Ordering) {
        if value.is_nan() {
            return (Self::Nan, Ordering::Equal);
        }
        if value.is_infinite() {
            return (Self::Inf { neg: value < 0.0 }, Ordering::Equal);
        }
        if value == 0.0 {
            return (
                Self::Zero {
                    neg: value.is_sign_negative(),
                },
                Ordering::Equal,
            );
        }

        let bits = value.to_bits();
        let neg = (bits >> 63) != 0;
        let exponent_bits = ((bits >> 52) & 0x7ff) as i64;
        let fraction_bits = bits & ((1u64 << 52) - 1);
        let (mant, exp) = if exponent_bits == 0 {
            (BigUint::from(fraction_bits), -1022 - 52)
        } else {
            (BigUint::from(fraction_bits | (1u64 << 52)), exponent_bits - 1023 - 52)
        };
        round_mantissa(neg, mant, exp, prec, rnd)
    }

    /// Parses a numeric string in the given base (2–36), rounding to `prec`
    /// bits.
    ///
    /// Accepts an optional sign, digits with at most one radix point, and an
    /// exponent introduced by `e`/`E` (bases up to 10) or `@` (any base); the
    /// exponent itself is a base-10 power of the input base. The special
    /// values `NaN`, `Inf` and `Infinity` are matched ASCII case-insensitively.
    pub(crate) fn from_str_base(text: &str, base: u32, prec: u32, rnd: RoundMode) -> OpResult<(Self, Ordering)> {
        debug_assert!((2..=36).contains(&base));
        let s = text.trim();
        if s.is_empty() {
            return Err(invalid_number(text));
        }

        let lower = s.to_ascii_lowercase();
        match lower.as_str() {
            "nan" | "+nan" | "-nan" => return Ok((Self::Nan, Ordering::Equal)),
            "inf" | "+inf" | "infinity" | "+infinity" => return Ok((Self::Inf { neg: false }, Ordering::Equal)),
            "-inf" | "-infinity" => return Ok((Self::Inf { neg: true }, Ordering::Equal)),
            _ => {}
        }

        let (neg, rest) = match s.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, s.strip_prefix('+').unwrap_or(s)),
        };

        // Split off the exponent part. 'e' is a digit in bases above 14, so
        // only '@' introduces an exponent there.
        let exp_markers: &[char] = if base <= 10 { &['e', 'E', '@'] } else { &['@'] };
        let (mantissa, exp_str) = match rest.find(exp_markers) {
            Some(pos) => (&rest[..pos], Some(&rest[pos + 1..])),
            None => (rest, None),
        };

        let mut exponent: i64 = 0;
        if let Some(exp_str) = exp_str {
            exponent = exp_str.parse::<i64>().map_err(|_| invalid_number(text))?;
        }

        let (int_part, frac_part) = match mantissa.find('.') {
            Some(pos) => (&mantissa[..pos], &mantissa[pos + 1..]),
            None => (mantissa, ""),
        };
        if int_part.is_empty() && frac_part.is_empty() {
            return Err(invalid_number(text));
        }
        if frac_part.contains('.') {
            return Err(invalid_number(text));
        }

        let mut digits = BigUint::zero();
        for ch in int_part.chars().chain(frac_part.chars()) {
            let Some(d) = ch.to_digit(base) else {
                return Err(invalid_number(text));
            };
            digits = digits * base + d;
        }
        let exponent = exponent - frac_part.len() as i64;

        if digits.is_zero() {
            return Ok((Self::Zero { neg }, Ordering::Equal));
        }

        // Clamp astronomically scaled inputs before computing base powers.
        let log2_base = f64::from(base).log2();
        let approx_top = digits.bits() as f64 + exponent as f64 * log2_base;
        if approx_top > 4e6 {
            return Ok((Self::Inf { neg }, rc_away(neg)));
        }
        if approx_top < -4e6 {
            return Ok((Self::Zero { neg }, rc_toward_zero(neg)));
        }

        if exponent >= 0 {
            let scaled = digits * BigUint::from(base).pow(exponent as u32);
            Ok(round_mantissa(neg, scaled, 0, prec, rnd))
        } else {
            let den = BigUint::from(base).pow((-exponent) as u32);
            Ok(div_ratio(neg, digits, 0, &den, prec, rnd))
        }
    }

    /// Sign, exponent and mantissa of a finite nonzero value.
    pub(crate) fn parts(&self) -> Option<(bool, i64, &BigUint)> {
        match self {
            Self::Finite { neg, exp, mant } => Some((*neg, *exp, mant)),
            _ => None,
        }
    }

    /// The number of fractional decimal digits an exact fixed-point rendering
    /// needs: zero for integers, `-exp` otherwise (a binary fraction expands
    /// to exactly that many decimal places).
    pub(crate) fn exact_frac_digits(&self) -> i64 {
        match self {
            Self::Finite { exp, .. } => (-exp).max(0),
            _ => 0,
        }
    }

    /// The digit string of `round(|value| · 10^frac_digits)`, used for
    /// fixed-point rendering. Zero yields `"0"`; `None` for Inf/NaN.
    pub(crate) fn scaled_decimal(&self, frac_digits: i64, rnd: RoundMode) -> Option<String> {
        match self {
            Self::Zero { .. } => Some("0".to_string()),
            Self::Finite { neg, exp, mant } => {
                Some(scale_to_integer(mant, *exp, *neg, 10, frac_digits, rnd).to_string())
            }
            _ => None,
        }
    }

    /// Renders `ndigits` digits in `base` (2–62) with the decimal-point
    /// exponent, rounding the last digit with `rnd`.
    ///
    /// The result pair `(digits, exp)` reads as `±0.digits · base^exp`; the
    /// digit string carries no sign. Finite nonzero values only.
    pub(crate) fn to_digits(&self, base: u32, ndigits: usize, rnd: RoundMode) -> Option<(String, i64)> {
        let Self::Finite { neg, exp, mant } = self else {
            return None;
        };
        debug_assert!((2..=62).contains(&base));
        let n = ndigits.max(1);

        // First estimate of the decimal-point position, then correct it
        // against the scaled integer's actual width.
        let top = exp + mant.bits() as i64;
        let log_base = f64::from(base).log2();
        let mut point = (((top - 1) as f64) / log_base).floor() as i64 + 1;

        loop {
            let scaled = scale_to_integer(mant, *exp, *neg, base, n as i64 - point, rnd);
            let width_min = BigUint::from(base).pow(n as u32 - 1);
            let width_max = &width_min * base;
            if scaled >= width_max {
                point += 1;
            } else if scaled < width_min {
                point -= 1;
            } else {
                return Some((digits_to_string(&scaled, base), point));
            }
        }
    }
}

/// Builds the canonical finite representation, stripping trailing zero bits.
fn canonical(neg: bool, mant: BigUint, exp: i64) -> Fp {
    if mant.is_zero() {
        return Fp::Zero { neg };
    }
    let tz = mant.trailing_zeros().unwrap_or(0);
    Fp::Finite {
        neg,
        exp: exp + tz as i64,
        mant: mant >> tz as usize,
    }
}

/// Rounding-outcome code for a result pushed away from zero.
fn rc_away(neg: bool) -> Ordering {
    if neg { Ordering::Less } else { Ordering::Greater }
}

/// Rounding-outcome code for a result pulled toward zero.
fn rc_toward_zero(neg: bool) -> Ordering {
    if neg { Ordering::Greater } else { Ordering::Less }
}

/// Rounds `±mant · 2^exp` to `prec` significant bits.
fn round_mantissa(neg: bool, mant: BigUint, exp: i64, prec: u32, rnd: RoundMode) -> (Fp, Ordering) {
    if mant.is_zero() {
        return (Fp::Zero { neg }, Ordering::Equal);
    }
    let bits = mant.bits();
    if bits <= u64::from(prec) {
        return (canonical(neg, mant, exp), Ordering::Equal);
    }

    let shift = (bits - u64::from(prec)) as usize;
    let low = &mant & &((BigUint::one() << shift) - 1u32);
    let mut kept = mant >> shift;
    if low.is_zero() {
        return (canonical(neg, kept, exp + shift as i64), Ordering::Equal);
    }

    let increment = match rnd {
        RoundMode::ToZero => false,
        RoundMode::AwayFromZero => true,
        RoundMode::Up => !neg,
        RoundMode::Down => neg,
        RoundMode::Nearest => {
            let half = BigUint::one() << (shift - 1);
            match low.cmp(&half) {
                Ordering::Greater => true,
                Ordering::Less => false,
                Ordering::Equal => kept.is_odd(),
            }
        }
    };
    let rc = if increment { rc_away(neg) } else { rc_toward_zero(neg) };
    if increment {
        kept += 1u32;
    }
    (canonical(neg, kept, exp + shift as i64), rc)
}

/// Adds two finite nonzero values.
fn add_finite(a: (bool, i64, &BigUint), b: (bool, i64, &BigUint), prec: u32, rnd: RoundMode) -> (Fp, Ordering) {
    let top = |(_, exp, mant): &(bool, i64, &BigUint)| exp + mant.bits() as i64;
    let (big, small) = if top(&a) >= top(&b) { (a, b) } else { (b, a) };
    let (bn, be, bm) = big;
    let (sn, se, sm) = small;

    // Sticky shortcut: when the small operand lies entirely below the least
    // significant bit of the large mantissa extended to prec + 3 bits, fold
    // it into a one-bit nudge in its direction instead of aligning exactly.
    let ext_shift = (u64::from(prec) + 3).saturating_sub(bm.bits());
    let small_top = se + sm.bits() as i64;
    if small_top < be - ext_shift as i64 {
        let mut ext = bm << ext_shift as usize;
        if bn == sn {
            ext += 1u32;
        } else {
            ext -= 1u32;
        }
        return round_mantissa(bn, ext, be - ext_shift as i64, prec, rnd);
    }

    // Close exponents: align exactly and add as signed integers.
    let exp = be.min(se);
    let to_signed = |neg: bool, mant: BigUint| {
        let sign = if neg { Sign::Minus } else { Sign::Plus };
        BigInt::from_biguint(sign, mant)
    };
    let sum = to_signed(bn, bm << (be - exp) as usize) + to_signed(sn, sm << (se - exp) as usize);
    if sum.is_zero() {
        // Exact cancellation yields +0 in every mode except Down.
        return (
            Fp::Zero {
                neg: rnd == RoundMode::Down,
            },
            Ordering::Equal,
        );
    }
    let (sign, mag) = sum.into_parts();
    round_mantissa(sign == Sign::Minus, mag, exp, prec, rnd)
}

/// Rounds the ratio `±(num · 2^exp) / den` to `prec` bits.
///
/// The quotient is computed with two guard bits; a nonzero remainder becomes
/// a sticky bit below them, which is enough for every rounding mode to decide
/// correctly.
fn div_ratio(neg: bool, num: BigUint, exp: i64, den: &BigUint, prec: u32, rnd: RoundMode) -> (Fp, Ordering) {
    let want = u64::from(prec) + 2 + den.bits();
    let scale = want.saturating_sub(num.bits()) as usize;
    let (mut quot, rem) = (num << scale).div_rem(den);
    let mut qexp = exp - scale as i64;
    if !rem.is_zero() {
        quot = (quot << 1usize) + 1u32;
        qexp -= 1;
    }
    round_mantissa(neg, quot, qexp, prec, rnd)
}

/// Square root of a finite positive value `mant · 2^exp`.
fn sqrt_finite(mant: &BigUint, exp: i64, prec: u32, rnd: RoundMode) -> (Fp, Ordering) {
    // Widen so the integer root carries two guard bits, keeping the exponent
    // even so it halves exactly.
    let target = 2 * (u64::from(prec) + 2);
    let mut widen = target.saturating_sub(mant.bits()) as i64;
    if (exp - widen) % 2 != 0 {
        widen += 1;
    }
    let scaled = mant << widen as usize;
    let half_exp = (exp - widen) / 2;

    let root = scaled.sqrt();
    let rem = &scaled - &root * &root;
    if rem.is_zero() {
        round_mantissa(false, root, half_exp, prec, rnd)
    } else {
        round_mantissa(false, (root << 1usize) + 1u32, half_exp - 1, prec, rnd)
    }
}

/// Computes `round(|mant · 2^exp| · base^scale)` as an integer, rounding per
/// `rnd` with the value's sign taken into account for the directed modes.
fn scale_to_integer(mant: &BigUint, exp: i64, neg: bool, base: u32, scale: i64, rnd: RoundMode) -> BigUint {
    let mut num = mant.clone();
    let mut den = BigUint::one();
    if scale >= 0 {
        num *= BigUint::from(base).pow(scale as u32);
    } else {
        den *= BigUint::from(base).pow((-scale) as u32);
    }
    if exp >= 0 {
        num <<= exp as usize;
    } else {
        den <<= (-exp) as usize;
    }
    round_ratio(&num, &den, neg, rnd)
}

/// Rounds the nonnegative ratio `num / den` to an integer, with `neg` naming
/// the sign of the underlying value for the directed modes.
fn round_ratio(num: &BigUint, den: &BigUint, neg: bool, rnd: RoundMode) -> BigUint {
    let (quot, rem) = num.div_rem(den);
    if rem.is_zero() {
        return quot;
    }
    let away = match rnd {
        RoundMode::AwayFromZero => true,
        RoundMode::ToZero => false,
        RoundMode::Up => !neg,
        RoundMode::Down => neg,
        RoundMode::Nearest => {
            let doubled = rem << 1usize;
            match doubled.cmp(den) {
                Ordering::Greater => true,
                Ordering::Less => false,
                Ordering::Equal => quot.is_odd(),
            }
        }
    };
    if away { quot + 1u32 } else { quot }
}

/// Renders an integer's digits in the given base.
///
/// Bases up to 36 use `0-9a-z`; larger bases distinguish case, using `0-9`,
/// `A-Z`, then `a-z`.
fn digits_to_string(value: &BigUint, base: u32) -> String {
    value
        .to_radix_be(base)
        .into_iter()
        .map(|d| match d {
            0..=9 => (b'0' + d) as char,
            10..=35 if base <= 36 => (b'a' + d - 10) as char,
            10..=35 => (b'A' + d - 10) as char,
            _ => (b'a' + d - 36) as char,
        })
        .collect()
}

/// Default digit count for rendering a `prec`-bit value in `base`: enough
/// digits to recover the value exactly when parsed back.
pub(crate) fn default_digits(prec: u32, base: u32) -> usize {
    let per_digit = f64::from(base).log2();
    (f64::from(prec) / per_digit).ceil() as usize + 1
}

fn invalid_number(text: &str) -> Error {
    Error::value_error(format!("invalid digits in number string: {text:?}"))
}

/// Serializes a rounding-outcome code as its signed integer form:
/// -1 rounded down, 0 exact, +1 rounded up.
pub(crate) mod ternary_serde {
    use std::cmp::Ordering;

    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub(crate) fn to_int(rc: Ordering) -> i8 {
        match rc {
            Ordering::Less => -1,
            Ordering::Equal => 0,
            Ordering::Greater => 1,
        }
    }

    pub(crate) fn from_int(value: i8) -> Ordering {
        match value {
            i8::MIN..=-1 => Ordering::Less,
            0 => Ordering::Equal,
            _ => Ordering::Greater,
        }
    }

    pub(crate) fn serialize<S: Serializer>(rc: &Ordering, serializer: S) -> Result<S::Ok, S::Error> {
        to_int(*rc).serialize(serializer)
    }

    pub(crate) fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Ordering, D::Error> {
        Ok(from_int(i8::deserialize(deserializer)?))
    }
}

/// Serializes the combined complex rounding-outcome pair as two signed
/// integers in `(real, imag)` order.
pub(crate) mod ternary_pair_serde {
    use std::cmp::Ordering;

    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    use super::ternary_serde::{from_int, to_int};

    pub(crate) fn serialize<S: Serializer>(rc: &(Ordering, Ordering), serializer: S) -> Result<S::Ok, S::Error> {
        (to_int(rc.0), to_int(rc.1)).serialize(serializer)
    }

    pub(crate) fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<(Ordering, Ordering), D::Error> {
        let (re, im) = <(i8, i8)>::deserialize(deserializer)?;
        Ok((from_int(re), from_int(im)))
    }
}
