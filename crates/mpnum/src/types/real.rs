//! Arbitrary-precision real values.

use std::{cmp::Ordering, fmt};

use serde::{Deserialize, Serialize};

use crate::{
    context::Context,
    error::{Error, OpResult},
    fp::{self, Fp},
    hash::hash_fp,
    number::{self, Operand},
};

/// An arbitrary-precision binary floating-point number.
///
/// A `Real` records the precision it was computed at and the
/// rounding-outcome code of the operation that produced it:
/// `Ordering::Less` when the stored value is below the exact result,
/// `Ordering::Equal` when exact, `Ordering::Greater` when above.
/// Values are immutable once constructed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Real {
    fp: Fp,
    prec: u32,
    #[serde(with = "crate::fp::ternary_serde")]
    rc: Ordering,
}

impl Real {
    /// Builds a value from primitive output. Crate-internal: the public
    /// construction paths are [`Real::convert`] and the dispatch operations.
    pub(crate) fn from_parts(fp: Fp, prec: u32, rc: Ordering) -> Self {
        Self { fp, prec, rc }
    }

    /// Converts any real-domain operand, rounding with the context's real
    /// rounding mode.
    ///
    /// `prec == 0` means "use the context's real precision". Precision 1 is
    /// the conventional request for classification-only conversions, where
    /// the numeric value is discarded. Complex-shaped operands fail with a
    /// `TypeError`.
    pub fn convert<'a>(value: impl Into<Operand<'a>>, prec: u32, ctx: &Context) -> OpResult<Self> {
        number::real_from_operand(&value.into(), prec, ctx)
    }

    /// Parses a numeric string in the given base (2–36).
    pub fn from_str_base(text: &str, base: u32, prec: u32, ctx: &Context) -> OpResult<Self> {
        Self::convert(Operand::str_with_base(text, base), prec, ctx)
    }

    pub(crate) fn fp(&self) -> &Fp {
        &self.fp
    }

    /// The precision in bits this value carries.
    #[must_use]
    pub fn prec(&self) -> u32 {
        self.prec
    }

    /// The rounding-outcome code of the operation that produced this value.
    #[must_use]
    pub fn rc(&self) -> Ordering {
        self.rc
    }

    /// Returns true if this is NaN.
    #[must_use]
    pub fn is_nan(&self) -> bool {
        self.fp.is_nan()
    }

    /// Returns true if this is plus or minus infinity.
    #[must_use]
    pub fn is_infinite(&self) -> bool {
        self.fp.is_inf()
    }

    /// Returns true if this is neither NaN nor infinite.
    #[must_use]
    pub fn is_finite(&self) -> bool {
        self.fp.is_finite()
    }

    /// Returns true if this is (signed) zero.
    #[must_use]
    pub fn is_zero(&self) -> bool {
        self.fp.is_zero()
    }

    /// Returns true if the sign bit is set (including -0, -Infinity).
    #[must_use]
    pub fn is_signed(&self) -> bool {
        self.fp.is_neg()
    }

    /// CPython-compatible numeric hash; equal values hash equal regardless of
    /// the precision they carry.
    #[must_use]
    pub fn hash_value(&self) -> i64 {
        hash_fp(&self.fp)
    }

    /// Returns up to `ndigits` digits in `base` as a
    /// `(digits, exponent, precision)` triple reading `±0.digits · base^exp`.
    ///
    /// `ndigits == 0` requests enough digits to recover the value exactly
    /// when parsed back. `base` must lie in 2–62; anything else is a
    /// `ValueError`. Non-finite values render as their fixed-case names with
    /// a zero exponent.
    pub fn digits(&self, base: u32, ndigits: usize) -> OpResult<(String, i64, u32)> {
        if !(2..=62).contains(&base) {
            return Err(Error::value_error(format!(
                "base for digits() must be in the interval [2, 62], not {base}"
            )));
        }
        let n = if ndigits == 0 {
            fp::default_digits(self.prec, base)
        } else {
            ndigits
        };
        let rendered = match &self.fp {
            Fp::Nan => ("nan".to_string(), 0),
            Fp::Inf { neg: false } => ("inf".to_string(), 0),
            Fp::Inf { neg: true } => ("-inf".to_string(), 0),
            Fp::Zero { neg } => {
                let sign = if *neg { "-" } else { "" };
                (format!("{sign}{}", "0".repeat(n)), 0)
            }
            finite => {
                let (digits, exp) = finite
                    .to_digits(base, n, crate::context::RoundMode::Nearest)
                    .ok_or_else(|| Error::new_msg(crate::error::ExcKind::InternalError, "digit conversion failed"))?;
                let sign = if finite.is_neg() { "-" } else { "" };
                (format!("{sign}{digits}"), exp)
            }
        };
        Ok((rendered.0, rendered.1, self.prec))
    }
}

impl PartialEq for Real {
    /// Numeric equality: signed zeros compare equal, NaN compares unequal to
    /// everything including itself. Precision and rounding codes are not part
    /// of a value's identity.
    fn eq(&self, other: &Self) -> bool {
        self.fp.cmp_value(&other.fp) == Some(Ordering::Equal)
    }
}

impl PartialOrd for Real {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        self.fp.cmp_value(&other.fp)
    }
}

impl fmt::Display for Real {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.fp {
            Fp::Nan => write!(f, "nan"),
            Fp::Inf { neg } => write!(f, "{}inf", if *neg { "-" } else { "" }),
            Fp::Zero { neg } => write!(f, "{}0.0", if *neg { "-" } else { "" }),
            finite => {
                let n = fp::default_digits(self.prec, 10);
                let Some((digits, point)) = finite.to_digits(10, n, crate::context::RoundMode::Nearest) else {
                    return write!(f, "<invalid>");
                };
                let digits = {
                    let trimmed = digits.trim_end_matches('0');
                    if trimmed.is_empty() { "0" } else { trimmed }.to_string()
                };
                let sign = if finite.is_neg() { "-" } else { "" };
                if point > 17 || point <= -4 {
                    // Scientific placement, one digit before the point.
                    let exp = point - 1;
                    if digits.len() == 1 {
                        write!(f, "{sign}{digits}e{exp:+}")
                    } else {
                        let (first, rest) = digits.split_at(1);
                        write!(f, "{sign}{first}.{rest}e{exp:+}")
                    }
                } else if point <= 0 {
                    write!(f, "{sign}0.{}{}", "0".repeat((-point) as usize), digits)
                } else if (point as usize) >= digits.len() {
                    write!(f, "{sign}{digits}{}.0", "0".repeat(point as usize - digits.len()))
                } else {
                    let (int_part, frac_part) = digits.split_at(point as usize);
                    write!(f, "{sign}{int_part}.{frac_part}")
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx() -> Context {
        Context::new()
    }

    #[test]
    fn test_convert_uses_context_precision() {
        let mut c = ctx();
        let x = Real::convert("0.1", 0, &c).unwrap();
        assert_eq!(x.prec(), 53);
        assert_eq!(x.rc(), Ordering::Greater);

        c.set_real_prec(100).unwrap();
        let wide = Real::convert("0.1", 0, &c).unwrap();
        assert_eq!(wide.prec(), 100);
        // Explicit precision overrides the context.
        let narrow = Real::convert("0.1", 24, &c).unwrap();
        assert_eq!(narrow.prec(), 24);
    }

    #[test]
    fn test_convert_rejects_complex() {
        let c = ctx();
        let err = Real::convert((1.0, 2.0), 0, &c).unwrap_err();
        assert_eq!(err.kind(), crate::ExcKind::TypeError);
    }

    #[test]
    fn test_classification_scenario() {
        // precision 53, Nearest, "0.1": finite, nonzero, not nan, not inf.
        let c = ctx();
        let x = Real::convert("0.1", 0, &c).unwrap();
        assert!(x.is_finite());
        assert!(!x.is_zero());
        assert!(!x.is_nan());
        assert!(!x.is_infinite());
        assert!(!x.is_signed());
    }

    #[test]
    fn test_exactly_one_class_holds() {
        let c = ctx();
        for text in ["nan", "inf", "-inf", "0", "-0", "0.1", "-7e99"] {
            let x = Real::convert(text, 0, &c).unwrap();
            let classes = [
                x.is_nan(),
                x.is_infinite(),
                x.is_finite() && !x.is_zero(),
                x.is_zero(),
            ];
            assert_eq!(classes.iter().filter(|&&set| set).count(), 1, "classes for {text}: {classes:?}");
        }
    }

    #[test]
    fn test_equality_ignores_precision() {
        let c = ctx();
        let a = Real::convert("1.5", 53, &c).unwrap();
        let b = Real::convert("1.5", 200, &c).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.hash_value(), b.hash_value());

        let nan = Real::convert("nan", 0, &c).unwrap();
        assert_ne!(nan, nan);
    }

    #[test]
    fn test_display() {
        let c = ctx();
        let show = |s: &str| Real::convert(s, 0, &c).unwrap().to_string();
        assert_eq!(show("24"), "24.0");
        assert_eq!(show("1.5"), "1.5");
        assert_eq!(show("-0.25"), "-0.25");
        assert_eq!(show("0.1"), "0.10000000000000001");
        assert_eq!(show("nan"), "nan");
        assert_eq!(show("-inf"), "-inf");
        assert_eq!(show("0"), "0.0");
        assert_eq!(show("1e30"), "1e+30");
    }

    #[test]
    fn test_digits() {
        let c = ctx();
        let x = Real::convert("255", 0, &c).unwrap();
        let (digits, exp, prec) = x.digits(16, 2).unwrap();
        assert_eq!((digits.as_str(), exp, prec), ("ff", 2, 53));

        let (digits, exp, _) = Real::convert("-0.125", 0, &c).unwrap().digits(10, 3).unwrap();
        assert_eq!((digits.as_str(), exp), ("-125", 0));

        let (digits, exp, _) = Real::convert("nan", 0, &c).unwrap().digits(10, 5).unwrap();
        assert_eq!((digits.as_str(), exp), ("nan", 0));

        assert!(x.digits(63, 0).is_err());
        assert!(x.digits(1, 0).is_err());
    }

    #[test]
    fn test_digits_round_trip() {
        let c = ctx();
        let x = Real::convert("3.141592653589793", 0, &c).unwrap();
        let (digits, exp, _) = x.digits(10, 0).unwrap();
        let rendered = format!("0.{digits}e{exp}");
        let back = Real::convert(rendered.as_str(), 0, &c).unwrap();
        assert_eq!(back, x);
    }
}
