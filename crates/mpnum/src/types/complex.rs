//! Arbitrary-precision complex values.

use std::{cmp::Ordering, fmt, sync::OnceLock};

use serde::{Deserialize, Serialize};

use crate::{
    context::Context,
    error::OpResult,
    fp::Fp,
    hash::{combine_complex, hash_fp},
    number::{self, Operand},
    types::Real,
};

/// An arbitrary-precision complex number: a pair of [`Real`] parts whose
/// precisions may differ.
///
/// The combined rounding-outcome code is the pair of the parts' ternaries in
/// `(real, imag)` order. The hash is computed at most once and cached; values
/// are immutable after construction, so the cache can never go stale.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Complex {
    real: Real,
    imag: Real,
    #[serde(with = "crate::fp::ternary_pair_serde")]
    rc: (Ordering, Ordering),
    #[serde(skip)]
    hash_cache: OnceLock<i64>,
}

impl Complex {
    /// Assembles a complex value from already-converted parts.
    pub(crate) fn from_reals(real: Real, imag: Real) -> Self {
        let rc = (real.rc(), imag.rc());
        Self {
            real,
            imag,
            rc,
            hash_cache: OnceLock::new(),
        }
    }

    /// Builds a complex value from two real-domain operands, using the
    /// context's per-part precision and rounding.
    pub fn from_parts<'a>(
        re: impl Into<Operand<'a>>,
        im: impl Into<Operand<'a>>,
        ctx: &Context,
    ) -> OpResult<Self> {
        let real = number::real_part_from_operand(&re.into(), ctx.real_prec(), ctx.real_round())?;
        let imag = number::real_part_from_operand(&im.into(), ctx.imag_prec(), ctx.imag_round())?;
        Ok(Self::from_reals(real, imag))
    }

    /// Converts any operand into the complex domain.
    ///
    /// `rprec`/`iprec` of 0 mean "use the context's precision"; real-shaped
    /// operands gain a positive-zero imaginary part. Promotion never goes the
    /// other way: a complex-shaped operand with zero imaginary part stays
    /// complex.
    pub fn convert<'a>(value: impl Into<Operand<'a>>, rprec: u32, iprec: u32, ctx: &Context) -> OpResult<Self> {
        number::complex_from_operand(&value.into(), rprec, iprec, ctx)
    }

    /// Parses a complex string in the given base (2–36); both the
    /// `a+bj` and the `(a b)` forms are accepted.
    pub fn from_str_base(text: &str, base: u32, ctx: &Context) -> OpResult<Self> {
        Self::convert(Operand::str_with_base(text, base), 0, 0, ctx)
    }

    /// The real part.
    #[must_use]
    pub fn real(&self) -> &Real {
        &self.real
    }

    /// The imaginary part.
    #[must_use]
    pub fn imag(&self) -> &Real {
        &self.imag
    }

    /// The `(real, imag)` precision pair.
    #[must_use]
    pub fn prec(&self) -> (u32, u32) {
        (self.real.prec(), self.imag.prec())
    }

    /// The `(real, imag)` rounding-outcome pair.
    #[must_use]
    pub fn rc(&self) -> (Ordering, Ordering) {
        self.rc
    }

    /// Returns true if either part is NaN.
    #[must_use]
    pub fn is_nan(&self) -> bool {
        self.real.is_nan() || self.imag.is_nan()
    }

    /// Returns true if either part is infinite.
    #[must_use]
    pub fn is_infinite(&self) -> bool {
        self.real.is_infinite() || self.imag.is_infinite()
    }

    /// Returns true only if both parts are finite.
    #[must_use]
    pub fn is_finite(&self) -> bool {
        self.real.is_finite() && self.imag.is_finite()
    }

    /// Returns true only if both parts are (signed) zero.
    #[must_use]
    pub fn is_zero(&self) -> bool {
        self.real.is_zero() && self.imag.is_zero()
    }

    /// CPython-compatible hash, combining the part hashes with the imaginary
    /// multiplier. Computed once and cached.
    #[must_use]
    pub fn hash_value(&self) -> i64 {
        *self
            .hash_cache
            .get_or_init(|| combine_complex(hash_fp(self.real.fp()), hash_fp(self.imag.fp())))
    }

    /// Returns the digit triples of both parts; see [`Real::digits`].
    pub fn digits(&self, base: u32, ndigits: usize) -> OpResult<((String, i64, u32), (String, i64, u32))> {
        Ok((self.real.digits(base, ndigits)?, self.imag.digits(base, ndigits)?))
    }

    /// Formats this value with the complex format mini-language.
    pub fn format(&self, spec: &str) -> OpResult<String> {
        crate::format::format_complex(self, spec)
    }

    /// Floor division is undefined in the complex domain.
    pub fn floor_div(&self, _other: &Self) -> OpResult<Self> {
        Err(crate::error::Error::type_error("can't take floor of complex number."))
    }

    /// The modulo operation is undefined in the complex domain.
    pub fn rem(&self, _other: &Self) -> OpResult<Self> {
        Err(crate::error::Error::type_error("can't mod complex numbers"))
    }

    // --- primitive arithmetic; flag handling lives in the dispatch layer ---

    /// Negates both parts, rounding to the context's precisions.
    pub(crate) fn neg_with(&self, ctx: &Context) -> Self {
        let (re, re_rc) = self.real.fp().neg().round(ctx.real_prec(), ctx.real_round());
        let (im, im_rc) = self.imag.fp().neg().round(ctx.imag_prec(), ctx.imag_round());
        Self::from_reals(
            Real::from_parts(re, ctx.real_prec(), re_rc),
            Real::from_parts(im, ctx.imag_prec(), im_rc),
        )
    }

    /// Conjugates, rounding to the context's precisions.
    pub(crate) fn conj_with(&self, ctx: &Context) -> Self {
        let (re, re_rc) = self.real.fp().round(ctx.real_prec(), ctx.real_round());
        let (im, im_rc) = self.imag.fp().neg().round(ctx.imag_prec(), ctx.imag_round());
        Self::from_reals(
            Real::from_parts(re, ctx.real_prec(), re_rc),
            Real::from_parts(im, ctx.imag_prec(), im_rc),
        )
    }

    /// Componentwise addition.
    pub(crate) fn add_with(&self, other: &Self, ctx: &Context) -> Self {
        let (re, re_rc) = self.real.fp().add(other.real.fp(), ctx.real_prec(), ctx.real_round());
        let (im, im_rc) = self.imag.fp().add(other.imag.fp(), ctx.imag_prec(), ctx.imag_round());
        Self::from_reals(
            Real::from_parts(re, ctx.real_prec(), re_rc),
            Real::from_parts(im, ctx.imag_prec(), im_rc),
        )
    }

    /// Componentwise subtraction.
    pub(crate) fn sub_with(&self, other: &Self, ctx: &Context) -> Self {
        let (re, re_rc) = self.real.fp().sub(other.real.fp(), ctx.real_prec(), ctx.real_round());
        let (im, im_rc) = self.imag.fp().sub(other.imag.fp(), ctx.imag_prec(), ctx.imag_round());
        Self::from_reals(
            Real::from_parts(re, ctx.real_prec(), re_rc),
            Real::from_parts(im, ctx.imag_prec(), im_rc),
        )
    }

    /// `(a+bi)(c+di) = (ac-bd) + (ad+bc)i`.
    ///
    /// The four products are exact, so each part is rounded exactly once.
    pub(crate) fn mul_with(&self, other: &Self, ctx: &Context) -> Self {
        let (a, b) = (self.real.fp(), self.imag.fp());
        let (c, d) = (other.real.fp(), other.imag.fp());
        let (re, re_rc) = a.mul_exact(c).sub(&b.mul_exact(d), ctx.real_prec(), ctx.real_round());
        let (im, im_rc) = a.mul_exact(d).add(&b.mul_exact(c), ctx.imag_prec(), ctx.imag_round());
        Self::from_reals(
            Real::from_parts(re, ctx.real_prec(), re_rc),
            Real::from_parts(im, ctx.imag_prec(), im_rc),
        )
    }

    /// `(a+bi)/(c+di)` via the conjugate formula with guard-bit working
    /// precision.
    ///
    /// A zero divisor follows the IEEE convention: infinity components signed
    /// by the dividend (NaN when the dividend is zero too). The `divzero`
    /// signal is the caller's responsibility.
    pub(crate) fn div_with(&self, other: &Self, ctx: &Context) -> Self {
        if other.is_zero() {
            let (re, im) = if self.is_zero() || self.is_nan() {
                (Fp::nan(), Fp::nan())
            } else {
                (Fp::inf(self.real.is_signed()), Fp::inf(self.imag.is_signed()))
            };
            return Self::from_reals(
                Real::from_parts(re, ctx.real_prec(), Ordering::Equal),
                Real::from_parts(im, ctx.imag_prec(), Ordering::Equal),
            );
        }

        let wp = working_prec(ctx);
        let (a, b) = (self.real.fp(), self.imag.fp());
        let (c, d) = (other.real.fp(), other.imag.fp());
        let rnd = crate::context::RoundMode::Nearest;
        let den = c.mul_exact(c).add(&d.mul_exact(d), wp, rnd).0;
        let num_re = a.mul_exact(c).add(&b.mul_exact(d), wp, rnd).0;
        let num_im = b.mul_exact(c).sub(&a.mul_exact(d), wp, rnd).0;
        let (re, re_rc) = num_re.div(&den, ctx.real_prec(), ctx.real_round());
        let (im, im_rc) = num_im.div(&den, ctx.imag_prec(), ctx.imag_round());
        Self::from_reals(
            Real::from_parts(re, ctx.real_prec(), re_rc),
            Real::from_parts(im, ctx.imag_prec(), im_rc),
        )
    }

    /// The modulus `sqrt(a² + b²)`, a real result at the real precision.
    pub(crate) fn abs_with(&self, ctx: &Context) -> Real {
        // hypot convention: an infinite part dominates even a NaN one.
        if self.is_infinite() {
            return Real::from_parts(Fp::inf(false), ctx.real_prec(), Ordering::Equal);
        }
        let (fp, rc) = self.norm_fp(working_prec(ctx)).sqrt(ctx.real_prec(), ctx.real_round());
        Real::from_parts(fp, ctx.real_prec(), rc)
    }

    /// The norm `a² + b²`, a real result at the real precision.
    pub(crate) fn norm_with(&self, ctx: &Context) -> Real {
        if self.is_infinite() {
            return Real::from_parts(Fp::inf(false), ctx.real_prec(), Ordering::Equal);
        }
        let (fp, rc) = self.norm_fp(ctx.real_prec() + 32).round(ctx.real_prec(), ctx.real_round());
        Real::from_parts(fp, ctx.real_prec(), rc)
    }

    /// `a² + b²` at the given working precision; squares are exact.
    fn norm_fp(&self, wp: u32) -> Fp {
        let (a, b) = (self.real.fp(), self.imag.fp());
        a.mul_exact(a)
            .add(&b.mul_exact(b), wp, crate::context::RoundMode::Nearest)
            .0
    }

    /// The principal square root.
    pub(crate) fn sqrt_with(&self, ctx: &Context) -> Self {
        let rnd = crate::context::RoundMode::Nearest;
        let wp = working_prec(ctx);
        let (a, b) = (self.real.fp(), self.imag.fp());

        let build = |re: Fp, re_rc: Ordering, im: Fp, im_rc: Ordering| {
            Self::from_reals(
                Real::from_parts(re, ctx.real_prec(), re_rc),
                Real::from_parts(im, ctx.imag_prec(), im_rc),
            )
        };

        // Special-value ladder in the C99 csqrt style.
        if b.is_inf() {
            return build(Fp::inf(false), Ordering::Equal, b.clone(), Ordering::Equal);
        }
        if a.is_inf() {
            return if a.is_neg() {
                build(Fp::zero(false), Ordering::Equal, Fp::inf(b.is_neg()), Ordering::Equal)
            } else {
                build(Fp::inf(false), Ordering::Equal, Fp::zero(b.is_neg()), Ordering::Equal)
            };
        }
        if a.is_nan() || b.is_nan() {
            return build(Fp::nan(), Ordering::Equal, Fp::nan(), Ordering::Equal);
        }
        if self.is_zero() {
            return build(Fp::zero(false), Ordering::Equal, Fp::zero(b.is_neg()), Ordering::Equal);
        }

        // h = |z|; the half-angle identities pick the numerically stable arm.
        let h = self.norm_fp(wp).sqrt(wp, rnd).0;
        if !a.is_neg() {
            // re = sqrt((h + a) / 2), im = b / (2 re)
            let re_wide = h.add(a, wp, rnd).0.mul_2exp(-1).sqrt(wp, rnd).0;
            let (re, re_rc) = re_wide.round(ctx.real_prec(), ctx.real_round());
            let (im, im_rc) = b.div(&re_wide.mul_2exp(1), ctx.imag_prec(), ctx.imag_round());
            build(re, re_rc, im, im_rc)
        } else {
            // im = ±sqrt((h - a) / 2), re = b / (2 im)
            let im_mag = h.sub(a, wp, rnd).0.mul_2exp(-1).sqrt(wp, rnd).0;
            let im_wide = if b.is_neg() { im_mag.neg() } else { im_mag };
            let (im, im_rc) = im_wide.round(ctx.imag_prec(), ctx.imag_round());
            let (re, re_rc) = b.div(&im_wide.mul_2exp(1), ctx.real_prec(), ctx.real_round());
            build(re, re_rc, im, im_rc)
        }
    }

    /// Scales both parts by `2^k`; exact apart from the range check above.
    pub(crate) fn mul_2exp_with(&self, k: i64, ctx: &Context) -> Self {
        let (re, re_rc) = self.real.fp().mul_2exp(k).round(ctx.real_prec(), ctx.real_round());
        let (im, im_rc) = self.imag.fp().mul_2exp(k).round(ctx.imag_prec(), ctx.imag_round());
        Self::from_reals(
            Real::from_parts(re, ctx.real_prec(), re_rc),
            Real::from_parts(im, ctx.imag_prec(), im_rc),
        )
    }
}

/// Working precision for compound operations: the widest part plus guard bits.
fn working_prec(ctx: &Context) -> u32 {
    2 * ctx.real_prec().max(ctx.imag_prec()) + 32
}

impl PartialEq for Complex {
    /// Componentwise numeric equality; NaN parts compare unequal.
    fn eq(&self, other: &Self) -> bool {
        self.real == other.real && self.imag == other.imag
    }
}

impl fmt::Display for Complex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let imag = self.imag.to_string();
        if imag.starts_with('-') {
            write!(f, "({}{}j)", self.real, imag)
        } else {
            write!(f, "({}+{}j)", self.real, imag)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx() -> Context {
        Context::new()
    }

    fn z(re: &str, im: &str, c: &Context) -> Complex {
        Complex::from_parts(re, im, c).unwrap()
    }

    #[test]
    fn test_from_parts_uses_part_precisions() {
        let mut c = ctx();
        c.set_real_prec(100).unwrap();
        c.set_imag_prec(Some(40)).unwrap();
        let v = z("1.5", "0.1", &c);
        assert_eq!(v.prec(), (100, 40));
        assert_eq!(v.rc().0, Ordering::Equal);
        assert_ne!(v.rc().1, Ordering::Equal);
    }

    #[test]
    fn test_predicate_part_semantics() {
        let c = ctx();
        let nan_imag = z("1", "nan", &c);
        assert!(nan_imag.is_nan() && !nan_imag.is_finite());

        let inf_real = z("inf", "2", &c);
        assert!(inf_real.is_infinite() && !inf_real.is_finite());

        let zero = z("0", "-0", &c);
        assert!(zero.is_zero() && zero.is_finite());

        let half_zero = z("0", "1", &c);
        assert!(!half_zero.is_zero());
    }

    #[test]
    fn test_mul() {
        let c = ctx();
        // (1+2i)(3+4i) = -5 + 10i
        let p = z("1", "2", &c).mul_with(&z("3", "4", &c), &c);
        assert_eq!(p.real(), &Real::convert("-5", 0, &c).unwrap());
        assert_eq!(p.imag(), &Real::convert("10", 0, &c).unwrap());
    }

    #[test]
    fn test_div_exact() {
        let c = ctx();
        // (-5+10i)/(3+4i) = 1+2i
        let q = z("-5", "10", &c).div_with(&z("3", "4", &c), &c);
        assert_eq!(q.real(), &Real::convert("1", 0, &c).unwrap());
        assert_eq!(q.imag(), &Real::convert("2", 0, &c).unwrap());
    }

    #[test]
    fn test_div_by_zero_values() {
        let c = ctx();
        let q = z("1", "0", &c).div_with(&z("0", "0", &c), &c);
        assert!(q.real().is_infinite() || q.real().is_nan());
        assert!(q.is_infinite() || q.is_nan());

        let q0 = z("0", "0", &c).div_with(&z("0", "0", &c), &c);
        assert!(q0.is_nan());
    }

    #[test]
    fn test_abs_and_norm() {
        let c = ctx();
        let v = z("3", "4", &c);
        assert_eq!(v.abs_with(&c), Real::convert("5", 0, &c).unwrap());
        assert_eq!(v.norm_with(&c), Real::convert("25", 0, &c).unwrap());

        let inf = z("inf", "nan", &c);
        assert!(inf.abs_with(&c).is_infinite());
    }

    #[test]
    fn test_conj_involution() {
        let c = ctx();
        let v = z("1.5", "-2.25", &c);
        let back = v.conj_with(&c).conj_with(&c);
        assert_eq!(v, back);
        assert_eq!(v.conj_with(&c).imag(), &Real::convert("2.25", 0, &c).unwrap());
    }

    #[test]
    fn test_sqrt() {
        let c = ctx();
        // sqrt(-4) in the complex plane is 2i.
        let r = z("-4", "0", &c).sqrt_with(&c);
        assert_eq!(r.real(), &Real::convert("0", 0, &c).unwrap());
        assert_eq!(r.imag(), &Real::convert("2", 0, &c).unwrap());

        // sqrt(3+4i) = 2+i
        let r = z("3", "4", &c).sqrt_with(&c);
        assert_eq!(r.real(), &Real::convert("2", 0, &c).unwrap());
        assert_eq!(r.imag(), &Real::convert("1", 0, &c).unwrap());

        // Principal branch: sqrt of -4-0j has a negative imaginary part.
        let r = z("-4", "-0", &c).sqrt_with(&c);
        assert!(r.imag().is_signed());
    }

    #[test]
    fn test_hash_cached_and_consistent() {
        let c = ctx();
        let v = z("1.5", "2", &c);
        let first = v.hash_value();
        assert_eq!(first, v.hash_value());

        let same = Complex::from_parts("1.5", "2", &c).unwrap();
        assert_eq!(first, same.hash_value());

        let real_only = Real::convert("1.5", 0, &c).unwrap();
        assert_ne!(first, real_only.hash_value());
    }

    #[test]
    fn test_display() {
        let c = ctx();
        assert_eq!(z("1.5", "2.25", &c).to_string(), "(1.5+2.25j)");
        assert_eq!(z("1.5", "-2.25", &c).to_string(), "(1.5-2.25j)");
        assert_eq!(z("0", "nan", &c).to_string(), "(0.0+nanj)");
    }

    #[test]
    fn test_mul_2exp() {
        let c = ctx();
        let v = z("1.5", "-3", &c).mul_2exp_with(2, &c);
        assert_eq!(v.real(), &Real::convert("6", 0, &c).unwrap());
        assert_eq!(v.imag(), &Real::convert("-12", 0, &c).unwrap());
    }
}
