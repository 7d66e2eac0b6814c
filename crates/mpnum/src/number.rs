//! Promotion and dispatch over heterogeneous numeric operands.
//!
//! Every operation in the crate accepts anything convertible into an
//! [`Operand`]: machine integers and floats, native complex pairs, numeric
//! strings, or existing [`Real`]/[`Complex`] values. The operand is matched
//! once at this boundary; foreign types convert using the governing context's
//! precision and rounding, while values already in the matching internal
//! representation are borrowed zero-copy.
//!
//! Promotion is strictly upward. A binary operation with any complex-shaped
//! operand runs in the complex domain, and a complex-shaped value with a zero
//! imaginary part is never demoted to the real domain.

use std::{borrow::Cow, cmp::Ordering, fmt};

use serde::{Deserialize, Serialize};

use crate::{
    context::{Context, Flag, RoundMode, PREC_MAX},
    engine,
    error::{Error, OpResult},
    fp::Fp,
    types::{Complex, Real},
};

/// A heterogeneous numeric operand, matched once at the dispatch boundary.
#[derive(Debug, Clone, Copy)]
pub enum Operand<'a> {
    /// A machine integer.
    Int(i64),
    /// A machine float.
    Float(f64),
    /// A native complex pair. A zero imaginary part keeps it complex.
    Complex64 { re: f64, im: f64 },
    /// An arbitrary-precision real value, used zero-copy.
    Real(&'a Real),
    /// An arbitrary-precision complex value, used zero-copy.
    Cmplx(&'a Complex),
    /// A numeric string in the given base (2–36).
    Str { text: &'a str, base: u32 },
}

impl<'a> Operand<'a> {
    /// A numeric string operand with an explicit base.
    #[must_use]
    pub fn str_with_base(text: &'a str, base: u32) -> Self {
        Self::Str { text, base }
    }

    /// The operand's type name, used in error messages.
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Int(_) => "int",
            Self::Float(_) => "float",
            Self::Complex64 { .. } | Self::Cmplx(_) => "complex",
            Self::Real(_) => "real",
            Self::Str { .. } => "str",
        }
    }

    /// Whether this operand belongs to the complex domain. Strings count as
    /// complex when they use one of the complex spellings (`a+bj`, `(a b)`).
    fn is_complex_shaped(&self) -> bool {
        match self {
            Self::Complex64 { .. } | Self::Cmplx(_) => true,
            Self::Str { text, .. } => {
                let t = text.trim();
                t.contains(['j', 'J']) || t.starts_with('(')
            }
            _ => false,
        }
    }
}

impl From<i64> for Operand<'_> {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<i32> for Operand<'_> {
    fn from(value: i32) -> Self {
        Self::Int(i64::from(value))
    }
}

impl From<u32> for Operand<'_> {
    fn from(value: u32) -> Self {
        Self::Int(i64::from(value))
    }
}

impl From<f64> for Operand<'_> {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<f32> for Operand<'_> {
    fn from(value: f32) -> Self {
        Self::Float(f64::from(value))
    }
}

impl From<(f64, f64)> for Operand<'_> {
    fn from((re, im): (f64, f64)) -> Self {
        Self::Complex64 { re, im }
    }
}

impl<'a> From<&'a Real> for Operand<'a> {
    fn from(value: &'a Real) -> Self {
        Self::Real(value)
    }
}

impl<'a> From<&'a Complex> for Operand<'a> {
    fn from(value: &'a Complex) -> Self {
        Self::Cmplx(value)
    }
}

impl<'a> From<&'a str> for Operand<'a> {
    fn from(text: &'a str) -> Self {
        Self::Str { text, base: 10 }
    }
}

/// A result that may live in either numeric domain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Number {
    Real(Real),
    Complex(Complex),
}

impl Number {
    /// Borrows the real-domain value, if this is one.
    #[must_use]
    pub fn as_real(&self) -> Option<&Real> {
        match self {
            Self::Real(r) => Some(r),
            Self::Complex(_) => None,
        }
    }

    /// Borrows the complex-domain value, if this is one.
    #[must_use]
    pub fn as_complex(&self) -> Option<&Complex> {
        match self {
            Self::Complex(z) => Some(z),
            Self::Real(_) => None,
        }
    }

    /// Extracts the real-domain value, if this is one.
    #[must_use]
    pub fn into_real(self) -> Option<Real> {
        match self {
            Self::Real(r) => Some(r),
            Self::Complex(_) => None,
        }
    }

    /// Extracts the complex-domain value, if this is one.
    #[must_use]
    pub fn into_complex(self) -> Option<Complex> {
        match self {
            Self::Complex(z) => Some(z),
            Self::Real(_) => None,
        }
    }
}

impl fmt::Display for Number {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Real(r) => r.fmt(f),
            Self::Complex(z) => z.fmt(f),
        }
    }
}

// --- conversion -----------------------------------------------------------

/// Resolves a requested precision: 0 means the context default.
fn resolve_prec(prec: u32, default: u32) -> OpResult<u32> {
    if prec == 0 {
        Ok(default)
    } else if prec <= PREC_MAX {
        Ok(prec)
    } else {
        Err(Error::range_error(format!("invalid value for precision: {prec}")))
    }
}

fn validate_input_base(base: u32) -> OpResult<()> {
    if (2..=36).contains(&base) {
        Ok(())
    } else {
        Err(Error::value_error(format!(
            "base for conversion must be in the interval [2, 36], not {base}"
        )))
    }
}

/// Converts a real-shaped operand at an explicit precision and rounding mode.
pub(crate) fn real_part_from_operand(op: &Operand<'_>, prec: u32, rnd: RoundMode) -> OpResult<Real> {
    let (fp, rc) = match op {
        Operand::Int(v) => Fp::from_i64(*v, prec, rnd),
        Operand::Float(v) => Fp::from_f64(*v, prec, rnd),
        Operand::Real(r) => r.fp().round(prec, rnd),
        Operand::Str { text, base } => {
            validate_input_base(*base)?;
            Fp::from_str_base(text, *base, prec, rnd)?
        }
        Operand::Complex64 { .. } | Operand::Cmplx(_) => {
            return Err(Error::type_error(format!(
                "cannot convert '{}' operand to a real value",
                op.type_name()
            )));
        }
    };
    Ok(Real::from_parts(fp, prec, rc))
}

/// Converts any real-shaped operand using the context's real settings;
/// `prec == 0` requests the context precision.
pub(crate) fn real_from_operand(op: &Operand<'_>, prec: u32, ctx: &Context) -> OpResult<Real> {
    let prec = resolve_prec(prec, ctx.real_prec())?;
    real_part_from_operand(op, prec, ctx.real_round())
}

/// Converts any operand into the complex domain; real-shaped operands gain a
/// positive-zero imaginary part at the imaginary precision.
pub(crate) fn complex_from_operand(op: &Operand<'_>, rprec: u32, iprec: u32, ctx: &Context) -> OpResult<Complex> {
    let rprec = resolve_prec(rprec, ctx.real_prec())?;
    let iprec = resolve_prec(iprec, ctx.imag_prec())?;
    let (rrnd, irnd) = (ctx.real_round(), ctx.imag_round());
    match op {
        Operand::Cmplx(z) => {
            let (re, re_rc) = z.real().fp().round(rprec, rrnd);
            let (im, im_rc) = z.imag().fp().round(iprec, irnd);
            Ok(Complex::from_reals(
                Real::from_parts(re, rprec, re_rc),
                Real::from_parts(im, iprec, im_rc),
            ))
        }
        Operand::Complex64 { re, im } => {
            let (re, re_rc) = Fp::from_f64(*re, rprec, rrnd);
            let (im, im_rc) = Fp::from_f64(*im, iprec, irnd);
            Ok(Complex::from_reals(
                Real::from_parts(re, rprec, re_rc),
                Real::from_parts(im, iprec, im_rc),
            ))
        }
        Operand::Str { text, base } if op.is_complex_shaped() => {
            validate_input_base(*base)?;
            let (re, im) = parse_complex_str(text, *base, rprec, rrnd, iprec, irnd)?;
            Ok(Complex::from_reals(re, im))
        }
        real_shaped => {
            let re = real_part_from_operand(real_shaped, rprec, rrnd)?;
            let im = Real::from_parts(Fp::zero(false), iprec, Ordering::Equal);
            Ok(Complex::from_reals(re, im))
        }
    }
}

/// Parses the complex string spellings: `a+bj`, `bj`, and the parenthesized
/// pair `(a b)`.
fn parse_complex_str(
    text: &str,
    base: u32,
    rprec: u32,
    rrnd: RoundMode,
    iprec: u32,
    irnd: RoundMode,
) -> OpResult<(Real, Real)> {
    let parse_re = |s: &str| -> OpResult<Real> {
        let (fp, rc) = Fp::from_str_base(s, base, rprec, rrnd)?;
        Ok(Real::from_parts(fp, rprec, rc))
    };
    let parse_im = |s: &str| -> OpResult<Real> {
        let (fp, rc) = Fp::from_str_base(s, base, iprec, irnd)?;
        Ok(Real::from_parts(fp, iprec, rc))
    };

    let mut body = text.trim();
    if let Some(inner) = body.strip_prefix('(').and_then(|rest| rest.strip_suffix(')')) {
        let inner = inner.trim();
        let parts: Vec<&str> = inner.split_whitespace().collect();
        match parts.as_slice() {
            // The two-token form carries the parts directly.
            [re, im] => return Ok((parse_re(re)?, parse_im(im)?)),
            [single] => body = *single,
            _ => return Err(Error::value_error(format!("invalid complex string: {text:?}"))),
        }
        // A single parenthesized token falls through to the a+bj parsing.
    }

    let Some(stripped) = body.strip_suffix(['j', 'J']) else {
        return Ok((parse_re(body)?, parse_im("0")?));
    };

    // Split before the imaginary part's sign; a sign right after an exponent
    // marker belongs to the exponent instead.
    let bytes = stripped.as_bytes();
    let mut split = None;
    for i in (1..bytes.len()).rev() {
        if bytes[i] == b'+' || bytes[i] == b'-' {
            let prev = bytes[i - 1];
            let exponent_sign = if base <= 10 {
                prev == b'e' || prev == b'E' || prev == b'@'
            } else {
                prev == b'@'
            };
            if !exponent_sign {
                split = Some(i);
                break;
            }
        }
    }
    match split {
        Some(i) => Ok((parse_re(&stripped[..i])?, parse_im(&stripped[i..])?)),
        None => Ok((parse_re("0")?, parse_im(stripped)?)),
    }
}

/// Borrows an operand already in the real representation, converting anything
/// else. `prec == 0` requests the context precision.
fn coerce_real<'a>(op: &Operand<'a>, prec: u32, ctx: &Context) -> OpResult<Cow<'a, Real>> {
    match op {
        Operand::Real(r) => Ok(Cow::Borrowed(*r)),
        other => Ok(Cow::Owned(real_from_operand(other, prec, ctx)?)),
    }
}

/// Borrows an operand already in the complex representation, converting
/// anything else upward.
fn coerce_complex<'a>(op: &Operand<'a>, rprec: u32, iprec: u32, ctx: &Context) -> OpResult<Cow<'a, Complex>> {
    match op {
        Operand::Cmplx(z) => Ok(Cow::Borrowed(*z)),
        other => Ok(Cow::Owned(complex_from_operand(other, rprec, iprec, ctx)?)),
    }
}

// --- classification predicates --------------------------------------------

/// One generic classification template instantiated per predicate: the
/// argument is tested directly when it is already in the matching internal
/// representation, and otherwise converted at precision 1 — the value class
/// does not depend on mantissa width, so the conversion stays cheap.
/// Predicates never touch the context's flags.
fn classify(
    op: &Operand<'_>,
    ctx: &Context,
    real_test: fn(&Real) -> bool,
    complex_test: fn(&Complex) -> bool,
) -> OpResult<bool> {
    if op.is_complex_shaped() {
        let z = coerce_complex(op, 1, 1, ctx)?;
        Ok(complex_test(&z))
    } else {
        let x = coerce_real(op, 1, ctx)?;
        Ok(real_test(&x))
    }
}

/// Returns true if `x` is NaN; for complex values, if either part is NaN.
pub fn is_nan<'a>(x: impl Into<Operand<'a>>, ctx: &Context) -> OpResult<bool> {
    classify(&x.into(), ctx, Real::is_nan, Complex::is_nan)
}

/// Returns true if `x` is ±Infinity; for complex values, if either part is
/// infinite.
pub fn is_infinite<'a>(x: impl Into<Operand<'a>>, ctx: &Context) -> OpResult<bool> {
    classify(&x.into(), ctx, Real::is_infinite, Complex::is_infinite)
}

/// Returns true if `x` is an actual number; for complex values, only if both
/// parts are finite.
pub fn is_finite<'a>(x: impl Into<Operand<'a>>, ctx: &Context) -> OpResult<bool> {
    classify(&x.into(), ctx, Real::is_finite, Complex::is_finite)
}

/// Returns true if `x` equals zero; for complex values, only if both parts
/// are zero.
pub fn is_zero<'a>(x: impl Into<Operand<'a>>, ctx: &Context) -> OpResult<bool> {
    classify(&x.into(), ctx, Real::is_zero, Complex::is_zero)
}

impl Context {
    /// See [`is_nan`].
    pub fn is_nan<'a>(&self, x: impl Into<Operand<'a>>) -> OpResult<bool> {
        is_nan(x, self)
    }

    /// See [`is_infinite`].
    pub fn is_infinite<'a>(&self, x: impl Into<Operand<'a>>) -> OpResult<bool> {
        is_infinite(x, self)
    }

    /// See [`is_finite`].
    pub fn is_finite<'a>(&self, x: impl Into<Operand<'a>>) -> OpResult<bool> {
        is_finite(x, self)
    }

    /// See [`is_zero`].
    pub fn is_zero<'a>(&self, x: impl Into<Operand<'a>>) -> OpResult<bool> {
        is_zero(x, self)
    }
}

// --- operation templates ---------------------------------------------------

/// Real-domain unary template: borrow or convert, run the primitive, finish
/// through the flag engine.
fn real_unary(
    x: &Operand<'_>,
    ctx: &mut Context,
    op: &'static str,
    f: fn(&Fp, u32, RoundMode) -> (Fp, Ordering),
) -> OpResult<Real> {
    let prec = ctx.real_prec();
    let rnd = ctx.real_round();
    let a = coerce_real(x, 0, ctx)?;
    let input_nan = a.is_nan();
    let (fp, rc) = f(a.fp(), prec, rnd);
    engine::finish_real(op, Real::from_parts(fp, prec, rc), input_nan, ctx)
}

/// Complex-domain unary template.
fn complex_unary(
    x: &Operand<'_>,
    ctx: &mut Context,
    op: &'static str,
    f: fn(&Complex, &Context) -> Complex,
) -> OpResult<Complex> {
    let a = coerce_complex(x, 0, 0, ctx)?;
    let input_nan = a.is_nan();
    let result = f(&a, ctx);
    engine::finish_complex(op, result, input_nan, ctx)
}

/// Mixed binary template: both operands promote to the complex domain when
/// either is complex-shaped, otherwise both run in the real domain.
fn number_binary(
    x: &Operand<'_>,
    y: &Operand<'_>,
    ctx: &mut Context,
    op: &'static str,
    fr: fn(&Fp, &Fp, u32, RoundMode) -> (Fp, Ordering),
    fc: fn(&Complex, &Complex, &Context) -> Complex,
) -> OpResult<Number> {
    if x.is_complex_shaped() || y.is_complex_shaped() {
        let a = coerce_complex(x, 0, 0, ctx)?;
        let b = coerce_complex(y, 0, 0, ctx)?;
        let input_nan = a.is_nan() || b.is_nan();
        let result = fc(&a, &b, ctx);
        Ok(Number::Complex(engine::finish_complex(op, result, input_nan, ctx)?))
    } else {
        let prec = ctx.real_prec();
        let rnd = ctx.real_round();
        let a = coerce_real(x, 0, ctx)?;
        let b = coerce_real(y, 0, ctx)?;
        let input_nan = a.is_nan() || b.is_nan();
        let (fp, rc) = fr(a.fp(), b.fp(), prec, rnd);
        Ok(Number::Real(engine::finish_real(
            op,
            Real::from_parts(fp, prec, rc),
            input_nan,
            ctx,
        )?))
    }
}

// --- public operations ------------------------------------------------------

/// Adds two numbers.
pub fn add<'a>(x: impl Into<Operand<'a>>, y: impl Into<Operand<'a>>, ctx: &mut Context) -> OpResult<Number> {
    number_binary(&x.into(), &y.into(), ctx, "add()", Fp::add, Complex::add_with)
}

/// Subtracts two numbers.
pub fn sub<'a>(x: impl Into<Operand<'a>>, y: impl Into<Operand<'a>>, ctx: &mut Context) -> OpResult<Number> {
    number_binary(&x.into(), &y.into(), ctx, "sub()", Fp::sub, Complex::sub_with)
}

/// Multiplies two numbers.
pub fn mul<'a>(x: impl Into<Operand<'a>>, y: impl Into<Operand<'a>>, ctx: &mut Context) -> OpResult<Number> {
    number_binary(&x.into(), &y.into(), ctx, "mul()", Fp::mul, Complex::mul_with)
}

/// Divides two numbers.
///
/// A zero divisor signals `divzero` on the context — raising
/// `DivisionByZeroError` when that trap is armed, and otherwise producing the
/// IEEE Infinity/NaN-bearing result.
pub fn div<'a>(x: impl Into<Operand<'a>>, y: impl Into<Operand<'a>>, ctx: &mut Context) -> OpResult<Number> {
    let x = x.into();
    let y = y.into();
    if x.is_complex_shaped() || y.is_complex_shaped() {
        let a = coerce_complex(&x, 0, 0, ctx)?;
        let b = coerce_complex(&y, 0, 0, ctx)?;
        if b.is_zero() {
            ctx.signal(Flag::DivZero, "div()")?;
        }
        let input_nan = a.is_nan() || b.is_nan();
        let result = a.div_with(&b, ctx);
        Ok(Number::Complex(engine::finish_complex("div()", result, input_nan, ctx)?))
    } else {
        let prec = ctx.real_prec();
        let rnd = ctx.real_round();
        let a = coerce_real(&x, 0, ctx)?;
        let b = coerce_real(&y, 0, ctx)?;
        if b.is_zero() && a.is_finite() && !a.is_zero() {
            ctx.signal(Flag::DivZero, "div()")?;
        }
        let input_nan = a.is_nan() || b.is_nan();
        let (fp, rc) = a.fp().div(b.fp(), prec, rnd);
        Ok(Number::Real(engine::finish_real(
            "div()",
            Real::from_parts(fp, prec, rc),
            input_nan,
            ctx,
        )?))
    }
}

fn fp_neg(x: &Fp, prec: u32, rnd: RoundMode) -> (Fp, Ordering) {
    x.neg().round(prec, rnd)
}

fn fp_abs(x: &Fp, prec: u32, rnd: RoundMode) -> (Fp, Ordering) {
    x.abs().round(prec, rnd)
}

/// Negates a number, staying in its domain.
pub fn neg<'a>(x: impl Into<Operand<'a>>, ctx: &mut Context) -> OpResult<Number> {
    let x = x.into();
    if x.is_complex_shaped() {
        Ok(Number::Complex(complex_unary(&x, ctx, "neg()", Complex::neg_with)?))
    } else {
        Ok(Number::Real(real_unary(&x, ctx, "neg()", fp_neg)?))
    }
}

/// Absolute value; the modulus for complex operands. Always a real result.
pub fn abs<'a>(x: impl Into<Operand<'a>>, ctx: &mut Context) -> OpResult<Real> {
    let x = x.into();
    if x.is_complex_shaped() {
        let a = coerce_complex(&x, 0, 0, ctx)?;
        let input_nan = a.is_nan();
        let result = a.abs_with(ctx);
        engine::finish_real("abs()", result, input_nan, ctx)
    } else {
        real_unary(&x, ctx, "abs()", fp_abs)
    }
}

/// Complex conjugate. Real operands promote to the complex domain.
pub fn conj<'a>(x: impl Into<Operand<'a>>, ctx: &mut Context) -> OpResult<Complex> {
    complex_unary(&x.into(), ctx, "conj()", Complex::conj_with)
}

/// The norm `re² + im²`, a real result. Real operands promote first.
pub fn norm<'a>(x: impl Into<Operand<'a>>, ctx: &mut Context) -> OpResult<Real> {
    let x = x.into();
    let a = coerce_complex(&x, 0, 0, ctx)?;
    let input_nan = a.is_nan();
    let result = a.norm_with(ctx);
    engine::finish_real("norm()", result, input_nan, ctx)
}

/// Square root.
///
/// In the real domain a negative operand yields NaN and signals `invalid` —
/// unless the context's `allow_complex` is set, in which case the operand is
/// promoted and the principal complex root is returned.
pub fn sqrt<'a>(x: impl Into<Operand<'a>>, ctx: &mut Context) -> OpResult<Number> {
    let x = x.into();
    if x.is_complex_shaped() {
        return Ok(Number::Complex(complex_unary(&x, ctx, "sqrt()", Complex::sqrt_with)?));
    }
    let a = coerce_real(&x, 0, ctx)?;
    if a.is_signed() && !a.is_zero() && !a.is_nan() {
        if ctx.allow_complex() {
            let promoted = complex_from_operand(&Operand::Real(a.as_ref()), 0, 0, &*ctx)?;
            let result = promoted.sqrt_with(ctx);
            return Ok(Number::Complex(engine::finish_complex("sqrt()", result, false, ctx)?));
        }
        let nan = Real::from_parts(Fp::nan(), ctx.real_prec(), Ordering::Equal);
        return Ok(Number::Real(engine::finish_real("sqrt()", nan, false, ctx)?));
    }
    let prec = ctx.real_prec();
    let rnd = ctx.real_round();
    let input_nan = a.is_nan();
    let (fp, rc) = a.fp().sqrt(prec, rnd);
    Ok(Number::Real(engine::finish_real(
        "sqrt()",
        Real::from_parts(fp, prec, rc),
        input_nan,
        ctx,
    )?))
}

/// Multiplies by `2^k`, staying in the operand's domain.
pub fn mul_2exp<'a>(x: impl Into<Operand<'a>>, k: u32, ctx: &mut Context) -> OpResult<Number> {
    scale_2exp(&x.into(), i64::from(k), "mul_2exp()", ctx)
}

/// Divides by `2^k`, staying in the operand's domain.
pub fn div_2exp<'a>(x: impl Into<Operand<'a>>, k: u32, ctx: &mut Context) -> OpResult<Number> {
    scale_2exp(&x.into(), -i64::from(k), "div_2exp()", ctx)
}

fn scale_2exp(x: &Operand<'_>, k: i64, op: &'static str, ctx: &mut Context) -> OpResult<Number> {
    if x.is_complex_shaped() {
        let a = coerce_complex(x, 0, 0, ctx)?;
        let input_nan = a.is_nan();
        let result = a.mul_2exp_with(k, ctx);
        Ok(Number::Complex(engine::finish_complex(op, result, input_nan, ctx)?))
    } else {
        let prec = ctx.real_prec();
        let rnd = ctx.real_round();
        let a = coerce_real(x, 0, ctx)?;
        let input_nan = a.is_nan();
        let (fp, rc) = a.fp().mul_2exp(k).round(prec, rnd);
        Ok(Number::Real(engine::finish_real(
            op,
            Real::from_parts(fp, prec, rc),
            input_nan,
            ctx,
        )?))
    }
}

/// Compares two real-domain numbers.
///
/// Returns `None` and signals `erange` when either operand is NaN. Complex
/// operands have no order and fail with a `TypeError`.
pub fn cmp<'a>(x: impl Into<Operand<'a>>, y: impl Into<Operand<'a>>, ctx: &mut Context) -> OpResult<Option<Ordering>> {
    let x = x.into();
    let y = y.into();
    if x.is_complex_shaped() || y.is_complex_shaped() {
        return Err(Error::type_error("no ordering relation is defined for complex numbers"));
    }
    let a = coerce_real(&x, 0, ctx)?;
    let b = coerce_real(&y, 0, ctx)?;
    match a.fp().cmp_value(b.fp()) {
        Some(order) => Ok(Some(order)),
        None => {
            ctx.signal(Flag::Erange, "cmp()")?;
            Ok(None)
        }
    }
}
