//! Post-operation flag computation and trap escalation.
//!
//! Every dispatch operation funnels its freshly computed result through this
//! module. The engine compares the result exponent against the context's
//! bounds (replacing it with infinity, the largest finite value, a subnormal,
//! or zero as the rounding direction dictates), derives the exception flags,
//! ORs them into the context, and raises for any newly-set flag whose trap is
//! armed. On the trap path the in-progress result is dropped by scope.
//!
//! Flags are checked in a fixed order: overflow, invalid, underflow, inexact.

use std::cmp::Ordering;

use crate::{
    context::{Context, Flag, RoundMode},
    error::OpResult,
    fp::Fp,
    types::{Complex, Real},
};

/// A range-checked part result.
struct Checked {
    fp: Fp,
    rc: Ordering,
    overflow: bool,
    underflow: bool,
}

/// Applies exponent bounds and subnormalization to one floating-point result.
fn check_range(fp: Fp, rc: Ordering, prec: u32, rnd: RoundMode, ctx: &Context) -> Checked {
    let Some(top) = fp.top_exp() else {
        // Zero, infinity and NaN are exempt from range checks.
        return Checked {
            fp,
            rc,
            overflow: false,
            underflow: false,
        };
    };

    if top > ctx.emax() {
        let neg = fp.is_neg();
        // The rounding direction decides between infinity and the largest
        // finite value, as MPFR's range check does.
        let to_inf = match rnd {
            RoundMode::Nearest | RoundMode::AwayFromZero => true,
            RoundMode::ToZero => false,
            RoundMode::Up => !neg,
            RoundMode::Down => neg,
        };
        let (fp, rc) = if to_inf {
            (Fp::inf(neg), away_rc(neg))
        } else {
            (Fp::max_finite(prec, ctx.emax(), neg), toward_rc(neg))
        };
        return Checked {
            fp,
            rc,
            overflow: true,
            underflow: false,
        };
    }

    if top < ctx.emin() {
        let neg = fp.is_neg();
        let avail = i64::from(prec) - (ctx.emin() - top);
        if ctx.subnormalize() && avail >= 1 {
            // Gradual underflow: re-round to the width left above emin.
            let (sub, sub_rc) = fp.round(avail as u32, rnd);
            let rc = if sub_rc == Ordering::Equal { rc } else { sub_rc };
            return Checked {
                fp: sub,
                rc,
                overflow: false,
                // An exactly representable subnormal does not underflow.
                underflow: rc != Ordering::Equal,
            };
        }
        return Checked {
            fp: Fp::zero(neg),
            rc: toward_rc(neg),
            overflow: false,
            underflow: true,
        };
    }

    Checked {
        fp,
        rc,
        overflow: false,
        underflow: false,
    }
}

fn away_rc(neg: bool) -> Ordering {
    if neg { Ordering::Less } else { Ordering::Greater }
}

fn toward_rc(neg: bool) -> Ordering {
    if neg { Ordering::Greater } else { Ordering::Less }
}

/// Finishes a real-domain operation: range check, flags, traps.
///
/// `input_nan` records whether any operand was already NaN; only NaN produced
/// from non-NaN inputs signals `invalid`.
pub(crate) fn finish_real(op: &'static str, value: Real, input_nan: bool, ctx: &mut Context) -> OpResult<Real> {
    let checked = check_range(
        value.fp().clone(),
        value.rc(),
        value.prec(),
        ctx.real_round(),
        ctx,
    );
    if checked.overflow {
        ctx.signal(Flag::Overflow, op)?;
    }
    if checked.fp.is_nan() && !input_nan {
        ctx.signal(Flag::Invalid, op)?;
    }
    if checked.underflow {
        ctx.signal(Flag::Underflow, op)?;
    }
    if checked.rc != Ordering::Equal {
        ctx.signal(Flag::Inexact, op)?;
    }
    Ok(Real::from_parts(checked.fp, value.prec(), checked.rc))
}

/// Finishes a complex-domain operation; each part is range-checked with its
/// own precision and rounding mode, and the part flags are ORed together.
pub(crate) fn finish_complex(op: &'static str, value: Complex, input_nan: bool, ctx: &mut Context) -> OpResult<Complex> {
    let re = check_range(
        value.real().fp().clone(),
        value.rc().0,
        value.real().prec(),
        ctx.real_round(),
        ctx,
    );
    let im = check_range(
        value.imag().fp().clone(),
        value.rc().1,
        value.imag().prec(),
        ctx.imag_round(),
        ctx,
    );
    if re.overflow || im.overflow {
        ctx.signal(Flag::Overflow, op)?;
    }
    if (re.fp.is_nan() || im.fp.is_nan()) && !input_nan {
        ctx.signal(Flag::Invalid, op)?;
    }
    if re.underflow || im.underflow {
        ctx.signal(Flag::Underflow, op)?;
    }
    if re.rc != Ordering::Equal || im.rc != Ordering::Equal {
        ctx.signal(Flag::Inexact, op)?;
    }
    Ok(Complex::from_reals(
        Real::from_parts(re.fp, value.real().prec(), re.rc),
        Real::from_parts(im.fp, value.imag().prec(), im.rc),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ExcKind;

    fn real(text: &str, ctx: &Context) -> Real {
        Real::convert(text, 0, ctx).unwrap()
    }

    #[test]
    fn test_in_range_result_passes_through() {
        let mut ctx = Context::new();
        let x = real("1.5", &ctx);
        let out = finish_real("test()", x.clone(), false, &mut ctx).unwrap();
        assert_eq!(out, x);
        assert!(!ctx.flags().any());
    }

    #[test]
    fn test_overflow_replaces_with_inf() {
        let mut ctx = Context::new();
        ctx.set_emax(10).unwrap();
        let big = real("4096", &ctx);
        let out = finish_real("test()", big, false, &mut ctx).unwrap();
        assert!(out.is_infinite());
        assert!(ctx.flags().overflow && ctx.flags().inexact);
    }

    #[test]
    fn test_overflow_toward_zero_clamps() {
        let mut ctx = Context::new();
        ctx.set_emax(10).unwrap();
        ctx.set_real_round(RoundMode::ToZero);
        let out = finish_real("test()", real("4096", &ctx), false, &mut ctx).unwrap();
        assert!(out.is_finite());
        // Largest finite value below 2^10.
        assert!(out < real("1024", &ctx) && out > real("1023", &ctx));
    }

    #[test]
    fn test_overflow_trap_raises_and_drops() {
        let mut ctx = Context::new();
        ctx.set_emax(10).unwrap();
        ctx.set_trap(Flag::Overflow, true);
        let err = finish_real("test()", real("4096", &ctx), false, &mut ctx).unwrap_err();
        assert_eq!(err.kind(), ExcKind::OverflowError);
        assert!(ctx.flags().overflow);
    }

    #[test]
    fn test_underflow_flushes_to_zero() {
        let mut ctx = Context::new();
        ctx.set_emin(-10).unwrap();
        let tiny = real("0.00001", &ctx);
        let out = finish_real("test()", tiny, false, &mut ctx).unwrap();
        assert!(out.is_zero());
        assert!(ctx.flags().underflow && ctx.flags().inexact);
    }

    #[test]
    fn test_underflow_subnormalizes() {
        let mut ctx = Context::new();
        ctx.set_emin(-10).unwrap();
        ctx.set_subnormalize(true);
        // 3 · 2^-13 sits below emin but its mantissa still fits exactly.
        let tiny = real("0.0003662109375", &ctx);
        let out = finish_real("test()", tiny.clone(), false, &mut ctx).unwrap();
        assert_eq!(out, tiny);
        assert!(!ctx.flags().underflow);

        // 11 · 2^-65 leaves room for only two mantissa bits: it rounds.
        let odd = Real::from_parts(real("11", &ctx).fp().mul_2exp(-65), 53, Ordering::Equal);
        let out = finish_real("test()", odd.clone(), false, &mut ctx).unwrap();
        assert!(ctx.flags().underflow && ctx.flags().inexact);
        assert_ne!(out, odd);
    }

    #[test]
    fn test_invalid_only_for_fresh_nan() {
        let mut ctx = Context::new();
        let nan = real("nan", &ctx);
        finish_real("test()", nan.clone(), true, &mut ctx).unwrap();
        assert!(!ctx.flags().invalid);
        finish_real("test()", nan, false, &mut ctx).unwrap();
        assert!(ctx.flags().invalid);
    }

    #[test]
    fn test_complex_flags_or_parts() {
        let mut ctx = Context::new();
        ctx.set_emax(10).unwrap();
        let z = Complex::from_parts("4096", "1", &ctx).unwrap();
        let out = finish_complex("test()", z, false, &mut ctx).unwrap();
        assert!(out.real().is_infinite());
        assert!(out.imag().is_finite());
        assert!(ctx.flags().overflow);
    }
}
