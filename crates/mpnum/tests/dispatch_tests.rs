//! Promotion, dispatch, and classification behavior across operand shapes.

use std::cmp::Ordering;

use pretty_assertions::assert_eq;

use mpnum::{Complex, Context, ExcKind, Flag, Number, Operand, Real};

fn real(text: &str, ctx: &Context) -> Real {
    Real::convert(text, 0, ctx).unwrap()
}

#[test]
fn real_classification_is_mutually_exclusive_and_exhaustive() {
    let ctx = Context::new();
    for text in ["nan", "-nan", "inf", "-inf", "0", "-0", "1", "-0.5", "1e300", "-1e-300"] {
        let x = real(text, &ctx);
        let classes = [
            x.is_nan(),
            x.is_infinite(),
            x.is_finite() && !x.is_zero(),
            x.is_zero(),
        ];
        assert_eq!(
            classes.iter().filter(|&&set| set).count(),
            1,
            "value {text} must land in exactly one class"
        );
    }
}

#[test]
fn complex_classification_follows_part_rules() {
    let ctx = Context::new();
    let cases = [
        ("1", "2", (false, false, true, false)),
        ("nan", "2", (true, false, false, false)),
        ("1", "inf", (false, true, false, false)),
        ("nan", "inf", (true, true, false, false)),
        ("0", "-0", (false, false, true, true)),
    ];
    for (re, im, (nan, inf, finite, zero)) in cases {
        let z = Complex::from_parts(re, im, &ctx).unwrap();
        assert_eq!(z.is_nan(), nan, "is_nan({re}, {im})");
        assert_eq!(z.is_infinite(), inf, "is_infinite({re}, {im})");
        assert_eq!(z.is_finite(), finite, "is_finite({re}, {im})");
        assert_eq!(z.is_zero(), zero, "is_zero({re}, {im})");
    }
}

#[test]
fn predicates_accept_every_operand_shape() {
    let ctx = Context::new();
    assert!(mpnum::is_finite(42, &ctx).unwrap());
    assert!(mpnum::is_finite(42.5f64, &ctx).unwrap());
    assert!(mpnum::is_finite("42.5", &ctx).unwrap());
    assert!(mpnum::is_finite(Operand::str_with_base("2a", 16), &ctx).unwrap());
    assert!(mpnum::is_finite((1.0, 2.0), &ctx).unwrap());
    assert!(mpnum::is_nan(f64::NAN, &ctx).unwrap());
    assert!(mpnum::is_nan((f64::NAN, 0.0), &ctx).unwrap());

    let x = real("7", &ctx);
    assert!(mpnum::is_finite(&x, &ctx).unwrap());
    let z = Complex::from_parts("1", "2", &ctx).unwrap();
    assert!(mpnum::is_finite(&z, &ctx).unwrap());
}

#[test]
fn predicates_work_three_ways() {
    let ctx = Context::new();
    let z = Complex::from_parts("inf", "0", &ctx).unwrap();
    assert!(mpnum::is_infinite(&z, &ctx).unwrap());
    assert!(ctx.is_infinite(&z).unwrap());
    assert!(z.is_infinite());
}

#[test]
fn promotion_is_always_upward() {
    let mut ctx = Context::new();
    // Zero imaginary part does not demote to the real domain.
    let r = mpnum::add((5.0, 0.0), 1, &mut ctx).unwrap();
    assert!(matches!(r, Number::Complex(_)));

    // Mixing real and complex promotes the real operand.
    let z = Complex::from_parts("1", "1", &ctx).unwrap();
    let r = mpnum::mul(2, &z, &mut ctx).unwrap();
    let z2 = r.as_complex().unwrap();
    assert_eq!(z2.real(), &real("2", &ctx));
    assert_eq!(z2.imag(), &real("2", &ctx));
}

#[test]
fn mixed_arithmetic_across_shapes() {
    let mut ctx = Context::new();
    let x = real("1.5", &ctx);
    let r = mpnum::add(&x, "2.5", &mut ctx).unwrap();
    assert_eq!(r.as_real().unwrap(), &real("4", &ctx));

    let r = mpnum::sub(10, 0.5f64, &mut ctx).unwrap();
    assert_eq!(r.as_real().unwrap(), &real("9.5", &ctx));

    let r = mpnum::mul("1e10", "1e-10", &mut ctx).unwrap();
    assert_eq!(r.as_real().unwrap(), &real("1", &ctx));
}

#[test]
fn complex_division_by_zero_without_trap() {
    let mut ctx = Context::new();
    let one = Complex::from_parts("1", "0", &ctx).unwrap();
    let zero = Complex::from_parts("0", "0", &ctx).unwrap();

    let q = mpnum::div(&one, &zero, &mut ctx).unwrap();
    let z = q.as_complex().unwrap();
    assert!(z.real().is_infinite() || z.real().is_nan() || z.imag().is_infinite() || z.imag().is_nan());
    assert!(ctx.flags().divzero);
}

#[test]
fn complex_division_by_zero_with_trap_raises() {
    let mut ctx = Context::new();
    ctx.set_trap(Flag::DivZero, true);
    let one = Complex::from_parts("1", "0", &ctx).unwrap();
    let zero = Complex::from_parts("0", "0", &ctx).unwrap();

    let err = mpnum::div(&one, &zero, &mut ctx).unwrap_err();
    assert_eq!(err.kind(), ExcKind::DivisionByZeroError);
    assert!(ctx.flags().divzero);
}

#[test]
fn complex_floor_division_is_rejected() {
    let ctx = Context::new();
    let a = Complex::from_parts("1", "2", &ctx).unwrap();
    let b = Complex::from_parts("3", "4", &ctx).unwrap();
    assert_eq!(a.floor_div(&b).unwrap_err().kind(), ExcKind::TypeError);
    assert_eq!(a.rem(&b).unwrap_err().kind(), ExcKind::TypeError);
}

#[test]
fn non_numeric_operand_is_rejected() {
    let mut ctx = Context::new();
    let err = mpnum::add("one", 1, &mut ctx).unwrap_err();
    assert_eq!(err.kind(), ExcKind::ValueError);

    let err = Real::convert((1.0, 2.0), 0, &ctx).unwrap_err();
    assert_eq!(err.kind(), ExcKind::TypeError);
}

#[test]
fn string_operands_respect_base() {
    let mut ctx = Context::new();
    let r = mpnum::add(Operand::str_with_base("ff", 16), 1, &mut ctx).unwrap();
    assert_eq!(r.as_real().unwrap(), &real("256", &ctx));

    let err = Real::convert(Operand::str_with_base("1", 37), 0, &ctx).unwrap_err();
    assert_eq!(err.kind(), ExcKind::ValueError);
}

#[test]
fn rounding_direction_is_observable_in_rc() {
    let mut ctx = Context::new();
    ctx.set_real_round(mpnum::RoundMode::Up);
    let q = mpnum::div(1, 3, &mut ctx).unwrap();
    assert_eq!(q.as_real().unwrap().rc(), Ordering::Greater);

    ctx.set_real_round(mpnum::RoundMode::Down);
    let q = mpnum::div(1, 3, &mut ctx).unwrap();
    assert_eq!(q.as_real().unwrap().rc(), Ordering::Less);
}

#[test]
fn sqrt_promotes_only_when_allowed() {
    let mut ctx = Context::new();
    let r = mpnum::sqrt(-9, &mut ctx).unwrap();
    assert!(r.as_real().unwrap().is_nan());
    assert!(ctx.flags().invalid);

    ctx.clear_flags();
    ctx.set_allow_complex(true);
    let r = mpnum::sqrt(-9, &mut ctx).unwrap();
    let z = r.as_complex().unwrap();
    assert_eq!(z.imag(), &real("3", &ctx));
    assert!(!ctx.flags().invalid);
}

#[test]
fn norm_and_abs_cover_both_domains() {
    let mut ctx = Context::new();
    assert_eq!(mpnum::abs(-4, &mut ctx).unwrap(), real("4", &ctx));
    assert_eq!(mpnum::abs("3+4j", &mut ctx).unwrap(), real("5", &ctx));
    assert_eq!(mpnum::norm("3+4j", &mut ctx).unwrap(), real("25", &ctx));
    // A real operand promotes: norm(x) is x².
    assert_eq!(mpnum::norm(3, &mut ctx).unwrap(), real("9", &ctx));
}

#[test]
fn comparison_signals_erange_on_nan() {
    let mut ctx = Context::new();
    assert_eq!(mpnum::cmp(1, 2, &mut ctx).unwrap(), Some(Ordering::Less));
    assert!(!ctx.flags().erange);

    assert_eq!(mpnum::cmp("nan", 2, &mut ctx).unwrap(), None);
    assert!(ctx.flags().erange);

    ctx.clear_flags();
    ctx.set_trap(Flag::Erange, true);
    let err = mpnum::cmp("nan", 2, &mut ctx).unwrap_err();
    assert_eq!(err.kind(), ExcKind::RangeOperationError);
}

#[test]
fn digits_round_trip_through_parsing() {
    let ctx = Context::new();
    let x = real("2.718281828459045", &ctx);
    let (digits, exp, prec) = x.digits(10, 0).unwrap();
    assert_eq!(prec, 53);
    let back = real(&format!("0.{digits}e{exp}"), &ctx);
    assert_eq!(back, x);

    let z = Complex::from_parts("1.5", "-0.25", &ctx).unwrap();
    let ((rd, re_exp, _), (id, im_exp, _)) = z.digits(10, 5).unwrap();
    assert_eq!((rd.as_str(), re_exp), ("15000", 1));
    assert_eq!((id.as_str(), im_exp), ("-25000", 0));
}

#[test]
fn hash_distinguishes_domains_but_not_precision() {
    let ctx = Context::new();
    let a = Real::convert("2.5", 24, &ctx).unwrap();
    let b = Real::convert("2.5", 200, &ctx).unwrap();
    assert_eq!(a.hash_value(), b.hash_value());

    let z = Complex::from_parts("2.5", "0", &ctx).unwrap();
    // The imaginary-zero hash term is zero, matching CPython's complex(2.5).
    assert_eq!(z.hash_value(), a.hash_value());

    let w = Complex::from_parts("2.5", "1", &ctx).unwrap();
    assert_ne!(w.hash_value(), a.hash_value());
}
