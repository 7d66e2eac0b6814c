#![doc = include_str!("../../../README.md")]
#![expect(clippy::cast_possible_truncation, reason = "numeric narrowing is bounds-checked at call sites")]
#![expect(clippy::cast_sign_loss, reason = "sign-changing casts follow explicit sign checks")]
#![expect(clippy::cast_possible_wrap, reason = "exponent arithmetic stays far from the i64 edges")]

mod context;
mod engine;
mod error;
mod format;
mod fp;
mod hash;
mod number;
mod types;

pub use crate::{
    context::{
        Context, ExceptionFlags, Flag, LocalContext, RoundMode, EMAX_DEFAULT, EMIN_DEFAULT, PREC_DEFAULT, PREC_MAX,
    },
    error::{Error, ExcKind, OpResult},
    number::{
        Number, Operand, abs, add, cmp, conj, div, div_2exp, is_finite, is_infinite, is_nan, is_zero, mul, mul_2exp,
        neg, norm, sqrt, sub,
    },
    types::{Complex, Real},
};
