//! Arithmetic context: precision, rounding, exponent bounds, flags and traps.
//!
//! A [`Context`] governs every operation in the crate. It is plain data passed
//! explicitly by reference; there is no hidden process-wide current context.
//! Each thread of execution owns its own `Context` — concurrent mutation of a
//! shared one is not supported and must be prevented by the caller.
//!
//! Scoped overriding uses [`Context::local`], which returns a guard holding a
//! snapshot of the full context (configuration *and* flags). The snapshot is
//! restored when the guard drops, on every exit path including unwinding, so
//! nested scopes each restore their own saved state.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString, IntoStaticStr};

use crate::error::{Error, ExcKind, OpResult};

/// Default precision in bits for a freshly created context.
pub const PREC_DEFAULT: u32 = 53;

/// Largest supported precision in bits.
pub const PREC_MAX: u32 = 1 << 30;

/// Default maximum exponent: values must stay below `2^EMAX_DEFAULT`.
pub const EMAX_DEFAULT: i64 = (1 << 30) - 1;

/// Default minimum exponent for normal values.
pub const EMIN_DEFAULT: i64 = 1 - (1 << 30);

/// Largest magnitude accepted for exponent bounds.
const EXP_BOUND: i64 = (1 << 40) - 1;

/// Rounding modes applied when a result cannot be represented exactly at the
/// configured precision.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Display, EnumString, IntoStaticStr, Serialize, Deserialize,
)]
pub enum RoundMode {
    /// Round to the nearest representable value, ties to even.
    #[default]
    Nearest,
    /// Round toward zero (truncate the magnitude).
    ToZero,
    /// Round toward positive infinity.
    Up,
    /// Round toward negative infinity.
    Down,
    /// Round away from zero.
    AwayFromZero,
}

impl RoundMode {
    /// Parses the single-letter code used by the format mini-language.
    #[must_use]
    pub(crate) fn from_letter(letter: char) -> Option<Self> {
        match letter {
            'U' => Some(Self::Up),
            'D' => Some(Self::Down),
            'Y' => Some(Self::AwayFromZero),
            'Z' => Some(Self::ToZero),
            'N' => Some(Self::Nearest),
            _ => None,
        }
    }
}

/// The six exception conditions an operation can signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, IntoStaticStr, Serialize, Deserialize)]
#[strum(serialize_all = "lowercase")]
pub enum Flag {
    /// A nonzero result fell below the minimum exponent.
    Underflow,
    /// The result exponent exceeded the maximum exponent.
    Overflow,
    /// The result was rounded.
    Inexact,
    /// NaN was produced from non-NaN inputs.
    Invalid,
    /// A domain/range error occurred.
    Erange,
    /// Division by a zero-valued divisor.
    DivZero,
}

impl Flag {
    /// The error kind raised when this flag's trap is armed.
    fn exc_kind(self) -> ExcKind {
        match self {
            Self::Underflow => ExcKind::UnderflowError,
            Self::Overflow => ExcKind::OverflowError,
            Self::Inexact => ExcKind::InexactError,
            Self::Invalid => ExcKind::InvalidOperationError,
            Self::Erange => ExcKind::RangeOperationError,
            Self::DivZero => ExcKind::DivisionByZeroError,
        }
    }

    /// Human-readable condition name used in trap error messages.
    fn describe(self) -> &'static str {
        match self {
            Self::Underflow => "underflow",
            Self::Overflow => "overflow",
            Self::Inexact => "inexact result",
            Self::Invalid => "invalid operation",
            Self::Erange => "range error",
            Self::DivZero => "division by zero",
        }
    }
}

/// A set of the six exception conditions, used both for the sticky observed
/// flags and for the armed traps.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExceptionFlags {
    pub underflow: bool,
    pub overflow: bool,
    pub inexact: bool,
    pub invalid: bool,
    pub erange: bool,
    pub divzero: bool,
}

impl ExceptionFlags {
    /// Returns whether the given flag is set.
    #[must_use]
    pub fn get(&self, flag: Flag) -> bool {
        match flag {
            Flag::Underflow => self.underflow,
            Flag::Overflow => self.overflow,
            Flag::Inexact => self.inexact,
            Flag::Invalid => self.invalid,
            Flag::Erange => self.erange,
            Flag::DivZero => self.divzero,
        }
    }

    /// Sets or clears the given flag.
    pub fn set(&mut self, flag: Flag, value: bool) {
        match flag {
            Flag::Underflow => self.underflow = value,
            Flag::Overflow => self.overflow = value,
            Flag::Inexact => self.inexact = value,
            Flag::Invalid => self.invalid = value,
            Flag::Erange => self.erange = value,
            Flag::DivZero => self.divzero = value,
        }
    }

    /// Returns whether any flag is set.
    #[must_use]
    pub fn any(&self) -> bool {
        self.underflow || self.overflow || self.inexact || self.invalid || self.erange || self.divzero
    }
}

/// Mutable configuration governing multiple-precision operations.
///
/// Precision and rounding for the imaginary component of complex values fall
/// back to the real component's settings unless overridden, which in turn
/// means a single pair of setters configures both domains in the common case.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Context {
    real_prec: u32,
    real_round: RoundMode,
    imag_prec: Option<u32>,
    imag_round: Option<RoundMode>,
    emax: i64,
    emin: i64,
    subnormalize: bool,
    allow_complex: bool,
    flags: ExceptionFlags,
    traps: ExceptionFlags,
}

impl Default for Context {
    fn default() -> Self {
        Self::new()
    }
}

impl Context {
    /// Creates the default context: precision 53 bits, round to nearest, wide
    /// exponent bounds, no subnormalization, all flags clear, no traps armed.
    #[must_use]
    pub fn new() -> Self {
        Self {
            real_prec: PREC_DEFAULT,
            real_round: RoundMode::Nearest,
            imag_prec: None,
            imag_round: None,
            emax: EMAX_DEFAULT,
            emin: EMIN_DEFAULT,
            subnormalize: false,
            allow_complex: false,
            flags: ExceptionFlags::default(),
            traps: ExceptionFlags::default(),
        }
    }

    /// Precision in bits for the real domain.
    #[must_use]
    pub fn real_prec(&self) -> u32 {
        self.real_prec
    }

    /// Precision in bits for the imaginary part of complex values.
    ///
    /// Falls back to [`Context::real_prec`] when not overridden.
    #[must_use]
    pub fn imag_prec(&self) -> u32 {
        self.imag_prec.unwrap_or(self.real_prec)
    }

    /// Rounding mode for the real domain.
    #[must_use]
    pub fn real_round(&self) -> RoundMode {
        self.real_round
    }

    /// Rounding mode for the imaginary part of complex values.
    ///
    /// Falls back to [`Context::real_round`] when not overridden.
    #[must_use]
    pub fn imag_round(&self) -> RoundMode {
        self.imag_round.unwrap_or(self.real_round)
    }

    /// Maximum exponent: finite results must stay below `2^emax`.
    #[must_use]
    pub fn emax(&self) -> i64 {
        self.emax
    }

    /// Minimum exponent for normal results.
    #[must_use]
    pub fn emin(&self) -> i64 {
        self.emin
    }

    /// Whether results below `emin` are subnormalized instead of flushed.
    #[must_use]
    pub fn subnormalize(&self) -> bool {
        self.subnormalize
    }

    /// Whether real-domain operations may return a complex result
    /// (e.g. the square root of a negative number).
    #[must_use]
    pub fn allow_complex(&self) -> bool {
        self.allow_complex
    }

    /// Sets the real-domain precision in bits.
    ///
    /// Fails with a `RangeError` for zero or for precisions beyond
    /// [`PREC_MAX`].
    pub fn set_real_prec(&mut self, prec: u32) -> OpResult<()> {
        validate_prec(prec)?;
        self.real_prec = prec;
        Ok(())
    }

    /// Overrides the imaginary-part precision, or restores the fallback with
    /// `None`.
    pub fn set_imag_prec(&mut self, prec: Option<u32>) -> OpResult<()> {
        if let Some(p) = prec {
            validate_prec(p)?;
        }
        self.imag_prec = prec;
        Ok(())
    }

    /// Sets the real-domain rounding mode.
    pub fn set_real_round(&mut self, round: RoundMode) {
        self.real_round = round;
    }

    /// Overrides the imaginary-part rounding mode, or restores the fallback
    /// with `None`.
    pub fn set_imag_round(&mut self, round: Option<RoundMode>) {
        self.imag_round = round;
    }

    /// Sets the maximum exponent. Fails with a `RangeError` unless
    /// `0 < emax <= EXP_BOUND`.
    pub fn set_emax(&mut self, emax: i64) -> OpResult<()> {
        if emax <= 0 || emax > EXP_BOUND {
            return Err(Error::range_error(format!("invalid value for emax: {emax}")));
        }
        self.emax = emax;
        Ok(())
    }

    /// Sets the minimum exponent. Fails with a `RangeError` unless
    /// `-EXP_BOUND <= emin < 0`.
    pub fn set_emin(&mut self, emin: i64) -> OpResult<()> {
        if emin >= 0 || emin < -EXP_BOUND {
            return Err(Error::range_error(format!("invalid value for emin: {emin}")));
        }
        self.emin = emin;
        Ok(())
    }

    /// Enables or disables subnormalization.
    pub fn set_subnormalize(&mut self, on: bool) {
        self.subnormalize = on;
    }

    /// Enables or disables complex results from real-domain operations.
    pub fn set_allow_complex(&mut self, on: bool) {
        self.allow_complex = on;
    }

    /// Returns the currently observed exception flags.
    #[must_use]
    pub fn flags(&self) -> ExceptionFlags {
        self.flags
    }

    /// Clears all observed exception flags.
    ///
    /// Flags accumulate across operations and are never cleared implicitly.
    pub fn clear_flags(&mut self) {
        self.flags = ExceptionFlags::default();
    }

    /// Returns whether the trap for the given flag is armed.
    #[must_use]
    pub fn trap_enabled(&self, flag: Flag) -> bool {
        self.traps.get(flag)
    }

    /// Arms or disarms the trap for the given flag.
    pub fn set_trap(&mut self, flag: Flag, on: bool) {
        self.traps.set(flag, on);
    }

    /// Records `flag` as observed and escalates it into an error when the
    /// matching trap is armed.
    ///
    /// This is the single choke point through which every operation reports
    /// exception conditions; `op` names the reporting operation in the error
    /// message.
    pub(crate) fn signal(&mut self, flag: Flag, op: &'static str) -> OpResult<()> {
        self.flags.set(flag, true);
        if self.traps.get(flag) {
            return Err(Error::new_msg(flag.exc_kind(), format!("{} in {op}", flag.describe())));
        }
        Ok(())
    }

    /// Begins a scoped override of this context.
    ///
    /// The returned guard dereferences to the context; mutate it freely. When
    /// the guard drops — by normal scope exit or by unwinding — the context is
    /// restored to the exact state it had when `local` was called, flags
    /// included. Guards nest: each remembers its own snapshot.
    pub fn local(&mut self) -> LocalContext<'_> {
        let saved = self.clone();
        LocalContext {
            ctx: self,
            saved: Some(saved),
        }
    }

    /// Runs `body` under a scoped override and restores the previous state on
    /// every exit path, including an error return from `body`.
    pub fn with_temporary<T>(&mut self, body: impl FnOnce(&mut Self) -> OpResult<T>) -> OpResult<T> {
        let mut guard = self.local();
        body(&mut guard)
    }
}

/// Guard installing a temporary context configuration; see [`Context::local`].
#[derive(Debug)]
pub struct LocalContext<'a> {
    ctx: &'a mut Context,
    saved: Option<Context>,
}

impl Drop for LocalContext<'_> {
    fn drop(&mut self) {
        if let Some(saved) = self.saved.take() {
            *self.ctx = saved;
        }
    }
}

impl std::ops::Deref for LocalContext<'_> {
    type Target = Context;

    fn deref(&self) -> &Context {
        self.ctx
    }
}

impl std::ops::DerefMut for LocalContext<'_> {
    fn deref_mut(&mut self) -> &mut Context {
        self.ctx
    }
}

/// Validates a precision request shared by the real and imaginary setters.
fn validate_prec(prec: u32) -> OpResult<()> {
    if prec == 0 || prec > PREC_MAX {
        return Err(Error::range_error(format!("invalid value for precision: {prec}")));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_context() {
        let ctx = Context::new();
        assert_eq!(ctx.real_prec(), 53);
        assert_eq!(ctx.imag_prec(), 53);
        assert_eq!(ctx.real_round(), RoundMode::Nearest);
        assert_eq!(ctx.imag_round(), RoundMode::Nearest);
        assert!(!ctx.flags().any());
    }

    #[test]
    fn test_imag_fallback_two_level() {
        let mut ctx = Context::new();
        ctx.set_real_prec(100).unwrap();
        assert_eq!(ctx.imag_prec(), 100);
        ctx.set_imag_prec(Some(40)).unwrap();
        assert_eq!(ctx.imag_prec(), 40);
        assert_eq!(ctx.real_prec(), 100);
        ctx.set_imag_prec(None).unwrap();
        assert_eq!(ctx.imag_prec(), 100);

        ctx.set_real_round(RoundMode::ToZero);
        assert_eq!(ctx.imag_round(), RoundMode::ToZero);
        ctx.set_imag_round(Some(RoundMode::Up));
        assert_eq!(ctx.imag_round(), RoundMode::Up);
    }

    #[test]
    fn test_precision_validation() {
        let mut ctx = Context::new();
        assert!(ctx.set_real_prec(0).is_err());
        assert!(ctx.set_real_prec(PREC_MAX + 1).is_err());
        assert!(ctx.set_real_prec(1).is_ok());
        assert!(ctx.set_imag_prec(Some(0)).is_err());
    }

    #[test]
    fn test_exponent_bound_validation() {
        let mut ctx = Context::new();
        assert!(ctx.set_emax(0).is_err());
        assert!(ctx.set_emin(0).is_err());
        assert!(ctx.set_emax(100).is_ok());
        assert!(ctx.set_emin(-100).is_ok());
    }

    #[test]
    fn test_signal_without_trap_sets_flag() {
        let mut ctx = Context::new();
        ctx.signal(Flag::Inexact, "test()").unwrap();
        assert!(ctx.flags().inexact);
        // Flags accumulate until cleared.
        ctx.signal(Flag::DivZero, "test()").unwrap();
        assert!(ctx.flags().inexact && ctx.flags().divzero);
        ctx.clear_flags();
        assert!(!ctx.flags().any());
    }

    #[test]
    fn test_signal_with_trap_raises() {
        let mut ctx = Context::new();
        ctx.set_trap(Flag::DivZero, true);
        let err = ctx.signal(Flag::DivZero, "div()").unwrap_err();
        assert_eq!(err.kind(), crate::ExcKind::DivisionByZeroError);
        assert_eq!(err.message(), "division by zero in div()");
        // The flag is recorded even when the trap raises.
        assert!(ctx.flags().divzero);
    }

    #[test]
    fn test_local_restores_on_exit() {
        let mut ctx = Context::new();
        {
            let mut local = ctx.local();
            local.set_real_prec(200).unwrap();
            local.set_real_round(RoundMode::Up);
            local.signal(Flag::Inexact, "test()").unwrap();
            assert_eq!(local.real_prec(), 200);
        }
        assert_eq!(ctx.real_prec(), 53);
        assert_eq!(ctx.real_round(), RoundMode::Nearest);
        assert!(!ctx.flags().inexact);
    }

    #[test]
    fn test_local_nesting() {
        let mut ctx = Context::new();
        {
            let mut outer = ctx.local();
            outer.set_real_prec(100).unwrap();
            {
                let mut inner = outer.local();
                inner.set_real_prec(200).unwrap();
                assert_eq!(inner.real_prec(), 200);
            }
            assert_eq!(outer.real_prec(), 100);
        }
        assert_eq!(ctx.real_prec(), 53);
    }

    #[test]
    fn test_with_temporary_restores_on_error() {
        let mut ctx = Context::new();
        let result: OpResult<()> = ctx.with_temporary(|local| {
            local.set_real_prec(300).unwrap();
            Err(Error::value_error("boom"))
        });
        assert!(result.is_err());
        assert_eq!(ctx.real_prec(), 53);
    }

    #[test]
    fn test_round_mode_letters() {
        assert_eq!(RoundMode::from_letter('N'), Some(RoundMode::Nearest));
        assert_eq!(RoundMode::from_letter('U'), Some(RoundMode::Up));
        assert_eq!(RoundMode::from_letter('D'), Some(RoundMode::Down));
        assert_eq!(RoundMode::from_letter('Z'), Some(RoundMode::ToZero));
        assert_eq!(RoundMode::from_letter('Y'), Some(RoundMode::AwayFromZero));
        assert_eq!(RoundMode::from_letter('Q'), None);
    }
}
