//! Error taxonomy shared by every operation in the crate.
//!
//! Two families of errors exist. Argument errors (`TypeError`, `ValueError`,
//! `RangeError`) are raised immediately at the point of detection and leave no
//! partial result behind. Trap errors (`OverflowError` through
//! `RangeOperationError`) are raised by the flag engine only when the matching
//! trap is armed on the governing [`Context`](crate::Context); with the trap
//! unarmed the same condition merely sets a sticky flag.

use std::{borrow::Cow, fmt};

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString, IntoStaticStr};

/// Result type alias for operations that can fail.
pub type OpResult<T> = Result<T, Error>;

/// Error kinds raised by the crate.
///
/// Uses strum derives for automatic `Display`, `FromStr`, and
/// `Into<&'static str>` implementations. The string representation matches
/// the variant name exactly (e.g., `ValueError` -> "ValueError").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, IntoStaticStr, Serialize, Deserialize)]
pub enum ExcKind {
    /// Operand not convertible to the required domain, or wrong arity.
    TypeError,
    /// Malformed format specification, out-of-range base, malformed numeric
    /// string.
    ValueError,
    /// Precision or exponent bound outside the supported range.
    RangeError,

    // --- one per trap, raised only when the corresponding trap is armed ---
    /// Result exponent exceeded the context's `emax`.
    OverflowError,
    /// Nonzero result fell below the context's `emin`.
    UnderflowError,
    /// Result was rounded.
    InexactError,
    /// NaN produced from non-NaN inputs.
    InvalidOperationError,
    /// Division by a zero-valued divisor.
    DivisionByZeroError,
    /// Domain error outside the representable range.
    RangeOperationError,

    /// A primitive reported an outcome the engine cannot interpret.
    /// Signals a programming defect, never expected in normal operation.
    InternalError,
}

/// An error carrying its kind and a human-readable message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Error {
    kind: ExcKind,
    message: Cow<'static, str>,
}

impl Error {
    /// Creates a new error of the given kind with a message.
    pub fn new_msg(kind: ExcKind, message: impl Into<Cow<'static, str>>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// Shorthand for a `TypeError`.
    pub fn type_error(message: impl Into<Cow<'static, str>>) -> Self {
        Self::new_msg(ExcKind::TypeError, message)
    }

    /// Shorthand for a `ValueError`.
    pub fn value_error(message: impl Into<Cow<'static, str>>) -> Self {
        Self::new_msg(ExcKind::ValueError, message)
    }

    /// Shorthand for a `RangeError`.
    pub fn range_error(message: impl Into<Cow<'static, str>>) -> Self {
        Self::new_msg(ExcKind::RangeError, message)
    }

    /// Returns the error kind.
    #[must_use]
    pub fn kind(&self) -> ExcKind {
        self.kind
    }

    /// Returns the error message.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)
    }
}

impl std::error::Error for Error {}
