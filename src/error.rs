//! Error types for exact real arithmetic.
//!
//! Errors are plain values: they are returned, never retried, and a shared
//! cache hands the same error to every observer of a failing number, which is
//! why [`RealError`] is `Clone`.
//!
//! "Not found" is not an error. Searches report it as `Ok(None)`, and a search
//! or limit that never converges simply keeps producing segments.

use std::fmt;

/// Errors that can occur while constructing or observing real numbers.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RealError {
    /// A requested precision (or comparator tolerance) was not positive.
    NonpositiveDelta,
    /// Radix outside the supported range.
    InvalidRadix { radix: u32 },
    /// A fraction was constructed with a zero denominator.
    ZeroDenominator,
    /// Roots are only defined for a positive index.
    InvalidRootIndex,
    /// Exponent does not fit the machine exponent of a big-integer power.
    ExponentOverflow,
    /// Input is outside the domain of the operation (e.g. even root of a negative).
    DomainError,
    /// Interval edges are out of order or incompatible with their kind.
    InvalidInterval,
    /// Division by the exact rational zero.
    DivisionByZero,
    /// A search probe contradicted the monotonicity of the searched function.
    NonMonotonicFunction,
    /// The requested precision cannot be reached by the number's sequence.
    PrecisionUnattainable,
    /// A caller-imposed observation cap was reached.
    IterationLimit { max: usize },
}

impl fmt::Display for RealError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NonpositiveDelta => write!(f, "precision delta must be positive"),
            Self::InvalidRadix { radix } => write!(f, "unsupported radix {radix}"),
            Self::ZeroDenominator => write!(f, "denominator must be non-zero"),
            Self::InvalidRootIndex => write!(f, "root index must be positive"),
            Self::ExponentOverflow => write!(f, "exponent is too large"),
            Self::DomainError => write!(f, "input is outside the domain of the operation"),
            Self::InvalidInterval => write!(f, "interval bounds are not ordered"),
            Self::DivisionByZero => write!(f, "division by zero"),
            Self::NonMonotonicFunction => write!(f, "searched function is not monotonic"),
            Self::PrecisionUnattainable => {
                write!(f, "requested precision cannot be reached")
            }
            Self::IterationLimit { max } => {
                write!(f, "observation limit ({max}) reached")
            }
        }
    }
}

impl std::error::Error for RealError {}
