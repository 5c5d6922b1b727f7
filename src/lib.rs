#![warn(
    clippy::shadow_reuse,
    clippy::shadow_same,
    clippy::shadow_unrelated,
    clippy::dbg_macro,
    clippy::expect_used,
    clippy::panic,
    clippy::print_stderr,
    clippy::print_stdout,
    clippy::todo,
    clippy::unimplemented,
    clippy::unwrap_used
)]

//! Exact real numbers as lazily refined rational segments.
//!
//! A [`Real`] yields ever tighter [`Segment`]s containing its value. Segments
//! are only produced when an [`EvaluationCache`] observes the number, and a
//! [`SharedCache`] makes sure each segment is computed once no matter how many
//! threads observe it.
//!
//! ```ignore
//! let cache = SharedCache::new();
//! let root = Rational::from(2).root(2)?;
//! assert_eq!(root.floor_to(&cache, 10, 3)?, Rational::new(1414, 1000)?);
//! ```

pub mod cache;
pub mod error;
pub mod interval;
pub mod ops;
pub mod rational;
pub mod real;
pub mod search;

#[cfg(test)]
mod test_utils;

pub use cache::{EvaluationCache, NoCache, Observation, SharedCache, DEFAULT_MAX_OBSERVATIONS};
pub use error::RealError;
pub use interval::{Bound, Interval, Segment};
pub use ops::{
    e, exp_rational, factorial, limit, limit_monotonic, pi, product, product_reals, sequence_limit,
    sum, sum_reals, ApproximateComparator, RealComparator, StrictComparator,
};
pub use rational::{DigitSequence, FractionDigits, ParseRationalError, Rational, RationalFormat};
pub use real::{CacheAccess, Real, RealRule, SegmentCursor};
pub use search::{binary_search, reverse, reverse_value, search};

/// Radix used by the textual forms of [`Rational`].
pub const DEFAULT_RADIX: u32 = 10;
