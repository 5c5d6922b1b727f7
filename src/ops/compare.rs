//! Comparison of real numbers.
//!
//! Two equal irrational numbers can never be told apart by looking at their
//! segments, so there is no total order on `Real`. Callers choose a
//! [`RealComparator`] instead: either an approximate one that treats numbers
//! closer than some delta as equal, or a strict one that may search forever.

use std::cmp::Ordering;

use num_bigint::BigInt;
use num_traits::{One, Zero};

use crate::cache::EvaluationCache;
use crate::error::RealError;
use crate::rational::Rational;
use crate::real::Real;

/// Decides the order of two real numbers, observing them through `cache`.
pub trait RealComparator: Send + Sync {
    fn compare(&self, cache: &dyn EvaluationCache, a: &Real, b: &Real) -> Result<Ordering, RealError>;
}

/// Compares `a - b` against a tolerance: values closer than `delta` are equal.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ApproximateComparator {
    delta: Rational,
}

impl ApproximateComparator {
    pub fn new(delta: Rational) -> Result<Self, RealError> {
        if !delta.is_positive() {
            return Err(RealError::NonpositiveDelta);
        }
        Ok(Self { delta })
    }

    /// Tolerance of one unit in the `digits`-th decimal place.
    pub fn with_decimal_digits(digits: u32) -> Self {
        Self {
            delta: Rational::from_parts(BigInt::one(), BigInt::from(10u32).pow(digits)),
        }
    }

    pub fn delta(&self) -> &Rational {
        &self.delta
    }
}

impl Default for ApproximateComparator {
    fn default() -> Self {
        Self {
            delta: Rational::power_of_half(64),
        }
    }
}

impl RealComparator for ApproximateComparator {
    fn compare(&self, cache: &dyn EvaluationCache, a: &Real, b: &Real) -> Result<Ordering, RealError> {
        if let (Some(x), Some(y)) = (a.as_exact(), b.as_exact()) {
            let difference = x - y;
            return Ok(approximate_order(&difference, &difference, &self.delta));
        }
        let segment = cache.observe_to(&(a - b), &self.delta)?;
        Ok(approximate_order(segment.lower(), segment.upper(), &self.delta))
    }
}

fn approximate_order(lower: &Rational, upper: &Rational, delta: &Rational) -> Ordering {
    if lower <= &-delta {
        Ordering::Less
    } else if upper >= delta {
        Ordering::Greater
    } else {
        Ordering::Equal
    }
}

/// Refines `a - b` until its sign is certain.
///
/// Exact operands are compared exactly. Otherwise the comparison only answers
/// `Equal` once the difference collapses to the point zero, so it does not
/// terminate for two equal numbers whose sequences never reach a point.
#[derive(Clone, Copy, Debug, Default)]
pub struct StrictComparator;

impl RealComparator for StrictComparator {
    fn compare(&self, cache: &dyn EvaluationCache, a: &Real, b: &Real) -> Result<Ordering, RealError> {
        if let (Some(x), Some(y)) = (a.as_exact(), b.as_exact()) {
            return Ok(x.cmp(y));
        }
        let difference = a - b;
        let mut delta = Rational::one();
        loop {
            let segment = cache.observe_to(&difference, &delta)?;
            if segment.upper().is_negative() {
                return Ok(Ordering::Less);
            }
            if segment.lower().is_positive() {
                return Ok(Ordering::Greater);
            }
            if segment.is_point() {
                return Ok(Ordering::Equal);
            }
            delta = delta.half();
        }
    }
}

impl Real {
    /// The sign of this number under `comparator`, as its order against zero.
    pub fn sign(
        &self,
        cache: &dyn EvaluationCache,
        comparator: &dyn RealComparator,
    ) -> Result<Ordering, RealError> {
        match self.as_exact() {
            Some(value) => Ok(value.cmp(&Rational::zero())),
            None => comparator.compare(cache, self, &Real::zero()),
        }
    }

    /// `|self|`, choosing the branch by [`sign`](Self::sign).
    pub fn absolute(
        &self,
        cache: &dyn EvaluationCache,
        comparator: &dyn RealComparator,
    ) -> Result<Real, RealError> {
        Ok(match self.sign(cache, comparator)? {
            Ordering::Less => -self,
            Ordering::Equal | Ordering::Greater => self.clone(),
        })
    }
}
