//! Rounding real numbers to a fixed number of fractional digits.
//!
//! A real number is rounded by rounding both edges of its segments until the
//! two agree. If the value sits exactly on a rounding boundary and its
//! segments never collapse onto it, the edges never agree and these functions
//! do not return.

use crate::cache::EvaluationCache;
use crate::error::RealError;
use crate::interval::Segment;
use crate::rational::Rational;
use crate::real::Real;

impl Real {
    /// Applies `proceed` to the first `digits` fractional digits of both edges
    /// of successive segments, returning the first result the edges agree on.
    ///
    /// `PrecisionUnattainable` if the segments run out first.
    pub fn proceed_with_first_digits<R, F>(
        &self,
        cache: &dyn EvaluationCache,
        radix: u32,
        digits: usize,
        proceed: F,
    ) -> Result<R, RealError>
    where
        R: PartialEq,
        F: Fn(Segment, u32) -> R,
    {
        self.settle(cache, |edge| edge.proceed_with_first_digits(radix, digits, &proceed))
    }

    /// See [`Rational::round_to`] for the rounding rule.
    pub fn round_to(
        &self,
        cache: &dyn EvaluationCache,
        radix: u32,
        digits: usize,
    ) -> Result<Rational, RealError> {
        self.settle(cache, |edge| edge.round_to(radix, digits))
    }

    pub fn floor_to(
        &self,
        cache: &dyn EvaluationCache,
        radix: u32,
        digits: usize,
    ) -> Result<Rational, RealError> {
        self.settle(cache, |edge| edge.floor_to(radix, digits))
    }

    pub fn ceiling_to(
        &self,
        cache: &dyn EvaluationCache,
        radix: u32,
        digits: usize,
    ) -> Result<Rational, RealError> {
        self.settle(cache, |edge| edge.ceiling_to(radix, digits))
    }

    fn settle<R, F>(&self, cache: &dyn EvaluationCache, at_edge: F) -> Result<R, RealError>
    where
        R: PartialEq,
        F: Fn(&Rational) -> Result<R, RealError>,
    {
        if let Some(value) = self.as_exact() {
            return at_edge(value);
        }
        for segment in cache.observe(self) {
            let segment = segment?;
            let lower = at_edge(segment.lower())?;
            if lower == at_edge(segment.upper())? {
                return Ok(lower);
            }
        }
        Err(RealError::PrecisionUnattainable)
    }
}
