//! Narrowing a bracket around the argument of a monotonic function.
//!
//! A [`Probe`] bundles the function, the value being searched for and the
//! way its values are ordered. Exact rational functions are narrowed by
//! bisection. Real-valued functions are narrowed by thirds: a single midpoint
//! value may straddle the target under an approximate comparison, but the
//! target can always be placed against two distinct values.

use std::cmp::Ordering;
use std::fmt;
use std::sync::Arc;

use tracing::{debug, trace};

use crate::cache::EvaluationCache;
use crate::error::RealError;
use crate::interval::Segment;
use crate::ops::compare::RealComparator;
use crate::rational::Rational;
use crate::real::{CacheAccess, Progress, Real, RealRule, SegmentCursor};

use super::bracket::{place, place_rational, Bracket, Direction, Placement};

pub(crate) type RationalFn = dyn Fn(&Rational) -> Rational + Send + Sync;
pub(crate) type RealFn = dyn Fn(&Rational) -> Result<Real, RealError> + Send + Sync;

/// A monotonic function together with the value whose argument is wanted.
pub(crate) trait Probe: Send + Sync + 'static {
    type Value: Clone + fmt::Debug + Send + Sync + 'static;

    fn evaluate(&self, argument: &Rational) -> Result<Self::Value, RealError>;

    fn compare(
        &self,
        cache: &dyn EvaluationCache,
        a: &Self::Value,
        b: &Self::Value,
    ) -> Result<Ordering, RealError>;

    fn expected(&self) -> &Self::Value;

    /// Places the expected value against `low < high`.
    fn locate(
        &self,
        cache: &dyn EvaluationCache,
        low: &Self::Value,
        high: &Self::Value,
    ) -> Result<Placement, RealError>;

    /// Where the expected value lies outside `low < high`, if it does.
    ///
    /// Placement only proposes a side; the probe's own ordering has to
    /// confirm it, so an expected value the comparator deems equal to an edge
    /// value stays inside.
    fn outside(
        &self,
        cache: &dyn EvaluationCache,
        low: &Self::Value,
        high: &Self::Value,
    ) -> Result<Option<Placement>, RealError> {
        let placement = self.locate(cache, low, high)?;
        let (edge, beyond) = match placement {
            Placement::BeforeLower => (low, Ordering::Less),
            Placement::AfterUpper => (high, Ordering::Greater),
            _ => return Ok(None),
        };
        let confirmed = self.compare(cache, self.expected(), edge)? == beyond;
        Ok(confirmed.then_some(placement))
    }

    /// Whether `value` is known to equal the expected value without observing anything.
    fn exact_hit(&self, value: &Self::Value) -> bool;

    /// Whether two values are known to be equal without observing anything.
    fn identical(&self, a: &Self::Value, b: &Self::Value) -> bool;

    /// One narrowing step; the result lies inside `bracket`.
    fn narrow(
        &self,
        cache: &dyn EvaluationCache,
        bracket: Bracket<Self::Value>,
        direction: Direction,
    ) -> Result<Bracket<Self::Value>, RealError>;
}

/// Bisection over an exact rational function.
pub(crate) struct RationalProbe {
    f: Arc<RationalFn>,
    expected: Rational,
}

impl RationalProbe {
    pub(crate) fn new(f: Arc<RationalFn>, expected: Rational) -> Self {
        Self { f, expected }
    }
}

impl Probe for RationalProbe {
    type Value = Rational;

    fn evaluate(&self, argument: &Rational) -> Result<Rational, RealError> {
        Ok((self.f)(argument))
    }

    fn compare(
        &self,
        _cache: &dyn EvaluationCache,
        a: &Rational,
        b: &Rational,
    ) -> Result<Ordering, RealError> {
        Ok(a.cmp(b))
    }

    fn expected(&self) -> &Rational {
        &self.expected
    }

    fn locate(
        &self,
        _cache: &dyn EvaluationCache,
        low: &Rational,
        high: &Rational,
    ) -> Result<Placement, RealError> {
        Ok(place_rational(&self.expected, low, high))
    }

    fn exact_hit(&self, value: &Rational) -> bool {
        value == &self.expected
    }

    fn identical(&self, a: &Rational, b: &Rational) -> bool {
        a == b
    }

    fn narrow(
        &self,
        _cache: &dyn EvaluationCache,
        bracket: Bracket<Rational>,
        direction: Direction,
    ) -> Result<Bracket<Rational>, RealError> {
        let mid = bracket.lower.midpoint(&bracket.upper);
        let value = (self.f)(&mid);
        let goes_up = match (value.cmp(&self.expected), direction) {
            (Ordering::Equal, _) => return Ok(Bracket::found(mid, value)),
            (Ordering::Less, Direction::Ascending) | (Ordering::Greater, Direction::Descending) => true,
            _ => false,
        };
        Ok(if goes_up {
            bracket.with_lower(mid, value)
        } else {
            bracket.with_upper(mid, value)
        })
    }
}

/// Search by thirds over a real-valued function, ordered by `comparator`.
pub(crate) struct RealProbe<C> {
    f: Arc<RealFn>,
    expected: Real,
    comparator: C,
}

impl<C: RealComparator> RealProbe<C> {
    pub(crate) fn new(f: Arc<RealFn>, expected: Real, comparator: C) -> Self {
        Self {
            f,
            expected,
            comparator,
        }
    }

    fn check_chain(
        &self,
        cache: &dyn EvaluationCache,
        values: [&Real; 4],
        direction: Direction,
    ) -> Result<(), RealError> {
        let forbidden = match direction {
            Direction::Ascending => Ordering::Greater,
            Direction::Descending => Ordering::Less,
        };
        for pair in values.windows(2) {
            if self.comparator.compare(cache, pair[0], pair[1])? == forbidden {
                return Err(RealError::NonMonotonicFunction);
            }
        }
        Ok(())
    }
}

impl<C: RealComparator + 'static> Probe for RealProbe<C> {
    type Value = Real;

    fn evaluate(&self, argument: &Rational) -> Result<Real, RealError> {
        (self.f)(argument)
    }

    fn compare(&self, cache: &dyn EvaluationCache, a: &Real, b: &Real) -> Result<Ordering, RealError> {
        self.comparator.compare(cache, a, b)
    }

    fn expected(&self) -> &Real {
        &self.expected
    }

    fn locate(
        &self,
        cache: &dyn EvaluationCache,
        low: &Real,
        high: &Real,
    ) -> Result<Placement, RealError> {
        place(cache, &self.expected, low, high)
    }

    fn exact_hit(&self, value: &Real) -> bool {
        self.identical(value, &self.expected)
    }

    fn identical(&self, a: &Real, b: &Real) -> bool {
        matches!((a.as_exact(), b.as_exact()), (Some(x), Some(y)) if x == y)
    }

    fn narrow(
        &self,
        cache: &dyn EvaluationCache,
        bracket: Bracket<Real>,
        direction: Direction,
    ) -> Result<Bracket<Real>, RealError> {
        let three = Rational::from(3u32);
        let low = &bracket.lower;
        let high = &bracket.upper;
        let first_third = (low + low + high).checked_div(&three)?;
        let second_third = (low + high + high).checked_div(&three)?;
        let first_value = (self.f)(&first_third)?;
        let second_value = (self.f)(&second_third)?;
        self.check_chain(
            cache,
            [&bracket.lower_value, &first_value, &second_value, &bracket.upper_value],
            direction,
        )?;

        Ok(match direction {
            Direction::Ascending => match self.locate(cache, &first_value, &second_value)? {
                Placement::BeforeLower => bracket.with_upper(first_third, first_value),
                Placement::AfterLower => bracket.with_lower(first_third, first_value),
                Placement::BeforeUpper => bracket.with_upper(second_third, second_value),
                Placement::AfterUpper => bracket.with_lower(second_third, second_value),
                Placement::Between => Bracket {
                    lower: first_third,
                    lower_value: first_value,
                    upper: second_third,
                    upper_value: second_value,
                },
            },
            Direction::Descending => match self.locate(cache, &second_value, &first_value)? {
                Placement::BeforeLower => bracket.with_lower(second_third, second_value),
                Placement::AfterLower => bracket.with_upper(second_third, second_value),
                Placement::BeforeUpper => bracket.with_lower(first_third, first_value),
                Placement::AfterUpper => bracket.with_upper(first_third, first_value),
                Placement::Between => Bracket {
                    lower: first_third,
                    lower_value: first_value,
                    upper: second_third,
                    upper_value: second_value,
                },
            },
        })
    }
}

/// Searches one closed piece `[lower, upper]` whose values are already known.
///
/// Returns `None` when the expected value provably lies outside the values at
/// the edges. Otherwise the result is an exact edge or a lazily narrowing
/// real number.
pub(crate) fn within<P: Probe>(
    cache: &dyn EvaluationCache,
    probe: &Arc<P>,
    lower: Rational,
    upper: Rational,
    lower_value: P::Value,
    upper_value: P::Value,
) -> Result<Option<Real>, RealError> {
    if probe.exact_hit(&lower_value) {
        return Ok(Some(Real::exact(lower)));
    }
    if probe.exact_hit(&upper_value) {
        return Ok(Some(Real::exact(upper)));
    }
    let bracket = Bracket {
        lower,
        lower_value,
        upper,
        upper_value,
    };
    if bracket.is_point() {
        return on_equal_values(cache, probe.as_ref(), bracket);
    }

    let direction = match probe.compare(cache, &bracket.lower_value, &bracket.upper_value)? {
        Ordering::Less => Direction::Ascending,
        Ordering::Greater => Direction::Descending,
        Ordering::Equal => return on_equal_values(cache, probe.as_ref(), bracket),
    };
    let outside = match direction {
        Direction::Ascending => probe.outside(cache, &bracket.lower_value, &bracket.upper_value)?,
        Direction::Descending => probe.outside(cache, &bracket.upper_value, &bracket.lower_value)?,
    };
    if outside.is_some_and(Placement::is_outside) {
        return Ok(None);
    }

    debug!(segment = %bracket.segment(), %direction, "search bracketed its target");
    Ok(Some(Real::from_rule(SearchRule {
        probe: Arc::clone(probe),
        bracket,
        direction,
    })))
}

/// The function takes the same value on both edges.
fn on_equal_values<P: Probe>(
    cache: &dyn EvaluationCache,
    probe: &P,
    bracket: Bracket<P::Value>,
) -> Result<Option<Real>, RealError> {
    if probe.compare(cache, &bracket.lower_value, probe.expected())? != Ordering::Equal {
        return Ok(None);
    }
    if bracket.is_point() || probe.identical(&bracket.lower_value, &bracket.upper_value) {
        return Ok(Some(Real::exact(bracket.lower)));
    }
    debug!(segment = %bracket.segment(), "comparator cannot separate a plateau");
    Ok(Some(Real::from_rule(PlateauRule {
        segment: bracket.segment(),
    })))
}

struct SearchRule<P: Probe> {
    probe: Arc<P>,
    bracket: Bracket<P::Value>,
    direction: Direction,
}

impl<P: Probe> RealRule for SearchRule<P> {
    fn observe(&self, _access: CacheAccess) -> Box<dyn SegmentCursor> {
        Box::new(SearchCursor {
            probe: Arc::clone(&self.probe),
            bracket: Some(self.bracket.clone()),
            direction: self.direction,
            started: false,
            progress: Progress::new(),
        })
    }
}

struct SearchCursor<P: Probe> {
    probe: Arc<P>,
    bracket: Option<Bracket<P::Value>>,
    direction: Direction,
    started: bool,
    progress: Progress,
}

impl<P: Probe> SearchCursor<P> {
    fn step(&mut self, cache: &dyn EvaluationCache) -> Result<Segment, RealError> {
        let bracket = self.bracket.take().ok_or(RealError::PrecisionUnattainable)?;
        let bracket = if self.started {
            let narrowed = self.probe.narrow(cache, bracket, self.direction)?;
            trace!(segment = %narrowed.segment(), "narrowed search bracket");
            narrowed
        } else {
            self.started = true;
            bracket
        };
        let segment = self.progress.advance(bracket.segment())?;
        self.bracket = Some(bracket);
        Ok(segment)
    }
}

impl<P: Probe> SegmentCursor for SearchCursor<P> {
    fn next_segment(&mut self, cache: &dyn EvaluationCache) -> Option<Result<Segment, RealError>> {
        if self.progress.is_finished() {
            return None;
        }
        let step = self.step(cache);
        self.progress.settle(step)
    }
}

/// A flat stretch the comparator could not resolve: one segment, then an error.
struct PlateauRule {
    segment: Segment,
}

impl RealRule for PlateauRule {
    fn observe(&self, _access: CacheAccess) -> Box<dyn SegmentCursor> {
        Box::new(PlateauCursor {
            segment: Some(self.segment.clone()),
            failed: false,
        })
    }
}

struct PlateauCursor {
    segment: Option<Segment>,
    failed: bool,
}

impl SegmentCursor for PlateauCursor {
    fn next_segment(&mut self, _cache: &dyn EvaluationCache) -> Option<Result<Segment, RealError>> {
        if let Some(segment) = self.segment.take() {
            return Some(Ok(segment));
        }
        if self.failed {
            return None;
        }
        self.failed = true;
        Some(Err(RealError::PrecisionUnattainable))
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::expect_used, clippy::panic)]

    use super::*;
    use crate::cache::{NoCache, SharedCache};
    use crate::ops::compare::{ApproximateComparator, StrictComparator};
    use crate::test_utils::{assert_close, assert_nested, first_segments, int, rat};

    fn square_probe(expected: Rational) -> Arc<RationalProbe> {
        Arc::new(RationalProbe::new(Arc::new(|x: &Rational| x * x), expected))
    }

    #[test]
    fn bisection_follows_the_direction() {
        let probe = square_probe(int(2));
        let bracket = Bracket {
            lower: int(0),
            lower_value: int(0),
            upper: int(2),
            upper_value: int(4),
        };
        let narrowed = probe
            .narrow(&NoCache, bracket, Direction::Ascending)
            .expect("narrow");
        assert_eq!(narrowed.segment(), Segment::new(int(1), int(2)));

        let falling = RationalProbe::new(Arc::new(|x: &Rational| -x), int(-3));
        let bracket = Bracket {
            lower: int(0),
            lower_value: int(0),
            upper: int(4),
            upper_value: int(-4),
        };
        let narrowed = falling
            .narrow(&NoCache, bracket, Direction::Descending)
            .expect("narrow");
        assert_eq!(narrowed.segment(), Segment::new(int(2), int(4)));
    }

    #[test]
    fn bisection_stops_on_an_exact_midpoint() {
        let probe = square_probe(int(4));
        let found = within(&NoCache, &probe, int(0), int(4), int(0), int(16))
            .expect("search")
            .expect("in range");
        let segments: Vec<_> = NoCache
            .observe(&found)
            .collect::<Result<_, _>>()
            .expect("segments");
        assert_eq!(segments.last(), Some(&Segment::point(int(2))));
        assert_nested(&segments);
    }

    #[test]
    fn out_of_range_values_are_not_found() {
        let probe = square_probe(int(20));
        let result = within(&NoCache, &probe, int(0), int(4), int(0), int(16)).expect("search");
        assert!(result.is_none());
    }

    #[test]
    fn exact_edge_hits_are_returned_directly() {
        let probe = square_probe(int(16));
        let result = within(&NoCache, &probe, int(0), int(4), int(0), int(16))
            .expect("search")
            .expect("found");
        assert_eq!(result.as_exact(), Some(&int(4)));
    }

    #[test]
    fn thirds_narrow_a_real_function() {
        let cache = SharedCache::new();
        let cube = Arc::new(|x: &Rational| Ok(Real::exact(x * x * x))) as Arc<RealFn>;
        let probe = Arc::new(RealProbe::new(cube, Real::from(int(5)), StrictComparator));
        let root = within(&cache, &probe, int(1), int(2), Real::from(int(1)), Real::from(int(8)))
            .expect("search")
            .expect("in range");
        assert_nested(&first_segments(&cache, &root, 30));
        // 5^(1/3) = 1.70997...
        assert_close(&cache, &root, &rat(170_997, 100_000), 14);
    }

    #[test]
    fn thirds_reject_a_non_monotonic_function() {
        let cache = SharedCache::new();
        let bump = Arc::new(|x: &Rational| {
            let centered = x - int(1);
            Ok(Real::exact(-(&centered * &centered)))
        }) as Arc<RealFn>;
        let probe = RealProbe::new(bump, Real::from(rat(-1, 2)), StrictComparator);
        let bracket = Bracket {
            lower: int(0),
            lower_value: Real::from(int(-1)),
            upper: int(3),
            upper_value: Real::from(int(-4)),
        };
        assert_eq!(
            probe.narrow(&cache, bracket, Direction::Descending).err(),
            Some(RealError::NonMonotonicFunction)
        );
    }

    #[test]
    fn unresolvable_plateau_yields_one_segment_then_fails() {
        let cache = SharedCache::new();
        // Values on [2, 3] differ from the target by less than the tolerance.
        let shifted = Arc::new(|x: &Rational| Ok(Real::exact(int(1) + x * rat(1, 1_000_000))))
            as Arc<RealFn>;
        let probe = Arc::new(RealProbe::new(
            shifted,
            Real::from(rat(1_000_001, 1_000_000)),
            ApproximateComparator::with_decimal_digits(2),
        ));
        let lower_value = probe.evaluate(&int(2)).expect("value");
        let upper_value = probe.evaluate(&int(3)).expect("value");
        let plateau = within(&cache, &probe, int(2), int(3), lower_value, upper_value)
            .expect("search")
            .expect("plateau");
        let mut observation = cache.observe(&plateau);
        assert_eq!(observation.next(), Some(Ok(Segment::new(int(2), int(3)))));
        assert_eq!(observation.next(), Some(Err(RealError::PrecisionUnattainable)));
        assert!(observation.next().is_none());
    }
}
