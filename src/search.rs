//! Inverting monotonic functions.
//!
//! Given a monotonic `f` and an expected value, these functions find the
//! argument `x` in a search interval with `f(x) = expected`. The answer is a
//! real number whose segments narrow around `x`, an exact rational when the
//! search hits it, or `None` when the value provably lies outside the range
//! of `f` over the interval.
//!
//! ## Splitting the interval
//!
//! The interval is cut into closed pieces that are searched in order:
//!
//! - a half-line grows outward from its finite edge in pieces of length
//!   1, 1, 2, 4, ...;
//! - the whole line is searched left of 0, then right of 0;
//! - an exclusive edge is approached by pieces that halve toward it;
//! - an interval open on both sides is split at its midpoint.
//!
//! Each piece tells whether the target lies before or after it. That hint
//! ends the search early when it points past an inclusive edge. When it
//! points past an exclusive edge the search keeps approaching that edge and
//! does not terminate, since the argument could lie arbitrarily close to it.
//!
//! Monotonic direction is detected on the first piece of a run whose edge
//! values differ, then only asserted on the following pieces.

use std::cmp::Ordering;
use std::sync::Arc;

use num_traits::{One, Zero};
use tracing::debug;

use crate::cache::{EvaluationCache, NoCache};
use crate::error::RealError;
use crate::interval::{Bound, Interval};
use crate::ops::compare::{RealComparator, StrictComparator};
use crate::rational::Rational;
use crate::real::Real;

mod bracket;
mod narrow;

use bracket::{Direction, Placement};
use narrow::{within, Probe, RationalFn, RationalProbe, RealFn, RealProbe};

/// What searching one part of the interval established.
enum SearchResult {
    Found(Real),
    MustBeSomewhere,
    MustBeBefore,
    MustBeAfter,
}

/// A hint that the target lies outside a piece.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Outside {
    Before,
    After,
}

impl From<Outside> for SearchResult {
    fn from(outside: Outside) -> Self {
        match outside {
            Outside::Before => Self::MustBeBefore,
            Outside::After => Self::MustBeAfter,
        }
    }
}

/// Finds `x` in `bounds` with `f(x) = expected` for a monotonic rational `f`.
///
/// Values are compared exactly, so the result is exact whenever bisection
/// hits the argument.
pub fn binary_search<F>(expected: &Rational, bounds: &Interval, f: F) -> Result<Option<Real>, RealError>
where
    F: Fn(&Rational) -> Rational + Send + Sync + 'static,
{
    for edge in [bounds.lower(), bounds.upper()] {
        if let Bound::Inclusive(value) = edge {
            if &f(value) == expected {
                return Ok(Some(Real::exact(value.clone())));
            }
        }
    }
    let f: Arc<RationalFn> = Arc::new(f);
    let probe = Arc::new(RationalProbe::new(f, expected.clone()));
    run(&NoCache, &probe, bounds)
}

/// Finds `x` in `bounds` with `f(x) = expected` for a monotonic real-valued `f`.
///
/// `comparator` decides how values of `f` are ordered. With an approximate
/// comparator a function that is flat within its tolerance may yield a number
/// that fails with `PrecisionUnattainable` once observed past its first segment.
pub fn search<C, F>(
    cache: &dyn EvaluationCache,
    comparator: C,
    expected: &Real,
    bounds: &Interval,
    f: F,
) -> Result<Option<Real>, RealError>
where
    C: RealComparator + 'static,
    F: Fn(&Rational) -> Result<Real, RealError> + Send + Sync + 'static,
{
    let f: Arc<RealFn> = Arc::new(f);
    search_shared(cache, comparator, expected, bounds, f)
}

/// [`search`] with the [`StrictComparator`]. `f` must be strictly monotonic;
/// equal values that are not known exactly are never told apart.
pub fn reverse_value<F>(
    cache: &dyn EvaluationCache,
    expected: &Real,
    bounds: &Interval,
    f: F,
) -> Result<Option<Real>, RealError>
where
    F: Fn(&Rational) -> Result<Real, RealError> + Send + Sync + 'static,
{
    search(cache, StrictComparator, expected, bounds, f)
}

/// The inverse of a strictly monotonic `f` over `bounds`.
pub fn reverse<F>(
    bounds: Interval,
    f: F,
) -> impl Fn(&dyn EvaluationCache, &Real) -> Result<Option<Real>, RealError>
where
    F: Fn(&Rational) -> Result<Real, RealError> + Send + Sync + 'static,
{
    let f: Arc<RealFn> = Arc::new(f);
    move |cache, expected| search_shared(cache, StrictComparator, expected, &bounds, Arc::clone(&f))
}

fn search_shared<C>(
    cache: &dyn EvaluationCache,
    comparator: C,
    expected: &Real,
    bounds: &Interval,
    f: Arc<RealFn>,
) -> Result<Option<Real>, RealError>
where
    C: RealComparator + 'static,
{
    let probe = Arc::new(RealProbe::new(f, expected.clone(), comparator));
    run(cache, &probe, bounds)
}

fn run<P: Probe>(
    cache: &dyn EvaluationCache,
    probe: &Arc<P>,
    bounds: &Interval,
) -> Result<Option<Real>, RealError> {
    let result = match (bounds.lower(), bounds.upper()) {
        (Bound::NegInfinity, Bound::PosInfinity) => whole_line(cache, probe)?,
        (Bound::NegInfinity, upper) => leftward(cache, probe, upper.clone())?,
        (lower, Bound::PosInfinity) => rightward(cache, probe, lower.clone())?,
        (lower, upper) => finite(cache, probe, lower.clone(), upper.clone())?,
    };
    match result {
        SearchResult::Found(found) => Ok(Some(found)),
        SearchResult::MustBeSomewhere | SearchResult::MustBeBefore | SearchResult::MustBeAfter => {
            debug!(%bounds, "search target is outside the function's range");
            Ok(None)
        }
    }
}

fn whole_line<P: Probe>(cache: &dyn EvaluationCache, probe: &Arc<P>) -> Result<SearchResult, RealError> {
    let zero = Bound::Inclusive(Rational::zero());
    match leftward(cache, probe, zero.clone())? {
        SearchResult::Found(found) => return Ok(SearchResult::Found(found)),
        SearchResult::MustBeBefore => return Ok(SearchResult::MustBeBefore),
        SearchResult::MustBeSomewhere | SearchResult::MustBeAfter => {}
    }
    match rightward(cache, probe, zero)? {
        SearchResult::MustBeBefore => Err(RealError::NonMonotonicFunction),
        other => Ok(other),
    }
}

/// `[lower, +inf)` or `(lower, +inf)`, in pieces of doubling length.
fn rightward<P: Probe>(
    cache: &dyn EvaluationCache,
    probe: &Arc<P>,
    lower: Bound,
) -> Result<SearchResult, RealError> {
    let origin = lower.value().cloned().ok_or(RealError::InvalidInterval)?;
    let mut near = lower;
    let mut distance = Rational::one();
    loop {
        let far = Bound::Inclusive(&origin + &distance);
        match finite(cache, probe, near, far.clone())? {
            SearchResult::Found(found) => return Ok(SearchResult::Found(found)),
            SearchResult::MustBeBefore => return Ok(SearchResult::MustBeBefore),
            SearchResult::MustBeSomewhere | SearchResult::MustBeAfter => {}
        }
        near = far;
        distance = &distance + &distance;
    }
}

/// `(-inf, upper]` or `(-inf, upper)`, in pieces of doubling length.
fn leftward<P: Probe>(
    cache: &dyn EvaluationCache,
    probe: &Arc<P>,
    upper: Bound,
) -> Result<SearchResult, RealError> {
    let origin = upper.value().cloned().ok_or(RealError::InvalidInterval)?;
    let mut near = upper;
    let mut distance = Rational::one();
    loop {
        let far = Bound::Inclusive(&origin - &distance);
        match finite(cache, probe, far.clone(), near)? {
            SearchResult::Found(found) => return Ok(SearchResult::Found(found)),
            SearchResult::MustBeAfter => return Ok(SearchResult::MustBeAfter),
            SearchResult::MustBeSomewhere | SearchResult::MustBeBefore => {}
        }
        near = far;
        distance = &distance + &distance;
    }
}

/// An interval with two finite edges.
fn finite<P: Probe>(
    cache: &dyn EvaluationCache,
    probe: &Arc<P>,
    lower: Bound,
    upper: Bound,
) -> Result<SearchResult, RealError> {
    match (lower, upper) {
        (Bound::Inclusive(a), Bound::Inclusive(b)) => {
            scan(cache, probe, std::iter::once((a, b)), None)
        }
        (Bound::Exclusive(a), Bound::Inclusive(b)) => {
            let width = &b - &a;
            let pieces = (0u32..).map(move |k| {
                let near = &a + &width * Rational::power_of_half(k + 1);
                let far = &a + &width * Rational::power_of_half(k);
                (near, far)
            });
            scan(cache, probe, pieces, Some(Outside::Before))
        }
        (Bound::Inclusive(a), Bound::Exclusive(b)) => {
            let width = &b - &a;
            let pieces = (0u32..).map(move |k| {
                let far = &b - &width * Rational::power_of_half(k);
                let near = &b - &width * Rational::power_of_half(k + 1);
                (far, near)
            });
            scan(cache, probe, pieces, Some(Outside::After))
        }
        (Bound::Exclusive(a), Bound::Exclusive(b)) => {
            let mid = a.midpoint(&b);
            match finite(cache, probe, Bound::Exclusive(a), Bound::Inclusive(mid.clone()))? {
                SearchResult::Found(found) => return Ok(SearchResult::Found(found)),
                SearchResult::MustBeBefore => return Ok(SearchResult::MustBeBefore),
                SearchResult::MustBeSomewhere | SearchResult::MustBeAfter => {}
            }
            match finite(cache, probe, Bound::Inclusive(mid), Bound::Exclusive(b))? {
                SearchResult::MustBeBefore => Err(RealError::NonMonotonicFunction),
                other => Ok(other),
            }
        }
        _ => Err(RealError::InvalidInterval),
    }
}

/// Searches a run of adjacent closed pieces.
///
/// A hint pointing to the `ignored` side is dropped and the run continues:
/// that side is an exclusive edge the pieces keep approaching.
fn scan<P: Probe>(
    cache: &dyn EvaluationCache,
    probe: &Arc<P>,
    pieces: impl Iterator<Item = (Rational, Rational)>,
    ignored: Option<Outside>,
) -> Result<SearchResult, RealError> {
    let mut direction = None;
    for (lower, upper) in pieces {
        let lower_value = probe.evaluate(&lower)?;
        let upper_value = probe.evaluate(&upper)?;
        if lower != upper {
            match direction {
                Some(known) => assert_direction(cache, probe.as_ref(), &lower_value, &upper_value, known)?,
                None => {
                    direction = detect_direction(cache, probe.as_ref(), &lower_value, &upper_value)?;
                    if let Some(detected) = direction {
                        let hint = outside_hint(cache, probe.as_ref(), &lower_value, &upper_value, detected)?;
                        if let Some(outside) = hint.filter(|&outside| Some(outside) != ignored) {
                            return Ok(outside.into());
                        }
                    }
                }
            }
        }
        if let Some(found) = within(cache, probe, lower, upper, lower_value, upper_value)? {
            return Ok(SearchResult::Found(found));
        }
    }
    Ok(SearchResult::MustBeSomewhere)
}

fn detect_direction<P: Probe>(
    cache: &dyn EvaluationCache,
    probe: &P,
    lower_value: &P::Value,
    upper_value: &P::Value,
) -> Result<Option<Direction>, RealError> {
    Ok(match probe.compare(cache, lower_value, upper_value)? {
        Ordering::Less => Some(Direction::Ascending),
        Ordering::Greater => Some(Direction::Descending),
        Ordering::Equal => None,
    })
}

fn assert_direction<P: Probe>(
    cache: &dyn EvaluationCache,
    probe: &P,
    lower_value: &P::Value,
    upper_value: &P::Value,
    direction: Direction,
) -> Result<(), RealError> {
    let order = probe.compare(cache, upper_value, lower_value)?;
    let violated = match direction {
        Direction::Ascending => order == Ordering::Less,
        Direction::Descending => order == Ordering::Greater,
    };
    if violated {
        return Err(RealError::NonMonotonicFunction);
    }
    Ok(())
}

/// Which side of the piece the argument lies on, once the comparator agrees.
fn outside_hint<P: Probe>(
    cache: &dyn EvaluationCache,
    probe: &P,
    lower_value: &P::Value,
    upper_value: &P::Value,
    direction: Direction,
) -> Result<Option<Outside>, RealError> {
    Ok(match direction {
        Direction::Ascending => match probe.outside(cache, lower_value, upper_value)? {
            Some(Placement::BeforeLower) => Some(Outside::Before),
            Some(Placement::AfterUpper) => Some(Outside::After),
            _ => None,
        },
        Direction::Descending => match probe.outside(cache, upper_value, lower_value)? {
            Some(Placement::BeforeLower) => Some(Outside::After),
            Some(Placement::AfterUpper) => Some(Outside::Before),
            _ => None,
        },
    })
}
