//! The lazy real number type.
//!
//! A `Real` is either an exact rational or a rule that, once opened by an
//! evaluation cache, produces a sequence of nested rational segments that all
//! contain the value. Rules never run on their own: a segment is computed only
//! when some consumer pulls it through a cache.
//!
//! Opening a rule requires a [`CacheAccess`] token. The token has a private
//! field, so code outside this crate cannot create one and has to go through
//! an [`EvaluationCache`](crate::cache::EvaluationCache) to observe a number.

use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use num_bigint::BigInt;
use num_traits::One;

use crate::cache::EvaluationCache;
use crate::error::RealError;
use crate::interval::Segment;
use crate::rational::Rational;

static REAL_IDS: AtomicUsize = AtomicUsize::new(0);

/// Capability to open a rule's raw segment sequence. Only caches create it.
pub struct CacheAccess {
    _private: (),
}

impl CacheAccess {
    pub(crate) fn grant() -> Self {
        Self { _private: () }
    }
}

/// Pull-based producer of one real number's segments.
///
/// Each call yields the next segment, `None` once the sequence has ended, or an
/// error. Operands are observed through `cache` so that shared work is reused.
pub trait SegmentCursor: Send {
    fn next_segment(&mut self, cache: &dyn EvaluationCache) -> Option<Result<Segment, RealError>>;
}

/// Recipe for a lazily computed real number.
pub trait RealRule: Send + Sync {
    /// Starts a fresh traversal of the segment sequence.
    fn observe(&self, access: CacheAccess) -> Box<dyn SegmentCursor>;
}

/// An exact or lazily refined real number. Cloning shares the identity, so
/// clones hit the same cache entry.
#[derive(Clone)]
pub struct Real {
    repr: Repr,
}

#[derive(Clone)]
enum Repr {
    Exact(Rational),
    Lazy(Arc<LazyReal>),
}

struct LazyReal {
    id: usize,
    rule: Box<dyn RealRule>,
}

impl Real {
    pub fn exact(value: Rational) -> Self {
        Self {
            repr: Repr::Exact(value),
        }
    }

    /// Wraps a custom rule as a real number with a fresh identity.
    pub fn from_rule(rule: impl RealRule + 'static) -> Self {
        let id = REAL_IDS.fetch_add(1, Ordering::Relaxed);
        Self {
            repr: Repr::Lazy(Arc::new(LazyReal {
                id,
                rule: Box::new(rule),
            })),
        }
    }

    /// Creates a real number from user-defined state and refinement logic.
    ///
    /// # Arguments
    /// * `state` - Initial state
    /// * `segment` - Computes a segment enclosing the value from a state
    /// * `refine` - Produces the next, more precise state
    ///
    /// The sequence ends once a segment collapses to a point. Each segment is
    /// intersected with the previous one, so a `segment` function that loosens
    /// its bounds cannot break nesting; disjoint segments are an
    /// `InvalidInterval` error.
    pub fn new<X, S, F>(state: X, segment: S, refine: F) -> Self
    where
        X: Clone + Send + Sync + 'static,
        S: Fn(&X) -> Result<Segment, RealError> + Send + Sync + 'static,
        F: Fn(X) -> X + Send + Sync + 'static,
    {
        Self::from_rule(StateRule {
            state,
            step: Arc::new(StateStep { segment, refine }),
        })
    }

    pub fn zero() -> Self {
        Self::exact(Rational::from(0u32))
    }

    pub fn one() -> Self {
        Self::exact(Rational::one())
    }

    /// The exact value, if this number is a known rational.
    pub fn as_exact(&self) -> Option<&Rational> {
        match &self.repr {
            Repr::Exact(value) => Some(value),
            Repr::Lazy(_) => None,
        }
    }

    pub fn is_exact(&self) -> bool {
        self.as_exact().is_some()
    }

    /// Cache key of a lazy number.
    pub(crate) fn id(&self) -> Option<usize> {
        match &self.repr {
            Repr::Exact(_) => None,
            Repr::Lazy(lazy) => Some(lazy.id),
        }
    }

    pub(crate) fn open(&self, access: CacheAccess) -> Box<dyn SegmentCursor> {
        match &self.repr {
            Repr::Exact(value) => Box::new(ExactCursor {
                value: Some(value.clone()),
            }),
            Repr::Lazy(lazy) => lazy.rule.observe(access),
        }
    }
}

impl fmt::Debug for Real {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.repr {
            Repr::Exact(value) => write!(f, "Real::Exact({value})"),
            Repr::Lazy(lazy) => write!(f, "Real::Lazy(#{})", lazy.id),
        }
    }
}

impl From<Rational> for Real {
    fn from(value: Rational) -> Self {
        Self::exact(value)
    }
}

impl From<&Rational> for Real {
    fn from(value: &Rational) -> Self {
        Self::exact(value.clone())
    }
}

impl From<BigInt> for Real {
    fn from(value: BigInt) -> Self {
        Self::exact(Rational::from(value))
    }
}

impl From<i64> for Real {
    fn from(value: i64) -> Self {
        Self::exact(Rational::from(value))
    }
}

impl From<i32> for Real {
    fn from(value: i32) -> Self {
        Self::exact(Rational::from(value))
    }
}

/// The constant sequence of an exact value: one point segment.
struct ExactCursor {
    value: Option<Rational>,
}

impl SegmentCursor for ExactCursor {
    fn next_segment(&mut self, _cache: &dyn EvaluationCache) -> Option<Result<Segment, RealError>> {
        self.value.take().map(|value| Ok(Segment::point(value)))
    }
}

/// Shared bookkeeping for combinator cursors: the current precision budget,
/// the last emitted segment, and whether the sequence is over.
pub(crate) struct Progress {
    delta: Rational,
    previous: Option<Segment>,
    finished: bool,
}

impl Progress {
    pub(crate) fn new() -> Self {
        Self {
            delta: Rational::one(),
            previous: None,
            finished: false,
        }
    }

    pub(crate) fn is_finished(&self) -> bool {
        self.finished
    }

    /// Error budget for the current step: 1, 1/2, 1/4, ...
    pub(crate) fn delta(&self) -> &Rational {
        &self.delta
    }

    /// Moves to the next budget without emitting anything.
    pub(crate) fn skip(&mut self) {
        self.delta = self.delta.half();
    }

    /// Nests `candidate` into the previous segment and moves to the next budget.
    pub(crate) fn advance(&mut self, candidate: Segment) -> Result<Segment, RealError> {
        let segment = match &self.previous {
            Some(previous) => candidate.intersect(previous)?,
            None => candidate,
        };
        self.finished = segment.is_point();
        self.previous = Some(segment.clone());
        self.skip();
        Ok(segment)
    }

    /// Ends the sequence after an error.
    pub(crate) fn settle(
        &mut self,
        step: Result<Segment, RealError>,
    ) -> Option<Result<Segment, RealError>> {
        if step.is_err() {
            self.finished = true;
        }
        Some(step)
    }

    pub(crate) fn finish(&mut self) {
        self.finished = true;
    }
}

struct StateStep<S, F> {
    segment: S,
    refine: F,
}

struct StateRule<X, S, F> {
    state: X,
    step: Arc<StateStep<S, F>>,
}

impl<X, S, F> RealRule for StateRule<X, S, F>
where
    X: Clone + Send + Sync + 'static,
    S: Fn(&X) -> Result<Segment, RealError> + Send + Sync + 'static,
    F: Fn(X) -> X + Send + Sync + 'static,
{
    fn observe(&self, _access: CacheAccess) -> Box<dyn SegmentCursor> {
        Box::new(StateCursor {
            pending: Some(Pending::Fresh(self.state.clone())),
            step: Arc::clone(&self.step),
            progress: Progress::new(),
        })
    }
}

enum Pending<X> {
    Fresh(X),
    Refine(X),
}

struct StateCursor<X, S, F> {
    pending: Option<Pending<X>>,
    step: Arc<StateStep<S, F>>,
    progress: Progress,
}

impl<X, S, F> SegmentCursor for StateCursor<X, S, F>
where
    X: Clone + Send + Sync + 'static,
    S: Fn(&X) -> Result<Segment, RealError> + Send + Sync + 'static,
    F: Fn(X) -> X + Send + Sync + 'static,
{
    fn next_segment(&mut self, _cache: &dyn EvaluationCache) -> Option<Result<Segment, RealError>> {
        if self.progress.is_finished() {
            return None;
        }
        // Refinement is deferred until the next segment is actually requested.
        let state = match self.pending.take()? {
            Pending::Fresh(state) => state,
            Pending::Refine(state) => (self.step.refine)(state),
        };
        let step = (self.step.segment)(&state).and_then(|segment| self.progress.advance(segment));
        self.pending = Some(Pending::Refine(state));
        self.progress.settle(step)
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::expect_used, clippy::panic)]

    use super::*;
    use crate::cache::{EvaluationCache, NoCache, SharedCache};
    use crate::test_utils::{assert_nested, halving_real, int, rat};

    #[test]
    fn exact_real_yields_a_single_point() {
        let segments: Vec<_> = NoCache
            .observe(&Real::from(int(3)))
            .collect::<Result<_, _>>()
            .expect("exact");
        assert_eq!(segments, vec![Segment::point(int(3))]);
    }

    #[test]
    fn user_state_sequence_is_nested_and_ends_at_a_point() {
        let value = Real::new(
            0u32,
            |&k| {
                if k >= 4 {
                    Ok(Segment::point(rat(1, 3)))
                } else {
                    let radius = Rational::power_of_half(k);
                    Ok(Segment::new(rat(1, 3) - &radius, rat(1, 3) + &radius))
                }
            },
            |k| k + 1,
        );
        let cache = SharedCache::new();
        let segments: Vec<_> = cache.observe(&value).collect::<Result<_, _>>().expect("segments");
        assert_eq!(segments.len(), 5);
        assert_nested(&segments);
        assert_eq!(segments.last(), Some(&Segment::point(rat(1, 3))));
    }

    #[test]
    fn loosening_segments_are_clipped_to_the_previous_one() {
        let value = Real::new(
            0u32,
            |&k| {
                // Every odd state widens its bounds again.
                let radius = if k % 2 == 1 { int(10) } else { Rational::power_of_half(k) };
                Ok(Segment::new(-radius.clone(), radius))
            },
            |k| k + 1,
        );
        let segments: Vec<_> = SharedCache::new()
            .observe(&value)
            .take(8)
            .collect::<Result<_, _>>()
            .expect("segments");
        assert_nested(&segments);
    }

    #[test]
    fn disjoint_segments_are_an_error() {
        let value = Real::new(
            0i64,
            |&k| Ok(Segment::new(int(2 * k), int(2 * k + 1))),
            |k| k + 1,
        );
        let cache = SharedCache::new();
        let mut observation = cache.observe(&value);
        assert_eq!(observation.next(), Some(Ok(Segment::new(int(0), int(1)))));
        assert_eq!(observation.next(), Some(Err(RealError::InvalidInterval)));
        assert!(observation.next().is_none());
    }

    #[test]
    fn ids_distinguish_lazy_numbers_and_clones_share_them() {
        let a = halving_real(int(1));
        let b = halving_real(int(1));
        assert_ne!(a.id(), b.id());
        assert_eq!(a.clone().id(), a.id());
        assert_eq!(Real::from(int(1)).id(), None);
        assert!(format!("{a:?}").starts_with("Real::Lazy(#"));
        assert_eq!(format!("{:?}", Real::from(rat(1, 2))), "Real::Exact(1/2)");
    }

    #[test]
    fn progress_halves_its_budget_and_stops_on_points() {
        let mut progress = Progress::new();
        assert_eq!(progress.delta(), &int(1));
        progress
            .advance(Segment::new(int(0), int(2)))
            .expect("first segment");
        assert_eq!(progress.delta(), &rat(1, 2));
        assert!(!progress.is_finished());
        progress.advance(Segment::point(int(1))).expect("point");
        assert!(progress.is_finished());
    }
}
