//! Limit combinators: new real numbers defined from other numbers.
//!
//! Every combinator works on the same principle. At step k it observes its
//! operands to an error budget of 2^-k, evaluates a monotonic operation on the
//! corners of the operand segments, and emits the hull of the results
//! intersected with its previous segment.

use std::sync::Arc;

use num_traits::{One, Zero};
use tracing::trace;

use crate::cache::EvaluationCache;
use crate::error::RealError;
use crate::interval::Segment;
use crate::rational::Rational;
use crate::real::{CacheAccess, Progress, Real, RealRule, SegmentCursor};

type UnaryOp = dyn Fn(&Rational) -> Result<Real, RealError> + Send + Sync;
type BinaryOp = dyn Fn(&Rational, &Rational) -> Result<Real, RealError> + Send + Sync;

/// Rejects operand segments on which the operation is not monotonic.
pub(crate) type Admissible = fn(&Segment, &Segment) -> bool;

/// `op(operand)` for an `op` that is monotonic on rationals.
///
/// An exact operand is mapped directly.
pub fn limit<F>(operand: &Real, op: F) -> Result<Real, RealError>
where
    F: Fn(&Rational) -> Result<Real, RealError> + Send + Sync + 'static,
{
    match operand.as_exact() {
        Some(value) => op(value),
        None => Ok(lazy_unary(operand, op)),
    }
}

/// `op(a, b)` for an `op` that is monotonic in each argument separately.
pub fn limit_monotonic<F>(a: &Real, b: &Real, op: F) -> Result<Real, RealError>
where
    F: Fn(&Rational, &Rational) -> Result<Real, RealError> + Send + Sync + 'static,
{
    match (a.as_exact(), b.as_exact()) {
        (Some(x), Some(y)) => op(x, y),
        _ => Ok(lazy_binary(a, b, op, None)),
    }
}

pub(crate) fn lazy_unary<F>(operand: &Real, op: F) -> Real
where
    F: Fn(&Rational) -> Result<Real, RealError> + Send + Sync + 'static,
{
    Real::from_rule(UnaryLimit {
        operand: operand.clone(),
        op: Arc::new(op),
    })
}

pub(crate) fn lazy_binary<F>(a: &Real, b: &Real, op: F, admissible: Option<Admissible>) -> Real
where
    F: Fn(&Rational, &Rational) -> Result<Real, RealError> + Send + Sync + 'static,
{
    Real::from_rule(BinaryLimit {
        a: a.clone(),
        b: b.clone(),
        op: Arc::new(op),
        admissible,
    })
}

/// Observes every corner value to `delta` and returns the hull.
fn corner_hull(
    cache: &dyn EvaluationCache,
    corners: &[Real],
    delta: &Rational,
) -> Result<Segment, RealError> {
    let observed = corners
        .iter()
        .map(|corner| cache.observe_to(corner, delta))
        .collect::<Result<Vec<_>, _>>()?;
    Segment::hull(&observed).ok_or(RealError::InvalidInterval)
}

struct UnaryLimit {
    operand: Real,
    op: Arc<UnaryOp>,
}

impl RealRule for UnaryLimit {
    fn observe(&self, _access: CacheAccess) -> Box<dyn SegmentCursor> {
        Box::new(UnaryCursor {
            operand: self.operand.clone(),
            op: Arc::clone(&self.op),
            progress: Progress::new(),
        })
    }
}

struct UnaryCursor {
    operand: Real,
    op: Arc<UnaryOp>,
    progress: Progress,
}

impl UnaryCursor {
    fn step(&mut self, cache: &dyn EvaluationCache) -> Result<Segment, RealError> {
        let delta = self.progress.delta().clone();
        let segment = cache.observe_to(&self.operand, &delta)?;
        let corners = [(self.op)(segment.lower())?, (self.op)(segment.upper())?];
        let hull = corner_hull(cache, &corners, &delta)?;
        self.progress.advance(hull)
    }
}

impl SegmentCursor for UnaryCursor {
    fn next_segment(&mut self, cache: &dyn EvaluationCache) -> Option<Result<Segment, RealError>> {
        if self.progress.is_finished() {
            return None;
        }
        let step = self.step(cache);
        self.progress.settle(step)
    }
}

struct BinaryLimit {
    a: Real,
    b: Real,
    op: Arc<BinaryOp>,
    admissible: Option<Admissible>,
}

impl RealRule for BinaryLimit {
    fn observe(&self, _access: CacheAccess) -> Box<dyn SegmentCursor> {
        Box::new(BinaryCursor {
            a: self.a.clone(),
            b: self.b.clone(),
            op: Arc::clone(&self.op),
            admissible: self.admissible,
            progress: Progress::new(),
        })
    }
}

struct BinaryCursor {
    a: Real,
    b: Real,
    op: Arc<BinaryOp>,
    admissible: Option<Admissible>,
    progress: Progress,
}

impl BinaryCursor {
    fn step(&mut self, cache: &dyn EvaluationCache) -> Result<Segment, RealError> {
        loop {
            let delta = self.progress.delta().clone();
            let a = cache.observe_to(&self.a, &delta)?;
            let b = cache.observe_to(&self.b, &delta)?;
            if let Some(admissible) = self.admissible {
                if !admissible(&a, &b) {
                    trace!(%a, %b, "operands not yet admissible, refining");
                    self.progress.skip();
                    continue;
                }
            }

            let mut corners = Vec::with_capacity(4);
            for x in [a.lower(), a.upper()] {
                for y in [b.lower(), b.upper()] {
                    corners.push((self.op)(x, y)?);
                }
            }
            let hull = corner_hull(cache, &corners, &delta)?;
            return self.progress.advance(hull);
        }
    }
}

impl SegmentCursor for BinaryCursor {
    fn next_segment(&mut self, cache: &dyn EvaluationCache) -> Option<Result<Segment, RealError>> {
        if self.progress.is_finished() {
            return None;
        }
        let step = self.step(cache);
        self.progress.settle(step)
    }
}

/// The limit of a sequence of reals.
///
/// `epsilon(k)` must bound the distance between the k-th term and the limit.
/// Step k observes term k to 2^-k and widens it by `epsilon(k)`. A finite
/// sequence converges to its last term, which keeps being refined once the
/// other terms are used up. An error from `epsilon` ends the sequence.
pub fn sequence_limit<I, E>(terms: I, epsilon: E) -> Real
where
    I: Iterator<Item = Real> + Clone + Send + Sync + 'static,
    E: Fn(u64) -> Result<Rational, RealError> + Send + Sync + 'static,
{
    Real::from_rule(SequenceLimit {
        terms,
        epsilon: Arc::new(epsilon),
    })
}

type Epsilon = dyn Fn(u64) -> Result<Rational, RealError> + Send + Sync;

/// A step index as a machine exponent for tail bounds like `x^k/k!`.
pub(crate) fn step_exponent(step: u64) -> Result<u32, RealError> {
    u32::try_from(step).map_err(|_| RealError::ExponentOverflow)
}

struct SequenceLimit<I> {
    terms: I,
    epsilon: Arc<Epsilon>,
}

impl<I> RealRule for SequenceLimit<I>
where
    I: Iterator<Item = Real> + Clone + Send + Sync + 'static,
{
    fn observe(&self, _access: CacheAccess) -> Box<dyn SegmentCursor> {
        Box::new(SequenceCursor {
            terms: self.terms.clone(),
            epsilon: Arc::clone(&self.epsilon),
            index: 0,
            last: None,
            exhausted: false,
            progress: Progress::new(),
        })
    }
}

struct SequenceCursor<I> {
    terms: I,
    epsilon: Arc<Epsilon>,
    index: u64,
    last: Option<Real>,
    exhausted: bool,
    progress: Progress,
}

impl<I> SequenceCursor<I>
where
    I: Iterator<Item = Real>,
{
    fn next_term(&mut self) -> Option<Result<(Real, Rational), RealError>> {
        if !self.exhausted {
            if let Some(term) = self.terms.next() {
                let epsilon = (self.epsilon)(self.index);
                self.index += 1;
                self.last = Some(term.clone());
                return Some(epsilon.map(|epsilon| (term, epsilon)));
            }
            self.exhausted = true;
        }
        self.last.clone().map(|term| Ok((term, Rational::zero())))
    }
}

impl<I> SegmentCursor for SequenceCursor<I>
where
    I: Iterator<Item = Real> + Send,
{
    fn next_segment(&mut self, cache: &dyn EvaluationCache) -> Option<Result<Segment, RealError>> {
        if self.progress.is_finished() {
            return None;
        }
        let Some(next) = self.next_term() else {
            self.progress.finish();
            return None;
        };
        let delta = self.progress.delta().clone();
        let step = next.and_then(|(term, epsilon)| {
            cache
                .observe_to(&term, &delta)
                .and_then(|segment| self.progress.advance(segment.widen(&epsilon)))
        });
        self.progress.settle(step)
    }
}

/// Σ terms, given a bound on the tail after each partial sum.
pub fn sum<I, E>(terms: I, epsilon: E) -> Real
where
    I: Iterator<Item = Rational> + Clone + Send + Sync + 'static,
    E: Fn(u64) -> Result<Rational, RealError> + Send + Sync + 'static,
{
    let partial_sums = terms.scan(Rational::zero(), |total, term| {
        *total = &*total + &term;
        Some(Real::exact(total.clone()))
    });
    sequence_limit(partial_sums, epsilon)
}

/// Π terms, given a bound on the distance of each partial product to the limit.
pub fn product<I, E>(terms: I, epsilon: E) -> Real
where
    I: Iterator<Item = Rational> + Clone + Send + Sync + 'static,
    E: Fn(u64) -> Result<Rational, RealError> + Send + Sync + 'static,
{
    let partial_products = terms.scan(Rational::one(), |total, term| {
        *total = &*total * &term;
        Some(Real::exact(total.clone()))
    });
    sequence_limit(partial_products, epsilon)
}

/// Σ of real terms.
pub fn sum_reals<I, E>(terms: I, epsilon: E) -> Real
where
    I: Iterator<Item = Real> + Clone + Send + Sync + 'static,
    E: Fn(u64) -> Result<Rational, RealError> + Send + Sync + 'static,
{
    let partial_sums = terms.scan(Real::zero(), |total, term| {
        *total = &*total + &term;
        Some(total.clone())
    });
    sequence_limit(partial_sums, epsilon)
}

/// Π of real terms.
pub fn product_reals<I, E>(terms: I, epsilon: E) -> Real
where
    I: Iterator<Item = Real> + Clone + Send + Sync + 'static,
    E: Fn(u64) -> Result<Rational, RealError> + Send + Sync + 'static,
{
    let partial_products = terms.scan(Real::one(), |total, term| {
        *total = &*total * &term;
        Some(total.clone())
    });
    sequence_limit(partial_products, epsilon)
}
