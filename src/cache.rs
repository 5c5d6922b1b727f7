//! Evaluation caches: the only way to observe a real number.
//!
//! [`SharedCache`] memoizes every lazy number it sees. Each number gets one
//! entry holding the segments produced so far and the single cursor that
//! extends them, so a number's rule runs at most once per precision level no
//! matter how many threads observe it.
//!
//! ## Registering entries
//!
//! The registry is an immutable map behind an `RwLock<Arc<_>>`. A thread that
//! sees an unknown number takes a snapshot, builds the entry outside any lock,
//! then swaps in an extended copy only if the registry is still the snapshot it
//! started from. On conflict it retries, and the loser's unused entry is
//! dropped.
//!
//! ## Extending the frontier
//!
//! Readers first try a non-blocking read of the produced segments. Only when the
//! segment they need does not exist yet do they take the entry's cursor lock,
//! re-check, and advance the cursor themselves. A failure of the cursor is
//! stored and handed to every later observer.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use tracing::{debug, trace};

use crate::error::RealError;
use crate::interval::Segment;
use crate::rational::Rational;
use crate::real::{CacheAccess, Real, SegmentCursor};

#[cfg(debug_assertions)]
pub const DEFAULT_MAX_OBSERVATIONS: usize = 64;
#[cfg(not(debug_assertions))]
pub const DEFAULT_MAX_OBSERVATIONS: usize = 4096;

/// Sequence of segments for one number, as seen through a cache.
pub type Observation<'a> = Box<dyn Iterator<Item = Result<Segment, RealError>> + 'a>;

/// Source of segment sequences for real numbers.
pub trait EvaluationCache: Send + Sync {
    /// The number's segments, from the coarsest on.
    fn observe<'a>(&'a self, number: &Real) -> Observation<'a>;

    /// The first segment with `diff < max_delta`.
    fn observe_to(&self, number: &Real, max_delta: &Rational) -> Result<Segment, RealError> {
        check_delta(max_delta)?;
        first_below(self.observe(number), max_delta, None)
    }

    /// Like [`observe_to`](Self::observe_to), but gives up with
    /// `IterationLimit` after pulling `max_segments` segments.
    fn observe_at_most(
        &self,
        number: &Real,
        max_delta: &Rational,
        max_segments: usize,
    ) -> Result<Segment, RealError> {
        check_delta(max_delta)?;
        first_below(self.observe(number), max_delta, Some(max_segments))
    }

    fn observe_default(&self, number: &Real, max_delta: &Rational) -> Result<Segment, RealError> {
        self.observe_at_most(number, max_delta, DEFAULT_MAX_OBSERVATIONS)
    }
}

fn check_delta(max_delta: &Rational) -> Result<(), RealError> {
    if !max_delta.is_positive() {
        return Err(RealError::NonpositiveDelta);
    }
    Ok(())
}

fn first_below(
    observation: Observation<'_>,
    max_delta: &Rational,
    cap: Option<usize>,
) -> Result<Segment, RealError> {
    let mut observation = observation;
    let mut pulled = 0;
    loop {
        if let Some(max) = cap {
            if pulled >= max {
                return Err(RealError::IterationLimit { max });
            }
        }
        let Some(segment) = observation.next() else {
            return Err(RealError::PrecisionUnattainable);
        };
        pulled += 1;
        let segment = segment?;
        if &segment.diff() < max_delta {
            return Ok(segment);
        }
    }
}

/// Evaluates every observation from scratch.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoCache;

impl EvaluationCache for NoCache {
    fn observe<'a>(&'a self, number: &Real) -> Observation<'a> {
        Box::new(Traversal {
            cursor: number.open(CacheAccess::grant()),
            cache: self,
            done: false,
        })
    }
}

struct Traversal<'a> {
    cursor: Box<dyn SegmentCursor>,
    cache: &'a dyn EvaluationCache,
    done: bool,
}

impl Iterator for Traversal<'_> {
    type Item = Result<Segment, RealError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        let next = self.cursor.next_segment(self.cache);
        if !matches!(next, Some(Ok(_))) {
            self.done = true;
        }
        next
    }
}

type Registry = HashMap<usize, Arc<CacheEntry>>;

/// Thread-safe memoizing cache shared by any number of observers.
pub struct SharedCache {
    registry: RwLock<Arc<Registry>>,
}

impl SharedCache {
    pub fn new() -> Self {
        Self {
            registry: RwLock::new(Arc::new(HashMap::new())),
        }
    }

    /// Number of lazy numbers registered so far.
    pub fn len(&self) -> usize {
        self.registry.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Segments produced so far for `number`; 0 for exact or unseen numbers.
    pub fn produced(&self, number: &Real) -> usize {
        let Some(id) = number.id() else {
            return 0;
        };
        let registry = Arc::clone(&self.registry.read());
        registry.get(&id).map_or(0, |entry| entry.produced())
    }

    fn entry(&self, number: &Real, id: usize) -> Arc<CacheEntry> {
        loop {
            let snapshot = Arc::clone(&self.registry.read());
            if let Some(entry) = snapshot.get(&id) {
                return Arc::clone(entry);
            }

            let entry = Arc::new(CacheEntry::new(id, number.open(CacheAccess::grant())));
            let mut registry = self.registry.write();
            if Arc::ptr_eq(&registry, &snapshot) {
                drop(snapshot);
                // Copies the map only while a reader still holds the old snapshot.
                Arc::make_mut(&mut *registry).insert(id, Arc::clone(&entry));
                debug!(id, registered = registry.len(), "registered real number");
                return entry;
            }
            drop(registry);
            trace!(id, "registry changed during registration, retrying");
        }
    }
}

impl Default for SharedCache {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for SharedCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SharedCache")
            .field("registered", &self.len())
            .finish()
    }
}

impl EvaluationCache for SharedCache {
    fn observe<'a>(&'a self, number: &Real) -> Observation<'a> {
        if let Some(value) = number.as_exact() {
            return Box::new(std::iter::once(Ok(Segment::point(value.clone()))));
        }
        let Some(id) = number.id() else {
            return Box::new(std::iter::empty());
        };
        Box::new(Replay {
            cache: self,
            entry: self.entry(number, id),
            seen: 0,
            done: false,
        })
    }

    fn observe_to(&self, number: &Real, max_delta: &Rational) -> Result<Segment, RealError> {
        check_delta(max_delta)?;
        if let Some(value) = number.as_exact() {
            return Ok(Segment::point(value.clone()));
        }
        let Some(id) = number.id() else {
            return Err(RealError::PrecisionUnattainable);
        };
        self.entry(number, id).first_below(max_delta, self)
    }
}

/// One number's produced segments plus the cursor that extends them.
struct CacheEntry {
    id: usize,
    history: RwLock<Vec<Segment>>,
    cursor: Mutex<CursorSlot>,
}

struct CursorSlot {
    cursor: Box<dyn SegmentCursor>,
    status: CursorStatus,
}

enum CursorStatus {
    Open,
    Exhausted,
    Failed(RealError),
}

impl CacheEntry {
    fn new(id: usize, cursor: Box<dyn SegmentCursor>) -> Self {
        Self {
            id,
            history: RwLock::new(Vec::new()),
            cursor: Mutex::new(CursorSlot {
                cursor,
                status: CursorStatus::Open,
            }),
        }
    }

    fn produced(&self) -> usize {
        self.history.read().len()
    }

    /// Non-blocking lookup of an already produced segment.
    fn peek(&self, index: usize) -> Option<Segment> {
        let history = self.history.try_read()?;
        history.get(index).cloned()
    }

    /// Segment number `index`, producing it (and any before it) if needed.
    fn segment_at(
        &self,
        index: usize,
        cache: &dyn EvaluationCache,
    ) -> Option<Result<Segment, RealError>> {
        if let Some(segment) = self.peek(index) {
            return Some(Ok(segment));
        }

        let mut slot = self.cursor.lock();
        loop {
            if let Some(segment) = self.history.read().get(index) {
                return Some(Ok(segment.clone()));
            }
            match &slot.status {
                CursorStatus::Open => {}
                CursorStatus::Exhausted => return None,
                CursorStatus::Failed(error) => return Some(Err(error.clone())),
            }
            match slot.cursor.next_segment(cache) {
                Some(Ok(segment)) => {
                    let mut history = self.history.write();
                    trace!(
                        id = self.id,
                        generation = history.len(),
                        diff = %segment.diff(),
                        "advanced frontier"
                    );
                    history.push(segment);
                }
                Some(Err(error)) => {
                    debug!(id = self.id, %error, "real number failed, caching the error");
                    slot.status = CursorStatus::Failed(error);
                }
                None => slot.status = CursorStatus::Exhausted,
            }
        }
    }

    fn first_below(
        &self,
        max_delta: &Rational,
        cache: &dyn EvaluationCache,
    ) -> Result<Segment, RealError> {
        let mut index = {
            let history = self.history.read();
            let index = history.partition_point(|segment| &segment.diff() >= max_delta);
            if let Some(segment) = history.get(index) {
                return Ok(segment.clone());
            }
            index
        };
        loop {
            match self.segment_at(index, cache) {
                Some(Ok(segment)) if &segment.diff() < max_delta => return Ok(segment),
                Some(Ok(_)) => index += 1,
                Some(Err(error)) => return Err(error),
                None => return Err(RealError::PrecisionUnattainable),
            }
        }
    }
}

/// A view over a shared entry that remembers how far it has read.
struct Replay<'a> {
    cache: &'a SharedCache,
    entry: Arc<CacheEntry>,
    seen: usize,
    done: bool,
}

impl Iterator for Replay<'_> {
    type Item = Result<Segment, RealError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.entry.segment_at(self.seen, self.cache) {
            Some(Ok(segment)) => {
                self.seen += 1;
                Some(Ok(segment))
            }
            Some(Err(error)) => {
                self.done = true;
                Some(Err(error))
            }
            None => {
                self.done = true;
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::expect_used, clippy::panic)]

    use std::sync::atomic::{AtomicUsize, Ordering as AtomicOrdering};
    use std::sync::Barrier;
    use std::thread;

    use super::*;
    use crate::test_utils::{assert_nested, counting_real, halving_real, int, rat};

    #[test]
    fn nonpositive_delta_is_rejected() {
        let cache = SharedCache::new();
        let value = halving_real(int(1));
        assert_eq!(
            cache.observe_to(&value, &int(0)),
            Err(RealError::NonpositiveDelta)
        );
        assert_eq!(
            NoCache.observe_to(&value, &rat(-1, 2)),
            Err(RealError::NonpositiveDelta)
        );
    }

    #[test]
    fn registration_extends_an_unshared_registry_in_place() {
        let cache = SharedCache::new();
        let numbers: Vec<_> = (0..200).map(|k| halving_real(int(k))).collect();
        for number in &numbers {
            cache.observe_to(number, &rat(1, 4)).expect("segment");
        }
        let before = Arc::as_ptr(&cache.registry.read());
        cache.observe_to(&halving_real(int(-1)), &rat(1, 4)).expect("segment");
        assert_eq!(Arc::as_ptr(&cache.registry.read()), before);
        assert_eq!(cache.len(), 201);

        // A held snapshot keeps the map it was taken from.
        let held = Arc::clone(&cache.registry.read());
        cache.observe_to(&halving_real(int(-2)), &rat(1, 4)).expect("segment");
        assert_eq!(held.len(), 201);
        assert_eq!(cache.len(), 202);
        assert!(numbers.iter().all(|number| cache.produced(number) > 0));
    }

    #[test]
    fn exact_numbers_bypass_the_registry() {
        let cache = SharedCache::new();
        let segment = cache.observe_to(&Real::from(rat(2, 3)), &rat(1, 10)).expect("exact");
        assert_eq!(segment, Segment::point(rat(2, 3)));
        assert!(cache.is_empty());
    }

    #[test]
    fn observe_to_returns_first_segment_below_delta() {
        let cache = SharedCache::new();
        let value = halving_real(int(1));
        let segment = cache.observe_to(&value, &rat(1, 5)).expect("segment");
        // Radii are 1, 1/2, 1/4, 1/8, so diffs are 2, 1, 1/2, 1/4, 1/8.
        assert_eq!(segment.diff(), rat(1, 8));
        assert_eq!(cache.produced(&value), 5);

        // A coarser request is served from history.
        let coarse = cache.observe_to(&value, &int(1)).expect("segment");
        assert_eq!(coarse.diff(), rat(1, 2));
        assert_eq!(cache.produced(&value), 5);
    }

    #[test]
    fn no_cache_and_shared_cache_agree() {
        let value = halving_real(rat(3, 7));
        let shared = SharedCache::new();
        for exponent in 0..12 {
            let delta = Rational::power_of_half(exponent);
            assert_eq!(
                shared.observe_to(&value, &delta).expect("shared"),
                NoCache.observe_to(&value, &delta).expect("fresh")
            );
        }
    }

    #[test]
    fn replayed_sequence_is_identical_and_nested() {
        let cache = SharedCache::new();
        let value = halving_real(int(-2));
        let first: Vec<_> = cache.observe(&value).take(10).collect::<Result<_, _>>().expect("first");
        let second: Vec<_> = cache.observe(&value).take(10).collect::<Result<_, _>>().expect("second");
        assert_eq!(first, second);
        assert_nested(&first);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn exhausted_sequence_cannot_reach_finer_precision() {
        let value = Real::new(
            0u32,
            |_| Ok(Segment::new(int(0), int(1))),
            |state| state,
        );
        let cache = SharedCache::new();
        // The rule never refines, but every segment is re-clipped to [0, 1],
        // so ask for a capped observation instead of waiting forever.
        assert_eq!(
            cache.observe_at_most(&value, &rat(1, 2), 5),
            Err(RealError::IterationLimit { max: 5 })
        );
        assert_eq!(cache.produced(&value), 5);

        let point = Real::new((), |_| Ok(Segment::point(int(4))), |state| state);
        assert_eq!(
            cache.observe_to(&point, &int(1)).expect("point"),
            Segment::point(int(4))
        );
        let finished = Real::new(
            0u32,
            |&k| {
                if k == 0 {
                    Ok(Segment::new(int(0), int(2)))
                } else {
                    Ok(Segment::new(int(1), int(1)))
                }
            },
            |k| k + 1,
        );
        assert_eq!(cache.observe(&finished).count(), 2);
        assert!(cache.observe_default(&finished, &rat(1, 1000)).is_ok());
    }

    #[test]
    fn failure_is_cached_and_replayed() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let value = Real::new(
            (),
            move |_| {
                counter.fetch_add(1, AtomicOrdering::SeqCst);
                Err(RealError::DomainError)
            },
            |state| state,
        );
        let cache = SharedCache::new();
        for _ in 0..3 {
            assert_eq!(
                cache.observe_to(&value, &int(1)),
                Err(RealError::DomainError)
            );
        }
        let replayed: Vec<_> = cache.observe(&value).collect();
        assert_eq!(replayed, vec![Err(RealError::DomainError)]);
        assert_eq!(calls.load(AtomicOrdering::SeqCst), 1);
    }

    #[test]
    fn no_cache_recomputes_every_time() {
        let (value, calls) = counting_real();
        let delta = Rational::power_of_half(3);
        NoCache.observe_to(&value, &delta).expect("first");
        let once = calls.load(AtomicOrdering::SeqCst);
        NoCache.observe_to(&value, &delta).expect("second");
        assert_eq!(calls.load(AtomicOrdering::SeqCst), 2 * once);
    }

    #[test]
    fn concurrent_observers_share_one_evaluation() {
        let (value, calls) = counting_real();
        let cache = Arc::new(SharedCache::new());
        let barrier = Arc::new(Barrier::new(8));
        let delta = Rational::power_of_half(10);

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let cache = Arc::clone(&cache);
                let barrier = Arc::clone(&barrier);
                let value = value.clone();
                let delta = delta.clone();
                thread::spawn(move || {
                    barrier.wait();
                    cache.observe_to(&value, &delta)
                })
            })
            .collect();

        let results: Vec<_> = handles
            .into_iter()
            .map(|handle| handle.join().expect("join"))
            .collect();

        let first = results[0].clone().expect("segment");
        for result in results {
            assert_eq!(result.expect("segment"), first);
        }
        // Diffs 1, 1/2, ..., 2^-10 are too wide; 2^-11 is the first below 2^-10.
        assert_eq!(calls.load(AtomicOrdering::SeqCst), 12);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn concurrent_observers_at_mixed_precisions_see_nested_segments() {
        let (value, calls) = counting_real();
        let cache = Arc::new(SharedCache::new());
        let barrier = Arc::new(Barrier::new(6));

        let handles: Vec<_> = (0..6u32)
            .map(|worker| {
                let cache = Arc::clone(&cache);
                let barrier = Arc::clone(&barrier);
                let value = value.clone();
                thread::spawn(move || {
                    barrier.wait();
                    (0..=2 * worker + 4)
                        .map(|bits| cache.observe_to(&value, &Rational::power_of_half(bits)))
                        .collect::<Result<Vec<_>, _>>()
                })
            })
            .collect();

        let mut all = Vec::new();
        for handle in handles {
            all.extend(handle.join().expect("join").expect("segments"));
        }
        for a in &all {
            for b in &all {
                assert!(a.contains_segment(b) || b.contains_segment(a));
            }
        }
        // The finest request is 2^-14, first met by the segment with diff 2^-15.
        assert_eq!(calls.load(AtomicOrdering::SeqCst), 16);
    }

    #[test]
    fn concurrent_registration_installs_one_entry_per_number() {
        let numbers: Vec<Real> = (0..16).map(|k| halving_real(int(k))).collect();
        let cache = Arc::new(SharedCache::new());
        let barrier = Arc::new(Barrier::new(4));

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let cache = Arc::clone(&cache);
                let barrier = Arc::clone(&barrier);
                let numbers = numbers.clone();
                thread::spawn(move || {
                    barrier.wait();
                    for number in &numbers {
                        cache.observe_to(number, &rat(1, 4)).expect("segment");
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().expect("join");
        }
        assert_eq!(cache.len(), numbers.len());
        for number in &numbers {
            assert_eq!(cache.produced(number), 5);
        }
    }
}
