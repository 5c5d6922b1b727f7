//! Brackets and the composite placement of a value against two others.

use std::fmt;

use crate::cache::EvaluationCache;
use crate::error::RealError;
use crate::interval::Segment;
use crate::rational::Rational;
use crate::real::Real;

/// Which way a monotonic function moves as its argument grows.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Direction {
    Ascending,
    Descending,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ascending => write!(f, "ascending"),
            Self::Descending => write!(f, "descending"),
        }
    }
}

/// Where a value lies relative to a `low < high` pair.
///
/// `AfterLower` and `BeforeUpper` both mean "somewhere in between"; they
/// record which inequality was proven first. `Between` only arises when all
/// three values are known exactly and coincide.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Placement {
    BeforeLower,
    AfterLower,
    BeforeUpper,
    AfterUpper,
    Between,
}

impl Placement {
    pub(crate) fn is_outside(self) -> bool {
        matches!(self, Self::BeforeLower | Self::AfterUpper)
    }
}

/// Two arguments together with the function values at them.
#[derive(Clone, Debug)]
pub(crate) struct Bracket<V> {
    pub(crate) lower: Rational,
    pub(crate) lower_value: V,
    pub(crate) upper: Rational,
    pub(crate) upper_value: V,
}

impl<V: Clone> Bracket<V> {
    /// A bracket collapsed onto an argument whose value matched exactly.
    pub(crate) fn found(argument: Rational, value: V) -> Self {
        Self {
            lower: argument.clone(),
            lower_value: value.clone(),
            upper: argument,
            upper_value: value,
        }
    }

    pub(crate) fn is_point(&self) -> bool {
        self.lower == self.upper
    }

    pub(crate) fn segment(&self) -> Segment {
        Segment::new(self.lower.clone(), self.upper.clone())
    }

    pub(crate) fn with_lower(self, lower: Rational, lower_value: V) -> Self {
        Self {
            lower,
            lower_value,
            ..self
        }
    }

    pub(crate) fn with_upper(self, upper: Rational, upper_value: V) -> Self {
        Self {
            upper,
            upper_value,
            ..self
        }
    }
}

pub(crate) fn place_rational(value: &Rational, low: &Rational, high: &Rational) -> Placement {
    if value > high {
        Placement::AfterUpper
    } else if value < low {
        Placement::BeforeLower
    } else if value > low {
        Placement::AfterLower
    } else if value < high {
        Placement::BeforeUpper
    } else {
        Placement::Between
    }
}

/// Places `value` against `low` and `high` by refining all three together.
///
/// The loop ends as soon as one strict inequality is visible in the segments.
/// `low` and `high` must differ, unless every sequence reaches a point: equal
/// bounds that never collapse keep this refining forever.
pub(crate) fn place(
    cache: &dyn EvaluationCache,
    value: &Real,
    low: &Real,
    high: &Real,
) -> Result<Placement, RealError> {
    if let (Some(v), Some(l), Some(h)) = (value.as_exact(), low.as_exact(), high.as_exact()) {
        return Ok(place_rational(v, l, h));
    }
    let mut delta = Rational::from(1u32);
    loop {
        let current = cache.observe_to(value, &delta)?;
        let low_segment = cache.observe_to(low, &delta)?;
        let high_segment = cache.observe_to(high, &delta)?;
        if current.lower() > high_segment.upper() {
            return Ok(Placement::AfterUpper);
        }
        if current.upper() < low_segment.lower() {
            return Ok(Placement::BeforeLower);
        }
        if current.lower() > low_segment.upper() {
            return Ok(Placement::AfterLower);
        }
        if current.upper() < high_segment.lower() {
            return Ok(Placement::BeforeUpper);
        }
        if current.is_point() && low_segment.is_point() && high_segment.is_point() {
            return Ok(place_rational(
                current.lower(),
                low_segment.lower(),
                high_segment.lower(),
            ));
        }
        delta = delta.half();
    }
}
