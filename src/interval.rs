//! Interval edges, validated intervals and closed rational segments.
//!
//! A [`Segment`] is what observing a real number yields: a closed rational
//! interval known to contain the value. An [`Interval`] is more general and is
//! only used to describe search domains, where either edge may be open or
//! infinite.

use std::fmt;

use crate::error::RealError;
use crate::rational::Rational;

/// One edge of an interval.
///
/// `NegInfinity` may only be a lower edge and `PosInfinity` only an upper
/// edge; [`Interval::new`] enforces this.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Bound {
    NegInfinity,
    Inclusive(Rational),
    Exclusive(Rational),
    PosInfinity,
}

impl Bound {
    /// Numeric value of a finite edge.
    pub fn value(&self) -> Option<&Rational> {
        match self {
            Self::Inclusive(value) | Self::Exclusive(value) => Some(value),
            Self::NegInfinity | Self::PosInfinity => None,
        }
    }

    pub fn is_inclusive(&self) -> bool {
        matches!(self, Self::Inclusive(_))
    }

    pub fn is_exclusive(&self) -> bool {
        matches!(self, Self::Exclusive(_))
    }

    pub fn is_finite(&self) -> bool {
        self.value().is_some()
    }

    pub fn can_be_lower(&self) -> bool {
        !matches!(self, Self::PosInfinity)
    }

    pub fn can_be_upper(&self) -> bool {
        !matches!(self, Self::NegInfinity)
    }
}

/// A validated pair of edges.
///
/// Finite edges must satisfy `lower <= upper`, strictly `<` when either edge
/// is exclusive.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Interval {
    lower: Bound,
    upper: Bound,
}

impl Interval {
    pub fn new(lower: Bound, upper: Bound) -> Result<Self, RealError> {
        if !lower.can_be_lower() || !upper.can_be_upper() {
            return Err(RealError::InvalidInterval);
        }
        let ordered = match (&lower, &upper) {
            (Bound::Inclusive(low), Bound::Inclusive(high)) => low <= high,
            (Bound::Inclusive(low) | Bound::Exclusive(low), Bound::Inclusive(high) | Bound::Exclusive(high)) => {
                low < high
            }
            _ => true,
        };
        if !ordered {
            return Err(RealError::InvalidInterval);
        }
        Ok(Self { lower, upper })
    }

    /// `(-inf, +inf)`.
    pub fn whole_line() -> Self {
        Self {
            lower: Bound::NegInfinity,
            upper: Bound::PosInfinity,
        }
    }

    /// `[lower, upper]`.
    pub fn closed(lower: Rational, upper: Rational) -> Result<Self, RealError> {
        Self::new(Bound::Inclusive(lower), Bound::Inclusive(upper))
    }

    /// `(lower, upper)`.
    pub fn open(lower: Rational, upper: Rational) -> Result<Self, RealError> {
        Self::new(Bound::Exclusive(lower), Bound::Exclusive(upper))
    }

    /// `[lower, +inf)`.
    pub fn at_least(lower: Rational) -> Self {
        Self {
            lower: Bound::Inclusive(lower),
            upper: Bound::PosInfinity,
        }
    }

    /// `(-inf, upper]`.
    pub fn at_most(upper: Rational) -> Self {
        Self {
            lower: Bound::NegInfinity,
            upper: Bound::Inclusive(upper),
        }
    }

    pub fn lower(&self) -> &Bound {
        &self.lower
    }

    pub fn upper(&self) -> &Bound {
        &self.upper
    }

    /// `upper - lower` when both edges are finite.
    pub fn diff(&self) -> Option<Rational> {
        Some(self.upper.value()? - self.lower.value()?)
    }

    /// The closed segment this interval describes, if both edges are inclusive.
    pub fn as_segment(&self) -> Option<Segment> {
        match (&self.lower, &self.upper) {
            (Bound::Inclusive(lower), Bound::Inclusive(upper)) => Some(Segment {
                lower: lower.clone(),
                upper: upper.clone(),
            }),
            _ => None,
        }
    }

    pub fn contains(&self, value: &Rational) -> bool {
        let above_lower = match &self.lower {
            Bound::NegInfinity => true,
            Bound::Inclusive(lower) => lower <= value,
            Bound::Exclusive(lower) => lower < value,
            Bound::PosInfinity => false,
        };
        let below_upper = match &self.upper {
            Bound::PosInfinity => true,
            Bound::Inclusive(upper) => value <= upper,
            Bound::Exclusive(upper) => value < upper,
            Bound::NegInfinity => false,
        };
        above_lower && below_upper
    }
}

impl From<Segment> for Interval {
    fn from(segment: Segment) -> Self {
        Self {
            lower: Bound::Inclusive(segment.lower),
            upper: Bound::Inclusive(segment.upper),
        }
    }
}

impl fmt::Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.lower {
            Bound::NegInfinity => write!(f, "(-∞")?,
            Bound::Inclusive(value) => write!(f, "[{value}")?,
            Bound::Exclusive(value) => write!(f, "({value}")?,
            Bound::PosInfinity => write!(f, "(+∞")?,
        }
        match &self.upper {
            Bound::NegInfinity => write!(f, ", -∞)"),
            Bound::Inclusive(value) => write!(f, ", {value}]"),
            Bound::Exclusive(value) => write!(f, ", {value})"),
            Bound::PosInfinity => write!(f, ", +∞)"),
        }
    }
}

/// Closed rational interval `[lower, upper]` with `lower <= upper`.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Segment {
    lower: Rational,
    upper: Rational,
}

impl Segment {
    /// Creates a segment, ordering the two values.
    pub fn new(a: Rational, b: Rational) -> Self {
        if a <= b {
            Self { lower: a, upper: b }
        } else {
            Self { lower: b, upper: a }
        }
    }

    /// Creates a segment from explicit edges, failing if `lower > upper`.
    pub fn new_checked(lower: Rational, upper: Rational) -> Result<Self, RealError> {
        if lower > upper {
            return Err(RealError::InvalidInterval);
        }
        Ok(Self { lower, upper })
    }

    pub fn point(value: Rational) -> Self {
        Self {
            lower: value.clone(),
            upper: value,
        }
    }

    pub fn lower(&self) -> &Rational {
        &self.lower
    }

    pub fn upper(&self) -> &Rational {
        &self.upper
    }

    pub fn into_bounds(self) -> (Rational, Rational) {
        (self.lower, self.upper)
    }

    pub fn diff(&self) -> Rational {
        &self.upper - &self.lower
    }

    pub fn is_point(&self) -> bool {
        self.lower == self.upper
    }

    pub fn contains(&self, value: &Rational) -> bool {
        &self.lower <= value && value <= &self.upper
    }

    pub fn contains_segment(&self, other: &Segment) -> bool {
        self.lower <= other.lower && other.upper <= self.upper
    }

    /// `[lower - epsilon, upper + epsilon]`.
    pub fn widen(&self, epsilon: &Rational) -> Self {
        Self::new(&self.lower - epsilon, &self.upper + epsilon)
    }

    /// Common part of two segments; disjoint segments cannot both enclose one value.
    pub fn intersect(&self, other: &Segment) -> Result<Self, RealError> {
        let lower = std::cmp::max(&self.lower, &other.lower).clone();
        let upper = std::cmp::min(&self.upper, &other.upper).clone();
        Self::new_checked(lower, upper)
    }

    /// Smallest segment covering every segment in `segments`.
    pub fn hull<'a>(segments: impl IntoIterator<Item = &'a Segment>) -> Option<Self> {
        segments.into_iter().fold(None, |acc: Option<Segment>, next| {
            Some(match acc {
                None => next.clone(),
                Some(acc) => Self {
                    lower: std::cmp::min(&acc.lower, &next.lower).clone(),
                    upper: std::cmp::max(&acc.upper, &next.upper).clone(),
                },
            })
        })
    }

    pub fn contains_zero(&self) -> bool {
        !self.lower.is_positive() && !self.upper.is_negative()
    }
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {}]", self.lower, self.upper)
    }
}
