//! Roots, powers with fractional and real exponents, the exponential and logarithms.
//!
//! Everything here is built from the search engine and the limit
//! combinators. Domain violations fail before any search starts.

use std::cmp::Ordering;

use num_bigint::BigInt;
use num_traits::{One, ToPrimitive, Zero};

use crate::cache::EvaluationCache;
use crate::error::RealError;
use crate::interval::Interval;
use crate::ops::compare::RealComparator;
use crate::ops::constants::factorial;
use crate::ops::limit::{limit, step_exponent, sum};
use crate::rational::Rational;
use crate::real::Real;
use crate::search::{binary_search, search};

fn root_domain(index: u32) -> Interval {
    if index % 2 == 0 {
        Interval::at_least(Rational::zero())
    } else {
        Interval::whole_line()
    }
}

fn split_exponent(exponent: &Rational) -> Result<(i64, u32), RealError> {
    let numerator = exponent.numerator().to_i64().ok_or(RealError::ExponentOverflow)?;
    let denominator = exponent.denominator().to_u32().ok_or(RealError::ExponentOverflow)?;
    Ok((numerator, denominator))
}

impl Rational {
    /// The real `index`-th root. Even roots of negative numbers are a `DomainError`.
    pub fn root(&self, index: u32) -> Result<Real, RealError> {
        match index {
            0 => return Err(RealError::InvalidRootIndex),
            1 => return Ok(Real::exact(self.clone())),
            _ => {}
        }
        if index % 2 == 0 && self.is_negative() {
            return Err(RealError::DomainError);
        }
        binary_search(self, &root_domain(index), move |x| x.pow_u32(index))?
            .ok_or(RealError::DomainError)
    }

    /// `self^(p/q)` as `(self^p)^(1/q)`.
    pub fn pow_rational(&self, exponent: &Rational) -> Result<Real, RealError> {
        let (numerator, denominator) = split_exponent(exponent)?;
        self.pow(numerator)?.root(denominator)
    }
}

/// `e^x` as its Taylor series.
///
/// After the terms up to `x^n/n!` the tail is below `2|x|^(n+1)/(n+1)!` once
/// consecutive terms shrink by at least half, and below `2·3^⌈|x|⌉` before that.
pub fn exp_rational(x: &Rational) -> Real {
    if x.is_zero() {
        return Real::one();
    }
    let step = x.clone();
    let terms = (1u32..).scan(Rational::one(), move |term, n| {
        let current = term.clone();
        *term = &*term * &step * Rational::from_parts(BigInt::one(), BigInt::from(n));
        Some(current)
    });

    let magnitude = x.abs();
    sum(terms, move |n| {
        let next = n.saturating_add(1);
        if Rational::from(next.saturating_add(1)) > &magnitude + &magnitude {
            let next = step_exponent(next)?;
            Ok(Rational::from(2u32)
                * magnitude.pow_u32(next)
                * Rational::from_parts(BigInt::one(), factorial(next)))
        } else {
            let whole = magnitude.ceil().to_u32().ok_or(RealError::ExponentOverflow)?;
            Ok(Rational::from(2u32) * Rational::from(3u32).pow_u32(whole))
        }
    })
}

impl Real {
    /// `index`-th root. Even roots need a non-negative value, checked with `comparator`.
    pub fn root<C>(
        &self,
        cache: &dyn EvaluationCache,
        comparator: &C,
        index: u32,
    ) -> Result<Real, RealError>
    where
        C: RealComparator + Clone + 'static,
    {
        match index {
            0 => return Err(RealError::InvalidRootIndex),
            1 => return Ok(self.clone()),
            _ => {}
        }
        if let Some(value) = self.as_exact() {
            return value.root(index);
        }
        if index % 2 == 0 && self.sign(cache, comparator)? == Ordering::Less {
            return Err(RealError::DomainError);
        }
        search(cache, comparator.clone(), self, &root_domain(index), move |x| {
            Ok(Real::exact(x.pow_u32(index)))
        })?
        .ok_or(RealError::DomainError)
    }

    /// `self^(p/q)` as `(self^p)^(1/q)`.
    pub fn pow_rational<C>(
        &self,
        cache: &dyn EvaluationCache,
        comparator: &C,
        exponent: &Rational,
    ) -> Result<Real, RealError>
    where
        C: RealComparator + Clone + 'static,
    {
        let (numerator, denominator) = split_exponent(exponent)?;
        self.pow(numerator)?.root(cache, comparator, denominator)
    }

    /// `self^exponent` for a real exponent.
    ///
    /// A rational exponent goes through [`pow_rational`](Self::pow_rational).
    /// Otherwise both the base and the exponent must be non-negative, and the
    /// result is `exp(exponent · ln(self))`.
    pub fn pow_real<C>(
        &self,
        cache: &dyn EvaluationCache,
        comparator: &C,
        exponent: &Real,
    ) -> Result<Real, RealError>
    where
        C: RealComparator + Clone + 'static,
    {
        if let Some(exponent) = exponent.as_exact() {
            return self.pow_rational(cache, comparator, exponent);
        }
        if exponent.sign(cache, comparator)? == Ordering::Less {
            return Err(RealError::DomainError);
        }
        if self.as_exact().is_some_and(Zero::is_zero) {
            return Ok(Real::zero());
        }
        if self.sign(cache, comparator)? == Ordering::Less {
            return Err(RealError::DomainError);
        }
        (exponent * self.ln(cache, comparator)?).exp()
    }

    pub fn exp(&self) -> Result<Real, RealError> {
        limit(self, |x| Ok(exp_rational(x)))
    }

    /// Natural logarithm, the argument `t` with `e^t = self`. Needs `self > 0`.
    pub fn ln<C>(&self, cache: &dyn EvaluationCache, comparator: &C) -> Result<Real, RealError>
    where
        C: RealComparator + Clone + 'static,
    {
        if let Some(value) = self.as_exact() {
            if value.is_one() {
                return Ok(Real::zero());
            }
        }
        if self.sign(cache, comparator)? != Ordering::Greater {
            return Err(RealError::DomainError);
        }
        search(cache, comparator.clone(), self, &Interval::whole_line(), |t| {
            Ok(exp_rational(t))
        })?
        .ok_or(RealError::DomainError)
    }

    /// Logarithm to `base`, which must be positive and different from 1.
    pub fn log<C>(
        &self,
        cache: &dyn EvaluationCache,
        comparator: &C,
        base: &Real,
    ) -> Result<Real, RealError>
    where
        C: RealComparator + Clone + 'static,
    {
        if base.sign(cache, comparator)? != Ordering::Greater
            || comparator.compare(cache, base, &Real::one())? == Ordering::Equal
        {
            return Err(RealError::DomainError);
        }
        self.ln(cache, comparator)?.checked_div(&base.ln(cache, comparator)?)
    }
}
