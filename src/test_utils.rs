//! Shared test utilities for real number operations.
//!
//! This module provides common helper functions used across test modules to reduce
//! code duplication and provide a consistent testing interface.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use num_bigint::{BigInt, Sign};
use num_traits::Zero;
use rand::Rng;

use crate::cache::EvaluationCache;
use crate::interval::Segment;
use crate::rational::Rational;
use crate::real::Real;

/// Creates a Rational from numerator and denominator.
///
/// # Panics
/// Panics if `denominator` is zero.
pub fn rat(numerator: i64, denominator: i64) -> Rational {
    Rational::new(numerator, denominator).expect("test fractions have non-zero denominators")
}

/// Creates an integral Rational.
pub fn int(value: i64) -> Rational {
    Rational::from(value)
}

/// Creates an exact Real from numerator and denominator.
pub fn real(numerator: i64, denominator: i64) -> Real {
    Real::from(rat(numerator, denominator))
}

/// Random signed integer made of `limbs` random 32-bit limbs.
pub fn random_big_int<R: Rng>(rng: &mut R, limbs: usize) -> BigInt {
    let digits: Vec<u32> = (0..limbs).map(|_| rng.gen()).collect();
    let sign = if rng.gen_bool(0.5) { Sign::Minus } else { Sign::Plus };
    BigInt::from_slice(sign, &digits)
}

/// Random fraction whose numerator and denominator have `limbs` 32-bit limbs.
pub fn random_big_rational<R: Rng>(rng: &mut R, limbs: usize) -> Rational {
    let numerator = random_big_int(rng, limbs);
    let mut denominator = random_big_int(rng, limbs);
    if denominator.is_zero() {
        denominator = BigInt::from(1);
    }
    Rational::new(numerator, denominator).expect("denominator is non-zero")
}

/// A lazy real equal to `center` whose k-th segment has radius 2^-k.
///
/// The value is exact, but the sequence never collapses to a point, which
/// makes it a stand-in for an irrational operand.
pub fn halving_real(center: Rational) -> Real {
    Real::new(
        0u32,
        move |&k| {
            let radius = Rational::power_of_half(k);
            Ok(Segment::new(&center - &radius, &center + &radius))
        },
        |k| k + 1,
    )
}

/// A lazy zero whose k-th segment has diff 2^-k, counting how often a segment is computed.
pub fn counting_real() -> (Real, Arc<AtomicUsize>) {
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&calls);
    let value = Real::new(
        0u32,
        move |&k| {
            counter.fetch_add(1, Ordering::SeqCst);
            let radius = Rational::power_of_half(k + 1);
            Ok(Segment::new(-radius.clone(), radius))
        },
        |k| k + 1,
    );
    (value, calls)
}

/// Asserts that every segment lies inside its predecessor.
///
/// # Panics
/// Panics on the first pair that is not nested.
pub fn assert_nested(segments: &[Segment]) {
    for pair in segments.windows(2) {
        assert!(
            pair[0].contains_segment(&pair[1]),
            "{} does not contain {}",
            pair[0],
            pair[1]
        );
        assert!(pair[1].diff() <= pair[0].diff());
    }
}

/// Observes `number` to `bits` binary digits and asserts it is within that distance of `expected`.
///
/// # Panics
/// Panics if the observation fails or the segment does not contain a point near `expected`.
pub fn assert_close(cache: &dyn EvaluationCache, number: &Real, expected: &Rational, bits: u32) {
    let delta = Rational::power_of_half(bits);
    let segment = cache
        .observe_to(number, &delta)
        .expect("observation should succeed");
    let widened = segment.widen(&delta);
    assert!(
        widened.contains(expected),
        "{segment} is not within 2^-{bits} of {expected}"
    );
}

/// Collects the first `count` segments of `number`.
///
/// # Panics
/// Panics if the sequence fails before `count` segments.
pub fn first_segments(cache: &dyn EvaluationCache, number: &Real, count: usize) -> Vec<Segment> {
    cache
        .observe(number)
        .take(count)
        .collect::<Result<_, _>>()
        .expect("segments should be produced")
}
