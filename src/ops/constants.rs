//! Mathematical constants defined as series.
//!
//! Each constant is built once per process, so every call returns a clone of
//! the same number and a cache evaluates it only once.

use std::sync::OnceLock;

use num_bigint::BigInt;
use num_traits::One;

use crate::ops::limit::{step_exponent, sum};
use crate::rational::Rational;
use crate::real::Real;

static E: OnceLock<Real> = OnceLock::new();
static PI: OnceLock<Real> = OnceLock::new();

/// `n!`.
pub fn factorial(n: u32) -> BigInt {
    (2..=n).fold(BigInt::one(), |product, k| product * k)
}

/// Euler's number, `Σ 1/n!`.
pub fn e() -> Real {
    E.get_or_init(|| {
        let terms = (0u32..).map(|n| Rational::from_parts(BigInt::one(), factorial(n)));
        // The tail after 1/n! is below 1/(n * n!).
        sum(terms, |n| {
            if n == 0 {
                return Ok(Rational::from(2u32));
            }
            let n = step_exponent(n)?;
            Ok(Rational::from_parts(BigInt::one(), factorial(n) * n))
        })
    })
    .clone()
}

/// π by Machin's formula, `16·atan(1/5) - 4·atan(1/239)`.
pub fn pi() -> Real {
    PI.get_or_init(|| {
        let fifth = Rational::from_parts(BigInt::one(), BigInt::from(5u32));
        let small = Rational::from_parts(BigInt::one(), BigInt::from(239u32));
        let terms = {
            let (fifth, small) = (fifth.clone(), small.clone());
            (0u32..).map(move |n| {
                let power = 2 * n + 1;
                let scale = Rational::from_parts(BigInt::one(), BigInt::from(power));
                let term = Rational::from(16u32) * fifth.pow_u32(power) - Rational::from(4u32) * small.pow_u32(power);
                let term = term * scale;
                if n % 2 == 0 {
                    term
                } else {
                    -term
                }
            })
        };
        // An alternating arctangent series is off by at most its first omitted term.
        sum(terms, move |n| {
            let power = step_exponent(n.saturating_mul(2).saturating_add(3))?;
            let scale = Rational::from_parts(BigInt::one(), BigInt::from(power));
            Ok((Rational::from(16u32) * fifth.pow_u32(power) + Rational::from(4u32) * small.pow_u32(power)) * scale)
        })
    })
    .clone()
}
