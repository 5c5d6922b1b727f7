#![allow(dead_code)]

use exact_real::{Rational, Real};

/// Whether to print achieved precision before timing, from `BENCH_VERBOSE`.
pub fn verbose() -> bool {
    std::env::var("BENCH_VERBOSE").is_ok_and(|value| !value.is_empty() && value != "0")
}

/// 2^-bits.
pub fn power_of_half(bits: u32) -> Rational {
    Rational::new(1, num_bigint::BigInt::from(2u32).pow(bits)).expect("power of two is non-zero")
}

/// Sums terms pairwise so the result is a shallow tree of additions.
pub fn balanced_sum(mut values: Vec<Real>) -> Real {
    if values.is_empty() {
        return Real::zero();
    }

    while values.len() > 1 {
        let mut next = Vec::with_capacity(values.len().div_ceil(2));
        let mut iter = values.into_iter();
        while let Some(left) = iter.next() {
            if let Some(right) = iter.next() {
                next.push(left + right);
            } else {
                next.push(left);
            }
        }
        values = next;
    }

    values
        .pop()
        .expect("values should contain at least one element")
}
