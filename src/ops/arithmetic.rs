//! Arithmetic on real numbers.
//!
//! Exact operands are combined exactly. Otherwise the result is a lazy limit
//! over the corners of the operand segments, with shortcuts for the neutral
//! and absorbing elements.

use std::ops::{Add, Mul, Neg, Sub};

use num_traits::{One, Zero};

use crate::error::RealError;
use crate::interval::Segment;
use crate::ops::limit::{lazy_binary, lazy_unary};
use crate::rational::Rational;
use crate::real::Real;

fn is_minus_one(value: &Rational) -> bool {
    value.is_negative() && value.abs().is_one()
}

fn add(a: &Real, b: &Real) -> Real {
    match (a.as_exact(), b.as_exact()) {
        (Some(x), Some(y)) => Real::exact(x + y),
        (Some(x), None) if x.is_zero() => b.clone(),
        (None, Some(y)) if y.is_zero() => a.clone(),
        _ => lazy_binary(a, b, |x, y| Ok(Real::exact(x + y)), None),
    }
}

fn sub(a: &Real, b: &Real) -> Real {
    match (a.as_exact(), b.as_exact()) {
        (Some(x), Some(y)) => Real::exact(x - y),
        (Some(x), None) if x.is_zero() => neg(b),
        (None, Some(y)) if y.is_zero() => a.clone(),
        _ => lazy_binary(a, b, |x, y| Ok(Real::exact(x - y)), None),
    }
}

fn mul(a: &Real, b: &Real) -> Real {
    match (a.as_exact(), b.as_exact()) {
        (Some(x), Some(y)) => Real::exact(x * y),
        (Some(x), _) | (_, Some(x)) if x.is_zero() => Real::zero(),
        (Some(x), None) if x.is_one() => b.clone(),
        (None, Some(y)) if y.is_one() => a.clone(),
        (Some(x), None) if is_minus_one(x) => neg(b),
        (None, Some(y)) if is_minus_one(y) => neg(a),
        _ => lazy_binary(a, b, |x, y| Ok(Real::exact(x * y)), None),
    }
}

fn neg(a: &Real) -> Real {
    match a.as_exact() {
        Some(x) => Real::exact(-x),
        None => lazy_unary(a, |x| Ok(Real::exact(-x))),
    }
}

/// `x / y` is monotonic in `y` only while `y` keeps one sign.
fn divisor_excludes_zero(_dividend: &Segment, divisor: &Segment) -> bool {
    !divisor.contains_zero()
}

macro_rules! forward_real_binop {
    ($Trait:ident, $method:ident, $impl_fn:ident) => {
        impl $Trait<&Real> for &Real {
            type Output = Real;

            fn $method(self, rhs: &Real) -> Real {
                $impl_fn(self, rhs)
            }
        }

        impl $Trait<Real> for &Real {
            type Output = Real;

            fn $method(self, rhs: Real) -> Real {
                $impl_fn(self, &rhs)
            }
        }

        impl $Trait<&Real> for Real {
            type Output = Real;

            fn $method(self, rhs: &Real) -> Real {
                $impl_fn(&self, rhs)
            }
        }

        impl $Trait<Real> for Real {
            type Output = Real;

            fn $method(self, rhs: Real) -> Real {
                $impl_fn(&self, &rhs)
            }
        }
    };
}

forward_real_binop!(Add, add, add);
forward_real_binop!(Sub, sub, sub);
forward_real_binop!(Mul, mul, mul);

impl Neg for Real {
    type Output = Real;

    fn neg(self) -> Real {
        neg(&self)
    }
}

impl Neg for &Real {
    type Output = Real;

    fn neg(self) -> Real {
        neg(self)
    }
}

impl Real {
    /// `self / divisor`.
    ///
    /// Dividing by the exact zero fails immediately. A lazy divisor that is
    /// truly zero never produces a segment, since its segments never exclude 0.
    pub fn checked_div(&self, divisor: &Real) -> Result<Real, RealError> {
        match (self.as_exact(), divisor.as_exact()) {
            (_, Some(y)) if y.is_zero() => Err(RealError::DivisionByZero),
            (Some(x), Some(y)) => Ok(Real::exact(x.checked_div(y)?)),
            (Some(x), None) if x.is_zero() => Ok(Real::zero()),
            (None, Some(y)) if y.is_one() => Ok(self.clone()),
            _ => Ok(lazy_binary(
                self,
                divisor,
                |x, y| Ok(Real::exact(x.checked_div(y)?)),
                Some(divisor_excludes_zero),
            )),
        }
    }

    /// `1 / self`.
    pub fn recip(&self) -> Result<Real, RealError> {
        Real::one().checked_div(self)
    }

    pub fn square(&self) -> Real {
        self * self
    }

    /// Integer power by repeated squaring. A negative exponent inverts the
    /// positive power, so `0^-n` is a division by zero.
    pub fn pow(&self, exponent: i64) -> Result<Real, RealError> {
        if let Some(value) = self.as_exact() {
            return value.pow(exponent).map(Real::exact);
        }
        match exponent {
            0 => Ok(Real::one()),
            1 => Ok(self.clone()),
            n if n < 0 => {
                let positive = n.checked_neg().ok_or(RealError::ExponentOverflow)?;
                self.pow(positive)?.recip()
            }
            n if n % 2 == 0 => self.square().pow(n / 2),
            n => Ok(self * self.pow(n - 1)?),
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::expect_used, clippy::panic)]

    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    use super::*;
    use crate::cache::{EvaluationCache, SharedCache};
    use crate::test_utils::{assert_close, assert_nested, first_segments, halving_real, int, rat, real};

    #[test]
    fn exact_arithmetic_stays_exact() {
        let a = real(1, 3);
        let b = real(1, 6);
        assert_eq!((&a + &b).as_exact(), Some(&rat(1, 2)));
        assert_eq!((&a - &b).as_exact(), Some(&rat(1, 6)));
        assert_eq!((&a * &b).as_exact(), Some(&rat(1, 18)));
        assert_eq!((-a.clone()).as_exact(), Some(&rat(-1, 3)));
        assert_eq!(a.checked_div(&b).expect("div").as_exact(), Some(&int(2)));
    }

    #[test]
    fn neutral_elements_return_the_other_operand() {
        let x = halving_real(int(5));
        assert_eq!((&x + &Real::zero()).id(), x.id());
        assert_eq!((&Real::one() * &x).id(), x.id());
        assert_eq!((&x - &Real::zero()).id(), x.id());
        assert_eq!((&x * &Real::zero()).as_exact(), Some(&int(0)));
        assert_eq!(x.checked_div(&Real::one()).expect("div").id(), x.id());
    }

    #[test]
    fn lazy_arithmetic_converges() {
        let cache = SharedCache::new();
        let x = halving_real(rat(3, 2));
        let y = halving_real(rat(-2, 5));
        assert_close(&cache, &(&x + &y), &rat(11, 10), 20);
        assert_close(&cache, &(&x - &y), &rat(19, 10), 20);
        assert_close(&cache, &(&x * &y), &rat(-3, 5), 20);
        assert_close(&cache, &(-&x), &rat(-3, 2), 20);
        assert_close(&cache, &(&Real::from(int(-1)) * &y), &rat(2, 5), 20);
        assert_close(&cache, &x.checked_div(&y).expect("div"), &rat(-15, 4), 20);
    }

    #[test]
    fn consecutive_segments_of_expressions_are_nested() {
        let cache = SharedCache::new();
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..10 {
            let a = halving_real(rat(rng.gen_range(-50..50), rng.gen_range(1..20)));
            let b = halving_real(rat(rng.gen_range(1..50), rng.gen_range(1..20)));
            let expression = (&a * &b - &a).checked_div(&b).expect("div");
            assert_nested(&first_segments(&cache, &expression, 10));
        }
    }

    #[test]
    fn division_by_exact_zero_fails_eagerly() {
        let x = halving_real(int(1));
        assert_eq!(x.checked_div(&Real::zero()).err(), Some(RealError::DivisionByZero));
        assert_eq!(Real::zero().recip().err(), Some(RealError::DivisionByZero));
        assert_eq!(Real::zero().pow(-1).err(), Some(RealError::DivisionByZero));
    }

    #[test]
    fn division_waits_until_divisor_excludes_zero() {
        let cache = SharedCache::new();
        // The divisor's segments contain zero until [1/8, 3/8].
        let divisor = halving_real(rat(1, 4));
        let quotient = Real::one().checked_div(&divisor).expect("lazy");
        let first = cache
            .observe(&quotient)
            .next()
            .expect("segment")
            .expect("no error");
        assert!(!first.contains_zero());
        assert!(first.contains(&int(4)));
        assert_close(&cache, &quotient, &int(4), 12);
    }

    #[test]
    fn integer_powers() {
        let cache = SharedCache::new();
        let x = halving_real(rat(-3, 2));
        assert_close(&cache, &x.pow(5).expect("pow"), &rat(-243, 32), 16);
        assert_close(&cache, &x.pow(4).expect("pow"), &rat(81, 16), 16);
        assert_close(&cache, &x.pow(-3).expect("pow"), &rat(-8, 27), 16);
        assert_eq!(x.pow(0).expect("pow").as_exact(), Some(&int(1)));
        assert_eq!(real(2, 3).pow(-2).expect("pow").as_exact(), Some(&rat(9, 4)));
        assert_close(&cache, &x.square(), &rat(9, 4), 16);
    }

    #[test]
    fn minimal_exponent_does_not_overflow_silently() {
        let x = halving_real(int(1));
        assert_eq!(x.pow(i64::MIN).err(), Some(RealError::ExponentOverflow));
    }
}
