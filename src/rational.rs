//! Exact rational numbers.
//!
//! `Rational` wraps `num_rational::BigRational` and keeps it canonical: the
//! fraction is always reduced and its denominator is positive. Construction
//! from a numerator and denominator is checked so a zero denominator is an
//! error rather than a panic inside the big-number library.

use std::fmt;
use std::ops::{Add, Mul, Neg, Sub};

use num_bigint::{BigInt, Sign};
use num_rational::BigRational;
use num_traits::{One, Signed, ToPrimitive, Zero};

use crate::error::RealError;

mod digits;
mod format;

pub use digits::{DigitSequence, FractionDigits};
pub use format::{ParseRationalError, RationalFormat};

/// Canonical fraction with `gcd(numerator, denominator) = 1` and a positive denominator.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Rational(BigRational);

impl Rational {
    /// Creates a reduced fraction, failing on a zero denominator.
    pub fn new(
        numerator: impl Into<BigInt>,
        denominator: impl Into<BigInt>,
    ) -> Result<Self, RealError> {
        let denominator = denominator.into();
        if denominator.is_zero() {
            return Err(RealError::ZeroDenominator);
        }
        Ok(Self(BigRational::new(numerator.into(), denominator)))
    }

    pub fn from_integer(value: impl Into<BigInt>) -> Self {
        Self(BigRational::from_integer(value.into()))
    }

    /// Builds a fraction whose denominator is known to be non-zero.
    pub(crate) fn from_parts(numerator: BigInt, denominator: BigInt) -> Self {
        debug_assert!(!denominator.is_zero(), "denominator must be non-zero");
        Self(BigRational::new(numerator, denominator))
    }

    /// `1 / 2^exponent`.
    pub(crate) fn power_of_half(exponent: u32) -> Self {
        Self(BigRational::new_raw(
            BigInt::one(),
            BigInt::from(2u32).pow(exponent),
        ))
    }

    pub fn numerator(&self) -> &BigInt {
        self.0.numer()
    }

    pub fn denominator(&self) -> &BigInt {
        self.0.denom()
    }

    pub fn is_integer(&self) -> bool {
        self.0.is_integer()
    }

    pub fn is_positive(&self) -> bool {
        self.0.is_positive()
    }

    pub fn is_negative(&self) -> bool {
        self.0.is_negative()
    }

    pub fn sign(&self) -> Sign {
        self.0.numer().sign()
    }

    pub fn abs(&self) -> Self {
        Self(self.0.abs())
    }

    pub fn half(&self) -> Self {
        Self::from_parts(self.numerator().clone(), self.denominator() * 2u32)
    }

    /// Arithmetic mean of `self` and `other`.
    pub fn midpoint(&self, other: &Self) -> Self {
        (self + other).half()
    }

    pub fn checked_div(&self, other: &Self) -> Result<Self, RealError> {
        if other.is_zero() {
            return Err(RealError::DivisionByZero);
        }
        Ok(Self(&self.0 / &other.0))
    }

    pub fn recip(&self) -> Result<Self, RealError> {
        if self.is_zero() {
            return Err(RealError::DivisionByZero);
        }
        Ok(Self(self.0.recip()))
    }

    /// Integer power. A negative exponent inverts first, so `0^-n` is a division by zero.
    pub fn pow(&self, exponent: i64) -> Result<Self, RealError> {
        let magnitude =
            u32::try_from(exponent.unsigned_abs()).map_err(|_| RealError::ExponentOverflow)?;
        if exponent < 0 {
            return Ok(self.recip()?.pow_u32(magnitude));
        }
        Ok(self.pow_u32(magnitude))
    }

    /// Non-negative integer power; `0^0 = 1`.
    pub(crate) fn pow_u32(&self, exponent: u32) -> Self {
        match exponent {
            0 => Self::one(),
            1 => self.clone(),
            _ => Self(BigRational::new_raw(
                self.numerator().pow(exponent),
                self.denominator().pow(exponent),
            )),
        }
    }

    /// Largest integer `<= self`.
    pub fn floor(&self) -> BigInt {
        self.0.floor().to_integer()
    }

    /// Smallest integer `>= self`.
    pub fn ceil(&self) -> BigInt {
        self.0.ceil().to_integer()
    }

    /// Integer part, rounded toward zero.
    pub fn trunc(&self) -> BigInt {
        self.0.to_integer()
    }

    /// `self - trunc(self)`, carrying the sign of `self`.
    pub fn fract(&self) -> Self {
        Self(self.0.fract())
    }

    /// `floor(self / other)`.
    pub fn div_floor(&self, other: &Self) -> Result<BigInt, RealError> {
        Ok(self.checked_div(other)?.floor())
    }

    /// `self - other * floor(self / other)`; the result has the sign of `other`.
    pub fn mod_floor(&self, other: &Self) -> Result<Self, RealError> {
        let quotient = Self::from_integer(self.div_floor(other)?);
        Ok(self - &(other * &quotient))
    }

    /// Nearest `f64`, for diagnostics only.
    pub fn to_f64(&self) -> Option<f64> {
        self.0.to_f64()
    }
}

impl Zero for Rational {
    fn zero() -> Self {
        Self(BigRational::zero())
    }

    fn is_zero(&self) -> bool {
        self.0.is_zero()
    }
}

impl One for Rational {
    fn one() -> Self {
        Self(BigRational::one())
    }
}

macro_rules! forward_binop {
    ($Trait:ident, $method:ident, $op:tt) => {
        impl $Trait<&Rational> for &Rational {
            type Output = Rational;

            fn $method(self, rhs: &Rational) -> Rational {
                Rational(&self.0 $op &rhs.0)
            }
        }

        impl $Trait<Rational> for &Rational {
            type Output = Rational;

            fn $method(self, rhs: Rational) -> Rational {
                Rational(&self.0 $op rhs.0)
            }
        }

        impl $Trait<&Rational> for Rational {
            type Output = Rational;

            fn $method(self, rhs: &Rational) -> Rational {
                Rational(self.0 $op &rhs.0)
            }
        }

        impl $Trait<Rational> for Rational {
            type Output = Rational;

            fn $method(self, rhs: Rational) -> Rational {
                Rational(self.0 $op rhs.0)
            }
        }
    };
}

forward_binop!(Add, add, +);
forward_binop!(Sub, sub, -);
forward_binop!(Mul, mul, *);

impl Neg for Rational {
    type Output = Rational;

    fn neg(self) -> Rational {
        Rational(-self.0)
    }
}

impl Neg for &Rational {
    type Output = Rational;

    fn neg(self) -> Rational {
        Rational(-&self.0)
    }
}

impl From<BigInt> for Rational {
    fn from(value: BigInt) -> Self {
        Self::from_integer(value)
    }
}

macro_rules! from_primitive {
    ($($t:ty),*) => {
        $(
            impl From<$t> for Rational {
                fn from(value: $t) -> Self {
                    Self::from_integer(BigInt::from(value))
                }
            }
        )*
    };
}

from_primitive!(i32, i64, u32, u64, usize);

impl fmt::Display for Rational {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_integer() {
            write!(f, "{}", self.numerator())
        } else {
            write!(f, "{}/{}", self.numerator(), self.denominator())
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::expect_used, clippy::panic)]

    use rand::rngs::StdRng;
    use rand::SeedableRng;

    use super::*;
    use crate::test_utils::{int, random_big_rational, rat};

    #[test]
    fn construction_reduces_and_normalizes_sign() {
        let value = Rational::new(6, -4).expect("non-zero denominator");
        assert_eq!(value.numerator(), &BigInt::from(-3));
        assert_eq!(value.denominator(), &BigInt::from(2));
    }

    #[test]
    fn zero_denominator_is_rejected() {
        assert_eq!(Rational::new(1, 0), Err(RealError::ZeroDenominator));
    }

    #[test]
    fn scaled_fractions_share_canonical_form() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..50 {
            let base = random_big_rational(&mut rng, 24);
            let scale = random_big_rational(&mut rng, 8).numerator().clone();
            if scale.is_zero() {
                continue;
            }
            let scaled = Rational::new(
                base.numerator() * &scale,
                base.denominator() * &scale,
            )
            .expect("scale is non-zero");
            assert_eq!(scaled, base);
            assert_eq!(scaled.numerator(), base.numerator());
            assert!(scaled.denominator().is_positive());
        }
    }

    #[test]
    fn ring_laws_hold_for_large_fractions() {
        let mut rng = StdRng::seed_from_u64(11);
        for _ in 0..40 {
            // 24 limbs of 32 bits is roughly 230 decimal digits.
            let a = random_big_rational(&mut rng, 24);
            let b = random_big_rational(&mut rng, 24);
            let c = random_big_rational(&mut rng, 24);

            assert_eq!(&a + &b, &b + &a);
            assert_eq!(&a * &b, &b * &a);
            assert_eq!(&(&a + &b) + &c, &a + &(&b + &c));
            assert_eq!(&(&a * &b) * &c, &a * &(&b * &c));
            assert_eq!(&a * &(&b + &c), &(&a * &b) + &(&a * &c));
            assert_eq!(&a + &Rational::zero(), a);
            assert_eq!(&a * &Rational::one(), a);
            assert!((&a + &(-&a)).is_zero());
            if !a.is_zero() {
                let inverse = a.recip().expect("non-zero");
                assert!((&a * &inverse).is_one());
            }
        }
    }

    #[test]
    fn division_by_zero_is_an_error() {
        assert_eq!(rat(1, 2).checked_div(&Rational::zero()), Err(RealError::DivisionByZero));
        assert_eq!(Rational::zero().recip(), Err(RealError::DivisionByZero));
        assert_eq!(Rational::zero().pow(-2), Err(RealError::DivisionByZero));
    }

    #[test]
    fn pow_handles_signs_and_inverses() {
        assert_eq!(rat(2, 3).pow(3).expect("pow"), rat(8, 27));
        assert_eq!(rat(-2, 3).pow(3).expect("pow"), rat(-8, 27));
        assert_eq!(rat(2, 3).pow(-2).expect("pow"), rat(9, 4));
        assert_eq!(Rational::zero().pow(0).expect("pow"), Rational::one());
        assert_eq!(int(-1).pow(-7).expect("pow"), int(-1));
    }

    #[test]
    fn floor_ceil_and_trunc_follow_their_directions() {
        let value = rat(-7, 2);
        assert_eq!(value.floor(), BigInt::from(-4));
        assert_eq!(value.ceil(), BigInt::from(-3));
        assert_eq!(value.trunc(), BigInt::from(-3));
        assert_eq!(value.fract(), rat(-1, 2));
        assert_eq!(int(5).floor(), BigInt::from(5));
        assert_eq!(int(5).ceil(), BigInt::from(5));
    }

    #[test]
    fn floor_division_and_modulo_agree() {
        let a = rat(-7, 2);
        let b = int(2);
        assert_eq!(a.div_floor(&b).expect("div"), BigInt::from(-2));
        assert_eq!(a.mod_floor(&b).expect("mod"), rat(1, 2));
        assert_eq!(rat(7, 3).mod_floor(&rat(-1, 2)).expect("mod"), rat(-1, 6));
    }

    #[test]
    fn display_omits_unit_denominator() {
        assert_eq!(rat(-3, 6).to_string(), "-1/2");
        assert_eq!(int(42).to_string(), "42");
    }

    #[test]
    fn midpoint_is_exact() {
        assert_eq!(rat(1, 3).midpoint(&rat(1, 2)), rat(5, 12));
        assert_eq!(Rational::power_of_half(3), rat(1, 8));
    }
}
