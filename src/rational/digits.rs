//! Positional digit expansion and rounding to a fixed number of fractional digits.

use num_bigint::{BigInt, Sign};
use num_integer::Integer;
use num_traits::{ToPrimitive, Zero};

use crate::error::RealError;
use crate::interval::Segment;
use crate::rational::Rational;

/// Sign, integer part and lazily produced fractional digits of a rational in some radix.
#[derive(Clone, Debug)]
pub struct DigitSequence {
    sign: Sign,
    integer_part: BigInt,
    fraction: FractionDigits,
}

impl DigitSequence {
    pub fn sign(&self) -> Sign {
        self.sign
    }

    /// Absolute value of the integer part.
    pub fn integer_part(&self) -> &BigInt {
        &self.integer_part
    }

    /// Integer digits, most significant first; `[0]` for a zero integer part.
    pub fn integer_digits(&self) -> Vec<u32> {
        let radix = self.fraction.radix;
        match self.integer_part.to_biguint() {
            Some(magnitude) if !magnitude.is_zero() => magnitude
                .to_radix_be(radix)
                .into_iter()
                .map(u32::from)
                .collect(),
            _ => vec![0],
        }
    }

    pub fn fraction(&self) -> FractionDigits {
        self.fraction.clone()
    }

    pub fn into_fraction(self) -> FractionDigits {
        self.fraction
    }
}

/// Fractional digits by long division. The stream ends once the remainder is
/// exhausted, so terminating expansions carry no trailing zero digit.
#[derive(Clone, Debug)]
pub struct FractionDigits {
    remainder: BigInt,
    denominator: BigInt,
    radix: u32,
}

impl Iterator for FractionDigits {
    type Item = u32;

    fn next(&mut self) -> Option<u32> {
        if self.remainder.is_zero() {
            return None;
        }
        let scaled = &self.remainder * self.radix;
        let (digit, remainder) = scaled.div_rem(&self.denominator);
        self.remainder = remainder;
        digit.to_u32()
    }
}

/// Radixes 2 to 36, the range with a single-character digit alphabet.
pub(crate) fn check_radix(radix: u32) -> Result<(), RealError> {
    if !(2..=36).contains(&radix) {
        return Err(RealError::InvalidRadix { radix });
    }
    Ok(())
}

impl Rational {
    /// Expands `|self|` positionally in `radix` (2 to 36).
    pub fn digit_sequence(&self, radix: u32) -> Result<DigitSequence, RealError> {
        check_radix(radix)?;
        let magnitude = self.abs();
        Ok(DigitSequence {
            sign: self.sign(),
            integer_part: magnitude.trunc(),
            fraction: FractionDigits {
                remainder: magnitude.numerator() % magnitude.denominator(),
                denominator: magnitude.denominator().clone(),
                radix,
            },
        })
    }

    /// Walks the first `digits` fractional digits of `self` in `radix` and hands
    /// `proceed` the two neighbouring `digits`-digit fractions enclosing `self`
    /// together with the next digit. When the expansion ends within the
    /// requested digits the segment is the exact point and the next digit is 0.
    pub fn proceed_with_first_digits<R>(
        &self,
        radix: u32,
        digits: usize,
        proceed: impl FnOnce(Segment, u32) -> R,
    ) -> Result<R, RealError> {
        let sequence = self.digit_sequence(radix)?;
        let negative = self.is_negative();
        let signed = |value: Rational| if negative { -value } else { value };

        let base = Rational::from(radix);
        let mut result = Rational::from_integer(self.trunc());
        let mut unit = Rational::from(1u32);
        let mut fraction = sequence.into_fraction();
        for _ in 0..digits {
            let Some(digit) = fraction.next() else {
                return Ok(proceed(Segment::point(result), 0));
            };
            unit = unit.checked_div(&base)?;
            result = result + signed(&unit * &Rational::from(digit));
        }

        match fraction.next() {
            Some(next_digit) => {
                let neighbour = &result + &signed(unit);
                Ok(proceed(Segment::new(result, neighbour), next_digit))
            }
            None => Ok(proceed(Segment::point(result), 0)),
        }
    }

    /// Rounds to `digits` fractional digits. Non-negative values round up when
    /// `2 * next_digit >= radix`; negative values round toward zero when
    /// `2 * next_digit <= radix`, so `-1.5` rounds to `-1`.
    pub fn round_to(&self, radix: u32, digits: usize) -> Result<Rational, RealError> {
        let non_negative = !self.is_negative();
        self.proceed_with_first_digits(radix, digits, |segment, next_digit| {
            pick_rounded(segment, next_digit, radix, non_negative)
        })
    }

    /// Largest `digits`-digit fraction `<= self`.
    pub fn floor_to(&self, radix: u32, digits: usize) -> Result<Rational, RealError> {
        self.proceed_with_first_digits(radix, digits, |segment, _| segment.lower().clone())
    }

    /// Smallest `digits`-digit fraction `>= self`.
    pub fn ceiling_to(&self, radix: u32, digits: usize) -> Result<Rational, RealError> {
        self.proceed_with_first_digits(radix, digits, |segment, _| segment.upper().clone())
    }
}

pub(crate) fn pick_rounded(
    segment: Segment,
    next_digit: u32,
    radix: u32,
    non_negative: bool,
) -> Rational {
    let doubled = u64::from(next_digit) * 2;
    let radix = u64::from(radix);
    let take_upper = if non_negative {
        doubled >= radix
    } else {
        doubled <= radix
    };
    let (lower, upper) = segment.into_bounds();
    if take_upper {
        upper
    } else {
        lower
    }
}
