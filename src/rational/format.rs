//! Textual forms of rationals: `7/2`, `3 1/2`, `3.5`, `3,5` and periodic `0.(3)`.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use num_bigint::BigInt;
use num_integer::Integer;
use num_traits::{One, Zero};

use crate::error::RealError;
use crate::rational::digits::check_radix;
use crate::rational::Rational;
use crate::DEFAULT_RADIX;

/// How [`Rational::to_string_in`] renders a value.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RationalFormat {
    /// `numerator/denominator`, e.g. `-7/2`.
    Division,
    /// Integer part followed by a proper fraction, e.g. `-3 1/2`.
    Mixed,
    /// Exact decimal with a dot separator and periodic part in parentheses.
    Dot,
    /// Same as `Dot` with a comma separator.
    Comma,
}

impl Rational {
    /// Renders the exact value in the given textual form.
    pub fn to_string_in(&self, format: RationalFormat) -> String {
        match format {
            RationalFormat::Division => self.to_string(),
            RationalFormat::Mixed => mixed(self),
            RationalFormat::Dot => positional(self, '.'),
            RationalFormat::Comma => positional(self, ','),
        }
    }

    /// Renders the integer part and exactly `digits` fractional digits in
    /// `radix`, truncating toward zero. Pair with `round_to` and friends to
    /// print a rounded value.
    pub fn to_fixed_string(&self, radix: u32, digits: usize) -> Result<String, RealError> {
        let sequence = self.digit_sequence(radix)?;
        let mut out = String::new();
        if self.is_negative() {
            out.push('-');
        }
        for digit in sequence.integer_digits() {
            out.push(digit_char(digit, radix)?);
        }
        if digits > 0 {
            out.push('.');
            let mut fraction = sequence.into_fraction();
            for _ in 0..digits {
                out.push(digit_char(fraction.next().unwrap_or(0), radix)?);
            }
        }
        Ok(out)
    }
}

fn digit_char(digit: u32, radix: u32) -> Result<char, RealError> {
    check_radix(radix)?;
    char::from_digit(digit, radix).ok_or(RealError::InvalidRadix { radix })
}

fn mixed(value: &Rational) -> String {
    let whole = value.trunc();
    let rest = value.fract().abs();
    if rest.is_zero() {
        return whole.to_string();
    }
    if whole.is_zero() {
        return value.to_string();
    }
    format!("{whole} {rest}")
}

fn positional(value: &Rational, separator: char) -> String {
    let magnitude = value.abs();
    let denominator = magnitude.denominator();
    let mut out = String::new();
    if value.is_negative() {
        out.push('-');
    }
    out.push_str(&magnitude.trunc().to_string());

    let mut remainder = magnitude.numerator() % denominator;
    if remainder.is_zero() {
        return out;
    }
    out.push(separator);

    let mut digits = String::new();
    let mut positions: HashMap<BigInt, usize> = HashMap::new();
    while !remainder.is_zero() {
        if let Some(&start) = positions.get(&remainder) {
            out.push_str(&digits[..start]);
            out.push('(');
            out.push_str(&digits[start..]);
            out.push(')');
            return out;
        }
        positions.insert(remainder.clone(), digits.len());
        let (digit, next) = (&remainder * DEFAULT_RADIX).div_rem(denominator);
        digits.push_str(&digit.to_string());
        remainder = next;
    }
    out.push_str(&digits);
    out
}

/// Error returned when parsing a [`Rational`] from text fails.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ParseRationalError {
    input: String,
}

impl ParseRationalError {
    fn new(input: &str) -> Self {
        Self {
            input: input.to_string(),
        }
    }
}

impl fmt::Display for ParseRationalError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid rational literal `{}`", self.input)
    }
}

impl std::error::Error for ParseRationalError {}

impl FromStr for Rational {
    type Err = ParseRationalError;

    /// Accepts `42`, `-7/2`, `-3 1/2`, `3.25`, `3,25` and `0.1(6)`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let text = s.trim();
        let parsed = if let Some((whole, fraction)) = text.split_once(' ') {
            parse_mixed(whole, fraction.trim())
        } else if let Some((numerator, denominator)) = text.split_once('/') {
            parse_fraction(numerator, denominator)
        } else if text.contains(['.', ',']) {
            parse_positional(text)
        } else {
            parse_integer(text).map(Rational::from_integer)
        };
        parsed.ok_or_else(|| ParseRationalError::new(s))
    }
}

fn parse_integer(text: &str) -> Option<BigInt> {
    let digits = text.strip_prefix(['-', '+']).unwrap_or(text);
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    text.parse().ok()
}

/// Non-empty unsigned digit run.
fn parse_digits(text: &str) -> Option<BigInt> {
    if text.is_empty() || !text.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    text.parse().ok()
}

/// Like [`parse_digits`], but an omitted run reads as zero.
fn parse_optional_digits(text: &str) -> Option<BigInt> {
    if text.is_empty() {
        return Some(BigInt::zero());
    }
    parse_digits(text)
}

fn parse_fraction(numerator: &str, denominator: &str) -> Option<Rational> {
    let numerator = parse_integer(numerator.trim())?;
    let denominator = parse_integer(denominator.trim())?;
    Rational::new(numerator, denominator).ok()
}

fn parse_mixed(whole: &str, fraction: &str) -> Option<Rational> {
    let whole_value = parse_integer(whole)?;
    let (numerator, denominator) = fraction.split_once('/')?;
    let numerator = parse_digits(numerator)?;
    let denominator = parse_digits(denominator)?;
    let rest = Rational::new(numerator, denominator).ok()?;
    let whole_value = Rational::from_integer(whole_value);
    if whole.starts_with('-') {
        Some(whole_value - rest)
    } else {
        Some(whole_value + rest)
    }
}

fn parse_positional(text: &str) -> Option<Rational> {
    let (negative, unsigned) = match text.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, text.strip_prefix('+').unwrap_or(text)),
    };
    let (whole, fraction) = unsigned.split_once(['.', ','])?;
    let (fixed, period) = match fraction.split_once('(') {
        Some((fixed, period)) => (fixed, Some(period.strip_suffix(')')?)),
        None => (fraction, None),
    };
    // `.5` and `5.` are fine, a bare separator is not.
    if whole.is_empty() && fixed.is_empty() && period.is_none() {
        return None;
    }

    let ten = BigInt::from(DEFAULT_RADIX);
    let fixed_scale = pow_len(&ten, fixed.len())?;
    let mut value = Rational::from_integer(parse_optional_digits(whole)?)
        + Rational::new(parse_optional_digits(fixed)?, fixed_scale.clone()).ok()?;
    if let Some(period) = period {
        if period.is_empty() {
            return None;
        }
        let period_scale = pow_len(&ten, period.len())? - BigInt::one();
        value = value + Rational::new(parse_digits(period)?, period_scale * fixed_scale).ok()?;
    }
    Some(if negative { -value } else { value })
}

fn pow_len(base: &BigInt, len: usize) -> Option<BigInt> {
    Some(base.pow(u32::try_from(len).ok()?))
}
