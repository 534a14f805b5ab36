//! Exact Fractions

use std::cmp::Ordering;
use std::iter::Sum;
use std::ops::{Add, Mul, Neg, Sub};

use num_traits::ToPrimitive;
use rust_decimal::Decimal;

/// An exact numerator/denominator fraction for proportional discount math.
///
/// Splitting a whole-cart discount across items chains divisions and
/// multiplications of the form `(weight / total) * amount`. Performed on a
/// fixed-point type those chains drift; performed on `Rational` the per-item
/// shares sum back to the aggregate exactly. Conversion to [`Decimal`]
/// happens only at the output boundary via [`Rational::to_decimal`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Rational {
    num: i128,
    den: i128,
}

/// Greatest common divisor of two magnitudes.
const fn gcd(mut a: u128, mut b: u128) -> u128 {
    while b != 0 {
        let r = a % b;
        a = b;
        b = r;
    }
    a
}

impl Rational {
    /// The additive identity.
    pub const ZERO: Self = Self { num: 0, den: 1 };

    /// The multiplicative identity.
    pub const ONE: Self = Self { num: 1, den: 1 };

    /// Builds a reduced fraction, or `None` when `den` is zero.
    #[must_use]
    pub fn new(num: i128, den: i128) -> Option<Self> {
        if den == 0 {
            return None;
        }
        Some(Self::reduced(num, den))
    }

    /// Builds a whole-number fraction.
    #[must_use]
    pub const fn from_integer(num: i128) -> Self {
        Self { num, den: 1 }
    }

    /// Reduces `num / den` to lowest terms with a positive denominator.
    /// Callers guarantee `den != 0`.
    fn reduced(num: i128, den: i128) -> Self {
        if num == 0 {
            return Self::ZERO;
        }
        #[expect(
            clippy::cast_possible_wrap,
            reason = "the gcd never exceeds the magnitude of its nonzero i128 inputs"
        )]
        let g = gcd(num.unsigned_abs(), den.unsigned_abs()) as i128;
        let (num, den) = (num / g, den / g);
        if den < 0 {
            Self { num: -num, den: -den }
        } else {
            Self { num, den }
        }
    }

    /// Whether the fraction is exactly zero.
    #[must_use]
    pub const fn is_zero(self) -> bool {
        self.num == 0
    }

    /// Whether the fraction is strictly greater than zero.
    #[must_use]
    pub const fn is_positive(self) -> bool {
        self.num > 0
    }

    /// Divides by `rhs`, or `None` when `rhs` is zero.
    #[must_use]
    pub fn checked_div(self, rhs: Self) -> Option<Self> {
        if rhs.is_zero() {
            return None;
        }
        Some(self * Self::reduced(rhs.den, rhs.num))
    }

    /// Converts to a decimal at the precision [`Decimal`] carries.
    ///
    /// This is the only lossy operation on the type; everything upstream of
    /// the final output stays fractional.
    #[must_use]
    pub fn to_decimal(self) -> Decimal {
        let exact = Decimal::try_from_i128_with_scale(self.num, 0)
            .ok()
            .zip(Decimal::try_from_i128_with_scale(self.den, 0).ok())
            .and_then(|(num, den)| num.checked_div(den));
        exact.unwrap_or_else(|| {
            let approx = self.num.to_f64().unwrap_or_default() / self.den.to_f64().unwrap_or(1.0);
            Decimal::from_f64_retain(approx).unwrap_or_default()
        })
    }
}

impl Default for Rational {
    fn default() -> Self {
        Self::ZERO
    }
}

impl From<Decimal> for Rational {
    /// Exact conversion: a decimal is a scaled integer, so the mantissa over
    /// ten to the scale loses nothing.
    fn from(value: Decimal) -> Self {
        Self::reduced(value.mantissa(), 10_i128.pow(value.scale()))
    }
}

impl From<u32> for Rational {
    fn from(value: u32) -> Self {
        Self::from_integer(i128::from(value))
    }
}

impl Add for Rational {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        #[expect(
            clippy::cast_possible_wrap,
            reason = "denominators are positive, so their gcd fits i128"
        )]
        let g = gcd(self.den.unsigned_abs(), rhs.den.unsigned_abs()) as i128;
        let (ls, rs) = (rhs.den / g, self.den / g);
        Self::reduced(self.num * ls + rhs.num * rs, self.den * ls)
    }
}

impl Sub for Rational {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self {
        self + (-rhs)
    }
}

impl Neg for Rational {
    type Output = Self;

    fn neg(self) -> Self {
        Self {
            num: -self.num,
            den: self.den,
        }
    }
}

impl Mul for Rational {
    type Output = Self;

    fn mul(self, rhs: Self) -> Self {
        // Cross-reduce before multiplying to keep the magnitudes small.
        #[expect(
            clippy::cast_possible_wrap,
            reason = "the gcd never exceeds the magnitude of its i128 inputs"
        )]
        let g1 = gcd(self.num.unsigned_abs(), rhs.den.unsigned_abs()).max(1) as i128;
        #[expect(
            clippy::cast_possible_wrap,
            reason = "the gcd never exceeds the magnitude of its i128 inputs"
        )]
        let g2 = gcd(rhs.num.unsigned_abs(), self.den.unsigned_abs()).max(1) as i128;
        Self::reduced((self.num / g1) * (rhs.num / g2), (self.den / g2) * (rhs.den / g1))
    }
}

impl Sum for Rational {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::ZERO, Add::add)
    }
}

impl<'a> Sum<&'a Rational> for Rational {
    fn sum<I: Iterator<Item = &'a Self>>(iter: I) -> Self {
        iter.copied().sum()
    }
}

impl PartialOrd for Rational {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Rational {
    fn cmp(&self, other: &Self) -> Ordering {
        // Denominators are positive, so cross-multiplication preserves order.
        match (
            self.num.checked_mul(other.den),
            other.num.checked_mul(self.den),
        ) {
            (Some(lhs), Some(rhs)) => lhs.cmp(&rhs),
            _ => self.to_decimal().cmp(&other.to_decimal()),
        }
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal_macros::dec;
    use testresult::TestResult;

    use super::*;

    #[test]
    fn test_new_reduces_to_lowest_terms() {
        assert_eq!(Rational::new(6, 8), Rational::new(3, 4));
        assert_eq!(Rational::new(-6, -8), Rational::new(3, 4));
        assert_eq!(Rational::new(6, -8), Rational::new(-3, 4));
        assert_eq!(Rational::new(0, 7), Some(Rational::ZERO));
    }

    #[test]
    fn test_new_rejects_zero_denominator() {
        assert_eq!(Rational::new(1, 0), None);
    }

    #[test]
    fn test_arithmetic() -> TestResult {
        let third = Rational::new(1, 3).ok_or("fraction")?;
        let sixth = Rational::new(1, 6).ok_or("fraction")?;

        assert_eq!(third + sixth, Rational::new(1, 2).ok_or("fraction")?);
        assert_eq!(third - sixth, sixth);
        assert_eq!(third * sixth, Rational::new(1, 18).ok_or("fraction")?);
        assert_eq!(third.checked_div(sixth), Some(Rational::from_integer(2)));
        assert_eq!(third.checked_div(Rational::ZERO), None);

        Ok(())
    }

    #[test]
    fn test_decimal_round_trip_is_exact() {
        let amount = Rational::from(dec!(19.99));

        assert_eq!(amount, Rational::new(1999, 100).unwrap_or_default());
        assert_eq!(amount.to_decimal(), dec!(19.99));
    }

    #[test]
    fn test_sum_of_shares_is_exact() -> TestResult {
        // 1/3 + 1/3 + 1/3 leaves no residue, unlike any fixed-point type.
        let share = Rational::new(1, 3).ok_or("fraction")?;
        let total: Rational = std::iter::repeat_n(share, 3).sum();

        assert_eq!(total, Rational::ONE);

        Ok(())
    }

    #[test]
    fn test_ordering() -> TestResult {
        let mut values = vec![
            Rational::new(5, 2).ok_or("fraction")?,
            Rational::ZERO,
            Rational::new(-1, 3).ok_or("fraction")?,
            Rational::ONE,
        ];
        values.sort();

        assert_eq!(
            values,
            vec![
                Rational::new(-1, 3).ok_or("fraction")?,
                Rational::ZERO,
                Rational::ONE,
                Rational::new(5, 2).ok_or("fraction")?,
            ]
        );

        Ok(())
    }
}
