//! Weighted Discount Distribution

use rustc_hash::FxHashMap;

use crate::cart::Uid;
use crate::rational::Rational;

/// Allocates one aggregate amount across item uids in proportion to weights.
///
/// A whole-cart discount stores one of these instead of eagerly itemizing:
/// the share for a uid is `weight / total_weight`, computed on demand when a
/// later rule asks how much discount a given item already carries. An
/// all-zero weight map yields zero factors; the division is guarded, never
/// raised.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct WeightDistribution {
    weights: FxHashMap<Uid, Rational>,
    total_weight: Rational,
}

impl WeightDistribution {
    /// Creates a distribution from a prepared weight map.
    #[must_use]
    pub fn new(weights: FxHashMap<Uid, Rational>) -> Self {
        let total_weight = weights.values().sum();
        Self {
            weights,
            total_weight,
        }
    }

    /// Creates a distribution from `(uid, weight)` pairs. A later pair
    /// replaces an earlier one with the same uid.
    pub fn from_pairs(pairs: impl IntoIterator<Item = (Uid, Rational)>) -> Self {
        Self::new(pairs.into_iter().collect())
    }

    /// Whether the uid carries any weight entry at all.
    #[must_use]
    pub fn includes(&self, uid: &Uid) -> bool {
        self.weights.contains_key(uid)
    }

    /// The uid's share of the whole, `weight / total_weight`.
    ///
    /// Zero when the uid is unknown or the total weight is zero.
    #[must_use]
    pub fn factor_for(&self, uid: &Uid) -> Rational {
        self.weights
            .get(uid)
            .and_then(|weight| weight.checked_div(self.total_weight))
            .unwrap_or(Rational::ZERO)
    }

    /// Sum of all weights.
    #[must_use]
    pub fn total_weight(&self) -> Rational {
        self.total_weight
    }

    /// Iterates the uids carrying weight entries.
    pub fn uids(&self) -> impl Iterator<Item = &Uid> {
        self.weights.keys()
    }

    /// Whether the distribution has no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.weights.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    use super::*;

    fn dist(pairs: &[(&str, Decimal)]) -> WeightDistribution {
        WeightDistribution::from_pairs(
            pairs
                .iter()
                .map(|(uid, weight)| (Uid::from(*uid), Rational::from(*weight))),
        )
    }

    #[test]
    fn factors_are_proportional_to_weights() {
        let dist = dist(&[("A", dec!(300)), ("B", dec!(100))]);

        assert_eq!(
            dist.factor_for(&Uid::from("A")),
            Rational::new(3, 4).unwrap_or_default()
        );
        assert_eq!(
            dist.factor_for(&Uid::from("B")),
            Rational::new(1, 4).unwrap_or_default()
        );
    }

    #[test]
    fn unknown_uid_has_no_share() {
        let dist = dist(&[("A", dec!(10))]);

        assert!(!dist.includes(&Uid::from("B")));
        assert_eq!(dist.factor_for(&Uid::from("B")), Rational::ZERO);
    }

    #[test]
    fn zero_total_weight_never_divides() {
        let dist = dist(&[("A", dec!(0)), ("B", dec!(0))]);

        assert!(dist.includes(&Uid::from("A")));
        assert_eq!(dist.factor_for(&Uid::from("A")), Rational::ZERO);
        assert_eq!(dist.factor_for(&Uid::from("B")), Rational::ZERO);
    }

    #[test]
    fn factors_sum_to_one_for_irregular_weights() {
        // Fifty awkward, non-round weights; the factors must still sum to
        // exactly one because the arithmetic is rational end to end.
        let pairs: Vec<(Uid, Rational)> = (0..50)
            .map(|n| {
                let cents = 997 * (n + 1) % 613 + 1;
                let weight = Rational::new(i128::from(cents), 100).unwrap_or_default();
                (Uid::from(format!("SKU-{n}")), weight)
            })
            .collect();
        let dist = WeightDistribution::from_pairs(pairs.clone());

        let total: Rational = pairs.iter().map(|(uid, _)| dist.factor_for(uid)).sum();
        assert_eq!(total, Rational::ONE);
    }
}
