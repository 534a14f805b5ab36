//! Discount Records
//!
//! Frozen value objects recording one granted discount each. A record knows
//! which rule granted it, whether it marks units as free, and how much of it
//! belongs to any given item uid.

use std::fmt;

use crate::cart::Uid;
use crate::rational::Rational;

pub mod distribution;

pub use distribution::WeightDistribution;

/// Capability shared by every granted discount.
pub trait DiscountRecord: fmt::Debug {
    /// The rule that granted this discount.
    fn applicable_rule_uid(&self) -> &Uid;

    /// Whether the grant marks units as free rather than cheaper.
    fn is_set_free(&self) -> bool;

    /// Whether the grant touches the given uid at all.
    fn is_applied_with(&self, uid: &Uid) -> bool;

    /// The exact share of the grant attributable to the given uid.
    fn amount_for(&self, uid: &Uid) -> Rational;
}

/// A discount granted against one cart line group (by uid).
#[derive(Debug, Clone, PartialEq)]
pub struct ItemDiscount {
    applicable_rule_uid: Uid,
    uid: Uid,
    per_line_discounted_amount: Rational,
    set_free: bool,
    is_price_tier: bool,
}

impl ItemDiscount {
    /// Creates an item discount grant.
    pub fn new(
        applicable_rule_uid: impl Into<Uid>,
        uid: impl Into<Uid>,
        per_line_discounted_amount: Rational,
    ) -> Self {
        Self {
            applicable_rule_uid: applicable_rule_uid.into(),
            uid: uid.into(),
            per_line_discounted_amount,
            set_free: false,
            is_price_tier: false,
        }
    }

    /// Marks the grant as giving units away rather than discounting them.
    #[must_use]
    pub fn set_free(mut self) -> Self {
        self.set_free = true;
        self
    }

    /// Marks the grant as sitting on a price-tier line.
    #[must_use]
    pub fn price_tier(mut self, is_price_tier: bool) -> Self {
        self.is_price_tier = is_price_tier;
        self
    }

    /// The discounted item's uid.
    #[must_use]
    pub fn uid(&self) -> &Uid {
        &self.uid
    }

    /// The granted amount for the whole line.
    #[must_use]
    pub fn per_line_discounted_amount(&self) -> Rational {
        self.per_line_discounted_amount
    }

    /// Whether the discounted line is a price-tier line.
    #[must_use]
    pub fn is_price_tier(&self) -> bool {
        self.is_price_tier
    }
}

impl DiscountRecord for ItemDiscount {
    fn applicable_rule_uid(&self) -> &Uid {
        &self.applicable_rule_uid
    }

    fn is_set_free(&self) -> bool {
        self.set_free
    }

    fn is_applied_with(&self, uid: &Uid) -> bool {
        self.uid == *uid
    }

    fn amount_for(&self, _uid: &Uid) -> Rational {
        self.per_line_discounted_amount
    }
}

/// A discount granted against one delivery address's shipping fee.
#[derive(Debug, Clone, PartialEq)]
pub struct ShippingDiscount {
    applicable_rule_uid: Uid,
    uid: Uid,
    discounted_amount: Rational,
    set_free: bool,
}

impl ShippingDiscount {
    /// Creates a shipping discount grant for one delivery address.
    pub fn new(
        applicable_rule_uid: impl Into<Uid>,
        uid: impl Into<Uid>,
        discounted_amount: Rational,
    ) -> Self {
        Self {
            applicable_rule_uid: applicable_rule_uid.into(),
            uid: uid.into(),
            discounted_amount,
            set_free: false,
        }
    }

    /// Marks the shipping as free rather than reduced.
    #[must_use]
    pub fn set_free(mut self) -> Self {
        self.set_free = true;
        self
    }

    /// The delivery address uid the grant belongs to.
    #[must_use]
    pub fn uid(&self) -> &Uid {
        &self.uid
    }

    /// The granted fee reduction.
    #[must_use]
    pub fn discounted_amount(&self) -> Rational {
        self.discounted_amount
    }
}

impl DiscountRecord for ShippingDiscount {
    fn applicable_rule_uid(&self) -> &Uid {
        &self.applicable_rule_uid
    }

    fn is_set_free(&self) -> bool {
        self.set_free
    }

    fn is_applied_with(&self, uid: &Uid) -> bool {
        self.uid == *uid
    }

    // Shipping refunds never attribute to cart items.
    fn amount_for(&self, _uid: &Uid) -> Rational {
        Rational::ZERO
    }
}

/// A single discount amount spread across the applicable cart.
///
/// Instead of itemizing eagerly, the grant carries a [`WeightDistribution`]
/// and answers per-uid shares on demand.
#[derive(Debug, Clone, PartialEq)]
pub struct WholeCartDiscount {
    applicable_rule_uid: Uid,
    discounted_amount: Rational,
    set_free: bool,
    distribution: WeightDistribution,
}

impl WholeCartDiscount {
    /// Creates a whole-cart discount grant.
    pub fn new(
        applicable_rule_uid: impl Into<Uid>,
        discounted_amount: Rational,
        distribution: WeightDistribution,
    ) -> Self {
        Self {
            applicable_rule_uid: applicable_rule_uid.into(),
            discounted_amount,
            set_free: false,
            distribution,
        }
    }

    /// The granted aggregate amount.
    #[must_use]
    pub fn discounted_amount(&self) -> Rational {
        self.discounted_amount
    }

    /// How the aggregate spreads across item uids.
    #[must_use]
    pub fn distribution(&self) -> &WeightDistribution {
        &self.distribution
    }
}

impl DiscountRecord for WholeCartDiscount {
    fn applicable_rule_uid(&self) -> &Uid {
        &self.applicable_rule_uid
    }

    fn is_set_free(&self) -> bool {
        self.set_free
    }

    fn is_applied_with(&self, uid: &Uid) -> bool {
        self.distribution.includes(uid)
    }

    fn amount_for(&self, uid: &Uid) -> Rational {
        self.distribution.factor_for(uid) * self.discounted_amount
    }
}
