//! Calculation Meta
//!
//! The output half of a calculation: which rules applied, which were turned
//! away and why, and every discount granted so far.

use crate::cart::Uid;
use crate::discounts::{ItemDiscount, ShippingDiscount, WholeCartDiscount};

/// A rule that did not apply, with its accumulated failure reasons.
#[derive(Debug, Clone, PartialEq)]
pub struct UnapplicableRule {
    /// The rejected rule.
    pub uid: Uid,

    /// De-duplicated, human-readable reasons.
    pub errors: Vec<String>,
}

impl UnapplicableRule {
    /// Records a rejection.
    pub fn new(uid: impl Into<Uid>, errors: Vec<String>) -> Self {
        Self {
            uid: uid.into(),
            errors,
        }
    }
}

/// Accumulator folded forward through the rule pipeline.
///
/// Starts empty; each applied rule's actions append to exactly one of the
/// three discount lists (or to none).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CalculationEngineMeta {
    /// Rules whose conditions passed, in application order.
    pub applicable_rule_uids: Vec<Uid>,

    /// Rules whose conditions failed, with reasons.
    pub unapplicable_rules: Vec<UnapplicableRule>,

    /// Per-item grants.
    pub item_discounts: Vec<ItemDiscount>,

    /// Per-delivery-address grants.
    pub shipping_discounts: Vec<ShippingDiscount>,

    /// Cart-wide grants with their distributions.
    pub whole_cart_discounts: Vec<WholeCartDiscount>,
}

impl CalculationEngineMeta {
    /// Appends item grants; used by actions building their successor meta.
    #[must_use]
    pub fn with_item_discounts(mut self, grants: impl IntoIterator<Item = ItemDiscount>) -> Self {
        self.item_discounts.extend(grants);
        self
    }

    /// Appends shipping grants.
    #[must_use]
    pub fn with_shipping_discounts(
        mut self,
        grants: impl IntoIterator<Item = ShippingDiscount>,
    ) -> Self {
        self.shipping_discounts.extend(grants);
        self
    }

    /// Appends one cart-wide grant.
    #[must_use]
    pub fn with_whole_cart_discount(mut self, grant: WholeCartDiscount) -> Self {
        self.whole_cart_discounts.push(grant);
        self
    }
}
