//! Promotion Rules
//!
//! The pluggable protocol the engine consumes: a rule owns eligibility
//! conditions and discount actions, plus a scope describing which part of the
//! cart its arithmetic may touch.

pub mod conditions;

mod buy_x_get_y;
mod fixed_percent;
mod fixed_price;
mod free_shipping;
mod step_volume;

use std::fmt;
use std::sync::Arc;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::buffer::filter::{AttributeQuery, PriceTierFilter, TaxonomyConditions, TaxonomyQuery};
use crate::buffer::meta::CalculationEngineMeta;
use crate::buffer::{CalculatedCartItems, CalculationBuffer, FilteredCartItems};
use crate::cart::Uid;
use crate::rational::Rational;

pub use buy_x_get_y::BuyXGetYRule;
pub use conditions::{ConditionKind, CustomerKind};
pub use fixed_percent::FixedPercentRule;
pub use fixed_price::FixedPriceRule;
pub use free_shipping::FreeShippingRule;
pub use step_volume::{StepKind, StepVolumeDiscountRule, VolumeStep};

/// A predicate over the current buffer.
///
/// Returns human-readable failure reasons; an empty list means satisfied.
pub trait Condition: fmt::Debug {
    /// Evaluates the predicate against the current snapshot.
    fn check(&self, buffer: &CalculationBuffer<'_>) -> Vec<String>;
}

/// One discount computation.
///
/// Produces the successor meta, typically the old meta plus one appended
/// grant. Actions never mutate the buffer they read.
pub trait Action: fmt::Debug {
    /// Computes the successor meta from the current snapshot.
    fn perform(&self, buffer: &CalculationBuffer<'_>) -> CalculationEngineMeta;
}

/// The contract every promotion rule implements.
pub trait Rule: fmt::Debug {
    /// Rule identity; the descending tie-break of the sort order.
    fn uid(&self) -> &Uid;

    /// Sort rank, ascending.
    fn priority(&self) -> i32;

    /// Display name.
    fn name(&self) -> &str;

    /// When true, every rule after this one is discarded once it applies.
    fn stop_rules_processing(&self) -> bool;

    /// When true, the rule never sees price-tier lines.
    fn not_eligible_to_price_tier(&self) -> bool;

    /// Eligibility predicates, evaluated independently.
    fn conditions(&self) -> &[Box<dyn Condition>];

    /// Discount computations, run strictly in order.
    fn actions(&self) -> &[Box<dyn Action>];
}

/// Rules enter the engine input as shared immutable values.
pub type SharedRule = Arc<dyn Rule>;

/// Wraps a concrete rule for an input's rule list.
pub fn rule(rule: impl Rule + 'static) -> SharedRule {
    Arc::new(rule)
}

/// Rejected rule configuration, raised at construction and never during
/// `process`.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RuleConfigError {
    /// A discount cap must be a positive amount.
    #[error("max discount cap must be positive, got {0}")]
    NonPositiveMaxDiscount(Decimal),

    /// Buy and get quantities must both be positive.
    #[error("buy/get quantities must be positive, got buy {x} get {y}")]
    ZeroQuantity {
        /// Units the customer pays for per cycle.
        x: u32,
        /// Units granted free per cycle.
        y: u32,
    },
}

/// How a value-based rule shapes its grant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DiscountScope {
    /// Whole-cart when the selection is unconstrained, per-item when it is
    /// narrowed and non-empty, nothing otherwise.
    #[default]
    Auto,

    /// Always one cart-wide grant.
    WholeCart,

    /// Always per-line grants.
    PerItem,
}

/// The price-tier mode a rule's eligibility implies.
pub(crate) const fn price_tier_mode(not_eligible_to_price_tier: bool) -> PriceTierFilter {
    if not_eligible_to_price_tier {
        PriceTierFilter::Exclude
    } else {
        PriceTierFilter::Include
    }
}

/// Identity and flow control shared by every rule kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleInfo {
    /// Rule identity.
    pub uid: Uid,

    /// Sort rank, ascending.
    pub priority: i32,

    /// Display name.
    pub name: String,

    /// Discard every later rule once this one applies.
    pub stop_rules_processing: bool,

    /// Hide price-tier lines from this rule.
    pub not_eligible_to_price_tier: bool,
}

impl RuleInfo {
    /// Starts an info block with both flags off.
    pub fn new(uid: impl Into<Uid>, priority: i32, name: impl Into<String>) -> Self {
        Self {
            uid: uid.into(),
            priority,
            name: name.into(),
            stop_rules_processing: false,
            not_eligible_to_price_tier: false,
        }
    }

    /// Discards every later rule once this one applies.
    #[must_use]
    pub fn stop_rules_processing(mut self) -> Self {
        self.stop_rules_processing = true;
        self
    }

    /// Hides price-tier lines from the rule.
    #[must_use]
    pub fn not_eligible_to_price_tier(mut self) -> Self {
        self.not_eligible_to_price_tier = true;
        self
    }

    /// Parses declarative conditions under this rule's identity and
    /// price-tier mode.
    pub(crate) fn parse_conditions(&self, kinds: &[ConditionKind]) -> Vec<Box<dyn Condition>> {
        let mode = price_tier_mode(self.not_eligible_to_price_tier);
        kinds
            .iter()
            .map(|kind| kind.parse(&self.uid, mode))
            .collect()
    }

    /// Derives the cart narrowing this rule's conditions imply.
    pub(crate) fn scope(&self, kinds: &[ConditionKind]) -> RuleScope {
        RuleScope::from_conditions(kinds, self.not_eligible_to_price_tier)
    }
}

/// The cart narrowing a rule derives from its declarative conditions.
///
/// Uid whitelists accumulate from uid and uid-scoped quantity conditions;
/// for each taxonomy axis the last selector wins; the price-tier mode follows
/// the rule's own eligibility.
#[derive(Debug, Clone, Default)]
pub struct RuleScope {
    uids: Vec<Uid>,
    price_tier: PriceTierFilter,
    taxonomy: TaxonomyConditions,
}

impl RuleScope {
    /// Collects the scope from a rule's declarative conditions.
    #[must_use]
    pub fn from_conditions(kinds: &[ConditionKind], not_eligible_to_price_tier: bool) -> Self {
        let mut uids = Vec::new();
        let mut taxonomy = TaxonomyConditions::default();

        for kind in kinds {
            match kind {
                ConditionKind::Uids { uids: listed } => uids.extend(listed.iter().cloned()),
                ConditionKind::QuantityAtLeast {
                    uids: Some(listed), ..
                } => uids.extend(listed.iter().cloned()),
                ConditionKind::Category { value } => {
                    taxonomy.categories = Some(TaxonomyQuery::new(value));
                }
                ConditionKind::Tag { value } => {
                    taxonomy.tags = Some(TaxonomyQuery::new(value));
                }
                ConditionKind::Attribute { value } => {
                    taxonomy.attributes = Some(AttributeQuery::new(value));
                }
                _ => {}
            }
        }

        Self {
            uids,
            price_tier: price_tier_mode(not_eligible_to_price_tier),
            taxonomy,
        }
    }

    /// Lines this rule may touch.
    #[must_use]
    pub fn applicable_cart_items<'a>(
        &self,
        buffer: &CalculationBuffer<'a>,
    ) -> FilteredCartItems<'a> {
        buffer.filter_applicable_cart_items(&self.uids, self.price_tier, &self.taxonomy)
    }

    /// Subtotal over the scope's selection.
    #[must_use]
    pub fn cart_subtotal(&self, buffer: &CalculationBuffer<'_>) -> Rational {
        self.applicable_cart_items(buffer).subtotal()
    }

    /// Discounts so far attributed to the scope's selection.
    #[must_use]
    pub fn total_discount_without_shipping(&self, buffer: &CalculationBuffer<'_>) -> Rational {
        let uids = self.applicable_cart_items(buffer).uids();
        buffer.total_discount_without_shipping_for(&uids)
    }

    /// Effective totals over the scope's selection.
    #[must_use]
    pub fn calculate_cart_items<'a>(
        &self,
        buffer: &CalculationBuffer<'a>,
    ) -> CalculatedCartItems<'a> {
        let selection = self.applicable_cart_items(buffer);
        buffer.calculate_cart_items(selection.items())
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal_macros::dec;

    use super::*;
    use crate::buffer::filter::MatchMode;
    use crate::buffer::filter::TaxonomySelector;
    use crate::buffer::meta::CalculationEngineMeta;
    use crate::cart::{CalculationEngineInput, CartItem};

    fn two_aisles() -> CalculationEngineInput {
        CalculationEngineInput::new(
            vec![
                CartItem::new("A", 1, dec!(100)).with_categories(["food"]),
                CartItem::new("B", 2, dec!(40)).with_categories(["toys"]),
                CartItem::new("P", 1, dec!(60)).price_tier(),
            ],
            vec![],
        )
    }

    #[test]
    fn scope_collects_uids_from_both_condition_shapes() {
        let kinds = vec![
            ConditionKind::Uids {
                uids: vec![Uid::from("A")],
            },
            ConditionKind::QuantityAtLeast {
                value: 1,
                uids: Some(vec![Uid::from("B")]),
            },
        ];
        let scope = RuleScope::from_conditions(&kinds, false);

        let input = two_aisles();
        let buffer = CalculationBuffer::new(&input, CalculationEngineMeta::default());
        let selection = scope.applicable_cart_items(&buffer);

        assert!(!selection.is_whole_cart_selection());
        assert_eq!(selection.uids(), vec![Uid::from("A"), Uid::from("B")]);
    }

    #[test]
    fn last_taxonomy_selector_wins_per_axis() {
        let kinds = vec![
            ConditionKind::Category {
                value: TaxonomySelector::new(MatchMode::Or, ["food"]),
            },
            ConditionKind::Category {
                value: TaxonomySelector::new(MatchMode::Or, ["toys"]),
            },
        ];
        let scope = RuleScope::from_conditions(&kinds, false);

        let input = two_aisles();
        let buffer = CalculationBuffer::new(&input, CalculationEngineMeta::default());

        assert_eq!(
            scope.applicable_cart_items(&buffer).uids(),
            vec![Uid::from("B")]
        );
    }

    #[test]
    fn ineligible_rules_never_see_price_tier_lines() {
        let scope = RuleScope::from_conditions(&[], true);

        let input = two_aisles();
        let buffer = CalculationBuffer::new(&input, CalculationEngineMeta::default());
        let selection = scope.applicable_cart_items(&buffer);

        assert!(selection.is_whole_cart_selection());
        assert_eq!(selection.uids(), vec![Uid::from("A"), Uid::from("B")]);
        assert_eq!(scope.cart_subtotal(&buffer), Rational::from_integer(180));
    }
}
