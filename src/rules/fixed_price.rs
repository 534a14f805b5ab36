//! Fixed Price Rule
//!
//! Takes a configured amount off the rule's selection, never more than the
//! selection is still worth after earlier discounts.

use rust_decimal::Decimal;

use super::{Action, Condition, ConditionKind, DiscountScope, Rule, RuleInfo, RuleScope};
use crate::buffer::meta::CalculationEngineMeta;
use crate::buffer::{CalculatedCartItems, CalculationBuffer};
use crate::cart::Uid;
use crate::discounts::{ItemDiscount, WeightDistribution, WholeCartDiscount};
use crate::rational::Rational;

/// Amount-off promotion.
#[derive(Debug)]
pub struct FixedPriceRule {
    info: RuleInfo,
    conditions: Vec<Box<dyn Condition>>,
    actions: Vec<Box<dyn Action>>,
}

impl FixedPriceRule {
    /// Builds the rule; `scope` picks the grant shape.
    #[must_use]
    pub fn new(
        info: RuleInfo,
        scope: DiscountScope,
        conditions: &[ConditionKind],
        value: Decimal,
    ) -> Self {
        let action = FixedPriceAction {
            rule_uid: info.uid.clone(),
            scope: info.scope(conditions),
            kind: scope,
            value: Rational::from(value),
        };
        Self {
            conditions: info.parse_conditions(conditions),
            actions: vec![Box::new(action)],
            info,
        }
    }
}

impl Rule for FixedPriceRule {
    fn uid(&self) -> &Uid {
        &self.info.uid
    }

    fn priority(&self) -> i32 {
        self.info.priority
    }

    fn name(&self) -> &str {
        &self.info.name
    }

    fn stop_rules_processing(&self) -> bool {
        self.info.stop_rules_processing
    }

    fn not_eligible_to_price_tier(&self) -> bool {
        self.info.not_eligible_to_price_tier
    }

    fn conditions(&self) -> &[Box<dyn Condition>] {
        &self.conditions
    }

    fn actions(&self) -> &[Box<dyn Action>] {
        &self.actions
    }
}

#[derive(Debug)]
struct FixedPriceAction {
    rule_uid: Uid,
    scope: RuleScope,
    kind: DiscountScope,
    value: Rational,
}

impl FixedPriceAction {
    fn whole_cart(
        &self,
        buffer: &CalculationBuffer<'_>,
        calculated: &CalculatedCartItems<'_>,
    ) -> CalculationEngineMeta {
        if calculated.items().is_empty() {
            return buffer.meta().clone();
        }
        let worth = calculated.total_amount();
        let distribution = WeightDistribution::from_pairs(
            calculated
                .items()
                .iter()
                .map(|entry| (entry.uid().clone(), entry.total_amount())),
        );
        buffer
            .meta()
            .clone()
            .with_whole_cart_discount(WholeCartDiscount::new(
                self.rule_uid.clone(),
                self.value.min(worth),
                distribution,
            ))
    }

    fn per_item(
        &self,
        buffer: &CalculationBuffer<'_>,
        calculated: &CalculatedCartItems<'_>,
    ) -> CalculationEngineMeta {
        let worth = calculated.total_amount();
        let grants: Vec<ItemDiscount> = calculated
            .items()
            .iter()
            .filter(|entry| entry.total_amount().is_positive())
            .map(|entry| {
                let share = (self.value * entry.total_amount())
                    .checked_div(worth)
                    .unwrap_or(Rational::ZERO);
                ItemDiscount::new(
                    self.rule_uid.clone(),
                    entry.uid().clone(),
                    share.min(entry.total_amount()),
                )
                .price_tier(entry.item().is_price_tier)
            })
            .collect();
        buffer.meta().clone().with_item_discounts(grants)
    }
}

impl Action for FixedPriceAction {
    fn perform(&self, buffer: &CalculationBuffer<'_>) -> CalculationEngineMeta {
        let selection = self.scope.applicable_cart_items(buffer);
        let calculated = buffer.calculate_cart_items(selection.items());
        match self.kind {
            DiscountScope::WholeCart => self.whole_cart(buffer, &calculated),
            DiscountScope::PerItem => self.per_item(buffer, &calculated),
            DiscountScope::Auto if selection.is_whole_cart_selection() => {
                self.whole_cart(buffer, &calculated)
            }
            DiscountScope::Auto if !selection.is_empty() => self.per_item(buffer, &calculated),
            DiscountScope::Auto => buffer.meta().clone(),
        }
    }
}
