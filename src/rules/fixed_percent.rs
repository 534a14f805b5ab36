//! Fixed Percent Rule
//!
//! Takes a percentage off the rule's selection, optionally held under a
//! configured cap.

use rust_decimal::Decimal;

use super::{
    Action, Condition, ConditionKind, DiscountScope, Rule, RuleConfigError, RuleInfo, RuleScope,
};
use crate::buffer::meta::CalculationEngineMeta;
use crate::buffer::{CalculatedCartItems, CalculationBuffer};
use crate::cart::Uid;
use crate::discounts::{ItemDiscount, WeightDistribution, WholeCartDiscount};
use crate::rational::Rational;

/// Percent-off promotion.
#[derive(Debug)]
pub struct FixedPercentRule {
    info: RuleInfo,
    conditions: Vec<Box<dyn Condition>>,
    actions: Vec<Box<dyn Action>>,
}

impl FixedPercentRule {
    /// Builds the rule from percent points (`10` means 10% off).
    ///
    /// # Errors
    ///
    /// Rejects a `max_discount` cap that is zero or negative.
    pub fn new(
        info: RuleInfo,
        scope: DiscountScope,
        conditions: &[ConditionKind],
        value: Decimal,
        max_discount: Option<Decimal>,
    ) -> Result<Self, RuleConfigError> {
        if let Some(cap) = max_discount {
            if cap <= Decimal::ZERO {
                return Err(RuleConfigError::NonPositiveMaxDiscount(cap));
            }
        }
        let action = FixedPercentAction {
            rule_uid: info.uid.clone(),
            scope: info.scope(conditions),
            kind: scope,
            percent: percent_points(value),
            max_discount: max_discount.map(Rational::from),
        };
        Ok(Self {
            conditions: info.parse_conditions(conditions),
            actions: vec![Box::new(action)],
            info,
        })
    }
}

impl Rule for FixedPercentRule {
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

/// Percent points as a fraction of one.
pub(crate) fn percent_points(value: Decimal) -> Rational {
    Rational::from(value)
        .checked_div(Rational::from_integer(100))
        .unwrap_or(Rational::ZERO)
}

#[derive(Debug)]
struct FixedPercentAction {
    rule_uid: Uid,
    scope: RuleScope,
    kind: DiscountScope,
    percent: Rational,
    max_discount: Option<Rational>,
}

impl FixedPercentAction {
    fn capped(&self, amount: Rational) -> Rational {
        self.max_discount.map_or(amount, |cap| amount.min(cap))
    }

    fn whole_cart(
        &self,
        buffer: &CalculationBuffer<'_>,
        calculated: &CalculatedCartItems<'_>,
    ) -> CalculationEngineMeta {
        if calculated.items().is_empty() {
            return buffer.meta().clone();
        }
        let total =
            self.scope.cart_subtotal(buffer) - self.scope.total_discount_without_shipping(buffer);
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
                self.capped(total * self.percent),
                distribution,
            ))
    }

    fn per_item(
        &self,
        buffer: &CalculationBuffer<'_>,
        calculated: &CalculatedCartItems<'_>,
    ) -> CalculationEngineMeta {
        let shares: Vec<Rational> = calculated
            .items()
            .iter()
            .map(|entry| entry.total_amount() * self.percent)
            .collect();
        let granted: Rational = shares.iter().copied().sum();
        let rescale = match self.max_discount {
            Some(cap) if granted > cap => cap.checked_div(granted).unwrap_or(Rational::ZERO),
            _ => Rational::ONE,
        };
        let grants: Vec<ItemDiscount> = calculated
            .items()
            .iter()
            .zip(shares)
            .map(|(entry, share)| {
                ItemDiscount::new(self.rule_uid.clone(), entry.uid().clone(), share * rescale)
                    .price_tier(entry.item().is_price_tier)
            })
            .collect();
        buffer.meta().clone().with_item_discounts(grants)
    }
}

impl Action for FixedPercentAction {
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
