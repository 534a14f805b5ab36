//! Free Shipping Rule
//!
//! Waives whatever part of each delivery address's fee is still unpaid by
//! earlier shipping grants.

use super::{Action, Condition, ConditionKind, Rule, RuleInfo};
use crate::buffer::meta::CalculationEngineMeta;
use crate::buffer::CalculationBuffer;
use crate::cart::Uid;
use crate::discounts::ShippingDiscount;
use crate::rational::Rational;

/// Shipping-waiver promotion.
#[derive(Debug)]
pub struct FreeShippingRule {
    info: RuleInfo,
    conditions: Vec<Box<dyn Condition>>,
    actions: Vec<Box<dyn Action>>,
}

impl FreeShippingRule {
    /// Builds the rule.
    #[must_use]
    pub fn new(info: RuleInfo, conditions: &[ConditionKind]) -> Self {
        let action = FreeShippingAction {
            rule_uid: info.uid.clone(),
        };
        Self {
            conditions: info.parse_conditions(conditions),
            actions: vec![Box::new(action)],
            info,
        }
    }
}

impl Rule for FreeShippingRule {
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
struct FreeShippingAction {
    rule_uid: Uid,
}

impl Action for FreeShippingAction {
    fn perform(&self, buffer: &CalculationBuffer<'_>) -> CalculationEngineMeta {
        let grants: Vec<ShippingDiscount> = buffer
            .delivery_addresses()
            .iter()
            .filter_map(|address| {
                let outstanding =
                    Rational::from(address.shipping.fee) - buffer.shipping_discount_for(&address.uid);
                outstanding.is_positive().then(|| {
                    ShippingDiscount::new(self.rule_uid.clone(), address.uid.clone(), outstanding)
                        .set_free()
                })
            })
            .collect();
        buffer.meta().clone().with_shipping_discounts(grants)
    }
}
