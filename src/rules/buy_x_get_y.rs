//! Buy X Get Y Rule
//!
//! Grants free units out of the rule's selection: every `x` paid units earn
//! `y` free ones, allocated to the cheapest lines first.

use super::{Action, Condition, ConditionKind, Rule, RuleConfigError, RuleInfo, RuleScope};
use crate::buffer::meta::CalculationEngineMeta;
use crate::buffer::CalculationBuffer;
use crate::cart::Uid;
use crate::discounts::ItemDiscount;

/// Free-units promotion.
#[derive(Debug)]
pub struct BuyXGetYRule {
    info: RuleInfo,
    conditions: Vec<Box<dyn Condition>>,
    actions: Vec<Box<dyn Action>>,
}

impl BuyXGetYRule {
    /// Builds the rule from its cycle quantities.
    ///
    /// # Errors
    ///
    /// Rejects a zero `x` or `y`; a cycle needs both sides.
    pub fn new(
        info: RuleInfo,
        conditions: &[ConditionKind],
        x: u32,
        y: u32,
    ) -> Result<Self, RuleConfigError> {
        if x == 0 || y == 0 {
            return Err(RuleConfigError::ZeroQuantity { x, y });
        }
        let action = BuyXGetYAction {
            rule_uid: info.uid.clone(),
            scope: info.scope(conditions),
            x,
            y,
        };
        Ok(Self {
            conditions: info.parse_conditions(conditions),
            actions: vec![Box::new(action)],
            info,
        })
    }
}

impl Rule for BuyXGetYRule {
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
struct BuyXGetYAction {
    rule_uid: Uid,
    scope: RuleScope,
    x: u32,
    y: u32,
}

impl Action for BuyXGetYAction {
    fn perform(&self, buffer: &CalculationBuffer<'_>) -> CalculationEngineMeta {
        let calculated = self.scope.calculate_cart_items(buffer);
        let cycle = self.x + self.y;
        let total_qty = calculated.total_qty();
        let remainder = total_qty % cycle;
        let mut budget = (total_qty / cycle) * self.y + remainder.saturating_sub(self.x);
        if budget == 0 {
            return buffer.meta().clone();
        }

        // Paying quantities are snapshotted here; grants below never feed
        // back into remaining_qty within the same pass.
        let mut entries: Vec<_> = calculated.items().iter().collect();
        entries.sort_by_key(|entry| entry.total_per_item_price());

        let mut grants = Vec::new();
        for entry in entries {
            if budget == 0 {
                break;
            }
            let granted = budget.min(entry.remaining_qty());
            for _ in 0..granted {
                grants.push(
                    ItemDiscount::new(
                        self.rule_uid.clone(),
                        entry.uid().clone(),
                        entry.total_per_item_price(),
                    )
                    .set_free()
                    .price_tier(entry.item().is_price_tier),
                );
            }
            budget -= granted;
        }
        buffer.meta().clone().with_item_discounts(grants)
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal_macros::dec;
    use testresult::TestResult;

    use super::*;
    use crate::cart::{CalculationEngineInput, CartItem};
    use crate::discounts::DiscountRecord;
    use crate::rational::Rational;

    fn perform(
        rule: &BuyXGetYRule,
        input: &CalculationEngineInput,
        meta: CalculationEngineMeta,
    ) -> TestResult<CalculationEngineMeta> {
        let buffer = CalculationBuffer::new(input, meta);
        let action = rule.actions().first().ok_or("rule without actions")?;
        Ok(action.perform(&buffer))
    }

    #[test]
    fn full_cycles_earn_free_units_on_one_line() -> TestResult {
        let rule = BuyXGetYRule::new(RuleInfo::new("R1", 0, "buy 3 get 2"), &[], 3, 2)?;
        let input =
            CalculationEngineInput::new(vec![CartItem::new("A", 5, dec!(500))], vec![]);
        let meta = perform(&rule, &input, CalculationEngineMeta::default())?;

        assert_eq!(meta.item_discounts.len(), 2);
        for grant in &meta.item_discounts {
            assert!(grant.is_set_free());
            assert_eq!(grant.uid(), &Uid::from("A"));
            assert_eq!(
                grant.per_line_discounted_amount(),
                Rational::from_integer(500)
            );
        }
        Ok(())
    }

    #[test]
    fn free_units_land_on_the_cheapest_line() -> TestResult {
        let rule = BuyXGetYRule::new(RuleInfo::new("R1", 0, "buy 2 get 1"), &[], 2, 1)?;
        let input = CalculationEngineInput::new(
            vec![
                CartItem::new("A", 2, dec!(100)),
                CartItem::new("B", 3, dec!(50)),
            ],
            vec![],
        );
        let meta = perform(&rule, &input, CalculationEngineMeta::default())?;

        assert_eq!(meta.item_discounts.len(), 1);
        let grant = meta.item_discounts.first().ok_or("missing grant")?;
        assert_eq!(grant.uid(), &Uid::from("B"));
        assert_eq!(
            grant.per_line_discounted_amount(),
            Rational::from_integer(50)
        );
        Ok(())
    }

    #[test]
    fn budget_spills_to_the_next_cheapest_line() -> TestResult {
        let rule = BuyXGetYRule::new(RuleInfo::new("R1", 0, "buy 1 get 1"), &[], 1, 1)?;
        let input = CalculationEngineInput::new(
            vec![
                CartItem::new("A", 1, dec!(30)),
                CartItem::new("B", 4, dec!(40)),
            ],
            vec![],
        );
        let meta = perform(&rule, &input, CalculationEngineMeta::default())?;

        let granted: Vec<(&Uid, Rational)> = meta
            .item_discounts
            .iter()
            .map(|grant| (grant.uid(), grant.per_line_discounted_amount()))
            .collect();
        assert_eq!(
            granted,
            vec![
                (&Uid::from("A"), Rational::from_integer(30)),
                (&Uid::from("B"), Rational::from_integer(40)),
            ]
        );
        Ok(())
    }

    #[test]
    fn lines_already_fully_free_are_passed_over() -> TestResult {
        let rule = BuyXGetYRule::new(RuleInfo::new("R1", 0, "buy 1 get 1"), &[], 1, 1)?;
        let input = CalculationEngineInput::new(
            vec![
                CartItem::new("A", 1, dec!(10)),
                CartItem::new("B", 2, dec!(20)),
            ],
            vec![],
        );
        let prior = CalculationEngineMeta::default().with_item_discounts([ItemDiscount::new(
            "other",
            "A",
            Rational::from_integer(10),
        )
        .set_free()]);
        let meta = perform(&rule, &input, prior)?;

        let fresh: Vec<&ItemDiscount> = meta
            .item_discounts
            .iter()
            .filter(|grant| grant.applicable_rule_uid() == &Uid::from("R1"))
            .collect();
        assert_eq!(fresh.len(), 1);
        let grant = fresh.first().ok_or("missing grant")?;
        assert_eq!(grant.uid(), &Uid::from("B"));
        Ok(())
    }

    #[test]
    fn leftovers_under_a_full_cycle_earn_nothing() -> TestResult {
        let rule = BuyXGetYRule::new(RuleInfo::new("R1", 0, "buy 3 get 2"), &[], 3, 2)?;
        let input =
            CalculationEngineInput::new(vec![CartItem::new("A", 2, dec!(500))], vec![]);
        let meta = perform(&rule, &input, CalculationEngineMeta::default())?;

        assert_eq!(meta, CalculationEngineMeta::default());
        Ok(())
    }

    #[test]
    fn zero_cycle_quantities_are_rejected() {
        let result = BuyXGetYRule::new(RuleInfo::new("R1", 0, "broken"), &[], 0, 2);

        assert_eq!(result.err(), Some(RuleConfigError::ZeroQuantity { x: 0, y: 2 }));
    }
}
