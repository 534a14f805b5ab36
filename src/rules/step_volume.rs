//! Step Volume Rule
//!
//! Ladder pricing: bands over the selection's paying quantity, each carrying
//! a percent or fixed discount. The first band admitting the quantity wins.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::fixed_percent::percent_points;
use super::{Action, Condition, ConditionKind, Rule, RuleConfigError, RuleInfo, RuleScope};
use crate::buffer::meta::CalculationEngineMeta;
use crate::buffer::{CalculatedCartItems, CalculationBuffer};
use crate::cart::Uid;
use crate::discounts::{ItemDiscount, WeightDistribution, WholeCartDiscount};
use crate::rational::Rational;

/// How a band's `discount` value reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StepKind {
    /// Percent points off the selection.
    Percent,
    /// A fixed amount off the selection.
    Fixed,
}

/// One quantity band of the ladder.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct VolumeStep {
    /// Lowest paying quantity the band admits.
    pub start_qty: u32,

    /// Highest admitted quantity; `None` leaves the band open-ended.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_qty: Option<u32>,

    /// Band discount, read per `kind`.
    pub discount: Decimal,

    /// Percent points or fixed amount.
    pub kind: StepKind,
}

impl VolumeStep {
    /// A percent band.
    #[must_use]
    pub const fn percent(start_qty: u32, end_qty: Option<u32>, discount: Decimal) -> Self {
        Self {
            start_qty,
            end_qty,
            discount,
            kind: StepKind::Percent,
        }
    }

    /// A fixed-amount band.
    #[must_use]
    pub const fn fixed(start_qty: u32, end_qty: Option<u32>, discount: Decimal) -> Self {
        Self {
            start_qty,
            end_qty,
            discount,
            kind: StepKind::Fixed,
        }
    }

    fn admits(&self, total_qty: u32) -> bool {
        total_qty >= self.start_qty && self.end_qty.is_none_or(|end| total_qty <= end)
    }
}

/// Ladder promotion.
#[derive(Debug)]
pub struct StepVolumeDiscountRule {
    info: RuleInfo,
    conditions: Vec<Box<dyn Condition>>,
    actions: Vec<Box<dyn Action>>,
}

impl StepVolumeDiscountRule {
    /// Builds the rule from its bands, checked in the given order.
    ///
    /// # Errors
    ///
    /// Rejects a `max_discount` cap that is zero or negative.
    pub fn new(
        info: RuleInfo,
        conditions: &[ConditionKind],
        steps: Vec<VolumeStep>,
        max_discount: Option<Decimal>,
    ) -> Result<Self, RuleConfigError> {
        if let Some(cap) = max_discount {
            if cap <= Decimal::ZERO {
                return Err(RuleConfigError::NonPositiveMaxDiscount(cap));
            }
        }
        let action = StepVolumeAction {
            rule_uid: info.uid.clone(),
            scope: info.scope(conditions),
            steps,
            max_discount: max_discount.map(Rational::from),
        };
        Ok(Self {
            conditions: info.parse_conditions(conditions),
            actions: vec![Box::new(action)],
            info,
        })
    }
}

impl Rule for StepVolumeDiscountRule {
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
struct StepVolumeAction {
    rule_uid: Uid,
    scope: RuleScope,
    steps: Vec<VolumeStep>,
    max_discount: Option<Rational>,
}

impl StepVolumeAction {
    fn capped(&self, amount: Rational) -> Rational {
        self.max_discount.map_or(amount, |cap| amount.min(cap))
    }

    fn whole_cart(
        &self,
        buffer: &CalculationBuffer<'_>,
        calculated: &CalculatedCartItems<'_>,
        step: &VolumeStep,
    ) -> CalculationEngineMeta {
        let worth = calculated.total_amount();
        let raw = match step.kind {
            StepKind::Percent => worth * percent_points(step.discount),
            StepKind::Fixed => Rational::from(step.discount).min(worth),
        };
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
                self.capped(raw),
                distribution,
            ))
    }

    fn per_item(
        &self,
        buffer: &CalculationBuffer<'_>,
        calculated: &CalculatedCartItems<'_>,
        step: &VolumeStep,
    ) -> CalculationEngineMeta {
        let grants = match step.kind {
            StepKind::Percent => self.percent_shares(calculated, step),
            StepKind::Fixed => self.fixed_split(calculated, step),
        };
        buffer.meta().clone().with_item_discounts(grants)
    }

    fn percent_shares(
        &self,
        calculated: &CalculatedCartItems<'_>,
        step: &VolumeStep,
    ) -> Vec<ItemDiscount> {
        let fraction = percent_points(step.discount);
        let shares: Vec<Rational> = calculated
            .items()
            .iter()
            .map(|entry| entry.total_amount() * fraction)
            .collect();
        let granted: Rational = shares.iter().copied().sum();
        let rescale = match self.max_discount {
            Some(cap) if granted > cap => cap.checked_div(granted).unwrap_or(Rational::ZERO),
            _ => Rational::ONE,
        };
        calculated
            .items()
            .iter()
            .zip(shares)
            .map(|(entry, share)| {
                ItemDiscount::new(self.rule_uid.clone(), entry.uid().clone(), share * rescale)
                    .price_tier(entry.item().is_price_tier)
            })
            .collect()
    }

    fn fixed_split(
        &self,
        calculated: &CalculatedCartItems<'_>,
        step: &VolumeStep,
    ) -> Vec<ItemDiscount> {
        let worth = calculated.total_amount();
        let budget = self.capped(Rational::from(step.discount));
        calculated
            .items()
            .iter()
            .filter(|entry| entry.total_amount().is_positive())
            .map(|entry| {
                let share = (budget * entry.total_amount())
                    .checked_div(worth)
                    .unwrap_or(Rational::ZERO);
                ItemDiscount::new(
                    self.rule_uid.clone(),
                    entry.uid().clone(),
                    share.min(entry.total_amount()),
                )
                .price_tier(entry.item().is_price_tier)
            })
            .collect()
    }
}

impl Action for StepVolumeAction {
    fn perform(&self, buffer: &CalculationBuffer<'_>) -> CalculationEngineMeta {
        let selection = self.scope.applicable_cart_items(buffer);
        let calculated = buffer.calculate_cart_items(selection.items());
        let Some(step) = self
            .steps
            .iter()
            .find(|step| step.admits(calculated.total_qty()))
        else {
            return buffer.meta().clone();
        };
        if calculated.items().is_empty() {
            return buffer.meta().clone();
        }
        if selection.is_whole_cart_selection() {
            self.whole_cart(buffer, &calculated, step)
        } else {
            self.per_item(buffer, &calculated, step)
        }
    }
}
