//! Rule Fixtures
//!
//! Declarative rule descriptions as written in `rules/<name>.yml` fixture
//! files, converted to live rules at load time.

use rust_decimal::Decimal;
use serde::Deserialize;

use crate::cart::Uid;
use crate::rules::{
    BuyXGetYRule, ConditionKind, DiscountScope, FixedPercentRule, FixedPriceRule,
    FreeShippingRule, RuleInfo, SharedRule, StepVolumeDiscountRule, VolumeStep, rule,
};

use super::FixtureError;

/// A rule set as one fixture file declares it.
#[derive(Debug, Clone, Deserialize)]
pub struct RuleSetFixture {
    /// Rule descriptions in document order
    pub rules: Vec<RuleFixture>,
}

/// One declarative rule description.
#[derive(Debug, Clone, Deserialize)]
pub struct RuleFixture {
    /// Rule identity
    pub uid: Uid,

    /// Display name
    pub name: String,

    /// Sort rank, ascending
    #[serde(default)]
    pub priority: i32,

    /// Discard every later rule once this one applies
    #[serde(default)]
    pub stop_rules_processing: bool,

    /// Hide price-tier lines from this rule
    #[serde(default)]
    pub not_eligible_to_price_tier: bool,

    /// Eligibility requirements
    #[serde(default)]
    pub conditions: Vec<ConditionKind>,

    /// The discount arithmetic, picked by the `type` field
    #[serde(flatten)]
    pub kind: RuleKindFixture,
}

/// The discount arithmetic a description selects.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RuleKindFixture {
    /// Take a fixed amount off the selection
    FixedPrice {
        /// Grant shape
        #[serde(default)]
        scope: DiscountScope,
        /// Amount off
        value: Decimal,
    },

    /// Take a percentage off the selection
    FixedPercent {
        /// Grant shape
        #[serde(default)]
        scope: DiscountScope,
        /// Percent points off
        value: Decimal,
        /// Optional cap on the grant
        #[serde(default)]
        max_discount: Option<Decimal>,
    },

    /// Grant free units per purchased cycle
    BuyXGetY {
        /// Units bought per cycle
        x: u32,
        /// Units granted free per cycle
        y: u32,
    },

    /// Quantity-banded ladder
    StepVolumeDiscount {
        /// Quantity bands, checked in order
        steps: Vec<VolumeStep>,
        /// Optional cap on the grant
        #[serde(default)]
        max_discount: Option<Decimal>,
    },

    /// Refund shipping fees
    FreeShipping,
}

impl RuleFixture {
    /// Builds the live rule this description declares.
    ///
    /// # Errors
    ///
    /// Returns a [`FixtureError::Rule`] when the declared configuration is
    /// rejected at construction.
    pub fn try_into_rule(self) -> Result<SharedRule, FixtureError> {
        let mut info = RuleInfo::new(self.uid, self.priority, self.name);

        if self.stop_rules_processing {
            info = info.stop_rules_processing();
        }

        if self.not_eligible_to_price_tier {
            info = info.not_eligible_to_price_tier();
        }

        let built = match self.kind {
            RuleKindFixture::FixedPrice { scope, value } => {
                rule(FixedPriceRule::new(info, scope, &self.conditions, value))
            }
            RuleKindFixture::FixedPercent {
                scope,
                value,
                max_discount,
            } => rule(FixedPercentRule::new(
                info,
                scope,
                &self.conditions,
                value,
                max_discount,
            )?),
            RuleKindFixture::BuyXGetY { x, y } => {
                rule(BuyXGetYRule::new(info, &self.conditions, x, y)?)
            }
            RuleKindFixture::StepVolumeDiscount {
                steps,
                max_discount,
            } => rule(StepVolumeDiscountRule::new(
                info,
                &self.conditions,
                steps,
                max_discount,
            )?),
            RuleKindFixture::FreeShipping => rule(FreeShippingRule::new(info, &self.conditions)),
        };

        Ok(built)
    }
}
