//! Tally prelude.
//!
//! Convenience exports for common library consumers.

pub use crate::{
    breakdown::{Breakdown, BreakdownError},
    buffer::{
        CalculationBuffer,
        filter::{AttributeSelector, MatchMode, PriceTierFilter, TaxonomySelector},
        meta::{CalculationEngineMeta, UnapplicableRule},
    },
    cart::{
        CalculationEngineInput, CartItem, Customer, DeliveryAddress, Shipping, Uid, UsageCount,
    },
    discounts::{
        DiscountRecord, ItemDiscount, ShippingDiscount, WeightDistribution, WholeCartDiscount,
    },
    engine::{CalculationEngine, EngineObserver, NoopObserver},
    fixtures::{Fixture, FixtureError},
    rational::Rational,
    rules::{
        Action, BuyXGetYRule, Condition, ConditionKind, CustomerKind, DiscountScope,
        FixedPercentRule, FixedPriceRule, FreeShippingRule, Rule, RuleConfigError, RuleInfo,
        SharedRule, StepKind, StepVolumeDiscountRule, VolumeStep, rule,
    },
    tags::TagSet,
};
