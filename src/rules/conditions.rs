//! Declarative Conditions
//!
//! Rule configurations carry conditions as data. Parsing closes each
//! description over the owning rule's identity and price-tier mode and yields
//! the boxed predicate the engine evaluates.

use rust_decimal::Decimal;
use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use super::Condition;
use crate::buffer::CalculationBuffer;
use crate::buffer::filter::{
    AttributeQuery, AttributeSelector, PriceTierFilter, TaxonomyConditions, TaxonomySelector,
    TaxonomyQuery,
};
use crate::cart::Uid;
use crate::rational::Rational;
use crate::tags::TagSet;

const MEMBER_ONLY: &str = "This promotion is only apply to a member.";
const NOTHING_IN_ORDER: &str = "This promotion doesn't apply to any product in this order.";
const INVALID_SELECTOR: &str = "Something went wrong.";

/// Audience gate for [`ConditionKind::CustomerType`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CustomerKind {
    /// Guests and logged-in customers alike.
    All,
    /// Logged-in customers only.
    Customer,
    /// Guests only.
    Guest,
}

/// One eligibility requirement as rule configuration describes it.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ConditionKind {
    /// Discounted cart subtotal must reach a floor.
    SubtotalAtLeast {
        /// Minimum spend after earlier discounts.
        value: Decimal,
    },

    /// Paying quantity, optionally restricted to listed uids, must reach a
    /// floor.
    QuantityAtLeast {
        /// Minimum paying quantity.
        value: u32,
        /// When present, only these lines count.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        uids: Option<Vec<Uid>>,
    },

    /// First-order customers only.
    NewCustomer,

    /// At least one listed uid must be in the cart.
    Uids {
        /// The qualifying product uids.
        uids: Vec<Uid>,
    },

    /// At least one pool line must match the category selector.
    Category {
        /// Selector over line categories.
        value: TaxonomySelector,
    },

    /// At least one pool line must match the tag selector.
    Tag {
        /// Selector over line tags.
        value: TaxonomySelector,
    },

    /// At least one pool line must match the attribute selector.
    Attribute {
        /// Selector over one named attribute's values.
        value: AttributeSelector,
    },

    /// Total redemptions across all customers must stay under a cap.
    UsageLimit {
        /// Redemption cap.
        value: u32,
    },

    /// The current customer's redemptions must stay under a cap.
    UsesPerCustomer {
        /// Per-customer redemption cap.
        value: u32,
    },

    /// The customer must belong to every listed group.
    CustomerGroup {
        /// Required group names.
        value: Vec<String>,
    },

    /// Restricts the promotion to guests or logged-in customers.
    CustomerType {
        /// The admitted audience.
        value: CustomerKind,
    },

    /// The card prefix digest in the input must match a listed prefix.
    CreditCardPrefix {
        /// Allowed raw prefixes; each is hashed for comparison.
        value: Vec<String>,
    },
}

impl ConditionKind {
    /// Closes the description over the owning rule and returns the runtime
    /// predicate.
    #[must_use]
    pub fn parse(&self, rule_uid: &Uid, price_tier: PriceTierFilter) -> Box<dyn Condition> {
        match self {
            Self::SubtotalAtLeast { value } => Box::new(SubtotalFloor {
                value: Rational::from(*value),
            }),
            Self::QuantityAtLeast { value, uids } => Box::new(QuantityFloor {
                value: *value,
                uids: uids.clone().unwrap_or_default(),
            }),
            Self::NewCustomer => Box::new(NewCustomerOnly),
            Self::Uids { uids } => Box::new(UidPresence { uids: uids.clone() }),
            Self::Category { value } => Box::new(TaxonomyPresence {
                axis: TaxonomyAxis::Category,
                selector: value.clone(),
                price_tier,
            }),
            Self::Tag { value } => Box::new(TaxonomyPresence {
                axis: TaxonomyAxis::Tag,
                selector: value.clone(),
                price_tier,
            }),
            Self::Attribute { value } => Box::new(AttributePresence {
                selector: value.clone(),
                price_tier,
            }),
            Self::UsageLimit { value } => Box::new(UsageCap {
                rule_uid: rule_uid.clone(),
                value: *value,
                per_customer: false,
            }),
            Self::UsesPerCustomer { value } => Box::new(UsageCap {
                rule_uid: rule_uid.clone(),
                value: *value,
                per_customer: true,
            }),
            Self::CustomerGroup { value } => Box::new(GroupMembership {
                groups: value.clone(),
            }),
            Self::CustomerType { value } => Box::new(AudienceGate { kind: *value }),
            Self::CreditCardPrefix { value } => Box::new(CardPrefixGate {
                prefixes: value.clone(),
            }),
        }
    }
}

#[derive(Debug)]
struct SubtotalFloor {
    value: Rational,
}

impl Condition for SubtotalFloor {
    fn check(&self, buffer: &CalculationBuffer<'_>) -> Vec<String> {
        let total = buffer.cart_subtotal() - buffer.total_discount_without_shipping();
        if total < self.value {
            return vec!["Subtotal amount doesn't reach the minimum requirement.".to_owned()];
        }
        Vec::new()
    }
}

#[derive(Debug)]
struct QuantityFloor {
    value: u32,
    uids: Vec<Uid>,
}

impl Condition for QuantityFloor {
    fn check(&self, buffer: &CalculationBuffer<'_>) -> Vec<String> {
        let selection = buffer.filter_applicable_cart_items(
            &self.uids,
            PriceTierFilter::Include,
            &TaxonomyConditions::default(),
        );
        let calculated = buffer.calculate_cart_items(selection.items());
        if calculated.total_qty() < self.value {
            return vec!["Item quantities doesn't reach the minimum requirement.".to_owned()];
        }
        Vec::new()
    }
}

#[derive(Debug)]
struct NewCustomerOnly;

impl Condition for NewCustomerOnly {
    fn check(&self, buffer: &CalculationBuffer<'_>) -> Vec<String> {
        if buffer.customer().is_none_or(|customer| !customer.is_new_customer) {
            return vec!["This promotion only apply to new customer.".to_owned()];
        }
        Vec::new()
    }
}

#[derive(Debug)]
struct UidPresence {
    uids: Vec<Uid>,
}

impl Condition for UidPresence {
    fn check(&self, buffer: &CalculationBuffer<'_>) -> Vec<String> {
        if self.uids.is_empty() {
            return vec!["This promotion doesn't apply to any product.".to_owned()];
        }
        let listed: FxHashSet<&str> = self.uids.iter().map(Uid::as_str).collect();
        if buffer
            .items()
            .iter()
            .any(|item| listed.contains(item.uid.as_str()))
        {
            return Vec::new();
        }
        vec![NOTHING_IN_ORDER.to_owned()]
    }
}

#[derive(Debug, Clone, Copy)]
enum TaxonomyAxis {
    Category,
    Tag,
}

#[derive(Debug)]
struct TaxonomyPresence {
    axis: TaxonomyAxis,
    selector: TaxonomySelector,
    price_tier: PriceTierFilter,
}

impl Condition for TaxonomyPresence {
    fn check(&self, buffer: &CalculationBuffer<'_>) -> Vec<String> {
        if self.selector.values.is_empty() {
            return vec![INVALID_SELECTOR.to_owned()];
        }
        let query = TaxonomyQuery::new(&self.selector);
        let conditions = match self.axis {
            TaxonomyAxis::Category => TaxonomyConditions {
                categories: Some(query),
                ..TaxonomyConditions::default()
            },
            TaxonomyAxis::Tag => TaxonomyConditions {
                tags: Some(query),
                ..TaxonomyConditions::default()
            },
        };
        let found = buffer.filter_applicable_cart_items(&[], self.price_tier, &conditions);
        if found.is_empty() {
            return vec![NOTHING_IN_ORDER.to_owned()];
        }
        Vec::new()
    }
}

#[derive(Debug)]
struct AttributePresence {
    selector: AttributeSelector,
    price_tier: PriceTierFilter,
}

impl Condition for AttributePresence {
    fn check(&self, buffer: &CalculationBuffer<'_>) -> Vec<String> {
        if self.selector.values.is_empty() {
            return vec![INVALID_SELECTOR.to_owned()];
        }
        let conditions = TaxonomyConditions {
            attributes: Some(AttributeQuery::new(&self.selector)),
            ..TaxonomyConditions::default()
        };
        let found = buffer.filter_applicable_cart_items(&[], self.price_tier, &conditions);
        if found.is_empty() {
            return vec![NOTHING_IN_ORDER.to_owned()];
        }
        Vec::new()
    }
}

#[derive(Debug)]
struct UsageCap {
    rule_uid: Uid,
    value: u32,
    per_customer: bool,
}

impl Condition for UsageCap {
    fn check(&self, buffer: &CalculationBuffer<'_>) -> Vec<String> {
        let record = buffer
            .usage_counts()
            .iter()
            .find(|count| count.sales_rule_id == self.rule_uid);
        let count = record.and_then(|count| {
            if self.per_customer {
                count.by_customer
            } else {
                count.total
            }
        });
        match count {
            Some(_) if buffer.customer().is_none() => vec![MEMBER_ONLY.to_owned()],
            None => vec![MEMBER_ONLY.to_owned()],
            Some(count) if count >= self.value => {
                if self.per_customer {
                    vec!["Your usage limit for this promotion has been exceeded.".to_owned()]
                } else {
                    vec!["This promotion usage limit has been exceeded.".to_owned()]
                }
            }
            Some(_) => Vec::new(),
        }
    }
}

#[derive(Debug)]
struct GroupMembership {
    groups: Vec<String>,
}

impl Condition for GroupMembership {
    fn check(&self, buffer: &CalculationBuffer<'_>) -> Vec<String> {
        let empty = TagSet::empty();
        let memberships = buffer.customer().map_or(&empty, |customer| &customer.customer_groups);
        if self.groups.iter().all(|group| memberships.contains(group)) {
            return Vec::new();
        }
        vec!["This promotion doesn't apply to your customer group".to_owned()]
    }
}

#[derive(Debug)]
struct AudienceGate {
    kind: CustomerKind,
}

impl Condition for AudienceGate {
    fn check(&self, buffer: &CalculationBuffer<'_>) -> Vec<String> {
        match self.kind {
            CustomerKind::All => Vec::new(),
            CustomerKind::Customer => {
                if buffer.customer().is_none() {
                    return vec!["This promotion is only apply to logged in customer.".to_owned()];
                }
                Vec::new()
            }
            CustomerKind::Guest => {
                if buffer.customer().is_some() {
                    return vec!["This promotion is only apply to guest.".to_owned()];
                }
                Vec::new()
            }
        }
    }
}

#[derive(Debug)]
struct CardPrefixGate {
    prefixes: Vec<String>,
}

impl Condition for CardPrefixGate {
    fn check(&self, buffer: &CalculationBuffer<'_>) -> Vec<String> {
        let Some(digest) = buffer.credit_card_prefix().filter(|digest| !digest.is_empty()) else {
            return vec!["Please enter your credit card and try again.".to_owned()];
        };
        if self
            .prefixes
            .iter()
            .any(|prefix| sha256_hex(prefix) == digest)
        {
            return Vec::new();
        }
        vec!["This promotion doesn't apply to your credit card.".to_owned()]
    }
}

fn sha256_hex(value: &str) -> String {
    hex::encode(Sha256::digest(value.as_bytes()))
}
