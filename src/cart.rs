//! Cart Data Model
//!
//! The immutable input side of a calculation: items, customer, delivery
//! addresses, rule usage counters, and the input envelope itself.

use std::fmt;

use rust_decimal::Decimal;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::rational::Rational;
use crate::rules::SharedRule;
use crate::tags::TagSet;

/// Identifier shared by cart items, promotion rules, and delivery addresses.
///
/// Ordering is lexicographic. The engine relies on it to break ties between
/// rules of equal priority, so it must be total and stable.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Deserialize, Serialize)]
#[serde(transparent)]
pub struct Uid(String);

impl Uid {
    /// Creates a uid from anything string-like.
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// The uid as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Uid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Uid {
    fn from(value: &str) -> Self {
        Self(value.to_owned())
    }
}

impl From<String> for Uid {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<u32> for Uid {
    fn from(value: u32) -> Self {
        Self(value.to_string())
    }
}

/// One cart line: a quantity of a single SKU at a unit price.
///
/// Several lines may share a `uid`; rules treat equal-uid lines as one
/// interchangeable group when hunting for the cheapest unit.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct CartItem {
    /// SKU identity.
    pub uid: Uid,

    /// Number of units on the line, at least one.
    pub qty: u32,

    /// Unit price.
    pub per_item_price: Decimal,

    /// Category taxonomy the SKU belongs to.
    #[serde(default)]
    pub categories: TagSet,

    /// Free-form tag taxonomy.
    #[serde(default)]
    pub tags: TagSet,

    /// Custom attribute taxonomy, keyed by attribute code.
    #[serde(default)]
    pub attributes: FxHashMap<String, TagSet>,

    /// Price-tier lines are excluded from rules that declare themselves
    /// not eligible to price tiers.
    #[serde(default)]
    pub is_price_tier: bool,
}

impl CartItem {
    /// Creates a plain line with no taxonomy.
    pub fn new(uid: impl Into<Uid>, qty: u32, per_item_price: Decimal) -> Self {
        Self {
            uid: uid.into(),
            qty,
            per_item_price,
            categories: TagSet::empty(),
            tags: TagSet::empty(),
            attributes: FxHashMap::default(),
            is_price_tier: false,
        }
    }

    /// Sets the category taxonomy.
    #[must_use]
    pub fn with_categories(
        mut self,
        categories: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        self.categories = TagSet::new(categories.into_iter().map(Into::into).collect());
        self
    }

    /// Sets the tag taxonomy.
    #[must_use]
    pub fn with_tags(mut self, tags: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.tags = TagSet::new(tags.into_iter().map(Into::into).collect());
        self
    }

    /// Adds one custom attribute.
    #[must_use]
    pub fn with_attribute(
        mut self,
        code: impl Into<String>,
        values: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        self.attributes.insert(
            code.into(),
            TagSet::new(values.into_iter().map(Into::into).collect()),
        );
        self
    }

    /// Marks the line as a price-tier line.
    #[must_use]
    pub fn price_tier(mut self) -> Self {
        self.is_price_tier = true;
        self
    }

    /// Undiscounted line total, `per_item_price * qty`.
    #[must_use]
    pub fn line_total(&self) -> Rational {
        Rational::from(self.per_item_price) * Rational::from(self.qty)
    }
}

/// The customer attached to the calculation, when one is known.
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize, Serialize)]
pub struct Customer {
    /// Stable customer identity.
    pub unique_id: Uid,

    /// Contact email.
    #[serde(default)]
    pub email: String,

    /// Contact phone number.
    #[serde(default)]
    pub msisdn: String,

    /// Whether this is the customer's first order.
    #[serde(default)]
    pub is_new_customer: bool,

    /// Loyalty tier, when the store uses tiers.
    #[serde(default)]
    pub tier: Option<String>,

    /// Groups the customer belongs to.
    #[serde(default)]
    pub customer_groups: TagSet,
}

impl Customer {
    /// Creates a customer with just an identity.
    pub fn new(unique_id: impl Into<Uid>) -> Self {
        Self {
            unique_id: unique_id.into(),
            ..Self::default()
        }
    }

    /// Marks the customer as new.
    #[must_use]
    pub fn new_customer(mut self) -> Self {
        self.is_new_customer = true;
        self
    }

    /// Sets the customer groups.
    #[must_use]
    pub fn with_customer_groups(
        mut self,
        groups: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        self.customer_groups = TagSet::new(groups.into_iter().map(Into::into).collect());
        self
    }
}

/// Shipping method and fee quoted for one delivery address.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Shipping {
    /// Carrier or method name.
    #[serde(rename = "type")]
    pub kind: String,

    /// Quoted fee.
    pub fee: Decimal,
}

impl Shipping {
    /// Builds a shipping quote.
    pub fn new(kind: impl Into<String>, fee: Decimal) -> Self {
        Self {
            kind: kind.into(),
            fee,
        }
    }
}

/// A delivery destination with its quoted shipping.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct DeliveryAddress {
    /// Address identity; shipping discounts point back at it.
    pub uid: Uid,

    /// Postal code.
    #[serde(default)]
    pub postal_code: String,

    /// City name.
    #[serde(default)]
    pub city: String,

    /// Country name or code.
    #[serde(default)]
    pub country: String,

    /// Shipping quoted for this address.
    pub shipping: Shipping,
}

impl DeliveryAddress {
    /// Creates an address with just an identity and a shipping quote.
    pub fn new(uid: impl Into<Uid>, shipping: Shipping) -> Self {
        Self {
            uid: uid.into(),
            postal_code: String::new(),
            city: String::new(),
            country: String::new(),
            shipping,
        }
    }
}

/// How often a rule has been redeemed, supplied by the surrounding system.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct UsageCount {
    /// The rule the counters belong to.
    pub sales_rule_id: Uid,

    /// Redemptions across all customers, when tracked.
    #[serde(default)]
    pub total: Option<u32>,

    /// Redemptions by the current customer, when tracked.
    #[serde(default)]
    pub by_customer: Option<u32>,
}

impl UsageCount {
    /// Creates a usage counter for one rule.
    pub fn new(sales_rule_id: impl Into<Uid>, total: Option<u32>, by_customer: Option<u32>) -> Self {
        Self {
            sales_rule_id: sales_rule_id.into(),
            total,
            by_customer,
        }
    }
}

/// Everything one `process` call reads. Immutable for the duration of the
/// call; buffers borrow it rather than copy it.
#[derive(Debug, Clone, Default)]
pub struct CalculationEngineInput {
    /// Cart lines.
    pub items: Vec<CartItem>,

    /// The customer, when logged in.
    pub customer: Option<Customer>,

    /// Delivery destinations with shipping quotes.
    pub delivery_addresses: Vec<DeliveryAddress>,

    /// Candidate promotion rules, in any order.
    pub rules: Vec<SharedRule>,

    /// Redemption counters for usage-limited rules.
    pub usage_counts: Vec<UsageCount>,

    /// When set, every rule's conditions are treated as satisfied.
    pub ignore_condition: bool,

    /// Hex digest of the customer's card prefix, for prefix-gated rules.
    pub credit_card_prefix: Option<String>,
}

impl CalculationEngineInput {
    /// Creates an input from items and rules; everything else is optional.
    #[must_use]
    pub fn new(items: Vec<CartItem>, rules: Vec<SharedRule>) -> Self {
        Self {
            items,
            rules,
            ..Self::default()
        }
    }

    /// Attaches a customer.
    #[must_use]
    pub fn with_customer(mut self, customer: Customer) -> Self {
        self.customer = Some(customer);
        self
    }

    /// Attaches delivery addresses.
    #[must_use]
    pub fn with_delivery_addresses(mut self, addresses: Vec<DeliveryAddress>) -> Self {
        self.delivery_addresses = addresses;
        self
    }

    /// Attaches usage counters.
    #[must_use]
    pub fn with_usage_counts(mut self, counts: Vec<UsageCount>) -> Self {
        self.usage_counts = counts;
        self
    }

    /// Attaches the card-prefix digest.
    #[must_use]
    pub fn with_credit_card_prefix(mut self, digest: impl Into<String>) -> Self {
        self.credit_card_prefix = Some(digest.into());
        self
    }

    /// Skips condition evaluation for every rule.
    #[must_use]
    pub fn ignoring_conditions(mut self) -> Self {
        self.ignore_condition = true;
        self
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal_macros::dec;

    use super::*;

    #[test]
    fn uid_ordering_is_lexicographic() {
        assert!(Uid::from("2") > Uid::from("1"));
        assert!(Uid::from("10") < Uid::from("2"));
        assert_eq!(Uid::from(7_u32), Uid::from("7"));
    }

    #[test]
    fn line_total_multiplies_price_by_qty() {
        let item = CartItem::new("SKU-1", 3, dec!(19.99));

        assert_eq!(item.line_total().to_decimal(), dec!(59.97));
    }

    #[test]
    fn cart_item_builders_set_taxonomy() {
        let item = CartItem::new("SKU-1", 1, dec!(5))
            .with_categories(["drinks"])
            .with_tags(["cold"])
            .with_attribute("size", ["large"])
            .price_tier();

        assert!(item.categories.contains("drinks"));
        assert!(item.tags.contains("cold"));
        assert!(item.attributes.get("size").is_some_and(|v| v.contains("large")));
        assert!(item.is_price_tier);
    }

    #[test]
    fn customer_builders_work() {
        let customer = Customer::new("C-1")
            .new_customer()
            .with_customer_groups(["vip"]);

        assert!(customer.is_new_customer);
        assert!(customer.customer_groups.contains("vip"));
    }
}
