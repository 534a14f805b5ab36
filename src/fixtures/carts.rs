//! Cart Fixtures

use serde::Deserialize;

use crate::cart::{CartItem, Customer, DeliveryAddress, UsageCount};

/// A cart description as written in a `carts/<name>.yml` fixture file.
///
/// Only `items` is required; everything else defaults to the anonymous,
/// single-lookup checkout the engine assumes when the field is absent.
#[derive(Debug, Clone, Deserialize)]
pub struct CartFixture {
    /// Cart lines
    pub items: Vec<CartItem>,

    /// The customer, when the scenario has one logged in
    #[serde(default)]
    pub customer: Option<Customer>,

    /// Delivery destinations with shipping quotes
    #[serde(default)]
    pub delivery_addresses: Vec<DeliveryAddress>,

    /// Redemption counters for usage-limited rules
    #[serde(default)]
    pub usage_counts: Vec<UsageCount>,

    /// Hex digest of the customer's card prefix
    #[serde(default)]
    pub credit_card_prefix: Option<String>,

    /// Treat every rule's conditions as satisfied
    #[serde(default)]
    pub ignore_condition: bool,
}

#[cfg(test)]
mod tests {
    use rust_decimal_macros::dec;
    use testresult::TestResult;

    use super::*;

    #[test]
    fn a_cart_description_parses_items_customer_and_addresses() -> TestResult {
        let yaml = concat!(
            "items:\n",
            "  - uid: espresso-beans\n",
            "    qty: 2\n",
            "    per_item_price: 100\n",
            "    categories: [coffee]\n",
            "customer:\n",
            "  unique_id: C-100\n",
            "  is_new_customer: true\n",
            "delivery_addresses:\n",
            "  - uid: home\n",
            "    city: Berlin\n",
            "    shipping:\n",
            "      type: standard\n",
            "      fee: 60\n",
            "usage_counts:\n",
            "  - sales_rule_id: R-100\n",
            "    total: 3\n",
        );

        let cart: CartFixture = serde_norway::from_str(yaml)?;

        assert_eq!(cart.items.len(), 1);

        let item = cart.items.first().ok_or("missing item")?;
        assert_eq!(item.per_item_price, dec!(100));
        assert!(item.categories.contains("coffee"));

        let customer = cart.customer.ok_or("expected a customer")?;
        assert!(customer.is_new_customer);

        let address = cart.delivery_addresses.first().ok_or("missing address")?;
        assert_eq!(address.shipping.kind, "standard");
        assert_eq!(address.shipping.fee, dec!(60));

        let usage = cart.usage_counts.first().ok_or("missing usage count")?;
        assert_eq!(usage.total, Some(3));

        Ok(())
    }

    #[test]
    fn optional_blocks_default_to_an_anonymous_checkout() -> TestResult {
        let yaml = "items:\n  - uid: A\n    qty: 1\n    per_item_price: 10\n";
        let cart: CartFixture = serde_norway::from_str(yaml)?;

        assert!(cart.customer.is_none());
        assert!(cart.delivery_addresses.is_empty());
        assert!(cart.usage_counts.is_empty());
        assert!(cart.credit_card_prefix.is_none());
        assert!(!cart.ignore_condition);

        Ok(())
    }

    #[test]
    fn price_tier_and_attribute_taxonomies_parse() -> TestResult {
        let yaml = concat!(
            "items:\n",
            "  - uid: travel-mug\n",
            "    qty: 1\n",
            "    per_item_price: 30\n",
            "    is_price_tier: true\n",
            "    attributes:\n",
            "      colour: [red, blue]\n",
        );

        let cart: CartFixture = serde_norway::from_str(yaml)?;
        let item = cart.items.first().ok_or("missing item")?;

        assert!(item.is_price_tier);

        let colours = item.attributes.get("colour").ok_or("missing attribute")?;
        assert!(colours.contains("red"));
        assert!(colours.contains("blue"));

        Ok(())
    }
}
