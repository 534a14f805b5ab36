//! Calculation Buffer
//!
//! The snapshot each rule evaluates against: the immutable engine input, the
//! discounts accumulated so far, and a price-tier switch. Buffers are never
//! mutated; every change produces a successor that shares the input and the
//! one-time price-tier partition.

pub mod filter;
pub mod meta;

use std::sync::Arc;

use rustc_hash::FxHashSet;

use crate::cart::{
    CalculationEngineInput, CartItem, Customer, DeliveryAddress, Uid, UsageCount,
};
use crate::discounts::{DiscountRecord, ItemDiscount, ShippingDiscount, WholeCartDiscount};
use crate::rational::Rational;
use crate::rules::SharedRule;

use self::filter::{PriceTierFilter, TaxonomyConditions};
use self::meta::{CalculationEngineMeta, UnapplicableRule};

/// One-time split of the cart by the price-tier flag.
///
/// Built at the root snapshot and shared by reference into every successor;
/// never rebuilt within one `process` call.
#[derive(Debug)]
struct PriceTierPartition<'a> {
    all: Vec<&'a CartItem>,
    standard: Vec<&'a CartItem>,
    price_tier: Vec<&'a CartItem>,
}

impl<'a> PriceTierPartition<'a> {
    fn build(items: &'a [CartItem]) -> Self {
        let all: Vec<&'a CartItem> = items.iter().collect();
        let standard = all
            .iter()
            .copied()
            .filter(|item| !item.is_price_tier)
            .collect();
        let price_tier = all
            .iter()
            .copied()
            .filter(|item| item.is_price_tier)
            .collect();

        Self {
            all,
            standard,
            price_tier,
        }
    }
}

/// Copy-on-write calculation snapshot.
#[derive(Debug, Clone)]
pub struct CalculationBuffer<'a> {
    input: &'a CalculationEngineInput,
    meta: CalculationEngineMeta,
    exclude_price_tier: bool,
    partition: Arc<PriceTierPartition<'a>>,
}

impl<'a> CalculationBuffer<'a> {
    /// Builds the root snapshot for one `process` call.
    #[must_use]
    pub fn new(input: &'a CalculationEngineInput, meta: CalculationEngineMeta) -> Self {
        Self {
            input,
            meta,
            exclude_price_tier: false,
            partition: Arc::new(PriceTierPartition::build(&input.items)),
        }
    }

    /// Successor snapshot carrying new accumulated state.
    #[must_use]
    pub fn recreate(&self, meta: CalculationEngineMeta) -> Self {
        Self {
            input: self.input,
            meta,
            exclude_price_tier: self.exclude_price_tier,
            partition: Arc::clone(&self.partition),
        }
    }

    /// Successor snapshot with the price-tier switch set for the next rule.
    #[must_use]
    pub fn recreate_excluding_price_tier(&self, exclude_price_tier: bool) -> Self {
        Self {
            input: self.input,
            meta: self.meta.clone(),
            exclude_price_tier,
            partition: Arc::clone(&self.partition),
        }
    }

    /// Successor with one more applied rule recorded.
    #[must_use]
    pub fn push_applicable_rule_uid(&self, uid: Uid) -> Self {
        let mut meta = self.meta.clone();
        meta.applicable_rule_uids.push(uid);
        self.recreate(meta)
    }

    /// Successor with the rejection list replaced.
    #[must_use]
    pub fn set_unapplicable_rules(&self, unapplicable_rules: Vec<UnapplicableRule>) -> Self {
        let mut meta = self.meta.clone();
        meta.unapplicable_rules = unapplicable_rules;
        self.recreate(meta)
    }

    /// The untouched engine input.
    #[must_use]
    pub const fn input(&self) -> &'a CalculationEngineInput {
        self.input
    }

    /// Cart lines visible right now; honors the price-tier switch.
    #[must_use]
    pub fn items(&self) -> &[&'a CartItem] {
        if self.exclude_price_tier {
            &self.partition.standard
        } else {
            &self.partition.all
        }
    }

    /// The customer, when one is attached to the order.
    #[must_use]
    pub fn customer(&self) -> Option<&'a Customer> {
        self.input.customer.as_ref()
    }

    /// Delivery destinations with their shipping quotes.
    #[must_use]
    pub fn delivery_addresses(&self) -> &'a [DeliveryAddress] {
        &self.input.delivery_addresses
    }

    /// Redemption counters for usage-limited rules.
    #[must_use]
    pub fn usage_counts(&self) -> &'a [UsageCount] {
        &self.input.usage_counts
    }

    /// Digest of the paying card's prefix, when one was entered.
    #[must_use]
    pub fn credit_card_prefix(&self) -> Option<&'a str> {
        self.input.credit_card_prefix.as_deref()
    }

    /// The candidate rules, in input order.
    #[must_use]
    pub fn rules(&self) -> &'a [SharedRule] {
        &self.input.rules
    }

    /// Accumulated output state.
    #[must_use]
    pub const fn meta(&self) -> &CalculationEngineMeta {
        &self.meta
    }

    /// Surrenders the accumulated output state.
    #[must_use]
    pub fn into_meta(self) -> CalculationEngineMeta {
        self.meta
    }

    /// Item grants so far.
    #[must_use]
    pub fn item_discounts(&self) -> &[ItemDiscount] {
        &self.meta.item_discounts
    }

    /// Shipping grants so far.
    #[must_use]
    pub fn shipping_discounts(&self) -> &[ShippingDiscount] {
        &self.meta.shipping_discounts
    }

    /// Cart-wide grants so far.
    #[must_use]
    pub fn whole_cart_discounts(&self) -> &[WholeCartDiscount] {
        &self.meta.whole_cart_discounts
    }

    /// Rules applied so far, in application order.
    #[must_use]
    pub fn applicable_rule_uids(&self) -> &[Uid] {
        &self.meta.applicable_rule_uids
    }

    /// Rules rejected so far, with reasons.
    #[must_use]
    pub fn unapplicable_rules(&self) -> &[UnapplicableRule] {
        &self.meta.unapplicable_rules
    }

    /// Selects the lines a rule may touch.
    ///
    /// The price-tier mode picks the pool first. A uid on the whitelist then
    /// admits its line outright; otherwise the taxonomy cascade decides, and
    /// a line no valid query has an opinion on stays out. With no constraint
    /// at all the whole pool is selected and flagged as such.
    #[must_use]
    pub fn filter_applicable_cart_items(
        &self,
        uids: &[Uid],
        price_tier: PriceTierFilter,
        taxonomy: &TaxonomyConditions,
    ) -> FilteredCartItems<'a> {
        let pool: &[&'a CartItem] = match price_tier {
            PriceTierFilter::Only => &self.partition.price_tier,
            PriceTierFilter::Exclude => &self.partition.standard,
            PriceTierFilter::Include => self.items(),
        };

        if uids.is_empty() && !taxonomy.has_valid_query() {
            return FilteredCartItems {
                cart_items: pool.to_vec(),
                is_whole_cart_selection: true,
            };
        }

        let whitelist: FxHashSet<&str> = uids.iter().map(Uid::as_str).collect();
        let cart_items = pool
            .iter()
            .copied()
            .filter(|item| {
                if whitelist.contains(item.uid.as_str()) {
                    return true;
                }
                taxonomy.verdict(item).unwrap_or(false)
            })
            .collect();

        FilteredCartItems {
            cart_items,
            is_whole_cart_selection: false,
        }
    }

    /// Effective totals per line of `items`, given the discounts so far.
    #[must_use]
    pub fn calculate_cart_items(&self, items: &[&'a CartItem]) -> CalculatedCartItems<'a> {
        let mut calculated = Vec::with_capacity(items.len());
        let mut total_qty = 0u32;

        for &item in items {
            let free_qty = self.free_qty_for(&item.uid);
            let total_discounted = self.discount_attributed_to(&item.uid);
            let total_amount = item.line_total() - total_discounted;
            let paying_qty = item.qty.saturating_sub(free_qty);
            let total_per_item_price = if paying_qty == 0 {
                Rational::ZERO
            } else {
                total_amount
                    .checked_div(Rational::from(paying_qty))
                    .unwrap_or_default()
            };

            total_qty += paying_qty;
            calculated.push(CalculatedCartItem {
                item,
                total_discounted,
                total_amount,
                total_per_item_price,
                free_qty,
            });
        }

        CalculatedCartItems {
            items: calculated,
            total_qty,
        }
    }

    /// Σ `per_item_price × qty` over the visible lines.
    #[must_use]
    pub fn cart_subtotal(&self) -> Rational {
        self.items().iter().map(|item| item.line_total()).sum()
    }

    /// Every discount currently attributable to `uid`, item- and cart-wide.
    #[must_use]
    pub fn discount_attributed_to(&self, uid: &Uid) -> Rational {
        let item_part: Rational = self
            .meta
            .item_discounts
            .iter()
            .map(|grant| grant.amount_for(uid))
            .sum();
        let cart_part: Rational = self
            .meta
            .whole_cart_discounts
            .iter()
            .map(|grant| grant.amount_for(uid))
            .sum();

        item_part + cart_part
    }

    /// Total of every item- and cart-wide grant so far.
    ///
    /// Grants on price-tier lines are invisible while the buffer itself
    /// excludes price-tier lines, matching what `items` exposes.
    #[must_use]
    pub fn total_discount_without_shipping(&self) -> Rational {
        let item_part: Rational = self
            .meta
            .item_discounts
            .iter()
            .filter(|grant| !(self.exclude_price_tier && grant.is_price_tier()))
            .map(|grant| grant.per_line_discounted_amount())
            .sum();
        let cart_part: Rational = self
            .meta
            .whole_cart_discounts
            .iter()
            .map(|grant| grant.discounted_amount())
            .sum();

        item_part + cart_part
    }

    /// As [`Self::total_discount_without_shipping`], restricted to the given
    /// uids via per-uid attribution. Duplicate uids count once.
    #[must_use]
    pub fn total_discount_without_shipping_for(&self, uids: &[Uid]) -> Rational {
        let mut seen = FxHashSet::default();
        uids.iter()
            .filter(|uid| seen.insert(uid.as_str()))
            .map(|uid| self.discount_attributed_to(uid))
            .sum()
    }

    /// Total shipping refunded so far.
    #[must_use]
    pub fn shipping_discount_amount(&self) -> Rational {
        self.meta
            .shipping_discounts
            .iter()
            .map(|grant| grant.discounted_amount())
            .sum()
    }

    /// Shipping refunded so far for one delivery address.
    #[must_use]
    pub fn shipping_discount_for(&self, address_uid: &Uid) -> Rational {
        self.meta
            .shipping_discounts
            .iter()
            .filter(|grant| grant.uid() == address_uid)
            .map(|grant| grant.discounted_amount())
            .sum()
    }

    /// Total shipping quoted across every delivery address.
    #[must_use]
    pub fn all_shipping_fees(&self) -> Rational {
        self.input
            .delivery_addresses
            .iter()
            .map(|address| Rational::from(address.shipping.fee))
            .sum()
    }

    /// Units of `uid` already granted free.
    #[must_use]
    pub fn free_qty_for(&self, uid: &Uid) -> u32 {
        self.count_set_free_grants(Some(uid))
    }

    /// Set-free item grants so far, optionally narrowed to one uid.
    #[must_use]
    pub fn count_set_free_grants(&self, uid: Option<&Uid>) -> u32 {
        let count = self
            .meta
            .item_discounts
            .iter()
            .filter(|grant| grant.is_set_free() && uid.is_none_or(|want| grant.uid() == want))
            .count();

        u32::try_from(count).unwrap_or(u32::MAX)
    }

    /// Cheapest visible line among those sharing `uid`.
    ///
    /// Lines with equal uids are one interchangeable group; this resolves the
    /// group to the line a free unit should come from.
    #[must_use]
    pub fn cheapest_item_from_group_by_sku(&self, uid: &Uid) -> Option<&'a CartItem> {
        self.items()
            .iter()
            .copied()
            .filter(|item| item.uid == *uid)
            .min_by_key(|item| item.per_item_price)
    }
}

/// Result of a cart selection.
#[derive(Debug, Clone)]
pub struct FilteredCartItems<'a> {
    cart_items: Vec<&'a CartItem>,
    is_whole_cart_selection: bool,
}

impl<'a> FilteredCartItems<'a> {
    /// The selected lines, in pool order.
    #[must_use]
    pub fn items(&self) -> &[&'a CartItem] {
        &self.cart_items
    }

    /// Whether the selection is the unconstrained whole pool.
    #[must_use]
    pub const fn is_whole_cart_selection(&self) -> bool {
        self.is_whole_cart_selection
    }

    /// Uids of the selected lines, in pool order.
    #[must_use]
    pub fn uids(&self) -> Vec<Uid> {
        self.cart_items.iter().map(|item| item.uid.clone()).collect()
    }

    /// True when nothing matched.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cart_items.is_empty()
    }

    /// Number of selected lines.
    #[must_use]
    pub fn len(&self) -> usize {
        self.cart_items.len()
    }

    /// Σ `per_item_price × qty` over the selection.
    #[must_use]
    pub fn subtotal(&self) -> Rational {
        self.cart_items.iter().map(|item| item.line_total()).sum()
    }
}

/// One line with its effective totals after the discounts so far.
#[derive(Debug, Clone)]
pub struct CalculatedCartItem<'a> {
    item: &'a CartItem,
    total_discounted: Rational,
    total_amount: Rational,
    total_per_item_price: Rational,
    free_qty: u32,
}

impl<'a> CalculatedCartItem<'a> {
    /// The underlying cart line.
    #[must_use]
    pub const fn item(&self) -> &'a CartItem {
        self.item
    }

    /// Line identity.
    #[must_use]
    pub fn uid(&self) -> &'a Uid {
        &self.item.uid
    }

    /// Discount already attributed to this uid.
    #[must_use]
    pub const fn total_discounted(&self) -> Rational {
        self.total_discounted
    }

    /// Line total after the discounts so far.
    #[must_use]
    pub const fn total_amount(&self) -> Rational {
        self.total_amount
    }

    /// Effective price of one paying unit; zero when every unit is free.
    #[must_use]
    pub const fn total_per_item_price(&self) -> Rational {
        self.total_per_item_price
    }

    /// Units already granted free.
    #[must_use]
    pub const fn free_qty(&self) -> u32 {
        self.free_qty
    }

    /// Units still paying.
    #[must_use]
    pub fn remaining_qty(&self) -> u32 {
        self.item.qty.saturating_sub(self.free_qty)
    }
}

/// A calculated selection with its paying quantity.
#[derive(Debug, Clone)]
pub struct CalculatedCartItems<'a> {
    items: Vec<CalculatedCartItem<'a>>,
    total_qty: u32,
}

impl<'a> CalculatedCartItems<'a> {
    /// The calculated lines, in selection order.
    #[must_use]
    pub fn items(&self) -> &[CalculatedCartItem<'a>] {
        &self.items
    }

    /// Surrenders the calculated lines.
    #[must_use]
    pub fn into_items(self) -> Vec<CalculatedCartItem<'a>> {
        self.items
    }

    /// Σ `qty − free_qty` over the selection.
    #[must_use]
    pub const fn total_qty(&self) -> u32 {
        self.total_qty
    }

    /// Σ effective line totals over the selection.
    #[must_use]
    pub fn total_amount(&self) -> Rational {
        self.items.iter().map(CalculatedCartItem::total_amount).sum()
    }
}
