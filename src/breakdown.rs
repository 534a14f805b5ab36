//! Breakdown
//!
//! Itemized rendering of a finished calculation: one table row per cart
//! line, one per delivery address, then a subtotal, discount, and total
//! summary block.

use std::io;

use decimal_percentage::Percentage;
use rust_decimal::Decimal;
use tabled::Table;
use tabled::builder::Builder;
use tabled::settings::object::{Columns, Rows};
use tabled::settings::{Alignment, Color, Style};
use thiserror::Error;

use crate::buffer::CalculationBuffer;
use crate::cart::CartItem;
use crate::rational::Rational;

/// Errors that can occur when writing a breakdown.
#[derive(Debug, Error)]
pub enum BreakdownError {
    /// The output sink rejected the rendered text.
    #[error("failed to write the breakdown")]
    Io(#[from] io::Error),
}

/// One rendered cart line.
#[derive(Debug, Clone)]
struct ItemRow {
    uid: String,
    qty: u32,
    free_qty: u32,
    unit_price: Decimal,
    discount: Decimal,
    line_total: Decimal,
}

/// One rendered delivery address.
#[derive(Debug, Clone)]
struct ShippingRow {
    uid: String,
    kind: String,
    fee: Decimal,
    refunded: Decimal,
}

/// Itemized view of a finished calculation, ready to render.
///
/// Amounts leave the fractional domain here; everything upstream of the
/// breakdown stays exact.
#[derive(Debug, Clone)]
pub struct Breakdown {
    item_rows: Vec<ItemRow>,
    shipping_rows: Vec<ShippingRow>,
    subtotal: Decimal,
    total_discount: Decimal,
    shipping_total: Decimal,
    shipping_discount: Decimal,
}

impl Breakdown {
    /// Snapshots the final buffer into renderable rows and totals.
    ///
    /// Every line and every grant counts here; the buffer's price-tier
    /// switch only narrows what rules see, never what the cart owes.
    #[must_use]
    pub fn from_buffer(buffer: &CalculationBuffer<'_>) -> Self {
        let items: Vec<&CartItem> = buffer.input().items.iter().collect();
        let calculated = buffer.calculate_cart_items(&items);

        let item_rows = calculated
            .items()
            .iter()
            .map(|line| ItemRow {
                uid: line.uid().to_string(),
                qty: line.item().qty,
                free_qty: line.free_qty(),
                unit_price: line.item().per_item_price,
                discount: line.total_discounted().to_decimal(),
                line_total: line.total_amount().to_decimal(),
            })
            .collect();

        let shipping_rows = buffer
            .delivery_addresses()
            .iter()
            .map(|address| ShippingRow {
                uid: address.uid.to_string(),
                kind: address.shipping.kind.clone(),
                fee: address.shipping.fee,
                refunded: buffer.shipping_discount_for(&address.uid).to_decimal(),
            })
            .collect();

        let subtotal: Rational = items.iter().map(|item| item.line_total()).sum();
        let item_part: Rational = buffer
            .item_discounts()
            .iter()
            .map(|grant| grant.per_line_discounted_amount())
            .sum();
        let cart_part: Rational = buffer
            .whole_cart_discounts()
            .iter()
            .map(|grant| grant.discounted_amount())
            .sum();

        Self {
            item_rows,
            shipping_rows,
            subtotal: subtotal.to_decimal(),
            total_discount: (item_part + cart_part).to_decimal(),
            shipping_total: buffer.all_shipping_fees().to_decimal(),
            shipping_discount: buffer.shipping_discount_amount().to_decimal(),
        }
    }

    /// Σ `per_item_price × qty` over every cart line.
    #[must_use]
    pub const fn subtotal(&self) -> Decimal {
        self.subtotal
    }

    /// Item and cart-wide grants combined.
    #[must_use]
    pub const fn total_discount(&self) -> Decimal {
        self.total_discount
    }

    /// Quoted shipping across every delivery address.
    #[must_use]
    pub const fn shipping_total(&self) -> Decimal {
        self.shipping_total
    }

    /// Shipping refunded across every delivery address.
    #[must_use]
    pub const fn shipping_discount(&self) -> Decimal {
        self.shipping_discount
    }

    /// What the customer pays: discounted items plus outstanding shipping.
    #[must_use]
    pub fn grand_total(&self) -> Decimal {
        self.subtotal - self.total_discount + self.shipping_total - self.shipping_discount
    }

    /// Everything granted, item-side and shipping-side.
    #[must_use]
    pub fn savings(&self) -> Decimal {
        self.total_discount + self.shipping_discount
    }

    /// Savings as a fraction of the pre-discount total.
    #[must_use]
    pub fn savings_percent(&self) -> Percentage {
        let basis = self.subtotal + self.shipping_total;

        if basis.is_zero() {
            return Percentage::from(0.0);
        }

        Percentage::from(self.savings() / basis)
    }

    /// Renders the itemized tables and the summary block.
    ///
    /// # Errors
    ///
    /// Returns a [`BreakdownError`] when the sink rejects a write.
    pub fn write_to(&self, mut out: impl io::Write) -> Result<(), BreakdownError> {
        self.write_item_table(&mut out)?;

        if !self.shipping_rows.is_empty() {
            self.write_shipping_table(&mut out)?;
        }

        self.write_summary(&mut out)
    }

    fn write_item_table(&self, out: &mut impl io::Write) -> Result<(), BreakdownError> {
        let mut builder = Builder::default();

        builder.push_record(["Item", "Qty", "Free", "Unit Price", "Discount", "Line Total"]);

        for row in &self.item_rows {
            builder.push_record([
                row.uid.clone(),
                row.qty.to_string(),
                row.free_qty.to_string(),
                format!("{:.2}", row.unit_price),
                format!("{:.2}", row.discount),
                format!("{:.2}", row.line_total),
            ]);
        }

        writeln!(out, "\n{}", style_table(builder))?;

        Ok(())
    }

    fn write_shipping_table(&self, out: &mut impl io::Write) -> Result<(), BreakdownError> {
        let mut builder = Builder::default();

        builder.push_record(["Address", "Method", "Fee", "Refunded"]);

        for row in &self.shipping_rows {
            builder.push_record([
                row.uid.clone(),
                row.kind.clone(),
                format!("{:.2}", row.fee),
                format!("{:.2}", row.refunded),
            ]);
        }

        writeln!(out, "{}", style_table(builder))?;

        Ok(())
    }

    fn write_summary(&self, out: &mut impl io::Write) -> Result<(), BreakdownError> {
        let percent_points = percent_points_from_fraction(self.savings_percent());

        let mut lines: Vec<(&str, String)> = vec![
            ("Subtotal:", format!("{:.2}", self.subtotal)),
            ("Discount:", format!("{:.2}", self.total_discount)),
        ];

        if !self.shipping_rows.is_empty() {
            lines.push(("Shipping:", format!("{:.2}", self.shipping_total)));
            lines.push(("Shipping discount:", format!("{:.2}", self.shipping_discount)));
        }

        lines.push((
            "Savings:",
            format!("({percent_points:.2}%) {:.2}", self.savings()),
        ));
        lines.push(("Total:", format!("{:.2}", self.grand_total())));

        let label_width = lines.iter().map(|(label, _)| label.len()).max().unwrap_or(0);
        let value_width = lines.iter().map(|(_, value)| value.len()).max().unwrap_or(0);

        for (label, value) in &lines {
            writeln!(out, " {label:>label_width$}  {value:>value_width$}")?;
        }

        writeln!(out)?;

        Ok(())
    }
}

/// Shared look of both tables: rounded borders, bold header, numbers right.
fn style_table(builder: Builder) -> Table {
    let mut table = builder.build();

    table.with(Style::modern_rounded());
    table.modify(Rows::first(), Color::BOLD);
    table.modify(Columns::new(1..), Alignment::right());

    table
}

/// Converts a fractional percentage to rounded percent points for display.
fn percent_points_from_fraction(percentage: Percentage) -> Decimal {
    // `Percentage` is a fraction (e.g. 0.25); scale to percent points.
    ((percentage * Decimal::ONE) * Decimal::ONE_HUNDRED).round_dp(2)
}

#[cfg(test)]
mod tests {
    use rust_decimal_macros::dec;
    use testresult::TestResult;

    use super::*;
    use crate::buffer::meta::CalculationEngineMeta;
    use crate::cart::{CalculationEngineInput, DeliveryAddress, Shipping, Uid};
    use crate::discounts::{
        ItemDiscount, ShippingDiscount, WeightDistribution, WholeCartDiscount,
    };

    fn checkout_input() -> CalculationEngineInput {
        CalculationEngineInput::new(
            vec![
                CartItem::new("A", 2, dec!(100)),
                CartItem::new("B", 1, dec!(50)),
            ],
            vec![],
        )
    }

    #[test]
    fn totals_fold_both_discount_shapes() {
        let input = checkout_input();
        let meta = CalculationEngineMeta::default()
            .with_item_discounts([ItemDiscount::new("r1", "A", Rational::from(dec!(30)))])
            .with_whole_cart_discount(WholeCartDiscount::new(
                "r2",
                Rational::from(dec!(25)),
                WeightDistribution::from_pairs([
                    (Uid::from("A"), Rational::from(dec!(170))),
                    (Uid::from("B"), Rational::from(dec!(50))),
                ]),
            ));
        let buffer = CalculationBuffer::new(&input, meta);

        let breakdown = Breakdown::from_buffer(&buffer);

        assert_eq!(breakdown.subtotal(), dec!(250));
        assert_eq!(breakdown.total_discount(), dec!(55));
        assert_eq!(breakdown.grand_total(), dec!(195));
    }

    #[test]
    fn price_tier_grants_stay_visible_after_a_narrowing_rule() {
        let input = CalculationEngineInput::new(
            vec![
                CartItem::new("A", 1, dec!(100)),
                CartItem::new("P", 1, dec!(60)).price_tier(),
            ],
            vec![],
        );
        let meta = CalculationEngineMeta::default().with_item_discounts([
            ItemDiscount::new("r1", "P", Rational::from(dec!(6))).price_tier(true),
        ]);
        let narrowed = CalculationBuffer::new(&input, meta).recreate_excluding_price_tier(true);

        let breakdown = Breakdown::from_buffer(&narrowed);

        assert_eq!(breakdown.subtotal(), dec!(160));
        assert_eq!(breakdown.total_discount(), dec!(6));
    }

    #[test]
    fn savings_percent_relates_savings_to_the_pre_discount_total() {
        let mut input = checkout_input();
        input.delivery_addresses = vec![DeliveryAddress::new(
            "home",
            Shipping::new("standard", dec!(50)),
        )];
        let meta = CalculationEngineMeta::default()
            .with_item_discounts([ItemDiscount::new("r1", "A", Rational::from(dec!(55)))])
            .with_shipping_discounts([ShippingDiscount::new(
                "r2",
                "home",
                Rational::from(dec!(20)),
            )]);
        let buffer = CalculationBuffer::new(&input, meta);

        let breakdown = Breakdown::from_buffer(&buffer);

        // 75 granted against a 300 pre-discount total.
        assert_eq!(breakdown.savings(), dec!(75));
        assert_eq!(
            percent_points_from_fraction(breakdown.savings_percent()),
            dec!(25)
        );
    }

    #[test]
    fn savings_percent_is_zero_on_an_empty_cart() {
        let input = CalculationEngineInput::default();
        let buffer = CalculationBuffer::new(&input, CalculationEngineMeta::default());

        let breakdown = Breakdown::from_buffer(&buffer);

        assert_eq!(breakdown.savings_percent(), Percentage::from(0.0));
    }

    #[test]
    fn write_to_renders_rows_and_summary() -> TestResult {
        let mut input = checkout_input();
        input.delivery_addresses = vec![DeliveryAddress::new(
            "home",
            Shipping::new("standard", dec!(50)),
        )];
        let meta = CalculationEngineMeta::default()
            .with_item_discounts([ItemDiscount::new("r1", "A", Rational::from(dec!(55)))])
            .with_shipping_discounts([ShippingDiscount::new(
                "r2",
                "home",
                Rational::from(dec!(20)),
            )]);
        let buffer = CalculationBuffer::new(&input, meta);

        let mut out = Vec::new();
        Breakdown::from_buffer(&buffer).write_to(&mut out)?;

        let output = String::from_utf8(out)?;
        assert!(output.contains("Unit Price"));
        assert!(output.contains("Refunded"));
        assert!(output.contains("standard"));
        assert!(output.contains("Subtotal:"));
        assert!(output.contains("(25.00%) 75.00"));
        assert!(output.contains("Total:"));
        assert!(output.contains("225.00"));

        Ok(())
    }

    #[test]
    fn set_free_grants_show_as_free_units() -> TestResult {
        let input = CalculationEngineInput::new(vec![CartItem::new("A", 2, dec!(100))], vec![]);
        let meta = CalculationEngineMeta::default().with_item_discounts([
            ItemDiscount::new("r1", "A", Rational::from(dec!(100))).set_free(),
        ]);
        let buffer = CalculationBuffer::new(&input, meta);

        let breakdown = Breakdown::from_buffer(&buffer);
        assert_eq!(breakdown.grand_total(), dec!(100));

        let mut out = Vec::new();
        breakdown.write_to(&mut out)?;

        let output = String::from_utf8(out)?;
        assert!(output.contains("Free"));
        assert!(output.contains("100.00"));

        Ok(())
    }
}
