//! Integration tests running each rule kind through the full pipeline.
//!
//! Unit tests cover the action arithmetic in isolation; these scenarios run
//! `CalculationEngine::process` end to end and assert on the final buffer,
//! one representative cart per rule kind:
//!
//! - fixed percent, unconstrained: 10% of a 200 cart is one cart-wide 20
//! - buy 3 get 2 on a five-unit line: one full cycle, two units free
//! - a subtotal floor short of the cart turns its rule away, verbatim
//! - an amount-off grant is clamped to what the cart is still worth
//! - a fixed volume band splits pro rata across a narrowed selection
//! - shipping waivers only cover fees no earlier grant already paid

use rust_decimal_macros::dec;
use testresult::TestResult;

use tally::{
    buffer::meta::CalculationEngineMeta,
    cart::{CalculationEngineInput, CartItem, DeliveryAddress, Shipping, Uid},
    discounts::{DiscountRecord, ItemDiscount},
    engine::CalculationEngine,
    rational::Rational,
    rules::{
        BuyXGetYRule, ConditionKind, DiscountScope, FixedPercentRule, FixedPriceRule,
        FreeShippingRule, RuleInfo, StepVolumeDiscountRule, VolumeStep, rule,
    },
};

#[test]
fn ten_percent_off_an_unconstrained_cart_is_one_cart_wide_grant() -> TestResult {
    let percent = rule(FixedPercentRule::new(
        RuleInfo::new("R-1", 0, "ten percent"),
        DiscountScope::Auto,
        &[],
        dec!(10),
        None,
    )?);
    let input = CalculationEngineInput::new(vec![CartItem::new("A", 2, dec!(100))], vec![percent]);

    let buffer = CalculationEngine::new().process(&input, CalculationEngineMeta::default());

    assert_eq!(buffer.applicable_rule_uids(), &[Uid::from("R-1")]);

    let grant = buffer
        .whole_cart_discounts()
        .first()
        .ok_or("missing cart-wide grant")?;
    assert_eq!(grant.discounted_amount(), Rational::from_integer(20));
    assert_eq!(grant.amount_for(&Uid::from("A")), Rational::from_integer(20));

    Ok(())
}

#[test]
fn buy_three_get_two_frees_two_units_of_a_five_unit_line() -> TestResult {
    let bogo = rule(BuyXGetYRule::new(
        RuleInfo::new("R-1", 0, "buy 3 get 2"),
        &[],
        3,
        2,
    )?);
    let input = CalculationEngineInput::new(vec![CartItem::new("A", 5, dec!(500))], vec![bogo]);

    let buffer = CalculationEngine::new().process(&input, CalculationEngineMeta::default());

    assert_eq!(buffer.free_qty_for(&Uid::from("A")), 2);
    assert_eq!(
        buffer.total_discount_without_shipping(),
        Rational::from_integer(1000)
    );
    for grant in buffer.item_discounts() {
        assert!(grant.is_set_free(), "free-unit grants must be set-free");
        assert_eq!(
            grant.per_line_discounted_amount(),
            Rational::from_integer(500)
        );
    }

    Ok(())
}

#[test]
fn a_subtotal_floor_short_of_the_cart_turns_the_rule_away() -> TestResult {
    let gated = rule(FixedPercentRule::new(
        RuleInfo::new("R-1", 0, "big spender"),
        DiscountScope::Auto,
        &[ConditionKind::SubtotalAtLeast { value: dec!(150) }],
        dec!(10),
        None,
    )?);
    let input = CalculationEngineInput::new(vec![CartItem::new("A", 1, dec!(100))], vec![gated]);

    let buffer = CalculationEngine::new().process(&input, CalculationEngineMeta::default());

    assert!(buffer.applicable_rule_uids().is_empty());
    assert!(buffer.whole_cart_discounts().is_empty());

    let rejection = buffer.unapplicable_rules().first().ok_or("no rejection")?;
    assert_eq!(rejection.uid, Uid::from("R-1"));
    assert_eq!(
        rejection.errors,
        vec!["Subtotal amount doesn't reach the minimum requirement.".to_owned()]
    );

    Ok(())
}

#[test]
fn an_amount_off_grant_is_clamped_to_the_cart_worth() -> TestResult {
    let generous = rule(FixedPriceRule::new(
        RuleInfo::new("R-1", 0, "four hundred off"),
        DiscountScope::Auto,
        &[],
        dec!(400),
    ));
    let input = CalculationEngineInput::new(
        vec![
            CartItem::new("A", 2, dec!(100)),
            CartItem::new("B", 1, dec!(50)),
        ],
        vec![generous],
    );

    let buffer = CalculationEngine::new().process(&input, CalculationEngineMeta::default());

    assert_eq!(
        buffer.total_discount_without_shipping(),
        Rational::from_integer(250)
    );

    Ok(())
}

#[test]
fn a_fixed_volume_band_splits_pro_rata_across_its_selection() -> TestResult {
    let listed = vec![ConditionKind::Uids {
        uids: vec![Uid::from("C"), Uid::from("D")],
    }];
    let ladder = rule(StepVolumeDiscountRule::new(
        RuleInfo::new("R-1", 0, "bundle price"),
        &listed,
        vec![VolumeStep::fixed(1, None, dec!(60))],
        None,
    )?);
    let input = CalculationEngineInput::new(
        vec![
            CartItem::new("C", 1, dec!(30)),
            CartItem::new("D", 1, dec!(90)),
            CartItem::new("E", 1, dec!(500)),
        ],
        vec![ladder],
    );

    let buffer = CalculationEngine::new().process(&input, CalculationEngineMeta::default());

    let amounts: Vec<Rational> = buffer
        .item_discounts()
        .iter()
        .map(ItemDiscount::per_line_discounted_amount)
        .collect();
    assert_eq!(
        amounts,
        vec![Rational::from_integer(15), Rational::from_integer(45)]
    );
    assert_eq!(buffer.discount_attributed_to(&Uid::from("E")), Rational::ZERO);

    Ok(())
}

#[test]
fn shipping_waivers_cover_only_fees_no_earlier_grant_paid() -> TestResult {
    // Equal priorities run in descending uid order, so R-2 waives both fees
    // first and R-1 finds nothing outstanding.
    let first = rule(FreeShippingRule::new(
        RuleInfo::new("R-1", 0, "free shipping"),
        &[],
    ));
    let second = rule(FreeShippingRule::new(
        RuleInfo::new("R-2", 0, "free shipping again"),
        &[],
    ));
    let input = CalculationEngineInput::new(vec![CartItem::new("A", 1, dec!(10))], vec![first, second])
        .with_delivery_addresses(vec![
            DeliveryAddress::new("home", Shipping::new("standard", dec!(60))),
            DeliveryAddress::new("office", Shipping::new("express", dec!(90))),
        ]);

    let buffer = CalculationEngine::new().process(&input, CalculationEngineMeta::default());

    assert_eq!(
        buffer.applicable_rule_uids(),
        &[Uid::from("R-2"), Uid::from("R-1")]
    );
    assert_eq!(buffer.shipping_discounts().len(), 2);
    assert_eq!(
        buffer.shipping_discount_amount(),
        Rational::from_integer(150)
    );
    for grant in buffer.shipping_discounts() {
        assert_eq!(grant.applicable_rule_uid(), &Uid::from("R-2"));
    }

    Ok(())
}

#[test]
fn a_new_customer_gate_rejects_an_anonymous_checkout() -> TestResult {
    let gated = rule(FixedPercentRule::new(
        RuleInfo::new("R-1", 0, "welcome"),
        DiscountScope::Auto,
        &[ConditionKind::NewCustomer],
        dec!(10),
        None,
    )?);
    let input = CalculationEngineInput::new(vec![CartItem::new("A", 1, dec!(100))], vec![gated]);

    let buffer = CalculationEngine::new().process(&input, CalculationEngineMeta::default());

    let rejection = buffer.unapplicable_rules().first().ok_or("no rejection")?;
    assert_eq!(
        rejection.errors,
        vec!["This promotion only apply to new customer.".to_owned()]
    );

    Ok(())
}
