//! Calculation Engine
//!
//! Drives the rule pipeline: rules run in a deterministic order, each seeing
//! the cart through a fresh buffer snapshot that already carries every grant
//! made before it.

use rustc_hash::FxHashSet;

use crate::buffer::meta::{CalculationEngineMeta, UnapplicableRule};
use crate::buffer::CalculationBuffer;
use crate::cart::{CalculationEngineInput, Uid};
use crate::rules::{Condition, Rule, SharedRule};

const CANNOT_BE_APPLIED: &str = "This promotion cannot be applied.";

/// Callbacks for following one `process` run from the outside.
///
/// Every method has an empty default body; implement only the ones of
/// interest. The engine invokes them synchronously, in pipeline order.
pub trait EngineObserver {
    /// A rule passed its conditions; its actions run next.
    fn on_rule_applied(&mut self, _rule: &dyn Rule) {}

    /// A rule's conditions turned it away.
    ///
    /// # Parameters
    ///
    /// - `errors`: de-duplicated failure reasons, in first-seen order.
    fn on_rule_rejected(&mut self, _rule: &dyn Rule, _errors: &[String]) {}

    /// A rule was passed over because an earlier rule stopped the pipeline.
    fn on_rule_discarded(&mut self, _rule: &dyn Rule) {}

    /// One action produced its successor meta.
    fn on_action_performed(&mut self, _rule: &dyn Rule, _meta: &CalculationEngineMeta) {}
}

/// Observer that ignores every callback.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopObserver;

impl EngineObserver for NoopObserver {}

/// Runs the promotion rules of an input over its cart.
#[derive(Debug, Default, Clone, Copy)]
pub struct CalculationEngine;

impl CalculationEngine {
    /// Creates an engine.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Processes the input silently, starting from `meta`.
    #[must_use]
    pub fn process<'a>(
        &self,
        input: &'a CalculationEngineInput,
        meta: CalculationEngineMeta,
    ) -> CalculationBuffer<'a> {
        self.process_with_observer(input, meta, &mut NoopObserver)
    }

    /// Processes the input, reporting each pipeline step to `observer`.
    ///
    /// Rules run ordered by ascending priority, ties broken by descending
    /// uid. Each iteration re-snapshots the buffer with the rule's own
    /// price-tier eligibility before anything else, so conditions and
    /// actions agree on what the rule may see.
    #[must_use]
    pub fn process_with_observer<'a>(
        &self,
        input: &'a CalculationEngineInput,
        meta: CalculationEngineMeta,
        observer: &mut dyn EngineObserver,
    ) -> CalculationBuffer<'a> {
        let mut ordered: Vec<&SharedRule> = input.rules.iter().collect();
        ordered.sort_by(|a, b| {
            a.priority()
                .cmp(&b.priority())
                .then_with(|| b.uid().cmp(a.uid()))
        });

        let mut buffer = CalculationBuffer::new(input, meta);
        let mut stop = false;
        for rule in ordered {
            buffer = buffer.recreate_excluding_price_tier(rule.not_eligible_to_price_tier());
            if stop {
                observer.on_rule_discarded(rule.as_ref());
                buffer = reject(&buffer, rule.uid(), vec![CANNOT_BE_APPLIED.to_owned()]);
                continue;
            }

            let errors = if input.ignore_condition {
                Vec::new()
            } else {
                collect_errors(rule.conditions(), &buffer)
            };
            if !errors.is_empty() {
                observer.on_rule_rejected(rule.as_ref(), &errors);
                buffer = reject(&buffer, rule.uid(), errors);
                continue;
            }

            observer.on_rule_applied(rule.as_ref());
            buffer = buffer.push_applicable_rule_uid(rule.uid().clone());
            for action in rule.actions() {
                let next = action.perform(&buffer);
                observer.on_action_performed(rule.as_ref(), &next);
                buffer = buffer.recreate(next);
            }
            if rule.stop_rules_processing() {
                stop = true;
            }
        }
        buffer
    }
}

/// Every condition's reasons, flattened and de-duplicated in first-seen
/// order.
fn collect_errors(
    conditions: &[Box<dyn Condition>],
    buffer: &CalculationBuffer<'_>,
) -> Vec<String> {
    let mut seen = FxHashSet::default();
    conditions
        .iter()
        .flat_map(|condition| condition.check(buffer))
        .filter(|error| seen.insert(error.clone()))
        .collect()
}

fn reject<'a>(
    buffer: &CalculationBuffer<'a>,
    uid: &Uid,
    errors: Vec<String>,
) -> CalculationBuffer<'a> {
    let mut rejections = buffer.unapplicable_rules().to_vec();
    rejections.push(UnapplicableRule::new(uid.clone(), errors));
    buffer.set_unapplicable_rules(rejections)
}
