//! Stacking Demo
//!
//! Three rules of different kinds run over one tea cart, each seeing the
//! cart net of the grants made before it. The demo prints every decision
//! the engine makes, then the final breakdown.
//!
//! Run with: `cargo run --example stacking`

use std::{io, time::Instant};

use anyhow::Result;

use tally::{
    breakdown::Breakdown,
    buffer::meta::CalculationEngineMeta,
    engine::{CalculationEngine, EngineObserver},
    fixtures::Fixture,
    rules::Rule,
};

/// Prints the order rules ran in and why any were turned away.
#[derive(Debug, Default)]
struct Decisions;

#[expect(clippy::print_stdout, reason = "Example code")]
impl EngineObserver for Decisions {
    fn on_rule_applied(&mut self, rule: &dyn Rule) {
        println!("applied   {}", rule.name());
    }

    fn on_rule_rejected(&mut self, rule: &dyn Rule, errors: &[String]) {
        println!("rejected  {}", rule.name());
        for error in errors {
            println!("          {error}");
        }
    }

    fn on_rule_discarded(&mut self, rule: &dyn Rule) {
        println!("discarded {}", rule.name());
    }
}

/// Stacking Demo
#[expect(clippy::print_stdout, reason = "Example code")]
pub fn main() -> Result<()> {
    let fixture = Fixture::from_set("stacking")?;
    let input = fixture.input()?;

    let start = Instant::now();

    let buffer = CalculationEngine::new().process_with_observer(
        &input,
        CalculationEngineMeta::default(),
        &mut Decisions,
    );

    let elapsed = start.elapsed().as_secs_f32();

    let stdout = io::stdout();
    let mut handle = stdout.lock();

    Breakdown::from_buffer(&buffer).write_to(&mut handle)?;

    println!("\nCalculated in {elapsed}s");

    Ok(())
}
