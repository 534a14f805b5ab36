//! Checkout Demo
//!
//! Runs the rule pipeline over a fixture cart and prints the resulting
//! breakdown.
//!
//! Use `-f` to load a fixture set by name
//! Use `-v` to print each rule decision as the engine makes it
//!
//! Run with: `cargo run --example checkout`

use std::{io, time::Instant};

use anyhow::Result;
use clap::Parser;

use tally::{
    breakdown::Breakdown,
    buffer::meta::CalculationEngineMeta,
    engine::{CalculationEngine, EngineObserver},
    fixtures::Fixture,
    rules::Rule,
    utils::DemoArgs,
};

/// Prints each pipeline decision as the engine reports it.
#[derive(Debug, Default)]
struct Trace {
    enabled: bool,
}

#[expect(clippy::print_stdout, reason = "Example code")]
impl EngineObserver for Trace {
    fn on_rule_applied(&mut self, rule: &dyn Rule) {
        if self.enabled {
            println!("applied   {} ({})", rule.uid(), rule.name());
        }
    }

    fn on_rule_rejected(&mut self, rule: &dyn Rule, errors: &[String]) {
        if self.enabled {
            println!("rejected  {} ({}): {}", rule.uid(), rule.name(), errors.join(" "));
        }
    }

    fn on_rule_discarded(&mut self, rule: &dyn Rule) {
        if self.enabled {
            println!("discarded {} ({})", rule.uid(), rule.name());
        }
    }
}

/// Checkout Demo
#[expect(clippy::print_stdout, reason = "Example code")]
pub fn main() -> Result<()> {
    let args = DemoArgs::parse();

    let fixture = Fixture::from_set(&args.fixture)?;
    let input = fixture.input()?;

    let mut trace = Trace {
        enabled: args.verbose,
    };

    let start = Instant::now();

    let buffer = CalculationEngine::new().process_with_observer(
        &input,
        CalculationEngineMeta::default(),
        &mut trace,
    );

    let elapsed = start.elapsed().as_secs_f32();

    let stdout = io::stdout();
    let mut handle = stdout.lock();

    Breakdown::from_buffer(&buffer).write_to(&mut handle)?;

    println!("\nCalculated in {elapsed}s");

    Ok(())
}
