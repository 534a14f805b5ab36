//! Utils

use clap::Parser;

/// Arguments for the checkout demos
#[derive(Debug, Parser)]
pub struct DemoArgs {
    /// Fixture set naming the cart and rules to load
    #[clap(short, long, default_value = "checkout")]
    pub fixture: String,

    /// Print each rule decision as the engine makes it
    #[clap(short, long)]
    pub verbose: bool,
}
