//! Fixtures
//!
//! Named cart and rule-set descriptions loaded from YAML under a base
//! directory, shared by the demos and the integration tests.

use std::fs;
use std::path::PathBuf;

use thiserror::Error;

use crate::cart::CalculationEngineInput;
use crate::rules::{RuleConfigError, SharedRule};

use self::carts::CartFixture;
use self::rules::RuleSetFixture;

pub mod carts;
pub mod rules;

/// Fixture Loading Errors
#[derive(Debug, Error)]
pub enum FixtureError {
    /// IO error reading a fixture file
    #[error("failed to read fixture file: {0}")]
    Io(#[from] std::io::Error),

    /// YAML parsing error
    #[error("failed to parse fixture YAML: {0}")]
    Parse(#[from] serde_norway::Error),

    /// A declared rule failed construction
    #[error(transparent)]
    Rule(#[from] RuleConfigError),

    /// No cart loaded yet
    #[error("no cart loaded; nothing to build an input from")]
    NoCart,
}

/// Fixture
#[derive(Debug)]
pub struct Fixture {
    /// Base path for fixture files
    base_path: PathBuf,

    /// The most recently loaded cart description
    cart: Option<CartFixture>,

    /// Rules built from every rule set loaded so far
    rules: Vec<SharedRule>,
}

impl Fixture {
    /// Create a new empty fixture with the default base path
    #[must_use]
    pub fn new() -> Self {
        Self::with_base_path("./fixtures")
    }

    /// Create a new empty fixture with a custom base path
    pub fn with_base_path(base_path: impl Into<PathBuf>) -> Self {
        Self {
            base_path: base_path.into(),
            cart: None,
            rules: Vec::new(),
        }
    }

    /// Load a cart description from `carts/<name>.yml`
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load_cart(&mut self, name: &str) -> Result<&mut Self, FixtureError> {
        let file_path = self.base_path.join("carts").join(format!("{name}.yml"));
        let contents = fs::read_to_string(&file_path)?;

        self.cart = Some(serde_norway::from_str(&contents)?);

        Ok(self)
    }

    /// Load a rule set from `rules/<name>.yml`, appending to the rules
    /// loaded so far
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed, or if a
    /// declared rule fails construction.
    pub fn load_rules(&mut self, name: &str) -> Result<&mut Self, FixtureError> {
        let file_path = self.base_path.join("rules").join(format!("{name}.yml"));
        let contents = fs::read_to_string(&file_path)?;
        let fixture: RuleSetFixture = serde_norway::from_str(&contents)?;

        for description in fixture.rules {
            self.rules.push(description.try_into_rule()?);
        }

        Ok(self)
    }

    /// Load the cart and rule set sharing one name
    ///
    /// # Errors
    ///
    /// Returns an error if either fixture file cannot be loaded.
    pub fn from_set(name: &str) -> Result<Self, FixtureError> {
        let mut fixture = Self::new();

        fixture.load_cart(name)?.load_rules(name)?;

        Ok(fixture)
    }

    /// Get the rules built so far, in load order
    #[must_use]
    pub fn rules(&self) -> &[SharedRule] {
        &self.rules
    }

    /// Assemble an engine input from the loaded cart and rules
    ///
    /// # Errors
    ///
    /// Returns [`FixtureError::NoCart`] when no cart has been loaded.
    pub fn input(&self) -> Result<CalculationEngineInput, FixtureError> {
        let cart = self.cart.as_ref().ok_or(FixtureError::NoCart)?;

        let mut input = CalculationEngineInput::new(cart.items.clone(), self.rules.clone());
        input.customer = cart.customer.clone();
        input.delivery_addresses = cart.delivery_addresses.clone();
        input.usage_counts = cart.usage_counts.clone();
        input.credit_card_prefix = cart.credit_card_prefix.clone();
        input.ignore_condition = cart.ignore_condition;

        Ok(input)
    }
}

impl Default for Fixture {
    fn default() -> Self {
        Self::new()
    }
}
