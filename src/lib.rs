//! Tally
//!
//! Tally is a deterministic promotion and discount calculation engine written in Rust.

pub mod breakdown;
pub mod buffer;
pub mod cart;
pub mod discounts;
pub mod engine;
pub mod fixtures;
pub mod prelude;
pub mod rational;
pub mod rules;
pub mod tags;
pub mod utils;
