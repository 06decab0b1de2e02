//! Small helpers shared by the solarview crates.

pub mod config;
pub mod env;
