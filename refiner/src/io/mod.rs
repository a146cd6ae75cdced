//! I/O adapters for refiner commands.

pub mod config;
pub mod generator;
pub mod lookup;
pub mod process;
pub mod prompt;
pub mod rule_store;
