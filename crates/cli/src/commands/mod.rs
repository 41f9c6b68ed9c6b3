//! Subcommand implementations

pub mod benchmarks;
pub mod query;
