//! Core library for the p2p benchmark lab
//!
//! This crate contains:
//! - Label queries over nodes and benchmarks
//! - Scenario actions, planning and execution
//! - The full-mesh connect protocol and node agent client
//! - The benchmark orchestrator and its metadata store

pub mod actions;
pub mod benchmarks;
pub mod error;
pub mod group;
pub mod metadata;
pub mod models;
pub mod nodes;
pub mod observability;
pub mod peer;
pub mod query;
pub mod reports;
pub mod scenarios;
pub mod transformers;

#[cfg(test)]
pub(crate) mod testing;

pub use benchmarks::{BenchmarkRequest, Orchestrator, OrchestratorConfig};
pub use error::{Error, Result};
