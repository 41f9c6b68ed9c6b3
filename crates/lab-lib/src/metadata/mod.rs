//! Cluster and benchmark metadata
//!
//! `MetadataStore` is the persistence seam of the orchestrator. Multi-step
//! writes go through `update`, which runs a closure against a
//! `Transaction` and commits only if the closure succeeds.

mod memory;

pub use memory::MemoryStore;

use crate::error::Result;
use crate::models::{Benchmark, Cluster, NodeMetadata, Report, Scenario};
use async_trait::async_trait;

/// Writes that must land together
pub trait Transaction: Send {
    /// Attach `report` to an existing benchmark
    fn create_report(&mut self, benchmark_id: &str, report: Report) -> Result<()>;

    /// Replace a stored benchmark, keeping its creation time
    fn update_benchmark(&mut self, benchmark: Benchmark) -> Result<Benchmark>;
}

/// Body of a transaction; returning an error rolls every write back
pub type TransactionFn = Box<dyn FnOnce(&mut dyn Transaction) -> Result<()> + Send>;

#[async_trait]
pub trait MetadataStore: Send + Sync {
    async fn get_cluster(&self, id: &str) -> Result<Cluster>;

    async fn get_scenario(&self, id: &str) -> Result<Scenario>;

    /// Nodes of a cluster in registration order
    async fn list_nodes(&self, cluster_id: &str) -> Result<Vec<NodeMetadata>>;

    /// Store a new benchmark, failing if the id is taken
    async fn create_benchmark(&self, benchmark: Benchmark) -> Result<Benchmark>;

    async fn get_benchmark(&self, id: &str) -> Result<Benchmark>;

    async fn list_benchmarks(&self) -> Result<Vec<Benchmark>>;

    async fn update_benchmark(&self, benchmark: Benchmark) -> Result<Benchmark>;

    /// Add then remove labels on every listed benchmark
    async fn label_benchmarks(
        &self,
        ids: &[String],
        adds: &[String],
        removes: &[String],
    ) -> Result<Vec<Benchmark>>;

    /// Delete benchmarks together with their reports
    async fn delete_benchmarks(&self, ids: &[String]) -> Result<()>;

    async fn get_report(&self, benchmark_id: &str) -> Result<Report>;

    /// Run `tx` atomically
    async fn update(&self, tx: TransactionFn) -> Result<()>;
}
