//! Structured lifecycle logging for benchmark runs
//!
//! Every event carries a stable `event` field and the benchmark id so runs
//! can be followed in JSON logs.

use crate::error::Error;
use crate::models::ReportAggregates;
use tracing::{info, warn};

/// Structured logger bound to one benchmark
#[derive(Debug, Clone)]
pub struct BenchmarkLogger {
    bid: String,
}

impl BenchmarkLogger {
    pub fn new(bid: impl Into<String>) -> Self {
        Self { bid: bid.into() }
    }

    pub fn bid(&self) -> &str {
        &self.bid
    }

    pub fn log_started(&self, cluster: &str, scenario: &str, nodes: usize, no_reset: bool) {
        info!(
            event = "benchmark_started",
            bid = %self.bid,
            cluster = %cluster,
            scenario = %scenario,
            nodes = nodes,
            no_reset = no_reset,
            "Benchmark started"
        );
    }

    pub fn log_planned(&self, objects: usize, seed_tasks: usize, benchmark_tasks: usize) {
        info!(
            event = "benchmark_planned",
            bid = %self.bid,
            objects = objects,
            seed_tasks = seed_tasks,
            benchmark_tasks = benchmark_tasks,
            "Scenario plan created"
        );
    }

    pub fn log_executed(&self, total_time_ms: u64, trace: Option<&str>) {
        info!(
            event = "benchmark_executed",
            bid = %self.bid,
            total_time_ms = total_time_ms,
            trace = ?trace,
            "Scenario plan executed"
        );
    }

    pub fn log_finished(&self, aggregates: &ReportAggregates) {
        info!(
            event = "benchmark_finished",
            bid = %self.bid,
            nodes = aggregates.node_count,
            average_elapsed_ms = aggregates.average_elapsed_ms,
            data_received = aggregates.totals.data_received,
            "Benchmark report stored"
        );
    }

    /// The benchmark record exists but will stay `running`
    pub fn log_orphaned(&self, stage: &str, error: &Error) {
        warn!(
            event = "benchmark_orphaned",
            bid = %self.bid,
            stage = %stage,
            error = %error,
            "Benchmark failed after its record was created"
        );
    }
}
