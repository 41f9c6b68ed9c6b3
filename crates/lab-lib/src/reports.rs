//! Report aggregation

use crate::models::{NodeReport, ReportAggregates, TransferStats};
use std::collections::BTreeMap;

/// Fold per-node benchmark results into cluster-wide aggregates
///
/// An empty report yields zeroed aggregates.
pub fn compute_aggregates(nodes: &BTreeMap<String, NodeReport>) -> ReportAggregates {
    if nodes.is_empty() {
        return ReportAggregates::default();
    }

    let mut totals = TransferStats::default();
    let mut elapsed_sum = 0u64;
    let mut min_elapsed_ms = u64::MAX;
    let mut max_elapsed_ms = 0u64;

    for report in nodes.values() {
        totals.accumulate(&report.transfer);
        elapsed_sum = elapsed_sum.saturating_add(report.elapsed_ms);
        min_elapsed_ms = min_elapsed_ms.min(report.elapsed_ms);
        max_elapsed_ms = max_elapsed_ms.max(report.elapsed_ms);
    }

    let count = nodes.len() as f64;
    let dup_block_ratio = if totals.blocks_received == 0 {
        0.0
    } else {
        totals.dup_blocks_received as f64 / totals.blocks_received as f64
    };

    ReportAggregates {
        node_count: nodes.len(),
        totals,
        average_elapsed_ms: elapsed_sum as f64 / count,
        min_elapsed_ms,
        max_elapsed_ms,
        average_data_received: totals.data_received as f64 / count,
        dup_block_ratio,
    }
}
