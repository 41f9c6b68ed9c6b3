use super::PlanExecutor;
use crate::error::{Error, Result};
use crate::group::TaskGroup;
use crate::models::{Execution, NodeReport, ScenarioPlan, Task, TaskType};
use crate::nodes::NodeRef;
use crate::query::LabeledSet;
use async_trait::async_trait;
use chrono::Utc;
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Instant, SystemTime, UNIX_EPOCH};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, info_span, Instrument};

/// Executes plans by dispatching their tasks to the nodes
///
/// Seeding nodes first connect to the publisher and then run their seed task.
/// Benchmark tasks run after every seed task has finished and are timed
/// individually.
#[derive(Debug, Clone, Default)]
pub struct ScenarioRunner {
    max_fanout: usize,
}

impl ScenarioRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cap concurrent node calls per phase, 0 is unbounded
    pub fn with_max_fanout(mut self, max_fanout: usize) -> Self {
        self.max_fanout = max_fanout;
        self
    }
}

/// New 128-bit trace id as 32 lower-case hex digits
///
/// The id is recorded as the `trace_id` field of the `benchmark_execution`
/// span, so every log line of the benchmark phase carries it.
pub(crate) fn new_trace_id() -> String {
    static SEQUENCE: AtomicU64 = AtomicU64::new(0);

    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or_default();
    let mut hasher = Sha256::new();
    hasher.update(nanos.to_le_bytes());
    hasher.update(std::process::id().to_le_bytes());
    hasher.update(SEQUENCE.fetch_add(1, Ordering::Relaxed).to_le_bytes());
    hex::encode(&hasher.finalize()[..16])
}

fn lookup(nodes: &LabeledSet<NodeRef>, id: &str) -> Result<NodeRef> {
    nodes
        .get(id)
        .cloned()
        .ok_or_else(|| Error::InvalidArgument(format!("plan references unknown node {:?}", id)))
}

#[async_trait]
impl PlanExecutor for ScenarioRunner {
    async fn run(
        &self,
        nodes: &LabeledSet<NodeRef>,
        plan: &ScenarioPlan,
        publisher_addrs: &[String],
        cancel: &CancellationToken,
    ) -> Result<Execution> {
        info!(nodes = plan.seed.len(), "Seeding objects");
        let connect = Task::new(TaskType::Connect, publisher_addrs.join(","));

        let mut seed = TaskGroup::with_limit(cancel, self.max_fanout);
        for (id, task) in &plan.seed {
            let node = lookup(nodes, id)?;
            let connect = connect.clone();
            let task = task.clone();
            seed.spawn(move |token| async move {
                if !connect.subject.is_empty() {
                    node.run(&connect, &token).await?;
                }
                node.run(&task, &token).await?;
                Ok(())
            });
        }
        seed.wait().await?;

        let trace_id = new_trace_id();
        let span = info_span!(
            "benchmark_execution",
            trace_id = %trace_id,
            nodes = plan.benchmark.len()
        );

        info!(parent: &span, nodes = plan.benchmark.len(), "Running benchmark tasks");
        let start = Utc::now();

        let mut benchmark = TaskGroup::with_limit(cancel, self.max_fanout);
        for (id, task) in &plan.benchmark {
            let node = lookup(nodes, id)?;
            let id = id.clone();
            let task = task.clone();
            let span = span.clone();
            benchmark.spawn(move |token| {
                async move {
                    let began = Instant::now();
                    let transfer = node.run(&task, &token).await?;
                    let elapsed_ms = began.elapsed().as_millis() as u64;
                    debug!(node = %id, elapsed_ms, "Finished benchmark task");
                    Ok((
                        id,
                        NodeReport {
                            task,
                            elapsed_ms,
                            transfer,
                        },
                    ))
                }
                .instrument(span)
            });
        }
        let report: BTreeMap<String, NodeReport> = benchmark.wait().await?.into_iter().collect();

        Ok(Execution {
            start,
            end: Utc::now(),
            report,
            trace_id: Some(trace_id),
        })
    }
}
