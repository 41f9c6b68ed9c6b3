//! Benchmark orchestration
//!
//! `Orchestrator::create_benchmark` drives one run end to end:
//! - dial the cluster's nodes and index them by label
//! - reset and mesh-connect the nodes unless asked not to
//! - plan the scenario, then record the benchmark as running
//! - execute the plan and store the report while marking the benchmark done
//!
//! Failures before the record is created leave nothing behind. Failures
//! after it leave the benchmark `running` with no report.


use crate::error::{Error, Result};
use crate::metadata::{MetadataStore, Transaction};
use crate::models::{Benchmark, BenchmarkStatus, Cluster, Report, ReportSummary, Scenario};
use crate::nodes::{self, NodeDialer, NodeProvisioner, NodeRef};
use crate::observability::BenchmarkLogger;
use crate::peer::Publisher;
use crate::query::{self, labeled, LabeledSet};
use crate::reports;
use crate::scenarios::{self, PlanExecutor};
use crate::transformers::Transformers;
use chrono::Utc;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};
use tokio_util::sync::CancellationToken;
use tracing::{info, info_span, Instrument};

/// Orchestrator settings
#[derive(Debug, Clone, Default)]
pub struct OrchestratorConfig {
    /// Base URL of the trace viewer; reports link to `{trace_ui}/trace/{id}`
    pub trace_ui: Option<String>,
    /// Cap on concurrent node calls during mesh connect, 0 is unbounded
    pub max_fanout: usize,
}

/// Parameters of a benchmark run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BenchmarkRequest {
    pub cluster_id: String,
    pub scenario_id: String,
    /// Skip the node reset and mesh connect steps
    pub no_reset: bool,
}

pub struct Orchestrator {
    store: Arc<dyn MetadataStore>,
    dialer: Arc<dyn NodeDialer>,
    transformers: Transformers,
    publisher: Arc<dyn Publisher>,
    provisioner: Arc<dyn NodeProvisioner>,
    executor: Arc<dyn PlanExecutor>,
    config: OrchestratorConfig,
}

impl Orchestrator {
    pub fn new(
        store: Arc<dyn MetadataStore>,
        dialer: Arc<dyn NodeDialer>,
        transformers: Transformers,
        publisher: Arc<dyn Publisher>,
        provisioner: Arc<dyn NodeProvisioner>,
        executor: Arc<dyn PlanExecutor>,
    ) -> Self {
        Self {
            store,
            dialer,
            transformers,
            publisher,
            provisioner,
            executor,
            config: OrchestratorConfig::default(),
        }
    }

    pub fn with_config(mut self, config: OrchestratorConfig) -> Self {
        self.config = config;
        self
    }

    pub fn store(&self) -> &Arc<dyn MetadataStore> {
        &self.store
    }

    /// Run a scenario on a cluster and return the finished benchmark
    pub async fn create_benchmark(
        &self,
        request: &BenchmarkRequest,
        cancel: &CancellationToken,
    ) -> Result<Benchmark> {
        let scenario = self.store.get_scenario(&request.scenario_id).await?;
        let cluster = self.store.get_cluster(&request.cluster_id).await?;

        let bid = benchmark_id(&cluster.id, &scenario.id);
        let span = info_span!("benchmark", bid = %bid);
        self.run(bid, cluster, scenario, request.no_reset, cancel)
            .instrument(span)
            .await
    }

    async fn run(
        &self,
        bid: String,
        cluster: Cluster,
        scenario: Scenario,
        no_reset: bool,
        cancel: &CancellationToken,
    ) -> Result<Benchmark> {
        let logger = BenchmarkLogger::new(bid.clone());

        info!("Retrieving nodes in cluster");
        let nodes = self
            .store
            .list_nodes(&cluster.id)
            .await?
            .into_iter()
            .map(|meta| self.dialer.dial(meta))
            .collect::<Result<Vec<NodeRef>>>()?;
        let lset: LabeledSet<NodeRef> = nodes.iter().cloned().collect();
        logger.log_started(&cluster.id, &scenario.id, nodes.len(), no_reset);

        if !no_reset {
            self.provisioner.reset(&nodes, cancel).await?;
            nodes::connect_with_limit(&nodes, cancel, self.config.max_fanout).await?;
        }

        info!("Creating scenario plan");
        let (plan, queries) = scenarios::plan(
            &scenario.definition,
            &self.transformers,
            self.publisher.clone(),
            &lset,
            cancel,
        )
        .await?;
        logger.log_planned(plan.objects.len(), plan.seed.len(), plan.benchmark.len());

        let now = Utc::now();
        let labels = vec![bid.clone(), cluster.id.clone(), scenario.id.clone()];
        let benchmark = Benchmark {
            id: bid,
            status: BenchmarkStatus::Running,
            cluster,
            scenario,
            plan,
            labels,
            created_at: now,
            updated_at: now,
        };

        info!("Creating benchmark metadata");
        let mut benchmark = self.store.create_benchmark(benchmark).await?;

        info!("Executing scenario plan");
        let publisher_addrs = self.publisher.advertised_addrs();
        let execution = self
            .executor
            .run(&lset, &benchmark.plan, &publisher_addrs, cancel)
            .await
            .map_err(|e| {
                logger.log_orphaned("execute", &e);
                e
            })?;

        let total_time_ms = (execution.end - execution.start)
            .num_milliseconds()
            .max(0) as u64;
        let trace = match (self.trace_ui(), &execution.trace_id) {
            (Some(ui), Some(trace_id)) => Some(format!("{}/trace/{}", ui, trace_id)),
            _ => None,
        };
        logger.log_executed(total_time_ms, trace.as_deref());

        let aggregates = reports::compute_aggregates(&execution.report);
        let report = Report {
            summary: ReportSummary {
                total_time_ms,
                trace,
            },
            aggregates: aggregates.clone(),
            nodes: execution.report,
            queries,
        };

        info!("Updating benchmark metadata");
        benchmark.status = BenchmarkStatus::Done;
        let done = benchmark.clone();
        self.store
            .update(Box::new(move |tx: &mut dyn Transaction| {
                tx.create_report(&done.id, report)?;
                tx.update_benchmark(done)?;
                Ok(())
            }))
            .await
            .map_err(|e| {
                logger.log_orphaned("persist", &e);
                e
            })?;
        logger.log_finished(&aggregates);

        self.store.get_benchmark(&benchmark.id).await
    }

    fn trace_ui(&self) -> Option<&str> {
        self.config.trace_ui.as_deref().filter(|ui| !ui.is_empty())
    }

    pub async fn get_benchmark(&self, id: &str) -> Result<Benchmark> {
        self.store.get_benchmark(id).await
    }

    pub async fn list_benchmarks(&self) -> Result<Vec<Benchmark>> {
        self.store.list_benchmarks().await
    }

    pub async fn get_report(&self, id: &str) -> Result<Report> {
        self.store.get_report(id).await
    }

    /// Benchmarks whose labels satisfy the query `expr`
    pub async fn match_benchmarks(&self, expr: &str) -> Result<Vec<Benchmark>> {
        let benchmarks = self.store.list_benchmarks().await?;
        let set: LabeledSet<_> = benchmarks
            .iter()
            .map(|b| labeled(b.id.clone(), b.labels.iter().cloned()))
            .collect();

        let matched = query::execute(&set, expr)?;
        Ok(benchmarks
            .into_iter()
            .filter(|b| matched.contains(&b.id))
            .collect())
    }

    /// Add and remove labels; a call with nothing to change is a no-op
    pub async fn label_benchmarks(
        &self,
        ids: &[String],
        adds: &[String],
        removes: &[String],
    ) -> Result<Vec<Benchmark>> {
        let adds = coalesce(adds);
        let removes = coalesce(removes);
        if adds.is_empty() && removes.is_empty() {
            return Ok(Vec::new());
        }
        self.store.label_benchmarks(ids, &adds, &removes).await
    }

    pub async fn delete_benchmarks(&self, ids: &[String]) -> Result<()> {
        if ids.is_empty() {
            return Err(Error::InvalidArgument("no benchmark ids given".into()));
        }
        self.store.delete_benchmarks(ids).await
    }
}

fn benchmark_id(cluster_id: &str, scenario_id: &str) -> String {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos();
    format!("{}-{}-{}", cluster_id, scenario_id, nanos)
}

/// Drop empty labels
fn coalesce(labels: &[String]) -> Vec<String> {
    labels
        .iter()
        .map(|l| l.trim())
        .filter(|l| !l.is_empty())
        .map(String::from)
        .collect()
}
