//! In-memory metadata store with an optional JSON snapshot on disk

use super::{MetadataStore, Transaction, TransactionFn};
use crate::error::{Result, StoreError};
use crate::models::{Benchmark, Cluster, NodeMetadata, Report, Scenario};
use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tokio::sync::RwLock;
use tracing::{debug, info};

/// Everything the store knows, as written to the snapshot file
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
struct LabState {
    clusters: BTreeMap<String, Cluster>,
    /// Cluster id to its nodes
    nodes: BTreeMap<String, Vec<NodeMetadata>>,
    scenarios: BTreeMap<String, Scenario>,
    benchmarks: BTreeMap<String, Benchmark>,
    /// Benchmark id to its report
    reports: BTreeMap<String, Report>,
}

impl LabState {
    fn benchmark_mut(&mut self, id: &str) -> std::result::Result<&mut Benchmark, StoreError> {
        self.benchmarks
            .get_mut(id)
            .ok_or_else(|| StoreError::not_found("benchmark", id))
    }
}

impl Transaction for LabState {
    fn create_report(&mut self, benchmark_id: &str, report: Report) -> Result<()> {
        if !self.benchmarks.contains_key(benchmark_id) {
            return Err(StoreError::not_found("benchmark", benchmark_id).into());
        }
        if self.reports.contains_key(benchmark_id) {
            return Err(StoreError::already_exists("report", benchmark_id).into());
        }
        self.reports.insert(benchmark_id.to_string(), report);
        Ok(())
    }

    fn update_benchmark(&mut self, mut benchmark: Benchmark) -> Result<Benchmark> {
        let stored = self.benchmark_mut(&benchmark.id)?;
        benchmark.created_at = stored.created_at;
        benchmark.updated_at = Utc::now();
        *stored = benchmark.clone();
        Ok(benchmark)
    }
}

/// Metadata store held in memory
///
/// With a snapshot path every committed write rewrites the snapshot, so the
/// state survives restarts of the CLI.
pub struct MemoryStore {
    state: RwLock<LabState>,
    path: Option<PathBuf>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            state: RwLock::new(LabState::default()),
            path: None,
        }
    }

    /// Open a store backed by the snapshot at `path`, empty if it does not exist yet
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let state = match tokio::fs::read(&path).await {
            Ok(data) => {
                let state: LabState =
                    serde_json::from_slice(&data).map_err(StoreError::Serialization)?;
                info!(
                    path = %path.display(),
                    clusters = state.clusters.len(),
                    benchmarks = state.benchmarks.len(),
                    "Loaded lab state"
                );
                state
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => LabState::default(),
            Err(e) => return Err(StoreError::Io(e).into()),
        };

        Ok(Self {
            state: RwLock::new(state),
            path: Some(path),
        })
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Register a cluster, replacing any cluster with the same id
    pub async fn put_cluster(&self, cluster: Cluster) -> Result<()> {
        let mut state = self.state.write().await;
        let mut staged = state.clone();
        staged.nodes.entry(cluster.id.clone()).or_default();
        staged.clusters.insert(cluster.id.clone(), cluster);
        self.commit(&mut state, staged).await
    }

    /// Register a node in an existing cluster, replacing a node with the same id
    pub async fn put_node(&self, cluster_id: &str, node: NodeMetadata) -> Result<()> {
        let mut state = self.state.write().await;
        if !state.clusters.contains_key(cluster_id) {
            return Err(StoreError::not_found("cluster", cluster_id).into());
        }
        let mut staged = state.clone();
        let nodes = staged.nodes.entry(cluster_id.to_string()).or_default();
        match nodes.iter_mut().find(|n| n.id == node.id) {
            Some(existing) => *existing = node,
            None => nodes.push(node),
        }
        self.commit(&mut state, staged).await
    }

    pub async fn put_scenario(&self, scenario: Scenario) -> Result<()> {
        let mut state = self.state.write().await;
        let mut staged = state.clone();
        staged.scenarios.insert(scenario.id.clone(), scenario);
        self.commit(&mut state, staged).await
    }

    /// Write `staged` to the snapshot, then make it the visible state
    ///
    /// A failed write leaves `state` untouched.
    async fn commit(&self, state: &mut LabState, staged: LabState) -> Result<()> {
        if let Some(path) = &self.path {
            save_snapshot(path, &staged).await?;
            debug!(path = %path.display(), "Lab state saved");
        }
        *state = staged;
        Ok(())
    }
}

/// Write the snapshot to a temp file and rename it over `path`
async fn save_snapshot(path: &Path, state: &LabState) -> std::result::Result<(), StoreError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await?;
    }
    let json = serde_json::to_vec_pretty(state)?;
    let temp_path = path.with_extension("tmp");
    tokio::fs::write(&temp_path, json).await?;
    tokio::fs::rename(&temp_path, path).await?;
    Ok(())
}

#[async_trait]
impl MetadataStore for MemoryStore {
    async fn get_cluster(&self, id: &str) -> Result<Cluster> {
        let state = self.state.read().await;
        state
            .clusters
            .get(id)
            .cloned()
            .ok_or_else(|| StoreError::not_found("cluster", id).into())
    }

    async fn get_scenario(&self, id: &str) -> Result<Scenario> {
        let state = self.state.read().await;
        state
            .scenarios
            .get(id)
            .cloned()
            .ok_or_else(|| StoreError::not_found("scenario", id).into())
    }

    async fn list_nodes(&self, cluster_id: &str) -> Result<Vec<NodeMetadata>> {
        let state = self.state.read().await;
        if !state.clusters.contains_key(cluster_id) {
            return Err(StoreError::not_found("cluster", cluster_id).into());
        }
        Ok(state.nodes.get(cluster_id).cloned().unwrap_or_default())
    }

    async fn create_benchmark(&self, mut benchmark: Benchmark) -> Result<Benchmark> {
        let mut state = self.state.write().await;
        if state.benchmarks.contains_key(&benchmark.id) {
            return Err(StoreError::already_exists("benchmark", &benchmark.id).into());
        }
        let now = Utc::now();
        benchmark.created_at = now;
        benchmark.updated_at = now;
        let mut staged = state.clone();
        staged
            .benchmarks
            .insert(benchmark.id.clone(), benchmark.clone());
        self.commit(&mut state, staged).await?;
        Ok(benchmark)
    }

    async fn get_benchmark(&self, id: &str) -> Result<Benchmark> {
        let state = self.state.read().await;
        state
            .benchmarks
            .get(id)
            .cloned()
            .ok_or_else(|| StoreError::not_found("benchmark", id).into())
    }

    async fn list_benchmarks(&self) -> Result<Vec<Benchmark>> {
        let state = self.state.read().await;
        Ok(state.benchmarks.values().cloned().collect())
    }

    async fn update_benchmark(&self, benchmark: Benchmark) -> Result<Benchmark> {
        let mut state = self.state.write().await;
        let mut staged = state.clone();
        let updated = staged.update_benchmark(benchmark)?;
        self.commit(&mut state, staged).await?;
        Ok(updated)
    }

    async fn label_benchmarks(
        &self,
        ids: &[String],
        adds: &[String],
        removes: &[String],
    ) -> Result<Vec<Benchmark>> {
        let mut state = self.state.write().await;
        let mut staged = state.clone();
        let now = Utc::now();

        let mut labeled = Vec::with_capacity(ids.len());
        for id in ids {
            let benchmark = staged.benchmark_mut(id)?;
            benchmark.labels.extend(adds.iter().cloned());
            benchmark.labels.retain(|l| !removes.contains(l));
            benchmark.labels.sort();
            benchmark.labels.dedup();
            benchmark.updated_at = now;
            labeled.push(benchmark.clone());
        }

        self.commit(&mut state, staged).await?;
        Ok(labeled)
    }

    async fn delete_benchmarks(&self, ids: &[String]) -> Result<()> {
        let mut state = self.state.write().await;
        let mut staged = state.clone();

        for id in ids {
            if staged.benchmarks.remove(id).is_none() {
                return Err(StoreError::not_found("benchmark", id).into());
            }
            staged.reports.remove(id);
        }

        self.commit(&mut state, staged).await
    }

    async fn get_report(&self, benchmark_id: &str) -> Result<Report> {
        let state = self.state.read().await;
        state
            .reports
            .get(benchmark_id)
            .cloned()
            .ok_or_else(|| StoreError::not_found("report", benchmark_id).into())
    }

    async fn update(&self, tx: TransactionFn) -> Result<()> {
        let mut state = self.state.write().await;
        let mut staged = state.clone();
        tx(&mut staged)?;

        self.commit(&mut state, staged).await
    }
}
