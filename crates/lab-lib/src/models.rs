//! Core data models for the benchmark lab

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::query::Labeled;

/// Opaque, content-derived address of a materialized object
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContentId(String);

impl ContentId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ContentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Kind of operation a node agent executes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskType {
    /// Bring the node back to a clean runtime state
    Update,
    /// Dial every multiaddr in the subject
    Connect,
    /// Drop every open peer connection
    Disconnect,
    /// Fetch and provide the objects in the subject
    Add,
    /// Download the objects in the subject
    Get,
}

impl fmt::Display for TaskType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TaskType::Update => "update",
            TaskType::Connect => "connect",
            TaskType::Disconnect => "disconnect",
            TaskType::Add => "add",
            TaskType::Get => "get",
        };
        f.write_str(s)
    }
}

/// A single operation assigned to one node
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    #[serde(rename = "type")]
    pub task_type: TaskType,
    #[serde(default)]
    pub subject: String,
}

impl Task {
    pub fn new(task_type: TaskType, subject: impl Into<String>) -> Self {
        Self {
            task_type,
            subject: subject.into(),
        }
    }
}

/// Network identity reported by a node
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeerInfo {
    pub id: String,
    #[serde(default)]
    pub addrs: Vec<String>,
}

impl PeerInfo {
    /// Dial strings for every advertised address
    pub fn dial_addrs(&self) -> Vec<String> {
        self.addrs
            .iter()
            .map(|addr| format!("{}/p2p/{}", addr, self.id))
            .collect()
    }
}

/// How to turn a source into a content-addressed object
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectDefinition {
    #[serde(rename = "type")]
    pub object_type: String,
    pub source: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub layout: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chunker: Option<String>,
    #[serde(default, rename = "rawLeaves")]
    pub raw_leaves: bool,
    #[serde(default, rename = "hashFunc", skip_serializing_if = "Option::is_none")]
    pub hash_func: Option<String>,
}

/// Scenario definition: objects plus the seed and benchmark phases
///
/// Phases are ordered `(query, action)` pairs. In JSON they are written as
/// objects and keep the document's key order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScenarioDefinition {
    #[serde(default)]
    pub objects: BTreeMap<String, ObjectDefinition>,
    #[serde(default, with = "ordered_pairs")]
    pub seed: Vec<(String, String)>,
    #[serde(default, with = "ordered_pairs")]
    pub benchmark: Vec<(String, String)>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Scenario {
    pub id: String,
    pub definition: ScenarioDefinition,
    #[serde(default)]
    pub labels: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cluster {
    pub id: String,
    #[serde(default)]
    pub labels: Vec<String>,
}

/// Cluster member as recorded in the metadata store
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeMetadata {
    pub id: String,
    /// Host name or IP of the node agent
    pub address: String,
    #[serde(default, rename = "agentPort", skip_serializing_if = "Option::is_none")]
    pub agent_port: Option<u16>,
    #[serde(default)]
    pub labels: Vec<String>,
}

impl Labeled for NodeMetadata {
    fn id(&self) -> &str {
        &self.id
    }

    fn labels(&self) -> &[String] {
        &self.labels
    }
}

/// Resolved objects and per-node task assignments
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScenarioPlan {
    pub objects: BTreeMap<String, ContentId>,
    pub seed: BTreeMap<String, Task>,
    pub benchmark: BTreeMap<String, Task>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BenchmarkStatus {
    Running,
    Done,
}

impl fmt::Display for BenchmarkStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BenchmarkStatus::Running => f.write_str("running"),
            BenchmarkStatus::Done => f.write_str("done"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Benchmark {
    pub id: String,
    pub status: BenchmarkStatus,
    pub cluster: Cluster,
    pub scenario: Scenario,
    pub plan: ScenarioPlan,
    #[serde(default)]
    pub labels: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Labeled for Benchmark {
    fn id(&self) -> &str {
        &self.id
    }

    fn labels(&self) -> &[String] {
        &self.labels
    }
}

/// Block exchange counters reported by a node after a task
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TransferStats {
    pub blocks_received: u64,
    pub data_received: u64,
    pub blocks_sent: u64,
    pub data_sent: u64,
    pub dup_blocks_received: u64,
    pub dup_data_received: u64,
}

impl TransferStats {
    /// Add `other` into these counters, saturating at `u64::MAX`
    pub fn accumulate(&mut self, other: &TransferStats) {
        self.blocks_received = self.blocks_received.saturating_add(other.blocks_received);
        self.data_received = self.data_received.saturating_add(other.data_received);
        self.blocks_sent = self.blocks_sent.saturating_add(other.blocks_sent);
        self.data_sent = self.data_sent.saturating_add(other.data_sent);
        self.dup_blocks_received = self
            .dup_blocks_received
            .saturating_add(other.dup_blocks_received);
        self.dup_data_received = self
            .dup_data_received
            .saturating_add(other.dup_data_received);
    }
}

/// Outcome of one benchmark task on one node
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeReport {
    pub task: Task,
    pub elapsed_ms: u64,
    pub transfer: TransferStats,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReportSummary {
    pub total_time_ms: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trace: Option<String>,
}

/// Statistics computed over all node reports
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReportAggregates {
    pub node_count: usize,
    pub totals: TransferStats,
    pub average_elapsed_ms: f64,
    pub min_elapsed_ms: u64,
    pub max_elapsed_ms: u64,
    pub average_data_received: f64,
    /// Share of received blocks that were duplicates, 0.0 when nothing arrived
    pub dup_block_ratio: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Report {
    pub summary: ReportSummary,
    pub aggregates: ReportAggregates,
    pub nodes: BTreeMap<String, NodeReport>,
    /// Canonical query string -> node ids it selected in the benchmark phase
    pub queries: BTreeMap<String, Vec<String>>,
}

/// Result of running a plan, folded into a `Report`
#[derive(Debug, Clone)]
pub struct Execution {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub report: BTreeMap<String, NodeReport>,
    pub trace_id: Option<String>,
}

/// Serde adapter that keeps phase entries in document order
mod ordered_pairs {
    use serde::de::{MapAccess, SeqAccess, Visitor};
    use serde::ser::SerializeMap;
    use serde::{Deserialize, Deserializer, Serializer};
    use std::fmt;

    pub fn serialize<S>(pairs: &[(String, String)], serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut map = serializer.serialize_map(Some(pairs.len()))?;
        for (query, action) in pairs {
            map.serialize_entry(query, action)?;
        }
        map.end()
    }

    #[derive(Deserialize)]
    struct Entry {
        query: String,
        action: String,
    }

    struct PairsVisitor;

    impl<'de> Visitor<'de> for PairsVisitor {
        type Value = Vec<(String, String)>;

        fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
            f.write_str("a map of query to action or a list of {query, action}")
        }

        fn visit_map<A>(self, mut access: A) -> Result<Self::Value, A::Error>
        where
            A: MapAccess<'de>,
        {
            let mut pairs = Vec::with_capacity(access.size_hint().unwrap_or(0));
            while let Some((query, action)) = access.next_entry::<String, String>()? {
                pairs.push((query, action));
            }
            Ok(pairs)
        }

        fn visit_seq<A>(self, mut access: A) -> Result<Self::Value, A::Error>
        where
            A: SeqAccess<'de>,
        {
            let mut pairs = Vec::with_capacity(access.size_hint().unwrap_or(0));
            while let Some(entry) = access.next_element::<Entry>()? {
                pairs.push((entry.query, entry.action));
            }
            Ok(pairs)
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Vec<(String, String)>, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_any(PairsVisitor)
    }
}
