//! In-memory doubles shared by the unit tests

use crate::error::{Error, Result};
use crate::models::{
    ContentId, NodeMetadata, ObjectDefinition, PeerInfo, Task, TaskType, TransferStats,
};
use crate::nodes::{Node, NodeDialer, NodeRef};
use crate::peer::Publisher;
use crate::query::Labeled;
use crate::transformers::{self, AddOptions, Transformer, Transformers};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio_util::sync::CancellationToken;

pub struct FakeNode {
    id: String,
    labels: Vec<String>,
    peer: PeerInfo,
    fail_on: Option<TaskType>,
    stats: TransferStats,
    tasks: Mutex<Vec<Task>>,
}

impl FakeNode {
    pub fn new<S: Into<String>>(id: &str, labels: impl IntoIterator<Item = S>) -> Self {
        Self {
            id: id.to_string(),
            labels: labels.into_iter().map(Into::into).collect(),
            peer: PeerInfo {
                id: format!("Qm{}", id),
                addrs: vec![format!("/dns4/{}/tcp/4001", id)],
            },
            fail_on: None,
            stats: TransferStats::default(),
            tasks: Mutex::new(Vec::new()),
        }
    }

    pub fn without_addrs(mut self) -> Self {
        self.peer.addrs.clear();
        self
    }

    pub fn failing_on(mut self, task_type: TaskType) -> Self {
        self.fail_on = Some(task_type);
        self
    }

    pub fn with_stats(mut self, stats: TransferStats) -> Self {
        self.stats = stats;
        self
    }

    pub fn peer_id(&self) -> &str {
        &self.peer.id
    }

    pub fn tasks(&self) -> Vec<Task> {
        self.tasks.lock().unwrap().clone()
    }

    pub fn tasks_of(&self, task_type: TaskType) -> Vec<Task> {
        self.tasks()
            .into_iter()
            .filter(|t| t.task_type == task_type)
            .collect()
    }

    pub fn metadata(&self) -> NodeMetadata {
        NodeMetadata {
            id: self.id.clone(),
            address: format!("{}.lab", self.id),
            agent_port: None,
            labels: self.labels.clone(),
        }
    }
}

impl Labeled for FakeNode {
    fn id(&self) -> &str {
        &self.id
    }

    fn labels(&self) -> &[String] {
        &self.labels
    }
}

#[async_trait]
impl Node for FakeNode {
    async fn peer_info(&self, _cancel: &CancellationToken) -> Result<PeerInfo> {
        Ok(self.peer.clone())
    }

    async fn run(&self, task: &Task, _cancel: &CancellationToken) -> Result<TransferStats> {
        if self.fail_on == Some(task.task_type) {
            return Err(Error::task(self.id.clone(), format!("{} refused", task.task_type)));
        }
        self.tasks.lock().unwrap().push(task.clone());
        Ok(self.stats)
    }
}

pub fn node_refs(nodes: &[Arc<FakeNode>]) -> Vec<NodeRef> {
    nodes.iter().map(|n| n.clone() as NodeRef).collect()
}

/// Resolves store records to pre-built fake nodes
#[derive(Default)]
pub struct FakeDialer {
    nodes: HashMap<String, Arc<FakeNode>>,
}

impl FakeDialer {
    pub fn new(nodes: &[Arc<FakeNode>]) -> Self {
        Self {
            nodes: nodes
                .iter()
                .map(|n| (n.id().to_string(), n.clone()))
                .collect(),
        }
    }
}

impl NodeDialer for FakeDialer {
    fn dial(&self, meta: NodeMetadata) -> Result<NodeRef> {
        self.nodes
            .get(&meta.id)
            .map(|n| n.clone() as NodeRef)
            .ok_or_else(|| Error::InvalidArgument(format!("no fake node {:?}", meta.id)))
    }
}

/// Serves object bytes straight from the source string
///
/// The source `unreachable` fails with a transform error.
pub struct InlineTransformer;

#[async_trait]
impl Transformer for InlineTransformer {
    async fn transform(
        &self,
        publisher: &dyn Publisher,
        source: &str,
        opts: &AddOptions,
        cancel: &CancellationToken,
    ) -> Result<ContentId> {
        if source == "unreachable" {
            return Err(Error::Transform(format!("cannot fetch {:?}", source)));
        }
        transformers::materialize(publisher, opts, source.as_bytes().to_vec(), cancel).await
    }
}

/// Registry holding only the `inline` transformer
pub fn inline_transformers() -> Transformers {
    let mut ts = Transformers::new();
    ts.register("inline", Arc::new(InlineTransformer));
    ts
}

pub fn inline_object(source: &str) -> ObjectDefinition {
    ObjectDefinition {
        object_type: "inline".into(),
        source: source.into(),
        ..Default::default()
    }
}
