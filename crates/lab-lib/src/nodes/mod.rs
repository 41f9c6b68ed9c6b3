//! Cluster nodes
//!
//! A node is a labeled cluster member that reports its peer identity and
//! executes tasks. This module also carries the mesh connect protocol and
//! the reset step run before every benchmark.

mod connect;
mod http;


pub use connect::{connect, connect_with_limit};
pub use http::{HttpNode, HttpNodeDialer, DEFAULT_AGENT_PORT};

use crate::error::Result;
use crate::group::TaskGroup;
use crate::models::{NodeMetadata, PeerInfo, Task, TaskType, TransferStats};
use crate::query::Labeled;
use async_trait::async_trait;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::info;

/// A cluster member able to execute tasks
#[async_trait]
pub trait Node: Labeled + Send + Sync {
    /// Peer identity and transport addresses of the node's p2p host
    async fn peer_info(&self, cancel: &CancellationToken) -> Result<PeerInfo>;

    /// Execute `task` and report the block exchange it caused
    async fn run(&self, task: &Task, cancel: &CancellationToken) -> Result<TransferStats>;
}

pub type NodeRef = Arc<dyn Node>;

/// Builds task-executable handles for nodes recorded in the store
pub trait NodeDialer: Send + Sync {
    fn dial(&self, meta: NodeMetadata) -> Result<NodeRef>;
}

/// Brings nodes to a known-clean runtime state
#[async_trait]
pub trait NodeProvisioner: Send + Sync {
    async fn reset(&self, nodes: &[NodeRef], cancel: &CancellationToken) -> Result<()>;
}

/// Resets nodes by sending every one of them an `update` task
#[derive(Debug, Clone)]
pub struct TaskProvisioner {
    revision: String,
    max_fanout: usize,
}

impl TaskProvisioner {
    /// `revision` names the node agent build to update to
    pub fn new(revision: impl Into<String>) -> Self {
        Self {
            revision: revision.into(),
            max_fanout: 0,
        }
    }

    pub fn with_max_fanout(mut self, max_fanout: usize) -> Self {
        self.max_fanout = max_fanout;
        self
    }
}

#[async_trait]
impl NodeProvisioner for TaskProvisioner {
    async fn reset(&self, nodes: &[NodeRef], cancel: &CancellationToken) -> Result<()> {
        info!(nodes = nodes.len(), revision = %self.revision, "Updating nodes");

        let mut group = TaskGroup::with_limit(cancel, self.max_fanout);
        for node in nodes {
            let node = node.clone();
            let task = Task::new(TaskType::Update, self.revision.clone());
            group.spawn(move |token| async move {
                node.run(&task, &token).await?;
                Ok(())
            });
        }

        group.wait().await?;
        Ok(())
    }
}
