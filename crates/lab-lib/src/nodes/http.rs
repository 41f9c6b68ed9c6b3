//! HTTP client for the node agent control API

use super::{Node, NodeDialer, NodeRef};
use crate::error::{Error, Result};
use crate::models::{NodeMetadata, PeerInfo, Task, TransferStats};
use crate::query::Labeled;
use async_trait::async_trait;
use std::future::Future;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::debug;
use url::Url;

/// Port the node agent listens on when the store does not record one
pub const DEFAULT_AGENT_PORT: u16 = 7002;

/// Node reached through its agent's HTTP API
pub struct HttpNode {
    meta: NodeMetadata,
    client: reqwest::Client,
    base_url: Url,
}

impl HttpNode {
    pub fn new(client: reqwest::Client, meta: NodeMetadata, default_port: u16) -> Result<Self> {
        let port = meta.agent_port.unwrap_or(default_port);
        let base_url = Url::parse(&format!("http://{}:{}/", meta.address, port)).map_err(|e| {
            Error::InvalidArgument(format!("node {:?} has invalid address: {}", meta.id, e))
        })?;

        Ok(Self {
            meta,
            client,
            base_url,
        })
    }

    /// Agent endpoint, exposed for diagnostics
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn metadata(&self) -> &NodeMetadata {
        &self.meta
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        self.base_url
            .join(path)
            .map_err(|e| Error::InvalidArgument(format!("invalid agent path {:?}: {}", path, e)))
    }
}

/// Run `request` unless `cancel` fires first
async fn cancellable<T>(
    cancel: &CancellationToken,
    request: impl Future<Output = Result<T>>,
) -> Result<T> {
    tokio::select! {
        _ = cancel.cancelled() => Err(Error::Cancelled),
        result = request => result,
    }
}

impl Labeled for HttpNode {
    fn id(&self) -> &str {
        &self.meta.id
    }

    fn labels(&self) -> &[String] {
        &self.meta.labels
    }
}

#[async_trait]
impl Node for HttpNode {
    async fn peer_info(&self, cancel: &CancellationToken) -> Result<PeerInfo> {
        let url = self.endpoint("peerInfo")?;
        let connectivity = |e: reqwest::Error| {
            Error::Connectivity(format!("peer info from {:?}: {}", self.meta.id, e))
        };

        cancellable(cancel, async {
            let response = self
                .client
                .get(url)
                .send()
                .await
                .and_then(|r| r.error_for_status())
                .map_err(connectivity)?;
            response.json::<PeerInfo>().await.map_err(connectivity)
        })
        .await
    }

    async fn run(&self, task: &Task, cancel: &CancellationToken) -> Result<TransferStats> {
        let url = self.endpoint("run")?;
        debug!(node = %self.meta.id, task = %task.task_type, "Dispatching task");
        let failed = |e: reqwest::Error| Error::task(self.meta.id.clone(), e.to_string());

        cancellable(cancel, async {
            let response = self
                .client
                .post(url)
                .json(task)
                .send()
                .await
                .and_then(|r| r.error_for_status())
                .map_err(failed)?;
            response.json::<TransferStats>().await.map_err(failed)
        })
        .await
    }
}

/// Dials store records into `HttpNode`s sharing one client
#[derive(Debug, Clone)]
pub struct HttpNodeDialer {
    client: reqwest::Client,
    default_port: u16,
}

impl HttpNodeDialer {
    pub fn new(client: reqwest::Client, default_port: u16) -> Self {
        Self {
            client,
            default_port,
        }
    }
}

impl NodeDialer for HttpNodeDialer {
    fn dial(&self, meta: NodeMetadata) -> Result<NodeRef> {
        Ok(Arc::new(HttpNode::new(
            self.client.clone(),
            meta,
            self.default_port,
        )?))
    }
}
