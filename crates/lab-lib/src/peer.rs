//! Publishing peer that seeds transformed objects into the swarm

use crate::error::Result;
use crate::models::{ContentId, PeerInfo};
use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::Arc;
use tracing::debug;

/// Peer that holds materialized objects and serves them to cluster nodes
#[async_trait]
pub trait Publisher: Send + Sync {
    /// Identity and listen addresses of the publisher
    fn peer_info(&self) -> PeerInfo;

    /// Make `data` retrievable under `cid`
    async fn publish(&self, cid: &ContentId, data: Vec<u8>) -> Result<()>;

    /// Dial strings nodes use to reach the publisher
    fn advertised_addrs(&self) -> Vec<String> {
        self.peer_info().dial_addrs()
    }
}

/// In-process publisher backed by a concurrent block map
#[derive(Clone)]
pub struct LocalPublisher {
    info: PeerInfo,
    blocks: Arc<DashMap<ContentId, Arc<Vec<u8>>>>,
}

impl LocalPublisher {
    pub fn new(peer_id: impl Into<String>, addrs: Vec<String>) -> Self {
        Self {
            info: PeerInfo {
                id: peer_id.into(),
                addrs,
            },
            blocks: Arc::new(DashMap::new()),
        }
    }

    pub fn get(&self, cid: &ContentId) -> Option<Arc<Vec<u8>>> {
        self.blocks.get(cid).map(|entry| entry.value().clone())
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }
}

#[async_trait]
impl Publisher for LocalPublisher {
    fn peer_info(&self) -> PeerInfo {
        self.info.clone()
    }

    async fn publish(&self, cid: &ContentId, data: Vec<u8>) -> Result<()> {
        debug!(cid = %cid, bytes = data.len(), "Publishing object");
        self.blocks.insert(cid.clone(), Arc::new(data));
        Ok(())
    }
}
