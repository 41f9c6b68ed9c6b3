//! Full-mesh connect protocol
//!
//! Phase one collects one dial string per node into a slot indexed by the
//! node's position. Phase two, run only once every slot is filled, sends
//! every node a `connect` task listing all dial strings.

use super::NodeRef;
use crate::error::{Error, Result};
use crate::group::TaskGroup;
use crate::models::{Task, TaskType};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// Connect every node in `nodes` to every other node
pub async fn connect(nodes: &[NodeRef], cancel: &CancellationToken) -> Result<()> {
    connect_with_limit(nodes, cancel, 0).await
}

/// Like `connect`, running at most `max_fanout` node calls at once (0 is unbounded)
pub async fn connect_with_limit(
    nodes: &[NodeRef],
    cancel: &CancellationToken,
    max_fanout: usize,
) -> Result<()> {
    info!(nodes = nodes.len(), "Collecting peer addresses");

    let mut collect = TaskGroup::with_limit(cancel, max_fanout);
    for (slot, node) in nodes.iter().enumerate() {
        let node = node.clone();
        collect.spawn(move |token| async move {
            let info = node.peer_info(&token).await?;
            let addr = info.addrs.first().ok_or_else(|| {
                Error::Connectivity(format!("peer {:?} has zero addresses", node.id()))
            })?;
            Ok((slot, format!("{}/p2p/{}", addr, info.id)))
        });
    }

    let mut peer_addrs = vec![String::new(); nodes.len()];
    for (slot, addr) in collect.wait().await? {
        peer_addrs[slot] = addr;
    }
    debug!(peers = ?peer_addrs, "Collected peer addresses");

    info!(nodes = nodes.len(), "Connecting peers");
    let subject = peer_addrs.join(",");

    let mut dial = TaskGroup::with_limit(cancel, max_fanout);
    for node in nodes {
        let node = node.clone();
        let task = Task::new(TaskType::Connect, subject.clone());
        dial.spawn(move |token| async move {
            match node.run(&task, &token).await {
                Ok(_) => Ok(()),
                Err(Error::TaskExecution { node, message }) => Err(Error::Connectivity(
                    format!("node {:?} failed to connect to peers: {}", node, message),
                )),
                Err(err) => Err(err),
            }
        });
    }

    dial.wait().await?;
    Ok(())
}
