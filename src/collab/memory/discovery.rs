//! In-memory [`DiscoveryService`] backed by a small shared cluster
//! registry, enough to exercise node-left notification and multi-node
//! fan-out in tests without a real cluster transport.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::sync::broadcast;

use crate::collab::discovery::{DiscoveryService, NodeEvent, NodeId};

struct ClusterState {
    nodes: Vec<NodeId>,
    attributes: HashMap<(NodeId, String), String>,
}

/// Shared membership list every [`InMemoryDiscovery`] handle in a test
/// observes; `fail_node`/nothing-else drives the node-left notifications.
pub struct SharedCluster {
    state: Mutex<ClusterState>,
    events: broadcast::Sender<NodeEvent>,
}

impl SharedCluster {
    pub fn new(nodes: Vec<NodeId>) -> Arc<Self> {
        let (events, _) = broadcast::channel(64);
        Arc::new(Self { state: Mutex::new(ClusterState { nodes, attributes: HashMap::new() }), events })
    }

    pub fn set_attribute(&self, node: NodeId, key: &str, value: &str) {
        self.state.lock().unwrap().attributes.insert((node, key.to_string()), value.to_string());
    }

    /// Removes `node` from membership and broadcasts a `Left` event.
    pub fn node_left(&self, node: NodeId) {
        self.state.lock().unwrap().nodes.retain(|n| *n != node);
        let _ = self.events.send(NodeEvent::Left(node));
    }
}

pub struct InMemoryDiscovery {
    cluster: Arc<SharedCluster>,
    local_node: NodeId,
}

impl InMemoryDiscovery {
    pub fn new(cluster: Arc<SharedCluster>, local_node: NodeId) -> Self {
        Self { cluster, local_node }
    }
}

#[async_trait]
impl DiscoveryService for InMemoryDiscovery {
    fn local_node(&self) -> NodeId {
        self.local_node
    }

    async fn node_attribute(&self, node: NodeId, key: &str) -> Option<String> {
        self.cluster.state.lock().unwrap().attributes.get(&(node, key.to_string())).cloned()
    }

    async fn nodes(&self) -> Vec<NodeId> {
        self.cluster.state.lock().unwrap().nodes.clone()
    }

    fn subscribe(&self) -> broadcast::Receiver<NodeEvent> {
        self.cluster.events.subscribe()
    }
}
