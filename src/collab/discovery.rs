//! [`DiscoveryService`]: cluster membership, consulted by
//! [`crate::format_protocol::FormatProtocol`] for node-left/failed events
//! and by [`crate::metrics::AffinityAndMetrics`] for fan-out targets.

use async_trait::async_trait;

/// Opaque cluster node identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(pub u64);

/// A membership change observed by [`DiscoveryService`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeEvent {
    Left(NodeId),
    Failed(NodeId),
}

#[async_trait]
pub trait DiscoveryService: Send + Sync {
    fn local_node(&self) -> NodeId;

    /// Looks up a node attribute (used to filter messages/events to peers
    /// sharing the same IGFS name).
    async fn node_attribute(&self, node: NodeId, key: &str) -> Option<String>;

    /// All currently known cluster nodes (used by the compute fan-out).
    async fn nodes(&self) -> Vec<NodeId>;

    /// Subscribes to node-left/node-failed notifications. Each call gets
    /// its own receiver so multiple local listeners can coexist.
    fn subscribe(&self) -> tokio::sync::broadcast::Receiver<NodeEvent>;
}
