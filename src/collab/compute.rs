//! [`ComputeService`]: the cluster compute/task framework, consulted only
//! by [`crate::metrics::AffinityAndMetrics::global_space`] to fan a job
//! out to every node.

use async_trait::async_trait;

use crate::collab::discovery::NodeId;

/// `(used, max)` space pair returned by one node's job execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpacePair {
    pub used: u64,
    pub max: u64,
}

#[async_trait]
pub trait ComputeService: Send + Sync {
    /// Executes a local-space-query job on every given node. The job
    /// never fails over: a node that errors or is unreachable is simply
    /// absent from the result, never retried elsewhere.
    async fn execute_space_query(&self, nodes: &[NodeId]) -> Vec<SpacePair>;
}
