//! In-memory [`ComputeService`]: answers a space query locally for every
//! requested node from a fixed table, standing in for a real fan-out
//! compute-grid job.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::collab::compute::{ComputeService, SpacePair};
use crate::collab::discovery::NodeId;

#[derive(Default)]
pub struct StubComputeService {
    space_by_node: Mutex<HashMap<NodeId, SpacePair>>,
}

impl StubComputeService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_space(&self, node: NodeId, used: u64, max: u64) {
        self.space_by_node.lock().unwrap().insert(node, SpacePair { used, max });
    }
}

#[async_trait]
impl ComputeService for StubComputeService {
    async fn execute_space_query(&self, nodes: &[NodeId]) -> Vec<SpacePair> {
        let table = self.space_by_node.lock().unwrap();
        nodes.iter().filter_map(|n| table.get(n).copied()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn unreachable_node_is_absent_not_errored() {
        let compute = StubComputeService::new();
        compute.set_space(NodeId(1), 10, 100);
        let results = compute.execute_space_query(&[NodeId(1), NodeId(2)]).await;
        assert_eq!(results, vec![SpacePair { used: 10, max: 100 }]);
    }
}
