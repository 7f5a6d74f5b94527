//! In-memory [`Messaging`] reference implementation: routes messages
//! between nodes sharing the same [`SharedCluster`] via per-node
//! broadcast channels, avoiding any real network transport.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::sync::broadcast;

use crate::collab::discovery::NodeId;
use crate::collab::memory::SharedCluster;
use crate::collab::messaging::{DeleteCompletedMessage, Messaging};
use crate::error::{IgfsError, Result};

/// Shared switchboard: every [`InMemoryMessaging`] handle registers its
/// node's inbound channel here so peers can address it directly.
pub struct MessageRouter {
    inboxes: Mutex<HashMap<NodeId, broadcast::Sender<DeleteCompletedMessage>>>,
}

impl MessageRouter {
    pub fn new() -> Arc<Self> {
        Arc::new(Self { inboxes: Mutex::new(HashMap::new()) })
    }
}

pub struct InMemoryMessaging {
    router: Arc<MessageRouter>,
    local_node: NodeId,
    inbox: broadcast::Sender<DeleteCompletedMessage>,
    _cluster: Arc<SharedCluster>,
}

impl InMemoryMessaging {
    pub fn new(router: Arc<MessageRouter>, cluster: Arc<SharedCluster>, local_node: NodeId) -> Self {
        let (inbox, _) = broadcast::channel(64);
        router.inboxes.lock().unwrap().insert(local_node, inbox.clone());
        Self { router, local_node, inbox, _cluster: cluster }
    }
}

#[async_trait]
impl Messaging for InMemoryMessaging {
    async fn send_delete_completed(&self, to: NodeId, message: DeleteCompletedMessage) -> Result<()> {
        let sender = self
            .router
            .inboxes
            .lock()
            .unwrap()
            .get(&to)
            .cloned()
            .ok_or_else(|| IgfsError::internal(format!("no route to node {to:?}")))?;
        sender.send(message).map_err(|_| IgfsError::internal("no listeners for delete-completed message"))?;
        Ok(())
    }

    fn subscribe_delete_completed(&self) -> broadcast::Receiver<DeleteCompletedMessage> {
        let _ = self.local_node;
        self.inbox.subscribe()
    }
}
