//! [`Messaging`]: cluster message passing used by
//! [`crate::format_protocol::FormatProtocol`] to learn that a peer
//! finished purging a soft-deleted subtree.

use async_trait::async_trait;

use crate::collab::discovery::NodeId;
use crate::id::FileId;

/// Sent by the node that completed (or failed) a trash purge, addressed
/// to every peer with a pending future for that id.
#[derive(Debug, Clone)]
pub struct DeleteCompletedMessage {
    pub id: FileId,
    pub error: Option<String>,
    pub from: NodeId,
}

#[async_trait]
pub trait Messaging: Send + Sync {
    async fn send_delete_completed(&self, to: NodeId, message: DeleteCompletedMessage) -> crate::error::Result<()>;

    /// Subscribes to [`DeleteCompletedMessage`]s addressed to this node.
    fn subscribe_delete_completed(&self) -> tokio::sync::broadcast::Receiver<DeleteCompletedMessage>;
}
