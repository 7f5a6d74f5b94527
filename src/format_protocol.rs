//! [`FormatProtocol`]: cluster-wide async delete completion (spec.md
//! §4.6/C7). Generalizes the teacher's `nsm`/`nlm` host-monitoring +
//! lock-holder bookkeeping (pending state keyed by peer, resolved by
//! either an explicit message or a membership-change notification) to
//! IGFS's trash-purge completion tracking.

use std::collections::HashMap;
use std::sync::Arc;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use tokio::sync::broadcast;
use tokio::sync::Notify;
use tracing::{debug, warn};

use crate::collab::discovery::{DiscoveryService, NodeEvent};
use crate::collab::messaging::Messaging;
use crate::collab::metadata::MetadataManager;
use crate::error::Result;
use crate::id::{FileId, ROOT_ID};

const IGFS_NAME_ATTRIBUTE: &str = "igfs.name";

struct PendingEntry {
    notify: Arc<Notify>,
    result: std::sync::Mutex<Option<std::result::Result<(), String>>>,
}

impl PendingEntry {
    fn new() -> Self {
        Self { notify: Arc::new(Notify::new()), result: std::sync::Mutex::new(None) }
    }

    fn complete(&self, result: std::result::Result<(), String>) {
        let mut slot = self.result.lock().unwrap();
        if slot.is_none() {
            *slot = Some(result);
            self.notify.notify_waiters();
        }
    }

    async fn wait(&self) -> std::result::Result<(), String> {
        loop {
            if let Some(result) = self.result.lock().unwrap().clone() {
                return result;
            }
            self.notify.notified().await;
        }
    }
}

/// Tracks cluster-wide completion of soft-deletes. One instance per
/// [`crate::igfs::IgfsImpl`]; subscribes to messaging/discovery at
/// construction and is torn down by dropping it (its background task
/// ends when both channels close).
pub struct FormatProtocol {
    igfs_name: String,
    pending: Arc<DashMap<FileId, Arc<PendingEntry>>>,
    discovery: Arc<dyn DiscoveryService>,
    messaging: Arc<dyn Messaging>,
    metadata: Arc<dyn MetadataManager>,
    listener: tokio::sync::Mutex<Option<tokio::task::JoinHandle<()>>>,
}

impl FormatProtocol {
    pub fn new(
        igfs_name: String,
        discovery: Arc<dyn DiscoveryService>,
        messaging: Arc<dyn Messaging>,
        metadata: Arc<dyn MetadataManager>,
    ) -> Self {
        let pending: Arc<DashMap<FileId, Arc<PendingEntry>>> = Arc::new(DashMap::new());

        let mut delete_rx = messaging.subscribe_delete_completed();
        let mut node_rx = discovery.subscribe();
        let task_pending = pending.clone();
        let task_discovery = discovery.clone();
        let task_metadata = metadata.clone();
        let task_igfs_name = igfs_name.clone();

        let listener = tokio::spawn(async move {
            loop {
                tokio::select! {
                    message = delete_rx.recv() => {
                        match message {
                            Ok(message) => {
                                if !same_igfs_name(task_discovery.as_ref(), message.from, &task_igfs_name).await {
                                    continue;
                                }
                                if let Some((_, entry)) = task_pending.remove(&message.id) {
                                    debug!(id = %message.id, "delete-completed message resolved pending future");
                                    entry.complete(message.error.map(Err).unwrap_or(Ok(())));
                                }
                            }
                            Err(broadcast::error::RecvError::Closed) => break,
                            Err(broadcast::error::RecvError::Lagged(_)) => continue,
                        }
                    }
                    event = node_rx.recv() => {
                        match event {
                            Ok(NodeEvent::Left(_) | NodeEvent::Failed(_)) => {
                                resolve_against_metadata(&task_pending, task_metadata.as_ref()).await;
                            }
                            Err(broadcast::error::RecvError::Closed) => break,
                            Err(broadcast::error::RecvError::Lagged(_)) => continue,
                        }
                    }
                }
            }
        });

        Self { igfs_name, pending, discovery, messaging, metadata, listener: tokio::sync::Mutex::new(Some(listener)) }
    }

    /// Soft-deletes the tree root. Returns immediately if there was
    /// nothing to delete; otherwise registers (and awaits) a pending
    /// future for the resulting id.
    pub async fn format_async(&self) -> Result<()> {
        let Some(id) = self.metadata.soft_delete(None, None, ROOT_ID).await? else {
            return Ok(());
        };
        self.await_pending(id).await
    }

    /// Snapshots every currently pending-delete id and waits for all of
    /// them to complete.
    pub async fn await_deletes_async(&self) -> Result<()> {
        let ids = self.metadata.pending_deletes().await;
        for id in ids {
            self.await_pending(id).await?;
        }
        Ok(())
    }

    async fn await_pending(&self, id: FileId) -> Result<()> {
        let entry = match self.pending.entry(id) {
            Entry::Occupied(occupied) => occupied.get().clone(),
            Entry::Vacant(vacant) => {
                let entry = Arc::new(PendingEntry::new());
                vacant.insert(entry.clone());
                entry
            }
        };

        // Re-check after registering: a completion that raced the insert
        // above must still be observed.
        if !self.metadata.exists(id).await {
            if let Some((_, entry)) = self.pending.remove(&id) {
                entry.complete(Ok(()));
            }
        }

        let _ = &self.discovery;
        let _ = &self.messaging;
        let _ = &self.igfs_name;

        entry.wait().await.map_err(|err| crate::error::IgfsError::internal(format!("delete completion failed: {err}")))
    }

    /// Aborts and joins the background listener task. Idempotent: a
    /// second call finds nothing left to join.
    pub async fn shutdown(&self) {
        if let Some(listener) = self.listener.lock().await.take() {
            listener.abort();
            let _ = listener.await;
        }
    }
}

async fn same_igfs_name(discovery: &dyn DiscoveryService, from: crate::collab::discovery::NodeId, igfs_name: &str) -> bool {
    discovery.node_attribute(from, IGFS_NAME_ATTRIBUTE).await.as_deref() == Some(igfs_name)
}

async fn resolve_against_metadata(pending: &DashMap<FileId, Arc<PendingEntry>>, metadata: &dyn MetadataManager) {
    let ids: Vec<FileId> = pending.iter().map(|e| *e.key()).collect();
    let mut resolved = HashMap::new();
    for id in ids {
        if !metadata.exists(id).await {
            resolved.insert(id, ());
        }
    }
    for (id, ()) in resolved {
        if let Some((_, entry)) = pending.remove(&id) {
            warn!(id = %id, "resolving pending delete via node-left observation, not a completion message");
            entry.complete(Ok(()));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collab::memory::{InMemoryDiscovery, InMemoryMessaging, InMemoryMetadataManager, MessageRouter, SharedCluster};
    use crate::collab::discovery::NodeId;
    use crate::collab::metadata::MetadataManager;

    #[tokio::test]
    async fn format_with_nothing_to_delete_completes_immediately() {
        let metadata = Arc::new(InMemoryMetadataManager::new(None));
        let cluster = SharedCluster::new(vec![NodeId(1)]);
        let discovery = Arc::new(InMemoryDiscovery::new(cluster.clone(), NodeId(1)));
        let router = MessageRouter::new();
        let messaging = Arc::new(InMemoryMessaging::new(router, cluster, NodeId(1)));

        // Soft-delete the root once up front so the protocol sees nothing
        // left to delete on its own formatAsync call.
        metadata.soft_delete(None, None, ROOT_ID).await.unwrap();

        let protocol = FormatProtocol::new("test".into(), discovery, messaging, metadata);
        protocol.format_async().await.unwrap();
        protocol.shutdown().await;
    }

    #[tokio::test]
    async fn node_left_resolves_pending_delete_once_metadata_confirms() {
        let metadata = Arc::new(InMemoryMetadataManager::new(None));
        let cluster = SharedCluster::new(vec![NodeId(1), NodeId(2)]);
        let discovery = Arc::new(InMemoryDiscovery::new(cluster.clone(), NodeId(1)));
        let router = MessageRouter::new();
        let messaging = Arc::new(InMemoryMessaging::new(router, cluster.clone(), NodeId(1)));

        metadata.dual_mkdirs(ROOT_ID, "a", Default::default()).await.unwrap();

        let protocol = Arc::new(FormatProtocol::new("test".into(), discovery, messaging, metadata.clone()));

        // format_async registers a pending future and blocks, since the
        // soft-deleted id still exists in metadata (moved under TRASH).
        let waiting = tokio::spawn({
            let protocol = protocol.clone();
            async move { protocol.format_async().await }
        });

        // Give the spawned task a chance to register before we simulate
        // the purge completing out from under it.
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        let trash_id = metadata.pending_deletes().await[0];
        metadata.remove_if_empty(crate::id::TRASH_ID, &trash_id.to_string(), trash_id, true).await.unwrap();

        cluster.node_left(NodeId(2));

        tokio::time::timeout(std::time::Duration::from_secs(1), waiting).await.unwrap().unwrap().unwrap();
        protocol.shutdown().await;
    }
}
