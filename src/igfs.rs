//! [`IgfsImpl`]: the public façade (spec.md §4.8/C9).
//!
//! Wires every collaborator and internal subsystem together and wraps
//! each public operation in [`BusyLifecycle::enter`], the same shape the
//! teacher's `Vfs` implementors use to gate every RPC handler against an
//! in-progress unmount.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use crate::busy::BusyLifecycle;
use crate::collab::compute::ComputeService;
use crate::collab::data::{AffinityBlock, DataManager};
use crate::collab::discovery::DiscoveryService;
use crate::collab::eviction::EvictionPolicy;
use crate::collab::events::EventBus;
use crate::collab::messaging::Messaging;
use crate::collab::metadata::MetadataManager;
use crate::collab::secondary::SecondaryFs;
use crate::config::IgfsConfig;
use crate::coordinator::{AffinityQuery, MetadataCoordinator};
use crate::error::Result;
use crate::format_protocol::FormatProtocol;
use crate::id::FileId;
use crate::metrics::{AffinityAndMetrics, GlobalSpace, IgfsMetrics};
use crate::mode_resolver::ModeResolver;
use crate::model::FileInfo;
use crate::path::Path;
use crate::streams::{ReadStream, StreamFactory, WriteStream};
use crate::writer_registry::WriterRegistry;

/// Every external collaborator [`IgfsImpl::new`] needs wired in, mirroring
/// the teacher's `VfsConfig`-style construction bundle.
pub struct IgfsCollaborators {
    pub metadata: Arc<dyn MetadataManager>,
    pub data: Arc<dyn DataManager>,
    pub secondary: Option<Arc<dyn SecondaryFs>>,
    pub discovery: Arc<dyn DiscoveryService>,
    pub messaging: Arc<dyn Messaging>,
    pub compute: Arc<dyn ComputeService>,
    pub events: Arc<dyn EventBus>,
    pub eviction: Arc<dyn EvictionPolicy>,
}

/// The core coordinator: every public IGFS operation in one place,
/// gated by [`BusyLifecycle`] and dispatched through
/// [`MetadataCoordinator`]/[`FormatProtocol`]/[`AffinityAndMetrics`].
pub struct IgfsImpl {
    busy: BusyLifecycle,
    coordinator: MetadataCoordinator,
    format: FormatProtocol,
    affinity_metrics: AffinityAndMetrics,
    writers: Arc<WriterRegistry>,
    metadata: Arc<dyn MetadataManager>,
    data: Arc<dyn DataManager>,
    secondary: Option<Arc<dyn SecondaryFs>>,
}

impl IgfsImpl {
    pub fn new(config: &IgfsConfig, collaborators: IgfsCollaborators) -> Result<Self> {
        let IgfsCollaborators { metadata, data, secondary, discovery, messaging, compute, events, eviction } = collaborators;

        let modes = Arc::new(ModeResolver::new(
            config.resolved_default_mode()?,
            config.has_secondary,
            config.resolved_prefixes()?,
        )?);
        let writers = Arc::new(WriterRegistry::new());
        let streams = Arc::new(StreamFactory::new(data.clone(), events.clone(), config.prefetch_blocks));

        let coordinator = MetadataCoordinator::new(
            metadata.clone(),
            data.clone(),
            secondary.clone(),
            modes,
            writers.clone(),
            events,
            eviction,
            streams.clone(),
            config.block_size,
        );

        let format = FormatProtocol::new(config.name.clone(), discovery.clone(), messaging, metadata.clone());
        let affinity_metrics = AffinityAndMetrics::new(data.clone(), secondary.clone(), discovery, compute, metadata.clone(), streams.counters());

        Ok(Self {
            busy: BusyLifecycle::with_ready_wait(Duration::from_millis(config.busy_ready_wait_millis)),
            coordinator,
            format,
            affinity_metrics,
            writers,
            metadata,
            data,
            secondary,
        })
    }

    async fn await_ready(&self) -> Result<()> {
        self.metadata.await_init().await?;
        self.data.await_init().await
    }

    pub async fn exists(&self, path: &Path) -> Result<bool> {
        let _guard = self.busy.enter(self.await_ready()).await?;
        Ok(self.coordinator.exists(path).await)
    }

    pub async fn info(&self, path: &Path) -> Result<Option<FileInfo>> {
        let _guard = self.busy.enter(self.await_ready()).await?;
        Ok(self.coordinator.info(path).await)
    }

    pub async fn mkdirs(&self, path: &Path, props: Option<HashMap<String, String>>) -> Result<()> {
        let _guard = self.busy.enter(self.await_ready()).await?;
        self.coordinator.mkdirs(path, props).await
    }

    pub async fn create(
        &self,
        path: &Path,
        buf_size: i64,
        overwrite: bool,
        affinity_key: Option<FileId>,
        props: Option<HashMap<String, String>>,
    ) -> Result<WriteStream> {
        let _guard = self.busy.enter(self.await_ready()).await?;
        self.coordinator.create(path, buf_size, overwrite, affinity_key, props).await
    }

    #[allow(clippy::too_many_arguments)]
    pub async fn create_full(
        &self,
        path: &Path,
        buf_size: i64,
        overwrite: bool,
        affinity_key: Option<FileId>,
        replication: i32,
        props: Option<HashMap<String, String>>,
        simple_create: bool,
    ) -> Result<WriteStream> {
        let _guard = self.busy.enter(self.await_ready()).await?;
        self.coordinator.create_full(path, buf_size, overwrite, affinity_key, replication, props, simple_create).await
    }

    pub async fn append(
        &self,
        path: &Path,
        buf_size: i64,
        create: bool,
        props: Option<HashMap<String, String>>,
    ) -> Result<WriteStream> {
        let _guard = self.busy.enter(self.await_ready()).await?;
        self.coordinator.append(path, buf_size, create, props).await
    }

    /// Opens `path` for reading. Reads are not mode-gated beyond
    /// requiring the path to resolve; PROXY-mode reads pull through the
    /// secondary FS transparently at the [`crate::collab::memory`] layer.
    pub async fn open_read(&self, path: &Path) -> Result<ReadStream> {
        let _guard = self.busy.enter(self.await_ready()).await?;
        let info = self.coordinator.info(path).await.ok_or_else(|| crate::error::IgfsError::FileNotFound(path.as_str().to_string()))?;
        if info.is_directory {
            return Err(crate::error::IgfsError::InvalidPath(format!("{path} is a directory")));
        }
        Ok(self.coordinator.streams.open_read(path.as_str(), info).await)
    }

    pub async fn rename(&self, src: &Path, dest: &Path) -> Result<()> {
        let _guard = self.busy.enter(self.await_ready()).await?;
        self.coordinator.rename(src, dest).await
    }

    pub async fn delete(&self, path: &Path, recursive: bool) -> Result<bool> {
        let _guard = self.busy.enter(self.await_ready()).await?;
        self.coordinator.delete(path, recursive).await
    }

    pub async fn update(&self, path: &Path, properties: HashMap<String, String>) -> Result<FileInfo> {
        let _guard = self.busy.enter(self.await_ready()).await?;
        self.coordinator.update(path, properties).await
    }

    pub async fn set_times(&self, path: &Path, atime: Option<i64>, mtime: Option<i64>) -> Result<()> {
        let _guard = self.busy.enter(self.await_ready()).await?;
        self.coordinator.set_times(path, atime, mtime).await
    }

    pub async fn list_paths(&self, path: &Path) -> Result<Vec<String>> {
        let _guard = self.busy.enter(self.await_ready()).await?;
        self.coordinator.list_paths(path).await
    }

    pub async fn list_files(&self, path: &Path) -> Result<Vec<(String, FileInfo)>> {
        let _guard = self.busy.enter(self.await_ready()).await?;
        self.coordinator.list_files(path).await
    }

    pub async fn affinity(&self, path: &Path, query: AffinityQuery) -> Result<Vec<AffinityBlock>> {
        let _guard = self.busy.enter(self.await_ready()).await?;
        self.coordinator.affinity(path, query).await
    }

    pub async fn format_async(&self) -> Result<()> {
        let _guard = self.busy.enter(self.await_ready()).await?;
        self.format.format_async().await
    }

    pub async fn await_deletes_async(&self) -> Result<()> {
        let _guard = self.busy.enter(self.await_ready()).await?;
        self.format.await_deletes_async().await
    }

    pub async fn metrics(&self) -> Result<IgfsMetrics> {
        let _guard = self.busy.enter(self.await_ready()).await?;
        Ok(self.affinity_metrics.metrics().await)
    }

    pub async fn global_space(&self) -> Result<GlobalSpace> {
        let _guard = self.busy.enter(self.await_ready()).await?;
        Ok(self.affinity_metrics.global_space().await)
    }

    /// Transitions to shutdown: blocks new operations, drains in-flight
    /// ones, retires every writer-registry worker, closes the secondary
    /// FS, and stops the format protocol's background listener.
    pub async fn stop(&self) {
        self.busy
            .block(|| async {
                self.writers.shutdown().await;
                if let Some(secondary) = &self.secondary {
                    if let Err(err) = secondary.close().await {
                        tracing::warn!(%err, "secondary file system close failed during shutdown");
                    }
                }
                self.format.shutdown().await;
            })
            .await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collab::discovery::NodeId;
    use crate::collab::eviction::NoExclusions;
    use crate::collab::memory::{
        InMemoryDataManager, InMemoryDiscovery, InMemoryEventBus, InMemoryMessaging, InMemoryMetadataManager, MessageRouter,
        SharedCluster, StubComputeService,
    };

    fn build(config: &IgfsConfig) -> IgfsImpl {
        let metadata: Arc<dyn MetadataManager> = Arc::new(InMemoryMetadataManager::new(None));
        let data: Arc<dyn DataManager> = InMemoryDataManager::new(NodeId(1), 1024 * 1024);
        let events: Arc<dyn EventBus> = Arc::new(InMemoryEventBus::new());
        let cluster = SharedCluster::new(vec![NodeId(1)]);
        let discovery: Arc<dyn DiscoveryService> = Arc::new(InMemoryDiscovery::new(cluster.clone(), NodeId(1)));
        let router = MessageRouter::new();
        let messaging: Arc<dyn Messaging> = Arc::new(InMemoryMessaging::new(router, cluster, NodeId(1)));
        let compute: Arc<dyn ComputeService> = Arc::new(StubComputeService::new());
        let eviction: Arc<dyn EvictionPolicy> = Arc::new(NoExclusions);

        IgfsImpl::new(config, IgfsCollaborators { metadata, data, secondary: None, discovery, messaging, compute, events, eviction }).unwrap()
    }

    fn test_config() -> IgfsConfig {
        IgfsConfig::from_toml("name = \"test\"\n").unwrap()
    }

    #[tokio::test]
    async fn create_write_and_read_round_trips_through_the_facade() {
        let igfs = build(&test_config());
        let path = Path::parse("/a/b").unwrap();

        let mut writer = igfs.create(&path, 0, false, None, None).await.unwrap();
        writer.write(b"hello").await.unwrap();
        writer.close().await;

        assert!(igfs.exists(&path).await.unwrap());
        let mut reader = igfs.open_read(&path).await.unwrap();
        let buf = reader.read(5).await.unwrap();
        assert_eq!(buf, b"hello");

        let metrics = igfs.metrics().await.unwrap();
        assert_eq!(metrics.files, 1);
    }

    #[tokio::test]
    async fn open_read_on_a_directory_is_rejected() {
        let igfs = build(&test_config());
        let dir = Path::parse("/a").unwrap();
        igfs.mkdirs(&dir, None).await.unwrap();
        let result = igfs.open_read(&dir).await;
        assert!(matches!(result, Err(crate::error::IgfsError::InvalidPath(_))));
    }

    #[tokio::test]
    async fn delete_then_format_and_await_deletes_completes() {
        let igfs = build(&test_config());
        let path = Path::parse("/a").unwrap();
        igfs.create(&path, 0, false, None, None).await.unwrap().close().await;
        assert!(igfs.delete(&path, false).await.unwrap());

        igfs.format_async().await.unwrap();
        igfs.await_deletes_async().await.unwrap();
    }

    #[tokio::test]
    async fn stop_drains_and_is_idempotent_against_further_calls() {
        let igfs = build(&test_config());
        igfs.mkdirs(&Path::parse("/a").unwrap(), None).await.unwrap();
        igfs.stop().await;

        let result = igfs.exists(&Path::parse("/a").unwrap()).await;
        assert!(matches!(result, Err(crate::error::IgfsError::IllegalState(_))));
    }
}
