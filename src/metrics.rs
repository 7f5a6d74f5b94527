//! [`AffinityAndMetrics`]: block-affinity delegation and aggregate space
//! reporting (spec.md §4.7/C8).

use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use moka::sync::Cache;
use tracing::warn;

use crate::collab::compute::ComputeService;
use crate::collab::data::{AffinityBlock, DataManager};
use crate::collab::discovery::DiscoveryService;
use crate::collab::secondary::SecondaryFs;
use crate::descriptor::{self, Summary};
use crate::error::Result;
use crate::id::ROOT_ID;
use crate::model::FileInfo;
use crate::streams::StreamCounters;

/// How often a repeated secondary-space query failure is allowed to log
/// (spec.md §4.7: "reported as -1 on failure, logged throttled").
const SECONDARY_FAILURE_LOG_PERIOD: Duration = Duration::from_secs(60);

/// Snapshot returned by [`AffinityAndMetrics::metrics`].
#[derive(Debug, Clone)]
pub struct IgfsMetrics {
    pub local_space_size: u64,
    pub max_space_size: u64,
    /// `-1` when the secondary FS query failed (spec.md §4.7/§7).
    pub secondary_space_size: i64,
    pub directories: u64,
    pub files: u64,
    pub total_length: u64,
    pub reads_open: u64,
    pub writes_open: u64,
    pub bytes_read: u64,
    pub bytes_written: u64,
}

/// Aggregate `(used, max)` space across the whole cluster, as returned
/// by [`AffinityAndMetrics::global_space`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct GlobalSpace {
    pub used: u64,
    pub max: u64,
}

pub struct AffinityAndMetrics {
    data: Arc<dyn DataManager>,
    secondary: Option<Arc<dyn SecondaryFs>>,
    discovery: Arc<dyn DiscoveryService>,
    compute: Arc<dyn ComputeService>,
    metadata: Arc<dyn crate::collab::metadata::MetadataManager>,
    counters: Arc<StreamCounters>,
    /// Gates how often a secondary-space query failure is logged: one
    /// entry, evicted after `SECONDARY_FAILURE_LOG_PERIOD` so the next
    /// failure after a quiet spell logs again.
    secondary_failure_logged: Cache<(), ()>,
}

impl AffinityAndMetrics {
    pub fn new(
        data: Arc<dyn DataManager>,
        secondary: Option<Arc<dyn SecondaryFs>>,
        discovery: Arc<dyn DiscoveryService>,
        compute: Arc<dyn ComputeService>,
        metadata: Arc<dyn crate::collab::metadata::MetadataManager>,
        counters: Arc<StreamCounters>,
    ) -> Self {
        let secondary_failure_logged = Cache::builder().time_to_live(SECONDARY_FAILURE_LOG_PERIOD).max_capacity(1).build();
        Self { data, secondary, discovery, compute, metadata, counters, secondary_failure_logged }
    }

    /// Delegates a block-affinity query to the data manager.
    pub async fn affinity(&self, info: &FileInfo, start: u64, len: u64, max_len: Option<u64>) -> Result<Vec<AffinityBlock>> {
        self.data.affinity(info, start, len, max_len).await
    }

    /// Local metrics plus a full tree walk from `ROOT_ID`.
    pub async fn metrics(&self) -> IgfsMetrics {
        let Summary { files, directories, total_length } = descriptor::summary(self.metadata.as_ref(), ROOT_ID).await;

        let secondary_space_size = match &self.secondary {
            Some(secondary) => match secondary.used_space_size().await {
                Ok(size) => size as i64,
                Err(err) => {
                    if self.secondary_failure_logged.get(&()).is_none() {
                        warn!(%err, "secondary file system space query failed");
                        self.secondary_failure_logged.insert((), ());
                    }
                    -1
                }
            },
            None => 0,
        };

        IgfsMetrics {
            local_space_size: self.data.space_size().await,
            max_space_size: self.data.max_space_size().await,
            secondary_space_size,
            directories,
            files,
            total_length,
            reads_open: self.counters.reads_open.load(Ordering::Acquire),
            writes_open: self.counters.writes_open.load(Ordering::Acquire),
            bytes_read: self.counters.bytes_read.load(Ordering::Acquire),
            bytes_written: self.counters.bytes_written.load(Ordering::Acquire),
        }
    }

    /// Fans a space query out to every cluster node and sums the result.
    /// A node that fails or is unreachable is simply absent, never
    /// retried (spec.md §4.7).
    pub async fn global_space(&self) -> GlobalSpace {
        let nodes = self.discovery.nodes().await;
        let pairs = self.compute.execute_space_query(&nodes).await;
        pairs.into_iter().fold(GlobalSpace::default(), |acc, pair| GlobalSpace {
            used: acc.used + pair.used,
            max: acc.max + pair.max,
        })
    }
}
