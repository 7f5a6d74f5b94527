//! [`DataManager`]: block storage and placement for file contents.
//!
//! Out of scope per spec.md §1 ("the data manager's block placement");
//! only the surface [`crate::metrics::AffinityAndMetrics`] and the
//! coordinator's `affinity` operation consume is specified here.

use async_trait::async_trait;

use crate::error::Result;
use crate::id::FileId;
use crate::model::FileInfo;

/// Location of one affinitized block, as returned by
/// [`DataManager::affinity`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AffinityBlock {
    pub node_id: crate::collab::discovery::NodeId,
    pub start: u64,
    pub length: u64,
}

#[async_trait]
pub trait DataManager: Send + Sync {
    /// Reads backing bytes for `info` at `offset..offset+len`, reading
    /// ahead up to `prefetch_blocks` additional blocks.
    async fn read(&self, info: &FileInfo, offset: u64, len: u32, prefetch_blocks: u32) -> Result<Vec<u8>>;

    /// Writes `data` at `offset`, growing `info`'s length as needed.
    async fn write(&self, info: &FileInfo, offset: u64, data: &[u8]) -> Result<()>;

    /// Block placement for `start..start+len`, capped to `max_len` blocks
    /// in the response.
    async fn affinity(&self, info: &FileInfo, start: u64, len: u64, max_len: Option<u64>) -> Result<Vec<AffinityBlock>>;

    fn group_block_size(&self) -> u32;

    async fn space_size(&self) -> u64;

    async fn max_space_size(&self) -> u64;

    fn next_affinity_key(&self) -> FileId;

    async fn await_init(&self) -> Result<()>;
}
