//! In-memory [`DataManager`] reference implementation: block contents
//! kept in a flat `id -> bytes` map, mirroring the teacher's in-memory
//! `allocator` slab but addressed by [`FileId`] instead of block index.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use whirlwind::ShardMap;

use crate::collab::data::{AffinityBlock, DataManager};
use crate::collab::discovery::NodeId;
use crate::error::Result;
use crate::id::FileId;
use crate::model::FileInfo;

pub struct InMemoryDataManager {
    blocks: ShardMap<FileId, Vec<u8>>,
    space_used: AtomicU64,
    local_node: NodeId,
    group_block_size: u32,
    affinity_counter: AtomicU64,
    max_space: u64,
}

impl InMemoryDataManager {
    pub fn new(local_node: NodeId, max_space: u64) -> Arc<Self> {
        Arc::new(Self {
            blocks: ShardMap::new(),
            space_used: AtomicU64::new(0),
            local_node,
            group_block_size: 64 * 1024,
            affinity_counter: AtomicU64::new(0),
            max_space,
        })
    }
}

#[async_trait]
impl DataManager for InMemoryDataManager {
    async fn read(&self, info: &FileInfo, offset: u64, len: u32, _prefetch_blocks: u32) -> Result<Vec<u8>> {
        let data = match self.blocks.get(&info.id).await {
            Some(block) => block.clone(),
            None => Vec::new(),
        };
        let start = (offset as usize).min(data.len());
        let end = (start + len as usize).min(data.len());
        Ok(data[start..end].to_vec())
    }

    async fn write(&self, info: &FileInfo, offset: u64, data: &[u8]) -> Result<()> {
        let end = offset as usize + data.len();
        if let Some(mut buf) = self.blocks.get_mut(&info.id).await {
            let before = buf.len();
            if buf.len() < end {
                buf.resize(end, 0);
            }
            buf[offset as usize..end].copy_from_slice(data);
            if buf.len() > before {
                self.space_used.fetch_add((buf.len() - before) as u64, Ordering::Relaxed);
            }
            return Ok(());
        }

        let mut buf = vec![0u8; end];
        buf[offset as usize..end].copy_from_slice(data);
        let len = buf.len() as u64;
        self.blocks.insert(info.id, buf).await;
        self.space_used.fetch_add(len, Ordering::Relaxed);
        Ok(())
    }

    async fn affinity(&self, info: &FileInfo, start: u64, len: u64, max_len: Option<u64>) -> Result<Vec<AffinityBlock>> {
        let length = max_len.unwrap_or(len).max(1);
        let _ = info;
        Ok(vec![AffinityBlock { node_id: self.local_node, start, length }])
    }

    fn group_block_size(&self) -> u32 {
        self.group_block_size
    }

    async fn space_size(&self) -> u64 {
        self.space_used.load(Ordering::Relaxed)
    }

    async fn max_space_size(&self) -> u64 {
        self.max_space
    }

    fn next_affinity_key(&self) -> FileId {
        FileId::from_raw(self.affinity_counter.fetch_add(1, Ordering::Relaxed) as u128)
    }

    async fn await_init(&self) -> Result<()> {
        Ok(())
    }
}
