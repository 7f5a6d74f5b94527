//! [`MetadataManager`]: the cluster-resident tree the coordinator mutates.
//!
//! Out of scope per spec.md §1 ("the metadata manager's internal tree
//! representation"); only the surface the coordinator calls is specified
//! here, the same way the teacher describes an NFS backend through `Vfs`
//! without implementing one.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::io::AsyncWrite;

use crate::error::Result;
use crate::id::FileId;
use crate::model::{FileInfo, ListingEntry};

/// A secondary-FS output stream paired with the metadata mutation that
/// created or reopened it, as produced by [`MetadataManager::dual_create`]
/// and [`MetadataManager::dual_append`].
pub struct DualWriteHandle {
    pub info: FileInfo,
    pub secondary_out: Box<dyn AsyncWrite + Send + Unpin>,
}

/// The tree-mutation surface the [`crate::coordinator::MetadataCoordinator`]
/// dispatches to. Implementations own their own locking; the core never
/// holds a lock across an `await` on one of these calls (spec.md §5).
#[async_trait]
pub trait MetadataManager: Send + Sync {
    /// Resolves a single path to its leaf id, if it exists.
    async fn file_id(&self, parent: FileId, name: &str) -> Option<FileId>;

    /// Resolves every segment of a root-to-leaf path; `None` at the first
    /// missing segment and for every segment after it.
    async fn file_ids(&self, components: &[&str]) -> Vec<Option<FileId>>;

    async fn info(&self, id: FileId) -> Option<FileInfo>;

    async fn directory_listing(&self, id: FileId) -> Option<Vec<ListingEntry>>;

    /// Inserts `name -> info` under `parent` iff no entry named `name`
    /// exists yet. Returns the id of whatever is already there on
    /// collision, `None` on a successful insert.
    async fn put_if_absent(&self, parent: FileId, name: &str, info: FileInfo) -> Result<Option<FileId>>;

    /// Takes an exclusive write lock on `id`, returning its current info.
    async fn lock(&self, id: FileId) -> Result<FileInfo>;

    /// Atomically moves `src_id` (named `src_name` under `src_parent`) to
    /// `dest_name` under `dest_parent`.
    async fn move_entry(
        &self,
        src_id: FileId,
        src_name: &str,
        src_parent: FileId,
        dest_name: &str,
        dest_parent: FileId,
    ) -> Result<()>;

    /// Removes `name`/`id` under `parent` iff it is an empty directory or
    /// a file; `rmvLocked` permits removing a file that is currently
    /// write-locked (the create-overwrite path). Returns whether anything
    /// was removed.
    async fn remove_if_empty(
        &self,
        parent: FileId,
        name: &str,
        id: FileId,
        rmvd_locked: bool,
    ) -> Result<bool>;

    /// Moves `name`/`id` under `parent` into the TRASH subtree for async
    /// purge. `parent`/`name` are `None` when soft-deleting the root
    /// itself (the format operation). Returns the id actually moved, or
    /// `None` if there was nothing to delete.
    async fn soft_delete(&self, parent: Option<FileId>, name: Option<&str>, id: FileId) -> Result<Option<FileId>>;

    async fn update_properties(&self, id: FileId, properties: HashMap<String, String>) -> Result<()>;

    async fn update_times(&self, id: FileId, atime: Option<i64>, mtime: Option<i64>) -> Result<()>;

    /// Ids currently awaiting asynchronous purge completion.
    async fn pending_deletes(&self) -> Vec<FileId>;

    async fn exists(&self, id: FileId) -> bool;

    /// Blocks (boundedly, from the caller's perspective) until the
    /// manager is ready to serve requests.
    async fn await_init(&self) -> Result<()>;

    // --- DUAL_* coordination: the manager drives both the local tree and
    // the secondary FS itself, so the core only calls through.

    async fn dual_mkdirs(&self, parent: FileId, name: &str, properties: HashMap<String, String>) -> Result<FileId>;

    async fn dual_rename(&self, src_path: &str, dest_path: &str) -> Result<()>;

    async fn dual_delete(&self, path: &str, recursive: bool) -> Result<bool>;

    async fn dual_update(&self, id: FileId, properties: HashMap<String, String>) -> Result<()>;

    async fn dual_create(&self, parent: FileId, name: &str, path: &str, overwrite: bool) -> Result<DualWriteHandle>;

    async fn dual_append(&self, parent: FileId, name: &str, path: &str, create: bool) -> Result<DualWriteHandle>;
}
