//! In-memory [`MetadataManager`] reference implementation: a single tree
//! guarded by one `tokio::sync::RwLock`, generalizing the teacher's
//! `vfs::ShadowFs` in-memory tree to IGFS's id-addressed model.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::collab::memory::InMemorySecondaryFs;
use crate::collab::metadata::{DualWriteHandle, MetadataManager};
use crate::error::{IgfsError, Result};
use crate::id::{FileId, IdGenerator, ROOT_ID, TRASH_ID};
use crate::model::{default_dir_properties, FileInfo, ListingEntry};

/// An in-memory id-addressed tree plus an optional secondary FS it
/// mirrors writes into for `dual_*` operations.
pub struct InMemoryMetadataManager {
    entries: RwLock<HashMap<FileId, FileInfo>>,
    ids: IdGenerator,
    pending_deletes: RwLock<HashSet<FileId>>,
    secondary: Option<Arc<InMemorySecondaryFs>>,
}

impl InMemoryMetadataManager {
    pub fn new(secondary: Option<Arc<InMemorySecondaryFs>>) -> Self {
        let mut entries = HashMap::new();
        entries.insert(ROOT_ID, FileInfo::new_directory(ROOT_ID, false, default_dir_properties()));
        entries.insert(TRASH_ID, FileInfo::new_directory(TRASH_ID, false, HashMap::new()));
        Self { entries: RwLock::new(entries), ids: IdGenerator::new(), pending_deletes: RwLock::new(HashSet::new()), secondary }
    }

    async fn insert_listing(&self, parent: FileId, name: &str, entry: ListingEntry) -> Result<()> {
        let mut entries = self.entries.write().await;
        let parent_info = entries.get_mut(&parent).ok_or_else(|| IgfsError::FileNotFound(parent.to_string()))?;
        parent_info.listing.insert(name.to_string(), entry);
        Ok(())
    }
}

#[async_trait]
impl MetadataManager for InMemoryMetadataManager {
    async fn file_id(&self, parent: FileId, name: &str) -> Option<FileId> {
        self.entries.read().await.get(&parent)?.listing.get(name).map(|e| e.file_id)
    }

    async fn file_ids(&self, components: &[&str]) -> Vec<Option<FileId>> {
        let entries = self.entries.read().await;
        let mut ids = Vec::with_capacity(components.len());
        let mut current = ROOT_ID;
        let mut broken = false;
        for name in components {
            if broken {
                ids.push(None);
                continue;
            }
            match entries.get(&current).and_then(|info| info.listing.get(*name)) {
                Some(entry) => {
                    ids.push(Some(entry.file_id));
                    current = entry.file_id;
                }
                None => {
                    broken = true;
                    ids.push(None);
                }
            }
        }
        ids
    }

    async fn info(&self, id: FileId) -> Option<FileInfo> {
        self.entries.read().await.get(&id).cloned()
    }

    async fn directory_listing(&self, id: FileId) -> Option<Vec<ListingEntry>> {
        self.entries.read().await.get(&id).map(|info| info.listing.values().cloned().collect())
    }

    async fn put_if_absent(&self, parent: FileId, name: &str, info: FileInfo) -> Result<Option<FileId>> {
        let mut entries = self.entries.write().await;
        let existing = entries
            .get(&parent)
            .ok_or_else(|| IgfsError::FileNotFound(parent.to_string()))?
            .listing
            .get(name)
            .map(|e| e.file_id);
        if let Some(existing_id) = existing {
            return Ok(Some(existing_id));
        }
        let id = info.id;
        let is_file = info.is_file();
        entries.insert(id, info);
        entries.get_mut(&parent).unwrap().listing.insert(name.to_string(), ListingEntry { name: name.to_string(), file_id: id, is_file });
        Ok(None)
    }

    async fn lock(&self, id: FileId) -> Result<FileInfo> {
        self.entries.read().await.get(&id).cloned().ok_or_else(|| IgfsError::FileNotFound(id.to_string()))
    }

    async fn move_entry(
        &self,
        src_id: FileId,
        src_name: &str,
        src_parent: FileId,
        dest_name: &str,
        dest_parent: FileId,
    ) -> Result<()> {
        let mut entries = self.entries.write().await;
        let is_file = entries.get(&src_id).ok_or_else(|| IgfsError::FileNotFound(src_id.to_string()))?.is_file();
        entries
            .get_mut(&src_parent)
            .ok_or_else(|| IgfsError::FileNotFound(src_parent.to_string()))?
            .listing
            .remove(src_name);
        entries
            .get_mut(&dest_parent)
            .ok_or_else(|| IgfsError::FileNotFound(dest_parent.to_string()))?
            .listing
            .insert(dest_name.to_string(), ListingEntry { name: dest_name.to_string(), file_id: src_id, is_file });
        Ok(())
    }

    async fn remove_if_empty(&self, parent: FileId, name: &str, id: FileId, _rmvd_locked: bool) -> Result<bool> {
        let mut entries = self.entries.write().await;
        if let Some(info) = entries.get(&id) {
            if info.is_directory && !info.listing.is_empty() {
                return Err(IgfsError::DirectoryNotEmpty(name.to_string()));
            }
        }
        let removed = entries
            .get_mut(&parent)
            .ok_or_else(|| IgfsError::FileNotFound(parent.to_string()))?
            .listing
            .remove(name)
            .is_some();
        if removed {
            entries.remove(&id);
        }
        Ok(removed)
    }

    async fn soft_delete(&self, parent: Option<FileId>, name: Option<&str>, id: FileId) -> Result<Option<FileId>> {
        let mut entries = self.entries.write().await;

        // The root itself is never removed from `entries` (spec.md
        // §4.5.7/§4.6): formatting queues its *children* for purge under
        // a fresh bookkeeping id, and reports nothing to do once the
        // root is already empty.
        if id == ROOT_ID && parent.is_none() && name.is_none() {
            let has_children = entries.get(&ROOT_ID).map(|root| !root.listing.is_empty()).unwrap_or(false);
            if !has_children {
                return Ok(None);
            }
            let purge_id = self.ids.next();
            entries.get_mut(&ROOT_ID).unwrap().listing.clear();
            entries.insert(purge_id, FileInfo::new_directory(purge_id, false, HashMap::new()));
            entries
                .get_mut(&TRASH_ID)
                .unwrap()
                .listing
                .insert(purge_id.to_string(), ListingEntry { name: purge_id.to_string(), file_id: purge_id, is_file: false });
            drop(entries);
            self.pending_deletes.write().await.insert(purge_id);
            return Ok(Some(purge_id));
        }

        if !entries.contains_key(&id) {
            return Ok(None);
        }
        if let (Some(parent), Some(name)) = (parent, name) {
            entries.get_mut(&parent).map(|p| p.listing.remove(name));
        }
        let trash_name = id.to_string();
        let is_file = entries.get(&id).unwrap().is_file();
        entries.get_mut(&TRASH_ID).unwrap().listing.insert(trash_name, ListingEntry { name: id.to_string(), file_id: id, is_file });
        drop(entries);
        self.pending_deletes.write().await.insert(id);
        Ok(Some(id))
    }

    async fn update_properties(&self, id: FileId, properties: HashMap<String, String>) -> Result<()> {
        let mut entries = self.entries.write().await;
        let info = entries.get_mut(&id).ok_or_else(|| IgfsError::FileNotFound(id.to_string()))?;
        info.properties.extend(properties);
        Ok(())
    }

    async fn update_times(&self, id: FileId, _atime: Option<i64>, _mtime: Option<i64>) -> Result<()> {
        // FileInfo carries no atime/mtime fields, so this only validates
        // that `id` exists — nothing is actually persisted here.
        let entries = self.entries.read().await;
        entries.get(&id).ok_or_else(|| IgfsError::FileNotFound(id.to_string()))?;
        Ok(())
    }

    async fn pending_deletes(&self) -> Vec<FileId> {
        self.pending_deletes.read().await.iter().copied().collect()
    }

    async fn exists(&self, id: FileId) -> bool {
        self.entries.read().await.contains_key(&id)
    }

    async fn await_init(&self) -> Result<()> {
        Ok(())
    }

    async fn dual_mkdirs(&self, parent: FileId, name: &str, properties: HashMap<String, String>) -> Result<FileId> {
        let id = self.ids.next();
        let props = if properties.is_empty() { default_dir_properties() } else { properties };
        let info = FileInfo::new_directory(id, false, props.clone());
        if let Some(secondary) = &self.secondary {
            let path = self.secondary_path(parent, name).await;
            secondary.mkdirs(&path).await;
            secondary.set_properties(&path, props).await;
        }
        self.insert_listing(parent, name, ListingEntry { name: name.to_string(), file_id: id, is_file: false }).await?;
        self.entries.write().await.insert(id, info);
        Ok(id)
    }

    async fn dual_rename(&self, src_path: &str, dest_path: &str) -> Result<()> {
        if let Some(secondary) = &self.secondary {
            secondary.rename(src_path, dest_path).await;
        }
        Ok(())
    }

    async fn dual_delete(&self, path: &str, recursive: bool) -> Result<bool> {
        if let Some(secondary) = &self.secondary {
            return Ok(secondary.remove(path, recursive).await);
        }
        Ok(false)
    }

    async fn dual_update(&self, id: FileId, properties: HashMap<String, String>) -> Result<()> {
        self.update_properties(id, properties).await
    }

    async fn dual_create(&self, parent: FileId, name: &str, path: &str, _overwrite: bool) -> Result<DualWriteHandle> {
        let secondary = self.secondary.as_ref().ok_or_else(|| IgfsError::internal("dual_create requires a configured secondary file system"))?;

        let id = self.ids.next();
        let info = FileInfo::new_file(id, 64 * 1024, false);
        self.insert_listing(parent, name, ListingEntry { name: name.to_string(), file_id: id, is_file: true }).await?;
        self.entries.write().await.insert(id, info.clone());
        let secondary_out = secondary.open_write(path, false).await;
        Ok(DualWriteHandle { info, secondary_out })
    }

    async fn dual_append(&self, parent: FileId, name: &str, path: &str, create: bool) -> Result<DualWriteHandle> {
        let secondary = self.secondary.as_ref().ok_or_else(|| IgfsError::internal("dual_append requires a configured secondary file system"))?;

        let existing = self.file_id(parent, name).await;
        let id = match existing {
            Some(id) => id,
            None if create => {
                let id = self.ids.next();
                self.insert_listing(parent, name, ListingEntry { name: name.to_string(), file_id: id, is_file: true }).await?;
                self.entries.write().await.insert(id, FileInfo::new_file(id, 64 * 1024, false));
                id
            }
            None => return Err(IgfsError::FileNotFound(path.to_string())),
        };
        let info = self.entries.read().await.get(&id).cloned().unwrap();
        let secondary_out = secondary.open_write(path, true).await;
        Ok(DualWriteHandle { info, secondary_out })
    }
}

impl InMemoryMetadataManager {
    async fn secondary_path(&self, parent: FileId, name: &str) -> String {
        // Best-effort reconstruction for the reference implementation;
        // callers that need exact paths pass them explicitly to
        // `dual_create`/`dual_append`/`dual_rename`/`dual_delete`.
        let _ = parent;
        format!("/{name}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn put_if_absent_detects_collision() {
        let mgr = InMemoryMetadataManager::new(None);
        let id1 = FileId::from_raw(100);
        let id2 = FileId::from_raw(101);
        let first = mgr.put_if_absent(ROOT_ID, "a", FileInfo::new_file(id1, 1024, false)).await.unwrap();
        assert_eq!(first, None);
        let second = mgr.put_if_absent(ROOT_ID, "a", FileInfo::new_file(id2, 1024, false)).await.unwrap();
        assert_eq!(second, Some(id1));
    }

    #[tokio::test]
    async fn soft_delete_moves_into_trash_and_tracks_pending() {
        let mgr = InMemoryMetadataManager::new(None);
        let id = FileId::from_raw(200);
        mgr.put_if_absent(ROOT_ID, "a", FileInfo::new_file(id, 1024, false)).await.unwrap();
        let moved = mgr.soft_delete(Some(ROOT_ID), Some("a"), id).await.unwrap();
        assert_eq!(moved, Some(id));
        assert!(mgr.pending_deletes().await.contains(&id));
        assert_eq!(mgr.file_id(ROOT_ID, "a").await, None);
    }

    #[tokio::test]
    async fn remove_if_empty_rejects_nonempty_directory() {
        let mgr = InMemoryMetadataManager::new(None);
        let dir_id = mgr.dual_mkdirs(ROOT_ID, "d", HashMap::new()).await.unwrap();
        let file_id = FileId::from_raw(300);
        mgr.put_if_absent(dir_id, "f", FileInfo::new_file(file_id, 1024, false)).await.unwrap();
        let result = mgr.remove_if_empty(ROOT_ID, "d", dir_id, false).await;
        assert!(matches!(result, Err(IgfsError::DirectoryNotEmpty(_))));
    }

    #[tokio::test]
    async fn dual_create_without_secondary_leaves_no_orphaned_entry() {
        let mgr = InMemoryMetadataManager::new(None);
        let result = mgr.dual_create(ROOT_ID, "a", "/a", false).await;
        assert!(matches!(result, Err(IgfsError::Internal(_))));
        assert_eq!(mgr.file_id(ROOT_ID, "a").await, None, "failed dual_create must not leave a phantom listing entry");
    }

    #[tokio::test]
    async fn dual_append_without_secondary_leaves_no_orphaned_entry() {
        let mgr = InMemoryMetadataManager::new(None);
        let result = mgr.dual_append(ROOT_ID, "a", "/a", true).await;
        assert!(matches!(result, Err(IgfsError::Internal(_))));
        assert_eq!(mgr.file_id(ROOT_ID, "a").await, None, "failed dual_append must not leave a phantom listing entry");
    }
}
