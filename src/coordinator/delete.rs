//! `delete(path, recursive)` (spec.md §4.5.7).

use super::MetadataCoordinator;
use crate::collab::events::EventKind;
use crate::descriptor;
use crate::error::Result;
use crate::id::ROOT_ID;
use crate::model::Mode;
use crate::path::Path;

impl MetadataCoordinator {
    pub async fn delete(&self, path: &Path, recursive: bool) -> Result<bool> {
        if path.is_root() {
            let deleted = self.metadata.soft_delete(None, None, ROOT_ID).await?.is_some();
            if deleted {
                self.emit(EventKind::DirDeleted, path.as_str().to_string()).await;
            }
            return Ok(deleted);
        }

        let children_modes = self.modes.resolve_children_modes(path);
        let descriptor = descriptor::resolve(self.metadata.as_ref(), path).await;

        let mut deleted = false;
        let mut is_file = false;

        if children_modes.contains(&Mode::Primary) {
            if let Some(descriptor) = &descriptor {
                is_file = descriptor.is_file;
                let parent_id = descriptor.parent_id.unwrap_or(ROOT_ID);
                self.writers.await_paths(&[path]).await;
                deleted = if descriptor.is_file {
                    self.metadata.remove_if_empty(parent_id, &descriptor.file_name, descriptor.file_id, true).await?
                } else if recursive {
                    self.metadata.soft_delete(Some(parent_id), Some(&descriptor.file_name), descriptor.file_id).await?.is_some()
                } else {
                    let listing = self.metadata.directory_listing(descriptor.file_id).await.unwrap_or_default();
                    if !listing.is_empty() {
                        return Err(crate::error::IgfsError::DirectoryNotEmpty(path.as_str().to_string()));
                    }
                    self.metadata.remove_if_empty(parent_id, &descriptor.file_name, descriptor.file_id, false).await?
                };
            }
        }

        if children_modes.iter().any(|m| *m != Mode::Primary) {
            let secondary_deleted = self.metadata.dual_delete(path.as_str(), recursive).await?;
            deleted = deleted || secondary_deleted;
        }

        if deleted && descriptor.is_some() {
            let kind = if is_file { EventKind::FileDeleted } else { EventKind::DirDeleted };
            self.emit(kind, path.as_str().to_string()).await;
        }

        Ok(deleted)
    }
}
