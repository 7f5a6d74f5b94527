//! `rename(src, dest)` (spec.md §4.5.6).

use super::MetadataCoordinator;
use crate::collab::events::EventKind;
use crate::descriptor;
use crate::error::{IgfsError, Result};
use crate::id::ROOT_ID;
use crate::model::Mode;
use crate::path::Path;

impl MetadataCoordinator {
    pub async fn rename(&self, src: &Path, dest: &Path) -> Result<()> {
        if src.is_same(dest) {
            return Ok(());
        }

        src.parent().ok_or_else(|| IgfsError::InvalidPath("cannot rename the root".to_string()))?;

        if dest.is_sub_directory_of(src) {
            return Err(IgfsError::InvalidPath(format!("cannot rename {src} into its own subtree {dest}")));
        }

        if self.eviction.exclude(src.as_str()) != self.eviction.exclude(dest.as_str()) {
            return Err(IgfsError::InvalidPath(format!(
                "cannot rename {src} to {dest}: eviction-exclusion boundary crossed"
            )));
        }

        let children_modes = self.modes.resolve_children_modes(src);
        if children_modes.iter().any(|m| *m != Mode::Primary) {
            self.writers.await_paths(&[src, dest]).await;
            self.metadata.dual_rename(src.as_str(), dest.as_str()).await?;
            self.emit_renamed(EventKind::FileRenamed, src.as_str().to_string(), dest.as_str().to_string()).await;
            return Ok(());
        }

        let src_descriptor = match descriptor::resolve(self.metadata.as_ref(), src).await {
            Some(descriptor) => descriptor,
            None => {
                if let Some(secondary) = &self.secondary {
                    if secondary.exists(src.as_str()).await {
                        return Err(IgfsError::SecondaryConflict(src.as_str().to_string()));
                    }
                }
                return Err(IgfsError::FileNotFound(src.as_str().to_string()));
            }
        };

        let dest_descriptor = descriptor::resolve(self.metadata.as_ref(), dest).await;

        let (dest_parent_id, dest_name, final_path) = match dest_descriptor {
            Some(descriptor) if !descriptor.is_file => {
                (descriptor.file_id, src_descriptor.file_name.clone(), dest.join(&src_descriptor.file_name))
            }
            Some(_file_descriptor) => {
                return Err(IgfsError::ParentNotDirectory(dest.as_str().to_string()));
            }
            None => {
                let dest_parent = dest.parent().ok_or_else(|| IgfsError::InvalidPath("cannot rename onto the root".to_string()))?;
                let dest_parent_descriptor = descriptor::resolve(self.metadata.as_ref(), &dest_parent)
                    .await
                    .ok_or_else(|| IgfsError::FileNotFound(dest_parent.as_str().to_string()))?;
                if dest_parent_descriptor.is_file {
                    return Err(IgfsError::ParentNotDirectory(dest_parent.as_str().to_string()));
                }
                (dest_parent_descriptor.file_id, dest.name().unwrap_or_default().to_string(), dest.clone())
            }
        };

        let src_parent_id = src_descriptor.parent_id.unwrap_or(ROOT_ID);
        self.metadata
            .move_entry(src_descriptor.file_id, &src_descriptor.file_name, src_parent_id, &dest_name, dest_parent_id)
            .await?;

        let kind = if src_descriptor.is_file { EventKind::FileRenamed } else { EventKind::DirRenamed };
        self.emit_renamed(kind, src.as_str().to_string(), final_path.as_str().to_string()).await;
        Ok(())
    }
}
