//! `listPaths` / `listFiles` (spec.md §4.5.9).

use std::collections::HashMap;

use super::MetadataCoordinator;
use crate::descriptor;
use crate::error::{IgfsError, Result};
use crate::id::IdGenerator;
use crate::model::{FileInfo, Mode};
use crate::path::Path;

impl MetadataCoordinator {
    pub async fn list_paths(&self, path: &Path) -> Result<Vec<String>> {
        let entries = self.list_files(path).await?;
        Ok(entries.into_iter().map(|(name, _)| name).collect())
    }

    pub async fn list_files(&self, path: &Path) -> Result<Vec<(String, FileInfo)>> {
        let info = self.info(path).await.ok_or_else(|| IgfsError::FileNotFound(path.as_str().to_string()))?;

        if info.is_file() {
            let name = path.name().unwrap_or_else(|| path.as_str()).to_string();
            return Ok(vec![(name, info)]);
        }

        let mut merged: HashMap<String, FileInfo> = HashMap::new();

        let children_modes = self.modes.resolve_children_modes(path);
        if children_modes.iter().any(|m| *m != Mode::Primary) {
            if let Some(secondary) = &self.secondary {
                let ids = IdGenerator::new();
                for (full_path, status) in secondary.list_files(path.as_str()).await? {
                    let id = ids.next();
                    let info = if status.is_directory {
                        FileInfo::new_directory(id, false, Default::default())
                    } else {
                        let mut info = FileInfo::new_file(id, 0, false);
                        info.length = status.length;
                        info
                    };
                    let name = full_path.rsplit('/').next().unwrap_or(&full_path).to_string();
                    merged.insert(name, info);
                }
            }
        }

        // DUAL-mode directories are addressed by metadata as a single
        // flat entry keyed by their full path, so they have no reachable
        // hierarchical listing of their own; the secondary FS above is
        // their real source of children. Only a PRIMARY directory's
        // listing is walked here.
        if let Some(descriptor) = descriptor::resolve(self.metadata.as_ref(), path).await {
            if let Some(listing) = self.metadata.directory_listing(descriptor.file_id).await {
                for entry in listing {
                    if let Some(info) = self.metadata.info(entry.file_id).await {
                        merged.insert(entry.name, info);
                    }
                }
            }
        }

        Ok(merged.into_iter().collect())
    }
}
