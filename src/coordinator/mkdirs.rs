//! `mkdirs(path, props?)` (spec.md §4.5.3).

use std::collections::HashMap;

use super::MetadataCoordinator;
use crate::collab::events::EventKind;
use crate::error::{IgfsError, Result};
use crate::id::ROOT_ID;
use crate::model::{default_dir_properties, FileInfo, Mode};
use crate::path::Path;

impl MetadataCoordinator {
    pub async fn mkdirs(&self, path: &Path, props: Option<HashMap<String, String>>) -> Result<()> {
        let mode = self.resolve_non_proxy(path)?;
        let props = props.unwrap_or_else(default_dir_properties);

        if path.is_root() {
            return Ok(());
        }

        if mode != Mode::Primary {
            self.writers.await_paths(&[path]).await;
            let created_id = self.metadata.dual_mkdirs(ROOT_ID, path.as_str(), props).await?;
            let _ = created_id;
            self.emit(EventKind::DirCreated, path.as_str().to_string()).await;
            return Ok(());
        }

        let mut parent = ROOT_ID;
        let components = path.components();
        for (index, name) in components.iter().enumerate() {
            let is_last = index == components.len() - 1;
            let dir_props = if is_last { props.clone() } else { default_dir_properties() };
            let evict_exclude = self.eviction.exclude(path.as_str());
            let id = self.ids.next();
            let info = FileInfo::new_directory(id, evict_exclude, dir_props);

            match self.metadata.put_if_absent(parent, name, info).await? {
                None => {
                    parent = id;
                    if is_last {
                        let current = self.current_path(&components, index);
                        self.emit(EventKind::DirCreated, current).await;
                    }
                }
                Some(existing_id) => {
                    let existing = self
                        .metadata
                        .info(existing_id)
                        .await
                        .ok_or_else(|| IgfsError::internal("metadata reported an id with no info"))?;
                    if !existing.is_directory {
                        return Err(IgfsError::ParentNotDirectory(name.to_string()));
                    }
                    parent = existing_id;
                }
            }
        }

        Ok(())
    }

    fn current_path(&self, components: &[&str], up_to: usize) -> String {
        format!("/{}", components[..=up_to].join("/"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coordinator::tests_support::build_coordinator;

    #[tokio::test]
    async fn second_mkdirs_call_is_a_noop() {
        let coordinator = build_coordinator(None);
        let path = Path::parse("/a/b").unwrap();
        coordinator.mkdirs(&path, None).await.unwrap();
        coordinator.mkdirs(&path, None).await.unwrap();
        assert!(coordinator.exists(&path).await);
    }

    #[tokio::test]
    async fn mkdirs_through_existing_file_fails() {
        let coordinator = build_coordinator(None);
        coordinator.create(&Path::parse("/a").unwrap(), 0, false, None, None).await.unwrap();
        let result = coordinator.mkdirs(&Path::parse("/a/b").unwrap(), None).await;
        assert!(matches!(result, Err(IgfsError::ParentNotDirectory(_))));
    }
}
