//! `update(path, props)` and `setTimes(path, atime, mtime)` (spec.md §4.5.8).

use std::collections::HashMap;

use super::MetadataCoordinator;
use crate::collab::events::EventKind;
use crate::descriptor;
use crate::error::{IgfsError, Result};
use crate::model::{FileInfo, Mode};
use crate::path::Path;

impl MetadataCoordinator {
    pub async fn update(&self, path: &Path, properties: HashMap<String, String>) -> Result<FileInfo> {
        let mode = self.resolve_non_proxy(path)?;

        if mode != Mode::Primary {
            self.writers.await_paths(&[path]).await;
            let descriptor = descriptor::resolve(self.metadata.as_ref(), path)
                .await
                .ok_or_else(|| IgfsError::FileNotFound(path.as_str().to_string()))?;
            self.metadata.dual_update(descriptor.file_id, properties).await?;
            self.emit(EventKind::MetaUpdated, path.as_str().to_string()).await;
            return self
                .metadata
                .info(descriptor.file_id)
                .await
                .ok_or_else(|| IgfsError::FileNotFound(path.as_str().to_string()));
        }

        let descriptor = descriptor::resolve(self.metadata.as_ref(), path)
            .await
            .ok_or_else(|| IgfsError::FileNotFound(path.as_str().to_string()))?;
        self.metadata.update_properties(descriptor.file_id, properties).await?;
        self.emit(EventKind::MetaUpdated, path.as_str().to_string()).await;
        self.metadata
            .info(descriptor.file_id)
            .await
            .ok_or_else(|| IgfsError::FileNotFound(path.as_str().to_string()))
    }

    pub async fn set_times(&self, path: &Path, atime: Option<i64>, mtime: Option<i64>) -> Result<()> {
        let descriptor = descriptor::resolve(self.metadata.as_ref(), path)
            .await
            .ok_or_else(|| IgfsError::FileNotFound(path.as_str().to_string()))?;
        self.metadata.update_times(descriptor.file_id, atime, mtime).await?;
        self.emit(EventKind::MetaUpdated, path.as_str().to_string()).await;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coordinator::tests_support::build_coordinator;

    #[tokio::test]
    async fn update_sets_properties_on_an_existing_file() {
        let coordinator = build_coordinator(None);
        let path = Path::parse("/a").unwrap();
        coordinator.create(&path, 0, false, None, None).await.unwrap().close().await;

        let mut props = HashMap::new();
        props.insert("owner".to_string(), "alice".to_string());
        let info = coordinator.update(&path, props).await.unwrap();
        assert_eq!(info.properties.get("owner").map(String::as_str), Some("alice"));
    }

    #[tokio::test]
    async fn update_on_missing_path_fails() {
        let coordinator = build_coordinator(None);
        let result = coordinator.update(&Path::parse("/missing").unwrap(), HashMap::new()).await;
        assert!(matches!(result, Err(IgfsError::FileNotFound(_))));
    }

    #[tokio::test]
    async fn set_times_updates_an_existing_file() {
        let coordinator = build_coordinator(None);
        let path = Path::parse("/a").unwrap();
        coordinator.create(&path, 0, false, None, None).await.unwrap().close().await;
        coordinator.set_times(&path, Some(1), Some(2)).await.unwrap();
    }
}
