//! `append(path, bufSize, create, props?)` (spec.md §4.5.5).

use std::collections::HashMap;

use super::MetadataCoordinator;
use crate::collab::events::EventKind;
use crate::descriptor;
use crate::error::{IgfsError, Result};
use crate::id::ROOT_ID;
use crate::model::{FileInfo, Mode};
use crate::path::Path;
use crate::streams::WriteStream;

impl MetadataCoordinator {
    pub async fn append(
        &self,
        path: &Path,
        buf_size: i64,
        create: bool,
        props: Option<HashMap<String, String>>,
    ) -> Result<WriteStream> {
        if buf_size < 0 {
            return Err(IgfsError::InvalidArgument("bufSize must not be negative".to_string()));
        }
        let buf_size = if buf_size == 0 { self.block_size } else { buf_size as u32 };

        let mode = self.resolve_non_proxy(path)?;
        let parent_path = path.parent().ok_or_else(|| IgfsError::InvalidPath("cannot append to the root".to_string()))?;
        let name = path.name().ok_or_else(|| IgfsError::InvalidArgument("path has no name".to_string()))?;

        if mode != Mode::Primary {
            self.writers.await_paths(&[path]).await;
            let handle = self.metadata.dual_append(ROOT_ID, path.as_str(), path.as_str(), create).await?;
            let batch = if mode == Mode::DualAsync {
                Some(self.writers.enqueue(path, handle.secondary_out)?)
            } else {
                None
            };
            self.emit(EventKind::FileOpenedWrite, path.as_str().to_string()).await;
            return Ok(self.streams.open_write(path.as_str(), handle.info, batch).await);
        }

        if create {
            self.mkdirs(&parent_path, None).await?;
        }
        let parent_id = descriptor::resolve(self.metadata.as_ref(), &parent_path)
            .await
            .ok_or_else(|| IgfsError::FileNotFound(parent_path.as_str().to_string()))?
            .file_id;

        let existing = self.metadata.file_id(parent_id, name).await;
        let file_id = match existing {
            Some(id) => id,
            None if !create => return Err(IgfsError::FileNotFound(path.as_str().to_string())),
            None => {
                let evict_exclude = self.eviction.exclude(path.as_str());
                let id = self.ids.next();
                let mut info = FileInfo::new_file(id, buf_size, evict_exclude);
                if let Some(props) = props {
                    info.properties = props;
                }
                match self.metadata.put_if_absent(parent_id, name, info).await? {
                    None => id,
                    Some(winner_id) => winner_id,
                }
            }
        };

        let info = self.metadata.info(file_id).await.ok_or_else(|| IgfsError::FileNotFound(path.as_str().to_string()))?;
        if !info.is_file() {
            return Err(IgfsError::InvalidPath(format!("{path} is a directory")));
        }
        self.metadata.lock(file_id).await?;
        self.emit(EventKind::FileOpenedWrite, path.as_str().to_string()).await;
        Ok(self.streams.open_write(path.as_str(), info, None).await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coordinator::tests_support::build_coordinator;

    #[tokio::test]
    async fn append_without_create_on_missing_file_fails() {
        let coordinator = build_coordinator(None);
        let result = coordinator.append(&Path::parse("/missing").unwrap(), 0, false, None).await;
        assert!(matches!(result, Err(IgfsError::FileNotFound(_))));
    }

    #[tokio::test]
    async fn append_with_create_makes_a_new_file() {
        let coordinator = build_coordinator(None);
        let path = Path::parse("/a").unwrap();
        let stream = coordinator.append(&path, 0, true, None).await.unwrap();
        stream.close().await;
        assert!(coordinator.exists(&path).await);
    }

    #[tokio::test]
    async fn append_to_directory_is_invalid_path() {
        let coordinator = build_coordinator(None);
        let path = Path::parse("/a").unwrap();
        coordinator.mkdirs(&path, None).await.unwrap();
        let result = coordinator.append(&path, 0, false, None).await;
        assert!(matches!(result, Err(IgfsError::InvalidPath(_))));
    }
}
