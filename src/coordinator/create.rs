//! `create(path, bufSize, overwrite, affinityKey?, replication, props?,
//! simpleCreate)` (spec.md §4.5.4).

use std::collections::HashMap;

use super::MetadataCoordinator;
use crate::collab::events::EventKind;
use crate::descriptor;
use crate::error::{IgfsError, Result};
use crate::id::{FileId, ROOT_ID};
use crate::model::{FileInfo, Mode};
use crate::path::Path;
use crate::streams::WriteStream;

impl MetadataCoordinator {
    /// `replication` and `simple_create` are accepted for API fidelity
    /// with the upstream IGFS signature; the in-memory data manager has
    /// no notion of replication factor, and `simple_create` only
    /// suppresses affinity-key stamping (it never bypasses mode routing).
    pub async fn create(
        &self,
        path: &Path,
        buf_size: i64,
        overwrite: bool,
        affinity_key: Option<FileId>,
        props: Option<HashMap<String, String>>,
    ) -> Result<WriteStream> {
        self.create_full(path, buf_size, overwrite, affinity_key, 0, props, false).await
    }

    #[allow(clippy::too_many_arguments)]
    pub async fn create_full(
        &self,
        path: &Path,
        buf_size: i64,
        overwrite: bool,
        affinity_key: Option<FileId>,
        _replication: i32,
        props: Option<HashMap<String, String>>,
        simple_create: bool,
    ) -> Result<WriteStream> {
        if buf_size < 0 {
            return Err(IgfsError::InvalidArgument("bufSize must not be negative".to_string()));
        }
        let buf_size = if buf_size == 0 { self.block_size } else { buf_size as u32 };

        let mode = self.resolve_non_proxy(path)?;
        let parent_path = path.parent().ok_or_else(|| IgfsError::InvalidPath("cannot create the root".to_string()))?;
        let name = path.name().ok_or_else(|| IgfsError::InvalidArgument("path has no name".to_string()))?;

        if mode != Mode::Primary {
            self.writers.await_paths(&[path]).await;
            let handle = self.metadata.dual_create(ROOT_ID, path.as_str(), path.as_str(), overwrite).await?;
            let batch = if mode == Mode::DualAsync {
                Some(self.writers.enqueue(path, handle.secondary_out)?)
            } else {
                None
            };
            self.emit(EventKind::FileCreated, path.as_str().to_string()).await;
            return Ok(self.streams.open_write(path.as_str(), handle.info, batch).await);
        }

        self.mkdirs(&parent_path, None).await?;
        let parent_id = descriptor::resolve(self.metadata.as_ref(), &parent_path)
            .await
            .ok_or_else(|| IgfsError::internal("parent vanished immediately after mkdirs"))?
            .file_id;

        let evict_exclude = self.eviction.exclude(path.as_str());
        loop {
            let id = self.ids.next();
            let mut info = FileInfo::new_file(id, buf_size, evict_exclude);
            if !simple_create {
                info.affinity_key = affinity_key;
            }
            if let Some(props) = props.clone() {
                info.properties = props;
            }

            match self.metadata.put_if_absent(parent_id, name, info).await? {
                None => {
                    self.metadata.lock(id).await?;
                    self.emit(EventKind::FileCreated, path.as_str().to_string()).await;
                    self.emit(EventKind::FileOpenedWrite, path.as_str().to_string()).await;
                    let info = self.metadata.info(id).await.ok_or_else(|| IgfsError::internal("file vanished after create"))?;
                    return Ok(self.streams.open_write(path.as_str(), info, None).await);
                }
                Some(existing_id) => {
                    let existing = self
                        .metadata
                        .info(existing_id)
                        .await
                        .ok_or_else(|| IgfsError::internal("metadata reported an id with no info"))?;
                    if existing.is_directory {
                        return Err(IgfsError::PathAlreadyExists(path.as_str().to_string()));
                    }
                    if !overwrite {
                        return Err(IgfsError::PathAlreadyExists(path.as_str().to_string()));
                    }
                    self.metadata.remove_if_empty(parent_id, name, existing_id, false).await?;
                    self.emit(EventKind::FileDeleted, path.as_str().to_string()).await;
                }
            }
        }
    }
}
