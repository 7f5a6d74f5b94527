//! Pure path resolution and recursive tree summary (spec.md §4.3/C3).

use crate::collab::metadata::MetadataManager;
use crate::id::{FileId, ROOT_ID};
use crate::model::FileDescriptor;
use crate::path::Path;

/// Resolves `path` against `metadata`, walking root-to-leaf.
///
/// Returns `None` if any segment is missing. The returned descriptor's
/// `parent_id` is `None` only when `path` is the root.
pub async fn resolve(metadata: &dyn MetadataManager, path: &Path) -> Option<FileDescriptor> {
    if path.is_root() {
        return Some(FileDescriptor::root(ROOT_ID));
    }

    let components = path.components();
    let ids = metadata.file_ids(&components).await;
    let file_id = (*ids.last()?)?;
    let parent_id = if ids.len() == 1 {
        ROOT_ID
    } else {
        ids[ids.len() - 2]?
    };
    let info = metadata.info(file_id).await?;
    Some(FileDescriptor {
        parent_id: Some(parent_id),
        file_name: components.last().unwrap().to_string(),
        file_id,
        is_file: info.is_file(),
    })
}

/// Aggregate counts produced by [`summary`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Summary {
    pub files: u64,
    pub directories: u64,
    pub total_length: u64,
}

/// Recursively walks the subtree rooted at `id`, summing file/directory
/// counts and total file length.
pub async fn summary(metadata: &dyn MetadataManager, id: FileId) -> Summary {
    let mut total = Summary::default();
    let mut stack = vec![id];
    while let Some(current) = stack.pop() {
        let Some(info) = metadata.info(current).await else { continue };
        if info.is_directory {
            total.directories += 1;
            for entry in info.listing.values() {
                stack.push(entry.file_id);
            }
        } else {
            total.files += 1;
            total.total_length += info.length;
        }
    }
    total
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collab::memory::InMemoryMetadataManager;
    use crate::model::FileInfo;
    use std::collections::HashMap;

    #[tokio::test]
    async fn resolves_nested_path() {
        let mgr = InMemoryMetadataManager::new(None);
        let dir_id = mgr.dual_mkdirs(ROOT_ID, "a", HashMap::new()).await.unwrap();
        let file_id = FileId::from_raw(42);
        mgr.put_if_absent(dir_id, "b", FileInfo::new_file(file_id, 1024, false)).await.unwrap();

        let descriptor = resolve(&mgr, &Path::parse("/a/b").unwrap()).await.unwrap();
        assert_eq!(descriptor.file_id, file_id);
        assert_eq!(descriptor.parent_id, Some(dir_id));
        assert!(descriptor.is_file);
    }

    #[tokio::test]
    async fn missing_segment_resolves_to_none() {
        let mgr = InMemoryMetadataManager::new(None);
        assert!(resolve(&mgr, &Path::parse("/missing").unwrap()).await.is_none());
    }

    #[tokio::test]
    async fn summary_counts_files_and_directories() {
        let mgr = InMemoryMetadataManager::new(None);
        let dir_id = mgr.dual_mkdirs(ROOT_ID, "a", HashMap::new()).await.unwrap();
        let file_id = FileId::from_raw(7);
        let mut info = FileInfo::new_file(file_id, 1024, false);
        info.length = 10;
        mgr.put_if_absent(dir_id, "b", info).await.unwrap();

        let total = summary(&mgr, ROOT_ID).await;
        assert_eq!(total.files, 1);
        assert_eq!(total.directories, 2); // root + /a
        assert_eq!(total.total_length, 10);
    }
}
