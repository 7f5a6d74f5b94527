//! `info(path)` (spec.md §4.5.2).

use super::MetadataCoordinator;
use crate::collab::secondary::SecondaryStatus;
use crate::descriptor;
use crate::id::IdGenerator;
use crate::model::{FileInfo, Mode};
use crate::path::Path;

impl MetadataCoordinator {
    /// PRIMARY: metadata only. DUAL_*: metadata first; if absent,
    /// synthesize a [`FileInfo`] from the secondary FS's status without
    /// inserting it into metadata.
    pub async fn info(&self, path: &Path) -> Option<FileInfo> {
        let mode = self.modes.resolve_mode(path);

        if let Some(descriptor) = descriptor::resolve(self.metadata.as_ref(), path).await {
            return self.metadata.info(descriptor.file_id).await;
        }

        if mode == Mode::Primary {
            return None;
        }

        let secondary = self.secondary.as_ref()?;
        let status = secondary.info(path.as_str()).await.ok().flatten()?;
        Some(synthesize(status))
    }
}

fn synthesize(status: SecondaryStatus) -> FileInfo {
    // A synthesized descriptor is never persisted, so its id is only
    // used for equality within the caller's current operation.
    let id = IdGenerator::new().next();
    if status.is_directory {
        FileInfo::new_directory(id, false, Default::default())
    } else {
        let mut info = FileInfo::new_file(id, 0, false);
        info.length = status.length;
        info
    }
}
