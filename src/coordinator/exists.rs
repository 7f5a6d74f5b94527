//! `exists(path)` (spec.md §4.5.1).

use super::MetadataCoordinator;
use crate::descriptor;
use crate::model::Mode;
use crate::path::Path;

impl MetadataCoordinator {
    /// PRIMARY: metadata contains a file id for `path`. DUAL_*: metadata
    /// contains it OR the secondary FS does.
    pub async fn exists(&self, path: &Path) -> bool {
        let mode = self.modes.resolve_mode(path);
        if mode == crate::model::Mode::Proxy {
            return match &self.secondary {
                Some(secondary) => secondary.exists(path.as_str()).await,
                None => false,
            };
        }

        if descriptor::resolve(self.metadata.as_ref(), path).await.is_some() {
            return true;
        }

        if mode != Mode::Primary {
            if let Some(secondary) = &self.secondary {
                return secondary.exists(path.as_str()).await;
            }
        }

        false
    }
}
