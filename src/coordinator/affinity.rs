//! `affinity(path, start, len, maxLen?)` (spec.md §4.5.10).

use super::MetadataCoordinator;
use crate::collab::data::AffinityBlock;
use crate::error::{IgfsError, Result};
use crate::path::Path;

/// Bundles the three numeric parameters of an affinity query (spec.md
/// §4.5.10), read directly off the upstream IGFS `affinity` signature.
#[derive(Debug, Clone, Copy)]
pub struct AffinityQuery {
    pub start: u64,
    pub len: u64,
    pub max_len: Option<u64>,
}

impl MetadataCoordinator {
    pub async fn affinity(&self, path: &Path, query: AffinityQuery) -> Result<Vec<AffinityBlock>> {
        let info = self.info(path).await.ok_or_else(|| IgfsError::FileNotFound(path.as_str().to_string()))?;
        if info.is_directory {
            return Err(IgfsError::InvalidPath(format!("{path} is a directory")));
        }
        self.data.affinity(&info, query.start, query.len, query.max_len).await
    }
}
