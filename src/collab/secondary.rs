//! [`SecondaryFs`]: the optional durable file system IGFS mirrors through.
//!
//! Out of scope per spec.md §1 ("the secondary file-system driver"); only
//! the surface DUAL/PROXY modes consume is specified here.

use std::collections::HashMap;

use async_trait::async_trait;

use crate::error::Result;

/// Minimal status the secondary FS reports for a path, enough for
/// [`crate::coordinator::info`] and [`crate::coordinator::exists`] to
/// synthesize a [`crate::model::FileInfo`] without touching metadata.
#[derive(Debug, Clone)]
pub struct SecondaryStatus {
    pub is_directory: bool,
    pub length: u64,
}

#[async_trait]
pub trait SecondaryFs: Send + Sync {
    async fn exists(&self, path: &str) -> bool;

    async fn info(&self, path: &str) -> Result<Option<SecondaryStatus>>;

    async fn list_paths(&self, path: &str) -> Result<Vec<String>>;

    async fn list_files(&self, path: &str) -> Result<Vec<(String, SecondaryStatus)>>;

    async fn used_space_size(&self) -> Result<u64>;

    async fn properties(&self, path: &str) -> Result<HashMap<String, String>>;

    /// Closes the secondary FS if it holds closable resources. A no-op
    /// for implementations that don't need it.
    async fn close(&self) -> Result<()>;
}
