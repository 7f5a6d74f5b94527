//! Error taxonomy for the IGFS core (spec.md §7).

use thiserror::Error;

/// Result alias used by every public IGFS operation, the idiomatic
/// successor to the teacher's flat `vfs::Result<T>` / `VfsResult<T>`.
pub type Result<T> = std::result::Result<T, IgfsError>;

/// Errors surfaced by [`crate::igfs::IgfsImpl`] and its collaborators.
#[derive(Debug, Error, Clone)]
pub enum IgfsError {
    /// Invoked during shutdown, or before the metadata/data managers
    /// became ready within [`crate::busy::BusyLifecycle::enter`]'s bound.
    #[error("illegal state: {0}")]
    IllegalState(String),

    /// Null path, negative buffer/size, or malformed path syntax.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// PROXY mode used directly, rename into self/subtree or across an
    /// eviction boundary, or a non-file where a file was required.
    #[error("invalid path: {0}")]
    InvalidPath(String),

    /// Target missing in every store consulted.
    #[error("file not found: {0}")]
    FileNotFound(String),

    /// `mkdirs`/rename encountered a file where a directory was expected.
    #[error("parent is not a directory: {0}")]
    ParentNotDirectory(String),

    /// `create` without `overwrite` hit a live entry.
    #[error("path already exists: {0}")]
    PathAlreadyExists(String),

    /// Non-recursive delete of a non-empty directory.
    #[error("directory not empty: {0}")]
    DirectoryNotEmpty(String),

    /// A PRIMARY-mode path already exists in the secondary file system.
    #[error("secondary file system conflict at: {0}")]
    SecondaryConflict(String),

    /// Unexpected failure from a metadata/data/secondary collaborator,
    /// wrapped with context rather than swallowed.
    #[error("internal error: {0}")]
    Internal(String),
}

impl IgfsError {
    pub fn internal(context: impl Into<String>) -> Self {
        Self::Internal(context.into())
    }
}
