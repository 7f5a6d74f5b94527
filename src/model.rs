//! Core data model shared by the coordinator and its collaborators
//! (spec.md §3).

use std::collections::HashMap;

use crate::id::FileId;

/// Per-path routing policy (spec.md §3, §4.2).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Mode {
    /// Served entirely from the cluster-resident metadata+data caches.
    Primary,
    /// Served entirely from the secondary file system, bypassing the cache.
    Proxy,
    /// Written to both stores, secondary write completing before the call
    /// returns.
    DualSync,
    /// Written to both stores, secondary write completing asynchronously
    /// via the [`crate::writer_registry::WriterRegistry`].
    DualAsync,
}

/// A single entry in a directory's listing.
#[derive(Debug, Clone)]
pub struct ListingEntry {
    pub name: String,
    pub file_id: FileId,
    pub is_file: bool,
}

/// Metadata held by the [`crate::collab::metadata::MetadataManager`] for
/// one file or directory, as read by the core.
#[derive(Debug, Clone)]
pub struct FileInfo {
    pub id: FileId,
    pub is_directory: bool,
    /// Valid for files only.
    pub length: u64,
    /// Valid for files only.
    pub block_size: u32,
    pub affinity_key: Option<FileId>,
    pub evict_exclude: bool,
    pub properties: HashMap<String, String>,
    /// Valid for directories only.
    pub listing: HashMap<String, ListingEntry>,
}

impl FileInfo {
    pub fn new_file(id: FileId, block_size: u32, evict_exclude: bool) -> Self {
        Self {
            id,
            is_directory: false,
            length: 0,
            block_size,
            affinity_key: None,
            evict_exclude,
            properties: HashMap::new(),
            listing: HashMap::new(),
        }
    }

    pub fn new_directory(id: FileId, evict_exclude: bool, properties: HashMap<String, String>) -> Self {
        Self {
            id,
            is_directory: true,
            length: 0,
            block_size: 0,
            affinity_key: None,
            evict_exclude,
            properties,
            listing: HashMap::new(),
        }
    }

    pub fn is_file(&self) -> bool {
        !self.is_directory
    }
}

/// Core-internal, ephemeral resolution of a path to its tree position.
/// `parent_id` is `None` only for the root.
#[derive(Debug, Clone)]
pub struct FileDescriptor {
    pub parent_id: Option<FileId>,
    pub file_name: String,
    pub file_id: FileId,
    pub is_file: bool,
}

impl FileDescriptor {
    pub fn root(id: FileId) -> Self {
        Self { parent_id: None, file_name: String::new(), file_id: id, is_file: false }
    }
}

/// Default directory properties applied by `mkdirs` when the caller
/// supplies none (spec.md §6).
pub fn default_dir_properties() -> HashMap<String, String> {
    let mut props = HashMap::new();
    props.insert("permission".to_string(), "0777".to_string());
    props
}
