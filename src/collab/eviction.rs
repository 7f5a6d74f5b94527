//! [`EvictionPolicy`]: consulted, never implemented (spec.md §1 Non-goals).

/// Tells the coordinator whether a path must never be evicted from the
/// underlying cache. The core only consults this at file-creation time
/// to stamp [`crate::model::FileInfo::evict_exclude`]; it never decides
/// what to evict itself.
pub trait EvictionPolicy: Send + Sync {
    fn exclude(&self, path: &str) -> bool;
}

/// An eviction policy that excludes nothing.
pub struct NoExclusions;

impl EvictionPolicy for NoExclusions {
    fn exclude(&self, _path: &str) -> bool {
        false
    }
}
