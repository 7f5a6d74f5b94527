//! [`EventBus`]: audit-facing event recording (spec.md §6).

use async_trait::async_trait;

/// Event kinds emitted by the coordinator (spec.md §6).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    FileOpenedRead,
    FileClosedRead,
    FileOpenedWrite,
    FileClosedWrite,
    FileCreated,
    FileDeleted,
    FileRenamed,
    DirCreated,
    DirDeleted,
    DirRenamed,
    MetaUpdated,
}

/// An emitted event. `path`/`new_path` hold the fully-qualified path(s)
/// involved; `bytes` is set for open/close-for-read/write events.
#[derive(Debug, Clone)]
pub struct Event {
    pub kind: EventKind,
    pub path: String,
    pub new_path: Option<String>,
    pub bytes: Option<u64>,
}

impl Event {
    pub fn new(kind: EventKind, path: impl Into<String>) -> Self {
        Self { kind, path: path.into(), new_path: None, bytes: None }
    }

    pub fn with_new_path(mut self, new_path: impl Into<String>) -> Self {
        self.new_path = Some(new_path.into());
        self
    }

    pub fn with_bytes(mut self, bytes: u64) -> Self {
        self.bytes = Some(bytes);
        self
    }
}

#[async_trait]
pub trait EventBus: Send + Sync {
    /// Whether `kind` is recordable under current configuration — callers
    /// skip constructing an [`Event`] entirely when this is false.
    fn is_recordable(&self, kind: EventKind) -> bool;

    async fn record(&self, event: Event);
}
