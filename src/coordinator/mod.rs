//! [`MetadataCoordinator`]: dispatch of metadata mutations honoring mode
//! (spec.md §4.5/C6).

mod affinity;
mod append;
mod create;
mod delete;
mod exists;
mod info;
mod listing;
mod mkdirs;
mod rename;
mod update;

use std::sync::Arc;

use crate::collab::data::DataManager;
use crate::collab::eviction::EvictionPolicy;
use crate::collab::events::{Event, EventBus, EventKind};
use crate::collab::metadata::MetadataManager;
use crate::collab::secondary::SecondaryFs;
use crate::error::{IgfsError, Result};
use crate::id::IdGenerator;
use crate::mode_resolver::ModeResolver;
use crate::model::Mode;
use crate::path::Path;
use crate::streams::StreamFactory;
use crate::writer_registry::WriterRegistry;

pub use affinity::AffinityQuery;

/// Dispatches every mutating IGFS operation, routing through PRIMARY,
/// PROXY, or a DUAL mode per the [`ModeResolver`]. Holds no lock across
/// an `await` (spec.md §5); all exclusion is delegated to the metadata
/// manager's own `lock`/`putIfAbsent` and the [`WriterRegistry`]'s CAS map.
pub struct MetadataCoordinator {
    pub(crate) metadata: Arc<dyn MetadataManager>,
    pub(crate) data: Arc<dyn DataManager>,
    pub(crate) secondary: Option<Arc<dyn SecondaryFs>>,
    pub(crate) modes: Arc<ModeResolver>,
    pub(crate) writers: Arc<WriterRegistry>,
    pub(crate) events: Arc<dyn EventBus>,
    pub(crate) eviction: Arc<dyn EvictionPolicy>,
    pub(crate) streams: Arc<StreamFactory>,
    pub(crate) ids: IdGenerator,
    pub(crate) block_size: u32,
}

impl MetadataCoordinator {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        metadata: Arc<dyn MetadataManager>,
        data: Arc<dyn DataManager>,
        secondary: Option<Arc<dyn SecondaryFs>>,
        modes: Arc<ModeResolver>,
        writers: Arc<WriterRegistry>,
        events: Arc<dyn EventBus>,
        eviction: Arc<dyn EvictionPolicy>,
        streams: Arc<StreamFactory>,
        block_size: u32,
    ) -> Self {
        Self { metadata, data, secondary, modes, writers, events, eviction, streams, ids: IdGenerator::new(), block_size }
    }

    /// Common preamble for every mutating operation: rejects direct use
    /// of PROXY mode and resolves the acting mode (spec.md §4.5).
    pub(crate) fn resolve_non_proxy(&self, path: &Path) -> Result<Mode> {
        let mode = self.modes.resolve_mode(path);
        if mode == Mode::Proxy {
            return Err(IgfsError::InvalidPath(format!("{path} is served by PROXY mode and cannot be mutated directly")));
        }
        Ok(mode)
    }

    pub(crate) async fn emit(&self, kind: EventKind, path: impl Into<String>) {
        if self.events.is_recordable(kind) {
            self.events.record(Event::new(kind, path)).await;
        }
    }

    pub(crate) async fn emit_renamed(&self, kind: EventKind, path: impl Into<String>, new_path: impl Into<String>) {
        if self.events.is_recordable(kind) {
            self.events.record(Event::new(kind, path).with_new_path(new_path)).await;
        }
    }
}
