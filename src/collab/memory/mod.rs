//! In-memory reference implementations of every collaborator trait,
//! sufficient to drive this crate's own tests and demo binary. None of
//! this is cluster-aware; each "node" is a separate in-process instance
//! wired to a shared [`tokio::sync::broadcast`] bus.

mod compute;
mod data;
mod discovery;
mod events;
mod messaging;
mod metadata;
mod secondary;

pub use compute::StubComputeService;
pub use data::InMemoryDataManager;
pub use discovery::{InMemoryDiscovery, SharedCluster};
pub use events::{InMemoryEventBus, RecordedEvent};
pub use messaging::{InMemoryMessaging, MessageRouter};
pub use metadata::InMemoryMetadataManager;
pub use secondary::InMemorySecondaryFs;
