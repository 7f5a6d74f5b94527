//! External collaborators consumed by the IGFS core (spec.md §6).
//!
//! Everything in this module is, per spec.md §1, *out of scope*: the
//! underlying distributed cache storage, the metadata manager's tree
//! representation, the data manager's block placement, the compute/task
//! framework, the secondary file-system driver, event recording, and
//! configuration parsing are all assumed to exist elsewhere. What lives
//! here is only the interface the core consumes — mirroring how the
//! teacher's `vfs::Vfs` trait describes an NFS backend without owning one.
//!
//! [`memory`] provides a reference in-memory implementation of each trait,
//! used by this crate's own tests and demo binary.

pub mod compute;
pub mod data;
pub mod discovery;
pub mod eviction;
pub mod events;
pub mod messaging;
pub mod metadata;
pub mod secondary;

pub mod memory;

pub use compute::ComputeService;
pub use data::DataManager;
pub use discovery::{DiscoveryService, NodeEvent, NodeId};
pub use eviction::EvictionPolicy;
pub use events::{Event, EventBus, EventKind};
pub use messaging::{DeleteCompletedMessage, Messaging};
pub use metadata::MetadataManager;
pub use secondary::SecondaryFs;
