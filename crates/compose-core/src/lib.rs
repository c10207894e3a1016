pub mod capability;
pub mod error;
pub mod persist;
pub mod registry;
pub mod router;
pub mod synth;

pub use capability::{Capability, Hit, Retrieved};
pub use error::{Error, SourceError};
pub use persist::{
    SNAPSHOT_VERSION, Snapshot, SnapshotEntry, data_dir, default_snapshot_path, load_snapshot,
    persist, restore, restore_exact, save_snapshot,
};
pub use registry::{ListEntries, Registry, RegistryEntry};
pub use router::{AggregateResponse, QueryResult, Router, RouterConfig, SourceFailure};
pub use synth::{Answer, Synthesizer};
