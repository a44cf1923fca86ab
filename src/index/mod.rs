pub mod memory;
pub mod snapshot;
pub mod types;

pub use memory::{MemoryIndex, MemoryIndexBuilder};
pub use snapshot::{Snapshot, SnapshotManager};
pub use types::*;
