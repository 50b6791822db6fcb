//! Storage layer: one JSON snapshot file per monitor key.

mod error;
pub use error::StoreError;

mod snapshot;
pub use snapshot::SnapshotStore;
