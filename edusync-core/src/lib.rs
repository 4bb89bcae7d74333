//! edusync core library
//!
//! One-way reconciliation of locally created school records into a remote
//! document API. Records are loaded from a snapshot, mapped to the remote
//! schema, upserted by identifier, and written back with any newly minted ids.

pub mod config;
pub mod error;
pub mod minter;
pub mod records;
pub mod remote;
pub mod snapshot;
pub mod store;
pub mod sync;

pub use config::{Credentials, EngineOptions, RemoteConfig};
pub use error::{EngineError, RemoteError, StoreError};
pub use minter::{format_identifier, IdMinter};
pub use records::{EntityKind, Mapping, RecordIds, RemoteDocument, Syncable, UserRole};
pub use remote::RemoteClient;
pub use snapshot::{Collection, Entry, Snapshot};
pub use store::{JsonFileStore, SnapshotStore};
pub use sync::{LogEntry, Outcome, RunLog, SyncEngine, SyncStats, Synchronizer};

pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!version().is_empty());
    }
}
