//! The sync engine.
//!
//! [`Synchronizer`] upserts one record. [`SyncEngine`] loads the snapshot,
//! walks the collections in order, saves the snapshot with any new remote ids
//! and appends a [`LogEntry`] to the [`RunLog`].

mod engine;
mod run_log;
mod stats;
mod synchronizer;

pub use engine::SyncEngine;
pub use run_log::{LogEntry, RunLog};
pub use stats::SyncStats;
pub use synchronizer::{Outcome, Synchronizer};
