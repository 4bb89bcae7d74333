use std::time::Instant;

use chrono::Utc;
use serde_json::Value;
use uuid::Uuid;

use super::{LogEntry, Outcome, RunLog, SyncStats, Synchronizer};
use crate::config::EngineOptions;
use crate::error::EngineError;
use crate::records::{RecordIds, Syncable};
use crate::remote::RemoteClient;
use crate::snapshot::{Collection, Entry, Snapshot};
use crate::store::SnapshotStore;

const DEADLINE_REASON: &str = "run deadline exceeded";

/// Runs full and single-record syncs over a snapshot store.
///
/// Only one engine may work on a given store at a time.
pub struct SyncEngine<S> {
    client: RemoteClient,
    store: S,
    run_log: RunLog,
    options: EngineOptions,
}

impl<S: SnapshotStore> SyncEngine<S> {
    pub fn new(client: RemoteClient, store: S, run_log: RunLog, options: EngineOptions) -> Self {
        Self {
            client,
            store,
            run_log,
            options,
        }
    }

    pub fn client(&self) -> &RemoteClient {
        &self.client
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn run_log(&self) -> &RunLog {
        &self.run_log
    }

    /// Syncs every collection and saves the snapshot.
    ///
    /// Per-record failures are counted, not returned. Exactly one entry is
    /// appended to the run log, including when loading or saving fails.
    pub async fn run_full(&self) -> Result<SyncStats, EngineError> {
        let started = Instant::now();
        tracing::info!("Starting full sync");

        let mut stats = SyncStats::default();
        let result = self.full_pass(started, &mut stats).await;

        let entry = LogEntry::new(Utc::now(), stats, started.elapsed());
        if let Err(e) = self.run_log.append(&entry).await {
            tracing::warn!("Failed to append run log entry: {}", e);
        }

        match &result {
            Ok(()) => tracing::info!("Full sync finished in {:.2}s: {}", entry.duration, stats),
            Err(e) => tracing::error!("Full sync aborted after {:.2}s: {}", entry.duration, e),
        }
        result.map(|()| stats)
    }

    async fn full_pass(&self, started: Instant, stats: &mut SyncStats) -> Result<(), EngineError> {
        let mut snapshot = self.store.load().await?;
        let pass = Pass {
            synchronizer: Synchronizer::new(&self.client),
            deadline: self.options.run_deadline.map(|limit| started + limit),
        };

        for collection in Collection::SYNC_ORDER {
            pass.sync_collection(&mut snapshot, collection, stats).await;
        }

        self.store.save(&snapshot).await?;
        Ok(())
    }

    /// Merges one record into its collection, syncs it and saves the snapshot.
    ///
    /// A record whose local `id` matches an existing one replaces it, keeping
    /// the stored remote id when the new JSON has none; anything else is
    /// appended. No run log entry is written.
    pub async fn run_single(
        &self,
        collection: &str,
        record: Value,
    ) -> Result<Outcome, EngineError> {
        let collection = Collection::parse(collection)
            .ok_or_else(|| EngineError::UnknownCollection(collection.to_string()))?;

        let mut snapshot = self.store.load().await?;
        let sync = Synchronizer::new(&self.client);
        let (c, r) = (collection, record);
        let outcome = match c {
            Collection::Users => sync_one(&sync, &mut snapshot.users, c, r).await?,
            Collection::Students => sync_one(&sync, &mut snapshot.students, c, r).await?,
            Collection::Instructors => sync_one(&sync, &mut snapshot.instructors, c, r).await?,
            Collection::Guardians => sync_one(&sync, &mut snapshot.guardians, c, r).await?,
            Collection::Programs => sync_one(&sync, &mut snapshot.programs, c, r).await?,
            Collection::Courses => sync_one(&sync, &mut snapshot.courses, c, r).await?,
            Collection::AcademicYears => sync_one(&sync, &mut snapshot.academic_years, c, r).await?,
            Collection::AcademicTerms => sync_one(&sync, &mut snapshot.academic_terms, c, r).await?,
            Collection::Rooms => sync_one(&sync, &mut snapshot.rooms, c, r).await?,
            Collection::Attendance => sync_one(&sync, &mut snapshot.attendance, c, r).await?,
            Collection::Assessments => sync_one(&sync, &mut snapshot.assessments, c, r).await?,
            Collection::Fees => sync_one(&sync, &mut snapshot.fees, c, r).await?,
            Collection::StudentGroups => {
                merge_group(&mut snapshot.student_groups, r);
                Outcome::Skipped(format!("{} are stored but not synced", c))
            }
        };

        self.store.save(&snapshot).await?;
        tracing::info!("Single sync of {} record: {}", collection, outcome);
        Ok(outcome)
    }

    /// Gives the record a random local `id` when it has none, then runs
    /// [`run_single`](Self::run_single).
    pub async fn add_record(
        &self,
        collection: &str,
        mut record: Value,
    ) -> Result<Outcome, EngineError> {
        if let Value::Object(fields) = &mut record {
            let has_id = fields
                .get("id")
                .and_then(Value::as_str)
                .is_some_and(|id| !id.is_empty());
            if !has_id {
                fields.insert("id".to_string(), Value::String(new_local_id()));
            }
        }
        self.run_single(collection, record).await
    }
}

/// State shared by every record of one full run.
struct Pass<'a> {
    synchronizer: Synchronizer<'a>,
    deadline: Option<Instant>,
}

impl Pass<'_> {
    async fn sync_collection(
        &self,
        snapshot: &mut Snapshot,
        collection: Collection,
        stats: &mut SyncStats,
    ) {
        let c = collection;
        match c {
            Collection::Users => self.sync_all(c, &mut snapshot.users, stats).await,
            Collection::Students => self.sync_all(c, &mut snapshot.students, stats).await,
            Collection::Instructors => self.sync_all(c, &mut snapshot.instructors, stats).await,
            Collection::Guardians => self.sync_all(c, &mut snapshot.guardians, stats).await,
            Collection::Programs => self.sync_all(c, &mut snapshot.programs, stats).await,
            Collection::Courses => self.sync_all(c, &mut snapshot.courses, stats).await,
            Collection::AcademicYears => {
                self.sync_all(c, &mut snapshot.academic_years, stats).await
            }
            Collection::AcademicTerms => {
                self.sync_all(c, &mut snapshot.academic_terms, stats).await
            }
            Collection::Rooms => self.sync_all(c, &mut snapshot.rooms, stats).await,
            Collection::Attendance => self.sync_all(c, &mut snapshot.attendance, stats).await,
            Collection::Assessments => self.sync_all(c, &mut snapshot.assessments, stats).await,
            Collection::Fees => self.sync_all(c, &mut snapshot.fees, stats).await,
            Collection::StudentGroups => {}
        }
    }

    async fn sync_all<R: Syncable>(
        &self,
        collection: Collection,
        records: &mut [Entry<R>],
        stats: &mut SyncStats,
    ) {
        if records.is_empty() {
            return;
        }
        tracing::info!("Syncing {} {} record(s)", records.len(), collection);

        let before = *stats;
        for entry in records.iter_mut() {
            let outcome = if self.deadline_passed() {
                Outcome::Skipped(DEADLINE_REASON.to_string())
            } else {
                match entry {
                    Entry::Record(record) => self.synchronizer.sync(record).await,
                    Entry::Malformed { error, .. } => {
                        tracing::warn!("Invalid {} record: {}", collection, error);
                        Outcome::Failed(format!("invalid {} record: {}", collection, error))
                    }
                }
            };
            stats.record(&outcome);
        }

        tracing::debug!(
            "{}: {} created, {} updated, {} failed, {} skipped",
            collection,
            stats.created - before.created,
            stats.updated - before.updated,
            stats.failed - before.failed,
            stats.skipped - before.skipped
        );
    }

    fn deadline_passed(&self) -> bool {
        self.deadline.is_some_and(|deadline| Instant::now() >= deadline)
    }
}

async fn sync_one<R: Syncable>(
    synchronizer: &Synchronizer<'_>,
    records: &mut Vec<Entry<R>>,
    collection: Collection,
    json: Value,
) -> Result<Outcome, EngineError> {
    let mut record: R =
        serde_json::from_value(json).map_err(|source| EngineError::InvalidRecord {
            collection: collection.name().to_string(),
            source,
        })?;
    let existing = adopt(records, &mut record);
    let outcome = synchronizer.sync(&mut record).await;
    place(records, existing, record);
    Ok(outcome)
}

/// Finds the stored entry with the record's local id.
///
/// A replacement that arrives without a remote id keeps the stored one, so it
/// updates the remote document instead of creating a second.
fn adopt<R: RecordIds>(records: &[Entry<R>], record: &mut R) -> Option<usize> {
    let index = record
        .local_id()
        .and_then(|id| records.iter().position(|e| e.local_id() == Some(id)))?;
    if record.remote_id().is_none() {
        if let Some(id) = records[index].remote_id() {
            record.set_remote_id(id.to_string());
        }
    }
    Some(index)
}

/// Replaces the entry at `index`, or appends.
fn place<R>(records: &mut Vec<Entry<R>>, index: Option<usize>, record: R) {
    match index {
        Some(index) => records[index] = Entry::Record(record),
        None => records.push(Entry::Record(record)),
    }
}

fn merge_group(groups: &mut Vec<Value>, group: Value) {
    let id = group.get("id").and_then(Value::as_str).map(str::to_string);
    let existing = id.and_then(|id| {
        groups
            .iter()
            .position(|g| g.get("id").and_then(Value::as_str) == Some(id.as_str()))
    });
    match existing {
        Some(index) => groups[index] = group,
        None => groups.push(group),
    }
}

fn new_local_id() -> String {
    Uuid::new_v4().simple().to_string()
}
