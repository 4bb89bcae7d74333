use std::fmt;

use serde::{Deserialize, Serialize};

use super::Outcome;

/// Outcome counters for one run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncStats {
    pub created: u64,
    pub updated: u64,
    pub failed: u64,
    pub skipped: u64,
}

impl SyncStats {
    pub fn new(created: u64, updated: u64, failed: u64, skipped: u64) -> Self {
        Self {
            created,
            updated,
            failed,
            skipped,
        }
    }

    pub fn record(&mut self, outcome: &Outcome) {
        match outcome {
            Outcome::Created(_) => self.created += 1,
            Outcome::Updated(_) => self.updated += 1,
            Outcome::Failed(_) => self.failed += 1,
            Outcome::Skipped(_) => self.skipped += 1,
        }
    }

    pub fn total(&self) -> u64 {
        self.created + self.updated + self.failed + self.skipped
    }

    pub fn has_failures(&self) -> bool {
        self.failed > 0
    }
}

impl fmt::Display for SyncStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} created, {} updated, {} failed, {} skipped",
            self.created, self.updated, self.failed, self.skipped
        )
    }
}
