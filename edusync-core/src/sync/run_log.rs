use std::io::{ErrorKind, SeekFrom};
use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::io::{AsyncReadExt, AsyncSeekExt, AsyncWriteExt};

use super::SyncStats;
use crate::error::StoreError;

/// One line of the run log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    pub timestamp: DateTime<Utc>,
    pub stats: SyncStats,
    /// Run duration in seconds, two decimals
    pub duration: f64,
}

impl LogEntry {
    pub fn new(timestamp: DateTime<Utc>, stats: SyncStats, elapsed: Duration) -> Self {
        Self {
            timestamp,
            stats,
            duration: (elapsed.as_secs_f64() * 100.0).round() / 100.0,
        }
    }
}

/// Bytes read per step when scanning the log backwards.
const TAIL_CHUNK: u64 = 4096;

/// Append-only JSON Lines log of full runs.
#[derive(Debug, Clone)]
pub struct RunLog {
    path: PathBuf,
}

impl RunLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub async fn append(&self, entry: &LogEntry) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| self.io_error(e))?;
        }

        let mut line = serde_json::to_string(entry).map_err(StoreError::Encode)?;
        line.push('\n');

        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await
            .map_err(|e| self.io_error(e))?;
        file.write_all(line.as_bytes())
            .await
            .map_err(|e| self.io_error(e))?;
        file.flush().await.map_err(|e| self.io_error(e))
    }

    /// All entries, oldest first. Unreadable lines are skipped.
    pub async fn entries(&self) -> Result<Vec<LogEntry>, StoreError> {
        let contents = match tokio::fs::read_to_string(&self.path).await {
            Ok(contents) => contents,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(self.io_error(e)),
        };

        Ok(contents
            .lines()
            .filter_map(|line| self.parse_line(line))
            .collect())
    }

    /// The most recent readable entry, if any run has been logged.
    ///
    /// Reads the file backwards from the end, so the cost doesn't grow with
    /// the length of the log.
    pub async fn last(&self) -> Result<Option<LogEntry>, StoreError> {
        let mut file = match tokio::fs::File::open(&self.path).await {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(self.io_error(e)),
        };
        let mut pos = file.metadata().await.map_err(|e| self.io_error(e))?.len();
        // Bytes from `pos` up to the last line not yet looked at
        let mut pending: Vec<u8> = Vec::new();

        while pos > 0 {
            let start = pos.saturating_sub(TAIL_CHUNK);
            let mut chunk = vec![0; (pos - start) as usize];
            file.seek(SeekFrom::Start(start))
                .await
                .map_err(|e| self.io_error(e))?;
            file.read_exact(&mut chunk)
                .await
                .map_err(|e| self.io_error(e))?;
            chunk.extend_from_slice(&pending);
            pending = chunk;
            pos = start;

            // Everything after a newline is a whole line.
            while let Some(newline) = pending.iter().rposition(|b| *b == b'\n') {
                let line = pending.split_off(newline + 1);
                pending.truncate(newline);
                if let Some(entry) = self.parse_line(&String::from_utf8_lossy(&line)) {
                    return Ok(Some(entry));
                }
            }
        }

        Ok(self.parse_line(&String::from_utf8_lossy(&pending)))
    }

    fn parse_line(&self, line: &str) -> Option<LogEntry> {
        let line = line.trim();
        if line.is_empty() {
            return None;
        }
        match serde_json::from_str(line) {
            Ok(entry) => Some(entry),
            Err(e) => {
                tracing::warn!(
                    "Ignoring malformed run log line in {}: {}",
                    self.path.display(),
                    e
                );
                None
            }
        }
    }

    fn io_error(&self, source: std::io::Error) -> StoreError {
        StoreError::Io {
            path: self.path.clone(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn entry(created: u64, millis: u64) -> LogEntry {
        LogEntry::new(
            Utc::now(),
            SyncStats::new(created, 0, 0, 0),
            Duration::from_millis(millis),
        )
    }

    #[test]
    fn test_duration_is_rounded_to_hundredths() {
        assert_eq!(entry(0, 1234).duration, 1.23);
        assert_eq!(entry(0, 2999).duration, 3.0);
        assert_eq!(entry(0, 0).duration, 0.0);
    }

    #[test]
    fn test_entry_line_shape() {
        let value = serde_json::to_value(entry(2, 500)).unwrap();
        assert!(value["timestamp"].is_string());
        assert_eq!(value["stats"]["created"], 2);
        assert_eq!(value["duration"], 0.5);
    }

    #[tokio::test]
    async fn test_missing_log_has_no_entries() {
        let temp_dir = TempDir::new().unwrap();
        let log = RunLog::new(temp_dir.path().join("sync.log"));

        assert!(log.entries().await.unwrap().is_empty());
        assert!(log.last().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_append_keeps_earlier_entries() {
        let temp_dir = TempDir::new().unwrap();
        let log = RunLog::new(temp_dir.path().join("logs").join("sync.log"));

        log.append(&entry(1, 100)).await.unwrap();
        log.append(&entry(2, 200)).await.unwrap();

        let entries = log.entries().await.unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].stats.created, 1);
        assert_eq!(log.last().await.unwrap().unwrap().stats.created, 2);

        let raw = std::fs::read_to_string(log.path()).unwrap();
        assert_eq!(raw.lines().count(), 2);
    }

    #[tokio::test]
    async fn test_malformed_lines_are_skipped() {
        let temp_dir = TempDir::new().unwrap();
        let log = RunLog::new(temp_dir.path().join("sync.log"));
        log.append(&entry(4, 100)).await.unwrap();

        let mut raw = std::fs::read_to_string(log.path()).unwrap();
        raw.push_str("{truncated\n");
        std::fs::write(log.path(), raw).unwrap();

        let last = log.last().await.unwrap().unwrap();
        assert_eq!(last.stats.created, 4);
    }

    #[tokio::test]
    async fn test_last_reads_past_chunk_boundaries() {
        let temp_dir = TempDir::new().unwrap();
        let log = RunLog::new(temp_dir.path().join("sync.log"));
        for created in 0..200 {
            log.append(&entry(created, 100)).await.unwrap();
        }
        assert!(std::fs::metadata(log.path()).unwrap().len() > 2 * TAIL_CHUNK);

        let last = log.last().await.unwrap().unwrap();
        assert_eq!(last.stats.created, 199);
    }

    #[tokio::test]
    async fn test_last_without_trailing_newline() {
        let temp_dir = TempDir::new().unwrap();
        let log = RunLog::new(temp_dir.path().join("sync.log"));
        log.append(&entry(1, 100)).await.unwrap();

        let mut raw = std::fs::read_to_string(log.path()).unwrap();
        raw.push_str(&serde_json::to_string(&entry(2, 100)).unwrap());
        std::fs::write(log.path(), raw).unwrap();

        assert_eq!(log.last().await.unwrap().unwrap().stats.created, 2);
    }

    #[tokio::test]
    async fn test_last_of_single_line_log() {
        let temp_dir = TempDir::new().unwrap();
        let log = RunLog::new(temp_dir.path().join("sync.log"));
        std::fs::write(
            log.path(),
            serde_json::to_string(&entry(7, 100)).unwrap(),
        )
        .unwrap();

        assert_eq!(log.last().await.unwrap().unwrap().stats.created, 7);
    }
}
