//! Sync CLI commands for pushing the local snapshot to the remote API.

use std::time::Duration;

use clap::{Args, Subcommand};
use edusync_core::{EngineError, JsonFileStore, RemoteClient, RunLog, SyncEngine, SyncStats};

use super::{build_engine, SetupError};
use crate::config::Config;

/// Push local records to the remote API
#[derive(Debug, Args)]
pub struct SyncCommand {
    #[command(subcommand)]
    command: Option<SyncSubcommand>,

    /// Exit with an error when any record failed
    #[arg(long)]
    fail_on_error: bool,
}

#[derive(Debug, Subcommand)]
enum SyncSubcommand {
    /// Show remote configuration, connectivity and the last run
    Status,

    /// Run full passes repeatedly until interrupted
    Watch {
        /// Seconds to wait between passes (default: watch_interval_secs)
        #[arg(long)]
        interval: Option<u64>,
    },
}

impl SyncCommand {
    pub async fn run(&self, config: &Config) -> Result<(), SyncCommandError> {
        match &self.command {
            None => self.sync(config).await,
            Some(SyncSubcommand::Status) => self.status(config).await,
            Some(SyncSubcommand::Watch { interval }) => {
                let secs = interval.unwrap_or(config.watch_interval_secs.value);
                self.watch(config, Duration::from_secs(secs)).await
            }
        }
    }

    async fn sync(&self, config: &Config) -> Result<(), SyncCommandError> {
        let engine = build_engine(config)?;

        println!("Syncing with {}...", engine.client().base_url());
        println!();

        let stats = engine.run_full().await?;
        print_stats(&stats);

        if self.fail_on_error && stats.has_failures() {
            return Err(SyncCommandError::RecordsFailed(stats.failed));
        }
        Ok(())
    }

    async fn status(&self, config: &Config) -> Result<(), SyncCommandError> {
        println!("Sync Configuration");
        println!("==================");
        println!();

        println!("Snapshot:  {}", config.snapshot_path.value.display());
        println!("Run log:   {}", config.run_log_path.value.display());

        if !config.remote.is_configured() {
            println!("Remote:    Not configured");
            println!();
            println!("To enable sync, add to your config file:");
            println!();
            println!("  remote:");
            println!("    url: \"https://erp.example.edu\"");
            println!("    api_key: \"...\"");
            println!("    api_secret: \"...\"");
            println!();
            println!("Or set environment variables:");
            println!("  EDUSYNC_REMOTE_URL, EDUSYNC_API_KEY, EDUSYNC_API_SECRET");
            return Ok(());
        }

        let remote = config.remote_config().map_err(SetupError::from)?;
        println!("Remote:    {}", remote.base_url);
        println!(
            "Auth:      {}",
            if config.remote.has_credentials() {
                "api key"
            } else {
                "none"
            }
        );
        println!(
            "Retry:     {} attempt(s), {} ms apart",
            config.remote.retry_attempts, config.remote.retry_delay_ms
        );
        println!();

        print!("Server status: ");
        let client = RemoteClient::new(&remote).map_err(SetupError::from)?;
        if client.ping().await {
            println!("✓ connected");
        } else {
            println!("✗ unreachable");
        }
        println!();

        match RunLog::new(&config.run_log_path.value).last().await {
            Ok(Some(entry)) => {
                println!(
                    "Last run:  {} ({:.2}s)",
                    entry.timestamp.format("%Y-%m-%d %H:%M:%S UTC"),
                    entry.duration
                );
                println!("           {}", entry.stats);
            }
            Ok(None) => println!("Last run:  never"),
            Err(e) => println!("Last run:  unavailable ({})", e),
        }

        Ok(())
    }

    async fn watch(&self, config: &Config, interval: Duration) -> Result<(), SyncCommandError> {
        let engine = build_engine(config)?;

        let (stop_tx, mut stop_rx) = tokio::sync::watch::channel(false);
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::info!("Interrupt received, stopping after the current pass");
                let _ = stop_tx.send(true);
            }
        });

        println!(
            "Watching {} every {}s (Ctrl-C to stop)",
            engine.client().base_url(),
            interval.as_secs()
        );

        loop {
            run_pass(&engine).await;

            if *stop_rx.borrow() {
                break;
            }
            tokio::select! {
                _ = stop_rx.changed() => break,
                _ = tokio::time::sleep(interval) => {}
            }
        }

        println!("Stopped.");
        Ok(())
    }
}

/// One pass of `sync watch`. Errors are reported and the loop goes on.
async fn run_pass(engine: &SyncEngine<JsonFileStore>) {
    match engine.run_full().await {
        Ok(stats) => {
            println!(
                "[{}] {}",
                chrono::Local::now().format("%H:%M:%S"),
                stats
            );
        }
        Err(e) => {
            tracing::error!("Sync pass failed: {}", e);
        }
    }
}

fn print_stats(stats: &SyncStats) {
    println!("  Created: {}", stats.created);
    println!("  Updated: {}", stats.updated);
    println!("  Failed:  {}", stats.failed);
    println!("  Skipped: {}", stats.skipped);
    println!();

    if stats.total() == 0 {
        println!("Nothing to sync.");
    } else if stats.has_failures() {
        println!("Sync finished with failures; see the log for details.");
    } else {
        println!("Sync complete.");
    }
}

/// Errors from sync commands
#[derive(Debug)]
pub enum SyncCommandError {
    Setup(SetupError),
    Engine(EngineError),
    RecordsFailed(u64),
}

impl std::fmt::Display for SyncCommandError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SyncCommandError::Setup(e) => write!(f, "{}", e),
            SyncCommandError::Engine(e) => write!(f, "Sync failed: {}", e),
            SyncCommandError::RecordsFailed(n) => write!(f, "{} record(s) failed to sync", n),
        }
    }
}

impl std::error::Error for SyncCommandError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SyncCommandError::Setup(e) => Some(e),
            SyncCommandError::Engine(e) => Some(e),
            SyncCommandError::RecordsFailed(_) => None,
        }
    }
}

impl From<SetupError> for SyncCommandError {
    fn from(e: SetupError) -> Self {
        SyncCommandError::Setup(e)
    }
}

impl From<EngineError> for SyncCommandError {
    fn from(e: EngineError) -> Self {
        SyncCommandError::Engine(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use edusync_core::{EngineOptions, RemoteConfig};
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_failed_watch_pass_is_logged_and_survived() {
        let temp_dir = TempDir::new().unwrap();
        let snapshot_path = temp_dir.path().join("portal-db.json");
        std::fs::write(&snapshot_path, "{broken").unwrap();

        let client = RemoteClient::new(&RemoteConfig::new("http://127.0.0.1:1")).unwrap();
        let run_log = RunLog::new(temp_dir.path().join("sync.log"));
        let engine = SyncEngine::new(
            client,
            JsonFileStore::new(&snapshot_path),
            run_log.clone(),
            EngineOptions::default(),
        );

        run_pass(&engine).await;
        run_pass(&engine).await;

        assert_eq!(run_log.entries().await.unwrap().len(), 2);
    }
}
