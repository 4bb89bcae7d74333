mod add_cmd;
mod config_cmd;
mod sync_cmd;

pub use add_cmd::AddCommand;
pub use config_cmd::ConfigCommand;
pub use sync_cmd::SyncCommand;

use edusync_core::{JsonFileStore, RemoteClient, RemoteError, RunLog, SyncEngine};

use crate::config::{Config, ConfigError};

/// Builds a sync engine over the configured snapshot file and remote.
fn build_engine(config: &Config) -> Result<SyncEngine<JsonFileStore>, SetupError> {
    let client = RemoteClient::new(&config.remote_config()?)?;
    Ok(SyncEngine::new(
        client,
        JsonFileStore::new(&config.snapshot_path.value),
        RunLog::new(&config.run_log_path.value),
        config.engine_options(),
    ))
}

/// Errors while wiring up the engine from configuration
#[derive(Debug)]
pub enum SetupError {
    Config(ConfigError),
    Client(RemoteError),
}

impl std::fmt::Display for SetupError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SetupError::Config(e) => write!(f, "{}", e),
            SetupError::Client(e) => write!(f, "{}", e),
        }
    }
}

impl std::error::Error for SetupError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SetupError::Config(e) => Some(e),
            SetupError::Client(e) => Some(e),
        }
    }
}

impl From<ConfigError> for SetupError {
    fn from(e: ConfigError) -> Self {
        SetupError::Config(e)
    }
}

impl From<RemoteError> for SetupError {
    fn from(e: RemoteError) -> Self {
        SetupError::Client(e)
    }
}
