use std::path::{Path, PathBuf};
use std::time::Duration;

use edusync_core::{Credentials, EngineOptions, RemoteConfig};
use serde::{Deserialize, Serialize, Serializer};

/// Source of a configuration value
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ConfigSource {
    Default,
    File,
    Environment,
}

impl std::fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigSource::Default => write!(f, "default"),
            ConfigSource::File => write!(f, "file"),
            ConfigSource::Environment => write!(f, "environment"),
        }
    }
}

/// A configuration value with its source
#[derive(Debug, Clone, Serialize)]
pub struct ConfigValue<T> {
    pub value: T,
    pub source: ConfigSource,
}

impl<T> ConfigValue<T> {
    pub fn new(value: T, source: ConfigSource) -> Self {
        Self { value, source }
    }
}

/// Remote document API settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RemoteSettings {
    /// Base URL (e.g., "https://erp.example.edu")
    pub url: Option<String>,
    /// API key for Basic authentication
    pub api_key: Option<String>,
    /// API secret; never printed
    #[serde(serialize_with = "mask_secret")]
    pub api_secret: Option<String>,
    /// Per-request timeout in seconds
    pub timeout_secs: u64,
    /// Total attempts per request
    pub retry_attempts: u32,
    /// Pause between attempts in milliseconds
    pub retry_delay_ms: u64,
    /// Only treat 404 as "document missing"
    pub strict_existence_check: bool,
}

impl Default for RemoteSettings {
    fn default() -> Self {
        Self {
            url: None,
            api_key: None,
            api_secret: None,
            timeout_secs: 30,
            retry_attempts: 3,
            retry_delay_ms: 2000,
            strict_existence_check: false,
        }
    }
}

impl RemoteSettings {
    /// Returns true if a remote URL is set
    pub fn is_configured(&self) -> bool {
        self.url.as_deref().is_some_and(|url| !url.trim().is_empty())
    }

    /// Returns true if both key and secret are set
    pub fn has_credentials(&self) -> bool {
        self.api_key.is_some() && self.api_secret.is_some()
    }
}

fn mask_secret<S: Serializer>(secret: &Option<String>, serializer: S) -> Result<S::Ok, S::Error> {
    match secret {
        Some(_) => serializer.serialize_some("********"),
        None => serializer.serialize_none(),
    }
}

/// Application configuration with source tracking
#[derive(Debug, Clone, Serialize)]
pub struct Config {
    /// Path to the JSON snapshot of local records
    pub snapshot_path: ConfigValue<PathBuf>,
    /// Path to the JSON Lines run log
    pub run_log_path: ConfigValue<PathBuf>,
    /// Seconds between passes in `sync watch`
    pub watch_interval_secs: ConfigValue<u64>,
    /// Optional limit on a full run, in seconds
    #[serde(skip_serializing_if = "Option::is_none")]
    pub run_timeout_secs: Option<u64>,
    /// Config file path used (if any)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub config_file: Option<PathBuf>,
    /// Remote API settings
    pub remote: RemoteSettings,
}

/// Internal struct for deserializing config file
#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct ConfigFile {
    snapshot_path: Option<PathBuf>,
    run_log_path: Option<PathBuf>,
    watch_interval_secs: Option<u64>,
    run_timeout_secs: Option<u64>,
    remote: Option<RemoteSettings>,
}

impl Config {
    /// Load configuration with priority: env vars > config file > defaults
    pub fn load(config_path: Option<PathBuf>) -> Result<Self, ConfigError> {
        let data_dir = Self::default_data_dir();

        // Start with defaults
        let mut snapshot_path =
            ConfigValue::new(data_dir.join("portal-db.json"), ConfigSource::Default);
        let mut run_log_path =
            ConfigValue::new(data_dir.join("logs").join("sync.log"), ConfigSource::Default);
        let mut watch_interval_secs = ConfigValue::new(60, ConfigSource::Default);
        let mut run_timeout_secs = None;
        let mut config_file = None;
        let mut remote = RemoteSettings::default();

        // Try to load from config file
        let path = config_path.unwrap_or_else(Self::default_config_path);
        if path.exists() {
            let contents = std::fs::read_to_string(&path)
                .map_err(|e| ConfigError::ReadError(path.clone(), e))?;
            let file_config: ConfigFile = serde_yaml::from_str(&contents)
                .map_err(|e| ConfigError::ParseError(path.clone(), e))?;

            if let Some(p) = file_config.snapshot_path {
                snapshot_path = ConfigValue::new(resolve_against(&path, p), ConfigSource::File);
            }
            if let Some(p) = file_config.run_log_path {
                run_log_path = ConfigValue::new(resolve_against(&path, p), ConfigSource::File);
            }
            if let Some(secs) = file_config.watch_interval_secs {
                watch_interval_secs = ConfigValue::new(secs, ConfigSource::File);
            }
            run_timeout_secs = file_config.run_timeout_secs;
            if let Some(remote_config) = file_config.remote {
                remote = remote_config;
            }

            config_file = Some(path);
        }

        // Apply environment variable overrides
        if let Ok(p) = std::env::var("EDUSYNC_SNAPSHOT_PATH") {
            snapshot_path = ConfigValue::new(PathBuf::from(p), ConfigSource::Environment);
        }
        if let Ok(p) = std::env::var("EDUSYNC_RUN_LOG_PATH") {
            run_log_path = ConfigValue::new(PathBuf::from(p), ConfigSource::Environment);
        }
        if let Ok(url) = std::env::var("EDUSYNC_REMOTE_URL") {
            remote.url = Some(url);
        }
        if let Ok(key) = std::env::var("EDUSYNC_API_KEY") {
            remote.api_key = Some(key);
        }
        if let Ok(secret) = std::env::var("EDUSYNC_API_SECRET") {
            remote.api_secret = Some(secret);
        }

        Ok(Self {
            snapshot_path,
            run_log_path,
            watch_interval_secs,
            run_timeout_secs,
            config_file,
            remote,
        })
    }

    /// Builds the client settings, failing when no remote URL is set.
    pub fn remote_config(&self) -> Result<RemoteConfig, ConfigError> {
        let url = match &self.remote.url {
            Some(url) if self.remote.is_configured() => url.clone(),
            _ => return Err(ConfigError::MissingRemoteUrl),
        };

        let mut config = RemoteConfig::new(url)
            .with_timeout(Duration::from_secs(self.remote.timeout_secs))
            .with_retry(
                self.remote.retry_attempts,
                Duration::from_millis(self.remote.retry_delay_ms),
            )
            .with_strict_existence_check(self.remote.strict_existence_check);
        if let (Some(key), Some(secret)) = (&self.remote.api_key, &self.remote.api_secret) {
            config = config.with_credentials(Credentials::new(key, secret));
        }
        Ok(config)
    }

    pub fn engine_options(&self) -> EngineOptions {
        EngineOptions {
            run_deadline: self.run_timeout_secs.map(Duration::from_secs),
        }
    }

    /// Default config directory (platform-specific):
    /// - Linux: ~/.config/edusync/
    /// - macOS: ~/Library/Application Support/edusync/
    /// - Windows: %APPDATA%/edusync/
    pub fn default_config_dir() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("edusync")
    }

    /// Default data directory (platform-specific):
    /// - Linux: ~/.local/share/edusync/
    /// - macOS: ~/Library/Application Support/edusync/
    /// - Windows: %APPDATA%/edusync/
    pub fn default_data_dir() -> PathBuf {
        dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("edusync")
    }

    /// Default config file path (platform-specific config dir + config.yaml)
    pub fn default_config_path() -> PathBuf {
        Self::default_config_dir().join("config.yaml")
    }
}

/// Resolves relative paths against the config file's directory
fn resolve_against(config_path: &Path, path: PathBuf) -> PathBuf {
    if path.is_relative() {
        config_path.parent().map(|p| p.join(&path)).unwrap_or(path)
    } else {
        path
    }
}

#[derive(Debug)]
pub enum ConfigError {
    ReadError(PathBuf, std::io::Error),
    ParseError(PathBuf, serde_yaml::Error),
    MissingRemoteUrl,
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::ReadError(path, e) => {
                write!(f, "Failed to read config file '{}': {}", path.display(), e)
            }
            ConfigError::ParseError(path, e) => {
                write!(f, "Failed to parse config file '{}': {}", path.display(), e)
            }
            ConfigError::MissingRemoteUrl => write!(
                f,
                "Remote URL not configured (set remote.url in the config file or EDUSYNC_REMOTE_URL)"
            ),
        }
    }
}

impl std::error::Error for ConfigError {}
