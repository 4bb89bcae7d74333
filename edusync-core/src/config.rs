//! Immutable engine configuration.
//!
//! Values here are built once by the caller (the CLI reads them from YAML and
//! the environment) and handed to constructors. Nothing in this crate reads
//! process-wide state.

use std::time::Duration;

/// Default per-call timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
/// Default number of attempts per remote call.
pub const DEFAULT_RETRY_ATTEMPTS: u32 = 3;
/// Default pause between attempts.
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_secs(2);

/// API key/secret pair sent as HTTP Basic credentials.
#[derive(Clone)]
pub struct Credentials {
    pub api_key: String,
    pub api_secret: String,
}

impl Credentials {
    pub fn new(api_key: impl Into<String>, api_secret: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            api_secret: api_secret.into(),
        }
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("api_key", &self.api_key)
            .field("api_secret", &"***")
            .finish()
    }
}

/// Connection and retry settings for the remote document API.
#[derive(Debug, Clone)]
pub struct RemoteConfig {
    /// Base URL, e.g. `https://erp.example.edu`
    pub base_url: String,
    /// Optional Basic credentials; requests go out unauthenticated without them
    pub credentials: Option<Credentials>,
    /// Timeout applied to each HTTP call
    pub timeout: Duration,
    /// Total attempts per call (values below 1 are treated as 1)
    pub retry_attempts: u32,
    /// Fixed pause between consecutive attempts
    pub retry_delay: Duration,
    /// Only a 404 counts as "document absent" when set
    pub strict_existence_check: bool,
}

impl RemoteConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            credentials: None,
            timeout: DEFAULT_TIMEOUT,
            retry_attempts: DEFAULT_RETRY_ATTEMPTS,
            retry_delay: DEFAULT_RETRY_DELAY,
            strict_existence_check: false,
        }
    }

    pub fn with_credentials(mut self, credentials: Credentials) -> Self {
        self.credentials = Some(credentials);
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_retry(mut self, attempts: u32, delay: Duration) -> Self {
        self.retry_attempts = attempts;
        self.retry_delay = delay;
        self
    }

    pub fn with_strict_existence_check(mut self, strict: bool) -> Self {
        self.strict_existence_check = strict;
        self
    }
}

/// Run-level settings for the orchestrator.
#[derive(Debug, Clone, Default)]
pub struct EngineOptions {
    /// Once elapsed, remaining records in a full run are skipped
    pub run_deadline: Option<Duration>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_remote_config_defaults() {
        let config = RemoteConfig::new("http://localhost:8000");
        assert_eq!(config.timeout, Duration::from_secs(30));
        assert_eq!(config.retry_attempts, 3);
        assert_eq!(config.retry_delay, Duration::from_secs(2));
        assert!(config.credentials.is_none());
        assert!(!config.strict_existence_check);
    }

    #[test]
    fn test_credentials_debug_masks_secret() {
        let creds = Credentials::new("key", "very-secret");
        let debug = format!("{:?}", creds);
        assert!(debug.contains("key"));
        assert!(!debug.contains("very-secret"));
    }
}
