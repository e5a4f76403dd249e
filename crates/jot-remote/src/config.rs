//! Remote service connection configuration.

use jot_core::{defaults, Error, Result};

/// Environment variable holding the remote service base URL.
pub const ENV_REMOTE_URL: &str = "JOT_REMOTE_URL";

/// Environment variable holding the remote service access key.
pub const ENV_REMOTE_KEY: &str = "JOT_REMOTE_KEY";

/// Environment variable overriding the remote request timeout (seconds).
pub const ENV_REMOTE_TIMEOUT_SECS: &str = "JOT_REMOTE_TIMEOUT_SECS";

/// Connection settings for the remote sync service.
#[derive(Debug, Clone)]
pub struct RemoteConfig {
    /// Base URL of the remote service.
    pub url: String,
    /// Access key, sent as both the `apikey` header and a bearer token.
    pub key: String,
    /// Request timeout in seconds.
    pub timeout_secs: u64,
}

impl RemoteConfig {
    /// Create a configuration with the default timeout.
    pub fn new(url: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            key: key.into(),
            timeout_secs: defaults::REMOTE_TIMEOUT_SECS,
        }
    }

    /// Override the request timeout.
    pub fn with_timeout_secs(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }

    /// Read the configuration from the environment. The URL and key are
    /// required secrets; their absence fails fast rather than at the first
    /// remote call.
    pub fn from_env() -> Result<Self> {
        let url = std::env::var(ENV_REMOTE_URL)
            .map_err(|_| Error::Config(format!("{} is not set", ENV_REMOTE_URL)))?;
        let key = std::env::var(ENV_REMOTE_KEY)
            .map_err(|_| Error::Config(format!("{} is not set", ENV_REMOTE_KEY)))?;

        let timeout_secs = std::env::var(ENV_REMOTE_TIMEOUT_SECS)
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(defaults::REMOTE_TIMEOUT_SECS);

        Ok(Self {
            url,
            key,
            timeout_secs,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_uses_default_timeout() {
        let config = RemoteConfig::new("https://sync.example.com", "secret");
        assert_eq!(config.url, "https://sync.example.com");
        assert_eq!(config.key, "secret");
        assert_eq!(config.timeout_secs, defaults::REMOTE_TIMEOUT_SECS);
    }

    #[test]
    fn test_with_timeout_secs_overrides() {
        let config = RemoteConfig::new("https://sync.example.com", "secret").with_timeout_secs(7);
        assert_eq!(config.timeout_secs, 7);
    }

    // Sole test touching the JOT_REMOTE_* variables, so the process-global
    // environment is not raced by parallel tests.
    #[test]
    fn test_from_env_requires_both_secrets() {
        std::env::remove_var(ENV_REMOTE_URL);
        std::env::remove_var(ENV_REMOTE_KEY);

        let err = RemoteConfig::from_env().unwrap_err();
        assert!(matches!(err, Error::Config(_)));
        assert!(err.to_string().contains(ENV_REMOTE_URL));

        std::env::set_var(ENV_REMOTE_URL, "https://sync.example.com");
        let err = RemoteConfig::from_env().unwrap_err();
        assert!(err.to_string().contains(ENV_REMOTE_KEY));

        std::env::set_var(ENV_REMOTE_KEY, "secret");
        let config = RemoteConfig::from_env().unwrap();
        assert_eq!(config.url, "https://sync.example.com");
        assert_eq!(config.key, "secret");

        std::env::remove_var(ENV_REMOTE_URL);
        std::env::remove_var(ENV_REMOTE_KEY);
    }
}
