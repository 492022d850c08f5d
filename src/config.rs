//! Configuration file parser for ~/.config/notifeed/config.toml.
//!
//! The config file is optional; a missing file yields `Config::default()`.
//! Unknown keys are ignored by serde, though we log a warning for each so
//! typos don't go unnoticed.
use serde::Deserialize;
use std::path::Path;
use thiserror::Error;

/// Environment variable holding the API bearer token. Wins over `auth_token`.
pub const TOKEN_ENV_VAR: &str = "NOTIFEED_TOKEN";

// ============================================================================
// Error Types
// ============================================================================

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid TOML in config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Config file too large: {0}")]
    TooLarge(String),
}

// ============================================================================
// Configuration Structs
// ============================================================================

/// How a section treats a page response that arrives after a newer one.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StaleResponsePolicy {
    /// Apply every response in arrival order; a late response may overwrite newer state.
    #[default]
    LastWriterWins,
    /// Drop responses older than the newest one already applied.
    DiscardStale,
}

/// Top-level application configuration.
///
/// All fields use `#[serde(default)]` so any subset of keys can be specified.
/// `Debug` masks `auth_token`.
#[derive(Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Base URL of the notifications (talk) API.
    pub feed_api_url: String,

    /// Base URL of the projects API.
    pub project_api_url: String,

    /// Notifications per page.
    pub page_size: u32,

    pub request_timeout_secs: u64,

    /// Retries for transient list/get failures. Read-state writes are never retried.
    pub max_retries: u32,

    pub stale_responses: StaleResponsePolicy,

    /// Display name of the global section.
    pub global_section_name: String,

    /// API bearer token (alternative to the NOTIFEED_TOKEN env var).
    pub auth_token: Option<String>,

    /// How long the CLI lingers at exit so detached read-state writes can go out.
    pub shutdown_grace_ms: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            feed_api_url: "https://talk.zooniverse.org".to_string(),
            project_api_url: "https://www.zooniverse.org/api".to_string(),
            page_size: 5,
            request_timeout_secs: 20,
            max_retries: 2,
            stale_responses: StaleResponsePolicy::default(),
            global_section_name: "Zooniverse".to_string(),
            auth_token: None,
            shutdown_grace_ms: 500,
        }
    }
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("feed_api_url", &self.feed_api_url)
            .field("project_api_url", &self.project_api_url)
            .field("page_size", &self.page_size)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("max_retries", &self.max_retries)
            .field("stale_responses", &self.stale_responses)
            .field("global_section_name", &self.global_section_name)
            .field("auth_token", &self.auth_token.as_ref().map(|_| "[REDACTED]"))
            .field("shutdown_grace_ms", &self.shutdown_grace_ms)
            .finish()
    }
}

impl Config {
    /// Maximum config file size (1 MB).
    const MAX_FILE_SIZE: u64 = 1_048_576;

    const KNOWN_KEYS: [&'static str; 9] = [
        "feed_api_url",
        "project_api_url",
        "page_size",
        "request_timeout_secs",
        "max_retries",
        "stale_responses",
        "global_section_name",
        "auth_token",
        "shutdown_grace_ms",
    ];

    /// Load configuration from a TOML file.
    ///
    /// - Missing file → `Ok(Config::default())`
    /// - Empty file → `Ok(Config::default())`
    /// - Invalid TOML → `Err(ConfigError::Parse)` with line number info
    /// - Unknown keys → accepted, logged as warning
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        match std::fs::metadata(path) {
            Ok(meta) if meta.len() > Self::MAX_FILE_SIZE => {
                return Err(ConfigError::TooLarge(format!(
                    "Config file is {} bytes (max {} bytes)",
                    meta.len(),
                    Self::MAX_FILE_SIZE
                )));
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "No config file found, using defaults");
                return Ok(Self::default());
            }
            Err(e) => return Err(ConfigError::Io(e)),
            Ok(_) => {}
        }

        let content = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "Config file disappeared, using defaults");
                return Ok(Self::default());
            }
            Err(e) => return Err(ConfigError::Io(e)),
        };

        if content.trim().is_empty() {
            tracing::debug!(path = %path.display(), "Config file is empty, using defaults");
            return Ok(Self::default());
        }

        if let Ok(raw) = content.parse::<toml::Table>() {
            for key in raw.keys() {
                if !Self::KNOWN_KEYS.contains(&key.as_str()) {
                    tracing::warn!(key = %key, "Unknown key in config file, ignoring");
                }
            }
        }

        let config: Config = toml::from_str(&content)?;
        tracing::info!(
            path = %path.display(),
            feed_api_url = %config.feed_api_url,
            page_size = config.page_size,
            "Loaded configuration"
        );
        Ok(config)
    }

    /// Bearer token from the environment, falling back to the config file.
    pub fn resolve_token(&self) -> Option<String> {
        std::env::var(TOKEN_ENV_VAR)
            .ok()
            .filter(|t| !t.trim().is_empty())
            .or_else(|| self.auth_token.clone())
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn write_config(name: &str, content: &str) -> std::path::PathBuf {
        let dir = std::env::temp_dir().join(format!("notifeed_config_test_{name}"));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("config.toml");
        std::fs::write(&path, content).unwrap();
        path
    }

    fn cleanup(path: &Path) {
        if let Some(dir) = path.parent() {
            std::fs::remove_dir_all(dir).ok();
        }
    }

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.page_size, 5);
        assert_eq!(config.stale_responses, StaleResponsePolicy::LastWriterWins);
        assert_eq!(config.global_section_name, "Zooniverse");
        assert!(config.auth_token.is_none());
    }

    #[test]
    fn test_missing_file_returns_default() {
        let path = Path::new("/tmp/notifeed_test_nonexistent_config.toml");
        let config = Config::load(path).unwrap();
        assert_eq!(config.page_size, 5);
    }

    #[test]
    fn test_whitespace_only_file_returns_default() {
        let path = write_config("whitespace", "   \n  \n");
        let config = Config::load(&path).unwrap();
        assert_eq!(config.feed_api_url, "https://talk.zooniverse.org");
        cleanup(&path);
    }

    #[test]
    fn test_full_config() {
        let path = write_config(
            "full",
            r#"
feed_api_url = "http://localhost:4000"
project_api_url = "http://localhost:4001"
page_size = 10
request_timeout_secs = 5
max_retries = 0
stale_responses = "discard_stale"
global_section_name = "Everything"
auth_token = "token-123"
shutdown_grace_ms = 0
"#,
        );

        let config = Config::load(&path).unwrap();
        assert_eq!(config.feed_api_url, "http://localhost:4000");
        assert_eq!(config.page_size, 10);
        assert_eq!(config.max_retries, 0);
        assert_eq!(config.stale_responses, StaleResponsePolicy::DiscardStale);
        assert_eq!(config.global_section_name, "Everything");
        assert_eq!(config.auth_token.as_deref(), Some("token-123"));
        assert_eq!(config.shutdown_grace_ms, 0);
        cleanup(&path);
    }

    #[test]
    fn test_partial_config_uses_defaults_for_missing() {
        let path = write_config("partial", "page_size = 3\n");
        let config = Config::load(&path).unwrap();
        assert_eq!(config.page_size, 3);
        assert_eq!(config.request_timeout_secs, 20);
        cleanup(&path);
    }

    #[test]
    fn test_unknown_keys_accepted() {
        let path = write_config("unknown", "page_size = 5\nnot_a_key = true\n");
        assert!(Config::load(&path).is_ok());
        cleanup(&path);
    }

    #[test]
    fn test_unknown_policy_rejected() {
        let path = write_config("bad_policy", "stale_responses = \"sometimes\"\n");
        assert!(matches!(Config::load(&path), Err(ConfigError::Parse(_))));
        cleanup(&path);
    }

    #[test]
    fn test_invalid_toml_returns_error() {
        let path = write_config("invalid", "this is not [valid toml");
        let err = Config::load(&path).unwrap_err();
        assert!(err.to_string().contains("Invalid TOML"));
        cleanup(&path);
    }

    #[test]
    fn test_too_large_file_rejected() {
        let path = write_config("too_large", &"a".repeat(1_048_577));
        let err = Config::load(&path).unwrap_err();
        assert!(matches!(err, ConfigError::TooLarge(_)));
        cleanup(&path);
    }

    #[test]
    fn test_debug_masks_token() {
        let config = Config {
            auth_token: Some("super-secret-token".to_string()),
            ..Config::default()
        };
        let debug_output = format!("{:?}", config);
        assert!(!debug_output.contains("super-secret-token"));
        assert!(debug_output.contains("[REDACTED]"));
    }
}
