//! Configuration management for Pitchguard.

use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::Path;
use tracing::debug;

use crate::error::{GuardError, Result};
use crate::ratelimit::{PolicyTable, DEFAULT_SWEEP_INTERVAL_MS, DEFAULT_TRUSTED_IP_HEADER};

/// Prefix for environment overrides, e.g. `PITCHGUARD__SERVER__HTTP_ADDR`.
const ENV_PREFIX: &str = "PITCHGUARD";

/// Main configuration for the Pitchguard service.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GuardConfig {
    /// Server configuration
    #[serde(default)]
    pub server: ServerConfig,

    /// Rate limiting configuration
    #[serde(default)]
    pub rate_limiting: RateLimitingConfig,

    /// Caller authentication
    #[serde(default)]
    pub auth: AuthConfig,

    /// Log output
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// HTTP listen address
    #[serde(default = "default_http_addr")]
    pub http_addr: SocketAddr,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            http_addr: default_http_addr(),
        }
    }
}

fn default_http_addr() -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], 8787))
}

/// Rate limiting configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitingConfig {
    /// Per-category, per-tier policies
    #[serde(default)]
    pub policies: PolicyTable,

    /// Optional YAML file whose policies replace `policies`
    #[serde(default)]
    pub policies_path: Option<String>,

    /// Header carrying the client IP set by the edge proxy
    #[serde(default = "default_trusted_ip_header")]
    pub trusted_ip_header: String,

    /// Minimum time between sweeps of expired entries, in seconds
    #[serde(default = "default_sweep_interval")]
    pub sweep_interval_secs: u64,
}

impl Default for RateLimitingConfig {
    fn default() -> Self {
        Self {
            policies: PolicyTable::default(),
            policies_path: None,
            trusted_ip_header: default_trusted_ip_header(),
            sweep_interval_secs: default_sweep_interval(),
        }
    }
}

fn default_trusted_ip_header() -> String {
    DEFAULT_TRUSTED_IP_HEADER.to_string()
}

fn default_sweep_interval() -> u64 {
    DEFAULT_SWEEP_INTERVAL_MS / 1000
}

/// Authentication configuration.
///
/// Requests carrying one of these bearer tokens get the authenticated tier.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AuthConfig {
    #[serde(default)]
    pub tokens: Vec<TokenConfig>,
}

/// A bearer token and the user it identifies.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenConfig {
    pub token: String,
    pub user_id: String,
    #[serde(default)]
    pub email: Option<String>,
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default filter directive when `RUST_LOG` is unset
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Emit JSON lines instead of human-readable output
    #[serde(default)]
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

impl GuardConfig {
    /// Load configuration from a YAML file, with environment overrides.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::load(Some(path.as_ref()))
    }

    /// Load configuration from defaults, an optional YAML file and
    /// `PITCHGUARD__*` environment variables, in increasing precedence.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut builder = ::config::Config::builder();
        if let Some(path) = path {
            debug!(path = %path.display(), "Loading configuration file");
            builder = builder
                .add_source(::config::File::from(path).format(::config::FileFormat::Yaml));
        }
        let settings = builder
            .add_source(::config::Environment::with_prefix(ENV_PREFIX).separator("__"))
            .build()?;

        let mut config: GuardConfig = settings.try_deserialize()?;

        if let Some(policies_path) = &config.rate_limiting.policies_path {
            config.rate_limiting.policies = PolicyTable::from_file(policies_path)?;
        }

        config.validate()?;
        Ok(config)
    }

    /// Check cross-field constraints.
    pub fn validate(&self) -> Result<()> {
        self.rate_limiting.policies.validate()?;

        if self.rate_limiting.sweep_interval_secs == 0 {
            return Err(GuardError::Config(
                "rate_limiting.sweep_interval_secs must be positive".to_string(),
            ));
        }
        if self.rate_limiting.trusted_ip_header.trim().is_empty() {
            return Err(GuardError::Config(
                "rate_limiting.trusted_ip_header must not be empty".to_string(),
            ));
        }
        if let Some(token) = self.auth.tokens.iter().find(|t| t.token.is_empty()) {
            return Err(GuardError::Config(format!(
                "auth token for user {} is empty",
                token.user_id
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ratelimit::{Category, RateLimitPolicy};
    use std::path::PathBuf;
    use tempfile::TempDir;

    fn write_yaml(dir: &TempDir, name: &str, contents: &str) -> PathBuf {
        let path = dir.path().join(name);
        std::fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn test_defaults() {
        let config = GuardConfig::default();

        assert_eq!(config.server.http_addr, "127.0.0.1:8787".parse::<SocketAddr>().unwrap());
        assert_eq!(config.rate_limiting.trusted_ip_header, "cf-connecting-ip");
        assert_eq!(config.rate_limiting.sweep_interval_secs, 60);
        assert!(config.auth.tokens.is_empty());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_from_file() {
        let dir = TempDir::new().unwrap();
        let path = write_yaml(
            &dir,
            "config.yaml",
            r#"
server:
  http_addr: "0.0.0.0:9000"
rate_limiting:
  trusted_ip_header: fly-client-ip
  policies:
    speech:
      anonymous:
        max_requests: 4
        window_ms: 60000
      authenticated:
        max_requests: 40
        window_ms: 60000
auth:
  tokens:
    - token: secret-token
      user_id: user-1
      email: founder@example.com
"#,
        );

        let config = GuardConfig::from_file(&path).unwrap();

        assert_eq!(config.server.http_addr.port(), 9000);
        assert_eq!(config.rate_limiting.trusted_ip_header, "fly-client-ip");
        assert_eq!(
            config.rate_limiting.policies.select(Category::Speech, false),
            RateLimitPolicy::new(4, 60_000)
        );
        assert_eq!(config.auth.tokens[0].user_id, "user-1");
    }

    #[test]
    fn test_policies_path_overrides_inline_policies() {
        let dir = TempDir::new().unwrap();
        let policies = write_yaml(
            &dir,
            "policies.yaml",
            r#"
document_parsing:
  anonymous:
    max_requests: 1
    window_ms: 10000
  authenticated:
    max_requests: 2
    window_ms: 10000
"#,
        );
        let config_path = write_yaml(
            &dir,
            "config.yaml",
            &format!(
                "rate_limiting:\n  policies_path: \"{}\"\n",
                policies.display()
            ),
        );

        let config = GuardConfig::from_file(&config_path).unwrap();

        assert_eq!(
            config
                .rate_limiting
                .policies
                .select(Category::DocumentParsing, true),
            RateLimitPolicy::new(2, 10_000)
        );
    }

    #[test]
    fn test_validate_rejects_zero_sweep_interval() {
        let mut config = GuardConfig::default();
        config.rate_limiting.sweep_interval_secs = 0;

        assert!(matches!(config.validate(), Err(GuardError::Config(_))));
    }

    #[test]
    fn test_validate_rejects_empty_token() {
        let mut config = GuardConfig::default();
        config.auth.tokens.push(TokenConfig {
            token: String::new(),
            user_id: "u".to_string(),
            email: None,
        });

        assert!(config.validate().is_err());
    }
}
