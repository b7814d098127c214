use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use thiserror::Error;

use crate::webhook::signature::DEFAULT_TOLERANCE_SECS;

/// Startup configuration errors. The process must not start (and must
/// never skip signature verification) when any of these occur.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config yaml: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("Missing Stripe environment variable: {0}")]
    MissingStripeEnv(&'static str),

    #[error("Missing database environment variable: {0}")]
    MissingDatabaseEnv(&'static str),

    #[error("Webhook signing secret must not be empty")]
    EmptySigningSecret,
}

impl ConfigError {
    pub fn code(&self) -> &'static str {
        match self {
            ConfigError::Read { .. } => "CONFIG_READ_ERROR",
            ConfigError::Parse(_) => "CONFIG_PARSE_ERROR",
            ConfigError::MissingStripeEnv(_) => "MISSING_STRIPE_ENV",
            ConfigError::MissingDatabaseEnv(_) => "MISSING_DATABASE_ENV",
            ConfigError::EmptySigningSecret => "EMPTY_SIGNING_SECRET",
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct AppConfig {
    pub log_level: String,
    pub log_dir: String,
    pub log_file: String,
    pub use_json: bool,
    pub rotation: String,
    pub gateway: GatewayConfig,
    #[serde(default)]
    pub webhook: WebhookConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct GatewayConfig {
    pub host: String,
    pub port: u16,
    #[serde(default = "default_webhook_path")]
    pub webhook_path: String,
}

fn default_webhook_path() -> String {
    "/webhooks/stripe".to_string()
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct WebhookConfig {
    /// Signature freshness window; 0 disables the check
    pub tolerance_secs: u64,
}

impl Default for WebhookConfig {
    fn default() -> Self {
        Self {
            tolerance_secs: DEFAULT_TOLERANCE_SECS,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct DatabaseConfig {
    pub max_connections: u32,
    pub acquire_timeout_ms: u64,
    /// Apply `migrations/` to the ledger database at startup
    #[serde(default)]
    pub run_migrations: bool,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            max_connections: 20,
            acquire_timeout_ms: 5000,
            run_migrations: false,
        }
    }
}

impl AppConfig {
    pub fn load(env: &str) -> Result<Self, ConfigError> {
        let config_path = format!("config/{}.yaml", env);
        let content = fs::read_to_string(&config_path).map_err(|source| ConfigError::Read {
            path: config_path.clone(),
            source,
        })?;
        Self::from_yaml(&content)
    }

    pub fn from_yaml(content: &str) -> Result<Self, ConfigError> {
        Ok(serde_yaml::from_str(content)?)
    }
}

pub const ENV_STRIPE_SECRET_KEY: &str = "STRIPE_SECRET_KEY";
pub const ENV_STRIPE_WEBHOOK_SECRET: &str = "STRIPE_WEBHOOK_SECRET";
pub const ENV_DATABASE_URL: &str = "DATABASE_URL";
pub const ENV_BALANCE_DATABASE_URL: &str = "BALANCE_DATABASE_URL";

/// Credentials supplied out-of-band through the environment
#[derive(Clone)]
pub struct Secrets {
    stripe_secret_key: String,
    webhook_secret: String,
    database_url: String,
    balance_database_url: Option<String>,
}

impl fmt::Debug for Secrets {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Secrets")
            .field("stripe_secret_key", &"<redacted>")
            .field("webhook_secret", &"<redacted>")
            .field("database_url", &"<redacted>")
            .field(
                "balance_database_url",
                &self.balance_database_url.as_ref().map(|_| "<redacted>"),
            )
            .finish()
    }
}

impl Secrets {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup; empty values count as missing.
    /// Stripe credentials are checked before database ones.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.is_empty());

        let stripe_secret_key =
            get(ENV_STRIPE_SECRET_KEY).ok_or(ConfigError::MissingStripeEnv(ENV_STRIPE_SECRET_KEY))?;
        let webhook_secret = get(ENV_STRIPE_WEBHOOK_SECRET)
            .ok_or(ConfigError::MissingStripeEnv(ENV_STRIPE_WEBHOOK_SECRET))?;
        let database_url =
            get(ENV_DATABASE_URL).ok_or(ConfigError::MissingDatabaseEnv(ENV_DATABASE_URL))?;

        Ok(Self {
            stripe_secret_key,
            webhook_secret,
            database_url,
            balance_database_url: get(ENV_BALANCE_DATABASE_URL),
        })
    }

    pub fn webhook_secret(&self) -> &str {
        &self.webhook_secret
    }

    pub fn database_url(&self) -> &str {
        &self.database_url
    }

    /// Separate balance store, if configured
    pub fn balance_database_url(&self) -> Option<&str> {
        self.balance_database_url.as_deref()
    }

    /// "live" / "test" from the API key prefix, for the startup log
    pub fn stripe_mode(&self) -> &'static str {
        let key = self.stripe_secret_key.as_str();
        if key.starts_with("sk_live_") || key.starts_with("rk_live_") {
            "live"
        } else if key.starts_with("sk_test_") || key.starts_with("rk_test_") {
            "test"
        } else {
            "unknown"
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    const YAML: &str = r#"
log_level: "info"
log_dir: "./logs"
log_file: "coin_topup.log"
use_json: false
rotation: "daily"
gateway:
  host: "0.0.0.0"
  port: 8080
"#;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    const FULL: &[(&str, &str)] = &[
        (ENV_STRIPE_SECRET_KEY, "sk_test_abc"),
        (ENV_STRIPE_WEBHOOK_SECRET, "whsec_abc"),
        (ENV_DATABASE_URL, "postgres://localhost/coins"),
    ];

    #[test]
    fn test_config_defaults() {
        let config = AppConfig::from_yaml(YAML).unwrap();
        assert_eq!(config.gateway.port, 8080);
        assert_eq!(config.gateway.webhook_path, "/webhooks/stripe");
        assert_eq!(config.webhook.tolerance_secs, 300);
        assert_eq!(config.database.max_connections, 20);
        assert!(!config.database.run_migrations);
    }

    #[test]
    fn test_config_overrides() {
        let yaml = format!(
            "{}\nwebhook:\n  tolerance_secs: 60\ndatabase:\n  max_connections: 4\n  acquire_timeout_ms: 250\n",
            YAML
        );
        let config = AppConfig::from_yaml(&yaml).unwrap();
        assert_eq!(config.webhook.tolerance_secs, 60);
        assert_eq!(config.database.max_connections, 4);
        assert_eq!(config.database.acquire_timeout_ms, 250);
    }

    #[test]
    fn test_config_parse_error() {
        let err = AppConfig::from_yaml("gateway: [").unwrap_err();
        assert_eq!(err.code(), "CONFIG_PARSE_ERROR");
    }

    #[test]
    fn test_missing_config_file() {
        let err = AppConfig::load("does-not-exist").unwrap_err();
        assert_eq!(err.code(), "CONFIG_READ_ERROR");
    }

    #[test]
    fn test_secrets_complete() {
        let secrets = Secrets::from_lookup(lookup(FULL)).unwrap();
        assert_eq!(secrets.webhook_secret(), "whsec_abc");
        assert_eq!(secrets.database_url(), "postgres://localhost/coins");
        assert_eq!(secrets.balance_database_url(), None);
        assert_eq!(secrets.stripe_mode(), "test");
    }

    #[test]
    fn test_missing_stripe_env_is_distinct() {
        for missing in [ENV_STRIPE_SECRET_KEY, ENV_STRIPE_WEBHOOK_SECRET] {
            let pairs: Vec<_> = FULL.iter().copied().filter(|(k, _)| *k != missing).collect();
            let err = Secrets::from_lookup(lookup(&pairs)).unwrap_err();
            assert!(matches!(err, ConfigError::MissingStripeEnv(k) if k == missing));
        }
    }

    #[test]
    fn test_missing_database_env_is_distinct() {
        let pairs: Vec<_> = FULL
            .iter()
            .copied()
            .filter(|(k, _)| *k != ENV_DATABASE_URL)
            .collect();
        let err = Secrets::from_lookup(lookup(&pairs)).unwrap_err();
        assert_eq!(err.code(), "MISSING_DATABASE_ENV");
    }

    #[test]
    fn test_empty_value_counts_as_missing() {
        let mut pairs = FULL.to_vec();
        pairs[1] = (ENV_STRIPE_WEBHOOK_SECRET, "");
        let err = Secrets::from_lookup(lookup(&pairs)).unwrap_err();
        assert_eq!(err.code(), "MISSING_STRIPE_ENV");
    }

    #[test]
    fn test_secrets_debug_redacted() {
        let mut pairs = FULL.to_vec();
        pairs.push((ENV_BALANCE_DATABASE_URL, "postgres://balances/db"));
        let secrets = Secrets::from_lookup(lookup(&pairs)).unwrap();
        let dbg = format!("{:?}", secrets);
        assert!(!dbg.contains("whsec_abc"));
        assert!(!dbg.contains("sk_test_abc"));
        assert!(!dbg.contains("postgres://"));
        assert_eq!(secrets.balance_database_url(), Some("postgres://balances/db"));
    }
}
