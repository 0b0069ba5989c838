//! Configuration management with validation and defaults
//!
//! Loaded from an optional TOML file, then overridden from `ROULETTE_*`
//! environment variables, then validated.

use crate::errors::{ConfigurationError, RouletteResult};
use crate::games::bets::TableLimits;
use crate::games::vrf_process::DEFAULT_MAX_RECORDS;
use serde::{Deserialize, Serialize};
use std::env;
use std::path::Path;
use std::time::Duration;

#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct RouletteConfig {
    #[serde(default)]
    pub provider: ProviderConfig,
    #[serde(default)]
    pub table: TableLimits,
    #[serde(default)]
    pub oracle: OracleConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Where outcomes come from
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ProviderConfig {
    /// Randomness process to address; unset means local draws only
    pub process_id: Option<String>,
    /// Base URL of a `roulette-oracle` serving that process
    pub oracle_url: Option<String>,
    pub request_timeout_ms: u64,
    /// Ignore `process_id` and always draw locally
    pub local_only: bool,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            process_id: None,
            oracle_url: None,
            request_timeout_ms: 5_000,
            local_only: false,
        }
    }
}

impl ProviderConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    /// Process id to use, if external outcomes are enabled
    pub fn active_process_id(&self) -> Option<&str> {
        if self.local_only {
            return None;
        }
        self.process_id.as_deref().filter(|id| !id.trim().is_empty())
    }
}

/// HTTP host for the randomness process
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct OracleConfig {
    pub host: String,
    pub port: u16,
    /// Process id the oracle answers to
    pub process_id: String,
    pub request_timeout_secs: u64,
    pub cors_origins: Vec<String>,
    /// Served rounds kept for verification; the oldest are dropped first
    pub max_rounds: usize,
}

impl Default for OracleConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8787,
            process_id: "roulette-oracle".to_string(),
            request_timeout_secs: 30,
            cors_origins: vec!["*".to_string()],
            max_rounds: DEFAULT_MAX_RECORDS,
        }
    }
}

impl OracleConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn url(&self) -> String {
        format!("http://{}", self.bind_address())
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LoggingConfig {
    /// `EnvFilter` directive used when `RUST_LOG` is unset
    pub filter: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "roulette=info,tower_http=info".to_string(),
        }
    }
}

impl RouletteConfig {
    /// Never contacts a randomness process
    pub fn local_only() -> Self {
        Self {
            provider: ProviderConfig {
                process_id: None,
                local_only: true,
                ..ProviderConfig::default()
            },
            ..Self::default()
        }
    }

    /// Talks to a local oracle with short timeouts and verbose logs
    pub fn development() -> Self {
        let oracle = OracleConfig::default();
        Self {
            provider: ProviderConfig {
                process_id: Some(oracle.process_id.clone()),
                oracle_url: Some(oracle.url()),
                request_timeout_ms: 2_000,
                local_only: false,
            },
            table: TableLimits::default(),
            oracle,
            logging: LoggingConfig {
                filter: "roulette=debug,tower_http=debug".to_string(),
            },
        }
    }

    pub fn validate(&self) -> Result<(), ConfigurationError> {
        if self.provider.request_timeout_ms == 0 {
            return Err(invalid("provider.request_timeout_ms", "0", "Timeout cannot be zero"));
        }
        if let Some(id) = &self.provider.process_id {
            if id.trim().is_empty() {
                return Err(invalid("provider.process_id", id, "Process id cannot be blank"));
            }
        }
        if let Some(url) = &self.provider.oracle_url {
            if !url.starts_with("http://") {
                return Err(invalid(
                    "provider.oracle_url",
                    url,
                    "Oracle URL must start with http://",
                ));
            }
        }

        let table = &self.table;
        if !(table.min_stake.is_finite() && table.min_stake > 0.0) {
            return Err(invalid(
                "table.min_stake",
                &table.min_stake.to_string(),
                "Minimum stake must be positive",
            ));
        }
        if !table.max_stake.is_finite() || table.max_stake < table.min_stake {
            return Err(invalid(
                "table.max_stake",
                &table.max_stake.to_string(),
                "Maximum stake must be at least the minimum stake",
            ));
        }
        if table.max_bets == 0 {
            return Err(invalid("table.max_bets", "0", "Bet slip must hold at least one bet"));
        }

        if self.oracle.host.is_empty() {
            return Err(ConfigurationError::MissingRequired("oracle.host".to_string()));
        }
        if self.oracle.port == 0 {
            return Err(invalid("oracle.port", "0", "Port cannot be zero"));
        }
        if self.oracle.process_id.trim().is_empty() {
            return Err(ConfigurationError::MissingRequired("oracle.process_id".to_string()));
        }
        if self.oracle.request_timeout_secs == 0 {
            return Err(invalid("oracle.request_timeout_secs", "0", "Timeout cannot be zero"));
        }
        if self.oracle.max_rounds == 0 {
            return Err(invalid("oracle.max_rounds", "0", "Must keep at least one round"));
        }

        if self.logging.filter.trim().is_empty() {
            return Err(ConfigurationError::MissingRequired("logging.filter".to_string()));
        }

        Ok(())
    }
}

fn invalid(field: &str, value: &str, reason: &str) -> ConfigurationError {
    ConfigurationError::InvalidValue {
        field: field.to_string(),
        value: value.to_string(),
        reason: reason.to_string(),
    }
}

/// Configuration loader with environment variable support
#[derive(Debug, Default)]
pub struct ConfigLoader {
    config_path: Option<String>,
}

impl ConfigLoader {
    pub fn new() -> Self {
        Self { config_path: None }
    }

    pub fn with_path<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.config_path = Some(path.as_ref().to_string_lossy().to_string());
        self
    }

    /// Load configuration from file and environment variables
    pub fn load(&self) -> RouletteResult<RouletteConfig> {
        let mut config = match &self.config_path {
            Some(path) => self.load_from_file(path)?,
            None => RouletteConfig::default(),
        };

        apply_overrides(&mut config, |key| env::var(key).ok())?;
        config.validate()?;

        Ok(config)
    }

    fn load_from_file(&self, path: &str) -> RouletteResult<RouletteConfig> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            ConfigurationError::LoadFailed(format!("Failed to read {}: {}", path, e))
        })?;

        toml::from_str(&content).map_err(|e| {
            ConfigurationError::LoadFailed(format!("Failed to parse TOML: {}", e)).into()
        })
    }

    pub fn save(&self, config: &RouletteConfig, path: &str) -> RouletteResult<()> {
        let toml_string = toml::to_string_pretty(config).map_err(|e| {
            ConfigurationError::SaveFailed(format!("Failed to serialize config: {}", e))
        })?;

        std::fs::write(path, toml_string).map_err(|e| {
            ConfigurationError::SaveFailed(format!("Failed to write to {}: {}", path, e)).into()
        })
    }
}

/// Apply `ROULETTE_*` overrides read through `lookup`
fn apply_overrides<F>(config: &mut RouletteConfig, lookup: F) -> Result<(), ConfigurationError>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(process_id) = lookup("ROULETTE_PROCESS_ID") {
        config.provider.process_id = Some(process_id).filter(|id| !id.trim().is_empty());
    }
    if let Some(url) = lookup("ROULETTE_ORACLE_URL") {
        config.provider.oracle_url = Some(url).filter(|url| !url.trim().is_empty());
    }
    if let Some(timeout) = lookup("ROULETTE_REQUEST_TIMEOUT_MS") {
        config.provider.request_timeout_ms = timeout.parse().map_err(|_| {
            invalid("ROULETTE_REQUEST_TIMEOUT_MS", &timeout, "Invalid timeout value")
        })?;
    }
    if let Some(host) = lookup("ROULETTE_ORACLE_HOST") {
        config.oracle.host = host;
    }
    if let Some(port) = lookup("ROULETTE_ORACLE_PORT") {
        config.oracle.port = port
            .parse()
            .map_err(|_| invalid("ROULETTE_ORACLE_PORT", &port, "Invalid port number"))?;
    }
    if let Some(filter) = lookup("ROULETTE_LOG") {
        config.logging.filter = filter;
    }

    Ok(())
}

/// Write the default configuration to `path`
pub fn generate_sample_config(path: &str) -> RouletteResult<()> {
    ConfigLoader::new().save(&RouletteConfig::default(), path)
}
