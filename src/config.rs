//! File configuration and secrets.
//!
//! Configuration is loaded from TOML with the following resolution order:
//! 1. `--config <path>` (explicit; an error if it does not exist)
//! 2. `~/.muninn/config.toml` (user)
//! 3. `/etc/muninn/config.toml` (system)
//! 4. built-in defaults
//!
//! Every field has a default, so a file only needs the values it changes.
//!
//! Secrets are loaded separately with mandatory permission checks from
//! `~/.muninn/secrets.toml` (must be 0600 or 0400), falling back to the
//! `MUNINN_API_KEY` and `OPENAI_API_KEY` environment variables.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::cache::CacheConfig;
use crate::retry::{DEFAULT_RETRYABLE_STATUS_CODES, RetryConfig};
use crate::transport::DEFAULT_BASE_URL;
use crate::types::{ModelConfig, ModelTable, OperationType};
use crate::usage::{LimitsConfig, ModelPrice, PriceTable};
use crate::{MuninnError, Result};

/// Environment variables consulted for the API key, in order.
const API_KEY_ENV_VARS: &[&str] = &["MUNINN_API_KEY", "OPENAI_API_KEY"];

/// Top-level configuration file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub upstream: UpstreamConfig,
    #[serde(default)]
    pub cache: CacheSection,
    #[serde(default)]
    pub retry: RetrySection,
    #[serde(default)]
    pub limits: LimitsConfig,
    /// Per-operation model overrides, keyed by operation tag
    /// (e.g. `[models.ats_scoring]`).
    #[serde(default)]
    pub models: BTreeMap<String, ModelConfig>,
    /// Per-model price overrides (e.g. `[pricing."gpt-4o"]`).
    #[serde(default)]
    pub pricing: BTreeMap<String, ModelPrice>,
}

/// Upstream endpoint settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpstreamConfig {
    /// Base URL of the OpenAI-compatible API.
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Per-attempt time box in seconds (default: 60).
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

impl UpstreamConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_request_timeout_secs() -> u64 {
    60
}

/// `[cache]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheSection {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_max_entries")]
    pub max_entries: usize,
    #[serde(default = "default_ttl_secs")]
    pub ttl_secs: u64,
    /// Background sweep interval in seconds; 0 disables the sweep.
    #[serde(default = "default_sweep_interval_secs")]
    pub sweep_interval_secs: u64,
}

impl Default for CacheSection {
    fn default() -> Self {
        Self {
            enabled: true,
            max_entries: default_max_entries(),
            ttl_secs: default_ttl_secs(),
            sweep_interval_secs: default_sweep_interval_secs(),
        }
    }
}

impl CacheSection {
    pub fn to_cache_config(&self) -> CacheConfig {
        let sweep = (self.sweep_interval_secs > 0)
            .then(|| Duration::from_secs(self.sweep_interval_secs));
        CacheConfig::new()
            .enabled(self.enabled)
            .max_entries(self.max_entries)
            .ttl(Duration::from_secs(self.ttl_secs))
            .sweep_interval(sweep)
    }
}

fn default_true() -> bool {
    true
}

fn default_max_entries() -> usize {
    1_000
}

fn default_ttl_secs() -> u64 {
    3_600
}

fn default_sweep_interval_secs() -> u64 {
    300
}

/// `[retry]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrySection {
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_initial_delay_ms")]
    pub initial_delay_ms: u64,
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,
    #[serde(default = "default_backoff_multiplier")]
    pub backoff_multiplier: f64,
    #[serde(default = "default_true")]
    pub jitter: bool,
    #[serde(default = "default_retryable_status_codes")]
    pub retryable_status_codes: Vec<u16>,
}

impl Default for RetrySection {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            initial_delay_ms: default_initial_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
            backoff_multiplier: default_backoff_multiplier(),
            jitter: true,
            retryable_status_codes: default_retryable_status_codes(),
        }
    }
}

impl RetrySection {
    pub fn to_retry_config(&self) -> RetryConfig {
        RetryConfig::new()
            .max_retries(self.max_retries)
            .initial_delay(Duration::from_millis(self.initial_delay_ms))
            .max_delay(Duration::from_millis(self.max_delay_ms))
            .backoff_multiplier(self.backoff_multiplier)
            .jitter(self.jitter)
            .retryable_status_codes(self.retryable_status_codes.clone())
    }
}

fn default_max_retries() -> u32 {
    3
}

fn default_initial_delay_ms() -> u64 {
    1_000
}

fn default_max_delay_ms() -> u64 {
    10_000
}

fn default_backoff_multiplier() -> f64 {
    2.0
}

fn default_retryable_status_codes() -> Vec<u16> {
    DEFAULT_RETRYABLE_STATUS_CODES.to_vec()
}

impl Config {
    /// Load configuration from the standard locations.
    ///
    /// Falls back to built-in defaults when no file exists and none was
    /// requested explicitly.
    pub fn load(explicit_path: Option<&Path>) -> Result<Self> {
        match Self::resolve_config_path(explicit_path)? {
            Some(path) => Self::load_from_file(&path),
            None => Ok(Self::default()),
        }
    }

    /// Load configuration from one file.
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            MuninnError::Configuration(format!("Failed to read config file {path:?}: {e}"))
        })?;
        Self::from_toml_str(&content).map_err(|e| {
            MuninnError::Configuration(format!("Failed to parse config file {path:?}: {e}"))
        })
    }

    /// Parse configuration from TOML text.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Self =
            toml::from_str(content).map_err(|e| MuninnError::Configuration(e.to_string()))?;
        // surface unknown operation tags at load time rather than at build
        config.model_table()?;
        Ok(config)
    }

    /// Render as TOML.
    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| MuninnError::Configuration(e.to_string()))
    }

    /// Resolve the config file path; `None` means "use defaults".
    fn resolve_config_path(explicit: Option<&Path>) -> Result<Option<PathBuf>> {
        if let Some(path) = explicit {
            if path.exists() {
                return Ok(Some(path.to_path_buf()));
            }
            return Err(MuninnError::Configuration(format!(
                "Config file not found: {path:?}"
            )));
        }

        // User config
        if let Some(home) = dirs::home_dir() {
            let user_config = home.join(".muninn").join("config.toml");
            if user_config.exists() {
                return Ok(Some(user_config));
            }
        }

        // System config
        let system_config = PathBuf::from("/etc/muninn/config.toml");
        if system_config.exists() {
            return Ok(Some(system_config));
        }

        Ok(None)
    }

    /// Built-in model table with the `[models.*]` overrides applied.
    pub fn model_table(&self) -> Result<ModelTable> {
        let mut table = ModelTable::default();
        for (tag, model) in &self.models {
            let operation: OperationType = tag.parse().map_err(|_| {
                MuninnError::Configuration(format!("unknown operation in [models]: {tag}"))
            })?;
            table.set(operation, model.clone());
        }
        Ok(table)
    }

    /// Built-in price table with the `[pricing.*]` overrides applied.
    pub fn price_table(&self) -> PriceTable {
        self.pricing
            .iter()
            .fold(PriceTable::default(), |table, (model, price)| {
                table.with_price(model.clone(), *price)
            })
    }
}

/// Secrets configuration (API keys).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Secrets {
    #[serde(default)]
    pub upstream: Option<ApiKeySecret>,
}

/// A single API key secret.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiKeySecret {
    pub api_key: String,
}

impl Secrets {
    /// Load `~/.muninn/secrets.toml` if it exists.
    ///
    /// Returns empty secrets if there is no file (the key may come from the
    /// environment).
    pub fn load() -> Result<Self> {
        if let Some(home) = dirs::home_dir() {
            let user_secrets = home.join(".muninn").join("secrets.toml");
            if user_secrets.exists() {
                return Self::load_from_file(&user_secrets);
            }
        }
        Ok(Secrets::default())
    }

    /// Load secrets from one file, rejecting insecure permissions.
    pub fn load_from_file(path: &Path) -> Result<Self> {
        Self::check_permissions(path)?;
        let content = fs::read_to_string(path).map_err(|e| {
            MuninnError::Configuration(format!("Failed to read secrets file {path:?}: {e}"))
        })?;
        toml::from_str(&content).map_err(|e| {
            MuninnError::Configuration(format!("Failed to parse secrets file {path:?}: {e}"))
        })
    }

    /// Check that the secrets file has secure permissions (0600 or 0400).
    #[cfg(unix)]
    fn check_permissions(path: &Path) -> Result<()> {
        use std::os::unix::fs::PermissionsExt;

        let metadata = fs::metadata(path).map_err(|e| {
            MuninnError::Configuration(format!("Failed to stat secrets file {path:?}: {e}"))
        })?;

        let mode = metadata.permissions().mode();
        // Reject if group or other bits are set
        if mode & 0o077 != 0 {
            return Err(MuninnError::Configuration(format!(
                "Secrets file {path:?} has insecure permissions {:o}. Must be 0600 or 0400.",
                mode & 0o777
            )));
        }

        Ok(())
    }

    #[cfg(not(unix))]
    fn check_permissions(_path: &Path) -> Result<()> {
        Ok(())
    }

    /// The upstream API key, falling back to the environment.
    pub fn api_key(&self) -> Option<String> {
        self.upstream
            .as_ref()
            .map(|s| s.api_key.clone())
            .or_else(|| {
                API_KEY_ENV_VARS
                    .iter()
                    .find_map(|var| std::env::var(var).ok())
                    .filter(|key| !key.is_empty())
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn default_config_has_expected_values() {
        let config = Config::default();
        assert_eq!(config.upstream.base_url, "https://api.openai.com/v1");
        assert_eq!(config.upstream.request_timeout_secs, 60);
        assert!(config.cache.enabled);
        assert_eq!(config.cache.max_entries, 1000);
        assert_eq!(config.retry.max_retries, 3);
        assert_eq!(config.retry.retryable_status_codes, vec![408, 429, 500, 502, 503, 504]);
        assert_eq!(config.limits.max_requests_per_hour, 100);
    }

    #[test]
    fn parse_minimal_config() {
        let toml = r#"
            [cache]
            max_entries = 50
        "#;
        let config = Config::from_toml_str(toml).unwrap();
        assert_eq!(config.cache.max_entries, 50);
        // Defaults preserved
        assert_eq!(config.cache.ttl_secs, 3600);
        assert_eq!(config.limits.max_requests_per_day, 1000);
    }

    #[test]
    fn parse_full_config() {
        let toml = r#"
            [upstream]
            base_url = "http://localhost:8080/v1"
            request_timeout_secs = 30

            [cache]
            enabled = false
            ttl_secs = 600
            sweep_interval_secs = 0

            [retry]
            max_retries = 5
            initial_delay_ms = 250
            jitter = false
            retryable_status_codes = [429, 503]

            [limits]
            max_requests_per_hour = 20
            max_daily_cost = 1.5

            [models.ats_scoring]
            model = "gpt-4o"
            temperature = 0.0
            max_tokens = 800

            [pricing."local-llama"]
            input_per_million = 0.0
            output_per_million = 0.0
        "#;
        let config = Config::from_toml_str(toml).unwrap();
        assert_eq!(config.upstream.request_timeout(), Duration::from_secs(30));

        let cache = config.cache.to_cache_config();
        assert!(!cache.enabled);
        assert_eq!(cache.ttl, Duration::from_secs(600));
        assert_eq!(cache.sweep_interval, None);

        let retry = config.retry.to_retry_config();
        assert_eq!(retry.max_retries, 5);
        assert_eq!(retry.initial_delay, Duration::from_millis(250));
        assert!(!retry.jitter);
        assert_eq!(retry.retryable_status_codes, vec![429, 503]);

        assert_eq!(config.limits.max_requests_per_hour, 20);
        assert_eq!(config.limits.max_requests_per_day, 1000);
        assert_eq!(config.limits.max_daily_cost, 1.5);

        let models = config.model_table().unwrap();
        assert_eq!(models.get(OperationType::AtsScoring).max_tokens, 800);
        // untouched operations keep their defaults
        assert_eq!(models.get(OperationType::JobExtraction).model, "gpt-4o-mini");

        let prices = config.price_table();
        assert!(prices.knows("local-llama"));
        assert!(prices.knows("gpt-4o"));
    }

    #[test]
    fn unknown_operation_is_rejected() {
        let toml = r#"
            [models.poetry]
            model = "gpt-4o"
            temperature = 1.0
            max_tokens = 100
        "#;
        let err = Config::from_toml_str(toml).unwrap_err();
        assert!(err.to_string().contains("unknown operation"));
    }

    #[test]
    fn config_round_trips_through_toml() {
        let rendered = Config::default().to_toml_string().unwrap();
        let parsed = Config::from_toml_str(&rendered).unwrap();
        assert_eq!(parsed.cache.max_entries, 1000);
        assert_eq!(parsed.retry.backoff_multiplier, 2.0);
    }

    #[test]
    fn config_not_found_returns_error() {
        let result = Config::load(Some(Path::new("/nonexistent/config.toml")));
        let err = result.unwrap_err().to_string();
        assert!(err.contains("Config file not found"));
    }

    #[test]
    fn load_explicit_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[limits]\nmax_requests_per_hour = 7").unwrap();
        let config = Config::load(Some(file.path())).unwrap();
        assert_eq!(config.limits.max_requests_per_hour, 7);
    }

    #[test]
    fn parse_secrets() {
        let toml = r#"
            [upstream]
            api_key = "sk-test-key"
        "#;
        let secrets: Secrets = toml::from_str(toml).unwrap();
        assert_eq!(secrets.api_key(), Some("sk-test-key".to_string()));
    }

    #[cfg(unix)]
    #[test]
    fn secrets_with_open_permissions_are_rejected() {
        use std::os::unix::fs::PermissionsExt;

        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[upstream]\napi_key = \"sk-test\"").unwrap();
        fs::set_permissions(file.path(), fs::Permissions::from_mode(0o644)).unwrap();
        let err = Secrets::load_from_file(file.path()).unwrap_err();
        assert!(err.to_string().contains("insecure permissions"));

        fs::set_permissions(file.path(), fs::Permissions::from_mode(0o600)).unwrap();
        let secrets = Secrets::load_from_file(file.path()).unwrap();
        assert_eq!(secrets.upstream.unwrap().api_key, "sk-test");
    }
}
