//! Builder for configuring orchestrator instances

use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use tracing::debug;

use super::service::{Orchestrator, Parts};
use crate::cache::{CacheConfig, ResponseCache};
use crate::config::Config;
use crate::retry::RetryConfig;
use crate::transport::ChatTransport;
use crate::types::{ModelConfig, ModelTable, OperationType};
use crate::usage::{LimitsConfig, PriceTable, UsageTracker};
use crate::{MuninnError, Result};

/// Default per-attempt time box for upstream calls.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// Main entry point for creating orchestrator instances.
pub struct Muninn;

impl Muninn {
    /// Create a new builder for configuring the orchestrator.
    pub fn builder() -> MuninnBuilder {
        MuninnBuilder::new()
    }
}

/// Builder for configuring orchestrator instances.
pub struct MuninnBuilder {
    transport: Option<Arc<dyn ChatTransport>>,
    #[cfg(feature = "http")]
    api_key: Option<String>,
    #[cfg(feature = "http")]
    base_url: Option<String>,
    cache: CacheConfig,
    retry: RetryConfig,
    limits: LimitsConfig,
    request_timeout: Duration,
    models: ModelTable,
    pricing: PriceTable,
}

impl MuninnBuilder {
    pub fn new() -> Self {
        Self {
            transport: None,
            #[cfg(feature = "http")]
            api_key: None,
            #[cfg(feature = "http")]
            base_url: None,
            cache: CacheConfig::default(),
            retry: RetryConfig::default(),
            limits: LimitsConfig::default(),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            models: ModelTable::default(),
            pricing: PriceTable::default(),
        }
    }

    /// Seed every section from file configuration.
    ///
    /// The transport is not part of [`Config`]; set it (or an API key)
    /// afterwards.
    pub fn from_config(config: &Config) -> Result<Self> {
        let builder = Self::new()
            .cache(config.cache.to_cache_config())
            .retry(config.retry.to_retry_config())
            .limits(config.limits.clone())
            .request_timeout(config.upstream.request_timeout())
            .models(config.model_table()?)
            .pricing(config.price_table());
        #[cfg(feature = "http")]
        let builder = builder.base_url(config.upstream.base_url.clone());
        Ok(builder)
    }

    /// Use a custom upstream transport.
    pub fn transport(mut self, transport: Arc<dyn ChatTransport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Talk to an OpenAI-compatible endpoint over HTTP with this API key.
    #[cfg(feature = "http")]
    pub fn http(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    /// Override the HTTP endpoint (default: the OpenAI API).
    #[cfg(feature = "http")]
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    pub fn cache(mut self, config: CacheConfig) -> Self {
        self.cache = config;
        self
    }

    pub fn retry(mut self, config: RetryConfig) -> Self {
        self.retry = config;
        self
    }

    pub fn limits(mut self, config: LimitsConfig) -> Self {
        self.limits = config;
        self
    }

    /// Set the time box applied to each individual upstream attempt.
    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Override the model configuration for one operation.
    pub fn model(mut self, operation: OperationType, config: ModelConfig) -> Self {
        self.models.set(operation, config);
        self
    }

    /// Replace the whole model table.
    pub fn models(mut self, models: ModelTable) -> Self {
        self.models = models;
        self
    }

    pub fn pricing(mut self, pricing: PriceTable) -> Self {
        self.pricing = pricing;
        self
    }

    fn validate(&self) -> Result<()> {
        if self.cache.max_entries == 0 {
            return Err(MuninnError::Configuration(
                "cache max_entries must be at least 1".to_string(),
            ));
        }
        if self.cache.sweep_interval.is_some_and(|p| p.is_zero()) {
            return Err(MuninnError::Configuration(
                "cache sweep interval must be non-zero".to_string(),
            ));
        }
        if !(self.retry.backoff_multiplier.is_finite() && self.retry.backoff_multiplier >= 1.0) {
            return Err(MuninnError::Configuration(format!(
                "retry backoff_multiplier must be >= 1.0, got {}",
                self.retry.backoff_multiplier
            )));
        }
        if self.request_timeout.is_zero() {
            return Err(MuninnError::Configuration(
                "request timeout must be non-zero".to_string(),
            ));
        }
        if self.limits.max_daily_cost.is_nan() || self.limits.max_daily_cost < 0.0 {
            return Err(MuninnError::Configuration(format!(
                "max_daily_cost must be non-negative, got {}",
                self.limits.max_daily_cost
            )));
        }
        Ok(())
    }

    fn resolve_transport(&mut self) -> Result<Arc<dyn ChatTransport>> {
        if let Some(transport) = self.transport.take() {
            return Ok(transport);
        }
        #[cfg(feature = "http")]
        if let Some(key) = self.api_key.take() {
            use crate::transport::{DEFAULT_BASE_URL, HttpTransport};
            let base_url = self
                .base_url
                .take()
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
            return Ok(Arc::new(HttpTransport::with_base_url(key, base_url)?));
        }
        Err(MuninnError::NoTransport)
    }

    /// Build the orchestrator.
    ///
    /// Starts the background cache sweep when `sweep_interval` is set and
    /// a tokio runtime is running.
    pub fn build(mut self) -> Result<Orchestrator> {
        self.validate()?;
        let transport = self.resolve_transport()?;

        let cache = Arc::new(ResponseCache::<Value>::new(&self.cache));
        let sweeper = match self.cache.sweep_interval {
            Some(period) if tokio::runtime::Handle::try_current().is_ok() => {
                Some(cache.spawn_sweeper(period))
            }
            Some(_) => {
                debug!("no tokio runtime; cache relies on lazy expiry only");
                None
            }
            None => None,
        };

        debug!(
            transport = transport.name(),
            max_entries = self.cache.max_entries,
            max_retries = self.retry.max_retries,
            timeout_ms = self.request_timeout.as_millis() as u64,
            "orchestrator built"
        );

        Ok(Orchestrator::from_parts(Parts {
            transport,
            cache,
            usage: UsageTracker::new(self.limits),
            retry: self.retry,
            request_timeout: self.request_timeout,
            models: self.models,
            pricing: self.pricing,
            sweeper,
        }))
    }
}

impl Default for MuninnBuilder {
    fn default() -> Self {
        Self::new()
    }
}
