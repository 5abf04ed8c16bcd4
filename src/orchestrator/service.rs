//! The orchestrating service.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::cache::{CacheStats, ResponseCache, SweepHandle};
use crate::retry::{RetryConfig, with_retry_and_timeout};
use crate::telemetry;
use crate::transport::ChatTransport;
use crate::types::{CompletionRequest, Message, ModelConfig, ModelTable, OperationType, Usage};
use crate::usage::{LimitDecision, PriceTable, UsageRecord, UsageStats, UsageTracker, WindowUsage};
use crate::{MuninnError, Result};

/// Composes the response cache, usage budget, retry engine and upstream
/// transport behind a single [`execute`](Orchestrator::execute) entry point.
///
/// Built with [`Muninn::builder()`](crate::Muninn::builder). All methods take
/// `&self`; share an orchestrator across tasks with `Arc`.
pub struct Orchestrator {
    transport: Arc<dyn ChatTransport>,
    cache: Arc<ResponseCache<Value>>,
    usage: UsageTracker,
    retry: RetryConfig,
    request_timeout: Duration,
    models: ModelTable,
    pricing: PriceTable,
    sweeper: Mutex<Option<SweepHandle>>,
}

impl fmt::Debug for Orchestrator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Orchestrator")
            .field("transport", &self.transport.name())
            .field("cache", &self.cache.stats())
            .field("limits", self.usage.limits())
            .field("retry", &self.retry)
            .field("request_timeout", &self.request_timeout)
            .finish_non_exhaustive()
    }
}

pub(crate) struct Parts {
    pub transport: Arc<dyn ChatTransport>,
    pub cache: Arc<ResponseCache<Value>>,
    pub usage: UsageTracker,
    pub retry: RetryConfig,
    pub request_timeout: Duration,
    pub models: ModelTable,
    pub pricing: PriceTable,
    pub sweeper: Option<SweepHandle>,
}

impl Orchestrator {
    pub(crate) fn from_parts(parts: Parts) -> Self {
        Self {
            transport: parts.transport,
            cache: parts.cache,
            usage: parts.usage,
            retry: parts.retry,
            request_timeout: parts.request_timeout,
            models: parts.models,
            pricing: parts.pricing,
            sweeper: Mutex::new(parts.sweeper),
        }
    }

    /// Run one logical AI call.
    ///
    /// 1. Unless `skip_cache`, return a cached result for
    ///    `(operation, cache_params)` if one is live.
    /// 2. Refuse with [`MuninnError::RateLimitExceeded`] if the usage budget
    ///    is exhausted. No upstream call is made.
    /// 3. Call the transport, each attempt time-boxed and transient failures
    ///    retried with backoff.
    /// 4. Record token usage and estimated cost, if the upstream reported it.
    /// 5. Parse the text with `parse`. A parse failure is terminal, is never
    ///    retried and is never cached.
    /// 6. Unless `skip_cache`, store the parsed result.
    pub async fn execute<T, F>(
        &self,
        operation: OperationType,
        messages: Vec<Message>,
        cache_params: &Value,
        parse: F,
        skip_cache: bool,
    ) -> Result<T>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce(&str) -> Result<T>,
    {
        let op = operation.as_str();

        if !skip_cache
            && let Some(value) = self.cache.get_with(op, cache_params, |stored| {
                T::deserialize(stored)
                    .inspect_err(|e| {
                        // stored under a different result type; refetch and overwrite
                        warn!(operation = op, error = %e, "ignoring undecodable cache entry");
                    })
                    .ok()
            })
        {
            debug!(operation = op, "serving cached result");
            metrics::counter!(telemetry::REQUESTS_TOTAL,
                "operation" => op,
                "status" => "cached",
            )
            .increment(1);
            return Ok(value);
        }

        let start = Instant::now();
        let result = self.call_upstream(operation, messages, parse).await;
        Self::record_request(op, start, result.is_ok());
        let value = result?;

        if !skip_cache {
            match serde_json::to_value(&value) {
                Ok(stored) => self.cache.set(op, cache_params, stored),
                Err(e) => warn!(operation = op, error = %e, "result not cacheable"),
            }
        }
        Ok(value)
    }

    async fn call_upstream<T, F>(
        &self,
        operation: OperationType,
        messages: Vec<Message>,
        parse: F,
    ) -> Result<T>
    where
        F: FnOnce(&str) -> Result<T>,
    {
        let op = operation.as_str();

        let decision = self.usage.check_limits();
        if !decision.allowed {
            let limit = decision.limit.map_or("unknown", |l| l.as_str());
            let reason = decision
                .reason
                .unwrap_or_else(|| "usage limit reached".to_string());
            metrics::counter!(telemetry::BUDGET_DENIALS_TOTAL, "limit" => limit).increment(1);
            warn!(operation = op, limit, %reason, "call refused by usage budget");
            return Err(MuninnError::RateLimitExceeded { reason });
        }

        let model = self.models.get(operation);
        let request = CompletionRequest {
            model: model.model.clone(),
            messages,
            temperature: model.temperature,
            max_tokens: model.max_tokens,
        };

        let response = with_retry_and_timeout(&self.retry, self.request_timeout, op, || {
            self.transport.complete(&request)
        })
        .await?;

        match response.usage {
            Some(usage) => self.record_usage(op, &model, &usage),
            None => debug!(operation = op, "upstream reported no token usage"),
        }

        let raw = response.text().ok_or_else(|| {
            MuninnError::InvalidResponse("completion carried no text".to_string())
        })?;
        parse(raw).map_err(|e| match e {
            MuninnError::InvalidResponse(_) => e,
            other => MuninnError::InvalidResponse(other.to_string()),
        })
    }

    fn record_usage(&self, op: &str, model: &ModelConfig, usage: &Usage) {
        let cost = self
            .pricing
            .estimate_cost(&model.model, usage.prompt_tokens, usage.completion_tokens);
        self.usage.record(
            op,
            &model.model,
            usage.prompt_tokens,
            usage.completion_tokens,
            cost,
        );

        metrics::counter!(telemetry::TOKENS_TOTAL, "direction" => "prompt")
            .increment(u64::from(usage.prompt_tokens));
        metrics::counter!(telemetry::TOKENS_TOTAL, "direction" => "completion")
            .increment(u64::from(usage.completion_tokens));
        metrics::counter!(telemetry::COST_MICROS_TOTAL, "model" => model.model.clone())
            .increment((cost * 1_000_000.0).round() as u64);

        info!(
            operation = op,
            model = %model.model,
            input_tokens = usage.prompt_tokens,
            output_tokens = usage.completion_tokens,
            cost,
            "upstream call completed"
        );
    }

    /// Record request outcome metrics (counter + histogram).
    fn record_request(op: &'static str, start: Instant, ok: bool) {
        let status = if ok { "ok" } else { "error" };
        metrics::counter!(telemetry::REQUESTS_TOTAL,
            "operation" => op,
            "status" => status,
        )
        .increment(1);
        metrics::histogram!(telemetry::REQUEST_DURATION_SECONDS, "operation" => op)
            .record(start.elapsed().as_secs_f64());
    }

    // ========================================================================
    // Admin surface
    // ========================================================================

    /// Usage over the trailing hour, trailing day and all live records.
    pub fn usage_stats(&self) -> UsageStats {
        self.usage.stats()
    }

    /// Per-operation usage totals.
    pub fn usage_breakdown(&self) -> BTreeMap<String, WindowUsage> {
        self.usage.breakdown()
    }

    /// Every live usage record, oldest first.
    pub fn export_usage(&self) -> Vec<UsageRecord> {
        self.usage.export()
    }

    /// Forget all usage records, reopening every budget.
    pub fn reset_usage(&self) {
        self.usage.reset();
    }

    /// Whether the next upstream call would be allowed.
    pub fn check_limits(&self) -> LimitDecision {
        self.usage.check_limits()
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    /// Drop every cached result and reset the hit counters.
    pub fn clear_cache(&self) {
        self.cache.clear();
    }

    /// Drop cached results for an operation, optionally narrowed to one
    /// parameter set. Returns the number of entries removed.
    pub fn invalidate_cache(&self, operation: OperationType, params: Option<&Value>) -> usize {
        self.cache.invalidate(operation.as_str(), params)
    }

    /// Switch caching on or off without discarding stored entries.
    pub fn set_cache_enabled(&self, enabled: bool) {
        self.cache.set_enabled(enabled);
    }

    /// Model configuration an operation is sent upstream with.
    pub fn model_config(&self, operation: OperationType) -> ModelConfig {
        self.models.get(operation)
    }

    /// Name of the configured transport.
    pub fn transport_name(&self) -> &str {
        self.transport.name()
    }

    /// Stop the background cache sweep, if one is running.
    pub fn shutdown(&self) {
        let sweeper = self
            .sweeper
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(sweeper) = sweeper {
            sweeper.stop();
            debug!("cache sweeper stopped");
        }
    }

    /// Whether a background cache sweep is running.
    pub fn has_sweeper(&self) -> bool {
        self.sweeper
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .is_some_and(|s| !s.is_finished())
    }
}
