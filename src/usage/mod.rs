//! Usage accounting and sliding-window budget checks.
//!
//! [`UsageTracker`] keeps one [`UsageRecord`] per completed upstream call
//! for the last 24 hours and answers two questions from it: "may another
//! call proceed?" ([`UsageTracker::check_limits`]) and "what have we spent?"
//! ([`UsageTracker::stats`], [`UsageTracker::breakdown`]).
//!
//! Windows are sliding: every query filters the live records against
//! `now - 1h` / `now - 24h` rather than keeping bucketed counters. Records
//! live in memory only and do not survive a restart.
//!
//! # Concurrency
//!
//! All methods are safe to call concurrently, but a `check_limits` followed
//! later by `record` is not atomic: two callers can both pass the check and
//! both record. Budgets are best-effort under concurrent load.

pub mod pricing;

use std::collections::{BTreeMap, VecDeque};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::{Duration, SystemTime};

use serde::{Deserialize, Serialize};
use tokio::time::Instant;

pub use pricing::{ModelPrice, PriceTable};

const HOUR: Duration = Duration::from_secs(60 * 60);
const DAY: Duration = Duration::from_secs(24 * 60 * 60);

/// Budget thresholds.
///
/// ```rust
/// # use muninn::LimitsConfig;
/// let limits = LimitsConfig::new()
///     .max_requests_per_hour(50)
///     .max_daily_cost(2.5);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LimitsConfig {
    /// Requests allowed in any trailing hour. Default: 100.
    pub max_requests_per_hour: u32,
    /// Requests allowed in any trailing 24 hours. Default: 1,000.
    pub max_requests_per_day: u32,
    /// Cost allowed in any trailing 24 hours. Default: 10.0.
    pub max_daily_cost: f64,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_requests_per_hour: 100,
            max_requests_per_day: 1_000,
            max_daily_cost: 10.0,
        }
    }
}

impl LimitsConfig {
    /// Create a new config with sensible defaults.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn max_requests_per_hour(mut self, n: u32) -> Self {
        self.max_requests_per_hour = n;
        self
    }

    pub fn max_requests_per_day(mut self, n: u32) -> Self {
        self.max_requests_per_day = n;
        self
    }

    pub fn max_daily_cost(mut self, cost: f64) -> Self {
        self.max_daily_cost = cost;
        self
    }
}

/// One completed upstream call.
///
/// Windows are measured on the monotonic `recorded_at`; `timestamp` is the
/// wall-clock time of the same moment, for export.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UsageRecord {
    #[serde(skip)]
    pub recorded_at: Instant,
    pub timestamp: SystemTime,
    pub operation: String,
    pub model: String,
    pub input_tokens: u32,
    pub output_tokens: u32,
    pub cost: f64,
}

/// Request count and cost over one window.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct WindowUsage {
    pub requests: usize,
    pub cost: f64,
}

impl WindowUsage {
    fn add(&mut self, record: &UsageRecord) {
        self.requests += 1;
        self.cost += record.cost;
    }
}

/// Usage over the trailing hour, trailing day, and all live records.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct UsageStats {
    pub hourly: WindowUsage,
    pub daily: WindowUsage,
    pub total: WindowUsage,
}

/// Which threshold denied a call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LimitKind {
    Hourly,
    Daily,
    Cost,
}

impl LimitKind {
    pub fn as_str(self) -> &'static str {
        match self {
            LimitKind::Hourly => "hourly",
            LimitKind::Daily => "daily",
            LimitKind::Cost => "cost",
        }
    }
}

/// Outcome of [`UsageTracker::check_limits`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LimitDecision {
    pub allowed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<LimitKind>,
}

impl LimitDecision {
    fn allow() -> Self {
        Self {
            allowed: true,
            reason: None,
            limit: None,
        }
    }

    fn deny(limit: LimitKind, reason: String) -> Self {
        Self {
            allowed: false,
            reason: Some(reason),
            limit: Some(limit),
        }
    }
}

/// In-memory usage log with sliding-window budget checks.
pub struct UsageTracker {
    limits: LimitsConfig,
    // append-only in time order, so the oldest records sit at the front
    records: Mutex<VecDeque<UsageRecord>>,
}

impl UsageTracker {
    /// Create an empty tracker enforcing `limits`.
    pub fn new(limits: LimitsConfig) -> Self {
        Self {
            limits,
            records: Mutex::new(VecDeque::new()),
        }
    }

    /// Configured thresholds.
    pub fn limits(&self) -> &LimitsConfig {
        &self.limits
    }

    /// Lock the record log, dropping everything older than 24 hours.
    fn live(&self, now: Instant) -> MutexGuard<'_, VecDeque<UsageRecord>> {
        let mut records = self.records.lock().unwrap_or_else(PoisonError::into_inner);
        while records
            .front()
            .is_some_and(|r| now.saturating_duration_since(r.recorded_at) > DAY)
        {
            records.pop_front();
        }
        records
    }

    /// Append a record stamped with the current time, then prune.
    pub fn record(
        &self,
        operation: &str,
        model: &str,
        input_tokens: u32,
        output_tokens: u32,
        cost: f64,
    ) {
        let now = Instant::now();
        let mut records = self.live(now);
        records.push_back(UsageRecord {
            recorded_at: now,
            timestamp: SystemTime::now(),
            operation: operation.to_owned(),
            model: model.to_owned(),
            input_tokens,
            output_tokens,
            cost,
        });
    }

    /// Totals over the trailing hour, trailing day, and all live records.
    pub fn stats(&self) -> UsageStats {
        let now = Instant::now();
        let records = self.live(now);
        let mut stats = UsageStats::default();
        for record in records.iter() {
            let age = now.saturating_duration_since(record.recorded_at);
            if age < HOUR {
                stats.hourly.add(record);
            }
            if age < DAY {
                stats.daily.add(record);
            }
            stats.total.add(record);
        }
        stats
    }

    /// Decide whether another upstream call may proceed.
    ///
    /// Checks, in order, the hourly request cap, the daily request cap and
    /// the daily cost cap; the first exceeded threshold wins.
    pub fn check_limits(&self) -> LimitDecision {
        let stats = self.stats();
        let limits = &self.limits;

        if stats.hourly.requests >= limits.max_requests_per_hour as usize {
            return LimitDecision::deny(
                LimitKind::Hourly,
                format!(
                    "Hourly request limit reached ({} requests/hour)",
                    limits.max_requests_per_hour
                ),
            );
        }
        if stats.daily.requests >= limits.max_requests_per_day as usize {
            return LimitDecision::deny(
                LimitKind::Daily,
                format!(
                    "Daily request limit reached ({} requests/day)",
                    limits.max_requests_per_day
                ),
            );
        }
        if stats.daily.cost >= limits.max_daily_cost {
            return LimitDecision::deny(
                LimitKind::Cost,
                format!(
                    "Daily cost limit reached ({:.2} spent, limit {:.2}/day)",
                    stats.daily.cost, limits.max_daily_cost
                ),
            );
        }
        LimitDecision::allow()
    }

    /// Per-operation totals over all live records.
    pub fn breakdown(&self) -> BTreeMap<String, WindowUsage> {
        let records = self.live(Instant::now());
        let mut breakdown: BTreeMap<String, WindowUsage> = BTreeMap::new();
        for record in records.iter() {
            breakdown
                .entry(record.operation.clone())
                .or_default()
                .add(record);
        }
        breakdown
    }

    /// Copy of every live record, oldest first.
    pub fn export(&self) -> Vec<UsageRecord> {
        self.live(Instant::now()).iter().cloned().collect()
    }

    /// Number of live records.
    pub fn len(&self) -> usize {
        self.live(Instant::now()).len()
    }

    /// Whether no live records exist.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Forget every record.
    pub fn reset(&self) {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }
}

impl Default for UsageTracker {
    fn default() -> Self {
        Self::new(LimitsConfig::default())
    }
}
