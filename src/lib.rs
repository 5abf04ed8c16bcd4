//! Muninn - cached, budgeted, retrying orchestration for AI text-generation APIs
//!
//! Every AI call an application makes goes through one entry point,
//! [`Orchestrator::execute`], which composes:
//!
//! - a per-operation response cache with TTL and bounded size,
//! - a sliding-window usage budget (requests per hour and day, cost per day),
//! - exponential-backoff retry where each attempt gets its own time box,
//! - cost accounting from the token counts the upstream reports.
//!
//! The upstream API sits behind the [`ChatTransport`] trait;
//! [`HttpTransport`](transport::HttpTransport) (feature `http`, on by
//! default) speaks the OpenAI-compatible chat-completions protocol.
//!
//! # Example
//!
//! ```rust,no_run
//! use muninn::Muninn;
//!
//! #[tokio::main]
//! async fn main() -> muninn::Result<()> {
//!     let orchestrator = Muninn::builder()
//!         .http("sk-your-key")
//!         .build()?;
//!
//!     let score = orchestrator
//!         .score_ats("Senior Rust engineer, 8 years...", "We are hiring a Rust developer...")
//!         .await?;
//!     println!("ATS score: {}", score.score);
//!
//!     // The same inputs are now served from the cache.
//!     let again = orchestrator
//!         .score_ats("Senior Rust engineer, 8 years...", "We are hiring a Rust developer...")
//!         .await?;
//!     assert_eq!(score, again);
//!
//!     println!("{:?}", orchestrator.usage_stats());
//!     Ok(())
//! }
//! ```
//!
//! # Custom operations
//!
//! `execute` is generic over the result type and the parser, so callers can
//! run their own prompts through the same cache, budget and retry policy:
//!
//! ```rust,ignore
//! let summary: String = orchestrator
//!     .execute(
//!         OperationType::JobExtraction,
//!         vec![Message::user("Summarise this posting: ...")],
//!         &json!({ "posting_id": 42 }),
//!         muninn::parse::text,
//!         false,
//!     )
//!     .await?;
//! ```

pub mod cache;
pub mod config;
pub mod error;
pub mod orchestrator;
pub mod retry;
pub mod telemetry;
pub mod transport;
pub mod types;
pub mod usage;
mod version;

// Re-export main types at crate root
pub use cache::{CacheConfig, CacheStats, ResponseCache};
pub use config::{Config, Secrets};
pub use error::{MuninnError, Result};
pub use orchestrator::{Muninn, MuninnBuilder, Orchestrator, parse};
pub use retry::RetryConfig;
pub use transport::ChatTransport;
pub use usage::{LimitDecision, LimitsConfig, UsageStats, UsageTracker};
pub use version::{GIT_BRANCH, GIT_SHA, PKG_VERSION, git_dirty, short_sha, version_string};

// Re-export all types
pub use types::{
    AtsScore, CachePolicy, CompletionRequest, CompletionResponse, JobPosting, Message,
    ModelConfig, ModelTable, OperationType, Role, SkillGapAnalysis, Usage,
};
