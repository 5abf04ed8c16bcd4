//! The upstream boundary.
//!
//! The orchestrator depends only on [`ChatTransport`]: one request in, one
//! completion (or a status-coded error) out. Implementations must not
//! retry or time-box on their own; the orchestrator does both around every
//! call.
//!
//! # Example
//!
//! ```ignore
//! struct Canned;
//!
//! #[async_trait]
//! impl ChatTransport for Canned {
//!     fn name(&self) -> &str {
//!         "canned"
//!     }
//!
//!     async fn complete(&self, _request: &CompletionRequest) -> Result<CompletionResponse> {
//!         Ok(CompletionResponse::from_text(r#"{"score": 85}"#))
//!     }
//! }
//! ```

use async_trait::async_trait;

use crate::Result;
use crate::types::{CompletionRequest, CompletionResponse};

/// A single-shot chat-completion call to the upstream model API.
#[async_trait]
pub trait ChatTransport: Send + Sync {
    /// Transport name for logging/debugging.
    fn name(&self) -> &str;

    /// Send one completion request.
    ///
    /// Failures should surface as [`MuninnError::Api`](crate::MuninnError::Api)
    /// when the upstream answered with a status code, and as
    /// [`MuninnError::Http`](crate::MuninnError::Http) when it could not be
    /// reached, so the retry classifier can tell transient from permanent.
    async fn complete(&self, request: &CompletionRequest) -> Result<CompletionResponse>;
}
