//! Upstream transports.
//!
//! [`ChatTransport`] is the seam between the orchestrator and the model
//! API; [`HttpTransport`] is the production implementation.

#[cfg(feature = "http")]
pub mod http;
pub mod traits;

#[cfg(feature = "http")]
pub use http::HttpTransport;
pub use traits::ChatTransport;

/// Default base URL for the upstream API.
pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
