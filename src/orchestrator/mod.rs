//! Orchestration: the single `execute` entry point and everything around it.
//!
//! [`Orchestrator`] owns one response cache, one usage tracker and one
//! upstream transport for its whole lifetime. Typed wrappers for the
//! built-in operations live in `operations`; prompt text in `prompts`.

mod builder;
mod operations;
pub mod parse;
mod prompts;
mod service;

pub use builder::{DEFAULT_REQUEST_TIMEOUT, Muninn, MuninnBuilder};
pub use service::Orchestrator;
