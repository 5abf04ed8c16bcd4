//! Caching subsystem.
//!
//! - [`ResponseCache`]: bounded, TTL-expiring store of parsed operation
//!   results, keyed on `(operation, sorted parameters)`. See the
//!   [`response`] module docs for expiry and eviction semantics.
//! - [`SweepHandle`]: owner handle for the optional background expiry
//!   sweep started by [`ResponseCache::spawn_sweeper`].
//!
//! The cache is per-process. Sharing one logical cache between processes
//! would need an external store and is not attempted here.

mod key;
pub mod response;
mod sweep;

pub use key::cache_key;
pub use response::{CacheConfig, CacheStats, ResponseCache};
pub use sweep::SweepHandle;
