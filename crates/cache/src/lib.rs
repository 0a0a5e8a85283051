//! Caching engine for misebridge
//!
//! - [`BoundedCache`]: LRU store with compute-once semantics and no negative
//!   caching.
//! - [`CacheService`]: a project's command store and executable store.
//! - [`CommandCache`]: the orchestrator that bounds every miss in time,
//!   bridges synchronous callers and reacts to project events.

pub mod bounded;
pub mod orchestrator;
pub mod progress;
pub mod service;
pub mod warming;

pub use bounded::{BoundedCache, EvictionLog};
pub use orchestrator::{CachedResult, CommandCache};
pub use progress::{
    is_dispatch_thread, mark_dispatch_thread, unmark_dispatch_thread, LogProgress, ProgressHost,
};
pub use service::CacheService;
pub use warming::CacheWarmer;
