//! Shared utilities for misebridge
//!
//! Small building blocks used across the workspace: logging setup, the
//! trailing debouncer, the project ready latch, runtime bridging and path
//! helpers.

pub mod async_runtime;
pub mod debounce;
pub mod latch;
pub mod paths;
pub mod tracing;

pub use async_runtime::*;
pub use debounce::Debouncer;
pub use latch::ReadyLatch;
pub use paths::*;
