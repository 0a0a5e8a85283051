//! Proactive re-warming after invalidation

use async_trait::async_trait;

/// Loads the queries most views need right after a project opens or its
/// cache is invalidated, so the next synchronous access is a hit.
///
/// Implementations log their own failures; warming never reports errors.
#[async_trait]
pub trait CacheWarmer: Send + Sync {
    async fn warm(&self);
}
