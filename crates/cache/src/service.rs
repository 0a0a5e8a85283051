//! Per-project cache service
//!
//! Two independent stores: command results (large, evictions expected) and
//! resolved executables (tiny, evictions unexpected). They never share
//! entries.

use crate::bounded::{BoundedCache, EvictionLog};
use misebridge_core::{
    CacheKey, CommandError, CommandResult, ExecutableInfo, COMMAND_CACHE_CAPACITY,
    EXECUTABLE_CACHE_CAPACITY,
};
use std::any::Any;
use std::convert::Infallible;
use std::future::Future;
use std::sync::Arc;
use tracing::info;

type Erased = Arc<dyn Any + Send + Sync>;

pub struct CacheService {
    commands: BoundedCache<Erased>,
    executables: BoundedCache<ExecutableInfo, Infallible>,
}

impl CacheService {
    pub fn new() -> Self {
        Self::with_capacity(COMMAND_CACHE_CAPACITY, EXECUTABLE_CACHE_CAPACITY)
    }

    pub fn with_capacity(commands: usize, executables: usize) -> Self {
        Self {
            commands: BoundedCache::new("commands", commands, EvictionLog::Debug),
            executables: BoundedCache::new("executables", executables, EvictionLog::Warn),
        }
    }

    // Command store

    /// Cached value for `key`, computing it at most once at a time.
    pub async fn get_cached_command<K, F, Fut>(&self, key: &K, compute: F) -> CommandResult<K::Output>
    where
        K: CacheKey,
        F: FnOnce() -> Fut,
        Fut: Future<Output = CommandResult<K::Output>>,
    {
        let id = key.key();
        let erased = self
            .commands
            .get_or_compute(&id, || async move {
                compute().await.map(|value| Arc::new(value) as Erased)
            })
            .await?;
        downcast::<K::Output>(&id, erased)
    }

    pub fn get_if_cached_command<K: CacheKey>(&self, key: &K) -> Option<K::Output> {
        let id = key.key();
        self.commands
            .get_if_present(&id)
            .and_then(|erased| downcast::<K::Output>(&id, erased).ok())
    }

    pub fn invalidate_all_commands(&self) {
        self.commands.invalidate_all();
        info!("All command cache entries invalidated");
    }

    pub fn cached_command_count(&self) -> usize {
        self.commands.len()
    }

    // Executable store

    pub async fn get_or_compute_executable<F, Fut>(&self, key: &str, compute: F) -> ExecutableInfo
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = ExecutableInfo>,
    {
        let result = self
            .executables
            .get_or_compute(key, || async move { Ok(compute().await) })
            .await;
        match result {
            Ok(info) => info,
            Err(never) => match never {},
        }
    }

    pub fn get_cached_executable(&self, key: &str) -> Option<ExecutableInfo> {
        self.executables.get_if_present(key)
    }

    pub fn invalidate_all_executables(&self) {
        self.executables.invalidate_all();
        info!("All executable cache entries invalidated");
    }
}

impl Default for CacheService {
    fn default() -> Self {
        Self::new()
    }
}

fn downcast<T: Clone + 'static>(key: &str, erased: Erased) -> CommandResult<T> {
    erased.downcast_ref::<T>().cloned().ok_or_else(|| {
        CommandError::failed(key, format!("cached value for '{key}' has an unexpected type"))
    })
}
