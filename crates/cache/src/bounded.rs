//! Bounded compute-once store
//!
//! An LRU map of finished values plus a table of in-flight computations. The
//! first caller for a missing key becomes the leader and runs the computation;
//! everyone else arriving while it runs awaits the same slot and observes the
//! leader's outcome, success or failure. Only successes are stored.

use dashmap::DashMap;
use lru::LruCache;
use misebridge_core::CommandError;
use parking_lot::Mutex;
use std::future::Future;
use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::OnceCell;
use tracing::{debug, trace, warn};

/// How loudly size evictions are reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EvictionLog {
    /// Expected churn
    Debug,
    /// The store is sized so this should not happen
    Warn,
}

type Slot<V, E> = Arc<OnceCell<Result<V, E>>>;

pub struct BoundedCache<V, E = CommandError> {
    name: &'static str,
    entries: Mutex<LruCache<String, V>>,
    in_flight: DashMap<String, Slot<V, E>>,
    /// Bumped on every invalidation. A computation that started under an
    /// older generation is handed to its waiters but not stored.
    generation: AtomicU64,
    eviction_log: EvictionLog,
}

impl<V, E> BoundedCache<V, E>
where
    V: Clone + Send + Sync + 'static,
    E: Clone + Send + Sync + 'static,
{
    pub fn new(name: &'static str, capacity: usize, eviction_log: EvictionLog) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            name,
            entries: Mutex::new(LruCache::new(capacity)),
            in_flight: DashMap::new(),
            generation: AtomicU64::new(0),
            eviction_log,
        }
    }

    pub fn get_if_present(&self, key: &str) -> Option<V> {
        self.entries.lock().get(key).cloned()
    }

    /// Return the stored value or compute it, at most once per key at a time.
    ///
    /// If the leader is cancelled before finishing, its slot stays empty and
    /// the next waiter runs its own computation in its place.
    pub async fn get_or_compute<F, Fut>(&self, key: &str, compute: F) -> Result<V, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V, E>>,
    {
        if let Some(value) = self.get_if_present(key) {
            trace!(cache = self.name, key, "Cache hit");
            return Ok(value);
        }

        let slot = self
            .in_flight
            .entry(key.to_string())
            .or_insert_with(|| Arc::new(OnceCell::new()))
            .value()
            .clone();

        let outcome = slot
            .get_or_init(|| async {
                // A previous leader may have stored the value between our miss
                // and taking the slot.
                if let Some(value) = self.get_if_present(key) {
                    return Ok(value);
                }
                let generation = self.generation();
                debug!(cache = self.name, key, "Cache miss, computing");
                let result = compute().await;
                match &result {
                    Ok(value) if generation == self.generation() => {
                        self.insert(key, value.clone());
                        debug!(cache = self.name, key, "Cached");
                    }
                    Ok(_) => {
                        debug!(cache = self.name, key, "Invalidated while computing, not cached");
                    }
                    Err(_) => {
                        debug!(cache = self.name, key, "Computation failed, not cached");
                    }
                }
                result
            })
            .await
            .clone();

        self.in_flight
            .remove_if(key, |_, current| Arc::ptr_eq(current, &slot));
        outcome
    }

    pub fn insert(&self, key: &str, value: V) {
        let evicted = self.entries.lock().push(key.to_string(), value);
        if let Some((evicted_key, _)) = evicted {
            if evicted_key != key {
                match self.eviction_log {
                    EvictionLog::Debug => {
                        debug!(cache = self.name, key = %evicted_key, "Entry evicted due to size limit")
                    }
                    EvictionLog::Warn => {
                        warn!(cache = self.name, key = %evicted_key, "Entry evicted (unexpected)")
                    }
                }
            }
        }
    }

    /// Drop every stored value and detach running computations.
    ///
    /// Callers already awaiting a running computation still receive its
    /// result; new callers start fresh.
    pub fn invalidate_all(&self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
        self.entries.lock().clear();
        self.in_flight.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn in_flight_count(&self) -> usize {
        self.in_flight.len()
    }

    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    pub fn name(&self) -> &'static str {
        self.name
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;

    fn cache() -> Arc<BoundedCache<String>> {
        Arc::new(BoundedCache::new("test", 4, EvictionLog::Debug))
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_callers_compute_once() {
        let cache = cache();
        let calls = Arc::new(AtomicUsize::new(0));

        let tasks: Vec<_> = (0..16)
            .map(|_| {
                let cache = cache.clone();
                let calls = calls.clone();
                tokio::spawn(async move {
                    cache
                        .get_or_compute("env", || async move {
                            calls.fetch_add(1, Ordering::SeqCst);
                            tokio::time::sleep(Duration::from_millis(50)).await;
                            Ok("value".to_string())
                        })
                        .await
                })
            })
            .collect();

        for result in futures::future::join_all(tasks).await {
            assert_eq!(result.unwrap().unwrap(), "value");
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(cache.in_flight_count(), 0);
    }

    #[tokio::test]
    async fn test_failures_are_not_cached() {
        let cache = cache();
        let calls = AtomicUsize::new(0);

        for _ in 0..2 {
            let result = cache
                .get_or_compute("env", || async {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Err(CommandError::failed("mise env", "boom"))
                })
                .await;
            assert!(result.is_err());
        }

        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert!(cache.get_if_present("env").is_none());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_waiters_share_leader_failure() {
        let cache = cache();
        let calls = Arc::new(AtomicUsize::new(0));

        let run = |cache: Arc<BoundedCache<String>>, calls: Arc<AtomicUsize>| async move {
            cache
                .get_or_compute("ls", || async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    tokio::time::sleep(Duration::from_millis(50)).await;
                    Err::<String, _>(CommandError::failed("mise ls", "not yet"))
                })
                .await
        };

        let (a, b) = tokio::join!(
            run(cache.clone(), calls.clone()),
            run(cache.clone(), calls.clone())
        );
        assert_eq!(a, b);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_cancelled_leader_hands_over() {
        let cache = cache();

        let leader = tokio::time::timeout(
            Duration::from_millis(20),
            cache.get_or_compute("slow", || async {
                tokio::time::sleep(Duration::from_secs(60)).await;
                Ok("never".to_string())
            }),
        )
        .await;
        assert!(leader.is_err());

        let value = cache
            .get_or_compute("slow", || async { Ok("fresh".to_string()) })
            .await
            .unwrap();
        assert_eq!(value, "fresh");
    }

    #[tokio::test]
    async fn test_invalidation_during_compute_is_not_stored() {
        let cache = cache();
        let value = cache
            .get_or_compute("env", || async {
                cache.invalidate_all();
                Ok("stale".to_string())
            })
            .await
            .unwrap();

        assert_eq!(value, "stale");
        assert!(cache.get_if_present("env").is_none());
        assert_eq!(cache.generation(), 1);
    }

    #[test]
    fn test_size_eviction() {
        let cache: BoundedCache<u32> = BoundedCache::new("small", 2, EvictionLog::Warn);
        cache.insert("a", 1);
        cache.insert("b", 2);
        assert_eq!(cache.get_if_present("a"), Some(1));
        cache.insert("c", 3);

        assert_eq!(cache.len(), 2);
        assert_eq!(cache.get_if_present("b"), None);
        assert_eq!(cache.get_if_present("a"), Some(1));
        assert_eq!(cache.get_if_present("c"), Some(3));

        cache.invalidate_all();
        assert!(cache.is_empty());
    }
}
