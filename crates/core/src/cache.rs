//! Keyed memoization of pipeline results.
//!
//! A [`ContentCache`] runs a producer at most once per key: concurrent callers
//! for a key that is still being produced wait for that producer and receive a
//! clone of its result.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::future::BoxFuture;
use tokio::sync::{Mutex, OnceCell};
use tokio::time::Instant;

/// Memoizes producer results per key.
#[async_trait]
pub trait ContentCache<T>: Send + Sync
where
    T: Clone + Send + Sync + 'static,
{
    /// Returns the memoized value for `key`, running `producer` only when no
    /// value exists and none is in flight.
    async fn try_get(&self, key: &str, producer: BoxFuture<'_, T>) -> T;
}

type RetainFn<T> = Arc<dyn Fn(&T) -> bool + Send + Sync>;

struct Slot<T> {
    cell: Arc<OnceCell<T>>,
    created: Instant,
}

impl<T> Slot<T> {
    fn new() -> Self {
        Self { cell: Arc::new(OnceCell::new()), created: Instant::now() }
    }
}

/// In-process [`ContentCache`] backed by a map of once-cells.
///
/// # Example
///
/// ```rust
/// use syndic_core::cache::{ContentCache, MemoryCache};
///
/// let rt = tokio::runtime::Runtime::new().unwrap();
/// rt.block_on(async {
///     let cache: MemoryCache<u32> = MemoryCache::new();
///     let first = cache.try_get("k", Box::pin(async { 1 })).await;
///     let second = cache.try_get("k", Box::pin(async { 2 })).await;
///     assert_eq!((first, second), (1, 1));
/// });
/// ```
pub struct MemoryCache<T> {
    entries: Mutex<HashMap<String, Slot<T>>>,
    ttl: Option<Duration>,
    retain: Option<RetainFn<T>>,
}

impl<T> Default for MemoryCache<T> {
    fn default() -> Self {
        Self { entries: Mutex::new(HashMap::new()), ttl: None, retain: None }
    }
}

impl<T> MemoryCache<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Expires settled entries older than `ttl`.
    pub fn with_ttl(mut self, ttl: Option<Duration>) -> Self {
        self.ttl = ttl;
        self
    }

    /// Keeps a settled value only when `retain` returns true.
    ///
    /// Rejected values are still handed to every caller that was waiting on
    /// them; the entry is evicted afterwards so the next call produces again.
    pub fn retain_if<F>(mut self, retain: F) -> Self
    where
        F: Fn(&T) -> bool + Send + Sync + 'static,
    {
        self.retain = Some(Arc::new(retain));
        self
    }

    /// Number of entries, settled or in flight.
    pub async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.lock().await.is_empty()
    }

    /// Drops the entry for `key`.
    pub async fn invalidate(&self, key: &str) {
        self.entries.lock().await.remove(key);
    }

    fn is_expired(&self, slot: &Slot<T>) -> bool {
        match self.ttl {
            Some(ttl) => slot.cell.initialized() && slot.created.elapsed() >= ttl,
            None => false,
        }
    }
}

#[async_trait]
impl<T> ContentCache<T> for MemoryCache<T>
where
    T: Clone + Send + Sync + 'static,
{
    async fn try_get(&self, key: &str, producer: BoxFuture<'_, T>) -> T {
        let cell = {
            let mut entries = self.entries.lock().await;
            if entries.get(key).is_some_and(|slot| self.is_expired(slot)) {
                tracing::debug!(key, "cache entry expired");
                entries.remove(key);
            }
            entries.entry(key.to_string()).or_insert_with(Slot::new).cell.clone()
        };

        let mut produced = false;
        let flag = &mut produced;
        let value = cell
            .get_or_init(|| async move {
                *flag = true;
                producer.await
            })
            .await
            .clone();

        if !produced {
            tracing::debug!(key, "cache hit");
        } else if let Some(retain) = &self.retain
            && !retain(&value)
        {
            let mut entries = self.entries.lock().await;
            if entries.get(key).is_some_and(|slot| Arc::ptr_eq(&slot.cell, &cell)) {
                entries.remove(key);
            }
        }

        value
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn counted(counter: &Arc<AtomicUsize>, value: u32, delay: Duration) -> BoxFuture<'static, u32> {
        let counter = Arc::clone(counter);
        Box::pin(async move {
            counter.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(delay).await;
            value
        })
    }

    #[tokio::test]
    async fn test_memoizes_per_key() {
        let cache = MemoryCache::new();
        let runs = Arc::new(AtomicUsize::new(0));

        assert_eq!(cache.try_get("a", counted(&runs, 1, Duration::ZERO)).await, 1);
        assert_eq!(cache.try_get("a", counted(&runs, 2, Duration::ZERO)).await, 1);
        assert_eq!(cache.try_get("b", counted(&runs, 3, Duration::ZERO)).await, 3);
        assert_eq!(runs.load(Ordering::SeqCst), 2);
        assert_eq!(cache.len().await, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_callers_share_one_producer() {
        let cache = MemoryCache::new();
        let runs = Arc::new(AtomicUsize::new(0));

        let (a, b, c) = tokio::join!(
            cache.try_get("k", counted(&runs, 7, Duration::from_millis(100))),
            cache.try_get("k", counted(&runs, 8, Duration::from_millis(100))),
            cache.try_get("k", counted(&runs, 9, Duration::from_millis(100))),
        );

        assert_eq!((a, b, c), (7, 7, 7));
        assert_eq!(runs.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_ttl_expires_settled_entries() {
        let cache = MemoryCache::new().with_ttl(Some(Duration::from_secs(60)));
        let runs = Arc::new(AtomicUsize::new(0));

        assert_eq!(cache.try_get("k", counted(&runs, 1, Duration::ZERO)).await, 1);
        tokio::time::advance(Duration::from_secs(30)).await;
        assert_eq!(cache.try_get("k", counted(&runs, 2, Duration::ZERO)).await, 1);
        tokio::time::advance(Duration::from_secs(31)).await;
        assert_eq!(cache.try_get("k", counted(&runs, 3, Duration::ZERO)).await, 3);
        assert_eq!(runs.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_rejected_values_reach_waiters_then_evict() {
        let cache = MemoryCache::new().retain_if(|v: &u32| *v > 10);
        let runs = Arc::new(AtomicUsize::new(0));

        let (a, b) = tokio::join!(
            cache.try_get("k", counted(&runs, 1, Duration::from_millis(50))),
            cache.try_get("k", counted(&runs, 2, Duration::from_millis(50))),
        );
        assert_eq!((a, b), (1, 1));
        assert_eq!(runs.load(Ordering::SeqCst), 1);
        assert!(cache.is_empty().await);

        assert_eq!(cache.try_get("k", counted(&runs, 20, Duration::ZERO)).await, 20);
        assert_eq!(cache.try_get("k", counted(&runs, 30, Duration::ZERO)).await, 20);
        assert_eq!(runs.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_invalidate() {
        let cache = MemoryCache::new();
        let runs = Arc::new(AtomicUsize::new(0));
        cache.try_get("k", counted(&runs, 1, Duration::ZERO)).await;
        cache.invalidate("k").await;
        assert_eq!(cache.try_get("k", counted(&runs, 2, Duration::ZERO)).await, 2);
    }
}
