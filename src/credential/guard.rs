use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use log::{debug, warn};
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;

use crate::cache::Cache;
use crate::error::WechatError;
use crate::types::AccessToken;

/// Upper bound on any cached credential lifetime.
pub(crate) const MAX_CACHE_TTL: Duration = Duration::from_secs(24 * 60 * 60);

/// A freshly issued credential and its issuer-reported lifetime in seconds.
#[derive(Debug)]
pub(crate) struct Issued {
    pub(crate) value: String,
    pub(crate) expires_in: u64,
}

/// Read `key`, treating read errors and empty values as a miss.
pub(crate) async fn read_cached(cache: &dyn Cache, key: &str) -> Option<String> {
    match cache.get(key).await {
        Ok(Some(value)) if !value.is_empty() => Some(value),
        Ok(_) => None,
        Err(e) => {
            warn!("[credential] cache read for {} failed, treating as miss: {}", key, e);
            None
        }
    }
}

/// Write an issued credential with `expires_in - margin` as TTL.
///
/// A lifetime at or below the margin is returned without caching; the TTL
/// never exceeds [`MAX_CACHE_TTL`].
pub(crate) async fn store_issued(
    cache: &dyn Cache,
    key: &str,
    issued: Issued,
    margin: Duration,
) -> Result<String, WechatError> {
    let ttl = Duration::from_secs(issued.expires_in).saturating_sub(margin);
    if ttl.is_zero() {
        warn!(
            "[credential] {} expires in {}s, within the {:?} margin; not caching",
            key, issued.expires_in, margin
        );
        return Ok(issued.value);
    }
    if ttl > MAX_CACHE_TTL {
        warn!(
            "[credential] {} reported expires_in {}s, capping cache TTL at {:?}",
            key, issued.expires_in, MAX_CACHE_TTL
        );
    }
    let ttl = ttl.min(MAX_CACHE_TTL);

    match cache.set(key, &issued.value, ttl).await {
        Ok(()) => {
            debug!("[credential] cached {} for {:?}", key, ttl);
            Ok(issued.value)
        }
        Err(source) => Err(WechatError::CacheWrite {
            token: AccessToken::new(issued.value).map_err(WechatError::Token)?,
            source,
        }),
    }
}

/// Double-checked refresh of one cache key.
///
/// Reads are lock-free; on a miss the caller takes the per-instance mutex,
/// re-reads, and only then fetches. At most one fetch runs at a time.
pub(crate) struct RefreshGuard {
    cache: Arc<dyn Cache>,
    key: String,
    margin: Duration,
    lock: Mutex<()>,
}

impl RefreshGuard {
    pub(crate) fn new(cache: Arc<dyn Cache>, key: String, margin: Duration) -> Self {
        Self {
            cache,
            key,
            margin,
            lock: Mutex::new(()),
        }
    }

    pub(crate) fn key(&self) -> &str {
        &self.key
    }

    pub(crate) async fn get_or_refresh<F, Fut>(
        &self,
        cancel: &CancellationToken,
        fetch: F,
    ) -> Result<String, WechatError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Issued, WechatError>>,
    {
        if let Some(value) = read_cached(&*self.cache, &self.key).await {
            return Ok(value);
        }

        let _guard = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(WechatError::Cancelled),
            guard = self.lock.lock() => guard,
        };

        if let Some(value) = read_cached(&*self.cache, &self.key).await {
            debug!("[credential] {} refreshed by a concurrent caller", self.key);
            return Ok(value);
        }

        debug!("[credential] {} missing, fetching from issuer", self.key);
        let issued = fetch().await?;
        store_issued(&*self.cache, &self.key, issued, self.margin).await
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};

    use super::*;
    use crate::cache::{CacheError, CacheFuture, MemoryCache};

    struct FailingCache;

    impl Cache for FailingCache {
        fn get<'a>(&'a self, _key: &'a str) -> CacheFuture<'a, Option<String>> {
            Box::pin(async { Err(CacheError::Backend("down".to_string())) })
        }

        fn set<'a>(&'a self, _key: &'a str, _value: &'a str, _ttl: Duration) -> CacheFuture<'a, ()> {
            Box::pin(async { Err(CacheError::Backend("down".to_string())) })
        }
    }

    fn issued(value: &str, expires_in: u64) -> Issued {
        Issued {
            value: value.to_string(),
            expires_in,
        }
    }

    #[tokio::test]
    async fn test_read_cached_empty_value_is_miss() {
        let cache = MemoryCache::new();
        cache.set("key", "", Duration::from_secs(60)).await.unwrap();
        assert_eq!(read_cached(&cache, "key").await, None);
    }

    #[tokio::test]
    async fn test_read_cached_error_is_miss() {
        assert_eq!(read_cached(&FailingCache, "key").await, None);
    }

    #[tokio::test]
    async fn test_store_issued_applies_margin() {
        let cache = MemoryCache::new();
        let value = store_issued(&cache, "key", issued("tok", 7200), Duration::from_secs(1500))
            .await
            .unwrap();
        assert_eq!(value, "tok");
        let ttl = cache.ttl("key").unwrap();
        assert!(ttl <= Duration::from_secs(5700));
        assert!(ttl > Duration::from_secs(5690));
    }

    #[tokio::test]
    async fn test_store_issued_short_lifetime_not_cached() {
        let cache = MemoryCache::new();
        let value = store_issued(&cache, "key", issued("tok", 1000), Duration::from_secs(1500))
            .await
            .unwrap();
        assert_eq!(value, "tok");
        assert!(cache.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_store_issued_caps_huge_lifetime() {
        let cache = MemoryCache::new();
        let value = store_issued(&cache, "key", issued("tok", u64::MAX), Duration::from_secs(1500))
            .await
            .unwrap();
        assert_eq!(value, "tok");
        assert_eq!(cache.ttl("key"), Some(MAX_CACHE_TTL));
    }

    #[tokio::test]
    async fn test_store_issued_write_failure_keeps_token() {
        let err = store_issued(&FailingCache, "key", issued("tok", 7200), Duration::from_secs(300))
            .await
            .unwrap_err();
        assert_eq!(err.recovered_token(), Some("tok"));
    }

    #[tokio::test]
    async fn test_guard_skips_fetch_on_hit() {
        let cache = Arc::new(MemoryCache::new());
        cache.set("key", "cached", Duration::from_secs(60)).await.unwrap();
        let guard = RefreshGuard::new(cache, "key".to_string(), Duration::from_secs(1500));

        let calls = AtomicU32::new(0);
        let cancel = CancellationToken::new();
        let value = guard
            .get_or_refresh(&cancel, || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok(issued("fresh", 7200))
            })
            .await
            .unwrap();

        assert_eq!(value, "cached");
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_guard_fetch_error_not_cached() {
        let cache = Arc::new(MemoryCache::new());
        let guard = RefreshGuard::new(cache.clone(), "key".to_string(), Duration::from_secs(1500));
        let cancel = CancellationToken::new();

        let result = guard
            .get_or_refresh(&cancel, || async {
                Err(WechatError::Api {
                    code: 45009,
                    message: "reach max api daily quota limit".to_string(),
                })
            })
            .await;

        assert_eq!(result.unwrap_err().api_code(), Some(45009));
        assert!(cache.is_empty());
        assert_eq!(guard.key(), "key");
    }

    #[tokio::test]
    async fn test_guard_cancelled_while_waiting_for_lock() {
        let cache = Arc::new(MemoryCache::new());
        let guard = RefreshGuard::new(cache, "key".to_string(), Duration::from_secs(1500));
        let _held = guard.lock.lock().await;

        let cancel = CancellationToken::new();
        let waiter = guard.get_or_refresh(&cancel, || async { Ok(issued("tok", 7200)) });
        cancel.cancel();

        assert!(matches!(waiter.await, Err(WechatError::Cancelled)));
    }
}
