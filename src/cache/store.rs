use crate::cache::backend::{ActiveBackend, BackendState, MemoryBackend, RedisBackend};
use crate::config::CacheConfig;
use crate::core::comparison::filter_by_price;
use crate::domain::model::{Hotel, PriceRange, Priced};
use crate::domain::ports::HotelCache;
use crate::utils::error::Result;
use async_trait::async_trait;
use serde::{de::DeserializeOwned, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// Cache-aside store with graceful degradation.
///
/// Starts on the in-memory fallback so no caller ever waits for network
/// setup. When a Redis URL is configured a single background task tries to
/// connect; on success the store switches to Redis, otherwise it stays on the
/// fallback for the rest of its lifetime. A Redis fault at request time is
/// logged, the operation is treated as failed and the store degrades back to
/// the fallback. There is no reconnection.
#[derive(Clone)]
pub struct CacheStore {
    inner: Arc<CacheInner>,
}

struct CacheInner {
    config: CacheConfig,
    memory: MemoryBackend,
    active: RwLock<ActiveBackend>,
    connect_task: Mutex<Option<JoinHandle<()>>>,
    stopped: AtomicBool,
}

impl CacheInner {
    async fn connect_remote(&self, url: &str) {
        let connected = RedisBackend::connect(
            url,
            self.config.connect_timeout,
            self.config.operation_timeout,
        )
        .await;

        match connected {
            Ok(remote) => {
                let mut active = self.active.write().await;
                // stop() may have run while the connection was being set up
                if self.stopped.load(Ordering::SeqCst) {
                    debug!("💾 Store stopped during connect, dropping Redis connection");
                    return;
                }
                *active = ActiveBackend::Remote(remote);
                info!("💾 Connected to Redis, switching from in-memory cache");
            }
            Err(e) => {
                warn!(
                    "⚠️ Failed to connect to Redis, continuing with in-memory fallback: {}",
                    e
                );
            }
        }
    }
}

impl CacheStore {
    /// A store that only ever uses the in-memory fallback.
    pub fn in_memory() -> Self {
        Self::start(CacheConfig::default())
    }

    /// Create the store on the fallback backend and, if configured, schedule
    /// the one-shot Redis connection attempt. Must be called inside a Tokio
    /// runtime.
    pub fn start(config: CacheConfig) -> Self {
        let redis_url = config.redis_url.clone();
        let store = Self {
            inner: Arc::new(CacheInner {
                config,
                memory: MemoryBackend::new(),
                active: RwLock::new(ActiveBackend::Fallback),
                connect_task: Mutex::new(None),
                stopped: AtomicBool::new(false),
            }),
        };

        info!("💾 Starting with in-memory cache enabled by default");

        if let Some(url) = redis_url {
            let inner = Arc::clone(&store.inner);
            let handle = tokio::spawn(async move {
                inner.connect_remote(&url).await;
            });
            if let Ok(mut task) = store.inner.connect_task.lock() {
                *task = Some(handle);
            }
        }

        store
    }

    /// Wait until the background connection attempt has finished, if any.
    pub async fn wait_for_connect(&self) {
        let handle = self
            .inner
            .connect_task
            .lock()
            .ok()
            .and_then(|mut task| task.take());

        if let Some(handle) = handle {
            if let Err(e) = handle.await {
                if !e.is_cancelled() {
                    error!("❌ Redis connection task failed: {}", e);
                }
            }
        }
    }

    pub async fn state(&self) -> BackendState {
        self.inner.active.read().await.state()
    }

    /// Always healthy: the in-memory fallback is always usable.
    pub fn status(&self) -> bool {
        true
    }

    async fn remote(&self) -> Option<RedisBackend> {
        match &*self.inner.active.read().await {
            ActiveBackend::Remote(remote) => Some(remote.clone()),
            ActiveBackend::Fallback => None,
        }
    }

    async fn degrade(&self) {
        let mut active = self.inner.active.write().await;
        if matches!(*active, ActiveBackend::Remote(_)) {
            *active = ActiveBackend::Fallback;
            warn!("⚠️ Redis call failed, degrading to in-memory cache");
        }
    }

    /// Serialize `value` and write it to the active backend. Failures are
    /// logged and swallowed.
    pub async fn set<T: Serialize + ?Sized>(&self, key: &str, value: &T) {
        let json = match serde_json::to_string(value) {
            Ok(json) => json,
            Err(e) => {
                error!("❌ Error serializing cache value for key {}: {}", key, e);
                return;
            }
        };
        let size = json.len();

        match self.remote().await {
            Some(remote) => match remote.set(key, json).await {
                Ok(()) => debug!("💾 Saved {} bytes to Redis with key: {}", size, key),
                Err(e) => {
                    error!("❌ Error saving to Redis with key {}: {}", key, e);
                    self.degrade().await;
                }
            },
            None => {
                self.inner.memory.set(key, json).await;
                debug!("💾 Saved {} bytes to in-memory cache with key: {}", size, key);
            }
        }
    }

    /// Read a cached sequence and apply `range`. Missing keys, decode
    /// failures and backend faults all read as an empty sequence.
    pub async fn get<T>(&self, key: &str, range: &PriceRange) -> Vec<T>
    where
        T: DeserializeOwned + Priced + Clone,
    {
        let raw = match self.remote().await {
            Some(remote) => match remote.get(key).await {
                Ok(raw) => raw,
                Err(e) => {
                    warn!("⚠️ Error reading Redis key {}: {}", key, e);
                    self.degrade().await;
                    return Vec::new();
                }
            },
            None => self.inner.memory.get(key).await,
        };

        let Some(json) = raw else {
            debug!("💾 Cache miss for key: {}", key);
            return Vec::new();
        };

        match serde_json::from_str::<Vec<T>>(&json) {
            Ok(items) => {
                debug!("💾 Cache hit for key: {} ({} items)", key, items.len());
                filter_by_price(&items, range)
            }
            Err(e) => {
                warn!("⚠️ Failed to deserialize cached value for key {}: {}", key, e);
                Vec::new()
            }
        }
    }

    /// Abort a pending connection attempt, drop the Redis connection and
    /// clear the fallback map.
    pub async fn stop(&self) {
        self.inner.stopped.store(true, Ordering::SeqCst);

        let handle = self
            .inner
            .connect_task
            .lock()
            .ok()
            .and_then(|mut task| task.take());
        if let Some(handle) = handle {
            handle.abort();
        }

        let was_remote = {
            let mut active = self.inner.active.write().await;
            let was_remote = matches!(*active, ActiveBackend::Remote(_));
            *active = ActiveBackend::Fallback;
            was_remote
        };
        if was_remote {
            info!("💾 Redis connection closed");
        }

        self.inner.memory.clear().await;
    }
}

#[async_trait]
impl HotelCache for CacheStore {
    async fn get_hotels(&self, key: &str, range: &PriceRange) -> Result<Vec<Hotel>> {
        Ok(self.get(key, range).await)
    }

    async fn save_hotels(&self, key: &str, hotels: &[Hotel]) -> Result<()> {
        self.set(key, hotels).await;
        Ok(())
    }

    fn status(&self) -> bool {
        CacheStore::status(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::backend::test_support::{spawn_fake_redis, FakeRedis};
    use std::time::Duration;

    fn hotel(name: &str, price: f64, supplier: &str) -> Hotel {
        Hotel {
            name: name.to_string(),
            price,
            supplier: supplier.to_string(),
            commission_pct: 15.0,
        }
    }

    fn delhi_hotels() -> Vec<Hotel> {
        vec![
            hotel("Taj Palace", 8200.0, "Supplier B"),
            hotel("Radison", 5900.0, "Supplier A"),
            hotel("Leela Palace", 9800.0, "Supplier B"),
        ]
    }

    #[tokio::test]
    async fn test_set_then_get_returns_value() {
        let store = CacheStore::in_memory();
        store.set("hotels:delhi", &delhi_hotels()).await;

        let cached: Vec<Hotel> = store.get("hotels:delhi", &PriceRange::unbounded()).await;
        assert_eq!(cached, delhi_hotels());
        assert_eq!(store.state().await, BackendState::FallbackActive);
    }

    #[tokio::test]
    async fn test_get_unknown_key_is_empty() {
        let store = CacheStore::in_memory();
        let cached: Vec<Hotel> = store.get("hotels:nowhere", &PriceRange::unbounded()).await;
        assert!(cached.is_empty());
    }

    #[tokio::test]
    async fn test_get_filters_on_read_only() {
        let store = CacheStore::in_memory();
        store.set("hotels:delhi", &delhi_hotels()).await;

        let filtered: Vec<Hotel> = store
            .get("hotels:delhi", &PriceRange::new(Some(8000.0), Some(9000.0)))
            .await;
        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered[0].name, "Taj Palace");

        let full: Vec<Hotel> = store.get("hotels:delhi", &PriceRange::unbounded()).await;
        assert_eq!(full.len(), 3);
    }

    #[tokio::test]
    async fn test_corrupt_entry_reads_as_empty() {
        let store = CacheStore::in_memory();
        store.set("hotels:delhi", "definitely not a hotel list").await;

        let cached: Vec<Hotel> = store.get("hotels:delhi", &PriceRange::unbounded()).await;
        assert!(cached.is_empty());
    }

    #[tokio::test]
    async fn test_later_write_wins() {
        let store = CacheStore::in_memory();
        store.set("hotels:delhi", &delhi_hotels()).await;
        store.set("hotels:delhi", &vec![hotel("Marriott", 7800.0, "Supplier A")]).await;

        let cached: Vec<Hotel> = store.get("hotels:delhi", &PriceRange::unbounded()).await;
        assert_eq!(cached, vec![hotel("Marriott", 7800.0, "Supplier A")]);
    }

    fn redis_config(url: &str) -> CacheConfig {
        CacheConfig {
            redis_url: Some(url.to_string()),
            connect_timeout: Duration::from_millis(200),
            operation_timeout: Duration::from_millis(200),
        }
    }

    async fn connected_store(mode: FakeRedis) -> CacheStore {
        let url = spawn_fake_redis(mode, Duration::ZERO).await;
        let store = CacheStore::start(CacheConfig {
            connect_timeout: Duration::from_secs(2),
            ..redis_config(&url)
        });
        store.wait_for_connect().await;
        assert_eq!(store.state().await, BackendState::RemoteActive);
        store
    }

    #[tokio::test]
    async fn test_failed_connect_stays_on_fallback() {
        let store = CacheStore::start(redis_config("redis://127.0.0.1:1"));

        // 立即可用，不等待連線
        assert_eq!(store.state().await, BackendState::FallbackActive);
        store.set("hotels:delhi", &delhi_hotels()).await;

        store.wait_for_connect().await;
        assert_eq!(store.state().await, BackendState::FallbackActive);

        tokio::time::sleep(Duration::from_millis(300)).await;
        assert_eq!(store.state().await, BackendState::FallbackActive);

        let cached: Vec<Hotel> = store.get("hotels:delhi", &PriceRange::unbounded()).await;
        assert_eq!(cached.len(), 3);
        assert!(store.status());
    }

    #[tokio::test]
    async fn test_connect_timeout_stays_on_fallback() {
        let url = spawn_fake_redis(FakeRedis::Silent, Duration::ZERO).await;
        let store = CacheStore::start(redis_config(&url));

        tokio::time::timeout(Duration::from_secs(2), store.wait_for_connect())
            .await
            .unwrap();
        assert_eq!(store.state().await, BackendState::FallbackActive);

        store.set("hotels:delhi", &delhi_hotels()).await;
        let cached: Vec<Hotel> = store.get("hotels:delhi", &PriceRange::unbounded()).await;
        assert_eq!(cached.len(), 3);
    }

    #[tokio::test]
    async fn test_stalled_redis_read_degrades_to_fallback() {
        let store = connected_store(FakeRedis::StallOnData).await;

        let cached: Vec<Hotel> = tokio::time::timeout(
            Duration::from_secs(2),
            store.get("hotels:delhi", &PriceRange::unbounded()),
        )
        .await
        .unwrap();

        assert!(cached.is_empty());
        assert_eq!(store.state().await, BackendState::FallbackActive);

        // 降級後改用記憶體快取，不再回到 Redis
        store.set("hotels:delhi", &delhi_hotels()).await;
        let cached: Vec<Hotel> = store.get("hotels:delhi", &PriceRange::unbounded()).await;
        assert_eq!(cached.len(), 3);
        assert_eq!(store.state().await, BackendState::FallbackActive);
    }

    #[tokio::test]
    async fn test_dropped_redis_write_degrades_to_fallback() {
        let store = connected_store(FakeRedis::DropOnData).await;

        tokio::time::timeout(
            Duration::from_secs(2),
            store.set("hotels:delhi", &delhi_hotels()),
        )
        .await
        .unwrap();

        assert_eq!(store.state().await, BackendState::FallbackActive);
        let cached: Vec<Hotel> = store.get("hotels:delhi", &PriceRange::unbounded()).await;
        assert!(cached.is_empty());
    }

    #[tokio::test]
    async fn test_stop_during_connect_keeps_fallback() {
        let url = spawn_fake_redis(FakeRedis::StallOnData, Duration::from_millis(300)).await;
        let store = CacheStore::start(CacheConfig {
            connect_timeout: Duration::from_secs(2),
            ..redis_config(&url)
        });

        // wait_for_connect owns the handle, so stop() cannot abort the attempt
        let waiter = {
            let store = store.clone();
            tokio::spawn(async move { store.wait_for_connect().await })
        };
        tokio::time::sleep(Duration::from_millis(50)).await;
        store.stop().await;
        waiter.await.unwrap();

        assert_eq!(store.state().await, BackendState::FallbackActive);
    }

    #[tokio::test]
    async fn test_stop_clears_fallback() {
        let store = CacheStore::in_memory();
        store.set("hotels:delhi", &delhi_hotels()).await;

        store.stop().await;

        let cached: Vec<Hotel> = store.get("hotels:delhi", &PriceRange::unbounded()).await;
        assert!(cached.is_empty());
        assert_eq!(store.state().await, BackendState::FallbackActive);
    }

    #[tokio::test]
    async fn test_hotel_cache_port_never_fails() {
        let store = CacheStore::in_memory();
        let cache: &dyn HotelCache = &store;

        tokio_test::assert_ok!(cache.save_hotels("hotels:delhi", &delhi_hotels()).await);
        let hotels = tokio_test::assert_ok!(
            cache
                .get_hotels("hotels:delhi", &PriceRange::new(None, Some(6000.0)))
                .await
        );
        assert_eq!(hotels.len(), 1);
        assert!(cache.status());
    }
}
