//! Fail-soft Redis cache.
//!
//! Values are JSON, keys carry no TTL: every collection cached here is
//! invalidated (or patched) on write, never expired. A cache that cannot
//! connect at startup flips to disabled mode, where every read is a miss
//! and every write is a no-op. Redis being down must never take the bot
//! down with it.
//!
//! An in-memory backend implements the same key/value contract over a
//! process-local map; tests use it to exercise the hit paths without a
//! Redis server.

use std::sync::Arc;

use dashmap::DashMap;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use serde::de::DeserializeOwned;
use serde::Serialize;

const KEY_USER_IDS: &str = "sharebox:user_ids";
const KEY_ADMIN_IDS: &str = "sharebox:admin_ids";
const KEY_CHANNELS: &str = "sharebox:channels";

#[derive(Clone)]
enum Backend {
    Redis(ConnectionManager),
    Memory(Arc<DashMap<String, String>>),
    Disabled,
}

/// Shared handle to the cache. Cheap to clone.
#[derive(Clone)]
pub struct RedisCache {
    backend: Backend,
}

impl RedisCache {
    /// Connects to Redis; on failure returns a disabled cache.
    pub async fn connect(url: &str) -> Self {
        match redis::Client::open(url) {
            Ok(client) => match ConnectionManager::new(client).await {
                Ok(manager) => {
                    log::info!("🔌 Redis cache connected");
                    Self { backend: Backend::Redis(manager) }
                }
                Err(e) => {
                    log::warn!("⚠️ Redis unavailable, cache disabled: {}", e);
                    Self { backend: Backend::Disabled }
                }
            },
            Err(e) => {
                log::warn!("⚠️ Invalid Redis URL, cache disabled: {}", e);
                Self { backend: Backend::Disabled }
            }
        }
    }

    /// A cache that never hits.
    pub fn disabled() -> Self {
        Self { backend: Backend::Disabled }
    }

    /// A process-local cache with the same semantics as the Redis one.
    pub fn in_memory() -> Self {
        Self { backend: Backend::Memory(Arc::new(DashMap::new())) }
    }

    pub fn is_enabled(&self) -> bool {
        !matches!(self.backend, Backend::Disabled)
    }

    async fn get_json<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let raw = match &self.backend {
            Backend::Redis(manager) => {
                let mut conn = manager.clone();
                match conn.get::<_, Option<String>>(key).await {
                    Ok(raw) => raw,
                    Err(e) => {
                        log::warn!("Cache read failed for {}: {}", key, e);
                        None
                    }
                }
            }
            Backend::Memory(map) => map.get(key).map(|entry| entry.clone()),
            Backend::Disabled => None,
        }?;
        match serde_json::from_str(&raw) {
            Ok(value) => Some(value),
            Err(e) => {
                log::warn!("Dropping undecodable cache entry {}: {}", key, e);
                None
            }
        }
    }

    async fn set_json<T: Serialize>(&self, key: &str, value: &T) {
        let raw = match serde_json::to_string(value) {
            Ok(raw) => raw,
            Err(e) => {
                log::warn!("Cache encode failed for {}: {}", key, e);
                return;
            }
        };
        match &self.backend {
            Backend::Redis(manager) => {
                let mut conn = manager.clone();
                if let Err(e) = conn.set::<_, _, ()>(key, raw).await {
                    log::warn!("Cache write failed for {}: {}", key, e);
                }
            }
            Backend::Memory(map) => {
                map.insert(key.to_string(), raw);
            }
            Backend::Disabled => {}
        }
    }

    async fn delete(&self, key: &str) {
        match &self.backend {
            Backend::Redis(manager) => {
                let mut conn = manager.clone();
                if let Err(e) = conn.del::<_, ()>(key).await {
                    log::warn!("Cache invalidation failed for {}: {}", key, e);
                }
            }
            Backend::Memory(map) => {
                map.remove(key);
            }
            Backend::Disabled => {}
        }
    }

    // ── user ids: patched incrementally on user creation ────────────

    pub async fn get_user_ids(&self) -> Option<Vec<i64>> {
        self.get_json(KEY_USER_IDS).await
    }

    pub async fn set_user_ids(&self, ids: &[i64]) {
        self.set_json(KEY_USER_IDS, &ids).await;
    }

    /// Appends one id to the cached list. When nothing is cached yet the
    /// next read rebuilds from the database, so absence is left alone.
    pub async fn add_user_id(&self, user_id: i64) {
        if let Some(mut ids) = self.get_user_ids().await {
            if !ids.contains(&user_id) {
                ids.push(user_id);
                self.set_user_ids(&ids).await;
            }
        }
    }

    // ── admin ids: fully rebuilt on every change ────────────────────

    pub async fn get_admin_ids(&self) -> Option<Vec<i64>> {
        self.get_json(KEY_ADMIN_IDS).await
    }

    pub async fn set_admin_ids(&self, ids: &[i64]) {
        self.set_json(KEY_ADMIN_IDS, &ids).await;
    }

    // ── channel map: invalidated on mutation, rebuilt lazily ────────

    pub async fn get_channel_map<T: DeserializeOwned>(&self) -> Option<T> {
        self.get_json(KEY_CHANNELS).await
    }

    pub async fn set_channel_map<T: Serialize>(&self, map: &T) {
        self.set_json(KEY_CHANNELS, map).await;
    }

    pub async fn invalidate_channel_map(&self) {
        self.delete(KEY_CHANNELS).await;
    }
}

impl std::fmt::Debug for RedisCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let backend = match &self.backend {
            Backend::Redis(_) => "redis",
            Backend::Memory(_) => "memory",
            Backend::Disabled => "disabled",
        };
        f.debug_struct("RedisCache").field("backend", &backend).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::collections::BTreeMap;

    #[tokio::test]
    async fn disabled_cache_misses_and_swallows_writes() {
        let cache = RedisCache::disabled();
        assert!(!cache.is_enabled());
        cache.set_user_ids(&[1, 2, 3]).await;
        cache.add_user_id(4).await;
        assert_eq!(cache.get_user_ids().await, None);
        assert_eq!(cache.get_admin_ids().await, None);
        cache.invalidate_channel_map().await;
    }

    #[tokio::test]
    async fn user_id_patch_appends_once_and_skips_absence() {
        let cache = RedisCache::in_memory();
        assert!(cache.is_enabled());

        // Nothing cached yet: the patch must not materialize a partial list.
        cache.add_user_id(1).await;
        assert_eq!(cache.get_user_ids().await, None);

        cache.set_user_ids(&[1, 2]).await;
        cache.add_user_id(3).await;
        cache.add_user_id(3).await;
        assert_eq!(cache.get_user_ids().await, Some(vec![1, 2, 3]));
    }

    #[tokio::test]
    async fn channel_map_invalidation_drops_the_key() {
        let cache = RedisCache::in_memory();
        let mut map = BTreeMap::new();
        map.insert("@a".to_string(), "https://t.me/a".to_string());
        cache.set_channel_map(&map).await;
        assert_eq!(cache.get_channel_map::<BTreeMap<String, String>>().await, Some(map));

        cache.invalidate_channel_map().await;
        assert_eq!(cache.get_channel_map::<BTreeMap<String, String>>().await, None);
    }
}
