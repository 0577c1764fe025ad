use std::time::{Duration, Instant};

use dashmap::DashMap;
use redis::AsyncCommands;
use sha2::{Digest, Sha256};
use tokio::sync::Mutex;

use crate::models::users::UserQuery;
use crate::settings::{self, CacheBackend};

/// Cache for serialized user-listing responses.
///
/// Entries hold the exact bytes that were sent, so a hit is returned verbatim.
/// Backend failures are logged and treated as misses.
pub enum QueryCache {
    Disabled,
    Memory(MemoryCache),
    Redis(RedisCache),
}

impl QueryCache {
    pub fn from_settings(settings: &settings::Cache) -> Result<Self, anyhow::Error> {
        let ttl = Duration::from_secs(settings.ttl_seconds);

        match settings.backend {
            CacheBackend::None => Ok(QueryCache::Disabled),
            CacheBackend::Memory => Ok(QueryCache::Memory(MemoryCache::new(ttl))),
            CacheBackend::Redis => {
                let url = settings
                    .redis_url
                    .as_deref()
                    .ok_or_else(|| anyhow::anyhow!("cache.redis_url is required for the redis backend"))?;
                let cache = RedisCache::new(url, settings.prefix.clone(), ttl)?;
                Ok(QueryCache::Redis(cache))
            }
        }
    }

    pub async fn get(&self, key: &str) -> Option<Vec<u8>> {
        match self {
            QueryCache::Disabled => None,
            QueryCache::Memory(cache) => cache.get(key),
            QueryCache::Redis(cache) => cache.get(key).await,
        }
    }

    pub async fn set(&self, key: &str, value: &[u8]) {
        match self {
            QueryCache::Disabled => {}
            QueryCache::Memory(cache) => cache.set(key, value),
            QueryCache::Redis(cache) => cache.set(key, value).await,
        }
    }
}

/// Cache key for a listing query: hex SHA-256 of its canonical form.
pub fn query_key(query: &UserQuery) -> String {
    let digest = Sha256::digest(query.canonical().as_bytes());
    let hex: String = digest.iter().map(|byte| format!("{:02x}", byte)).collect();

    format!("users:{}", hex)
}

pub struct MemoryCache {
    entries: DashMap<String, (Instant, Vec<u8>)>,
    ttl: Duration,
}

impl MemoryCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: DashMap::new(),
            ttl,
        }
    }

    fn get(&self, key: &str) -> Option<Vec<u8>> {
        let expired = {
            let entry = self.entries.get(key)?;
            let (expires_at, value) = entry.value();
            if *expires_at > Instant::now() {
                return Some(value.clone());
            }
            true
        };

        if expired {
            self.entries.remove(key);
        }
        None
    }

    fn set(&self, key: &str, value: &[u8]) {
        self.entries
            .insert(key.to_string(), (Instant::now() + self.ttl, value.to_vec()));
    }
}

pub struct RedisCache {
    client: redis::Client,
    connection: Mutex<Option<redis::aio::ConnectionManager>>,
    prefix: String,
    ttl: Duration,
}

impl RedisCache {
    pub fn new(url: &str, prefix: String, ttl: Duration) -> Result<Self, redis::RedisError> {
        let client = redis::Client::open(url)?;

        Ok(Self {
            client,
            connection: Mutex::new(None),
            prefix,
            ttl,
        })
    }

    fn key(&self, key: &str) -> String {
        format!("{}{}", self.prefix, key)
    }

    async fn connection(
        &self,
    ) -> Result<tokio::sync::MutexGuard<'_, Option<redis::aio::ConnectionManager>>, redis::RedisError>
    {
        let mut guard = self.connection.lock().await;
        if guard.is_none() {
            *guard = Some(self.client.get_connection_manager().await?);
        }

        Ok(guard)
    }

    async fn get(&self, key: &str) -> Option<Vec<u8>> {
        let mut guard = match self.connection().await {
            Ok(guard) => guard,
            Err(e) => {
                log::warn!("Redis cache connection failed: {}", e);
                return None;
            }
        };
        let conn = guard.as_mut()?;

        let result: redis::RedisResult<Option<Vec<u8>>> = conn.get(self.key(key)).await;
        match result {
            Ok(value) => value,
            Err(e) => {
                log::warn!("Redis cache get failed: {}", e);
                *guard = None;
                None
            }
        }
    }

    async fn set(&self, key: &str, value: &[u8]) {
        let mut guard = match self.connection().await {
            Ok(guard) => guard,
            Err(e) => {
                log::warn!("Redis cache connection failed: {}", e);
                return;
            }
        };
        let Some(conn) = guard.as_mut() else {
            return;
        };

        let ttl = self.ttl.as_secs().max(1);
        let result: redis::RedisResult<()> = conn.set_ex(self.key(key), value, ttl).await;
        if let Err(e) = result {
            log::warn!("Redis cache set failed: {}", e);
            *guard = None;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::users::UserCategory;
    use crate::models::Page;

    fn query(search: &str, page: u32) -> UserQuery {
        UserQuery {
            search: search.to_string(),
            category: UserCategory::All,
            page: Page::new(Some(page), None).unwrap(),
        }
    }

    #[test]
    fn keys_depend_on_every_query_field() {
        assert_eq!(query_key(&query("ann", 1)), query_key(&query("ann", 1)));
        assert_ne!(query_key(&query("ann", 1)), query_key(&query("ann", 2)));
        assert_ne!(query_key(&query("ann", 1)), query_key(&query("bob", 1)));
        assert_eq!(query_key(&query("", 1)).len(), "users:".len() + 64);
    }

    #[tokio::test]
    async fn memory_entries_expire() {
        let cache = QueryCache::Memory(MemoryCache::new(Duration::from_millis(20)));

        cache.set("k", b"payload").await;
        assert_eq!(cache.get("k").await.as_deref(), Some(&b"payload"[..]));

        tokio::time::sleep(Duration::from_millis(40)).await;
        assert_eq!(cache.get("k").await, None);
    }

    #[tokio::test]
    async fn disabled_cache_never_hits() {
        let cache = QueryCache::Disabled;
        cache.set("k", b"payload").await;
        assert_eq!(cache.get("k").await, None);
    }

    #[test]
    fn redis_backend_requires_a_url() {
        let settings = settings::Cache {
            backend: CacheBackend::Redis,
            ..Default::default()
        };
        assert!(QueryCache::from_settings(&settings).is_err());
    }
}
