//! Ketu session-token cache
//!
//! Key-value store holding the current refresh credential per principal,
//! keyed `"{kind}:{id}"` with a per-key TTL equal to the refresh-token
//! lifetime. Redis handles eviction; the core never sweeps.
//!
//! Every operation carries a bounded timeout and surfaces backend failure
//! as [`CacheError::Unavailable`]: a broken cache is a hard failure for
//! the enclosing request, never a silent bypass of revocation checks.

pub mod config;
pub mod error;

#[cfg(any(test, feature = "mock"))]
pub mod memory;

use std::time::Duration;

use async_trait::async_trait;
use deadpool_redis::{redis::AsyncCommands, Config as RedisPoolConfig, Pool, Runtime};
use tracing::info;

pub use config::CacheConfig;
pub use error::{CacheError, CacheResult};

/// Contract for the session-token store.
///
/// At most one value lives under a key at any time: `put` overwrites
/// unconditionally, `get` of an absent or expired key yields `None`, and
/// `delete` of an absent key is not an error.
#[async_trait]
pub trait SessionCache: Send + Sync {
    /// Store `value` under `key`, replacing any prior value, expiring after `ttl`.
    async fn put(&self, key: &str, value: &str, ttl: Duration) -> CacheResult<()>;

    /// Fetch the live value under `key`, if any.
    async fn get(&self, key: &str) -> CacheResult<Option<String>>;

    /// Remove `key`. Idempotent.
    async fn delete(&self, key: &str) -> CacheResult<()>;
}

/// Redis-backed session cache over a deadpool connection pool
pub struct RedisCache {
    pool: Pool,
    op_timeout: Duration,
}

impl RedisCache {
    /// Connect to Redis and verify the connection with a PING
    pub async fn connect(config: &CacheConfig) -> CacheResult<Self> {
        info!("Connecting to Redis: {}", config.url_masked());

        let pool = RedisPoolConfig::from_url(&config.url)
            .create_pool(Some(Runtime::Tokio1))
            .map_err(|e| CacheError::Connection(e.to_string()))?;

        let ping = async {
            let mut conn = pool.get().await?;
            let _: String = deadpool_redis::redis::cmd("PING")
                .query_async(&mut *conn)
                .await?;
            Ok::<(), CacheError>(())
        };
        tokio::time::timeout(config.connect_timeout, ping)
            .await
            .map_err(|_| CacheError::Connection("Redis ping timed out".to_string()))??;

        info!("Connected to Redis");

        Ok(Self {
            pool,
            op_timeout: config.op_timeout,
        })
    }

    async fn bounded<F, T>(&self, op: F) -> CacheResult<T>
    where
        F: std::future::Future<Output = CacheResult<T>>,
    {
        tokio::time::timeout(self.op_timeout, op)
            .await
            .map_err(|_| CacheError::Timeout(self.op_timeout))?
    }
}

#[async_trait]
impl SessionCache for RedisCache {
    async fn put(&self, key: &str, value: &str, ttl: Duration) -> CacheResult<()> {
        self.bounded(async {
            let mut conn = self.pool.get().await?;
            conn.set_ex::<_, _, ()>(key, value, ttl.as_secs()).await?;
            Ok(())
        })
        .await
    }

    async fn get(&self, key: &str) -> CacheResult<Option<String>> {
        self.bounded(async {
            let mut conn = self.pool.get().await?;
            let value: Option<String> = conn.get(key).await?;
            Ok(value)
        })
        .await
    }

    async fn delete(&self, key: &str) -> CacheResult<()> {
        self.bounded(async {
            let mut conn = self.pool.get().await?;
            conn.del::<_, ()>(key).await?;
            Ok(())
        })
        .await
    }
}
