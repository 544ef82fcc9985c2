//! In-memory session cache for tests
//!
//! TTL is enforced lazily: an expired entry is dropped on the read that
//! finds it, matching the no-sweep contract of the Redis backend.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::{CacheError, CacheResult, SessionCache};

#[derive(Default)]
pub struct MemoryCache {
    entries: RwLock<HashMap<String, (String, Instant)>>,
    fail: AtomicBool,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent call fail, simulating a backend outage
    pub fn set_failing(&self, failing: bool) {
        self.fail.store(failing, Ordering::SeqCst);
    }

    fn check_available(&self) -> CacheResult<()> {
        if self.fail.load(Ordering::SeqCst) {
            Err(CacheError::Unavailable("simulated outage".to_string()))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl SessionCache for MemoryCache {
    async fn put(&self, key: &str, value: &str, ttl: Duration) -> CacheResult<()> {
        self.check_available()?;
        let mut entries = self.entries.write().await;
        entries.insert(key.to_string(), (value.to_string(), Instant::now() + ttl));
        Ok(())
    }

    async fn get(&self, key: &str) -> CacheResult<Option<String>> {
        self.check_available()?;
        let mut entries = self.entries.write().await;
        match entries.get(key) {
            Some((value, deadline)) if *deadline > Instant::now() => Ok(Some(value.clone())),
            Some(_) => {
                entries.remove(key);
                Ok(None)
            }
            None => Ok(None),
        }
    }

    async fn delete(&self, key: &str) -> CacheResult<()> {
        self.check_available()?;
        let mut entries = self.entries.write().await;
        entries.remove(key);
        Ok(())
    }
}
