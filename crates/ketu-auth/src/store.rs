//! Principal store abstraction
//!
//! The auth service is written against [`PrincipalStore`] so the same
//! registration and login flows serve any backing store. Each store
//! instance holds exactly one kind of principal; keeping users and
//! owners in separate stores is what makes their id namespaces
//! independent.

use async_trait::async_trait;
use thiserror::Error;

use crate::error::AuthError;
use crate::types::{NewPrincipal, PrincipalRecord};

/// Store-level failures, kept separate from [`AuthError`] so store
/// implementations need no knowledge of HTTP semantics
#[derive(Debug, Error)]
pub enum StoreError {
    /// The email is already taken within this store
    #[error("email already registered")]
    DuplicateEmail,

    /// Backend failure (connection lost, query failed, ...)
    #[error("store backend error: {0}")]
    Backend(String),
}

impl From<StoreError> for AuthError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::DuplicateEmail => Self::EmailExists,
            StoreError::Backend(msg) => Self::Store(msg),
        }
    }
}

/// Persistence seam for principal records
#[async_trait]
pub trait PrincipalStore: Send + Sync {
    /// Look up a principal by email. `Ok(None)` when absent.
    async fn find_by_email(&self, email: &str) -> Result<Option<PrincipalRecord>, StoreError>;

    /// Look up a principal by id. `Ok(None)` when absent.
    async fn find_by_id(&self, id: u64) -> Result<Option<PrincipalRecord>, StoreError>;

    /// Insert a new principal and return the stored record with its
    /// assigned id. Fails with [`StoreError::DuplicateEmail`] when the
    /// email is taken.
    async fn insert(&self, principal: NewPrincipal) -> Result<PrincipalRecord, StoreError>;
}

#[cfg(any(test, feature = "mock"))]
pub use memory::MemoryStore;

#[cfg(any(test, feature = "mock"))]
mod memory {
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicU64, Ordering};

    use chrono::Utc;
    use tokio::sync::RwLock;

    use super::*;

    /// In-memory store for tests and local development
    pub struct MemoryStore {
        records: RwLock<HashMap<u64, PrincipalRecord>>,
        next_id: AtomicU64,
        fail: std::sync::atomic::AtomicBool,
    }

    impl MemoryStore {
        pub fn new() -> Self {
            Self {
                records: RwLock::new(HashMap::new()),
                next_id: AtomicU64::new(1),
                fail: std::sync::atomic::AtomicBool::new(false),
            }
        }

        /// Make every subsequent call fail, simulating a backend outage
        pub fn set_failing(&self, failing: bool) {
            self.fail.store(failing, Ordering::SeqCst);
        }

        fn check_available(&self) -> Result<(), StoreError> {
            if self.fail.load(Ordering::SeqCst) {
                Err(StoreError::Backend("simulated outage".to_string()))
            } else {
                Ok(())
            }
        }
    }

    #[async_trait]
    impl PrincipalStore for MemoryStore {
        async fn find_by_email(
            &self,
            email: &str,
        ) -> Result<Option<PrincipalRecord>, StoreError> {
            self.check_available()?;
            let records = self.records.read().await;
            Ok(records.values().find(|r| r.email == email).cloned())
        }

        async fn find_by_id(&self, id: u64) -> Result<Option<PrincipalRecord>, StoreError> {
            self.check_available()?;
            let records = self.records.read().await;
            Ok(records.get(&id).cloned())
        }

        async fn insert(&self, principal: NewPrincipal) -> Result<PrincipalRecord, StoreError> {
            self.check_available()?;
            let mut records = self.records.write().await;

            if records.values().any(|r| r.email == principal.email) {
                return Err(StoreError::DuplicateEmail);
            }

            let id = self.next_id.fetch_add(1, Ordering::SeqCst);
            let now = Utc::now();
            let record = PrincipalRecord {
                id,
                email: principal.email,
                password_hash: principal.password_hash,
                name: principal.name,
                role: principal.role,
                username: principal.username,
                phone: principal.phone,
                created_at: now,
                updated_at: now,
            };
            records.insert(id, record.clone());
            Ok(record)
        }
    }
}
