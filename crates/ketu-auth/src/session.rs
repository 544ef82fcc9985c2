//! Refresh session manager
//!
//! Owns the lifecycle of refresh credentials. The refresh token is
//! server-held: it is written to the session cache on issue and read
//! back on refresh, so clients only ever see access tokens. At most one
//! live session exists per `(kind, id)`; a new login overwrites the
//! previous session's refresh credential.

use std::sync::Arc;

use tracing::{debug, warn};

use ketu_cache::SessionCache;

use crate::error::{AuthError, AuthResult};
use crate::token::TokenEngine;
use crate::types::{Claims, IssuedToken, PrincipalKind, TokenFlavor, TokenPair};

/// Issues token pairs and guards the stored refresh credential
pub struct SessionManager {
    engine: Arc<TokenEngine>,
    cache: Arc<dyn SessionCache>,
}

impl SessionManager {
    pub fn new(engine: Arc<TokenEngine>, cache: Arc<dyn SessionCache>) -> Self {
        Self { engine, cache }
    }

    /// Issue an access/refresh pair and persist the refresh half under
    /// the principal's session key.
    ///
    /// Persistence happens before the pair is handed out: if the cache
    /// write fails the caller gets [`AuthError::SessionPersist`] and no
    /// tokens, so a session can never exist that the server cannot
    /// later revoke.
    pub async fn open(&self, claims: &Claims) -> AuthResult<TokenPair> {
        let access = self.engine.issue(claims, TokenFlavor::Access)?;
        let refresh = self.engine.issue(claims, TokenFlavor::Refresh)?;

        let key = claims.kind.cache_key(claims.id);
        self.cache
            .put(&key, &refresh.token, self.engine.ttl(TokenFlavor::Refresh))
            .await
            .map_err(|e| AuthError::SessionPersist(e.to_string()))?;

        debug!(principal = %key, "session opened");
        Ok(TokenPair { access, refresh })
    }

    /// Mint a fresh access token from the stored refresh credential.
    ///
    /// An absent credential means no active session. A stored credential
    /// that fails verification, or whose claims name a different
    /// principal than the session key, is treated as compromised: the
    /// session is revoked before the error is returned.
    pub async fn refresh(&self, kind: PrincipalKind, id: u64) -> AuthResult<IssuedToken> {
        let key = kind.cache_key(id);

        let stored = self
            .cache
            .get(&key)
            .await?
            .ok_or(AuthError::NoActiveSession)?;

        let claims = match self.engine.verify(&stored, TokenFlavor::Refresh) {
            Ok(claims) if claims.kind == kind && claims.id == id => claims,
            _ => {
                warn!(principal = %key, "stored refresh credential invalid, revoking session");
                self.cache.delete(&key).await?;
                return Err(AuthError::InvalidSession);
            }
        };

        self.engine.issue(&claims, TokenFlavor::Access)
    }

    /// Drop the principal's session. Idempotent: logging out twice, or
    /// with no session at all, succeeds.
    pub async fn revoke(&self, kind: PrincipalKind, id: u64) -> AuthResult<()> {
        let key = kind.cache_key(id);
        self.cache.delete(&key).await?;
        debug!(principal = %key, "session revoked");
        Ok(())
    }
}
