//! Ketu authentication core
//!
//! Multi-principal authentication built around short-lived access tokens
//! and server-held refresh credentials:
//!
//! - **Token engine**: HS256 access/refresh tokens, distinct secrets per
//!   flavor, algorithm-pinned verification
//! - **Session manager**: one live refresh credential per principal,
//!   stored in a TTL cache under `"{kind}:{id}"`
//! - **Auth service**: register, login, refresh and logout, scoped to a
//!   single principal kind
//! - **Gate**: Tower layer that admits only requests carrying a valid
//!   `Bearer` access token
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │                  Authentication Flow                     │
//! ├──────────────────────────────────────────────────────────┤
//! │  Request → AuthGate → Handler → AuthService              │
//! │               │                     │                    │
//! │               ▼                     ▼                    │
//! │          TokenEngine ◄───── SessionManager               │
//! │                                     │                    │
//! │                                     ▼                    │
//! │                              SessionCache                │
//! └──────────────────────────────────────────────────────────┘
//! ```
//!
//! The same numeric id may exist as both a user and an owner; the
//! principal kind travels inside every token and session key, so the
//! two namespaces never observe each other.

pub mod config;
pub mod error;
pub mod middleware;
pub mod password;
pub mod service;
pub mod session;
pub mod store;
pub mod token;
pub mod types;

pub use config::{AuthConfig, JwtConfig, PasswordConfig};
pub use error::{AuthError, AuthResult, ErrorResponse};
pub use middleware::{authenticate, AuthGate, AuthGateLayer, OptionalPrincipal, Principal};
pub use password::PasswordHasher;
pub use service::AuthService;
pub use session::SessionManager;
pub use store::{PrincipalStore, StoreError};
pub use token::TokenEngine;
pub use types::*;

use std::sync::Arc;

use ketu_cache::SessionCache;

/// Composition root wiring the token engine, session manager and one
/// auth service per principal kind over a shared cache.
pub struct AuthCore {
    engine: Arc<TokenEngine>,
    sessions: Arc<SessionManager>,
    pub users: AuthService,
    pub owners: AuthService,
}

impl AuthCore {
    /// Build the core from validated configuration.
    ///
    /// Fails when the configuration is invalid or the initial hashing
    /// self-check cannot complete.
    pub fn new(
        config: &AuthConfig,
        cache: Arc<dyn SessionCache>,
        user_store: Arc<dyn PrincipalStore>,
        owner_store: Arc<dyn PrincipalStore>,
    ) -> AuthResult<Self> {
        config
            .validate()
            .map_err(|errors| AuthError::Validation(errors.join("; ")))?;

        let engine = Arc::new(TokenEngine::new(&config.jwt));
        let sessions = Arc::new(SessionManager::new(engine.clone(), cache));
        let hasher = PasswordHasher::new(config.password.clone());

        let users = AuthService::new(
            PrincipalKind::User,
            user_store,
            hasher.clone(),
            sessions.clone(),
            config.password.min_password_length,
        )?;
        let owners = AuthService::new(
            PrincipalKind::Owner,
            owner_store,
            hasher,
            sessions.clone(),
            config.password.min_password_length,
        )?;

        Ok(Self {
            engine,
            sessions,
            users,
            owners,
        })
    }

    /// The service handling the given principal kind
    pub fn service(&self, kind: PrincipalKind) -> &AuthService {
        match kind {
            PrincipalKind::User => &self.users,
            PrincipalKind::Owner => &self.owners,
        }
    }

    pub fn sessions(&self) -> &Arc<SessionManager> {
        &self.sessions
    }

    /// Gate admitting any principal kind
    pub fn gate(&self) -> AuthGateLayer {
        AuthGateLayer::any(self.engine.clone())
    }

    /// Gate admitting only the given principal kind
    pub fn gate_for(&self, kind: PrincipalKind) -> AuthGateLayer {
        AuthGateLayer::for_kind(self.engine.clone(), kind)
    }
}
