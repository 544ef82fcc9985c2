//! Principal-scoped authentication service
//!
//! One `AuthService` instance serves exactly one principal kind; a
//! deployment with users and owners runs two instances over separate
//! stores and one shared session manager. All flows return [`AuthError`]
//! values that deliberately do not reveal whether an email is registered.

use std::sync::Arc;

use tracing::{info, warn};
use validator::Validate;

use crate::error::{AuthError, AuthResult};
use crate::password::PasswordHasher;
use crate::session::SessionManager;
use crate::store::PrincipalStore;
use crate::types::{
    AuthResponse, Claims, LoginRequest, NewPrincipal, PrincipalInfo, PrincipalKind,
    RefreshResponse, RegisterRequest,
};

/// Registration, login, refresh and logout for one principal kind
pub struct AuthService {
    kind: PrincipalKind,
    store: Arc<dyn PrincipalStore>,
    hasher: PasswordHasher,
    sessions: Arc<SessionManager>,
    min_password_length: usize,
    /// Hash of a throwaway password, verified against when the email is
    /// unknown so login latency does not betray which emails exist.
    dummy_hash: String,
}

impl AuthService {
    pub fn new(
        kind: PrincipalKind,
        store: Arc<dyn PrincipalStore>,
        hasher: PasswordHasher,
        sessions: Arc<SessionManager>,
        min_password_length: usize,
    ) -> AuthResult<Self> {
        let dummy_hash = hasher.hash("throwaway-timing-pad")?;
        Ok(Self {
            kind,
            store,
            hasher,
            sessions,
            min_password_length,
            dummy_hash,
        })
    }

    pub fn kind(&self) -> PrincipalKind {
        self.kind
    }

    /// Register a new principal and open its first session
    pub async fn register(&self, request: RegisterRequest) -> AuthResult<AuthResponse> {
        request
            .validate()
            .map_err(|e| AuthError::Validation(e.to_string()))?;
        if request.password.chars().count() < self.min_password_length {
            return Err(AuthError::Validation(format!(
                "Password must be at least {} characters",
                self.min_password_length
            )));
        }

        if self.store.find_by_email(&request.email).await?.is_some() {
            return Err(AuthError::EmailExists);
        }

        let password_hash = self.hash_blocking(request.password.clone()).await?;

        // The store also enforces uniqueness, closing the window between
        // the lookup above and this insert.
        let record = self
            .store
            .insert(NewPrincipal {
                email: request.email,
                password_hash,
                name: request.name,
                role: self.kind.default_role().to_string(),
                username: request.username,
                phone: request.phone,
            })
            .await?;

        let pair = self
            .sessions
            .open(&Claims {
                id: record.id,
                email: record.email.clone(),
                role: record.role.clone(),
                kind: self.kind,
            })
            .await?;

        info!(id = record.id, kind = %self.kind, "principal registered");

        Ok(AuthResponse {
            principal: PrincipalInfo::from_record(&record, self.kind),
            access_token: pair.access.token,
            expires_at: pair.access.expires_at,
        })
    }

    /// Authenticate credentials and open a session, replacing any prior one
    pub async fn login(&self, request: LoginRequest) -> AuthResult<AuthResponse> {
        request
            .validate()
            .map_err(|e| AuthError::Validation(e.to_string()))?;

        let record = match self.store.find_by_email(&request.email).await? {
            Some(record) => record,
            None => {
                // Burn the same hashing work as the found path
                let _ = self
                    .verify_blocking(self.dummy_hash.clone(), request.password)
                    .await;
                return Err(AuthError::InvalidCredentials);
            }
        };

        let matches = self
            .verify_blocking(record.password_hash.clone(), request.password)
            .await?;
        if !matches {
            warn!(id = record.id, kind = %self.kind, "login failed: bad password");
            return Err(AuthError::InvalidCredentials);
        }

        let pair = self
            .sessions
            .open(&Claims {
                id: record.id,
                email: record.email.clone(),
                role: record.role.clone(),
                kind: self.kind,
            })
            .await?;

        info!(id = record.id, kind = %self.kind, "login succeeded");

        Ok(AuthResponse {
            principal: PrincipalInfo::from_record(&record, self.kind),
            access_token: pair.access.token,
            expires_at: pair.access.expires_at,
        })
    }

    /// Mint a fresh access token from the server-held refresh credential
    pub async fn refresh(&self, id: u64) -> AuthResult<RefreshResponse> {
        let access = self.sessions.refresh(self.kind, id).await?;
        Ok(RefreshResponse {
            access_token: access.token,
            expires_at: access.expires_at,
        })
    }

    /// Close the principal's session. Idempotent.
    pub async fn logout(&self, id: u64) -> AuthResult<()> {
        self.sessions.revoke(self.kind, id).await
    }

    async fn hash_blocking(&self, password: String) -> AuthResult<String> {
        let hasher = self.hasher.clone();
        tokio::task::spawn_blocking(move || hasher.hash(&password))
            .await
            .map_err(|_| AuthError::HashingFailed)?
    }

    async fn verify_blocking(&self, hash: String, password: String) -> AuthResult<bool> {
        let hasher = self.hasher.clone();
        tokio::task::spawn_blocking(move || hasher.verify(&hash, &password))
            .await
            .map_err(|_| AuthError::HashingFailed)?
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use ketu_cache::memory::MemoryCache;

    use super::*;
    use crate::config::{JwtConfig, PasswordConfig};
    use crate::store::MemoryStore;
    use crate::token::TokenEngine;
    use crate::types::TokenFlavor;

    fn test_password_config() -> PasswordConfig {
        PasswordConfig {
            memory_cost: 4096,
            time_cost: 1,
            parallelism: 1,
            hash_length: 32,
            min_password_length: 6,
        }
    }

    fn test_engine() -> Arc<TokenEngine> {
        Arc::new(TokenEngine::new(&JwtConfig {
            access_secret: "access-secret-for-tests".to_string(),
            refresh_secret: "refresh-secret-for-tests".to_string(),
            access_ttl: Duration::from_secs(900),
            refresh_ttl: Duration::from_secs(3600),
        }))
    }

    fn service(kind: PrincipalKind, sessions: Arc<SessionManager>) -> AuthService {
        AuthService::new(
            kind,
            Arc::new(MemoryStore::new()),
            PasswordHasher::new(test_password_config()),
            sessions,
            6,
        )
        .unwrap()
    }

    fn user_service() -> AuthService {
        let sessions = Arc::new(SessionManager::new(
            test_engine(),
            Arc::new(MemoryCache::new()),
        ));
        service(PrincipalKind::User, sessions)
    }

    fn register_request(email: &str) -> RegisterRequest {
        RegisterRequest {
            email: email.to_string(),
            password: "secret1".to_string(),
            name: "Ada".to_string(),
            username: Some("ada_l".to_string()),
            phone: None,
        }
    }

    fn login_request(email: &str, password: &str) -> LoginRequest {
        LoginRequest {
            email: email.to_string(),
            password: password.to_string(),
        }
    }

    #[tokio::test]
    async fn test_register_returns_usable_access_token() {
        let svc = user_service();

        let response = svc.register(register_request("a@x.com")).await.unwrap();

        assert_eq!(response.principal.email, "a@x.com");
        assert_eq!(response.principal.role, "user");

        let claims = test_engine()
            .verify(&response.access_token, TokenFlavor::Access)
            .unwrap();
        assert_eq!(claims.id, response.principal.id);
        assert_eq!(claims.kind, PrincipalKind::User);
    }

    #[tokio::test]
    async fn test_register_rejects_short_password() {
        let svc = user_service();
        let mut request = register_request("a@x.com");
        request.password = "abc".to_string();

        let result = svc.register(request).await;
        assert!(matches!(result, Err(AuthError::Validation(_))));
    }

    #[tokio::test]
    async fn test_register_rejects_duplicate_email() {
        let svc = user_service();

        svc.register(register_request("a@x.com")).await.unwrap();
        let result = svc.register(register_request("a@x.com")).await;

        assert!(matches!(result, Err(AuthError::EmailExists)));
    }

    #[tokio::test]
    async fn test_login_round_trip() {
        let svc = user_service();
        svc.register(register_request("a@x.com")).await.unwrap();

        let response = svc.login(login_request("a@x.com", "secret1")).await.unwrap();
        assert_eq!(response.principal.email, "a@x.com");
    }

    #[tokio::test]
    async fn test_login_failures_are_indistinguishable() {
        let svc = user_service();
        svc.register(register_request("a@x.com")).await.unwrap();

        let wrong_password = svc.login(login_request("a@x.com", "wrong-1")).await;
        let unknown_email = svc.login(login_request("nobody@x.com", "secret1")).await;

        assert!(matches!(wrong_password, Err(AuthError::InvalidCredentials)));
        assert!(matches!(unknown_email, Err(AuthError::InvalidCredentials)));
    }

    #[tokio::test]
    async fn test_refresh_after_login() {
        let svc = user_service();
        let registered = svc.register(register_request("a@x.com")).await.unwrap();

        let refreshed = svc.refresh(registered.principal.id).await.unwrap();

        let claims = test_engine()
            .verify(&refreshed.access_token, TokenFlavor::Access)
            .unwrap();
        assert_eq!(claims.id, registered.principal.id);
    }

    #[tokio::test]
    async fn test_logout_closes_session() {
        let svc = user_service();
        let registered = svc.register(register_request("a@x.com")).await.unwrap();

        svc.logout(registered.principal.id).await.unwrap();

        let result = svc.refresh(registered.principal.id).await;
        assert!(matches!(result, Err(AuthError::NoActiveSession)));

        // Logout stays idempotent after the session is gone
        svc.logout(registered.principal.id).await.unwrap();
    }

    #[tokio::test]
    async fn test_kinds_are_isolated_even_with_shared_cache() {
        let sessions = Arc::new(SessionManager::new(
            test_engine(),
            Arc::new(MemoryCache::new()),
        ));
        let users = service(PrincipalKind::User, sessions.clone());
        let owners = service(PrincipalKind::Owner, sessions);

        let user = users.register(register_request("a@x.com")).await.unwrap();
        let owner = owners.register(register_request("a@x.com")).await.unwrap();

        // Separate stores, so the same email registers in both namespaces
        // and ids may collide without the sessions colliding
        users.logout(user.principal.id).await.unwrap();
        assert!(owners.refresh(owner.principal.id).await.is_ok());
    }

    #[tokio::test]
    async fn test_store_outage_surfaces_as_unavailable() {
        let store = Arc::new(MemoryStore::new());
        let sessions = Arc::new(SessionManager::new(
            test_engine(),
            Arc::new(MemoryCache::new()),
        ));
        let svc = AuthService::new(
            PrincipalKind::User,
            store.clone(),
            PasswordHasher::new(test_password_config()),
            sessions,
            6,
        )
        .unwrap();

        store.set_failing(true);
        let result = svc.login(login_request("a@x.com", "secret1")).await;

        match result {
            Err(err) => assert_eq!(err.status_code(), 503),
            Ok(_) => panic!("expected a store error"),
        }
    }
}
