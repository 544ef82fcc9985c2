//! Core authentication types
//!
//! Shared types used across the token engine, session manager, auth
//! service and gate.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

// =============================================================================
// Principal kinds and claims
// =============================================================================

/// The two independent principal namespaces.
///
/// `kind` travels inside every issued token so a user-issued token can
/// never be mistaken for an owner-issued one even when numeric ids collide.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PrincipalKind {
    User,
    Owner,
}

impl PrincipalKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Owner => "owner",
        }
    }

    /// Role granted to a freshly registered principal of this kind
    pub fn default_role(&self) -> &'static str {
        self.as_str()
    }

    /// Session-cache key for a principal of this kind
    pub fn cache_key(&self, id: u64) -> String {
        format!("{}:{}", self.as_str(), id)
    }
}

impl std::fmt::Display for PrincipalKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Identity claims carried by every issued token. Immutable once signed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Principal ID within its kind's namespace
    pub id: u64,
    /// Principal email
    pub email: String,
    /// Role string ("user", "owner", ...)
    pub role: String,
    /// Principal namespace
    pub kind: PrincipalKind,
}

/// Identity attributes the gate injects into a verified request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthenticatedPrincipal {
    pub id: u64,
    pub email: String,
    pub role: String,
    pub kind: PrincipalKind,
}

impl From<Claims> for AuthenticatedPrincipal {
    fn from(claims: Claims) -> Self {
        Self {
            id: claims.id,
            email: claims.email,
            role: claims.role,
            kind: claims.kind,
        }
    }
}

// =============================================================================
// Token types
// =============================================================================

/// Token flavor, each signed with its own secret and TTL
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenFlavor {
    Access,
    Refresh,
}

/// A signed token string together with its expiry (unix timestamp)
#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub token: String,
    pub expires_at: i64,
}

/// Access/refresh pair issued on register and login.
///
/// The refresh half never leaves the trust boundary: it is persisted in
/// the session cache and only the access half is returned to clients.
#[derive(Debug, Clone)]
pub struct TokenPair {
    pub access: IssuedToken,
    pub refresh: IssuedToken,
}

// =============================================================================
// Principal records (store-facing)
// =============================================================================

/// Principal row as the store returns it. The core only ever reads
/// `password_hash`; plaintext passwords never reach a record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrincipalRecord {
    pub id: u64,
    pub email: String,
    pub password_hash: String,
    pub name: String,
    pub role: String,
    pub username: Option<String>,
    pub phone: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Fields for creating a principal; the store assigns the id
#[derive(Debug, Clone)]
pub struct NewPrincipal {
    pub email: String,
    pub password_hash: String,
    pub name: String,
    pub role: String,
    pub username: Option<String>,
    pub phone: Option<String>,
}

// =============================================================================
// Request / response DTOs
// =============================================================================

/// Registration request
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct RegisterRequest {
    /// Email address
    #[validate(email(message = "Invalid email address"))]
    pub email: String,
    /// Password (minimum length enforced from configuration)
    pub password: String,
    /// Display name
    #[validate(length(min = 1, message = "Name is required"))]
    pub name: String,
    /// Username (user principals)
    #[serde(default)]
    #[validate(length(min = 3, max = 50, message = "Username must be 3-50 characters"))]
    pub username: Option<String>,
    /// Phone number (owner principals)
    #[serde(default)]
    pub phone: Option<String>,
}

/// Login request
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct LoginRequest {
    /// Email address
    #[validate(email(message = "Invalid email address"))]
    pub email: String,
    /// Password
    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
}

/// Public principal profile for responses
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PrincipalInfo {
    pub id: u64,
    pub email: String,
    pub name: String,
    pub role: String,
    pub kind: PrincipalKind,
}

impl PrincipalInfo {
    pub fn from_record(record: &PrincipalRecord, kind: PrincipalKind) -> Self {
        Self {
            id: record.id,
            email: record.email.clone(),
            name: record.name.clone(),
            role: record.role.clone(),
            kind,
        }
    }
}

/// Register/login response: profile plus the access token.
/// The refresh token is server-held and never serialized.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthResponse {
    pub principal: PrincipalInfo,
    pub access_token: String,
    /// Access token expiry (unix timestamp)
    pub expires_at: i64,
}

/// Refresh response: a fresh access token only
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshResponse {
    pub access_token: String,
    /// Access token expiry (unix timestamp)
    pub expires_at: i64,
}
