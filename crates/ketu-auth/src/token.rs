//! Token engine
//!
//! Builds, signs and verifies the bearer tokens carrying principal
//! identity claims. Access and refresh flavors are signed with distinct
//! secrets so possession of one flavor's secret cannot forge the other;
//! verification pins the algorithm to the HMAC family to shut out
//! algorithm-confusion attacks. Verification is pure - no side effects.

use std::time::Duration;

use chrono::Utc;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::config::JwtConfig;
use crate::error::{AuthError, AuthResult};
use crate::types::{Claims, IssuedToken, PrincipalKind, TokenFlavor};

/// Signed claim set as it travels on the wire
#[derive(Debug, Serialize, Deserialize)]
struct WireClaims {
    id: u64,
    email: String,
    role: String,
    kind: PrincipalKind,
    iat: i64,
    exp: i64,
}

struct FlavorKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl: Duration,
}

impl FlavorKeys {
    fn new(secret: &str, ttl: Duration) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            ttl,
        }
    }
}

/// Issues and verifies bearer tokens. Immutable after construction.
pub struct TokenEngine {
    access: FlavorKeys,
    refresh: FlavorKeys,
}

impl TokenEngine {
    pub fn new(config: &JwtConfig) -> Self {
        Self {
            access: FlavorKeys::new(&config.access_secret, config.access_ttl),
            refresh: FlavorKeys::new(&config.refresh_secret, config.refresh_ttl),
        }
    }

    fn keys(&self, flavor: TokenFlavor) -> &FlavorKeys {
        match flavor {
            TokenFlavor::Access => &self.access,
            TokenFlavor::Refresh => &self.refresh,
        }
    }

    /// Sign `claims` into a token of the given flavor, expiring after the
    /// flavor's configured TTL
    pub fn issue(&self, claims: &Claims, flavor: TokenFlavor) -> AuthResult<IssuedToken> {
        let keys = self.keys(flavor);
        let now = Utc::now().timestamp();
        let expires_at = now + keys.ttl.as_secs() as i64;

        let wire = WireClaims {
            id: claims.id,
            email: claims.email.clone(),
            role: claims.role.clone(),
            kind: claims.kind,
            iat: now,
            exp: expires_at,
        };

        let token = encode(&Header::new(Algorithm::HS256), &wire, &keys.encoding)
            .map_err(|_| AuthError::SigningFailed)?;

        Ok(IssuedToken { token, expires_at })
    }

    /// Verify a token of the given flavor and return its claims.
    ///
    /// Fails with [`AuthError::InvalidToken`] on a bad signature, a
    /// non-HS256 header algorithm, an elapsed expiry, or structurally
    /// incomplete claims.
    pub fn verify(&self, token: &str, flavor: TokenFlavor) -> AuthResult<Claims> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp"]);

        let data = decode::<WireClaims>(token, &self.keys(flavor).decoding, &validation)?;

        Ok(Claims {
            id: data.claims.id,
            email: data.claims.email,
            role: data.claims.role,
            kind: data.claims.kind,
        })
    }

    /// TTL of the given flavor, as configured
    pub fn ttl(&self, flavor: TokenFlavor) -> Duration {
        self.keys(flavor).ttl
    }
}
