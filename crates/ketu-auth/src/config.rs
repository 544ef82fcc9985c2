//! Authentication configuration
//!
//! Loaded once at startup and immutable thereafter; every component holds
//! a clone, so concurrent reads need no synchronization.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Main authentication configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AuthConfig {
    /// JWT configuration
    pub jwt: JwtConfig,
    /// Password hashing configuration
    pub password: PasswordConfig,
}

/// JWT token configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JwtConfig {
    /// Secret for signing access tokens
    pub access_secret: String,
    /// Secret for signing refresh tokens. Must differ from the access
    /// secret: a leaked access secret must not mint long-lived tokens.
    pub refresh_secret: String,
    /// Access token lifetime
    #[serde(with = "humantime_serde")]
    pub access_ttl: Duration,
    /// Refresh token lifetime
    #[serde(with = "humantime_serde")]
    pub refresh_ttl: Duration,
}

impl Default for JwtConfig {
    fn default() -> Self {
        Self {
            access_secret: String::new(),  // Must be set in production
            refresh_secret: String::new(), // Must be set in production
            access_ttl: Duration::from_secs(15 * 60),           // 15 minutes
            refresh_ttl: Duration::from_secs(720 * 60 * 60),    // 720 hours
        }
    }
}

/// Password hashing configuration (Argon2id)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PasswordConfig {
    /// Memory cost in KiB
    pub memory_cost: u32,
    /// Time cost (iterations)
    pub time_cost: u32,
    /// Parallelism factor
    pub parallelism: u32,
    /// Output hash length in bytes
    pub hash_length: u32,
    /// Minimum accepted password length
    pub min_password_length: usize,
}

impl Default for PasswordConfig {
    fn default() -> Self {
        Self {
            // OWASP recommended values for Argon2id
            memory_cost: 19456, // 19 MiB
            time_cost: 2,
            parallelism: 1,
            hash_length: 32,
            min_password_length: 6,
        }
    }
}

impl AuthConfig {
    /// Create configuration from environment variables
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        let mut config = Self::default();

        if let Ok(secret) = std::env::var("AUTH_ACCESS_SECRET") {
            config.jwt.access_secret = secret;
        }
        if let Ok(secret) = std::env::var("AUTH_REFRESH_SECRET") {
            config.jwt.refresh_secret = secret;
        }
        if let Ok(ttl) = std::env::var("AUTH_ACCESS_TTL") {
            if let Ok(d) = humantime_serde::re::humantime::parse_duration(&ttl) {
                config.jwt.access_ttl = d;
            }
        }
        if let Ok(ttl) = std::env::var("AUTH_REFRESH_TTL") {
            if let Ok(d) = humantime_serde::re::humantime::parse_duration(&ttl) {
                config.jwt.refresh_ttl = d;
            }
        }
        if let Ok(len) = std::env::var("AUTH_MIN_PASSWORD_LEN") {
            if let Ok(n) = len.parse() {
                config.password.min_password_length = n;
            }
        }

        config
    }

    /// Validate the configuration, collecting every problem
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();

        if self.jwt.access_secret.is_empty() {
            errors.push("Access token secret must be set".to_string());
        }
        if self.jwt.refresh_secret.is_empty() {
            errors.push("Refresh token secret must be set".to_string());
        }
        if !self.jwt.access_secret.is_empty()
            && self.jwt.access_secret == self.jwt.refresh_secret
        {
            errors.push("Access and refresh secrets must be distinct".to_string());
        }
        if self.jwt.access_ttl.is_zero() {
            errors.push("Access token TTL must be positive".to_string());
        }
        if self.jwt.refresh_ttl.is_zero() {
            errors.push("Refresh token TTL must be positive".to_string());
        }
        if self.password.min_password_length == 0 {
            errors.push("Minimum password length must be positive".to_string());
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_ttls() {
        let config = AuthConfig::default();
        assert_eq!(config.jwt.access_ttl, Duration::from_secs(15 * 60));
        assert_eq!(config.jwt.refresh_ttl, Duration::from_secs(720 * 60 * 60));
    }

    #[test]
    fn test_validation_missing_secrets() {
        let config = AuthConfig::default();
        let errors = config.validate().unwrap_err();
        assert!(errors.iter().any(|e| e.contains("Access token secret")));
        assert!(errors.iter().any(|e| e.contains("Refresh token secret")));
    }

    #[test]
    fn test_validation_rejects_shared_secret() {
        let mut config = AuthConfig::default();
        config.jwt.access_secret = "same-secret".to_string();
        config.jwt.refresh_secret = "same-secret".to_string();

        let errors = config.validate().unwrap_err();
        assert!(errors.iter().any(|e| e.contains("distinct")));
    }

    #[test]
    fn test_validation_ok() {
        let mut config = AuthConfig::default();
        config.jwt.access_secret = "access-secret-for-tests".to_string();
        config.jwt.refresh_secret = "refresh-secret-for-tests".to_string();

        assert!(config.validate().is_ok());
    }
}
