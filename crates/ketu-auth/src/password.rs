//! Credential hasher
//!
//! Argon2id hashing and verification. Hashing is CPU-bound; callers on an
//! async path run it through [`tokio::task::spawn_blocking`] (see the auth
//! service) so a burst of registrations cannot starve I/O-bound work.

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher as _, PasswordVerifier, SaltString},
    Argon2, Params, Version,
};
use zeroize::Zeroizing;

use crate::config::PasswordConfig;
use crate::error::{AuthError, AuthResult};

/// Password hashing and verification service
#[derive(Clone)]
pub struct PasswordHasher {
    config: PasswordConfig,
}

impl PasswordHasher {
    pub fn new(config: PasswordConfig) -> Self {
        Self { config }
    }

    /// Hash a password using Argon2id with a fresh random salt
    pub fn hash(&self, password: &str) -> AuthResult<String> {
        let password = Zeroizing::new(password.to_string());
        let salt = SaltString::generate(&mut OsRng);

        let params = Params::new(
            self.config.memory_cost,
            self.config.time_cost,
            self.config.parallelism,
            Some(self.config.hash_length as usize),
        )
        .map_err(|_| AuthError::HashingFailed)?;

        let argon2 = Argon2::new(argon2::Algorithm::Argon2id, Version::V0x13, params);

        let hash = argon2
            .hash_password(password.as_bytes(), &salt)
            .map_err(|_| AuthError::HashingFailed)?;

        Ok(hash.to_string())
    }

    /// Verify a password against a stored hash.
    ///
    /// A mismatch is `Ok(false)`; a malformed stored hash is an error.
    /// Comparison is constant-time inside argon2.
    pub fn verify(&self, hash: &str, password: &str) -> AuthResult<bool> {
        let password = Zeroizing::new(password.to_string());

        let parsed_hash = PasswordHash::new(hash).map_err(|_| AuthError::HashingFailed)?;

        match Argon2::default().verify_password(password.as_bytes(), &parsed_hash) {
            Ok(_) => Ok(true),
            Err(argon2::password_hash::Error::Password) => Ok(false),
            Err(_) => Err(AuthError::HashingFailed),
        }
    }
}
