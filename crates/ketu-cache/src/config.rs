//! Cache connection configuration

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Redis connection configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Redis connection URL
    pub url: String,
    /// Timeout applied to the connect-time ping
    #[serde(with = "humantime_serde")]
    pub connect_timeout: Duration,
    /// Timeout applied to every cache operation
    #[serde(with = "humantime_serde")]
    pub op_timeout: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            url: "redis://localhost:6379".to_string(),
            connect_timeout: Duration::from_secs(5),
            op_timeout: Duration::from_secs(5),
        }
    }
}

impl CacheConfig {
    /// Build configuration from environment variables, falling back to defaults
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        let mut config = Self::default();
        if let Ok(url) = std::env::var("REDIS_URL") {
            config.url = url;
        }
        if let Ok(timeout) = std::env::var("REDIS_OP_TIMEOUT") {
            if let Ok(d) = humantime_serde::re::humantime::parse_duration(&timeout) {
                config.op_timeout = d;
            }
        }
        config
    }

    /// Connection URL with credentials masked, safe for logs
    pub fn url_masked(&self) -> String {
        match self.url.find('@') {
            Some(at) => {
                let scheme_end = self.url.find("://").map(|i| i + 3).unwrap_or(0);
                format!("{}****@{}", &self.url[..scheme_end], &self.url[at + 1..])
            }
            None => self.url.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_url_masking_hides_password() {
        let config = CacheConfig {
            url: "redis://:secretpw@localhost:6379".to_string(),
            ..Default::default()
        };

        let masked = config.url_masked();
        assert!(!masked.contains("secretpw"));
        assert!(masked.contains("localhost:6379"));
    }

    #[test]
    fn test_url_masking_no_credentials() {
        let config = CacheConfig::default();
        assert_eq!(config.url_masked(), "redis://localhost:6379");
    }
}
