//! Application configuration loaded from environment variables.

use std::time::Duration;

/// Server configuration with sensible defaults.
///
/// Reads from environment variables:
/// - `HOST`: bind address (default: `"0.0.0.0"`)
/// - `PORT`: listen port (default: `3001`)
/// - `RUST_LOG`: tracing filter directive (default: `"info"`)
/// - `LEDGER_BASE_URL`: ledger service root (default: `"http://localhost:3000"`)
/// - `JWT_SECRET`: HS256 secret for bearer tokens (required, no default)
/// - `LEDGER_TIMEOUT_MS`: deadline for each ledger call (default: `5000`)
#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub log_level: String,
    pub ledger_base_url: String,
    pub jwt_secret: Option<String>,
    pub ledger_timeout_ms: u64,
}

impl Config {
    /// Loads configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Loads configuration from an arbitrary key lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        Self {
            host: lookup("HOST").unwrap_or(defaults.host),
            port: lookup("PORT")
                .and_then(|p| p.parse().ok())
                .unwrap_or(defaults.port),
            log_level: lookup("RUST_LOG").unwrap_or(defaults.log_level),
            ledger_base_url: lookup("LEDGER_BASE_URL").unwrap_or(defaults.ledger_base_url),
            jwt_secret: lookup("JWT_SECRET").filter(|s| !s.is_empty()),
            ledger_timeout_ms: lookup("LEDGER_TIMEOUT_MS")
                .and_then(|t| t.parse().ok())
                .filter(|t| *t > 0)
                .unwrap_or(defaults.ledger_timeout_ms),
        }
    }

    /// Returns the `"host:port"` bind address string.
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn ledger_timeout(&self) -> Duration {
        Duration::from_millis(self.ledger_timeout_ms)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3001,
            log_level: "info".to_string(),
            ledger_base_url: "http://localhost:3000".to_string(),
            jwt_secret: None,
            ledger_timeout_ms: 5000,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_values() {
        let config = Config::default();
        assert_eq!(config.port, 3001);
        assert_eq!(config.ledger_base_url, "http://localhost:3000");
        assert!(config.jwt_secret.is_none());
        assert_eq!(config.ledger_timeout(), Duration::from_secs(5));
    }

    #[test]
    fn test_values_from_lookup() {
        let config = Config::from_lookup(|key| match key {
            "LEDGER_BASE_URL" => Some("http://ledger:3000".to_string()),
            "JWT_SECRET" => Some("s3cret".to_string()),
            "LEDGER_TIMEOUT_MS" => Some("750".to_string()),
            _ => None,
        });
        assert_eq!(config.ledger_base_url, "http://ledger:3000");
        assert_eq!(config.jwt_secret.as_deref(), Some("s3cret"));
        assert_eq!(config.ledger_timeout(), Duration::from_millis(750));
        assert_eq!(config.addr(), "0.0.0.0:3001");
    }

    #[test]
    fn test_empty_secret_is_unset() {
        let config = Config::from_lookup(|key| (key == "JWT_SECRET").then(String::new));
        assert!(config.jwt_secret.is_none());
    }
}
