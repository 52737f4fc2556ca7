//! Application configuration loaded from environment variables.

/// Server configuration with sensible defaults.
///
/// Reads from environment variables:
/// - `HOST`: bind address (default: `"0.0.0.0"`)
/// - `PORT`: listen port (default: `3000`)
/// - `RUST_LOG`: tracing filter directive (default: `"info"`)
/// - `DATABASE_URL`: PostgreSQL connection string (default: unset, in-memory stores)
/// - `LOAN_PERIOD_DAYS`: days until a receipt is due (default: `14`)
/// - `RECLAIM_AFTER_SECS`: age at which an unclaimed pending receipt is
///   removed by the background sweep (default: `300`, `0` disables the sweep)
#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub log_level: String,
    pub database_url: Option<String>,
    pub loan_period_days: i64,
    pub reclaim_after_secs: u64,
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
            database_url: lookup("DATABASE_URL").filter(|url| !url.is_empty()),
            loan_period_days: lookup("LOAN_PERIOD_DAYS")
                .and_then(|d| d.parse().ok())
                .filter(|d| *d > 0)
                .unwrap_or(defaults.loan_period_days),
            reclaim_after_secs: lookup("RECLAIM_AFTER_SECS")
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.reclaim_after_secs),
        }
    }

    /// Returns the `"host:port"` bind address string.
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            log_level: "info".to_string(),
            database_url: None,
            loan_period_days: ledger::DEFAULT_LOAN_PERIOD_DAYS,
            reclaim_after_secs: 300,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_default_values() {
        let config = Config::default();
        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.port, 3000);
        assert_eq!(config.log_level, "info");
        assert!(config.database_url.is_none());
        assert_eq!(config.loan_period_days, 14);
        assert_eq!(config.reclaim_after_secs, 300);
    }

    #[test]
    fn test_values_from_lookup() {
        let config = Config::from_lookup(lookup(&[
            ("PORT", "8080"),
            ("DATABASE_URL", "postgres://localhost/library"),
            ("LOAN_PERIOD_DAYS", "21"),
            ("RECLAIM_AFTER_SECS", "0"),
        ]));
        assert_eq!(config.port, 8080);
        assert_eq!(
            config.database_url.as_deref(),
            Some("postgres://localhost/library")
        );
        assert_eq!(config.loan_period_days, 21);
        assert_eq!(config.reclaim_after_secs, 0);
    }

    #[test]
    fn test_invalid_values_fall_back() {
        let config = Config::from_lookup(lookup(&[
            ("PORT", "not-a-port"),
            ("DATABASE_URL", ""),
            ("LOAN_PERIOD_DAYS", "-3"),
        ]));
        assert_eq!(config.port, 3000);
        assert!(config.database_url.is_none());
        assert_eq!(config.loan_period_days, 14);
    }

    #[test]
    fn test_addr_formatting() {
        let config = Config {
            host: "127.0.0.1".to_string(),
            port: 8080,
            ..Config::default()
        };
        assert_eq!(config.addr(), "127.0.0.1:8080");
    }
}
