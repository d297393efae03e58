//! Process settings from the environment (`.env` honoured via dotenvy).

use crate::error::ConfigError;
use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

#[derive(Clone, Debug)]
pub struct Settings {
    pub database_url: String,
    pub http_addr: SocketAddr,
    /// Single pool shared by every entity repository.
    pub db_max_connections: u32,
    pub db_acquire_timeout: Duration,
    /// Deadline for a whole request; in-flight queries are dropped with it.
    pub request_timeout: Duration,
    pub body_limit_bytes: usize,
    /// Create missing tables at startup.
    pub auto_migrate: bool,
}

impl Settings {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build settings from an arbitrary key lookup (the environment in production).
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str, default: &str| lookup(key).filter(|v| !v.is_empty()).unwrap_or_else(|| default.to_string());

        let database_url = match lookup("DATABASE_URL").filter(|v| !v.is_empty()) {
            Some(url) => url,
            None => format!(
                "postgres://{}:{}@{}:{}/{}?sslmode=disable",
                get("POSTGRES_USER", "postgres"),
                get("POSTGRES_PASSWORD", ""),
                get("POSTGRES_HOST", "localhost"),
                get("POSTGRES_PORT", "5432"),
                get("POSTGRES_DB", "shifolink"),
            ),
        };

        Ok(Settings {
            database_url,
            http_addr: parse("HTTP_ADDR", &get("HTTP_ADDR", "0.0.0.0:8080"))?,
            db_max_connections: parse("DB_MAX_CONNECTIONS", &get("DB_MAX_CONNECTIONS", "100"))?,
            db_acquire_timeout: Duration::from_secs(parse("DB_ACQUIRE_TIMEOUT_SECS", &get("DB_ACQUIRE_TIMEOUT_SECS", "5"))?),
            request_timeout: Duration::from_secs(parse("REQUEST_TIMEOUT_SECS", &get("REQUEST_TIMEOUT_SECS", "30"))?),
            body_limit_bytes: parse("BODY_LIMIT_BYTES", &get("BODY_LIMIT_BYTES", "1048576"))?,
            auto_migrate: parse("AUTO_MIGRATE", &get("AUTO_MIGRATE", "true"))?,
        })
    }
}

fn parse<T: FromStr>(key: &str, raw: &str) -> Result<T, ConfigError> {
    raw.trim()
        .parse()
        .map_err(|_| ConfigError::Load(format!("{} has invalid value '{}'", key, raw)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn settings(vars: &[(&str, &str)]) -> Result<Settings, ConfigError> {
        let vars: HashMap<String, String> = vars.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        Settings::from_lookup(|k| vars.get(k).cloned())
    }

    #[test]
    fn defaults() {
        let s = settings(&[]).unwrap();
        assert_eq!(s.database_url, "postgres://postgres:@localhost:5432/shifolink?sslmode=disable");
        assert_eq!(s.http_addr.port(), 8080);
        assert_eq!(s.db_max_connections, 100);
        assert_eq!(s.request_timeout, Duration::from_secs(30));
        assert!(s.auto_migrate);
    }

    #[test]
    fn database_url_wins_over_parts() {
        let s = settings(&[("DATABASE_URL", "postgres://u:p@db/x"), ("POSTGRES_HOST", "ignored")]).unwrap();
        assert_eq!(s.database_url, "postgres://u:p@db/x");
    }

    #[test]
    fn composes_url_from_parts() {
        let s = settings(&[("POSTGRES_HOST", "db"), ("POSTGRES_USER", "app"), ("POSTGRES_PASSWORD", "secret")]).unwrap();
        assert_eq!(s.database_url, "postgres://app:secret@db:5432/shifolink?sslmode=disable");
    }

    #[test]
    fn malformed_number_is_rejected() {
        assert!(matches!(settings(&[("DB_MAX_CONNECTIONS", "lots")]), Err(ConfigError::Load(_))));
        assert!(matches!(settings(&[("AUTO_MIGRATE", "maybe")]), Err(ConfigError::Load(_))));
    }
}
