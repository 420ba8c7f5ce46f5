//! Runtime configuration.
//!
//! Built from environment variables (a `.env` file is honoured by the server
//! binary) or assembled by hand with the `with_*` setters.
//!
//! | Variable                 | Default        |
//! |--------------------------|----------------|
//! | `DATABASE_URL`           | required       |
//! | `BIND_ADDR`              | `0.0.0.0:5000` |
//! | `SESSION_RETENTION_SECS` | `86400`        |
//! | `CLEANUP_INTERVAL_SECS`  | `3600`         |
//! | `KEY_MAX_ATTEMPTS`       | `10`           |
//! | `DB_MAX_CONNECTIONS`     | `10`           |

use std::env;
use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

use sea_orm::ConnectOptions;

use crate::error::{Error, Result};

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub bind_addr: SocketAddr,
    /// Sessions are reaped this long after creation, whatever their status.
    pub session_retention: Duration,
    pub cleanup_interval: Duration,
    /// Join key draws before session creation gives up.
    pub key_max_attempts: usize,
    pub db_max_connections: u32,
}

impl Config {
    pub fn new(database_url: impl Into<String>) -> Self {
        Self {
            database_url: database_url.into(),
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 5000)),
            session_retention: Duration::from_secs(24 * 60 * 60),
            cleanup_interval: Duration::from_secs(60 * 60),
            key_max_attempts: 10,
            db_max_connections: 10,
        }
    }

    pub fn from_env() -> Result<Self> {
        let database_url =
            env::var("DATABASE_URL").map_err(|_| Error::Config("DATABASE_URL must be set".into()))?;
        let defaults = Self::new(database_url);

        Ok(Self {
            bind_addr: parse_var("BIND_ADDR")?.unwrap_or(defaults.bind_addr),
            session_retention: parse_var("SESSION_RETENTION_SECS")?
                .map(Duration::from_secs)
                .unwrap_or(defaults.session_retention),
            cleanup_interval: parse_var("CLEANUP_INTERVAL_SECS")?
                .map(Duration::from_secs)
                .unwrap_or(defaults.cleanup_interval),
            key_max_attempts: parse_var("KEY_MAX_ATTEMPTS")?.unwrap_or(defaults.key_max_attempts),
            db_max_connections: parse_var("DB_MAX_CONNECTIONS")?
                .unwrap_or(defaults.db_max_connections),
            ..defaults
        })
    }

    pub fn with_bind_addr(mut self, addr: SocketAddr) -> Self {
        self.bind_addr = addr;
        self
    }

    pub fn with_session_retention(mut self, retention: Duration) -> Self {
        self.session_retention = retention;
        self
    }

    pub fn with_cleanup_interval(mut self, interval: Duration) -> Self {
        self.cleanup_interval = interval;
        self
    }

    pub fn with_key_max_attempts(mut self, attempts: usize) -> Self {
        self.key_max_attempts = attempts;
        self
    }

    /// Retention as the `time` duration the store works with.
    pub fn retention(&self) -> time::Duration {
        time::Duration::try_from(self.session_retention).unwrap_or(time::Duration::MAX)
    }

    /// Connection pool settings for `sea_orm::Database::connect`.
    pub fn connect_options(&self) -> ConnectOptions {
        let mut opt = ConnectOptions::new(self.database_url.clone());
        opt.max_connections(self.db_max_connections)
            .min_connections(1)
            .connect_timeout(Duration::from_secs(10))
            .acquire_timeout(Duration::from_secs(10))
            .idle_timeout(Duration::from_secs(10 * 60))
            .max_lifetime(Duration::from_secs(30 * 60))
            .sqlx_logging(false);
        opt
    }
}

fn parse_var<T: FromStr>(name: &str) -> Result<Option<T>>
where
    T::Err: std::fmt::Display,
{
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|e| Error::Config(format!("{name}: {e}"))),
        Err(_) => Ok(None),
    }
}
