//! Runtime configuration read from the environment
//!
//! Values come from process environment variables (a `.env` file is loaded by
//! `main` beforehand). Missing or unparseable values fall back to defaults.

use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

/// Default relay chunk size: 8 MiB
pub const DEFAULT_CHUNK_SIZE: usize = 8 * 1024 * 1024;

/// Default retention window in days
pub const DEFAULT_RETENTION_DAYS: i64 = 3;

/// Service configuration
///
/// # Environment Variables
///
/// - `PORT` - Server port number (default: 8080)
/// - `DATABASE_URL` - Path to database file (default: "data.db")
/// - `ANALYTICS_PATH` - Route of the record listing (default: "/analytics")
/// - `ACCESSIBLE_DIR` - Directory served for any other path (default: ".accessible")
/// - `RETENTION_DAYS` - Days a link stays downloadable (default: 3)
/// - `CHUNK_SIZE` - Relay chunk size in bytes (default: 8388608)
/// - `CONNECT_TIMEOUT_SECS` - Outbound connect timeout (default: 30)
/// - `READ_TIMEOUT_SECS` - Outbound per-read timeout (default: 300)
#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub database_path: String,
    pub analytics_path: String,
    pub accessible_dir: PathBuf,
    pub retention: chrono::Duration,
    pub chunk_size: usize,
    pub connect_timeout: Duration,
    pub read_timeout: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: 8080,
            database_path: "data.db".to_string(),
            analytics_path: "/analytics".to_string(),
            accessible_dir: PathBuf::from(".accessible"),
            retention: chrono::Duration::days(DEFAULT_RETENTION_DAYS),
            chunk_size: DEFAULT_CHUNK_SIZE,
            connect_timeout: Duration::from_secs(30),
            read_timeout: Duration::from_secs(300),
        }
    }
}

impl Config {
    /// Builds the configuration from environment variables
    pub fn from_env() -> Self {
        let defaults = Self::default();

        Self {
            port: parsed("PORT").unwrap_or(defaults.port),
            database_path: env::var("DATABASE_URL").unwrap_or(defaults.database_path),
            analytics_path: env::var("ANALYTICS_PATH")
                .map(|path| normalize_route(&path))
                .unwrap_or(defaults.analytics_path),
            accessible_dir: env::var("ACCESSIBLE_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.accessible_dir),
            retention: parsed::<i64>("RETENTION_DAYS")
                .filter(|days| *days > 0)
                .map(chrono::Duration::days)
                .unwrap_or(defaults.retention),
            chunk_size: parsed::<usize>("CHUNK_SIZE")
                .filter(|size| *size > 0)
                .unwrap_or(defaults.chunk_size),
            connect_timeout: parsed("CONNECT_TIMEOUT_SECS")
                .map(Duration::from_secs)
                .unwrap_or(defaults.connect_timeout),
            read_timeout: parsed("READ_TIMEOUT_SECS")
                .map(Duration::from_secs)
                .unwrap_or(defaults.read_timeout),
        }
    }
}

fn parsed<T: FromStr>(key: &str) -> Option<T> {
    env::var(key).ok().and_then(|value| value.trim().parse().ok())
}

/// Ensures a configured route starts with a single `/`
fn normalize_route(path: &str) -> String {
    format!("/{}", path.trim().trim_start_matches('/'))
}
