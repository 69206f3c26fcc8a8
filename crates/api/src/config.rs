//! Application configuration loaded from environment variables.

use std::path::PathBuf;
use std::time::Duration;

/// Server configuration with sensible defaults.
///
/// Reads from environment variables:
/// - `HOST`: bind address (default: `"0.0.0.0"`)
/// - `PORT`: listen port (default: `3000`)
/// - `RUST_LOG`: tracing filter directive (default: `"info"`)
/// - `DATABASE_URL`: PostgreSQL connection string; unset runs on the in-memory store
/// - `DB_MAX_CONNECTIONS`: pool size (default: `5`)
/// - `ADMIN_USERNAME` / `ADMIN_PASSWORD`: admin credentials (default: `"admin"`)
/// - `ACCESS_TOKEN_TTL_HOURS` (default: `72`) and `REFRESH_TOKEN_TTL_HOURS` (default: `168`)
/// - `UPLOAD_DIR`: where uploaded images are written (default: `"uploads"`)
/// - `PUBLIC_BASE_URL`: prefix of stored file references (default: `"http://localhost:3000"`)
/// - `MAX_UPLOAD_BYTES`: per-file limit (default: 5 MiB)
/// - `ORDER_ID_LENGTH`: characters per order identifier (default: `21`)
/// - `LOGIN_RATE_LIMIT_PER_MINUTE`: login attempts per client and minute (default: `5`)
#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub log_level: String,
    pub database_url: Option<String>,
    pub db_max_connections: u32,
    pub admin_username: String,
    pub admin_password: String,
    pub access_token_ttl: Duration,
    pub refresh_token_ttl: Duration,
    pub upload_dir: PathBuf,
    pub public_base_url: String,
    pub max_upload_bytes: usize,
    pub order_id_length: usize,
    pub login_rate_limit_per_minute: u32,
}

const HOUR: u64 = 60 * 60;

/// Longest accepted token lifetime. Larger values fall back to the default.
pub const MAX_TOKEN_TTL: Duration = Duration::from_secs(10 * 365 * 24 * HOUR);

fn token_ttl(hours: u64) -> Option<Duration> {
    hours
        .checked_mul(HOUR)
        .map(Duration::from_secs)
        .filter(|ttl| *ttl <= MAX_TOKEN_TTL)
}

impl Config {
    /// Loads configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let parsed = |key: &str| lookup(key).and_then(|v| v.trim().parse::<u64>().ok());

        Self {
            host: lookup("HOST").unwrap_or(defaults.host),
            port: lookup("PORT")
                .and_then(|p| p.parse().ok())
                .unwrap_or(defaults.port),
            log_level: lookup("RUST_LOG").unwrap_or(defaults.log_level),
            database_url: lookup("DATABASE_URL").filter(|url| !url.trim().is_empty()),
            db_max_connections: lookup("DB_MAX_CONNECTIONS")
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.db_max_connections),
            admin_username: lookup("ADMIN_USERNAME").unwrap_or(defaults.admin_username),
            admin_password: lookup("ADMIN_PASSWORD").unwrap_or(defaults.admin_password),
            access_token_ttl: parsed("ACCESS_TOKEN_TTL_HOURS")
                .and_then(token_ttl)
                .unwrap_or(defaults.access_token_ttl),
            refresh_token_ttl: parsed("REFRESH_TOKEN_TTL_HOURS")
                .and_then(token_ttl)
                .unwrap_or(defaults.refresh_token_ttl),
            upload_dir: lookup("UPLOAD_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.upload_dir),
            public_base_url: lookup("PUBLIC_BASE_URL")
                .map(|url| url.trim_end_matches('/').to_string())
                .unwrap_or(defaults.public_base_url),
            max_upload_bytes: parsed("MAX_UPLOAD_BYTES")
                .and_then(|v| usize::try_from(v).ok())
                .unwrap_or(defaults.max_upload_bytes),
            order_id_length: parsed("ORDER_ID_LENGTH")
                .and_then(|v| usize::try_from(v).ok())
                .filter(|len| *len > 0)
                .unwrap_or(defaults.order_id_length),
            login_rate_limit_per_minute: lookup("LOGIN_RATE_LIMIT_PER_MINUTE")
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.login_rate_limit_per_minute),
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
            db_max_connections: 5,
            admin_username: "admin".to_string(),
            admin_password: "admin".to_string(),
            access_token_ttl: Duration::from_secs(72 * HOUR),
            refresh_token_ttl: Duration::from_secs(168 * HOUR),
            upload_dir: PathBuf::from("uploads"),
            public_base_url: "http://localhost:3000".to_string(),
            max_upload_bytes: 5 * 1024 * 1024,
            order_id_length: 21,
            login_rate_limit_per_minute: 5,
        }
    }
}
