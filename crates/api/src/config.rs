use std::path::{Path, PathBuf};

use kehila_core::reference::{self, DEFAULT_PREFIX};

use crate::auth::jwt::JwtConfig;

/// Server configuration loaded from environment variables.
///
/// All fields except the JWT secret have defaults suitable for local
/// development.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address (default: `0.0.0.0`).
    pub host: String,
    /// Bind port (default: `3000`).
    pub port: u16,
    /// Allowed CORS origins, parsed from comma-separated `CORS_ORIGINS`.
    pub cors_origins: Vec<String>,
    /// HTTP request timeout in seconds (default: `30`).
    pub request_timeout_secs: u64,
    /// Upper bound on waiting for background tasks after the server stops.
    pub shutdown_timeout_secs: u64,
    /// JWT token configuration.
    pub jwt: JwtConfig,
    /// Directory holding the database file and, by default, backups.
    pub data_dir: PathBuf,
    pub database_url: String,
    pub backup_dir: PathBuf,
    /// Number of snapshots kept after each backup run.
    pub backup_retention: usize,
    pub backup_interval_hours: u64,
    /// Prefix of request reference numbers (`REQ-2026-0001`).
    pub request_number_prefix: String,
    /// Seed account created at startup when no user with this email exists.
    pub bootstrap_admin: Option<BootstrapAdmin>,
}

#[derive(Debug, Clone)]
pub struct BootstrapAdmin {
    pub email: String,
    pub password: String,
}

impl ServerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                 | Default                           |
    /// |-------------------------|-----------------------------------|
    /// | `HOST`                  | `0.0.0.0`                         |
    /// | `PORT`                  | `3000`                            |
    /// | `CORS_ORIGINS`          | `http://localhost:5173`           |
    /// | `REQUEST_TIMEOUT_SECS`  | `30`                              |
    /// | `SHUTDOWN_TIMEOUT_SECS` | `30`                              |
    /// | `DATA_DIR`              | `./data`                          |
    /// | `DATABASE_URL`          | `sqlite://<DATA_DIR>/community.db`|
    /// | `BACKUP_DIR`            | `<DATA_DIR>/backups`              |
    /// | `BACKUP_RETENTION`      | `7`                               |
    /// | `BACKUP_INTERVAL_HOURS` | `24`                              |
    /// | `REQUEST_NUMBER_PREFIX` | `REQ`                             |
    /// | `ADMIN_EMAIL` / `ADMIN_PASSWORD` | unset                    |
    ///
    /// # Panics
    ///
    /// Panics on malformed numeric values or an invalid prefix so that
    /// misconfiguration fails at startup.
    pub fn from_env() -> Self {
        let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into());

        let port: u16 = std::env::var("PORT")
            .unwrap_or_else(|_| "3000".into())
            .parse()
            .expect("PORT must be a valid u16");

        let cors_origins: Vec<String> = std::env::var("CORS_ORIGINS")
            .unwrap_or_else(|_| "http://localhost:5173".into())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let request_timeout_secs: u64 = std::env::var("REQUEST_TIMEOUT_SECS")
            .unwrap_or_else(|_| "30".into())
            .parse()
            .expect("REQUEST_TIMEOUT_SECS must be a valid u64");

        let shutdown_timeout_secs: u64 = std::env::var("SHUTDOWN_TIMEOUT_SECS")
            .unwrap_or_else(|_| "30".into())
            .parse()
            .expect("SHUTDOWN_TIMEOUT_SECS must be a valid u64");

        let data_dir =
            PathBuf::from(std::env::var("DATA_DIR").unwrap_or_else(|_| "./data".into()));

        let database_url = std::env::var("DATABASE_URL").unwrap_or_else(|_| {
            format!("sqlite://{}", data_dir.join("community.db").display())
        });

        let backup_dir = std::env::var("BACKUP_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| data_dir.join("backups"));

        let backup_retention: usize = std::env::var("BACKUP_RETENTION")
            .unwrap_or_else(|_| "7".into())
            .parse()
            .expect("BACKUP_RETENTION must be a valid usize");

        let backup_interval_hours: u64 = std::env::var("BACKUP_INTERVAL_HOURS")
            .unwrap_or_else(|_| "24".into())
            .parse()
            .expect("BACKUP_INTERVAL_HOURS must be a valid u64");
        assert!(backup_interval_hours > 0, "BACKUP_INTERVAL_HOURS must be positive");

        let request_number_prefix =
            std::env::var("REQUEST_NUMBER_PREFIX").unwrap_or_else(|_| DEFAULT_PREFIX.into());
        reference::validate_prefix(&request_number_prefix)
            .expect("REQUEST_NUMBER_PREFIX must be uppercase ASCII letters");

        let bootstrap_admin = match (
            std::env::var("ADMIN_EMAIL").ok().filter(|v| !v.is_empty()),
            std::env::var("ADMIN_PASSWORD").ok().filter(|v| !v.is_empty()),
        ) {
            (Some(email), Some(password)) => Some(BootstrapAdmin { email, password }),
            _ => None,
        };

        Self {
            host,
            port,
            cors_origins,
            request_timeout_secs,
            shutdown_timeout_secs,
            jwt: JwtConfig::from_env(),
            data_dir,
            database_url,
            backup_dir,
            backup_retention,
            backup_interval_hours,
            request_number_prefix,
            bootstrap_admin,
        }
    }

    /// Path of the database file behind `database_url`, or `None` for an
    /// in-memory database.
    pub fn database_path(&self) -> Option<PathBuf> {
        database_path_from_url(&self.database_url)
    }
}

/// Extract the file path from a `sqlite:` URL.
///
/// Accepts `sqlite://path`, `sqlite:path` and strips any `?mode=...` query.
pub fn database_path_from_url(url: &str) -> Option<PathBuf> {
    let rest = url
        .strip_prefix("sqlite://")
        .or_else(|| url.strip_prefix("sqlite:"))
        .unwrap_or(url);
    let path = rest.split('?').next().unwrap_or_default();
    if path.is_empty() || path == ":memory:" {
        return None;
    }
    Some(Path::new(path).to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_urls_resolve_to_paths() {
        assert_eq!(
            database_path_from_url("sqlite://./data/community.db"),
            Some(PathBuf::from("./data/community.db"))
        );
        assert_eq!(
            database_path_from_url("sqlite:/var/lib/kehila/app.db?mode=rwc"),
            Some(PathBuf::from("/var/lib/kehila/app.db"))
        );
    }

    #[test]
    fn memory_urls_have_no_path() {
        assert_eq!(database_path_from_url("sqlite::memory:"), None);
        assert_eq!(database_path_from_url("sqlite://:memory:"), None);
    }
}
