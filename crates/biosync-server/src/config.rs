//! Configuration management

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

// ============================================================================
// Server Configuration Constants
// ============================================================================

/// Default server host binding.
pub const DEFAULT_SERVER_HOST: &str = "127.0.0.1";

/// Default server port.
pub const DEFAULT_SERVER_PORT: u16 = 8000;

/// Default shutdown timeout in seconds.
pub const DEFAULT_SHUTDOWN_TIMEOUT_SECS: u64 = 30;

/// Default destination database URL for local development.
pub const DEFAULT_DATABASE_URL: &str = "postgresql://localhost/biosync";

/// Default maximum database connections in the pool.
pub const DEFAULT_DATABASE_MAX_CONNECTIONS: u32 = 10;

/// Default minimum database connections in the pool.
pub const DEFAULT_DATABASE_MIN_CONNECTIONS: u32 = 2;

/// Default database connection timeout in seconds.
pub const DEFAULT_DATABASE_CONNECT_TIMEOUT_SECS: u64 = 10;

/// Default database idle timeout in seconds (10 minutes).
pub const DEFAULT_DATABASE_IDLE_TIMEOUT_SECS: u64 = 600;

/// Default CORS allowed origin for local development.
pub const DEFAULT_CORS_ALLOWED_ORIGIN: &str = "http://localhost:3000";

/// Default page size for bounded table extractions (locations, products).
pub const DEFAULT_SYNC_PAGE_SIZE: i64 = 1000;

/// Default page size for incremental customer extraction.
pub const DEFAULT_SYNC_INCREMENTAL_PAGE_SIZE: i64 = 500;

/// Default per-run deadline in seconds (30 minutes).
pub const DEFAULT_SYNC_RUN_DEADLINE_SECS: u64 = 1800;

/// Default interval between scheduled incremental runs, in seconds.
pub const DEFAULT_SYNC_SCHEDULE_INTERVAL_SECS: u64 = 900;

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub cors: CorsConfig,
    pub sync: SyncConfig,
}

/// Server-specific configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub shutdown_timeout_secs: u64,
}

/// Destination database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
    pub connect_timeout_secs: u64,
    pub idle_timeout_secs: u64,
}

/// CORS configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorsConfig {
    pub allowed_origins: Vec<String>,
    pub allow_credentials: bool,
}

/// Sync engine tunables
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Row bound for locations/products extraction.
    pub page_size: i64,
    /// Row bound for incremental customer extraction.
    pub incremental_page_size: i64,
    /// Hard deadline for one sync run.
    pub run_deadline_secs: u64,
    /// Optional JSON file with source database profiles; builtin table
    /// is used when unset.
    pub registry_file: Option<PathBuf>,
    /// Whether the background incremental scheduler runs.
    pub schedule_enabled: bool,
    /// Interval between scheduled incremental runs.
    pub schedule_interval_secs: u64,
    /// Database ids the scheduler syncs; empty means every registered id.
    pub schedule_databases: Vec<String>,
}

impl Config {
    /// Load configuration from environment and defaults
    pub fn load() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let config = Config {
            server: ServerConfig {
                host: std::env::var("BIOSYNC_HOST")
                    .unwrap_or_else(|_| DEFAULT_SERVER_HOST.to_string()),
                port: std::env::var("BIOSYNC_PORT")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(DEFAULT_SERVER_PORT),
                shutdown_timeout_secs: std::env::var("BIOSYNC_SHUTDOWN_TIMEOUT")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(DEFAULT_SHUTDOWN_TIMEOUT_SECS),
            },
            database: DatabaseConfig {
                url: std::env::var("DATABASE_URL")
                    .unwrap_or_else(|_| DEFAULT_DATABASE_URL.to_string()),
                max_connections: std::env::var("DATABASE_MAX_CONNECTIONS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(DEFAULT_DATABASE_MAX_CONNECTIONS),
                min_connections: std::env::var("DATABASE_MIN_CONNECTIONS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(DEFAULT_DATABASE_MIN_CONNECTIONS),
                connect_timeout_secs: std::env::var("DATABASE_CONNECT_TIMEOUT")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(DEFAULT_DATABASE_CONNECT_TIMEOUT_SECS),
                idle_timeout_secs: std::env::var("DATABASE_IDLE_TIMEOUT")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(DEFAULT_DATABASE_IDLE_TIMEOUT_SECS),
            },
            cors: CorsConfig {
                allowed_origins: std::env::var("CORS_ALLOWED_ORIGINS")
                    .unwrap_or_else(|_| DEFAULT_CORS_ALLOWED_ORIGIN.to_string())
                    .split(',')
                    .map(|s| s.trim().to_string())
                    .collect(),
                allow_credentials: std::env::var("CORS_ALLOW_CREDENTIALS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(true),
            },
            sync: SyncConfig {
                page_size: std::env::var("SYNC_PAGE_SIZE")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(DEFAULT_SYNC_PAGE_SIZE),
                incremental_page_size: std::env::var("SYNC_INCREMENTAL_PAGE_SIZE")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(DEFAULT_SYNC_INCREMENTAL_PAGE_SIZE),
                run_deadline_secs: std::env::var("SYNC_RUN_DEADLINE_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(DEFAULT_SYNC_RUN_DEADLINE_SECS),
                registry_file: std::env::var("BIOSYNC_DATABASES_FILE")
                    .ok()
                    .map(PathBuf::from),
                schedule_enabled: std::env::var("SYNC_SCHEDULE_ENABLED")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(false),
                schedule_interval_secs: std::env::var("SYNC_SCHEDULE_INTERVAL_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(DEFAULT_SYNC_SCHEDULE_INTERVAL_SECS),
                schedule_databases: std::env::var("SYNC_SCHEDULE_DATABASES")
                    .map(|v| {
                        v.split(',')
                            .map(|s| s.trim().to_string())
                            .filter(|s| !s.is_empty())
                            .collect()
                    })
                    .unwrap_or_default(),
            },
        };

        config.validate()?;

        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.server.port == 0 {
            anyhow::bail!("Server port must be greater than 0");
        }

        if self.database.url.is_empty() {
            anyhow::bail!("Database URL cannot be empty");
        }

        if self.database.max_connections == 0 {
            anyhow::bail!("Database max_connections must be greater than 0");
        }

        if self.database.min_connections > self.database.max_connections {
            anyhow::bail!(
                "Database min_connections ({}) cannot be greater than max_connections ({})",
                self.database.min_connections,
                self.database.max_connections
            );
        }

        if self.sync.page_size <= 0 || self.sync.incremental_page_size <= 0 {
            anyhow::bail!("Sync page sizes must be greater than 0");
        }

        if self.sync.run_deadline_secs == 0 {
            anyhow::bail!("Sync run deadline must be greater than 0");
        }

        if self.cors.allowed_origins.is_empty() {
            tracing::warn!("No CORS origins configured - all origins will be allowed");
        }

        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: DEFAULT_SERVER_HOST.to_string(),
                port: DEFAULT_SERVER_PORT,
                shutdown_timeout_secs: DEFAULT_SHUTDOWN_TIMEOUT_SECS,
            },
            database: DatabaseConfig {
                url: DEFAULT_DATABASE_URL.to_string(),
                max_connections: DEFAULT_DATABASE_MAX_CONNECTIONS,
                min_connections: DEFAULT_DATABASE_MIN_CONNECTIONS,
                connect_timeout_secs: DEFAULT_DATABASE_CONNECT_TIMEOUT_SECS,
                idle_timeout_secs: DEFAULT_DATABASE_IDLE_TIMEOUT_SECS,
            },
            cors: CorsConfig {
                allowed_origins: vec![DEFAULT_CORS_ALLOWED_ORIGIN.to_string()],
                allow_credentials: true,
            },
            sync: SyncConfig {
                page_size: DEFAULT_SYNC_PAGE_SIZE,
                incremental_page_size: DEFAULT_SYNC_INCREMENTAL_PAGE_SIZE,
                run_deadline_secs: DEFAULT_SYNC_RUN_DEADLINE_SECS,
                registry_file: None,
                schedule_enabled: false,
                schedule_interval_secs: DEFAULT_SYNC_SCHEDULE_INTERVAL_SECS,
                schedule_databases: Vec::new(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_zero_page_size() {
        let mut config = Config::default();
        config.sync.page_size = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_inverted_pool_bounds() {
        let mut config = Config::default();
        config.database.min_connections = 20;
        config.database.max_connections = 10;
        assert!(config.validate().is_err());
    }
}
