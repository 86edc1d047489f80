//! # Application State
//!
//! Shared state for the Axum application, passed to all route handlers
//! via the `State` extractor.
//!
//! ## Architecture
//!
//! AppState holds:
//! - **Configuration** - port, auth secret, page-size defaults, log format
//! - **Database** - PostgreSQL pool, or in-memory tables when no
//!   `DATABASE_URL` is configured
//! - **Audit log** - hash-chained record of every successful mutation
//!
//! Repositories are cheap views over the database handle and are built per
//! request with [`AppState::repository`].

use std::collections::HashMap;
use std::sync::Arc;

use fleet_core::{Entity, PageDefaults};
use parking_lot::RwLock;
use sqlx::PgPool;
use thiserror::Error;

use crate::db::audit::AuditLog;
use crate::db::Database;
use crate::repository::Repository;

// -- Generic In-Memory Store --------------------------------------------------

/// Thread-safe, cloneable in-memory key-value store keyed by row identifier.
///
/// All operations are synchronous (the RwLock is `parking_lot`, not `tokio::sync`)
/// because the lock is never held across `.await` points.
#[derive(Debug)]
pub struct Store<T: Clone + Send + Sync> {
    data: Arc<RwLock<HashMap<i64, T>>>,
}

impl<T: Clone + Send + Sync> Clone for Store<T> {
    fn clone(&self) -> Self {
        Self {
            data: Arc::clone(&self.data),
        }
    }
}

impl<T: Clone + Send + Sync> Store<T> {
    /// Create an empty store.
    pub fn new() -> Self {
        Self {
            data: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Insert a record, returning the previous value if the key existed.
    pub fn insert(&self, id: i64, value: T) -> Option<T> {
        self.data.write().insert(id, value)
    }

    /// Retrieve a record by ID.
    pub fn get(&self, id: i64) -> Option<T> {
        self.data.read().get(&id).cloned()
    }

    /// List all records.
    pub fn list(&self) -> Vec<T> {
        self.data.read().values().cloned().collect()
    }

    /// Run `f` with exclusive access to the whole map.
    ///
    /// Used where a check and a write must not interleave with other
    /// writers, e.g. a uniqueness scan followed by an insert.
    pub fn write_with<R>(&self, f: impl FnOnce(&mut HashMap<i64, T>) -> R) -> R {
        f(&mut self.data.write())
    }

    /// Check if a record exists.
    pub fn contains(&self, id: i64) -> bool {
        self.data.read().contains_key(&id)
    }

    /// Return the number of records.
    pub fn len(&self) -> usize {
        self.data.read().len()
    }

    /// Whether the store is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<T: Clone + Send + Sync> Default for Store<T> {
    fn default() -> Self {
        Self::new()
    }
}

// -- Configuration ------------------------------------------------------------

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// Human-readable lines.
    #[default]
    Pretty,
    /// One JSON object per event.
    Json,
}

/// Configuration could not be read from the environment.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    /// A variable is set but cannot be parsed.
    #[error("invalid value for {name}: {value:?}")]
    Invalid {
        /// Variable name.
        name: &'static str,
        /// Raw value.
        value: String,
    },
    /// The page-size bounds contradict each other.
    #[error("DEFAULT_PAGE_SIZE ({default}) must be between 1 and MAX_PAGE_SIZE ({max})")]
    PageBounds {
        /// Configured default.
        default: u32,
        /// Configured maximum.
        max: u32,
    },
}

/// Application configuration.
///
/// Custom `Debug` redacts the auth token and database URL to prevent
/// credential leakage in logs.
#[derive(Clone)]
pub struct AppConfig {
    /// Port to bind the HTTP server to.
    pub port: u16,
    /// Static bearer secret. `None` disables authentication.
    pub auth_token: Option<String>,
    /// PostgreSQL connection string. `None` selects in-memory tables.
    pub database_url: Option<String>,
    /// Page sizes for `/list` endpoints.
    pub page_defaults: PageDefaults,
    /// Log output format.
    pub log_format: LogFormat,
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("port", &self.port)
            .field("auth_token", &self.auth_token.as_ref().map(|_| "[REDACTED]"))
            .field("database_url", &self.database_url.as_ref().map(|_| "[REDACTED]"))
            .field("page_defaults", &self.page_defaults)
            .field("log_format", &self.log_format)
            .finish()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            port: 8080,
            auth_token: None,
            database_url: None,
            page_defaults: PageDefaults::default(),
            log_format: LogFormat::default(),
        }
    }
}

impl AppConfig {
    /// Read configuration from process environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Read configuration through `lookup`, which returns a variable's value
    /// or `None` when it is unset.
    ///
    /// | Variable            | Default  |
    /// |---------------------|----------|
    /// | `PORT`              | 8080     |
    /// | `AUTH_TOKEN`        | disabled |
    /// | `DATABASE_URL`      | in-memory|
    /// | `DEFAULT_PAGE_SIZE` | 10       |
    /// | `MAX_PAGE_SIZE`     | 100      |
    /// | `LOG_FORMAT`        | `pretty` |
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = Self::default();
        let non_empty = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let port = parse_var(&non_empty, "PORT")?.unwrap_or(defaults.port);
        let default_page_size = parse_var(&non_empty, "DEFAULT_PAGE_SIZE")?
            .unwrap_or(defaults.page_defaults.default_page_size);
        let max_page_size = parse_var(&non_empty, "MAX_PAGE_SIZE")?
            .unwrap_or(defaults.page_defaults.max_page_size);
        if default_page_size == 0 || default_page_size > max_page_size {
            return Err(ConfigError::PageBounds {
                default: default_page_size,
                max: max_page_size,
            });
        }

        let log_format = match non_empty("LOG_FORMAT").as_deref() {
            None | Some("pretty") | Some("text") => LogFormat::Pretty,
            Some("json") => LogFormat::Json,
            Some(other) => {
                return Err(ConfigError::Invalid {
                    name: "LOG_FORMAT",
                    value: other.to_string(),
                })
            }
        };

        Ok(Self {
            port,
            auth_token: non_empty("AUTH_TOKEN"),
            database_url: non_empty("DATABASE_URL"),
            page_defaults: PageDefaults {
                default_page_size,
                max_page_size,
            },
            log_format,
        })
    }
}

fn parse_var<T: std::str::FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    name: &'static str,
) -> Result<Option<T>, ConfigError> {
    lookup(name)
        .map(|raw| {
            raw.trim().parse().map_err(|_| ConfigError::Invalid {
                name,
                value: raw.clone(),
            })
        })
        .transpose()
}

// -- AppState -----------------------------------------------------------------

/// Shared application state.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Application configuration.
    pub config: AppConfig,
    /// Storage backend.
    pub db: Database,
    /// Mutation audit log.
    pub audit: AuditLog,
}

impl AppState {
    /// In-memory state with default configuration.
    pub fn new() -> Self {
        Self::with_config(AppConfig::default(), None)
    }

    /// State for `config`, backed by `db_pool` when one is given.
    pub fn with_config(config: AppConfig, db_pool: Option<PgPool>) -> Self {
        let (db, audit) = match db_pool {
            Some(pool) => (
                Database::Postgres(pool.clone()),
                AuditLog::Postgres(pool),
            ),
            None => (Database::memory(), AuditLog::memory()),
        };
        Self { config, db, audit }
    }

    /// Repository for an entity type.
    pub fn repository<E: Entity>(&self) -> Repository<E> {
        Repository::new(self.db.clone(), self.config.page_defaults)
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new()
    }
}
