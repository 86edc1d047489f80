//! # Database Persistence Layer
//!
//! The database layer is **optional**. When `DATABASE_URL` is set, records,
//! join tables and the audit log live in PostgreSQL. When absent, the API
//! keeps everything in process memory (suitable for development and
//! testing).
//!
//! ## Modules
//!
//! - [`memory`]: in-memory tables and join tables.
//! - [`sql`]: SQL composition for the generic repository.
//! - [`audit`]: hash-chained audit log, in either backend.

pub mod audit;
pub mod memory;
pub mod sql;

use sqlx::postgres::{PgPool, PgPoolOptions};

use self::memory::MemoryDb;

/// Storage backend shared by every repository.
#[derive(Debug, Clone)]
pub enum Database {
    /// Process-local tables.
    Memory(MemoryDb),
    /// PostgreSQL connection pool.
    Postgres(PgPool),
}

impl Database {
    /// Fresh in-memory backend.
    pub fn memory() -> Self {
        Self::Memory(MemoryDb::new())
    }

    /// Whether a live (non-deleted) row with `id` exists in `table`.
    pub async fn row_exists(&self, table: &'static str, id: i64) -> Result<bool, sqlx::Error> {
        match self {
            Self::Memory(db) => Ok(db.table(table).is_live(id)),
            Self::Postgres(pool) => {
                sqlx::query_scalar::<_, bool>(&format!(
                    "SELECT EXISTS(SELECT 1 FROM {table} WHERE id = $1 AND deleted_at IS NULL)"
                ))
                .bind(id)
                .fetch_one(pool)
                .await
            }
        }
    }
}

/// Initialize the database connection pool and run migrations.
///
/// Returns `None` if no URL is configured (in-memory-only mode).
/// Returns `Err` if the URL is set but the connection or migration fails.
pub async fn init_pool(database_url: Option<&str>) -> Result<Option<PgPool>, sqlx::Error> {
    let Some(url) = database_url else {
        tracing::warn!(
            "DATABASE_URL not set, running in-memory only mode. \
             State will not survive restarts."
        );
        return Ok(None);
    };

    let pool = PgPoolOptions::new()
        .max_connections(20)
        .min_connections(2)
        .acquire_timeout(std::time::Duration::from_secs(5))
        .connect(url)
        .await?;

    tracing::info!("Connected to PostgreSQL");

    sqlx::migrate!("./migrations").run(&pool).await?;
    tracing::info!("Database migrations applied");

    Ok(Some(pool))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn init_pool_without_url_is_memory_mode() {
        assert!(init_pool(None).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn memory_row_exists_ignores_deleted() {
        let db = Database::memory();
        let Database::Memory(mem) = &db else {
            unreachable!()
        };
        mem.table("cities")
            .rows
            .insert(4, json!({ "id": 4, "deletedAt": null }));
        assert!(db.row_exists("cities", 4).await.unwrap());
        assert!(!db.row_exists("cities", 5).await.unwrap());
    }
}
