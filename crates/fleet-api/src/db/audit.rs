//! Audit log: an immutable hash chain of mutations.
//!
//! Every successful create, update, delete, restore, relation assignment
//! and layout edit appends an event whose SHA-256 hash chains to the
//! previous event. Appends are not awaited by the request that caused
//! them: failures are logged and swallowed.

use std::sync::Arc;

use chrono::{DateTime, SecondsFormat, SubsecRound, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use utoipa::ToSchema;

const GENESIS_HASH: &str = "0000000000000000000000000000000000000000000000000000000000000000";

/// Advisory lock serializing Postgres appends so the chain stays linear.
const CHAIN_LOCK_KEY: i64 = 0x6175_6469_74;

/// An audit event to be appended.
#[derive(Debug, Clone)]
pub struct AuditEvent {
    /// Caller user id, or role when the token carries none.
    pub actor: String,
    /// Permission code that authorized the mutation.
    pub permission: String,
    /// Resource path segment.
    pub resource: String,
    /// Affected record.
    pub resource_id: i64,
    /// `create`, `update`, `delete`, ...
    pub action: String,
    /// Free-form context.
    pub metadata: serde_json::Value,
}

/// A stored audit event.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct AuditEntry {
    /// Sequence number.
    pub id: i64,
    /// Caller.
    pub actor: String,
    /// Permission code.
    pub permission: String,
    /// Resource path segment.
    pub resource: String,
    /// Affected record.
    pub resource_id: i64,
    /// Mutation kind.
    pub action: String,
    /// Free-form context.
    #[schema(value_type = Object)]
    pub metadata: serde_json::Value,
    /// Hash of the preceding event.
    pub previous_hash: String,
    /// Hash of this event.
    pub event_hash: String,
    /// Append time.
    pub created_at: DateTime<Utc>,
}

/// Result of chain integrity verification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ChainIntegrityResult {
    /// Events inspected.
    pub total_events: usize,
    /// Events whose link or hash does not match.
    pub broken_links: usize,
    /// No broken links.
    pub chain_valid: bool,
}

/// Audit log backend.
#[derive(Debug, Clone)]
pub enum AuditLog {
    /// Process-local chain.
    Memory(Arc<Mutex<Vec<AuditEntry>>>),
    /// `audit_events` table.
    Postgres(PgPool),
}

impl AuditLog {
    /// Empty in-memory log.
    pub fn memory() -> Self {
        Self::Memory(Arc::new(Mutex::new(Vec::new())))
    }

    /// Record `event` without blocking the caller.
    ///
    /// In memory the append is immediate. In Postgres it runs on a spawned
    /// task; a failure is logged at `warn` and otherwise ignored.
    pub fn record(&self, event: AuditEvent) {
        match self {
            Self::Memory(entries) => {
                if let Err(e) = append_memory(&mut entries.lock(), event, Utc::now()) {
                    tracing::warn!(error = %e, "failed to append audit event");
                }
            }
            Self::Postgres(pool) => {
                let pool = pool.clone();
                tokio::spawn(async move {
                    let resource = event.resource.clone();
                    let resource_id = event.resource_id;
                    if let Err(e) = append(&pool, event).await {
                        tracing::warn!(
                            resource = %resource,
                            resource_id,
                            error = %e,
                            "failed to append audit event"
                        );
                    }
                });
            }
        }
    }

    /// Events for one record, oldest first.
    pub async fn events_for_resource(
        &self,
        resource: &str,
        resource_id: i64,
    ) -> Result<Vec<AuditEntry>, sqlx::Error> {
        match self {
            Self::Memory(entries) => Ok(entries
                .lock()
                .iter()
                .filter(|e| e.resource == resource && e.resource_id == resource_id)
                .cloned()
                .collect()),
            Self::Postgres(pool) => {
                sqlx::query_as::<_, AuditEntry>(
                    "SELECT id, actor, permission, resource, resource_id, action, metadata,
                     previous_hash, event_hash, created_at
                     FROM audit_events
                     WHERE resource = $1 AND resource_id = $2
                     ORDER BY id ASC",
                )
                .bind(resource)
                .bind(resource_id)
                .fetch_all(pool)
                .await
            }
        }
    }

    /// Verify hash continuity over the first `limit` events.
    pub async fn verify_chain(&self, limit: i64) -> Result<ChainIntegrityResult, sqlx::Error> {
        let events = match self {
            Self::Memory(entries) => entries
                .lock()
                .iter()
                .take(usize::try_from(limit).unwrap_or(0))
                .cloned()
                .collect(),
            Self::Postgres(pool) => {
                sqlx::query_as::<_, AuditEntry>(
                    "SELECT id, actor, permission, resource, resource_id, action, metadata,
                     previous_hash, event_hash, created_at
                     FROM audit_events ORDER BY id ASC LIMIT $1",
                )
                .bind(limit)
                .fetch_all(pool)
                .await?
            }
        };
        Ok(check_chain(&events))
    }
}

fn append_memory(
    entries: &mut Vec<AuditEntry>,
    event: AuditEvent,
    now: DateTime<Utc>,
) -> Result<(), serde_json::Error> {
    let now = now.trunc_subsecs(6);
    let prev = entries
        .last()
        .map_or(GENESIS_HASH.to_string(), |e| e.event_hash.clone());
    let event_hash = HashedFields::new(&prev, &event, now).digest()?;
    entries.push(AuditEntry {
        id: entries.len() as i64 + 1,
        actor: event.actor,
        permission: event.permission,
        resource: event.resource,
        resource_id: event.resource_id,
        action: event.action,
        metadata: event.metadata,
        previous_hash: prev,
        event_hash,
        created_at: now,
    });
    Ok(())
}

/// Append an event to the `audit_events` table.
pub async fn append(pool: &PgPool, event: AuditEvent) -> Result<i64, sqlx::Error> {
    let mut tx = pool.begin().await?;

    sqlx::query("SELECT pg_advisory_xact_lock($1)")
        .bind(CHAIN_LOCK_KEY)
        .execute(&mut *tx)
        .await?;

    let previous_hash: Option<String> =
        sqlx::query_scalar("SELECT event_hash FROM audit_events ORDER BY id DESC LIMIT 1")
            .fetch_optional(&mut *tx)
            .await?;
    let prev = previous_hash.as_deref().unwrap_or(GENESIS_HASH);
    let created_at = Utc::now().trunc_subsecs(6);
    let hash = HashedFields::new(prev, &event, created_at)
        .digest()
        .map_err(|e| sqlx::Error::Encode(Box::new(e)))?;

    let id: i64 = sqlx::query_scalar(
        "INSERT INTO audit_events (actor, permission, resource, resource_id, action,
         metadata, previous_hash, event_hash, created_at)
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
         RETURNING id",
    )
    .bind(&event.actor)
    .bind(&event.permission)
    .bind(&event.resource)
    .bind(event.resource_id)
    .bind(&event.action)
    .bind(&event.metadata)
    .bind(prev)
    .bind(&hash)
    .bind(created_at)
    .fetch_one(&mut *tx)
    .await?;

    tx.commit().await?;
    Ok(id)
}

/// Every stored column of an event except its own hash and id.
///
/// Hashed as RFC 8785 canonical JSON so metadata key order and field
/// boundaries cannot alias. Timestamps are microsecond precision to match
/// Postgres `TIMESTAMPTZ`.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct HashedFields<'a> {
    previous_hash: &'a str,
    actor: &'a str,
    permission: &'a str,
    resource: &'a str,
    resource_id: i64,
    action: &'a str,
    metadata: &'a serde_json::Value,
    created_at: String,
}

impl<'a> HashedFields<'a> {
    fn new(prev: &'a str, event: &'a AuditEvent, created_at: DateTime<Utc>) -> Self {
        Self {
            previous_hash: prev,
            actor: &event.actor,
            permission: &event.permission,
            resource: &event.resource,
            resource_id: event.resource_id,
            action: &event.action,
            metadata: &event.metadata,
            created_at: created_at.to_rfc3339_opts(SecondsFormat::Micros, true),
        }
    }

    fn of_entry(entry: &'a AuditEntry) -> Self {
        Self {
            previous_hash: &entry.previous_hash,
            actor: &entry.actor,
            permission: &entry.permission,
            resource: &entry.resource,
            resource_id: entry.resource_id,
            action: &entry.action,
            metadata: &entry.metadata,
            created_at: entry
                .created_at
                .to_rfc3339_opts(SecondsFormat::Micros, true),
        }
    }

    fn digest(&self) -> Result<String, serde_json::Error> {
        Ok(sha256_hex(&serde_jcs::to_string(self)?))
    }
}

fn check_chain(events: &[AuditEntry]) -> ChainIntegrityResult {
    let mut broken_links = 0;
    let mut last_hash: Option<&str> = None;

    for entry in events {
        let linked = last_hash.map_or(true, |prev| entry.previous_hash == prev);
        let intact = HashedFields::of_entry(entry)
            .digest()
            .is_ok_and(|hash| hash == entry.event_hash);
        if !linked || !intact {
            broken_links += 1;
        }
        last_hash = Some(&entry.event_hash);
    }

    ChainIntegrityResult {
        total_events: events.len(),
        broken_links,
        chain_valid: broken_links == 0,
    }
}

/// Compute SHA-256 hex digest of input string.
fn sha256_hex(input: &str) -> String {
    use sha2::{Digest, Sha256};
    let mut hasher = Sha256::new();
    hasher.update(input.as_bytes());
    let result = hasher.finalize();
    result.iter().map(|b| format!("{b:02x}")).collect()
}
