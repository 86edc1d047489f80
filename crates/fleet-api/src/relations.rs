//! # Join-Table Relations
//!
//! Many-to-many links between records:
//!
//! | Owner               | Target        | Join table                       |
//! |---------------------|---------------|----------------------------------|
//! | `installations`     | `amenities`   | `installation_amenities`         |
//! | `installation-types`| `event-types` | `installation_type_event_types`  |
//! | `nodes`             | `labels`      | `node_labels`                    |
//!
//! An assignment replaces the owner's whole set. Listing returns the live
//! target records ordered by id; soft-deleted targets stay linked but are
//! not listed.

use std::collections::BTreeSet;
use std::marker::PhantomData;

use fleet_core::entities::{Amenity, EventType, Installation, InstallationType, Label, Node};
use fleet_core::{
    Condition, DomainError, Entity, FieldError, FieldErrorCode, ListParams, PageDefaults,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::ToSchema;

use crate::db::Database;
use crate::repository::{Repository, RepositoryError};

/// A join table between owner `Self` and target `T`.
pub trait JoinTable<T: Entity>: Entity {
    /// SQL table name.
    const JOIN_TABLE: &'static str;
    /// Column holding the owner id.
    const OWNER_COLUMN: &'static str;
    /// Column holding the target id.
    const TARGET_COLUMN: &'static str;
}

impl JoinTable<Amenity> for Installation {
    const JOIN_TABLE: &'static str = "installation_amenities";
    const OWNER_COLUMN: &'static str = "installation_id";
    const TARGET_COLUMN: &'static str = "amenity_id";
}

impl JoinTable<EventType> for InstallationType {
    const JOIN_TABLE: &'static str = "installation_type_event_types";
    const OWNER_COLUMN: &'static str = "installation_type_id";
    const TARGET_COLUMN: &'static str = "event_type_id";
}

impl JoinTable<Label> for Node {
    const JOIN_TABLE: &'static str = "node_labels";
    const OWNER_COLUMN: &'static str = "node_id";
    const TARGET_COLUMN: &'static str = "label_id";
}

/// Body of an assignment: the complete new set of target ids.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AssignRequest {
    /// Target ids. Duplicates are collapsed.
    pub ids: Vec<i64>,
}

/// Links between owners `O` and targets `T`.
pub struct Relation<O: JoinTable<T>, T: Entity> {
    db: Database,
    owners: Repository<O>,
    targets: Repository<T>,
    _types: PhantomData<fn() -> (O, T)>,
}

impl<O: JoinTable<T>, T: Entity> Relation<O, T> {
    /// Relation over `db`.
    pub fn new(db: Database, defaults: PageDefaults) -> Self {
        Self {
            owners: Repository::new(db.clone(), defaults),
            targets: Repository::new(db.clone(), defaults),
            db,
            _types: PhantomData,
        }
    }

    async fn require_owner(&self, owner_id: i64) -> Result<(), RepositoryError> {
        if self.owners.exists(owner_id).await? {
            Ok(())
        } else {
            Err(DomainError::NotFound {
                resource: O::RESOURCE,
                id: owner_id,
            }
            .into())
        }
    }

    /// Linked target ids, ascending.
    pub async fn target_ids(&self, owner_id: i64) -> Result<Vec<i64>, RepositoryError> {
        match &self.db {
            Database::Memory(db) => Ok(db
                .links(O::JOIN_TABLE)
                .get(owner_id)
                .map(|set| set.into_iter().collect())
                .unwrap_or_default()),
            Database::Postgres(pool) => Ok(sqlx::query_scalar::<_, i64>(&format!(
                "SELECT {target} FROM {table} WHERE {owner} = $1 ORDER BY {target}",
                target = O::TARGET_COLUMN,
                table = O::JOIN_TABLE,
                owner = O::OWNER_COLUMN,
            ))
            .bind(owner_id)
            .fetch_all(pool)
            .await?),
        }
    }

    /// Live target records linked to `owner_id`.
    pub async fn list(&self, owner_id: i64) -> Result<Vec<T>, RepositoryError> {
        self.require_owner(owner_id).await?;
        let ids = self.target_ids(owner_id).await?;
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let id_field = T::field("id")
            .ok_or_else(|| RepositoryError::Corrupt(format!("{} has no id field", T::RESOURCE)))?;
        self.targets
            .scoped()
            .scope(Condition::In(id_field, ids.into_iter().map(Value::from).collect()))
            .find_all(&ListParams::default())
            .await
    }

    /// Replace the targets linked to `owner_id` with `ids`.
    ///
    /// Every id must name a live target; otherwise nothing changes and each
    /// missing id is reported as a `NOT_FOUND` error on `ids`.
    pub async fn assign(&self, owner_id: i64, ids: Vec<i64>) -> Result<Vec<T>, RepositoryError> {
        self.require_owner(owner_id).await?;
        let ids: BTreeSet<i64> = ids.into_iter().collect();

        let mut errors = Vec::new();
        for &id in &ids {
            if !self.targets.exists(id).await? {
                errors.push(
                    FieldError::new(
                        "ids",
                        FieldErrorCode::NotFound,
                        format!("{} {id} does not exist", T::RESOURCE),
                    )
                    .with_value(id),
                );
            }
        }
        if !errors.is_empty() {
            return Err(DomainError::Validation(errors).into());
        }

        match &self.db {
            Database::Memory(db) => {
                db.links(O::JOIN_TABLE).insert(owner_id, ids);
            }
            Database::Postgres(pool) => {
                let mut tx = pool.begin().await?;
                sqlx::query(&format!(
                    "DELETE FROM {} WHERE {} = $1",
                    O::JOIN_TABLE,
                    O::OWNER_COLUMN
                ))
                .bind(owner_id)
                .execute(&mut *tx)
                .await?;
                let targets: Vec<i64> = ids.into_iter().collect();
                sqlx::query(&format!(
                    "INSERT INTO {} ({}, {}) SELECT $1, unnest($2::bigint[])",
                    O::JOIN_TABLE,
                    O::OWNER_COLUMN,
                    O::TARGET_COLUMN
                ))
                .bind(owner_id)
                .bind(targets)
                .execute(&mut *tx)
                .await?;
                tx.commit().await?;
            }
        }
        tracing::info!(
            owner = O::RESOURCE,
            owner_id,
            target = T::RESOURCE,
            "relation assigned"
        );
        self.list(owner_id).await
    }
}
