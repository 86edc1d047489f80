//! # Entity Contract
//!
//! Every inventory record implements [`Entity`]. The trait carries the
//! metadata the generic repository needs: where the record lives (resource
//! path and table), which fields can be searched, filtered, sorted, or must
//! be unique, and how create/update payloads map onto the record.
//!
//! Field names in [`FieldSpec::name`] are the camelCase JSON keys; the
//! repository resolves filters, ordering and search against these names and
//! maps them to [`FieldSpec::column`] when composing SQL.

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::error::DomainError;
use crate::validate::Validate;

/// Storage type of a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    /// UTF-8 text (`TEXT`).
    Text,
    /// 64-bit integer (`BIGINT`).
    Integer,
    /// Double precision float.
    Float,
    /// Boolean.
    Boolean,
    /// Timestamp with time zone.
    Timestamp,
    /// Structured document (`JSONB`).
    Json,
}

/// Catalogue entry for one field of an entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSpec {
    /// JSON name (camelCase).
    pub name: &'static str,
    /// SQL column name (snake_case).
    pub column: &'static str,
    /// Storage type.
    pub kind: FieldKind,
    /// Included in free-text search.
    pub searchable: bool,
    /// Usable as a list filter.
    pub filterable: bool,
    /// Usable in `orderBy`.
    pub sortable: bool,
    /// Unique among non-deleted rows.
    pub unique: bool,
}

impl FieldSpec {
    /// A field that is filterable and sortable but otherwise plain.
    pub const fn new(name: &'static str, column: &'static str, kind: FieldKind) -> Self {
        let queryable = !matches!(kind, FieldKind::Json);
        Self {
            name,
            column,
            kind,
            searchable: false,
            filterable: queryable,
            sortable: queryable,
            unique: false,
        }
    }

    /// Text field.
    pub const fn text(name: &'static str, column: &'static str) -> Self {
        Self::new(name, column, FieldKind::Text)
    }

    /// Integer field.
    pub const fn integer(name: &'static str, column: &'static str) -> Self {
        Self::new(name, column, FieldKind::Integer)
    }

    /// Float field.
    pub const fn float(name: &'static str, column: &'static str) -> Self {
        Self::new(name, column, FieldKind::Float)
    }

    /// Boolean field.
    pub const fn boolean(name: &'static str, column: &'static str) -> Self {
        Self::new(name, column, FieldKind::Boolean)
    }

    /// JSON document field; never filterable or sortable.
    pub const fn json(name: &'static str, column: &'static str) -> Self {
        Self::new(name, column, FieldKind::Json)
    }

    /// Mark as searchable.
    pub const fn searchable(self) -> Self {
        Self {
            searchable: true,
            ..self
        }
    }

    /// Mark as unique among non-deleted rows.
    pub const fn unique(self) -> Self {
        Self {
            unique: true,
            ..self
        }
    }

    /// Exclude from filters.
    pub const fn no_filter(self) -> Self {
        Self {
            filterable: false,
            ..self
        }
    }
}

/// Fields every record carries, in column order.
pub const COMMON_FIELDS: &[FieldSpec] = &[
    FieldSpec::integer("id", "id"),
    FieldSpec::boolean("active", "active"),
    FieldSpec::new("createdAt", "created_at", FieldKind::Timestamp),
    FieldSpec::new("updatedAt", "updated_at", FieldKind::Timestamp),
    FieldSpec::new("deletedAt", "deleted_at", FieldKind::Timestamp).no_filter(),
];

/// Identifier, status flag and lifecycle timestamps shared by every record.
///
/// Flattened into each record's JSON.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RecordMeta {
    /// Repository-assigned identifier.
    pub id: i64,
    /// Whether the record is in service.
    pub active: bool,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Last modification time.
    pub updated_at: DateTime<Utc>,
    /// Soft-delete time; `None` for live records.
    #[serde(default)]
    pub deleted_at: Option<DateTime<Utc>>,
}

impl RecordMeta {
    /// Metadata for a record created at `now`.
    pub fn new(id: i64, active: Option<bool>, now: DateTime<Utc>) -> Self {
        Self {
            id,
            active: active.unwrap_or(true),
            created_at: now,
            updated_at: now,
            deleted_at: None,
        }
    }

    /// Override the status flag when the payload carries one.
    pub fn with_active(mut self, active: Option<bool>) -> Self {
        if let Some(active) = active {
            self.active = active;
        }
        self
    }

    /// Whether the record has been soft-deleted.
    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }
}

/// A foreign key held by a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Reference {
    /// JSON name of the referencing field.
    pub field: &'static str,
    /// Resource path of the referenced entity.
    pub resource: &'static str,
    /// Referenced identifier.
    pub id: i64,
}

impl Reference {
    /// Build a reference.
    pub fn new(field: &'static str, resource: &'static str, id: i64) -> Self {
        Self {
            field,
            resource,
            id,
        }
    }
}

/// An inventory record managed by the generic repository.
pub trait Entity: Clone + Send + Sync + Serialize + DeserializeOwned + 'static {
    /// Create payload.
    type Create: DeserializeOwned + Validate + Send + 'static;
    /// Partial update payload.
    type Update: DeserializeOwned + Validate + Send + 'static;

    /// Resource path segment, e.g. `installation-types`.
    const RESOURCE: &'static str;
    /// SQL table name.
    const TABLE: &'static str;
    /// Entity-specific fields (the [`COMMON_FIELDS`] are implied).
    const FIELDS: &'static [FieldSpec];

    /// Shared metadata.
    fn meta(&self) -> &RecordMeta;

    /// Mutable shared metadata.
    fn meta_mut(&mut self) -> &mut RecordMeta;

    /// Build a new record from a validated create payload.
    fn from_create(meta: RecordMeta, input: Self::Create) -> Result<Self, DomainError>;

    /// Apply a validated partial update. The repository refreshes `updatedAt`.
    fn apply_update(&mut self, input: Self::Update) -> Result<(), DomainError>;

    /// Foreign keys held by this record.
    fn references(&self) -> Vec<Reference> {
        Vec::new()
    }

    /// Identifier shorthand.
    fn id(&self) -> i64 {
        self.meta().id
    }

    /// Every field, common fields first.
    fn all_fields() -> impl Iterator<Item = &'static FieldSpec> {
        COMMON_FIELDS.iter().chain(Self::FIELDS.iter())
    }

    /// Look up a field by JSON name.
    fn field(name: &str) -> Option<&'static FieldSpec> {
        Self::all_fields().find(|f| f.name == name)
    }

    /// Fields included in free-text search.
    fn searchable_fields() -> Vec<&'static FieldSpec> {
        Self::all_fields().filter(|f| f.searchable).collect()
    }

    /// Fields unique among non-deleted rows.
    fn unique_fields() -> Vec<&'static FieldSpec> {
        Self::all_fields().filter(|f| f.unique).collect()
    }
}

/// Apply `Some` values of an update payload onto a record field.
///
/// ```ignore
/// set_if(&mut self.name, input.name);
/// ```
pub fn set_if<T>(target: &mut T, value: Option<T>) {
    if let Some(v) = value {
        *target = v;
    }
}
