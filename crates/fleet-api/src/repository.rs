//! # Generic Repository
//!
//! One [`Repository<E>`] serves every inventory record type. It provides
//! create, read, partial update, soft delete, restore, unpaginated and
//! paginated listing, existence checks, uniqueness validation and
//! reference checks, on either storage backend.
//!
//! ## Scopes
//!
//! [`Repository::scoped`] returns a [`ScopedQuery`] that accumulates
//! conditions with `.scope(..)`. The terminal operations (`find_all`,
//! `find_paginated`, `count`) consume the builder, so scopes never carry
//! over into the next query.
//!
//! ## Soft delete
//!
//! Deleted rows keep their data and a `deletedAt` timestamp. They are
//! invisible to `find_by_id`, `update`, `exists` and every list unless
//! `includeDeleted` is requested, and they do not count towards
//! uniqueness.

use std::collections::HashMap;
use std::marker::PhantomData;

use chrono::Utc;
use fleet_core::{
    Condition, DomainError, Entity, FieldError, FieldErrorCode, ListParams, PageDefaults,
    PageRequest, PaginatedResult, PaginationMeta, RecordMeta, SortKey, Validate,
};
use serde_json::Value;
use sqlx::PgPool;
use thiserror::Error;

use crate::db::sql;
use crate::db::Database;

/// Repository failure.
#[derive(Error, Debug)]
pub enum RepositoryError {
    /// Not found, validation or duplicate. Reported to the client.
    #[error(transparent)]
    Domain(#[from] DomainError),

    /// The database rejected a statement.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A stored row could not be mapped to or from its record type.
    #[error("corrupt record: {0}")]
    Corrupt(String),
}

impl From<sql::BindError> for RepositoryError {
    fn from(err: sql::BindError) -> Self {
        Self::Corrupt(err.to_string())
    }
}

/// Typed access to one entity's table.
pub struct Repository<E: Entity> {
    db: Database,
    defaults: PageDefaults,
    _entity: PhantomData<fn() -> E>,
}

impl<E: Entity> Clone for Repository<E> {
    fn clone(&self) -> Self {
        Self {
            db: self.db.clone(),
            defaults: self.defaults,
            _entity: PhantomData,
        }
    }
}

impl<E: Entity> std::fmt::Debug for Repository<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Repository")
            .field("resource", &E::RESOURCE)
            .field("defaults", &self.defaults)
            .finish()
    }
}

fn to_json<E: Entity>(record: &E) -> Result<Value, RepositoryError> {
    serde_json::to_value(record).map_err(|e| RepositoryError::Corrupt(e.to_string()))
}

fn from_json<E: Entity>(row: Value) -> Result<E, RepositoryError> {
    serde_json::from_value(row)
        .map_err(|e| RepositoryError::Corrupt(format!("{}: {e}", E::RESOURCE)))
}

fn is_deleted(row: &Value) -> bool {
    row.get("deletedAt").is_some_and(|v| !v.is_null())
}

fn not_found<E: Entity>(id: i64) -> RepositoryError {
    DomainError::NotFound {
        resource: E::RESOURCE,
        id,
    }
    .into()
}

/// Unique-field collisions of `record` against the live rows of a table.
fn memory_duplicates<E: Entity>(rows: &HashMap<i64, Value>, record: &Value, id: i64) -> Vec<FieldError> {
    E::unique_fields()
        .into_iter()
        .filter_map(|field| {
            let value = record.get(field.name).filter(|v| !v.is_null())?;
            let taken = rows.iter().any(|(other, row)| {
                *other != id && !is_deleted(row) && row.get(field.name) == Some(value)
            });
            taken.then(|| FieldError::duplicate(field.name, value.clone()))
        })
        .collect()
}

/// Map a Postgres unique violation on `<table>_<column>_key` or a foreign-key
/// violation on `<table>_<column>_fkey` to a field error.
fn map_unique_violation<E: Entity>(err: sqlx::Error, record: &Value) -> RepositoryError {
    if let sqlx::Error::Database(db_err) = &err {
        let constraint = db_err.constraint();
        match db_err.code().as_deref() {
            Some("23505") => {
                if let Some(field) = constraint.and_then(sql::field_for_constraint::<E>) {
                    let value = record.get(field.name).cloned().unwrap_or(Value::Null);
                    return DomainError::Duplicate(vec![FieldError::duplicate(field.name, value)]).into();
                }
            }
            Some("23503") => {
                if let Some(field) = constraint.and_then(sql::field_for_foreign_key::<E>) {
                    let value = record.get(field.name).cloned().unwrap_or(Value::Null);
                    return DomainError::Validation(vec![FieldError::new(
                        field.name,
                        FieldErrorCode::NotFound,
                        "referenced record does not exist",
                    )
                    .with_value(value)])
                    .into();
                }
            }
            _ => {}
        }
    }
    err.into()
}

impl<E: Entity> Repository<E> {
    /// Repository over `db` using `defaults` for pagination.
    pub fn new(db: Database, defaults: PageDefaults) -> Self {
        Self {
            db,
            defaults,
            _entity: PhantomData,
        }
    }

    // -- Reads ----------------------------------------------------------------

    async fn load(&self, id: i64) -> Result<Option<E>, RepositoryError> {
        let row = match &self.db {
            Database::Memory(db) => db.table(E::TABLE).rows.get(id),
            Database::Postgres(pool) => {
                let id_field = E::field("id").ok_or_else(|| {
                    RepositoryError::Corrupt(format!("{} has no id field", E::RESOURCE))
                })?;
                let mut qb = sql::select::<E>(&[Condition::eq(id_field, id)], &[], None)?;
                qb.build_query_scalar::<Value>()
                    .fetch_optional(pool)
                    .await?
            }
        };
        row.map(from_json::<E>).transpose()
    }

    /// Live record by id.
    pub async fn find_by_id(&self, id: i64) -> Result<E, RepositoryError> {
        match self.load(id).await? {
            Some(record) if !record.meta().is_deleted() => Ok(record),
            _ => Err(not_found::<E>(id)),
        }
    }

    /// Whether a live record with `id` exists.
    pub async fn exists(&self, id: i64) -> Result<bool, RepositoryError> {
        Ok(self.db.row_exists(E::TABLE, id).await?)
    }

    /// Start a scoped query.
    pub fn scoped(&self) -> ScopedQuery<'_, E> {
        ScopedQuery {
            repo: self,
            conditions: Vec::new(),
            include_deleted: false,
        }
    }

    /// Every record matching `params`, unpaginated.
    pub async fn find_all(&self, params: &ListParams) -> Result<Vec<E>, RepositoryError> {
        self.scoped().find_all(params).await
    }

    /// One page of records matching `params`.
    pub async fn find_paginated(
        &self,
        params: &ListParams,
    ) -> Result<PaginatedResult<E>, RepositoryError> {
        self.scoped().find_paginated(params).await
    }

    async fn query(
        &self,
        mut conditions: Vec<Condition>,
        order: &[SortKey],
        page: Option<PageRequest>,
        include_deleted: bool,
    ) -> Result<(Vec<E>, u64), RepositoryError> {
        if !include_deleted {
            if let Some(deleted_at) = E::field("deletedAt") {
                conditions.push(Condition::IsNull(deleted_at));
            }
        }
        match &self.db {
            Database::Memory(db) => {
                let filter = Condition::And(conditions);
                let mut rows: Vec<Value> = db
                    .table(E::TABLE)
                    .rows
                    .list()
                    .into_iter()
                    .filter(|row| filter.matches(row))
                    .collect();
                rows.sort_by(|a, b| fleet_core::query::compare_records(a, b, order));
                let total = rows.len() as u64;
                let rows = match page {
                    Some(page) => page.slice(rows),
                    None => rows,
                };
                let records = rows
                    .into_iter()
                    .map(from_json::<E>)
                    .collect::<Result<Vec<_>, _>>()?;
                Ok((records, total))
            }
            Database::Postgres(pool) => {
                let total = match page {
                    Some(_) => {
                        let mut qb = sql::count::<E>(&conditions)?;
                        let n: i64 = qb.build_query_scalar().fetch_one(pool).await?;
                        u64::try_from(n).unwrap_or(0)
                    }
                    None => 0,
                };
                let mut qb = sql::select::<E>(&conditions, order, page)?;
                let rows: Vec<Value> = qb.build_query_scalar().fetch_all(pool).await?;
                let total = if page.is_some() { total } else { rows.len() as u64 };
                let records = rows
                    .into_iter()
                    .map(from_json::<E>)
                    .collect::<Result<Vec<_>, _>>()?;
                Ok((records, total))
            }
        }
    }

    // -- Checks ---------------------------------------------------------------

    /// Fail with `DUPLICATE` field errors when a unique field of `record`
    /// is held by another live record.
    pub async fn validate_uniqueness(&self, record: &E) -> Result<(), RepositoryError> {
        let json = to_json(record)?;
        let duplicates = match &self.db {
            Database::Memory(db) => {
                let rows = db.table(E::TABLE).rows;
                rows.write_with(|map| memory_duplicates::<E>(map, &json, record.id()))
            }
            Database::Postgres(pool) => self.pg_duplicates(pool, &json, record.id()).await?,
        };
        if duplicates.is_empty() {
            Ok(())
        } else {
            Err(DomainError::Duplicate(duplicates).into())
        }
    }

    async fn pg_duplicates(
        &self,
        pool: &PgPool,
        record: &Value,
        id: i64,
    ) -> Result<Vec<FieldError>, RepositoryError> {
        let mut duplicates = Vec::new();
        for field in E::unique_fields() {
            let Some(value) = record.get(field.name).filter(|v| !v.is_null()) else {
                continue;
            };
            let mut qb = sql::unique_taken::<E>(field, value, id)?;
            let taken: bool = qb.build_query_scalar().fetch_one(pool).await?;
            if taken {
                duplicates.push(FieldError::duplicate(field.name, value.clone()));
            }
        }
        Ok(duplicates)
    }

    /// Fail with `NOT_FOUND` field errors when a reference of `record`
    /// points at a missing or deleted row.
    pub async fn check_references(&self, record: &E) -> Result<(), RepositoryError> {
        let mut errors = Vec::new();
        for reference in record.references() {
            let exists = match fleet_core::entities::table_for(reference.resource) {
                Some(table) => self.db.row_exists(table, reference.id).await?,
                None => false,
            };
            if !exists {
                errors.push(
                    FieldError::new(
                        reference.field,
                        FieldErrorCode::NotFound,
                        format!("{} {} does not exist", reference.resource, reference.id),
                    )
                    .with_value(reference.id),
                );
            }
        }
        if errors.is_empty() {
            Ok(())
        } else {
            Err(DomainError::Validation(errors).into())
        }
    }

    // -- Writes ---------------------------------------------------------------

    async fn next_id(&self) -> Result<i64, RepositoryError> {
        match &self.db {
            Database::Memory(db) => Ok(db.table(E::TABLE).next_id()),
            Database::Postgres(pool) => {
                let mut qb = sql::next_id::<E>();
                Ok(qb.build_query_scalar::<i64>().fetch_one(pool).await?)
            }
        }
    }

    /// Validate `input`, build the record and store it.
    pub async fn create(&self, input: E::Create) -> Result<E, RepositoryError> {
        input.validate()?;
        let id = self.next_id().await?;
        let record = E::from_create(RecordMeta::new(id, None, Utc::now()), input)?;
        self.check_references(&record).await?;
        let json = to_json(&record)?;

        match &self.db {
            Database::Memory(db) => {
                db.table(E::TABLE).rows.write_with(|map| {
                    let duplicates = memory_duplicates::<E>(map, &json, id);
                    if !duplicates.is_empty() {
                        return Err(DomainError::Duplicate(duplicates));
                    }
                    map.insert(id, json.clone());
                    Ok(())
                })?;
            }
            Database::Postgres(pool) => {
                let duplicates = self.pg_duplicates(pool, &json, id).await?;
                if !duplicates.is_empty() {
                    return Err(DomainError::Duplicate(duplicates).into());
                }
                let mut qb = sql::insert::<E>(&json)?;
                qb.build()
                    .execute(pool)
                    .await
                    .map_err(|e| map_unique_violation::<E>(e, &json))?;
            }
        }
        Ok(record)
    }

    /// Validate `input` and apply it to the live record `id`.
    pub async fn update(&self, id: i64, input: E::Update) -> Result<E, RepositoryError> {
        input.validate()?;
        self.modify(id, |record| record.apply_update(input)).await
    }

    /// Apply `edit` to the live record `id`, refresh `updatedAt`, re-check
    /// references and uniqueness, and store the result.
    pub async fn modify<F>(&self, id: i64, edit: F) -> Result<E, RepositoryError>
    where
        F: FnOnce(&mut E) -> Result<(), DomainError>,
    {
        let mut record = self.find_by_id(id).await?;
        edit(&mut record)?;
        record.meta_mut().id = id;
        record.meta_mut().updated_at = Utc::now();
        self.check_references(&record).await?;
        self.store(record, false).await
    }

    /// Soft-delete the live record `id`.
    pub async fn soft_delete(&self, id: i64) -> Result<E, RepositoryError> {
        let mut record = self.find_by_id(id).await?;
        let now = Utc::now();
        record.meta_mut().deleted_at = Some(now);
        record.meta_mut().updated_at = now;
        self.store(record, false).await
    }

    /// Bring back a soft-deleted record. Restoring a live record returns it
    /// unchanged.
    pub async fn restore(&self, id: i64) -> Result<E, RepositoryError> {
        let mut record = self.load(id).await?.ok_or_else(|| not_found::<E>(id))?;
        if !record.meta().is_deleted() {
            return Ok(record);
        }
        record.meta_mut().deleted_at = None;
        record.meta_mut().updated_at = Utc::now();
        self.check_references(&record).await?;
        self.store(record, true).await
    }

    /// Write back an existing row. The row must still exist (and be live
    /// unless `restoring`) and the record must not collide with another
    /// live row.
    async fn store(&self, record: E, restoring: bool) -> Result<E, RepositoryError> {
        let id = record.id();
        let json = to_json(&record)?;
        let check_unique = !record.meta().is_deleted();

        match &self.db {
            Database::Memory(db) => {
                db.table(E::TABLE).rows.write_with(|map| {
                    match map.get(&id) {
                        Some(row) if restoring || !is_deleted(row) => {}
                        _ => return Err(not_found::<E>(id)),
                    }
                    if check_unique {
                        let duplicates = memory_duplicates::<E>(map, &json, id);
                        if !duplicates.is_empty() {
                            return Err(DomainError::Duplicate(duplicates).into());
                        }
                    }
                    map.insert(id, json.clone());
                    Ok(())
                })?;
            }
            Database::Postgres(pool) => {
                if check_unique {
                    let duplicates = self.pg_duplicates(pool, &json, id).await?;
                    if !duplicates.is_empty() {
                        return Err(DomainError::Duplicate(duplicates).into());
                    }
                }
                let mut qb = sql::update::<E>(&json, id)?;
                let result = qb
                    .build()
                    .execute(pool)
                    .await
                    .map_err(|e| map_unique_violation::<E>(e, &json))?;
                if result.rows_affected() == 0 {
                    return Err(not_found::<E>(id));
                }
            }
        }
        Ok(record)
    }
}

// -- Scoped queries -----------------------------------------------------------

/// Conditions accumulated before a terminal query. Consumed by the query.
#[must_use = "a scoped query does nothing until a terminal operation runs"]
pub struct ScopedQuery<'a, E: Entity> {
    repo: &'a Repository<E>,
    conditions: Vec<Condition>,
    include_deleted: bool,
}

impl<'a, E: Entity> ScopedQuery<'a, E> {
    /// AND another condition onto the query.
    pub fn scope(mut self, condition: Condition) -> Self {
        self.conditions.push(condition);
        self
    }

    /// Include soft-deleted rows.
    pub fn with_deleted(mut self) -> Self {
        self.include_deleted = true;
        self
    }

    fn resolve(mut self, params: &ListParams) -> Result<(Self, Vec<SortKey>), RepositoryError> {
        self.conditions.extend(params.conditions::<E>()?);
        self.include_deleted |= params.include_deleted;
        let order = params.sort_keys::<E>()?;
        Ok((self, order))
    }

    /// Every matching record.
    pub async fn find_all(self, params: &ListParams) -> Result<Vec<E>, RepositoryError> {
        let (scope, order) = self.resolve(params)?;
        let (records, _) = scope
            .repo
            .query(scope.conditions, &order, None, scope.include_deleted)
            .await?;
        Ok(records)
    }

    /// One page of matching records with pagination metadata.
    pub async fn find_paginated(
        self,
        params: &ListParams,
    ) -> Result<PaginatedResult<E>, RepositoryError> {
        let page = params.page_request(self.repo.defaults)?;
        let (scope, order) = self.resolve(params)?;
        let (data, total) = scope
            .repo
            .query(scope.conditions, &order, Some(page), scope.include_deleted)
            .await?;
        Ok(PaginatedResult {
            data,
            pagination: PaginationMeta::new(page, total),
        })
    }

    /// Number of matching records.
    pub async fn count(self) -> Result<u64, RepositoryError> {
        let page = PageRequest {
            page: 1,
            page_size: 1,
        };
        let (_, total) = self
            .repo
            .query(self.conditions, &[], Some(page), self.include_deleted)
            .await?;
        Ok(total)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fleet_core::entities::{
        City, Country, CreateCity, CreateCountry, CreateState, State, UpdateCountry,
    };
    use serde_json::json;
    use std::collections::BTreeMap;

    fn repo<E: Entity>(db: &Database) -> Repository<E> {
        Repository::new(db.clone(), PageDefaults::default())
    }

    fn country(name: &str, code: &str) -> CreateCountry {
        CreateCountry {
            name: name.into(),
            code: code.into(),
            active: None,
        }
    }

    fn field_errors(err: RepositoryError) -> (bool, Vec<FieldError>) {
        match err {
            RepositoryError::Domain(DomainError::Duplicate(e)) => (true, e),
            RepositoryError::Domain(DomainError::Validation(e)) => (false, e),
            other => panic!("expected field errors, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn create_assigns_sequential_ids() {
        let db = Database::memory();
        let countries = repo::<Country>(&db);
        let a = countries.create(country("Mexico", "MX")).await.unwrap();
        let b = countries.create(country("Canada", "CA")).await.unwrap();
        assert_eq!((a.id(), b.id()), (1, 2));
        assert!(a.meta.active);
        assert_eq!(countries.find_by_id(2).await.unwrap().name, "Canada");
    }

    #[tokio::test]
    async fn duplicate_code_is_rejected_with_value() {
        let db = Database::memory();
        let countries = repo::<Country>(&db);
        countries.create(country("Mexico", "MX")).await.unwrap();
        let err = countries.create(country("Mexico 2", "MX")).await.unwrap_err();
        let (duplicate, errors) = field_errors(err);
        assert!(duplicate);
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].field, "code");
        assert_eq!(errors[0].value, Some(json!("MX")));
    }

    #[tokio::test]
    async fn deleted_rows_free_their_unique_values() {
        let db = Database::memory();
        let countries = repo::<Country>(&db);
        let mx = countries.create(country("Mexico", "MX")).await.unwrap();
        countries.soft_delete(mx.id()).await.unwrap();
        let again = countries.create(country("Mexico", "MX")).await.unwrap();
        assert_eq!(again.id(), 2);

        let err = countries.restore(mx.id()).await.unwrap_err();
        let (duplicate, errors) = field_errors(err);
        assert!(duplicate);
        assert_eq!(errors.len(), 2);
    }

    #[tokio::test]
    async fn soft_delete_hides_and_restore_returns() {
        let db = Database::memory();
        let countries = repo::<Country>(&db);
        let mx = countries.create(country("Mexico", "MX")).await.unwrap();

        let deleted = countries.soft_delete(mx.id()).await.unwrap();
        assert!(deleted.meta.deleted_at.is_some());
        assert!(!countries.exists(mx.id()).await.unwrap());
        assert!(matches!(
            countries.find_by_id(mx.id()).await,
            Err(RepositoryError::Domain(DomainError::NotFound { id: 1, .. }))
        ));
        assert!(countries.soft_delete(mx.id()).await.is_err());
        assert!(countries.find_all(&ListParams::default()).await.unwrap().is_empty());

        let with_deleted = ListParams {
            include_deleted: true,
            ..Default::default()
        };
        assert_eq!(countries.find_all(&with_deleted).await.unwrap().len(), 1);

        let restored = countries.restore(mx.id()).await.unwrap();
        assert!(restored.meta.deleted_at.is_none());
        assert!(countries.exists(mx.id()).await.unwrap());
    }

    #[tokio::test]
    async fn update_is_partial_and_bumps_updated_at() {
        let db = Database::memory();
        let countries = repo::<Country>(&db);
        let mx = countries.create(country("Mexico", "MX")).await.unwrap();
        let updated = countries
            .update(
                mx.id(),
                UpdateCountry {
                    name: Some("Estados Unidos Mexicanos".into()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.code, "MX");
        assert_eq!(updated.name, "Estados Unidos Mexicanos");
        assert!(updated.meta.updated_at >= mx.meta.updated_at);
        assert_eq!(updated.meta.created_at, mx.meta.created_at);
    }

    #[tokio::test]
    async fn update_into_existing_value_is_duplicate() {
        let db = Database::memory();
        let countries = repo::<Country>(&db);
        countries.create(country("Mexico", "MX")).await.unwrap();
        let ca = countries.create(country("Canada", "CA")).await.unwrap();
        let err = countries
            .update(
                ca.id(),
                UpdateCountry {
                    code: Some("MX".into()),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert!(field_errors(err).0);
        assert_eq!(countries.find_by_id(ca.id()).await.unwrap().code, "CA");
    }

    #[tokio::test]
    async fn missing_reference_is_a_field_error() {
        let db = Database::memory();
        let states = repo::<State>(&db);
        let err = states
            .create(CreateState {
                name: "Jalisco".into(),
                code: "JAL".into(),
                country_id: 99,
                active: None,
            })
            .await
            .unwrap_err();
        let (duplicate, errors) = field_errors(err);
        assert!(!duplicate);
        assert_eq!(errors[0].field, "countryId");
        assert_eq!(errors[0].code, FieldErrorCode::NotFound);
        assert_eq!(errors[0].value, Some(json!(99)));
    }

    #[tokio::test]
    async fn deleted_reference_is_rejected() {
        let db = Database::memory();
        let countries = repo::<Country>(&db);
        let mx = countries.create(country("Mexico", "MX")).await.unwrap();
        countries.soft_delete(mx.id()).await.unwrap();
        let result = repo::<State>(&db)
            .create(CreateState {
                name: "Jalisco".into(),
                code: "JAL".into(),
                country_id: mx.id(),
                active: None,
            })
            .await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn pagination_metadata_and_out_of_range_page() {
        let db = Database::memory();
        let countries = repo::<Country>(&db);
        for i in 0..25 {
            countries
                .create(country(&format!("Country {i:02}"), &format!("C{i:02}")))
                .await
                .unwrap();
        }
        let page = countries
            .find_paginated(&ListParams {
                page: Some(3),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(page.data.len(), 5);
        assert_eq!(page.pagination.total_count, 25);
        assert_eq!(page.pagination.total_pages, 3);
        assert!(!page.pagination.has_next_page);
        assert!(page.pagination.has_previous_page);

        let beyond = countries
            .find_paginated(&ListParams {
                page: Some(9),
                ..Default::default()
            })
            .await
            .unwrap();
        assert!(beyond.data.is_empty());
        assert_eq!(beyond.pagination.total_count, 25);
        assert_eq!(beyond.pagination.current_page, 9);
    }

    #[tokio::test]
    async fn search_filters_and_order_combine() {
        let db = Database::memory();
        let countries = repo::<Country>(&db);
        countries.create(country("Mexico", "MX")).await.unwrap();
        countries.create(country("New Mexico Republic", "NMR")).await.unwrap();
        let canada = countries.create(country("Canada", "CA")).await.unwrap();
        countries
            .update(
                canada.id(),
                UpdateCountry {
                    active: Some(false),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        let params = ListParams {
            search_term: Some("MEX".into()),
            order_by: vec![fleet_core::OrderBy {
                field: "name".into(),
                direction: fleet_core::SortDirection::Desc,
            }],
            filters: BTreeMap::from([("active".to_string(), json!(true))]),
            ..Default::default()
        };
        let names: Vec<_> = countries
            .find_all(&params)
            .await
            .unwrap()
            .into_iter()
            .map(|c| c.name)
            .collect();
        assert_eq!(names, vec!["New Mexico Republic", "Mexico"]);
    }

    #[tokio::test]
    async fn scopes_accumulate_and_do_not_leak() {
        let db = Database::memory();
        let countries = repo::<Country>(&db);
        let mx = countries.create(country("Mexico", "MX")).await.unwrap();
        let cities = repo::<City>(&db);
        let state = repo::<State>(&db)
            .create(CreateState {
                name: "Jalisco".into(),
                code: "JAL".into(),
                country_id: mx.id(),
                active: None,
            })
            .await
            .unwrap();
        for name in ["Guadalajara", "Zapopan", "Tlaquepaque"] {
            cities
                .create(CreateCity {
                    name: name.into(),
                    slug: None,
                    state_id: state.id(),
                    timezone: "America/Mexico_City".into(),
                    latitude: None,
                    longitude: None,
                    active: None,
                })
                .await
                .unwrap();
        }

        let state_id = City::field("stateId").unwrap();
        let name = City::field("name").unwrap();
        let count = cities
            .scoped()
            .scope(Condition::eq(state_id, state.id()))
            .scope(Condition::Ne(name, json!("Zapopan")))
            .count()
            .await
            .unwrap();
        assert_eq!(count, 2);

        let all = cities.scoped().count().await.unwrap();
        assert_eq!(all, 3);
    }

    #[tokio::test]
    async fn invalid_list_params_are_validation_errors() {
        let db = Database::memory();
        let err = repo::<Country>(&db)
            .find_paginated(&ListParams {
                page: Some(0),
                ..Default::default()
            })
            .await
            .unwrap_err();
        assert!(!field_errors(err).0);
    }

    #[tokio::test]
    async fn restore_of_live_record_is_a_no_op() {
        let db = Database::memory();
        let countries = repo::<Country>(&db);
        let mx = countries.create(country("Mexico", "MX")).await.unwrap();
        let restored = countries.restore(mx.id()).await.unwrap();
        assert_eq!(restored, mx);
        assert!(countries.restore(42).await.is_err());
    }
}
