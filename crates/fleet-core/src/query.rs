//! # List Query Model
//!
//! Parameters accepted by every `/list` and `/list/all` endpoint, resolved
//! against an entity's field catalogue into [`Condition`]s and [`SortKey`]s.
//!
//! Conditions have two interpreters: [`Condition::matches`] evaluates them
//! against a record's JSON form (in-memory backend), and the API crate
//! renders them to SQL (PostgreSQL backend). Both follow PostgreSQL
//! semantics: comparisons against `NULL` never match, and ascending order
//! places `NULL`s last.

use std::cmp::Ordering;
use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::ToSchema;

use crate::entity::{Entity, FieldKind, FieldSpec};
use crate::error::{DomainError, FieldError, FieldErrorCode};

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    /// Ascending, `NULL`s last.
    #[default]
    Asc,
    /// Descending, `NULL`s first.
    Desc,
}

impl SortDirection {
    /// SQL keyword.
    pub fn as_sql(&self) -> &'static str {
        match self {
            Self::Asc => "ASC",
            Self::Desc => "DESC",
        }
    }
}

/// One `orderBy` entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct OrderBy {
    /// JSON field name.
    pub field: String,
    /// Direction, ascending by default.
    #[serde(default)]
    pub direction: SortDirection,
}

/// Body of `/list` and `/list/all` requests.
///
/// `page` and `pageSize` are ignored by `/list/all`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ListParams {
    /// 1-based page number.
    pub page: Option<i64>,
    /// Rows per page.
    pub page_size: Option<i64>,
    /// Ordering, applied left to right.
    #[serde(default)]
    pub order_by: Vec<OrderBy>,
    /// Field equality filters. Arrays match any element; `null` matches missing values.
    #[serde(default)]
    #[schema(value_type = Object)]
    pub filters: BTreeMap<String, Value>,
    /// Case-insensitive substring match over searchable fields.
    pub search_term: Option<String>,
    /// Include soft-deleted rows.
    #[serde(default)]
    pub include_deleted: bool,
}

/// Page size defaults, configured per deployment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageDefaults {
    /// Page size when the request omits one.
    pub default_page_size: u32,
    /// Upper bound; larger requests are clamped.
    pub max_page_size: u32,
}

impl Default for PageDefaults {
    fn default() -> Self {
        Self {
            default_page_size: 10,
            max_page_size: 100,
        }
    }
}

/// A validated page window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    /// 1-based page number.
    pub page: u32,
    /// Rows per page.
    pub page_size: u32,
}

impl PageRequest {
    /// SQL `OFFSET`.
    pub fn offset(&self) -> u64 {
        u64::from(self.page - 1) * u64::from(self.page_size)
    }

    /// SQL `LIMIT`.
    pub fn limit(&self) -> u64 {
        u64::from(self.page_size)
    }

    /// Cut this page out of an already ordered list.
    pub fn slice<T>(&self, items: Vec<T>) -> Vec<T> {
        let offset = usize::try_from(self.offset()).unwrap_or(usize::MAX);
        items
            .into_iter()
            .skip(offset)
            .take(self.page_size as usize)
            .collect()
    }
}

/// A resolved ordering key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SortKey {
    /// Field to order by.
    pub field: &'static FieldSpec,
    /// Direction.
    pub direction: SortDirection,
}

/// A composable predicate over an entity's fields.
#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    /// `field = value`.
    Eq(&'static FieldSpec, Value),
    /// `field <> value`.
    Ne(&'static FieldSpec, Value),
    /// `field IN (values)`.
    In(&'static FieldSpec, Vec<Value>),
    /// `field IS NULL`.
    IsNull(&'static FieldSpec),
    /// `field IS NOT NULL`.
    NotNull(&'static FieldSpec),
    /// Any of `fields` contains `term`, case-insensitively.
    Search {
        /// Raw search term.
        term: String,
        /// Fields to search.
        fields: Vec<&'static FieldSpec>,
    },
    /// Every condition holds. Empty is always true.
    And(Vec<Condition>),
}

impl Condition {
    /// Equality; `null` becomes `IS NULL`.
    pub fn eq(field: &'static FieldSpec, value: impl Into<Value>) -> Self {
        match value.into() {
            Value::Null => Self::IsNull(field),
            v => Self::Eq(field, v),
        }
    }

    /// Evaluate against a record serialized to JSON.
    pub fn matches(&self, record: &Value) -> bool {
        let get = |f: &FieldSpec| record.get(f.name).unwrap_or(&Value::Null);
        match self {
            Self::Eq(f, v) => values_equal(get(f), v),
            Self::Ne(f, v) => {
                let actual = get(f);
                !actual.is_null() && !values_equal(actual, v)
            }
            Self::In(f, values) => {
                let actual = get(f);
                values.iter().any(|v| values_equal(actual, v))
            }
            Self::IsNull(f) => get(f).is_null(),
            Self::NotNull(f) => !get(f).is_null(),
            Self::Search { term, fields } => {
                let needle = term.trim().to_lowercase();
                needle.is_empty()
                    || fields.iter().any(|f| match get(f) {
                        Value::String(s) => s.to_lowercase().contains(&needle),
                        Value::Null => false,
                        other => other.to_string().to_lowercase().contains(&needle),
                    })
            }
            Self::And(all) => all.iter().all(|c| c.matches(record)),
        }
    }
}

fn as_timestamp(v: &Value) -> Option<DateTime<Utc>> {
    v.as_str()
        .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
        .map(|d| d.with_timezone(&Utc))
}

fn values_equal(actual: &Value, expected: &Value) -> bool {
    if actual.is_null() || expected.is_null() {
        return false;
    }
    compare_values(actual, expected) == Ordering::Equal
}

/// Total order over JSON values with `NULL`s sorting last.
///
/// Text compares case-insensitively first, then by bytes, which matches
/// the ordering of the usual non-C Postgres collations for ASCII names.
pub fn compare_values(a: &Value, b: &Value) -> Ordering {
    match (a, b) {
        (Value::Null, Value::Null) => Ordering::Equal,
        (Value::Null, _) => Ordering::Greater,
        (_, Value::Null) => Ordering::Less,
        (Value::Number(x), Value::Number(y)) => match (x.as_i64(), y.as_i64()) {
            (Some(x), Some(y)) => x.cmp(&y),
            _ => x
                .as_f64()
                .partial_cmp(&y.as_f64())
                .unwrap_or(Ordering::Equal),
        },
        (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
        (Value::String(x), Value::String(y)) => match (as_timestamp(a), as_timestamp(b)) {
            (Some(x), Some(y)) => x.cmp(&y),
            _ => x
                .to_lowercase()
                .cmp(&y.to_lowercase())
                .then_with(|| x.cmp(y)),
        },
        _ => a.to_string().cmp(&b.to_string()),
    }
}

/// Order two records by the given keys.
pub fn compare_records(a: &Value, b: &Value, keys: &[SortKey]) -> Ordering {
    for key in keys {
        let x = a.get(key.field.name).unwrap_or(&Value::Null);
        let y = b.get(key.field.name).unwrap_or(&Value::Null);
        let ord = match key.direction {
            SortDirection::Asc => compare_values(x, y),
            SortDirection::Desc => compare_values(y, x),
        };
        if ord != Ordering::Equal {
            return ord;
        }
    }
    Ordering::Equal
}

fn value_fits(kind: FieldKind, value: &Value) -> bool {
    match (kind, value) {
        (_, Value::Null) => true,
        (FieldKind::Text, Value::String(_)) => true,
        (FieldKind::Integer, Value::Number(n)) => n.is_i64(),
        (FieldKind::Float, Value::Number(_)) => true,
        (FieldKind::Boolean, Value::Bool(_)) => true,
        (FieldKind::Timestamp, v) => as_timestamp(v).is_some(),
        _ => false,
    }
}

impl ListParams {
    /// Resolve the page window.
    pub fn page_request(&self, defaults: PageDefaults) -> Result<PageRequest, DomainError> {
        let mut errors = Vec::new();
        let page = self.page.unwrap_or(1);
        if page < 1 || page > i64::from(u32::MAX) {
            errors.push(
                FieldError::new("page", FieldErrorCode::OutOfRange, "page must be at least 1")
                    .with_value(page),
            );
        }
        let size = self
            .page_size
            .unwrap_or_else(|| i64::from(defaults.default_page_size));
        if size < 1 {
            errors.push(
                FieldError::new(
                    "pageSize",
                    FieldErrorCode::OutOfRange,
                    "pageSize must be at least 1",
                )
                .with_value(size),
            );
        }
        if !errors.is_empty() {
            return Err(DomainError::Validation(errors));
        }
        let page_size = size.min(i64::from(defaults.max_page_size)) as u32;
        Ok(PageRequest {
            page: page as u32,
            page_size,
        })
    }

    /// Resolve filters and search term into conditions.
    pub fn conditions<E: Entity>(&self) -> Result<Vec<Condition>, DomainError> {
        let mut errors = Vec::new();
        let mut conditions = Vec::new();

        for (name, value) in &self.filters {
            let field = match E::field(name) {
                Some(f) if f.filterable => f,
                _ => {
                    errors.push(
                        FieldError::new(
                            format!("filters.{name}"),
                            FieldErrorCode::UnknownField,
                            format!("{name} is not a filterable field of {}", E::RESOURCE),
                        ),
                    );
                    continue;
                }
            };
            let values: Vec<&Value> = match value {
                Value::Array(items) => items.iter().collect(),
                v => vec![v],
            };
            if let Some(bad) = values.iter().find(|v| !value_fits(field.kind, v)) {
                errors.push(
                    FieldError::new(
                        format!("filters.{name}"),
                        FieldErrorCode::InvalidFormat,
                        format!("value does not match the type of {name}"),
                    )
                    .with_value((*bad).clone()),
                );
                continue;
            }
            conditions.push(match value {
                Value::Array(items) => Condition::In(field, items.clone()),
                v => Condition::eq(field, v.clone()),
            });
        }

        if let Some(term) = self.search_term.as_deref().map(str::trim) {
            if !term.is_empty() {
                conditions.push(Condition::Search {
                    term: term.to_string(),
                    fields: E::searchable_fields(),
                });
            }
        }

        if errors.is_empty() {
            Ok(conditions)
        } else {
            Err(DomainError::Validation(errors))
        }
    }

    /// Resolve `orderBy` into sort keys. `id ASC` is always the final tiebreak.
    pub fn sort_keys<E: Entity>(&self) -> Result<Vec<SortKey>, DomainError> {
        let mut errors = Vec::new();
        let mut keys = Vec::new();
        for order in &self.order_by {
            match E::field(&order.field) {
                Some(field) if field.sortable => keys.push(SortKey {
                    field,
                    direction: order.direction,
                }),
                _ => errors.push(
                    FieldError::new(
                        "orderBy",
                        FieldErrorCode::UnknownField,
                        format!("{} is not a sortable field of {}", order.field, E::RESOURCE),
                    )
                    .with_value(order.field.clone()),
                ),
            }
        }
        if !errors.is_empty() {
            return Err(DomainError::Validation(errors));
        }
        if !keys.iter().any(|k| k.field.name == "id") {
            if let Some(id) = E::field("id") {
                keys.push(SortKey {
                    field: id,
                    direction: SortDirection::Asc,
                });
            }
        }
        Ok(keys)
    }
}

/// Pagination metadata returned next to a page of records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PaginationMeta {
    /// 1-based page number.
    pub current_page: u32,
    /// Rows per page.
    pub page_size: u32,
    /// Rows matching the query across all pages.
    pub total_count: u64,
    /// `ceil(totalCount / pageSize)`; 0 when nothing matches.
    pub total_pages: u64,
    /// A later page exists.
    pub has_next_page: bool,
    /// An earlier page exists.
    pub has_previous_page: bool,
}

impl PaginationMeta {
    /// Compute metadata for `page` given `total_count` matching rows.
    pub fn new(page: PageRequest, total_count: u64) -> Self {
        let size = u64::from(page.page_size.max(1));
        let total_pages = total_count.div_ceil(size);
        Self {
            current_page: page.page,
            page_size: page.page_size,
            total_count,
            total_pages,
            has_next_page: u64::from(page.page) < total_pages,
            has_previous_page: page.page > 1,
        }
    }
}

/// One page of records.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaginatedResult<T> {
    /// Records on this page.
    pub data: Vec<T>,
    /// Window and totals.
    pub pagination: PaginationMeta,
}

/// An unpaginated list (dropdown endpoints).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListResult<T> {
    /// All matching records.
    pub data: Vec<T>,
}
