//! SQL composition for the generic repository.
//!
//! Every statement is assembled with [`QueryBuilder`] from an entity's
//! [`FieldSpec`] catalogue. Identifiers come from the catalogue only; every
//! value is a bound parameter. Records are read back as a single JSONB
//! object keyed by the camelCase field names, so rows decode straight into
//! the entity's serde representation.

use chrono::{DateTime, Utc};
use fleet_core::{Condition, Entity, FieldKind, FieldSpec, PageRequest, SortDirection, SortKey};
use serde_json::Value;
use sqlx::{Postgres, QueryBuilder};

/// Bind-parameter error: a value does not match its column type.
#[derive(Debug, thiserror::Error)]
#[error("value for {field} does not match column type {kind:?}: {value}")]
pub struct BindError {
    /// JSON field name.
    pub field: &'static str,
    /// Column type.
    pub kind: FieldKind,
    /// Offending value.
    pub value: Value,
}

/// Push a typed bind parameter for `value`.
///
/// `null` binds a typed `NULL` so the parameter type is still known.
pub fn push_value(
    qb: &mut QueryBuilder<'static, Postgres>,
    field: &'static FieldSpec,
    value: &Value,
) -> Result<(), BindError> {
    let mismatch = || BindError {
        field: field.name,
        kind: field.kind,
        value: value.clone(),
    };
    let null = value.is_null();
    match field.kind {
        FieldKind::Text => {
            let v = value.as_str().map(str::to_owned);
            if v.is_none() && !null {
                return Err(mismatch());
            }
            qb.push_bind(v);
        }
        FieldKind::Integer => {
            let v = value.as_i64();
            if v.is_none() && !null {
                return Err(mismatch());
            }
            qb.push_bind(v);
        }
        FieldKind::Float => {
            let v = value.as_f64();
            if v.is_none() && !null {
                return Err(mismatch());
            }
            qb.push_bind(v);
        }
        FieldKind::Boolean => {
            let v = value.as_bool();
            if v.is_none() && !null {
                return Err(mismatch());
            }
            qb.push_bind(v);
        }
        FieldKind::Timestamp => {
            let v = value
                .as_str()
                .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
                .map(|d| d.with_timezone(&Utc));
            if v.is_none() && !null {
                return Err(mismatch());
            }
            qb.push_bind(v);
        }
        FieldKind::Json => {
            qb.push_bind(sqlx::types::Json(value.clone()));
        }
    }
    Ok(())
}

fn column(field: &FieldSpec) -> String {
    format!("t.{}", field.column)
}

fn escape_like(term: &str) -> String {
    let mut out = String::with_capacity(term.len());
    for c in term.chars() {
        if matches!(c, '\\' | '%' | '_') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

/// Render a condition as a boolean SQL expression.
pub fn push_condition(
    qb: &mut QueryBuilder<'static, Postgres>,
    condition: &Condition,
) -> Result<(), BindError> {
    match condition {
        Condition::Eq(f, v) => {
            qb.push(column(f)).push(" = ");
            push_value(qb, f, v)?;
        }
        Condition::Ne(f, v) => {
            qb.push(column(f)).push(" <> ");
            push_value(qb, f, v)?;
        }
        Condition::In(f, values) => {
            if values.is_empty() {
                qb.push("FALSE");
                return Ok(());
            }
            qb.push(column(f)).push(" IN (");
            for (i, v) in values.iter().enumerate() {
                if i > 0 {
                    qb.push(", ");
                }
                push_value(qb, f, v)?;
            }
            qb.push(")");
        }
        Condition::IsNull(f) => {
            qb.push(column(f)).push(" IS NULL");
        }
        Condition::NotNull(f) => {
            qb.push(column(f)).push(" IS NOT NULL");
        }
        Condition::Search { term, fields } => {
            let term = term.trim();
            if term.is_empty() {
                qb.push("TRUE");
                return Ok(());
            }
            if fields.is_empty() {
                qb.push("FALSE");
                return Ok(());
            }
            qb.push("(");
            for (i, f) in fields.iter().enumerate() {
                if i > 0 {
                    qb.push(" OR ");
                }
                qb.push(column(f))
                    .push("::text ILIKE '%' || ")
                    .push_bind(escape_like(term))
                    .push(" || '%' ESCAPE '\\'");
            }
            qb.push(")");
        }
        Condition::And(all) => {
            if all.is_empty() {
                qb.push("TRUE");
                return Ok(());
            }
            qb.push("(");
            for (i, c) in all.iter().enumerate() {
                if i > 0 {
                    qb.push(" AND ");
                }
                push_condition(qb, c)?;
            }
            qb.push(")");
        }
    }
    Ok(())
}

fn push_where(
    qb: &mut QueryBuilder<'static, Postgres>,
    conditions: &[Condition],
) -> Result<(), BindError> {
    if conditions.is_empty() {
        return Ok(());
    }
    qb.push(" WHERE ");
    for (i, c) in conditions.iter().enumerate() {
        if i > 0 {
            qb.push(" AND ");
        }
        push_condition(qb, c)?;
    }
    Ok(())
}

/// `jsonb_build_object('id', t.id, 'name', t.name, ...)`.
fn record_object<E: Entity>() -> String {
    let pairs: Vec<String> = E::all_fields()
        .map(|f| format!("'{}', t.{}", f.name, f.column))
        .collect();
    format!("jsonb_build_object({})", pairs.join(", "))
}

/// `SELECT <record> FROM <table> t WHERE ... ORDER BY ... LIMIT ... OFFSET ...`.
pub fn select<E: Entity>(
    conditions: &[Condition],
    order: &[SortKey],
    page: Option<PageRequest>,
) -> Result<QueryBuilder<'static, Postgres>, BindError> {
    let mut qb = QueryBuilder::new(format!(
        "SELECT {} AS record FROM {} t",
        record_object::<E>(),
        E::TABLE
    ));
    push_where(&mut qb, conditions)?;
    if !order.is_empty() {
        qb.push(" ORDER BY ");
        for (i, key) in order.iter().enumerate() {
            if i > 0 {
                qb.push(", ");
            }
            let nulls = match key.direction {
                SortDirection::Asc => "NULLS LAST",
                SortDirection::Desc => "NULLS FIRST",
            };
            qb.push(format!(
                "{} {} {}",
                column(key.field),
                key.direction.as_sql(),
                nulls
            ));
        }
    }
    if let Some(page) = page {
        qb.push(" LIMIT ")
            .push_bind(page.limit() as i64)
            .push(" OFFSET ")
            .push_bind(page.offset() as i64);
    }
    Ok(qb)
}

/// `SELECT COUNT(*) FROM <table> t WHERE ...`, paired with [`select`].
pub fn count<E: Entity>(
    conditions: &[Condition],
) -> Result<QueryBuilder<'static, Postgres>, BindError> {
    let mut qb = QueryBuilder::new(format!("SELECT COUNT(*) FROM {} t", E::TABLE));
    push_where(&mut qb, conditions)?;
    Ok(qb)
}

/// `INSERT INTO <table> (<all columns>) VALUES (...)` from a record's JSON form.
pub fn insert<E: Entity>(record: &Value) -> Result<QueryBuilder<'static, Postgres>, BindError> {
    let columns: Vec<&str> = E::all_fields().map(|f| f.column).collect();
    let mut qb = QueryBuilder::new(format!(
        "INSERT INTO {} ({}) VALUES (",
        E::TABLE,
        columns.join(", ")
    ));
    for (i, f) in E::all_fields().enumerate() {
        if i > 0 {
            qb.push(", ");
        }
        push_value(&mut qb, f, record.get(f.name).unwrap_or(&Value::Null))?;
    }
    qb.push(")");
    Ok(qb)
}

/// `UPDATE <table> SET <every column but id> WHERE id = ...`.
pub fn update<E: Entity>(record: &Value, id: i64) -> Result<QueryBuilder<'static, Postgres>, BindError> {
    let mut qb = QueryBuilder::new(format!("UPDATE {} SET ", E::TABLE));
    for (i, f) in E::all_fields().filter(|f| f.name != "id").enumerate() {
        if i > 0 {
            qb.push(", ");
        }
        qb.push(format!("{} = ", f.column));
        push_value(&mut qb, f, record.get(f.name).unwrap_or(&Value::Null))?;
    }
    qb.push(" WHERE id = ").push_bind(id);
    Ok(qb)
}

/// Whether a live row other than `id` holds `value` in `field`.
pub fn unique_taken<E: Entity>(
    field: &'static FieldSpec,
    value: &Value,
    id: i64,
) -> Result<QueryBuilder<'static, Postgres>, BindError> {
    let mut qb = QueryBuilder::new(format!(
        "SELECT EXISTS(SELECT 1 FROM {} t WHERE {} = ",
        E::TABLE,
        column(field)
    ));
    push_value(&mut qb, field, value)?;
    qb.push(" AND t.deleted_at IS NULL AND t.id <> ")
        .push_bind(id)
        .push(")");
    Ok(qb)
}

/// Next value of the table's id sequence.
pub fn next_id<E: Entity>() -> QueryBuilder<'static, Postgres> {
    let mut qb = QueryBuilder::new("SELECT nextval(pg_get_serial_sequence(");
    qb.push_bind(E::TABLE).push(", 'id'))");
    qb
}

/// Field named by a unique index `<table>_<column>_key`.
pub fn field_for_constraint<E: Entity>(constraint: &str) -> Option<&'static FieldSpec> {
    let column = constraint
        .strip_prefix(E::TABLE)?
        .strip_prefix('_')?
        .strip_suffix("_key")?;
    E::all_fields().find(|f| f.column == column)
}

/// Field behind a foreign-key constraint named `<table>_<column>_fkey`.
pub fn field_for_foreign_key<E: Entity>(constraint: &str) -> Option<&'static FieldSpec> {
    let column = constraint
        .strip_prefix(E::TABLE)?
        .strip_prefix('_')?
        .strip_suffix("_fkey")?;
    E::all_fields().find(|f| f.column == column)
}

#[cfg(test)]
mod tests {
    use super::*;
    use fleet_core::entities::{Country, SeatDiagram};
    use fleet_core::{ListParams, OrderBy};
    use serde_json::json;
    use std::collections::BTreeMap;

    fn conditions(params: &ListParams) -> Vec<Condition> {
        params.conditions::<Country>().unwrap()
    }

    #[test]
    fn select_renders_filters_search_and_order() {
        let params = ListParams {
            filters: BTreeMap::from([("active".to_string(), json!(true))]),
            search_term: Some("mex".into()),
            order_by: vec![OrderBy {
                field: "name".into(),
                direction: SortDirection::Desc,
            }],
            ..Default::default()
        };
        let order = params.sort_keys::<Country>().unwrap();
        let page = PageRequest { page: 2, page_size: 10 };
        let qb = select::<Country>(&conditions(&params), &order, Some(page)).unwrap();
        let sql = qb.sql();
        assert!(sql.starts_with("SELECT jsonb_build_object('id', t.id, "));
        assert!(sql.contains("FROM countries t WHERE t.active = $1"));
        assert!(sql.contains("(t.name::text ILIKE '%' || $2 || '%' ESCAPE '\\' OR t.code::text ILIKE"));
        assert!(sql.contains("ORDER BY t.name DESC NULLS FIRST, t.id ASC NULLS LAST"));
        assert!(sql.ends_with("LIMIT $4 OFFSET $5"));
    }

    #[test]
    fn count_shares_the_where_clause() {
        let field = Country::field("deletedAt").unwrap();
        let qb = count::<Country>(&[Condition::IsNull(field)]).unwrap();
        assert_eq!(
            qb.sql(),
            "SELECT COUNT(*) FROM countries t WHERE t.deleted_at IS NULL"
        );
    }

    #[test]
    fn empty_in_matches_nothing() {
        let field = Country::field("id").unwrap();
        let qb = count::<Country>(&[Condition::In(field, vec![])]).unwrap();
        assert!(qb.sql().ends_with("WHERE FALSE"));
    }

    #[test]
    fn like_wildcards_are_escaped() {
        assert_eq!(escape_like("50%_off\\"), "50\\%\\_off\\\\");
    }

    #[test]
    fn insert_lists_every_column() {
        let record = json!({
            "id": 1, "active": true,
            "createdAt": "2024-01-01T00:00:00Z", "updatedAt": "2024-01-01T00:00:00Z",
            "deletedAt": null, "name": "Mexico", "code": "MX",
        });
        let qb = insert::<Country>(&record).unwrap();
        assert_eq!(
            qb.sql(),
            "INSERT INTO countries (id, active, created_at, updated_at, deleted_at, name, code) \
             VALUES ($1, $2, $3, $4, $5, $6, $7)"
        );
    }

    #[test]
    fn update_skips_id() {
        let record = json!({ "name": "Mexico" });
        let qb = update::<Country>(&record, 3).unwrap();
        let sql = qb.sql();
        assert!(sql.starts_with("UPDATE countries SET active = $1, "));
        assert!(sql.ends_with("WHERE id = $7"));
    }

    #[test]
    fn json_columns_bind_as_jsonb() {
        let field = SeatDiagram::field("layout").unwrap();
        let mut qb = QueryBuilder::new("SELECT ");
        push_value(&mut qb, field, &json!({ "floors": [] })).unwrap();
        assert_eq!(qb.sql(), "SELECT $1");
    }

    #[test]
    fn mistyped_value_is_rejected() {
        let field = Country::field("name").unwrap();
        let mut qb = QueryBuilder::new("SELECT ");
        assert!(push_value(&mut qb, field, &json!(5)).is_err());
    }

    #[test]
    fn constraint_names_map_to_fields() {
        assert_eq!(
            field_for_constraint::<Country>("countries_code_key").map(|f| f.name),
            Some("code")
        );
        assert!(field_for_constraint::<Country>("states_code_key").is_none());
        assert_eq!(
            field_for_foreign_key::<SeatDiagram>("seat_diagrams_bus_model_id_fkey").map(|f| f.name),
            Some("busModelId")
        );
        assert!(field_for_foreign_key::<SeatDiagram>("seat_diagrams_name_key").is_none());
    }
}
