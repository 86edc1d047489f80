//! # Relation Endpoints
//!
//! `GET /v1/{owner}/:id/{target}` lists the linked targets;
//! `PUT /v1/{owner}/:id/{target}` with `{"ids": [...]}` replaces them.

use axum::extract::rejection::{JsonRejection, PathRejection};
use axum::extract::{Path, State};
use axum::routing::get;
use axum::{Json, Router};
use fleet_core::{Entity, ListResult};
use serde_json::json;

use super::record_audit;
use crate::auth::{require_permission, Action, CallerIdentity};
use crate::error::AppError;
use crate::extractors::{extract_json, extract_path};
use crate::relations::{AssignRequest, JoinTable, Relation};
use crate::state::AppState;

/// Build the router for one join table.
pub fn router<O: JoinTable<T>, T: Entity>() -> Router<AppState> {
    Router::new().route(
        &format!("/v1/{}/:id/{}", O::RESOURCE, T::RESOURCE),
        get(list::<O, T>).put(assign::<O, T>),
    )
}

fn relation<O: JoinTable<T>, T: Entity>(state: &AppState) -> Relation<O, T> {
    Relation::new(state.db.clone(), state.config.page_defaults)
}

async fn list<O: JoinTable<T>, T: Entity>(
    State(state): State<AppState>,
    caller: CallerIdentity,
    path: Result<Path<i64>, PathRejection>,
) -> Result<Json<ListResult<T>>, AppError> {
    require_permission(&caller, O::RESOURCE, Action::Get)?;
    let id = extract_path(path)?;
    let data = relation::<O, T>(&state).list(id).await?;
    Ok(Json(ListResult { data }))
}

async fn assign<O: JoinTable<T>, T: Entity>(
    State(state): State<AppState>,
    caller: CallerIdentity,
    path: Result<Path<i64>, PathRejection>,
    body: Result<Json<AssignRequest>, JsonRejection>,
) -> Result<Json<ListResult<T>>, AppError> {
    let permission = require_permission(&caller, O::RESOURCE, Action::Assign)?;
    let id = extract_path(path)?;
    let request = extract_json(body)?;
    let data = relation::<O, T>(&state).assign(id, request.ids).await?;

    let linked: Vec<i64> = data.iter().map(|t| t.id()).collect();
    record_audit(
        &state,
        &caller,
        &permission,
        id,
        json!({ "target": T::RESOURCE, "ids": linked }),
    );
    Ok(Json(ListResult { data }))
}
