//! # Record Endpoints
//!
//! One generic router per [`Entity`], mounted at `/v1/{resource}`:
//!
//! | Method | Path                        | Action    | Response                |
//! |--------|-----------------------------|-----------|-------------------------|
//! | POST   | `/v1/{r}`                   | `create`  | 201 + record            |
//! | GET    | `/v1/{r}/:id`               | `get`     | record                  |
//! | PUT    | `/v1/{r}/:id`               | `update`  | record                  |
//! | DELETE | `/v1/{r}/:id`               | `delete`  | soft-deleted record     |
//! | POST   | `/v1/{r}/:id/restore`       | `restore` | restored record         |
//! | POST   | `/v1/{r}/list`              | `list`    | `{data, pagination}`    |
//! | POST   | `/v1/{r}/list/all`          | `list`    | `{data}`                |
//!
//! List bodies are [`ListParams`]; an empty body lists with defaults.
//! Payload validation, uniqueness and reference checks happen in the
//! repository, so every endpoint reports the same error shapes.

use axum::body::Bytes;
use axum::extract::rejection::{JsonRejection, PathRejection};
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use fleet_core::entities::{City, Country, State as Region};
use fleet_core::{Condition, Entity, ListParams, ListResult, PaginatedResult};
use serde_json::json;

use super::record_audit;
use crate::auth::{require_permission, Action, CallerIdentity};
use crate::error::AppError;
use crate::extractors::{extract_json, extract_optional_json, extract_path};
use crate::state::AppState;

/// Build the router for one entity.
pub fn router<E: Entity>() -> Router<AppState> {
    let base = format!("/v1/{}", E::RESOURCE);
    Router::new()
        .route(&base, post(create::<E>))
        .route(&format!("{base}/list"), post(list::<E>))
        .route(&format!("{base}/list/all"), post(list_all::<E>))
        .route(
            &format!("{base}/:id"),
            get(get_one::<E>).put(update::<E>).delete(remove::<E>),
        )
        .route(&format!("{base}/:id/restore"), post(restore::<E>))
}

/// A record listed under a parent: `GET /v1/{parent}/:id/{child}`.
pub trait ChildOf<P: Entity>: Entity {
    /// JSON name of the field holding the parent id.
    const FOREIGN_KEY: &'static str;
}

impl ChildOf<Country> for Region {
    const FOREIGN_KEY: &'static str = "countryId";
}

impl ChildOf<Region> for City {
    const FOREIGN_KEY: &'static str = "stateId";
}

/// Build the nested listing router for `C` under `P`.
pub fn nested_router<P: Entity, C: ChildOf<P>>() -> Router<AppState> {
    Router::new().route(
        &format!("/v1/{}/:id/{}", P::RESOURCE, C::RESOURCE),
        get(list_children::<P, C>),
    )
}

// -- Handlers -----------------------------------------------------------------

async fn create<E: Entity>(
    State(state): State<AppState>,
    caller: CallerIdentity,
    body: Result<Json<E::Create>, JsonRejection>,
) -> Result<(StatusCode, Json<E>), AppError> {
    let permission = require_permission(&caller, E::RESOURCE, Action::Create)?;
    let input = extract_json(body)?;
    let record = state.repository::<E>().create(input).await?;

    record_audit(&state, &caller, &permission, record.id(), json!({}));
    tracing::info!(resource = E::RESOURCE, id = record.id(), "record created");
    Ok((StatusCode::CREATED, Json(record)))
}

async fn get_one<E: Entity>(
    State(state): State<AppState>,
    caller: CallerIdentity,
    path: Result<Path<i64>, PathRejection>,
) -> Result<Json<E>, AppError> {
    require_permission(&caller, E::RESOURCE, Action::Get)?;
    let id = extract_path(path)?;
    let record = state.repository::<E>().find_by_id(id).await?;
    Ok(Json(record))
}

async fn update<E: Entity>(
    State(state): State<AppState>,
    caller: CallerIdentity,
    path: Result<Path<i64>, PathRejection>,
    body: Result<Json<E::Update>, JsonRejection>,
) -> Result<Json<E>, AppError> {
    let permission = require_permission(&caller, E::RESOURCE, Action::Update)?;
    let id = extract_path(path)?;
    let input = extract_json(body)?;
    let record = state.repository::<E>().update(id, input).await?;

    record_audit(&state, &caller, &permission, id, json!({}));
    tracing::info!(resource = E::RESOURCE, id, "record updated");
    Ok(Json(record))
}

async fn remove<E: Entity>(
    State(state): State<AppState>,
    caller: CallerIdentity,
    path: Result<Path<i64>, PathRejection>,
) -> Result<Json<E>, AppError> {
    let permission = require_permission(&caller, E::RESOURCE, Action::Delete)?;
    let id = extract_path(path)?;
    let record = state.repository::<E>().soft_delete(id).await?;

    record_audit(&state, &caller, &permission, id, json!({}));
    tracing::info!(resource = E::RESOURCE, id, "record deleted");
    Ok(Json(record))
}

async fn restore<E: Entity>(
    State(state): State<AppState>,
    caller: CallerIdentity,
    path: Result<Path<i64>, PathRejection>,
) -> Result<Json<E>, AppError> {
    let permission = require_permission(&caller, E::RESOURCE, Action::Restore)?;
    let id = extract_path(path)?;
    let record = state.repository::<E>().restore(id).await?;

    record_audit(&state, &caller, &permission, id, json!({}));
    tracing::info!(resource = E::RESOURCE, id, "record restored");
    Ok(Json(record))
}

async fn list<E: Entity>(
    State(state): State<AppState>,
    caller: CallerIdentity,
    body: Bytes,
) -> Result<Json<PaginatedResult<E>>, AppError> {
    require_permission(&caller, E::RESOURCE, Action::List)?;
    let params: ListParams = extract_optional_json(&body)?;
    let page = state.repository::<E>().find_paginated(&params).await?;
    Ok(Json(page))
}

async fn list_all<E: Entity>(
    State(state): State<AppState>,
    caller: CallerIdentity,
    body: Bytes,
) -> Result<Json<ListResult<E>>, AppError> {
    require_permission(&caller, E::RESOURCE, Action::List)?;
    let params: ListParams = extract_optional_json(&body)?;
    let data = state.repository::<E>().find_all(&params).await?;
    Ok(Json(ListResult { data }))
}

async fn list_children<P: Entity, C: ChildOf<P>>(
    State(state): State<AppState>,
    caller: CallerIdentity,
    path: Result<Path<i64>, PathRejection>,
) -> Result<Json<ListResult<C>>, AppError> {
    require_permission(&caller, C::RESOURCE, Action::List)?;
    let parent_id = extract_path(path)?;
    if !state.repository::<P>().exists(parent_id).await? {
        return Err(AppError::NotFound(format!(
            "{} {parent_id} not found",
            P::RESOURCE
        )));
    }
    let foreign_key = C::field(C::FOREIGN_KEY).ok_or_else(|| {
        AppError::Internal(format!("{} has no field {}", C::RESOURCE, C::FOREIGN_KEY))
    })?;
    let data = state
        .repository::<C>()
        .scoped()
        .scope(Condition::eq(foreign_key, parent_id))
        .find_all(&ListParams::default())
        .await?;
    Ok(Json(ListResult { data }))
}
