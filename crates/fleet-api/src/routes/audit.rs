//! # Audit Trail Endpoints
//!
//! Read access to the mutation audit log. Admin only.

use axum::extract::rejection::{PathRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::routing::get;
use axum::{Json, Router};
use serde::Deserialize;
use utoipa::IntoParams;

use crate::auth::{require_role, CallerIdentity, Role};
use crate::db::audit::{AuditEntry, ChainIntegrityResult};
use crate::error::AppError;
use crate::extractors::{extract_path, extract_query};
use crate::state::AppState;

const DEFAULT_VERIFY_LIMIT: i64 = 10_000;

/// Query parameters of a chain verification.
#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct VerifyParams {
    /// Events to inspect from the start of the chain; defaults to 10000.
    pub limit: Option<i64>,
}

/// Build the audit router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/v1/audit/verify", get(verify_chain))
        .route("/v1/audit/:resource/:id", get(resource_events))
}

/// GET /v1/audit/:resource/:id - Audit events of one record, oldest first.
#[utoipa::path(
    get,
    path = "/v1/audit/{resource}/{id}",
    params(
        ("resource" = String, Path, description = "Resource path segment, e.g. `countries`"),
        ("id" = i64, Path, description = "Record id"),
    ),
    responses(
        (status = 200, description = "Audit events", body = Vec<AuditEntry>),
        (status = 404, description = "Unknown resource", body = crate::error::ErrorBody),
    ),
    tag = "audit"
)]
async fn resource_events(
    State(state): State<AppState>,
    caller: CallerIdentity,
    path: Result<Path<(String, i64)>, PathRejection>,
) -> Result<Json<Vec<AuditEntry>>, AppError> {
    require_role(&caller, Role::Admin)?;
    let (resource, id) = extract_path(path)?;
    if fleet_core::entities::table_for(&resource).is_none() {
        return Err(AppError::NotFound(format!("unknown resource '{resource}'")));
    }
    let events = state
        .audit
        .events_for_resource(&resource, id)
        .await
        .map_err(|e| AppError::Internal(format!("audit query failed: {e}")))?;
    Ok(Json(events))
}

/// GET /v1/audit/verify - Check hash continuity of the audit chain.
#[utoipa::path(
    get,
    path = "/v1/audit/verify",
    params(VerifyParams),
    responses(
        (status = 200, description = "Chain integrity", body = ChainIntegrityResult),
    ),
    tag = "audit"
)]
async fn verify_chain(
    State(state): State<AppState>,
    caller: CallerIdentity,
    query: Result<Query<VerifyParams>, QueryRejection>,
) -> Result<Json<ChainIntegrityResult>, AppError> {
    require_role(&caller, Role::Admin)?;
    let params = extract_query(query)?;
    let limit = params.limit.unwrap_or(DEFAULT_VERIFY_LIMIT);
    if limit < 1 {
        return Err(AppError::BadRequest("limit must be at least 1".into()));
    }
    let result = state
        .audit
        .verify_chain(limit)
        .await
        .map_err(|e| AppError::Internal(format!("audit verification failed: {e}")))?;
    if !result.chain_valid {
        tracing::warn!(
            total = result.total_events,
            broken = result.broken_links,
            "audit chain integrity check failed"
        );
    }
    Ok(Json(result))
}
