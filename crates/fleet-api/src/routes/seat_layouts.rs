//! # Seat Layout Editor
//!
//! Grid edits on a seat diagram. Every edit runs against a copy of the
//! layout; the diagram is stored only if the edited grid still satisfies
//! the hallway rules and fits `maxCapacity`. Seats are renumbered after
//! each edit.
//!
//! Floors are 1-based; rows and columns are 0-based.

use axum::extract::rejection::{JsonRejection, PathRejection};
use axum::extract::{Path, State};
use axum::routing::{delete, get, post, put};
use axum::{Json, Router};
use fleet_core::entities::SeatDiagram;
use fleet_core::{ColumnSide, Entity, LayoutError, Position, SeatLayout, Space};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use utoipa::ToSchema;

use super::record_audit;
use crate::auth::{require_permission, Action, CallerIdentity};
use crate::error::AppError;
use crate::extractors::{extract_json, extract_path};
use crate::state::AppState;

/// Layout of a seat diagram with its derived counts.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LayoutView {
    /// Diagram id.
    pub seat_diagram_id: i64,
    /// Decks in the layout.
    pub num_floors: i64,
    /// Seats in the layout.
    pub total_seats: i64,
    /// Seats the diagram may hold.
    pub max_capacity: i64,
    /// Main hallway column of each floor.
    pub main_hallways: Vec<Option<usize>>,
    /// The grid.
    #[schema(value_type = Object)]
    pub layout: SeatLayout,
}

impl From<SeatDiagram> for LayoutView {
    fn from(diagram: SeatDiagram) -> Self {
        Self {
            seat_diagram_id: diagram.id(),
            num_floors: diagram.num_floors,
            total_seats: diagram.total_seats,
            max_capacity: diagram.max_capacity,
            main_hallways: diagram
                .layout
                .floors
                .iter()
                .map(|floor| floor.main_hallway())
                .collect(),
            layout: diagram.layout,
        }
    }
}

/// Body of an add-column edit.
#[derive(Debug, Deserialize, ToSchema)]
pub struct AddColumnRequest {
    /// `left` or `right` of the main hallway.
    #[schema(value_type = String)]
    pub side: ColumnSide,
}

/// Build the seat layout router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/v1/seat-diagrams/:id/layout",
            get(get_layout).put(replace_layout),
        )
        .route(
            "/v1/seat-diagrams/:id/layout/floors/:floor/columns",
            post(add_column),
        )
        .route(
            "/v1/seat-diagrams/:id/layout/floors/:floor/columns/:column",
            delete(remove_column),
        )
        .route(
            "/v1/seat-diagrams/:id/layout/floors/:floor/rows",
            post(add_row),
        )
        .route(
            "/v1/seat-diagrams/:id/layout/floors/:floor/rows/:row",
            delete(remove_row),
        )
        .route(
            "/v1/seat-diagrams/:id/layout/floors/:floor/spaces/:row/:column",
            put(set_space),
        )
}

/// Apply `edit` to the stored layout of diagram `id` and audit it.
async fn edit_layout<F>(
    state: &AppState,
    caller: &CallerIdentity,
    id: i64,
    metadata: Value,
    edit: F,
) -> Result<Json<SeatDiagram>, AppError>
where
    F: FnOnce(&mut SeatLayout) -> Result<(), LayoutError>,
{
    let permission = require_permission(caller, SeatDiagram::RESOURCE, Action::Layout)?;
    let diagram = state
        .repository::<SeatDiagram>()
        .modify(id, |diagram| diagram.edit_layout(edit))
        .await?;

    tracing::info!(
        id,
        total_seats = diagram.total_seats,
        edit = %metadata,
        "seat layout edited"
    );
    record_audit(state, caller, &permission, id, metadata);
    Ok(Json(diagram))
}

/// GET /v1/seat-diagrams/:id/layout - Layout with derived counts.
#[utoipa::path(
    get,
    path = "/v1/seat-diagrams/{id}/layout",
    params(("id" = i64, Path, description = "Seat diagram id")),
    responses(
        (status = 200, description = "Seat layout", body = LayoutView),
        (status = 404, description = "Seat diagram not found", body = crate::error::ErrorBody),
    ),
    tag = "seat_layouts"
)]
async fn get_layout(
    State(state): State<AppState>,
    caller: CallerIdentity,
    path: Result<Path<i64>, PathRejection>,
) -> Result<Json<LayoutView>, AppError> {
    require_permission(&caller, SeatDiagram::RESOURCE, Action::Get)?;
    let id = extract_path(path)?;
    let diagram = state.repository::<SeatDiagram>().find_by_id(id).await?;
    Ok(Json(diagram.into()))
}

/// PUT /v1/seat-diagrams/:id/layout - Replace the whole grid.
#[utoipa::path(
    put,
    path = "/v1/seat-diagrams/{id}/layout",
    params(("id" = i64, Path, description = "Seat diagram id")),
    request_body = serde_json::Value,
    responses(
        (status = 200, description = "Layout replaced", body = SeatDiagram),
        (status = 422, description = "Invalid layout", body = crate::error::ErrorBody),
    ),
    tag = "seat_layouts"
)]
async fn replace_layout(
    State(state): State<AppState>,
    caller: CallerIdentity,
    path: Result<Path<i64>, PathRejection>,
    body: Result<Json<SeatLayout>, JsonRejection>,
) -> Result<Json<SeatDiagram>, AppError> {
    let id = extract_path(path)?;
    let layout = extract_json(body)?;
    edit_layout(&state, &caller, id, json!({ "edit": "replace" }), |current| {
        *current = layout;
        Ok(())
    })
    .await
}

/// POST /v1/seat-diagrams/:id/layout/floors/:floor/columns - Add a seat column.
#[utoipa::path(
    post,
    path = "/v1/seat-diagrams/{id}/layout/floors/{floor}/columns",
    params(
        ("id" = i64, Path, description = "Seat diagram id"),
        ("floor" = usize, Path, description = "1-based floor number"),
    ),
    request_body = AddColumnRequest,
    responses(
        (status = 200, description = "Column added", body = SeatDiagram),
        (status = 422, description = "Edit breaks the layout rules", body = crate::error::ErrorBody),
    ),
    tag = "seat_layouts"
)]
async fn add_column(
    State(state): State<AppState>,
    caller: CallerIdentity,
    path: Result<Path<(i64, usize)>, PathRejection>,
    body: Result<Json<AddColumnRequest>, JsonRejection>,
) -> Result<Json<SeatDiagram>, AppError> {
    let (id, floor) = extract_path(path)?;
    let side = extract_json(body)?.side;
    let metadata = json!({ "edit": "add_column", "floor": floor, "side": side });
    edit_layout(&state, &caller, id, metadata, |layout| {
        layout.add_column(floor, side)
    })
    .await
}

/// DELETE /v1/seat-diagrams/:id/layout/floors/:floor/columns/:column - Remove a column.
#[utoipa::path(
    delete,
    path = "/v1/seat-diagrams/{id}/layout/floors/{floor}/columns/{column}",
    params(
        ("id" = i64, Path, description = "Seat diagram id"),
        ("floor" = usize, Path, description = "1-based floor number"),
        ("column" = usize, Path, description = "0-based column"),
    ),
    responses(
        (status = 200, description = "Column removed", body = SeatDiagram),
        (status = 422, description = "Edit breaks the layout rules", body = crate::error::ErrorBody),
    ),
    tag = "seat_layouts"
)]
async fn remove_column(
    State(state): State<AppState>,
    caller: CallerIdentity,
    path: Result<Path<(i64, usize, usize)>, PathRejection>,
) -> Result<Json<SeatDiagram>, AppError> {
    let (id, floor, column) = extract_path(path)?;
    let metadata = json!({ "edit": "remove_column", "floor": floor, "column": column });
    edit_layout(&state, &caller, id, metadata, |layout| {
        layout.remove_column(floor, column)
    })
    .await
}

/// POST /v1/seat-diagrams/:id/layout/floors/:floor/rows - Append a row.
#[utoipa::path(
    post,
    path = "/v1/seat-diagrams/{id}/layout/floors/{floor}/rows",
    params(
        ("id" = i64, Path, description = "Seat diagram id"),
        ("floor" = usize, Path, description = "1-based floor number"),
    ),
    responses(
        (status = 200, description = "Row added", body = SeatDiagram),
        (status = 422, description = "Edit breaks the layout rules", body = crate::error::ErrorBody),
    ),
    tag = "seat_layouts"
)]
async fn add_row(
    State(state): State<AppState>,
    caller: CallerIdentity,
    path: Result<Path<(i64, usize)>, PathRejection>,
) -> Result<Json<SeatDiagram>, AppError> {
    let (id, floor) = extract_path(path)?;
    let metadata = json!({ "edit": "add_row", "floor": floor });
    edit_layout(&state, &caller, id, metadata, |layout| layout.add_row(floor)).await
}

/// DELETE /v1/seat-diagrams/:id/layout/floors/:floor/rows/:row - Remove a row.
#[utoipa::path(
    delete,
    path = "/v1/seat-diagrams/{id}/layout/floors/{floor}/rows/{row}",
    params(
        ("id" = i64, Path, description = "Seat diagram id"),
        ("floor" = usize, Path, description = "1-based floor number"),
        ("row" = usize, Path, description = "0-based row"),
    ),
    responses(
        (status = 200, description = "Row removed", body = SeatDiagram),
        (status = 422, description = "Edit breaks the layout rules", body = crate::error::ErrorBody),
    ),
    tag = "seat_layouts"
)]
async fn remove_row(
    State(state): State<AppState>,
    caller: CallerIdentity,
    path: Result<Path<(i64, usize, usize)>, PathRejection>,
) -> Result<Json<SeatDiagram>, AppError> {
    let (id, floor, row) = extract_path(path)?;
    let metadata = json!({ "edit": "remove_row", "floor": floor, "row": row });
    edit_layout(&state, &caller, id, metadata, |layout| {
        layout.remove_row(floor, row)
    })
    .await
}

/// PUT /v1/seat-diagrams/:id/layout/floors/:floor/spaces/:row/:column - Set one cell.
#[utoipa::path(
    put,
    path = "/v1/seat-diagrams/{id}/layout/floors/{floor}/spaces/{row}/{column}",
    params(
        ("id" = i64, Path, description = "Seat diagram id"),
        ("floor" = usize, Path, description = "1-based floor number"),
        ("row" = usize, Path, description = "0-based row"),
        ("column" = usize, Path, description = "0-based column"),
    ),
    request_body = serde_json::Value,
    responses(
        (status = 200, description = "Space set", body = SeatDiagram),
        (status = 422, description = "Edit breaks the layout rules", body = crate::error::ErrorBody),
    ),
    tag = "seat_layouts"
)]
async fn set_space(
    State(state): State<AppState>,
    caller: CallerIdentity,
    path: Result<Path<(i64, usize, usize, usize)>, PathRejection>,
    body: Result<Json<Space>, JsonRejection>,
) -> Result<Json<SeatDiagram>, AppError> {
    let (id, floor, row, column) = extract_path(path)?;
    let space = extract_json(body)?;
    let metadata = json!({ "edit": "set_space", "floor": floor, "row": row, "column": column });
    edit_layout(&state, &caller, id, metadata, |layout| {
        layout.set_space(Position { floor, row, column }, space)
    })
    .await
}
