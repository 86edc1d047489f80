//! # Route Modules
//!
//! - [`crud`]: the generic record endpoints, one router per entity, plus
//!   nested child listings.
//! - [`relations`]: join-table listing and assignment.
//! - [`seat_layouts`]: seat-diagram grid editing.
//! - [`audit`]: audit trail inspection.

pub mod audit;
pub mod crud;
pub mod relations;
pub mod seat_layouts;

use axum::Router;
use fleet_core::entities::{
    Amenity, Bus, BusLine, BusModel, City, Country, Driver, EventType, Installation,
    InstallationType, Label, Node, SeatDiagram, ServiceType, State, Transporter,
};
use serde_json::Value;

use crate::auth::{CallerIdentity, Permission};
use crate::db::audit::AuditEvent;
use crate::state::AppState;

/// Every inventory endpoint under `/v1`.
pub fn router() -> Router<AppState> {
    Router::new()
        .merge(crud::router::<Country>())
        .merge(crud::router::<State>())
        .merge(crud::router::<City>())
        .merge(crud::router::<InstallationType>())
        .merge(crud::router::<Installation>())
        .merge(crud::router::<Amenity>())
        .merge(crud::router::<EventType>())
        .merge(crud::router::<Label>())
        .merge(crud::router::<Node>())
        .merge(crud::router::<ServiceType>())
        .merge(crud::router::<BusModel>())
        .merge(crud::router::<SeatDiagram>())
        .merge(crud::router::<Bus>())
        .merge(crud::router::<Driver>())
        .merge(crud::router::<Transporter>())
        .merge(crud::router::<BusLine>())
        .merge(crud::nested_router::<Country, State>())
        .merge(crud::nested_router::<State, City>())
        .merge(relations::router::<Installation, Amenity>())
        .merge(relations::router::<InstallationType, EventType>())
        .merge(relations::router::<Node, Label>())
        .merge(seat_layouts::router())
        .merge(audit::router())
}

/// Append a mutation to the audit log.
pub(crate) fn record_audit(
    state: &AppState,
    caller: &CallerIdentity,
    permission: &Permission,
    resource_id: i64,
    metadata: Value,
) {
    state.audit.record(AuditEvent {
        actor: caller.actor(),
        permission: permission.code(),
        resource: permission.resource.to_string(),
        resource_id,
        action: permission.action.as_str().to_string(),
        metadata,
    });
}
