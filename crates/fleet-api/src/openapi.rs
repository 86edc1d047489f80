//! # OpenAPI Specification Assembly
//!
//! Assembles the inventory API into a single OpenAPI document served at
//! `/openapi.json`.
//!
//! The seat layout and audit handlers carry `#[utoipa::path]` annotations.
//! The record, nested and relation endpoints are generic over the entity,
//! so [`InventoryPaths`] generates their operations and registers each
//! record's schemas.

use axum::routing::get;
use axum::{Json, Router};
use fleet_core::entities::{
    Amenity, Bus, BusLine, BusModel, City, Country, Driver, EventType, Installation,
    InstallationType, Label, Node, SeatDiagram, ServiceType, State, Transporter,
};
use fleet_core::Entity;
use utoipa::openapi::path::{
    OperationBuilder, ParameterBuilder, ParameterIn, PathItem, PathItemType,
};
use utoipa::openapi::request_body::RequestBodyBuilder;
use utoipa::openapi::response::{Response, ResponseBuilder};
use utoipa::openapi::schema::{KnownFormat, SchemaFormat, SchemaType};
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::openapi::{
    ArrayBuilder, Content, ObjectBuilder, Ref, RefOr, Required, Schema,
};
use utoipa::{Modify, OpenApi, ToSchema};

use crate::state::AppState;

/// Adds the Bearer token security scheme.
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .description(Some(
                            "Shared secret, or `{role}:{user_id}:{secret}`. Set via AUTH_TOKEN.",
                        ))
                        .build(),
                ),
            );
        }
    }
}

/// Adds the generic record, nested listing and relation endpoints.
struct InventoryPaths;

impl Modify for InventoryPaths {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        add_entity::<Country>(openapi);
        add_entity::<State>(openapi);
        add_entity::<City>(openapi);
        add_entity::<InstallationType>(openapi);
        add_entity::<Installation>(openapi);
        add_entity::<Amenity>(openapi);
        add_entity::<EventType>(openapi);
        add_entity::<Label>(openapi);
        add_entity::<Node>(openapi);
        add_entity::<ServiceType>(openapi);
        add_entity::<BusModel>(openapi);
        add_entity::<SeatDiagram>(openapi);
        add_entity::<Bus>(openapi);
        add_entity::<Driver>(openapi);
        add_entity::<Transporter>(openapi);
        add_entity::<BusLine>(openapi);

        add_child_listing::<Country, State>(openapi);
        add_child_listing::<State, City>(openapi);

        add_relation::<Installation, Amenity>(openapi);
        add_relation::<InstallationType, EventType>(openapi);
        add_relation::<Node, Label>(openapi);
    }
}

/// Assembled OpenAPI spec for the inventory API.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Fleet Inventory API",
        version = "0.3.0",
        description = "CRUD backend for the bus-fleet inventory: geography, installations, nodes, bus models, seat diagrams, buses, drivers, transporters and bus lines.\n\nEvery record supports create, read, partial update, soft delete, restore, paginated listing with filters, search and ordering, and an unpaginated dropdown list.\n\nAuthentication: Bearer token via `Authorization: Bearer <token>` header. All `/v1/*` endpoints require authentication when a token is configured. Health probes (`/health/*`) and `/metrics` are unauthenticated."
    ),
    servers(
        (url = "http://localhost:8080", description = "Local development server"),
    ),
    security(
        ("bearer_auth" = [])
    ),
    paths(
        crate::routes::seat_layouts::get_layout,
        crate::routes::seat_layouts::replace_layout,
        crate::routes::seat_layouts::add_column,
        crate::routes::seat_layouts::remove_column,
        crate::routes::seat_layouts::add_row,
        crate::routes::seat_layouts::remove_row,
        crate::routes::seat_layouts::set_space,
        crate::routes::audit::resource_events,
        crate::routes::audit::verify_chain,
    ),
    components(schemas(
        crate::error::ErrorBody,
        crate::error::ErrorDetail,
        fleet_core::FieldError,
        fleet_core::FieldErrorCode,
        fleet_core::RecordMeta,
        fleet_core::ListParams,
        fleet_core::OrderBy,
        fleet_core::SortDirection,
        fleet_core::PaginationMeta,
        crate::relations::AssignRequest,
        crate::routes::seat_layouts::LayoutView,
        crate::routes::seat_layouts::AddColumnRequest,
        crate::db::audit::AuditEntry,
        crate::db::audit::ChainIntegrityResult,
    )),
    modifiers(&SecurityAddon, &InventoryPaths),
    tags(
        (name = "records", description = "Inventory records: create, read, update, soft delete, restore and list"),
        (name = "relations", description = "Many-to-many links between records"),
        (name = "seat_layouts", description = "Seat diagram grid editing"),
        (name = "audit", description = "Hash-chained mutation audit trail"),
    )
)]
pub struct ApiDoc;

/// Build the OpenAPI router.
pub fn router() -> Router<AppState> {
    Router::new().route("/openapi.json", get(openapi_json))
}

/// GET /openapi.json - Return the generated OpenAPI specification.
async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}

// -- Generated operations -----------------------------------------------------

fn schema_name<T: ToSchema<'static>>() -> &'static str {
    T::schema().0
}

fn register<T: ToSchema<'static>>(openapi: &mut utoipa::openapi::OpenApi) -> &'static str {
    let (name, schema) = T::schema();
    openapi
        .components
        .get_or_insert_with(Default::default)
        .schemas
        .insert(name.to_string(), schema);
    name
}

fn add_operation(
    openapi: &mut utoipa::openapi::OpenApi,
    path: String,
    method: PathItemType,
    operation: OperationBuilder,
) {
    openapi
        .paths
        .paths
        .entry(path)
        .or_insert_with(PathItem::default)
        .operations
        .insert(method, operation.build());
}

fn id_param(description: &str) -> ParameterBuilder {
    ParameterBuilder::new()
        .name("id")
        .parameter_in(ParameterIn::Path)
        .required(Required::True)
        .description(Some(description))
        .schema(Some(RefOr::T(Schema::Object(
            ObjectBuilder::new()
                .schema_type(SchemaType::Integer)
                .format(Some(SchemaFormat::KnownFormat(KnownFormat::Int64)))
                .build(),
        ))))
}

fn json_body(schema: &str) -> RequestBodyBuilder {
    RequestBodyBuilder::new()
        .content("application/json", Content::new(Ref::from_schema_name(schema)))
        .required(Some(Required::True))
}

fn json_response(description: &str, schema: impl Into<RefOr<Schema>>) -> RefOr<Response> {
    RefOr::T(
        ResponseBuilder::new()
            .description(description)
            .content("application/json", Content::new(schema))
            .build(),
    )
}

fn error_response(description: &str) -> RefOr<Response> {
    json_response(description, Ref::from_schema_name("ErrorBody"))
}

fn array_of(schema: &str) -> RefOr<Schema> {
    RefOr::T(Schema::Array(
        ArrayBuilder::new()
            .items(Ref::from_schema_name(schema))
            .build(),
    ))
}

/// `{data: [T]}`
fn list_envelope(schema: &str) -> RefOr<Schema> {
    RefOr::T(Schema::Object(
        ObjectBuilder::new()
            .property("data", array_of(schema))
            .required("data")
            .build(),
    ))
}

/// `{data: [T], pagination}`
fn page_envelope(schema: &str) -> RefOr<Schema> {
    RefOr::T(Schema::Object(
        ObjectBuilder::new()
            .property("data", array_of(schema))
            .property("pagination", Ref::from_schema_name("PaginationMeta"))
            .required("data")
            .required("pagination")
            .build(),
    ))
}

fn add_entity<E>(openapi: &mut utoipa::openapi::OpenApi)
where
    E: Entity + ToSchema<'static>,
    E::Create: ToSchema<'static>,
    E::Update: ToSchema<'static>,
{
    let record = register::<E>(openapi);
    let create = register::<E::Create>(openapi);
    let update = register::<E::Update>(openapi);
    let base = format!("/v1/{}", E::RESOURCE);
    let op = |summary: String, id: &str| {
        OperationBuilder::new()
            .tag("records")
            .summary(Some(summary))
            .operation_id(Some(id.to_string()))
    };

    add_operation(
        openapi,
        base.clone(),
        PathItemType::Post,
        op(format!("Create a {record}"), &format!("create_{}", E::TABLE))
            .request_body(Some(json_body(create).build()))
            .response("201", json_response("Record created", Ref::from_schema_name(record)))
            .response("409", error_response("Unique value already in use"))
            .response("422", error_response("Validation failed")),
    );
    add_operation(
        openapi,
        format!("{base}/{{id}}"),
        PathItemType::Get,
        op(format!("Get a {record}"), &format!("get_{}", E::TABLE))
            .parameter(id_param("Record id").build())
            .response("200", json_response("Record", Ref::from_schema_name(record)))
            .response("404", error_response("Record not found")),
    );
    add_operation(
        openapi,
        format!("{base}/{{id}}"),
        PathItemType::Put,
        op(format!("Update a {record}"), &format!("update_{}", E::TABLE))
            .parameter(id_param("Record id").build())
            .request_body(Some(json_body(update).build()))
            .response("200", json_response("Record updated", Ref::from_schema_name(record)))
            .response("404", error_response("Record not found"))
            .response("409", error_response("Unique value already in use"))
            .response("422", error_response("Validation failed")),
    );
    add_operation(
        openapi,
        format!("{base}/{{id}}"),
        PathItemType::Delete,
        op(format!("Soft-delete a {record}"), &format!("delete_{}", E::TABLE))
            .parameter(id_param("Record id").build())
            .response("200", json_response("Record deleted", Ref::from_schema_name(record)))
            .response("404", error_response("Record not found")),
    );
    add_operation(
        openapi,
        format!("{base}/{{id}}/restore"),
        PathItemType::Post,
        op(format!("Restore a {record}"), &format!("restore_{}", E::TABLE))
            .parameter(id_param("Record id").build())
            .response("200", json_response("Record restored", Ref::from_schema_name(record)))
            .response("404", error_response("Record not found"))
            .response("409", error_response("Unique value taken by a live record")),
    );
    add_operation(
        openapi,
        format!("{base}/list"),
        PathItemType::Post,
        op(format!("List {} page", E::RESOURCE), &format!("list_{}", E::TABLE))
            .request_body(Some(
                RequestBodyBuilder::new()
                    .content("application/json", Content::new(Ref::from_schema_name("ListParams")))
                    .build(),
            ))
            .response("200", json_response("One page of records", page_envelope(record)))
            .response("422", error_response("Invalid filter, ordering or page")),
    );
    add_operation(
        openapi,
        format!("{base}/list/all"),
        PathItemType::Post,
        op(format!("List all {}", E::RESOURCE), &format!("list_all_{}", E::TABLE))
            .request_body(Some(
                RequestBodyBuilder::new()
                    .content("application/json", Content::new(Ref::from_schema_name("ListParams")))
                    .build(),
            ))
            .response("200", json_response("All matching records", list_envelope(record)))
            .response("422", error_response("Invalid filter or ordering")),
    );
}

fn add_child_listing<P: Entity, C: Entity + ToSchema<'static>>(
    openapi: &mut utoipa::openapi::OpenApi,
) {
    let child = schema_name::<C>();
    add_operation(
        openapi,
        format!("/v1/{}/{{id}}/{}", P::RESOURCE, C::RESOURCE),
        PathItemType::Get,
        OperationBuilder::new()
            .tag("records")
            .summary(Some(format!("List {} of one of the {}", C::RESOURCE, P::RESOURCE)))
            .operation_id(Some(format!("list_{}_{}", P::TABLE, C::TABLE)))
            .parameter(id_param("Parent id").build())
            .response("200", json_response("Child records", list_envelope(child)))
            .response("404", error_response("Parent not found")),
    );
}

fn add_relation<O: Entity, T: Entity + ToSchema<'static>>(openapi: &mut utoipa::openapi::OpenApi) {
    let target = schema_name::<T>();
    let path = format!("/v1/{}/{{id}}/{}", O::RESOURCE, T::RESOURCE);
    add_operation(
        openapi,
        path.clone(),
        PathItemType::Get,
        OperationBuilder::new()
            .tag("relations")
            .summary(Some(format!("List linked {}", T::RESOURCE)))
            .operation_id(Some(format!("list_{}_{}", O::TABLE, T::TABLE)))
            .parameter(id_param("Owner id").build())
            .response("200", json_response("Linked records", list_envelope(target)))
            .response("404", error_response("Owner not found")),
    );
    add_operation(
        openapi,
        path,
        PathItemType::Put,
        OperationBuilder::new()
            .tag("relations")
            .summary(Some(format!("Replace linked {}", T::RESOURCE)))
            .operation_id(Some(format!("assign_{}_{}", O::TABLE, T::TABLE)))
            .parameter(id_param("Owner id").build())
            .request_body(Some(json_body("AssignRequest").build()))
            .response("200", json_response("Linked records", list_envelope(target)))
            .response("404", error_response("Owner not found"))
            .response("422", error_response("Unknown target id")),
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_openapi_spec_generates_successfully() {
        let spec = ApiDoc::openapi();
        assert_eq!(spec.info.title, "Fleet Inventory API");
        assert_eq!(spec.info.version, "0.3.0");
    }

    #[test]
    fn test_openapi_spec_has_record_paths() {
        let spec = ApiDoc::openapi();
        for path in [
            "/v1/countries",
            "/v1/countries/{id}",
            "/v1/countries/{id}/restore",
            "/v1/countries/list",
            "/v1/countries/list/all",
            "/v1/bus-lines/{id}",
            "/v1/installation-types/list",
        ] {
            assert!(spec.paths.paths.contains_key(path), "missing {path}");
        }
        let item = &spec.paths.paths["/v1/countries/{id}"];
        assert!(item.operations.contains_key(&PathItemType::Get));
        assert!(item.operations.contains_key(&PathItemType::Put));
        assert!(item.operations.contains_key(&PathItemType::Delete));
    }

    #[test]
    fn test_openapi_spec_has_nested_and_relation_paths() {
        let spec = ApiDoc::openapi();
        for path in [
            "/v1/countries/{id}/states",
            "/v1/states/{id}/cities",
            "/v1/installations/{id}/amenities",
            "/v1/installation-types/{id}/event-types",
            "/v1/nodes/{id}/labels",
        ] {
            assert!(spec.paths.paths.contains_key(path), "missing {path}");
        }
    }

    #[test]
    fn test_openapi_spec_has_layout_and_audit_paths() {
        let spec = ApiDoc::openapi();
        for path in [
            "/v1/seat-diagrams/{id}/layout",
            "/v1/seat-diagrams/{id}/layout/floors/{floor}/columns",
            "/v1/seat-diagrams/{id}/layout/floors/{floor}/spaces/{row}/{column}",
            "/v1/audit/verify",
            "/v1/audit/{resource}/{id}",
        ] {
            assert!(spec.paths.paths.contains_key(path), "missing {path}");
        }
    }

    #[test]
    fn test_openapi_spec_registers_record_schemas() {
        let spec = ApiDoc::openapi();
        let components = spec.components.expect("components");
        for name in ["Country", "CreateCountry", "UpdateCountry", "SeatDiagram", "ErrorBody"] {
            assert!(components.schemas.contains_key(name), "missing schema {name}");
        }
        assert!(components.security_schemes.contains_key("bearer_auth"));
    }
}
