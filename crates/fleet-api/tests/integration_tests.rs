//! # Integration Tests for fleet-api
//!
//! Drives the assembled router in memory: record lifecycle, error shapes,
//! listing, nested listings, relations, seat layout edits, authentication,
//! audit trail, metrics and OpenAPI generation.

use axum::body::Body;
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::ServiceExt;

use fleet_api::state::{AppConfig, AppState};

/// Helper: build the test app with auth disabled.
fn test_app() -> axum::Router {
    fleet_api::app(AppState::new())
}

/// Helper: build the test app with auth enabled.
fn test_app_with_auth(token: &str) -> axum::Router {
    let config = AppConfig {
        auth_token: Some(token.to_string()),
        ..AppConfig::default()
    };
    fleet_api::app(AppState::with_config(config, None))
}

/// Helper: read response body as string.
async fn body_string(response: axum::http::Response<Body>) -> String {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    String::from_utf8(bytes.to_vec()).unwrap()
}

/// Helper: send a request with an optional JSON body and bearer token.
async fn send(
    app: &axum::Router,
    method: &str,
    uri: &str,
    body: Option<Value>,
    token: Option<&str>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header("authorization", format!("Bearer {token}"));
    }
    let request = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let text = body_string(response).await;
    let value = if text.is_empty() {
        Value::Null
    } else {
        serde_json::from_str(&text).unwrap_or(Value::String(text))
    };
    (status, value)
}

async fn call(app: &axum::Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    send(app, method, uri, body, None).await
}

async fn create(app: &axum::Router, resource: &str, body: Value) -> Value {
    let (status, record) = call(app, "POST", &format!("/v1/{resource}"), Some(body)).await;
    assert_eq!(status, StatusCode::CREATED, "create {resource}: {record}");
    record
}

/// Country, state and city; returns their ids.
async fn seed_geography(app: &axum::Router) -> (i64, i64, i64) {
    let country = create(app, "countries", json!({"name": "Mexico", "code": "MX"})).await;
    let state = create(
        app,
        "states",
        json!({"name": "Jalisco", "code": "JAL", "countryId": country["id"]}),
    )
    .await;
    let city = create(
        app,
        "cities",
        json!({
            "name": "Guadalajara",
            "stateId": state["id"],
            "timezone": "America/Mexico_City",
            "latitude": 20.67,
            "longitude": -103.35
        }),
    )
    .await;
    (
        country["id"].as_i64().unwrap(),
        state["id"].as_i64().unwrap(),
        city["id"].as_i64().unwrap(),
    )
}

// -- Health Probes ------------------------------------------------------------

#[tokio::test]
async fn test_liveness_probe() {
    let app = test_app();
    let response = app
        .oneshot(
            Request::builder()
                .uri("/health/liveness")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_string(response).await, "ok");
}

#[tokio::test]
async fn test_readiness_probe() {
    let app = test_app();
    let response = app
        .oneshot(
            Request::builder()
                .uri("/health/readiness")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_string(response).await, "ready");
}

// -- Record Lifecycle ---------------------------------------------------------

#[tokio::test]
async fn test_country_lifecycle() {
    let app = test_app();
    let country = create(&app, "countries", json!({"name": "Mexico", "code": "MX"})).await;
    assert_eq!(country["id"], 1);
    assert_eq!(country["active"], true);
    assert!(country["deletedAt"].is_null());

    let (status, fetched) = call(&app, "GET", "/v1/countries/1", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(fetched["name"], "Mexico");

    let (status, updated) = call(
        &app,
        "PUT",
        "/v1/countries/1",
        Some(json!({"name": "Estados Unidos Mexicanos"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["name"], "Estados Unidos Mexicanos");
    assert_eq!(updated["code"], "MX");

    let (status, deleted) = call(&app, "DELETE", "/v1/countries/1", None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(deleted["deletedAt"].is_string());

    let (status, body) = call(&app, "GET", "/v1/countries/1", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["code"], "NOT_FOUND");

    let (status, restored) = call(&app, "POST", "/v1/countries/1/restore", None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(restored["deletedAt"].is_null());

    let (status, _) = call(&app, "GET", "/v1/countries/1", None).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_ids_are_sequential_per_resource() {
    let app = test_app();
    let a = create(&app, "labels", json!({"name": "Terminal", "color": "#FF0000"})).await;
    let b = create(&app, "labels", json!({"name": "Depot", "color": "#00FF00"})).await;
    let c = create(&app, "countries", json!({"name": "Mexico", "code": "MX"})).await;
    assert_eq!(a["id"], 1);
    assert_eq!(b["id"], 2);
    assert_eq!(c["id"], 1);
}

#[tokio::test]
async fn test_get_unknown_record_is_404() {
    let app = test_app();
    let (status, body) = call(&app, "GET", "/v1/buses/42", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["code"], "NOT_FOUND");
}

#[tokio::test]
async fn test_non_numeric_id_is_400() {
    let app = test_app();
    let (status, body) = call(&app, "GET", "/v1/countries/abc", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "BAD_REQUEST");
}

// -- Error Shapes -------------------------------------------------------------

#[tokio::test]
async fn test_duplicate_code_is_409() {
    let app = test_app();
    create(&app, "countries", json!({"name": "Mexico", "code": "MX"})).await;
    let (status, body) = call(
        &app,
        "POST",
        "/v1/countries",
        Some(json!({"name": "Mexico Two", "code": "MX"})),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"]["code"], "DUPLICATE");
    let details = body["error"]["details"].as_array().unwrap();
    assert_eq!(details.len(), 1);
    assert_eq!(details[0]["field"], "code");
    assert_eq!(details[0]["code"], "DUPLICATE");
}

#[tokio::test]
async fn test_deleted_records_release_unique_values() {
    let app = test_app();
    create(&app, "countries", json!({"name": "Mexico", "code": "MX"})).await;
    call(&app, "DELETE", "/v1/countries/1", None).await;
    let second = create(&app, "countries", json!({"name": "Mexico", "code": "MX"})).await;
    assert_eq!(second["id"], 2);

    let (status, body) = call(&app, "POST", "/v1/countries/1/restore", None).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"]["code"], "DUPLICATE");
}

#[tokio::test]
async fn test_validation_reports_every_field() {
    let app = test_app();
    let (status, body) = call(
        &app,
        "POST",
        "/v1/countries",
        Some(json!({"name": "  ", "code": "M X"})),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
    let fields: Vec<&str> = body["error"]["details"]
        .as_array()
        .unwrap()
        .iter()
        .map(|d| d["field"].as_str().unwrap())
        .collect();
    assert_eq!(fields, vec!["name", "code"]);
}

#[tokio::test]
async fn test_missing_reference_is_422() {
    let app = test_app();
    let (status, body) = call(
        &app,
        "POST",
        "/v1/states",
        Some(json!({"name": "Jalisco", "code": "JAL", "countryId": 99})),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    let detail = &body["error"]["details"][0];
    assert_eq!(detail["field"], "countryId");
    assert_eq!(detail["code"], "NOT_FOUND");
}

#[tokio::test]
async fn test_malformed_json_is_400() {
    let app = test_app();
    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/v1/countries")
                .header("content-type", "application/json")
                .body(Body::from("{\"name\": "))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body: Value = serde_json::from_str(&body_string(response).await).unwrap();
    assert_eq!(body["error"]["code"], "BAD_REQUEST");
}

// -- Listing ------------------------------------------------------------------

async fn seed_countries(app: &axum::Router) {
    for (name, code) in [("Mexico", "MX"), ("Canada", "CA"), ("Guatemala", "GT")] {
        create(app, "countries", json!({"name": name, "code": code})).await;
    }
}

#[tokio::test]
async fn test_list_paginates() {
    let app = test_app();
    seed_countries(&app).await;

    let (status, body) = call(
        &app,
        "POST",
        "/v1/countries/list",
        Some(json!({"page": 1, "pageSize": 2})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"].as_array().unwrap().len(), 2);
    let pagination = &body["pagination"];
    assert_eq!(pagination["currentPage"], 1);
    assert_eq!(pagination["pageSize"], 2);
    assert_eq!(pagination["totalCount"], 3);
    assert_eq!(pagination["totalPages"], 2);
    assert_eq!(pagination["hasNextPage"], true);
    assert_eq!(pagination["hasPreviousPage"], false);

    let (_, body) = call(
        &app,
        "POST",
        "/v1/countries/list",
        Some(json!({"page": 2, "pageSize": 2})),
    )
    .await;
    assert_eq!(body["data"].as_array().unwrap().len(), 1);
    assert_eq!(body["pagination"]["hasNextPage"], false);
}

#[tokio::test]
async fn test_list_with_empty_body_uses_defaults() {
    let app = test_app();
    seed_countries(&app).await;
    let (status, body) = call(&app, "POST", "/v1/countries/list", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["pagination"]["pageSize"], 10);
    assert_eq!(body["data"].as_array().unwrap().len(), 3);
}

#[tokio::test]
async fn test_list_rejects_page_zero() {
    let app = test_app();
    let (status, body) = call(&app, "POST", "/v1/countries/list", Some(json!({"page": 0}))).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"]["details"][0]["field"], "page");
}

#[tokio::test]
async fn test_list_searches_orders_and_filters() {
    let app = test_app();
    seed_countries(&app).await;

    let (_, body) = call(
        &app,
        "POST",
        "/v1/countries/list/all",
        Some(json!({"searchTerm": "MALA"})),
    )
    .await;
    let data = body["data"].as_array().unwrap();
    assert_eq!(data.len(), 1);
    assert_eq!(data[0]["code"], "GT");

    let (_, body) = call(
        &app,
        "POST",
        "/v1/countries/list/all",
        Some(json!({"orderBy": [{"field": "name", "direction": "desc"}]})),
    )
    .await;
    let names: Vec<&str> = body["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|c| c["name"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["Mexico", "Guatemala", "Canada"]);

    call(&app, "PUT", "/v1/countries/2", Some(json!({"active": false}))).await;
    let (_, body) = call(
        &app,
        "POST",
        "/v1/countries/list/all",
        Some(json!({"filters": {"active": false}})),
    )
    .await;
    let data = body["data"].as_array().unwrap();
    assert_eq!(data.len(), 1);
    assert_eq!(data[0]["code"], "CA");
}

#[tokio::test]
async fn test_list_rejects_unknown_fields() {
    let app = test_app();
    let (status, body) = call(
        &app,
        "POST",
        "/v1/countries/list",
        Some(json!({"filters": {"population": 5}})),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"]["details"][0]["code"], "UNKNOWN_FIELD");
}

#[tokio::test]
async fn test_list_hides_deleted_unless_requested() {
    let app = test_app();
    seed_countries(&app).await;
    call(&app, "DELETE", "/v1/countries/1", None).await;

    let (_, body) = call(&app, "POST", "/v1/countries/list/all", None).await;
    assert_eq!(body["data"].as_array().unwrap().len(), 2);

    let (_, body) = call(
        &app,
        "POST",
        "/v1/countries/list/all",
        Some(json!({"includeDeleted": true})),
    )
    .await;
    assert_eq!(body["data"].as_array().unwrap().len(), 3);
}

// -- Nested Listings ----------------------------------------------------------

#[tokio::test]
async fn test_nested_listing() {
    let app = test_app();
    let (country, state, _) = seed_geography(&app).await;
    create(
        &app,
        "states",
        json!({"name": "Sonora", "code": "SON", "countryId": country}),
    )
    .await;

    let (status, body) = call(&app, "GET", &format!("/v1/countries/{country}/states"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"].as_array().unwrap().len(), 2);

    let (status, body) = call(&app, "GET", &format!("/v1/states/{state}/cities"), None).await;
    assert_eq!(status, StatusCode::OK);
    let cities = body["data"].as_array().unwrap();
    assert_eq!(cities.len(), 1);
    assert_eq!(cities[0]["slug"], "guadalajara");

    let (status, _) = call(&app, "GET", "/v1/countries/99/states", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

// -- Relations ----------------------------------------------------------------

#[tokio::test]
async fn test_node_labels_assignment() {
    let app = test_app();
    let (_, _, city) = seed_geography(&app).await;
    let terminal = create(&app, "labels", json!({"name": "Terminal", "color": "#FF0000"})).await;
    let depot = create(&app, "labels", json!({"name": "Depot", "color": "#00FF00"})).await;
    let node = create(
        &app,
        "nodes",
        json!({"code": "GDL-C", "name": "Guadalajara Central", "cityId": city}),
    )
    .await;
    let uri = format!("/v1/nodes/{}/labels", node["id"]);

    let (status, body) = call(
        &app,
        "PUT",
        &uri,
        Some(json!({"ids": [depot["id"], terminal["id"], depot["id"]]})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"].as_array().unwrap().len(), 2);

    let (status, body) = call(&app, "GET", &uri, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"][0]["name"], "Terminal");

    let (status, body) = call(&app, "PUT", &uri, Some(json!({"ids": [999]}))).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"]["details"][0]["field"], "ids");

    let (_, body) = call(&app, "GET", &uri, None).await;
    assert_eq!(body["data"].as_array().unwrap().len(), 2);

    let (status, _) = call(&app, "GET", "/v1/nodes/77/labels", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_installation_amenities_assignment() {
    let app = test_app();
    let wifi = create(&app, "amenities", json!({"name": "Wi-Fi", "category": "connectivity"})).await;
    let lounge = create(&app, "amenities", json!({"name": "Lounge", "category": "comfort"})).await;
    let terminal = create(
        &app,
        "installations",
        json!({"name": "Terminal Norte", "address": "Av. Central 100"}),
    )
    .await;
    let uri = format!("/v1/installations/{}/amenities", terminal["id"]);

    let (status, body) = call(&app, "GET", &uri, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"], json!([]));

    let (status, body) = call(
        &app,
        "PUT",
        &uri,
        Some(json!({"ids": [lounge["id"], wifi["id"]]})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"][0]["name"], "Wi-Fi");
    assert_eq!(body["data"][1]["name"], "Lounge");

    // Deleted amenities drop out of the listing.
    let (status, _) = call(&app, "DELETE", &format!("/v1/amenities/{}", wifi["id"]), None).await;
    assert_eq!(status, StatusCode::OK);
    let (_, body) = call(&app, "GET", &uri, None).await;
    assert_eq!(body["data"].as_array().unwrap().len(), 1);
    assert_eq!(body["data"][0]["name"], "Lounge");

    let (status, body) = call(&app, "PUT", &uri, Some(json!({"ids": []}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"], json!([]));

    let (status, _) = call(&app, "PUT", "/v1/installations/404/amenities", Some(json!({"ids": []}))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_installation_type_event_types_assignment() {
    let app = test_app();
    let arrival = create(&app, "event-types", json!({"name": "Arrival", "code": "ARR"})).await;
    let fueling = create(
        &app,
        "event-types",
        json!({"name": "Fueling", "code": "FUEL", "baseTime": 15, "needsCost": true}),
    )
    .await;
    let depot = create(
        &app,
        "installation-types",
        json!({"name": "Depot", "code": "DEPOT"}),
    )
    .await;
    let uri = format!("/v1/installation-types/{}/event-types", depot["id"]);

    let (status, body) = call(
        &app,
        "PUT",
        &uri,
        Some(json!({"ids": [fueling["id"], arrival["id"]]})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let codes: Vec<&str> = body["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|e| e["code"].as_str().unwrap())
        .collect();
    assert_eq!(codes, vec!["ARR", "FUEL"]);

    // One unknown id rejects the whole assignment.
    let (status, body) = call(
        &app,
        "PUT",
        &uri,
        Some(json!({"ids": [arrival["id"], 500, 501]})),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    let details = body["error"]["details"].as_array().unwrap();
    assert_eq!(details.len(), 2);
    assert!(details.iter().all(|d| d["field"] == "ids" && d["code"] == "NOT_FOUND"));

    let (_, body) = call(&app, "GET", &uri, None).await;
    assert_eq!(body["data"].as_array().unwrap().len(), 2);

    let (status, _) = call(&app, "GET", "/v1/installation-types/404/event-types", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

// -- Seat Layouts -------------------------------------------------------------

async fn seed_diagram(app: &axum::Router) -> i64 {
    let diagram = create(
        app,
        "seat-diagrams",
        json!({"name": "Standard 2x2", "maxCapacity": 20, "rowsPerFloor": 2, "seatsPerRow": 4}),
    )
    .await;
    assert_eq!(diagram["totalSeats"], 8);
    assert_eq!(diagram["numFloors"], 1);
    diagram["id"].as_i64().unwrap()
}

#[tokio::test]
async fn test_layout_view() {
    let app = test_app();
    let id = seed_diagram(&app).await;
    let (status, body) = call(&app, "GET", &format!("/v1/seat-diagrams/{id}/layout"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["seatDiagramId"], id);
    assert_eq!(body["totalSeats"], 8);
    assert_eq!(body["mainHallways"], json!([2]));
    assert_eq!(body["layout"]["floors"][0]["rows"][0][2]["type"], "hallway");
}

#[tokio::test]
async fn test_layout_column_edits() {
    let app = test_app();
    let id = seed_diagram(&app).await;
    let columns = format!("/v1/seat-diagrams/{id}/layout/floors/1/columns");

    let (status, body) = call(&app, "POST", &columns, Some(json!({"side": "left"}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["totalSeats"], 10);

    let (status, body) = call(&app, "POST", &columns, Some(json!({"side": "left"}))).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"]["details"][0]["field"], "layout");

    // The hallway moved to column 3.
    let (status, _) = call(&app, "DELETE", &format!("{columns}/3"), None).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    let (status, body) = call(&app, "DELETE", &format!("{columns}/0"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["totalSeats"], 8);

    let (status, _) = call(&app, "POST", &format!("/v1/seat-diagrams/{id}/layout/floors/3/columns"), Some(json!({"side": "right"}))).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn test_layout_row_and_space_edits() {
    let app = test_app();
    let id = seed_diagram(&app).await;
    let floor = format!("/v1/seat-diagrams/{id}/layout/floors/1");

    let (status, body) = call(&app, "POST", &format!("{floor}/rows"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["totalSeats"], 12);

    let (status, body) = call(&app, "DELETE", &format!("{floor}/rows/0"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["totalSeats"], 8);

    let (status, body) = call(
        &app,
        "PUT",
        &format!("{floor}/spaces/0/0"),
        Some(json!({"type": "bathroom"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["totalSeats"], 7);
    assert_eq!(body["layout"]["floors"][0]["rows"][0][1]["number"], 1);

    let (status, _) = call(
        &app,
        "PUT",
        &format!("{floor}/spaces/0/2"),
        Some(json!({"type": "seat"})),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn test_layout_respects_capacity() {
    let app = test_app();
    let diagram = create(
        &app,
        "seat-diagrams",
        json!({"name": "Tight", "maxCapacity": 8, "rowsPerFloor": 2, "seatsPerRow": 4}),
    )
    .await;
    let (status, body) = call(
        &app,
        "POST",
        &format!("/v1/seat-diagrams/{}/layout/floors/1/rows", diagram["id"]),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"]["details"][0]["field"], "totalSeats");
}

fn layout_rows(rows: usize, row: Value) -> Value {
    json!({"floors": [{"rows": vec![row; rows]}]})
}

#[tokio::test]
async fn test_layout_replace() {
    let app = test_app();
    let id = seed_diagram(&app).await;
    let uri = format!("/v1/seat-diagrams/{id}/layout");
    let seat = json!({"type": "seat"});
    let hall = json!({"type": "hallway"});

    let (status, body) = call(
        &app,
        "PUT",
        &uri,
        Some(layout_rows(3, json!([seat, seat, hall, seat]))),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["id"], id);
    assert_eq!(body["totalSeats"], 9);
    assert_eq!(body["numFloors"], 1);
    assert_eq!(body["layout"]["floors"][0]["rows"][0][0]["number"], 1);
    assert_eq!(body["layout"]["floors"][0]["rows"][2][3]["number"], 9);

    let (status, body) = call(&app, "GET", &uri, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["totalSeats"], 9);
    assert_eq!(body["mainHallways"], json!([2]));
}

#[tokio::test]
async fn test_layout_replace_rejects_invalid_grids() {
    let app = test_app();
    let id = seed_diagram(&app).await;
    let uri = format!("/v1/seat-diagrams/{id}/layout");
    let seat = json!({"type": "seat"});
    let hall = json!({"type": "hallway"});

    let (status, body) = call(&app, "PUT", &uri, Some(layout_rows(2, json!([seat, seat, seat, seat])))).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"]["details"][0]["field"], "layout");

    // 4 rows of 6 seats exceed maxCapacity 20.
    let (status, body) = call(
        &app,
        "PUT",
        &uri,
        Some(layout_rows(4, json!([seat, seat, seat, hall, seat, seat, seat]))),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"]["details"][0]["field"], "totalSeats");

    let (status, _) = call(&app, "PUT", &uri, Some(json!({"floors": "none"}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (_, body) = call(&app, "GET", &uri, None).await;
    assert_eq!(body["totalSeats"], 8);

    let (status, _) = call(&app, "PUT", "/v1/seat-diagrams/404/layout", Some(layout_rows(1, json!([seat, hall, seat])))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

// -- Authentication -----------------------------------------------------------

#[tokio::test]
async fn test_auth_rejects_missing_token() {
    let app = test_app_with_auth("secret");
    let (status, body) = send(&app, "POST", "/v1/countries/list", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"]["code"], "UNAUTHENTICATED");

    let (status, _) = send(&app, "POST", "/v1/countries/list", None, Some("wrong")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_auth_health_is_public() {
    let app = test_app_with_auth("secret");
    let (status, _) = send(&app, "GET", "/health/liveness", None, None).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_auth_roles_gate_actions() {
    let app = test_app_with_auth("secret");
    let country = json!({"name": "Mexico", "code": "MX"});

    let (status, body) = send(
        &app,
        "POST",
        "/v1/countries",
        Some(country.clone()),
        Some("viewer:ana:secret"),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"]["code"], "PERMISSION_DENIED");

    let (status, _) = send(
        &app,
        "POST",
        "/v1/countries",
        Some(country),
        Some("operator:olga:secret"),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, _) = send(&app, "DELETE", "/v1/countries/1", None, Some("operator:olga:secret")).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = send(&app, "GET", "/v1/countries/1", None, Some("viewer:ana:secret")).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = send(&app, "DELETE", "/v1/countries/1", None, Some("secret")).await;
    assert_eq!(status, StatusCode::OK);
}

// -- Audit Trail --------------------------------------------------------------

#[tokio::test]
async fn test_audit_trail_records_mutations() {
    let app = test_app_with_auth("secret");
    let admin = Some("admin:root:secret");
    send(&app, "POST", "/v1/countries", Some(json!({"name": "Mexico", "code": "MX"})), admin).await;
    send(&app, "PUT", "/v1/countries/1", Some(json!({"name": "México"})), admin).await;
    send(&app, "GET", "/v1/countries/1", None, admin).await;

    let (status, body) = send(&app, "GET", "/v1/audit/countries/1", None, admin).await;
    assert_eq!(status, StatusCode::OK);
    let events = body.as_array().unwrap();
    assert_eq!(events.len(), 2);
    assert_eq!(events[0]["action"], "create");
    assert_eq!(events[0]["permission"], "inventory:countries.create");
    assert_eq!(events[0]["actor"], "root");
    assert_eq!(events[1]["action"], "update");
    assert_eq!(events[1]["previousHash"], events[0]["eventHash"]);

    let (status, body) = send(&app, "GET", "/v1/audit/verify", None, admin).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["totalEvents"], 2);
    assert_eq!(body["chainValid"], true);

    let (status, _) = send(&app, "GET", "/v1/audit/verify", None, Some("operator:olga:secret")).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = send(&app, "GET", "/v1/audit/planets/1", None, admin).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

// -- Metrics & OpenAPI --------------------------------------------------------

#[tokio::test]
async fn test_metrics_count_requests() {
    let app = test_app();
    call(&app, "GET", "/v1/countries/1", None).await;
    let response = app
        .oneshot(Request::builder().uri("/metrics").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let text = body_string(response).await;
    assert!(
        text.contains("fleet_http_requests_total{method=\"GET\",status=\"404\"} 1"),
        "{text}"
    );
    assert!(text.contains("fleet_http_errors_total{class=\"4xx\"} 1"), "{text}");
}

#[tokio::test]
async fn test_openapi_json() {
    let app = test_app();
    let (status, body) = call(&app, "GET", "/openapi.json", None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["paths"]["/v1/countries"].is_object());
    assert!(body["paths"]["/v1/seat-diagrams/{id}/layout"].is_object());
}
