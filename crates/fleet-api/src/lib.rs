//! # fleet-api - Axum API Service for the Fleet Inventory
//!
//! CRUD backend for the bus-fleet inventory. Every record type gets the
//! same endpoint set from one generic router; persistence is PostgreSQL
//! when `DATABASE_URL` is set and process memory otherwise.
//!
//! ## API Surface
//!
//! | Prefix                              | Module                      | Domain                 |
//! |-------------------------------------|-----------------------------|------------------------|
//! | `/v1/{resource}/*`                  | [`routes::crud`]            | Inventory records      |
//! | `/v1/countries/:id/states` etc.     | [`routes::crud`]            | Nested listings        |
//! | `/v1/nodes/:id/labels` etc.         | [`routes::relations`]       | Join tables            |
//! | `/v1/seat-diagrams/:id/layout/*`    | [`routes::seat_layouts`]    | Seat layout editor     |
//! | `/v1/audit/*`                       | [`routes::audit`]           | Audit trail            |
//!
//! ## Middleware Stack (execution order)
//!
//! ```text
//! TraceLayer → MetricsMiddleware → AuthMiddleware → Handler
//! ```
//!
//! ## OpenAPI
//!
//! Generated OpenAPI 3.1 spec at `/openapi.json`.

pub mod auth;
pub mod db;
pub mod error;
pub mod extractors;
pub mod middleware;
pub mod openapi;
pub mod relations;
pub mod repository;
pub mod routes;
pub mod state;

use axum::extract::{DefaultBodyLimit, State};
use axum::http::{header, StatusCode};
use axum::middleware::from_fn;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Extension, Router};

use crate::auth::AuthConfig;
use crate::db::Database;
use crate::middleware::metrics::ApiMetrics;
use crate::state::AppState;

/// Assemble the full application router with all routes and middleware.
///
/// Health probes (`/health/*`) and `/metrics` are mounted outside the auth
/// middleware so they remain accessible without credentials.
pub fn app(state: AppState) -> Router {
    let auth_config = AuthConfig {
        token: state.config.auth_token.clone(),
    };
    let metrics = match ApiMetrics::new() {
        Ok(metrics) => Some(metrics),
        Err(e) => {
            tracing::error!(error = %e, "metrics disabled: registry setup failed");
            None
        }
    };

    // Middleware execution order (outermost → innermost):
    //   TraceLayer → MetricsMiddleware → AuthMiddleware → Handler
    let mut api = Router::new()
        .merge(routes::router())
        .merge(openapi::router())
        .layer(DefaultBodyLimit::max(2 * 1024 * 1024))
        .layer(from_fn(auth::auth_middleware));
    if let Some(metrics) = &metrics {
        api = api
            .layer(from_fn(middleware::metrics::metrics_middleware))
            .layer(Extension(metrics.clone()));
    }
    let api = api
        .layer(middleware::tracing_layer::layer())
        .layer(Extension(auth_config))
        .with_state(state.clone());

    let mut unauthenticated = Router::new()
        .route("/health/liveness", get(liveness))
        .route("/health/readiness", get(readiness));
    if let Some(metrics) = metrics {
        unauthenticated = unauthenticated
            .route("/metrics", get(prometheus_metrics))
            .layer(Extension(metrics));
    }

    Router::new()
        .merge(unauthenticated.with_state(state))
        .merge(api)
}

/// GET /metrics - Prometheus scrape endpoint.
async fn prometheus_metrics(Extension(metrics): Extension<ApiMetrics>) -> impl IntoResponse {
    match metrics.gather_and_encode() {
        Ok(body) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4; charset=utf-8")],
            body,
        )
            .into_response(),
        Err(e) => {
            tracing::error!(error = %e, "failed to encode Prometheus metrics");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

/// GET /health/liveness - Process is running.
async fn liveness() -> &'static str {
    "ok"
}

/// GET /health/readiness - Storage is reachable.
async fn readiness(State(state): State<AppState>) -> impl IntoResponse {
    match &state.db {
        Database::Memory(_) => (StatusCode::OK, "ready"),
        Database::Postgres(pool) => match sqlx::query("SELECT 1").execute(pool).await {
            Ok(_) => (StatusCode::OK, "ready"),
            Err(e) => {
                tracing::warn!(error = %e, "readiness check failed: database unreachable");
                (StatusCode::SERVICE_UNAVAILABLE, "database unavailable")
            }
        },
    }
}
