//! # Authentication & Authorization Middleware
//!
//! Bearer token middleware with role-based access control (RBAC).
//!
//! ## Token Format
//!
//! ```text
//! Bearer {role}:{user_id}:{secret}   - role-scoped token
//! Bearer {secret}                    - bare secret (treated as admin)
//! ```
//!
//! Tokens are provisioned out of band; the service only knows the shared
//! secret.
//!
//! ## Permissions
//!
//! Every endpoint maps to a permission code `inventory:{resource}.{action}`,
//! e.g. `inventory:countries.create`. Each [`Action`] has a minimum
//! [`Role`]:
//!
//! | Role       | Actions                                           |
//! |------------|---------------------------------------------------|
//! | `viewer`   | get, list                                         |
//! | `operator` | + create, update                                  |
//! | `admin`    | + delete, restore, assign (relations), layout     |

use axum::extract::Request;
use axum::http::request::Parts;
use axum::http::{header, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use subtle::ConstantTimeEq;
use utoipa::ToSchema;

use crate::error::{AppError, ErrorBody, ErrorDetail};

/// Service prefix of every permission code.
pub const SERVICE: &str = "inventory";

// -- Role ---------------------------------------------------------------------

/// Roles ordered by privilege level.
///
/// The `Ord` derivation respects variant declaration order:
/// `Viewer < Operator < Admin`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, ToSchema,
)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Read-only access.
    Viewer,
    /// Can create and edit records.
    Operator,
    /// Full access.
    Admin,
}

impl Role {
    /// Return the string representation of this role.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Viewer => "viewer",
            Self::Operator => "operator",
            Self::Admin => "admin",
        }
    }

    fn parse(s: &str) -> Option<Self> {
        match s {
            "viewer" => Some(Self::Viewer),
            "operator" => Some(Self::Operator),
            "admin" => Some(Self::Admin),
            _ => None,
        }
    }
}

// -- Permissions --------------------------------------------------------------

/// Endpoint action, the second half of a permission code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// Read one record.
    Get,
    /// List records.
    List,
    /// Create a record.
    Create,
    /// Partially update a record.
    Update,
    /// Soft-delete a record.
    Delete,
    /// Restore a soft-deleted record.
    Restore,
    /// Replace a join-table set.
    Assign,
    /// Edit a seat layout.
    Layout,
}

impl Action {
    /// Return the string representation of this action.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Get => "get",
            Self::List => "list",
            Self::Create => "create",
            Self::Update => "update",
            Self::Delete => "delete",
            Self::Restore => "restore",
            Self::Assign => "assign",
            Self::Layout => "layout",
        }
    }

    /// Least privileged role allowed to perform this action.
    pub fn minimum_role(&self) -> Role {
        match self {
            Self::Get | Self::List => Role::Viewer,
            Self::Create | Self::Update => Role::Operator,
            Self::Delete | Self::Restore | Self::Assign | Self::Layout => Role::Admin,
        }
    }
}

/// A granted permission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Permission {
    /// Resource path segment.
    pub resource: &'static str,
    /// Action on the resource.
    pub action: Action,
}

impl Permission {
    /// Permission code, e.g. `inventory:countries.create`.
    pub fn code(&self) -> String {
        format!("{SERVICE}:{}.{}", self.resource, self.action.as_str())
    }
}

// -- CallerIdentity -----------------------------------------------------------

/// Identity of the authenticated caller, extracted from the auth context
/// and available to all route handlers via Axum's `FromRequestParts`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallerIdentity {
    /// The caller's role.
    pub role: Role,
    /// The caller's user id, when the token names one.
    pub user_id: Option<String>,
}

impl CallerIdentity {
    /// Identity used when authentication is disabled or a bare secret is presented.
    pub fn admin() -> Self {
        Self {
            role: Role::Admin,
            user_id: None,
        }
    }

    /// Check if the caller has at least the given minimum role.
    pub fn has_role(&self, minimum: Role) -> bool {
        self.role >= minimum
    }

    /// Actor recorded in the audit log: the user id, or the role.
    pub fn actor(&self) -> String {
        self.user_id
            .clone()
            .unwrap_or_else(|| self.role.as_str().to_string())
    }
}

/// Extracts the identity that the auth middleware injected into extensions.
/// Returns 401 if no identity is present.
#[axum::async_trait]
impl<S: Send + Sync> axum::extract::FromRequestParts<S> for CallerIdentity {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<CallerIdentity>()
            .cloned()
            .ok_or_else(|| AppError::Unauthorized("no caller identity in request context".into()))
    }
}

/// Check that the caller has at least the required role.
/// Returns 403 Forbidden if the caller's role is insufficient.
pub fn require_role(caller: &CallerIdentity, minimum: Role) -> Result<(), AppError> {
    if caller.has_role(minimum) {
        Ok(())
    } else {
        Err(AppError::Forbidden(format!(
            "role '{}' required, caller has '{}'",
            minimum.as_str(),
            caller.role.as_str()
        )))
    }
}

/// Check that the caller may perform `action` on `resource`.
pub fn require_permission(
    caller: &CallerIdentity,
    resource: &'static str,
    action: Action,
) -> Result<Permission, AppError> {
    let permission = Permission { resource, action };
    if caller.has_role(action.minimum_role()) {
        Ok(permission)
    } else {
        tracing::warn!(
            permission = %permission.code(),
            role = caller.role.as_str(),
            "permission denied"
        );
        Err(AppError::Forbidden(format!(
            "permission '{}' requires role '{}', caller has '{}'",
            permission.code(),
            action.minimum_role().as_str(),
            caller.role.as_str()
        )))
    }
}

// -- Auth Configuration -------------------------------------------------------

/// Auth configuration injected into request extensions.
///
/// Custom `Debug` redacts the token value to prevent credential leakage in logs.
#[derive(Clone)]
pub struct AuthConfig {
    /// Shared secret. `None` disables authentication.
    pub token: Option<String>,
}

impl std::fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthConfig")
            .field("token", &self.token.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

// -- Token Validation ---------------------------------------------------------

/// Constant-time comparison of bearer tokens.
///
/// When lengths differ, performs a dummy comparison so timing does not
/// depend on where the mismatch is.
fn constant_time_token_eq(provided: &str, expected: &str) -> bool {
    let provided = provided.as_bytes();
    let expected = expected.as_bytes();
    if provided.len() != expected.len() {
        let _ = expected.ct_eq(expected);
        return false;
    }
    provided.ct_eq(expected).into()
}

/// Parse a bearer token in format `{role}:{user_id}:{secret}` or `{secret}`.
///
/// The whole token is tried as a bare secret first, so secrets may contain
/// `:`. In the role form everything after the second `:` is the secret.
pub fn parse_bearer_token(provided: &str, expected_secret: &str) -> Result<CallerIdentity, String> {
    if constant_time_token_eq(provided, expected_secret) {
        return Ok(CallerIdentity::admin());
    }
    let parts: Vec<&str> = provided.splitn(3, ':').collect();

    match parts.as_slice() {
        [_] => Err("invalid bearer token".into()),
        [role, user_id, secret] => {
            if !constant_time_token_eq(secret, expected_secret) {
                return Err("invalid bearer token".into());
            }
            let role = Role::parse(role).ok_or_else(|| format!("unknown role: {role}"))?;
            Ok(CallerIdentity {
                role,
                user_id: (!user_id.is_empty()).then(|| user_id.to_string()),
            })
        }
        _ => Err("invalid token format, expected {role}:{user_id}:{secret} or {secret}".into()),
    }
}

// -- Middleware ---------------------------------------------------------------

/// Extract and validate the Bearer token from the Authorization header.
///
/// Injects the parsed [`CallerIdentity`] into request extensions. When
/// `AuthConfig.token` is `None`, all requests run as admin.
pub async fn auth_middleware(mut request: Request, next: Next) -> Response {
    let expected_token = request.extensions().get::<AuthConfig>().cloned();

    match expected_token {
        Some(AuthConfig {
            token: Some(ref expected),
        }) => {
            let auth_header = request
                .headers()
                .get(header::AUTHORIZATION)
                .and_then(|v| v.to_str().ok());

            match auth_header.and_then(|h| h.strip_prefix("Bearer ")) {
                Some(provided) => match parse_bearer_token(provided.trim(), expected) {
                    Ok(identity) => {
                        request.extensions_mut().insert(identity);
                        next.run(request).await
                    }
                    Err(msg) => {
                        tracing::warn!(reason = %msg, "authentication failed");
                        unauthorized_response(&msg)
                    }
                },
                None if auth_header.is_some() => {
                    tracing::warn!("authentication failed: non-Bearer authorization scheme");
                    unauthorized_response("authorization header must use Bearer scheme")
                }
                None => {
                    tracing::warn!("authentication failed: missing authorization header");
                    unauthorized_response("missing authorization header")
                }
            }
        }
        _ => {
            request.extensions_mut().insert(CallerIdentity::admin());
            next.run(request).await
        }
    }
}

fn unauthorized_response(message: &str) -> Response {
    let body = ErrorBody {
        error: ErrorDetail {
            code: "UNAUTHENTICATED".to_string(),
            message: message.to_string(),
            details: None,
        },
    };
    (StatusCode::UNAUTHORIZED, Json(body)).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use axum::middleware::from_fn;
    use axum::routing::get;
    use axum::Router;
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    fn test_app(token: Option<String>) -> Router {
        let auth_config = AuthConfig { token };
        Router::new()
            .route(
                "/whoami",
                get(|caller: CallerIdentity| async move {
                    format!("{}:{}", caller.role.as_str(), caller.actor())
                }),
            )
            .layer(from_fn(auth_middleware))
            .layer(axum::Extension(auth_config))
    }

    async fn call(app: Router, auth: Option<&str>) -> (StatusCode, String) {
        let mut builder = Request::builder().uri("/whoami");
        if let Some(value) = auth {
            builder = builder.header("Authorization", value);
        }
        let response = app.oneshot(builder.body(Body::empty()).unwrap()).await.unwrap();
        let status = response.status();
        let body = response.into_body().collect().await.unwrap().to_bytes();
        (status, String::from_utf8(body.to_vec()).unwrap())
    }

    #[tokio::test]
    async fn bare_secret_is_admin() {
        let (status, body) = call(test_app(Some("s3cret".into())), Some("Bearer s3cret")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "admin:admin");
    }

    #[tokio::test]
    async fn role_token_carries_user() {
        let (status, body) = call(
            test_app(Some("s3cret".into())),
            Some("Bearer viewer:u-17:s3cret"),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "viewer:u-17");
    }

    #[tokio::test]
    async fn missing_header_is_unauthenticated() {
        let (status, body) = call(test_app(Some("s3cret".into())), None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        let err: serde_json::Value = serde_json::from_str(&body).unwrap();
        assert_eq!(err["error"]["code"], "UNAUTHENTICATED");
        assert!(err["error"]["message"].as_str().unwrap().contains("missing"));
    }

    #[tokio::test]
    async fn wrong_secret_is_unauthenticated() {
        let (status, _) = call(
            test_app(Some("s3cret".into())),
            Some("Bearer admin:u-1:guess"),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn basic_scheme_is_rejected() {
        let (status, body) = call(test_app(Some("s3cret".into())), Some("Basic dXNlcjpwYXNz")).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert!(body.contains("Bearer scheme"));
    }

    #[tokio::test]
    async fn auth_disabled_injects_admin() {
        let (status, body) = call(test_app(None), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "admin:admin");
    }

    #[test]
    fn unknown_role_is_rejected() {
        let err = parse_bearer_token("root:u-1:s3cret", "s3cret").unwrap_err();
        assert!(err.contains("unknown role"));
    }

    #[test]
    fn secret_with_colons_works_bare_and_with_role() {
        let secret = "ops:2024:rotated";
        let caller = parse_bearer_token(secret, secret).unwrap();
        assert_eq!(caller.role, Role::Admin);
        assert_eq!(caller.user_id, None);

        let caller = parse_bearer_token("viewer:u-9:ops:2024:rotated", secret).unwrap();
        assert_eq!(caller.role, Role::Viewer);
        assert_eq!(caller.user_id.as_deref(), Some("u-9"));

        assert!(parse_bearer_token("ops:2024", secret).is_err());
        assert!(parse_bearer_token("admin:u-1:ops:2024", secret).is_err());
    }

    #[test]
    fn empty_user_id_is_none() {
        let caller = parse_bearer_token("operator::s3cret", "s3cret").unwrap();
        assert_eq!(caller.role, Role::Operator);
        assert_eq!(caller.user_id, None);
    }

    #[test]
    fn role_ordering() {
        assert!(Role::Admin > Role::Operator);
        assert!(Role::Operator > Role::Viewer);
    }

    #[test]
    fn permission_codes() {
        let p = Permission {
            resource: "countries",
            action: Action::Create,
        };
        assert_eq!(p.code(), "inventory:countries.create");
    }

    #[test]
    fn permission_matrix() {
        let viewer = CallerIdentity {
            role: Role::Viewer,
            user_id: None,
        };
        let operator = CallerIdentity {
            role: Role::Operator,
            user_id: None,
        };
        assert!(require_permission(&viewer, "buses", Action::List).is_ok());
        assert!(require_permission(&viewer, "buses", Action::Create).is_err());
        assert!(require_permission(&operator, "buses", Action::Update).is_ok());
        assert!(require_permission(&operator, "buses", Action::Delete).is_err());
        assert!(require_permission(&operator, "seat-diagrams", Action::Layout).is_err());
        assert!(require_permission(&CallerIdentity::admin(), "buses", Action::Restore).is_ok());
    }

    #[test]
    fn forbidden_message_names_permission() {
        let viewer = CallerIdentity {
            role: Role::Viewer,
            user_id: None,
        };
        match require_permission(&viewer, "drivers", Action::Delete) {
            Err(AppError::Forbidden(msg)) => assert!(msg.contains("inventory:drivers.delete")),
            other => panic!("expected forbidden, got {other:?}"),
        }
    }

    #[test]
    fn auth_config_debug_redacts_token() {
        let config = AuthConfig {
            token: Some("secret-value".into()),
        };
        assert!(!format!("{config:?}").contains("secret-value"));
    }
}
