//! # Custom Extractors & Validation
//!
//! Helpers mapping Axum rejections to [`AppError`] so malformed requests
//! get the same JSON error body as every other failure.

use axum::body::Bytes;
use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::extract::{Path, Query};
use axum::Json;
use serde::de::DeserializeOwned;

use crate::error::AppError;

/// Extract a JSON body, mapping deserialization errors to [`AppError::BadRequest`].
///
/// ```ignore
/// async fn handler(body: Result<Json<T>, JsonRejection>) -> Result<..., AppError> {
///     let req = extract_json(body)?;
/// }
/// ```
pub fn extract_json<T>(result: Result<Json<T>, JsonRejection>) -> Result<T, AppError> {
    result
        .map(|Json(v)| v)
        .map_err(|err| AppError::BadRequest(err.body_text()))
}

/// Extract path parameters, mapping parse errors to [`AppError::BadRequest`].
pub fn extract_path<T>(result: Result<Path<T>, PathRejection>) -> Result<T, AppError> {
    result
        .map(|Path(v)| v)
        .map_err(|err| AppError::BadRequest(err.body_text()))
}

/// Extract query parameters, mapping parse errors to [`AppError::BadRequest`].
pub fn extract_query<T>(result: Result<Query<T>, QueryRejection>) -> Result<T, AppError> {
    result
        .map(|Query(v)| v)
        .map_err(|err| AppError::BadRequest(err.body_text()))
}

/// Parse a JSON body that may be omitted. An empty body yields `T::default()`.
pub fn extract_optional_json<T: DeserializeOwned + Default>(body: &Bytes) -> Result<T, AppError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(T::default());
    }
    serde_json::from_slice(body)
        .map_err(|err| AppError::BadRequest(format!("Failed to parse the request body as JSON: {err}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extract_json_passes_value() {
        let value = extract_json::<u32>(Ok(Json(7))).unwrap();
        assert_eq!(value, 7);
    }

    #[test]
    fn optional_json_defaults_when_empty() {
        let params: fleet_core::ListParams = extract_optional_json(&Bytes::from_static(b"  ")).unwrap();
        assert!(params.page.is_none());
        let params: fleet_core::ListParams =
            extract_optional_json(&Bytes::from_static(br#"{"page": 2}"#)).unwrap();
        assert_eq!(params.page, Some(2));
        assert!(matches!(
            extract_optional_json::<fleet_core::ListParams>(&Bytes::from_static(b"{")),
            Err(AppError::BadRequest(_))
        ));
    }
}
