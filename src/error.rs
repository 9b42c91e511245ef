//! Error taxonomy and the response envelope shared by every handler.

use crate::pagination::PageMeta;
use axum::extract::multipart::MultipartError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use std::borrow::Cow;
use validator::{ValidationError, ValidationErrors};

pub type ApiResult<T> = Result<T, ApiError>;

/// Envelope for every JSON response: `{ success, message, data?, meta?, errors? }`.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta: Option<PageMeta>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub errors: Option<serde_json::Value>,
}

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("validation failed")]
    Validation(#[from] ValidationErrors),

    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    NotFound(String),

    /// Domain rule rejected the request (insufficient stock, empty cart, ...).
    #[error("{0}")]
    BusinessRule(String),

    #[error("{0}")]
    Conflict(String),

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl ApiError {
    /// Single-field validation failure, same shape the derive rules produce.
    pub fn field(field: &'static str, message: impl Into<String>) -> Self {
        let mut err = ValidationError::new("invalid");
        err.message = Some(Cow::Owned(message.into()));
        let mut errors = ValidationErrors::new();
        errors.add(field, err);
        ApiError::Validation(errors)
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        ApiError::Unauthorized(message.into())
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        ApiError::Forbidden(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        ApiError::NotFound(message.into())
    }

    pub fn business(message: impl Into<String>) -> Self {
        ApiError::BusinessRule(message.into())
    }
}

impl From<sqlx::Error> for ApiError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::RowNotFound => ApiError::NotFound("Resource not found".into()),
            sqlx::Error::Database(db) if db.code().as_deref() == Some("23505") => {
                ApiError::Conflict("Resource already exists".into())
            }
            _ => ApiError::Internal(err.into()),
        }
    }
}

impl From<MultipartError> for ApiError {
    fn from(err: MultipartError) -> Self {
        ApiError::BusinessRule(format!("Invalid multipart payload: {err}"))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message, errors) = match self {
            ApiError::Validation(errs) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "Validation failed".to_string(),
                Some(validation_messages(&errs)),
            ),
            ApiError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg, None),
            ApiError::Forbidden(msg) => (StatusCode::FORBIDDEN, msg, None),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg, None),
            ApiError::BusinessRule(msg) => (StatusCode::BAD_REQUEST, msg, None),
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, msg, None),
            ApiError::Internal(err) => {
                tracing::error!(error = ?err, "internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                    None,
                )
            }
        };

        let body = Json(ApiResponse::<()> {
            success: false,
            message,
            data: None,
            meta: None,
            errors,
        });
        (status, body).into_response()
    }
}

/// Flattens [`ValidationErrors`] into `{ field: [messages] }`.
fn validation_messages(errors: &ValidationErrors) -> serde_json::Value {
    let map: serde_json::Map<String, serde_json::Value> = errors
        .field_errors()
        .iter()
        .map(|(field, errs)| {
            let messages: Vec<serde_json::Value> = errs
                .iter()
                .map(|e| {
                    let text = e
                        .message
                        .as_ref()
                        .map(|m| m.to_string())
                        .unwrap_or_else(|| format!("{field} is invalid"));
                    serde_json::Value::String(text)
                })
                .collect();
            (field.to_string(), serde_json::Value::Array(messages))
        })
        .collect();
    serde_json::Value::Object(map)
}

pub fn ok<T: Serialize>(data: T, message: impl Into<String>) -> Json<ApiResponse<T>> {
    Json(ApiResponse {
        success: true,
        message: message.into(),
        data: Some(data),
        meta: None,
        errors: None,
    })
}

/// Success with a message only, no data payload.
pub fn done(message: impl Into<String>) -> Json<ApiResponse<()>> {
    Json(ApiResponse {
        success: true,
        message: message.into(),
        data: None,
        meta: None,
        errors: None,
    })
}

pub fn paged<T: Serialize>(
    data: T,
    meta: PageMeta,
    message: impl Into<String>,
) -> Json<ApiResponse<T>> {
    Json(ApiResponse {
        success: true,
        message: message.into(),
        data: Some(data),
        meta: Some(meta),
        errors: None,
    })
}

pub fn created<T: Serialize>(
    data: T,
    message: impl Into<String>,
) -> (StatusCode, Json<ApiResponse<T>>) {
    (StatusCode::CREATED, ok(data, message))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn success_envelope_omits_errors() {
        let body = serde_json::to_value(ApiResponse {
            success: true,
            message: "Product retrieved".to_string(),
            data: Some(serde_json::json!({ "id": 1 })),
            meta: None,
            errors: None,
        })
        .unwrap();
        assert_eq!(body["success"], serde_json::json!(true));
        assert!(body.get("errors").is_none());
        assert!(body.get("meta").is_none());
    }

    #[test]
    fn field_error_carries_message_per_field() {
        let err = ApiError::field("photo", "Photo must be a jpeg or png");
        let ApiError::Validation(errs) = err else {
            panic!("expected validation error");
        };
        let flat = validation_messages(&errs);
        assert_eq!(
            flat["photo"][0],
            serde_json::json!("Photo must be a jpeg or png")
        );
    }

    #[test]
    fn status_codes_match_taxonomy() {
        assert_eq!(
            ApiError::not_found("Product not found").into_response().status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            ApiError::business("Cart is empty").into_response().status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::field("email", "Email is already taken")
                .into_response()
                .status(),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            ApiError::unauthorized("Invalid or expired token")
                .into_response()
                .status(),
            StatusCode::UNAUTHORIZED
        );
    }
}
