use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use raceday_storage::error::StorageError;
use serde_json::{Value, json};
use validator::ValidationErrors;

static EXPOSE_DETAILS: AtomicBool = AtomicBool::new(false);

/// Whether 500 responses carry the underlying error text. Off unless enabled
/// at startup outside production.
pub fn expose_internal_details(expose: bool) {
    EXPOSE_DETAILS.store(expose, Ordering::Relaxed);
}

/// Web layer errors
#[derive(Debug)]
pub enum WebError {
    Storage(StorageError),
    Validation(ValidationErrors),
    BadRequest(String),
    Unauthorized,
    NotFound,
    InternalServerError(String),
}

impl WebError {
    /// Stable identifier of the error class, sent as `kind`.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Storage(StorageError::NotFound) | Self::NotFound => "not_found",
            Self::Storage(StorageError::ConstraintViolation(_)) => "conflict",
            Self::Storage(StorageError::InvalidInput(_))
            | Self::Storage(StorageError::Timing(_))
            | Self::Validation(_)
            | Self::BadRequest(_) => "validation_error",
            Self::Unauthorized => "unauthorized",
            Self::Storage(_) | Self::InternalServerError(_) => "upstream_store_error",
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self.kind() {
            "not_found" => StatusCode::NOT_FOUND,
            "conflict" => StatusCode::CONFLICT,
            "validation_error" => StatusCode::BAD_REQUEST,
            "unauthorized" => StatusCode::UNAUTHORIZED,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn body(&self) -> Value {
        match self {
            Self::Storage(StorageError::NotFound) | Self::NotFound => {
                json!({ "error": "Resource not found" })
            }
            Self::Storage(StorageError::ConstraintViolation(msg))
            | Self::Storage(StorageError::InvalidInput(msg))
            | Self::BadRequest(msg) => json!({ "error": msg }),
            Self::Storage(StorageError::Timing(e)) => json!({ "error": e.to_string() }),
            Self::Storage(e) => {
                tracing::error!("Storage error: {:?}", e);
                internal_body(&e.to_string())
            }
            Self::Validation(errors) => {
                let field_errors: Vec<String> = errors
                    .field_errors()
                    .iter()
                    .flat_map(|(field, errors)| {
                        errors.iter().map(move |e| {
                            format!(
                                "{}: {}",
                                field,
                                e.message
                                    .as_ref()
                                    .map(|m| m.to_string())
                                    .unwrap_or_else(|| e.code.to_string())
                            )
                        })
                    })
                    .collect();

                json!({
                    "error": "Validation failed",
                    "details": field_errors
                })
            }
            Self::Unauthorized => json!({ "error": "Unauthorized" }),
            Self::InternalServerError(msg) => {
                tracing::error!("Internal server error: {}", msg);
                internal_body(msg)
            }
        }
    }
}

fn internal_body(detail: &str) -> Value {
    if EXPOSE_DETAILS.load(Ordering::Relaxed) {
        json!({ "error": "An internal error occurred", "debug": detail })
    } else {
        json!({ "error": "An internal error occurred" })
    }
}

impl fmt::Display for WebError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Storage(e) => write!(f, "Storage error: {}", e),
            Self::Validation(e) => write!(f, "Validation error: {}", e),
            Self::BadRequest(msg) => write!(f, "Bad request: {}", msg),
            Self::Unauthorized => write!(f, "Unauthorized"),
            Self::NotFound => write!(f, "Resource not found"),
            Self::InternalServerError(msg) => write!(f, "Internal server error: {}", msg),
        }
    }
}

impl std::error::Error for WebError {}

impl IntoResponse for WebError {
    fn into_response(self) -> Response {
        let mut body = self.body();
        body["kind"] = Value::from(self.kind());

        (self.status_code(), Json(body)).into_response()
    }
}

impl From<StorageError> for WebError {
    fn from(error: StorageError) -> Self {
        Self::Storage(error)
    }
}

impl From<ValidationErrors> for WebError {
    fn from(error: ValidationErrors) -> Self {
        Self::Validation(error)
    }
}

pub type ApiResult<T> = Result<T, WebError>;

#[cfg(test)]
mod tests {
    use super::*;
    use raceday_storage::timing::TimingError;

    #[test]
    fn test_kinds_and_status_codes() {
        let cases = [
            (WebError::from(StorageError::NotFound), "not_found", StatusCode::NOT_FOUND),
            (
                WebError::from(StorageError::ConstraintViolation("dup".into())),
                "conflict",
                StatusCode::CONFLICT,
            ),
            (
                WebError::from(StorageError::Timing(TimingError::InvalidPenalty(-5))),
                "validation_error",
                StatusCode::BAD_REQUEST,
            ),
            (WebError::Unauthorized, "unauthorized", StatusCode::UNAUTHORIZED),
            (
                WebError::from(StorageError::Database(sqlx::Error::PoolTimedOut)),
                "upstream_store_error",
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];

        for (error, kind, status) in cases {
            assert_eq!(error.kind(), kind);
            assert_eq!(error.status_code(), status);
        }
    }

    #[test]
    fn test_internal_errors_hide_details_by_default() {
        let error = WebError::from(StorageError::Database(sqlx::Error::PoolTimedOut));
        let body = error.body();

        assert_eq!(body["error"], "An internal error occurred");
        assert!(body.get("debug").is_none());
        assert!(
            WebError::InternalServerError("hash failure".into())
                .body()
                .get("debug")
                .is_none()
        );
    }

    #[test]
    fn test_conflict_keeps_message() {
        let error = WebError::from(StorageError::ConstraintViolation("Bib is taken".into()));
        assert_eq!(error.body()["error"], "Bib is taken");
    }

    #[tokio::test]
    async fn test_response_carries_kind() {
        let response = WebError::BadRequest("page must be >= 1".into()).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["kind"], "validation_error");
        assert_eq!(body["error"], "page must be >= 1");
    }
}
