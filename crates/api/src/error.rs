use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use cdcp_client::BenefitApiError;
use cdcp_core::apply::forms::{FieldErrors, FormError};
use cdcp_core::error::CoreError;
use cdcp_core::mapping::MappingError;
use serde_json::json;

/// Application-level error type for HTTP handlers.
///
/// Wraps the library errors and adds HTTP-specific variants. Implements
/// [`IntoResponse`] to produce consistent `{ "error", "code" }` JSON bodies.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// A domain-level error from `cdcp_core`.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// A step form was rejected.
    #[error(transparent)]
    Form(#[from] FormError),

    /// Translation to or from the benefits system schema failed.
    #[error(transparent)]
    Mapping(#[from] MappingError),

    /// The benefits system could not be reached or answered with an error.
    #[error(transparent)]
    BenefitApi(#[from] BenefitApiError),

    /// No or an unknown `x-session-id`.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Not found: {0}")]
    NotFound(String),

    /// A bad request with a human-readable message.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// An internal error with a human-readable message.
    #[error("Internal error: {0}")]
    InternalError(String),
}

/// Convenience type alias for handler return values.
pub type AppResult<T> = Result<T, AppError>;

impl From<FieldErrors> for AppError {
    fn from(errors: FieldErrors) -> Self {
        Self::Form(FormError::Invalid(errors))
    }
}

const INTERNAL_MESSAGE: &str = "An internal error occurred";
const UPSTREAM_MESSAGE: &str = "The benefits service is unavailable";

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let restart = matches!(&self, AppError::Core(core) if core.requires_restart());

        let (status, code, message) = match &self {
            // --- CoreError variants ---
            AppError::Core(core) => match core {
                CoreError::NotFound { entity, id } => (
                    StatusCode::NOT_FOUND,
                    "NOT_FOUND",
                    format!("{entity} with id {id} not found"),
                ),
                CoreError::Validation(msg) => {
                    (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone())
                }
                CoreError::InvalidIdentifier(raw) => (
                    StatusCode::BAD_REQUEST,
                    "INVALID_IDENTIFIER",
                    format!("'{raw}' is not a valid identifier"),
                ),
                CoreError::SessionMissing { .. } => (
                    StatusCode::NOT_FOUND,
                    "SESSION_MISSING",
                    "No application in progress, start a new one".to_string(),
                ),
                CoreError::SessionExpired { idle_minutes, .. } => (
                    StatusCode::GONE,
                    "SESSION_EXPIRED",
                    format!("Application expired after {idle_minutes} minutes of inactivity"),
                ),
                CoreError::CsrfMismatch => (
                    StatusCode::BAD_REQUEST,
                    "CSRF_MISMATCH",
                    "Invalid CSRF token".to_string(),
                ),
                CoreError::Internal(msg) => {
                    tracing::error!(error = %msg, "Internal core error");
                    (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        "INTERNAL_ERROR",
                        INTERNAL_MESSAGE.to_string(),
                    )
                }
            },

            // --- Form errors carry their own body ---
            AppError::Form(FormError::Invalid(fields)) => {
                let body = json!({
                    "error": "One or more fields are invalid",
                    "code": "VALIDATION_ERROR",
                    "fields": fields,
                });
                return (StatusCode::UNPROCESSABLE_ENTITY, axum::Json(body)).into_response();
            }
            AppError::Form(err @ FormError::NoForm(_)) => {
                (StatusCode::BAD_REQUEST, "BAD_REQUEST", err.to_string())
            }

            // --- Benefits system ---
            AppError::Mapping(err @ MappingError::MalformedUpstreamData(_)) => {
                tracing::error!(error = %err, "Malformed data from benefits system");
                (
                    StatusCode::BAD_GATEWAY,
                    "UPSTREAM_DATA_ERROR",
                    UPSTREAM_MESSAGE.to_string(),
                )
            }
            AppError::Mapping(err @ MappingError::UnsupportedApplicationType(_)) => {
                (StatusCode::BAD_REQUEST, "BAD_REQUEST", err.to_string())
            }
            AppError::BenefitApi(err) => {
                tracing::error!(error = %err, "Benefits system request failed");
                (StatusCode::BAD_GATEWAY, "UPSTREAM_ERROR", UPSTREAM_MESSAGE.to_string())
            }

            // --- HTTP-specific errors ---
            AppError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, "UNAUTHORIZED", msg.clone()),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg.clone()),
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg.clone()),
            AppError::InternalError(msg) => {
                tracing::error!(error = %msg, "Internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    INTERNAL_MESSAGE.to_string(),
                )
            }
        };

        let body = if restart {
            json!({
                "error": message,
                "code": code,
                "restart": true,
            })
        } else {
            json!({
                "error": message,
                "code": code,
            })
        };

        (status, axum::Json(body)).into_response()
    }
}
