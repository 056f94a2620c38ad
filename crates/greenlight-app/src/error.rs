use axum::{
    extract::rejection::{JsonRejection, QueryRejection},
    response::{IntoResponse, Response},
    Json,
};
use greenlight_types::Violations;
use http::StatusCode;
use serde_json::json;
use tracing::{debug, error};

const NOT_FOUND_MESSAGE: &str = "the requested resource could not be found";
const EDIT_CONFLICT_MESSAGE: &str =
    "unable to update the record due to an edit conflict, please try again";
const SERVER_ERROR_MESSAGE: &str =
    "the server encountered a problem and could not process your request";

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Resource not found: {0}")]
    ResourceNotFound(String),

    #[error("Edit conflict: {0}")]
    EditConflict(String),

    #[error("Validation failed: {0}")]
    ValidationFailed(Violations),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Internal error: {0}")]
    InternalError(String),
}

pub type ApiResult<T> = Result<T, ApiError>;

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::ResourceNotFound(what) => {
                debug!("Not found: {what}");
                (StatusCode::NOT_FOUND, json!(NOT_FOUND_MESSAGE))
            }
            ApiError::EditConflict(what) => {
                debug!("Edit conflict: {what}");
                (StatusCode::CONFLICT, json!(EDIT_CONFLICT_MESSAGE))
            }
            ApiError::ValidationFailed(violations) => {
                (StatusCode::UNPROCESSABLE_ENTITY, json!(violations))
            }
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, json!(msg)),
            ApiError::InternalError(msg) => {
                error!(error = %msg, "Internal error");
                (StatusCode::INTERNAL_SERVER_ERROR, json!(SERVER_ERROR_MESSAGE))
            }
        };

        (status, Json(json!({ "error": message }))).into_response()
    }
}

impl From<greenlight_dal::Error> for ApiError {
    fn from(value: greenlight_dal::Error) -> Self {
        match value {
            greenlight_dal::Error::RecordNotFound(what) => ApiError::ResourceNotFound(what),
            greenlight_dal::Error::EditConflict { id, version } => {
                ApiError::EditConflict(format!("Movie {id} version {version}"))
            }
            greenlight_dal::Error::InvalidOrderByField(_) => {
                let mut violations = Violations::new();
                violations.add("sort", "invalid sort value");
                ApiError::ValidationFailed(violations)
            }
            other => ApiError::InternalError(other.to_string()),
        }
    }
}

impl From<Violations> for ApiError {
    fn from(value: Violations) -> Self {
        ApiError::ValidationFailed(value)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(value: JsonRejection) -> Self {
        ApiError::BadRequest(value.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(value: QueryRejection) -> Self {
        ApiError::BadRequest(value.body_text())
    }
}
