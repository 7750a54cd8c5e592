use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use chartops_core::error::{ActionError, ProcessFailure};

// ---------------------------------------------------------------------------
// Internal sentinel for 401 Unauthorized
// ---------------------------------------------------------------------------

/// Carries an explicit HTTP 401 through the `anyhow::Error` chain. Token
/// checks happen in the HTTP layer, so `ActionError` has no variant for it.
#[derive(Debug)]
struct UnauthorizedError(String);

impl std::fmt::Display for UnauthorizedError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::error::Error for UnauthorizedError {}

// ---------------------------------------------------------------------------
// AppError
// ---------------------------------------------------------------------------

/// Unified error type for HTTP responses.
#[derive(Debug)]
pub struct AppError(pub anyhow::Error);

impl AppError {
    /// Construct a 400 Bad Request error with the given message.
    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self(ActionError::InvalidRequest(msg.into()).into())
    }

    /// Construct a 401 Unauthorized error.
    pub fn unauthorized(msg: impl Into<String>) -> Self {
        Self(UnauthorizedError(msg.into()).into())
    }
}

fn status_for(e: &ActionError) -> StatusCode {
    match e {
        ActionError::NotFound { .. } => StatusCode::NOT_FOUND,
        ActionError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
        ActionError::Process {
            failure: ProcessFailure::Exit(_),
            ..
        } => StatusCode::UNPROCESSABLE_ENTITY,
        ActionError::Process {
            failure: ProcessFailure::Spawn(_),
            ..
        }
        | ActionError::Credential(_)
        | ActionError::Provisioning(_)
        | ActionError::StateUpdate { .. }
        | ActionError::Io(_)
        | ActionError::Yaml(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        if let Some(u) = self.0.downcast_ref::<UnauthorizedError>() {
            let body = serde_json::json!({ "error": u.0.clone() });
            return (StatusCode::UNAUTHORIZED, axum::Json(body)).into_response();
        }

        let status = self
            .0
            .downcast_ref::<ActionError>()
            .map_or(StatusCode::INTERNAL_SERVER_ERROR, status_for);

        if status.is_server_error() {
            tracing::error!("request failed: {:#}", self.0);
        }

        let body = serde_json::json!({ "error": self.0.to_string() });
        (status, axum::Json(body)).into_response()
    }
}

impl<E> From<E> for AppError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        Self(err.into())
    }
}
