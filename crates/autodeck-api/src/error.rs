//! API error mapping.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;
use tracing::{error, warn};

use autodeck_core::CoreError;

/// Errors surfaced by HTTP handlers.
///
/// Every rejection carries a stable machine-readable reason in the body:
/// `{"error": <reason>, "message": <detail>}`.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Domain error from the orchestration core.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// Malformed path segment or request field.
    #[error("{0}")]
    BadRequest(String),
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::Core(core) => match core {
                CoreError::Validation(_) => StatusCode::BAD_REQUEST,
                CoreError::NotFound(_) => StatusCode::NOT_FOUND,
                CoreError::NotCancellable { .. } => StatusCode::CONFLICT,
                CoreError::Provider(_) => StatusCode::BAD_GATEWAY,
                CoreError::Capacity(_) => StatusCode::PAYLOAD_TOO_LARGE,
                CoreError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
        }
    }

    fn reason(&self) -> &'static str {
        match self {
            ApiError::Core(core) => core.reason(),
            ApiError::BadRequest(_) => "validation",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!(reason = self.reason(), "{self}");
        } else {
            warn!(reason = self.reason(), "{self}");
        }
        let body = serde_json::json!({
            "error": self.reason(),
            "message": self.to_string(),
        });
        (status, Json(body)).into_response()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;
    use autodeck_core::JobStatus;

    async fn body_json(err: ApiError) -> (StatusCode, serde_json::Value) {
        let response = err.into_response();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), 16 * 1024)
            .await
            .unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_core_errors_map_to_statuses() {
        let cases = [
            (CoreError::Validation("bad".into()), StatusCode::BAD_REQUEST),
            (CoreError::NotFound("job 9".into()), StatusCode::NOT_FOUND),
            (
                CoreError::NotCancellable {
                    id: 1,
                    status: JobStatus::Running,
                },
                StatusCode::CONFLICT,
            ),
            (CoreError::Provider("boom".into()), StatusCode::BAD_GATEWAY),
            (
                CoreError::Capacity("too big".into()),
                StatusCode::PAYLOAD_TOO_LARGE,
            ),
            (
                CoreError::Storage("disk".into()),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];
        for (core, expected) in cases {
            assert_eq!(ApiError::Core(core).status(), expected);
        }
    }

    #[tokio::test]
    async fn test_body_carries_reason_and_message() {
        let (status, body) =
            body_json(ApiError::Core(CoreError::NotFound("job 42".into()))).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "not-found");
        assert_eq!(body["message"], "job 42 not found");
    }

    #[tokio::test]
    async fn test_bad_request_uses_validation_reason() {
        let (status, body) =
            body_json(ApiError::BadRequest("unknown job kind 'reboot'".into())).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "validation");
        assert_eq!(body["message"], "unknown job kind 'reboot'");
    }
}
