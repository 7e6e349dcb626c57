use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use tracing::{error, warn};

use common::EngineError;

/// Transport-edge wrapper mapping the engine's four error kinds onto HTTP.
#[derive(Debug)]
pub struct ApiError(pub EngineError);

impl From<EngineError> for ApiError {
    fn from(err: EngineError) -> Self {
        ApiError(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            EngineError::InvalidParams(_) | EngineError::UnknownStrategy(_) => {
                StatusCode::BAD_REQUEST
            }
            EngineError::DataUnavailable {
                retryable: false, ..
            } => StatusCode::NOT_FOUND,
            EngineError::DataUnavailable {
                retryable: true, ..
            } => StatusCode::BAD_GATEWAY,
            EngineError::InternalComputation(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        match &self.0 {
            EngineError::InternalComputation(msg) => error!(%msg, "internal computation failure"),
            other => warn!(kind = other.kind(), "request failed: {other}"),
        }

        (
            status,
            Json(json!({
                "error": self.0.kind(),
                "message": self.0.to_string(),
            })),
        )
            .into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn status_of(err: EngineError) -> StatusCode {
        ApiError(err).into_response().status()
    }

    #[test]
    fn error_kinds_map_to_the_documented_status_codes() {
        assert_eq!(
            status_of(EngineError::InvalidParams("x".into())),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status_of(EngineError::UnknownStrategy("x".into())),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(status_of(EngineError::no_data("ZZZ")), StatusCode::NOT_FOUND);
        assert_eq!(
            status_of(EngineError::provider("boom")),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            status_of(EngineError::InternalComputation("x".into())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
