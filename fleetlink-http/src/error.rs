//! Error handling for fleetlink-http
//!
//! Maps bridge errors onto the HTTP status codes the upstream contract
//! promises: a timed-out cross-service query is a gateway timeout, a
//! remote-side failure is a bad gateway, a transport failure means the
//! service cannot reach its peers right now.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use fleetlink_core::RequestError;
use serde_json::json;

/// Application error type
#[derive(Debug)]
pub enum AppError {
    /// A cross-service request failed
    Request(RequestError),

    /// Internal error
    Internal(String),
}

impl From<RequestError> for AppError {
    fn from(err: RequestError) -> Self {
        Self::Request(err)
    }
}

impl AppError {
    /// Get the status code and error message for this error
    fn status_and_message(&self) -> (StatusCode, String) {
        match self {
            Self::Request(RequestError::Timeout(_)) => (
                StatusCode::GATEWAY_TIMEOUT,
                "Vehicle data request timed out".to_string(),
            ),
            Self::Request(RequestError::Remote(message)) => (
                StatusCode::BAD_GATEWAY,
                format!("Vehicle service error: {}", message),
            ),
            Self::Request(RequestError::Transport(err)) => {
                (StatusCode::SERVICE_UNAVAILABLE, err.to_string())
            }
            Self::Request(err) => (StatusCode::INTERNAL_SERVER_ERROR, err.to_string()),
            Self::Internal(message) => (StatusCode::INTERNAL_SERVER_ERROR, message.clone()),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message) = self.status_and_message();

        let body = Json(json!({
            "error": error_message,
        }));

        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fleetlink_core::BusError;
    use pretty_assertions::assert_eq;

    fn status_of(err: AppError) -> StatusCode {
        err.status_and_message().0
    }

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            status_of(AppError::Request(RequestError::Timeout("r1".to_string()))),
            StatusCode::GATEWAY_TIMEOUT
        );
        assert_eq!(
            status_of(AppError::Request(RequestError::Remote(
                "not found".to_string()
            ))),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            status_of(AppError::Request(RequestError::Transport(
                BusError::PublishFailed {
                    topic: "vehicle-requests".to_string(),
                    message: "broker gone".to_string(),
                }
            ))),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(
            status_of(AppError::Internal("boom".to_string())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
