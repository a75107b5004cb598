//! Application error type.
//!
//! [`AppError`] pairs an HTTP status code with an [`anyhow::Error`]. Client
//! errors render their message as `{"error": "..."}`; server errors are logged
//! and rendered with a generic message so internals never leak to callers.

use anyhow::Error;
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;

#[derive(Debug)]
pub struct AppError {
    pub status: StatusCode,
    pub error: Error,
}

impl AppError {
    pub fn new<E>(status: StatusCode, err: E) -> Self
    where
        E: Into<Error>,
    {
        Self {
            status,
            error: err.into(),
        }
    }

    pub fn internal<E>(err: E) -> Self
    where
        E: Into<Error>,
    {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, err)
    }

    pub fn not_found<E>(err: E) -> Self
    where
        E: Into<Error>,
    {
        Self::new(StatusCode::NOT_FOUND, err)
    }

    pub fn unprocessable<E>(err: E) -> Self
    where
        E: Into<Error>,
    {
        Self::new(StatusCode::UNPROCESSABLE_ENTITY, err)
    }

    pub fn bad_request<E>(err: E) -> Self
    where
        E: Into<Error>,
    {
        Self::new(StatusCode::BAD_REQUEST, err)
    }

    pub fn database<E>(err: E) -> Self
    where
        E: Into<Error>,
    {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, err)
    }

    pub fn unauthorized(message: String) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, anyhow::anyhow!(message))
    }

    pub fn forbidden(message: String) -> Self {
        Self::new(StatusCode::FORBIDDEN, anyhow::anyhow!(message))
    }

    pub fn internal_error(message: String) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, anyhow::anyhow!(message))
    }

    /// The message a client would see for this error.
    pub fn public_message(&self) -> String {
        if self.status.is_server_error() {
            "Internal server error".to_string()
        } else {
            self.error.to_string()
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            tracing::error!(status = %self.status.as_u16(), error = ?self.error, "Request failed");
        }

        let body = Json(json!({
            "error": self.public_message()
        }));

        (self.status, body).into_response()
    }
}

impl<E> From<E> for AppError
where
    E: Into<Error>,
{
    fn from(err: E) -> Self {
        AppError::internal(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_error_keeps_message() {
        let err = AppError::bad_request(anyhow::anyhow!("Class already exists"));
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
        assert_eq!(err.public_message(), "Class already exists");
    }

    #[test]
    fn test_server_error_hides_message() {
        let err = AppError::internal(anyhow::anyhow!("connection reset by peer"));
        assert_eq!(err.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.public_message(), "Internal server error");
    }

    #[test]
    fn test_forbidden_and_unauthorized_statuses() {
        assert_eq!(
            AppError::forbidden("nope".to_string()).status,
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            AppError::unauthorized("who".to_string()).status,
            StatusCode::UNAUTHORIZED
        );
    }

    #[test]
    fn test_from_io_error_is_internal() {
        let io = std::io::Error::other("disk full");
        let err: AppError = io.into();
        assert_eq!(err.status, StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn test_into_response_body_shape() {
        use axum::body::to_bytes;

        let response = AppError::not_found(anyhow::anyhow!("Subject not found")).into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["error"], "Subject not found");
    }
}
