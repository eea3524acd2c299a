// HTTP error handling

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use std::fmt;

/// Result type for HTTP handlers
pub type AppResult<T> = Result<T, AppError>;

/// Application error with HTTP status code
#[derive(Debug)]
pub struct AppError {
    pub status: StatusCode,
    pub message: String,
}

impl AppError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, message)
    }

    pub fn bad_gateway(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_GATEWAY, message)
    }

    pub fn service_unavailable(message: impl Into<String>) -> Self {
        Self::new(StatusCode::SERVICE_UNAVAILABLE, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, message)
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.status, self.message)
    }
}

impl std::error::Error for AppError {}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
    status: u16,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status;
        let body = Json(ErrorResponse {
            error: self.message,
            status: status.as_u16(),
        });

        (status, body).into_response()
    }
}

/// Convert oauth_gate_core errors to HTTP errors
///
/// Provider failures are logged with their full detail (status and body)
/// but only summarized to the user agent.
impl From<oauth_gate_core::Error> for AppError {
    fn from(err: oauth_gate_core::Error) -> Self {
        use oauth_gate_core::Error;

        match err {
            Error::Configuration(msg) => {
                tracing::warn!("Login attempted on misconfigured provider: {}", msg);
                AppError::service_unavailable(msg)
            }
            Error::ProviderProtocol { ref provider, .. } => {
                tracing::error!("{}", err);
                AppError::bad_gateway(format!("{provider} rejected the login request"))
            }
            Error::Transport(msg) => {
                tracing::error!("Provider unreachable: {}", msg);
                AppError::bad_gateway("Identity provider is unreachable")
            }
            Error::Deserialization { context } => {
                tracing::error!("Unexpected provider response: {}", context);
                AppError::bad_gateway("Unexpected response from identity provider")
            }
            Error::Authentication(msg) => AppError::unauthorized(msg),
            Error::Host(msg) => {
                tracing::error!("Login side effect failed: {}", msg);
                AppError::internal(msg)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use oauth_gate_core::Error;

    #[test]
    fn test_core_error_status() {
        let status = |err: Error| AppError::from(err).status;

        assert_eq!(
            status(Error::Configuration("Google authentication is disabled".into())),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(
            status(Error::ProviderProtocol {
                provider: "Google".into(),
                resource: "user profile",
                status: 500,
                body: "{error}".into(),
            }),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(status(Error::Transport("reset".into())), StatusCode::BAD_GATEWAY);
        assert_eq!(
            status(Error::Authentication("Invalid or expired OAuth2 state".into())),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(status(Error::Host("boom".into())), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_provider_body_is_not_exposed() {
        let err = AppError::from(Error::ProviderProtocol {
            provider: "Bitbucket".into(),
            resource: "access token",
            status: 400,
            body: r#"{"error":"invalid_grant"}"#.into(),
        });
        assert_eq!(err.message, "Bitbucket rejected the login request");
    }
}
