//! Error types and HTTP error responses

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;

use crate::oauth2::OAuthError;

/// Error returned by the sign-in routes
#[derive(Debug, Error)]
pub enum ServiceError {
    /// Sign-in error
    #[error(transparent)]
    OAuth(#[from] OAuthError),

    /// Bad request error
    #[error("Bad request: {0}")]
    BadRequest(String),
}

/// JSON error body
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// Machine readable error code
    pub error: &'static str,
    /// Human readable message
    pub message: String,
}

impl ServiceError {
    /// Error code for API responses
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::OAuth(e) => match e {
                OAuthError::UnknownProvider(_) => "unknown_provider",
                OAuthError::ProviderNotConfigured(_) => "provider_not_configured",
                OAuthError::InvalidOptions(_) => "invalid_options",
                OAuthError::InvalidState => "invalid_state",
                OAuthError::CorrelationFailed => "correlation_failed",
                OAuthError::MissingCode => "missing_code",
                OAuthError::RemoteFailure { .. } => "remote_failure",
                OAuthError::TokenExchangeFailed(_) => "token_exchange_failed",
                OAuthError::UserInfoFailed(_) => "user_info_failed",
                OAuthError::ProviderError { .. } => "provider_error",
                OAuthError::UnsupportedAlgorithm(_) => "unsupported_algorithm",
                OAuthError::TicketRejected(_) => "ticket_rejected",
                OAuthError::Generic(_) => "oauth_error",
            },
            Self::BadRequest(_) => "bad_request",
        }
    }

    /// HTTP status code for this error
    #[must_use]
    pub const fn status_code(&self) -> StatusCode {
        match self {
            Self::OAuth(e) => match e {
                OAuthError::UnknownProvider(_) | OAuthError::ProviderNotConfigured(_) => {
                    StatusCode::NOT_FOUND
                }
                OAuthError::InvalidState
                | OAuthError::MissingCode
                | OAuthError::RemoteFailure { .. } => StatusCode::BAD_REQUEST,
                OAuthError::CorrelationFailed | OAuthError::TicketRejected(_) => {
                    StatusCode::FORBIDDEN
                }
                OAuthError::TokenExchangeFailed(_)
                | OAuthError::UserInfoFailed(_)
                | OAuthError::ProviderError { .. } => StatusCode::BAD_GATEWAY,
                OAuthError::InvalidOptions(_)
                | OAuthError::UnsupportedAlgorithm(_)
                | OAuthError::Generic(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
        }
    }
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let message = if status.is_server_error() {
            tracing::error!(error = %self, status = %status, "sign-in failed");
            match status {
                StatusCode::BAD_GATEWAY => "The identity provider request failed".to_string(),
                _ => "An internal error occurred".to_string(),
            }
        } else {
            tracing::warn!(error = %self, status = %status, "sign-in rejected");
            self.to_string()
        };

        let body = ErrorResponse {
            error: self.error_code(),
            message,
        };
        (status, Json(body)).into_response()
    }
}
