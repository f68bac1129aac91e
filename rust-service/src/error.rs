//! Errors at the HTTP boundary.
//!
//! Every variant maps to one status code. Clients only ever see a generic
//! message; the detail is logged server side when the response is built.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;
use tracing::{error, warn};

use crate::oauth::OAuthError;

#[derive(Debug, Error)]
pub enum AppError {
    /// Missing, undecodable or mismatched signature
    #[error("unauthorized")]
    Unauthorized,

    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("malformed payload: {0}")]
    MalformedPayload(String),

    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("upstream error: {0}")]
    Upstream(String),

    #[error("internal error: {0}")]
    Internal(String),
}

/// Body returned with every error status.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub error: String,
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Unauthorized => StatusCode::UNAUTHORIZED,
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Upstream(_) => StatusCode::BAD_GATEWAY,
            AppError::Configuration(_) | AppError::MalformedPayload(_) | AppError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// The message a client is allowed to see.
    fn public_message(&self) -> String {
        match self {
            AppError::Unauthorized => "Unauthorized".to_string(),
            AppError::BadRequest(detail) => detail.clone(),
            AppError::Upstream(_) => "Upstream service error".to_string(),
            AppError::Configuration(_) | AppError::MalformedPayload(_) | AppError::Internal(_) => {
                "Internal server error".to_string()
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!(status = status.as_u16(), error = %self, "request_failed");
        } else {
            warn!(status = status.as_u16(), error = %self, "request_rejected");
        }

        let body = ErrorResponse {
            success: false,
            error: self.public_message(),
        };
        (status, Json(body)).into_response()
    }
}

impl From<OAuthError> for AppError {
    fn from(err: OAuthError) -> Self {
        match err {
            OAuthError::InvalidShop(_) | OAuthError::MissingParameter(_) => {
                AppError::BadRequest(err.to_string())
            }
            OAuthError::InvalidHmac | OAuthError::InvalidState => AppError::Unauthorized,
            OAuthError::NotConfigured(_) => AppError::Configuration(err.to_string()),
            OAuthError::TokenExchange(_) | OAuthError::Registration { .. } => {
                AppError::Upstream(err.to_string())
            }
            OAuthError::Url(_) => AppError::Internal(err.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(AppError::Unauthorized.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            AppError::Configuration("x".into()).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            AppError::MalformedPayload("x".into()).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(AppError::BadRequest("x".into()).status(), StatusCode::BAD_REQUEST);
        assert_eq!(AppError::Upstream("x".into()).status(), StatusCode::BAD_GATEWAY);
    }

    #[test]
    fn test_server_errors_hide_detail() {
        let err = AppError::Configuration("SHOPIFY_WEBHOOK_SECRET unset".into());
        assert_eq!(err.public_message(), "Internal server error");

        let err = AppError::MalformedPayload("expected value at line 1".into());
        assert_eq!(err.public_message(), "Internal server error");
    }

    #[test]
    fn test_oauth_error_mapping() {
        assert_eq!(
            AppError::from(OAuthError::InvalidHmac).status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            AppError::from(OAuthError::InvalidState).status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            AppError::from(OAuthError::InvalidShop("evil.com".into())).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AppError::from(OAuthError::NotConfigured("SHOPIFY_API_KEY")).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
