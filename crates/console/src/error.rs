//! Unified error handling for the console.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use insurance_console_core::UserId;
use thiserror::Error;

use crate::api::ApiError;
use crate::session::Navigation;

/// Application-level error type for console handlers.
#[derive(Debug, Error)]
pub enum AppError {
    /// Backend call failed. The user has already been notified.
    #[error("API error: {0}")]
    Api(#[from] ApiError),

    /// Template rendering failed.
    #[error("Template error: {0}")]
    Template(#[from] askama::Error),

    /// Session storage failed.
    #[error("Session error: {0}")]
    Session(#[from] tower_sessions::session::Error),

    /// Same action already running for this user.
    #[error("This action is already in progress")]
    Duplicate,

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Bad request from client.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        if let Self::Api(ApiError::Unauthorized) = self {
            return Redirect::to(Navigation::Login.path()).into_response();
        }

        if matches!(
            self,
            Self::Template(_) | Self::Session(_) | Self::Internal(_)
        ) {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Console request error"
            );
        }

        let status = match &self {
            Self::Template(_) | Self::Session(_) | Self::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            Self::Api(ApiError::NotFound) | Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Api(ApiError::Forbidden) => StatusCode::FORBIDDEN,
            Self::Api(_) => StatusCode::BAD_GATEWAY,
            Self::Duplicate => StatusCode::CONFLICT,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
        };

        // Don't expose internal error details to clients
        let message = match &self {
            Self::Template(_) | Self::Session(_) | Self::Internal(_) => {
                "Internal server error".to_string()
            }
            Self::Api(e) => e.notice_message(),
            _ => self.to_string(),
        };

        (status, message).into_response()
    }
}

/// Set the Sentry user context for the signed-in console user.
pub fn set_sentry_user(user_id: UserId, login: &str) {
    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            id: Some(user_id.to_string()),
            username: Some(login.to_string()),
            ..Default::default()
        }));
    });
}
