//! Error taxonomy of the API gateway.
//!
//! Every transport adapter normalizes into [`ApiError`]; callers never look at
//! raw response shapes.

use reqwest::StatusCode;
use thiserror::Error;

/// Fallback text for an error response without a usable `message`.
pub const GENERIC_FAILURE: &str = "Something went wrong. Please try again.";

/// Errors surfaced by the API gateway.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ApiError {
    /// No response was received (connection refused, reset, DNS, ...).
    #[error("backend unreachable")]
    NetworkUnavailable,

    /// HTTP 401: the stored credential is missing, expired or rejected.
    #[error("unauthorized")]
    Unauthorized,

    /// HTTP 403.
    #[error("forbidden")]
    Forbidden,

    /// HTTP 404.
    #[error("not found")]
    NotFound,

    /// HTTP 500.
    #[error("server error")]
    ServerError,

    /// Any other non-2xx status, or a request that could not be prepared.
    #[error("{0}")]
    Unknown(String),

    /// A 2xx body that does not decode into the expected type.
    #[error("malformed response: {0}")]
    Malformed(String),
}

impl ApiError {
    /// One-line text for the user-facing notification of this failure category.
    #[must_use]
    pub fn notice_message(&self) -> String {
        match self {
            Self::NetworkUnavailable => {
                "Unable to reach the server. Check your connection.".to_string()
            }
            Self::Unauthorized => "Your session has expired. Please sign in again.".to_string(),
            Self::Forbidden => "You do not have permission to perform this action.".to_string(),
            Self::NotFound => "The requested resource does not exist.".to_string(),
            Self::ServerError => "A server error occurred. Please try again later.".to_string(),
            Self::Unknown(message) => message.clone(),
            Self::Malformed(_) => "The server returned an unexpected response.".to_string(),
        }
    }

    #[must_use]
    pub const fn is_unauthorized(&self) -> bool {
        matches!(self, Self::Unauthorized)
    }
}

/// Classify an error response.
///
/// Pure: no logging, no notifications, no session side effects. `body` is
/// the raw response body; a JSON `message` field is used for statuses
/// outside the fixed mapping.
#[must_use]
pub fn classify(status: StatusCode, body: &[u8]) -> ApiError {
    match status {
        StatusCode::UNAUTHORIZED => ApiError::Unauthorized,
        StatusCode::FORBIDDEN => ApiError::Forbidden,
        StatusCode::NOT_FOUND => ApiError::NotFound,
        StatusCode::INTERNAL_SERVER_ERROR => ApiError::ServerError,
        _ => ApiError::Unknown(
            body_message(body).unwrap_or_else(|| GENERIC_FAILURE.to_string()),
        ),
    }
}

fn body_message(body: &[u8]) -> Option<String> {
    let value: serde_json::Value = serde_json::from_slice(body).ok()?;
    value
        .get("message")
        .and_then(serde_json::Value::as_str)
        .map(str::trim)
        .filter(|m| !m.is_empty())
        .map(ToString::to_string)
}

/// Map a `reqwest` failure that happened before any response arrived.
pub(crate) fn from_transport(err: &reqwest::Error) -> ApiError {
    if err.is_builder() {
        ApiError::Unknown("The request could not be prepared.".to_string())
    } else {
        ApiError::NetworkUnavailable
    }
}

/// Receives every error the gateway produces.
///
/// Observers run synchronously on the calling task and must not panic.
pub trait ErrorObserver: Send + Sync {
    fn on_error(&self, error: &ApiError);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixed_status_mapping() {
        assert_eq!(classify(StatusCode::UNAUTHORIZED, b""), ApiError::Unauthorized);
        assert_eq!(classify(StatusCode::FORBIDDEN, b"{}"), ApiError::Forbidden);
        assert_eq!(classify(StatusCode::NOT_FOUND, b"<html>"), ApiError::NotFound);
        assert_eq!(
            classify(StatusCode::INTERNAL_SERVER_ERROR, br#"{"message":"boom"}"#),
            ApiError::ServerError
        );
    }

    #[test]
    fn test_other_status_uses_body_message() {
        assert_eq!(
            classify(StatusCode::CONFLICT, br#"{"message":"Login already taken"}"#),
            ApiError::Unknown("Login already taken".to_string())
        );
    }

    #[test]
    fn test_other_status_falls_back_to_generic_text() {
        for body in [&b""[..], b"not json", br#"{"message":"  "}"#, br#"{"error":"x"}"#] {
            assert_eq!(
                classify(StatusCode::BAD_REQUEST, body),
                ApiError::Unknown(GENERIC_FAILURE.to_string())
            );
        }
        assert_eq!(
            classify(StatusCode::BAD_GATEWAY, b"").notice_message(),
            GENERIC_FAILURE
        );
    }

    #[test]
    fn test_unauthorized_notice_mentions_session() {
        assert!(ApiError::Unauthorized.notice_message().contains("session"));
        assert!(ApiError::Unauthorized.is_unauthorized());
        assert!(!ApiError::Forbidden.is_unauthorized());
    }
}
