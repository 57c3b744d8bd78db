//! Route guard extractors.
//!
//! ```rust,ignore
//! async fn handler(RequireAdmin(user): RequireAdmin) -> impl IntoResponse {
//!     format!("Hello, {}!", user.login)
//! }
//! ```

use askama::Template;
use axum::{
    extract::FromRequestParts,
    http::{StatusCode, request::Parts},
    response::{Html, IntoResponse, Redirect, Response},
};
use insurance_console_core::User;

use super::context::Console;
use crate::guard::{AdminOnly, GuardOutcome, RouteGuard, SignedIn};
use crate::session::Navigation;

/// Any signed-in user.
pub struct RequireAuth(pub User);

/// Signed-in administrators only.
pub struct RequireAdmin(pub User);

/// Shown while the session is still being determined.
#[derive(Template)]
#[template(path = "loading.html")]
pub struct LoadingTemplate {
    pub path: String,
}

pub enum GuardRejection {
    Loading { path: String },
    Redirect(Navigation),
    MissingContext,
}

impl IntoResponse for GuardRejection {
    fn into_response(self) -> Response {
        match self {
            Self::Loading { path } => {
                let page = LoadingTemplate { path };
                match page.render() {
                    Ok(html) => Html(html).into_response(),
                    Err(e) => {
                        tracing::error!(error = %e, "Failed to render loading page");
                        StatusCode::SERVICE_UNAVAILABLE.into_response()
                    }
                }
            }
            Self::Redirect(navigation) => Redirect::to(navigation.path()).into_response(),
            Self::MissingContext => {
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error").into_response()
            }
        }
    }
}

fn guard(parts: &Parts, guard: &impl RouteGuard) -> Result<User, GuardRejection> {
    let console = parts
        .extensions
        .get::<Console>()
        .ok_or(GuardRejection::MissingContext)?;
    let state = console.session().state();

    match guard.decide(&state) {
        GuardOutcome::Render => state
            .user()
            .cloned()
            .ok_or(GuardRejection::Redirect(Navigation::Login)),
        GuardOutcome::Loading => Err(GuardRejection::Loading {
            path: parts.uri.path().to_string(),
        }),
        GuardOutcome::Redirect(navigation) => Err(GuardRejection::Redirect(navigation)),
    }
}

impl<S> FromRequestParts<S> for RequireAuth
where
    S: Send + Sync,
{
    type Rejection = GuardRejection;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        guard(parts, &SignedIn).map(Self)
    }
}

impl<S> FromRequestParts<S> for RequireAdmin
where
    S: Send + Sync,
{
    type Rejection = GuardRejection;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        guard(parts, &AdminOnly).map(Self)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use axum::http::header;
    use http_body_util::BodyExt;

    use super::*;

    #[tokio::test]
    async fn test_loading_rejection_refreshes_same_path() {
        let response = GuardRejection::Loading {
            path: "/admin".to_string(),
        }
        .into_response();
        assert_eq!(response.status(), StatusCode::OK);

        let body = response.into_body().collect().await.unwrap().to_bytes();
        let html = String::from_utf8(body.to_vec()).unwrap();
        assert!(html.contains("url=/admin"));
    }

    #[test]
    fn test_redirect_rejection() {
        let response = GuardRejection::Redirect(Navigation::Home).into_response();
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(response.headers()[header::LOCATION], "/");
    }
}
