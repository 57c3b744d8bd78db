//! Per-request console context.
//!
//! Every page load starts the console afresh: the bearer token is read from
//! the browser session, the session state machine resolves it against the
//! auth service, and the handler receives a ready [`Console`]. Afterwards any
//! credential change is written back, a session lost mid-request turns the
//! response into a redirect to login, and undelivered notices are flashed.

use std::sync::Arc;

use axum::{
    extract::{FromRequestParts, Request, State},
    http::request::Parts,
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use insurance_console_core::User;
use tower_sessions::Session;

use super::flash;
use crate::api::Gateway;
use crate::credential::{MemoryCredentialStore, TOKEN_KEY};
use crate::error::{AppError, set_sentry_user};
use crate::notify::{Notice, Notices};
use crate::session::SessionStore;
use crate::state::AppState;

/// Pages that stay reachable after the session is lost.
const PUBLIC_PATHS: [&str; 2] = ["/login", "/register"];

/// What a handler needs to talk to the backend on behalf of the user.
#[derive(Clone)]
pub struct Console {
    inner: Arc<ConsoleInner>,
}

struct ConsoleInner {
    session: Arc<SessionStore>,
    gateway: Gateway,
    notices: Notices,
}

impl Console {
    #[must_use]
    pub fn session(&self) -> &SessionStore {
        &self.inner.session
    }

    #[must_use]
    pub fn gateway(&self) -> &Gateway {
        &self.inner.gateway
    }

    #[must_use]
    pub fn notices(&self) -> &Notices {
        &self.inner.notices
    }

    #[must_use]
    pub fn user(&self) -> Option<User> {
        self.inner.session.current_user()
    }

    /// Flashed notices from earlier requests followed by this request's.
    pub async fn take_notices(&self, session: &Session) -> Vec<Notice> {
        let mut notices = flash::take(session).await;
        notices.extend(self.inner.notices.drain());
        notices
    }
}

impl<S> FromRequestParts<S> for Console
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Self>()
            .cloned()
            .ok_or_else(|| AppError::Internal("console context missing".to_string()))
    }
}

/// Build the console context for this request and settle it afterwards.
pub async fn console_context(
    State(state): State<AppState>,
    session: Session,
    mut request: Request,
    next: Next,
) -> Response {
    let token = session.get::<String>(TOKEN_KEY).await.unwrap_or_else(|e| {
        tracing::warn!(error = %e, "Failed to read session token");
        None
    });
    let before = token.clone();

    let credential = Arc::new(MemoryCredentialStore::with_token(token));
    let notices = Notices::new();
    let store = Arc::new(SessionStore::new(credential.clone(), notices.clone()));
    let gateway = state
        .api()
        .gateway(credential.clone())
        .observe(store.clone())
        .observe(Arc::new(notices.clone()));

    store.resolve(&gateway.auth()).await;
    if let Some(user) = store.current_user() {
        set_sentry_user(user.id, &user.login);
    }

    let path = request.uri().path().to_owned();
    request.extensions_mut().insert(Console {
        inner: Arc::new(ConsoleInner {
            session: store.clone(),
            gateway,
            notices: notices.clone(),
        }),
    });

    let mut response = next.run(request).await;

    let after = credential.snapshot();
    if after != before {
        persist_token(&session, after).await;
    }

    if let Some(navigation) = store.take_forced_redirect()
        && !PUBLIC_PATHS.contains(&path.as_str())
    {
        tracing::info!(path = %path, "Session lost during request, redirecting");
        response = Redirect::to(navigation.path()).into_response();
    }

    flash::push(&session, notices.drain()).await;
    response
}

async fn persist_token(session: &Session, token: Option<String>) {
    let result = match token {
        Some(token) => {
            // New credential, new session id.
            if let Err(e) = session.cycle_id().await {
                tracing::warn!(error = %e, "Failed to cycle session id");
            }
            session.insert(TOKEN_KEY, token).await
        }
        None => session.remove::<String>(TOKEN_KEY).await.map(|_| ()),
    };
    if let Err(e) = result {
        tracing::error!(error = %e, "Failed to persist session token");
    }
}
