//! HTTP route handlers for the console.
//!
//! # Route Structure
//!
//! ```text
//! GET  /health                     - Health check (no session)
//!
//! # Auth (public)
//! GET  /login                      - Login page
//! POST /login                      - Sign in
//! GET  /register                   - Registration page
//! POST /register                   - Create account
//! POST /logout                     - Sign out
//!
//! # Signed-in users
//! GET  /                           - Dashboard
//! GET  /profile                    - Current account
//! GET  /customers                  - Customer list (?q=)
//! GET  /customers/add              - New customer form
//! POST /customers                  - Create customer
//! GET  /customers/{id}             - Customer detail with policies
//! GET  /customers/{id}/edit        - Edit form
//! POST /customers/{id}             - Update customer
//! GET  /customers/{id}/delete      - Confirm deletion
//! POST /customers/{id}/delete      - Delete customer
//! GET  /policies                   - Policy list (?q=&type=)
//! GET  /policies/add               - New policy form (?customer=)
//! POST /policies                   - Create policy
//! GET  /policies/{id}              - Policy detail with claims
//! GET  /policies/{id}/delete       - Confirm deletion
//! POST /policies/{id}/delete       - Delete policy
//! GET  /claims                     - Claim list (?q=&status=)
//! GET  /claims/add                 - New claim form (?policy=)
//! POST /claims                     - File claim
//! GET  /claims/{id}                - Claim detail with documents
//! POST /claims/{id}/process        - Settle claim
//! POST /claims/{id}/documents      - Upload document
//! GET  /claims/{id}/delete         - Confirm deletion
//! POST /claims/{id}/delete         - Delete claim
//!
//! # Administrators
//! GET  /admin                      - Admin dashboard
//! POST /admin/users/{id}/active    - Activate or deactivate a user
//! POST /admin/users/{id}/role      - Change a user's role
//! ```

pub mod admin;
pub mod auth;
pub mod claims;
pub mod customers;
pub mod dashboard;
pub mod policies;
pub mod profile;

use askama::Template;
use axum::{
    Router,
    extract::DefaultBodyLimit,
    http::{StatusCode, Uri},
    middleware::from_fn_with_state,
    response::{Html, IntoResponse, Response},
    routing::{get, post},
};
use insurance_console_core::{Role, User};
use tower_http::services::ServeDir;
use tower_sessions::Session;

use crate::error::AppError;
use crate::middleware::{Console, console_context, create_session_layer};
use crate::notify::Notice;
use crate::state::AppState;

/// Largest accepted request body (claim documents).
const MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

/// Signed-in user as shown in the page chrome.
#[derive(Debug, Clone)]
pub struct UserView {
    pub login: String,
    pub email: String,
    pub role: String,
    pub is_admin: bool,
}

impl From<&User> for UserView {
    fn from(user: &User) -> Self {
        Self {
            login: user.login.clone(),
            email: user.email.clone().unwrap_or_default(),
            role: match user.role {
                Role::Admin => "Administrator".to_string(),
                Role::Client => "Staff".to_string(),
            },
            is_admin: user.is_admin(),
        }
    }
}

/// Data every page layout needs.
#[derive(Debug, Clone)]
pub struct Layout {
    pub user: Option<UserView>,
    pub current_path: String,
    pub notices: Vec<Notice>,
}

impl Layout {
    pub async fn new(console: &Console, session: &Session, current_path: &str) -> Self {
        Self {
            user: console.user().as_ref().map(UserView::from),
            current_path: current_path.to_string(),
            notices: console.take_notices(session).await,
        }
    }

    /// Whether the navigation entry for `section` is the current one.
    #[must_use]
    pub fn is_active(&self, section: &str) -> bool {
        if section == "/" {
            self.current_path == "/"
        } else {
            self.current_path.starts_with(section)
        }
    }
}

/// Destructive-action confirmation page.
#[derive(Template)]
#[template(path = "confirm.html")]
pub struct ConfirmTemplate {
    pub layout: Layout,
    pub title: String,
    pub message: String,
    pub action: String,
    pub cancel_href: String,
}

/// Form body of a confirmation page.
#[derive(Debug, serde::Deserialize)]
pub struct ConfirmForm {
    #[serde(default)]
    pub confirm: String,
}

impl ConfirmForm {
    #[must_use]
    pub fn confirmed(&self) -> bool {
        self.confirm == "yes"
    }
}

#[derive(Template)]
#[template(path = "not_found.html")]
struct NotFoundTemplate {
    layout: Layout,
}

/// Render a template into an HTML response.
///
/// # Errors
///
/// Returns `AppError::Template` if rendering fails.
pub fn render(template: &impl Template) -> Result<Html<String>, AppError> {
    Ok(Html(template.render()?))
}

/// Routes that run inside the console context.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(dashboard::dashboard))
        .route("/login", get(auth::login_page).post(auth::login))
        .route("/register", get(auth::register_page).post(auth::register))
        .route("/logout", post(auth::logout))
        .route("/profile", get(profile::profile))
        .route("/customers", get(customers::index).post(customers::create))
        .route("/customers/add", get(customers::new_form))
        .route("/customers/{id}", get(customers::show).post(customers::update))
        .route("/customers/{id}/edit", get(customers::edit_form))
        .route(
            "/customers/{id}/delete",
            get(customers::confirm_delete).post(customers::delete),
        )
        .route("/policies", get(policies::index).post(policies::create))
        .route("/policies/add", get(policies::new_form))
        .route("/policies/{id}", get(policies::show))
        .route(
            "/policies/{id}/delete",
            get(policies::confirm_delete).post(policies::delete),
        )
        .route("/claims", get(claims::index).post(claims::create))
        .route("/claims/add", get(claims::new_form))
        .route("/claims/{id}", get(claims::show))
        .route("/claims/{id}/process", post(claims::process))
        .route("/claims/{id}/documents", post(claims::upload_document))
        .route(
            "/claims/{id}/delete",
            get(claims::confirm_delete).post(claims::delete),
        )
        .route("/admin", get(admin::index))
        .route("/admin/users/{id}/active", post(admin::set_active))
        .route("/admin/users/{id}/role", post(admin::set_role))
        .fallback(not_found)
}

/// The complete console application, without outer tracing/Sentry layers.
pub fn app(state: AppState) -> Router {
    let session_layer = create_session_layer(state.config());

    routes()
        .layer(from_fn_with_state(state.clone(), console_context))
        .layer(session_layer)
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .route("/health", get(health))
        .nest_service(
            "/static",
            ServeDir::new(concat!(env!("CARGO_MANIFEST_DIR"), "/static")),
        )
        .with_state(state)
}

/// Liveness health check endpoint. Does not check the backend.
async fn health() -> &'static str {
    "ok"
}

async fn not_found(console: Console, session: Session, uri: Uri) -> Response {
    let page = NotFoundTemplate {
        layout: Layout::new(&console, &session, uri.path()).await,
    };
    match render(&page) {
        Ok(html) => (StatusCode::NOT_FOUND, html).into_response(),
        Err(e) => e.into_response(),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
pub(crate) mod testing {
    //! Console router wired to a stub backend.

    use axum::Router;
    use axum::body::Body;
    use axum::http::{Request, Response, header};
    use http_body_util::BodyExt;

    use crate::api::testing::{client, serve};
    use crate::config::{ApiConfig, ConsoleConfig, SentryConfig};
    use crate::state::AppState;

    pub async fn console(backend: Router) -> Router {
        let base = serve(backend).await;
        let api = client(&base);
        let config = ConsoleConfig {
            host: [127, 0, 0, 1].into(),
            port: 0,
            base_url: "http://127.0.0.1".to_string(),
            api: ApiConfig {
                base_url: base,
                auth_path: "/auth-service".to_string(),
                connect_timeout: std::time::Duration::from_secs(2),
            },
            log_json: false,
            sentry: SentryConfig {
                dsn: None,
                environment: None,
                sample_rate: 1.0,
                traces_sample_rate: 0.0,
            },
        };
        super::app(AppState::new(config, api))
    }

    /// Session cookie (`name=value`) set by a response, if any.
    pub fn session_cookie<B>(response: &Response<B>) -> Option<String> {
        response
            .headers()
            .get(header::SET_COOKIE)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.split(';').next())
            .map(String::from)
    }

    pub fn get(path: &str, cookie: Option<&str>) -> Request<Body> {
        let mut builder = Request::builder().uri(path);
        if let Some(cookie) = cookie {
            builder = builder.header(header::COOKIE, cookie);
        }
        builder.body(Body::empty()).unwrap()
    }

    pub fn post_form(path: &str, form: &str, cookie: Option<&str>) -> Request<Body> {
        let mut builder = Request::builder()
            .method("POST")
            .uri(path)
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded");
        if let Some(cookie) = cookie {
            builder = builder.header(header::COOKIE, cookie);
        }
        builder.body(Body::from(form.to_string())).unwrap()
    }

    pub async fn body_text(response: Response<Body>) -> String {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        String::from_utf8(bytes.to_vec()).unwrap()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use axum::http::{StatusCode, header};
    use axum::routing::{get, post};
    use axum::{Json, Router};
    use serde_json::{Value, json};
    use tower::ServiceExt;

    use super::testing::{body_text, console, get as get_req, post_form, session_cookie};

    fn backend() -> Router {
        let user = json!({"id": 7, "login": "jdoe", "active": true, "role": "CLIENT"});
        let me = user.clone();
        Router::new()
            .route(
                "/auth-service/login",
                post(move || {
                    let user = user.clone();
                    async move { Json(json!({"token": "tok-7", "user": user})) }
                }),
            )
            .route(
                "/auth-service/me",
                get(move |headers: axum::http::HeaderMap| {
                    let me = me.clone();
                    async move {
                        let authorized = headers
                            .get(header::AUTHORIZATION)
                            .is_some_and(|v| v == "Bearer tok-7");
                        if authorized {
                            Ok(Json(me))
                        } else {
                            Err(StatusCode::UNAUTHORIZED)
                        }
                    }
                }),
            )
            .route("/customers", get(|| async { Json(Value::Array(vec![])) }))
            .route("/policies", get(|| async { Json(Value::Array(vec![])) }))
            .route("/claims", get(|| async { Json(Value::Array(vec![])) }))
    }

    #[tokio::test]
    async fn test_health() {
        let app = console(backend()).await;
        let response = app.oneshot(get_req("/health", None)).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_text(response).await, "ok");
    }

    #[tokio::test]
    async fn test_anonymous_dashboard_redirects_to_login() {
        let app = console(backend()).await;
        let response = app.oneshot(get_req("/", None)).await.unwrap();
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(response.headers()[header::LOCATION], "/login");
    }

    #[tokio::test]
    async fn test_unknown_path_renders_not_found() {
        let app = console(backend()).await;
        let response = app.oneshot(get_req("/nowhere", None)).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_login_cookie_opens_dashboard() {
        let app = console(backend()).await;

        let response = app
            .clone()
            .oneshot(post_form("/login", "login=jdoe&password=hunter22", None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(response.headers()[header::LOCATION], "/");
        let cookie = session_cookie(&response).unwrap();

        let response = app.oneshot(get_req("/", Some(&cookie))).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_text(response).await;
        assert!(body.contains("jdoe"));
        assert!(body.contains("Login successful"));
    }
}
