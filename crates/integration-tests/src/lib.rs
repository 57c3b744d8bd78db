//! End-to-end harness for the insurance console.
//!
//! Each test starts two in-process servers on ephemeral ports: a stub of the
//! insurance API gateway ([`StubBackend`]) and the real console wired to it.
//! Tests then drive the console over HTTP with a cookie-keeping client, the
//! way a browser would.
//!
//! ```rust,ignore
//! let ctx = TestContext::start().await;
//! ctx.login("agent", "secret1").await;
//! let page = ctx.get("/customers").await;
//! ```

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::missing_panics_doc)]

use std::collections::HashMap;
use std::sync::Arc;

use axum::extract::{Multipart, Path, State};
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, patch, post};
use axum::{Json, Router};
use insurance_console::api::ApiClient;
use insurance_console::config::ConsoleConfig;
use insurance_console::routes;
use insurance_console::state::AppState;
use parking_lot::Mutex;
use serde_json::{Value, json};

pub const AGENT_PASSWORD: &str = "secret1";
pub const ADMIN_PASSWORD: &str = "admin-pass";

/// Mutable world of the stub backend.
#[derive(Debug, Default)]
pub struct World {
    pub users: Vec<Value>,
    /// login -> (password, user id)
    pub credentials: HashMap<String, (String, i64)>,
    /// bearer token -> user id
    pub tokens: HashMap<String, i64>,
    pub customers: Vec<Value>,
    pub policies: Vec<Value>,
    pub claims: Vec<Value>,
    pub documents: HashMap<i64, Vec<Value>>,
    /// Every request as "METHOD /path".
    pub requests: Vec<String>,
    /// Revoke all tokens right after the next successful `/me`.
    pub expire_after_me: bool,
    /// Answer claim deletions with 403.
    pub forbid_claim_deletes: bool,
    next_id: i64,
}

impl World {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }

    fn user(&self, id: i64) -> Option<&Value> {
        self.users.iter().find(|u| u["id"] == id)
    }

    pub fn count(&self, request: &str) -> usize {
        self.requests.iter().filter(|r| *r == request).count()
    }
}

type Shared = Arc<Mutex<World>>;

/// Stub of the insurance API gateway.
#[derive(Clone)]
pub struct StubBackend {
    pub url: String,
    pub world: Shared,
}

impl StubBackend {
    /// Seeded with an agent (`agent`, CLIENT) and an administrator (`boss`, ADMIN).
    pub async fn start() -> Self {
        let world = Arc::new(Mutex::new(World {
            next_id: 100,
            ..World::default()
        }));
        {
            let mut w = world.lock();
            w.users.push(json!({
                "id": 1, "login": "agent", "email": "agent@example.com",
                "active": true, "role": "CLIENT"
            }));
            w.users.push(json!({
                "id": 2, "login": "boss", "email": "boss@example.com",
                "active": true, "role": "ADMIN"
            }));
            w.credentials
                .insert("agent".to_string(), (AGENT_PASSWORD.to_string(), 1));
            w.credentials
                .insert("boss".to_string(), (ADMIN_PASSWORD.to_string(), 2));
        }

        let url = serve(router(world.clone())).await;
        Self { url, world }
    }

    /// Invalidate every issued token, as if they all expired.
    pub fn expire_tokens(&self) {
        self.world.lock().tokens.clear();
    }

    /// Let the next session resolve succeed, then reject the token.
    pub fn expire_tokens_after_next_resolve(&self) {
        self.world.lock().expire_after_me = true;
    }

    pub fn seed_customer(&self, nom: &str, prenom: &str, email: &str) -> i64 {
        let mut w = self.world.lock();
        let id = w.next_id();
        w.customers.push(json!({
            "id": id, "nom": nom, "prenom": prenom, "email": email,
            "adresse": "", "telephone": ""
        }));
        id
    }

    pub fn seed_policy(&self, kind: &str, customer: i64, effective: &str) -> i64 {
        let mut w = self.world.lock();
        let id = w.next_id();
        w.policies.push(json!({
            "id": id, "type": kind, "dateEffet": effective, "dateExpiration": "2030-01-01",
            "montantCouverture": 10000.0, "clientId": customer
        }));
        id
    }

    pub fn seed_claim(&self, policy: i64, date: &str, reimbursed: f64) -> i64 {
        let mut w = self.world.lock();
        let id = w.next_id();
        w.claims.push(json!({
            "id": id, "date": date, "description": "Sinistre", "montantRéclamé": 500.0,
            "montantRemboursé": reimbursed, "contratId": policy
        }));
        id
    }

    pub fn count(&self, request: &str) -> usize {
        self.world.lock().count(request)
    }
}

pub async fn serve(router: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{addr}")
}

fn record(world: &Shared, method: &str, path: &str) {
    world.lock().requests.push(format!("{method} {path}"));
}

/// The signed-in user for `headers`, or a 401 response.
fn authorize(world: &Shared, headers: &HeaderMap) -> Result<Value, Response> {
    let token = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .ok_or_else(|| StatusCode::UNAUTHORIZED.into_response())?;
    let w = world.lock();
    w.tokens
        .get(token)
        .and_then(|id| w.user(*id))
        .cloned()
        .ok_or_else(|| {
            (StatusCode::UNAUTHORIZED, Json(json!({"message": "Token expired"}))).into_response()
        })
}

fn find(list: &[Value], id: i64) -> Result<Value, Response> {
    list.iter()
        .find(|v| v["id"] == id)
        .cloned()
        .ok_or_else(|| StatusCode::NOT_FOUND.into_response())
}

#[allow(clippy::too_many_lines)]
fn router(world: Shared) -> Router {
    Router::new()
        // ---- auth service ------------------------------------------------
        .route(
            "/auth-service/login",
            post(|State(w): State<Shared>, Json(body): Json<Value>| async move {
                record(&w, "POST", "/auth-service/login");
                let mut world = w.lock();
                let login = body["login"].as_str().unwrap_or_default().to_string();
                let password = body["password"].as_str().unwrap_or_default();
                let Some((expected, id)) = world.credentials.get(&login).cloned() else {
                    return StatusCode::UNAUTHORIZED.into_response();
                };
                if expected != password {
                    return StatusCode::UNAUTHORIZED.into_response();
                }
                let serial = world.next_id();
                let token = format!("token-{login}-{serial}");
                world.tokens.insert(token.clone(), id);
                let user = world.user(id).cloned();
                Json(json!({"token": token, "user": user})).into_response()
            }),
        )
        .route(
            "/auth-service/register",
            post(|State(w): State<Shared>, Json(body): Json<Value>| async move {
                record(&w, "POST", "/auth-service/register");
                let mut world = w.lock();
                let login = body["login"].as_str().unwrap_or_default().to_string();
                if world.credentials.contains_key(&login) {
                    return (StatusCode::CONFLICT, Json(json!({"message": "Login already in use"})))
                        .into_response();
                }
                let id = world.next_id();
                let user = json!({
                    "id": id, "login": login, "email": body["email"],
                    "active": body["active"], "role": body["role"]
                });
                world.users.push(user.clone());
                world.credentials.insert(
                    login,
                    (body["password"].as_str().unwrap_or_default().to_string(), id),
                );
                (StatusCode::CREATED, Json(user)).into_response()
            }),
        )
        .route(
            "/auth-service/me",
            get(|State(w): State<Shared>, headers: HeaderMap| async move {
                record(&w, "GET", "/auth-service/me");
                let user = authorize(&w, &headers)?;
                let mut world = w.lock();
                if std::mem::take(&mut world.expire_after_me) {
                    world.tokens.clear();
                }
                Ok::<_, Response>(Json(user))
            }),
        )
        .route(
            "/auth-service/users",
            get(|State(w): State<Shared>, headers: HeaderMap| async move {
                record(&w, "GET", "/auth-service/users");
                authorize(&w, &headers)?;
                Ok::<_, Response>(Json(Value::Array(w.lock().users.clone())))
            }),
        )
        .route(
            "/auth-service/users/{id}/active",
            patch(
                |State(w): State<Shared>, headers: HeaderMap, Path(id): Path<i64>, Json(body): Json<Value>| async move {
                    record(&w, "PATCH", "/auth-service/users/active");
                    authorize(&w, &headers)?;
                    let mut world = w.lock();
                    let user = world
                        .users
                        .iter_mut()
                        .find(|u| u["id"] == id)
                        .ok_or_else(|| StatusCode::NOT_FOUND.into_response())?;
                    user["active"] = body["active"].clone();
                    Ok::<_, Response>(Json(user.clone()))
                },
            ),
        )
        .route(
            "/auth-service/users/{id}/role",
            patch(
                |State(w): State<Shared>, headers: HeaderMap, Path(id): Path<i64>, Json(body): Json<Value>| async move {
                    record(&w, "PATCH", "/auth-service/users/role");
                    authorize(&w, &headers)?;
                    let mut world = w.lock();
                    let user = world
                        .users
                        .iter_mut()
                        .find(|u| u["id"] == id)
                        .ok_or_else(|| StatusCode::NOT_FOUND.into_response())?;
                    user["role"] = body["role"].clone();
                    Ok::<_, Response>(Json(user.clone()))
                },
            ),
        )
        // ---- customers -----------------------------------------------------
        .route(
            "/customers",
            get(|State(w): State<Shared>, headers: HeaderMap| async move {
                record(&w, "GET", "/customers");
                authorize(&w, &headers)?;
                Ok::<_, Response>(Json(Value::Array(w.lock().customers.clone())))
            })
            .post(|State(w): State<Shared>, headers: HeaderMap, Json(mut body): Json<Value>| async move {
                record(&w, "POST", "/customers");
                authorize(&w, &headers)?;
                let mut world = w.lock();
                body["id"] = json!(world.next_id());
                world.customers.push(body.clone());
                Ok::<_, Response>((StatusCode::CREATED, Json(body)))
            }),
        )
        .route(
            "/customers/{id}",
            get(|State(w): State<Shared>, headers: HeaderMap, Path(id): Path<i64>| async move {
                record(&w, "GET", "/customers/{id}");
                authorize(&w, &headers)?;
                find(&w.lock().customers, id).map(Json)
            })
            .put(|State(w): State<Shared>, headers: HeaderMap, Path(id): Path<i64>, Json(mut body): Json<Value>| async move {
                record(&w, "PUT", "/customers/{id}");
                authorize(&w, &headers)?;
                let mut world = w.lock();
                let slot = world
                    .customers
                    .iter_mut()
                    .find(|c| c["id"] == id)
                    .ok_or_else(|| StatusCode::NOT_FOUND.into_response())?;
                body["id"] = json!(id);
                *slot = body.clone();
                Ok::<_, Response>(Json(body))
            })
            .delete(|State(w): State<Shared>, headers: HeaderMap, Path(id): Path<i64>| async move {
                record(&w, "DELETE", "/customers/{id}");
                authorize(&w, &headers)?;
                w.lock().customers.retain(|c| c["id"] != id);
                Ok::<_, Response>(StatusCode::NO_CONTENT)
            }),
        )
        // ---- policies ------------------------------------------------------
        .route(
            "/policies",
            get(|State(w): State<Shared>, headers: HeaderMap| async move {
                record(&w, "GET", "/policies");
                authorize(&w, &headers)?;
                Ok::<_, Response>(Json(Value::Array(w.lock().policies.clone())))
            })
            .post(|State(w): State<Shared>, headers: HeaderMap, Json(mut body): Json<Value>| async move {
                record(&w, "POST", "/policies");
                authorize(&w, &headers)?;
                let mut world = w.lock();
                body["id"] = json!(world.next_id());
                world.policies.push(body.clone());
                Ok::<_, Response>((StatusCode::CREATED, Json(body)))
            }),
        )
        .route(
            "/policies/claims",
            get(|State(w): State<Shared>, headers: HeaderMap| async move {
                record(&w, "GET", "/policies/claims");
                authorize(&w, &headers)?;
                Ok::<_, Response>(Json(Value::Array(w.lock().claims.clone())))
            }),
        )
        .route(
            "/policies/customer/{id}",
            get(|State(w): State<Shared>, headers: HeaderMap, Path(id): Path<i64>| async move {
                record(&w, "GET", "/policies/customer/{id}");
                authorize(&w, &headers)?;
                let owned: Vec<Value> = w
                    .lock()
                    .policies
                    .iter()
                    .filter(|p| p["clientId"] == id)
                    .cloned()
                    .collect();
                Ok::<_, Response>(Json(Value::Array(owned)))
            }),
        )
        .route(
            "/policies/{id}",
            get(|State(w): State<Shared>, headers: HeaderMap, Path(id): Path<i64>| async move {
                record(&w, "GET", "/policies/{id}");
                authorize(&w, &headers)?;
                find(&w.lock().policies, id).map(Json)
            })
            .delete(|State(w): State<Shared>, headers: HeaderMap, Path(id): Path<i64>| async move {
                record(&w, "DELETE", "/policies/{id}");
                authorize(&w, &headers)?;
                w.lock().policies.retain(|p| p["id"] != id);
                Ok::<_, Response>(StatusCode::NO_CONTENT)
            }),
        )
        .route(
            "/policies/{id}/claims",
            get(|State(w): State<Shared>, headers: HeaderMap, Path(id): Path<i64>| async move {
                record(&w, "GET", "/policies/{id}/claims");
                authorize(&w, &headers)?;
                let claims: Vec<Value> = w
                    .lock()
                    .claims
                    .iter()
                    .filter(|c| c["contratId"] == id)
                    .cloned()
                    .collect();
                Ok::<_, Response>(Json(Value::Array(claims)))
            }),
        )
        // ---- claims --------------------------------------------------------
        .route(
            "/claims",
            get(|State(w): State<Shared>, headers: HeaderMap| async move {
                record(&w, "GET", "/claims");
                authorize(&w, &headers)?;
                Ok::<_, Response>(Json(Value::Array(w.lock().claims.clone())))
            })
            .post(|State(w): State<Shared>, headers: HeaderMap, Json(mut body): Json<Value>| async move {
                record(&w, "POST", "/claims");
                authorize(&w, &headers)?;
                let mut world = w.lock();
                body["id"] = json!(world.next_id());
                world.claims.push(body.clone());
                Ok::<_, Response>((StatusCode::CREATED, Json(body)))
            }),
        )
        .route(
            "/claims/{id}",
            get(|State(w): State<Shared>, headers: HeaderMap, Path(id): Path<i64>| async move {
                record(&w, "GET", "/claims/{id}");
                authorize(&w, &headers)?;
                find(&w.lock().claims, id).map(Json)
            })
            .delete(|State(w): State<Shared>, headers: HeaderMap, Path(id): Path<i64>| async move {
                record(&w, "DELETE", "/claims/{id}");
                authorize(&w, &headers)?;
                let mut world = w.lock();
                if world.forbid_claim_deletes {
                    return Err(StatusCode::FORBIDDEN.into_response());
                }
                world.claims.retain(|c| c["id"] != id);
                Ok::<_, Response>(StatusCode::NO_CONTENT)
            }),
        )
        .route(
            "/claims/{id}/process",
            patch(|State(w): State<Shared>, headers: HeaderMap, Path(id): Path<i64>, Json(body): Json<Value>| async move {
                record(&w, "PATCH", "/claims/{id}/process");
                authorize(&w, &headers)?;
                let mut world = w.lock();
                let claim = world
                    .claims
                    .iter_mut()
                    .find(|c| c["id"] == id)
                    .ok_or_else(|| StatusCode::NOT_FOUND.into_response())?;
                claim["montantRemboursé"] = body["montantRemboursé"].clone();
                Ok::<_, Response>(Json(claim.clone()))
            }),
        )
        .route(
            "/claims/{id}/documents",
            get(|State(w): State<Shared>, headers: HeaderMap, Path(id): Path<i64>| async move {
                record(&w, "GET", "/claims/{id}/documents");
                authorize(&w, &headers)?;
                let documents = w.lock().documents.get(&id).cloned().unwrap_or_default();
                Ok::<_, Response>(Json(Value::Array(documents)))
            })
            .post(|State(w): State<Shared>, headers: HeaderMap, Path(id): Path<i64>, mut multipart: Multipart| async move {
                record(&w, "POST", "/claims/{id}/documents");
                authorize(&w, &headers)?;
                let mut file_name = None;
                while let Ok(Some(field)) = multipart.next_field().await {
                    if field.name() == Some("file") {
                        file_name = field.file_name().map(String::from);
                    }
                }
                let file_name =
                    file_name.ok_or_else(|| StatusCode::BAD_REQUEST.into_response())?;
                let mut world = w.lock();
                let document = json!({
                    "id": world.next_id(),
                    "fileName": file_name,
                    "url": format!("/files/{id}/{file_name}")
                });
                world.documents.entry(id).or_default().push(document.clone());
                Ok::<_, Response>(Json(document))
            }),
        )
        .with_state(world)
}

/// A console wired to a fresh stub backend, plus a browser-like client.
pub struct TestContext {
    pub backend: StubBackend,
    pub console_url: String,
    pub client: reqwest::Client,
}

impl TestContext {
    pub async fn start() -> Self {
        let backend = StubBackend::start().await;

        let api_base = backend.url.clone();
        let config = ConsoleConfig::from_lookup(|key| match key {
            "CONSOLE_API_BASE_URL" => Some(api_base.clone()),
            _ => None,
        })
        .unwrap();
        let api = ApiClient::new(&config.api).unwrap();
        let console_url = serve(routes::app(AppState::new(config, api))).await;

        let client = reqwest::Client::builder()
            .cookie_store(true)
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .unwrap();

        Self {
            backend,
            console_url,
            client,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.console_url)
    }

    pub async fn get(&self, path: &str) -> reqwest::Response {
        self.client.get(self.url(path)).send().await.unwrap()
    }

    pub async fn post(&self, path: &str, form: &[(&str, &str)]) -> reqwest::Response {
        self.client
            .post(self.url(path))
            .form(form)
            .send()
            .await
            .unwrap()
    }

    pub async fn login(&self, login: &str, password: &str) -> reqwest::Response {
        self.post("/login", &[("login", login), ("password", password)])
            .await
    }
}

/// `Location` of a redirect response.
pub fn location(response: &reqwest::Response) -> Option<String> {
    response
        .headers()
        .get(reqwest::header::LOCATION)
        .and_then(|v| v.to_str().ok())
        .map(String::from)
}
