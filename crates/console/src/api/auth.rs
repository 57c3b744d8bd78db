//! Auth service client: login, registration and user administration.

use insurance_console_core::{Email, Role, User, UserId};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use super::{ApiError, Gateway};

/// Successful login: the issued bearer token and the account behind it.
#[derive(Deserialize)]
pub struct LoginResponse {
    pub token: String,
    pub user: User,
}

impl std::fmt::Debug for LoginResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoginResponse")
            .field("token", &"[REDACTED]")
            .field("user", &self.user)
            .finish()
    }
}

/// Answer to a registration.
///
/// Auth services differ in what they return here (the new account, an
/// issued token, nothing), so only the account id is read when present.
#[derive(Debug, Default, Deserialize)]
pub struct Registration {
    #[serde(default)]
    pub id: Option<UserId>,
}

#[derive(Serialize)]
struct LoginRequest<'a> {
    login: &'a str,
    password: &'a str,
}

#[derive(Serialize)]
struct RegisterRequest<'a> {
    login: &'a str,
    password: &'a str,
    email: &'a str,
    active: bool,
    role: Role,
}

#[derive(Serialize)]
struct ActiveUpdate {
    active: bool,
}

#[derive(Serialize)]
struct RoleUpdate {
    role: Role,
}

/// Client for the auth service, reached under the configured auth prefix.
#[derive(Debug, Clone, Copy)]
pub struct AuthApi<'a> {
    gateway: &'a Gateway,
}

impl<'a> AuthApi<'a> {
    pub(crate) const fn new(gateway: &'a Gateway) -> Self {
        Self { gateway }
    }

    /// # Errors
    ///
    /// Returns the gateway error; bad credentials surface as `Unauthorized`.
    #[instrument(skip(self, password), fields(login = %login))]
    pub async fn login(
        &self,
        login: &str,
        password: &SecretString,
    ) -> Result<LoginResponse, ApiError> {
        let body = LoginRequest {
            login,
            password: password.expose_secret(),
        };
        self.gateway
            .post(&self.gateway.auth_path("/login"), &body)
            .await
    }

    /// Self-service registration. New accounts are active clients.
    ///
    /// # Errors
    ///
    /// Returns the gateway error.
    #[instrument(skip(self, password), fields(login = %login))]
    pub async fn register(
        &self,
        login: &str,
        password: &SecretString,
        email: &Email,
    ) -> Result<Registration, ApiError> {
        let body = RegisterRequest {
            login,
            password: password.expose_secret(),
            email: email.as_str(),
            active: true,
            role: Role::Client,
        };
        let raw = self
            .gateway
            .post_raw(&self.gateway.auth_path("/register"), &body)
            .await?;
        Ok(serde_json::from_slice(&raw).unwrap_or_default())
    }

    /// Account owning the attached credential.
    ///
    /// # Errors
    ///
    /// Returns the gateway error.
    pub async fn me(&self) -> Result<User, ApiError> {
        self.gateway.get(&self.gateway.auth_path("/me")).await
    }

    /// # Errors
    ///
    /// Returns the gateway error.
    pub async fn users(&self) -> Result<Vec<User>, ApiError> {
        self.gateway.get(&self.gateway.auth_path("/users")).await
    }

    /// # Errors
    ///
    /// Returns the gateway error.
    #[instrument(skip(self))]
    pub async fn set_active(&self, id: UserId, active: bool) -> Result<User, ApiError> {
        self.gateway
            .patch(
                &self.gateway.auth_path(&format!("/users/{id}/active")),
                &ActiveUpdate { active },
            )
            .await
    }

    /// # Errors
    ///
    /// Returns the gateway error.
    #[instrument(skip(self))]
    pub async fn set_role(&self, id: UserId, role: Role) -> Result<User, ApiError> {
        self.gateway
            .patch(
                &self.gateway.auth_path(&format!("/users/{id}/role")),
                &RoleUpdate { role },
            )
            .await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use axum::http::StatusCode;
    use axum::routing::{get, patch, post};
    use axum::{Json, Router};
    use serde_json::{Value, json};

    use super::*;
    use crate::api::testing::gateway;

    fn user_json(id: i64, role: &str) -> Value {
        json!({"id": id, "login": "jdoe", "email": "jdoe@example.com", "active": true, "role": role})
    }

    #[tokio::test]
    async fn test_login_posts_credentials_under_auth_prefix() {
        let router = Router::new().route(
            "/auth-service/login",
            post(|Json(body): Json<Value>| async move {
                assert_eq!(body["login"], "jdoe");
                assert_eq!(body["password"], "hunter22");
                Json(json!({"token": "tok-1", "user": user_json(1, "CLIENT")}))
            }),
        );
        let (gateway, _) = gateway(router, None).await;

        let response = gateway
            .auth()
            .login("jdoe", &SecretString::from("hunter22"))
            .await
            .unwrap();
        assert_eq!(response.token, "tok-1");
        assert_eq!(response.user.role, Role::Client);
        assert!(!format!("{response:?}").contains("tok-1"));
    }

    #[tokio::test]
    async fn test_register_sends_client_defaults() {
        let router = Router::new().route(
            "/auth-service/register",
            post(|Json(body): Json<Value>| async move {
                assert_eq!(body["active"], true);
                assert_eq!(body["role"], "CLIENT");
                assert_eq!(body["email"], "new@example.com");
                (StatusCode::CREATED, Json(user_json(7, "CLIENT")))
            }),
        );
        let (gateway, _) = gateway(router, None).await;

        let registration = gateway
            .auth()
            .register(
                "newbie",
                &SecretString::from("secret1"),
                &Email::parse("new@example.com").unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(registration.id, Some(UserId::new(7)));
    }

    #[tokio::test]
    async fn test_register_accepts_any_success_body() {
        let router = Router::new().route(
            "/auth-service/register",
            post(|| async { Json(json!({"token": "issued"})) }),
        );
        let (gateway, recorder) = gateway(router, None).await;

        let registration = gateway
            .auth()
            .register(
                "newbie",
                &SecretString::from("secret1"),
                &Email::parse("new@example.com").unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(registration.id, None);
        assert!(recorder.0.lock().is_empty());
    }

    #[tokio::test]
    async fn test_me_unauthorized() {
        let router = Router::new().route(
            "/auth-service/me",
            get(|| async { StatusCode::UNAUTHORIZED }),
        );
        let (gateway, recorder) = gateway(router, Some("expired")).await;

        assert_eq!(gateway.auth().me().await.unwrap_err(), ApiError::Unauthorized);
        assert_eq!(recorder.0.lock().len(), 1);
    }

    #[tokio::test]
    async fn test_user_administration() {
        let router = Router::new()
            .route(
                "/auth-service/users/3/active",
                patch(|Json(body): Json<Value>| async move {
                    let mut user = user_json(3, "CLIENT");
                    user["active"] = body["active"].clone();
                    Json(user)
                }),
            )
            .route(
                "/auth-service/users/3/role",
                patch(|Json(body): Json<Value>| async move {
                    Json(user_json(3, body["role"].as_str().unwrap()))
                }),
            );
        let (gateway, _) = gateway(router, Some("admin")).await;

        let user = gateway.auth().set_active(UserId::new(3), false).await.unwrap();
        assert!(!user.active);
        let user = gateway.auth().set_role(UserId::new(3), Role::Admin).await.unwrap();
        assert!(user.is_admin());
    }
}
