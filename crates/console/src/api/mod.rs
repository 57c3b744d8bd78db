//! Backend API gateway and domain resource clients.
//!
//! [`ApiClient`] owns the pooled HTTP transport and is shared by the whole
//! process. A [`Gateway`] binds it to one browser session: it attaches that
//! session's bearer credential to every request and reports every failure to
//! the registered [`ErrorObserver`]s exactly once before returning it.
//!
//! Resource clients ([`AuthApi`], [`CustomersApi`], [`PoliciesApi`],
//! [`ClaimsApi`]) borrow a gateway and translate typed operations into
//! gateway calls.

mod auth;
mod claims;
mod customers;
mod error;
mod policies;

use std::sync::Arc;

use reqwest::Method;
use reqwest::multipart::Form;
use secrecy::ExposeSecret;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::instrument;

pub use auth::{AuthApi, LoginResponse, Registration};
pub use claims::ClaimsApi;
pub use customers::CustomersApi;
pub use error::{ApiError, ErrorObserver, GENERIC_FAILURE, classify};
pub use policies::{PoliciesApi, PolicyClaimsApi};

use crate::config::ApiConfig;
use crate::credential::CredentialStore;

/// Process-wide HTTP transport to the API gateway.
#[derive(Clone)]
pub struct ApiClient {
    inner: Arc<ApiClientInner>,
}

struct ApiClientInner {
    http: reqwest::Client,
    base_url: String,
    auth_path: String,
}

impl ApiClient {
    /// Build the pooled transport.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying HTTP client cannot be created.
    pub fn new(config: &ApiConfig) -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder()
            .connect_timeout(config.connect_timeout)
            .user_agent(concat!("insurance-console/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            inner: Arc::new(ApiClientInner {
                http,
                base_url: config.base_url.clone(),
                auth_path: config.auth_path.clone(),
            }),
        })
    }

    /// Base URL requests are resolved against.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.inner.base_url
    }

    /// Gateway prefix of the auth service.
    #[must_use]
    pub fn auth_path(&self) -> &str {
        &self.inner.auth_path
    }

    /// Bind the transport to one credential slot.
    #[must_use]
    pub fn gateway(&self, credential: Arc<dyn CredentialStore>) -> Gateway {
        Gateway {
            client: self.clone(),
            credential,
            observers: Vec::new(),
        }
    }
}

impl std::fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient")
            .field("base_url", &self.inner.base_url)
            .field("auth_path", &self.inner.auth_path)
            .finish_non_exhaustive()
    }
}

/// Request body accepted by [`Gateway::request`].
#[derive(Debug)]
pub enum Payload {
    Json(serde_json::Value),
    Multipart(Form),
}

/// Session-bound view of the backend.
#[derive(Clone)]
pub struct Gateway {
    client: ApiClient,
    credential: Arc<dyn CredentialStore>,
    observers: Vec<Arc<dyn ErrorObserver>>,
}

impl Gateway {
    /// Register an observer for every error this gateway produces.
    #[must_use]
    pub fn observe(mut self, observer: Arc<dyn ErrorObserver>) -> Self {
        self.observers.push(observer);
        self
    }

    #[must_use]
    pub const fn credential(&self) -> &Arc<dyn CredentialStore> {
        &self.credential
    }

    #[must_use]
    pub fn auth(&self) -> AuthApi<'_> {
        AuthApi::new(self)
    }

    #[must_use]
    pub fn customers(&self) -> CustomersApi<'_> {
        CustomersApi::new(self)
    }

    #[must_use]
    pub fn policies(&self) -> PoliciesApi<'_> {
        PoliciesApi::new(self)
    }

    #[must_use]
    pub fn claims(&self) -> ClaimsApi<'_> {
        ClaimsApi::new(self)
    }

    pub(crate) fn auth_path(&self, suffix: &str) -> String {
        format!("{}{suffix}", self.client.auth_path())
    }

    // =========================================================================
    // Typed helpers
    // =========================================================================

    /// # Errors
    ///
    /// See [`Gateway::request`].
    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        self.request(Method::GET, path, None, &[]).await
    }

    /// # Errors
    ///
    /// See [`Gateway::request`].
    pub async fn get_with_query<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, &str)],
    ) -> Result<T, ApiError> {
        self.request(Method::GET, path, None, query).await
    }

    /// # Errors
    ///
    /// See [`Gateway::request`].
    pub async fn post<B, T>(&self, path: &str, body: &B) -> Result<T, ApiError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let payload = self.json_payload(body)?;
        self.request(Method::POST, path, Some(payload), &[]).await
    }

    /// # Errors
    ///
    /// See [`Gateway::request`].
    pub async fn put<B, T>(&self, path: &str, body: &B) -> Result<T, ApiError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let payload = self.json_payload(body)?;
        self.request(Method::PUT, path, Some(payload), &[]).await
    }

    /// # Errors
    ///
    /// See [`Gateway::request`].
    pub async fn patch<B, T>(&self, path: &str, body: &B) -> Result<T, ApiError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let payload = self.json_payload(body)?;
        self.request(Method::PATCH, path, Some(payload), &[]).await
    }

    /// DELETE whose response body is ignored.
    ///
    /// # Errors
    ///
    /// See [`Gateway::request`].
    pub async fn delete(&self, path: &str) -> Result<(), ApiError> {
        self.dispatch(Method::DELETE, path, None, &[])
            .await
            .map(|_| ())
    }

    /// POST whose 2xx body is handed back undecoded.
    ///
    /// # Errors
    ///
    /// See [`Gateway::request`].
    pub async fn post_raw<B>(&self, path: &str, body: &B) -> Result<Vec<u8>, ApiError>
    where
        B: Serialize + ?Sized,
    {
        let payload = self.json_payload(body)?;
        self.dispatch(Method::POST, path, Some(payload), &[]).await
    }

    /// # Errors
    ///
    /// See [`Gateway::request`].
    pub async fn post_multipart<T: DeserializeOwned>(
        &self,
        path: &str,
        form: Form,
    ) -> Result<T, ApiError> {
        self.request(Method::POST, path, Some(Payload::Multipart(form)), &[])
            .await
    }

    // =========================================================================
    // Core
    // =========================================================================

    /// Send one request and decode its 2xx body.
    ///
    /// The stored credential, when present, is attached as a bearer token.
    ///
    /// # Errors
    ///
    /// Returns the classified [`ApiError`]. Observers have already seen it.
    pub async fn request<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        payload: Option<Payload>,
        query: &[(&str, &str)],
    ) -> Result<T, ApiError> {
        let body = self.dispatch(method, path, payload, query).await?;
        serde_json::from_slice(&body).map_err(|e| {
            tracing::warn!(path = %path, error = %e, "Undecodable response body");
            self.fail(ApiError::Malformed(e.to_string()))
        })
    }

    #[instrument(skip(self, payload, query), fields(method = %method, path = %path))]
    async fn dispatch(
        &self,
        method: Method,
        path: &str,
        payload: Option<Payload>,
        query: &[(&str, &str)],
    ) -> Result<Vec<u8>, ApiError> {
        let url = format!("{}{path}", self.client.base_url());
        let mut builder = self.client.inner.http.request(method, url);

        if !query.is_empty() {
            builder = builder.query(query);
        }
        if let Some(token) = self.credential.load() {
            builder = builder.bearer_auth(token.expose_secret());
        }
        builder = match payload {
            Some(Payload::Json(value)) => builder.json(&value),
            Some(Payload::Multipart(form)) => builder.multipart(form),
            None => builder,
        };

        let response = builder.send().await.map_err(|e| {
            tracing::warn!(error = %e, "Backend request failed without a response");
            self.fail(error::from_transport(&e))
        })?;

        let status = response.status();
        let body = response.bytes().await.map_err(|e| {
            tracing::warn!(error = %e, "Failed to read response body");
            self.fail(ApiError::NetworkUnavailable)
        })?;

        if status.is_success() {
            tracing::debug!(status = status.as_u16(), "Backend request succeeded");
            Ok(body.to_vec())
        } else {
            let err = classify(status, &body);
            tracing::warn!(status = status.as_u16(), error = %err, "Backend returned an error");
            Err(self.fail(err))
        }
    }

    fn json_payload<B: Serialize + ?Sized>(&self, body: &B) -> Result<Payload, ApiError> {
        serde_json::to_value(body).map(Payload::Json).map_err(|e| {
            tracing::error!(error = %e, "Failed to serialize request body");
            self.fail(ApiError::Unknown(
                "The request could not be prepared.".to_string(),
            ))
        })
    }

    fn fail(&self, err: ApiError) -> ApiError {
        for observer in &self.observers {
            observer.on_error(&err);
        }
        err
    }
}

impl std::fmt::Debug for Gateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Gateway")
            .field("client", &self.client)
            .field("authenticated", &self.credential.is_present())
            .field("observers", &self.observers.len())
            .finish()
    }
}
