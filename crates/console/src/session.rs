//! Authorization state machine for one browser session.
//!
//! ```text
//! Unresolved --resolve--> Resolving --+--> Authenticated(user)
//!                                     +--> Anonymous
//! Anonymous/Authenticated --login--> Resolving --> Authenticated | previous
//! Authenticated --logout | 401--> Anonymous
//! ```
//!
//! The store is the single source of truth: `is_authenticated` and
//! `is_admin` are always read off the current state, never kept separately.

use std::sync::Arc;

use insurance_console_core::{Email, User};
use parking_lot::{Mutex, RwLock};
use secrecy::SecretString;

use crate::api::{ApiError, AuthApi, ErrorObserver};
use crate::credential::CredentialStore;
use crate::notify::Notices;

pub const LOGIN_SUCCEEDED: &str = "Login successful";
pub const LOGIN_FAILED: &str = "Login failed. Please check your credentials.";
pub const REGISTER_SUCCEEDED: &str = "Registration successful. Please login.";
pub const REGISTER_FAILED: &str = "Registration failed. Please try again.";
pub const LOGGED_OUT: &str = "You have been logged out";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    /// Nothing known yet.
    Unresolved,
    /// Waiting on the auth service.
    Resolving,
    Authenticated(User),
    Anonymous,
}

impl SessionState {
    #[must_use]
    pub const fn user(&self) -> Option<&User> {
        match self {
            Self::Authenticated(user) => Some(user),
            _ => None,
        }
    }

    #[must_use]
    pub const fn is_authenticated(&self) -> bool {
        matches!(self, Self::Authenticated(_))
    }

    #[must_use]
    pub fn is_admin(&self) -> bool {
        self.user().is_some_and(User::is_admin)
    }

    /// Whether the state is still being determined.
    #[must_use]
    pub const fn is_pending(&self) -> bool {
        matches!(self, Self::Unresolved | Self::Resolving)
    }
}

/// Where the UI should go after a session transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Navigation {
    Home,
    Login,
}

impl Navigation {
    #[must_use]
    pub const fn path(self) -> &'static str {
        match self {
            Self::Home => "/",
            Self::Login => "/login",
        }
    }
}

pub struct SessionStore {
    state: RwLock<SessionState>,
    credential: Arc<dyn CredentialStore>,
    notices: Notices,
    forced: Mutex<Option<Navigation>>,
}

impl SessionStore {
    #[must_use]
    pub fn new(credential: Arc<dyn CredentialStore>, notices: Notices) -> Self {
        Self {
            state: RwLock::new(SessionState::Unresolved),
            credential,
            notices,
            forced: Mutex::new(None),
        }
    }

    #[must_use]
    pub fn state(&self) -> SessionState {
        self.state.read().clone()
    }

    #[must_use]
    pub fn current_user(&self) -> Option<User> {
        self.state.read().user().cloned()
    }

    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.state.read().is_authenticated()
    }

    #[must_use]
    pub fn is_admin(&self) -> bool {
        self.state.read().is_admin()
    }

    fn set(&self, next: SessionState) -> SessionState {
        std::mem::replace(&mut *self.state.write(), next)
    }

    /// Determine who is signed in from the stored credential.
    ///
    /// Without a credential no request is made. A credential the auth
    /// service does not accept is purged.
    pub async fn resolve(&self, auth: &AuthApi<'_>) {
        self.set(SessionState::Resolving);

        if !self.credential.is_present() {
            self.set(SessionState::Anonymous);
            return;
        }

        match auth.me().await {
            Ok(user) => {
                tracing::debug!(user_id = %user.id, "Session resolved");
                self.set(SessionState::Authenticated(user));
            }
            Err(e) => {
                tracing::info!(error = %e, "Stored credential rejected");
                self.credential.purge();
                self.set(SessionState::Anonymous);
            }
        }
    }

    /// Exchange credentials for a bearer token.
    ///
    /// # Errors
    ///
    /// Returns the gateway error. The prior state is kept unless the
    /// credential was purged along the way.
    pub async fn login(
        &self,
        auth: &AuthApi<'_>,
        login: &str,
        password: &SecretString,
    ) -> Result<Navigation, ApiError> {
        let previous = self.set(SessionState::Resolving);

        match auth.login(login, password).await {
            Ok(response) => {
                tracing::info!(user_id = %response.user.id, "Login succeeded");
                self.credential.store(SecretString::from(response.token));
                self.set(SessionState::Authenticated(response.user));
                self.notices.success(LOGIN_SUCCEEDED);
                Ok(Navigation::Home)
            }
            Err(e) => {
                tracing::info!(error = %e, login = %login, "Login failed");
                let restored = match previous {
                    SessionState::Authenticated(user) if self.credential.is_present() => {
                        SessionState::Authenticated(user)
                    }
                    _ => SessionState::Anonymous,
                };
                self.set(restored);
                self.notices.error(LOGIN_FAILED);
                Err(e)
            }
        }
    }

    /// Create an account. Never signs the new account in.
    ///
    /// # Errors
    ///
    /// Returns the gateway error.
    pub async fn register(
        &self,
        auth: &AuthApi<'_>,
        login: &str,
        password: &SecretString,
        email: &Email,
    ) -> Result<Navigation, ApiError> {
        match auth.register(login, password, email).await {
            Ok(registration) => {
                tracing::info!(user_id = ?registration.id, "Account registered");
                self.notices.success(REGISTER_SUCCEEDED);
                Ok(Navigation::Login)
            }
            Err(e) => {
                tracing::info!(error = %e, login = %login, "Registration failed");
                self.notices.error(REGISTER_FAILED);
                Err(e)
            }
        }
    }

    pub fn logout(&self) -> Navigation {
        self.credential.purge();
        self.set(SessionState::Anonymous);
        self.notices.info(LOGGED_OUT);
        Navigation::Login
    }

    /// Navigation demanded by a mid-request session loss, if any.
    pub fn take_forced_redirect(&self) -> Option<Navigation> {
        self.forced.lock().take()
    }
}

impl ErrorObserver for SessionStore {
    fn on_error(&self, error: &ApiError) {
        if error.is_unauthorized() {
            tracing::info!("Backend rejected credential, ending session");
            self.credential.purge();
            self.set(SessionState::Anonymous);
            *self.forced.lock() = Some(Navigation::Login);
        }
    }
}

impl std::fmt::Debug for SessionStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionStore")
            .field("state", &*self.state.read())
            .finish_non_exhaustive()
    }
}
