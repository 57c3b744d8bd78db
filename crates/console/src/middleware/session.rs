//! Browser session cookie configuration.
//!
//! Sessions live in process memory; a restart signs everyone out.

use tower_sessions::{Expiry, MemoryStore, SessionManagerLayer};

use crate::config::ConsoleConfig;

/// Session cookie name.
pub const SESSION_COOKIE_NAME: &str = "insurance_console_session";

/// Idle time after which the session (and its token) is forgotten.
const SESSION_EXPIRY_SECONDS: i64 = 8 * 60 * 60;

#[must_use]
pub fn create_session_layer(config: &ConsoleConfig) -> SessionManagerLayer<MemoryStore> {
    SessionManagerLayer::new(MemoryStore::default())
        .with_name(SESSION_COOKIE_NAME)
        .with_expiry(Expiry::OnInactivity(
            tower_sessions::cookie::time::Duration::seconds(SESSION_EXPIRY_SECONDS),
        ))
        .with_secure(config.is_secure())
        .with_same_site(tower_sessions::cookie::SameSite::Lax)
        .with_http_only(true)
        .with_path("/")
}
