//! Persisted bearer credential.
//!
//! The browser session is the durable home of the token; a request works on a
//! [`MemoryCredentialStore`] seeded from it and the console middleware writes
//! any change back once the handler is done.

use parking_lot::RwLock;
use secrecy::{ExposeSecret, SecretString};

/// Session key under which the bearer token is persisted.
pub const TOKEN_KEY: &str = "token";

/// Single-slot credential storage.
pub trait CredentialStore: Send + Sync {
    /// The stored token, if any.
    fn load(&self) -> Option<SecretString>;

    /// Replace the stored token.
    fn store(&self, token: SecretString);

    /// Remove the stored token. No-op when empty.
    fn purge(&self);

    /// Whether a token is currently stored.
    fn is_present(&self) -> bool {
        self.load().is_some()
    }
}

/// In-memory credential slot.
#[derive(Default)]
pub struct MemoryCredentialStore {
    slot: RwLock<Option<SecretString>>,
}

impl MemoryCredentialStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the slot with a token read from durable storage.
    ///
    /// Blank tokens are treated as absent.
    #[must_use]
    pub fn with_token(token: Option<String>) -> Self {
        let token = token
            .filter(|t| !t.trim().is_empty())
            .map(SecretString::from);
        Self {
            slot: RwLock::new(token),
        }
    }

    /// Current token in the clear, for writing back to durable storage.
    #[must_use]
    pub fn snapshot(&self) -> Option<String> {
        self.slot
            .read()
            .as_ref()
            .map(|t| t.expose_secret().to_owned())
    }
}

impl CredentialStore for MemoryCredentialStore {
    fn load(&self) -> Option<SecretString> {
        self.slot.read().clone()
    }

    fn store(&self, token: SecretString) {
        *self.slot.write() = Some(token);
    }

    fn purge(&self) {
        self.slot.write().take();
    }
}

impl std::fmt::Debug for MemoryCredentialStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryCredentialStore")
            .field("token", &self.slot.read().as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_and_purge() {
        let store = MemoryCredentialStore::new();
        assert!(!store.is_present());

        store.store(SecretString::from("abc"));
        assert_eq!(store.snapshot().as_deref(), Some("abc"));

        store.purge();
        assert!(store.load().is_none());
        store.purge();
        assert!(store.snapshot().is_none());
    }

    #[test]
    fn test_blank_seed_is_absent() {
        assert!(!MemoryCredentialStore::with_token(Some("  ".to_string())).is_present());
        assert!(MemoryCredentialStore::with_token(Some("t".to_string())).is_present());
    }

    #[test]
    fn test_debug_redacts_token() {
        let store = MemoryCredentialStore::with_token(Some("very-secret".to_string()));
        let debug = format!("{store:?}");
        assert!(!debug.contains("very-secret"));
    }
}
