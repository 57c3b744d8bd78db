//! Duplicate-submission protection for mutating actions.
//!
//! A second submission of the same action by the same user while the first
//! is still running is refused. The slot is released when the returned
//! guard drops, including when the request future is cancelled.

use std::collections::HashSet;
use std::sync::Arc;

use insurance_console_core::UserId;
use parking_lot::Mutex;

type Slot = (UserId, String);

#[derive(Debug, Clone, Default)]
pub struct InFlightRegistry {
    active: Arc<Mutex<HashSet<Slot>>>,
}

impl InFlightRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim the slot for `action`, or `None` if it is already taken.
    #[must_use]
    pub fn try_begin(&self, user: UserId, action: impl Into<String>) -> Option<InFlightGuard> {
        let slot = (user, action.into());
        if !self.active.lock().insert(slot.clone()) {
            tracing::debug!(user_id = %slot.0, action = %slot.1, "Duplicate submission refused");
            return None;
        }
        Some(InFlightGuard {
            active: Arc::clone(&self.active),
            slot: Some(slot),
        })
    }

    #[must_use]
    pub fn is_active(&self, user: UserId, action: &str) -> bool {
        self.active.lock().contains(&(user, action.to_string()))
    }
}

/// Holds an in-flight slot until dropped.
#[derive(Debug)]
#[must_use = "the slot is released as soon as the guard is dropped"]
pub struct InFlightGuard {
    active: Arc<Mutex<HashSet<Slot>>>,
    slot: Option<Slot>,
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        if let Some(slot) = self.slot.take() {
            self.active.lock().remove(&slot);
        }
    }
}
