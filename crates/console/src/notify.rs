//! User-facing notifications.
//!
//! Notices collected while handling a request are carried to the next
//! rendered page through the session flash.

use std::sync::Arc;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::api::{ApiError, ErrorObserver};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NoticeLevel {
    Success,
    Info,
    Error,
}

impl NoticeLevel {
    /// CSS modifier used by the layout.
    #[must_use]
    pub const fn css_class(self) -> &'static str {
        match self {
            Self::Success => "notice-success",
            Self::Info => "notice-info",
            Self::Error => "notice-error",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

impl Notice {
    #[must_use]
    pub const fn css_class(&self) -> &'static str {
        self.level.css_class()
    }
}

/// Shared, append-only queue of notices for one request.
#[derive(Debug, Clone, Default)]
pub struct Notices {
    queue: Arc<Mutex<Vec<Notice>>>,
}

impl Notices {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, level: NoticeLevel, message: impl Into<String>) {
        self.queue.lock().push(Notice {
            level,
            message: message.into(),
        });
    }

    pub fn success(&self, message: impl Into<String>) {
        self.push(NoticeLevel::Success, message);
    }

    pub fn info(&self, message: impl Into<String>) {
        self.push(NoticeLevel::Info, message);
    }

    pub fn error(&self, message: impl Into<String>) {
        self.push(NoticeLevel::Error, message);
    }

    /// Take every queued notice, leaving the queue empty.
    #[must_use]
    pub fn drain(&self) -> Vec<Notice> {
        std::mem::take(&mut *self.queue.lock())
    }

    /// Drop queued notices carrying exactly `message`.
    pub fn discard(&self, message: &str) {
        self.queue.lock().retain(|n| n.message != message);
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.queue.lock().is_empty()
    }
}

impl ErrorObserver for Notices {
    fn on_error(&self, error: &ApiError) {
        self.error(error.notice_message());
    }
}
