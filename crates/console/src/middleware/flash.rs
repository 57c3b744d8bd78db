//! Notices carried across a redirect in the browser session.

use tower_sessions::Session;

use crate::notify::Notice;

const FLASH_KEY: &str = "flash_notices";

/// Append notices to the session flash.
pub async fn push(session: &Session, notices: Vec<Notice>) {
    if notices.is_empty() {
        return;
    }
    let mut pending = take(session).await;
    pending.extend(notices);
    if let Err(e) = session.insert(FLASH_KEY, pending).await {
        tracing::warn!(error = %e, "Failed to store flash notices");
    }
}

/// Remove and return every flashed notice.
pub async fn take(session: &Session) -> Vec<Notice> {
    match session.remove::<Vec<Notice>>(FLASH_KEY).await {
        Ok(notices) => notices.unwrap_or_default(),
        Err(e) => {
            tracing::warn!(error = %e, "Failed to read flash notices");
            Vec::new()
        }
    }
}
