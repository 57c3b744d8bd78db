//! Current account page.

use askama::Template;
use axum::response::Html;
use tower_sessions::Session;

use super::{Layout, UserView, render};
use crate::error::AppError;
use crate::middleware::{Console, RequireAuth};

#[derive(Template)]
#[template(path = "profile.html")]
pub struct ProfileTemplate {
    pub layout: Layout,
    pub account: UserView,
    pub user_id: i64,
    pub active: bool,
    pub created_at: String,
    pub last_login: String,
}

pub async fn profile(
    RequireAuth(user): RequireAuth,
    console: Console,
    session: Session,
) -> Result<Html<String>, AppError> {
    let page = ProfileTemplate {
        layout: Layout::new(&console, &session, "/profile").await,
        account: UserView::from(&user),
        user_id: user.id.as_i64(),
        active: user.active,
        created_at: user.created_at.clone().unwrap_or_default(),
        last_login: user.last_login.clone().unwrap_or_default(),
    };
    render(&page)
}
