//! Administrator dashboard and user management.

use askama::Template;
use axum::{
    Form,
    extract::{Path, State},
    response::{Html, Redirect},
};
use insurance_console_core::{Claim, Customer, Policy, Role, User, UserId};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use super::{Layout, render};
use crate::api::ApiError;
use crate::error::AppError;
use crate::middleware::{Console, RequireAdmin};
use crate::state::AppState;

const LOAD_FAILED: &str = "Failed to load admin dashboard data";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AdminStats {
    pub users: usize,
    pub active_users: usize,
    pub admins: usize,
    pub customers: usize,
    pub policies: usize,
    pub claims: usize,
    pub pending_claims: usize,
}

impl AdminStats {
    #[must_use]
    pub fn compute(
        users: &[User],
        customers: &[Customer],
        policies: &[Policy],
        claims: &[Claim],
    ) -> Self {
        Self {
            users: users.len(),
            active_users: users.iter().filter(|u| u.active).count(),
            admins: users.iter().filter(|u| u.is_admin()).count(),
            customers: customers.len(),
            policies: policies.len(),
            claims: claims.len(),
            pending_claims: claims.iter().filter(|c| c.is_pending()).count(),
        }
    }
}

/// User row of the management table.
#[derive(Debug, Clone)]
pub struct UserRow {
    pub id: i64,
    pub login: String,
    pub email: String,
    pub role_code: String,
    pub other_role_code: String,
    pub active: bool,
    pub is_self: bool,
    pub last_login: String,
}

impl UserRow {
    fn new(user: &User, current: UserId) -> Self {
        let other = match user.role {
            Role::Admin => Role::Client,
            Role::Client => Role::Admin,
        };
        Self {
            id: user.id.as_i64(),
            login: user.login.clone(),
            email: user.email.clone().unwrap_or_default(),
            role_code: user.role.as_str().to_string(),
            other_role_code: other.as_str().to_string(),
            active: user.active,
            is_self: user.id == current,
            last_login: user.last_login.clone().unwrap_or_default(),
        }
    }
}

#[derive(Template)]
#[template(path = "admin/index.html")]
pub struct AdminTemplate {
    pub layout: Layout,
    pub loaded: bool,
    pub stats: AdminStats,
    pub users: Vec<UserRow>,
}

#[derive(Debug, Deserialize)]
pub struct ActiveForm {
    #[serde(default)]
    pub active: String,
}

#[derive(Debug, Deserialize)]
pub struct RoleForm {
    #[serde(default)]
    pub role: String,
}

type AdminData = (Vec<User>, Vec<Customer>, Vec<Policy>, Vec<Claim>);

/// Fetch everything concurrently; any failure fails the whole load.
async fn load(console: &Console) -> Result<AdminData, ApiError> {
    let api = console.gateway();
    let (auth, customers, policies, claims) =
        (api.auth(), api.customers(), api.policies(), api.claims());
    tokio::try_join!(
        auth.users(),
        customers.list(),
        policies.list(),
        claims.list()
    )
}

#[instrument(skip_all, fields(user_id = %admin.id))]
pub async fn index(
    RequireAdmin(admin): RequireAdmin,
    console: Console,
    session: Session,
) -> Result<Html<String>, AppError> {
    let (loaded, stats, users) = match load(&console).await {
        Ok((users, customers, policies, claims)) => {
            let stats = AdminStats::compute(&users, &customers, &policies, &claims);
            let rows = users.iter().map(|u| UserRow::new(u, admin.id)).collect();
            (true, stats, rows)
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to load admin dashboard");
            console.notices().error(LOAD_FAILED);
            (false, AdminStats::default(), Vec::new())
        }
    };

    let page = AdminTemplate {
        layout: Layout::new(&console, &session, "/admin").await,
        loaded,
        stats,
        users,
    };
    render(&page)
}

#[instrument(skip_all, fields(user_id = %admin.id, target = %id))]
pub async fn set_active(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    console: Console,
    Path(id): Path<UserId>,
    Form(form): Form<ActiveForm>,
) -> Result<Redirect, AppError> {
    let active = match form.active.as_str() {
        "true" => true,
        "false" => false,
        other => return Err(AppError::BadRequest(format!("invalid active flag: {other}"))),
    };
    if id == admin.id && !active {
        console.notices().error("You cannot deactivate your own account.");
        return Ok(Redirect::to("/admin"));
    }

    let _in_flight = state
        .in_flight()
        .try_begin(admin.id, format!("user:{id}:active"))
        .ok_or(AppError::Duplicate)?;

    if let Ok(user) = console.gateway().auth().set_active(id, active).await {
        tracing::info!(active = user.active, "User activation changed");
        console.notices().success(if user.active {
            format!("User {} activated", user.login)
        } else {
            format!("User {} deactivated", user.login)
        });
    }
    Ok(Redirect::to("/admin"))
}

#[instrument(skip_all, fields(user_id = %admin.id, target = %id))]
pub async fn set_role(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    console: Console,
    Path(id): Path<UserId>,
    Form(form): Form<RoleForm>,
) -> Result<Redirect, AppError> {
    let role = form.role.parse::<Role>().map_err(AppError::BadRequest)?;
    if id == admin.id && role != Role::Admin {
        console.notices().error("You cannot remove your own administrator role.");
        return Ok(Redirect::to("/admin"));
    }

    let _in_flight = state
        .in_flight()
        .try_begin(admin.id, format!("user:{id}:role"))
        .ok_or(AppError::Duplicate)?;

    if let Ok(user) = console.gateway().auth().set_role(id, role).await {
        tracing::info!(role = %user.role, "User role changed");
        console
            .notices()
            .success(format!("User {} is now {}", user.login, user.role));
    }
    Ok(Redirect::to("/admin"))
}
