//! Sign-in, registration and sign-out.

use askama::Template;
use axum::{
    Form,
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use insurance_console_core::Email;
use secrecy::SecretString;
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use super::{Layout, render};
use crate::api::ApiError;
use crate::error::AppError;
use crate::middleware::Console;

const MIN_LOGIN_LEN: usize = 3;
const MIN_PASSWORD_LEN: usize = 6;

#[derive(Template)]
#[template(path = "auth/login.html")]
pub struct LoginTemplate {
    pub layout: Layout,
    pub login: String,
}

#[derive(Template)]
#[template(path = "auth/register.html")]
pub struct RegisterTemplate {
    pub layout: Layout,
    pub login: String,
    pub email: String,
}

#[derive(Deserialize)]
pub struct LoginForm {
    #[serde(default)]
    pub login: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Deserialize)]
pub struct RegisterForm {
    #[serde(default)]
    pub login: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub confirm_password: String,
}

impl RegisterForm {
    /// First validation problem, if any.
    fn problem(&self) -> Option<String> {
        if self.login.trim().chars().count() < MIN_LOGIN_LEN {
            return Some(format!(
                "Login must be at least {MIN_LOGIN_LEN} characters."
            ));
        }
        if let Err(e) = Email::parse(&self.email) {
            return Some(format!("Invalid email: {e}"));
        }
        if self.password.chars().count() < MIN_PASSWORD_LEN {
            return Some(format!(
                "Password must be at least {MIN_PASSWORD_LEN} characters."
            ));
        }
        if self.password != self.confirm_password {
            return Some("Passwords do not match.".to_string());
        }
        None
    }
}

async fn login_page_with(
    console: &Console,
    session: &Session,
    login: &str,
    status: StatusCode,
) -> Result<Response, AppError> {
    let page = LoginTemplate {
        layout: Layout::new(console, session, "/login").await,
        login: login.to_string(),
    };
    Ok((status, render(&page)?).into_response())
}

pub async fn login_page(console: Console, session: Session) -> Result<Response, AppError> {
    if console.session().is_authenticated() {
        return Ok(Redirect::to("/").into_response());
    }
    login_page_with(&console, &session, "", StatusCode::OK).await
}

#[instrument(skip(console, session, form), fields(login = %form.login))]
pub async fn login(
    console: Console,
    session: Session,
    Form(form): Form<LoginForm>,
) -> Result<Response, AppError> {
    let login = form.login.trim();
    if login.is_empty() || form.password.is_empty() {
        console.notices().error("Login and password are required.");
        return login_page_with(&console, &session, login, StatusCode::UNPROCESSABLE_ENTITY).await;
    }

    let password = SecretString::from(form.password);
    match console
        .session()
        .login(&console.gateway().auth(), login, &password)
        .await
    {
        Ok(navigation) => Ok(Redirect::to(navigation.path()).into_response()),
        Err(e) => {
            // Rejected credentials are not an expired session.
            if e.is_unauthorized() {
                console
                    .notices()
                    .discard(&ApiError::Unauthorized.notice_message());
            }
            login_page_with(&console, &session, login, StatusCode::UNAUTHORIZED).await
        }
    }
}

async fn register_page_with(
    console: &Console,
    session: &Session,
    form: Option<&RegisterForm>,
    status: StatusCode,
) -> Result<Response, AppError> {
    let page = RegisterTemplate {
        layout: Layout::new(console, session, "/register").await,
        login: form.map(|f| f.login.trim().to_string()).unwrap_or_default(),
        email: form.map(|f| f.email.trim().to_string()).unwrap_or_default(),
    };
    Ok((status, render(&page)?).into_response())
}

pub async fn register_page(console: Console, session: Session) -> Result<Response, AppError> {
    register_page_with(&console, &session, None, StatusCode::OK).await
}

#[instrument(skip(console, session, form), fields(login = %form.login))]
pub async fn register(
    console: Console,
    session: Session,
    Form(form): Form<RegisterForm>,
) -> Result<Response, AppError> {
    if let Some(problem) = form.problem() {
        console.notices().error(problem);
        return register_page_with(
            &console,
            &session,
            Some(&form),
            StatusCode::UNPROCESSABLE_ENTITY,
        )
        .await;
    }

    let email = Email::parse(&form.email).map_err(|e| AppError::BadRequest(e.to_string()))?;
    let password = SecretString::from(form.password.clone());
    match console
        .session()
        .register(
            &console.gateway().auth(),
            form.login.trim(),
            &password,
            &email,
        )
        .await
    {
        Ok(navigation) => Ok(Redirect::to(navigation.path()).into_response()),
        Err(_) => {
            register_page_with(&console, &session, Some(&form), StatusCode::OK).await
        }
    }
}

pub async fn logout(console: Console) -> Redirect {
    Redirect::to(console.session().logout().path())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn form(login: &str, email: &str, password: &str, confirm: &str) -> RegisterForm {
        RegisterForm {
            login: login.to_string(),
            email: email.to_string(),
            password: password.to_string(),
            confirm_password: confirm.to_string(),
        }
    }

    #[test]
    fn test_register_form_validation() {
        assert!(form("jdoe", "j@example.com", "secret1", "secret1").problem().is_none());
        assert!(form("jd", "j@example.com", "secret1", "secret1").problem().is_some());
        assert!(form("jdoe", "nope", "secret1", "secret1").problem().is_some());
        assert!(form("jdoe", "j@example.com", "short", "short").problem().is_some());
        assert_eq!(
            form("jdoe", "j@example.com", "secret1", "secret2").problem(),
            Some("Passwords do not match.".to_string())
        );
    }
}
