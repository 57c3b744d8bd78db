//! Customer pages.

use askama::Template;
use axum::{
    Form,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{Html, IntoResponse, Redirect, Response},
};
use insurance_console_core::{Customer, CustomerId, CustomerRequest, Email, UserId};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use super::policies::PolicyView;
use super::{ConfirmForm, ConfirmTemplate, Layout, render};
use crate::error::AppError;
use crate::middleware::{Console, RequireAuth};
use crate::state::AppState;

/// Customer view for templates.
#[derive(Debug, Clone)]
pub struct CustomerView {
    pub id: i64,
    pub full_name: String,
    pub email: String,
    pub address: String,
    pub phone: String,
    pub created_at: String,
}

impl From<&Customer> for CustomerView {
    fn from(customer: &Customer) -> Self {
        Self {
            id: customer.id.as_i64(),
            full_name: customer.full_name(),
            email: customer.email.to_string(),
            address: customer.address.clone(),
            phone: customer.phone.clone(),
            created_at: customer
                .created_at
                .as_deref()
                .map(|d| d.chars().take(10).collect())
                .unwrap_or_default(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    #[serde(default)]
    pub q: String,
}

/// Create/edit form fields as submitted.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CustomerForm {
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub phone: String,
    /// Linked account, carried through edits unchanged.
    #[serde(default)]
    pub user_id: String,
}

impl CustomerForm {
    /// Validate into a request body, or describe the first problem.
    pub fn to_request(&self) -> Result<CustomerRequest, String> {
        let last_name = self.last_name.trim();
        let first_name = self.first_name.trim();
        if last_name.is_empty() || first_name.is_empty() {
            return Err("First and last name are required.".to_string());
        }
        let email = Email::parse(&self.email).map_err(|e| format!("Invalid email: {e}"))?;
        let user_id = match self.user_id.trim() {
            "" => None,
            raw => Some(
                raw.parse::<UserId>()
                    .map_err(|_| "Invalid linked account.".to_string())?,
            ),
        };

        Ok(CustomerRequest {
            last_name: last_name.to_string(),
            first_name: first_name.to_string(),
            email,
            address: self.address.trim().to_string(),
            phone: self.phone.trim().to_string(),
            user_id,
        })
    }
}

impl From<&Customer> for CustomerForm {
    fn from(customer: &Customer) -> Self {
        Self {
            last_name: customer.last_name.clone(),
            first_name: customer.first_name.clone(),
            email: customer.email.to_string(),
            address: customer.address.clone(),
            phone: customer.phone.clone(),
            user_id: customer.user_id.map(|id| id.to_string()).unwrap_or_default(),
        }
    }
}

#[derive(Template)]
#[template(path = "customers/index.html")]
pub struct CustomersIndexTemplate {
    pub layout: Layout,
    pub customers: Vec<CustomerView>,
    pub total: usize,
    pub search_query: String,
}

#[derive(Template)]
#[template(path = "customers/show.html")]
pub struct CustomerShowTemplate {
    pub layout: Layout,
    pub customer: CustomerView,
    pub policies: Vec<PolicyView>,
}

#[derive(Template)]
#[template(path = "customers/form.html")]
pub struct CustomerFormTemplate {
    pub layout: Layout,
    pub title: String,
    pub action: String,
    pub cancel_href: String,
    pub form: CustomerForm,
}

#[instrument(skip_all)]
pub async fn index(
    RequireAuth(_user): RequireAuth,
    console: Console,
    session: Session,
    Query(query): Query<ListQuery>,
) -> Result<Html<String>, AppError> {
    let all = console
        .gateway()
        .customers()
        .list()
        .await
        .unwrap_or_else(|e| {
            tracing::error!(error = %e, "Failed to fetch customers");
            Vec::new()
        });

    let customers: Vec<CustomerView> = all
        .iter()
        .filter(|c| c.matches_search(&query.q))
        .map(CustomerView::from)
        .collect();

    let page = CustomersIndexTemplate {
        layout: Layout::new(&console, &session, "/customers").await,
        customers,
        total: all.len(),
        search_query: query.q,
    };
    render(&page)
}

async fn form_page(
    console: &Console,
    session: &Session,
    existing: Option<CustomerId>,
    form: CustomerForm,
    status: StatusCode,
) -> Result<Response, AppError> {
    let (title, action, cancel_href) = match existing {
        Some(id) => (
            "Edit customer".to_string(),
            format!("/customers/{id}"),
            format!("/customers/{id}"),
        ),
        None => (
            "New customer".to_string(),
            "/customers".to_string(),
            "/customers".to_string(),
        ),
    };
    let page = CustomerFormTemplate {
        layout: Layout::new(console, session, "/customers").await,
        title,
        action,
        cancel_href,
        form,
    };
    Ok((status, render(&page)?).into_response())
}

pub async fn new_form(
    RequireAuth(_user): RequireAuth,
    console: Console,
    session: Session,
) -> Result<Response, AppError> {
    form_page(&console, &session, None, CustomerForm::default(), StatusCode::OK).await
}

#[instrument(skip_all, fields(user_id = %user.id))]
pub async fn create(
    RequireAuth(user): RequireAuth,
    State(state): State<AppState>,
    console: Console,
    session: Session,
    Form(form): Form<CustomerForm>,
) -> Result<Response, AppError> {
    let request = match form.to_request() {
        Ok(request) => request,
        Err(problem) => {
            console.notices().error(problem);
            return form_page(&console, &session, None, form, StatusCode::UNPROCESSABLE_ENTITY)
                .await;
        }
    };

    let _in_flight = state
        .in_flight()
        .try_begin(user.id, "customer:create")
        .ok_or(AppError::Duplicate)?;

    match console.gateway().customers().create(&request).await {
        Ok(customer) => {
            tracing::info!(customer_id = %customer.id, "Customer created");
            console.notices().success("Customer created successfully");
            Ok(Redirect::to(&format!("/customers/{}", customer.id)).into_response())
        }
        Err(_) => form_page(&console, &session, None, form, StatusCode::OK).await,
    }
}

#[instrument(skip_all, fields(customer_id = %id))]
pub async fn show(
    RequireAuth(_user): RequireAuth,
    console: Console,
    session: Session,
    Path(id): Path<CustomerId>,
) -> Result<Html<String>, AppError> {
    let api = console.gateway();
    let customer = api.customers().get(id).await?;
    let policies = api.policies().by_customer(id).await.unwrap_or_else(|e| {
        tracing::warn!(error = %e, "Failed to fetch customer policies");
        Vec::new()
    });

    let page = CustomerShowTemplate {
        layout: Layout::new(&console, &session, "/customers").await,
        customer: CustomerView::from(&customer),
        policies: policies.iter().map(PolicyView::from).collect(),
    };
    render(&page)
}

pub async fn edit_form(
    RequireAuth(_user): RequireAuth,
    console: Console,
    session: Session,
    Path(id): Path<CustomerId>,
) -> Result<Response, AppError> {
    let customer = console.gateway().customers().get(id).await?;
    form_page(
        &console,
        &session,
        Some(id),
        CustomerForm::from(&customer),
        StatusCode::OK,
    )
    .await
}

#[instrument(skip_all, fields(user_id = %user.id, customer_id = %id))]
pub async fn update(
    RequireAuth(user): RequireAuth,
    State(state): State<AppState>,
    console: Console,
    session: Session,
    Path(id): Path<CustomerId>,
    Form(form): Form<CustomerForm>,
) -> Result<Response, AppError> {
    let request = match form.to_request() {
        Ok(request) => request,
        Err(problem) => {
            console.notices().error(problem);
            return form_page(
                &console,
                &session,
                Some(id),
                form,
                StatusCode::UNPROCESSABLE_ENTITY,
            )
            .await;
        }
    };

    let _in_flight = state
        .in_flight()
        .try_begin(user.id, format!("customer:{id}:update"))
        .ok_or(AppError::Duplicate)?;

    match console.gateway().customers().update(id, &request).await {
        Ok(_) => {
            console.notices().success("Customer updated successfully");
            Ok(Redirect::to(&format!("/customers/{id}")).into_response())
        }
        Err(_) => form_page(&console, &session, Some(id), form, StatusCode::OK).await,
    }
}

pub async fn confirm_delete(
    RequireAuth(_user): RequireAuth,
    console: Console,
    session: Session,
    Path(id): Path<CustomerId>,
) -> Result<Html<String>, AppError> {
    let customer = console.gateway().customers().get(id).await?;
    let page = ConfirmTemplate {
        layout: Layout::new(&console, &session, "/customers").await,
        title: "Delete customer".to_string(),
        message: format!(
            "Delete {} and all of their records? This cannot be undone.",
            customer.full_name()
        ),
        action: format!("/customers/{id}/delete"),
        cancel_href: format!("/customers/{id}"),
    };
    render(&page)
}

#[instrument(skip_all, fields(user_id = %user.id, customer_id = %id))]
pub async fn delete(
    RequireAuth(user): RequireAuth,
    State(state): State<AppState>,
    console: Console,
    Path(id): Path<CustomerId>,
    Form(form): Form<ConfirmForm>,
) -> Result<Redirect, AppError> {
    if !form.confirmed() {
        return Ok(Redirect::to(&format!("/customers/{id}")));
    }

    let _in_flight = state
        .in_flight()
        .try_begin(user.id, format!("customer:{id}:delete"))
        .ok_or(AppError::Duplicate)?;

    match console.gateway().customers().delete(id).await {
        Ok(()) => {
            tracing::info!("Customer deleted");
            console.notices().success("Customer deleted successfully");
            Ok(Redirect::to("/customers"))
        }
        Err(_) => Ok(Redirect::to(&format!("/customers/{id}"))),
    }
}
