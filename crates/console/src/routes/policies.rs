//! Policy pages.

use askama::Template;
use axum::{
    Form,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{Html, IntoResponse, Redirect, Response},
};
use chrono::NaiveDate;
use insurance_console_core::{Amount, CustomerId, Policy, PolicyId, PolicyRequest, PolicyType};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use super::claims::ClaimView;
use super::customers::CustomerView;
use super::{ConfirmForm, ConfirmTemplate, Layout, render};
use crate::error::AppError;
use crate::middleware::{Console, RequireAuth};
use crate::state::AppState;

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Policy view for templates.
#[derive(Debug, Clone)]
pub struct PolicyView {
    pub id: i64,
    pub type_code: String,
    pub type_label: String,
    pub effective_date: String,
    pub expiry_date: String,
    pub coverage: String,
    pub customer_id: i64,
}

impl From<&Policy> for PolicyView {
    fn from(policy: &Policy) -> Self {
        Self {
            id: policy.id.as_i64(),
            type_code: policy.policy_type.as_str().to_string(),
            type_label: policy.policy_type.label().to_string(),
            effective_date: policy.effective_date.format(DATE_FORMAT).to_string(),
            expiry_date: policy.expiry_date.format(DATE_FORMAT).to_string(),
            coverage: policy.coverage.display(),
            customer_id: policy.customer_id.as_i64(),
        }
    }
}

/// Entry of a policy type `<select>`.
#[derive(Debug, Clone)]
pub struct TypeOption {
    pub code: String,
    pub label: String,
    pub selected: bool,
}

fn type_options(selected: Option<PolicyType>) -> Vec<TypeOption> {
    PolicyType::ALL
        .iter()
        .map(|t| TypeOption {
            code: t.as_str().to_string(),
            label: t.label().to_string(),
            selected: selected == Some(*t),
        })
        .collect()
}

/// Entry of a customer `<select>`.
#[derive(Debug, Clone)]
pub struct CustomerOption {
    pub id: i64,
    pub label: String,
    pub selected: bool,
}

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    #[serde(default)]
    pub q: String,
    #[serde(default, rename = "type")]
    pub policy_type: String,
}

#[derive(Debug, Deserialize)]
pub struct NewQuery {
    #[serde(default)]
    pub customer: String,
}

/// Create form fields as submitted.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PolicyForm {
    #[serde(default)]
    pub policy_type: String,
    #[serde(default)]
    pub effective_date: String,
    #[serde(default)]
    pub expiry_date: String,
    #[serde(default)]
    pub coverage: String,
    #[serde(default)]
    pub customer_id: String,
}

impl PolicyForm {
    /// Validate into a request body, or describe the first problem.
    pub fn to_request(&self) -> Result<PolicyRequest, String> {
        let policy_type = self
            .policy_type
            .parse::<PolicyType>()
            .map_err(|_| "Choose a policy type.".to_string())?;
        let effective_date = parse_date(&self.effective_date, "effective date")?;
        let expiry_date = parse_date(&self.expiry_date, "expiry date")?;
        if expiry_date <= effective_date {
            return Err("Expiry date must be after the effective date.".to_string());
        }
        let coverage = self
            .coverage
            .parse::<Amount>()
            .map_err(|_| "Coverage must be a number.".to_string())?;
        if !coverage.is_positive() {
            return Err("Coverage must be greater than zero.".to_string());
        }
        let customer_id = self
            .customer_id
            .trim()
            .parse::<CustomerId>()
            .map_err(|_| "Choose a customer.".to_string())?;

        Ok(PolicyRequest {
            policy_type,
            effective_date,
            expiry_date,
            coverage,
            customer_id,
        })
    }
}

fn parse_date(raw: &str, field: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(raw.trim(), DATE_FORMAT).map_err(|_| format!("Invalid {field}."))
}

#[derive(Template)]
#[template(path = "policies/index.html")]
pub struct PoliciesIndexTemplate {
    pub layout: Layout,
    pub policies: Vec<PolicyView>,
    pub total: usize,
    pub search_query: String,
    pub type_options: Vec<TypeOption>,
}

#[derive(Template)]
#[template(path = "policies/show.html")]
pub struct PolicyShowTemplate {
    pub layout: Layout,
    pub policy: PolicyView,
    pub customer: Option<CustomerView>,
    pub claims: Vec<ClaimView>,
}

#[derive(Template)]
#[template(path = "policies/form.html")]
pub struct PolicyFormTemplate {
    pub layout: Layout,
    pub form: PolicyForm,
    pub type_options: Vec<TypeOption>,
    pub customers: Vec<CustomerOption>,
}

#[instrument(skip_all)]
pub async fn index(
    RequireAuth(_user): RequireAuth,
    console: Console,
    session: Session,
    Query(query): Query<ListQuery>,
) -> Result<Html<String>, AppError> {
    let all = console.gateway().policies().list().await.unwrap_or_else(|e| {
        tracing::error!(error = %e, "Failed to fetch policies");
        Vec::new()
    });

    let selected = query.policy_type.parse::<PolicyType>().ok();
    let policies: Vec<PolicyView> = all
        .iter()
        .filter(|p| p.matches_filter(selected, &query.q))
        .map(PolicyView::from)
        .collect();

    let page = PoliciesIndexTemplate {
        layout: Layout::new(&console, &session, "/policies").await,
        policies,
        total: all.len(),
        search_query: query.q,
        type_options: type_options(selected),
    };
    render(&page)
}

async fn form_page(
    console: &Console,
    session: &Session,
    form: PolicyForm,
    status: StatusCode,
) -> Result<Response, AppError> {
    let customers = console
        .gateway()
        .customers()
        .list()
        .await
        .unwrap_or_else(|e| {
            tracing::warn!(error = %e, "Failed to fetch customers for policy form");
            Vec::new()
        });
    let chosen = form.customer_id.trim().parse::<i64>().ok();

    let page = PolicyFormTemplate {
        layout: Layout::new(console, session, "/policies").await,
        type_options: type_options(form.policy_type.parse().ok()),
        customers: customers
            .iter()
            .map(|c| CustomerOption {
                id: c.id.as_i64(),
                label: c.full_name(),
                selected: chosen == Some(c.id.as_i64()),
            })
            .collect(),
        form,
    };
    Ok((status, render(&page)?).into_response())
}

pub async fn new_form(
    RequireAuth(_user): RequireAuth,
    console: Console,
    session: Session,
    Query(query): Query<NewQuery>,
) -> Result<Response, AppError> {
    let form = PolicyForm {
        customer_id: query.customer,
        ..PolicyForm::default()
    };
    form_page(&console, &session, form, StatusCode::OK).await
}

#[instrument(skip_all, fields(user_id = %user.id))]
pub async fn create(
    RequireAuth(user): RequireAuth,
    State(state): State<AppState>,
    console: Console,
    session: Session,
    Form(form): Form<PolicyForm>,
) -> Result<Response, AppError> {
    let request = match form.to_request() {
        Ok(request) => request,
        Err(problem) => {
            console.notices().error(problem);
            return form_page(&console, &session, form, StatusCode::UNPROCESSABLE_ENTITY).await;
        }
    };

    let _in_flight = state
        .in_flight()
        .try_begin(user.id, "policy:create")
        .ok_or(AppError::Duplicate)?;

    match console.gateway().policies().create(&request).await {
        Ok(policy) => {
            tracing::info!(policy_id = %policy.id, "Policy created");
            console.notices().success("Policy created successfully");
            Ok(Redirect::to(&format!("/policies/{}", policy.id)).into_response())
        }
        Err(_) => form_page(&console, &session, form, StatusCode::OK).await,
    }
}

#[instrument(skip_all, fields(policy_id = %id))]
pub async fn show(
    RequireAuth(_user): RequireAuth,
    console: Console,
    session: Session,
    Path(id): Path<PolicyId>,
) -> Result<Html<String>, AppError> {
    let api = console.gateway();
    let policy = api.policies().get(id).await?;
    let customer = match api.customers().get(policy.customer_id).await {
        Ok(customer) => Some(CustomerView::from(&customer)),
        Err(e) => {
            tracing::warn!(error = %e, "Failed to fetch policy holder");
            None
        }
    };
    let claims = api
        .policies()
        .claims()
        .by_policy(id)
        .await
        .unwrap_or_else(|e| {
            tracing::warn!(error = %e, "Failed to fetch policy claims");
            Vec::new()
        });

    let page = PolicyShowTemplate {
        layout: Layout::new(&console, &session, "/policies").await,
        policy: PolicyView::from(&policy),
        customer,
        claims: claims.iter().map(ClaimView::from).collect(),
    };
    render(&page)
}

pub async fn confirm_delete(
    RequireAuth(_user): RequireAuth,
    console: Console,
    session: Session,
    Path(id): Path<PolicyId>,
) -> Result<Html<String>, AppError> {
    let policy = console.gateway().policies().get(id).await?;
    let page = ConfirmTemplate {
        layout: Layout::new(&console, &session, "/policies").await,
        title: "Delete policy".to_string(),
        message: format!(
            "Delete {} policy #{}? This cannot be undone.",
            policy.policy_type.label(),
            policy.id
        ),
        action: format!("/policies/{id}/delete"),
        cancel_href: format!("/policies/{id}"),
    };
    render(&page)
}

#[instrument(skip_all, fields(user_id = %user.id, policy_id = %id))]
pub async fn delete(
    RequireAuth(user): RequireAuth,
    State(state): State<AppState>,
    console: Console,
    Path(id): Path<PolicyId>,
    Form(form): Form<ConfirmForm>,
) -> Result<Redirect, AppError> {
    if !form.confirmed() {
        return Ok(Redirect::to(&format!("/policies/{id}")));
    }

    let _in_flight = state
        .in_flight()
        .try_begin(user.id, format!("policy:{id}:delete"))
        .ok_or(AppError::Duplicate)?;

    match console.gateway().policies().delete(id).await {
        Ok(()) => {
            tracing::info!("Policy deleted");
            console.notices().success("Policy deleted successfully");
            Ok(Redirect::to("/policies"))
        }
        Err(_) => Ok(Redirect::to(&format!("/policies/{id}"))),
    }
}
