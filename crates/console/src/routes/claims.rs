//! Claim pages: filing, settlement and supporting documents.

use askama::Template;
use axum::{
    Form,
    extract::{Multipart, Path, Query, State},
    http::StatusCode,
    response::{Html, IntoResponse, Redirect, Response},
};
use chrono::NaiveDate;
use insurance_console_core::{
    Amount, Claim, ClaimDocument, ClaimId, ClaimRequest, ClaimStatusFilter, PolicyId,
};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use super::policies::PolicyView;
use super::{ConfirmForm, ConfirmTemplate, Layout, render};
use crate::error::AppError;
use crate::middleware::{Console, RequireAuth};
use crate::state::AppState;

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Claim view for templates.
#[derive(Debug, Clone)]
pub struct ClaimView {
    pub id: i64,
    pub date: String,
    pub description: String,
    pub amount_claimed: String,
    pub amount_reimbursed: String,
    pub status_label: String,
    pub is_pending: bool,
    pub policy_id: i64,
}

impl From<&Claim> for ClaimView {
    fn from(claim: &Claim) -> Self {
        Self {
            id: claim.id.as_i64(),
            date: claim.date.format(DATE_FORMAT).to_string(),
            description: claim.description.clone(),
            amount_claimed: claim.amount_claimed.display(),
            amount_reimbursed: claim
                .amount_reimbursed
                .filter(|a| !a.is_zero())
                .map(|a| a.display())
                .unwrap_or_else(|| "-".to_string()),
            status_label: claim.status().label().to_string(),
            is_pending: claim.is_pending(),
            policy_id: claim.policy_id.as_i64(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct DocumentView {
    pub file_name: String,
    pub url: String,
}

impl From<&ClaimDocument> for DocumentView {
    fn from(document: &ClaimDocument) -> Self {
        Self {
            file_name: document.file_name.clone(),
            url: document.url.clone(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct StatusOption {
    pub value: &'static str,
    pub label: &'static str,
    pub selected: bool,
}

fn parse_status(raw: &str) -> ClaimStatusFilter {
    match raw.trim() {
        "pending" => ClaimStatusFilter::Pending,
        "processed" => ClaimStatusFilter::Processed,
        _ => ClaimStatusFilter::All,
    }
}

fn status_options(selected: ClaimStatusFilter) -> Vec<StatusOption> {
    [
        (ClaimStatusFilter::All, "", "All"),
        (ClaimStatusFilter::Pending, "pending", "Pending"),
        (ClaimStatusFilter::Processed, "processed", "Processed"),
    ]
    .into_iter()
    .map(|(filter, value, label)| StatusOption {
        value,
        label,
        selected: filter == selected,
    })
    .collect()
}

/// Entry of a policy `<select>`.
#[derive(Debug, Clone)]
pub struct PolicyOption {
    pub id: i64,
    pub label: String,
    pub selected: bool,
}

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    #[serde(default)]
    pub q: String,
    #[serde(default)]
    pub status: String,
}

#[derive(Debug, Deserialize)]
pub struct NewQuery {
    #[serde(default)]
    pub policy: String,
}

/// New claim form fields as submitted.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ClaimForm {
    #[serde(default)]
    pub date: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub amount_claimed: String,
    #[serde(default)]
    pub policy_id: String,
}

impl ClaimForm {
    /// Validate into a request body, or describe the first problem.
    ///
    /// New claims are always filed unreimbursed.
    pub fn to_request(&self) -> Result<ClaimRequest, String> {
        let date = NaiveDate::parse_from_str(self.date.trim(), DATE_FORMAT)
            .map_err(|_| "Invalid claim date.".to_string())?;
        let description = self.description.trim();
        if description.is_empty() {
            return Err("A description is required.".to_string());
        }
        let amount_claimed = self
            .amount_claimed
            .parse::<Amount>()
            .map_err(|_| "Claimed amount must be a number.".to_string())?;
        if !amount_claimed.is_positive() {
            return Err("Claimed amount must be greater than zero.".to_string());
        }
        let policy_id = self
            .policy_id
            .trim()
            .parse::<PolicyId>()
            .map_err(|_| "Choose a policy.".to_string())?;

        Ok(ClaimRequest {
            date,
            description: description.to_string(),
            amount_claimed,
            amount_reimbursed: Amount::ZERO,
            policy_id,
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct ProcessForm {
    #[serde(default)]
    pub amount: String,
}

impl ProcessForm {
    pub fn amount(&self) -> Result<Amount, String> {
        let amount = self
            .amount
            .parse::<Amount>()
            .map_err(|_| "Reimbursed amount must be a number.".to_string())?;
        if amount.is_positive() {
            Ok(amount)
        } else {
            Err("Reimbursed amount must be greater than zero.".to_string())
        }
    }
}

#[derive(Template)]
#[template(path = "claims/index.html")]
pub struct ClaimsIndexTemplate {
    pub layout: Layout,
    pub claims: Vec<ClaimView>,
    pub total: usize,
    pub search_query: String,
    pub status_options: Vec<StatusOption>,
}

#[derive(Template)]
#[template(path = "claims/show.html")]
pub struct ClaimShowTemplate {
    pub layout: Layout,
    pub claim: ClaimView,
    pub policy: Option<PolicyView>,
    pub documents: Vec<DocumentView>,
}

#[derive(Template)]
#[template(path = "claims/form.html")]
pub struct ClaimFormTemplate {
    pub layout: Layout,
    pub form: ClaimForm,
    pub policies: Vec<PolicyOption>,
}

#[instrument(skip_all)]
pub async fn index(
    RequireAuth(_user): RequireAuth,
    console: Console,
    session: Session,
    Query(query): Query<ListQuery>,
) -> Result<Html<String>, AppError> {
    let all = console.gateway().claims().list().await.unwrap_or_else(|e| {
        tracing::error!(error = %e, "Failed to fetch claims");
        Vec::new()
    });

    let status = parse_status(&query.status);
    let claims: Vec<ClaimView> = all
        .iter()
        .filter(|c| c.matches_filter(status, &query.q))
        .map(ClaimView::from)
        .collect();

    let page = ClaimsIndexTemplate {
        layout: Layout::new(&console, &session, "/claims").await,
        claims,
        total: all.len(),
        search_query: query.q,
        status_options: status_options(status),
    };
    render(&page)
}

async fn form_page(
    console: &Console,
    session: &Session,
    form: ClaimForm,
    status: StatusCode,
) -> Result<Response, AppError> {
    let policies = console.gateway().policies().list().await.unwrap_or_else(|e| {
        tracing::warn!(error = %e, "Failed to fetch policies for claim form");
        Vec::new()
    });
    let chosen = form.policy_id.trim().parse::<i64>().ok();

    let page = ClaimFormTemplate {
        layout: Layout::new(console, session, "/claims").await,
        policies: policies
            .iter()
            .map(|p| PolicyOption {
                id: p.id.as_i64(),
                label: format!(
                    "#{} {} (customer #{})",
                    p.id,
                    p.policy_type.label(),
                    p.customer_id
                ),
                selected: chosen == Some(p.id.as_i64()),
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
    let form = ClaimForm {
        policy_id: query.policy,
        date: chrono::Local::now().date_naive().format(DATE_FORMAT).to_string(),
        ..ClaimForm::default()
    };
    form_page(&console, &session, form, StatusCode::OK).await
}

#[instrument(skip_all, fields(user_id = %user.id))]
pub async fn create(
    RequireAuth(user): RequireAuth,
    State(state): State<AppState>,
    console: Console,
    session: Session,
    Form(form): Form<ClaimForm>,
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
        .try_begin(user.id, "claim:create")
        .ok_or(AppError::Duplicate)?;

    match console.gateway().claims().create(&request).await {
        Ok(claim) => {
            tracing::info!(claim_id = %claim.id, "Claim filed");
            console.notices().success("Claim filed successfully");
            Ok(Redirect::to(&format!("/claims/{}", claim.id)).into_response())
        }
        Err(_) => form_page(&console, &session, form, StatusCode::OK).await,
    }
}

#[instrument(skip_all, fields(claim_id = %id))]
pub async fn show(
    RequireAuth(_user): RequireAuth,
    console: Console,
    session: Session,
    Path(id): Path<ClaimId>,
) -> Result<Html<String>, AppError> {
    let api = console.gateway();
    let claim = api.claims().get(id).await?;
    let policy = match api.policies().get(claim.policy_id).await {
        Ok(policy) => Some(PolicyView::from(&policy)),
        Err(e) => {
            tracing::warn!(error = %e, "Failed to fetch claim policy");
            None
        }
    };
    let documents = api.claims().documents(id).await.unwrap_or_else(|e| {
        tracing::warn!(error = %e, "Failed to fetch claim documents");
        Vec::new()
    });

    let page = ClaimShowTemplate {
        layout: Layout::new(&console, &session, "/claims").await,
        claim: ClaimView::from(&claim),
        policy,
        documents: documents.iter().map(DocumentView::from).collect(),
    };
    render(&page)
}

#[instrument(skip_all, fields(user_id = %user.id, claim_id = %id))]
pub async fn process(
    RequireAuth(user): RequireAuth,
    State(state): State<AppState>,
    console: Console,
    Path(id): Path<ClaimId>,
    Form(form): Form<ProcessForm>,
) -> Result<Redirect, AppError> {
    let back = Redirect::to(&format!("/claims/{id}"));
    let amount = match form.amount() {
        Ok(amount) => amount,
        Err(problem) => {
            console.notices().error(problem);
            return Ok(back);
        }
    };

    let _in_flight = state
        .in_flight()
        .try_begin(user.id, format!("claim:{id}:process"))
        .ok_or(AppError::Duplicate)?;

    if console.gateway().claims().process(id, amount).await.is_ok() {
        tracing::info!(amount = %amount, "Claim processed");
        console.notices().success("Claim processed successfully");
    }
    Ok(back)
}

#[instrument(skip_all, fields(user_id = %user.id, claim_id = %id))]
pub async fn upload_document(
    RequireAuth(user): RequireAuth,
    State(state): State<AppState>,
    console: Console,
    Path(id): Path<ClaimId>,
    mut multipart: Multipart,
) -> Result<Redirect, AppError> {
    let back = Redirect::to(&format!("/claims/{id}"));

    let mut upload = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(e.to_string()))?
    {
        if field.name() != Some("file") {
            continue;
        }
        let file_name = field.file_name().unwrap_or("document").to_string();
        let content_type = field
            .content_type()
            .unwrap_or("application/octet-stream")
            .to_string();
        let bytes = field
            .bytes()
            .await
            .map_err(|e| AppError::BadRequest(e.to_string()))?;
        upload = Some((file_name, content_type, bytes.to_vec()));
    }

    let Some((file_name, content_type, bytes)) = upload.filter(|(_, _, b)| !b.is_empty()) else {
        console.notices().error("Choose a file to upload.");
        return Ok(back);
    };

    let _in_flight = state
        .in_flight()
        .try_begin(user.id, format!("claim:{id}:upload"))
        .ok_or(AppError::Duplicate)?;

    if let Ok(document) = console
        .gateway()
        .claims()
        .upload_document(id, &file_name, &content_type, bytes)
        .await
    {
        tracing::info!(document_id = %document.id, "Claim document uploaded");
        console.notices().success("Document uploaded successfully");
    }
    Ok(back)
}

pub async fn confirm_delete(
    RequireAuth(_user): RequireAuth,
    console: Console,
    session: Session,
    Path(id): Path<ClaimId>,
) -> Result<Html<String>, AppError> {
    let claim = console.gateway().claims().get(id).await?;
    let page = ConfirmTemplate {
        layout: Layout::new(&console, &session, "/claims").await,
        title: "Delete claim".to_string(),
        message: format!(
            "Delete claim #{} filed on {}? This cannot be undone.",
            claim.id,
            claim.date.format(DATE_FORMAT)
        ),
        action: format!("/claims/{id}/delete"),
        cancel_href: format!("/claims/{id}"),
    };
    render(&page)
}

#[instrument(skip_all, fields(user_id = %user.id, claim_id = %id))]
pub async fn delete(
    RequireAuth(user): RequireAuth,
    State(state): State<AppState>,
    console: Console,
    Path(id): Path<ClaimId>,
    Form(form): Form<ConfirmForm>,
) -> Result<Redirect, AppError> {
    if !form.confirmed() {
        return Ok(Redirect::to(&format!("/claims/{id}")));
    }

    let _in_flight = state
        .in_flight()
        .try_begin(user.id, format!("claim:{id}:delete"))
        .ok_or(AppError::Duplicate)?;

    match console.gateway().claims().delete(id).await {
        Ok(()) => {
            tracing::info!("Claim deleted");
            console.notices().success("Claim deleted successfully");
            Ok(Redirect::to("/claims"))
        }
        Err(_) => Ok(Redirect::to(&format!("/claims/{id}"))),
    }
}
