//! Dashboard route handler.

use askama::Template;
use axum::response::Html;
use insurance_console_core::{Claim, Customer, Policy};
use tower_sessions::Session;
use tracing::instrument;

use super::claims::ClaimView;
use super::policies::PolicyView;
use super::{Layout, render};
use crate::api::ApiError;
use crate::error::AppError;
use crate::middleware::{Console, RequireAuth};

/// Entries shown in each "recent" panel.
const RECENT_LIMIT: usize = 5;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DashboardStats {
    pub customers: usize,
    pub policies: usize,
    pub claims: usize,
    pub pending_claims: usize,
}

#[derive(Debug, Default)]
pub struct DashboardData {
    pub stats: DashboardStats,
    pub recent_policies: Vec<PolicyView>,
    pub recent_claims: Vec<ClaimView>,
}

#[derive(Template)]
#[template(path = "dashboard.html")]
pub struct DashboardTemplate {
    pub layout: Layout,
    pub stats: DashboardStats,
    pub recent_policies: Vec<PolicyView>,
    pub recent_claims: Vec<ClaimView>,
}

/// Counts plus the newest policies (by effective date) and claims (by date).
#[must_use]
pub fn summarize(
    customers: &[Customer],
    mut policies: Vec<Policy>,
    mut claims: Vec<Claim>,
) -> DashboardData {
    let stats = DashboardStats {
        customers: customers.len(),
        policies: policies.len(),
        claims: claims.len(),
        pending_claims: claims.iter().filter(|c| c.is_pending()).count(),
    };

    policies.sort_by(|a, b| b.effective_date.cmp(&a.effective_date));
    claims.sort_by(|a, b| b.date.cmp(&a.date));

    DashboardData {
        stats,
        recent_policies: policies.iter().take(RECENT_LIMIT).map(PolicyView::from).collect(),
        recent_claims: claims.iter().take(RECENT_LIMIT).map(ClaimView::from).collect(),
    }
}

async fn load(console: &Console) -> Result<DashboardData, ApiError> {
    let api = console.gateway();
    let customers = api.customers().list().await?;
    let policies = api.policies().list().await?;
    let claims = api.claims().list().await?;
    Ok(summarize(&customers, policies, claims))
}

#[instrument(skip_all)]
pub async fn dashboard(
    RequireAuth(_user): RequireAuth,
    console: Console,
    session: Session,
) -> Result<Html<String>, AppError> {
    let data = load(&console).await.unwrap_or_else(|e| {
        tracing::error!(error = %e, "Failed to load dashboard data");
        DashboardData::default()
    });

    let page = DashboardTemplate {
        layout: Layout::new(&console, &session, "/").await,
        stats: data.stats,
        recent_policies: data.recent_policies,
        recent_claims: data.recent_claims,
    };
    render(&page)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::NaiveDate;
    use insurance_console_core::{Amount, ClaimId, CustomerId, PolicyId, PolicyType};

    use super::*;

    fn policy(id: i64, day: u32) -> Policy {
        Policy {
            id: PolicyId::new(id),
            policy_type: PolicyType::Auto,
            effective_date: NaiveDate::from_ymd_opt(2024, 1, day).unwrap(),
            expiry_date: NaiveDate::from_ymd_opt(2025, 1, day).unwrap(),
            coverage: Amount::ZERO,
            customer_id: CustomerId::new(1),
        }
    }

    fn claim(id: i64, day: u32, reimbursed: Option<Amount>) -> Claim {
        Claim {
            id: ClaimId::new(id),
            date: NaiveDate::from_ymd_opt(2024, 6, day).unwrap(),
            description: String::new(),
            amount_claimed: Amount::ZERO,
            amount_reimbursed: reimbursed,
            policy_id: PolicyId::new(1),
        }
    }

    #[test]
    fn test_summarize_counts_and_recent_order() {
        let policies = (1..=7).map(|i| policy(i, u32::try_from(i).unwrap())).collect();
        let claims = vec![
            claim(1, 3, None),
            claim(2, 9, Some(Amount::ZERO)),
            claim(3, 5, Some("120".parse().unwrap())),
        ];

        let data = summarize(&[], policies, claims);

        assert_eq!(
            data.stats,
            DashboardStats {
                customers: 0,
                policies: 7,
                claims: 3,
                pending_claims: 2,
            }
        );
        assert_eq!(data.recent_policies.len(), RECENT_LIMIT);
        assert_eq!(data.recent_policies[0].id, 7);
        assert_eq!(data.recent_claims[0].id, 2);
        assert_eq!(data.recent_claims[2].id, 1);
    }
}
