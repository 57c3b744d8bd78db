//! Claims (sinistres) and their documents.
//!
//! Claim status is derived, never stored: a claim is pending while nothing has
//! been reimbursed. Every view that shows or filters on status goes through
//! [`Claim::status`].

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::{Amount, ClaimId, DocumentId, PolicyId, contains_ignore_case};

/// Derived processing status of a claim.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ClaimStatus {
    /// No reimbursement recorded (absent or zero).
    Pending,
    /// A non-zero reimbursement has been recorded.
    Processed,
}

impl ClaimStatus {
    /// Badge label.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Pending => "Pending",
            Self::Processed => "Processed",
        }
    }

    /// Query-string value used by the list filter.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Processed => "processed",
        }
    }
}

/// Status filter of the claim list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClaimStatusFilter {
    #[default]
    All,
    Pending,
    Processed,
}

impl ClaimStatusFilter {
    /// Whether a claim with `status` passes the filter.
    #[must_use]
    pub const fn accepts(&self, status: ClaimStatus) -> bool {
        matches!(
            (self, status),
            (Self::All, _)
                | (Self::Pending, ClaimStatus::Pending)
                | (Self::Processed, ClaimStatus::Processed)
        )
    }
}

/// A claim filed against a policy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claim {
    pub id: ClaimId,
    pub date: NaiveDate,
    pub description: String,
    #[serde(rename = "montantRéclamé")]
    pub amount_claimed: Amount,
    #[serde(rename = "montantRemboursé", default)]
    pub amount_reimbursed: Option<Amount>,
    #[serde(rename = "contratId")]
    pub policy_id: PolicyId,
}

impl Claim {
    /// Processing status: pending iff the reimbursed amount is absent or zero.
    #[must_use]
    pub fn status(&self) -> ClaimStatus {
        match self.amount_reimbursed {
            None => ClaimStatus::Pending,
            Some(amount) if amount.is_zero() => ClaimStatus::Pending,
            Some(_) => ClaimStatus::Processed,
        }
    }

    /// Whether the claim is still pending.
    #[must_use]
    pub fn is_pending(&self) -> bool {
        self.status() == ClaimStatus::Pending
    }

    /// Local list filter: status first, then id, policy id or description.
    #[must_use]
    pub fn matches_filter(&self, status: ClaimStatusFilter, query: &str) -> bool {
        if !status.accepts(self.status()) {
            return false;
        }
        let query = query.trim();
        query.is_empty()
            || self.id.to_string().contains(query)
            || self.policy_id.to_string().contains(query)
            || contains_ignore_case(&self.description, query)
    }
}

/// Body of a claim create or full update.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClaimRequest {
    pub date: NaiveDate,
    pub description: String,
    #[serde(rename = "montantRéclamé")]
    pub amount_claimed: Amount,
    #[serde(rename = "montantRemboursé")]
    pub amount_reimbursed: Amount,
    #[serde(rename = "contratId")]
    pub policy_id: PolicyId,
}

impl From<&Claim> for ClaimRequest {
    fn from(claim: &Claim) -> Self {
        Self {
            date: claim.date,
            description: claim.description.clone(),
            amount_claimed: claim.amount_claimed,
            amount_reimbursed: claim.amount_reimbursed.unwrap_or(Amount::ZERO),
            policy_id: claim.policy_id,
        }
    }
}

/// A document attached to a claim.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClaimDocument {
    pub id: DocumentId,
    pub file_name: String,
    pub url: String,
}
