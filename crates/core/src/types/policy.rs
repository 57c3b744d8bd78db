//! Insurance policies (contracts) from the policy service.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::{Amount, CustomerId, PolicyId};

/// Line of business of a policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PolicyType {
    Auto,
    Habitation,
    Sante,
}

impl PolicyType {
    /// All policy types, in form display order.
    pub const ALL: [Self; 3] = [Self::Auto, Self::Habitation, Self::Sante];

    /// Wire and path value (`AUTO`, `HABITATION`, `SANTE`).
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Auto => "AUTO",
            Self::Habitation => "HABITATION",
            Self::Sante => "SANTE",
        }
    }

    /// Human label.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Auto => "Auto",
            Self::Habitation => "Home",
            Self::Sante => "Health",
        }
    }
}

impl std::fmt::Display for PolicyType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for PolicyType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|t| t.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("invalid policy type: {s}"))
    }
}

/// An insurance contract held by a customer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Policy {
    pub id: PolicyId,
    #[serde(rename = "type")]
    pub policy_type: PolicyType,
    #[serde(rename = "dateEffet")]
    pub effective_date: NaiveDate,
    #[serde(rename = "dateExpiration")]
    pub expiry_date: NaiveDate,
    #[serde(rename = "montantCouverture")]
    pub coverage: Amount,
    #[serde(rename = "clientId")]
    pub customer_id: CustomerId,
}

impl Policy {
    /// Local list filter: optional type, then id or customer id containing `query`.
    #[must_use]
    pub fn matches_filter(&self, policy_type: Option<PolicyType>, query: &str) -> bool {
        if policy_type.is_some_and(|t| t != self.policy_type) {
            return false;
        }
        let query = query.trim();
        query.is_empty()
            || self.id.to_string().contains(query)
            || self.customer_id.to_string().contains(query)
    }
}

/// Body of a policy create or full update.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PolicyRequest {
    #[serde(rename = "type")]
    pub policy_type: PolicyType,
    #[serde(rename = "dateEffet")]
    pub effective_date: NaiveDate,
    #[serde(rename = "dateExpiration")]
    pub expiry_date: NaiveDate,
    #[serde(rename = "montantCouverture")]
    pub coverage: Amount,
    #[serde(rename = "clientId")]
    pub customer_id: CustomerId,
}
