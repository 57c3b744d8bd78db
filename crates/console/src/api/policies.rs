//! Policy service client, including the claims it hosts under `/policies/claims`.

use insurance_console_core::{
    Claim, ClaimId, ClaimRequest, CustomerId, Policy, PolicyId, PolicyRequest, PolicyType,
};
use tracing::instrument;

use super::{ApiError, Gateway};

#[derive(Debug, Clone, Copy)]
pub struct PoliciesApi<'a> {
    gateway: &'a Gateway,
}

impl<'a> PoliciesApi<'a> {
    pub(crate) const fn new(gateway: &'a Gateway) -> Self {
        Self { gateway }
    }

    /// Claims as served by the policy service.
    #[must_use]
    pub const fn claims(&self) -> PolicyClaimsApi<'a> {
        PolicyClaimsApi {
            gateway: self.gateway,
        }
    }

    /// # Errors
    ///
    /// Returns the gateway error.
    pub async fn list(&self) -> Result<Vec<Policy>, ApiError> {
        self.gateway.get("/policies").await
    }

    /// # Errors
    ///
    /// Returns the gateway error.
    pub async fn get(&self, id: PolicyId) -> Result<Policy, ApiError> {
        self.gateway.get(&format!("/policies/{id}")).await
    }

    /// # Errors
    ///
    /// Returns the gateway error.
    pub async fn by_customer(&self, customer: CustomerId) -> Result<Vec<Policy>, ApiError> {
        self.gateway
            .get(&format!("/policies/customer/{customer}"))
            .await
    }

    /// # Errors
    ///
    /// Returns the gateway error.
    pub async fn by_type(&self, policy_type: PolicyType) -> Result<Vec<Policy>, ApiError> {
        self.gateway
            .get(&format!("/policies/type/{}", policy_type.as_str()))
            .await
    }

    /// # Errors
    ///
    /// Returns the gateway error.
    #[instrument(skip(self, policy))]
    pub async fn create(&self, policy: &PolicyRequest) -> Result<Policy, ApiError> {
        self.gateway.post("/policies", policy).await
    }

    /// # Errors
    ///
    /// Returns the gateway error.
    #[instrument(skip(self, policy))]
    pub async fn update(&self, id: PolicyId, policy: &PolicyRequest) -> Result<Policy, ApiError> {
        self.gateway.put(&format!("/policies/{id}"), policy).await
    }

    /// # Errors
    ///
    /// Returns the gateway error.
    #[instrument(skip(self))]
    pub async fn delete(&self, id: PolicyId) -> Result<(), ApiError> {
        self.gateway.delete(&format!("/policies/{id}")).await
    }
}

/// Claims nested under the policy service.
#[derive(Debug, Clone, Copy)]
pub struct PolicyClaimsApi<'a> {
    gateway: &'a Gateway,
}

impl PolicyClaimsApi<'_> {
    /// # Errors
    ///
    /// Returns the gateway error.
    pub async fn list(&self) -> Result<Vec<Claim>, ApiError> {
        self.gateway.get("/policies/claims").await
    }

    /// # Errors
    ///
    /// Returns the gateway error.
    pub async fn get(&self, id: ClaimId) -> Result<Claim, ApiError> {
        self.gateway.get(&format!("/policies/claims/{id}")).await
    }

    /// # Errors
    ///
    /// Returns the gateway error.
    pub async fn by_policy(&self, policy: PolicyId) -> Result<Vec<Claim>, ApiError> {
        self.gateway.get(&format!("/policies/{policy}/claims")).await
    }

    /// # Errors
    ///
    /// Returns the gateway error.
    #[instrument(skip(self, claim))]
    pub async fn create(&self, claim: &ClaimRequest) -> Result<Claim, ApiError> {
        self.gateway.post("/policies/claims", claim).await
    }

    /// # Errors
    ///
    /// Returns the gateway error.
    #[instrument(skip(self, claim))]
    pub async fn update(&self, id: ClaimId, claim: &ClaimRequest) -> Result<Claim, ApiError> {
        self.gateway
            .put(&format!("/policies/claims/{id}"), claim)
            .await
    }

    /// # Errors
    ///
    /// Returns the gateway error.
    #[instrument(skip(self))]
    pub async fn delete(&self, id: ClaimId) -> Result<(), ApiError> {
        self.gateway
            .delete(&format!("/policies/claims/{id}"))
            .await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use axum::extract::Path;
    use axum::routing::get;
    use axum::{Json, Router};
    use serde_json::{Value, json};

    use super::*;
    use crate::api::testing::gateway;

    fn policy_json(id: i64, kind: &str, customer: i64) -> Value {
        json!({
            "id": id,
            "type": kind,
            "dateEffet": "2024-01-01",
            "dateExpiration": "2025-01-01",
            "montantCouverture": 15000.0,
            "clientId": customer
        })
    }

    #[tokio::test]
    async fn test_filters_by_customer_and_type() {
        let router = Router::new()
            .route(
                "/policies/customer/{id}",
                get(|Path(id): Path<i64>| async move {
                    Json(json!([policy_json(1, "AUTO", id), policy_json(2, "SANTE", id)]))
                }),
            )
            .route(
                "/policies/type/{kind}",
                get(|Path(kind): Path<String>| async move {
                    Json(json!([policy_json(3, &kind, 1)]))
                }),
            );
        let (gateway, _) = gateway(router, Some("t")).await;

        let owned = gateway
            .policies()
            .by_customer(CustomerId::new(4))
            .await
            .unwrap();
        assert!(owned.iter().all(|p| p.customer_id == CustomerId::new(4)));

        let homes = gateway
            .policies()
            .by_type(PolicyType::Habitation)
            .await
            .unwrap();
        assert_eq!(homes[0].policy_type, PolicyType::Habitation);
    }

    #[tokio::test]
    async fn test_nested_claims_paths() {
        let claim = json!({
            "id": 11,
            "date": "2024-03-02",
            "description": "Dégât des eaux",
            "montantRéclamé": 1200.0,
            "montantRemboursé": 0.0,
            "contratId": 2
        });
        let listed = claim.clone();
        let router = Router::new()
            .route(
                "/policies/claims",
                get(move || {
                    let listed = listed.clone();
                    async move { Json(json!([listed])) }
                }),
            )
            .route(
                "/policies/{id}/claims",
                get(move |Path(id): Path<i64>| {
                    let claim = claim.clone();
                    async move {
                        assert_eq!(id, 2);
                        Json(json!([claim]))
                    }
                }),
            );
        let (gateway, _) = gateway(router, Some("t")).await;

        let all = gateway.policies().claims().list().await.unwrap();
        assert!(all[0].is_pending());
        let for_policy = gateway
            .policies()
            .claims()
            .by_policy(PolicyId::new(2))
            .await
            .unwrap();
        assert_eq!(for_policy[0].id, ClaimId::new(11));
    }
}
