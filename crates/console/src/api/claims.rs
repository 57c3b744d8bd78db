//! Claim service client.

use insurance_console_core::{
    Amount, Claim, ClaimDocument, ClaimId, ClaimRequest, CustomerId, PolicyId,
};
use reqwest::multipart::{Form, Part};
use serde::Serialize;
use tracing::instrument;

use super::{ApiError, Gateway};

#[derive(Serialize)]
struct ProcessRequest {
    #[serde(rename = "montantRemboursé")]
    amount_reimbursed: Amount,
}

#[derive(Debug, Clone, Copy)]
pub struct ClaimsApi<'a> {
    gateway: &'a Gateway,
}

impl<'a> ClaimsApi<'a> {
    pub(crate) const fn new(gateway: &'a Gateway) -> Self {
        Self { gateway }
    }

    /// # Errors
    ///
    /// Returns the gateway error.
    pub async fn list(&self) -> Result<Vec<Claim>, ApiError> {
        self.gateway.get("/claims").await
    }

    /// # Errors
    ///
    /// Returns the gateway error.
    pub async fn get(&self, id: ClaimId) -> Result<Claim, ApiError> {
        self.gateway.get(&format!("/claims/{id}")).await
    }

    /// # Errors
    ///
    /// Returns the gateway error.
    pub async fn by_policy(&self, policy: PolicyId) -> Result<Vec<Claim>, ApiError> {
        self.gateway.get(&format!("/claims/policy/{policy}")).await
    }

    /// # Errors
    ///
    /// Returns the gateway error.
    pub async fn by_customer(&self, customer: CustomerId) -> Result<Vec<Claim>, ApiError> {
        self.gateway
            .get(&format!("/claims/customer/{customer}"))
            .await
    }

    /// Claims filed by the signed-in account.
    ///
    /// # Errors
    ///
    /// Returns the gateway error.
    pub async fn mine(&self) -> Result<Vec<Claim>, ApiError> {
        self.gateway.get("/claims/me").await
    }

    /// # Errors
    ///
    /// Returns the gateway error.
    #[instrument(skip(self, claim))]
    pub async fn create(&self, claim: &ClaimRequest) -> Result<Claim, ApiError> {
        self.gateway.post("/claims", claim).await
    }

    /// # Errors
    ///
    /// Returns the gateway error.
    #[instrument(skip(self, claim))]
    pub async fn update(&self, id: ClaimId, claim: &ClaimRequest) -> Result<Claim, ApiError> {
        self.gateway.put(&format!("/claims/{id}"), claim).await
    }

    /// Settle a claim with the reimbursed amount.
    ///
    /// # Errors
    ///
    /// Returns the gateway error.
    #[instrument(skip(self), fields(amount = %amount))]
    pub async fn process(&self, id: ClaimId, amount: Amount) -> Result<Claim, ApiError> {
        self.gateway
            .patch(
                &format!("/claims/{id}/process"),
                &ProcessRequest {
                    amount_reimbursed: amount,
                },
            )
            .await
    }

    /// # Errors
    ///
    /// Returns the gateway error.
    #[instrument(skip(self))]
    pub async fn delete(&self, id: ClaimId) -> Result<(), ApiError> {
        self.gateway.delete(&format!("/claims/{id}")).await
    }

    /// Attach a file to a claim. The file travels as multipart field `file`.
    ///
    /// # Errors
    ///
    /// Returns the gateway error, or `Unknown` if `content_type` is not a
    /// valid MIME type.
    #[instrument(skip(self, bytes), fields(size = bytes.len()))]
    pub async fn upload_document(
        &self,
        id: ClaimId,
        file_name: &str,
        content_type: &str,
        bytes: Vec<u8>,
    ) -> Result<ClaimDocument, ApiError> {
        let part = Part::bytes(bytes)
            .file_name(file_name.to_string())
            .mime_str(content_type)
            .map_err(|e| {
                tracing::warn!(error = %e, content_type, "Rejected document content type");
                self.gateway
                    .fail(ApiError::Unknown("Unsupported file type.".to_string()))
            })?;

        self.gateway
            .post_multipart(&format!("/claims/{id}/documents"), Form::new().part("file", part))
            .await
    }

    /// # Errors
    ///
    /// Returns the gateway error.
    pub async fn documents(&self, id: ClaimId) -> Result<Vec<ClaimDocument>, ApiError> {
        self.gateway.get(&format!("/claims/{id}/documents")).await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::str::FromStr;

    use axum::extract::{Multipart, Path};
    use axum::routing::{get, patch, post};
    use axum::{Json, Router};
    use serde_json::{Value, json};

    use super::*;
    use crate::api::testing::gateway;

    fn claim_json(id: i64, reimbursed: f64) -> Value {
        json!({
            "id": id,
            "date": "2024-05-01",
            "description": "Bris de glace",
            "montantRéclamé": 300.0,
            "montantRemboursé": reimbursed,
            "contratId": 8
        })
    }

    #[tokio::test]
    async fn test_process_sends_reimbursed_amount() {
        let router = Router::new().route(
            "/claims/{id}/process",
            patch(|Path(id): Path<i64>, Json(body): Json<Value>| async move {
                let amount = body["montantRemboursé"].as_f64().unwrap();
                Json(claim_json(id, amount))
            }),
        );
        let (gateway, _) = gateway(router, Some("t")).await;

        let claim = gateway
            .claims()
            .process(ClaimId::new(4), Amount::from_str("250.50").unwrap())
            .await
            .unwrap();
        assert!(!claim.is_pending());
        assert_eq!(claim.amount_reimbursed.unwrap().to_string(), "250.50");
    }

    #[tokio::test]
    async fn test_upload_document_as_multipart_file_field() {
        let router = Router::new().route(
            "/claims/{id}/documents",
            post(|Path(id): Path<i64>, mut multipart: Multipart| async move {
                let field = multipart.next_field().await.unwrap().unwrap();
                assert_eq!(field.name(), Some("file"));
                let name = field.file_name().unwrap().to_string();
                let data = field.bytes().await.unwrap();
                assert_eq!(&data[..], b"%PDF-1.4");
                Json(json!({"id": 1, "fileName": name, "url": format!("/files/{id}/{name}")}))
            }),
        );
        let (gateway, _) = gateway(router, Some("t")).await;

        let document = gateway
            .claims()
            .upload_document(
                ClaimId::new(3),
                "constat.pdf",
                "application/pdf",
                b"%PDF-1.4".to_vec(),
            )
            .await
            .unwrap();
        assert_eq!(document.file_name, "constat.pdf");
        assert_eq!(document.url, "/files/3/constat.pdf");
    }

    #[tokio::test]
    async fn test_invalid_content_type_is_reported() {
        let (gateway, recorder) = gateway(Router::new(), Some("t")).await;

        let err = gateway
            .claims()
            .upload_document(ClaimId::new(3), "x", "not a mime", Vec::new())
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Unknown(_)));
        assert_eq!(recorder.0.lock().len(), 1);
    }

    #[tokio::test]
    async fn test_mine_and_by_policy() {
        let router = Router::new()
            .route("/claims/me", get(|| async { Json(json!([claim_json(1, 0.0)])) }))
            .route(
                "/claims/policy/{id}",
                get(|Path(id): Path<i64>| async move {
                    assert_eq!(id, 8);
                    Json(json!([claim_json(2, 100.0)]))
                }),
            );
        let (gateway, _) = gateway(router, Some("t")).await;

        assert!(gateway.claims().mine().await.unwrap()[0].is_pending());
        let by_policy = gateway.claims().by_policy(PolicyId::new(8)).await.unwrap();
        assert!(!by_policy[0].is_pending());
    }
}
