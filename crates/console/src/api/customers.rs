//! Customer service client.

use insurance_console_core::{Customer, CustomerId, CustomerRequest};
use tracing::instrument;

use super::{ApiError, Gateway};

#[derive(Debug, Clone, Copy)]
pub struct CustomersApi<'a> {
    gateway: &'a Gateway,
}

impl<'a> CustomersApi<'a> {
    pub(crate) const fn new(gateway: &'a Gateway) -> Self {
        Self { gateway }
    }

    /// # Errors
    ///
    /// Returns the gateway error.
    pub async fn list(&self) -> Result<Vec<Customer>, ApiError> {
        self.gateway.get("/customers").await
    }

    /// # Errors
    ///
    /// Returns the gateway error.
    pub async fn get(&self, id: CustomerId) -> Result<Customer, ApiError> {
        self.gateway.get(&format!("/customers/{id}")).await
    }

    /// Server-side search by free text.
    ///
    /// # Errors
    ///
    /// Returns the gateway error.
    pub async fn search(&self, query: &str) -> Result<Vec<Customer>, ApiError> {
        self.gateway
            .get_with_query("/customers/search", &[("query", query)])
            .await
    }

    /// # Errors
    ///
    /// Returns the gateway error.
    #[instrument(skip(self, customer))]
    pub async fn create(&self, customer: &CustomerRequest) -> Result<Customer, ApiError> {
        self.gateway.post("/customers", customer).await
    }

    /// # Errors
    ///
    /// Returns the gateway error.
    #[instrument(skip(self, customer))]
    pub async fn update(
        &self,
        id: CustomerId,
        customer: &CustomerRequest,
    ) -> Result<Customer, ApiError> {
        self.gateway.put(&format!("/customers/{id}"), customer).await
    }

    /// # Errors
    ///
    /// Returns the gateway error.
    #[instrument(skip(self))]
    pub async fn delete(&self, id: CustomerId) -> Result<(), ApiError> {
        self.gateway.delete(&format!("/customers/{id}")).await
    }

    /// Customer record linked to the signed-in account.
    ///
    /// # Errors
    ///
    /// Returns the gateway error.
    pub async fn me(&self) -> Result<Customer, ApiError> {
        self.gateway.get("/customers/me").await
    }
}
