//! Customer records from the customer service.

use serde::{Deserialize, Serialize};

use super::{CustomerId, Email, UserId, contains_ignore_case};

/// A customer of the insurer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Customer {
    pub id: CustomerId,
    #[serde(rename = "nom", alias = "lastName")]
    pub last_name: String,
    #[serde(rename = "prenom", alias = "firstName")]
    pub first_name: String,
    pub email: Email,
    #[serde(rename = "adresse", alias = "address", default)]
    pub address: String,
    #[serde(rename = "telephone", alias = "phone", default)]
    pub phone: String,
    #[serde(rename = "userId", default)]
    pub user_id: Option<UserId>,
    #[serde(rename = "dateCreation", default)]
    pub created_at: Option<String>,
    #[serde(rename = "dateMiseAJour", default)]
    pub updated_at: Option<String>,
}

impl Customer {
    /// "First Last" for list and detail views.
    #[must_use]
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }

    /// Local list filter: last name, first name or email contains `query`.
    ///
    /// A blank query matches every customer.
    #[must_use]
    pub fn matches_search(&self, query: &str) -> bool {
        let query = query.trim();
        query.is_empty()
            || contains_ignore_case(&self.last_name, query)
            || contains_ignore_case(&self.first_name, query)
            || contains_ignore_case(self.email.as_str(), query)
    }
}

/// Body of a customer create or full update.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CustomerRequest {
    #[serde(rename = "nom")]
    pub last_name: String,
    #[serde(rename = "prenom")]
    pub first_name: String,
    pub email: Email,
    #[serde(rename = "adresse")]
    pub address: String,
    #[serde(rename = "telephone")]
    pub phone: String,
    #[serde(rename = "userId", skip_serializing_if = "Option::is_none")]
    pub user_id: Option<UserId>,
}

impl From<&Customer> for CustomerRequest {
    fn from(customer: &Customer) -> Self {
        Self {
            last_name: customer.last_name.clone(),
            first_name: customer.first_name.clone(),
            email: customer.email.clone(),
            address: customer.address.clone(),
            phone: customer.phone.clone(),
            user_id: customer.user_id,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn customer() -> Customer {
        serde_json::from_str(
            r#"{"id":3,"nom":"Dupont","prenom":"Jeanne","email":"jeanne@assur.fr",
                "adresse":"1 rue de Paris","telephone":"0102030405","userId":9}"#,
        )
        .unwrap()
    }

    #[test]
    fn test_reads_english_backend_names() {
        let c: Customer = serde_json::from_str(
            r#"{"id":4,"lastName":"Martin","firstName":"Paul","email":"p@m.fr","address":"x","phone":"y"}"#,
        )
        .unwrap();
        assert_eq!(c.full_name(), "Paul Martin");
        assert!(c.user_id.is_none());
    }

    #[test]
    fn test_matches_search_is_case_insensitive() {
        let c = customer();
        assert!(c.matches_search("dup"));
        assert!(c.matches_search("JEANNE"));
        assert!(c.matches_search("assur.fr"));
        assert!(c.matches_search("  "));
        assert!(!c.matches_search("martin"));
    }

    #[test]
    fn test_request_uses_wire_names() {
        let json = serde_json::to_value(CustomerRequest::from(&customer())).unwrap();
        assert_eq!(json["nom"], "Dupont");
        assert_eq!(json["telephone"], "0102030405");
        assert_eq!(json["userId"], 9);
    }
}
