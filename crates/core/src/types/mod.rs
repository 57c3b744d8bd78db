//! Domain types for the insurance console.
//!
//! Field names on the wire follow the back-office JSON (`nom`, `contratId`,
//! `montantRéclamé`, ...); Rust names are English.

pub mod amount;
pub mod claim;
pub mod customer;
pub mod email;
pub mod id;
pub mod policy;
pub mod user;

pub use amount::Amount;
pub use claim::{Claim, ClaimDocument, ClaimRequest, ClaimStatus, ClaimStatusFilter};
pub use customer::{Customer, CustomerRequest};
pub use email::{Email, EmailError};
pub use id::*;
pub use policy::{Policy, PolicyRequest, PolicyType};
pub use user::{Role, User};

/// Case-insensitive substring test used by the list filters.
pub(crate) fn contains_ignore_case(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}
