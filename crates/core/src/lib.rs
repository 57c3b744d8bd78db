//! Insurance Console Core - Shared domain types.
//!
//! This crate provides the records exchanged with the back-office services:
//! - users and roles (auth service)
//! - customers (customer service)
//! - policies and claims (policy service)
//!
//! # Architecture
//!
//! The core crate contains only types and pure helpers - no I/O, no HTTP
//! clients. The console crate owns all network access.
//!
//! # Modules
//!
//! - [`types`] - Typed ids, amounts, emails and the domain records

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
