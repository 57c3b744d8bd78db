//! Insurance back-office console.
//!
//! Server-rendered console for staff managing customers, policies and claims
//! through the insurance API gateway. The browser session only carries the
//! bearer token; every page load rebuilds the authorization state from it.
//!
//! # Layers
//!
//! - [`api`]: gateway transport plus customer, policy, claim and auth clients
//! - [`session`]: authorization state machine
//! - [`guard`]: route access decisions
//! - [`middleware`]: per-request console context and guard extractors
//! - [`routes`]: pages and form handlers

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod api;
pub mod config;
pub mod credential;
pub mod error;
pub mod guard;
pub mod inflight;
pub mod middleware;
pub mod notify;
pub mod routes;
pub mod session;
pub mod state;
