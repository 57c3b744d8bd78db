//! HTTP middleware for the console.
//!
//! # Middleware Order (outermost first)
//!
//! 1. Sentry layers (hub per request, HTTP transaction)
//! 2. `TraceLayer` (request tracing)
//! 3. Session layer (tower-sessions, in-memory store)
//! 4. Console context (session resolution, token write-back, flash)
//! 5. Guard extractors on protected handlers

pub mod auth;
pub mod context;
pub mod flash;
pub mod session;

pub use auth::{GuardRejection, RequireAdmin, RequireAuth};
pub use context::{Console, console_context};
pub use session::create_session_layer;
