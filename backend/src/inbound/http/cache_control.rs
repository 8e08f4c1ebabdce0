//! Shared cache-control policies for HTTP handlers.

/// Responses that must never be stored by intermediaries or clients.
pub const NO_STORE: &str = "no-store";
