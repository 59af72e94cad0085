//! HTTP surface for parley.
//!
//! Translates JSON requests into calls on the [`parley_agent::Orchestrator`]
//! and the [`parley_sandbox::Sandbox`]. The gateway holds no conversation
//! state of its own.

/// Error to HTTP response mapping.
pub mod error;
/// Request tracing middleware.
pub mod middleware;
/// Route handlers and request/response bodies.
pub mod routes;
/// Router assembly and serving.
pub mod server;

pub use error::ApiError;
pub use routes::{ChatRequest, ChatResponse, ExecuteRequest, ExecuteResponse};
pub use server::{AppState, GatewayServer};
