use crate::middleware::trace_requests;
use crate::routes;
use axum::extract::DefaultBodyLimit;
use axum::middleware as axum_mw;
use axum::routing::{get, post};
use axum::Router;
use parley_agent::Orchestrator;
use parley_sandbox::Sandbox;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tracing::info;

/// Largest accepted request body.
pub const MAX_BODY_BYTES: usize = 1024 * 1024;

/// Shared application state.
pub struct AppState {
    /// Chat entry point.
    pub orchestrator: Arc<Orchestrator>,
    /// Script runner behind `/execute`.
    pub sandbox: Arc<Sandbox>,
}

/// The HTTP gateway.
pub struct GatewayServer;

impl GatewayServer {
    /// Builds the router: `GET /health`, `POST /chat`, `POST /execute`.
    pub fn build(orchestrator: Arc<Orchestrator>, sandbox: Arc<Sandbox>) -> Router {
        let state = Arc::new(AppState {
            orchestrator,
            sandbox,
        });

        Router::new()
            .route("/health", get(routes::health))
            .route("/chat", post(routes::chat))
            .route("/execute", post(routes::execute))
            .with_state(state)
            .layer(
                ServiceBuilder::new()
                    .layer(axum_mw::from_fn(trace_requests))
                    .layer(DefaultBodyLimit::max(MAX_BODY_BYTES)),
            )
    }

    /// Binds `addr` and serves until the process is stopped.
    pub async fn serve(
        addr: SocketAddr,
        orchestrator: Arc<Orchestrator>,
        sandbox: Arc<Sandbox>,
    ) -> std::io::Result<()> {
        let app = Self::build(orchestrator, sandbox);
        let listener = TcpListener::bind(addr).await?;
        info!(addr = %listener.local_addr()?, "Gateway listening");
        axum::serve(listener, app).await
    }
}
