use std::sync::Arc;

use anyhow::{Context, Result};
use axum::{Router, middleware, routing::get};
use tracing::info;

use spapi_core::{AppConfig, GraphqlClient, ReportOrchestrator};

mod cors;
mod error;
mod handlers;


pub use error::INVALID_REPORT_MESSAGE;
pub use handlers::GREETING;

#[derive(Clone)]
pub(crate) struct WebState {
    pub(crate) reports: ReportOrchestrator,
}

impl WebState {
    fn new(reports: ReportOrchestrator) -> Self {
        Self { reports }
    }
}

/// Start the report server and block until Ctrl-C.
///
/// # Errors
/// Returns an error when the upstream client cannot be built, the runtime
/// cannot be created, the socket cannot be bound, or the server exits with a
/// runtime failure.
pub fn serve_web(config: AppConfig) -> Result<()> {
    let client = GraphqlClient::new(&config.upstream).context("failed to build upstream client")?;
    info!(api_url = %client.api_url(), "upstream client ready");
    let state = WebState::new(ReportOrchestrator::new(Arc::new(client), config.metrics));

    let bind_addr = format!("{}:{}", config.server.host, config.server.port);
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("failed to build web runtime")?;

    runtime.block_on(async move {
        let listener = tokio::net::TcpListener::bind(&bind_addr)
            .await
            .with_context(|| format!("failed to bind web server at {bind_addr}"))?;
        info!(addr = %listener.local_addr()?, "spapi listening");

        axum::serve(listener, app_router(state))
            .with_graceful_shutdown(async {
                let _ = tokio::signal::ctrl_c().await;
                info!("shutdown signal received");
            })
            .await
            .context("web server failed")
    })
}

pub(crate) fn app_router(state: WebState) -> Router {
    Router::new()
        .route("/", get(handlers::index))
        .route("/report/{link}", get(handlers::report))
        .method_not_allowed_fallback(handlers::not_found)
        .layer(middleware::from_fn(cors::open_cors_middleware))
        .with_state(state)
}
