//! API server setup

use axum::Router;
use pool_core::LedgerService;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::routes::create_router;
use crate::state::{ApiConfig, AppState};

/// Create the API server
pub fn create_server(
    config: &ApiConfig,
    service: Arc<LedgerService>,
) -> Result<(Router, SocketAddr), Box<dyn std::error::Error + Send + Sync>> {
    let state = AppState::new(service);

    let mut router = create_router(state);
    router = router.layer(TraceLayer::new_for_http());

    if config.enable_cors {
        router = router.layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        );
    }

    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;

    Ok((router, addr))
}

/// Run the API server
pub async fn run_server(
    config: &ApiConfig,
    service: Arc<LedgerService>,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let (router, addr) = create_server(config, service)?;

    tracing::info!("Pool API server listening on {}", addr);

    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, router).await?;

    Ok(())
}

/// Start server in background (for testing)
pub async fn start_background_server(
    config: &ApiConfig,
    service: Arc<LedgerService>,
) -> Result<SocketAddr, Box<dyn std::error::Error + Send + Sync>> {
    let (router, addr) = create_server(config, service)?;

    // bind first to learn the actual address when port is 0
    let listener = TcpListener::bind(addr).await?;
    let actual_addr = listener.local_addr()?;

    tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, router).await {
            tracing::error!("Server error: {}", e);
        }
    });

    Ok(actual_addr)
}
