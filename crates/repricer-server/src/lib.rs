//! HTTP surface: the Walmart webhook intake plus health, stats, metrics,
//! and management endpoints.

pub mod error;
pub mod routes;
pub mod state;

pub use error::{ServerError, ServerResult};
pub use routes::create_router;
pub use state::AppState;

use std::net::SocketAddr;
use tokio::sync::watch;
use tracing::info;

/// Serve the router until the shutdown signal flips.
pub async fn serve(
    bind: SocketAddr,
    state: AppState,
    mut shutdown: watch::Receiver<bool>,
) -> ServerResult<()> {
    let router = create_router(state);
    let listener = tokio::net::TcpListener::bind(bind).await?;
    info!(%bind, "http server listening");

    axum::serve(listener, router)
        .with_graceful_shutdown(async move {
            let _ = shutdown.changed().await;
        })
        .await?;

    info!("http server stopped");
    Ok(())
}
