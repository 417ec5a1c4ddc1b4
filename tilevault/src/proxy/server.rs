//! HTTP server wiring for the dispatcher.
//!
//! The tile grammar is a regex over the whole path, so the router uses a
//! single fallback handler instead of route patterns; the dispatcher
//! decides between tile and not-found.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::State;
use axum::http::Uri;
use axum::response::Response;
use axum::Router;
use thiserror::Error;
use tokio::net::TcpListener;
use tracing::info;

use super::dispatcher::TileProxy;

/// Errors starting or running the HTTP server.
#[derive(Debug, Error)]
pub enum ServeError {
    /// Could not bind the listening socket.
    #[error("Failed to bind {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        source: std::io::Error,
    },

    /// The accept loop failed.
    #[error("Server error: {0}")]
    Serve(#[from] std::io::Error),
}

/// Build the router for a proxy instance.
pub fn router(proxy: Arc<TileProxy>) -> Router {
    Router::new().fallback(handle_tile).with_state(proxy)
}

async fn handle_tile(State(proxy): State<Arc<TileProxy>>, uri: Uri) -> Response {
    proxy.dispatch(uri.path()).await
}

/// Bind and serve until ctrl-c.
///
/// Each connection is handled on its own task; requests share no mutable
/// state beyond what the cache backend synchronizes internally.
pub async fn serve(proxy: Arc<TileProxy>) -> Result<(), ServeError> {
    let addr = SocketAddr::from(([0, 0, 0, 0], proxy.config().port));
    let listener = TcpListener::bind(addr)
        .await
        .map_err(|source| ServeError::Bind { addr, source })?;

    info!(
        %addr,
        tile_host = %proxy.config().tile_host,
        "Started tile proxy"
    );

    axum::serve(listener, router(proxy))
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    // Errors installing the handler leave the server running without
    // graceful shutdown, which is the best remaining option.
    let _ = tokio::signal::ctrl_c().await;
    info!("Shutting down");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serve_error_display() {
        let err = ServeError::Bind {
            addr: SocketAddr::from(([127, 0, 0, 1], 80)),
            source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        };
        let message = err.to_string();
        assert!(message.contains("127.0.0.1:80"));
        assert!(message.contains("denied"));
    }
}
