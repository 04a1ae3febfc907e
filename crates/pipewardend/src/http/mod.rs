//! HTTP/JSON control surface over the orchestrator.

mod handlers;

use std::future::Future;
use std::io;

use axum::Router;
use axum::routing::{get, post};
use thiserror::Error;
use tokio::net::TcpListener;
use tracing::info;

use crate::orchestrator::Orchestrator;

const HTTP_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::http");

/// Errors raised while exposing the control surface.
#[derive(Debug, Error)]
pub enum ServeError {
    /// The listen address could not be bound.
    #[error("failed to bind control surface on '{address}': {source}")]
    Bind {
        /// Requested address.
        address: String,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// The server loop failed.
    #[error("control surface failed: {source}")]
    Serve {
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
}

/// Routes of the control surface. Unknown paths and methods answer 404.
pub fn router(orchestrator: Orchestrator) -> Router {
    Router::new()
        .route("/api/start", post(handlers::start))
        .route("/api/stop", post(handlers::stop))
        .route("/api/native/on", post(handlers::native_on))
        .route("/api/native/off", post(handlers::native_off))
        .route("/api/status", get(handlers::status))
        .fallback(handlers::not_found)
        .method_not_allowed_fallback(handlers::not_found)
        .with_state(orchestrator)
}

/// Binds the control surface listener.
///
/// # Errors
///
/// Returns [`ServeError::Bind`] when the address is unavailable.
pub async fn bind(address: &str) -> Result<TcpListener, ServeError> {
    TcpListener::bind(address)
        .await
        .map_err(|source| ServeError::Bind {
            address: address.to_owned(),
            source,
        })
}

/// Serves requests until `shutdown` resolves.
///
/// # Errors
///
/// Returns [`ServeError::Serve`] when the accept loop fails.
pub async fn serve<F>(
    listener: TcpListener,
    orchestrator: Orchestrator,
    shutdown: F,
) -> Result<(), ServeError>
where
    F: Future<Output = ()> + Send + 'static,
{
    if let Ok(address) = listener.local_addr() {
        info!(target: HTTP_TARGET, %address, "control surface listening");
    }
    axum::serve(listener, router(orchestrator))
        .with_graceful_shutdown(shutdown)
        .await
        .map_err(|source| ServeError::Serve { source })
}
