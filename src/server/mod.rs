//! HTTP server for asset-portal
//!
//! Wraps the router in the shared middleware stack (CORS, request timeout,
//! per-client rate limiting, tracing, compression) and drives it with
//! graceful shutdown.

pub mod middleware;
pub mod router;

pub use middleware::AuthenticatedWallet;
pub use router::{build_router, AppState, HealthResponse};

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::net::TcpListener;
use tower_http::compression::CompressionLayer;
use tower_http::cors::CorsLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::auth::RateLimiter;
use crate::config::ServerConfig;
use crate::database::Database;
use crate::server::middleware::rate_limit_middleware;

/// Server error types
#[derive(Debug, Error)]
pub enum ServerError {
    /// Failed to bind to the address
    #[error("Failed to bind to address: {0}")]
    Bind(String),

    /// Server runtime error
    #[error("Server error: {0}")]
    Serve(String),
}

/// HTTP server
pub struct Server<D: Database + 'static> {
    config: ServerConfig,
    state: AppState<D>,
    rate_limiter: Arc<RateLimiter>,
}

impl<D: Database + 'static> Server<D> {
    /// Create a new server with the given configuration and state
    pub fn new(config: ServerConfig, state: AppState<D>) -> Self {
        let rate_limiter = Arc::new(RateLimiter::per_second(
            config.rate_limit.max_requests_per_second,
        ));
        Self {
            config,
            state,
            rate_limiter,
        }
    }

    /// Get the server's bind address
    pub fn bind_addr(&self) -> SocketAddr {
        SocketAddr::new(
            self.config.host.parse().unwrap_or([0, 0, 0, 0].into()),
            self.config.port,
        )
    }

    /// Run the server until the shutdown signal resolves
    ///
    /// Rate limiting sits inside the timeout layer and keys on the peer
    /// address, so the listener hands connection info to the router.
    pub async fn run(
        self,
        shutdown: impl Future<Output = ()> + Send + 'static,
    ) -> Result<(), ServerError> {
        let addr = self.bind_addr();

        let app = build_router(self.state)
            .layer(CorsLayer::permissive())
            .layer(TimeoutLayer::new(Duration::from_secs(
                self.config.request_timeout_secs,
            )))
            .layer(axum::middleware::from_fn_with_state(
                Arc::clone(&self.rate_limiter),
                rate_limit_middleware,
            ))
            .layer(TraceLayer::new_for_http())
            .layer(CompressionLayer::new());
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|e| ServerError::Bind(e.to_string()))?;

        info!("Server listening on {}", addr);

        axum::serve(
            listener,
            app.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .with_graceful_shutdown(shutdown)
        .await
        .map_err(|e| ServerError::Serve(e.to_string()))?;

        info!("Server shutdown complete");
        Ok(())
    }
}
