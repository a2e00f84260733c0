//! HTTP server for the ThaID relay.
//!
//! Provider metadata is loaded before the listener binds; a relay that cannot
//! reach the provider at startup never accepts a login request.

pub mod auth;
pub mod session;
pub mod transport;

use std::net::SocketAddr;
use std::sync::Arc;

use transport::AppState;

/// Relay server.
pub struct RelayServer {
    state: Arc<AppState>,
}

impl RelayServer {
    /// Create a new server from fully initialized state.
    #[must_use]
    pub fn new(state: AppState) -> Self {
        Self { state: Arc::new(state) }
    }

    /// Router with all routes and layers attached.
    #[must_use]
    pub fn router(&self) -> axum::Router {
        transport::create_router(Arc::clone(&self.state))
    }

    /// Run the server in HTTP mode.
    ///
    /// # Errors
    ///
    /// Returns error on bind or server failure.
    pub async fn run_http(self, port: u16) -> anyhow::Result<()> {
        let router = self.router();
        let addr = SocketAddr::from(([0, 0, 0, 0], port));

        tracing::info!(
            backend_url = %self.state.config.backend_url,
            secure_cookies = self.state.cookies.secure(),
            "HTTP server listening on http://{}",
            addr
        );

        let listener = tokio::net::TcpListener::bind(addr).await?;
        axum::serve(listener, router).with_graceful_shutdown(shutdown_signal()).await?;

        tracing::info!("HTTP server shut down");
        Ok(())
    }
}

impl std::fmt::Debug for RelayServer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RelayServer").field("client", &self.state.client).finish()
    }
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "Failed to install CTRL+C handler");
        std::future::pending::<()>().await;
    }
    tracing::info!("Received shutdown signal");
}
