//! HTTP routing.
//!
//! Wires the auth handlers behind CORS for the frontend origin and
//! per-request tracing.

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::FromRef,
    http::{HeaderValue, Method, header},
    response::IntoResponse,
    routing::{get, post},
};
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use url::Url;

use super::auth::handlers;
use super::session::CookieSettings;
use crate::client::ThaidClient;
use crate::config::Config;

/// Shared state for HTTP handlers. Immutable after startup.
#[derive(Debug)]
pub struct AppState {
    pub config: Config,
    pub client: ThaidClient,
    pub cookies: CookieSettings,
}

impl AppState {
    /// Bundle configuration with a connected provider client.
    #[must_use]
    pub fn new(config: Config, client: ThaidClient) -> Self {
        let cookies = CookieSettings::new(&config.session_secret, config.cookie_secure());
        Self { config, client, cookies }
    }
}

impl FromRef<Arc<AppState>> for CookieSettings {
    fn from_ref(state: &Arc<AppState>) -> Self {
        state.cookies.clone()
    }
}

/// Create the HTTP router for the relay.
pub fn create_router(state: Arc<AppState>) -> Router {
    let cors = cors_layer(&state.config.frontend_url);

    Router::new()
        .route("/health", get(health_check))
        .route("/api/auth/login", get(handlers::handle_login))
        .route("/api/auth/callback", get(handlers::handle_callback))
        .route("/api/auth/exchange", post(handlers::handle_exchange))
        .route("/api/auth/logout", get(handlers::handle_logout))
        .route("/api/auth/me", get(handlers::handle_me))
        .route("/api/auth/introspect", post(handlers::handle_introspect))
        .layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()).layer(cors))
        .with_state(state)
}

/// Allow credentialed requests from the frontend origin only.
fn cors_layer(frontend_url: &str) -> CorsLayer {
    let origin = Url::parse(frontend_url)
        .ok()
        .map(|url| url.origin().ascii_serialization())
        .and_then(|origin| HeaderValue::from_str(&origin).ok());

    let Some(origin) = origin else {
        tracing::warn!(frontend_url, "Frontend URL has no usable origin, CORS disabled");
        return CorsLayer::new();
    };

    CorsLayer::new()
        .allow_origin(origin)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::ORIGIN, header::CONTENT_TYPE, header::ACCEPT, header::AUTHORIZATION])
        .allow_credentials(true)
}

async fn health_check() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "service": "thaid-relay",
        "version": env!("CARGO_PKG_VERSION")
    }))
}
