//! ThaID OIDC Relay
//!
//! Bridges a web frontend and the ThaID national digital-identity provider
//! using the OAuth 2.0 authorization-code flow.
//!
//! # Features
//!
//! - **Discovery**: provider endpoints loaded once at startup
//! - **CSRF protection**: single-use random `state` per login
//! - **Code exchange**: authorization code traded for tokens server-side
//! - **Claims**: ID-token payload decoded into the user session
//! - **Stateless sessions**: signed, HTTP-only cookie; no server storage
//! - **Introspection relay**: bearer tokens checked against the provider
//!
//! # Example
//!
//! ```no_run
//! use thaid_relay::{Config, RelayServer, ThaidClient, server::transport::AppState};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::new("client-id", "client-secret", "a-session-secret-of-at-least-32-bytes")
//!         .validate()?;
//!     let client = ThaidClient::connect(&config).await?;
//!     RelayServer::new(AppState::new(config, client)).run_http(8080).await
//! }
//! ```

pub mod client;
pub mod config;
pub mod error;
pub mod models;
pub mod server;

pub use client::ThaidClient;
pub use config::Config;
pub use error::{AuthError, ClaimsError, ClientError, ConfigError};
pub use server::RelayServer;
