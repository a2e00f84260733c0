//! ThaID OIDC Relay - Entry Point

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use thaid_relay::config::{Config, defaults};
use thaid_relay::server::transport::AppState;
use thaid_relay::{RelayServer, ThaidClient};

#[derive(Parser, Debug)]
#[command(name = "thaid-relay")]
#[command(about = "OIDC authorization-code relay for ThaID")]
#[command(version)]
struct Cli {
    /// OAuth client ID registered with ThaID
    #[arg(long, env = "THAID_CLIENT_ID", hide_env_values = true)]
    client_id: String,

    /// OAuth client secret
    #[arg(long, env = "THAID_CLIENT_SECRET", hide_env_values = true)]
    client_secret: String,

    /// Provider discovery document
    #[arg(long, env = "THAID_WELL_KNOWN_URL", default_value = defaults::WELL_KNOWN_URL)]
    well_known_url: String,

    /// Frontend origin; the provider redirects to {frontend}/auth/callback
    #[arg(long, env = "FRONTEND_URL", default_value = defaults::FRONTEND_URL)]
    frontend_url: String,

    /// Public origin of this service; https enables Secure cookies
    #[arg(long, env = "BACKEND_URL", default_value = defaults::BACKEND_URL)]
    backend_url: String,

    /// Secret used to sign the session cookie (at least 32 bytes)
    #[arg(long, env = "SESSION_SECRET", hide_env_values = true)]
    session_secret: String,

    /// Always mark the session cookie Secure
    #[arg(long, env = "SECURE_COOKIES")]
    secure_cookies: bool,

    /// HTTP server port
    #[arg(long, default_value = "8080", env = "PORT")]
    port: u16,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info", env = "RUST_LOG")]
    log_level: String,

    /// Output logs as JSON
    #[arg(long)]
    json_logs: bool,
}

impl Cli {
    fn into_config(self) -> Config {
        let mut config = Config::new(self.client_id, self.client_secret, self.session_secret);
        config.well_known_url = self.well_known_url;
        config.frontend_url = self.frontend_url;
        config.backend_url = self.backend_url;
        config.secure_cookies = self.secure_cookies;
        config
    }
}

fn init_tracing(log_level: &str, json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));

    let subscriber = tracing_subscriber::registry().with(filter);

    if json {
        subscriber.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        subscriber.with(tracing_subscriber::fmt::layer().compact()).init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let dotenv_loaded = dotenvy::dotenv().is_ok();

    let cli = Cli::parse();
    init_tracing(&cli.log_level, cli.json_logs);

    if !dotenv_loaded {
        tracing::debug!("No .env file found, using process environment");
    }

    tracing::info!(version = env!("CARGO_PKG_VERSION"), "Starting ThaID relay");

    let port = cli.port;
    let config = cli.into_config().validate().context("invalid configuration")?;
    tracing::debug!(?config, "Configuration loaded");

    let client = ThaidClient::connect(&config)
        .await
        .context("failed to load OpenID configuration")?;

    RelayServer::new(AppState::new(config, client)).run_http(port).await
}
