//! Configuration for the ThaID relay.

use std::time::Duration;

use url::Url;

use crate::error::ConfigError;

/// Provider and session constants.
pub mod defaults {
    use std::time::Duration;

    /// ThaID OpenID discovery document.
    pub const WELL_KNOWN_URL: &str =
        "https://imauth.bora.dopa.go.th/.well-known/openid-configuration";

    /// Frontend origin used during local development.
    pub const FRONTEND_URL: &str = "http://localhost:3000";

    /// Backend origin used during local development.
    pub const BACKEND_URL: &str = "http://localhost:8080";

    /// Scopes requested at the authorization endpoint.
    pub const SCOPE: &str = "openid pid";

    /// Path on the frontend that receives the provider redirect.
    pub const CALLBACK_PATH: &str = "/auth/callback";

    /// Path on the frontend shown after a successful login.
    pub const DASHBOARD_PATH: &str = "/dashboard";

    /// Request timeout for provider calls.
    pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

    /// Connection timeout.
    pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

    /// Session cookie name.
    pub const SESSION_COOKIE: &str = "thaid_session_v2";

    /// Session cookie lifetime (7 days).
    pub const SESSION_MAX_AGE: Duration = Duration::from_secs(7 * 24 * 3600);

    /// Shortest accepted session secret.
    pub const MIN_SESSION_SECRET_LEN: usize = 32;
}

/// Secrets that ship in sample files and must never reach a running server.
const PLACEHOLDER_SECRETS: &[&str] = &[
    "THAID_CLIENT_ID",
    "THAID_CLIENT_SECRET",
    "your-secret-key-change-in-production",
    "change-me",
    "changeme",
    "secret",
];

/// Relay configuration.
#[derive(Clone)]
pub struct Config {
    /// OAuth client ID registered with ThaID.
    pub client_id: String,

    /// OAuth client secret.
    pub client_secret: String,

    /// Discovery document URL.
    pub well_known_url: String,

    /// Frontend origin, without trailing slash.
    pub frontend_url: String,

    /// Public origin of this service.
    pub backend_url: String,

    /// Secret the cookie signing key is derived from.
    pub session_secret: String,

    /// Force the `Secure` cookie attribute even for a plain-http backend.
    pub secure_cookies: bool,

    /// Request timeout for provider calls.
    pub request_timeout: Duration,

    /// Connection timeout for provider calls.
    pub connect_timeout: Duration,
}

impl Config {
    /// Create a configuration with default URLs and timeouts.
    #[must_use]
    pub fn new(
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
        session_secret: impl Into<String>,
    ) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            well_known_url: defaults::WELL_KNOWN_URL.to_string(),
            frontend_url: defaults::FRONTEND_URL.to_string(),
            backend_url: defaults::BACKEND_URL.to_string(),
            session_secret: session_secret.into(),
            secure_cookies: false,
            request_timeout: defaults::REQUEST_TIMEOUT,
            connect_timeout: defaults::CONNECT_TIMEOUT,
        }
    }

    /// Create a test configuration pointing at a mock provider.
    #[must_use]
    pub fn for_testing(provider_url: &str) -> Self {
        Self {
            client_id: "test-client-id".to_string(),
            client_secret: "test-client-secret".to_string(),
            well_known_url: format!("{provider_url}/.well-known/openid-configuration"),
            frontend_url: "http://frontend.test".to_string(),
            backend_url: "http://backend.test".to_string(),
            session_secret: "test-session-secret-that-is-long-enough-to-sign".to_string(),
            secure_cookies: false,
            request_timeout: Duration::from_secs(5),
            connect_timeout: Duration::from_secs(2),
        }
    }

    /// Check the configuration and normalize URLs.
    ///
    /// # Errors
    ///
    /// Returns the first problem found. Any error here must stop startup.
    pub fn validate(mut self) -> Result<Self, ConfigError> {
        require_secret("THAID_CLIENT_ID", &self.client_id)?;
        require_secret("THAID_CLIENT_SECRET", &self.client_secret)?;
        require_secret("SESSION_SECRET", &self.session_secret)?;

        if self.session_secret.len() < defaults::MIN_SESSION_SECRET_LEN {
            return Err(ConfigError::WeakSessionSecret {
                min: defaults::MIN_SESSION_SECRET_LEN,
                actual: self.session_secret.len(),
            });
        }

        require_url("THAID_WELL_KNOWN_URL", &self.well_known_url)?;
        require_url("FRONTEND_URL", &self.frontend_url)?;
        require_url("BACKEND_URL", &self.backend_url)?;

        self.frontend_url = self.frontend_url.trim_end_matches('/').to_string();
        Ok(self)
    }

    /// Redirect URI sent both in the authorization URL and the token exchange.
    #[must_use]
    pub fn redirect_uri(&self) -> String {
        format!("{}{}", self.frontend_url, defaults::CALLBACK_PATH)
    }

    /// Where the browser lands after the callback endpoint succeeds.
    #[must_use]
    pub fn dashboard_url(&self) -> String {
        format!("{}{}", self.frontend_url, defaults::DASHBOARD_PATH)
    }

    /// Whether session cookies carry the `Secure` attribute.
    #[must_use]
    pub fn cookie_secure(&self) -> bool {
        self.secure_cookies || self.backend_url.starts_with("https://")
    }
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("client_id", &self.client_id)
            .field("well_known_url", &self.well_known_url)
            .field("frontend_url", &self.frontend_url)
            .field("backend_url", &self.backend_url)
            .field("secure_cookies", &self.cookie_secure())
            .field("request_timeout", &self.request_timeout)
            .finish_non_exhaustive()
    }
}

fn require_secret(name: &'static str, value: &str) -> Result<(), ConfigError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(ConfigError::Missing(name));
    }
    if PLACEHOLDER_SECRETS.iter().any(|p| p.eq_ignore_ascii_case(value)) {
        return Err(ConfigError::Placeholder(name));
    }
    Ok(())
}

fn require_url(name: &'static str, value: &str) -> Result<(), ConfigError> {
    Url::parse(value).map(|_| ()).map_err(|source| ConfigError::InvalidUrl { name, source })
}
