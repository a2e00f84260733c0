//! ThaID provider client.
//!
//! Provides async HTTP calls to the identity provider:
//! - Discovery of the provider endpoints (once, at startup)
//! - Authorization URL construction
//! - Authorization-code exchange
//! - Token introspection relay
//!
//! One pooled `reqwest::Client` is shared by all requests. Calls are bounded
//! by the configured timeout and never retried.

mod discovery;

pub use discovery::discover;

use axum::body::Bytes;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use reqwest::header::{self, HeaderValue};
use reqwest::{Client, StatusCode};
use url::Url;
use url::form_urlencoded;

use crate::config::{Config, defaults};
use crate::error::{ClientError, ClientResult};
use crate::models::{ProviderMetadata, TokenResponse};

const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";

/// Build the shared HTTP client used for every provider call.
///
/// # Errors
///
/// Returns error if the TLS backend cannot be initialized.
pub fn build_http_client(config: &Config) -> ClientResult<Client> {
    let client = Client::builder()
        .timeout(config.request_timeout)
        .connect_timeout(config.connect_timeout)
        .user_agent(concat!("thaid-relay/", env!("CARGO_PKG_VERSION")))
        .gzip(true)
        .build()?;
    Ok(client)
}

/// Provider response passed back to the caller untouched.
#[derive(Debug, Clone)]
pub struct RelayedResponse {
    /// Provider status code.
    pub status: StatusCode,
    /// Provider `Content-Type`, if it sent one.
    pub content_type: Option<HeaderValue>,
    /// Raw provider body.
    pub body: Bytes,
}

/// Client for one registered ThaID application.
#[derive(Clone)]
pub struct ThaidClient {
    /// HTTP client.
    http: Client,

    /// Endpoints fixed at startup.
    provider: ProviderMetadata,

    /// OAuth client ID.
    client_id: String,

    /// OAuth client secret.
    client_secret: String,

    /// Redirect URI, identical in the authorization URL and the exchange.
    redirect_uri: String,
}

impl ThaidClient {
    /// Create a client from already-loaded provider metadata.
    #[must_use]
    pub fn new(http: Client, config: &Config, provider: ProviderMetadata) -> Self {
        Self {
            http,
            provider,
            client_id: config.client_id.clone(),
            client_secret: config.client_secret.clone(),
            redirect_uri: config.redirect_uri(),
        }
    }

    /// Build the HTTP client and run discovery.
    ///
    /// # Errors
    ///
    /// Returns error if discovery fails. The process must not serve requests then.
    pub async fn connect(config: &Config) -> ClientResult<Self> {
        let http = build_http_client(config)?;
        let provider = discover(&http, &config.well_known_url).await?;
        Ok(Self::new(http, config, provider))
    }

    /// Endpoints loaded at startup.
    #[must_use]
    pub const fn provider(&self) -> &ProviderMetadata {
        &self.provider
    }

    /// Redirect URI registered for this client.
    #[must_use]
    pub fn redirect_uri(&self) -> &str {
        &self.redirect_uri
    }

    /// Authorization URL the browser is sent to for login.
    #[must_use]
    pub fn authorization_url(&self, state: &str) -> Url {
        let mut url = self.provider.authorization_endpoint.clone();
        url.query_pairs_mut()
            .append_pair("client_id", &self.client_id)
            .append_pair("redirect_uri", &self.redirect_uri)
            .append_pair("response_type", "code")
            .append_pair("state", state)
            .append_pair("scope", defaults::SCOPE);
        url
    }

    /// Exchange an authorization code for tokens.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Http`] on transport failure,
    /// [`ClientError::UnexpectedStatus`] when the provider rejects the code and
    /// [`ClientError::Parse`] on a malformed body.
    pub async fn exchange_code(&self, code: &str) -> ClientResult<TokenResponse> {
        let body = form_urlencoded::Serializer::new(String::new())
            .append_pair("grant_type", "authorization_code")
            .append_pair("code", code)
            .append_pair("redirect_uri", &self.redirect_uri)
            .append_pair("client_id", &self.client_id)
            .append_pair("client_secret", &self.client_secret)
            .finish();

        tracing::debug!(
            redirect_uri = %self.redirect_uri,
            client_id_len = self.client_id.len(),
            client_secret_len = self.client_secret.len(),
            "Sending token request"
        );

        let response = self
            .http
            .post(self.provider.token_endpoint.clone())
            .header(header::CONTENT_TYPE, FORM_CONTENT_TYPE)
            .header(header::ACCEPT, "application/json")
            .body(body)
            .send()
            .await?;

        let response = handle_response(response).await?;
        let bytes = response.bytes().await?;
        tracing::debug!(bytes = bytes.len(), "Token endpoint responded");

        let token: TokenResponse = serde_json::from_slice(&bytes)?;
        Ok(token)
    }

    /// Forward an access token to the introspection endpoint.
    ///
    /// Any provider status is a successful relay; only failing to reach the
    /// provider is an error.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Http`] on transport failure.
    pub async fn introspect(&self, token: &str) -> ClientResult<RelayedResponse> {
        let body = form_urlencoded::Serializer::new(String::new())
            .append_pair("token", token)
            .finish();

        let response = self
            .http
            .post(self.provider.introspection_endpoint.clone())
            .header(header::AUTHORIZATION, self.basic_auth())
            .header(header::CONTENT_TYPE, FORM_CONTENT_TYPE)
            .body(body)
            .send()
            .await?;

        let status = response.status();
        let content_type = response.headers().get(header::CONTENT_TYPE).cloned();
        let body = response.bytes().await?;

        tracing::debug!(status = status.as_u16(), bytes = body.len(), "Introspection responded");
        Ok(RelayedResponse { status, content_type, body })
    }

    fn basic_auth(&self) -> String {
        let credentials = format!("{}:{}", self.client_id, self.client_secret);
        format!("Basic {}", STANDARD.encode(credentials))
    }
}

impl std::fmt::Debug for ThaidClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ThaidClient")
            .field("client_id", &self.client_id)
            .field("token_endpoint", &self.provider.token_endpoint.as_str())
            .finish_non_exhaustive()
    }
}

/// Turn a non-success status into [`ClientError::UnexpectedStatus`].
async fn handle_response(response: reqwest::Response) -> ClientResult<reqwest::Response> {
    let status = response.status();

    if status.is_success() {
        return Ok(response);
    }

    let text = response.text().await.unwrap_or_default();
    tracing::warn!(status = status.as_u16(), "Provider returned an error status");
    Err(ClientError::unexpected_status(status.as_u16(), text))
}
