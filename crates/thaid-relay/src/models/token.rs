//! Token endpoint response.

use serde::{Deserialize, Serialize};

/// Tokens returned by a successful authorization-code exchange.
///
/// Lives only for the duration of one request; the relay copies the access
/// token and ID token into the session and drops the rest.
#[derive(Clone, Default, Serialize, Deserialize)]
pub struct TokenResponse {
    /// Bearer token for provider APIs.
    pub access_token: String,

    /// OIDC identity token (JWT).
    #[serde(default)]
    pub id_token: String,

    /// Usually `Bearer`.
    #[serde(default)]
    pub token_type: String,

    /// Access token lifetime in seconds.
    #[serde(default)]
    pub expires_in: u64,

    /// Refresh token, when the provider issues one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,

    /// Granted scopes, space separated.
    #[serde(default)]
    pub scope: String,
}

impl std::fmt::Debug for TokenResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenResponse")
            .field("token_type", &self.token_type)
            .field("expires_in", &self.expires_in)
            .field("scope", &self.scope)
            .field("has_refresh_token", &self.refresh_token.is_some())
            .finish_non_exhaustive()
    }
}
