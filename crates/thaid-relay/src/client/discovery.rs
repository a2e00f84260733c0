//! OpenID provider discovery.
//!
//! Fetches `/.well-known/openid-configuration` once, before the server binds.

use reqwest::Client;

use super::handle_response;
use crate::error::ClientResult;
use crate::models::ProviderMetadata;

/// Fetch and validate the provider's discovery document.
///
/// # Errors
///
/// Returns error on transport failure, non-success status, malformed JSON or
/// unusable endpoint URLs. Callers treat every error as fatal.
pub async fn discover(http: &Client, well_known_url: &str) -> ClientResult<ProviderMetadata> {
    tracing::info!(url = %well_known_url, "Fetching OpenID configuration");

    let response = http.get(well_known_url).send().await?;
    let response = handle_response(response).await?;
    let body = response.bytes().await?;

    let metadata: ProviderMetadata = serde_json::from_slice(&body)?;
    let metadata = metadata.validate()?;

    tracing::info!(
        authorization = %metadata.authorization_endpoint,
        token = %metadata.token_endpoint,
        introspection = %metadata.introspection_endpoint,
        "Loaded OpenID configuration"
    );
    Ok(metadata)
}
