//! OpenID provider metadata.

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{ClientError, ClientResult};

/// Endpoints published in the provider's discovery document.
///
/// Loaded once at startup and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderMetadata {
    /// Where the browser is sent to log in.
    pub authorization_endpoint: Url,

    /// Code-for-token exchange endpoint.
    pub token_endpoint: Url,

    /// UserInfo endpoint.
    pub userinfo_endpoint: Url,

    /// RFC 7662 token introspection endpoint.
    pub introspection_endpoint: Url,
}

impl ProviderMetadata {
    /// Reject endpoints the relay cannot call.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::InvalidMetadata`] naming the first non-HTTP endpoint.
    pub fn validate(self) -> ClientResult<Self> {
        for (name, url) in [
            ("authorization_endpoint", &self.authorization_endpoint),
            ("token_endpoint", &self.token_endpoint),
            ("userinfo_endpoint", &self.userinfo_endpoint),
            ("introspection_endpoint", &self.introspection_endpoint),
        ] {
            if !matches!(url.scheme(), "http" | "https") {
                return Err(ClientError::InvalidMetadata(format!(
                    "{name} must be an http(s) URL, got {url}"
                )));
            }
        }
        Ok(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn document(token_endpoint: &str) -> serde_json::Value {
        serde_json::json!({
            "issuer": "https://idp.example",
            "authorization_endpoint": "https://idp.example/authorize",
            "token_endpoint": token_endpoint,
            "userinfo_endpoint": "https://idp.example/userinfo",
            "introspection_endpoint": "https://idp.example/introspect",
            "jwks_uri": "https://idp.example/jwks"
        })
    }

    #[test]
    fn test_parses_and_ignores_unknown_fields() {
        let metadata: ProviderMetadata =
            serde_json::from_value(document("https://idp.example/token")).unwrap();
        assert_eq!(metadata.token_endpoint.as_str(), "https://idp.example/token");
        assert!(metadata.validate().is_ok());
    }

    #[test]
    fn test_relative_endpoint_fails_to_parse() {
        assert!(serde_json::from_value::<ProviderMetadata>(document("/token")).is_err());
    }

    #[test]
    fn test_non_http_endpoint_rejected() {
        let metadata: ProviderMetadata =
            serde_json::from_value(document("ftp://idp.example/token")).unwrap();
        let err = metadata.validate().unwrap_err();
        assert!(err.to_string().contains("token_endpoint"));
    }

    #[test]
    fn test_missing_endpoint_fails_to_parse() {
        let mut doc = document("https://idp.example/token");
        doc.as_object_mut().unwrap().remove("introspection_endpoint");
        assert!(serde_json::from_value::<ProviderMetadata>(doc).is_err());
    }
}
