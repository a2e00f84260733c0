//! Error types for the ThaID relay.
//!
//! Uses `thiserror` for structured error handling with automatic `From` implementations.
//! [`AuthError`] is the only type that reaches HTTP clients; it maps itself onto a
//! status code and a `{"error": "..."}` body.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};

/// Invalid or missing startup configuration. Always fatal.
#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    /// A required value is empty.
    #[error("{0} must be set")]
    Missing(&'static str),

    /// A secret still holds a well-known placeholder value.
    #[error("{0} is set to a placeholder value")]
    Placeholder(&'static str),

    /// The session secret is too short to derive a signing key from.
    #[error("SESSION_SECRET must be at least {min} bytes, got {actual}")]
    WeakSessionSecret {
        /// Minimum accepted length
        min: usize,
        /// Length that was supplied
        actual: usize,
    },

    /// A configured URL does not parse.
    #[error("{name} is not a valid absolute URL: {source}")]
    InvalidUrl {
        /// Setting name
        name: &'static str,
        /// Parser error
        #[source]
        source: url::ParseError,
    },
}

/// Errors from calls to the identity provider.
#[derive(thiserror::Error, Debug)]
pub enum ClientError {
    /// HTTP transport error (connection, DNS, TLS, timeout, etc.)
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON parsing error
    #[error("Failed to parse response: {0}")]
    Parse(#[from] serde_json::Error),

    /// Provider answered with a non-success status
    #[error("Unexpected status {status}: {message}")]
    UnexpectedStatus {
        /// HTTP status code
        status: u16,
        /// Response body
        message: String,
    },

    /// Discovery document holds an unusable endpoint
    #[error("Invalid provider metadata: {0}")]
    InvalidMetadata(String),
}

impl ClientError {
    /// Create an unexpected status error.
    #[must_use]
    pub fn unexpected_status(status: u16, message: impl Into<String>) -> Self {
        Self::UnexpectedStatus { status, message: message.into() }
    }

    /// Returns true if the request never got a usable answer from the provider.
    #[must_use]
    pub fn is_transport(&self) -> bool {
        match self {
            Self::Http(err) => !err.is_decode(),
            _ => false,
        }
    }

    /// Returns true if the provider answered but the body could not be decoded.
    #[must_use]
    pub fn is_decode(&self) -> bool {
        match self {
            Self::Http(err) => err.is_decode(),
            Self::Parse(_) | Self::InvalidMetadata(_) => true,
            Self::UnexpectedStatus { .. } => false,
        }
    }
}

/// Errors from decoding an ID token payload.
#[derive(thiserror::Error, Debug)]
pub enum ClaimsError {
    /// Payload segment is not unpadded base64url
    #[error("payload is not valid base64url: {0}")]
    Base64(#[from] base64::DecodeError),

    /// Payload is not a JSON object
    #[error("payload is not a JSON object: {0}")]
    Json(#[from] serde_json::Error),
}

/// Errors surfaced by the auth endpoints.
#[derive(thiserror::Error, Debug)]
pub enum AuthError {
    /// Returned state does not match the one stored at login
    #[error("Invalid state parameter")]
    CsrfMismatch,

    /// A required query parameter or session value is absent
    #[error("Missing required parameter: {0}")]
    MissingParameter(&'static str),

    /// Request body could not be parsed
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Code-for-token exchange failed
    #[error("Failed to exchange token: {0}")]
    TokenExchange(#[source] ClientError),

    /// ID token payload could not be decoded
    #[error("Failed to decode ID token: {0}")]
    IdToken(#[from] ClaimsError),

    /// ID token is not a three-part JWT, so it carries no claims
    #[error("Failed to decode ID token: token has no claims segment")]
    IdTokenNotJwt,

    /// Introspection request to the provider failed
    #[error("Failed to introspect token")]
    Introspection(#[source] ClientError),

    /// Session does not fit in one cookie
    #[error("Failed to store session: {0} bytes exceeds the cookie size limit")]
    SessionTooLarge(usize),

    /// Session could not be serialized
    #[error("Failed to store session")]
    SessionEncode(#[source] serde_json::Error),

    /// No authenticated user in the session
    #[error("Not authenticated")]
    Unauthenticated,

    /// Authorization header absent
    #[error("Missing authorization header")]
    MissingAuthHeader,

    /// Authorization header present but not `<scheme> <token>`
    #[error("Invalid authorization header")]
    MalformedAuthHeader,
}

impl AuthError {
    /// HTTP status for this error.
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::CsrfMismatch | Self::MissingParameter(_) | Self::InvalidRequest(_) => {
                StatusCode::BAD_REQUEST
            }
            Self::Unauthenticated | Self::MissingAuthHeader | Self::MalformedAuthHeader => {
                StatusCode::UNAUTHORIZED
            }
            Self::TokenExchange(_)
            | Self::IdToken(_)
            | Self::IdTokenNotJwt
            | Self::Introspection(_)
            | Self::SessionTooLarge(_)
            | Self::SessionEncode(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            match &self {
                Self::TokenExchange(source) | Self::Introspection(source) => tracing::error!(
                    error = %source,
                    transport = source.is_transport(),
                    decode = source.is_decode(),
                    "Upstream provider call failed"
                ),
                other => tracing::error!(error = %other, "Request failed"),
            }
        } else {
            tracing::debug!(status = status.as_u16(), error = %self, "Request rejected");
        }

        (status, Json(serde_json::json!({ "error": self.to_string() }))).into_response()
    }
}

/// Result type alias for provider client operations.
pub type ClientResult<T> = Result<T, ClientError>;

/// Result type alias for auth handlers.
pub type AuthResult<T> = Result<T, AuthError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_auth_error_status_codes() {
        assert_eq!(AuthError::CsrfMismatch.status(), StatusCode::BAD_REQUEST);
        assert_eq!(AuthError::MissingParameter("code").status(), StatusCode::BAD_REQUEST);
        assert_eq!(AuthError::InvalidRequest("x".into()).status(), StatusCode::BAD_REQUEST);
        assert_eq!(AuthError::Unauthenticated.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(AuthError::MissingAuthHeader.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(AuthError::MalformedAuthHeader.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(AuthError::IdTokenNotJwt.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(AuthError::SessionTooLarge(5000).status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            AuthError::TokenExchange(ClientError::unexpected_status(400, "invalid_grant")).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_token_exchange_message_includes_cause() {
        let err = AuthError::TokenExchange(ClientError::unexpected_status(400, "invalid_grant"));
        let msg = err.to_string();
        assert!(msg.starts_with("Failed to exchange token"));
        assert!(msg.contains("invalid_grant"));
    }

    #[test]
    fn test_client_error_kinds() {
        let parse = ClientError::from(serde_json::from_str::<u8>("nope").unwrap_err());
        assert!(parse.is_decode());
        assert!(!parse.is_transport());

        let status = ClientError::unexpected_status(502, "bad gateway");
        assert!(!status.is_decode());
        assert!(!status.is_transport());
    }
}
