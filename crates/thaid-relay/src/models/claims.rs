//! ID token claim extraction.
//!
//! The payload is read without verifying the JWT signature. Only tokens
//! received directly from the token endpoint are decoded here.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;

use crate::error::ClaimsError;

/// Claim name to JSON value, exactly as found in the token payload.
pub type Claims = serde_json::Map<String, serde_json::Value>;

/// Decode the payload segment of an ID token.
///
/// Returns `Ok(None)` when the token does not have exactly three
/// dot-separated segments; callers decide what a token without claims means.
///
/// # Errors
///
/// Returns [`ClaimsError`] when the payload is not unpadded base64url or
/// does not hold a JSON object.
pub fn decode_id_token(id_token: &str) -> Result<Option<Claims>, ClaimsError> {
    let mut segments = id_token.split('.');
    let (Some(_header), Some(payload), Some(_signature), None) =
        (segments.next(), segments.next(), segments.next(), segments.next())
    else {
        return Ok(None);
    };

    let bytes = URL_SAFE_NO_PAD.decode(payload)?;
    let claims = serde_json::from_slice(&bytes)?;
    Ok(Some(claims))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn token_with(payload: &serde_json::Value) -> String {
        format!("eyJhbGciOiJSUzI1NiJ9.{}.c2ln", URL_SAFE_NO_PAD.encode(payload.to_string()))
    }

    #[test]
    fn test_decodes_payload() {
        let payload = serde_json::json!({"sub": "1234", "pid": "1100000000001", "name": "สมชาย"});
        let claims = decode_id_token(&token_with(&payload)).unwrap().unwrap();
        assert_eq!(serde_json::Value::Object(claims), payload);
    }

    #[test]
    fn test_wrong_segment_count_is_not_an_error() {
        assert!(decode_id_token("").unwrap().is_none());
        assert!(decode_id_token("only-one").unwrap().is_none());
        assert!(decode_id_token("a.b").unwrap().is_none());
        assert!(decode_id_token("a.b.c.d").unwrap().is_none());
    }

    #[test]
    fn test_padded_payload_rejected() {
        // "{}" encodes to "e30" and needs one pad character
        assert!(matches!(decode_id_token("h.e30=.s"), Err(ClaimsError::Base64(_))));
    }

    #[test]
    fn test_non_object_payload_rejected() {
        let token = format!("h.{}.s", URL_SAFE_NO_PAD.encode("[1,2,3]"));
        assert!(matches!(decode_id_token(&token), Err(ClaimsError::Json(_))));
    }

    #[test]
    fn test_signature_is_not_checked() {
        let payload = serde_json::json!({"sub": "x"});
        let token = format!("garbage.{}.garbage", URL_SAFE_NO_PAD.encode(payload.to_string()));
        assert!(decode_id_token(&token).unwrap().is_some());
    }
}
