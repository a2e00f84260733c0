//! Anti-CSRF `state` values.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use rand::RngCore;
use rand::rngs::OsRng;

use crate::error::{AuthError, AuthResult};

/// Random bytes per state value.
pub const STATE_BYTES: usize = 16;

/// Generate an unpredictable state value from the OS CSPRNG.
///
/// 16 bytes encode to 22 URL-safe characters without padding.
#[must_use]
pub fn generate_state() -> String {
    let mut bytes = [0u8; STATE_BYTES];
    OsRng.fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

/// Check the state returned by the provider against the one stored at login.
///
/// An empty returned state, or no pending state in the session (for example a
/// replayed callback), is a missing parameter rather than a mismatch.
pub fn verify_state(stored: Option<&str>, returned: &str) -> AuthResult<()> {
    if returned.is_empty() {
        return Err(AuthError::MissingParameter("state"));
    }
    let Some(stored) = stored else {
        return Err(AuthError::MissingParameter("oauth_state"));
    };
    if stored != returned {
        return Err(AuthError::CsrfMismatch);
    }
    Ok(())
}
