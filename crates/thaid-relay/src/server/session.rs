//! Cookie-backed session store.
//!
//! The whole session lives in one signed, HTTP-only cookie; the server keeps
//! nothing. Values are decoded into [`Session`] when the request arrives and
//! written back by [`CookieSession::save`], which consumes the session so a
//! response can only flush it once.
//!
//! Every write stamps the payload with its issue time. A signed cookie older
//! than [`defaults::SESSION_MAX_AGE`] reads as empty, whatever `Max-Age` the
//! browser kept.

use axum::extract::{FromRef, FromRequestParts};
use axum::http::HeaderMap;
use axum::http::request::Parts;
use axum_extra::extract::cookie::{Cookie, Key, SameSite, SignedCookieJar};
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha512};

use crate::config::defaults;
use crate::error::{AuthError, AuthResult};
use crate::models::Claims;

/// Browsers drop cookies whose name and value exceed this.
const MAX_COOKIE_BYTES: usize = 4096;

/// HMAC prefix of a signed value: 44 base64 chars, each at most 3 bytes once
/// percent-encoded.
const SIGNATURE_OVERHEAD: usize = 44 * 3;

/// Typed session contents.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Session {
    /// Pending anti-CSRF state from the last login.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub oauth_state: Option<String>,

    /// Claims of the authenticated user.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<Claims>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_token: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id_token: Option<String>,

    /// Unix seconds of the last write.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub issued_at: Option<i64>,
}

impl Session {
    /// True when no field is set.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.oauth_state.is_none()
            && self.user.is_none()
            && self.access_token.is_none()
            && self.id_token.is_none()
    }

    /// True when the session was never stamped or is older than the max age.
    #[must_use]
    pub fn is_expired(&self, now: i64) -> bool {
        let max_age = i64::try_from(defaults::SESSION_MAX_AGE.as_secs()).unwrap_or(i64::MAX);
        match self.issued_at {
            Some(issued_at) => now.saturating_sub(issued_at) > max_age,
            None => true,
        }
    }

    fn encode(&self) -> Result<String, serde_json::Error> {
        let json = serde_json::to_vec(self)?;
        Ok(URL_SAFE_NO_PAD.encode(json))
    }

    fn decode(value: &str) -> Option<Self> {
        let bytes = URL_SAFE_NO_PAD.decode(value).ok()?;
        serde_json::from_slice(&bytes).ok()
    }
}

/// Individually deletable session fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionField {
    OAuthState,
    User,
    AccessToken,
    IdToken,
}

/// Signing key and cookie attributes, shared by all requests.
#[derive(Clone)]
pub struct CookieSettings {
    key: Key,
    secure: bool,
}

impl CookieSettings {
    /// Derive the signing key from the configured session secret.
    #[must_use]
    pub fn new(session_secret: &str, secure: bool) -> Self {
        let digest = Sha512::digest(session_secret.as_bytes());
        Self { key: Key::from(digest.as_slice()), secure }
    }

    /// Whether cookies carry the `Secure` attribute.
    #[must_use]
    pub const fn secure(&self) -> bool {
        self.secure
    }

    fn cookie(&self, value: String) -> Cookie<'static> {
        Cookie::build((defaults::SESSION_COOKIE, value))
            .path("/")
            .http_only(true)
            .secure(self.secure)
            .same_site(SameSite::Lax)
            .max_age(max_age())
            .build()
    }

    fn removal(&self) -> Cookie<'static> {
        Cookie::build((defaults::SESSION_COOKIE, "")).path("/").build()
    }
}

impl std::fmt::Debug for CookieSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CookieSettings").field("secure", &self.secure).finish_non_exhaustive()
    }
}

fn max_age() -> time::Duration {
    time::Duration::try_from(defaults::SESSION_MAX_AGE).unwrap_or(time::Duration::WEEK)
}

fn now() -> i64 {
    time::OffsetDateTime::now_utc().unix_timestamp()
}

/// Session for one request.
pub struct CookieSession {
    jar: SignedCookieJar,
    settings: CookieSettings,
    data: Session,
    dirty: bool,
}

impl CookieSession {
    /// Read the session cookie from request headers.
    ///
    /// A missing cookie, a bad signature, an undecodable value or an expired
    /// session all read as an empty session.
    #[must_use]
    pub fn from_headers(headers: &HeaderMap, settings: &CookieSettings) -> Self {
        let jar = SignedCookieJar::from_headers(headers, settings.key.clone());
        let data = match jar.get(defaults::SESSION_COOKIE).map(|c| Session::decode(c.value())) {
            Some(Some(session)) if session.is_expired(now()) => {
                tracing::debug!(issued_at = ?session.issued_at, "Discarding expired session cookie");
                Session::default()
            }
            Some(Some(session)) => session,
            Some(None) => {
                tracing::debug!("Discarding undecodable session cookie");
                Session::default()
            }
            None => Session::default(),
        };

        Self { jar, settings: settings.clone(), data, dirty: false }
    }

    /// Current session values.
    #[must_use]
    pub const fn get(&self) -> &Session {
        &self.data
    }

    /// Store a fresh anti-CSRF state.
    pub fn set_oauth_state(&mut self, state: String) {
        self.data.oauth_state = Some(state);
        self.data.issued_at = Some(now());
        self.dirty = true;
    }

    /// Record a completed login and consume the pending state in the same write.
    pub fn set_authenticated(&mut self, user: Claims, access_token: String, id_token: String) {
        self.data.oauth_state = None;
        self.data.user = Some(user);
        self.data.access_token = Some(access_token);
        self.data.id_token = Some(id_token);
        self.data.issued_at = Some(now());
        self.dirty = true;
    }

    /// Remove one field.
    pub fn delete(&mut self, field: SessionField) {
        let removed = match field {
            SessionField::OAuthState => self.data.oauth_state.take().is_some(),
            SessionField::User => self.data.user.take().is_some(),
            SessionField::AccessToken => self.data.access_token.take().is_some(),
            SessionField::IdToken => self.data.id_token.take().is_some(),
        };
        self.dirty |= removed;
    }

    /// Remove every field.
    pub fn clear(&mut self) {
        self.data = Session::default();
        self.dirty = true;
    }

    /// Commit mutations into the response cookie jar.
    ///
    /// Returns the jar untouched when nothing changed, and a removal cookie
    /// when the session ended up empty.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::SessionTooLarge`] when the signed cookie would
    /// exceed what browsers store, and [`AuthError::SessionEncode`] when the
    /// session cannot be serialized. The response must not report success then.
    pub fn save(self) -> AuthResult<SignedCookieJar> {
        if !self.dirty {
            return Ok(self.jar);
        }

        if self.data.is_empty() {
            return Ok(self.jar.remove(self.settings.removal()));
        }

        let value = self.data.encode().map_err(AuthError::SessionEncode)?;
        let bytes = cookie_size(&value);
        if bytes > MAX_COOKIE_BYTES {
            return Err(AuthError::SessionTooLarge(bytes));
        }

        Ok(self.jar.add(self.settings.cookie(value)))
    }
}

/// Upper bound of the `name=value` pair the browser has to store.
fn cookie_size(value: &str) -> usize {
    defaults::SESSION_COOKIE.len() + 1 + SIGNATURE_OVERHEAD + value.len()
}

impl std::fmt::Debug for CookieSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CookieSession")
            .field("authenticated", &self.data.user.is_some())
            .field("state_pending", &self.data.oauth_state.is_some())
            .field("dirty", &self.dirty)
            .finish_non_exhaustive()
    }
}

impl<S> FromRequestParts<S> for CookieSession
where
    CookieSettings: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let settings = CookieSettings::from_ref(state);
        Ok(Self::from_headers(&parts.headers, &settings))
    }
}

#[cfg(test)]
mod tests {
    use axum::http::header;
    use axum::response::IntoResponse;

    use super::*;

    const SECRET: &str = "unit-test-session-secret-0123456789abcdef";

    fn settings() -> CookieSettings {
        CookieSettings::new(SECRET, true)
    }

    /// Run `save` and return the `Set-Cookie` header values.
    fn set_cookies(session: CookieSession) -> Vec<String> {
        let response = (session.save().unwrap(), ()).into_response();
        response
            .headers()
            .get_all(header::SET_COOKIE)
            .iter()
            .map(|v| v.to_str().unwrap().to_string())
            .collect()
    }

    /// Turn a `Set-Cookie` value into request headers carrying that cookie.
    fn request_headers(set_cookie: &str) -> HeaderMap {
        let pair = set_cookie.split(';').next().unwrap();
        let mut headers = HeaderMap::new();
        headers.insert(header::COOKIE, pair.parse().unwrap());
        headers
    }

    fn claims() -> Claims {
        serde_json::json!({"sub": "u1", "pid": "1100000000001"}).as_object().unwrap().clone()
    }

    #[test]
    fn test_empty_request_reads_empty_session() {
        let session = CookieSession::from_headers(&HeaderMap::new(), &settings());
        assert!(session.get().is_empty());
    }

    #[test]
    fn test_untouched_session_sets_no_cookie() {
        let session = CookieSession::from_headers(&HeaderMap::new(), &settings());
        assert!(set_cookies(session).is_empty());
    }

    #[test]
    fn test_saved_session_reads_back() {
        let mut session = CookieSession::from_headers(&HeaderMap::new(), &settings());
        session.set_oauth_state("state-1".into());
        let cookies = set_cookies(session);
        assert_eq!(cookies.len(), 1);

        let cookie = &cookies[0];
        assert!(cookie.starts_with("thaid_session_v2="));
        assert!(cookie.contains("HttpOnly"));
        assert!(cookie.contains("Secure"));
        assert!(cookie.contains("SameSite=Lax"));
        assert!(cookie.contains("Path=/"));
        assert!(cookie.contains("Max-Age=604800"));

        let session = CookieSession::from_headers(&request_headers(cookie), &settings());
        assert_eq!(session.get().oauth_state.as_deref(), Some("state-1"));
    }

    #[test]
    fn test_authenticate_consumes_state() {
        let mut session = CookieSession::from_headers(&HeaderMap::new(), &settings());
        session.set_oauth_state("state-1".into());
        session.set_authenticated(claims(), "at".into(), "h.p.s".into());

        let data = session.get();
        assert!(data.oauth_state.is_none());
        assert_eq!(data.user.as_ref(), Some(&claims()));
        assert_eq!(data.access_token.as_deref(), Some("at"));
        assert_eq!(data.id_token.as_deref(), Some("h.p.s"));
    }

    #[test]
    fn test_cookie_signed_with_other_secret_is_ignored() {
        let mut session = CookieSession::from_headers(&HeaderMap::new(), &settings());
        session.set_oauth_state("state-1".into());
        let cookies = set_cookies(session);

        let other = CookieSettings::new("a-completely-different-secret-value-here", true);
        let session = CookieSession::from_headers(&request_headers(&cookies[0]), &other);
        assert!(session.get().is_empty());
    }

    #[test]
    fn test_tampered_cookie_is_ignored() {
        let mut session = CookieSession::from_headers(&HeaderMap::new(), &settings());
        session.set_oauth_state("state-1".into());
        let cookies = set_cookies(session);

        let tampered = cookies[0].replacen("thaid_session_v2=", "thaid_session_v2=AAAA", 1);
        let session = CookieSession::from_headers(&request_headers(&tampered), &settings());
        assert!(session.get().is_empty());
    }

    #[test]
    fn test_delete_single_field() {
        let mut session = CookieSession::from_headers(&HeaderMap::new(), &settings());
        session.set_authenticated(claims(), "at".into(), "h.p.s".into());
        session.delete(SessionField::AccessToken);

        assert!(session.get().access_token.is_none());
        assert!(session.get().user.is_some());
    }

    #[test]
    fn test_writes_stamp_issue_time() {
        let mut session = CookieSession::from_headers(&HeaderMap::new(), &settings());
        session.set_oauth_state("state-1".into());
        let issued_at = session.get().issued_at.unwrap();
        assert!((now() - issued_at).abs() < 5);
    }

    #[test]
    fn test_session_older_than_max_age_reads_empty() {
        let eight_days = 8 * 24 * 3600;
        let mut session = CookieSession::from_headers(&HeaderMap::new(), &settings());
        session.set_authenticated(claims(), "at".into(), "h.p.s".into());
        session.data.issued_at = Some(now() - eight_days);
        let cookies = set_cookies(session);
        assert_eq!(cookies.len(), 1, "validly signed cookie is still issued");

        let session = CookieSession::from_headers(&request_headers(&cookies[0]), &settings());
        assert!(session.get().is_empty());
    }

    #[test]
    fn test_session_within_max_age_reads_back() {
        let six_days = 6 * 24 * 3600;
        let mut session = CookieSession::from_headers(&HeaderMap::new(), &settings());
        session.set_oauth_state("state-1".into());
        session.data.issued_at = Some(now() - six_days);
        let cookies = set_cookies(session);

        let session = CookieSession::from_headers(&request_headers(&cookies[0]), &settings());
        assert_eq!(session.get().oauth_state.as_deref(), Some("state-1"));
    }

    #[test]
    fn test_unstamped_session_reads_empty() {
        let mut session = CookieSession::from_headers(&HeaderMap::new(), &settings());
        session.set_oauth_state("state-1".into());
        session.data.issued_at = None;
        let cookies = set_cookies(session);

        let session = CookieSession::from_headers(&request_headers(&cookies[0]), &settings());
        assert!(session.get().is_empty());
    }

    #[test]
    fn test_is_expired_boundary() {
        let max_age = i64::try_from(defaults::SESSION_MAX_AGE.as_secs()).unwrap();
        let session = Session { issued_at: Some(1_000), ..Session::default() };
        assert!(!session.is_expired(1_000 + max_age));
        assert!(session.is_expired(1_000 + max_age + 1));
    }

    #[test]
    fn test_oversized_session_is_refused() {
        let mut big = claims();
        big.insert("blob".into(), serde_json::Value::String("x".repeat(4096)));

        let mut session = CookieSession::from_headers(&HeaderMap::new(), &settings());
        session.set_authenticated(big, "at".into(), "h.p.s".into());
        assert!(matches!(
            session.save(),
            Err(AuthError::SessionTooLarge(bytes)) if bytes > MAX_COOKIE_BYTES
        ));
    }

    #[test]
    fn test_clear_removes_cookie() {
        let mut session = CookieSession::from_headers(&HeaderMap::new(), &settings());
        session.set_authenticated(claims(), "at".into(), "h.p.s".into());
        let cookies = set_cookies(session);

        let mut session = CookieSession::from_headers(&request_headers(&cookies[0]), &settings());
        assert!(session.get().user.is_some());
        session.clear();
        let cookies = set_cookies(session);

        assert_eq!(cookies.len(), 1);
        assert!(cookies[0].starts_with("thaid_session_v2=;"));
        assert!(cookies[0].contains("Max-Age=0"));
    }
}
