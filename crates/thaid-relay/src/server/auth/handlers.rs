//! Auth endpoint handlers.
//!
//! Every handler that touches the session returns the jar from
//! [`CookieSession::save`] alongside its body. Error paths, including a failed
//! `save`, return no jar, so a failed request never changes the browser's
//! cookie.

use std::sync::Arc;

use axum::{
    Json,
    extract::{
        Query, State,
        rejection::{JsonRejection, QueryRejection},
    },
    http::{HeaderMap, HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use serde::Deserialize;

use super::csrf::{generate_state, verify_state};
use crate::error::{AuthError, AuthResult};
use crate::models::{Claims, decode_id_token};
use crate::server::session::CookieSession;
use crate::server::transport::AppState;

// ─── Login ───────────────────────────────────────────────────────────────────

/// `GET /api/auth/login`
///
/// Store a fresh state in the session and hand the frontend the provider URL.
pub async fn handle_login(
    State(state): State<Arc<AppState>>,
    mut session: CookieSession,
) -> AuthResult<Response> {
    let oauth_state = generate_state();
    let auth_url = state.client.authorization_url(&oauth_state);
    session.set_oauth_state(oauth_state);

    tracing::info!("Issued authorization URL");

    let body = Json(serde_json::json!({ "auth_url": auth_url.as_str() }));
    Ok((session.save()?, body).into_response())
}

// ─── Callback / Exchange ─────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct CallbackQuery {
    #[serde(default)]
    pub code: String,
    #[serde(default)]
    pub state: String,
}

/// `GET /api/auth/callback`
///
/// Direct provider redirect target. Completes the login and sends the browser
/// to the frontend dashboard.
pub async fn handle_callback(
    State(state): State<Arc<AppState>>,
    mut session: CookieSession,
    query: Result<Query<CallbackQuery>, QueryRejection>,
) -> AuthResult<Response> {
    let Query(query) = query.map_err(|rejection| AuthError::InvalidRequest(rejection.body_text()))?;
    complete_login(&state, &mut session, &query.code, &query.state).await?;

    let location = state.config.dashboard_url();
    Ok((session.save()?, (StatusCode::FOUND, [(header::LOCATION, location)])).into_response())
}

#[derive(Debug, Deserialize)]
pub struct ExchangeRequest {
    pub code: String,
    pub state: String,
}

/// `POST /api/auth/exchange`
///
/// Same as the callback, for frontends that receive the redirect themselves
/// and post the code here.
pub async fn handle_exchange(
    State(state): State<Arc<AppState>>,
    mut session: CookieSession,
    payload: Result<Json<ExchangeRequest>, JsonRejection>,
) -> AuthResult<Response> {
    let Json(req) = payload.map_err(|rejection| AuthError::InvalidRequest(rejection.body_text()))?;
    if req.code.is_empty() || req.state.is_empty() {
        return Err(AuthError::InvalidRequest("code and state are required".into()));
    }

    let user = complete_login(&state, &mut session, &req.code, &req.state).await?;

    Ok((
        session.save()?,
        Json(serde_json::json!({
            "message": "Authentication successful",
            "user": user
        })),
    )
        .into_response())
}

/// Validate the state, exchange the code and record the user in the session.
///
/// The session is only mutated once every step has succeeded.
async fn complete_login(
    state: &AppState,
    session: &mut CookieSession,
    code: &str,
    returned_state: &str,
) -> AuthResult<Claims> {
    verify_state(session.get().oauth_state.as_deref(), returned_state)?;

    if code.is_empty() {
        return Err(AuthError::MissingParameter("code"));
    }

    let token = state.client.exchange_code(code).await.map_err(AuthError::TokenExchange)?;
    tracing::debug!(?token, "Received token response");

    let user = decode_id_token(&token.id_token)?.ok_or(AuthError::IdTokenNotJwt)?;
    tracing::info!(claims = user.len(), "User authenticated");

    session.set_authenticated(user.clone(), token.access_token, token.id_token);
    Ok(user)
}

// ─── Session ─────────────────────────────────────────────────────────────────

/// `GET /api/auth/logout`
pub async fn handle_logout(mut session: CookieSession) -> AuthResult<Response> {
    session.clear();
    tracing::info!("Session cleared");

    Ok((session.save()?, Json(serde_json::json!({ "message": "Logged out successfully" })))
        .into_response())
}

/// `GET /api/auth/me`
///
/// Return the stored user and tokens, or 401 when nobody is logged in.
pub async fn handle_me(session: CookieSession) -> AuthResult<Response> {
    let data = session.get();
    let Some(ref user) = data.user else {
        return Err(AuthError::Unauthenticated);
    };

    Ok(Json(serde_json::json!({
        "user": user,
        "access_token": data.access_token,
        "id_token": data.id_token
    }))
    .into_response())
}

// ─── Introspection ───────────────────────────────────────────────────────────

/// `POST /api/auth/introspect`
///
/// Forward the caller's bearer token to the provider and relay the answer as-is.
pub async fn handle_introspect(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> AuthResult<Response> {
    let token = bearer_token(&headers)?;

    let relayed = state.client.introspect(token).await.map_err(AuthError::Introspection)?;

    let content_type = relayed
        .content_type
        .unwrap_or_else(|| HeaderValue::from_static("application/json"));
    let mut response = (relayed.status, relayed.body).into_response();
    response.headers_mut().insert(header::CONTENT_TYPE, content_type);
    Ok(response)
}

/// Extract the token from an `Authorization: <scheme> <token>` header.
///
/// The header must split on single spaces into exactly two parts. The scheme
/// is not checked.
fn bearer_token(headers: &HeaderMap) -> AuthResult<&str> {
    let value = headers.get(header::AUTHORIZATION).ok_or(AuthError::MissingAuthHeader)?;
    let value = value.to_str().map_err(|_| AuthError::MalformedAuthHeader)?;
    if value.is_empty() {
        return Err(AuthError::MissingAuthHeader);
    }

    let mut parts = value.split(' ');
    match (parts.next(), parts.next(), parts.next()) {
        (Some(_scheme), Some(token), None) if !token.is_empty() => Ok(token),
        _ => Err(AuthError::MalformedAuthHeader),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headers(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, value.parse().unwrap());
        headers
    }

    #[test]
    fn test_bearer_token_extracted() {
        assert_eq!(bearer_token(&headers("Bearer abc.def")).unwrap(), "abc.def");
    }

    #[test]
    fn test_missing_header() {
        assert!(matches!(bearer_token(&HeaderMap::new()), Err(AuthError::MissingAuthHeader)));
        assert!(matches!(bearer_token(&headers("")), Err(AuthError::MissingAuthHeader)));
    }

    #[test]
    fn test_wrong_part_count() {
        for value in ["Bearer", "Bearer a b", "Bearer  a", "Bearer "] {
            assert!(
                matches!(bearer_token(&headers(value)), Err(AuthError::MalformedAuthHeader)),
                "{value:?} should be rejected"
            );
        }
    }
}
