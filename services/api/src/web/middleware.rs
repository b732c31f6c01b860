//! services/api/src/web/middleware.rs
//!
//! Authentication middleware for protecting routes.

use axum::{
    extract::{Request, State},
    http::{header, HeaderMap, StatusCode},
    middleware::Next,
    response::Response,
};
use std::sync::Arc;
use tracing::{debug, warn};

use crate::web::{
    state::{AppState, AuthContext},
    token::verify_token,
};

/// Finds the value of the named cookie in the request headers.
pub fn cookie_value<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .find_map(|c| {
            let (key, value) = c.trim().split_once('=')?;
            (key == name).then_some(value)
        })
}

/// Middleware that validates the auth cookie and resolves the live session.
///
/// If valid, inserts an `AuthContext` into request extensions for handlers to use.
/// If the token is missing, invalid, expired, or its session was logged out,
/// returns 401 Unauthorized.
pub async fn require_auth(
    State(state): State<Arc<AppState>>,
    mut req: Request,
    next: Next,
) -> Result<Response, StatusCode> {
    // 1. Extract the token from the auth cookie
    let token =
        cookie_value(req.headers(), &state.cookie.name).ok_or(StatusCode::UNAUTHORIZED)?;

    // 2. Verify signature and expiry
    let claims = verify_token(token, &state.cookie.key).map_err(|e| {
        debug!("Rejected session token: {}", e);
        StatusCode::UNAUTHORIZED
    })?;

    // 3. The session must still exist (logout revokes it)
    let session = state.sessions.get_session(claims.sid).await.map_err(|e| {
        debug!("Session lookup failed: {}", e);
        StatusCode::UNAUTHORIZED
    })?;
    if session.username != claims.sub {
        warn!("Token subject does not match session {}", claims.sid);
        return Err(StatusCode::UNAUTHORIZED);
    }

    // 4. Insert the auth context into request extensions
    req.extensions_mut().insert(AuthContext {
        session_id: session.id,
        username: session.username,
    });

    // 5. Continue to the handler
    Ok(next.run(req).await)
}
