//! services/api/src/web/auth.rs
//!
//! Authentication endpoints for login and logout.

use axum::{
    extract::State,
    http::{header, StatusCode},
    response::IntoResponse,
    Extension, Json,
};
use chrono::{DateTime, Duration, Utc};
use coursegen_core::{
    domain::{LoginOutcome, Session},
    ports::{CredentialStore, PortError, PortResult},
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info, warn};
use utoipa::ToSchema;

use crate::password::{self, DUMMY_HASH};
use crate::web::{
    state::{AppState, AuthContext},
    token::issue_token,
};

//=========================================================================================
// Request/Response Types
//=========================================================================================

#[derive(Deserialize, ToSchema)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Serialize, ToSchema)]
pub struct AuthResponse {
    pub username: String,
    pub name: String,
    pub expires_at: DateTime<Utc>,
}

//=========================================================================================
// Credential Check
//=========================================================================================

/// Checks a submitted username/password pair against the stored credentials.
///
/// Unknown usernames are checked against a dummy hash, so they take as long
/// to reject as a wrong password.
pub fn authenticate(
    credentials: &dyn CredentialStore,
    username: &str,
    password: &str,
) -> PortResult<LoginOutcome> {
    let user = match credentials.get_user_by_username(username) {
        Ok(user) => user,
        Err(PortError::NotFound(_)) => {
            let _ = password::verify(password, DUMMY_HASH);
            return Ok(LoginOutcome::UnknownUser);
        }
        Err(e) => return Err(e),
    };

    let valid = password::verify(password, &user.hashed_password)
        .map_err(|e| PortError::Unexpected(format!("Stored password hash is invalid: {}", e)))?;

    if valid {
        Ok(LoginOutcome::Authenticated {
            username: user.username,
            display_name: user.display_name,
        })
    } else {
        Ok(LoginOutcome::Unauthenticated)
    }
}

fn session_cookie(name: &str, value: &str, max_age_seconds: i64) -> String {
    format!(
        "{}={}; HttpOnly; Secure; SameSite=Lax; Path=/; Max-Age={}",
        name, value, max_age_seconds
    )
}

//=========================================================================================
// Handlers
//=========================================================================================

/// POST /auth/login - Login with a configured account
#[utoipa::path(
    post,
    path = "/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login successful", body = AuthResponse),
        (status = 400, description = "Username or password missing"),
        (status = 401, description = "Invalid credentials"),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn login_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<LoginRequest>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    if req.username.trim().is_empty() || req.password.is_empty() {
        return Err((
            StatusCode::BAD_REQUEST,
            "Please enter your username and password".to_string(),
        ));
    }

    // 1. Check the credentials
    let outcome = authenticate(state.credentials.as_ref(), req.username.trim(), &req.password)
        .map_err(|e| {
            error!("Failed to check credentials: {:?}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, "Authentication error".to_string())
        })?;

    let (username, display_name) = match outcome {
        LoginOutcome::Authenticated {
            username,
            display_name,
        } => (username, display_name),
        LoginOutcome::UnknownUser => {
            warn!("Login attempt for unknown user");
            return Err((
                StatusCode::UNAUTHORIZED,
                "Username/password is incorrect".to_string(),
            ));
        }
        LoginOutcome::Unauthenticated => {
            warn!("Login attempt with wrong password for '{}'", req.username.trim());
            return Err((
                StatusCode::UNAUTHORIZED,
                "Username/password is incorrect".to_string(),
            ));
        }
    };

    // 2. Create the session
    let ttl = Duration::days(i64::from(state.cookie.expiry_days));
    let session = Session::new(&username, &display_name, ttl);
    let (session_id, expires_at) = (session.id, session.expires_at);
    state.sessions.create_session(session).await.map_err(|e| {
        error!("Failed to create session: {:?}", e);
        (StatusCode::INTERNAL_SERVER_ERROR, "Failed to create session".to_string())
    })?;

    // 3. Sign the session token
    let token = issue_token(&username, session_id, expires_at, &state.cookie.key).map_err(|e| {
        error!("Failed to sign session token: {:?}", e);
        (StatusCode::INTERNAL_SERVER_ERROR, "Failed to create session".to_string())
    })?;

    info!("User '{}' logged in (session {})", username, session_id);

    // 4. Return response with cookie
    let cookie = session_cookie(&state.cookie.name, &token, ttl.num_seconds());
    let response = AuthResponse {
        username,
        name: display_name,
        expires_at,
    };

    Ok((StatusCode::OK, [(header::SET_COOKIE, cookie)], Json(response)))
}

/// POST /auth/logout - Logout and drop the session
#[utoipa::path(
    post,
    path = "/auth/logout",
    responses(
        (status = 200, description = "Logout successful"),
        (status = 401, description = "No active session")
    )
)]
pub async fn logout_handler(
    State(state): State<Arc<AppState>>,
    Extension(ctx): Extension<AuthContext>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    match state.sessions.delete_session(ctx.session_id).await {
        // Already gone counts as logged out.
        Ok(()) | Err(PortError::NotFound(_)) => {}
        Err(e) => {
            error!("Failed to delete session: {:?}", e);
            return Err((StatusCode::INTERNAL_SERVER_ERROR, "Failed to logout".to_string()));
        }
    }
    info!("User '{}' logged out (session {})", ctx.username, ctx.session_id);

    let cookie = session_cookie(&state.cookie.name, "", 0);
    Ok((StatusCode::OK, [(header::SET_COOKIE, cookie)]))
}
