//! Caller login and session middleware
//!
//! A caller logs in with the shared caller password and receives a session
//! token. Protected routes read it from the `X-Caller-Token` header and hand
//! the verified [`CallerSession`] to handlers as an extension.

use axum::{
    extract::{Path, Request, State},
    middleware::Next,
    response::Response,
    Json,
};
use guild_common::api::{issue_session_token, verify_password, verify_session_token};
use guild_common::db::Caller;
use guild_common::Error;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::db::callers;
use crate::{ApiError, ApiResult, AppState};

/// Header carrying the caller session token
pub const SESSION_HEADER: &str = "x-caller-token";

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub token: String,
    pub caller: Caller,
}

/// POST /api/callers/:caller_id/login
pub async fn login(
    State(state): State<AppState>,
    Path(caller_id): Path<String>,
    Json(payload): Json<LoginRequest>,
) -> ApiResult<Json<LoginResponse>> {
    let caller = callers::find_by_discord_id(&state.db, &caller_id)
        .await?
        .ok_or_else(|| Error::NotFound(format!("caller {}", caller_id)))?;

    if let Err(e) = verify_password(&payload.password, state.caller_password.as_deref()) {
        warn!(caller_id = %caller_id, "Caller login rejected");
        return Err(e.into());
    }

    info!(caller_id = %caller_id, "Caller logged in");
    Ok(Json(LoginResponse {
        token: issue_session_token(&caller.discord_id, state.session_secret)?,
        caller,
    }))
}

/// Session middleware for protected routes
///
/// Returns 401 Unauthorized when the token is missing or invalid.
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = request
        .headers()
        .get(SESSION_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .ok_or_else(|| ApiError::Unauthorized("missing caller session token".to_string()))?;

    let session = verify_session_token(token, state.session_secret).map_err(|e| {
        warn!("Session token rejected: {}", e);
        ApiError::Unauthorized(e.to_string())
    })?;

    request.extensions_mut().insert(session);
    Ok(next.run(request).await)
}
