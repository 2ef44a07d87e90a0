//! Session adapter: resolves request tokens to identities and manages the
//! session rows the external OAuth flow leaves behind.
//!
//! The handshake itself (provider redirect, code exchange) happens outside
//! this service. What lands here is its output: an identity profile and an
//! opaque session token persisted in the store. Handlers consume exactly
//! one operation, [`resolve_session`], and never trust identity values
//! carried in a request body or query string.

use axum::{
    extract::State,
    http::{header, HeaderMap},
    Json,
};
use chrono::{Duration, Utc};
use uuid::Uuid;

use guestbook_types::api::{DeleteResponse, SessionResponse};
use guestbook_types::models::Identity;

use crate::error::ApiError;
use crate::AppState;

/// Cookie the feed client stores the session token under.
pub const SESSION_COOKIE: &str = "guestbook_session";

/// Matches the original adapter's 30-day session lifetime.
const SESSION_TTL_DAYS: i64 = 30;

/// Timestamp format used for `sessions.expires_at`, comparable against
/// SQLite's `datetime('now')`.
const EXPIRES_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Pull the session token out of a request: `Authorization: Bearer <token>`
/// first, then the session cookie.
pub fn session_token(headers: &HeaderMap) -> Option<String> {
    if let Some(auth) = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
    {
        if let Some(token) = auth.strip_prefix("Bearer ") {
            return Some(token.to_string());
        }
    }

    let cookies = headers.get(header::COOKIE).and_then(|v| v.to_str().ok())?;
    cookies.split(';').find_map(|pair| {
        let (name, value) = pair.trim().split_once('=')?;
        (name == SESSION_COOKIE).then(|| value.to_string())
    })
}

/// Resolve the current request to an authenticated identity, or none.
///
/// Hits the session store on every call: sessions can expire or be revoked
/// between requests, so the result is never cached.
pub async fn resolve_session(
    state: &AppState,
    headers: &HeaderMap,
) -> Result<Option<Identity>, ApiError> {
    let Some(token) = session_token(headers) else {
        return Ok(None);
    };

    let db = state.clone();
    let row = tokio::task::spawn_blocking(move || db.db.resolve_session(&token))
        .await
        .map_err(|e| anyhow::anyhow!("blocking task failed: {e}"))??;

    Ok(row.map(|r| Identity {
        id: r.id,
        name: r.name,
        image: r.image,
    }))
}

/// Persist `identity` (refreshing its profile) and open a session for it,
/// returning the opaque token the client presents on later requests.
///
/// In production this runs as the OAuth callback's final step; tests call
/// it directly to sign their fixtures in.
pub async fn issue_session(state: &AppState, identity: &Identity) -> Result<String, ApiError> {
    let token = Uuid::new_v4().to_string();
    let expires_at = (Utc::now() + Duration::days(SESSION_TTL_DAYS))
        .format(EXPIRES_FORMAT)
        .to_string();

    let db = state.clone();
    let tok = token.clone();
    let identity = identity.clone();
    tokio::task::spawn_blocking(move || {
        db.db
            .upsert_identity(&identity.id, &identity.name, identity.image.as_deref())?;
        db.db.create_session(&tok, &identity.id, &expires_at)
    })
    .await
    .map_err(|e| anyhow::anyhow!("blocking task failed: {e}"))??;

    Ok(token)
}

// -- Handlers --

/// GET /session — session introspection for the feed client, which compares
/// `identity.id` against each row's `owner_id` to decide what it may delete.
pub async fn get_session(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<SessionResponse>, ApiError> {
    let identity = resolve_session(&state, &headers).await?;
    Ok(Json(SessionResponse { identity }))
}

/// DELETE /session — sign out by discarding the presented session row.
///
/// Idempotent: an already-revoked token still reports success, since the
/// session is equally gone either way. Only a request with no token at all
/// is rejected.
pub async fn sign_out(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<DeleteResponse>, ApiError> {
    let Some(token) = session_token(&headers) else {
        return Err(ApiError::Unauthorized);
    };

    let db = state.clone();
    tokio::task::spawn_blocking(move || db.db.delete_session(&token))
        .await
        .map_err(|e| anyhow::anyhow!("blocking task failed: {e}"))??;

    Ok(Json(DeleteResponse { success: true }))
}
