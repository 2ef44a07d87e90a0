//! Handlers for `/messages`: the public feed plus authenticated create and
//! delete. Ownership comes from the resolved session, never from anything
//! the request carries, so a client cannot act on another user's behalf.

use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Query, State,
    },
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    Json,
};
use chrono::{DateTime, NaiveDateTime, Utc};
use serde::Deserialize;
use tracing::warn;

use guestbook_db::models::{FeedMessageRow, MessageRow};
use guestbook_types::api::{CreateMessageRequest, DeleteResponse, MessageResponse};
use guestbook_types::models::Identity;

use crate::error::ApiError;
use crate::session::resolve_session;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct DeleteQuery {
    /// Kept as a raw string so a malformed id reports through the same
    /// JSON error shape as every other bad input.
    pub id: Option<String>,
}

/// GET /messages — every message, newest first, with the owner's display
/// fields joined in. No authentication: the feed is public.
pub async fn list_messages(
    State(state): State<AppState>,
) -> Result<Json<Vec<MessageResponse>>, ApiError> {
    let db = state.clone();
    let rows = tokio::task::spawn_blocking(move || db.db.list_messages())
        .await
        .map_err(|e| anyhow::anyhow!("blocking task failed: {e}"))??;

    Ok(Json(rows.into_iter().map(feed_row_response).collect()))
}

/// POST /messages — insert a message owned by the caller.
///
/// Session first: an unauthenticated request is 401 before the body is even
/// looked at, and no row is written. The text must be non-empty after
/// trimming but is stored verbatim, untrimmed and uncapped.
pub async fn create_message(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Result<Json<CreateMessageRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let identity = resolve_session(&state, &headers)
        .await?
        .ok_or(ApiError::Unauthorized)?;

    let Ok(Json(req)) = body else {
        return Err(ApiError::InvalidInput(
            "request body must be JSON with a text field".into(),
        ));
    };
    if req.text.trim().is_empty() {
        return Err(ApiError::InvalidInput("text must not be empty".into()));
    }

    let db = state.clone();
    let owner_id = identity.id.clone();
    let row = tokio::task::spawn_blocking(move || db.db.insert_message(&req.text, &owner_id))
        .await
        .map_err(|e| anyhow::anyhow!("blocking task failed: {e}"))??;

    Ok((StatusCode::CREATED, Json(owned_row_response(row, identity))))
}

/// DELETE /messages?id=<id> — remove a message the caller owns.
///
/// The removal is one conditional statement keyed on (id, owner), so the
/// ownership check and the delete share a snapshot and concurrent deletes
/// of the same row cannot both report success. When the statement misses,
/// a follow-up read picks the right error code: 403 if the row belongs to
/// someone else (or to nobody), 404 if it is gone.
pub async fn delete_message(
    State(state): State<AppState>,
    headers: HeaderMap,
    query: Result<Query<DeleteQuery>, QueryRejection>,
) -> Result<Json<DeleteResponse>, ApiError> {
    let identity = resolve_session(&state, &headers)
        .await?
        .ok_or(ApiError::Unauthorized)?;

    let raw_id = query
        .map_err(|_| ApiError::InvalidInput("invalid query string".into()))?
        .0
        .id
        .ok_or_else(|| ApiError::InvalidInput("missing id query parameter".into()))?;
    let id: i64 = raw_id
        .parse()
        .map_err(|_| ApiError::InvalidInput(format!("invalid message id: {raw_id}")))?;

    let db = state.clone();
    let owner_id = identity.id.clone();
    let removed = tokio::task::spawn_blocking(move || db.db.delete_message_owned(id, &owner_id))
        .await
        .map_err(|e| anyhow::anyhow!("blocking task failed: {e}"))??;

    if removed == 1 {
        return Ok(Json(DeleteResponse { success: true }));
    }

    let db = state.clone();
    let owner_in_db = tokio::task::spawn_blocking(move || db.db.get_message_owner(id))
        .await
        .map_err(|e| anyhow::anyhow!("blocking task failed: {e}"))??;

    match owner_in_db {
        Some(owner) if owner.as_deref() != Some(identity.id.as_str()) => Err(ApiError::Forbidden),
        // Gone already, or deleted out from under us between the two
        // statements. Either way the row no longer exists to delete.
        _ => Err(ApiError::NotFound(format!("message {id} not found"))),
    }
}

fn feed_row_response(row: FeedMessageRow) -> MessageResponse {
    MessageResponse {
        id: row.id,
        text: row.text,
        created_at: parse_created_at(&row.created_at, row.id),
        owner_id: row.owner_id,
        owner_name: row.owner_name,
        owner_image: row.owner_image,
    }
}

/// Response for a freshly inserted row: the store only holds the owner id,
/// so the display fields come from the caller's own identity.
fn owned_row_response(row: MessageRow, identity: Identity) -> MessageResponse {
    MessageResponse {
        id: row.id,
        text: row.text,
        created_at: parse_created_at(&row.created_at, row.id),
        owner_id: row.owner_id,
        owner_name: Some(identity.name),
        owner_image: identity.image,
    }
}

fn parse_created_at(raw: &str, id: i64) -> DateTime<Utc> {
    raw.parse::<DateTime<Utc>>()
        .or_else(|_| {
            // SQLite stores timestamps as "YYYY-MM-DD HH:MM:SS" without
            // timezone. Parse as naive UTC and convert.
            NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S").map(|ndt| ndt.and_utc())
        })
        .unwrap_or_else(|e| {
            warn!("Corrupt created_at '{}' on message {}: {}", raw, id, e);
            DateTime::default()
        })
}
