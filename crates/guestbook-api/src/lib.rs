//! HTTP layer for the guestbook: message handlers, session resolution, and
//! the error-to-response mapping.
//!
//! Every handler is stateless between requests; the only shared resource is
//! the database handle carried in [`AppState`]. Blocking store calls run on
//! the tokio blocking pool so the connection lock is never held across an
//! await on the async runtime.

pub mod error;
pub mod health;
pub mod messages;
pub mod session;

use std::sync::Arc;

use axum::{routing::get, Router};

use guestbook_db::Database;

pub use error::ApiError;

pub type AppState = Arc<AppStateInner>;

/// Process-wide dependencies, constructed once in `main` and shared by
/// every handler.
pub struct AppStateInner {
    pub db: Database,
}

/// Build the full API router for `state`.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route(
            "/messages",
            get(messages::list_messages)
                .post(messages::create_message)
                .delete(messages::delete_message),
        )
        .route(
            "/session",
            get(session::get_session).delete(session::sign_out),
        )
        .route("/health", get(health::health))
        .with_state(state)
}
