//! Shared types for the guestbook: wire-level request/response shapes and
//! the `Identity` model resolved by the session adapter.

pub mod api;
pub mod models;
