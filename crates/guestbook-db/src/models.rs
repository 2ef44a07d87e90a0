//! Database row types, mapped directly from SQLite rows.
//! Distinct from guestbook-types API models to keep the DB layer independent.

pub struct MessageRow {
    pub id: i64,
    pub text: String,
    pub created_at: String,
    pub owner_id: Option<String>,
}

/// A message joined with its owner's display fields for the feed.
/// Owner fields are None when `owner_id` is null (anonymous-era rows) or
/// the identity row is missing.
pub struct FeedMessageRow {
    pub id: i64,
    pub text: String,
    pub created_at: String,
    pub owner_id: Option<String>,
    pub owner_name: Option<String>,
    pub owner_image: Option<String>,
}

pub struct IdentityRow {
    pub id: String,
    pub name: String,
    pub image: Option<String>,
    pub created_at: String,
}
