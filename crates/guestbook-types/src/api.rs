use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::Identity;

// -- Messages --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateMessageRequest {
    pub text: String,
}

/// A feed row: the stored message plus the owner's display fields from the
/// identity join. All three owner fields are null for anonymous-era rows.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageResponse {
    pub id: i64,
    pub text: String,
    pub created_at: DateTime<Utc>,
    pub owner_id: Option<String>,
    pub owner_name: Option<String>,
    pub owner_image: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DeleteResponse {
    pub success: bool,
}

// -- Sessions --

/// Body of `GET /session` — the feed client uses `identity.id` to decide
/// which rows carry a delete control.
#[derive(Debug, Serialize, Deserialize)]
pub struct SessionResponse {
    pub identity: Option<Identity>,
}

// -- Health --

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub time: DateTime<Utc>,
}
