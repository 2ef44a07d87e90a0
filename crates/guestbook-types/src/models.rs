use serde::{Deserialize, Serialize};

/// An authenticated user principal, created by the external OAuth flow and
/// persisted by the session adapter.
///
/// The message service never creates or mutates identities; it joins
/// against them for display and compares `id` equality for ownership.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    /// Opaque id assigned by the session adapter.
    pub id: String,
    pub name: String,
    pub image: Option<String>,
}
