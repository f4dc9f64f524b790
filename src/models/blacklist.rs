use mongodb::bson::{DateTime, oid::ObjectId};
use serde::{Deserialize, Serialize};

/// A revoked-but-unexpired session token, stored as a SHA-256 digest. Entries
/// past `expires_at` are dead weight; lookups ignore them.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct RevokedToken {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub token_hash: String,
    pub expires_at: DateTime,
    pub created_at: DateTime,
}
