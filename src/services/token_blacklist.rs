use mongodb::bson::{DateTime, doc};
use sha2::{Digest, Sha256};

use crate::db::DbConn;
use crate::models::RevokedToken;

const COLLECTION: &str = "revoked_tokens";

pub struct TokenBlacklist;

impl TokenBlacklist {
    pub fn hash_token(token: &str) -> String {
        hex::encode(Sha256::digest(token.as_bytes()))
    }

    /// Record a logout. Returns false if the token was already revoked.
    pub async fn revoke(
        db: &DbConn,
        token: &str,
        expires_at: DateTime,
    ) -> Result<bool, mongodb::error::Error> {
        let coll = db.collection::<RevokedToken>(COLLECTION);
        let token_hash = Self::hash_token(token);

        let existing = coll.find_one(doc! { "token_hash": &token_hash }, None).await?;
        if existing.is_some() {
            return Ok(false);
        }

        coll.insert_one(
            &RevokedToken {
                id: None,
                token_hash,
                expires_at,
                created_at: DateTime::now(),
            },
            None,
        )
        .await?;

        Ok(true)
    }

    /// A revocation entry only counts while the token it shadows could still
    /// be accepted; stale entries are ignored rather than trusted.
    pub async fn is_revoked(db: &DbConn, token: &str) -> Result<bool, mongodb::error::Error> {
        let coll = db.collection::<RevokedToken>(COLLECTION);
        let entry = coll
            .find_one(
                doc! {
                    "token_hash": Self::hash_token(token),
                    "expires_at": { "$gt": DateTime::now() }
                },
                None,
            )
            .await?;

        Ok(entry.is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hashing_is_deterministic() {
        assert_eq!(
            TokenBlacklist::hash_token("abc.def.ghi"),
            TokenBlacklist::hash_token("abc.def.ghi")
        );
    }

    #[test]
    fn distinct_tokens_hash_apart() {
        assert_ne!(
            TokenBlacklist::hash_token("token-one"),
            TokenBlacklist::hash_token("token-two")
        );
    }

    #[test]
    fn hash_is_hex_sha256() {
        let hash = TokenBlacklist::hash_token("x");
        assert_eq!(hash.len(), 64);
        assert!(hash.chars().all(|c| c.is_ascii_hexdigit()));
    }
}
