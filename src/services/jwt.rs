use jsonwebtoken::{encode, decode, Header, Validation, EncodingKey, DecodingKey};
use serde::{Deserialize, Serialize};
use mongodb::bson::oid::ObjectId;

use crate::models::Role;

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String, // Account ID
    pub role: Role,
    pub exp: i64,
    pub iat: i64,
}

pub struct JwtService;

impl JwtService {
    pub fn sign(account_id: &ObjectId, role: Role) -> Result<String, jsonwebtoken::errors::Error> {
        let expiry = crate::config::Config::jwt_expiry();
        let now = chrono::Utc::now().timestamp();

        let claims = Claims {
            sub: account_id.to_hex(),
            role,
            exp: now + expiry,
            iat: now,
        };

        let secret = crate::config::Config::jwt_secret();
        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
    }

    pub fn verify(token: &str) -> Result<Claims, jsonwebtoken::errors::Error> {
        let secret = crate::config::Config::jwt_secret();

        let token_data = decode::<Claims>(
            token,
            &DecodingKey::from_secret(secret.as_bytes()),
            &Validation::default(),
        )?;

        Ok(token_data.claims)
    }

    /// Signature-checked decode that tolerates an elapsed expiry. Logout must
    /// be able to revoke a token that is about to lapse.
    pub fn verify_allow_expired(token: &str) -> Result<Claims, jsonwebtoken::errors::Error> {
        let secret = crate::config::Config::jwt_secret();

        let mut validation = Validation::default();
        validation.validate_exp = false;
        validation.required_spec_claims.clear();

        let token_data = decode::<Claims>(
            token,
            &DecodingKey::from_secret(secret.as_bytes()),
            &validation,
        )?;

        Ok(token_data.claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonwebtoken::errors::ErrorKind;

    fn expired_token() -> String {
        let now = chrono::Utc::now().timestamp();
        let claims = Claims {
            sub: ObjectId::new().to_hex(),
            role: Role::Customer,
            exp: now - 60,
            iat: now - 120,
        };
        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(crate::config::Config::jwt_secret().as_bytes()),
        )
        .unwrap()
    }

    #[test]
    fn round_trip_preserves_identity_and_role() {
        let id = ObjectId::new();
        let token = JwtService::sign(&id, Role::Provider).unwrap();
        let claims = JwtService::verify(&token).unwrap();
        assert_eq!(claims.sub, id.to_hex());
        assert_eq!(claims.role, Role::Provider);
        assert!(claims.exp > claims.iat);
    }

    #[test]
    fn expired_token_is_rejected() {
        let err = JwtService::verify(&expired_token()).unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::ExpiredSignature));
    }

    #[test]
    fn expired_token_still_decodes_for_logout() {
        let claims = JwtService::verify_allow_expired(&expired_token()).unwrap();
        assert_eq!(claims.role, Role::Customer);
    }

    #[test]
    fn tampered_token_is_rejected() {
        let id = ObjectId::new();
        let token = JwtService::sign(&id, Role::Admin).unwrap();
        let mut tampered = token.clone();
        // Flip a payload character.
        let mid = token.len() / 2;
        tampered.replace_range(mid..mid + 1, if &token[mid..mid + 1] == "a" { "b" } else { "a" });
        assert!(JwtService::verify(&tampered).is_err());
    }

    #[test]
    fn garbage_is_rejected() {
        assert!(JwtService::verify("not-a-token").is_err());
        assert!(JwtService::verify_allow_expired("not-a-token").is_err());
    }
}
