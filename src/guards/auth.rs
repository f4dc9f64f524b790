use rocket::request::{self, FromRequest, Request, Outcome};
use rocket::http::Status;
use rocket::State;
use mongodb::bson::oid::ObjectId;

// === OpenAPI (compatible with rocket_okapi 0.8.0 / 0.8.1) ===
use rocket_okapi::request::{OpenApiFromRequest, RequestHeaderInput};
use rocket_okapi::r#gen::OpenApiGenerator;

use crate::db::DbConn;
use crate::models::{Account, Role};
use crate::services::{JwtService, TokenBlacklist};
use crate::utils::ApiError;

/// Guard failure detail, stashed request-locally so the 400/401/403 catchers
/// can echo the reason in the response envelope.
pub struct GuardFailure {
    pub message: String,
}

pub fn guard_failure(req: &Request<'_>, message: impl Into<String>) {
    let message = message.into();
    req.local_cache(|| GuardFailure { message });
}

fn fail<T>(req: &Request<'_>, status: Status, message: impl Into<String>) -> request::Outcome<T, ()> {
    guard_failure(req, message);
    Outcome::Error((status, ()))
}

/// Bearer credential: cookie first, Authorization header as fallback.
fn extract_token(req: &Request<'_>) -> Option<String> {
    if let Some(cookie) = req.cookies().get("access_token") {
        return Some(cookie.value().to_string());
    }

    req.headers()
        .get_one("Authorization")
        .map(|header| header.trim_start_matches("Bearer ").trim().to_string())
        .filter(|token| !token.is_empty())
}

/// Authenticated identity context: token validated against the blacklist,
/// signature and expiry, then resolved to a live account with one lookup in
/// the collection the role claim names.
pub struct AuthGuard {
    pub id: ObjectId,
    pub role: Role,
    pub email: String,
    pub name: String,
    /// Only present for providers.
    pub is_approved: Option<bool>,
}

impl AuthGuard {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    /// Role allow-list check for routes open to several roles.
    pub fn require_role(&self, allowed: &[Role]) -> Result<(), ApiError> {
        if allowed.contains(&self.role) {
            return Ok(());
        }
        let wanted = allowed
            .iter()
            .map(|role| role.as_str())
            .collect::<Vec<_>>()
            .join(" or ");
        Err(ApiError::forbidden(format!(
            "Access denied. Required role: {}. Your role: {}.",
            wanted, self.role
        )))
    }
}

#[rocket::async_trait]
impl<'r> FromRequest<'r> for AuthGuard {
    type Error = ();

    async fn from_request(req: &'r Request<'_>) -> request::Outcome<Self, Self::Error> {
        let Some(token) = extract_token(req) else {
            return fail(req, Status::Unauthorized, "Access denied. No token provided.");
        };

        let db = match req.guard::<&State<DbConn>>().await {
            Outcome::Success(db) => db,
            _ => return fail(req, Status::InternalServerError, "Authentication error."),
        };

        match TokenBlacklist::is_revoked(db, &token).await {
            Ok(true) => {
                log::warn!("rejected blacklisted token");
                return fail(
                    req,
                    Status::Unauthorized,
                    "Token has been invalidated. Please log in again.",
                );
            }
            Ok(false) => {}
            Err(e) => {
                log::error!("blacklist lookup failed: {}", e);
                return fail(req, Status::InternalServerError, "Authentication error.");
            }
        }

        let claims = match JwtService::verify(&token) {
            Ok(claims) => claims,
            Err(e) => {
                let message = match e.kind() {
                    jsonwebtoken::errors::ErrorKind::ExpiredSignature => {
                        "Token expired. Please log in again."
                    }
                    _ => "Invalid token.",
                };
                return fail(req, Status::Unauthorized, message);
            }
        };

        let Ok(account_id) = ObjectId::parse_str(&claims.sub) else {
            return fail(req, Status::Unauthorized, "Invalid token.");
        };

        let account = match Account::find_by_role(db, claims.role, account_id).await {
            Ok(account) => account,
            Err(e) => {
                log::error!("identity lookup failed: {}", e);
                return fail(req, Status::InternalServerError, "Authentication error.");
            }
        };

        // Covers accounts deleted after the token was issued.
        let Some(account) = account else {
            return fail(req, Status::Unauthorized, "Invalid token. User not found.");
        };

        Outcome::Success(AuthGuard {
            id: account_id,
            role: claims.role,
            email: account.email().to_string(),
            name: account.name().to_string(),
            is_approved: account.is_approved(),
        })
    }
}

/// Optional variant: listings that widen output for admins resolve the caller
/// if they can, and treat every failure as anonymous access.
pub struct OptionalAuthGuard(pub Option<AuthGuard>);

impl OptionalAuthGuard {
    pub fn is_admin(&self) -> bool {
        self.0.as_ref().map(AuthGuard::is_admin).unwrap_or(false)
    }
}

#[rocket::async_trait]
impl<'r> FromRequest<'r> for OptionalAuthGuard {
    type Error = ();

    async fn from_request(req: &'r Request<'_>) -> request::Outcome<Self, Self::Error> {
        match req.guard::<AuthGuard>().await {
            Outcome::Success(auth) => Outcome::Success(OptionalAuthGuard(Some(auth))),
            _ => Outcome::Success(OptionalAuthGuard(None)),
        }
    }
}

/// The raw credential, for logout. Extraction only; the handler decides what
/// a non-verifiable token means.
pub struct BearerToken(pub String);

#[rocket::async_trait]
impl<'r> FromRequest<'r> for BearerToken {
    type Error = ();

    async fn from_request(req: &'r Request<'_>) -> request::Outcome<Self, Self::Error> {
        match extract_token(req) {
            Some(token) => Outcome::Success(BearerToken(token)),
            None => fail(req, Status::BadRequest, "Token is required."),
        }
    }
}

/// === OpenAPI Integration (Fallback for older versions) ===
/// The guards don't contribute any special header/parameter for docs.
impl<'a> OpenApiFromRequest<'a> for AuthGuard {
    fn from_request_input(
        _gen: &mut OpenApiGenerator,
        _name: String,
        _required: bool,
    ) -> rocket_okapi::Result<RequestHeaderInput> {
        Ok(RequestHeaderInput::None)
    }
}

impl<'a> OpenApiFromRequest<'a> for OptionalAuthGuard {
    fn from_request_input(
        _gen: &mut OpenApiGenerator,
        _name: String,
        _required: bool,
    ) -> rocket_okapi::Result<RequestHeaderInput> {
        Ok(RequestHeaderInput::None)
    }
}

impl<'a> OpenApiFromRequest<'a> for BearerToken {
    fn from_request_input(
        _gen: &mut OpenApiGenerator,
        _name: String,
        _required: bool,
    ) -> rocket_okapi::Result<RequestHeaderInput> {
        Ok(RequestHeaderInput::None)
    }
}
