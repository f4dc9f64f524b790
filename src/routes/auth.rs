use mongodb::bson::DateTime;
use rocket::State;
use rocket::serde::json::Json;
use rocket_okapi::openapi;

use crate::db::DbConn;
use crate::guards::BearerToken;
use crate::models::{
    Account, Admin, Availability, Customer, LoginDto, Provider, RegisterDto, Role,
};
use crate::services::{JwtService, TokenBlacklist};
use crate::utils::{ApiError, ApiResponse, validate_email, validate_password, validate_phone};

/// Shared by public registration and the admin create-user route. Validates
/// per-role required fields, enforces email uniqueness within the account
/// kind, hashes the password and inserts the record.
pub(crate) async fn create_account(
    db: &DbConn,
    dto: &RegisterDto,
    role: Role,
) -> Result<serde_json::Value, ApiError> {
    let name = dto
        .name
        .as_deref()
        .map(str::trim)
        .filter(|n| !n.is_empty())
        .ok_or_else(|| ApiError::validation("name", "Name is required"))?;

    let email = dto
        .email
        .as_deref()
        .filter(|e| !e.is_empty())
        .ok_or_else(|| ApiError::validation("email", "Email is required"))?
        .trim()
        .to_lowercase();
    if !validate_email(&email) {
        return Err(ApiError::validation("email", "Invalid email"));
    }

    let password = dto
        .password
        .as_deref()
        .filter(|p| !p.is_empty())
        .ok_or_else(|| ApiError::validation("password", "Password is required"))?;
    if !validate_password(password) {
        return Err(ApiError::validation(
            "password",
            "Password must be 8 to 15 characters",
        ));
    }

    // Emails are unique within an account kind's namespace.
    if Account::find_by_email(db, role, &email).await?.is_some() {
        return Err(ApiError::conflict("Entry with this email already exists"));
    }

    let password_hash = bcrypt::hash(password, bcrypt::DEFAULT_COST)
        .map_err(|_| ApiError::internal_error("Failed to hash password"))?;

    let now = DateTime::now();

    match role {
        Role::Admin => {
            let admin = Admin {
                id: None,
                name: name.to_string(),
                email,
                password: password_hash,
                created_at: now,
                updated_at: now,
            };
            let res = db
                .collection::<Admin>(role.collection())
                .insert_one(&admin, None)
                .await?;

            let mut admin = admin;
            admin.id = res.inserted_id.as_object_id();
            Ok(Account::Admin(admin).into_public_json())
        }
        Role::Provider => {
            let phone = dto
                .phone
                .as_deref()
                .filter(|p| !p.is_empty())
                .ok_or_else(|| ApiError::validation("phone", "Phone is required for providers"))?;
            if !validate_phone(phone) {
                return Err(ApiError::validation("phone", "Phone number must be 10 digits"));
            }

            let address = dto
                .address
                .as_deref()
                .filter(|a| !a.is_empty())
                .ok_or_else(|| {
                    ApiError::validation("address", "Address is required for providers")
                })?;

            let experience_years = dto.experience_years.ok_or_else(|| {
                ApiError::validation(
                    "experience_years",
                    "Experience years is required for providers",
                )
            })?;
            if experience_years < 1 {
                return Err(ApiError::validation(
                    "experience_years",
                    "Minimum 1 year of experience is required",
                ));
            }

            let skills = dto
                .skills
                .as_ref()
                .filter(|s| !s.is_empty())
                .ok_or_else(|| ApiError::validation("skills", "At least one skill is required"))?;

            let provider = Provider {
                id: None,
                name: name.to_string(),
                email,
                password: password_hash,
                phone: phone.to_string(),
                address: address.to_string(),
                experience_years,
                skills: skills.clone(),
                is_approved: false,
                availability_status: Availability::Available,
                rating: 0.0,
                created_at: now,
                updated_at: now,
            };
            let res = db
                .collection::<Provider>(role.collection())
                .insert_one(&provider, None)
                .await?;

            let mut provider = provider;
            provider.id = res.inserted_id.as_object_id();
            Ok(Account::Provider(provider).into_public_json())
        }
        Role::Customer => {
            let phone = dto
                .phone
                .as_deref()
                .filter(|p| !p.is_empty())
                .ok_or_else(|| ApiError::validation("phone", "Phone is required"))?;
            if !validate_phone(phone) {
                return Err(ApiError::validation("phone", "Phone number must be 10 digits"));
            }

            let customer = Customer {
                id: None,
                name: name.to_string(),
                email,
                password: password_hash,
                phone: phone.to_string(),
                address: dto.address.clone().filter(|a| !a.is_empty()),
                is_active: true,
                created_at: now,
                updated_at: now,
            };
            let res = db
                .collection::<Customer>(role.collection())
                .insert_one(&customer, None)
                .await?;

            let mut customer = customer;
            customer.id = res.inserted_id.as_object_id();
            Ok(Account::Customer(customer).into_public_json())
        }
    }
}

#[openapi(tag = "Auth")]
#[post("/register", data = "<dto>")]
pub async fn register(
    db: &State<DbConn>,
    dto: Json<RegisterDto>,
) -> Result<ApiResponse<serde_json::Value>, ApiError> {
    let role = match Role::parse(&dto.role) {
        Some(role @ (Role::Provider | Role::Customer)) => role,
        _ => {
            return Err(ApiError::validation(
                "role",
                "Invalid role. Role must be 'provider' or 'customer'",
            ));
        }
    };

    let user = create_account(db, &dto, role).await?;

    match role {
        Role::Provider => Ok(ApiResponse::created(
            "You registered successfully. Your account is pending admin approval.",
            serde_json::json!({ "user": user }),
        )),
        _ => {
            // Customers are active immediately and get a session right away.
            let id = user["id"]
                .as_str()
                .and_then(|id| mongodb::bson::oid::ObjectId::parse_str(id).ok())
                .ok_or_else(|| ApiError::internal_error("Invalid account ID"))?;
            let token = JwtService::sign(&id, role)
                .map_err(|_| ApiError::internal_error("Failed to issue session token"))?;

            Ok(ApiResponse::created(
                "You registered successfully",
                serde_json::json!({ "user": user, "token": token }),
            ))
        }
    }
}

#[openapi(tag = "Auth")]
#[post("/login", data = "<dto>")]
pub async fn login(
    db: &State<DbConn>,
    dto: Json<LoginDto>,
) -> Result<ApiResponse<serde_json::Value>, ApiError> {
    if dto.email.is_empty() {
        return Err(ApiError::validation("email", "Email is required"));
    }
    if dto.password.is_empty() {
        return Err(ApiError::validation("password", "Password is required"));
    }
    let Some(role) = Role::parse(&dto.role) else {
        return Err(ApiError::validation(
            "role",
            "Invalid role. Role must be 'admin', 'provider', or 'customer'",
        ));
    };

    let email = dto.email.trim().to_lowercase();
    let account = Account::find_by_email(db, role, &email).await?;

    let Some(account) = account else {
        return Err(ApiError::unauthorized("Invalid email or password"));
    };

    let password_ok = bcrypt::verify(&dto.password, account.password_hash()).unwrap_or(false);
    if !password_ok {
        return Err(ApiError::unauthorized("Invalid email or password"));
    }

    if account.is_approved() == Some(false) {
        return Err(ApiError::forbidden(
            "Access denied. Your provider account is pending admin approval.",
        ));
    }

    let id = account
        .id()
        .ok_or_else(|| ApiError::internal_error("Account record has no ID"))?;
    let token = JwtService::sign(&id, role)
        .map_err(|_| ApiError::internal_error("Failed to issue session token"))?;

    log::info!("{} {} logged in", role, id.to_hex());

    Ok(ApiResponse::success_with_message(
        "Login successful",
        serde_json::json!({
            "user": account.into_public_json(),
            "token": token,
        }),
    ))
}

#[openapi(tag = "Auth")]
#[post("/logout")]
pub async fn logout(
    db: &State<DbConn>,
    token: BearerToken,
) -> Result<ApiResponse<serde_json::Value>, ApiError> {
    // Signature must check out, but an elapsed expiry is fine: revoking an
    // almost-dead token is still a valid logout.
    let claims = JwtService::verify_allow_expired(&token.0)
        .map_err(|_| ApiError::bad_request("Invalid token"))?;

    let expires_at = DateTime::from_millis(claims.exp * 1000);

    let newly_revoked = TokenBlacklist::revoke(db, &token.0, expires_at).await?;

    if newly_revoked {
        Ok(ApiResponse::message_only("Logged out successfully"))
    } else {
        Ok(ApiResponse::message_only("Already logged out"))
    }
}
