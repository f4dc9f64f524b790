use std::collections::HashMap;

use mongodb::bson::{DateTime, doc, oid::ObjectId, to_bson};
use rocket::State;
use rocket::serde::json::Json;
use rocket_okapi::openapi;

use crate::db::DbConn;
use crate::guards::{AdminGuard, AuthGuard};
use crate::models::{
    Account, Customer, CustomerResponse, RegisterDto, Role, UpdateUserDto,
};
use crate::routes::auth::create_account;
use crate::utils::{ApiError, ApiResponse, fetch_page, validate_email, validate_phone};

fn parse_user_id(id: &str) -> Result<ObjectId, ApiError> {
    ObjectId::parse_str(id).map_err(|_| ApiError::validation("id", "Invalid user ID"))
}

/// Resolve which account kind a /users/<id> operation targets. Explicit role
/// wins; otherwise a caller operating on their own record implies their own
/// kind, and an admin touching a foreign record must say which kind it is.
fn resolve_target_role(
    explicit: Option<&str>,
    auth: &AuthGuard,
    target: ObjectId,
) -> Result<Role, ApiError> {
    match explicit {
        Some(raw) => Role::parse(raw).ok_or_else(|| {
            ApiError::validation("role", "Invalid role. Role must be 'admin', 'provider', or 'customer'")
        }),
        None if target == auth.id => Ok(auth.role),
        None if auth.is_admin() => Err(ApiError::validation("role", "Role is required")),
        None => Ok(auth.role),
    }
}

/// Admin-only account creation; any role, including further admins.
#[openapi(tag = "Users")]
#[post("/users", data = "<dto>")]
pub async fn create_user(
    db: &State<DbConn>,
    admin: AdminGuard,
    dto: Json<RegisterDto>,
) -> Result<ApiResponse<serde_json::Value>, ApiError> {
    let Some(role) = Role::parse(&dto.role) else {
        return Err(ApiError::validation(
            "role",
            "Invalid role. Role must be 'admin', 'provider', or 'customer'",
        ));
    };

    let user = create_account(db, &dto, role).await?;

    log::info!(
        "admin {} created {} account {}",
        admin.auth.id.to_hex(),
        role,
        user["id"].as_str().unwrap_or("?")
    );

    let message = match role {
        Role::Admin => "Admin created successfully",
        _ => "User created successfully",
    };
    Ok(ApiResponse::created(message, serde_json::json!({ "user": user })))
}

#[openapi(tag = "Users")]
#[get("/users/<id>?<role>")]
pub async fn get_user(
    db: &State<DbConn>,
    auth: AuthGuard,
    id: String,
    role: Option<String>,
) -> Result<ApiResponse<serde_json::Value>, ApiError> {
    let target = parse_user_id(&id)?;

    if !auth.is_admin() && target != auth.id {
        return Err(ApiError::forbidden("You can only view your own profile"));
    }

    let target_role = resolve_target_role(role.as_deref(), &auth, target)?;

    let account = Account::find_by_role(db, target_role, target)
        .await?
        .ok_or_else(|| ApiError::not_found("User not found"))?;

    Ok(ApiResponse::success(serde_json::json!({
        "user": account.into_public_json()
    })))
}

#[openapi(tag = "Users")]
#[put("/users/<id>", data = "<dto>")]
pub async fn update_user(
    db: &State<DbConn>,
    auth: AuthGuard,
    id: String,
    dto: Json<UpdateUserDto>,
) -> Result<ApiResponse<serde_json::Value>, ApiError> {
    let target = parse_user_id(&id)?;

    if !auth.is_admin() && target != auth.id {
        return Err(ApiError::forbidden("You can only update your own profile"));
    }

    let target_role = resolve_target_role(dto.role.as_deref(), &auth, target)?;

    let mut update_doc = doc! { "updated_at": DateTime::now() };

    if let Some(ref name) = dto.name {
        if name.trim().is_empty() {
            return Err(ApiError::validation("name", "Name cannot be empty"));
        }
        update_doc.insert("name", name.trim());
    }

    if let Some(ref email) = dto.email {
        let email = email.trim().to_lowercase();
        if !validate_email(&email) {
            return Err(ApiError::validation("email", "Invalid email"));
        }
        let holder = Account::find_by_email(db, target_role, &email).await?;
        if holder.as_ref().and_then(Account::id).is_some_and(|id| id != target) {
            return Err(ApiError::conflict("Entry with this email already exists"));
        }
        update_doc.insert("email", email);
    }

    if target_role != Role::Admin {
        if let Some(ref phone) = dto.phone {
            if !validate_phone(phone) {
                return Err(ApiError::validation("phone", "Phone number must be 10 digits"));
            }
            update_doc.insert("phone", phone.as_str());
        }
        if let Some(ref address) = dto.address {
            update_doc.insert("address", address.as_str());
        }
    }

    if target_role == Role::Provider {
        if let Some(experience_years) = dto.experience_years {
            if experience_years < 1 {
                return Err(ApiError::validation(
                    "experience_years",
                    "Minimum 1 year of experience is required",
                ));
            }
            update_doc.insert("experience_years", experience_years);
        }
        if let Some(ref skills) = dto.skills {
            if skills.is_empty() {
                return Err(ApiError::validation("skills", "At least one skill is required"));
            }
            update_doc.insert("skills", skills.clone());
        }
        if let Some(availability) = dto.availability_status {
            let value = to_bson(&availability)
                .map_err(|_| ApiError::internal_error("Failed to encode availability"))?;
            update_doc.insert("availability_status", value);
        }
    }

    if target_role == Role::Customer {
        if let Some(is_active) = dto.is_active {
            update_doc.insert("is_active", is_active);
        }
    }

    let result = db
        .collection::<mongodb::bson::Document>(target_role.collection())
        .update_one(doc! { "_id": target }, doc! { "$set": update_doc }, None)
        .await?;

    if result.matched_count == 0 {
        return Err(ApiError::not_found("User not found"));
    }

    let account = Account::find_by_role(db, target_role, target)
        .await?
        .ok_or_else(|| ApiError::not_found("User not found"))?;

    Ok(ApiResponse::success_with_message(
        "User updated successfully",
        serde_json::json!({ "user": account.into_public_json() }),
    ))
}

#[openapi(tag = "Users")]
#[delete("/users/<id>?<role>")]
pub async fn delete_user(
    db: &State<DbConn>,
    _admin: AdminGuard,
    id: String,
    role: Option<String>,
) -> Result<ApiResponse<serde_json::Value>, ApiError> {
    let target = parse_user_id(&id)?;

    let Some(target_role) = role.as_deref().and_then(Role::parse) else {
        return Err(ApiError::validation("role", "Role is required"));
    };

    let result = db
        .collection::<mongodb::bson::Document>(target_role.collection())
        .delete_one(doc! { "_id": target }, None)
        .await?;

    if result.deleted_count == 0 {
        return Err(ApiError::not_found("User not found"));
    }

    Ok(ApiResponse::message_only("User deleted successfully"))
}

/// Admin view of the customer base.
#[openapi(tag = "Users")]
#[get("/customers?<params..>")]
pub async fn get_all_customers(
    db: &State<DbConn>,
    _admin: AdminGuard,
    params: HashMap<String, String>,
) -> Result<ApiResponse<serde_json::Value>, ApiError> {
    let (customers, pagination) = fetch_page::<Customer>(
        &db.collection(Role::Customer.collection()),
        &params,
        &["name", "email", "phone"],
        doc! {},
    )
    .await?;

    let customers: Vec<CustomerResponse> =
        customers.into_iter().map(CustomerResponse::from).collect();

    Ok(ApiResponse::success(serde_json::json!({
        "customers": customers,
        "pagination": pagination,
    })))
}
