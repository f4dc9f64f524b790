use std::collections::HashMap;

use mongodb::bson::{DateTime, doc, oid::ObjectId, to_bson};
use rocket::State;
use rocket::serde::json::Json;
use rocket_okapi::openapi;

use crate::db::DbConn;
use crate::guards::{AdminGuard, ApprovedProviderGuard};
use crate::models::{Provider, ProviderResponse, RejectProviderDto, Role, UpdateProviderProfileDto};
use crate::utils::{ApiError, ApiResponse, fetch_page, validate_phone};

fn providers(db: &DbConn) -> mongodb::Collection<Provider> {
    db.collection(Role::Provider.collection())
}

fn parse_provider_id(id: &str) -> Result<ObjectId, ApiError> {
    ObjectId::parse_str(id).map_err(|_| ApiError::validation("id", "Invalid provider ID"))
}

async fn find_provider(db: &DbConn, id: ObjectId) -> Result<Provider, ApiError> {
    providers(db)
        .find_one(doc! { "_id": id }, None)
        .await?
        .ok_or_else(|| ApiError::not_found("Provider not found"))
}

// ============================================================================
// ADMIN: LISTINGS & APPROVAL STATE MACHINE
// ============================================================================

#[openapi(tag = "Providers")]
#[get("/providers?<params..>")]
pub async fn get_all_providers(
    db: &State<DbConn>,
    _admin: AdminGuard,
    params: HashMap<String, String>,
) -> Result<ApiResponse<serde_json::Value>, ApiError> {
    let (records, pagination) = fetch_page::<Provider>(
        &providers(db),
        &params,
        &["name", "email", "phone"],
        doc! { "is_approved": true },
    )
    .await?;

    let records: Vec<ProviderResponse> = records.into_iter().map(ProviderResponse::from).collect();

    Ok(ApiResponse::success(serde_json::json!({
        "providers": records,
        "pagination": pagination,
    })))
}

#[openapi(tag = "Providers")]
#[get("/providers/pending?<params..>")]
pub async fn get_pending_providers(
    db: &State<DbConn>,
    _admin: AdminGuard,
    params: HashMap<String, String>,
) -> Result<ApiResponse<serde_json::Value>, ApiError> {
    let (records, pagination) = fetch_page::<Provider>(
        &providers(db),
        &params,
        &["name", "email", "phone"],
        doc! { "is_approved": false },
    )
    .await?;

    let records: Vec<ProviderResponse> = records.into_iter().map(ProviderResponse::from).collect();

    Ok(ApiResponse::success(serde_json::json!({
        "providers": records,
        "pagination": pagination,
    })))
}

#[openapi(tag = "Providers")]
#[get("/providers/<id>")]
pub async fn get_provider_by_id(
    db: &State<DbConn>,
    _admin: AdminGuard,
    id: String,
) -> Result<ApiResponse<serde_json::Value>, ApiError> {
    let provider = find_provider(db, parse_provider_id(&id)?).await?;

    Ok(ApiResponse::success(serde_json::json!({
        "provider": ProviderResponse::from(provider)
    })))
}

#[openapi(tag = "Providers")]
#[put("/providers/<id>/approve")]
pub async fn approve_provider(
    db: &State<DbConn>,
    admin: AdminGuard,
    id: String,
) -> Result<ApiResponse<serde_json::Value>, ApiError> {
    let provider_id = parse_provider_id(&id)?;
    let provider = find_provider(db, provider_id).await?;

    if provider.is_approved {
        return Err(ApiError::conflict("Provider is already approved"));
    }

    providers(db)
        .update_one(
            doc! { "_id": provider_id },
            doc! { "$set": { "is_approved": true, "updated_at": DateTime::now() } },
            None,
        )
        .await?;

    log::info!(
        "admin {} approved provider {}",
        admin.auth.id.to_hex(),
        provider_id.to_hex()
    );

    let provider = find_provider(db, provider_id).await?;

    Ok(ApiResponse::success_with_message(
        "Provider approved successfully",
        serde_json::json!({ "provider": ProviderResponse::from(provider) }),
    ))
}

/// Idempotent: rejecting an already-rejected (or never-approved) provider
/// succeeds. Existing sessions stay valid until expiry; only the approval
/// gate starts refusing them.
#[openapi(tag = "Providers")]
#[put("/providers/<id>/reject", data = "<dto>")]
pub async fn reject_provider(
    db: &State<DbConn>,
    admin: AdminGuard,
    id: String,
    dto: Json<RejectProviderDto>,
) -> Result<ApiResponse<serde_json::Value>, ApiError> {
    let provider_id = parse_provider_id(&id)?;
    find_provider(db, provider_id).await?;

    providers(db)
        .update_one(
            doc! { "_id": provider_id },
            doc! { "$set": { "is_approved": false, "updated_at": DateTime::now() } },
            None,
        )
        .await?;

    log::info!(
        "admin {} rejected provider {}",
        admin.auth.id.to_hex(),
        provider_id.to_hex()
    );

    let provider = find_provider(db, provider_id).await?;

    let reason = dto.reason.clone().filter(|r| !r.is_empty());
    let message = match reason.as_deref() {
        Some(reason) => format!("Provider rejected. Reason: {}", reason),
        None => "Provider rejected successfully".to_string(),
    };

    Ok(ApiResponse::success_with_message(
        message,
        serde_json::json!({
            "provider": ProviderResponse::from(provider),
            "rejection_reason": reason,
        }),
    ))
}

#[openapi(tag = "Providers")]
#[delete("/providers/<id>")]
pub async fn delete_provider(
    db: &State<DbConn>,
    _admin: AdminGuard,
    id: String,
) -> Result<ApiResponse<serde_json::Value>, ApiError> {
    let provider_id = parse_provider_id(&id)?;

    let result = providers(db)
        .delete_one(doc! { "_id": provider_id }, None)
        .await?;

    if result.deleted_count == 0 {
        return Err(ApiError::not_found("Provider not found"));
    }

    Ok(ApiResponse::message_only("Provider deleted successfully"))
}

// ============================================================================
// PUBLIC & SELF-SERVICE
// ============================================================================

/// Lets a rejected-at-registration provider check where they stand without
/// being able to log in.
#[openapi(tag = "Providers")]
#[get("/providers/<id>/approval")]
pub async fn check_approval_status(
    db: &State<DbConn>,
    id: String,
) -> Result<ApiResponse<serde_json::Value>, ApiError> {
    let provider = find_provider(db, parse_provider_id(&id)?).await?;

    Ok(ApiResponse::success(serde_json::json!({
        "is_approved": provider.is_approved
    })))
}

#[openapi(tag = "Providers")]
#[get("/providers/profile")]
pub async fn get_profile(
    db: &State<DbConn>,
    guard: ApprovedProviderGuard,
) -> Result<ApiResponse<serde_json::Value>, ApiError> {
    let provider = find_provider(db, guard.auth.id).await?;

    Ok(ApiResponse::success(serde_json::json!({
        "provider": ProviderResponse::from(provider)
    })))
}

#[openapi(tag = "Providers")]
#[put("/providers/profile", data = "<dto>")]
pub async fn update_profile(
    db: &State<DbConn>,
    guard: ApprovedProviderGuard,
    dto: Json<UpdateProviderProfileDto>,
) -> Result<ApiResponse<serde_json::Value>, ApiError> {
    let mut update_doc = doc! { "updated_at": DateTime::now() };

    if let Some(ref name) = dto.name {
        if name.trim().is_empty() {
            return Err(ApiError::validation("name", "Name cannot be empty"));
        }
        update_doc.insert("name", name.trim());
    }
    if let Some(ref phone) = dto.phone {
        if !validate_phone(phone) {
            return Err(ApiError::validation("phone", "Phone number must be 10 digits"));
        }
        update_doc.insert("phone", phone.as_str());
    }
    if let Some(ref address) = dto.address {
        update_doc.insert("address", address.as_str());
    }
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

    let result = providers(db)
        .update_one(doc! { "_id": guard.auth.id }, doc! { "$set": update_doc }, None)
        .await?;

    if result.matched_count == 0 {
        return Err(ApiError::not_found("Provider not found"));
    }

    let provider = find_provider(db, guard.auth.id).await?;

    Ok(ApiResponse::success_with_message(
        "Profile updated successfully",
        serde_json::json!({ "provider": ProviderResponse::from(provider) }),
    ))
}
