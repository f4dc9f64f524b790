use std::collections::HashMap;

use mongodb::bson::{DateTime, doc, oid::ObjectId, to_bson};
use rocket::State;
use rocket::serde::json::Json;
use rocket_okapi::openapi;

use crate::db::DbConn;
use crate::guards::{AdminGuard, AuthGuard};
use crate::models::{
    CreateSubscriptionDto, Provider, Role, Subscription, SubscriptionStatus,
    UpdateSubscriptionDto, effective_status,
};
use crate::utils::{ApiError, ApiResponse, fetch_page};

fn subscriptions(db: &DbConn) -> mongodb::Collection<Subscription> {
    db.collection("subscriptions")
}

fn parse_subscription_id(id: &str) -> Result<ObjectId, ApiError> {
    ObjectId::parse_str(id).map_err(|_| ApiError::validation("id", "Invalid subscription ID"))
}

fn parse_date(field: &str, raw: &str) -> Result<DateTime, ApiError> {
    chrono::DateTime::parse_from_rfc3339(raw)
        .map(|dt| DateTime::from_millis(dt.timestamp_millis()))
        .map_err(|_| ApiError::validation(field, "Invalid date; expected an RFC 3339 timestamp"))
}

async fn find_subscription(db: &DbConn, id: ObjectId) -> Result<Subscription, ApiError> {
    subscriptions(db)
        .find_one(doc! { "_id": id }, None)
        .await?
        .ok_or_else(|| ApiError::not_found("Subscription not found"))
}

/// Compare-and-swap lapse check, run before any write touches a
/// subscription. Only an Active record past its end date matches, so
/// concurrent writers cannot double-apply it.
async fn expire_if_lapsed(db: &DbConn, id: ObjectId) -> Result<(), mongodb::error::Error> {
    let now = DateTime::now();
    subscriptions(db)
        .update_one(
            doc! {
                "_id": id,
                "status": SubscriptionStatus::Active.as_str(),
                "end_date": { "$lte": now },
            },
            doc! { "$set": { "status": SubscriptionStatus::Expired.as_str(), "updated_at": now } },
            None,
        )
        .await?;
    Ok(())
}

/// Admin sees every subscription; a provider only the ones it owns.
#[openapi(tag = "Subscriptions")]
#[get("/subscriptions?<params..>")]
pub async fn get_all_subscriptions(
    db: &State<DbConn>,
    auth: AuthGuard,
    params: HashMap<String, String>,
) -> Result<ApiResponse<serde_json::Value>, ApiError> {
    auth.require_role(&[Role::Admin, Role::Provider])?;

    let default_filter = match auth.role {
        Role::Provider => doc! { "provider_id": auth.id },
        _ => doc! {},
    };

    let (records, pagination) =
        fetch_page::<Subscription>(&subscriptions(db), &params, &[], default_filter).await?;

    Ok(ApiResponse::success(serde_json::json!({
        "subscriptions": records,
        "pagination": pagination,
    })))
}

#[openapi(tag = "Subscriptions")]
#[get("/subscriptions/<id>")]
pub async fn get_subscription_by_id(
    db: &State<DbConn>,
    auth: AuthGuard,
    id: String,
) -> Result<ApiResponse<serde_json::Value>, ApiError> {
    auth.require_role(&[Role::Admin, Role::Provider])?;

    let subscription = find_subscription(db, parse_subscription_id(&id)?).await?;

    // Ownership is an identifier comparison on the fetched record, not a
    // query filter, so a provider cannot probe for foreign IDs.
    if !auth.is_admin() && subscription.provider_id != auth.id {
        return Err(ApiError::forbidden(
            "Access denied. You can only view your own subscription.",
        ));
    }

    Ok(ApiResponse::success(serde_json::json!({
        "subscription": subscription
    })))
}

#[openapi(tag = "Subscriptions")]
#[post("/subscriptions", data = "<dto>")]
pub async fn create_subscription(
    db: &State<DbConn>,
    admin: AdminGuard,
    dto: Json<CreateSubscriptionDto>,
) -> Result<ApiResponse<serde_json::Value>, ApiError> {
    let provider_id = dto
        .provider_id
        .as_deref()
        .filter(|p| !p.is_empty())
        .ok_or_else(|| ApiError::validation("provider_id", "Provider ID is required"))?;
    let provider_id = ObjectId::parse_str(provider_id)
        .map_err(|_| ApiError::validation("provider_id", "Invalid provider ID"))?;

    let plan_name = dto
        .plan_name
        .ok_or_else(|| ApiError::validation("plan_name", "Plan name is required"))?;

    let end_date = dto
        .end_date
        .as_deref()
        .ok_or_else(|| ApiError::validation("end_date", "End date is required"))?;
    let end_date = parse_date("end_date", end_date)?;

    let amount = dto
        .amount
        .ok_or_else(|| ApiError::validation("amount", "Amount is required"))?;
    if amount < 0.0 {
        return Err(ApiError::validation("amount", "Amount cannot be negative"));
    }

    let provider = db
        .collection::<Provider>(Role::Provider.collection())
        .find_one(doc! { "_id": provider_id }, None)
        .await?;
    if provider.is_none() {
        return Err(ApiError::not_found("Provider not found"));
    }

    let now = DateTime::now();
    let subscription = Subscription {
        id: None,
        provider_id,
        plan_name,
        start_date: now,
        end_date,
        renewal_date: None,
        // A backdated end date is expired from the first write.
        status: effective_status(SubscriptionStatus::Active, end_date, now),
        amount,
        created_at: now,
        updated_at: now,
    };

    let result = subscriptions(db).insert_one(&subscription, None).await?;

    let mut subscription = subscription;
    subscription.id = result.inserted_id.as_object_id();

    log::info!(
        "admin {} created subscription for provider {}",
        admin.auth.id.to_hex(),
        provider_id.to_hex()
    );

    Ok(ApiResponse::created(
        "Subscription created successfully",
        serde_json::json!({ "subscription": subscription }),
    ))
}

#[openapi(tag = "Subscriptions")]
#[put("/subscriptions/<id>", data = "<dto>")]
pub async fn update_subscription(
    db: &State<DbConn>,
    _admin: AdminGuard,
    id: String,
    dto: Json<UpdateSubscriptionDto>,
) -> Result<ApiResponse<serde_json::Value>, ApiError> {
    let subscription_id = parse_subscription_id(&id)?;

    expire_if_lapsed(db, subscription_id).await?;

    let subscription = find_subscription(db, subscription_id).await?;

    let mut update_doc = doc! { "updated_at": DateTime::now() };

    if let Some(plan_name) = dto.plan_name {
        let value = to_bson(&plan_name)
            .map_err(|_| ApiError::internal_error("Failed to encode plan name"))?;
        update_doc.insert("plan_name", value);
    }

    let end_date = match dto.end_date.as_deref() {
        Some(raw) => {
            let end_date = parse_date("end_date", raw)?;
            update_doc.insert("end_date", end_date);
            end_date
        }
        None => subscription.end_date,
    };

    if let Some(raw) = dto.renewal_date.as_deref() {
        update_doc.insert("renewal_date", parse_date("renewal_date", raw)?);
    }

    if let Some(amount) = dto.amount {
        if amount < 0.0 {
            return Err(ApiError::validation("amount", "Amount cannot be negative"));
        }
        update_doc.insert("amount", amount);
    }

    // Lazy expiry applies to the document as it will be persisted.
    let requested_status = dto.status.unwrap_or(subscription.status);
    let status = effective_status(requested_status, end_date, DateTime::now());
    update_doc.insert("status", status.as_str());

    subscriptions(db)
        .update_one(
            doc! { "_id": subscription_id },
            doc! { "$set": update_doc },
            None,
        )
        .await?;

    let subscription = find_subscription(db, subscription_id).await?;

    Ok(ApiResponse::success_with_message(
        "Subscription updated successfully",
        serde_json::json!({ "subscription": subscription }),
    ))
}

#[openapi(tag = "Subscriptions")]
#[delete("/subscriptions/<id>")]
pub async fn delete_subscription(
    db: &State<DbConn>,
    _admin: AdminGuard,
    id: String,
) -> Result<ApiResponse<serde_json::Value>, ApiError> {
    let subscription_id = parse_subscription_id(&id)?;

    let result = subscriptions(db)
        .delete_one(doc! { "_id": subscription_id }, None)
        .await?;

    if result.deleted_count == 0 {
        return Err(ApiError::not_found("Subscription not found"));
    }

    Ok(ApiResponse::message_only("Subscription deleted successfully"))
}
