use std::collections::HashMap;

use mongodb::bson::{DateTime, doc, oid::ObjectId, to_bson};
use rocket::State;
use rocket::serde::json::Json;
use rocket_okapi::openapi;

use crate::db::DbConn;
use crate::guards::{AdminGuard, OptionalAuthGuard};
use crate::models::{CreatePriceListDto, PriceList, UpdatePriceListDto, validate_price_fields};
use crate::routes::service::find_service;
use crate::utils::{ApiError, ApiResponse, fetch_page};

fn price_lists(db: &DbConn) -> mongodb::Collection<PriceList> {
    db.collection("price_lists")
}

fn parse_price_list_id(id: &str) -> Result<ObjectId, ApiError> {
    ObjectId::parse_str(id).map_err(|_| ApiError::validation("id", "Invalid price list ID"))
}

async fn find_price_list(db: &DbConn, id: ObjectId) -> Result<PriceList, ApiError> {
    price_lists(db)
        .find_one(doc! { "_id": id }, None)
        .await?
        .ok_or_else(|| ApiError::not_found("Price list not found"))
}

/// Public listing; authenticated admins also see inactive entries.
#[openapi(tag = "Price Lists")]
#[get("/price-lists?<params..>")]
pub async fn get_all_price_lists(
    db: &State<DbConn>,
    auth: OptionalAuthGuard,
    params: HashMap<String, String>,
) -> Result<ApiResponse<serde_json::Value>, ApiError> {
    let default_filter = if auth.is_admin() {
        doc! {}
    } else {
        doc! { "is_active": true }
    };

    let (records, pagination) =
        fetch_page::<PriceList>(&price_lists(db), &params, &["description"], default_filter)
            .await?;

    Ok(ApiResponse::success(serde_json::json!({
        "price_lists": records,
        "pagination": pagination,
    })))
}

#[openapi(tag = "Price Lists")]
#[get("/price-lists/service/<service_id>")]
pub async fn get_price_lists_by_service(
    db: &State<DbConn>,
    service_id: String,
) -> Result<ApiResponse<serde_json::Value>, ApiError> {
    let service_id = ObjectId::parse_str(&service_id)
        .map_err(|_| ApiError::validation("service_id", "Invalid service ID"))?;
    let service = find_service(db, service_id).await?;

    let mut cursor = price_lists(db)
        .find(doc! { "service_id": service_id, "is_active": true }, None)
        .await?;

    let mut records = Vec::new();
    while cursor.advance().await? {
        records.push(cursor.deserialize_current()?);
    }

    Ok(ApiResponse::success(serde_json::json!({
        "service": {
            "id": service.id.map(|id| id.to_hex()),
            "name": service.name,
            "category": service.category,
        },
        "price_lists": records,
    })))
}

#[openapi(tag = "Price Lists")]
#[get("/price-lists/<id>")]
pub async fn get_price_list_by_id(
    db: &State<DbConn>,
    id: String,
) -> Result<ApiResponse<serde_json::Value>, ApiError> {
    let price_list = find_price_list(db, parse_price_list_id(&id)?).await?;

    Ok(ApiResponse::success(serde_json::json!({
        "price_list": price_list
    })))
}

#[openapi(tag = "Price Lists")]
#[post("/price-lists", data = "<dto>")]
pub async fn create_price_list(
    db: &State<DbConn>,
    _admin: AdminGuard,
    dto: Json<CreatePriceListDto>,
) -> Result<ApiResponse<serde_json::Value>, ApiError> {
    let service_id = dto
        .service_id
        .as_deref()
        .filter(|s| !s.is_empty())
        .ok_or_else(|| ApiError::validation("service_id", "Service ID is required"))?;
    let service_id = ObjectId::parse_str(service_id)
        .map_err(|_| ApiError::validation("service_id", "Invalid service ID"))?;

    let price_type = dto
        .price_type
        .ok_or_else(|| ApiError::validation("price_type", "Price type is required"))?;

    find_service(db, service_id).await?;

    validate_price_fields(
        price_type,
        dto.fixed_price,
        dto.unit_price,
        dto.min_price,
        dto.max_price,
    )?;

    let now = DateTime::now();
    let price_list = PriceList {
        id: None,
        service_id,
        price_type,
        fixed_price: dto.fixed_price,
        unit_price: dto.unit_price,
        unit: dto.unit.clone(),
        min_price: dto.min_price,
        max_price: dto.max_price,
        description: dto.description.clone(),
        is_active: dto.is_active.unwrap_or(true),
        created_at: now,
        updated_at: now,
    };

    let result = price_lists(db).insert_one(&price_list, None).await?;

    let mut price_list = price_list;
    price_list.id = result.inserted_id.as_object_id();

    Ok(ApiResponse::created(
        "Price list created successfully",
        serde_json::json!({ "price_list": price_list }),
    ))
}

#[openapi(tag = "Price Lists")]
#[put("/price-lists/<id>", data = "<dto>")]
pub async fn update_price_list(
    db: &State<DbConn>,
    _admin: AdminGuard,
    id: String,
    dto: Json<UpdatePriceListDto>,
) -> Result<ApiResponse<serde_json::Value>, ApiError> {
    let price_list_id = parse_price_list_id(&id)?;
    let existing = find_price_list(db, price_list_id).await?;

    // Validate the merged document, not just the patch.
    let price_type = dto.price_type.unwrap_or(existing.price_type);
    validate_price_fields(
        price_type,
        dto.fixed_price.or(existing.fixed_price),
        dto.unit_price.or(existing.unit_price),
        dto.min_price.or(existing.min_price),
        dto.max_price.or(existing.max_price),
    )?;

    let mut update_doc = doc! { "updated_at": DateTime::now() };

    if let Some(price_type) = dto.price_type {
        let value = to_bson(&price_type)
            .map_err(|_| ApiError::internal_error("Failed to encode price type"))?;
        update_doc.insert("price_type", value);
    }
    if let Some(fixed_price) = dto.fixed_price {
        update_doc.insert("fixed_price", fixed_price);
    }
    if let Some(unit_price) = dto.unit_price {
        update_doc.insert("unit_price", unit_price);
    }
    if let Some(ref unit) = dto.unit {
        update_doc.insert("unit", unit.as_str());
    }
    if let Some(min_price) = dto.min_price {
        update_doc.insert("min_price", min_price);
    }
    if let Some(max_price) = dto.max_price {
        update_doc.insert("max_price", max_price);
    }
    if let Some(ref description) = dto.description {
        update_doc.insert("description", description.as_str());
    }
    if let Some(is_active) = dto.is_active {
        update_doc.insert("is_active", is_active);
    }

    price_lists(db)
        .update_one(doc! { "_id": price_list_id }, doc! { "$set": update_doc }, None)
        .await?;

    let price_list = find_price_list(db, price_list_id).await?;

    Ok(ApiResponse::success_with_message(
        "Price list updated successfully",
        serde_json::json!({ "price_list": price_list }),
    ))
}

#[openapi(tag = "Price Lists")]
#[delete("/price-lists/<id>")]
pub async fn delete_price_list(
    db: &State<DbConn>,
    _admin: AdminGuard,
    id: String,
) -> Result<ApiResponse<serde_json::Value>, ApiError> {
    let price_list_id = parse_price_list_id(&id)?;

    let result = price_lists(db)
        .delete_one(doc! { "_id": price_list_id }, None)
        .await?;

    if result.deleted_count == 0 {
        return Err(ApiError::not_found("Price list not found"));
    }

    Ok(ApiResponse::message_only("Price list deleted successfully"))
}
