use std::collections::HashMap;

use mongodb::bson::{DateTime, doc, oid::ObjectId, to_bson};
use mongodb::options::FindOptions;
use rocket::State;
use rocket::serde::json::Json;
use rocket_okapi::openapi;

use crate::db::DbConn;
use crate::guards::{AdminGuard, OptionalAuthGuard};
use crate::models::{
    CreateServiceDto, Provider, ProviderResponse, Role, Service, ServiceUnit, UpdateServiceDto,
};
use crate::utils::{ApiError, ApiResponse, Pagination, fetch_page, query};

fn services(db: &DbConn) -> mongodb::Collection<Service> {
    db.collection("services")
}

fn parse_service_id(id: &str) -> Result<ObjectId, ApiError> {
    ObjectId::parse_str(id).map_err(|_| ApiError::validation("id", "Invalid service ID"))
}

pub(crate) async fn find_service(db: &DbConn, id: ObjectId) -> Result<Service, ApiError> {
    services(db)
        .find_one(doc! { "_id": id }, None)
        .await?
        .ok_or_else(|| ApiError::not_found("Service not found"))
}

/// Public catalog listing. Only an authenticated admin sees inactive entries.
#[openapi(tag = "Services")]
#[get("/services?<params..>")]
pub async fn get_all_services(
    db: &State<DbConn>,
    auth: OptionalAuthGuard,
    params: HashMap<String, String>,
) -> Result<ApiResponse<serde_json::Value>, ApiError> {
    let default_filter = if auth.is_admin() {
        doc! {}
    } else {
        doc! { "is_active": true }
    };

    let (records, pagination) = fetch_page::<Service>(
        &services(db),
        &params,
        &["name", "description"],
        default_filter,
    )
    .await?;

    Ok(ApiResponse::success(serde_json::json!({
        "services": records,
        "pagination": pagination,
    })))
}

#[openapi(tag = "Services")]
#[get("/services/categories")]
pub async fn get_all_categories(
    db: &State<DbConn>,
) -> Result<ApiResponse<serde_json::Value>, ApiError> {
    let mut categories = services(db)
        .distinct("category", doc! { "is_active": true }, None)
        .await?
        .into_iter()
        .filter_map(|value| value.as_str().map(str::to_string))
        .collect::<Vec<_>>();
    categories.sort();

    Ok(ApiResponse::success(serde_json::json!({
        "count": categories.len(),
        "categories": categories,
    })))
}

#[openapi(tag = "Services")]
#[get("/services/<id>")]
pub async fn get_service_by_id(
    db: &State<DbConn>,
    id: String,
) -> Result<ApiResponse<serde_json::Value>, ApiError> {
    let service = find_service(db, parse_service_id(&id)?).await?;

    Ok(ApiResponse::success(serde_json::json!({ "service": service })))
}

/// Approved providers whose skill set mentions the service.
#[openapi(tag = "Services")]
#[get("/services/<id>/providers?<params..>")]
pub async fn get_providers_by_service(
    db: &State<DbConn>,
    id: String,
    params: HashMap<String, String>,
) -> Result<ApiResponse<serde_json::Value>, ApiError> {
    let service = find_service(db, parse_service_id(&id)?).await?;

    let (page, limit, skip) = query::page_params(&params);

    let filter = doc! {
        "is_approved": true,
        "skills": { "$regex": regex::escape(&service.name), "$options": "i" },
    };

    let find_options = FindOptions::builder()
        .skip(skip)
        .limit(limit)
        .sort(doc! { "rating": -1, "created_at": -1 })
        .build();

    let coll = db.collection::<Provider>(Role::Provider.collection());
    let mut cursor = coll.find(filter.clone(), find_options).await?;

    let mut providers = Vec::new();
    while cursor.advance().await? {
        providers.push(ProviderResponse::from(cursor.deserialize_current()?));
    }

    let total = coll.count_documents(filter, None).await?;

    Ok(ApiResponse::success(serde_json::json!({
        "service": {
            "id": service.id.map(|id| id.to_hex()),
            "name": service.name,
            "category": service.category,
            "base_price": service.base_price,
        },
        "providers": providers,
        "pagination": Pagination::new(page, limit, total),
    })))
}

#[openapi(tag = "Services")]
#[post("/services", data = "<dto>")]
pub async fn create_service(
    db: &State<DbConn>,
    _admin: AdminGuard,
    dto: Json<CreateServiceDto>,
) -> Result<ApiResponse<serde_json::Value>, ApiError> {
    let name = dto
        .name
        .as_deref()
        .map(str::trim)
        .filter(|n| !n.is_empty())
        .ok_or_else(|| ApiError::validation("name", "Service name is required"))?
        .to_lowercase();

    let description = dto
        .description
        .as_deref()
        .filter(|d| !d.is_empty())
        .ok_or_else(|| ApiError::validation("description", "Service description is required"))?;

    let category = dto
        .category
        .ok_or_else(|| ApiError::validation("category", "Service category is required"))?;

    let base_price = dto
        .base_price
        .ok_or_else(|| ApiError::validation("base_price", "Base price is required"))?;
    if base_price < 0.0 {
        return Err(ApiError::validation("base_price", "Base price cannot be negative"));
    }

    // Service names are unique catalog keys.
    let existing = services(db).find_one(doc! { "name": &name }, None).await?;
    if existing.is_some() {
        return Err(ApiError::conflict("Service with this name already exists"));
    }

    let now = DateTime::now();
    let service = Service {
        id: None,
        name,
        description: description.to_string(),
        category,
        base_price,
        unit: dto.unit.unwrap_or(ServiceUnit::Hour),
        is_active: true,
        created_at: now,
        updated_at: now,
    };

    let result = services(db).insert_one(&service, None).await?;

    let mut service = service;
    service.id = result.inserted_id.as_object_id();

    Ok(ApiResponse::created(
        "Service created successfully",
        serde_json::json!({ "service": service }),
    ))
}

#[openapi(tag = "Services")]
#[put("/services/<id>", data = "<dto>")]
pub async fn update_service(
    db: &State<DbConn>,
    _admin: AdminGuard,
    id: String,
    dto: Json<UpdateServiceDto>,
) -> Result<ApiResponse<serde_json::Value>, ApiError> {
    let service_id = parse_service_id(&id)?;
    find_service(db, service_id).await?;

    let mut update_doc = doc! { "updated_at": DateTime::now() };

    if let Some(ref name) = dto.name {
        let name = name.trim().to_lowercase();
        if name.is_empty() {
            return Err(ApiError::validation("name", "Service name is required"));
        }
        let holder = services(db).find_one(doc! { "name": &name }, None).await?;
        if holder.and_then(|s| s.id).is_some_and(|id| id != service_id) {
            return Err(ApiError::conflict("Service with this name already exists"));
        }
        update_doc.insert("name", name);
    }
    if let Some(ref description) = dto.description {
        update_doc.insert("description", description.as_str());
    }
    if let Some(category) = dto.category {
        let value = to_bson(&category)
            .map_err(|_| ApiError::internal_error("Failed to encode category"))?;
        update_doc.insert("category", value);
    }
    if let Some(base_price) = dto.base_price {
        if base_price < 0.0 {
            return Err(ApiError::validation("base_price", "Base price cannot be negative"));
        }
        update_doc.insert("base_price", base_price);
    }
    if let Some(unit) = dto.unit {
        let value =
            to_bson(&unit).map_err(|_| ApiError::internal_error("Failed to encode unit"))?;
        update_doc.insert("unit", value);
    }
    if let Some(is_active) = dto.is_active {
        update_doc.insert("is_active", is_active);
    }

    services(db)
        .update_one(doc! { "_id": service_id }, doc! { "$set": update_doc }, None)
        .await?;

    let service = find_service(db, service_id).await?;

    Ok(ApiResponse::success_with_message(
        "Service updated successfully",
        serde_json::json!({ "service": service }),
    ))
}

#[openapi(tag = "Services")]
#[delete("/services/<id>")]
pub async fn delete_service(
    db: &State<DbConn>,
    _admin: AdminGuard,
    id: String,
) -> Result<ApiResponse<serde_json::Value>, ApiError> {
    let service_id = parse_service_id(&id)?;

    let result = services(db).delete_one(doc! { "_id": service_id }, None).await?;

    if result.deleted_count == 0 {
        return Err(ApiError::not_found("Service not found"));
    }

    Ok(ApiResponse::message_only("Service deleted successfully"))
}
