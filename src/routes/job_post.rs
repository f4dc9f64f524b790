use std::collections::HashMap;

use mongodb::bson::{DateTime, doc, oid::ObjectId};
use rocket::State;
use rocket::serde::json::Json;
use rocket_okapi::openapi;

use crate::db::DbConn;
use crate::guards::{AuthGuard, CustomerGuard, ProviderGuard};
use crate::models::{
    Application, ApplicationStatus, CreateJobPostDto, DecisionFailure, JobPost, Role,
    UpdateJobPostDto, classify_decision_failure,
};
use crate::routes::service::find_service;
use crate::utils::{ApiError, ApiResponse, fetch_page};

fn job_posts(db: &DbConn) -> mongodb::Collection<JobPost> {
    db.collection("job_posts")
}

fn parse_post_id(id: &str) -> Result<ObjectId, ApiError> {
    ObjectId::parse_str(id).map_err(|_| ApiError::validation("id", "Invalid job post ID"))
}

async fn find_post(db: &DbConn, id: ObjectId) -> Result<JobPost, ApiError> {
    job_posts(db)
        .find_one(doc! { "_id": id }, None)
        .await?
        .ok_or_else(|| ApiError::not_found("Job post not found"))
}

/// Customers see their own posts; providers and admins see all of them.
#[openapi(tag = "Job Posts")]
#[get("/job-posts?<params..>")]
pub async fn get_all_job_posts(
    db: &State<DbConn>,
    auth: AuthGuard,
    params: HashMap<String, String>,
) -> Result<ApiResponse<serde_json::Value>, ApiError> {
    auth.require_role(&[Role::Admin, Role::Provider, Role::Customer])?;

    let default_filter = match auth.role {
        Role::Customer => doc! { "posted_by": auth.id },
        _ => doc! {},
    };

    let (posts, pagination) = fetch_page::<JobPost>(
        &job_posts(db),
        &params,
        &["title", "description", "location", "duration"],
        default_filter,
    )
    .await?;

    Ok(ApiResponse::success(serde_json::json!({
        "job_posts": posts,
        "pagination": pagination,
    })))
}

#[openapi(tag = "Job Posts")]
#[get("/job-posts/<id>")]
pub async fn get_job_post_by_id(
    db: &State<DbConn>,
    auth: AuthGuard,
    id: String,
) -> Result<ApiResponse<serde_json::Value>, ApiError> {
    let post = find_post(db, parse_post_id(&id)?).await?;

    if auth.role == Role::Customer && post.posted_by != auth.id {
        return Err(ApiError::forbidden("You can only view your own job posts"));
    }

    Ok(ApiResponse::success(serde_json::json!({ "job_post": post })))
}

#[openapi(tag = "Job Posts")]
#[post("/job-posts", data = "<dto>")]
pub async fn create_job_post(
    db: &State<DbConn>,
    customer: CustomerGuard,
    dto: Json<CreateJobPostDto>,
) -> Result<ApiResponse<serde_json::Value>, ApiError> {
    let title = dto
        .title
        .as_deref()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or_else(|| ApiError::validation("title", "Job title is required"))?;

    let description = dto
        .description
        .as_deref()
        .filter(|d| !d.is_empty())
        .ok_or_else(|| ApiError::validation("description", "Job description is required"))?;

    let duration = dto
        .duration
        .as_deref()
        .filter(|d| !d.is_empty())
        .ok_or_else(|| ApiError::validation("duration", "Duration is required"))?;

    let service_id = dto
        .service_id
        .as_deref()
        .filter(|s| !s.is_empty())
        .ok_or_else(|| ApiError::validation("service_id", "Service is required"))?;
    let service_id = ObjectId::parse_str(service_id)
        .map_err(|_| ApiError::validation("service_id", "Invalid service ID"))?;

    // Posts must reference a real catalog entry.
    find_service(db, service_id).await?;

    let now = DateTime::now();
    let post = JobPost {
        id: None,
        title: title.to_string(),
        description: description.to_string(),
        duration: duration.to_string(),
        location: dto.location.clone().filter(|l| !l.is_empty()),
        service_id,
        posted_by: customer.auth.id,
        applications: Vec::new(),
        created_at: now,
        updated_at: now,
    };

    let result = job_posts(db).insert_one(&post, None).await?;

    let mut post = post;
    post.id = result.inserted_id.as_object_id();

    Ok(ApiResponse::created(
        "Job post created successfully",
        serde_json::json!({ "job_post": post }),
    ))
}

#[openapi(tag = "Job Posts")]
#[put("/job-posts/<id>", data = "<dto>")]
pub async fn update_job_post(
    db: &State<DbConn>,
    auth: AuthGuard,
    id: String,
    dto: Json<UpdateJobPostDto>,
) -> Result<ApiResponse<serde_json::Value>, ApiError> {
    let post_id = parse_post_id(&id)?;
    let post = find_post(db, post_id).await?;

    if !auth.is_admin() {
        auth.require_role(&[Role::Customer])?;
        if post.posted_by != auth.id {
            return Err(ApiError::forbidden("You can only update your own job posts"));
        }
    }

    let mut update_doc = doc! { "updated_at": DateTime::now() };

    if let Some(ref title) = dto.title {
        if title.trim().is_empty() {
            return Err(ApiError::validation("title", "Job title is required"));
        }
        update_doc.insert("title", title.trim());
    }
    if let Some(ref description) = dto.description {
        update_doc.insert("description", description.as_str());
    }
    if let Some(ref duration) = dto.duration {
        update_doc.insert("duration", duration.as_str());
    }
    if let Some(ref location) = dto.location {
        update_doc.insert("location", location.as_str());
    }
    if let Some(ref service_id) = dto.service_id {
        let service_id = ObjectId::parse_str(service_id)
            .map_err(|_| ApiError::validation("service_id", "Invalid service ID"))?;
        find_service(db, service_id).await?;
        update_doc.insert("service_id", service_id);
    }

    job_posts(db)
        .update_one(doc! { "_id": post_id }, doc! { "$set": update_doc }, None)
        .await?;

    let post = find_post(db, post_id).await?;

    Ok(ApiResponse::success_with_message(
        "Job post updated successfully",
        serde_json::json!({ "job_post": post }),
    ))
}

/// Apply to a post. The `$ne` filter clause makes the append conditional on
/// the provider not appearing in the applications array yet; two racing
/// applies cannot both match.
#[openapi(tag = "Job Posts")]
#[post("/job-posts/<id>/apply")]
pub async fn apply_to_job_post(
    db: &State<DbConn>,
    provider: ProviderGuard,
    id: String,
) -> Result<ApiResponse<serde_json::Value>, ApiError> {
    let post_id = parse_post_id(&id)?;
    let now = DateTime::now();

    let application = Application {
        id: ObjectId::new(),
        provider_id: provider.auth.id,
        status: ApplicationStatus::Applied,
        applied_at: now,
    };
    let application_doc = mongodb::bson::to_bson(&application)
        .map_err(|_| ApiError::internal_error("Failed to encode application"))?;

    let result = job_posts(db)
        .update_one(
            doc! {
                "_id": post_id,
                "applications.provider_id": { "$ne": provider.auth.id },
            },
            doc! {
                "$push": { "applications": application_doc },
                "$set": { "updated_at": now },
            },
            None,
        )
        .await?;

    if result.matched_count == 0 {
        // Either the post is gone or this provider already applied.
        find_post(db, post_id).await?;
        return Err(ApiError::conflict("You have already applied to this job post"));
    }

    let post = find_post(db, post_id).await?;

    Ok(ApiResponse::success_with_message(
        "Successfully applied to job post",
        serde_json::json!({ "job_post": post }),
    ))
}

/// Approve or reject an application on an owned post. The transition is one
/// conditional write; a miss is then classified against a fresh read.
async fn decide_application(
    db: &DbConn,
    customer: &CustomerGuard,
    post_id: ObjectId,
    application_id: ObjectId,
    target: ApplicationStatus,
) -> Result<ApiResponse<serde_json::Value>, ApiError> {
    let result = job_posts(db)
        .update_one(
            doc! {
                "_id": post_id,
                "posted_by": customer.auth.id,
                "applications": {
                    "$elemMatch": {
                        "_id": application_id,
                        "status": { "$ne": target.as_str() },
                    }
                },
            },
            doc! {
                "$set": {
                    "applications.$.status": target.as_str(),
                    "updated_at": DateTime::now(),
                }
            },
            None,
        )
        .await?;

    if result.matched_count == 0 {
        let post = job_posts(db).find_one(doc! { "_id": post_id }, None).await?;
        return Err(
            match classify_decision_failure(post.as_ref(), customer.auth.id, application_id) {
                DecisionFailure::PostNotFound => ApiError::not_found("Job post not found"),
                DecisionFailure::NotOwner => ApiError::forbidden(
                    "You can only manage applications on your own job posts",
                ),
                DecisionFailure::ApplicationNotFound => {
                    ApiError::not_found("Application not found")
                }
                DecisionFailure::AlreadyInStatus => ApiError::conflict(format!(
                    "Application is already {}",
                    target.as_str().to_lowercase()
                )),
            },
        );
    }

    let post = find_post(db, post_id).await?;

    let message = match target {
        ApplicationStatus::Approved => "Application approved successfully",
        ApplicationStatus::Rejected => "Application rejected successfully",
        ApplicationStatus::Applied => "Application updated successfully",
    };

    Ok(ApiResponse::success_with_message(
        message,
        serde_json::json!({ "job_post": post }),
    ))
}

#[openapi(tag = "Job Posts")]
#[put("/job-posts/<id>/applications/<application_id>/approve")]
pub async fn approve_application(
    db: &State<DbConn>,
    customer: CustomerGuard,
    id: String,
    application_id: String,
) -> Result<ApiResponse<serde_json::Value>, ApiError> {
    let post_id = parse_post_id(&id)?;
    let application_id = ObjectId::parse_str(&application_id)
        .map_err(|_| ApiError::validation("application_id", "Invalid application ID"))?;

    decide_application(db, &customer, post_id, application_id, ApplicationStatus::Approved).await
}

#[openapi(tag = "Job Posts")]
#[put("/job-posts/<id>/applications/<application_id>/reject")]
pub async fn reject_application(
    db: &State<DbConn>,
    customer: CustomerGuard,
    id: String,
    application_id: String,
) -> Result<ApiResponse<serde_json::Value>, ApiError> {
    let post_id = parse_post_id(&id)?;
    let application_id = ObjectId::parse_str(&application_id)
        .map_err(|_| ApiError::validation("application_id", "Invalid application ID"))?;

    decide_application(db, &customer, post_id, application_id, ApplicationStatus::Rejected).await
}

/// Removing a post removes its applications with it; they are embedded.
#[openapi(tag = "Job Posts")]
#[delete("/job-posts/<id>")]
pub async fn delete_job_post(
    db: &State<DbConn>,
    auth: AuthGuard,
    id: String,
) -> Result<ApiResponse<serde_json::Value>, ApiError> {
    let post_id = parse_post_id(&id)?;

    let filter = if auth.is_admin() {
        doc! { "_id": post_id }
    } else {
        auth.require_role(&[Role::Customer])?;
        doc! { "_id": post_id, "posted_by": auth.id }
    };

    let result = job_posts(db).delete_one(filter, None).await?;

    if result.deleted_count == 0 {
        // Missing post and foreign post look the same to the delete; tell
        // them apart for the caller.
        find_post(db, post_id).await?;
        return Err(ApiError::forbidden("You can only delete your own job posts"));
    }

    Ok(ApiResponse::message_only("Job post deleted successfully"))
}
