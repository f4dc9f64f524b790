use std::collections::HashMap;

use mongodb::bson::{DateTime, doc, oid::ObjectId};
use rocket::State;
use rocket::serde::json::Json;
use rocket_okapi::openapi;

use crate::db::DbConn;
use crate::guards::AuthGuard;
use crate::models::{
    CreateReviewDto, Customer, Provider, Review, Role, UpdateReviewDto, aggregate_rating,
    valid_rating,
};
use crate::utils::{ApiError, ApiResponse, fetch_page};

fn reviews(db: &DbConn) -> mongodb::Collection<Review> {
    db.collection("reviews")
}

fn parse_review_id(id: &str) -> Result<ObjectId, ApiError> {
    ObjectId::parse_str(id).map_err(|_| ApiError::validation("id", "Invalid review ID"))
}

async fn find_review(db: &DbConn, id: ObjectId) -> Result<Review, ApiError> {
    reviews(db)
        .find_one(doc! { "_id": id }, None)
        .await?
        .ok_or_else(|| ApiError::not_found("Review not found"))
}

/// A review belongs to the party it names for the caller's role; admins own
/// them all.
fn can_modify(auth: &AuthGuard, review: &Review) -> bool {
    match auth.role {
        Role::Admin => true,
        Role::Customer => review.customer_id == auth.id,
        Role::Provider => review.provider_id == auth.id,
    }
}

/// Keep the provider's aggregate rating in step with its reviews.
async fn recompute_provider_rating(db: &DbConn, provider_id: ObjectId) -> Result<(), ApiError> {
    let mut cursor = reviews(db)
        .find(doc! { "provider_id": provider_id }, None)
        .await?;

    let mut ratings = Vec::new();
    while cursor.advance().await? {
        ratings.push(cursor.deserialize_current()?.rating);
    }

    db.collection::<Provider>(Role::Provider.collection())
        .update_one(
            doc! { "_id": provider_id },
            doc! { "$set": { "rating": aggregate_rating(&ratings), "updated_at": DateTime::now() } },
            None,
        )
        .await?;

    Ok(())
}

#[openapi(tag = "Reviews")]
#[get("/reviews?<params..>")]
pub async fn get_all_reviews(
    db: &State<DbConn>,
    params: HashMap<String, String>,
) -> Result<ApiResponse<serde_json::Value>, ApiError> {
    let (records, pagination) =
        fetch_page::<Review>(&reviews(db), &params, &["comment"], doc! {}).await?;

    Ok(ApiResponse::success(serde_json::json!({
        "reviews": records,
        "pagination": pagination,
    })))
}

#[openapi(tag = "Reviews")]
#[get("/reviews/<id>")]
pub async fn get_review_by_id(
    db: &State<DbConn>,
    id: String,
) -> Result<ApiResponse<serde_json::Value>, ApiError> {
    let review = find_review(db, parse_review_id(&id)?).await?;

    Ok(ApiResponse::success(serde_json::json!({ "review": review })))
}

/// Customers review providers; providers review customers. The caller's own
/// side of the pair comes from the session, never the body.
#[openapi(tag = "Reviews")]
#[post("/reviews", data = "<dto>")]
pub async fn create_review(
    db: &State<DbConn>,
    auth: AuthGuard,
    dto: Json<CreateReviewDto>,
) -> Result<ApiResponse<serde_json::Value>, ApiError> {
    auth.require_role(&[Role::Customer, Role::Provider])?;

    let (provider_id, customer_id) = match auth.role {
        Role::Customer => {
            let provider_id = dto
                .provider_id
                .as_deref()
                .filter(|p| !p.is_empty())
                .ok_or_else(|| ApiError::validation("provider_id", "Provider ID is required"))?;
            let provider_id = ObjectId::parse_str(provider_id)
                .map_err(|_| ApiError::validation("provider_id", "Invalid provider ID"))?;
            (provider_id, auth.id)
        }
        _ => {
            let customer_id = dto
                .customer_id
                .as_deref()
                .filter(|c| !c.is_empty())
                .ok_or_else(|| ApiError::validation("customer_id", "Customer ID is required"))?;
            let customer_id = ObjectId::parse_str(customer_id)
                .map_err(|_| ApiError::validation("customer_id", "Invalid customer ID"))?;
            (auth.id, customer_id)
        }
    };

    let rating = dto
        .rating
        .ok_or_else(|| ApiError::validation("rating", "Rating is required"))?;
    if !valid_rating(rating) {
        return Err(ApiError::validation("rating", "Rating must be between 1 and 5"));
    }

    let comment = dto
        .comment
        .as_deref()
        .filter(|c| !c.is_empty())
        .ok_or_else(|| ApiError::validation("comment", "Comment is required"))?;

    let provider = db
        .collection::<Provider>(Role::Provider.collection())
        .find_one(doc! { "_id": provider_id }, None)
        .await?;
    if provider.is_none() {
        return Err(ApiError::not_found("Provider not found"));
    }

    let customer = db
        .collection::<Customer>(Role::Customer.collection())
        .find_one(doc! { "_id": customer_id }, None)
        .await?;
    if customer.is_none() {
        return Err(ApiError::not_found("Customer not found"));
    }

    let now = DateTime::now();
    let review = Review {
        id: None,
        customer_id,
        provider_id,
        rating,
        comment: comment.to_string(),
        created_at: now,
        updated_at: now,
    };

    let result = reviews(db).insert_one(&review, None).await?;

    recompute_provider_rating(db, provider_id).await?;

    let mut review = review;
    review.id = result.inserted_id.as_object_id();

    Ok(ApiResponse::created(
        "Review created successfully",
        serde_json::json!({ "review": review }),
    ))
}

#[openapi(tag = "Reviews")]
#[put("/reviews/<id>", data = "<dto>")]
pub async fn update_review(
    db: &State<DbConn>,
    auth: AuthGuard,
    id: String,
    dto: Json<UpdateReviewDto>,
) -> Result<ApiResponse<serde_json::Value>, ApiError> {
    let review_id = parse_review_id(&id)?;
    let review = find_review(db, review_id).await?;

    if !can_modify(&auth, &review) {
        return Err(ApiError::forbidden("You can only update your own reviews"));
    }

    let mut update_doc = doc! { "updated_at": DateTime::now() };

    if let Some(rating) = dto.rating {
        if !valid_rating(rating) {
            return Err(ApiError::validation("rating", "Rating must be between 1 and 5"));
        }
        update_doc.insert("rating", rating);
    }
    if let Some(ref comment) = dto.comment {
        if comment.is_empty() {
            return Err(ApiError::validation("comment", "Comment is required"));
        }
        update_doc.insert("comment", comment.as_str());
    }

    reviews(db)
        .update_one(doc! { "_id": review_id }, doc! { "$set": update_doc }, None)
        .await?;

    if dto.rating.is_some() {
        recompute_provider_rating(db, review.provider_id).await?;
    }

    let review = find_review(db, review_id).await?;

    Ok(ApiResponse::success_with_message(
        "Review updated successfully",
        serde_json::json!({ "review": review }),
    ))
}

#[openapi(tag = "Reviews")]
#[delete("/reviews/<id>")]
pub async fn delete_review(
    db: &State<DbConn>,
    auth: AuthGuard,
    id: String,
) -> Result<ApiResponse<serde_json::Value>, ApiError> {
    let review_id = parse_review_id(&id)?;
    let review = find_review(db, review_id).await?;

    if !can_modify(&auth, &review) {
        return Err(ApiError::forbidden("You can only delete your own reviews"));
    }

    reviews(db).delete_one(doc! { "_id": review_id }, None).await?;

    recompute_provider_rating(db, review.provider_id).await?;

    Ok(ApiResponse::message_only("Review deleted successfully"))
}
