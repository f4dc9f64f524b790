use mongodb::bson::{DateTime, oid::ObjectId};
use serde::{Deserialize, Serialize};
use rocket_okapi::okapi::schemars::JsonSchema;

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Review {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub customer_id: ObjectId,
    pub provider_id: ObjectId,
    pub rating: i32,
    pub comment: String,
    pub created_at: DateTime,
    pub updated_at: DateTime,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct CreateReviewDto {
    pub provider_id: Option<String>,
    pub customer_id: Option<String>,
    pub rating: Option<i32>,
    pub comment: Option<String>,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct UpdateReviewDto {
    pub rating: Option<i32>,
    pub comment: Option<String>,
}

pub fn valid_rating(rating: i32) -> bool {
    (1..=5).contains(&rating)
}

/// Mean of review ratings, 0 when a provider has none.
pub fn aggregate_rating(ratings: &[i32]) -> f64 {
    if ratings.is_empty() {
        return 0.0;
    }
    ratings.iter().map(|r| *r as f64).sum::<f64>() / ratings.len() as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rating_bounds() {
        assert!(!valid_rating(0));
        assert!(valid_rating(1));
        assert!(valid_rating(5));
        assert!(!valid_rating(6));
    }

    #[test]
    fn aggregate_of_none_is_zero() {
        assert_eq!(aggregate_rating(&[]), 0.0);
    }

    #[test]
    fn aggregate_is_mean() {
        assert_eq!(aggregate_rating(&[4, 5, 3]), 4.0);
        assert_eq!(aggregate_rating(&[5]), 5.0);
    }
}
