use mongodb::bson::{DateTime, oid::ObjectId};
use serde::{Deserialize, Serialize};
use rocket_okapi::okapi::schemars::JsonSchema;

use crate::utils::ApiError;

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum PriceType {
    Fixed,
    PerUnit,
    Range,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct PriceList {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub service_id: ObjectId,
    pub price_type: PriceType,
    pub fixed_price: Option<f64>,
    pub unit_price: Option<f64>,
    pub unit: Option<String>,
    pub min_price: Option<f64>,
    pub max_price: Option<f64>,
    pub description: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime,
    pub updated_at: DateTime,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct CreatePriceListDto {
    pub service_id: Option<String>,
    pub price_type: Option<PriceType>,
    pub fixed_price: Option<f64>,
    pub unit_price: Option<f64>,
    pub unit: Option<String>,
    pub min_price: Option<f64>,
    pub max_price: Option<f64>,
    pub description: Option<String>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct UpdatePriceListDto {
    pub price_type: Option<PriceType>,
    pub fixed_price: Option<f64>,
    pub unit_price: Option<f64>,
    pub unit: Option<String>,
    pub min_price: Option<f64>,
    pub max_price: Option<f64>,
    pub description: Option<String>,
    pub is_active: Option<bool>,
}

/// Each price type requires its own fields; ranges must be ordered.
pub fn validate_price_fields(
    price_type: PriceType,
    fixed_price: Option<f64>,
    unit_price: Option<f64>,
    min_price: Option<f64>,
    max_price: Option<f64>,
) -> Result<(), ApiError> {
    match price_type {
        PriceType::Fixed => {
            if fixed_price.is_none() {
                return Err(ApiError::validation(
                    "fixed_price",
                    "Fixed price is required for fixed price type",
                ));
            }
        }
        PriceType::PerUnit => {
            if unit_price.is_none() {
                return Err(ApiError::validation(
                    "unit_price",
                    "Unit price is required for per_unit price type",
                ));
            }
        }
        PriceType::Range => {
            let (Some(min), Some(max)) = (min_price, max_price) else {
                return Err(ApiError::validation(
                    "min_price",
                    "Min and max price are required for range price type",
                ));
            };
            if min > max {
                return Err(ApiError::validation(
                    "min_price",
                    "Min price cannot exceed max price",
                ));
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed_requires_fixed_price() {
        assert!(validate_price_fields(PriceType::Fixed, Some(100.0), None, None, None).is_ok());
        assert!(validate_price_fields(PriceType::Fixed, None, None, None, None).is_err());
    }

    #[test]
    fn per_unit_requires_unit_price() {
        assert!(validate_price_fields(PriceType::PerUnit, None, Some(25.0), None, None).is_ok());
        assert!(validate_price_fields(PriceType::PerUnit, None, None, None, None).is_err());
    }

    #[test]
    fn range_requires_ordered_bounds() {
        assert!(validate_price_fields(PriceType::Range, None, None, Some(10.0), Some(20.0)).is_ok());
        assert!(validate_price_fields(PriceType::Range, None, None, Some(10.0), Some(10.0)).is_ok());
        assert!(validate_price_fields(PriceType::Range, None, None, Some(30.0), Some(20.0)).is_err());
        assert!(validate_price_fields(PriceType::Range, None, None, Some(10.0), None).is_err());
    }

    #[test]
    fn price_type_wire_names() {
        assert_eq!(serde_json::to_string(&PriceType::PerUnit).unwrap(), "\"per_unit\"");
        assert_eq!(serde_json::to_string(&PriceType::Fixed).unwrap(), "\"fixed\"");
    }
}
