use mongodb::bson::{DateTime, oid::ObjectId};
use serde::{Deserialize, Serialize};
use rocket_okapi::okapi::schemars::JsonSchema;

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, JsonSchema)]
pub enum ServiceCategory {
    Cleaning,
    Plumbing,
    Electrical,
    Painting,
    Carpentry,
    Gardening,
    Moving,
    Handyman,
    Other,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum ServiceUnit {
    Hour,
    Day,
    Project,
    Item,
    #[serde(rename = "1 square feet")]
    SquareFeet,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Service {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub name: String,
    pub description: String,
    pub category: ServiceCategory,
    pub base_price: f64,
    pub unit: ServiceUnit,
    pub is_active: bool,
    pub created_at: DateTime,
    pub updated_at: DateTime,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct CreateServiceDto {
    pub name: Option<String>,
    pub description: Option<String>,
    pub category: Option<ServiceCategory>,
    pub base_price: Option<f64>,
    pub unit: Option<ServiceUnit>,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct UpdateServiceDto {
    pub name: Option<String>,
    pub description: Option<String>,
    pub category: Option<ServiceCategory>,
    pub base_price: Option<f64>,
    pub unit: Option<ServiceUnit>,
    pub is_active: Option<bool>,
}
