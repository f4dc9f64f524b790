use mongodb::bson::{DateTime, oid::ObjectId};
use serde::{Deserialize, Serialize};
use rocket_okapi::okapi::schemars::JsonSchema;

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, JsonSchema)]
pub enum Availability {
    Available,
    Unavailable,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Provider {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub name: String,
    pub email: String,
    pub password: String,
    pub phone: String,
    pub address: String,
    pub experience_years: i32,
    pub skills: Vec<String>,
    pub is_approved: bool,
    pub availability_status: Availability,
    pub rating: f64,
    pub created_at: DateTime,
    pub updated_at: DateTime,
}

#[derive(Debug, Serialize, JsonSchema)]
pub struct ProviderResponse {
    pub id: String,
    pub name: String,
    pub email: String,
    pub phone: String,
    pub address: String,
    pub experience_years: i32,
    pub skills: Vec<String>,
    pub is_approved: bool,
    pub availability_status: Availability,
    pub rating: f64,
}

impl From<Provider> for ProviderResponse {
    fn from(provider: Provider) -> Self {
        ProviderResponse {
            id: provider.id.map(|id| id.to_hex()).unwrap_or_default(),
            name: provider.name,
            email: provider.email,
            phone: provider.phone,
            address: provider.address,
            experience_years: provider.experience_years,
            skills: provider.skills,
            is_approved: provider.is_approved,
            availability_status: provider.availability_status,
            rating: provider.rating,
        }
    }
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct UpdateProviderProfileDto {
    pub name: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub experience_years: Option<i32>,
    pub skills: Option<Vec<String>>,
    pub availability_status: Option<Availability>,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct RejectProviderDto {
    pub reason: Option<String>,
}
