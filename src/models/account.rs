use std::fmt;

use mongodb::bson::{DateTime, doc, oid::ObjectId};
use serde::{Deserialize, Serialize};
use rocket_okapi::okapi::schemars::JsonSchema;

use crate::db::DbConn;
use crate::models::{Customer, CustomerResponse, Provider, ProviderResponse};

/// The three account kinds. The role travels inside the session token and
/// selects the collection an identifier is resolved against, so identity
/// lookup is always a single read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Provider,
    Customer,
}

impl Role {
    pub fn parse(raw: &str) -> Option<Role> {
        match raw {
            "admin" => Some(Role::Admin),
            "provider" => Some(Role::Provider),
            "customer" => Some(Role::Customer),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Provider => "provider",
            Role::Customer => "customer",
        }
    }

    pub fn collection(&self) -> &'static str {
        match self {
            Role::Admin => "admins",
            Role::Provider => "providers",
            Role::Customer => "customers",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Admin {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub name: String,
    pub email: String,
    pub password: String,
    pub created_at: DateTime,
    pub updated_at: DateTime,
}

#[derive(Debug, Serialize, JsonSchema)]
pub struct AdminResponse {
    pub id: String,
    pub name: String,
    pub email: String,
    pub role: Role,
}

impl From<Admin> for AdminResponse {
    fn from(admin: Admin) -> Self {
        AdminResponse {
            id: admin.id.map(|id| id.to_hex()).unwrap_or_default(),
            name: admin.name,
            email: admin.email,
            role: Role::Admin,
        }
    }
}

/// Discriminated account record, resolved by one lookup in the collection the
/// role names.
#[derive(Debug, Clone)]
pub enum Account {
    Admin(Admin),
    Provider(Provider),
    Customer(Customer),
}

impl Account {
    pub async fn find_by_role(
        db: &DbConn,
        role: Role,
        id: ObjectId,
    ) -> Result<Option<Account>, mongodb::error::Error> {
        let filter = doc! { "_id": id };
        match role {
            Role::Admin => Ok(db
                .collection::<Admin>(role.collection())
                .find_one(filter, None)
                .await?
                .map(Account::Admin)),
            Role::Provider => Ok(db
                .collection::<Provider>(role.collection())
                .find_one(filter, None)
                .await?
                .map(Account::Provider)),
            Role::Customer => Ok(db
                .collection::<Customer>(role.collection())
                .find_one(filter, None)
                .await?
                .map(Account::Customer)),
        }
    }

    pub async fn find_by_email(
        db: &DbConn,
        role: Role,
        email: &str,
    ) -> Result<Option<Account>, mongodb::error::Error> {
        let filter = doc! { "email": email };
        match role {
            Role::Admin => Ok(db
                .collection::<Admin>(role.collection())
                .find_one(filter, None)
                .await?
                .map(Account::Admin)),
            Role::Provider => Ok(db
                .collection::<Provider>(role.collection())
                .find_one(filter, None)
                .await?
                .map(Account::Provider)),
            Role::Customer => Ok(db
                .collection::<Customer>(role.collection())
                .find_one(filter, None)
                .await?
                .map(Account::Customer)),
        }
    }

    pub fn id(&self) -> Option<ObjectId> {
        match self {
            Account::Admin(a) => a.id,
            Account::Provider(p) => p.id,
            Account::Customer(c) => c.id,
        }
    }

    pub fn email(&self) -> &str {
        match self {
            Account::Admin(a) => &a.email,
            Account::Provider(p) => &p.email,
            Account::Customer(c) => &c.email,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Account::Admin(a) => &a.name,
            Account::Provider(p) => &p.name,
            Account::Customer(c) => &c.name,
        }
    }

    pub fn password_hash(&self) -> &str {
        match self {
            Account::Admin(a) => &a.password,
            Account::Provider(p) => &p.password,
            Account::Customer(c) => &c.password,
        }
    }

    /// Approval only exists for providers.
    pub fn is_approved(&self) -> Option<bool> {
        match self {
            Account::Provider(p) => Some(p.is_approved),
            _ => None,
        }
    }

    /// Public representation, password omitted.
    pub fn into_public_json(self) -> serde_json::Value {
        match self {
            Account::Admin(a) => serde_json::json!(AdminResponse::from(a)),
            Account::Provider(p) => serde_json::json!(ProviderResponse::from(p)),
            Account::Customer(c) => serde_json::json!(CustomerResponse::from(c)),
        }
    }
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct RegisterDto {
    pub role: String,
    pub name: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub experience_years: Option<i32>,
    pub skills: Option<Vec<String>>,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct LoginDto {
    pub email: String,
    pub password: String,
    pub role: String,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct UpdateUserDto {
    /// Selects the account kind when an admin edits someone else's record.
    pub role: Option<String>,
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub experience_years: Option<i32>,
    pub skills: Option<Vec<String>>,
    pub availability_status: Option<crate::models::Availability>,
    pub is_active: Option<bool>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_round_trip() {
        for role in [Role::Admin, Role::Provider, Role::Customer] {
            assert_eq!(Role::parse(role.as_str()), Some(role));
        }
        assert_eq!(Role::parse("superuser"), None);
        assert_eq!(Role::parse("Admin"), None);
    }

    #[test]
    fn role_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&Role::Provider).unwrap(), "\"provider\"");
    }

    #[test]
    fn collections_are_disjoint() {
        let names = [
            Role::Admin.collection(),
            Role::Provider.collection(),
            Role::Customer.collection(),
        ];
        assert_eq!(names.len(), names.iter().collect::<std::collections::HashSet<_>>().len());
    }
}
