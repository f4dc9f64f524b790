use mongodb::bson::{DateTime, oid::ObjectId};
use serde::{Deserialize, Serialize};
use rocket_okapi::okapi::schemars::JsonSchema;

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, JsonSchema)]
pub enum SubscriptionPlan {
    Free,
    Standard,
    Premium,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, JsonSchema)]
pub enum SubscriptionStatus {
    Active,
    Expired,
    Cancelled,
}

impl SubscriptionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SubscriptionStatus::Active => "Active",
            SubscriptionStatus::Expired => "Expired",
            SubscriptionStatus::Cancelled => "Cancelled",
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Subscription {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub provider_id: ObjectId,
    pub plan_name: SubscriptionPlan,
    pub start_date: DateTime,
    pub end_date: DateTime,
    pub renewal_date: Option<DateTime>,
    pub status: SubscriptionStatus,
    pub amount: f64,
    pub created_at: DateTime,
    pub updated_at: DateTime,
}

/// Lazy expiry rule: an active subscription whose end date has passed is
/// expired at the next write. Evaluated against the document about to be
/// persisted, never on a timer.
pub fn effective_status(
    status: SubscriptionStatus,
    end_date: DateTime,
    now: DateTime,
) -> SubscriptionStatus {
    if status == SubscriptionStatus::Active && end_date <= now {
        SubscriptionStatus::Expired
    } else {
        status
    }
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct CreateSubscriptionDto {
    pub provider_id: Option<String>,
    pub plan_name: Option<SubscriptionPlan>,
    /// RFC 3339 timestamp.
    pub end_date: Option<String>,
    pub amount: Option<f64>,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct UpdateSubscriptionDto {
    pub plan_name: Option<SubscriptionPlan>,
    pub end_date: Option<String>,
    pub renewal_date: Option<String>,
    pub status: Option<SubscriptionStatus>,
    pub amount: Option<f64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn millis(offset: i64) -> DateTime {
        DateTime::from_millis(1_700_000_000_000 + offset)
    }

    #[test]
    fn active_past_end_date_expires() {
        let status = effective_status(SubscriptionStatus::Active, millis(-1), millis(0));
        assert_eq!(status, SubscriptionStatus::Expired);
    }

    #[test]
    fn end_date_equal_to_now_expires() {
        let status = effective_status(SubscriptionStatus::Active, millis(0), millis(0));
        assert_eq!(status, SubscriptionStatus::Expired);
    }

    #[test]
    fn active_future_end_date_unaffected() {
        let status = effective_status(SubscriptionStatus::Active, millis(1), millis(0));
        assert_eq!(status, SubscriptionStatus::Active);
    }

    #[test]
    fn cancelled_is_never_rewritten() {
        let status = effective_status(SubscriptionStatus::Cancelled, millis(-1), millis(0));
        assert_eq!(status, SubscriptionStatus::Cancelled);
    }

    #[test]
    fn expired_stays_expired() {
        let status = effective_status(SubscriptionStatus::Expired, millis(1), millis(0));
        assert_eq!(status, SubscriptionStatus::Expired);
    }
}
