use mongodb::bson::{DateTime, oid::ObjectId};
use serde::{Deserialize, Serialize};
use rocket_okapi::okapi::schemars::JsonSchema;

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, JsonSchema)]
pub enum ApplicationStatus {
    Applied,
    Approved,
    Rejected,
}

impl ApplicationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ApplicationStatus::Applied => "Applied",
            ApplicationStatus::Approved => "Approved",
            ApplicationStatus::Rejected => "Rejected",
        }
    }
}

/// A provider's interest in a job post. At most one per (post, provider)
/// pair; the pair-uniqueness is enforced by a conditional append.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Application {
    #[serde(rename = "_id")]
    pub id: ObjectId,
    pub provider_id: ObjectId,
    pub status: ApplicationStatus,
    pub applied_at: DateTime,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct JobPost {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub title: String,
    pub description: String,
    pub duration: String,
    pub location: Option<String>,
    pub service_id: ObjectId,
    pub posted_by: ObjectId,
    pub applications: Vec<Application>,
    pub created_at: DateTime,
    pub updated_at: DateTime,
}

impl JobPost {
    pub fn application(&self, application_id: ObjectId) -> Option<&Application> {
        self.applications.iter().find(|a| a.id == application_id)
    }
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct CreateJobPostDto {
    pub title: Option<String>,
    pub description: Option<String>,
    pub duration: Option<String>,
    pub service_id: Option<String>,
    pub location: Option<String>,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct UpdateJobPostDto {
    pub title: Option<String>,
    pub description: Option<String>,
    pub duration: Option<String>,
    pub service_id: Option<String>,
    pub location: Option<String>,
}

/// Why a conditional approve/reject write matched nothing. The atomic update
/// is the fast path; this classification only runs afterwards, on the post as
/// re-read, to pick the right error.
#[derive(Debug, PartialEq, Eq)]
pub enum DecisionFailure {
    PostNotFound,
    NotOwner,
    ApplicationNotFound,
    AlreadyInStatus,
}

pub fn classify_decision_failure(
    post: Option<&JobPost>,
    caller: ObjectId,
    application_id: ObjectId,
) -> DecisionFailure {
    let Some(post) = post else {
        return DecisionFailure::PostNotFound;
    };
    if post.posted_by != caller {
        return DecisionFailure::NotOwner;
    }
    match post.application(application_id) {
        None => DecisionFailure::ApplicationNotFound,
        // Already in the requested status, or the conditional write lost a
        // race; both surface as a conflict.
        Some(_) => DecisionFailure::AlreadyInStatus,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn post(owner: ObjectId, applications: Vec<Application>) -> JobPost {
        JobPost {
            id: Some(ObjectId::new()),
            title: "Fix kitchen sink".to_string(),
            description: "Leaking trap under the sink".to_string(),
            duration: "2 hours".to_string(),
            location: None,
            service_id: ObjectId::new(),
            posted_by: owner,
            applications,
            created_at: DateTime::now(),
            updated_at: DateTime::now(),
        }
    }

    fn application(status: ApplicationStatus) -> Application {
        Application {
            id: ObjectId::new(),
            provider_id: ObjectId::new(),
            status,
            applied_at: DateTime::now(),
        }
    }

    #[test]
    fn missing_post_reported_first() {
        let failure = classify_decision_failure(None, ObjectId::new(), ObjectId::new());
        assert_eq!(failure, DecisionFailure::PostNotFound);
    }

    #[test]
    fn foreign_post_is_not_owner() {
        let owner = ObjectId::new();
        let post = post(owner, vec![]);
        let failure = classify_decision_failure(Some(&post), ObjectId::new(), ObjectId::new());
        assert_eq!(failure, DecisionFailure::NotOwner);
    }

    #[test]
    fn unknown_application_is_not_found() {
        let owner = ObjectId::new();
        let post = post(owner, vec![application(ApplicationStatus::Applied)]);
        let failure = classify_decision_failure(Some(&post), owner, ObjectId::new());
        assert_eq!(failure, DecisionFailure::ApplicationNotFound);
    }

    #[test]
    fn repeated_decision_is_a_conflict() {
        let owner = ObjectId::new();
        let app = application(ApplicationStatus::Approved);
        let app_id = app.id;
        let post = post(owner, vec![app]);
        let failure = classify_decision_failure(Some(&post), owner, app_id);
        assert_eq!(failure, DecisionFailure::AlreadyInStatus);
    }

    #[test]
    fn application_lookup_by_id() {
        let owner = ObjectId::new();
        let app = application(ApplicationStatus::Applied);
        let app_id = app.id;
        let post = post(owner, vec![app]);
        assert!(post.application(app_id).is_some());
        assert!(post.application(ObjectId::new()).is_none());
    }

    #[test]
    fn status_strings_match_stored_values() {
        assert_eq!(ApplicationStatus::Applied.as_str(), "Applied");
        assert_eq!(
            serde_json::to_string(&ApplicationStatus::Rejected).unwrap(),
            "\"Rejected\""
        );
    }
}
