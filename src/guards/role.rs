use rocket::request::{self, FromRequest, Request, Outcome};
use rocket::http::Status;

use rocket_okapi::request::{OpenApiFromRequest, RequestHeaderInput};
use rocket_okapi::r#gen::OpenApiGenerator;

use crate::guards::AuthGuard;
use crate::guards::auth::guard_failure;
use crate::models::Role;

fn role_mismatch<T>(req: &Request<'_>, required: Role, actual: Role) -> request::Outcome<T, ()> {
    guard_failure(
        req,
        format!(
            "Access denied. Required role: {}. Your role: {}.",
            required, actual
        ),
    );
    Outcome::Error((Status::Forbidden, ()))
}

macro_rules! delegate_auth {
    ($req:expr) => {
        match $req.guard::<AuthGuard>().await {
            Outcome::Success(auth) => auth,
            Outcome::Error(e) => return Outcome::Error(e),
            Outcome::Forward(f) => return Outcome::Forward(f),
        }
    };
}

pub struct AdminGuard {
    pub auth: AuthGuard,
}

#[rocket::async_trait]
impl<'r> FromRequest<'r> for AdminGuard {
    type Error = ();

    async fn from_request(req: &'r Request<'_>) -> request::Outcome<Self, Self::Error> {
        let auth = delegate_auth!(req);
        if auth.role != Role::Admin {
            return role_mismatch(req, Role::Admin, auth.role);
        }
        Outcome::Success(AdminGuard { auth })
    }
}

pub struct CustomerGuard {
    pub auth: AuthGuard,
}

#[rocket::async_trait]
impl<'r> FromRequest<'r> for CustomerGuard {
    type Error = ();

    async fn from_request(req: &'r Request<'_>) -> request::Outcome<Self, Self::Error> {
        let auth = delegate_auth!(req);
        if auth.role != Role::Customer {
            return role_mismatch(req, Role::Customer, auth.role);
        }
        Outcome::Success(CustomerGuard { auth })
    }
}

/// Provider role only; no approval requirement. Applying to job posts is
/// deliberately open to unapproved providers.
pub struct ProviderGuard {
    pub auth: AuthGuard,
}

#[rocket::async_trait]
impl<'r> FromRequest<'r> for ProviderGuard {
    type Error = ();

    async fn from_request(req: &'r Request<'_>) -> request::Outcome<Self, Self::Error> {
        let auth = delegate_auth!(req);
        if auth.role != Role::Provider {
            return role_mismatch(req, Role::Provider, auth.role);
        }
        Outcome::Success(ProviderGuard { auth })
    }
}

/// Approval gate: provider role AND an admin-approved account.
pub struct ApprovedProviderGuard {
    pub auth: AuthGuard,
}

#[rocket::async_trait]
impl<'r> FromRequest<'r> for ApprovedProviderGuard {
    type Error = ();

    async fn from_request(req: &'r Request<'_>) -> request::Outcome<Self, Self::Error> {
        let auth = delegate_auth!(req);
        if auth.role != Role::Provider {
            return role_mismatch(req, Role::Provider, auth.role);
        }
        if auth.is_approved != Some(true) {
            guard_failure(
                req,
                "Access denied. Your provider account is pending approval.",
            );
            return Outcome::Error((Status::Forbidden, ()));
        }
        Outcome::Success(ApprovedProviderGuard { auth })
    }
}

impl<'a> OpenApiFromRequest<'a> for AdminGuard {
    fn from_request_input(
        _gen: &mut OpenApiGenerator,
        _name: String,
        _required: bool,
    ) -> rocket_okapi::Result<RequestHeaderInput> {
        Ok(RequestHeaderInput::None)
    }
}

impl<'a> OpenApiFromRequest<'a> for CustomerGuard {
    fn from_request_input(
        _gen: &mut OpenApiGenerator,
        _name: String,
        _required: bool,
    ) -> rocket_okapi::Result<RequestHeaderInput> {
        Ok(RequestHeaderInput::None)
    }
}

impl<'a> OpenApiFromRequest<'a> for ProviderGuard {
    fn from_request_input(
        _gen: &mut OpenApiGenerator,
        _name: String,
        _required: bool,
    ) -> rocket_okapi::Result<RequestHeaderInput> {
        Ok(RequestHeaderInput::None)
    }
}

impl<'a> OpenApiFromRequest<'a> for ApprovedProviderGuard {
    fn from_request_input(
        _gen: &mut OpenApiGenerator,
        _name: String,
        _required: bool,
    ) -> rocket_okapi::Result<RequestHeaderInput> {
        Ok(RequestHeaderInput::None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mongodb::bson::oid::ObjectId;

    fn auth(role: Role, is_approved: Option<bool>) -> AuthGuard {
        AuthGuard {
            id: ObjectId::new(),
            role,
            email: "user@example.com".to_string(),
            name: "User".to_string(),
            is_approved,
        }
    }

    #[test]
    fn allow_list_accepts_member_roles() {
        let admin = auth(Role::Admin, None);
        assert!(admin.require_role(&[Role::Admin, Role::Provider]).is_ok());

        let provider = auth(Role::Provider, Some(true));
        assert!(provider.require_role(&[Role::Admin, Role::Provider]).is_ok());
    }

    #[test]
    fn allow_list_rejects_other_roles() {
        let customer = auth(Role::Customer, None);
        let err = customer
            .require_role(&[Role::Admin, Role::Provider])
            .unwrap_err();
        assert_eq!(err.status, rocket::http::Status::Forbidden);
        assert_eq!(
            err.message,
            "Access denied. Required role: admin or provider. Your role: customer."
        );
    }

    #[test]
    fn single_role_message() {
        let provider = auth(Role::Provider, Some(false));
        let err = provider.require_role(&[Role::Admin]).unwrap_err();
        assert_eq!(
            err.message,
            "Access denied. Required role: admin. Your role: provider."
        );
    }

    #[test]
    fn admin_check() {
        assert!(auth(Role::Admin, None).is_admin());
        assert!(!auth(Role::Customer, None).is_admin());
    }
}
