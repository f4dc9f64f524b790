pub mod auth;
pub mod role;

pub use auth::{AuthGuard, BearerToken, GuardFailure, OptionalAuthGuard};
pub use role::{AdminGuard, ApprovedProviderGuard, CustomerGuard, ProviderGuard};
