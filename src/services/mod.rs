pub mod jwt;
pub mod token_blacklist;

pub use jwt::{Claims, JwtService};
pub use token_blacklist::TokenBlacklist;
