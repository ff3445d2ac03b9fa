pub mod auth;
pub mod rate_limit;

pub use auth::{extract_identity, Identity};
pub use rate_limit::RateLimiter;
