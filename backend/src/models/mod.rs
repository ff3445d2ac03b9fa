use std::sync::Arc;
use sqlx::SqlitePool;

use crate::config::Config;
use crate::integrations::{BillingProvider, ImageHost, Mailer};
use crate::middleware::RateLimiter;

pub mod user;
pub mod family;
pub mod membership;
pub mod invitation;
pub mod subscription;
pub mod post;
pub mod event;
pub mod photo;

pub use user::*;
pub use family::*;
pub use membership::*;
pub use invitation::*;
pub use subscription::*;
pub use post::*;
pub use event::*;
pub use photo::*;

/// Application state shared across all handlers
pub struct AppState {
    pub db: SqlitePool,
    pub config: Config,
    pub login_rate_limiter: Arc<RateLimiter>,
    pub mailer: Arc<dyn Mailer>,
    pub images: Arc<dyn ImageHost>,
    pub billing: Arc<dyn BillingProvider>,
}
