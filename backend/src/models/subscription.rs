use chrono::{DateTime, Utc};
use sqlx::FromRow;
use uuid::Uuid;

/// Database model for billing subscriptions
#[derive(Debug, Clone, FromRow)]
pub struct SubscriptionRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub external_subscription_id: String,
    pub status: String,
    pub price_id: String,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl SubscriptionRow {
    pub fn to_shared(&self) -> shared::Subscription {
        shared::Subscription {
            id: self.id,
            user_id: self.user_id,
            external_subscription_id: self.external_subscription_id.clone(),
            status: self.status.clone(),
            price_id: self.price_id.clone(),
            start_date: self.start_date,
            end_date: self.end_date,
        }
    }
}
