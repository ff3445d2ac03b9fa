use chrono::{DateTime, Utc};
use sqlx::FromRow;
use uuid::Uuid;

/// Database model for family events
#[derive(Debug, Clone, FromRow)]
pub struct EventRow {
    pub id: Uuid,
    pub family_id: Uuid,
    pub creator_id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub place: String,
    pub event_date: DateTime<Utc>,
    pub status: String,
    pub created_at: DateTime<Utc>,
}

impl EventRow {
    pub fn to_shared(&self) -> shared::Event {
        shared::Event {
            id: self.id,
            family_id: self.family_id,
            creator_id: self.creator_id,
            title: self.title.clone(),
            description: self.description.clone(),
            place: self.place.clone(),
            event_date: self.event_date,
            status: self.status.parse().unwrap_or(shared::EventStatus::Pending),
            created_at: self.created_at,
        }
    }
}
