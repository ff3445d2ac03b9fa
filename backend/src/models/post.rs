use chrono::{DateTime, Utc};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, FromRow)]
pub struct PostRow {
    pub id: Uuid,
    pub family_id: Uuid,
    pub author_id: Uuid,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

impl PostRow {
    pub fn to_shared(&self) -> shared::Post {
        shared::Post {
            id: self.id,
            family_id: self.family_id,
            author_id: self.author_id,
            content: self.content.clone(),
            created_at: self.created_at,
        }
    }
}
