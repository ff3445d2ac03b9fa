use chrono::{DateTime, Utc};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, FromRow)]
pub struct PhotoRow {
    pub id: Uuid,
    pub family_id: Uuid,
    pub uploader_id: Uuid,
    pub url: String,
    pub public_id: String,
    pub created_at: DateTime<Utc>,
}

impl PhotoRow {
    pub fn to_shared(&self) -> shared::Photo {
        shared::Photo {
            id: self.id,
            family_id: self.family_id,
            uploader_id: self.uploader_id,
            url: self.url.clone(),
            public_id: self.public_id.clone(),
            created_at: self.created_at,
        }
    }
}
