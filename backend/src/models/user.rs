use chrono::{DateTime, Utc};
use sqlx::FromRow;
use uuid::Uuid;

/// Database model for users
#[derive(Debug, Clone, FromRow)]
pub struct UserRow {
    pub id: Uuid,
    pub email: String,
    pub name: Option<String>,
    pub password_hash: Option<String>,
    pub image: Option<String>,
    pub role: String,
    pub is_premium: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl UserRow {
    pub fn to_shared(&self) -> shared::User {
        shared::User {
            id: self.id,
            email: self.email.clone(),
            name: self.name.clone(),
            image: self.image.clone(),
            role: self.role.parse().unwrap_or(shared::PlatformRole::User),
            is_premium: self.is_premium,
            created_at: self.created_at,
        }
    }
}
