use chrono::{DateTime, Utc};
use sqlx::FromRow;
use uuid::Uuid;

/// Database model for families
#[derive(Debug, Clone, FromRow)]
pub struct FamilyRow {
    pub id: Uuid,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

impl FamilyRow {
    pub fn to_shared(&self) -> shared::Family {
        shared::Family {
            id: self.id,
            name: self.name.clone(),
            created_at: self.created_at,
        }
    }
}

/// A family as seen from one of its members.
#[derive(Debug, Clone, FromRow)]
pub struct FamilyGroupRow {
    pub id: Uuid,
    pub name: String,
    pub role: String,
    pub is_main_family: bool,
    pub member_count: i64,
}

impl FamilyGroupRow {
    pub fn to_shared(&self) -> shared::FamilyGroup {
        shared::FamilyGroup {
            id: self.id,
            name: self.name.clone(),
            role: shared::FamilyRole::from_db(&self.role),
            is_main_family: self.is_main_family,
            member_count: self.member_count,
        }
    }
}
