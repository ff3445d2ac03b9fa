use chrono::{DateTime, Utc};
use sqlx::FromRow;
use uuid::Uuid;

use super::UserRow;

/// Database model for family memberships
#[derive(Debug, Clone, FromRow)]
pub struct MembershipRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub family_id: Uuid,
    pub role: String,
    pub is_main_family: bool,
    pub created_at: DateTime<Utc>,
}

impl MembershipRow {
    pub fn role(&self) -> shared::FamilyRole {
        shared::FamilyRole::from_db(&self.role)
    }

    pub fn to_shared(&self) -> shared::Membership {
        shared::Membership {
            id: self.id,
            user_id: self.user_id,
            family_id: self.family_id,
            role: self.role(),
            is_main_family: self.is_main_family,
            created_at: self.created_at,
        }
    }
}

/// A membership joined with its user, as read by member listings.
#[derive(Debug, Clone, FromRow)]
pub struct MemberWithUserRow {
    #[sqlx(flatten)]
    pub membership: MembershipRow,
    #[sqlx(rename = "user_email")]
    pub email: String,
    #[sqlx(rename = "user_name")]
    pub name: Option<String>,
    #[sqlx(rename = "user_image")]
    pub image: Option<String>,
    #[sqlx(rename = "user_role")]
    pub platform_role: String,
    #[sqlx(rename = "user_is_premium")]
    pub is_premium: bool,
    #[sqlx(rename = "user_created_at")]
    pub user_created_at: DateTime<Utc>,
}

impl MemberWithUserRow {
    pub fn to_shared(&self) -> shared::MemberWithUser {
        let user = UserRow {
            id: self.membership.user_id,
            email: self.email.clone(),
            name: self.name.clone(),
            password_hash: None,
            image: self.image.clone(),
            role: self.platform_role.clone(),
            is_premium: self.is_premium,
            created_at: self.user_created_at,
            updated_at: self.user_created_at,
        };
        shared::MemberWithUser {
            membership: self.membership.to_shared(),
            user: user.to_shared(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::FamilyRole;

    fn row(role: &str) -> MembershipRow {
        MembershipRow {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            family_id: Uuid::new_v4(),
            role: role.to_string(),
            is_main_family: true,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_membership_row_to_shared() {
        let row = row("editor");
        let shared = row.to_shared();

        assert_eq!(shared.id, row.id);
        assert_eq!(shared.family_id, row.family_id);
        assert_eq!(shared.user_id, row.user_id);
        assert_eq!(shared.role, FamilyRole::Editor);
        assert!(shared.is_main_family);
    }

    #[test]
    fn test_membership_row_invalid_role_fails_closed() {
        assert_eq!(row("owner").to_shared().role, FamilyRole::Viewer);
    }
}
