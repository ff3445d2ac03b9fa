use chrono::{DateTime, Utc};
use sqlx::FromRow;
use uuid::Uuid;

/// Database model for family invitations
#[derive(Debug, Clone, FromRow)]
pub struct InvitationRow {
    pub id: Uuid,
    pub email: String,
    pub invite_code: String,
    pub family_id: Uuid,
    pub invited_by: Uuid,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl InvitationRow {
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at
    }

    pub fn to_shared(&self) -> shared::Invitation {
        shared::Invitation {
            id: self.id,
            email: self.email.clone(),
            invite_code: self.invite_code.clone(),
            family_id: self.family_id,
            invited_by: self.invited_by,
            expires_at: self.expires_at,
            created_at: self.created_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_invitation_expiry_boundary() {
        let now = Utc::now();
        let row = InvitationRow {
            id: Uuid::new_v4(),
            email: "b@example.com".to_string(),
            invite_code: "abcdefghij".to_string(),
            family_id: Uuid::new_v4(),
            invited_by: Uuid::new_v4(),
            expires_at: now,
            created_at: now - Duration::days(7),
        };

        assert!(!row.is_expired_at(now));
        assert!(row.is_expired_at(now + Duration::seconds(1)));
        assert_eq!(row.to_shared().invite_code, "abcdefghij");
    }
}
