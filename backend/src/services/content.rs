//! Membership and capability checks shared by posts, events and photos.

use sqlx::SqlitePool;
use thiserror::Error;
use uuid::Uuid;

use crate::integrations::UploadError;
use crate::services::error::{ErrorKind, ServiceError};
use crate::services::families::{family_exists, find_membership};
use shared::{FamilyRole, Membership};

#[derive(Debug, Error)]
pub enum ContentError {
    #[error("Family not found")]
    FamilyNotFound,
    #[error("You are not a member of this family")]
    NotAMember,
    #[error("Your role does not allow this action")]
    Forbidden,
    #[error("{0} not found")]
    NotFound(&'static str),
    #[error("{0}")]
    InvalidInput(&'static str),
    #[error("Image upload failed: {0}")]
    Upload(#[from] UploadError),
    #[error("Database error: {0}")]
    DatabaseError(#[from] sqlx::Error),
}

impl ServiceError for ContentError {
    fn kind(&self) -> ErrorKind {
        match self {
            ContentError::FamilyNotFound | ContentError::NotFound(_) => ErrorKind::NotFound,
            ContentError::NotAMember | ContentError::Forbidden => ErrorKind::Forbidden,
            ContentError::InvalidInput(_) => ErrorKind::InvalidInput,
            ContentError::Upload(_) => ErrorKind::UpstreamFailure,
            ContentError::DatabaseError(e) => ErrorKind::from_db(e),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
    /// Membership alone is enough.
    View,
    Create,
    Edit,
    Delete,
}

impl Capability {
    pub fn permits(self, role: FamilyRole) -> bool {
        match self {
            Capability::View => true,
            Capability::Create => role.can_create_content(),
            Capability::Edit => role.can_edit_content(),
            Capability::Delete => role.can_delete_content(),
        }
    }
}

/// Check that `user_id` belongs to the family and that their role grants
/// `capability`. Returns the caller's membership.
pub async fn authorize(
    pool: &SqlitePool,
    family_id: &Uuid,
    user_id: &Uuid,
    capability: Capability,
) -> Result<Membership, ContentError> {
    let Some(membership) = find_membership(pool, user_id, family_id).await? else {
        return Err(if family_exists(pool, family_id).await? {
            ContentError::NotAMember
        } else {
            ContentError::FamilyNotFound
        });
    };

    let membership = membership.to_shared();
    if !capability.permits(membership.role) {
        return Err(ContentError::Forbidden);
    }
    Ok(membership)
}

pub(crate) fn required_text<'a>(value: &'a str, message: &'static str) -> Result<&'a str, ContentError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ContentError::InvalidInput(message));
    }
    Ok(trimmed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_pool;
    use crate::services::families;
    use crate::services::testing::{add_member, create_user};
    #[test]
    fn test_capability_matrix() {
        for role in [FamilyRole::Admin, FamilyRole::Editor, FamilyRole::Viewer] {
            assert!(Capability::View.permits(role));
        }
        assert!(Capability::Create.permits(FamilyRole::Editor));
        assert!(!Capability::Create.permits(FamilyRole::Viewer));
        assert!(Capability::Delete.permits(FamilyRole::Admin));
        assert!(!Capability::Edit.permits(FamilyRole::Viewer));
    }

    #[tokio::test]
    async fn test_authorize_order_of_checks() {
        let pool = test_pool().await;
        let a = create_user(&pool, "a@example.com").await;
        let viewer = create_user(&pool, "v@example.com").await;
        let outsider = create_user(&pool, "o@example.com").await;
        let family = families::create_family(&pool, &a, "Smiths").await.unwrap();
        add_member(&pool, &family.id, &viewer, FamilyRole::Viewer).await;

        let err = authorize(&pool, &Uuid::new_v4(), &a, Capability::View).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);

        let err = authorize(&pool, &family.id, &outsider, Capability::View).await.unwrap_err();
        assert!(matches!(err, ContentError::NotAMember));

        authorize(&pool, &family.id, &viewer, Capability::View).await.unwrap();
        let err = authorize(&pool, &family.id, &viewer, Capability::Create).await.unwrap_err();
        assert!(matches!(err, ContentError::Forbidden));

        let membership = authorize(&pool, &family.id, &a, Capability::Delete).await.unwrap();
        assert_eq!(membership.role, FamilyRole::Admin);
    }

    #[tokio::test]
    async fn test_unknown_stored_role_is_denied() {
        let pool = test_pool().await;
        let a = create_user(&pool, "a@example.com").await;
        let family = families::create_family(&pool, &a, "Smiths").await.unwrap();

        sqlx::query("UPDATE family_members SET role = 'owner' WHERE user_id = ?")
            .bind(a)
            .execute(&pool)
            .await
            .unwrap();

        let err = authorize(&pool, &family.id, &a, Capability::Create).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Forbidden);
    }
}
