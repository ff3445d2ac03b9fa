use chrono::Utc;
use sqlx::{Sqlite, SqlitePool};
use thiserror::Error;
use uuid::Uuid;

use crate::db::is_unique_violation;
use crate::models::{FamilyRow, MemberWithUserRow, MembershipRow};
use crate::services::error::{ErrorKind, ServiceError};
use shared::{Family, FamilyDetail, FamilyRole, MemberWithUser, Membership};

#[derive(Debug, Error)]
pub enum FamilyError {
    #[error("Family not found")]
    NotFound,
    #[error("You are not a member of this family")]
    NotAMember,
    #[error("Member not found")]
    MemberNotFound,
    #[error("Only family admins can manage members")]
    NotAdmin,
    #[error("You already have a main family")]
    AlreadyHasMainFamily,
    #[error("You cannot target your own membership")]
    CannotTargetSelf,
    #[error("Admin can only be granted through an admin transfer")]
    CannotAssignAdmin,
    #[error("You cannot leave your main family")]
    CannotLeaveMainFamily,
    #[error("The last admin cannot leave while other members remain")]
    LastAdmin,
    #[error("Family name is required")]
    InvalidName,
    #[error("Database error: {0}")]
    DatabaseError(#[from] sqlx::Error),
}

impl ServiceError for FamilyError {
    fn kind(&self) -> ErrorKind {
        match self {
            FamilyError::NotFound | FamilyError::MemberNotFound => ErrorKind::NotFound,
            FamilyError::NotAMember
            | FamilyError::NotAdmin
            | FamilyError::CannotLeaveMainFamily
            | FamilyError::LastAdmin => ErrorKind::Forbidden,
            FamilyError::AlreadyHasMainFamily => ErrorKind::Conflict,
            FamilyError::CannotTargetSelf
            | FamilyError::CannotAssignAdmin
            | FamilyError::InvalidName => ErrorKind::InvalidInput,
            FamilyError::DatabaseError(e) => ErrorKind::from_db(e),
        }
    }
}

pub(crate) async fn family_exists<'e, E>(executor: E, family_id: &Uuid) -> Result<bool, sqlx::Error>
where
    E: sqlx::Executor<'e, Database = Sqlite>,
{
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM families WHERE id = ?")
        .bind(family_id)
        .fetch_one(executor)
        .await?;
    Ok(count > 0)
}

pub(crate) async fn find_membership<'e, E>(
    executor: E,
    user_id: &Uuid,
    family_id: &Uuid,
) -> Result<Option<MembershipRow>, sqlx::Error>
where
    E: sqlx::Executor<'e, Database = Sqlite>,
{
    sqlx::query_as("SELECT * FROM family_members WHERE user_id = ? AND family_id = ?")
        .bind(user_id)
        .bind(family_id)
        .fetch_optional(executor)
        .await
}

/// The caller's membership, distinguishing a missing family from a non-member.
async fn require_membership(
    pool: &SqlitePool,
    user_id: &Uuid,
    family_id: &Uuid,
) -> Result<MembershipRow, FamilyError> {
    if let Some(membership) = find_membership(pool, user_id, family_id).await? {
        return Ok(membership);
    }
    if family_exists(pool, family_id).await? {
        Err(FamilyError::NotAMember)
    } else {
        Err(FamilyError::NotFound)
    }
}

async fn require_admin(
    pool: &SqlitePool,
    user_id: &Uuid,
    family_id: &Uuid,
) -> Result<MembershipRow, FamilyError> {
    let membership = require_membership(pool, user_id, family_id).await?;
    if !membership.role().can_manage_members() {
        return Err(FamilyError::NotAdmin);
    }
    Ok(membership)
}

/// Create a family with `owner_id` as its admin. The new family becomes the
/// owner's main family, so an owner who already has one is rejected.
pub async fn create_family(pool: &SqlitePool, owner_id: &Uuid, name: &str) -> Result<Family, FamilyError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(FamilyError::InvalidName);
    }

    let now = Utc::now();
    let mut tx = pool.begin().await?;

    let family: FamilyRow =
        sqlx::query_as("INSERT INTO families (id, name, created_at) VALUES (?, ?, ?) RETURNING *")
            .bind(Uuid::new_v4())
            .bind(name)
            .bind(now)
            .fetch_one(&mut *tx)
            .await?;

    // The partial unique index on main-family memberships arbitrates races
    let inserted = sqlx::query(
        r#"
        INSERT INTO family_members (id, user_id, family_id, role, is_main_family, created_at)
        VALUES (?, ?, ?, ?, 1, ?)
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(owner_id)
    .bind(family.id)
    .bind(FamilyRole::Admin.as_str())
    .bind(now)
    .execute(&mut *tx)
    .await;

    match inserted {
        Ok(_) => {}
        Err(e) if is_unique_violation(&e) => return Err(FamilyError::AlreadyHasMainFamily),
        Err(e) => return Err(e.into()),
    }

    tx.commit().await?;

    log::info!("User {} created family {}", owner_id, family.id);
    Ok(family.to_shared())
}

pub async fn get_membership(
    pool: &SqlitePool,
    user_id: &Uuid,
    family_id: &Uuid,
) -> Result<Option<Membership>, FamilyError> {
    Ok(find_membership(pool, user_id, family_id)
        .await?
        .map(|m| m.to_shared()))
}

pub async fn list_families_for_user(pool: &SqlitePool, user_id: &Uuid) -> Result<Vec<Family>, FamilyError> {
    let families: Vec<FamilyRow> = sqlx::query_as(
        r#"
        SELECT f.* FROM families f
        INNER JOIN family_members fm ON f.id = fm.family_id
        WHERE fm.user_id = ?
        ORDER BY fm.is_main_family DESC, f.created_at ASC
        "#,
    )
    .bind(user_id)
    .fetch_all(pool)
    .await?;

    Ok(families.into_iter().map(|f| f.to_shared()).collect())
}

async fn fetch_members(pool: &SqlitePool, family_id: &Uuid) -> Result<Vec<MemberWithUser>, FamilyError> {
    let rows: Vec<MemberWithUserRow> = sqlx::query_as(
        r#"
        SELECT fm.*,
               u.email AS user_email,
               u.name AS user_name,
               u.image AS user_image,
               u.role AS user_role,
               u.is_premium AS user_is_premium,
               u.created_at AS user_created_at
        FROM family_members fm
        INNER JOIN users u ON u.id = fm.user_id
        WHERE fm.family_id = ?
        ORDER BY fm.created_at ASC
        "#,
    )
    .bind(family_id)
    .fetch_all(pool)
    .await?;

    Ok(rows.iter().map(|r| r.to_shared()).collect())
}

pub async fn list_members(
    pool: &SqlitePool,
    user_id: &Uuid,
    family_id: &Uuid,
) -> Result<Vec<MemberWithUser>, FamilyError> {
    require_membership(pool, user_id, family_id).await?;
    fetch_members(pool, family_id).await
}

pub async fn get_family(
    pool: &SqlitePool,
    user_id: &Uuid,
    family_id: &Uuid,
) -> Result<FamilyDetail, FamilyError> {
    require_membership(pool, user_id, family_id).await?;

    let family: FamilyRow = sqlx::query_as("SELECT * FROM families WHERE id = ?")
        .bind(family_id)
        .fetch_optional(pool)
        .await?
        .ok_or(FamilyError::NotFound)?;

    Ok(FamilyDetail {
        family: family.to_shared(),
        members: fetch_members(pool, family_id).await?,
    })
}

/// Change another member's role. Granting admin goes through `transfer_admin`.
pub async fn change_role(
    pool: &SqlitePool,
    actor_id: &Uuid,
    family_id: &Uuid,
    target_membership_id: &Uuid,
    new_role: FamilyRole,
) -> Result<Membership, FamilyError> {
    let actor = require_admin(pool, actor_id, family_id).await?;

    if actor.id == *target_membership_id {
        return Err(FamilyError::CannotTargetSelf);
    }
    if new_role == FamilyRole::Admin {
        return Err(FamilyError::CannotAssignAdmin);
    }

    let updated: MembershipRow = sqlx::query_as(
        "UPDATE family_members SET role = ? WHERE id = ? AND family_id = ? RETURNING *",
    )
    .bind(new_role.as_str())
    .bind(target_membership_id)
    .bind(family_id)
    .fetch_optional(pool)
    .await?
    .ok_or(FamilyError::MemberNotFound)?;

    log::info!(
        "Membership {} in family {} is now {}",
        updated.id,
        family_id,
        new_role.as_str()
    );
    Ok(updated.to_shared())
}

pub async fn remove_member(
    pool: &SqlitePool,
    actor_id: &Uuid,
    family_id: &Uuid,
    target_membership_id: &Uuid,
) -> Result<(), FamilyError> {
    let actor = require_admin(pool, actor_id, family_id).await?;

    if actor.id == *target_membership_id {
        return Err(FamilyError::CannotTargetSelf);
    }

    let result = sqlx::query("DELETE FROM family_members WHERE id = ? AND family_id = ?")
        .bind(target_membership_id)
        .bind(family_id)
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(FamilyError::MemberNotFound);
    }

    log::info!("Removed membership {} from family {}", target_membership_id, family_id);
    Ok(())
}

/// Leave a family. The last member leaving deletes the family; the last
/// admin cannot leave while anyone else remains.
pub async fn leave_family(pool: &SqlitePool, user_id: &Uuid, family_id: &Uuid) -> Result<(), FamilyError> {
    let mut tx = pool.begin().await?;

    let membership: MembershipRow = sqlx::query_as(
        "DELETE FROM family_members WHERE user_id = ? AND family_id = ? RETURNING *",
    )
    .bind(user_id)
    .bind(family_id)
    .fetch_optional(&mut *tx)
    .await?
    .ok_or(FamilyError::MemberNotFound)?;

    if membership.is_main_family {
        tx.rollback().await?;
        return Err(FamilyError::CannotLeaveMainFamily);
    }

    let remaining: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM family_members WHERE family_id = ?")
        .bind(family_id)
        .fetch_one(&mut *tx)
        .await?;

    if remaining == 0 {
        sqlx::query("DELETE FROM families WHERE id = ?")
            .bind(family_id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        log::info!("Family {} deleted after its last member left", family_id);
        return Ok(());
    }

    if membership.role() == FamilyRole::Admin {
        let admins: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM family_members WHERE family_id = ? AND role = ?",
        )
        .bind(family_id)
        .bind(FamilyRole::Admin.as_str())
        .fetch_one(&mut *tx)
        .await?;

        if admins == 0 {
            tx.rollback().await?;
            return Err(FamilyError::LastAdmin);
        }
    }

    tx.commit().await?;

    log::info!("User {} left family {}", user_id, family_id);
    Ok(())
}

/// Hand the admin role to another member. The previous admin becomes an editor.
pub async fn transfer_admin(
    pool: &SqlitePool,
    actor_id: &Uuid,
    family_id: &Uuid,
    target_membership_id: &Uuid,
) -> Result<Membership, FamilyError> {
    let actor = require_admin(pool, actor_id, family_id).await?;

    if actor.id == *target_membership_id {
        return Err(FamilyError::CannotTargetSelf);
    }

    let mut tx = pool.begin().await?;

    let promoted: MembershipRow = sqlx::query_as(
        "UPDATE family_members SET role = ? WHERE id = ? AND family_id = ? RETURNING *",
    )
    .bind(FamilyRole::Admin.as_str())
    .bind(target_membership_id)
    .bind(family_id)
    .fetch_optional(&mut *tx)
    .await?
    .ok_or(FamilyError::MemberNotFound)?;

    sqlx::query("UPDATE family_members SET role = ? WHERE id = ?")
        .bind(FamilyRole::Editor.as_str())
        .bind(actor.id)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;

    log::info!(
        "Admin of family {} transferred from {} to {}",
        family_id,
        actor.user_id,
        promoted.user_id
    );
    Ok(promoted.to_shared())
}
