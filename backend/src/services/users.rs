use chrono::Utc;
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::db::is_unique_violation;
use crate::models::{FamilyGroupRow, PhotoRow, PostRow, UserRow};
use crate::services::auth::{self as auth_service, is_valid_email, normalize_email, require_platform_admin, AuthError};
use crate::services::photos::is_hosted_image;
use shared::{AdminUpdateUserRequest, FamilyGroup, Photo, PlatformRole, Post, User, UserProfile};

async fn fetch_user(pool: &SqlitePool, user_id: &Uuid) -> Result<User, AuthError> {
    let user: UserRow = sqlx::query_as("SELECT * FROM users WHERE id = ?")
        .bind(user_id)
        .fetch_optional(pool)
        .await?
        .ok_or(AuthError::UserNotFound)?;
    Ok(user.to_shared())
}

async fn family_groups(pool: &SqlitePool, user_id: &Uuid) -> Result<Vec<FamilyGroup>, AuthError> {
    let rows: Vec<FamilyGroupRow> = sqlx::query_as(
        r#"
        SELECT f.id, f.name, fm.role, fm.is_main_family,
               (SELECT COUNT(*) FROM family_members c WHERE c.family_id = f.id) AS member_count
        FROM family_members fm
        INNER JOIN families f ON f.id = fm.family_id
        WHERE fm.user_id = ?
        ORDER BY fm.is_main_family DESC, fm.created_at ASC
        "#,
    )
    .bind(user_id)
    .fetch_all(pool)
    .await?;

    Ok(rows.iter().map(|r| r.to_shared()).collect())
}

async fn shares_family(pool: &SqlitePool, a: &Uuid, b: &Uuid) -> Result<bool, AuthError> {
    let shared: i64 = sqlx::query_scalar(
        r#"
        SELECT COUNT(*) FROM family_members x
        INNER JOIN family_members y ON y.family_id = x.family_id
        WHERE x.user_id = ? AND y.user_id = ?
        "#,
    )
    .bind(a)
    .bind(b)
    .fetch_one(pool)
    .await?;
    Ok(shared > 0)
}

/// A user's profile with the families they belong to. Visible to the user,
/// to anyone sharing a family with them, and to platform administrators.
pub async fn get_profile(
    pool: &SqlitePool,
    caller_id: &Uuid,
    caller_role: PlatformRole,
    user_id: &Uuid,
) -> Result<UserProfile, AuthError> {
    let visible = caller_id == user_id
        || caller_role.can_administer_platform()
        || shares_family(pool, caller_id, user_id).await?;
    if !visible {
        return Err(AuthError::Forbidden);
    }

    Ok(UserProfile {
        user: fetch_user(pool, user_id).await?,
        family_groups: family_groups(pool, user_id).await?,
    })
}

/// Point the user's profile picture at an already uploaded image.
pub async fn update_profile_image(
    pool: &SqlitePool,
    image_host_prefix: &str,
    user_id: &Uuid,
    image_url: &str,
) -> Result<User, AuthError> {
    let image_url = image_url.trim();
    if !is_hosted_image(image_url, image_host_prefix) {
        return Err(AuthError::InvalidInput("Image URL must point to the image host"));
    }

    let user: UserRow =
        sqlx::query_as("UPDATE users SET image = ?, updated_at = ? WHERE id = ? RETURNING *")
            .bind(image_url)
            .bind(Utc::now())
            .bind(user_id)
            .fetch_optional(pool)
            .await?
            .ok_or(AuthError::UserNotFound)?;

    Ok(user.to_shared())
}

// ============================================================================
// Platform administration
// ============================================================================

pub async fn admin_get_user(pool: &SqlitePool, role: PlatformRole, user_id: &Uuid) -> Result<UserProfile, AuthError> {
    require_platform_admin(role)?;

    Ok(UserProfile {
        user: fetch_user(pool, user_id).await?,
        family_groups: family_groups(pool, user_id).await?,
    })
}

/// Edit another account's name, email or platform role. Administrators
/// cannot change their own role.
pub async fn admin_update_user(
    pool: &SqlitePool,
    caller_id: &Uuid,
    role: PlatformRole,
    user_id: &Uuid,
    request: &AdminUpdateUserRequest,
) -> Result<User, AuthError> {
    require_platform_admin(role)?;

    let name = match request.name.as_deref().map(str::trim) {
        Some("") => return Err(AuthError::InvalidInput("Name must not be empty")),
        other => other,
    };
    let email = match request.email.as_deref().map(normalize_email) {
        Some(email) if !is_valid_email(&email) => {
            return Err(AuthError::InvalidInput("A valid email address is required"))
        }
        other => other,
    };
    if caller_id == user_id && request.role.is_some_and(|r| r != role) {
        return Err(AuthError::InvalidInput("Administrators cannot change their own role"));
    }

    let updated = sqlx::query_as::<_, UserRow>(
        r#"
        UPDATE users
        SET name = COALESCE(?, name),
            email = COALESCE(?, email),
            role = COALESCE(?, role),
            updated_at = ?
        WHERE id = ?
        RETURNING *
        "#,
    )
    .bind(name)
    .bind(email)
    .bind(request.role.map(|r| r.as_str()))
    .bind(Utc::now())
    .bind(user_id)
    .fetch_optional(pool)
    .await;

    let user = match updated {
        Ok(Some(user)) => user,
        Ok(None) => return Err(AuthError::UserNotFound),
        Err(e) if is_unique_violation(&e) => return Err(AuthError::UserAlreadyExists),
        Err(e) => return Err(e.into()),
    };

    log::info!("Administrator {} updated user {}", caller_id, user_id);
    Ok(user.to_shared())
}

/// Delete any account, with the same family hand-over as self-deletion.
pub async fn admin_delete_user(
    pool: &SqlitePool,
    caller_id: &Uuid,
    role: PlatformRole,
    user_id: &Uuid,
) -> Result<(), AuthError> {
    require_platform_admin(role)?;
    auth_service::delete_account(pool, user_id).await?;
    log::info!("Administrator {} deleted user {}", caller_id, user_id);
    Ok(())
}

pub async fn admin_user_posts(pool: &SqlitePool, role: PlatformRole, user_id: &Uuid) -> Result<Vec<Post>, AuthError> {
    require_platform_admin(role)?;

    let posts: Vec<PostRow> =
        sqlx::query_as("SELECT * FROM posts WHERE author_id = ? ORDER BY created_at DESC")
            .bind(user_id)
            .fetch_all(pool)
            .await?;
    Ok(posts.into_iter().map(|p| p.to_shared()).collect())
}

pub async fn admin_user_photos(pool: &SqlitePool, role: PlatformRole, user_id: &Uuid) -> Result<Vec<Photo>, AuthError> {
    require_platform_admin(role)?;

    let photos: Vec<PhotoRow> =
        sqlx::query_as("SELECT * FROM photos WHERE uploader_id = ? ORDER BY created_at DESC")
            .bind(user_id)
            .fetch_all(pool)
            .await?;
    Ok(photos.into_iter().map(|p| p.to_shared()).collect())
}
