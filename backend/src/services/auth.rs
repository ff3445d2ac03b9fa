use argon2::{
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use rand_core::OsRng;
use serde::{Deserialize, Serialize};
use sqlx::{Sqlite, SqlitePool, Transaction};
use thiserror::Error;
use uuid::Uuid;

use crate::models::UserRow;
use crate::services::error::{ErrorKind, ServiceError};
use shared::{FamilyRole, PlatformRole, RegisterRequest, UpdateProfileRequest, User};

pub const MIN_PASSWORD_LENGTH: usize = 8;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("{0}")]
    InvalidInput(&'static str),
    #[error("User already exists")]
    UserAlreadyExists,
    #[error("Invalid email or password")]
    InvalidCredentials,
    #[error("User not found")]
    UserNotFound,
    #[error("Platform administrator role required")]
    Forbidden,
    #[error("Database error: {0}")]
    DatabaseError(#[from] sqlx::Error),
    #[error("Password hashing error")]
    HashingError,
    #[error("JWT error: {0}")]
    JwtError(#[from] jsonwebtoken::errors::Error),
}

impl ServiceError for AuthError {
    fn kind(&self) -> ErrorKind {
        match self {
            AuthError::InvalidInput(_) => ErrorKind::InvalidInput,
            AuthError::UserAlreadyExists => ErrorKind::Conflict,
            AuthError::InvalidCredentials | AuthError::JwtError(_) => ErrorKind::Unauthenticated,
            AuthError::UserNotFound => ErrorKind::NotFound,
            AuthError::Forbidden => ErrorKind::Forbidden,
            AuthError::DatabaseError(e) => ErrorKind::from_db(e),
            AuthError::HashingError => ErrorKind::Internal,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub role: PlatformRole,
    pub exp: i64,
    pub iat: i64,
}

/// Lower-cased, trimmed form used for every email write and lookup.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

pub fn is_valid_email(email: &str) -> bool {
    match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.is_empty()
                && !domain.contains('@')
                && !email.contains(char::is_whitespace)
        }
        None => false,
    }
}

fn hash_password(password: &str) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|_| AuthError::HashingError)
}

/// Create an account, or claim the placeholder account an invitation left behind.
pub async fn register_user(pool: &SqlitePool, request: &RegisterRequest) -> Result<User, AuthError> {
    let email = normalize_email(&request.email);
    if !is_valid_email(&email) {
        return Err(AuthError::InvalidInput("A valid email address is required"));
    }
    if request.password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(AuthError::InvalidInput("Password must be at least 8 characters"));
    }
    let name = request
        .name
        .as_deref()
        .map(str::trim)
        .filter(|n| !n.is_empty())
        .map(str::to_string);

    let password_hash = hash_password(&request.password)?;
    let now = Utc::now();

    let mut tx = pool.begin().await?;

    let existing: Option<UserRow> = sqlx::query_as("SELECT * FROM users WHERE email = ?")
        .bind(&email)
        .fetch_optional(&mut *tx)
        .await?;

    let user = match existing {
        Some(user) if user.password_hash.is_some() => return Err(AuthError::UserAlreadyExists),
        Some(placeholder) => {
            sqlx::query_as::<_, UserRow>(
                "UPDATE users SET password_hash = ?, name = COALESCE(?, name), updated_at = ? WHERE id = ? RETURNING *",
            )
            .bind(&password_hash)
            .bind(&name)
            .bind(now)
            .bind(placeholder.id)
            .fetch_one(&mut *tx)
            .await?
        }
        None => {
            sqlx::query_as::<_, UserRow>(
                r#"
                INSERT INTO users (id, email, name, password_hash, role, is_premium, created_at, updated_at)
                VALUES (?, ?, ?, ?, ?, 0, ?, ?)
                RETURNING *
                "#,
            )
            .bind(Uuid::new_v4())
            .bind(&email)
            .bind(&name)
            .bind(&password_hash)
            .bind(PlatformRole::User.as_str())
            .bind(now)
            .bind(now)
            .fetch_one(&mut *tx)
            .await?
        }
    };

    tx.commit().await?;

    log::info!("Registered user {}", user.id);
    Ok(user.to_shared())
}

pub async fn login_user(pool: &SqlitePool, request: &shared::LoginRequest) -> Result<User, AuthError> {
    let user: UserRow = sqlx::query_as("SELECT * FROM users WHERE email = ?")
        .bind(normalize_email(&request.email))
        .fetch_optional(pool)
        .await?
        .ok_or(AuthError::InvalidCredentials)?;

    // Placeholder accounts cannot sign in until claimed
    let password_hash = user.password_hash.as_ref().ok_or(AuthError::InvalidCredentials)?;

    let parsed_hash = PasswordHash::new(password_hash).map_err(|_| AuthError::InvalidCredentials)?;

    Argon2::default()
        .verify_password(request.password.as_bytes(), &parsed_hash)
        .map_err(|_| AuthError::InvalidCredentials)?;

    Ok(user.to_shared())
}

pub async fn get_user_by_id(pool: &SqlitePool, user_id: &Uuid) -> Result<Option<User>, AuthError> {
    let user: Option<UserRow> = sqlx::query_as("SELECT * FROM users WHERE id = ?")
        .bind(user_id)
        .fetch_optional(pool)
        .await?;

    Ok(user.map(|u| u.to_shared()))
}

pub async fn update_profile(
    pool: &SqlitePool,
    user_id: &Uuid,
    request: &UpdateProfileRequest,
) -> Result<User, AuthError> {
    let name = match request.name.as_deref().map(str::trim) {
        Some("") => return Err(AuthError::InvalidInput("Name must not be empty")),
        other => other,
    };

    let user: UserRow = sqlx::query_as(
        "UPDATE users SET name = COALESCE(?, name), updated_at = ? WHERE id = ? RETURNING *",
    )
    .bind(name)
    .bind(Utc::now())
    .bind(user_id)
    .fetch_optional(pool)
    .await?
    .ok_or(AuthError::UserNotFound)?;

    Ok(user.to_shared())
}

pub fn require_platform_admin(role: PlatformRole) -> Result<(), AuthError> {
    if role.can_administer_platform() {
        Ok(())
    } else {
        Err(AuthError::Forbidden)
    }
}

/// Platform administrators only.
pub async fn list_users(pool: &SqlitePool, role: PlatformRole) -> Result<Vec<User>, AuthError> {
    require_platform_admin(role)?;

    let users: Vec<UserRow> = sqlx::query_as("SELECT * FROM users ORDER BY created_at ASC")
        .fetch_all(pool)
        .await?;

    Ok(users.into_iter().map(|u| u.to_shared()).collect())
}

/// Delete an account without leaving any family with members but no admin.
///
/// Families where the user was the only member are deleted. Where they were
/// the only admin, the longest-standing remaining member is promoted.
pub async fn delete_account(pool: &SqlitePool, user_id: &Uuid) -> Result<(), AuthError> {
    let mut tx = pool.begin().await?;

    // Write first so the transaction holds the write lock before reading memberships
    let touched = sqlx::query("UPDATE users SET updated_at = ? WHERE id = ?")
        .bind(Utc::now())
        .bind(user_id)
        .execute(&mut *tx)
        .await?;
    if touched.rows_affected() == 0 {
        return Err(AuthError::UserNotFound);
    }

    let memberships: Vec<(Uuid, String)> =
        sqlx::query_as("SELECT family_id, role FROM family_members WHERE user_id = ?")
            .bind(user_id)
            .fetch_all(&mut *tx)
            .await?;

    for (family_id, role) in memberships {
        hand_over_family(&mut tx, &family_id, user_id, FamilyRole::from_db(&role)).await?;
    }

    sqlx::query("DELETE FROM users WHERE id = ?")
        .bind(user_id)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;

    log::info!("Deleted account {}", user_id);
    Ok(())
}

async fn hand_over_family(
    tx: &mut Transaction<'_, Sqlite>,
    family_id: &Uuid,
    departing_user: &Uuid,
    departing_role: FamilyRole,
) -> Result<(), AuthError> {
    let others: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM family_members WHERE family_id = ? AND user_id != ?",
    )
    .bind(family_id)
    .bind(departing_user)
    .fetch_one(&mut **tx)
    .await?;

    if others == 0 {
        sqlx::query("DELETE FROM families WHERE id = ?")
            .bind(family_id)
            .execute(&mut **tx)
            .await?;
        log::info!("Deleted family {} with its last member", family_id);
        return Ok(());
    }

    if departing_role != FamilyRole::Admin {
        return Ok(());
    }

    let other_admins: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM family_members WHERE family_id = ? AND user_id != ? AND role = ?",
    )
    .bind(family_id)
    .bind(departing_user)
    .bind(FamilyRole::Admin.as_str())
    .fetch_one(&mut **tx)
    .await?;

    if other_admins == 0 {
        sqlx::query(
            r#"
            UPDATE family_members SET role = ?
            WHERE id = (
                SELECT id FROM family_members
                WHERE family_id = ? AND user_id != ?
                ORDER BY created_at ASC
                LIMIT 1
            )
            "#,
        )
        .bind(FamilyRole::Admin.as_str())
        .bind(family_id)
        .bind(departing_user)
        .execute(&mut **tx)
        .await?;
        log::info!("Promoted longest-standing member to admin of family {}", family_id);
    }

    Ok(())
}

pub fn create_jwt(
    user_id: &Uuid,
    role: PlatformRole,
    secret: &str,
    expiration_hours: i64,
) -> Result<String, AuthError> {
    let now = Utc::now();
    let exp = now + Duration::hours(expiration_hours);

    let claims = Claims {
        sub: user_id.to_string(),
        role,
        exp: exp.timestamp(),
        iat: now.timestamp(),
    };

    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )?;

    Ok(token)
}

pub fn verify_jwt(token: &str, secret: &str) -> Result<(Uuid, PlatformRole), AuthError> {
    let token_data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )?;

    let user_id =
        Uuid::parse_str(&token_data.claims.sub).map_err(|_| AuthError::InvalidCredentials)?;
    Ok((user_id, token_data.claims.role))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_pool;
    use crate::services::{families, testing};
    use shared::LoginRequest;

    fn register_request(email: &str) -> RegisterRequest {
        RegisterRequest {
            email: email.to_string(),
            name: Some("Test".to_string()),
            password: "correct-horse".to_string(),
        }
    }

    #[test]
    fn test_create_and_verify_jwt() {
        let user_id = Uuid::new_v4();
        let secret = "test-secret";

        let token = create_jwt(&user_id, PlatformRole::Admin, secret, 24).unwrap();
        let (verified_id, role) = verify_jwt(&token, secret).unwrap();

        assert_eq!(user_id, verified_id);
        assert_eq!(role, PlatformRole::Admin);
    }

    #[test]
    fn test_verify_jwt_invalid_secret() {
        let user_id = Uuid::new_v4();
        let token = create_jwt(&user_id, PlatformRole::User, "secret1", 24).unwrap();

        let err = verify_jwt(&token, "secret2").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Unauthenticated);
    }

    #[test]
    fn test_verify_jwt_expired() {
        let token = create_jwt(&Uuid::new_v4(), PlatformRole::User, "secret", -2).unwrap();
        assert!(verify_jwt(&token, "secret").is_err());
    }

    #[test]
    fn test_email_helpers() {
        assert_eq!(normalize_email("  Bob@Example.COM "), "bob@example.com");
        assert!(is_valid_email("b@example.com"));
        assert!(!is_valid_email("not-an-email"));
        assert!(!is_valid_email("@example.com"));
        assert!(!is_valid_email("a b@example.com"));
    }

    #[tokio::test]
    async fn test_register_and_login() {
        let pool = test_pool().await;

        let user = register_user(&pool, &register_request("Alice@Example.com")).await.unwrap();
        assert_eq!(user.email, "alice@example.com");
        assert_eq!(user.role, PlatformRole::User);
        assert!(!user.is_premium);

        let logged_in = login_user(
            &pool,
            &LoginRequest {
                email: "ALICE@example.com".to_string(),
                password: "correct-horse".to_string(),
            },
        )
        .await
        .unwrap();
        assert_eq!(logged_in.id, user.id);

        let err = login_user(
            &pool,
            &LoginRequest {
                email: "alice@example.com".to_string(),
                password: "wrong-password".to_string(),
            },
        )
        .await
        .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Unauthenticated);
    }

    #[tokio::test]
    async fn test_register_validation() {
        let pool = test_pool().await;

        let mut short = register_request("a@example.com");
        short.password = "short".to_string();
        let err = register_user(&pool, &short).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);

        let err = register_user(&pool, &register_request("nope")).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);
    }

    #[tokio::test]
    async fn test_register_duplicate_email_conflicts() {
        let pool = test_pool().await;

        register_user(&pool, &register_request("a@example.com")).await.unwrap();
        let err = register_user(&pool, &register_request("A@EXAMPLE.COM")).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Conflict);
    }

    #[tokio::test]
    async fn test_register_claims_placeholder_account() {
        let pool = test_pool().await;
        let placeholder_id = Uuid::new_v4();
        let now = Utc::now();
        sqlx::query(
            "INSERT INTO users (id, email, role, is_premium, created_at, updated_at) VALUES (?, ?, 'user', 0, ?, ?)",
        )
        .bind(placeholder_id)
        .bind("invited@example.com")
        .bind(now)
        .bind(now)
        .execute(&pool)
        .await
        .unwrap();

        // Unclaimed placeholders cannot sign in
        let err = login_user(
            &pool,
            &LoginRequest {
                email: "invited@example.com".to_string(),
                password: "anything-at-all".to_string(),
            },
        )
        .await
        .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Unauthenticated);

        let user = register_user(&pool, &register_request("invited@example.com")).await.unwrap();
        assert_eq!(user.id, placeholder_id);
        assert_eq!(user.name.as_deref(), Some("Test"));
    }

    #[tokio::test]
    async fn test_update_profile() {
        let pool = test_pool().await;
        let user = register_user(&pool, &register_request("a@example.com")).await.unwrap();

        let updated = update_profile(
            &pool,
            &user.id,
            &UpdateProfileRequest {
                name: Some("  Alice  ".to_string()),
            },
        )
        .await
        .unwrap();
        assert_eq!(updated.name.as_deref(), Some("Alice"));

        let err = update_profile(&pool, &user.id, &UpdateProfileRequest { name: Some(" ".to_string()) })
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);
    }

    #[tokio::test]
    async fn test_list_users_requires_platform_admin() {
        let pool = test_pool().await;
        register_user(&pool, &register_request("a@example.com")).await.unwrap();

        let err = list_users(&pool, PlatformRole::User).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Forbidden);

        let users = list_users(&pool, PlatformRole::Admin).await.unwrap();
        assert_eq!(users.len(), 1);
    }

    #[tokio::test]
    async fn test_delete_account_promotes_successor() {
        let pool = test_pool().await;
        let owner = register_user(&pool, &register_request("owner@example.com")).await.unwrap();
        let member = register_user(&pool, &register_request("member@example.com")).await.unwrap();

        let family = families::create_family(&pool, &owner.id, "Smiths").await.unwrap();
        testing::add_member(&pool, &family.id, &member.id, FamilyRole::Viewer).await;

        delete_account(&pool, &owner.id).await.unwrap();

        let membership = families::get_membership(&pool, &member.id, &family.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(membership.role, FamilyRole::Admin);
        assert!(get_user_by_id(&pool, &owner.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_delete_account_removes_empty_family() {
        let pool = test_pool().await;
        let owner = register_user(&pool, &register_request("owner@example.com")).await.unwrap();
        let family = families::create_family(&pool, &owner.id, "Solo").await.unwrap();

        delete_account(&pool, &owner.id).await.unwrap();

        let remaining: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM families WHERE id = ?")
            .bind(family.id)
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(remaining, 0);
    }

    #[tokio::test]
    async fn test_delete_unknown_account() {
        let pool = test_pool().await;
        let err = delete_account(&pool, &Uuid::new_v4()).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }
}
