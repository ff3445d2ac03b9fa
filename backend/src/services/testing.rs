//! Fixtures shared by service and handler tests.

use chrono::{Duration, Utc};
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::models::MembershipRow;
use shared::{FamilyRole, Membership};

/// Insert a registered user. The password hash is a dummy value.
pub async fn create_user(pool: &SqlitePool, email: &str) -> Uuid {
    let id = Uuid::new_v4();
    let now = Utc::now();
    sqlx::query(
        "INSERT INTO users (id, email, name, password_hash, role, is_premium, created_at, updated_at) VALUES (?, ?, NULL, 'x', 'user', 0, ?, ?)",
    )
    .bind(id)
    .bind(email)
    .bind(now)
    .bind(now)
    .execute(pool)
    .await
    .unwrap();
    id
}

/// Add a non-main membership. Each call is stamped one second later than the
/// previous members so "oldest member" ordering is deterministic.
pub async fn add_member(pool: &SqlitePool, family_id: &Uuid, user_id: &Uuid, role: FamilyRole) -> Membership {
    let existing: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM family_members WHERE family_id = ?")
        .bind(family_id)
        .fetch_one(pool)
        .await
        .unwrap();

    let row: MembershipRow = sqlx::query_as(
        "INSERT INTO family_members (id, user_id, family_id, role, is_main_family, created_at) VALUES (?, ?, ?, ?, 0, ?) RETURNING *",
    )
    .bind(Uuid::new_v4())
    .bind(user_id)
    .bind(family_id)
    .bind(role.as_str())
    .bind(Utc::now() + Duration::seconds(existing + 1))
    .fetch_one(pool)
    .await
    .unwrap();
    row.to_shared()
}

pub async fn is_premium(pool: &SqlitePool, user_id: &Uuid) -> bool {
    sqlx::query_scalar("SELECT is_premium FROM users WHERE id = ?")
        .bind(user_id)
        .fetch_one(pool)
        .await
        .unwrap()
}

/// Insert a registered platform administrator.
pub async fn create_admin(pool: &SqlitePool, email: &str) -> Uuid {
    let id = create_user(pool, email).await;
    sqlx::query("UPDATE users SET role = 'admin' WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await
        .unwrap();
    id
}
