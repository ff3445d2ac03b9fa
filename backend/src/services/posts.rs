use chrono::Utc;
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::models::PostRow;
use crate::services::content::{authorize, required_text, Capability, ContentError};
use shared::Post;

pub async fn list_posts(pool: &SqlitePool, user_id: &Uuid, family_id: &Uuid) -> Result<Vec<Post>, ContentError> {
    authorize(pool, family_id, user_id, Capability::View).await?;

    let posts: Vec<PostRow> =
        sqlx::query_as("SELECT * FROM posts WHERE family_id = ? ORDER BY created_at DESC")
            .bind(family_id)
            .fetch_all(pool)
            .await?;

    Ok(posts.into_iter().map(|p| p.to_shared()).collect())
}

pub async fn create_post(
    pool: &SqlitePool,
    user_id: &Uuid,
    family_id: &Uuid,
    content: &str,
) -> Result<Post, ContentError> {
    authorize(pool, family_id, user_id, Capability::Create).await?;
    let content = required_text(content, "Post content is required")?;

    let post: PostRow = sqlx::query_as(
        r#"
        INSERT INTO posts (id, family_id, author_id, content, created_at)
        VALUES (?, ?, ?, ?, ?)
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(family_id)
    .bind(user_id)
    .bind(content)
    .bind(Utc::now())
    .fetch_one(pool)
    .await?;

    log::info!("User {} posted {} in family {}", user_id, post.id, family_id);
    Ok(post.to_shared())
}

pub async fn delete_post(
    pool: &SqlitePool,
    user_id: &Uuid,
    family_id: &Uuid,
    post_id: &Uuid,
) -> Result<(), ContentError> {
    authorize(pool, family_id, user_id, Capability::Delete).await?;

    let deleted = sqlx::query("DELETE FROM posts WHERE id = ? AND family_id = ?")
        .bind(post_id)
        .bind(family_id)
        .execute(pool)
        .await?;
    if deleted.rows_affected() == 0 {
        return Err(ContentError::NotFound("Post"));
    }

    log::info!("User {} deleted post {}", user_id, post_id);
    Ok(())
}
