use chrono::Utc;
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::integrations::ImageHost;
use crate::models::PhotoRow;
use crate::services::content::{authorize, required_text, Capability, ContentError};
use shared::Photo;

pub async fn list_photos(pool: &SqlitePool, user_id: &Uuid, family_id: &Uuid) -> Result<Vec<Photo>, ContentError> {
    authorize(pool, family_id, user_id, Capability::View).await?;

    let photos: Vec<PhotoRow> =
        sqlx::query_as("SELECT * FROM photos WHERE family_id = ? ORDER BY created_at DESC")
            .bind(family_id)
            .fetch_all(pool)
            .await?;

    Ok(photos.into_iter().map(|p| p.to_shared()).collect())
}

async fn insert_photo(
    pool: &SqlitePool,
    user_id: &Uuid,
    family_id: &Uuid,
    url: &str,
    public_id: &str,
) -> Result<Photo, ContentError> {
    let photo: PhotoRow = sqlx::query_as(
        r#"
        INSERT INTO photos (id, family_id, uploader_id, url, public_id, created_at)
        VALUES (?, ?, ?, ?, ?, ?)
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(family_id)
    .bind(user_id)
    .bind(url)
    .bind(public_id)
    .bind(Utc::now())
    .fetch_one(pool)
    .await?;

    log::info!("User {} added photo {} to family {}", user_id, photo.id, family_id);
    Ok(photo.to_shared())
}

/// True when `url` lives under the image host. The prefix is expected to
/// end at a path boundary, see `Config::from_env`.
pub fn is_hosted_image(url: &str, image_host_prefix: &str) -> bool {
    !image_host_prefix.is_empty() && url.starts_with(image_host_prefix) && url.len() > image_host_prefix.len()
}

/// Record a photo the client already uploaded. Only URLs on the configured
/// image host are accepted.
pub async fn create_photo(
    pool: &SqlitePool,
    image_host_prefix: &str,
    user_id: &Uuid,
    family_id: &Uuid,
    url: &str,
    public_id: &str,
) -> Result<Photo, ContentError> {
    authorize(pool, family_id, user_id, Capability::Create).await?;

    let url = url.trim();
    if !is_hosted_image(url, image_host_prefix) {
        return Err(ContentError::InvalidInput("Photo URL must point to the image host"));
    }
    let public_id = required_text(public_id, "Photo public id is required")?;

    insert_photo(pool, user_id, family_id, url, public_id).await
}

/// Upload raw image bytes and record the result. Nothing is stored if the
/// upload fails.
pub async fn upload_photo(
    pool: &SqlitePool,
    images: &dyn ImageHost,
    user_id: &Uuid,
    family_id: &Uuid,
    bytes: Vec<u8>,
    content_type: &str,
) -> Result<Photo, ContentError> {
    authorize(pool, family_id, user_id, Capability::Create).await?;

    if bytes.is_empty() {
        return Err(ContentError::InvalidInput("Image data is required"));
    }
    if !content_type.starts_with("image/") {
        return Err(ContentError::InvalidInput("Only image uploads are accepted"));
    }

    let uploaded = images.upload_image(bytes, content_type).await.map_err(|e| {
        log::warn!("Image upload for family {} failed: {}", family_id, e);
        ContentError::from(e)
    })?;

    insert_photo(pool, user_id, family_id, &uploaded.url, &uploaded.public_id).await
}

pub async fn delete_photo(
    pool: &SqlitePool,
    user_id: &Uuid,
    family_id: &Uuid,
    photo_id: &Uuid,
) -> Result<(), ContentError> {
    authorize(pool, family_id, user_id, Capability::Delete).await?;

    let deleted = sqlx::query("DELETE FROM photos WHERE id = ? AND family_id = ?")
        .bind(photo_id)
        .bind(family_id)
        .execute(pool)
        .await?;
    if deleted.rows_affected() == 0 {
        return Err(ContentError::NotFound("Photo"));
    }

    log::info!("User {} deleted photo {}", user_id, photo_id);
    Ok(())
}
