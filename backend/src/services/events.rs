use chrono::Utc;
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::models::EventRow;
use crate::services::content::{authorize, required_text, Capability, ContentError};
use shared::{CreateEventRequest, Event, EventStatus};

pub async fn list_events(pool: &SqlitePool, user_id: &Uuid, family_id: &Uuid) -> Result<Vec<Event>, ContentError> {
    authorize(pool, family_id, user_id, Capability::View).await?;

    let events: Vec<EventRow> =
        sqlx::query_as("SELECT * FROM events WHERE family_id = ? ORDER BY event_date ASC")
            .bind(family_id)
            .fetch_all(pool)
            .await?;

    Ok(events.into_iter().map(|e| e.to_shared()).collect())
}

/// New events start out pending.
pub async fn create_event(
    pool: &SqlitePool,
    user_id: &Uuid,
    family_id: &Uuid,
    request: &CreateEventRequest,
) -> Result<Event, ContentError> {
    authorize(pool, family_id, user_id, Capability::Create).await?;

    let title = required_text(&request.title, "Event title is required")?;
    let place = required_text(&request.place, "Event place is required")?;
    let description = request
        .description
        .as_deref()
        .map(str::trim)
        .filter(|d| !d.is_empty());

    let event: EventRow = sqlx::query_as(
        r#"
        INSERT INTO events (id, family_id, creator_id, title, description, place, event_date, status, created_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(family_id)
    .bind(user_id)
    .bind(title)
    .bind(description)
    .bind(place)
    .bind(request.date)
    .bind(EventStatus::Pending.as_str())
    .bind(Utc::now())
    .fetch_one(pool)
    .await?;

    log::info!("User {} created event {} in family {}", user_id, event.id, family_id);
    Ok(event.to_shared())
}

pub async fn update_event_status(
    pool: &SqlitePool,
    user_id: &Uuid,
    family_id: &Uuid,
    event_id: &Uuid,
    status: EventStatus,
) -> Result<Event, ContentError> {
    authorize(pool, family_id, user_id, Capability::Edit).await?;

    let event: EventRow = sqlx::query_as(
        "UPDATE events SET status = ? WHERE id = ? AND family_id = ? RETURNING *",
    )
    .bind(status.as_str())
    .bind(event_id)
    .bind(family_id)
    .fetch_optional(pool)
    .await?
    .ok_or(ContentError::NotFound("Event"))?;

    Ok(event.to_shared())
}

pub async fn delete_event(
    pool: &SqlitePool,
    user_id: &Uuid,
    family_id: &Uuid,
    event_id: &Uuid,
) -> Result<(), ContentError> {
    authorize(pool, family_id, user_id, Capability::Delete).await?;

    let deleted = sqlx::query("DELETE FROM events WHERE id = ? AND family_id = ?")
        .bind(event_id)
        .bind(family_id)
        .execute(pool)
        .await?;
    if deleted.rows_affected() == 0 {
        return Err(ContentError::NotFound("Event"));
    }

    log::info!("User {} deleted event {}", user_id, event_id);
    Ok(())
}
