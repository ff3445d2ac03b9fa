use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use thiserror::Error;
use uuid::Uuid;

use crate::integrations::{BillingError, BillingProvider};
use crate::models::{SubscriptionRow, UserRow};
use crate::services::error::{ErrorKind, ServiceError};
use shared::{CheckoutResponse, Subscription, SubscriptionStatusResponse, SUBSCRIPTION_STATUS_ACTIVE};

#[derive(Debug, Error)]
pub enum SubscriptionError {
    #[error("User not found")]
    UserNotFound,
    #[error("Subscription not found")]
    NotFound,
    #[error("{0}")]
    InvalidInput(&'static str),
    #[error("Billing provider error: {0}")]
    Billing(#[from] BillingError),
    #[error("Database error: {0}")]
    DatabaseError(#[from] sqlx::Error),
}

impl ServiceError for SubscriptionError {
    fn kind(&self) -> ErrorKind {
        match self {
            // An event naming an unknown user can never succeed
            SubscriptionError::UserNotFound | SubscriptionError::InvalidInput(_) => ErrorKind::InvalidInput,
            SubscriptionError::NotFound => ErrorKind::NotFound,
            SubscriptionError::Billing(_) => ErrorKind::UpstreamFailure,
            SubscriptionError::DatabaseError(e) => ErrorKind::from_db(e),
        }
    }
}

/// A completed checkout, enriched with the subscription's current state.
#[derive(Debug, Clone)]
pub struct CheckoutCompleted {
    pub external_subscription_id: String,
    pub user_id: Uuid,
    pub price_id: String,
    pub status: String,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
}

fn is_active(status: &str) -> bool {
    status == SUBSCRIPTION_STATUS_ACTIVE
}

/// Record a completed checkout. Replaying the same event leaves the same
/// state behind, and a late event for a subscription older than the one
/// on record is ignored.
pub async fn on_checkout_completed(
    pool: &SqlitePool,
    event: &CheckoutCompleted,
) -> Result<Subscription, SubscriptionError> {
    let now = Utc::now();
    let mut tx = pool.begin().await?;

    // Writing first takes the write lock before anything is read
    let touched = sqlx::query("UPDATE users SET updated_at = ? WHERE id = ?")
        .bind(now)
        .bind(event.user_id)
        .execute(&mut *tx)
        .await?;

    if touched.rows_affected() == 0 {
        tx.rollback().await?;
        return Err(SubscriptionError::UserNotFound);
    }

    let upserted: Option<SubscriptionRow> = sqlx::query_as(
        r#"
        INSERT INTO subscriptions (id, user_id, external_subscription_id, status, price_id, start_date, end_date, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
        ON CONFLICT(external_subscription_id) DO UPDATE SET
            user_id = excluded.user_id,
            status = excluded.status,
            price_id = excluded.price_id,
            start_date = excluded.start_date,
            end_date = excluded.end_date,
            updated_at = excluded.updated_at
        ON CONFLICT(user_id) DO UPDATE SET
            external_subscription_id = excluded.external_subscription_id,
            status = excluded.status,
            price_id = excluded.price_id,
            start_date = excluded.start_date,
            end_date = excluded.end_date,
            updated_at = excluded.updated_at
        WHERE excluded.start_date >= subscriptions.start_date
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(event.user_id)
    .bind(&event.external_subscription_id)
    .bind(&event.status)
    .bind(&event.price_id)
    .bind(event.start_date)
    .bind(event.end_date)
    .bind(now)
    .bind(now)
    .fetch_optional(&mut *tx)
    .await?;

    let row = match upserted {
        Some(row) => row,
        None => {
            log::info!(
                "Ignoring checkout for superseded subscription {} of user {}",
                event.external_subscription_id,
                event.user_id
            );
            sqlx::query_as("SELECT * FROM subscriptions WHERE user_id = ?")
                .bind(event.user_id)
                .fetch_one(&mut *tx)
                .await?
        }
    };

    sqlx::query("UPDATE users SET is_premium = ? WHERE id = ?")
        .bind(is_active(&row.status))
        .bind(row.user_id)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;

    log::info!(
        "Subscription {} for user {} upserted with status {}",
        row.external_subscription_id,
        row.user_id,
        row.status
    );
    Ok(row.to_shared())
}

/// Mirror a provider-side status change onto the subscription and the
/// owner's premium flag.
pub async fn apply_status_change(
    pool: &SqlitePool,
    external_subscription_id: &str,
    status: &str,
) -> Result<Subscription, SubscriptionError> {
    if status.trim().is_empty() {
        return Err(SubscriptionError::InvalidInput("Subscription status is required"));
    }

    let now = Utc::now();
    let mut tx = pool.begin().await?;

    let Some(row) = sqlx::query_as::<_, SubscriptionRow>(
        "UPDATE subscriptions SET status = ?, updated_at = ? WHERE external_subscription_id = ? RETURNING *",
    )
    .bind(status)
    .bind(now)
    .bind(external_subscription_id)
    .fetch_optional(&mut *tx)
    .await?
    else {
        tx.rollback().await?;
        return Err(SubscriptionError::NotFound);
    };

    sqlx::query("UPDATE users SET is_premium = ?, updated_at = ? WHERE id = ?")
        .bind(is_active(&row.status))
        .bind(now)
        .bind(row.user_id)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;

    log::info!("Subscription {} is now {}", external_subscription_id, status);
    Ok(row.to_shared())
}

/// Report whether the user has an active subscription, re-syncing the
/// premium flag on the way.
pub async fn poll_subscription_status(
    pool: &SqlitePool,
    user_id: &Uuid,
) -> Result<SubscriptionStatusResponse, SubscriptionError> {
    let row: Option<SubscriptionRow> = sqlx::query_as("SELECT * FROM subscriptions WHERE user_id = ?")
        .bind(user_id)
        .fetch_optional(pool)
        .await?;

    let is_subscribed = row.as_ref().is_some_and(|r| is_active(&r.status));

    sqlx::query("UPDATE users SET is_premium = ?, updated_at = ? WHERE id = ? AND is_premium != ?")
        .bind(is_subscribed)
        .bind(Utc::now())
        .bind(user_id)
        .bind(is_subscribed)
        .execute(pool)
        .await?;

    Ok(SubscriptionStatusResponse { is_subscribed })
}

pub async fn create_checkout(
    pool: &SqlitePool,
    billing: &dyn BillingProvider,
    user_id: &Uuid,
    price_id: &str,
) -> Result<CheckoutResponse, SubscriptionError> {
    let price_id = price_id.trim();
    if price_id.is_empty() {
        return Err(SubscriptionError::InvalidInput("Price id is required"));
    }

    let user: UserRow = sqlx::query_as("SELECT * FROM users WHERE id = ?")
        .bind(user_id)
        .fetch_optional(pool)
        .await?
        .ok_or(SubscriptionError::UserNotFound)?;

    let session = billing
        .create_checkout_session(price_id, user_id, &user.email)
        .await?;

    log::info!("Checkout session {} created for user {}", session.id, user_id);
    Ok(CheckoutResponse { url: session.url })
}
