//! Billing webhook ingestion: signature verification and event dispatch.

use hmac::{Hmac, Mac};
use serde::Deserialize;
use sha2::Sha256;
use sqlx::SqlitePool;
use subtle::ConstantTimeEq;
use thiserror::Error;
use uuid::Uuid;

use crate::integrations::{BillingError, BillingProvider};
use crate::services::error::{ErrorKind, ServiceError};
use crate::services::subscriptions::{self, CheckoutCompleted, SubscriptionError};

/// Events older than this are rejected as replays.
const MAX_EVENT_AGE_SECS: i64 = 300;
/// Tolerated clock skew for events stamped in the future.
const MAX_CLOCK_SKEW_SECS: i64 = 60;

#[derive(Debug, Error)]
pub enum WebhookError {
    #[error("Missing signature header")]
    MissingSignature,
    #[error("Malformed signature header: {0}")]
    MalformedSignature(&'static str),
    #[error("Webhook timestamp outside the accepted window")]
    TimestampOutOfRange,
    #[error("Invalid webhook signature")]
    InvalidSignature,
    #[error("Invalid webhook payload: {0}")]
    InvalidPayload(#[from] serde_json::Error),
    #[error("Webhook event is missing {0}")]
    MissingField(&'static str),
    #[error(transparent)]
    Subscription(#[from] SubscriptionError),
    #[error("Billing provider error: {0}")]
    Billing(#[from] BillingError),
}

impl ServiceError for WebhookError {
    fn kind(&self) -> ErrorKind {
        match self {
            WebhookError::Subscription(e) => e.kind(),
            WebhookError::Billing(_) => ErrorKind::UpstreamFailure,
            _ => ErrorKind::InvalidInput,
        }
    }
}

struct SignatureHeader {
    timestamp: i64,
    signatures: Vec<Vec<u8>>,
}

impl SignatureHeader {
    /// Parses `t=<timestamp>,v1=<hex>[,v1=<hex>...]`. Unknown keys are skipped.
    fn parse(header: &str) -> Result<Self, WebhookError> {
        let mut timestamp = None;
        let mut signatures = Vec::new();

        for part in header.split(',') {
            let (key, value) = part
                .trim()
                .split_once('=')
                .ok_or(WebhookError::MalformedSignature("expected key=value pairs"))?;

            match key {
                "t" => {
                    timestamp = Some(
                        value
                            .parse()
                            .map_err(|_| WebhookError::MalformedSignature("invalid timestamp"))?,
                    );
                }
                "v1" => {
                    let sig = hex::decode(value)
                        .map_err(|_| WebhookError::MalformedSignature("invalid v1 signature"))?;
                    signatures.push(sig);
                }
                _ => {}
            }
        }

        let timestamp = timestamp.ok_or(WebhookError::MalformedSignature("missing timestamp"))?;
        if signatures.is_empty() {
            return Err(WebhookError::MalformedSignature("missing v1 signature"));
        }

        Ok(Self { timestamp, signatures })
    }
}

fn compute_signature(secret: &str, timestamp: i64, payload: &[u8]) -> Result<Vec<u8>, WebhookError> {
    let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes())
        .map_err(|_| WebhookError::InvalidSignature)?;
    mac.update(timestamp.to_string().as_bytes());
    mac.update(b".");
    mac.update(payload);
    Ok(mac.finalize().into_bytes().to_vec())
}

/// Verify a `Stripe-Signature` header against the raw request body.
/// `now` is the current unix time.
pub fn verify_signature(
    secret: &str,
    header: Option<&str>,
    payload: &[u8],
    now: i64,
) -> Result<(), WebhookError> {
    if secret.is_empty() {
        log::error!("Webhook received but no webhook secret is configured");
        return Err(WebhookError::InvalidSignature);
    }

    let header = SignatureHeader::parse(header.ok_or(WebhookError::MissingSignature)?)?;

    let age = now
        .checked_sub(header.timestamp)
        .ok_or(WebhookError::TimestampOutOfRange)?;
    if !(-MAX_CLOCK_SKEW_SECS..=MAX_EVENT_AGE_SECS).contains(&age) {
        return Err(WebhookError::TimestampOutOfRange);
    }

    let expected = compute_signature(secret, header.timestamp, payload)?;
    let matched = header
        .signatures
        .iter()
        .any(|sig| sig.len() == expected.len() && bool::from(sig.ct_eq(&expected)));

    if !matched {
        return Err(WebhookError::InvalidSignature);
    }
    Ok(())
}

#[derive(Debug, Clone, Deserialize)]
pub struct StripeEvent {
    pub id: String,
    #[serde(rename = "type")]
    pub event_type: String,
    pub data: StripeEventData,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StripeEventData {
    pub object: serde_json::Value,
}

pub fn parse_event(payload: &[u8]) -> Result<StripeEvent, WebhookError> {
    Ok(serde_json::from_slice(payload)?)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WebhookOutcome {
    SubscriptionActivated { user_id: Uuid },
    StatusChanged { external_subscription_id: String, status: String },
    Ignored,
}

fn str_field<'a>(object: &'a serde_json::Value, pointer: &str, name: &'static str) -> Result<&'a str, WebhookError> {
    object
        .pointer(pointer)
        .and_then(|v| v.as_str())
        .filter(|s| !s.is_empty())
        .ok_or(WebhookError::MissingField(name))
}

/// Apply a verified event to local subscription state.
pub async fn handle_event(
    pool: &SqlitePool,
    billing: &dyn BillingProvider,
    event: &StripeEvent,
) -> Result<WebhookOutcome, WebhookError> {
    let object = &event.data.object;

    match event.event_type.as_str() {
        "checkout.session.completed" => {
            let subscription_id = str_field(object, "/subscription", "subscription")?;
            let user_id = str_field(object, "/metadata/userId", "metadata.userId")?
                .parse::<Uuid>()
                .map_err(|_| WebhookError::MissingField("metadata.userId"))?;
            let price_id = str_field(object, "/metadata/priceId", "metadata.priceId")?;

            let remote = billing.retrieve_subscription(subscription_id).await?;

            subscriptions::on_checkout_completed(
                pool,
                &CheckoutCompleted {
                    external_subscription_id: remote.id,
                    user_id,
                    price_id: price_id.to_string(),
                    status: remote.status,
                    start_date: remote.start_date,
                    end_date: remote.current_period_end,
                },
            )
            .await?;

            Ok(WebhookOutcome::SubscriptionActivated { user_id })
        }
        "customer.subscription.deleted" | "customer.subscription.updated" => {
            let subscription_id = str_field(object, "/id", "id")?;
            let status = str_field(object, "/status", "status")?;

            subscriptions::apply_status_change(pool, subscription_id, status).await?;

            Ok(WebhookOutcome::StatusChanged {
                external_subscription_id: subscription_id.to_string(),
                status: status.to_string(),
            })
        }
        other => {
            log::debug!("Ignoring webhook event {} of type {}", event.id, other);
            Ok(WebhookOutcome::Ignored)
        }
    }
}
