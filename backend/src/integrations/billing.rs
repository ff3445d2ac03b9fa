use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use serde::Deserialize;
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum BillingError {
    #[error("Billing request failed: {0}")]
    Network(#[from] reqwest::Error),
    #[error("Billing provider error ({status}): {body}")]
    Provider { status: u16, body: String },
    #[error("Billing provider returned an invalid timestamp")]
    InvalidTimestamp,
    #[error("Subscription {0} not found at billing provider")]
    SubscriptionNotFound(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckoutSession {
    pub id: String,
    pub url: String,
}

/// Subscription state as reported by the billing provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderSubscription {
    pub id: String,
    pub status: String,
    pub start_date: DateTime<Utc>,
    pub current_period_end: DateTime<Utc>,
}

#[async_trait]
pub trait BillingProvider: Send + Sync {
    async fn create_checkout_session(
        &self,
        price_id: &str,
        user_id: &Uuid,
        email: &str,
    ) -> Result<CheckoutSession, BillingError>;

    async fn retrieve_subscription(&self, subscription_id: &str) -> Result<ProviderSubscription, BillingError>;
}

const STRIPE_API_BASE: &str = "https://api.stripe.com";

pub struct StripeClient {
    secret_key: String,
    site_url: String,
    api_base_url: String,
    http_client: reqwest::Client,
}

#[derive(Debug, Deserialize)]
struct StripeCheckoutSession {
    id: String,
    url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct StripeSubscription {
    id: String,
    status: String,
    start_date: i64,
    current_period_end: i64,
}

fn from_unix(secs: i64) -> Result<DateTime<Utc>, BillingError> {
    Utc.timestamp_opt(secs, 0)
        .single()
        .ok_or(BillingError::InvalidTimestamp)
}

impl StripeClient {
    pub fn new(secret_key: impl Into<String>, site_url: impl Into<String>) -> Self {
        Self {
            secret_key: secret_key.into(),
            site_url: site_url.into(),
            api_base_url: STRIPE_API_BASE.to_string(),
            http_client: reqwest::Client::new(),
        }
    }

    fn checkout_params(&self, price_id: &str, user_id: &Uuid, email: &str) -> Vec<(&'static str, String)> {
        let site = self.site_url.trim_end_matches('/');
        vec![
            ("mode", "subscription".to_string()),
            ("customer_email", email.to_string()),
            ("line_items[0][price]", price_id.to_string()),
            ("line_items[0][quantity]", "1".to_string()),
            ("success_url", format!("{}/dashboard?checkout=success", site)),
            ("cancel_url", format!("{}/pricing?checkout=canceled", site)),
            ("metadata[userId]", user_id.to_string()),
            ("metadata[priceId]", price_id.to_string()),
        ]
    }

    async fn provider_error(response: reqwest::Response) -> BillingError {
        let status = response.status().as_u16();
        let body = response.text().await.unwrap_or_default();
        BillingError::Provider { status, body }
    }
}

#[async_trait]
impl BillingProvider for StripeClient {
    async fn create_checkout_session(
        &self,
        price_id: &str,
        user_id: &Uuid,
        email: &str,
    ) -> Result<CheckoutSession, BillingError> {
        let url = format!("{}/v1/checkout/sessions", self.api_base_url);

        let response = self
            .http_client
            .post(&url)
            .basic_auth(&self.secret_key, Option::<&str>::None)
            .form(&self.checkout_params(price_id, user_id, email))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Self::provider_error(response).await);
        }

        let session: StripeCheckoutSession = response.json().await?;
        let url = session
            .url
            .unwrap_or_else(|| format!("https://checkout.stripe.com/c/pay/{}", session.id));

        Ok(CheckoutSession { id: session.id, url })
    }

    async fn retrieve_subscription(&self, subscription_id: &str) -> Result<ProviderSubscription, BillingError> {
        let url = format!("{}/v1/subscriptions/{}", self.api_base_url, subscription_id);

        let response = self
            .http_client
            .get(&url)
            .basic_auth(&self.secret_key, Option::<&str>::None)
            .send()
            .await?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(BillingError::SubscriptionNotFound(subscription_id.to_string()));
        }
        if !response.status().is_success() {
            return Err(Self::provider_error(response).await);
        }

        let sub: StripeSubscription = response.json().await?;
        Ok(ProviderSubscription {
            id: sub.id,
            status: sub.status,
            start_date: from_unix(sub.start_date)?,
            current_period_end: from_unix(sub.current_period_end)?,
        })
    }
}
