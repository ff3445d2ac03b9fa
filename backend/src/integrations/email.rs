use async_trait::async_trait;
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DeliveryError {
    #[error("Email request failed: {0}")]
    Network(#[from] reqwest::Error),
    #[error("Email provider rejected the message ({status}): {body}")]
    Rejected { status: u16, body: String },
}

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send_email(&self, to: &str, subject: &str, html: &str) -> Result<(), DeliveryError>;
}

const SENDGRID_URL: &str = "https://api.sendgrid.com/v3/mail/send";

pub struct SendGridMailer {
    api_key: String,
    from: String,
    http_client: reqwest::Client,
}

impl SendGridMailer {
    pub fn new(api_key: impl Into<String>, from: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            from: from.into(),
            http_client: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl Mailer for SendGridMailer {
    async fn send_email(&self, to: &str, subject: &str, html: &str) -> Result<(), DeliveryError> {
        let body = json!({
            "personalizations": [{ "to": [{ "email": to }] }],
            "from": { "email": self.from },
            "subject": subject,
            "content": [{ "type": "text/html", "value": html }],
        });

        let response = self
            .http_client
            .post(SENDGRID_URL)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(DeliveryError::Rejected { status, body });
        }

        Ok(())
    }
}

/// Writes messages to the log instead of sending them. Used when no email
/// provider is configured.
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send_email(&self, to: &str, subject: &str, html: &str) -> Result<(), DeliveryError> {
        log::info!("Email to {} ({}): {}", to, subject, html);
        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use std::sync::Mutex;

    #[derive(Debug, Clone)]
    pub struct SentEmail {
        pub to: String,
        pub subject: String,
        pub html: String,
    }

    #[derive(Default)]
    pub struct RecordingMailer {
        pub sent: Mutex<Vec<SentEmail>>,
    }

    impl RecordingMailer {
        pub fn sent(&self) -> Vec<SentEmail> {
            self.sent.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Mailer for RecordingMailer {
        async fn send_email(&self, to: &str, subject: &str, html: &str) -> Result<(), DeliveryError> {
            self.sent.lock().unwrap().push(SentEmail {
                to: to.to_string(),
                subject: subject.to_string(),
                html: html.to_string(),
            });
            Ok(())
        }
    }

    pub struct FailingMailer;

    #[async_trait]
    impl Mailer for FailingMailer {
        async fn send_email(&self, _to: &str, _subject: &str, _html: &str) -> Result<(), DeliveryError> {
            Err(DeliveryError::Rejected {
                status: 503,
                body: "unavailable".to_string(),
            })
        }
    }
}
