use thiserror::Error;

use crate::integrations::{DeliveryError, Mailer};
use crate::services::auth::{is_valid_email, normalize_email};
use crate::services::error::{ErrorKind, ServiceError};
use shared::ContactRequest;

#[derive(Debug, Error)]
pub enum ContactError {
    #[error("{0}")]
    InvalidInput(&'static str),
    #[error("Failed to deliver message: {0}")]
    Delivery(#[from] DeliveryError),
}

impl ServiceError for ContactError {
    fn kind(&self) -> ErrorKind {
        match self {
            ContactError::InvalidInput(_) => ErrorKind::InvalidInput,
            ContactError::Delivery(_) => ErrorKind::UpstreamFailure,
        }
    }
}

fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

fn contact_html(name: &str, email: &str, phone: &str, message: &str) -> String {
    format!(
        "<h1>New Contact Form Submission</h1>\
         <p><strong>Name:</strong> {}</p>\
         <p><strong>Email:</strong> {}</p>\
         <p><strong>Phone:</strong> {}</p>\
         <h2>Message:</h2><p>{}</p>",
        escape_html(name),
        escape_html(email),
        escape_html(phone),
        escape_html(message).replace('\n', "<br>"),
    )
}

/// Forward a contact form submission to the site inbox.
pub async fn send_contact_message(
    mailer: &dyn Mailer,
    inbox: &str,
    request: &ContactRequest,
) -> Result<(), ContactError> {
    let name = request.full_name.trim();
    let phone = request.phone.trim();
    let message = request.message.trim();
    if name.is_empty() || phone.is_empty() || message.is_empty() || request.email.trim().is_empty() {
        return Err(ContactError::InvalidInput("All fields are required"));
    }

    let email = normalize_email(&request.email);
    if !is_valid_email(&email) {
        return Err(ContactError::InvalidInput("Invalid email format"));
    }

    let subject = format!("New Contact Form Submission from {}", name);
    mailer
        .send_email(inbox, &subject, &contact_html(name, &email, phone, message))
        .await?;

    log::info!("Forwarded contact message from {}", email);
    Ok(())
}
