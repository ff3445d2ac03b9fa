use actix_web::{web, HttpResponse, Result};
use shared::{ApiSuccess, ContactRequest};

use crate::handlers::error_response;
use crate::models::AppState;
use crate::services::contact as contact_service;

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/contact", web::post().to(send_message));
}

/// Public contact form. No sign-in required.
async fn send_message(
    state: web::Data<AppState>,
    body: web::Json<ContactRequest>,
) -> Result<HttpResponse> {
    match contact_service::send_contact_message(state.mailer.as_ref(), &state.config.contact_email, &body).await {
        Ok(()) => Ok(HttpResponse::Ok().json(ApiSuccess::new("Your message has been sent"))),
        Err(e) => Ok(error_response("Error sending contact message", e)),
    }
}
