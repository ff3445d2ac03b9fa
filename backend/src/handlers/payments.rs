use actix_web::{web, HttpResponse, Result};
use chrono::Utc;
use serde_json::json;
use shared::{ApiSuccess, CheckoutRequest};

use crate::handlers::{authenticate, error_response};
use crate::models::AppState;
use crate::services::{subscriptions as subscription_service, webhooks};

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/payments")
            .route("/checkout", web::post().to(create_checkout))
            .route("/subscription", web::get().to(subscription_status))
            .route("/webhook", web::post().to(webhook))
    );
}

async fn create_checkout(
    state: web::Data<AppState>,
    req: actix_web::HttpRequest,
    body: web::Json<CheckoutRequest>,
) -> Result<HttpResponse> {
    let identity = match authenticate(&req, &state).await {
        Ok(identity) => identity,
        Err(response) => return Ok(response),
    };

    match subscription_service::create_checkout(
        &state.db,
        state.billing.as_ref(),
        &identity.user_id,
        &body.price_id,
    )
    .await
    {
        Ok(checkout) => Ok(HttpResponse::Ok().json(ApiSuccess::new(checkout))),
        Err(e) => Ok(error_response("Error creating checkout session", e)),
    }
}

async fn subscription_status(
    state: web::Data<AppState>,
    req: actix_web::HttpRequest,
) -> Result<HttpResponse> {
    let identity = match authenticate(&req, &state).await {
        Ok(identity) => identity,
        Err(response) => return Ok(response),
    };

    match subscription_service::poll_subscription_status(&state.db, &identity.user_id).await {
        Ok(status) => Ok(HttpResponse::Ok().json(ApiSuccess::new(status))),
        Err(e) => Ok(error_response("Error fetching subscription", e)),
    }
}

/// Billing provider callback. Authenticated by signature, not by session.
async fn webhook(
    state: web::Data<AppState>,
    req: actix_web::HttpRequest,
    body: web::Bytes,
) -> Result<HttpResponse> {
    let signature = req
        .headers()
        .get("Stripe-Signature")
        .and_then(|v| v.to_str().ok());

    if let Err(e) = webhooks::verify_signature(
        &state.config.stripe_webhook_secret,
        signature,
        &body,
        Utc::now().timestamp(),
    ) {
        log::warn!("Rejected webhook: {}", e);
        return Ok(error_response("Webhook verification", e));
    }

    let event = match webhooks::parse_event(&body) {
        Ok(event) => event,
        Err(e) => {
            log::warn!("Rejected webhook payload: {}", e);
            return Ok(error_response("Webhook payload", e));
        }
    };

    match webhooks::handle_event(&state.db, state.billing.as_ref(), &event).await {
        Ok(outcome) => {
            log::info!("Webhook {} ({}) handled: {:?}", event.id, event.event_type, outcome);
            Ok(HttpResponse::Ok().json(json!({ "received": true })))
        }
        Err(e) => {
            log::warn!("Webhook {} ({}) failed: {}", event.id, event.event_type, e);
            Ok(error_response("Error handling webhook", e))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handlers::testing::{bearer, test_state_with};
    use crate::integrations::billing::testing::FakeBilling;
    use crate::integrations::email::testing::RecordingMailer;
    use crate::services::testing::{create_user, is_premium};
    use crate::services::webhooks::testing::sign;
    use actix_web::{http::StatusCode, test, App};
    use shared::{CheckoutResponse, SubscriptionStatusResponse};
    use std::sync::Arc;

    fn checkout_event(user_id: &uuid::Uuid) -> String {
        json!({
            "id": "evt_1",
            "type": "checkout.session.completed",
            "data": { "object": {
                "subscription": "sub_1",
                "metadata": { "userId": user_id.to_string(), "priceId": "price_basic" }
            }}
        })
        .to_string()
    }

    #[actix_web::test]
    async fn test_signed_webhook_activates_subscription() {
        let billing = Arc::new(FakeBilling::with_subscription("sub_1", "active"));
        let state = test_state_with(Arc::new(RecordingMailer::default()), billing).await;
        let user = create_user(&state.db, "a@example.com").await;
        let app = test::init_service(
            App::new()
                .app_data(state.clone())
                .configure(crate::handlers::configure_routes),
        )
        .await;

        let payload = checkout_event(&user);
        let header = sign(&state.config.stripe_webhook_secret, Utc::now().timestamp(), &payload);
        let req = test::TestRequest::post()
            .uri("/api/payments/webhook")
            .insert_header(("Stripe-Signature", header))
            .set_payload(payload)
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert!(is_premium(&state.db, &user).await);

        let req = test::TestRequest::get()
            .uri("/api/payments/subscription")
            .insert_header(bearer(&state, &user))
            .to_request();
        let resp = test::call_service(&app, req).await;
        let status: ApiSuccess<SubscriptionStatusResponse> = test::read_body_json(resp).await;
        assert!(status.data.is_subscribed);
    }

    #[actix_web::test]
    async fn test_bad_signature_mutates_nothing() {
        let billing = Arc::new(FakeBilling::with_subscription("sub_1", "active"));
        let state = test_state_with(Arc::new(RecordingMailer::default()), billing).await;
        let user = create_user(&state.db, "a@example.com").await;
        let app = test::init_service(
            App::new()
                .app_data(state.clone())
                .configure(crate::handlers::configure_routes),
        )
        .await;

        let payload = checkout_event(&user);
        let header = sign("whsec_wrong", Utc::now().timestamp(), &payload);
        let req = test::TestRequest::post()
            .uri("/api/payments/webhook")
            .insert_header(("Stripe-Signature", header))
            .set_payload(payload)
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        assert!(!is_premium(&state.db, &user).await);

        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM subscriptions")
            .fetch_one(&state.db)
            .await
            .unwrap();
        assert_eq!(count, 0);
    }

    #[actix_web::test]
    async fn test_checkout_returns_provider_url() {
        let state = test_state_with(
            Arc::new(RecordingMailer::default()),
            Arc::new(FakeBilling::default()),
        )
        .await;
        let user = create_user(&state.db, "a@example.com").await;
        let app = test::init_service(
            App::new()
                .app_data(state.clone())
                .configure(crate::handlers::configure_routes),
        )
        .await;

        let req = test::TestRequest::post()
            .uri("/api/payments/checkout")
            .insert_header(bearer(&state, &user))
            .set_json(json!({ "price_id": "price_basic" }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let body: ApiSuccess<CheckoutResponse> = test::read_body_json(resp).await;
        assert!(body.data.url.starts_with("https://checkout.stripe.com/"));
    }
}
