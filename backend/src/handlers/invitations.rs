use actix_web::{web, HttpResponse, Result};
use shared::{ApiSuccess, CreateInvitationRequest, RedeemInvitationRequest};

use crate::handlers::{authenticate, error_response, parse_id};
use crate::models::AppState;
use crate::services::invitations as invitation_service;

/// Redemption is reachable without a session: the code is the credential.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(web::scope("/invitations").route("/redeem", web::post().to(redeem_invitation)));
}

/// Routes nested under `/families/{family_id}`.
pub fn configure_family(cfg: &mut web::ServiceConfig) {
    cfg.route("/invitations", web::post().to(create_invitation));
}

async fn create_invitation(
    state: web::Data<AppState>,
    req: actix_web::HttpRequest,
    path: web::Path<String>,
    body: web::Json<CreateInvitationRequest>,
) -> Result<HttpResponse> {
    let identity = match authenticate(&req, &state).await {
        Ok(identity) => identity,
        Err(response) => return Ok(response),
    };

    let family_id = match parse_id(&path.into_inner(), "family") {
        Ok(id) => id,
        Err(response) => return Ok(response),
    };

    match invitation_service::create_invitation(
        &state.db,
        state.mailer.as_ref(),
        &identity.user_id,
        &family_id,
        &body.email,
    )
    .await
    {
        Ok(invitation) => Ok(HttpResponse::Created().json(ApiSuccess::new(invitation))),
        Err(e) => Ok(error_response("Error creating invitation", e)),
    }
}

async fn redeem_invitation(
    state: web::Data<AppState>,
    body: web::Json<RedeemInvitationRequest>,
) -> Result<HttpResponse> {
    match invitation_service::redeem_invitation(&state.db, &body.invite_code).await {
        Ok(redeemed) => Ok(HttpResponse::Ok().json(ApiSuccess::new(redeemed))),
        Err(e) => Ok(error_response("Error redeeming invitation", e)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handlers::testing::{bearer, test_state, test_state_with};
    use crate::integrations::billing::testing::FakeBilling;
    use crate::integrations::email::testing::RecordingMailer;
    use crate::services::families;
    use crate::services::testing::{add_member, create_user};
    use actix_web::{http::StatusCode, test, App};
    use chrono::{Duration, Utc};
    use serde_json::json;
    use shared::{FamilyRole, Invitation, RedeemInvitationResponse};
    use std::sync::Arc;

    #[actix_web::test]
    async fn test_invite_and_redeem() {
        let mailer = Arc::new(RecordingMailer::default());
        let state = test_state_with(mailer.clone(), Arc::new(FakeBilling::default())).await;
        let owner = create_user(&state.db, "a@example.com").await;
        let family = families::create_family(&state.db, &owner, "Smiths").await.unwrap();
        let app = test::init_service(
            App::new()
                .app_data(state.clone())
                .configure(crate::handlers::configure_routes),
        )
        .await;

        let req = test::TestRequest::post()
            .uri(&format!("/api/families/{}/invitations", family.id))
            .insert_header(bearer(&state, &owner))
            .set_json(json!({ "email": "New@Example.com" }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::CREATED);
        let invitation: ApiSuccess<Invitation> = test::read_body_json(resp).await;
        assert_eq!(invitation.data.email, "new@example.com");

        let sent = mailer.sent();
        assert_eq!(sent.len(), 1);
        assert!(sent[0].html.contains(&invitation.data.invite_code));

        let req = test::TestRequest::post()
            .uri("/api/invitations/redeem")
            .set_json(json!({ "invite_code": invitation.data.invite_code }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let redeemed: ApiSuccess<RedeemInvitationResponse> = test::read_body_json(resp).await;
        assert_eq!(redeemed.data.family_id, family.id);
        assert_eq!(redeemed.data.membership.role, FamilyRole::Viewer);

        // Codes are single-use
        let req = test::TestRequest::post()
            .uri("/api/invitations/redeem")
            .set_json(json!({ "invite_code": invitation.data.invite_code }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[actix_web::test]
    async fn test_viewer_cannot_invite() {
        let state = test_state().await;
        let owner = create_user(&state.db, "a@example.com").await;
        let viewer = create_user(&state.db, "v@example.com").await;
        let family = families::create_family(&state.db, &owner, "Smiths").await.unwrap();
        add_member(&state.db, &family.id, &viewer, FamilyRole::Viewer).await;
        let app = test::init_service(
            App::new()
                .app_data(state.clone())
                .configure(crate::handlers::configure_routes),
        )
        .await;

        let req = test::TestRequest::post()
            .uri(&format!("/api/families/{}/invitations", family.id))
            .insert_header(bearer(&state, &viewer))
            .set_json(json!({ "email": "new@example.com" }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::FORBIDDEN);
    }

    #[actix_web::test]
    async fn test_expired_code_is_gone() {
        let state = test_state().await;
        let owner = create_user(&state.db, "a@example.com").await;
        let family = families::create_family(&state.db, &owner, "Smiths").await.unwrap();
        let invitation = invitation_service::create_invitation(
            &state.db,
            state.mailer.as_ref(),
            &owner,
            &family.id,
            "late@example.com",
        )
        .await
        .unwrap();

        sqlx::query("UPDATE invitations SET expires_at = ? WHERE id = ?")
            .bind(Utc::now() - Duration::days(1))
            .bind(invitation.id)
            .execute(&state.db)
            .await
            .unwrap();

        let app = test::init_service(
            App::new()
                .app_data(state.clone())
                .configure(crate::handlers::configure_routes),
        )
        .await;

        let req = test::TestRequest::post()
            .uri("/api/invitations/redeem")
            .set_json(json!({ "invite_code": invitation.invite_code }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::GONE);
    }
}
