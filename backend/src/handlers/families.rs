use actix_web::{web, HttpResponse, Result};
use shared::{ApiSuccess, CreateFamilyRequest, UpdateRoleRequest};

use crate::handlers::{authenticate, error_response, events, invitations, parse_id, photos, posts};
use crate::models::AppState;
use crate::services::families::{self as family_service, FamilyError};

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/families")
            .route("", web::get().to(list_families))
            .route("", web::post().to(create_family))
            .route("/{id}", web::get().to(get_family))
            .route("/{id}/membership", web::get().to(get_membership))
            .route("/{id}/leave", web::post().to(leave_family))
            .route("/{id}/members", web::get().to(list_members))
            .route("/{id}/members/{member_id}", web::delete().to(remove_member))
            .route("/{id}/members/{member_id}/role", web::put().to(change_role))
            .route("/{id}/members/{member_id}/transfer-admin", web::post().to(transfer_admin))
            .service(
                web::scope("/{family_id}")
                    .configure(invitations::configure_family)
                    .configure(posts::configure)
                    .configure(events::configure)
                    .configure(photos::configure)
            )
    );
}

async fn list_families(
    state: web::Data<AppState>,
    req: actix_web::HttpRequest,
) -> Result<HttpResponse> {
    let identity = match authenticate(&req, &state).await {
        Ok(identity) => identity,
        Err(response) => return Ok(response),
    };

    match family_service::list_families_for_user(&state.db, &identity.user_id).await {
        Ok(families) => Ok(HttpResponse::Ok().json(ApiSuccess::new(families))),
        Err(e) => Ok(error_response("Error listing families", e)),
    }
}

async fn create_family(
    state: web::Data<AppState>,
    req: actix_web::HttpRequest,
    body: web::Json<CreateFamilyRequest>,
) -> Result<HttpResponse> {
    let identity = match authenticate(&req, &state).await {
        Ok(identity) => identity,
        Err(response) => return Ok(response),
    };

    match family_service::create_family(&state.db, &identity.user_id, &body.name).await {
        Ok(family) => Ok(HttpResponse::Created().json(ApiSuccess::new(family))),
        Err(e) => Ok(error_response("Error creating family", e)),
    }
}

async fn get_family(
    state: web::Data<AppState>,
    req: actix_web::HttpRequest,
    path: web::Path<String>,
) -> Result<HttpResponse> {
    let identity = match authenticate(&req, &state).await {
        Ok(identity) => identity,
        Err(response) => return Ok(response),
    };

    let family_id = match parse_id(&path.into_inner(), "family") {
        Ok(id) => id,
        Err(response) => return Ok(response),
    };

    match family_service::get_family(&state.db, &identity.user_id, &family_id).await {
        Ok(detail) => Ok(HttpResponse::Ok().json(ApiSuccess::new(detail))),
        Err(e) => Ok(error_response("Error fetching family", e)),
    }
}

/// The caller's own membership in the family.
async fn get_membership(
    state: web::Data<AppState>,
    req: actix_web::HttpRequest,
    path: web::Path<String>,
) -> Result<HttpResponse> {
    let identity = match authenticate(&req, &state).await {
        Ok(identity) => identity,
        Err(response) => return Ok(response),
    };

    let family_id = match parse_id(&path.into_inner(), "family") {
        Ok(id) => id,
        Err(response) => return Ok(response),
    };

    match family_service::get_membership(&state.db, &identity.user_id, &family_id).await {
        Ok(Some(membership)) => Ok(HttpResponse::Ok().json(ApiSuccess::new(membership))),
        Ok(None) => Ok(error_response("Error fetching membership", FamilyError::NotAMember)),
        Err(e) => Ok(error_response("Error fetching membership", e)),
    }
}

async fn leave_family(
    state: web::Data<AppState>,
    req: actix_web::HttpRequest,
    path: web::Path<String>,
) -> Result<HttpResponse> {
    let identity = match authenticate(&req, &state).await {
        Ok(identity) => identity,
        Err(response) => return Ok(response),
    };

    let family_id = match parse_id(&path.into_inner(), "family") {
        Ok(id) => id,
        Err(response) => return Ok(response),
    };

    match family_service::leave_family(&state.db, &identity.user_id, &family_id).await {
        Ok(()) => Ok(HttpResponse::NoContent().finish()),
        Err(e) => Ok(error_response("Error leaving family", e)),
    }
}

async fn list_members(
    state: web::Data<AppState>,
    req: actix_web::HttpRequest,
    path: web::Path<String>,
) -> Result<HttpResponse> {
    let identity = match authenticate(&req, &state).await {
        Ok(identity) => identity,
        Err(response) => return Ok(response),
    };

    let family_id = match parse_id(&path.into_inner(), "family") {
        Ok(id) => id,
        Err(response) => return Ok(response),
    };

    match family_service::list_members(&state.db, &identity.user_id, &family_id).await {
        Ok(members) => Ok(HttpResponse::Ok().json(ApiSuccess::new(members))),
        Err(e) => Ok(error_response("Error listing members", e)),
    }
}

async fn change_role(
    state: web::Data<AppState>,
    req: actix_web::HttpRequest,
    path: web::Path<(String, String)>,
    body: web::Json<UpdateRoleRequest>,
) -> Result<HttpResponse> {
    let identity = match authenticate(&req, &state).await {
        Ok(identity) => identity,
        Err(response) => return Ok(response),
    };

    let (family_id, member_id) = path.into_inner();
    let family_id = match parse_id(&family_id, "family") {
        Ok(id) => id,
        Err(response) => return Ok(response),
    };
    let member_id = match parse_id(&member_id, "member") {
        Ok(id) => id,
        Err(response) => return Ok(response),
    };

    match family_service::change_role(&state.db, &identity.user_id, &family_id, &member_id, body.role).await {
        Ok(membership) => Ok(HttpResponse::Ok().json(ApiSuccess::new(membership))),
        Err(e) => Ok(error_response("Error changing member role", e)),
    }
}

async fn remove_member(
    state: web::Data<AppState>,
    req: actix_web::HttpRequest,
    path: web::Path<(String, String)>,
) -> Result<HttpResponse> {
    let identity = match authenticate(&req, &state).await {
        Ok(identity) => identity,
        Err(response) => return Ok(response),
    };

    let (family_id, member_id) = path.into_inner();
    let family_id = match parse_id(&family_id, "family") {
        Ok(id) => id,
        Err(response) => return Ok(response),
    };
    let member_id = match parse_id(&member_id, "member") {
        Ok(id) => id,
        Err(response) => return Ok(response),
    };

    match family_service::remove_member(&state.db, &identity.user_id, &family_id, &member_id).await {
        Ok(()) => Ok(HttpResponse::NoContent().finish()),
        Err(e) => Ok(error_response("Error removing member", e)),
    }
}

async fn transfer_admin(
    state: web::Data<AppState>,
    req: actix_web::HttpRequest,
    path: web::Path<(String, String)>,
) -> Result<HttpResponse> {
    let identity = match authenticate(&req, &state).await {
        Ok(identity) => identity,
        Err(response) => return Ok(response),
    };

    let (family_id, member_id) = path.into_inner();
    let family_id = match parse_id(&family_id, "family") {
        Ok(id) => id,
        Err(response) => return Ok(response),
    };
    let member_id = match parse_id(&member_id, "member") {
        Ok(id) => id,
        Err(response) => return Ok(response),
    };

    match family_service::transfer_admin(&state.db, &identity.user_id, &family_id, &member_id).await {
        Ok(membership) => Ok(HttpResponse::Ok().json(ApiSuccess::new(membership))),
        Err(e) => Ok(error_response("Error transferring admin role", e)),
    }
}
