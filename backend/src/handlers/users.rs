use actix_web::{web, HttpResponse, Result};
use shared::{AdminUpdateUserRequest, ApiSuccess, UpdateProfileImageRequest, UpdateProfileRequest};

use crate::handlers::{authenticate, error_response, parse_id};
use crate::models::AppState;
use crate::services::{auth as auth_service, users as user_service};

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/users")
            .route("/me", web::put().to(update_profile))
            .route("/me", web::delete().to(delete_account))
            .route("/me/image", web::put().to(update_profile_image))
            .route("/{id}/profile", web::get().to(get_profile))
    )
    .service(
        web::scope("/admin/users")
            .route("", web::get().to(list_users))
            .route("/{id}", web::get().to(admin_get_user))
            .route("/{id}", web::put().to(admin_update_user))
            .route("/{id}", web::delete().to(admin_delete_user))
            .route("/{id}/posts", web::get().to(admin_user_posts))
            .route("/{id}/photos", web::get().to(admin_user_photos)),
    );
}

async fn update_profile(
    state: web::Data<AppState>,
    req: actix_web::HttpRequest,
    body: web::Json<UpdateProfileRequest>,
) -> Result<HttpResponse> {
    let identity = match authenticate(&req, &state).await {
        Ok(identity) => identity,
        Err(response) => return Ok(response),
    };

    match auth_service::update_profile(&state.db, &identity.user_id, &body.into_inner()).await {
        Ok(user) => Ok(HttpResponse::Ok().json(ApiSuccess::new(user))),
        Err(e) => Ok(error_response("Error updating profile", e)),
    }
}

async fn update_profile_image(
    state: web::Data<AppState>,
    req: actix_web::HttpRequest,
    body: web::Json<UpdateProfileImageRequest>,
) -> Result<HttpResponse> {
    let identity = match authenticate(&req, &state).await {
        Ok(identity) => identity,
        Err(response) => return Ok(response),
    };

    match user_service::update_profile_image(
        &state.db,
        &state.config.image_host_prefix,
        &identity.user_id,
        &body.image_url,
    )
    .await
    {
        Ok(user) => Ok(HttpResponse::Ok().json(ApiSuccess::new(user))),
        Err(e) => Ok(error_response("Error updating profile image", e)),
    }
}

/// `me` stands for the caller.
async fn get_profile(
    state: web::Data<AppState>,
    req: actix_web::HttpRequest,
    path: web::Path<String>,
) -> Result<HttpResponse> {
    let identity = match authenticate(&req, &state).await {
        Ok(identity) => identity,
        Err(response) => return Ok(response),
    };

    let raw = path.into_inner();
    let user_id = if raw == "me" {
        identity.user_id
    } else {
        match parse_id(&raw, "user") {
            Ok(id) => id,
            Err(response) => return Ok(response),
        }
    };

    match user_service::get_profile(&state.db, &identity.user_id, identity.role, &user_id).await {
        Ok(profile) => Ok(HttpResponse::Ok().json(ApiSuccess::new(profile))),
        Err(e) => Ok(error_response("Error fetching profile", e)),
    }
}

async fn delete_account(
    state: web::Data<AppState>,
    req: actix_web::HttpRequest,
) -> Result<HttpResponse> {
    let identity = match authenticate(&req, &state).await {
        Ok(identity) => identity,
        Err(response) => return Ok(response),
    };

    match auth_service::delete_account(&state.db, &identity.user_id).await {
        Ok(()) => Ok(HttpResponse::NoContent().finish()),
        Err(e) => Ok(error_response("Error deleting account", e)),
    }
}

async fn list_users(
    state: web::Data<AppState>,
    req: actix_web::HttpRequest,
) -> Result<HttpResponse> {
    let identity = match authenticate(&req, &state).await {
        Ok(identity) => identity,
        Err(response) => return Ok(response),
    };

    match auth_service::list_users(&state.db, identity.role).await {
        Ok(users) => Ok(HttpResponse::Ok().json(ApiSuccess::new(users))),
        Err(e) => Ok(error_response("Error listing users", e)),
    }
}

async fn admin_get_user(
    state: web::Data<AppState>,
    req: actix_web::HttpRequest,
    path: web::Path<String>,
) -> Result<HttpResponse> {
    let identity = match authenticate(&req, &state).await {
        Ok(identity) => identity,
        Err(response) => return Ok(response),
    };

    let user_id = match parse_id(&path.into_inner(), "user") {
        Ok(id) => id,
        Err(response) => return Ok(response),
    };

    match user_service::admin_get_user(&state.db, identity.role, &user_id).await {
        Ok(profile) => Ok(HttpResponse::Ok().json(ApiSuccess::new(profile))),
        Err(e) => Ok(error_response("Error fetching user", e)),
    }
}

async fn admin_update_user(
    state: web::Data<AppState>,
    req: actix_web::HttpRequest,
    path: web::Path<String>,
    body: web::Json<AdminUpdateUserRequest>,
) -> Result<HttpResponse> {
    let identity = match authenticate(&req, &state).await {
        Ok(identity) => identity,
        Err(response) => return Ok(response),
    };

    let user_id = match parse_id(&path.into_inner(), "user") {
        Ok(id) => id,
        Err(response) => return Ok(response),
    };

    match user_service::admin_update_user(&state.db, &identity.user_id, identity.role, &user_id, &body).await {
        Ok(user) => Ok(HttpResponse::Ok().json(ApiSuccess::new(user))),
        Err(e) => Ok(error_response("Error updating user", e)),
    }
}

async fn admin_delete_user(
    state: web::Data<AppState>,
    req: actix_web::HttpRequest,
    path: web::Path<String>,
) -> Result<HttpResponse> {
    let identity = match authenticate(&req, &state).await {
        Ok(identity) => identity,
        Err(response) => return Ok(response),
    };

    let user_id = match parse_id(&path.into_inner(), "user") {
        Ok(id) => id,
        Err(response) => return Ok(response),
    };

    match user_service::admin_delete_user(&state.db, &identity.user_id, identity.role, &user_id).await {
        Ok(()) => Ok(HttpResponse::NoContent().finish()),
        Err(e) => Ok(error_response("Error deleting user", e)),
    }
}

async fn admin_user_posts(
    state: web::Data<AppState>,
    req: actix_web::HttpRequest,
    path: web::Path<String>,
) -> Result<HttpResponse> {
    let identity = match authenticate(&req, &state).await {
        Ok(identity) => identity,
        Err(response) => return Ok(response),
    };

    let user_id = match parse_id(&path.into_inner(), "user") {
        Ok(id) => id,
        Err(response) => return Ok(response),
    };

    match user_service::admin_user_posts(&state.db, identity.role, &user_id).await {
        Ok(posts) => Ok(HttpResponse::Ok().json(ApiSuccess::new(posts))),
        Err(e) => Ok(error_response("Error listing user posts", e)),
    }
}

async fn admin_user_photos(
    state: web::Data<AppState>,
    req: actix_web::HttpRequest,
    path: web::Path<String>,
) -> Result<HttpResponse> {
    let identity = match authenticate(&req, &state).await {
        Ok(identity) => identity,
        Err(response) => return Ok(response),
    };

    let user_id = match parse_id(&path.into_inner(), "user") {
        Ok(id) => id,
        Err(response) => return Ok(response),
    };

    match user_service::admin_user_photos(&state.db, identity.role, &user_id).await {
        Ok(photos) => Ok(HttpResponse::Ok().json(ApiSuccess::new(photos))),
        Err(e) => Ok(error_response("Error listing user photos", e)),
    }
}
