use actix_web::{web, HttpResponse, Result};
use shared::{ApiSuccess, CreatePostRequest};

use crate::handlers::{authenticate, error_response, parse_id};
use crate::models::AppState;
use crate::services::posts as post_service;

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/posts")
            .route("", web::get().to(list_posts))
            .route("", web::post().to(create_post))
            .route("/{post_id}", web::delete().to(delete_post)),
    );
}

async fn list_posts(
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

    match post_service::list_posts(&state.db, &identity.user_id, &family_id).await {
        Ok(posts) => Ok(HttpResponse::Ok().json(ApiSuccess::new(posts))),
        Err(e) => Ok(error_response("Error listing posts", e)),
    }
}

async fn create_post(
    state: web::Data<AppState>,
    req: actix_web::HttpRequest,
    path: web::Path<String>,
    body: web::Json<CreatePostRequest>,
) -> Result<HttpResponse> {
    let identity = match authenticate(&req, &state).await {
        Ok(identity) => identity,
        Err(response) => return Ok(response),
    };

    let family_id = match parse_id(&path.into_inner(), "family") {
        Ok(id) => id,
        Err(response) => return Ok(response),
    };

    match post_service::create_post(&state.db, &identity.user_id, &family_id, &body.content).await {
        Ok(post) => Ok(HttpResponse::Created().json(ApiSuccess::new(post))),
        Err(e) => Ok(error_response("Error creating post", e)),
    }
}

async fn delete_post(
    state: web::Data<AppState>,
    req: actix_web::HttpRequest,
    path: web::Path<(String, String)>,
) -> Result<HttpResponse> {
    let identity = match authenticate(&req, &state).await {
        Ok(identity) => identity,
        Err(response) => return Ok(response),
    };

    let (family_id, post_id) = path.into_inner();
    let family_id = match parse_id(&family_id, "family") {
        Ok(id) => id,
        Err(response) => return Ok(response),
    };
    let post_id = match parse_id(&post_id, "post") {
        Ok(id) => id,
        Err(response) => return Ok(response),
    };

    match post_service::delete_post(&state.db, &identity.user_id, &family_id, &post_id).await {
        Ok(()) => Ok(HttpResponse::NoContent().finish()),
        Err(e) => Ok(error_response("Error deleting post", e)),
    }
}
