use actix_web::{http::header, web, HttpResponse, Result};
use shared::{ApiSuccess, CreatePhotoRequest};

use crate::handlers::{authenticate, error_response, parse_id};
use crate::models::AppState;
use crate::services::photos as photo_service;

/// Largest raw image accepted by the upload route.
const MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/photos")
            .app_data(web::PayloadConfig::new(MAX_UPLOAD_BYTES))
            .route("", web::get().to(list_photos))
            .route("", web::post().to(create_photo))
            .route("/upload", web::post().to(upload_photo))
            .route("/{photo_id}", web::delete().to(delete_photo)),
    );
}

async fn list_photos(
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

    match photo_service::list_photos(&state.db, &identity.user_id, &family_id).await {
        Ok(photos) => Ok(HttpResponse::Ok().json(ApiSuccess::new(photos))),
        Err(e) => Ok(error_response("Error listing photos", e)),
    }
}

async fn create_photo(
    state: web::Data<AppState>,
    req: actix_web::HttpRequest,
    path: web::Path<String>,
    body: web::Json<CreatePhotoRequest>,
) -> Result<HttpResponse> {
    let identity = match authenticate(&req, &state).await {
        Ok(identity) => identity,
        Err(response) => return Ok(response),
    };

    let family_id = match parse_id(&path.into_inner(), "family") {
        Ok(id) => id,
        Err(response) => return Ok(response),
    };

    match photo_service::create_photo(
        &state.db,
        &state.config.image_host_prefix,
        &identity.user_id,
        &family_id,
        &body.url,
        &body.public_id,
    )
    .await
    {
        Ok(photo) => Ok(HttpResponse::Created().json(ApiSuccess::new(photo))),
        Err(e) => Ok(error_response("Error saving photo", e)),
    }
}

async fn upload_photo(
    state: web::Data<AppState>,
    req: actix_web::HttpRequest,
    path: web::Path<String>,
    body: web::Bytes,
) -> Result<HttpResponse> {
    let identity = match authenticate(&req, &state).await {
        Ok(identity) => identity,
        Err(response) => return Ok(response),
    };

    let family_id = match parse_id(&path.into_inner(), "family") {
        Ok(id) => id,
        Err(response) => return Ok(response),
    };

    let content_type = req
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("application/octet-stream");

    match photo_service::upload_photo(
        &state.db,
        state.images.as_ref(),
        &identity.user_id,
        &family_id,
        body.to_vec(),
        content_type,
    )
    .await
    {
        Ok(photo) => Ok(HttpResponse::Created().json(ApiSuccess::new(photo))),
        Err(e) => Ok(error_response("Error uploading photo", e)),
    }
}

async fn delete_photo(
    state: web::Data<AppState>,
    req: actix_web::HttpRequest,
    path: web::Path<(String, String)>,
) -> Result<HttpResponse> {
    let identity = match authenticate(&req, &state).await {
        Ok(identity) => identity,
        Err(response) => return Ok(response),
    };

    let (family_id, photo_id) = path.into_inner();
    let family_id = match parse_id(&family_id, "family") {
        Ok(id) => id,
        Err(response) => return Ok(response),
    };
    let photo_id = match parse_id(&photo_id, "photo") {
        Ok(id) => id,
        Err(response) => return Ok(response),
    };

    match photo_service::delete_photo(&state.db, &identity.user_id, &family_id, &photo_id).await {
        Ok(()) => Ok(HttpResponse::NoContent().finish()),
        Err(e) => Ok(error_response("Error deleting photo", e)),
    }
}
