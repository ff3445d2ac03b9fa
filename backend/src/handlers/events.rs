use actix_web::{web, HttpResponse, Result};
use shared::{ApiSuccess, CreateEventRequest, UpdateEventStatusRequest};

use crate::handlers::{authenticate, error_response, parse_id};
use crate::models::AppState;
use crate::services::events as event_service;

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/events")
            .route("", web::get().to(list_events))
            .route("", web::post().to(create_event))
            .route("/{event_id}", web::put().to(update_event_status))
            .route("/{event_id}", web::delete().to(delete_event)),
    );
}

async fn list_events(
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

    match event_service::list_events(&state.db, &identity.user_id, &family_id).await {
        Ok(events) => Ok(HttpResponse::Ok().json(ApiSuccess::new(events))),
        Err(e) => Ok(error_response("Error listing events", e)),
    }
}

async fn create_event(
    state: web::Data<AppState>,
    req: actix_web::HttpRequest,
    path: web::Path<String>,
    body: web::Json<CreateEventRequest>,
) -> Result<HttpResponse> {
    let identity = match authenticate(&req, &state).await {
        Ok(identity) => identity,
        Err(response) => return Ok(response),
    };

    let family_id = match parse_id(&path.into_inner(), "family") {
        Ok(id) => id,
        Err(response) => return Ok(response),
    };

    match event_service::create_event(&state.db, &identity.user_id, &family_id, &body).await {
        Ok(event) => Ok(HttpResponse::Created().json(ApiSuccess::new(event))),
        Err(e) => Ok(error_response("Error creating event", e)),
    }
}

async fn update_event_status(
    state: web::Data<AppState>,
    req: actix_web::HttpRequest,
    path: web::Path<(String, String)>,
    body: web::Json<UpdateEventStatusRequest>,
) -> Result<HttpResponse> {
    let identity = match authenticate(&req, &state).await {
        Ok(identity) => identity,
        Err(response) => return Ok(response),
    };

    let (family_id, event_id) = path.into_inner();
    let family_id = match parse_id(&family_id, "family") {
        Ok(id) => id,
        Err(response) => return Ok(response),
    };
    let event_id = match parse_id(&event_id, "event") {
        Ok(id) => id,
        Err(response) => return Ok(response),
    };

    match event_service::update_event_status(&state.db, &identity.user_id, &family_id, &event_id, body.status).await {
        Ok(event) => Ok(HttpResponse::Ok().json(ApiSuccess::new(event))),
        Err(e) => Ok(error_response("Error updating event", e)),
    }
}

async fn delete_event(
    state: web::Data<AppState>,
    req: actix_web::HttpRequest,
    path: web::Path<(String, String)>,
) -> Result<HttpResponse> {
    let identity = match authenticate(&req, &state).await {
        Ok(identity) => identity,
        Err(response) => return Ok(response),
    };

    let (family_id, event_id) = path.into_inner();
    let family_id = match parse_id(&family_id, "family") {
        Ok(id) => id,
        Err(response) => return Ok(response),
    };
    let event_id = match parse_id(&event_id, "event") {
        Ok(id) => id,
        Err(response) => return Ok(response),
    };

    match event_service::delete_event(&state.db, &identity.user_id, &family_id, &event_id).await {
        Ok(()) => Ok(HttpResponse::NoContent().finish()),
        Err(e) => Ok(error_response("Error deleting event", e)),
    }
}
