use actix_web::{web, HttpResponse, Result};
use shared::{ApiError, ApiSuccess, AuthResponse, LoginRequest, RegisterRequest, User};

use crate::handlers::{authenticate, error_response};
use crate::models::AppState;
use crate::services::auth::{self as auth_service, AuthError};

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/auth")
            .route("/register", web::post().to(register))
            .route("/login", web::post().to(login))
            .route("/me", web::get().to(get_current_user))
    );
}

fn issue_token(state: &AppState, user: User) -> Result<AuthResponse, AuthError> {
    let token = auth_service::create_jwt(
        &user.id,
        user.role,
        &state.config.jwt_secret,
        state.config.jwt_expiration_hours,
    )?;
    Ok(AuthResponse { token, user })
}

async fn register(
    state: web::Data<AppState>,
    body: web::Json<RegisterRequest>,
) -> Result<HttpResponse> {
    let request = body.into_inner();

    match auth_service::register_user(&state.db, &request).await {
        Ok(user) => match issue_token(&state, user) {
            Ok(response) => Ok(HttpResponse::Created().json(ApiSuccess::new(response))),
            Err(e) => Ok(error_response("Token creation failed", e)),
        },
        Err(e) => Ok(error_response("Registration failed", e)),
    }
}

async fn login(
    state: web::Data<AppState>,
    body: web::Json<LoginRequest>,
) -> Result<HttpResponse> {
    let request = body.into_inner();
    let key = auth_service::normalize_email(&request.email);

    if !state.login_rate_limiter.check(&key) {
        log::warn!("Too many failed sign-in attempts for {}", key);
        return Ok(HttpResponse::TooManyRequests().json(ApiError {
            error: "rate_limited".to_string(),
            message: "Too many failed attempts, try again later".to_string(),
        }));
    }

    match auth_service::login_user(&state.db, &request).await {
        Ok(user) => {
            state.login_rate_limiter.reset(&key);
            match issue_token(&state, user) {
                Ok(response) => Ok(HttpResponse::Ok().json(ApiSuccess::new(response))),
                Err(e) => Ok(error_response("Token creation failed", e)),
            }
        }
        Err(e) => {
            if matches!(e, AuthError::InvalidCredentials) {
                state.login_rate_limiter.record_failure(&key);
            }
            Ok(error_response("Login failed", e))
        }
    }
}

async fn get_current_user(
    state: web::Data<AppState>,
    req: actix_web::HttpRequest,
) -> Result<HttpResponse> {
    let identity = match authenticate(&req, &state).await {
        Ok(identity) => identity,
        Err(response) => return Ok(response),
    };

    match auth_service::get_user_by_id(&state.db, &identity.user_id).await {
        Ok(Some(user)) => Ok(HttpResponse::Ok().json(ApiSuccess::new(user))),
        Ok(None) => Ok(error_response("Error fetching user", AuthError::UserNotFound)),
        Err(e) => Ok(error_response("Error fetching user", e)),
    }
}
