use actix_web::{error::InternalError, http::StatusCode, web, HttpRequest, HttpResponse};
use shared::ApiError;
use std::fmt::Debug;
use uuid::Uuid;

use crate::middleware::{extract_identity, Identity};
use crate::models::AppState;
use crate::services::auth as auth_service;
use crate::services::error::{ErrorKind, ServiceError};

pub mod auth;
pub mod contact;
pub mod users;
pub mod families;
pub mod invitations;
pub mod posts;
pub mod events;
pub mod photos;
pub mod payments;

pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api")
            .configure(auth::configure)
            .configure(users::configure)
            .configure(families::configure)
            .configure(invitations::configure)
            .configure(payments::configure)
            .configure(contact::configure)
    );
}

/// Malformed JSON bodies are rejected before any handler runs.
pub fn json_config() -> web::JsonConfig {
    web::JsonConfig::default().error_handler(|err, _req| {
        let response = HttpResponse::BadRequest().json(ApiError {
            error: ErrorKind::InvalidInput.code().to_string(),
            message: err.to_string(),
        });
        InternalError::from_response(err, response).into()
    })
}

pub fn status_for(kind: ErrorKind) -> StatusCode {
    match kind {
        ErrorKind::Unauthenticated => StatusCode::UNAUTHORIZED,
        ErrorKind::Forbidden => StatusCode::FORBIDDEN,
        ErrorKind::NotFound => StatusCode::NOT_FOUND,
        ErrorKind::Conflict => StatusCode::CONFLICT,
        ErrorKind::Expired => StatusCode::GONE,
        ErrorKind::InvalidInput => StatusCode::BAD_REQUEST,
        ErrorKind::UpstreamFailure => StatusCode::BAD_GATEWAY,
        ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// Turn a service error into its JSON response. Internal details are logged,
/// never returned.
pub fn error_response<E: ServiceError + Debug>(context: &str, err: E) -> HttpResponse {
    let kind = err.kind();
    let message = match kind {
        ErrorKind::Internal => {
            log::error!("{}: {:?}", context, err);
            "Something went wrong".to_string()
        }
        ErrorKind::UpstreamFailure => {
            log::warn!("{}: {:?}", context, err);
            err.to_string()
        }
        _ => err.to_string(),
    };

    HttpResponse::build(status_for(kind)).json(ApiError {
        error: kind.code().to_string(),
        message,
    })
}

pub fn invalid_input(message: &str) -> HttpResponse {
    HttpResponse::BadRequest().json(ApiError {
        error: ErrorKind::InvalidInput.code().to_string(),
        message: message.to_string(),
    })
}

fn unauthorized(message: &str) -> HttpResponse {
    HttpResponse::Unauthorized().json(ApiError {
        error: ErrorKind::Unauthenticated.code().to_string(),
        message: message.to_string(),
    })
}

/// Resolve the caller from the bearer token, or build the 401 response.
///
/// Tokens outlive accounts, so the user must still exist. The platform role
/// is taken from the stored account rather than the token.
pub async fn authenticate(req: &HttpRequest, state: &AppState) -> Result<Identity, HttpResponse> {
    let identity = extract_identity(req, &state.config.jwt_secret).map_err(|e| unauthorized(&e.to_string()))?;

    match auth_service::get_user_by_id(&state.db, &identity.user_id).await {
        Ok(Some(user)) => Ok(Identity {
            user_id: user.id,
            role: user.role,
        }),
        Ok(None) => Err(unauthorized("Account no longer exists")),
        Err(e) => Err(error_response("Error resolving caller", e)),
    }
}

pub fn parse_id(raw: &str, what: &str) -> Result<Uuid, HttpResponse> {
    Uuid::parse_str(raw).map_err(|_| invalid_input(&format!("Invalid {} ID format", what)))
}

#[cfg(test)]
pub(crate) mod testing {
    use std::sync::Arc;

    use actix_web::web;
    use shared::PlatformRole;
    use uuid::Uuid;

    use crate::config::tests::test_config;
    use crate::db::test_pool;
    use crate::integrations::billing::testing::FakeBilling;
    use crate::integrations::email::testing::RecordingMailer;
    use crate::integrations::images::testing::StaticImageHost;
    use crate::integrations::{BillingProvider, Mailer};
    use crate::middleware::RateLimiter;
    use crate::models::AppState;
    use crate::services::auth::create_jwt;

    pub async fn test_state_with(
        mailer: Arc<dyn Mailer>,
        billing: Arc<dyn BillingProvider>,
    ) -> web::Data<AppState> {
        web::Data::new(AppState {
            db: test_pool().await,
            config: test_config(),
            login_rate_limiter: Arc::new(RateLimiter::new(5, 15 * 60)),
            mailer,
            images: Arc::new(StaticImageHost),
            billing,
        })
    }

    pub async fn test_state() -> web::Data<AppState> {
        test_state_with(Arc::new(RecordingMailer::default()), Arc::new(FakeBilling::default())).await
    }

    pub fn bearer(state: &AppState, user_id: &Uuid) -> (&'static str, String) {
        let token = create_jwt(user_id, PlatformRole::User, &state.config.jwt_secret, 1).unwrap();
        ("Authorization", format!("Bearer {}", token))
    }
}
