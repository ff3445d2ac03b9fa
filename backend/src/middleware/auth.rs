use actix_web::HttpRequest;
use shared::PlatformRole;
use thiserror::Error;
use uuid::Uuid;

use crate::services::auth as auth_service;

/// Caller identity resolved from a bearer token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Identity {
    pub user_id: Uuid,
    pub role: PlatformRole,
}

#[derive(Debug, Error)]
pub enum AuthMiddlewareError {
    #[error("Missing authorization token")]
    MissingToken,
    #[error("Invalid authorization token")]
    InvalidToken,
}

pub fn extract_identity(req: &HttpRequest, jwt_secret: &str) -> Result<Identity, AuthMiddlewareError> {
    let auth_header = req
        .headers()
        .get("Authorization")
        .ok_or(AuthMiddlewareError::MissingToken)?;

    let auth_str = auth_header
        .to_str()
        .map_err(|_| AuthMiddlewareError::InvalidToken)?;

    let token = auth_str
        .strip_prefix("Bearer ")
        .ok_or(AuthMiddlewareError::InvalidToken)?;

    let (user_id, role) = auth_service::verify_jwt(token.trim(), jwt_secret)
        .map_err(|_| AuthMiddlewareError::InvalidToken)?;

    Ok(Identity { user_id, role })
}
