use axum::{
    extract::Request,
    http::header::AUTHORIZATION,
    middleware::Next,
    response::Response,
};
use std::sync::Arc;
use tracing::debug;

use crate::auth::jwt::{JwtManager, TokenType};
use crate::database::{Repository, User};
use crate::utils::error::ApiError;

/// Authenticated user, injected into request extensions by the middleware.
#[derive(Clone)]
pub struct CurrentUser(pub User);

/// Auth middleware - validate the Bearer access token and resolve the user
pub async fn auth_middleware(mut request: Request, next: Next) -> Result<Response, ApiError> {
    let jwt_manager = request
        .extensions()
        .get::<Arc<JwtManager>>()
        .ok_or_else(|| ApiError::InternalError("JWT manager not configured".to_string()))?
        .clone();

    let repository = request
        .extensions()
        .get::<Arc<Repository>>()
        .ok_or_else(|| ApiError::InternalError("Repository not configured".to_string()))?
        .clone();

    let token = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .ok_or_else(|| ApiError::Unauthorized("Missing bearer token".to_string()))?;

    let claims = jwt_manager
        .validate_token(token, TokenType::Access)
        .map_err(|e| ApiError::Unauthorized(format!("Invalid token: {}", e)))?;

    let user = repository
        .get_user_by_id(claims.user_id)
        .await
        .map_err(|e| ApiError::DatabaseError(e.to_string()))?
        .ok_or_else(|| ApiError::Unauthorized("User no longer exists".to_string()))?;

    if !user.is_active {
        return Err(ApiError::Unauthorized("User is inactive".to_string()));
    }

    debug!("Authenticated user {}", user.id);
    request.extensions_mut().insert(CurrentUser(user));

    Ok(next.run(request).await)
}
