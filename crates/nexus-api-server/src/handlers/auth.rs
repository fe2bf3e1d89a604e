use axum::{extract::Extension, http::StatusCode, Json};
use std::sync::Arc;
use tracing::info;

use crate::auth::{CurrentUser, JwtManager, PasswordService, TokenType};
use crate::database::Repository;
use crate::models::auth::{LoginRequest, RefreshRequest, RegisterRequest, TokenResponse};
use crate::models::user::UserResponse;
use crate::utils::error::ApiError;

fn validate_registration(request: &RegisterRequest) -> Result<(), ApiError> {
    if !request.email.contains('@') {
        return Err(ApiError::BadRequest("Invalid email address".to_string()));
    }
    if request.username.len() < 3 {
        return Err(ApiError::BadRequest(
            "Username must be at least 3 characters".to_string(),
        ));
    }
    if request.password.len() < 8 {
        return Err(ApiError::BadRequest(
            "Password must be at least 8 characters".to_string(),
        ));
    }
    Ok(())
}

/// Register a new user
pub async fn register(
    Extension(repository): Extension<Arc<Repository>>,
    Json(request): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<UserResponse>), ApiError> {
    validate_registration(&request)?;

    let existing = repository
        .get_user_by_email(&request.email)
        .await
        .map_err(|e| ApiError::DatabaseError(e.to_string()))?;
    if existing.is_some() {
        return Err(ApiError::BadRequest("Email already registered".to_string()));
    }

    let name_taken = repository
        .get_user_by_username(&request.username)
        .await
        .map_err(|e| ApiError::DatabaseError(e.to_string()))?;
    if name_taken.is_some() {
        return Err(ApiError::BadRequest("Username already taken".to_string()));
    }

    let password_hash = PasswordService::hash(&request.password)
        .map_err(|e| ApiError::InternalError(e.to_string()))?;

    let user = repository
        .create_user(
            &request.email,
            &request.username,
            &password_hash,
            request.full_name.as_deref(),
        )
        .await
        .map_err(|e| ApiError::DatabaseError(e.to_string()))?;

    info!("Registered user {} ({})", user.id, user.email);

    Ok((StatusCode::CREATED, Json(UserResponse::from(user))))
}

/// Exchange credentials for an access/refresh token pair
pub async fn login(
    Extension(repository): Extension<Arc<Repository>>,
    Extension(jwt_manager): Extension<Arc<JwtManager>>,
    Json(request): Json<LoginRequest>,
) -> Result<Json<TokenResponse>, ApiError> {
    let user = repository
        .get_user_by_email(&request.email)
        .await
        .map_err(|e| ApiError::DatabaseError(e.to_string()))?
        .ok_or_else(|| ApiError::Unauthorized("Invalid email or password".to_string()))?;

    let verified = PasswordService::verify(&request.password, &user.password_hash)
        .map_err(|e| ApiError::InternalError(e.to_string()))?;
    if !verified {
        return Err(ApiError::Unauthorized(
            "Invalid email or password".to_string(),
        ));
    }

    if !user.is_active {
        return Err(ApiError::Unauthorized("User is inactive".to_string()));
    }

    let access_token = jwt_manager
        .generate_access_token(user.id)
        .map_err(|e| ApiError::InternalError(e.to_string()))?;
    let refresh_token = jwt_manager
        .generate_refresh_token(user.id)
        .map_err(|e| ApiError::InternalError(e.to_string()))?;

    info!("User {} logged in", user.id);

    Ok(Json(TokenResponse::bearer(access_token, refresh_token)))
}

/// Exchange a refresh token for a fresh token pair
pub async fn refresh(
    Extension(repository): Extension<Arc<Repository>>,
    Extension(jwt_manager): Extension<Arc<JwtManager>>,
    Json(request): Json<RefreshRequest>,
) -> Result<Json<TokenResponse>, ApiError> {
    let claims = jwt_manager
        .validate_token(&request.refresh_token, TokenType::Refresh)
        .map_err(|e| ApiError::Unauthorized(format!("Invalid refresh token: {}", e)))?;

    let user = repository
        .get_user_by_id(claims.user_id)
        .await
        .map_err(|e| ApiError::DatabaseError(e.to_string()))?
        .ok_or_else(|| ApiError::Unauthorized("User no longer exists".to_string()))?;

    if !user.is_active {
        return Err(ApiError::Unauthorized("User is inactive".to_string()));
    }

    let access_token = jwt_manager
        .generate_access_token(user.id)
        .map_err(|e| ApiError::InternalError(e.to_string()))?;
    let refresh_token = jwt_manager
        .generate_refresh_token(user.id)
        .map_err(|e| ApiError::InternalError(e.to_string()))?;

    Ok(Json(TokenResponse::bearer(access_token, refresh_token)))
}

/// Current user profile
pub async fn me(
    Extension(CurrentUser(user)): Extension<CurrentUser>,
) -> Json<UserResponse> {
    Json(UserResponse::from(user))
}
