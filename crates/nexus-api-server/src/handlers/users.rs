use axum::{extract::Extension, Json};
use std::sync::Arc;

use crate::auth::CurrentUser;
use crate::database::Repository;
use crate::models::user::{UpdateProfileRequest, UserResponse};
use crate::utils::error::ApiError;

/// Update the caller's profile
pub async fn update_profile(
    Extension(repository): Extension<Arc<Repository>>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Json(request): Json<UpdateProfileRequest>,
) -> Result<Json<UserResponse>, ApiError> {
    let updated = repository
        .update_user_profile(
            user.id,
            request.full_name.as_deref(),
            request.preferences.as_ref(),
        )
        .await
        .map_err(|e| ApiError::DatabaseError(e.to_string()))?;

    Ok(Json(UserResponse::from(updated)))
}
