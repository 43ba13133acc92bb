use axum::{Extension, Json, extract::State, response::IntoResponse};
use serde_json::Value;
use tracing::info;

use devhome_db::models::ProfileChanges;
use devhome_types::api::{
    ChangePasswordRequest, Claims, EDITABLE_PROFILE_FIELDS, EditProfileRequest, MessageResponse,
    UserResponse,
};

use crate::auth::{hash_password, user_view, verify_password};
use crate::error::ApiError;
use crate::validation::{is_strong_password, normalize_gender, validate_age, validate_name};
use crate::{AppState, blocking};

pub async fn view(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    let user = blocking(move || {
        let row = state
            .db
            .get_user_by_id(&claims.sub.to_string())?
            .ok_or(ApiError::NotFound("User not found"))?;
        Ok(user_view(row)?)
    })
    .await?;

    Ok(Json(user))
}

/// `GET /feed`: every other registered user, in public form.
pub async fn feed(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    let users = blocking(move || {
        let rows = state.db.list_users_except(&claims.sub.to_string())?;
        let users = rows
            .into_iter()
            .map(user_view)
            .collect::<anyhow::Result<Vec<_>>>()?;
        Ok(users)
    })
    .await?;

    Ok(Json(users))
}

/// Partial update restricted to [`EDITABLE_PROFILE_FIELDS`].
pub async fn edit(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(body): Json<Value>,
) -> Result<impl IntoResponse, ApiError> {
    let fields = body
        .as_object()
        .ok_or_else(|| ApiError::bad_request("Profile update must be a JSON object"))?;
    if fields
        .keys()
        .any(|key| !EDITABLE_PROFILE_FIELDS.contains(&key.as_str()))
    {
        return Err(ApiError::bad_request("Update not allowed for some fields"));
    }

    let req: EditProfileRequest =
        serde_json::from_value(body).map_err(|e| ApiError::bad_request(e.to_string()))?;
    let changes = ProfileChanges {
        first_name: req.first_name.as_deref().map(validate_name).transpose()?,
        last_name: req.last_name.map(|name| name.trim().to_string()),
        age: req.age.map(validate_age).transpose()?,
        gender: req.gender.as_deref().map(normalize_gender).transpose()?,
    };

    let user = blocking(move || {
        let row = state
            .db
            .update_profile(&claims.sub.to_string(), &changes)?
            .ok_or(ApiError::NotFound("User not found"))?;
        info!(user_id = %claims.sub, "Profile updated");
        Ok(user_view(row)?)
    })
    .await?;

    Ok(Json(UserResponse {
        message: "Profile updated successfully".to_string(),
        user,
    }))
}

pub async fn change_password(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<ChangePasswordRequest>,
) -> Result<impl IntoResponse, ApiError> {
    if req.old_password.is_empty() || req.new_password.is_empty() {
        return Err(ApiError::bad_request(
            "oldPassword and newPassword are required",
        ));
    }

    blocking(move || {
        let user_id = claims.sub.to_string();
        let row = state
            .db
            .get_user_by_id(&user_id)?
            .ok_or(ApiError::NotFound("User not found"))?;

        if !verify_password(&req.old_password, &row.password)? {
            return Err(ApiError::bad_request("Invalid current password"));
        }
        if !is_strong_password(&req.new_password) {
            return Err(ApiError::bad_request("Please enter a strong password"));
        }

        let hash = hash_password(&req.new_password)?;
        if !state.db.update_password(&user_id, &hash)? {
            return Err(ApiError::NotFound("User not found"));
        }
        info!(%user_id, "Password changed");
        Ok(())
    })
    .await?;

    Ok(Json(MessageResponse {
        message: "Password updated successfully".to_string(),
    }))
}
