use axum::{
    extract::{Path, State},
    routing::put,
    Json, Router,
};
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::auth::dto::{ProfileData, PublicUser};
use crate::auth::jwt::AuthUser;
use crate::auth::password::{hash_password, verify_password};
use crate::error::ApiError;
use crate::response::ApiResponse;
use crate::state::AppState;
use crate::users::dto::{ChangePasswordRequest, UpdateProfileRequest};
use crate::validation::{validate_name, validate_password};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/users/:id", put(update_profile).delete(delete_account))
        .route("/users/:id/password", put(change_password))
}

/// Requester must be the user named in the path.
fn require_owner(requester: Uuid, target: Uuid, action: &str) -> Result<(), ApiError> {
    if requester != target {
        warn!(%requester, %target, "ownership check failed");
        return Err(ApiError::Forbidden(format!(
            "Not authorized to {action} this user"
        )));
    }
    Ok(())
}

#[instrument(skip(state, payload))]
pub async fn update_profile(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateProfileRequest>,
) -> Result<Json<ApiResponse<ProfileData>>, ApiError> {
    require_owner(user_id, id, "update")?;

    let name = payload.name.trim().to_string();
    validate_name(&name)?;

    let user = state.store.update_name(user_id, &name).await?;

    info!(%user_id, "profile updated");
    Ok(Json(ApiResponse::ok(
        "User profile updated successfully",
        ProfileData {
            user: PublicUser::from(&user),
        },
    )))
}

#[instrument(skip(state, payload))]
pub async fn change_password(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<ChangePasswordRequest>,
) -> Result<Json<ApiResponse<()>>, ApiError> {
    require_owner(user_id, id, "change password for")?;

    validate_password(&payload.new_password)?;

    let user = state
        .store
        .find_by_id(user_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".into()))?;

    if !verify_password(&payload.current_password, &user.password_hash)? {
        warn!(%user_id, "password change with wrong current password");
        return Err(ApiError::Validation("Current password is incorrect".into()));
    }

    let hash = hash_password(&payload.new_password)?;
    state.store.update_password(user_id, &hash).await?;

    info!(%user_id, "password updated");
    Ok(Json(ApiResponse::message("Password updated successfully")))
}

#[instrument(skip(state))]
pub async fn delete_account(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<()>>, ApiError> {
    require_owner(user_id, id, "delete")?;

    // Tasks are embedded in the user document, so this removes them too.
    state.store.delete_user(user_id).await?;

    info!(%user_id, "account deleted");
    Ok(Json(ApiResponse::message(
        "User account deleted successfully",
    )))
}
