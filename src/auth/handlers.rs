use axum::{
    extract::{FromRef, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use tracing::{info, instrument, warn};

use crate::auth::dto::{LoginRequest, ProfileData, PublicUser, SignupRequest, TokenData};
use crate::auth::jwt::{AuthUser, TokenKeys};
use crate::auth::password::{hash_password, verify_password};
use crate::error::ApiError;
use crate::response::ApiResponse;
use crate::state::AppState;
use crate::validation::{validate_email, validate_name, validate_password};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/auth/signup", post(signup))
        .route("/auth/login", post(login))
        .route("/auth/me", get(me))
}

#[instrument(skip(state, payload))]
pub async fn signup(
    State(state): State<AppState>,
    Json(mut payload): Json<SignupRequest>,
) -> Result<(StatusCode, Json<ApiResponse<TokenData>>), ApiError> {
    payload.email = payload.email.trim().to_lowercase();
    let name = payload.name.trim().to_string();

    validate_name(&name)?;
    validate_email(&payload.email)?;
    validate_password(&payload.password)?;

    let hash = hash_password(&payload.password)?;

    // The store enforces email uniqueness; a duplicate comes back as Conflict.
    let user = state.store.create_user(&name, &payload.email, &hash).await?;

    let token = TokenKeys::from_ref(&state).sign(user.id)?;

    info!(user_id = %user.id, email = %user.email, "user registered");
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::ok(
            "User registered successfully",
            TokenData { token },
        )),
    ))
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    Json(mut payload): Json<LoginRequest>,
) -> Result<Json<ApiResponse<TokenData>>, ApiError> {
    payload.email = payload.email.trim().to_lowercase();

    validate_email(&payload.email)?;
    validate_password(&payload.password)?;

    // Unknown email and wrong password share one message so callers cannot
    // probe which emails are registered.
    let invalid_credentials = || ApiError::Validation("Invalid Credentials".into());

    let user = state
        .store
        .find_by_email(&payload.email)
        .await?
        .ok_or_else(|| {
            warn!(email = %payload.email, "login unknown email");
            invalid_credentials()
        })?;

    if !verify_password(&payload.password, &user.password_hash)? {
        warn!(user_id = %user.id, "login invalid password");
        return Err(invalid_credentials());
    }

    let token = TokenKeys::from_ref(&state).sign(user.id)?;

    info!(user_id = %user.id, "user logged in");
    Ok(Json(ApiResponse::ok(
        "Logged in successfully",
        TokenData { token },
    )))
}

#[instrument(skip(state))]
pub async fn me(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> Result<Json<ApiResponse<ProfileData>>, ApiError> {
    let user = state
        .store
        .find_by_id(user_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".into()))?;

    Ok(Json(ApiResponse::ok(
        "User profile fetched",
        ProfileData {
            user: PublicUser::from(&user),
        },
    )))
}
