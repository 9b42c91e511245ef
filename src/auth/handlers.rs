use axum::{
    extract::{FromRef, State},
    response::IntoResponse,
    Json,
};
use tracing::{info, instrument, warn};
use validator::Validate;

use crate::{
    auth::{
        dto::{AuthResponse, LoginRequest, RefreshRequest, RegisterRequest},
        identity::Identity,
        jwt::{AuthUser, JwtKeys},
        password::{hash_password, verify_password},
    },
    error::{created, ok, ApiError, ApiResult},
    state::AppState,
    users::dto::UserResponse,
    users::repo::{User, UserProfile},
};

#[instrument(skip(state, payload))]
pub async fn register(
    State(state): State<AppState>,
    Json(mut payload): Json<RegisterRequest>,
) -> ApiResult<impl IntoResponse> {
    payload.email = payload.email.trim().to_lowercase();
    payload.validate()?;

    if User::find_by_email(&state.db, &payload.email).await?.is_some() {
        warn!(email = %payload.email, "email already registered");
        return Err(ApiError::field("email", "The email has already been taken"));
    }

    let hash = hash_password(&payload.password)?;
    let user = User::create(&state.db, &payload.name, &payload.email, &hash, payload.role).await?;

    let who = Identity {
        user_id: user.id,
        role: user.role,
    };
    let keys = JwtKeys::from_ref(&state);
    let access_token = keys.sign_access(who)?;
    let refresh_token = keys.sign_refresh(who)?;

    info!(user_id = %user.id, email = %user.email, "user registered");
    Ok(created(
        AuthResponse {
            access_token,
            refresh_token,
            user: UserResponse::from_parts(user, None, &state.config),
        },
        "Registration successful",
    ))
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    Json(mut payload): Json<LoginRequest>,
) -> ApiResult<impl IntoResponse> {
    payload.email = payload.email.trim().to_lowercase();
    payload.validate()?;

    let user = match User::find_by_email(&state.db, &payload.email).await? {
        Some(u) => u,
        None => {
            warn!(email = %payload.email, "login unknown email");
            return Err(ApiError::unauthorized("Invalid email or password"));
        }
    };

    if !verify_password(&payload.password, &user.password_hash)? {
        warn!(email = %payload.email, user_id = %user.id, "login invalid password");
        return Err(ApiError::unauthorized("Invalid email or password"));
    }

    let who = Identity {
        user_id: user.id,
        role: user.role,
    };
    let keys = JwtKeys::from_ref(&state);
    let access_token = keys.sign_access(who)?;
    let refresh_token = keys.sign_refresh(who)?;

    info!(user_id = %user.id, email = %user.email, "user logged in");
    let profile = UserProfile::find(&state.db, user.id).await?;
    Ok(ok(
        AuthResponse {
            access_token,
            refresh_token,
            user: UserResponse::from_parts(user, profile, &state.config),
        },
        "Login successful",
    ))
}

#[instrument(skip(state, payload))]
pub async fn refresh(
    State(state): State<AppState>,
    Json(payload): Json<RefreshRequest>,
) -> ApiResult<impl IntoResponse> {
    let keys = JwtKeys::from_ref(&state);
    let claims = keys
        .verify_refresh(&payload.refresh_token)
        .map_err(|_| ApiError::unauthorized("Invalid refresh token"))?;

    // Re-read the user so a role change or deletion invalidates old refresh tokens.
    let user = User::find(&state.db, claims.sub)
        .await?
        .ok_or_else(|| ApiError::unauthorized("User no longer exists"))?;

    let who = Identity {
        user_id: user.id,
        role: user.role,
    };
    let access_token = keys.sign_access(who)?;
    let refresh_token = keys.sign_refresh(who)?;

    let profile = UserProfile::find(&state.db, user.id).await?;
    Ok(ok(
        AuthResponse {
            access_token,
            refresh_token,
            user: UserResponse::from_parts(user, profile, &state.config),
        },
        "Token refreshed",
    ))
}

#[instrument(skip(state))]
pub async fn get_me(
    State(state): State<AppState>,
    AuthUser(who): AuthUser,
) -> ApiResult<impl IntoResponse> {
    let user = User::find(&state.db, who.user_id)
        .await?
        .ok_or_else(|| ApiError::unauthorized("User no longer exists"))?;
    let profile = UserProfile::find(&state.db, user.id).await?;
    Ok(ok(
        UserResponse::from_parts(user, profile, &state.config),
        "User retrieved",
    ))
}
