use axum::extract::{Multipart, Path, State};
use axum::response::IntoResponse;
use std::collections::HashMap;
use tracing::{info, instrument};
use uuid::Uuid;
use validator::Validate;

use crate::auth::identity::Role;
use crate::auth::jwt::AuthUser;
use crate::auth::password::hash_password;
use crate::error::{done, ok, ApiError, ApiResult};
use crate::state::AppState;
use crate::uploads::{self, PhotoForm};
use crate::users::dto::{UpdateUserInput, UserResponse};
use crate::users::repo::{User, UserProfile};

#[instrument(skip(state))]
pub async fn list_users(
    State(state): State<AppState>,
    AuthUser(who): AuthUser,
) -> ApiResult<impl IntoResponse> {
    who.require_role(&[Role::SuperAdmin])?;

    let users = User::list(&state.db).await?;
    let ids: Vec<Uuid> = users.iter().map(|u| u.id).collect();
    let mut profiles: HashMap<Uuid, UserProfile> = UserProfile::for_users(&state.db, &ids)
        .await?
        .into_iter()
        .map(|p| (p.user_id, p))
        .collect();

    let data: Vec<UserResponse> = users
        .into_iter()
        .map(|u| {
            let profile = profiles.remove(&u.id);
            UserResponse::from_parts(u, profile, &state.config)
        })
        .collect();
    Ok(ok(data, "Users retrieved"))
}

#[instrument(skip(state))]
pub async fn get_user(
    State(state): State<AppState>,
    AuthUser(who): AuthUser,
    Path(id): Path<Uuid>,
) -> ApiResult<impl IntoResponse> {
    if who.user_id != id {
        who.require_role(&[Role::SuperAdmin])?;
    }

    let user = User::find(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::not_found("User not found"))?;
    let profile = UserProfile::find(&state.db, id).await?;
    Ok(ok(
        UserResponse::from_parts(user, profile, &state.config),
        "User retrieved",
    ))
}

#[instrument(skip(state, mp))]
pub async fn update_user(
    State(state): State<AppState>,
    AuthUser(who): AuthUser,
    Path(id): Path<Uuid>,
    mp: Multipart,
) -> ApiResult<impl IntoResponse> {
    if who.user_id != id {
        who.require_role(&[Role::SuperAdmin])?;
    }
    if User::find(&state.db, id).await?.is_none() {
        return Err(ApiError::not_found("User not found"));
    }

    let form = PhotoForm::read(mp).await?;
    let role = match form.text("role") {
        None => None,
        Some(raw) => Some(
            raw.parse::<Role>()
                .map_err(|_| ApiError::field("role", "The selected role is invalid"))?,
        ),
    };
    let input = UpdateUserInput {
        name: form.text("name").map(Into::into),
        email: form.text("email").map(|e| e.to_lowercase()),
        password: form.text("password").map(Into::into),
        password_confirmation: form.text("password_confirmation").map(Into::into),
        role,
        address: form.text("address").map(Into::into),
        phone: form.text("phone").map(Into::into),
    };
    input.validate()?;

    if input.role.is_some() && !who.is_super_admin() {
        return Err(ApiError::forbidden("Only a super admin can change roles"));
    }
    if let Some(email) = input.email.as_deref() {
        if let Some(existing) = User::find_by_email(&state.db, email).await? {
            if existing.id != id {
                return Err(ApiError::field("email", "The email has already been taken"));
            }
        }
    }

    let password_hash = match input.password.as_deref() {
        Some(plain) => Some(hash_password(plain)?),
        None => None,
    };

    let old_photo = UserProfile::find(&state.db, id).await?.and_then(|p| p.photo_key);
    let new_photo = match form.photo.as_ref() {
        Some(photo) => Some(uploads::save_photo(&state, "profiles", id, photo).await?),
        None => None,
    };

    let user = User::update(
        &state.db,
        id,
        input.name.as_deref(),
        input.email.as_deref(),
        password_hash.as_deref(),
        input.role,
    )
    .await?;
    let profile = UserProfile::upsert(
        &state.db,
        id,
        input.address.as_deref(),
        input.phone.as_deref(),
        new_photo.as_deref(),
    )
    .await?;

    if new_photo.is_some() {
        if let Some(old) = old_photo {
            uploads::remove_photo(&state, &old).await;
        }
    }

    info!(user_id = %id, "user updated");
    Ok(ok(
        UserResponse::from_parts(user, Some(profile), &state.config),
        "User updated",
    ))
}

#[instrument(skip(state))]
pub async fn delete_user(
    State(state): State<AppState>,
    AuthUser(who): AuthUser,
    Path(id): Path<Uuid>,
) -> ApiResult<impl IntoResponse> {
    who.require_role(&[Role::SuperAdmin])?;

    if User::find(&state.db, id).await?.is_none() {
        return Err(ApiError::not_found("User not found"));
    }
    if User::has_order_history(&state.db, id).await? {
        return Err(ApiError::business("Cannot delete a user with existing orders"));
    }

    let photo = UserProfile::find(&state.db, id).await?.and_then(|p| p.photo_key);
    User::delete(&state.db, id).await?;
    if let Some(key) = photo {
        uploads::remove_photo(&state, &key).await;
    }

    info!(user_id = %id, "user deleted");
    Ok(done("User deleted"))
}
