use axum::extract::{Multipart, Path, Query, State};
use axum::response::IntoResponse;
use std::collections::HashMap;
use tracing::{info, instrument};
use uuid::Uuid;
use validator::Validate;

use crate::auth::identity::{Identity, Role};
use crate::auth::jwt::AuthUser;
use crate::error::{created, done, ok, paged, ApiError, ApiResult};
use crate::pagination::{ListParams, PageMeta};
use crate::state::AppState;
use crate::stores::dto::{CreateStoreInput, StoreResponse, UpdateStoreInput};
use crate::stores::repo::{self, Store, StoreOwner};
use crate::uploads::{self, PhotoForm};

#[instrument(skip(state))]
pub async fn list_stores(
    State(state): State<AppState>,
    AuthUser(_who): AuthUser,
    Query(params): Query<ListParams>,
) -> ApiResult<impl IntoResponse> {
    let (stores, total) = Store::page(&state.db, &params).await?;

    let owner_ids: Vec<Uuid> = stores.iter().map(|s| s.user_id).collect();
    let mut owners: HashMap<Uuid, StoreOwner> = repo::owners(&state.db, &owner_ids)
        .await?
        .into_iter()
        .map(|o| (o.id, o))
        .collect();

    let data: Vec<StoreResponse> = stores
        .into_iter()
        .map(|s| {
            let owner = owners.remove(&s.user_id);
            StoreResponse::from_parts(s, owner, &state.config)
        })
        .collect();
    let meta = PageMeta::new(&params, total);
    Ok(paged(data, meta, "Stores retrieved"))
}

#[instrument(skip(state))]
pub async fn get_store(
    State(state): State<AppState>,
    AuthUser(_who): AuthUser,
    Path(id): Path<Uuid>,
) -> ApiResult<impl IntoResponse> {
    let store = Store::find(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::not_found("Store not found"))?;
    let owner = repo::owners(&state.db, &[store.user_id]).await?.pop();
    Ok(ok(
        StoreResponse::from_parts(store, owner, &state.config),
        "Store retrieved",
    ))
}

#[instrument(skip(state))]
pub async fn get_store_by_user(
    State(state): State<AppState>,
    AuthUser(_who): AuthUser,
    Path(user_id): Path<Uuid>,
) -> ApiResult<impl IntoResponse> {
    let store = Store::find_by_user(&state.db, user_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Store not found"))?;
    let owner = repo::owners(&state.db, &[store.user_id]).await?.pop();
    Ok(ok(
        StoreResponse::from_parts(store, owner, &state.config),
        "Store retrieved",
    ))
}

#[instrument(skip(state, mp))]
pub async fn create_store(
    State(state): State<AppState>,
    AuthUser(who): AuthUser,
    mp: Multipart,
) -> ApiResult<impl IntoResponse> {
    who.require_role(&[Role::Merchant])?;

    let form = PhotoForm::read(mp).await?;
    let input = CreateStoreInput {
        name: form.require("name")?.to_string(),
        description: form.text("description").map(Into::into),
        address: form.text("address").map(Into::into),
    };
    input.validate()?;

    if Store::find_by_user(&state.db, who.user_id).await?.is_some() {
        return Err(ApiError::business("You already have a store"));
    }

    let photo_key = match form.photo.as_ref() {
        Some(photo) => Some(uploads::save_photo(&state, "stores", who.user_id, photo).await?),
        None => None,
    };

    let store = Store::create(
        &state.db,
        who.user_id,
        &input.name,
        input.description.as_deref(),
        input.address.as_deref(),
        photo_key.as_deref(),
    )
    .await?;
    let owner = repo::owners(&state.db, &[store.user_id]).await?.pop();

    info!(store_id = %store.id, user_id = %who.user_id, "store created");
    Ok(created(
        StoreResponse::from_parts(store, owner, &state.config),
        "Store created",
    ))
}

#[instrument(skip(state, mp))]
pub async fn update_store(
    State(state): State<AppState>,
    AuthUser(who): AuthUser,
    Path(id): Path<Uuid>,
    mp: Multipart,
) -> ApiResult<impl IntoResponse> {
    let store = Store::find(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::not_found("Store not found"))?;
    require_store_access(&who, &store)?;

    let form = PhotoForm::read(mp).await?;
    let input = UpdateStoreInput {
        name: form.text("name").map(Into::into),
        description: form.text("description").map(Into::into),
        address: form.text("address").map(Into::into),
    };
    input.validate()?;

    let new_photo = match form.photo.as_ref() {
        Some(photo) => Some(uploads::save_photo(&state, "stores", store.user_id, photo).await?),
        None => None,
    };

    let updated = Store::update(
        &state.db,
        id,
        input.name.as_deref(),
        input.description.as_deref(),
        input.address.as_deref(),
        new_photo.as_deref(),
    )
    .await?;

    if new_photo.is_some() {
        if let Some(old) = store.photo_key {
            uploads::remove_photo(&state, &old).await;
        }
    }

    let owner = repo::owners(&state.db, &[updated.user_id]).await?.pop();
    info!(store_id = %id, "store updated");
    Ok(ok(
        StoreResponse::from_parts(updated, owner, &state.config),
        "Store updated",
    ))
}

#[instrument(skip(state))]
pub async fn delete_store(
    State(state): State<AppState>,
    AuthUser(who): AuthUser,
    Path(id): Path<Uuid>,
) -> ApiResult<impl IntoResponse> {
    let store = Store::find(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::not_found("Store not found"))?;
    require_store_access(&who, &store)?;

    if Store::has_orders(&state.db, id).await? {
        return Err(ApiError::business("Cannot delete a store with existing orders"));
    }

    Store::delete(&state.db, id).await?;
    if let Some(key) = store.photo_key {
        uploads::remove_photo(&state, &key).await;
    }

    info!(store_id = %id, "store deleted");
    Ok(done("Store deleted"))
}

fn require_store_access(who: &Identity, store: &Store) -> Result<(), ApiError> {
    if store.user_id == who.user_id || who.is_super_admin() {
        Ok(())
    } else {
        Err(ApiError::forbidden("You do not own this store"))
    }
}
