use axum::extract::{Multipart, Path, Query, State};
use axum::response::IntoResponse;
use rust_decimal::Decimal;
use std::collections::HashMap;
use tracing::{info, instrument};
use uuid::Uuid;
use validator::Validate;

use crate::auth::identity::{Identity, Role};
use crate::auth::jwt::AuthUser;
use crate::error::{created, done, ok, paged, ApiError, ApiResult};
use crate::pagination::{ListParams, PageMeta};
use crate::products::dto::{CreateProductInput, ProductResponse, UpdateProductInput};
use crate::products::repo::{self, NewProduct, Product, ProductChanges, StoreSummary};
use crate::products::service;
use crate::state::AppState;
use crate::stores::repo::Store;
use crate::uploads::{self, PhotoForm};

#[instrument(skip(state))]
pub async fn list_products(
    State(state): State<AppState>,
    AuthUser(_who): AuthUser,
    Query(params): Query<ListParams>,
) -> ApiResult<impl IntoResponse> {
    let (products, total) = Product::page(&state.db, &params).await?;

    let store_ids: Vec<Uuid> = products.iter().map(|p| p.store_id).collect();
    let mut stores: HashMap<Uuid, StoreSummary> = repo::store_summaries(&state.db, &store_ids)
        .await?
        .into_iter()
        .map(|s| (s.id, s))
        .collect();

    let data: Vec<ProductResponse> = products
        .into_iter()
        .map(|p| {
            let store = stores.get(&p.store_id).cloned();
            ProductResponse::from_parts(p, store, &state.config)
        })
        .collect();
    let meta = PageMeta::new(&params, total);
    Ok(paged(data, meta, "Products retrieved"))
}

#[instrument(skip(state))]
pub async fn get_product(
    State(state): State<AppState>,
    AuthUser(_who): AuthUser,
    Path(id): Path<Uuid>,
) -> ApiResult<impl IntoResponse> {
    let product = Product::find(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::not_found("Product not found"))?;
    let store = repo::store_summaries(&state.db, &[product.store_id])
        .await?
        .pop();
    Ok(ok(
        ProductResponse::from_parts(product, store, &state.config),
        "Product retrieved",
    ))
}

#[instrument(skip(state))]
pub async fn get_products_by_store(
    State(state): State<AppState>,
    AuthUser(_who): AuthUser,
    Path(store_id): Path<Uuid>,
) -> ApiResult<impl IntoResponse> {
    let store = Store::find(&state.db, store_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Store not found"))?;
    let summary = StoreSummary {
        id: store.id,
        name: store.name,
    };

    let products = Product::list_by_store(&state.db, store_id).await?;
    let data: Vec<ProductResponse> = products
        .into_iter()
        .map(|p| ProductResponse::from_parts(p, Some(summary.clone()), &state.config))
        .collect();
    Ok(ok(data, "Products retrieved"))
}

#[instrument(skip(state, mp))]
pub async fn create_product(
    State(state): State<AppState>,
    AuthUser(who): AuthUser,
    mp: Multipart,
) -> ApiResult<impl IntoResponse> {
    who.require_role(&[Role::Merchant])?;
    let store = Store::find_by_user(&state.db, who.user_id)
        .await?
        .ok_or_else(|| ApiError::forbidden("You do not have a store"))?;

    let form = PhotoForm::read(mp).await?;
    let price: Decimal = form
        .parse("price")?
        .ok_or_else(|| ApiError::field("price", "The price field is required"))?;
    let stock: i32 = form
        .parse("stock")?
        .ok_or_else(|| ApiError::field("stock", "The stock field is required"))?;
    let input = CreateProductInput {
        name: form.require("name")?.to_string(),
        description: form.text("description").map(Into::into),
        price,
        stock,
        category: form.text("category").map(Into::into),
        is_active: form.parse_bool("is_active")?.unwrap_or(true),
    };
    input.validate()?;

    let photo_key = match form.photo.as_ref() {
        Some(photo) => Some(uploads::save_photo(&state, "products", store.id, photo).await?),
        None => None,
    };

    let product = Product::create(
        &state.db,
        NewProduct {
            store_id: store.id,
            name: &input.name,
            description: input.description.as_deref(),
            price: input.price,
            stock: input.stock,
            category: input.category.as_deref(),
            photo_key: photo_key.as_deref(),
            is_active: input.is_active,
        },
    )
    .await?;

    info!(product_id = %product.id, store_id = %store.id, "product created");
    let summary = StoreSummary {
        id: store.id,
        name: store.name,
    };
    Ok(created(
        ProductResponse::from_parts(product, Some(summary), &state.config),
        "Product created",
    ))
}

#[instrument(skip(state, mp))]
pub async fn update_product(
    State(state): State<AppState>,
    AuthUser(who): AuthUser,
    Path(id): Path<Uuid>,
    mp: Multipart,
) -> ApiResult<impl IntoResponse> {
    let product = Product::find(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::not_found("Product not found"))?;
    let store = Store::find(&state.db, product.store_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Store not found"))?;
    require_product_access(&who, &store)?;

    let form = PhotoForm::read(mp).await?;
    let input = UpdateProductInput {
        name: form.text("name").map(Into::into),
        description: form.text("description").map(Into::into),
        price: form.parse("price")?,
        stock: form.parse("stock")?,
        category: form.text("category").map(Into::into),
        is_active: form.parse_bool("is_active")?,
    };
    input.validate()?;

    let new_photo = match form.photo.as_ref() {
        Some(photo) => Some(uploads::save_photo(&state, "products", store.id, photo).await?),
        None => None,
    };

    let updated = Product::update(
        &state.db,
        id,
        ProductChanges {
            name: input.name.as_deref(),
            description: input.description.as_deref(),
            price: input.price,
            stock: input.stock,
            category: input.category.as_deref(),
            photo_key: new_photo.as_deref(),
            is_active: input.is_active,
        },
    )
    .await?;

    if new_photo.is_some() {
        if let Some(old) = product.photo_key {
            uploads::remove_photo(&state, &old).await;
        }
    }

    info!(product_id = %id, "product updated");
    let summary = StoreSummary {
        id: store.id,
        name: store.name,
    };
    Ok(ok(
        ProductResponse::from_parts(updated, Some(summary), &state.config),
        "Product updated",
    ))
}

#[instrument(skip(state))]
pub async fn delete_product(
    State(state): State<AppState>,
    AuthUser(who): AuthUser,
    Path(id): Path<Uuid>,
) -> ApiResult<impl IntoResponse> {
    let product = Product::find(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::not_found("Product not found"))?;
    let store = Store::find(&state.db, product.store_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Store not found"))?;
    require_product_access(&who, &store)?;

    service::delete_product(&state, product).await?;
    Ok(done("Product deleted"))
}

fn require_product_access(who: &Identity, store: &Store) -> Result<(), ApiError> {
    if store.user_id == who.user_id || who.is_super_admin() {
        Ok(())
    } else {
        Err(ApiError::forbidden("You do not own this product"))
    }
}
