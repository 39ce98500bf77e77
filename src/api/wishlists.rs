/// Wishlist and item endpoints
use crate::{
    api::validate_body,
    auth::CurrentUser,
    context::AppContext,
    db::models::{Item, Wishlist},
    error::ApiResult,
    wishlist::{
        CreateItemRequest, CreateWishlistRequest, PublicWishlist, ReorderRequest,
        UpdateItemRequest, UpdateWishlistRequest, WishlistDetail,
    },
};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;

pub async fn list(
    State(ctx): State<AppContext>,
    CurrentUser(user): CurrentUser,
) -> ApiResult<Json<Vec<Wishlist>>> {
    Ok(Json(ctx.wishlists.list_wishlists(user.id).await?))
}

pub async fn create(
    State(ctx): State<AppContext>,
    CurrentUser(user): CurrentUser,
    Json(req): Json<CreateWishlistRequest>,
) -> ApiResult<(StatusCode, Json<Wishlist>)> {
    validate_body(&req)?;

    let wishlist = ctx.wishlists.create_wishlist(user.id, &req).await?;

    Ok((StatusCode::CREATED, Json(wishlist)))
}

pub async fn get(
    State(ctx): State<AppContext>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<WishlistDetail>> {
    Ok(Json(ctx.wishlists.get_wishlist(id, user.id).await?))
}

pub async fn update(
    State(ctx): State<AppContext>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateWishlistRequest>,
) -> ApiResult<Json<Wishlist>> {
    validate_body(&req)?;

    Ok(Json(ctx.wishlists.update_wishlist(id, user.id, &req).await?))
}

pub async fn remove(
    State(ctx): State<AppContext>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    ctx.wishlists.delete_wishlist(id, user.id).await?;

    Ok(StatusCode::NO_CONTENT)
}

pub async fn reorder(
    State(ctx): State<AppContext>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<Uuid>,
    Json(req): Json<ReorderRequest>,
) -> ApiResult<Json<Vec<Item>>> {
    Ok(Json(ctx.wishlists.reorder(id, user.id, &req).await?))
}

/// Public, unauthenticated share-token view
pub async fn public(
    State(ctx): State<AppContext>,
    Path(share_token): Path<String>,
) -> ApiResult<Json<PublicWishlist>> {
    Ok(Json(ctx.wishlists.get_public_wishlist(&share_token).await?))
}

pub async fn create_item(
    State(ctx): State<AppContext>,
    CurrentUser(user): CurrentUser,
    Path(wishlist_id): Path<Uuid>,
    Json(req): Json<CreateItemRequest>,
) -> ApiResult<(StatusCode, Json<Item>)> {
    validate_body(&req)?;

    let item = ctx.wishlists.create_item(wishlist_id, user.id, &req).await?;

    Ok((StatusCode::CREATED, Json(item)))
}

pub async fn update_item(
    State(ctx): State<AppContext>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateItemRequest>,
) -> ApiResult<Json<Item>> {
    validate_body(&req)?;

    Ok(Json(ctx.wishlists.update_item(id, user.id, &req).await?))
}

pub async fn remove_item(
    State(ctx): State<AppContext>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    ctx.wishlists.delete_item(id, user.id).await?;

    Ok(StatusCode::NO_CONTENT)
}
