use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    routing::{delete, get, put},
};
use uuid::Uuid;
use validator::Validate;

use crate::{
    dto::cart::{AddToCartRequest, CartItemResponse, UpdateCartItemRequest},
    error::AppResult,
    middleware::auth::AuthUser,
    services::cart_service,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_cart).post(add_to_cart))
        .route("/{id}", put(update_cart_item))
        .route("/{id}", delete(remove_cart_item))
}

#[utoipa::path(
    get,
    path = "/api/cart",
    responses(
        (status = 200, description = "Current user's cart", body = Vec<CartItemResponse>)
    ),
    security(("bearer_auth" = [])),
    tag = "Cart"
)]
pub async fn list_cart(
    State(state): State<AppState>,
    user: AuthUser,
) -> AppResult<Json<Vec<CartItemResponse>>> {
    let resp = cart_service::list_cart(&state, &user).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/cart",
    request_body = AddToCartRequest,
    responses(
        (status = 201, description = "Added to cart; quantity merged when the product was already present", body = CartItemResponse),
        (status = 400, description = "Insufficient stock"),
        (status = 404, description = "Product not found"),
    ),
    security(("bearer_auth" = [])),
    tag = "Cart"
)]
pub async fn add_to_cart(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<AddToCartRequest>,
) -> AppResult<(StatusCode, Json<CartItemResponse>)> {
    payload.validate()?;
    let resp = cart_service::add_to_cart(&state, &user, payload).await?;
    Ok((StatusCode::CREATED, Json(resp)))
}

#[utoipa::path(
    put,
    path = "/api/cart/{id}",
    params(
        ("id" = Uuid, Path, description = "Cart item ID")
    ),
    request_body = UpdateCartItemRequest,
    responses(
        (status = 200, description = "Updated cart item", body = CartItemResponse),
        (status = 400, description = "Insufficient stock"),
        (status = 404, description = "Cart item not found"),
    ),
    security(("bearer_auth" = [])),
    tag = "Cart"
)]
pub async fn update_cart_item(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateCartItemRequest>,
) -> AppResult<Json<CartItemResponse>> {
    payload.validate()?;
    let resp = cart_service::update_cart_item(&state, &user, id, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    delete,
    path = "/api/cart/{id}",
    params(
        ("id" = Uuid, Path, description = "Cart item ID")
    ),
    responses(
        (status = 200, description = "Removed from cart"),
        (status = 404, description = "Cart item not found"),
    ),
    security(("bearer_auth" = [])),
    tag = "Cart"
)]
pub async fn remove_cart_item(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<serde_json::Value>> {
    cart_service::remove_cart_item(&state, &user, id).await?;
    Ok(Json(
        serde_json::json!({ "message": "Item removed from cart" }),
    ))
}
