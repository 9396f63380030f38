use std::collections::HashMap;

use chrono::Utc;
use sea_orm::ActiveValue::NotSet;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, EntityTrait, ModelTrait, QueryFilter, QueryOrder, Set,
};
use uuid::Uuid;

use crate::{
    audit::log_audit,
    dto::cart::{AddToCartRequest, CartItemResponse, UpdateCartItemRequest},
    entity::cart_items::{
        ActiveModel as CartItemActive, Column as CartItemCol, Entity as CartItems,
        Model as CartItemModel,
    },
    entity::categories::{Column as CategoryCol, Entity as Categories, Model as CategoryModel},
    entity::products::Entity as Products,
    error::{AppError, AppResult},
    middleware::auth::AuthUser,
    models::Product,
    state::AppState,
};

pub async fn list_cart(state: &AppState, user: &AuthUser) -> AppResult<Vec<CartItemResponse>> {
    let rows = CartItems::find()
        .find_also_related(Products)
        .filter(CartItemCol::UserId.eq(user.user_id))
        .order_by_desc(CartItemCol::CreatedAt)
        .all(&state.orm)
        .await?;

    let category_ids: Vec<Uuid> = rows
        .iter()
        .filter_map(|(_, product)| product.as_ref().map(|p| p.category_id))
        .collect();
    let categories: HashMap<Uuid, CategoryModel> = Categories::find()
        .filter(CategoryCol::Id.is_in(category_ids))
        .all(&state.orm)
        .await?
        .into_iter()
        .map(|c| (c.id, c))
        .collect();

    let items = rows
        .into_iter()
        .filter_map(|(item, product)| {
            product.map(|p| {
                let category = categories.get(&p.category_id).cloned();
                cart_item_response(item, Product::from_entity(p, category))
            })
        })
        .collect();

    Ok(items)
}

/// Upsert keyed by (user, product): re-adding a product increments the
/// existing row's quantity instead of creating a second row.
pub async fn add_to_cart(
    state: &AppState,
    user: &AuthUser,
    payload: AddToCartRequest,
) -> AppResult<CartItemResponse> {
    let product = Products::find_by_id(payload.product_id)
        .one(&state.orm)
        .await?;
    let product = match product {
        Some(p) => p,
        None => return Err(AppError::NotFound("Product not found".into())),
    };

    if product.stock < payload.quantity {
        return Err(AppError::BadRequest("Insufficient stock".into()));
    }

    let existing = CartItems::find()
        .filter(
            Condition::all()
                .add(CartItemCol::UserId.eq(user.user_id))
                .add(CartItemCol::ProductId.eq(payload.product_id)),
        )
        .one(&state.orm)
        .await?;

    let cart_item = match existing {
        Some(item) => {
            let quantity = item.quantity + payload.quantity;
            let mut active: CartItemActive = item.into();
            active.quantity = Set(quantity);
            active.update(&state.orm).await?
        }
        None => {
            CartItemActive {
                id: Set(Uuid::new_v4()),
                user_id: Set(user.user_id),
                product_id: Set(payload.product_id),
                quantity: Set(payload.quantity),
                created_at: NotSet,
            }
            .insert(&state.orm)
            .await?
        }
    };

    if let Err(err) = log_audit(
        &state.orm,
        Some(user.user_id),
        "cart_add",
        Some("cart_items"),
        Some(serde_json::json!({
            "product_id": payload.product_id,
            "quantity": payload.quantity
        })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    let category = Categories::find_by_id(product.category_id)
        .one(&state.orm)
        .await?;

    Ok(cart_item_response(
        cart_item,
        Product::from_entity(product, category),
    ))
}

pub async fn update_cart_item(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
    payload: UpdateCartItemRequest,
) -> AppResult<CartItemResponse> {
    let item = find_owned_item(state, user, id).await?;

    let product = Products::find_by_id(item.product_id).one(&state.orm).await?;
    let product = match product {
        Some(p) => p,
        None => return Err(AppError::NotFound("Product not found".into())),
    };

    if product.stock < payload.quantity {
        return Err(AppError::BadRequest("Insufficient stock".into()));
    }

    let mut active: CartItemActive = item.into();
    active.quantity = Set(payload.quantity);
    let item = active.update(&state.orm).await?;

    if let Err(err) = log_audit(
        &state.orm,
        Some(user.user_id),
        "cart_update",
        Some("cart_items"),
        Some(serde_json::json!({ "cart_item_id": id, "quantity": payload.quantity })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    let category = Categories::find_by_id(product.category_id)
        .one(&state.orm)
        .await?;

    Ok(cart_item_response(
        item,
        Product::from_entity(product, category),
    ))
}

pub async fn remove_cart_item(state: &AppState, user: &AuthUser, id: Uuid) -> AppResult<()> {
    let item = find_owned_item(state, user, id).await?;
    item.delete(&state.orm).await?;

    if let Err(err) = log_audit(
        &state.orm,
        Some(user.user_id),
        "cart_remove",
        Some("cart_items"),
        Some(serde_json::json!({ "cart_item_id": id })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    Ok(())
}

/// A row belonging to another user is reported as missing, not forbidden.
async fn find_owned_item(state: &AppState, user: &AuthUser, id: Uuid) -> AppResult<CartItemModel> {
    let item = CartItems::find_by_id(id).one(&state.orm).await?;
    match item {
        Some(item) if item.user_id == user.user_id => Ok(item),
        _ => Err(AppError::NotFound("Cart item not found".into())),
    }
}

fn cart_item_response(item: CartItemModel, product: Product) -> CartItemResponse {
    CartItemResponse {
        id: item.id,
        quantity: item.quantity,
        product,
        created_at: item.created_at.with_timezone(&Utc),
    }
}
