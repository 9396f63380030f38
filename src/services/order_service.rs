use std::collections::HashMap;

use chrono::Utc;
use sea_orm::ActiveValue::NotSet;
use sea_orm::sea_query::{Expr, LockType};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, FromQueryResult, JoinType,
    PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, RelationTrait, Set, TransactionTrait,
};
use uuid::Uuid;

use crate::{
    audit::log_audit,
    dto::orders::{CheckoutRequest, OrderPage, OrderWithItems, UpdateOrderStatusRequest},
    entity::cart_items::{self, Column as CartItemCol, Entity as CartItems},
    entity::categories::Entity as Categories,
    entity::order_items::{
        ActiveModel as OrderItemActive, Column as OrderItemCol, Entity as OrderItems,
    },
    entity::orders::{ActiveModel as OrderActive, Column as OrderCol, Entity as Orders},
    entity::products::{Column as ProductCol, Entity as Products},
    error::{AppError, AppResult},
    middleware::auth::{AuthUser, ensure_admin},
    models::{Order, OrderItem, Product},
    response::PageMeta,
    routes::params::{Pagination, normalize_page},
    state::AppState,
};

pub const ORDER_STATUSES: [&str; 5] = ["Pending", "Confirmed", "Shipped", "Delivered", "Cancelled"];

pub fn validate_order_status(status: &str) -> Result<(), AppError> {
    if ORDER_STATUSES.contains(&status) {
        Ok(())
    } else {
        Err(AppError::BadRequest("Invalid order status".into()))
    }
}

#[derive(Debug, FromQueryResult)]
struct CartLine {
    product_id: Uuid,
    quantity: i32,
    final_price: i64,
    stock: i32,
}

/// Convert the user's cart into a durable order.
///
/// The whole flow runs in one transaction with the cart's product rows locked
/// `FOR UPDATE`: stock sufficiency is validated for every line before any
/// decrement, then the order, its items, the stock decrements, and the cart
/// clear commit together or not at all. A concurrent checkout of the same
/// last unit blocks on the row lock and then fails the stock check.
pub async fn checkout(
    state: &AppState,
    user: &AuthUser,
    payload: CheckoutRequest,
) -> AppResult<OrderWithItems> {
    let txn = state.orm.begin().await?;

    let lines = CartItems::find()
        .select_only()
        .column_as(CartItemCol::ProductId, "product_id")
        .column_as(CartItemCol::Quantity, "quantity")
        .column_as(ProductCol::FinalPrice, "final_price")
        .column_as(ProductCol::Stock, "stock")
        .join(JoinType::InnerJoin, cart_items::Relation::Products.def())
        .filter(CartItemCol::UserId.eq(user.user_id))
        .lock(LockType::Update)
        .into_model::<CartLine>()
        .all(&txn)
        .await?;

    if lines.is_empty() {
        return Err(AppError::BadRequest("Cart is empty".into()));
    }

    let mut total_amount: i64 = 0;
    for line in &lines {
        if line.stock < line.quantity {
            return Err(AppError::BadRequest(format!(
                "Insufficient stock for product {}",
                line.product_id
            )));
        }
        total_amount += line.final_price * i64::from(line.quantity);
    }

    let order = OrderActive {
        id: Set(Uuid::new_v4()),
        user_id: Set(user.user_id),
        total_amount: Set(total_amount),
        shipping_address: Set(payload.shipping_address),
        status: Set("Pending".into()),
        payment_status: Set("Pending".into()),
        created_at: NotSet,
        updated_at: NotSet,
    }
    .insert(&txn)
    .await?;

    let mut items: Vec<OrderItem> = Vec::with_capacity(lines.len());

    for line in &lines {
        let item = OrderItemActive {
            id: Set(Uuid::new_v4()),
            order_id: Set(order.id),
            product_id: Set(line.product_id),
            quantity: Set(line.quantity),
            price_at_purchase: Set(line.final_price),
            created_at: NotSet,
        }
        .insert(&txn)
        .await?;

        items.push(OrderItem::from(item));

        Products::update_many()
            .col_expr(
                ProductCol::Stock,
                Expr::col(ProductCol::Stock).sub(line.quantity),
            )
            .filter(ProductCol::Id.eq(line.product_id))
            .exec(&txn)
            .await?;
    }

    CartItems::delete_many()
        .filter(CartItemCol::UserId.eq(user.user_id))
        .exec(&txn)
        .await?;

    txn.commit().await?;

    if let Err(err) = log_audit(
        &state.orm,
        Some(user.user_id),
        "checkout",
        Some("orders"),
        Some(serde_json::json!({ "order_id": order.id, "total_amount": total_amount })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    attach_products(state, &mut items).await?;

    Ok(OrderWithItems {
        order: Order::from(order),
        items,
    })
}

/// Embed each line's current product record, the way clients render order
/// history. The billed price stays `price_at_purchase`.
async fn attach_products(state: &AppState, items: &mut [OrderItem]) -> AppResult<()> {
    if items.is_empty() {
        return Ok(());
    }

    let ids: Vec<Uuid> = items.iter().map(|i| i.product_id).collect();
    let products: HashMap<Uuid, Product> = Products::find()
        .find_also_related(Categories)
        .filter(ProductCol::Id.is_in(ids))
        .all(&state.orm)
        .await?
        .into_iter()
        .map(|(product, category)| (product.id, Product::from_entity(product, category)))
        .collect();

    for item in items.iter_mut() {
        item.product = products.get(&item.product_id).cloned();
    }

    Ok(())
}

pub async fn list_my_orders(state: &AppState, user: &AuthUser) -> AppResult<Vec<OrderWithItems>> {
    let orders = Orders::find()
        .filter(OrderCol::UserId.eq(user.user_id))
        .order_by_desc(OrderCol::CreatedAt)
        .find_with_related(OrderItems)
        .all(&state.orm)
        .await?;

    let mut result = Vec::with_capacity(orders.len());
    for (order, items) in orders {
        let mut items: Vec<OrderItem> = items.into_iter().map(OrderItem::from).collect();
        attach_products(state, &mut items).await?;
        result.push(OrderWithItems {
            order: Order::from(order),
            items,
        });
    }

    Ok(result)
}

/// Ownership is enforced, not masked: a foreign order id yields 403, unlike
/// cart rows which report 404.
pub async fn get_order(state: &AppState, user: &AuthUser, id: Uuid) -> AppResult<OrderWithItems> {
    let order = Orders::find_by_id(id).one(&state.orm).await?;
    let order = match order {
        Some(o) => o,
        None => return Err(AppError::NotFound("Order not found".into())),
    };

    if order.user_id != user.user_id && !user.is_admin() {
        return Err(AppError::Forbidden);
    }

    let mut items: Vec<OrderItem> = OrderItems::find()
        .filter(OrderItemCol::OrderId.eq(order.id))
        .all(&state.orm)
        .await?
        .into_iter()
        .map(OrderItem::from)
        .collect();
    attach_products(state, &mut items).await?;

    Ok(OrderWithItems {
        order: Order::from(order),
        items,
    })
}

pub async fn list_all_orders(
    state: &AppState,
    user: &AuthUser,
    pagination: Pagination,
) -> AppResult<OrderPage> {
    ensure_admin(user)?;
    let (page, limit, offset) = normalize_page(pagination.page, pagination.limit);

    let total = Orders::find().count(&state.orm).await? as i64;

    let orders = Orders::find()
        .order_by_desc(OrderCol::CreatedAt)
        .limit(limit as u64)
        .offset(offset as u64)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(Order::from)
        .collect();

    Ok(OrderPage {
        orders,
        pagination: PageMeta::new(total, page, limit),
    })
}

pub async fn update_order_status(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
    payload: UpdateOrderStatusRequest,
) -> AppResult<Order> {
    ensure_admin(user)?;
    validate_order_status(&payload.status)?;

    let existing = Orders::find_by_id(id).one(&state.orm).await?;
    let existing = match existing {
        Some(o) => o,
        None => return Err(AppError::NotFound("Order not found".into())),
    };

    let mut active: OrderActive = existing.into();
    active.status = Set(payload.status);
    active.updated_at = Set(Utc::now().into());
    let order = active.update(&state.orm).await?;

    if let Err(err) = log_audit(
        &state.orm,
        Some(user.user_id),
        "order_status_update",
        Some("orders"),
        Some(serde_json::json!({ "order_id": order.id, "status": order.status })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    Ok(Order::from(order))
}

#[cfg(test)]
mod tests {
    use super::validate_order_status;

    #[test]
    fn accepts_the_five_lifecycle_statuses() {
        for status in ["Pending", "Confirmed", "Shipped", "Delivered", "Cancelled"] {
            assert!(validate_order_status(status).is_ok());
        }
    }

    #[test]
    fn rejects_unknown_and_miscased_statuses() {
        assert!(validate_order_status("pending").is_err());
        assert!(validate_order_status("Refunded").is_err());
        assert!(validate_order_status("").is_err());
    }
}
