use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::entity;

/// Public view of a user; the password hash never leaves the service.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub role: String,
    pub phone: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<entity::users::Model> for User {
    fn from(model: entity::users::Model) -> Self {
        User {
            id: model.id,
            name: model.name,
            email: model.email,
            role: model.role,
            phone: model.phone,
            created_at: model.created_at.with_timezone(&Utc),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Category {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
    pub created_at: DateTime<Utc>,
}

impl From<entity::categories::Model> for Category {
    fn from(model: entity::categories::Model) -> Self {
        Category {
            id: model.id,
            name: model.name,
            slug: model.slug,
            created_at: model.created_at.with_timezone(&Utc),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Product {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    /// Price before discount, in minor currency units.
    pub price: i64,
    /// Discount percentage, 0..=100.
    pub discount: i32,
    /// Denormalized `price - price * discount / 100`.
    pub final_price: i64,
    pub stock: i32,
    pub category_id: Uuid,
    pub sku: String,
    pub featured: bool,
    pub images: Vec<String>,
    pub category: Option<Category>,
    pub created_at: DateTime<Utc>,
}

impl Product {
    pub fn from_entity(
        model: entity::products::Model,
        category: Option<entity::categories::Model>,
    ) -> Self {
        Product {
            id: model.id,
            name: model.name,
            description: model.description,
            price: model.price,
            discount: model.discount,
            final_price: model.final_price,
            stock: model.stock,
            category_id: model.category_id,
            sku: model.sku,
            featured: model.featured,
            images: serde_json::from_value(model.images).unwrap_or_default(),
            category: category.map(Category::from),
            created_at: model.created_at.with_timezone(&Utc),
        }
    }
}

impl From<entity::products::Model> for Product {
    fn from(model: entity::products::Model) -> Self {
        Product::from_entity(model, None)
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct Order {
    pub id: Uuid,
    pub user_id: Uuid,
    pub total_amount: i64,
    pub shipping_address: String,
    pub status: String,
    pub payment_status: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<entity::orders::Model> for Order {
    fn from(model: entity::orders::Model) -> Self {
        Order {
            id: model.id,
            user_id: model.user_id,
            total_amount: model.total_amount,
            shipping_address: model.shipping_address,
            status: model.status,
            payment_status: model.payment_status,
            created_at: model.created_at.with_timezone(&Utc),
            updated_at: model.updated_at.with_timezone(&Utc),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct OrderItem {
    pub id: Uuid,
    pub order_id: Uuid,
    pub product_id: Uuid,
    pub quantity: i32,
    /// Snapshot of the product's final price at checkout time; never recomputed.
    pub price_at_purchase: i64,
    /// Current product record, for clients rendering order lines. The price
    /// shown on the line is always `price_at_purchase`, not this.
    pub product: Option<Product>,
    pub created_at: DateTime<Utc>,
}

impl From<entity::order_items::Model> for OrderItem {
    fn from(model: entity::order_items::Model) -> Self {
        OrderItem {
            id: model.id,
            order_id: model.order_id,
            product_id: model.product_id,
            quantity: model.quantity,
            price_at_purchase: model.price_at_purchase,
            product: None,
            created_at: model.created_at.with_timezone(&Utc),
        }
    }
}
