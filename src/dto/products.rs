use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::{models::Product, response::PageMeta};

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateProductRequest {
    #[validate(length(min = 2))]
    pub name: String,
    #[validate(length(min = 10))]
    pub description: String,
    #[validate(range(min = 1))]
    pub price: i64,
    #[validate(range(min = 0, max = 100))]
    #[serde(default)]
    pub discount: i32,
    #[validate(range(min = 1))]
    pub stock: i32,
    pub category_id: Uuid,
    #[validate(length(min = 2))]
    pub sku: String,
    #[serde(default)]
    pub featured: bool,
    #[serde(default)]
    pub images: Vec<String>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UpdateProductRequest {
    #[validate(length(min = 2))]
    pub name: Option<String>,
    #[validate(length(min = 10))]
    pub description: Option<String>,
    #[validate(range(min = 1))]
    pub price: Option<i64>,
    #[validate(range(min = 0, max = 100))]
    pub discount: Option<i32>,
    #[validate(range(min = 0))]
    pub stock: Option<i32>,
    pub category_id: Option<Uuid>,
    #[validate(length(min = 2))]
    pub sku: Option<String>,
    pub featured: Option<bool>,
    pub images: Option<Vec<String>>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ProductPage {
    pub products: Vec<Product>,
    pub pagination: PageMeta,
}
