use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::models::Product;

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CategoryRequest {
    #[validate(length(min = 2))]
    pub name: String,
    #[validate(length(min = 2))]
    pub slug: String,
}

/// Category detail view: the category plus every product filed under it.
#[derive(Debug, Serialize, ToSchema)]
pub struct CategoryWithProducts {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
    pub created_at: DateTime<Utc>,
    pub products: Vec<Product>,
}
