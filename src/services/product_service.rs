use sea_orm::ActiveValue::NotSet;
use sea_orm::sea_query::Expr;
use sea_orm::sea_query::extension::postgres::PgExpr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder,
    QuerySelect, Set,
};
use uuid::Uuid;

use crate::{
    audit::log_audit,
    dto::products::{CreateProductRequest, ProductPage, UpdateProductRequest},
    entity::categories::Entity as Categories,
    entity::products::{ActiveModel as ProductActive, Column as ProductCol, Entity as Products},
    error::{AppError, AppResult},
    middleware::auth::{AuthUser, ensure_admin},
    models::Product,
    response::PageMeta,
    routes::params::{ProductQuery, normalize_page},
    state::AppState,
};

/// Denormalized discounted price, in minor currency units. Integer math
/// truncates sub-unit remainders.
pub fn compute_final_price(price: i64, discount: i32) -> i64 {
    price - price * i64::from(discount) / 100
}

pub async fn list_products(state: &AppState, query: ProductQuery) -> AppResult<ProductPage> {
    let (page, limit, offset) = normalize_page(query.page, query.limit);

    let mut condition = Condition::all();

    if let Some(category_id) = query.category_id {
        condition = condition.add(ProductCol::CategoryId.eq(category_id));
    }

    // `featured=false` means "no filter", matching the query contract.
    if query.featured == Some(true) {
        condition = condition.add(ProductCol::Featured.eq(true));
    }

    if let Some(min_price) = query.min_price {
        condition = condition.add(ProductCol::FinalPrice.gte(min_price));
    }

    if let Some(max_price) = query.max_price {
        condition = condition.add(ProductCol::FinalPrice.lte(max_price));
    }

    if let Some(search) = query.search.as_ref().filter(|s| !s.is_empty()) {
        let pattern = format!("%{}%", search);
        condition = condition.add(
            Condition::any()
                .add(Expr::col((Products, ProductCol::Name)).ilike(pattern.clone()))
                .add(Expr::col((Products, ProductCol::Description)).ilike(pattern)),
        );
    }

    let total = Products::find()
        .filter(condition.clone())
        .count(&state.orm)
        .await? as i64;

    let products = Products::find()
        .find_also_related(Categories)
        .filter(condition)
        .order_by_desc(ProductCol::CreatedAt)
        .limit(limit as u64)
        .offset(offset as u64)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(|(product, category)| Product::from_entity(product, category))
        .collect();

    Ok(ProductPage {
        products,
        pagination: PageMeta::new(total, page, limit),
    })
}

pub async fn get_product(state: &AppState, id: Uuid) -> AppResult<Product> {
    let found = Products::find_by_id(id)
        .find_also_related(Categories)
        .one(&state.orm)
        .await?;

    match found {
        Some((product, category)) => Ok(Product::from_entity(product, category)),
        None => Err(AppError::NotFound("Product not found".into())),
    }
}

pub async fn create_product(
    state: &AppState,
    user: &AuthUser,
    payload: CreateProductRequest,
) -> AppResult<Product> {
    ensure_admin(user)?;

    let category = Categories::find_by_id(payload.category_id)
        .one(&state.orm)
        .await?;
    let category = match category {
        Some(c) => c,
        None => return Err(AppError::BadRequest("Category not found".into())),
    };

    let final_price = compute_final_price(payload.price, payload.discount);

    let product = ProductActive {
        id: Set(Uuid::new_v4()),
        name: Set(payload.name),
        description: Set(payload.description),
        price: Set(payload.price),
        discount: Set(payload.discount),
        final_price: Set(final_price),
        stock: Set(payload.stock),
        category_id: Set(payload.category_id),
        sku: Set(payload.sku),
        featured: Set(payload.featured),
        images: Set(serde_json::json!(payload.images)),
        created_at: NotSet,
    }
    .insert(&state.orm)
    .await?;

    if let Err(err) = log_audit(
        &state.orm,
        Some(user.user_id),
        "product_create",
        Some("products"),
        Some(serde_json::json!({ "product_id": product.id })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    Ok(Product::from_entity(product, Some(category)))
}

pub async fn update_product(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
    payload: UpdateProductRequest,
) -> AppResult<Product> {
    ensure_admin(user)?;

    let existing = Products::find_by_id(id).one(&state.orm).await?;
    let existing = match existing {
        Some(p) => p,
        None => return Err(AppError::NotFound("Product not found".into())),
    };

    // Effective price/discount after the partial update; final_price follows
    // whenever either changes.
    let price = payload.price.unwrap_or(existing.price);
    let discount = payload.discount.unwrap_or(existing.discount);
    let final_price = compute_final_price(price, discount);

    if let Some(category_id) = payload.category_id {
        let exists = Categories::find_by_id(category_id).one(&state.orm).await?;
        if exists.is_none() {
            return Err(AppError::BadRequest("Category not found".into()));
        }
    }

    let mut active: ProductActive = existing.into();
    if let Some(name) = payload.name {
        active.name = Set(name);
    }
    if let Some(description) = payload.description {
        active.description = Set(description);
    }
    if let Some(stock) = payload.stock {
        active.stock = Set(stock);
    }
    if let Some(category_id) = payload.category_id {
        active.category_id = Set(category_id);
    }
    if let Some(sku) = payload.sku {
        active.sku = Set(sku);
    }
    if let Some(featured) = payload.featured {
        active.featured = Set(featured);
    }
    if let Some(images) = payload.images {
        active.images = Set(serde_json::json!(images));
    }
    active.price = Set(price);
    active.discount = Set(discount);
    active.final_price = Set(final_price);

    let product = active.update(&state.orm).await?;

    if let Err(err) = log_audit(
        &state.orm,
        Some(user.user_id),
        "product_update",
        Some("products"),
        Some(serde_json::json!({ "product_id": product.id })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    let category = Categories::find_by_id(product.category_id)
        .one(&state.orm)
        .await?;

    Ok(Product::from_entity(product, category))
}

pub async fn delete_product(state: &AppState, user: &AuthUser, id: Uuid) -> AppResult<()> {
    ensure_admin(user)?;

    let result = Products::delete_by_id(id).exec(&state.orm).await?;
    if result.rows_affected == 0 {
        return Err(AppError::NotFound("Product not found".into()));
    }

    if let Err(err) = log_audit(
        &state.orm,
        Some(user.user_id),
        "product_delete",
        Some("products"),
        Some(serde_json::json!({ "product_id": id })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::compute_final_price;

    #[test]
    fn final_price_applies_discount_percentage() {
        assert_eq!(compute_final_price(15000, 10), 13500);
        assert_eq!(compute_final_price(8000, 5), 7600);
        assert_eq!(compute_final_price(10000, 0), 10000);
        assert_eq!(compute_final_price(20000, 100), 0);
    }

    #[test]
    fn final_price_truncates_sub_unit_remainders() {
        assert_eq!(compute_final_price(99, 10), 90);
    }
}
