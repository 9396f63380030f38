use sea_orm::ActiveValue::NotSet;
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, QueryOrder, Set};
use uuid::Uuid;

use crate::{
    audit::log_audit,
    dto::categories::{CategoryRequest, CategoryWithProducts},
    entity::categories::{ActiveModel as CategoryActive, Column as CategoryCol, Entity as Categories},
    entity::products::{Column as ProductCol, Entity as Products},
    error::{AppError, AppResult},
    middleware::auth::{AuthUser, ensure_admin},
    models::{Category, Product},
    state::AppState,
};
use chrono::Utc;

pub async fn list_categories(state: &AppState) -> AppResult<Vec<Category>> {
    let categories = Categories::find()
        .order_by_asc(CategoryCol::Name)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(Category::from)
        .collect();

    Ok(categories)
}

pub async fn get_category(state: &AppState, id: Uuid) -> AppResult<CategoryWithProducts> {
    let category = Categories::find_by_id(id).one(&state.orm).await?;
    let category = match category {
        Some(c) => c,
        None => return Err(AppError::NotFound("Category not found".into())),
    };

    let products = Products::find()
        .filter(ProductCol::CategoryId.eq(category.id))
        .all(&state.orm)
        .await?
        .into_iter()
        .map(Product::from)
        .collect();

    Ok(CategoryWithProducts {
        id: category.id,
        name: category.name,
        slug: category.slug,
        created_at: category.created_at.with_timezone(&Utc),
        products,
    })
}

pub async fn create_category(
    state: &AppState,
    user: &AuthUser,
    payload: CategoryRequest,
) -> AppResult<Category> {
    ensure_admin(user)?;

    let exist = Categories::find()
        .filter(CategoryCol::Slug.eq(payload.slug.as_str()))
        .one(&state.orm)
        .await?;
    if exist.is_some() {
        return Err(AppError::BadRequest("Slug is already taken".into()));
    }

    let category = CategoryActive {
        id: Set(Uuid::new_v4()),
        name: Set(payload.name),
        slug: Set(payload.slug),
        created_at: NotSet,
    }
    .insert(&state.orm)
    .await?;

    if let Err(err) = log_audit(
        &state.orm,
        Some(user.user_id),
        "category_create",
        Some("categories"),
        Some(serde_json::json!({ "category_id": category.id })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    Ok(Category::from(category))
}

pub async fn update_category(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
    payload: CategoryRequest,
) -> AppResult<Category> {
    ensure_admin(user)?;

    let existing = Categories::find_by_id(id).one(&state.orm).await?;
    let existing = match existing {
        Some(c) => c,
        None => return Err(AppError::NotFound("Category not found".into())),
    };

    let mut active: CategoryActive = existing.into();
    active.name = Set(payload.name);
    active.slug = Set(payload.slug);
    let category = active.update(&state.orm).await?;

    if let Err(err) = log_audit(
        &state.orm,
        Some(user.user_id),
        "category_update",
        Some("categories"),
        Some(serde_json::json!({ "category_id": category.id })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    Ok(Category::from(category))
}

pub async fn delete_category(state: &AppState, user: &AuthUser, id: Uuid) -> AppResult<()> {
    ensure_admin(user)?;

    let result = Categories::delete_by_id(id).exec(&state.orm).await?;
    if result.rows_affected == 0 {
        return Err(AppError::NotFound("Category not found".into()));
    }

    if let Err(err) = log_audit(
        &state.orm,
        Some(user.user_id),
        "category_delete",
        Some("categories"),
        Some(serde_json::json!({ "category_id": id })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    Ok(())
}
