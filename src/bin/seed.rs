use sea_orm::ActiveValue::NotSet;
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, Set};
use uuid::Uuid;

use storefront_api::{
    config::AppConfig,
    db::{OrmConn, create_orm_conn, run_migrations},
    entity::categories::{ActiveModel as CategoryActive, Column as CategoryCol, Entity as Categories},
    entity::products::{ActiveModel as ProductActive, Column as ProductCol, Entity as Products},
    entity::users::{ActiveModel as UserActive, Column as UserCol, Entity as Users},
    services::auth_service::hash_password,
    services::product_service::compute_final_price,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = AppConfig::from_env()?;

    let orm = create_orm_conn(&config.database_url).await?;
    run_migrations(&orm, "migrations").await?;

    let admin_id = ensure_user(&orm, "Admin User", "admin@example.com", "admin123", "admin").await?;
    let customer_id = ensure_user(
        &orm,
        "John Doe",
        "customer@example.com",
        "customer123",
        "customer",
    )
    .await?;

    let rings = ensure_category(&orm, "Rings", "rings").await?;
    let necklaces = ensure_category(&orm, "Necklaces", "necklaces").await?;
    let earrings = ensure_category(&orm, "Earrings", "earrings").await?;
    let bracelets = ensure_category(&orm, "Bracelets", "bracelets").await?;

    let products: Vec<(&str, &str, i64, i32, i32, Uuid, &str, bool)> = vec![
        (
            "Gold Diamond Ring",
            "Beautiful 18K gold ring with premium diamond stone",
            15000,
            10,
            50,
            rings,
            "RING-001",
            true,
        ),
        (
            "Silver Pearl Necklace",
            "Elegant silver necklace with natural pearl pendant",
            8000,
            5,
            30,
            necklaces,
            "NECK-001",
            true,
        ),
        (
            "Diamond Stud Earrings",
            "Classic diamond stud earrings in white gold",
            12000,
            15,
            40,
            earrings,
            "EAR-001",
            true,
        ),
        (
            "Gold Bangle Bracelet",
            "Traditional gold bangle bracelet with intricate design",
            10000,
            0,
            25,
            bracelets,
            "BRAC-001",
            false,
        ),
        (
            "Emerald Ring",
            "Stunning emerald ring with diamond accents",
            20000,
            20,
            15,
            rings,
            "RING-002",
            true,
        ),
        (
            "Ruby Necklace",
            "Luxurious ruby pendant necklace in platinum",
            25000,
            10,
            10,
            necklaces,
            "NECK-002",
            true,
        ),
    ];

    for (name, description, price, discount, stock, category_id, sku, featured) in products {
        ensure_product(
            &orm,
            name,
            description,
            price,
            discount,
            stock,
            category_id,
            sku,
            featured,
        )
        .await?;
    }

    println!("Seed completed. Admin ID: {admin_id}, Customer ID: {customer_id}");
    Ok(())
}

async fn ensure_user(
    orm: &OrmConn,
    name: &str,
    email: &str,
    password: &str,
    role: &str,
) -> anyhow::Result<Uuid> {
    if let Some(existing) = Users::find()
        .filter(UserCol::Email.eq(email))
        .one(orm)
        .await?
    {
        return Ok(existing.id);
    }

    let password_hash = hash_password(password).map_err(|e| anyhow::anyhow!(e.to_string()))?;

    let user = UserActive {
        id: Set(Uuid::new_v4()),
        name: Set(name.to_string()),
        email: Set(email.to_string()),
        password_hash: Set(password_hash),
        role: Set(role.to_string()),
        phone: Set(None),
        created_at: NotSet,
    }
    .insert(orm)
    .await?;

    println!("Ensured user {email} (role={role})");
    Ok(user.id)
}

async fn ensure_category(orm: &OrmConn, name: &str, slug: &str) -> anyhow::Result<Uuid> {
    if let Some(existing) = Categories::find()
        .filter(CategoryCol::Slug.eq(slug))
        .one(orm)
        .await?
    {
        return Ok(existing.id);
    }

    let category = CategoryActive {
        id: Set(Uuid::new_v4()),
        name: Set(name.to_string()),
        slug: Set(slug.to_string()),
        created_at: NotSet,
    }
    .insert(orm)
    .await?;

    Ok(category.id)
}

#[allow(clippy::too_many_arguments)]
async fn ensure_product(
    orm: &OrmConn,
    name: &str,
    description: &str,
    price: i64,
    discount: i32,
    stock: i32,
    category_id: Uuid,
    sku: &str,
    featured: bool,
) -> anyhow::Result<()> {
    if Products::find()
        .filter(ProductCol::Sku.eq(sku))
        .one(orm)
        .await?
        .is_some()
    {
        return Ok(());
    }

    ProductActive {
        id: Set(Uuid::new_v4()),
        name: Set(name.to_string()),
        description: Set(description.to_string()),
        price: Set(price),
        discount: Set(discount),
        final_price: Set(compute_final_price(price, discount)),
        stock: Set(stock),
        category_id: Set(category_id),
        sku: Set(sku.to_string()),
        featured: Set(featured),
        images: Set(serde_json::json!([])),
        created_at: NotSet,
    }
    .insert(orm)
    .await?;

    println!("Seeded product {sku}");
    Ok(())
}
