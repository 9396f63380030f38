use sea_orm::ActiveValue::NotSet;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, Set, Statement,
};
use uuid::Uuid;

use storefront_api::{
    db::{create_orm_conn, run_migrations},
    dto::{
        auth::{LoginRequest, RegisterRequest},
        cart::{AddToCartRequest, UpdateCartItemRequest},
        orders::{CheckoutRequest, UpdateOrderStatusRequest},
    },
    entity::{
        cart_items::{ActiveModel as CartItemActive, Column as CartItemCol, Entity as CartItems},
        categories::ActiveModel as CategoryActive,
        products::{ActiveModel as ProductActive, Entity as Products},
        users::ActiveModel as UserActive,
    },
    error::AppError,
    middleware::auth::AuthUser,
    routes::params::ProductQuery,
    services::{auth_service, cart_service, order_service, product_service},
    state::AppState,
};

// Integration flow: cart merge on duplicate add, transactional checkout with
// price snapshots and stock decrements, ownership checks, and the admin
// status update. Requires a reachable Postgres; skipped otherwise.
#[tokio::test]
async fn checkout_and_admin_flow() -> anyhow::Result<()> {
    let database_url =
        match std::env::var("TEST_DATABASE_URL").or_else(|_| std::env::var("DATABASE_URL")) {
            Ok(url) => url,
            Err(_) => {
                eprintln!(
                    "Skipping test: set TEST_DATABASE_URL or DATABASE_URL to run integration flow tests."
                );
                return Ok(());
            }
        };

    let state = setup_state(&database_url).await?;

    let category_id = create_category(&state, "Rings", "rings").await?;

    // Product A: final price 100, stock 10. Product B: final price 50, stock 5.
    let product_a = create_product(&state, "Plain Band", category_id, 100, 0, 10, "RING-A").await?;
    let product_b = create_product(&state, "Thin Band", category_id, 50, 0, 5, "RING-B").await?;

    // Catalog filters: search is case-insensitive across name/description,
    // price bounds apply to the discounted final price.
    let all = product_service::list_products(&state, ProductQuery::default()).await?;
    assert_eq!(all.pagination.total, 2);

    let searched = product_service::list_products(
        &state,
        ProductQuery {
            search: Some("plain".into()),
            ..Default::default()
        },
    )
    .await?;
    assert_eq!(searched.products.len(), 1);
    assert_eq!(searched.products[0].name, "Plain Band");

    let pricey = product_service::list_products(
        &state,
        ProductQuery {
            min_price: Some(60),
            ..Default::default()
        },
    )
    .await?;
    assert_eq!(pricey.products.len(), 1);
    assert_eq!(pricey.products[0].final_price, 100);

    let in_category = product_service::list_products(
        &state,
        ProductQuery {
            category_id: Some(category_id),
            ..Default::default()
        },
    )
    .await?;
    assert_eq!(in_category.products.len(), 2);
    assert!(
        in_category
            .products
            .iter()
            .all(|p| p.category.as_ref().is_some_and(|c| c.slug == "rings"))
    );

    let featured = product_service::list_products(
        &state,
        ProductQuery {
            featured: Some(true),
            ..Default::default()
        },
    )
    .await?;
    assert!(featured.products.is_empty());

    let customer_id = create_user(&state, "Jane", "jane@example.com", "customer").await?;
    let admin_id = create_user(&state, "Root", "root@example.com", "admin").await?;
    let other_id = create_user(&state, "Mallory", "mallory@example.com", "customer").await?;

    let customer = AuthUser {
        user_id: customer_id,
        role: "customer".into(),
    };
    let admin = AuthUser {
        user_id: admin_id,
        role: "admin".into(),
    };
    let other = AuthUser {
        user_id: other_id,
        role: "customer".into(),
    };

    // Adding the same product twice merges into one row with summed quantity.
    cart_service::add_to_cart(
        &state,
        &customer,
        AddToCartRequest {
            product_id: product_a,
            quantity: 1,
        },
    )
    .await?;
    let merged = cart_service::add_to_cart(
        &state,
        &customer,
        AddToCartRequest {
            product_id: product_a,
            quantity: 1,
        },
    )
    .await?;
    assert_eq!(merged.quantity, 2);
    // Cart rows carry the full product, category included.
    assert!(
        merged
            .product
            .category
            .as_ref()
            .is_some_and(|c| c.slug == "rings")
    );

    let rows = CartItems::find()
        .filter(CartItemCol::UserId.eq(customer_id))
        .all(&state.orm)
        .await?;
    assert_eq!(rows.len(), 1, "duplicate add must not create a second row");

    cart_service::add_to_cart(
        &state,
        &customer,
        AddToCartRequest {
            product_id: product_b,
            quantity: 1,
        },
    )
    .await?;

    // Requesting more than the available stock is rejected up front.
    let oversized = cart_service::add_to_cart(
        &state,
        &customer,
        AddToCartRequest {
            product_id: product_b,
            quantity: 999,
        },
    )
    .await;
    assert!(matches!(oversized, Err(AppError::BadRequest(_))));

    // Another user's cart rows read as missing, not forbidden.
    let foreign_update = cart_service::update_cart_item(
        &state,
        &other,
        merged.id,
        UpdateCartItemRequest { quantity: 1 },
    )
    .await;
    assert!(matches!(foreign_update, Err(AppError::NotFound(_))));
    let foreign_remove = cart_service::remove_cart_item(&state, &other, merged.id).await;
    assert!(matches!(foreign_remove, Err(AppError::NotFound(_))));
    let rows = CartItems::find()
        .filter(CartItemCol::UserId.eq(customer_id))
        .all(&state.orm)
        .await?;
    assert_eq!(rows.len(), 2, "foreign calls must not touch the cart");

    // Checkout: total 2*100 + 1*50 = 250, stock decremented, cart cleared.
    let placed = order_service::checkout(
        &state,
        &customer,
        CheckoutRequest {
            shipping_address: "1 Long Enough Street, Springfield".into(),
        },
    )
    .await?;
    assert_eq!(placed.order.total_amount, 250);
    assert_eq!(placed.order.status, "Pending");
    assert_eq!(placed.items.len(), 2);

    let stock_a = Products::find_by_id(product_a)
        .one(&state.orm)
        .await?
        .unwrap()
        .stock;
    let stock_b = Products::find_by_id(product_b)
        .one(&state.orm)
        .await?
        .unwrap()
        .stock;
    assert_eq!(stock_a, 8);
    assert_eq!(stock_b, 4);

    let remaining = CartItems::find()
        .filter(CartItemCol::UserId.eq(customer_id))
        .all(&state.orm)
        .await?;
    assert!(remaining.is_empty(), "checkout must clear the cart");

    // A later price change never touches the snapshotted totals.
    product_service::update_product(
        &state,
        &admin,
        product_a,
        storefront_api::dto::products::UpdateProductRequest {
            name: None,
            description: None,
            price: Some(9999),
            discount: None,
            stock: None,
            category_id: None,
            sku: None,
            featured: None,
            images: None,
        },
    )
    .await?;
    let refetched = order_service::get_order(&state, &customer, placed.order.id).await?;
    assert_eq!(refetched.order.total_amount, 250);
    assert!(
        refetched
            .items
            .iter()
            .any(|i| i.product_id == product_a
                && i.price_at_purchase == 100
                && i.product.as_ref().is_some_and(|p| p.sku == "RING-A"))
    );

    // Checkout with an empty cart is rejected before any mutation.
    let empty = order_service::checkout(
        &state,
        &customer,
        CheckoutRequest {
            shipping_address: "1 Long Enough Street, Springfield".into(),
        },
    )
    .await;
    assert!(matches!(empty, Err(AppError::BadRequest(_))));

    // Order ownership returns 403, not a masked 404.
    let foreign = order_service::get_order(&state, &other, placed.order.id).await;
    assert!(matches!(foreign, Err(AppError::Forbidden)));
    // Admins may read any order.
    order_service::get_order(&state, &admin, placed.order.id).await?;

    // Admin status update accepts only the five lifecycle values.
    let updated = order_service::update_order_status(
        &state,
        &admin,
        placed.order.id,
        UpdateOrderStatusRequest {
            status: "Shipped".into(),
        },
    )
    .await?;
    assert_eq!(updated.status, "Shipped");

    let bad_status = order_service::update_order_status(
        &state,
        &admin,
        placed.order.id,
        UpdateOrderStatusRequest {
            status: "shipped".into(),
        },
    )
    .await;
    assert!(matches!(bad_status, Err(AppError::BadRequest(_))));

    let not_admin = order_service::update_order_status(
        &state,
        &customer,
        placed.order.id,
        UpdateOrderStatusRequest {
            status: "Delivered".into(),
        },
    )
    .await;
    assert!(matches!(not_admin, Err(AppError::Forbidden)));

    // Stock is validated again inside the checkout transaction: a cart row
    // planted past the add-time check must fail without side effects.
    CartItemActive {
        id: Set(Uuid::new_v4()),
        user_id: Set(other_id),
        product_id: Set(product_b),
        quantity: Set(50),
        created_at: NotSet,
    }
    .insert(&state.orm)
    .await?;
    let oversell = order_service::checkout(
        &state,
        &other,
        CheckoutRequest {
            shipping_address: "2 Long Enough Street, Springfield".into(),
        },
    )
    .await;
    assert!(matches!(oversell, Err(AppError::BadRequest(_))));
    let stock_b_after = Products::find_by_id(product_b)
        .one(&state.orm)
        .await?
        .unwrap()
        .stock;
    assert_eq!(stock_b_after, 4, "failed checkout must not consume stock");
    let planted = CartItems::find()
        .filter(CartItemCol::UserId.eq(other_id))
        .all(&state.orm)
        .await?;
    assert_eq!(planted.len(), 1, "failed checkout must not clear the cart");

    // Registration issues a token; a wrong password yields 401 and no token.
    let registered = auth_service::register_user(
        &state,
        RegisterRequest {
            name: "Test User".into(),
            email: "auth-test@example.com".into(),
            password: "password123".into(),
            phone: None,
        },
    )
    .await?;
    assert!(!registered.token.is_empty());

    let duplicate = auth_service::register_user(
        &state,
        RegisterRequest {
            name: "Test User".into(),
            email: "auth-test@example.com".into(),
            password: "password123".into(),
            phone: None,
        },
    )
    .await;
    assert!(matches!(duplicate, Err(AppError::BadRequest(_))));

    let wrong = auth_service::login_user(
        &state,
        LoginRequest {
            email: "auth-test@example.com".into(),
            password: "wrongpassword".into(),
        },
    )
    .await;
    assert!(matches!(wrong, Err(AppError::Unauthorized(_))));

    let ok = auth_service::login_user(
        &state,
        LoginRequest {
            email: "auth-test@example.com".into(),
            password: "password123".into(),
        },
    )
    .await?;
    assert!(!ok.token.is_empty());
    assert_eq!(ok.user.email, "auth-test@example.com");

    Ok(())
}

async fn setup_state(database_url: &str) -> anyhow::Result<AppState> {
    let orm = create_orm_conn(database_url).await?;
    run_migrations(&orm, "migrations").await?;

    // Clean tables between runs.
    let backend = orm.get_database_backend();
    orm.execute(Statement::from_string(
        backend,
        "TRUNCATE TABLE order_items, orders, cart_items, audit_logs, products, categories, users RESTART IDENTITY CASCADE",
    ))
    .await?;

    Ok(AppState {
        orm,
        jwt_secret: "test-secret".into(),
    })
}

async fn create_user(
    state: &AppState,
    name: &str,
    email: &str,
    role: &str,
) -> anyhow::Result<Uuid> {
    let user = UserActive {
        id: Set(Uuid::new_v4()),
        name: Set(name.to_string()),
        email: Set(email.to_string()),
        password_hash: Set("dummy".into()),
        role: Set(role.to_string()),
        phone: Set(None),
        created_at: NotSet,
    }
    .insert(&state.orm)
    .await?;

    Ok(user.id)
}

async fn create_category(state: &AppState, name: &str, slug: &str) -> anyhow::Result<Uuid> {
    let category = CategoryActive {
        id: Set(Uuid::new_v4()),
        name: Set(name.to_string()),
        slug: Set(slug.to_string()),
        created_at: NotSet,
    }
    .insert(&state.orm)
    .await?;

    Ok(category.id)
}

async fn create_product(
    state: &AppState,
    name: &str,
    category_id: Uuid,
    price: i64,
    discount: i32,
    stock: i32,
    sku: &str,
) -> anyhow::Result<Uuid> {
    let product = ProductActive {
        id: Set(Uuid::new_v4()),
        name: Set(name.to_string()),
        description: Set(format!("{name} for integration testing")),
        price: Set(price),
        discount: Set(discount),
        final_price: Set(product_service::compute_final_price(price, discount)),
        stock: Set(stock),
        category_id: Set(category_id),
        sku: Set(sku.to_string()),
        featured: Set(false),
        images: Set(serde_json::json!([])),
        created_at: NotSet,
    }
    .insert(&state.orm)
    .await?;

    Ok(product.id)
}
