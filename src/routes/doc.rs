use utoipa::{
    Modify, OpenApi,
    openapi::{
        self,
        OpenApi as OpenApiSpec,
        security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    },
};
use utoipa_scalar::{Scalar, Servable};

use crate::{
    dto::{
        auth::{AuthResponse, LoginRequest, RegisterRequest},
        cart::{AddToCartRequest, CartItemResponse, UpdateCartItemRequest},
        categories::{CategoryRequest, CategoryWithProducts},
        orders::{CheckoutRequest, OrderPage, OrderWithItems, UpdateOrderStatusRequest},
        products::{CreateProductRequest, ProductPage, UpdateProductRequest},
    },
    models::{Category, Order, OrderItem, Product, User},
    response::PageMeta,
    routes::{auth, cart, categories, health, orders, products},
};

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        health::health_check,
        auth::register,
        auth::login,
        products::list_products,
        products::get_product,
        products::create_product,
        products::update_product,
        products::delete_product,
        categories::list_categories,
        categories::get_category,
        categories::create_category,
        categories::update_category,
        categories::delete_category,
        cart::list_cart,
        cart::add_to_cart,
        cart::update_cart_item,
        cart::remove_cart_item,
        orders::checkout,
        orders::list_my_orders,
        orders::list_all_orders,
        orders::get_order,
        orders::update_order_status,
    ),
    components(
        schemas(
            User,
            Category,
            Product,
            Order,
            OrderItem,
            RegisterRequest,
            LoginRequest,
            AuthResponse,
            CategoryRequest,
            CategoryWithProducts,
            CreateProductRequest,
            UpdateProductRequest,
            ProductPage,
            AddToCartRequest,
            UpdateCartItemRequest,
            CartItemResponse,
            CheckoutRequest,
            UpdateOrderStatusRequest,
            OrderWithItems,
            OrderPage,
            PageMeta,
        )
    ),
    security(
        ("bearer_auth" = [])
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Health", description = "Health check endpoint"),
        (name = "Auth", description = "Authentication endpoints"),
        (name = "Products", description = "Product catalog endpoints"),
        (name = "Categories", description = "Category endpoints"),
        (name = "Cart", description = "Cart endpoints"),
        (name = "Orders", description = "Order and checkout endpoints"),
    )
)]
pub struct ApiDoc;

pub fn scalar_docs() -> Scalar<OpenApiSpec> {
    Scalar::with_url("/docs", ApiDoc::openapi())
}
