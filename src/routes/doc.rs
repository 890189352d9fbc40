use utoipa::{OpenApi, openapi::OpenApi as OpenApiSpec};
use utoipa_scalar::{Scalar, Servable};

use crate::{
    dto::cart::{AddToCartRequest, UpdateCartItemRequest},
    models::{Cart, CartItem, CartItemWithProduct, CartWithTotal, LoadedCart, Price, Product},
    response::ApiResponse,
    routes::{cart, health},
};

#[derive(OpenApi)]
#[openapi(
    paths(
        health::health_check,
        cart::get_active_cart,
        cart::add_to_cart,
        cart::update_cart_item,
        cart::remove_cart_item
    ),
    components(
        schemas(
            Product,
            Price,
            Cart,
            CartItem,
            CartItemWithProduct,
            LoadedCart,
            CartWithTotal,
            AddToCartRequest,
            UpdateCartItemRequest,
            health::HealthData,
            ApiResponse<CartWithTotal>
        )
    ),
    tags(
        (name = "Health", description = "Health check endpoint"),
        (name = "Cart", description = "Cart endpoints"),
    )
)]
pub struct ApiDoc;

pub fn scalar_docs() -> Scalar<OpenApiSpec> {
    Scalar::with_url("/docs", ApiDoc::openapi())
}
