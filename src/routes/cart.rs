use axum::{
    Json, Router,
    extract::{Path, State},
    routing::{get, patch, post},
};
use serde_json::Value;
use uuid::Uuid;

use crate::{
    audit::log_audit,
    dto::cart::{AddToCartRequest, UpdateCartItemRequest},
    error::AppResult,
    models::CartWithTotal,
    response::ApiResponse,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(add_to_cart))
        .route("/users/{user_id}", get(get_active_cart))
        .route(
            "/items/{cart_item_id}",
            patch(update_cart_item).delete(remove_cart_item),
        )
}

#[utoipa::path(
    get,
    path = "/api/cart/users/{user_id}",
    params(
        ("user_id" = Uuid, Path, description = "Owner of the cart")
    ),
    responses(
        (status = 200, description = "Active cart with total, or null data when the user has none", body = ApiResponse<CartWithTotal>)
    ),
    tag = "Cart"
)]
pub async fn get_active_cart(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<CartWithTotal>>> {
    let response = match state.carts.get_active_cart(user_id).await? {
        Some(cart) => ApiResponse::success("OK", cart),
        None => ApiResponse::empty("No active cart"),
    };
    Ok(Json(response))
}

#[utoipa::path(
    post,
    path = "/api/cart",
    request_body = AddToCartRequest,
    responses(
        (status = 200, description = "Item added; returns the cart with total", body = ApiResponse<CartWithTotal>),
        (status = 400, description = "Bad request"),
        (status = 404, description = "Price not found for selected size"),
    ),
    tag = "Cart"
)]
pub async fn add_to_cart(
    State(state): State<AppState>,
    Json(payload): Json<AddToCartRequest>,
) -> AppResult<Json<ApiResponse<CartWithTotal>>> {
    let metadata = serde_json::json!({
        "product_id": payload.product_id,
        "size": payload.size,
        "quantity": payload.quantity,
    });
    let cart = state.carts.add_to_cart(payload).await?;

    audit(&state, &cart, "cart_update", metadata).await;
    Ok(Json(ApiResponse::success("OK", cart)))
}

#[utoipa::path(
    patch,
    path = "/api/cart/items/{cart_item_id}",
    params(
        ("cart_item_id" = Uuid, Path, description = "Cart item ID")
    ),
    request_body = UpdateCartItemRequest,
    responses(
        (status = 200, description = "Quantity set; returns the cart with total", body = ApiResponse<CartWithTotal>),
        (status = 400, description = "Bad request"),
        (status = 404, description = "Cart item not found"),
    ),
    tag = "Cart"
)]
pub async fn update_cart_item(
    State(state): State<AppState>,
    Path(cart_item_id): Path<Uuid>,
    Json(payload): Json<UpdateCartItemRequest>,
) -> AppResult<Json<ApiResponse<CartWithTotal>>> {
    let cart = state
        .carts
        .update_item_quantity(cart_item_id, payload.quantity)
        .await?;

    let metadata = serde_json::json!({
        "cart_item_id": cart_item_id,
        "quantity": payload.quantity,
    });
    audit(&state, &cart, "cart_item_quantity", metadata).await;
    Ok(Json(ApiResponse::success("OK", cart)))
}

#[utoipa::path(
    delete,
    path = "/api/cart/items/{cart_item_id}",
    params(
        ("cart_item_id" = Uuid, Path, description = "Cart item ID")
    ),
    responses(
        (status = 200, description = "Item removed; returns the cart with total", body = ApiResponse<CartWithTotal>),
        (status = 404, description = "Cart item not found"),
    ),
    tag = "Cart"
)]
pub async fn remove_cart_item(
    State(state): State<AppState>,
    Path(cart_item_id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<CartWithTotal>>> {
    let cart = state.carts.remove_cart_item(cart_item_id).await?;

    let metadata = serde_json::json!({ "cart_item_id": cart_item_id });
    audit(&state, &cart, "cart_remove", metadata).await;
    Ok(Json(ApiResponse::success("Removed from cart", cart)))
}

async fn audit(state: &AppState, cart: &CartWithTotal, action: &str, metadata: Value) {
    if let Err(err) = log_audit(
        &state.orm,
        Some(cart.cart().user_id),
        action,
        Some("cart_items"),
        Some(metadata),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }
}
