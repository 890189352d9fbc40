use uuid::Uuid;

use crate::{
    dto::cart::AddToCartRequest,
    error::{AppError, AppResult},
    models::{CartWithTotal, LoadedCart, NewCartItem},
    store::{CartStore, StoreError, Transaction, TransactionalStore},
};

const PRICE_NOT_FOUND: &str = "Price not found for selected size";
const CART_ITEM_NOT_FOUND: &str = "Cart item not found";
const UPDATE_FAILED: &str = "Failed to update cart";

/// Cart operations for one user at a time: find the active cart, add lines,
/// change quantities and remove lines. Every result carries the cart total.
#[derive(Debug, Clone)]
pub struct CartManager<S> {
    store: S,
}

impl<S> CartManager<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }
}

impl<S> CartManager<S>
where
    S: TransactionalStore,
{
    /// Returns `None` when the user has no open cart.
    pub async fn get_active_cart(&self, user_id: Uuid) -> AppResult<Option<CartWithTotal>> {
        let cart = self.store.find_active_cart(user_id).await?;
        Ok(cart.map(LoadedCart::with_total))
    }

    /// Adds `quantity` units of (product, size) to the user's active cart,
    /// opening a cart first if needed. Repeated adds accumulate quantity on
    /// the existing line and keep the price captured by the first add.
    pub async fn add_to_cart(&self, input: AddToCartRequest) -> AppResult<CartWithTotal> {
        ensure_positive(input.quantity)?;
        if input.size.trim().is_empty() {
            return Err(AppError::BadRequest("size must not be empty".to_string()));
        }

        let tx = self.store.begin().await?;
        let cart_id = match merge_into_active_cart(&tx, &input).await {
            Ok(cart_id) => cart_id,
            Err(err) => {
                if let Err(rollback_err) = tx.rollback().await {
                    tracing::warn!(error = %rollback_err, "cart rollback failed");
                }
                return Err(err);
            }
        };
        tx.commit().await?;

        self.reload(cart_id).await
    }

    pub async fn update_item_quantity(
        &self,
        cart_item_id: Uuid,
        quantity: i32,
    ) -> AppResult<CartWithTotal> {
        ensure_positive(quantity)?;

        let item = self
            .store
            .set_cart_item_quantity(cart_item_id, quantity)
            .await
            .map_err(missing_item)?;
        tracing::debug!(cart_item_id = %item.id, quantity, "cart item quantity set");

        self.reload(item.cart_id).await
    }

    /// Deletes one line. An emptied cart stays active with a zero total.
    pub async fn remove_cart_item(&self, cart_item_id: Uuid) -> AppResult<CartWithTotal> {
        let removed = self
            .store
            .delete_cart_item(cart_item_id)
            .await
            .map_err(missing_item)?;
        tracing::debug!(
            cart_item_id = %removed.item.id,
            cart_id = %removed.cart.id,
            "cart item removed"
        );

        self.reload(removed.cart.id).await
    }

    async fn reload(&self, cart_id: Uuid) -> AppResult<CartWithTotal> {
        self.store
            .find_cart_by_id(cart_id)
            .await?
            .map(LoadedCart::with_total)
            .ok_or_else(|| AppError::not_found("Cart not found"))
    }
}

/// Resolves the cart and price, then merges the line into the cart. Returns
/// the id of the cart that was written to.
async fn merge_into_active_cart<T>(tx: &T, input: &AddToCartRequest) -> AppResult<Uuid>
where
    T: CartStore,
{
    // the store query already excludes ordered carts; re-checked in case it ever does not
    let cart = match tx.find_active_cart(input.user_id).await? {
        Some(cart) if !cart.cart.is_ordered => cart,
        _ => {
            let cart = tx.create_cart(input.user_id).await?;
            tracing::info!(user_id = %input.user_id, cart_id = %cart.id, "active cart created");
            LoadedCart::empty(cart)
        }
    };

    let price = tx
        .find_price(input.product_id, &input.size)
        .await?
        .ok_or_else(|| AppError::not_found(PRICE_NOT_FOUND))?;

    match cart.find_item(input.product_id, &input.size) {
        Some(existing) => {
            let item = tx
                .increment_cart_item_quantity(existing.id, input.quantity)
                .await
                .map_err(|err| AppError::operation_failed(UPDATE_FAILED, err))?;
            tracing::debug!(cart_item_id = %item.id, quantity = item.quantity, "cart item merged");
        }
        None => {
            let item = tx
                .create_cart_item(NewCartItem {
                    cart_id: cart.cart.id,
                    product_id: input.product_id,
                    size: input.size.clone(),
                    price: price.value,
                    quantity: input.quantity,
                })
                .await
                .map_err(|err| AppError::operation_failed(UPDATE_FAILED, err))?;
            tracing::debug!(cart_item_id = %item.id, price = item.price, "cart item inserted");
        }
    }

    Ok(cart.cart.id)
}

fn ensure_positive(quantity: i32) -> AppResult<()> {
    if quantity <= 0 {
        return Err(AppError::BadRequest(
            "quantity must be greater than 0".to_string(),
        ));
    }
    Ok(())
}

fn missing_item(err: StoreError) -> AppError {
    match err {
        StoreError::RowNotFound {
            entity: "cart item",
            ..
        } => AppError::not_found(CART_ITEM_NOT_FOUND),
        other => other.into(),
    }
}
