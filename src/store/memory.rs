use std::{collections::HashMap, sync::Arc};

use chrono::Utc;
use tokio::sync::{Mutex, OwnedMutexGuard};
use uuid::Uuid;

use crate::models::{
    Cart, CartItem, CartItemWithProduct, LoadedCart, NewCartItem, Price, Product, RemovedCartItem,
};

use super::{CartStore, StoreError, StoreResult, Transaction, TransactionalStore};

#[derive(Debug, Default, Clone)]
struct MemoryState {
    products: HashMap<Uuid, Product>,
    prices: Vec<Price>,
    carts: Vec<Cart>,
    // insertion order doubles as the item display order
    items: Vec<CartItem>,
}

impl MemoryState {
    fn load(&self, cart: &Cart) -> StoreResult<LoadedCart> {
        let mut items = Vec::new();
        for item in self.items.iter().filter(|item| item.cart_id == cart.id) {
            let product = self
                .products
                .get(&item.product_id)
                .cloned()
                .ok_or(StoreError::RowNotFound {
                    entity: "product",
                    id: item.product_id,
                })?;
            items.push(CartItemWithProduct {
                item: item.clone(),
                product,
            });
        }

        Ok(LoadedCart {
            cart: cart.clone(),
            items,
        })
    }

    fn item_mut(&mut self, item_id: Uuid) -> StoreResult<&mut CartItem> {
        self.items
            .iter_mut()
            .find(|item| item.id == item_id)
            .ok_or(StoreError::RowNotFound {
                entity: "cart item",
                id: item_id,
            })
    }
}

/// In-process [`CartStore`] holding the same tables and constraints as the
/// PostgreSQL schema. Clones share state.
#[derive(Debug, Default, Clone)]
pub struct MemoryCartStore {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryCartStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert_product(&self, name: &str, description: Option<&str>) -> Product {
        let product = Product {
            id: Uuid::new_v4(),
            name: name.to_string(),
            description: description.map(str::to_string),
            created_at: Utc::now(),
        };
        let mut state = self.state.lock().await;
        state.products.insert(product.id, product.clone());
        product
    }

    /// Inserts or replaces the price of `product_id` in `size`.
    pub async fn upsert_price(&self, product_id: Uuid, size: &str, value: i64) -> StoreResult<Price> {
        let mut state = self.state.lock().await;
        if !state.products.contains_key(&product_id) {
            return Err(StoreError::RowNotFound {
                entity: "product",
                id: product_id,
            });
        }

        if let Some(existing) = state
            .prices
            .iter_mut()
            .find(|price| price.product_id == product_id && price.size == size)
        {
            existing.value = value;
            return Ok(existing.clone());
        }

        let price = Price {
            id: Uuid::new_v4(),
            product_id,
            size: size.to_string(),
            value,
        };
        state.prices.push(price.clone());
        Ok(price)
    }

    /// Closes a cart the way checkout does, so the owner's next add opens a new one.
    pub async fn mark_ordered(&self, cart_id: Uuid) -> StoreResult<Cart> {
        let mut state = self.state.lock().await;
        let cart = state
            .carts
            .iter_mut()
            .find(|cart| cart.id == cart_id)
            .ok_or(StoreError::RowNotFound {
                entity: "cart",
                id: cart_id,
            })?;
        cart.is_ordered = true;
        Ok(cart.clone())
    }

    pub async fn cart_count(&self, user_id: Uuid) -> usize {
        let state = self.state.lock().await;
        state.carts.iter().filter(|cart| cart.user_id == user_id).count()
    }
}

impl CartStore for MemoryCartStore {
    async fn find_active_cart(&self, user_id: Uuid) -> StoreResult<Option<LoadedCart>> {
        let state = self.state.lock().await;
        state
            .carts
            .iter()
            .find(|cart| cart.user_id == user_id && !cart.is_ordered)
            .map(|cart| state.load(cart))
            .transpose()
    }

    async fn create_cart(&self, user_id: Uuid) -> StoreResult<Cart> {
        let mut state = self.state.lock().await;
        if state
            .carts
            .iter()
            .any(|cart| cart.user_id == user_id && !cart.is_ordered)
        {
            return Err(StoreError::Conflict(format!(
                "user {user_id} already has an active cart"
            )));
        }

        let cart = Cart {
            id: Uuid::new_v4(),
            user_id,
            is_ordered: false,
            created_at: Utc::now(),
        };
        state.carts.push(cart.clone());
        Ok(cart)
    }

    async fn find_cart_by_id(&self, cart_id: Uuid) -> StoreResult<Option<LoadedCart>> {
        let state = self.state.lock().await;
        state
            .carts
            .iter()
            .find(|cart| cart.id == cart_id)
            .map(|cart| state.load(cart))
            .transpose()
    }

    async fn find_price(&self, product_id: Uuid, size: &str) -> StoreResult<Option<Price>> {
        let state = self.state.lock().await;
        Ok(state
            .prices
            .iter()
            .find(|price| price.product_id == product_id && price.size == size)
            .cloned())
    }

    async fn create_cart_item(&self, item: NewCartItem) -> StoreResult<CartItem> {
        let mut state = self.state.lock().await;
        if !state.carts.iter().any(|cart| cart.id == item.cart_id) {
            return Err(StoreError::RowNotFound {
                entity: "cart",
                id: item.cart_id,
            });
        }
        if !state.products.contains_key(&item.product_id) {
            return Err(StoreError::RowNotFound {
                entity: "product",
                id: item.product_id,
            });
        }
        if state.items.iter().any(|existing| {
            existing.cart_id == item.cart_id
                && existing.product_id == item.product_id
                && existing.size == item.size
        }) {
            return Err(StoreError::Conflict(format!(
                "cart {} already holds product {} in size {}",
                item.cart_id, item.product_id, item.size
            )));
        }

        let item = CartItem {
            id: Uuid::new_v4(),
            cart_id: item.cart_id,
            product_id: item.product_id,
            size: item.size,
            price: item.price,
            quantity: item.quantity,
            created_at: Utc::now(),
        };
        state.items.push(item.clone());
        Ok(item)
    }

    async fn increment_cart_item_quantity(&self, item_id: Uuid, delta: i32) -> StoreResult<CartItem> {
        let mut state = self.state.lock().await;
        let item = state.item_mut(item_id)?;
        item.quantity = item
            .quantity
            .checked_add(delta)
            .ok_or(StoreError::QuantityOutOfRange { id: item_id })?;
        Ok(item.clone())
    }

    async fn set_cart_item_quantity(&self, item_id: Uuid, quantity: i32) -> StoreResult<CartItem> {
        let mut state = self.state.lock().await;
        let item = state.item_mut(item_id)?;
        item.quantity = quantity;
        Ok(item.clone())
    }

    async fn delete_cart_item(&self, item_id: Uuid) -> StoreResult<RemovedCartItem> {
        let mut state = self.state.lock().await;
        let position = state
            .items
            .iter()
            .position(|item| item.id == item_id)
            .ok_or(StoreError::RowNotFound {
                entity: "cart item",
                id: item_id,
            })?;
        let item = state.items.remove(position);
        let cart = state
            .carts
            .iter()
            .find(|cart| cart.id == item.cart_id)
            .cloned()
            .ok_or(StoreError::RowNotFound {
                entity: "cart",
                id: item.cart_id,
            })?;

        Ok(RemovedCartItem { item, cart })
    }
}

/// Works on a private snapshot of the store while holding the store's lock,
/// so memory transactions and plain store calls run one at a time. `commit`
/// publishes the snapshot; dropping or rolling back discards it.
#[derive(Debug)]
pub struct MemoryTransaction {
    parent: OwnedMutexGuard<MemoryState>,
    working: MemoryCartStore,
}

impl TransactionalStore for MemoryCartStore {
    type Tx = MemoryTransaction;

    async fn begin(&self) -> StoreResult<Self::Tx> {
        let parent = Arc::clone(&self.state).lock_owned().await;
        let snapshot = (*parent).clone();
        Ok(MemoryTransaction {
            parent,
            working: MemoryCartStore {
                state: Arc::new(Mutex::new(snapshot)),
            },
        })
    }
}

impl Transaction for MemoryTransaction {
    async fn commit(mut self) -> StoreResult<()> {
        let staged = self.working.state.lock().await.clone();
        *self.parent = staged;
        Ok(())
    }

    async fn rollback(self) -> StoreResult<()> {
        Ok(())
    }
}

impl CartStore for MemoryTransaction {
    async fn find_active_cart(&self, user_id: Uuid) -> StoreResult<Option<LoadedCart>> {
        self.working.find_active_cart(user_id).await
    }

    async fn create_cart(&self, user_id: Uuid) -> StoreResult<Cart> {
        self.working.create_cart(user_id).await
    }

    async fn find_cart_by_id(&self, cart_id: Uuid) -> StoreResult<Option<LoadedCart>> {
        self.working.find_cart_by_id(cart_id).await
    }

    async fn find_price(&self, product_id: Uuid, size: &str) -> StoreResult<Option<Price>> {
        self.working.find_price(product_id, size).await
    }

    async fn create_cart_item(&self, item: NewCartItem) -> StoreResult<CartItem> {
        self.working.create_cart_item(item).await
    }

    async fn increment_cart_item_quantity(&self, item_id: Uuid, delta: i32) -> StoreResult<CartItem> {
        self.working.increment_cart_item_quantity(item_id, delta).await
    }

    async fn set_cart_item_quantity(&self, item_id: Uuid, quantity: i32) -> StoreResult<CartItem> {
        self.working.set_cart_item_quantity(item_id, quantity).await
    }

    async fn delete_cart_item(&self, item_id: Uuid) -> StoreResult<RemovedCartItem> {
        self.working.delete_cart_item(item_id).await
    }
}
