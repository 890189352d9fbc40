//! Persistence boundary for carts, cart items and prices.
//!
//! [`CartStore`] is the contract the cart manager is written against.
//! [`SeaOrmCartStore`] backs it with PostgreSQL and [`MemoryCartStore`] keeps
//! everything in process.

use std::future::Future;

use thiserror::Error;
use uuid::Uuid;

use crate::models::{Cart, CartItem, LoadedCart, NewCartItem, Price, RemovedCartItem};

pub mod memory;
pub mod postgres;

pub use memory::{MemoryCartStore, MemoryTransaction};
pub use postgres::SeaOrmCartStore;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("{entity} {id} not found")]
    RowNotFound { entity: &'static str, id: Uuid },

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("quantity of cart item {id} out of range")]
    QuantityOutOfRange { id: Uuid },

    #[error("ORM error")]
    Orm(#[from] sea_orm::DbErr),
}

pub type StoreResult<T> = Result<T, StoreError>;

pub trait CartStore: Send + Sync {
    /// The user's cart with `is_ordered = false`, items and products loaded.
    fn find_active_cart(
        &self,
        user_id: Uuid,
    ) -> impl Future<Output = StoreResult<Option<LoadedCart>>> + Send;

    fn create_cart(&self, user_id: Uuid) -> impl Future<Output = StoreResult<Cart>> + Send;

    fn find_cart_by_id(
        &self,
        cart_id: Uuid,
    ) -> impl Future<Output = StoreResult<Option<LoadedCart>>> + Send;

    fn find_price(
        &self,
        product_id: Uuid,
        size: &str,
    ) -> impl Future<Output = StoreResult<Option<Price>>> + Send;

    fn create_cart_item(
        &self,
        item: NewCartItem,
    ) -> impl Future<Output = StoreResult<CartItem>> + Send;

    /// Adds `delta` to the stored quantity; fails with `RowNotFound` for an unknown id.
    fn increment_cart_item_quantity(
        &self,
        item_id: Uuid,
        delta: i32,
    ) -> impl Future<Output = StoreResult<CartItem>> + Send;

    /// Overwrites the stored quantity; fails with `RowNotFound` for an unknown id.
    fn set_cart_item_quantity(
        &self,
        item_id: Uuid,
        quantity: i32,
    ) -> impl Future<Output = StoreResult<CartItem>> + Send;

    /// Deletes the item and returns it with its parent cart; fails with
    /// `RowNotFound` for an unknown id.
    fn delete_cart_item(
        &self,
        item_id: Uuid,
    ) -> impl Future<Output = StoreResult<RemovedCartItem>> + Send;
}

/// An open unit of work. Dropping it without committing discards its writes.
pub trait Transaction: CartStore + Sized {
    fn commit(self) -> impl Future<Output = StoreResult<()>> + Send;

    fn rollback(self) -> impl Future<Output = StoreResult<()>> + Send;
}

pub trait TransactionalStore: CartStore {
    type Tx: Transaction;

    fn begin(&self) -> impl Future<Output = StoreResult<Self::Tx>> + Send;
}
