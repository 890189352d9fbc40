use chrono::Utc;
use sea_orm::ActiveValue::NotSet;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, DatabaseTransaction, DbErr,
    EntityTrait, QueryFilter, QueryOrder, Set, SqlErr, TransactionTrait,
};
use uuid::Uuid;

use crate::{
    entity::{
        cart_items::{
            ActiveModel as CartItemActive, Column as CartItemCol, Entity as CartItems,
            Model as CartItemModel,
        },
        carts::{ActiveModel as CartActive, Column as CartCol, Entity as Carts, Model as CartModel},
        prices::{Column as PriceCol, Entity as Prices, Model as PriceModel},
        products::{Entity as Products, Model as ProductModel},
    },
    models::{
        Cart, CartItem, CartItemWithProduct, LoadedCart, NewCartItem, Price, Product,
        RemovedCartItem,
    },
};

use super::{CartStore, StoreError, StoreResult, Transaction, TransactionalStore};

/// [`CartStore`] over a SeaORM connection. `C` is either the pooled
/// [`DatabaseConnection`] or a [`DatabaseTransaction`] opened from it.
#[derive(Clone)]
pub struct SeaOrmCartStore<C = DatabaseConnection> {
    conn: C,
}

impl<C> SeaOrmCartStore<C> {
    pub fn new(conn: C) -> Self {
        Self { conn }
    }

    pub fn connection(&self) -> &C {
        &self.conn
    }
}

impl<C> SeaOrmCartStore<C>
where
    C: ConnectionTrait + Send + Sync,
{
    async fn load(&self, cart: CartModel) -> StoreResult<LoadedCart> {
        let rows = CartItems::find()
            .filter(CartItemCol::CartId.eq(cart.id))
            .order_by_asc(CartItemCol::CreatedAt)
            .find_also_related(Products)
            .all(&self.conn)
            .await?;

        let mut items = Vec::with_capacity(rows.len());
        for (item, product) in rows {
            let product = product.ok_or(StoreError::RowNotFound {
                entity: "product",
                id: item.product_id,
            })?;
            items.push(CartItemWithProduct {
                item: cart_item_from_entity(item),
                product: product_from_entity(product),
            });
        }

        Ok(LoadedCart {
            cart: cart_from_entity(cart),
            items,
        })
    }

    async fn fetch_item(&self, item_id: Uuid) -> StoreResult<CartItem> {
        CartItems::find_by_id(item_id)
            .one(&self.conn)
            .await?
            .map(cart_item_from_entity)
            .ok_or(StoreError::RowNotFound {
                entity: "cart item",
                id: item_id,
            })
    }
}

impl<C> CartStore for SeaOrmCartStore<C>
where
    C: ConnectionTrait + Send + Sync,
{
    async fn find_active_cart(&self, user_id: Uuid) -> StoreResult<Option<LoadedCart>> {
        let cart = Carts::find()
            .filter(CartCol::UserId.eq(user_id))
            .filter(CartCol::IsOrdered.eq(false))
            .order_by_desc(CartCol::CreatedAt)
            .one(&self.conn)
            .await?;

        match cart {
            Some(cart) => self.load(cart).await.map(Some),
            None => Ok(None),
        }
    }

    async fn create_cart(&self, user_id: Uuid) -> StoreResult<Cart> {
        let cart = CartActive {
            id: Set(Uuid::new_v4()),
            user_id: Set(user_id),
            is_ordered: Set(false),
            created_at: NotSet,
        }
        .insert(&self.conn)
        .await
        .map_err(conflict_or_orm)?;

        Ok(cart_from_entity(cart))
    }

    async fn find_cart_by_id(&self, cart_id: Uuid) -> StoreResult<Option<LoadedCart>> {
        match Carts::find_by_id(cart_id).one(&self.conn).await? {
            Some(cart) => self.load(cart).await.map(Some),
            None => Ok(None),
        }
    }

    async fn find_price(&self, product_id: Uuid, size: &str) -> StoreResult<Option<Price>> {
        let price = Prices::find()
            .filter(PriceCol::ProductId.eq(product_id))
            .filter(PriceCol::Size.eq(size))
            .one(&self.conn)
            .await?;

        Ok(price.map(price_from_entity))
    }

    async fn create_cart_item(&self, item: NewCartItem) -> StoreResult<CartItem> {
        let item = CartItemActive {
            id: Set(Uuid::new_v4()),
            cart_id: Set(item.cart_id),
            product_id: Set(item.product_id),
            size: Set(item.size),
            price: Set(item.price),
            quantity: Set(item.quantity),
            created_at: NotSet,
        }
        .insert(&self.conn)
        .await
        .map_err(conflict_or_orm)?;

        Ok(cart_item_from_entity(item))
    }

    async fn increment_cart_item_quantity(&self, item_id: Uuid, delta: i32) -> StoreResult<CartItem> {
        let result = CartItems::update_many()
            .col_expr(
                CartItemCol::Quantity,
                Expr::col(CartItemCol::Quantity).add(delta),
            )
            .filter(CartItemCol::Id.eq(item_id))
            .exec(&self.conn)
            .await?;

        if result.rows_affected == 0 {
            return Err(StoreError::RowNotFound {
                entity: "cart item",
                id: item_id,
            });
        }

        self.fetch_item(item_id).await
    }

    async fn set_cart_item_quantity(&self, item_id: Uuid, quantity: i32) -> StoreResult<CartItem> {
        let result = CartItems::update_many()
            .col_expr(CartItemCol::Quantity, Expr::value(quantity))
            .filter(CartItemCol::Id.eq(item_id))
            .exec(&self.conn)
            .await?;

        if result.rows_affected == 0 {
            return Err(StoreError::RowNotFound {
                entity: "cart item",
                id: item_id,
            });
        }

        self.fetch_item(item_id).await
    }

    async fn delete_cart_item(&self, item_id: Uuid) -> StoreResult<RemovedCartItem> {
        let not_found = StoreError::RowNotFound {
            entity: "cart item",
            id: item_id,
        };

        let Some((item, cart)) = CartItems::find_by_id(item_id)
            .find_also_related(Carts)
            .one(&self.conn)
            .await?
        else {
            return Err(not_found);
        };
        let cart = cart.ok_or(StoreError::RowNotFound {
            entity: "cart",
            id: item.cart_id,
        })?;

        let result = CartItems::delete_by_id(item_id).exec(&self.conn).await?;
        if result.rows_affected == 0 {
            return Err(not_found);
        }

        Ok(RemovedCartItem {
            item: cart_item_from_entity(item),
            cart: cart_from_entity(cart),
        })
    }
}

impl TransactionalStore for SeaOrmCartStore<DatabaseConnection> {
    type Tx = SeaOrmCartStore<DatabaseTransaction>;

    async fn begin(&self) -> StoreResult<Self::Tx> {
        let txn = self.conn.begin().await?;
        Ok(SeaOrmCartStore::new(txn))
    }
}

impl Transaction for SeaOrmCartStore<DatabaseTransaction> {
    async fn commit(self) -> StoreResult<()> {
        self.conn.commit().await?;
        Ok(())
    }

    async fn rollback(self) -> StoreResult<()> {
        self.conn.rollback().await?;
        Ok(())
    }
}

fn conflict_or_orm(err: DbErr) -> StoreError {
    match err.sql_err() {
        Some(SqlErr::UniqueConstraintViolation(detail)) => StoreError::Conflict(detail),
        _ => StoreError::Orm(err),
    }
}

fn cart_from_entity(model: CartModel) -> Cart {
    Cart {
        id: model.id,
        user_id: model.user_id,
        is_ordered: model.is_ordered,
        created_at: model.created_at.with_timezone(&Utc),
    }
}

fn cart_item_from_entity(model: CartItemModel) -> CartItem {
    CartItem {
        id: model.id,
        cart_id: model.cart_id,
        product_id: model.product_id,
        size: model.size,
        price: model.price,
        quantity: model.quantity,
        created_at: model.created_at.with_timezone(&Utc),
    }
}

fn product_from_entity(model: ProductModel) -> Product {
    Product {
        id: model.id,
        name: model.name,
        description: model.description,
        created_at: model.created_at.with_timezone(&Utc),
    }
}

fn price_from_entity(model: PriceModel) -> Price {
    Price {
        id: model.id,
        product_id: model.product_id,
        size: model.size,
        value: model.value,
    }
}
