use std::error::Error as _;

use chrono::Utc;
use cart_service::{
    dto::cart::AddToCartRequest,
    error::AppError,
    models::{Cart, CartItem, LoadedCart, NewCartItem, Price, RemovedCartItem, cart_total},
    services::cart_service::CartManager,
    store::{
        CartStore, MemoryCartStore, MemoryTransaction, StoreError, StoreResult, Transaction,
        TransactionalStore,
    },
};
use uuid::Uuid;

struct Fixture {
    manager: CartManager<MemoryCartStore>,
    store: MemoryCartStore,
    product_id: Uuid,
}

async fn fixture() -> anyhow::Result<Fixture> {
    let store = MemoryCartStore::new();
    let product = store.insert_product("Hoodie", Some("Warm")).await;
    store.upsert_price(product.id, "M", 10).await?;
    store.upsert_price(product.id, "L", 12).await?;

    Ok(Fixture {
        manager: CartManager::new(store.clone()),
        store,
        product_id: product.id,
    })
}

fn add(user_id: Uuid, product_id: Uuid, size: &str, quantity: i32) -> AddToCartRequest {
    AddToCartRequest {
        user_id,
        product_id,
        size: size.to_string(),
        quantity,
    }
}

fn item(price: i64, quantity: i32) -> CartItem {
    CartItem {
        id: Uuid::new_v4(),
        cart_id: Uuid::new_v4(),
        product_id: Uuid::new_v4(),
        size: "M".into(),
        price,
        quantity,
        created_at: Utc::now(),
    }
}

#[test]
fn total_sums_price_times_quantity() {
    let items = vec![item(10, 2), item(250, 3), item(1, 1)];
    assert_eq!(cart_total(&items), 20 + 750 + 1);
    assert_eq!(cart_total(std::iter::empty::<&CartItem>()), 0);
}

#[tokio::test]
async fn user_without_cart_gets_none() -> anyhow::Result<()> {
    let fx = fixture().await?;
    assert!(fx.manager.get_active_cart(Uuid::new_v4()).await?.is_none());
    Ok(())
}

#[tokio::test]
async fn add_merge_then_remove_scenario() -> anyhow::Result<()> {
    let fx = fixture().await?;
    let user = Uuid::new_v4();

    let cart = fx.manager.add_to_cart(add(user, fx.product_id, "M", 2)).await?;
    assert_eq!(cart.cart().user_id, user);
    assert!(!cart.cart().is_ordered);
    assert_eq!(cart.items().len(), 1);
    assert_eq!(cart.items()[0].item.quantity, 2);
    assert_eq!(cart.items()[0].item.price, 10);
    assert_eq!(cart.items()[0].product.name, "Hoodie");
    assert_eq!(cart.total, 20);

    let merged = fx.manager.add_to_cart(add(user, fx.product_id, "M", 3)).await?;
    assert_eq!(merged.cart().id, cart.cart().id);
    assert_eq!(merged.items().len(), 1);
    assert_eq!(merged.items()[0].item.id, cart.items()[0].item.id);
    assert_eq!(merged.items()[0].item.quantity, 5);
    assert_eq!(merged.total, 50);

    let active = fx.manager.get_active_cart(user).await?.expect("active cart");
    assert_eq!(active, merged);

    let emptied = fx
        .manager
        .remove_cart_item(merged.items()[0].item.id)
        .await?;
    assert_eq!(emptied.cart().id, cart.cart().id);
    assert!(emptied.items().is_empty());
    assert_eq!(emptied.total, 0);

    let still_active = fx.manager.get_active_cart(user).await?.expect("active cart");
    assert_eq!(still_active.cart().id, cart.cart().id);
    assert_eq!(still_active.total, 0);
    Ok(())
}

#[tokio::test]
async fn repeated_add_keeps_price_from_first_add() -> anyhow::Result<()> {
    let fx = fixture().await?;
    let user = Uuid::new_v4();

    fx.manager.add_to_cart(add(user, fx.product_id, "M", 1)).await?;
    fx.store.upsert_price(fx.product_id, "M", 99).await?;
    let cart = fx.manager.add_to_cart(add(user, fx.product_id, "M", 4)).await?;

    assert_eq!(cart.items().len(), 1);
    assert_eq!(cart.items()[0].item.price, 10);
    assert_eq!(cart.items()[0].item.quantity, 5);
    assert_eq!(cart.total, 50);
    Ok(())
}

#[tokio::test]
async fn sizes_of_one_product_are_separate_lines() -> anyhow::Result<()> {
    let fx = fixture().await?;
    let user = Uuid::new_v4();

    fx.manager.add_to_cart(add(user, fx.product_id, "M", 2)).await?;
    let cart = fx.manager.add_to_cart(add(user, fx.product_id, "L", 1)).await?;

    assert_eq!(cart.items().len(), 2);
    assert_eq!(cart.total, 2 * 10 + 12);
    Ok(())
}

#[tokio::test]
async fn missing_price_is_not_found_and_leaves_no_cart() -> anyhow::Result<()> {
    let fx = fixture().await?;
    let user = Uuid::new_v4();

    let err = fx
        .manager
        .add_to_cart(add(user, fx.product_id, "XXL", 1))
        .await
        .expect_err("no price for XXL");
    assert!(matches!(&err, AppError::NotFound(msg) if msg == "Price not found for selected size"));

    assert!(fx.manager.get_active_cart(user).await?.is_none());
    assert_eq!(fx.store.cart_count(user).await, 0);
    Ok(())
}

#[tokio::test]
async fn missing_price_on_existing_cart_keeps_items() -> anyhow::Result<()> {
    let fx = fixture().await?;
    let user = Uuid::new_v4();
    let before = fx.manager.add_to_cart(add(user, fx.product_id, "M", 2)).await?;

    let err = fx
        .manager
        .add_to_cart(add(user, Uuid::new_v4(), "M", 1))
        .await
        .expect_err("unknown product has no price");
    assert!(matches!(err, AppError::NotFound(_)));

    let after = fx.manager.get_active_cart(user).await?.expect("active cart");
    assert_eq!(after, before);
    Ok(())
}

#[tokio::test]
async fn removing_unknown_item_is_not_found() -> anyhow::Result<()> {
    let fx = fixture().await?;
    let err = fx
        .manager
        .remove_cart_item(Uuid::new_v4())
        .await
        .expect_err("unknown item");
    assert!(matches!(&err, AppError::NotFound(msg) if msg == "Cart item not found"));
    Ok(())
}

#[tokio::test]
async fn ordered_cart_is_replaced_on_next_add() -> anyhow::Result<()> {
    let fx = fixture().await?;
    let user = Uuid::new_v4();

    let first = fx.manager.add_to_cart(add(user, fx.product_id, "M", 1)).await?;
    fx.store.mark_ordered(first.cart().id).await?;
    assert!(fx.manager.get_active_cart(user).await?.is_none());

    let second = fx.manager.add_to_cart(add(user, fx.product_id, "M", 3)).await?;
    assert_ne!(second.cart().id, first.cart().id);
    assert_eq!(second.items().len(), 1);
    assert_eq!(second.items()[0].item.quantity, 3);
    assert_eq!(second.total, 30);
    assert_eq!(fx.store.cart_count(user).await, 2);
    Ok(())
}

#[tokio::test]
async fn users_have_independent_carts() -> anyhow::Result<()> {
    let fx = fixture().await?;
    let alice = Uuid::new_v4();
    let bob = Uuid::new_v4();

    let a = fx.manager.add_to_cart(add(alice, fx.product_id, "M", 1)).await?;
    let b = fx.manager.add_to_cart(add(bob, fx.product_id, "M", 7)).await?;

    assert_ne!(a.cart().id, b.cart().id);
    assert_eq!(fx.manager.get_active_cart(alice).await?.expect("cart").total, 10);
    assert_eq!(fx.manager.get_active_cart(bob).await?.expect("cart").total, 70);
    Ok(())
}

#[tokio::test]
async fn invalid_add_input_is_bad_request() -> anyhow::Result<()> {
    let fx = fixture().await?;
    let user = Uuid::new_v4();

    for quantity in [0, -3] {
        let err = fx
            .manager
            .add_to_cart(add(user, fx.product_id, "M", quantity))
            .await
            .expect_err("non-positive quantity");
        assert!(matches!(err, AppError::BadRequest(_)));
    }

    let err = fx
        .manager
        .add_to_cart(add(user, fx.product_id, "  ", 1))
        .await
        .expect_err("blank size");
    assert!(matches!(err, AppError::BadRequest(_)));

    assert_eq!(fx.store.cart_count(user).await, 0);
    Ok(())
}

#[tokio::test]
async fn update_item_quantity_sets_absolute_value() -> anyhow::Result<()> {
    let fx = fixture().await?;
    let user = Uuid::new_v4();
    let cart = fx.manager.add_to_cart(add(user, fx.product_id, "L", 4)).await?;
    let item_id = cart.items()[0].item.id;

    let updated = fx.manager.update_item_quantity(item_id, 1).await?;
    assert_eq!(updated.items()[0].item.quantity, 1);
    assert_eq!(updated.total, 12);

    let err = fx
        .manager
        .update_item_quantity(item_id, 0)
        .await
        .expect_err("zero quantity");
    assert!(matches!(err, AppError::BadRequest(_)));

    let err = fx
        .manager
        .update_item_quantity(Uuid::new_v4(), 2)
        .await
        .expect_err("unknown item");
    assert!(matches!(err, AppError::NotFound(_)));
    Ok(())
}

#[tokio::test]
async fn cart_serializes_with_items_and_total() -> anyhow::Result<()> {
    let fx = fixture().await?;
    let user = Uuid::new_v4();
    let cart = fx.manager.add_to_cart(add(user, fx.product_id, "M", 2)).await?;

    let json = serde_json::to_value(&cart)?;
    assert_eq!(json["user_id"], serde_json::json!(user));
    assert_eq!(json["is_ordered"], serde_json::json!(false));
    assert_eq!(json["total"], serde_json::json!(20));
    assert_eq!(json["items"][0]["size"], serde_json::json!("M"));
    assert_eq!(json["items"][0]["quantity"], serde_json::json!(2));
    assert_eq!(json["items"][0]["product"]["name"], serde_json::json!("Hoodie"));
    Ok(())
}

/// Delegates reads to `S` and rejects every cart item write.
struct RejectItemWrites<S>(S);

fn rejected() -> StoreError {
    StoreError::Conflict("item writes disabled".into())
}

impl<S: CartStore> CartStore for RejectItemWrites<S> {
    async fn find_active_cart(&self, user_id: Uuid) -> StoreResult<Option<LoadedCart>> {
        self.0.find_active_cart(user_id).await
    }

    async fn create_cart(&self, user_id: Uuid) -> StoreResult<Cart> {
        self.0.create_cart(user_id).await
    }

    async fn find_cart_by_id(&self, cart_id: Uuid) -> StoreResult<Option<LoadedCart>> {
        self.0.find_cart_by_id(cart_id).await
    }

    async fn find_price(&self, product_id: Uuid, size: &str) -> StoreResult<Option<Price>> {
        self.0.find_price(product_id, size).await
    }

    async fn create_cart_item(&self, _item: NewCartItem) -> StoreResult<CartItem> {
        Err(rejected())
    }

    async fn increment_cart_item_quantity(&self, _item_id: Uuid, _delta: i32) -> StoreResult<CartItem> {
        Err(rejected())
    }

    async fn set_cart_item_quantity(&self, _item_id: Uuid, _quantity: i32) -> StoreResult<CartItem> {
        Err(rejected())
    }

    async fn delete_cart_item(&self, item_id: Uuid) -> StoreResult<RemovedCartItem> {
        self.0.delete_cart_item(item_id).await
    }
}

impl TransactionalStore for RejectItemWrites<MemoryCartStore> {
    type Tx = RejectItemWrites<MemoryTransaction>;

    async fn begin(&self) -> StoreResult<Self::Tx> {
        Ok(RejectItemWrites(self.0.begin().await?))
    }
}

impl Transaction for RejectItemWrites<MemoryTransaction> {
    async fn commit(self) -> StoreResult<()> {
        self.0.commit().await
    }

    async fn rollback(self) -> StoreResult<()> {
        self.0.rollback().await
    }
}

#[tokio::test]
async fn failed_item_write_keeps_cause_and_rolls_back() -> anyhow::Result<()> {
    let fx = fixture().await?;
    let manager = CartManager::new(RejectItemWrites(fx.store.clone()));
    let user = Uuid::new_v4();

    let err = manager
        .add_to_cart(add(user, fx.product_id, "M", 1))
        .await
        .expect_err("item writes are rejected");

    assert!(matches!(
        &err,
        AppError::OperationFailed {
            source: StoreError::Conflict(_),
            ..
        }
    ));
    assert_eq!(err.to_string(), "Failed to update cart");
    let cause = err.source().expect("cause kept");
    assert_eq!(cause.to_string(), "Conflict: item writes disabled");

    assert_eq!(fx.store.cart_count(user).await, 0);
    Ok(())
}

#[test]
fn total_saturates_instead_of_overflowing() {
    let items = vec![item(i64::MAX / 2, 3), item(10, 1)];
    assert_eq!(cart_total(&items), i64::MAX);
    assert_eq!(item(i64::MAX, i32::MAX).line_total(), i64::MAX);
}

#[tokio::test]
async fn quantity_overflow_fails_without_touching_the_line() -> anyhow::Result<()> {
    let fx = fixture().await?;
    let user = Uuid::new_v4();
    let cart = fx
        .manager
        .add_to_cart(add(user, fx.product_id, "M", i32::MAX))
        .await?;

    let err = fx
        .manager
        .add_to_cart(add(user, fx.product_id, "M", 1))
        .await
        .expect_err("quantity would overflow");
    assert!(matches!(
        &err,
        AppError::OperationFailed {
            source: StoreError::QuantityOutOfRange { .. },
            ..
        }
    ));

    let after = fx.manager.get_active_cart(user).await?.expect("active cart");
    assert_eq!(after, cart);
    assert_eq!(after.items()[0].item.quantity, i32::MAX);
    assert_eq!(after.total, 10 * i64::from(i32::MAX));
    Ok(())
}

#[tokio::test]
async fn open_transaction_does_not_drop_other_users_writes() -> anyhow::Result<()> {
    let fx = fixture().await?;
    let alice = Uuid::new_v4();
    let bob = Uuid::new_v4();

    let tx = fx.store.begin().await?;
    let alice_cart = tx.create_cart(alice).await?;

    let manager = fx.manager.clone();
    let product_id = fx.product_id;
    let bob_add =
        tokio::spawn(async move { manager.add_to_cart(add(bob, product_id, "M", 2)).await });
    tokio::task::yield_now().await;
    assert!(!bob_add.is_finished(), "store writes wait for the open transaction");

    tx.commit().await?;
    let bob_cart = bob_add.await??;

    let alice_active = fx.manager.get_active_cart(alice).await?.expect("alice cart");
    assert_eq!(alice_active.cart().id, alice_cart.id);
    let bob_active = fx.manager.get_active_cart(bob).await?.expect("bob cart");
    assert_eq!(bob_active.cart().id, bob_cart.cart().id);
    assert_eq!(bob_active.total, 20);
    Ok(())
}
