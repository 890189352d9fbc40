use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Product {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Unit price of a product in one size, in minor currency units.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Price {
    pub id: Uuid,
    pub product_id: Uuid,
    pub size: String,
    pub value: i64,
}

/// A user's cart. A cart with `is_ordered == false` is the user's active cart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Cart {
    pub id: Uuid,
    pub user_id: Uuid,
    pub is_ordered: bool,
    pub created_at: DateTime<Utc>,
}

/// One (product, size) line of a cart. `price` is captured when the line is
/// first added and is never re-read from the price table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct CartItem {
    pub id: Uuid,
    pub cart_id: Uuid,
    pub product_id: Uuid,
    pub size: String,
    pub price: i64,
    pub quantity: i32,
    pub created_at: DateTime<Utc>,
}

impl CartItem {
    /// `price * quantity`, saturating at the bounds of `i64`.
    pub fn line_total(&self) -> i64 {
        self.price.saturating_mul(i64::from(self.quantity))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct CartItemWithProduct {
    #[serde(flatten)]
    pub item: CartItem,
    pub product: Product,
}

/// A cart together with its items and each item's product.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct LoadedCart {
    #[serde(flatten)]
    pub cart: Cart,
    pub items: Vec<CartItemWithProduct>,
}

impl LoadedCart {
    pub fn empty(cart: Cart) -> Self {
        Self {
            cart,
            items: Vec::new(),
        }
    }

    pub fn find_item(&self, product_id: Uuid, size: &str) -> Option<&CartItem> {
        self.items
            .iter()
            .map(|line| &line.item)
            .find(|item| item.product_id == product_id && item.size == size)
    }

    pub fn with_total(self) -> CartWithTotal {
        let total = cart_total(self.items.iter().map(|line| &line.item));
        CartWithTotal { cart: self, total }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct CartWithTotal {
    #[serde(flatten)]
    pub cart: LoadedCart,
    pub total: i64,
}

impl CartWithTotal {
    pub fn cart(&self) -> &Cart {
        &self.cart.cart
    }

    pub fn items(&self) -> &[CartItemWithProduct] {
        &self.cart.items
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewCartItem {
    pub cart_id: Uuid,
    pub product_id: Uuid,
    pub size: String,
    pub price: i64,
    pub quantity: i32,
}

/// A deleted cart item along with the cart it belonged to.
#[derive(Debug, Clone, PartialEq)]
pub struct RemovedCartItem {
    pub item: CartItem,
    pub cart: Cart,
}

/// Sum of `price * quantity` over the given items; zero when there are none.
/// Saturates instead of overflowing.
pub fn cart_total<'a, I>(items: I) -> i64
where
    I: IntoIterator<Item = &'a CartItem>,
{
    items
        .into_iter()
        .map(CartItem::line_total)
        .fold(0, i64::saturating_add)
}
