use sea_orm::DatabaseConnection;

use crate::{services::cart_service::CartManager, store::SeaOrmCartStore};

#[derive(Clone)]
pub struct AppState {
    pub orm: DatabaseConnection,
    pub carts: CartManager<SeaOrmCartStore>,
}

impl AppState {
    pub fn new(orm: DatabaseConnection) -> Self {
        let carts = CartManager::new(SeaOrmCartStore::new(orm.clone()));
        Self { orm, carts }
    }
}
