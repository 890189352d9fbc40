use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
pub struct AddToCartRequest {
    pub user_id: Uuid,
    pub product_id: Uuid,
    #[schema(example = "M")]
    pub size: String,
    pub quantity: i32,
}

#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
pub struct UpdateCartItemRequest {
    pub quantity: i32,
}
