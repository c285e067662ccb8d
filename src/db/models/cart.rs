//! Cart models and DTOs.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use super::jersey::JerseySummary;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct CartItem {
    pub id: String,
    pub user_id: String,
    pub jersey_id: String,
    pub size: String,
    pub quantity: i64,
    pub created_at: String,
}

/// Cart row joined with its jersey for the cart page.
#[derive(Debug, Clone, Serialize)]
pub struct CartItemResponse {
    pub id: String,
    pub jersey_id: String,
    pub size: String,
    pub quantity: i64,
    pub jersey: JerseySummary,
}

#[derive(Debug, Deserialize)]
pub struct AddCartItemRequest {
    pub jersey_id: String,
    pub size: String,
    #[serde(default = "default_quantity")]
    pub quantity: i64,
}

fn default_quantity() -> i64 {
    1
}

#[derive(Debug, Deserialize)]
pub struct UpdateCartItemRequest {
    pub quantity: i64,
}
