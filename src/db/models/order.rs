//! Order models, status vocabulary, and checkout DTOs.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use super::jersey::JerseySummary;

/// The one status vocabulary used by every role. Orders start pending and
/// either walk forward to delivered or drop to cancelled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    Pending,
    Confirmed,
    Shipped,
    Delivered,
    Cancelled,
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OrderStatus::Pending => write!(f, "pending"),
            OrderStatus::Confirmed => write!(f, "confirmed"),
            OrderStatus::Shipped => write!(f, "shipped"),
            OrderStatus::Delivered => write!(f, "delivered"),
            OrderStatus::Cancelled => write!(f, "cancelled"),
        }
    }
}

impl std::str::FromStr for OrderStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pending" => Ok(OrderStatus::Pending),
            "confirmed" => Ok(OrderStatus::Confirmed),
            "shipped" => Ok(OrderStatus::Shipped),
            "delivered" => Ok(OrderStatus::Delivered),
            "cancelled" => Ok(OrderStatus::Cancelled),
            _ => Err(format!(
                "Invalid status. Must be one of: pending, confirmed, shipped, delivered, cancelled (got '{}')",
                s
            )),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Order {
    pub id: String,
    pub user_id: String,
    /// Client-generated idempotency key; replays return the original order.
    pub request_id: String,
    pub total_amount: i64,
    pub status: String,
    pub payment_status: String,
    /// Shipping details as JSON text.
    pub shipping_address: String,
    pub created_at: String,
    pub updated_at: String,
}

impl Order {
    pub fn status_enum(&self) -> Option<OrderStatus> {
        self.status.parse().ok()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct OrderItem {
    pub id: String,
    pub order_id: String,
    pub jersey_id: String,
    pub size: String,
    pub quantity: i64,
    /// Copied from the jersey at order time; later price edits don't touch it.
    pub price: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShippingDetails {
    pub full_name: String,
    pub email: String,
    pub phone: String,
    pub address: String,
    pub city: String,
    pub state: String,
    pub pincode: String,
}

#[derive(Debug, Deserialize)]
pub struct CheckoutRequest {
    /// Client-generated key making the whole checkout idempotent.
    pub request_id: String,
    /// The selected subset of the caller's cart.
    pub item_ids: Vec<String>,
    pub shipping: ShippingDetails,
}

#[derive(Debug, Clone, Serialize)]
pub struct OrderItemDetail {
    pub id: String,
    pub jersey_id: String,
    pub size: String,
    pub quantity: i64,
    pub price: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub jersey: Option<JerseySummary>,
}

#[derive(Debug, Clone, Serialize)]
pub struct OrderResponse {
    pub id: String,
    pub user_id: String,
    pub total_amount: i64,
    pub status: String,
    pub payment_status: String,
    pub shipping: Option<ShippingDetails>,
    pub created_at: String,
    pub items: Vec<OrderItemDetail>,
}

impl OrderResponse {
    pub fn from_parts(order: Order, items: Vec<OrderItemDetail>) -> Self {
        Self {
            shipping: serde_json::from_str(&order.shipping_address).ok(),
            id: order.id,
            user_id: order.user_id,
            total_amount: order.total_amount,
            status: order.status,
            payment_status: order.payment_status,
            created_at: order.created_at,
            items,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct UpdateOrderStatusRequest {
    pub status: String,
}

#[derive(Debug, Deserialize)]
pub struct ListOrdersParams {
    pub status: Option<String>,
}

/// Everything the payment page needs to render the pay-by-UPI step.
#[derive(Debug, Clone, Serialize)]
pub struct PaymentRequestResponse {
    pub order_id: String,
    pub amount: i64,
    pub currency: &'static str,
    pub payee_vpa: String,
    pub payee_name: String,
    pub note: String,
    pub upi_uri: String,
}
