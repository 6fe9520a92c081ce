//! Order document
//!
//! Stored in `orders/{id}`; placed by a farmer with a connected dealer.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// Collection name for orders
pub const ORDER_COLLECTION: &str = "orders";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    #[default]
    Pending,
    Confirmed,
    Shipped,
    Delivered,
    Cancelled,
}

/// Order as returned to callers. Timestamps are ISO-8601 strings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: String,
    pub farmer_id: String,
    pub dealer_id: String,
    pub product_name: String,
    pub quantity: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_price: Option<f64>,
    #[serde(default)]
    pub status: OrderStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
}

/// JSON schema for an [`Order`] leaving a flow.
pub fn order_schema() -> Value {
    let timestamp = json!({ "type": "string", "format": "date-time" });

    json!({
        "type": "object",
        "required": ["id", "farmerId", "dealerId", "productName", "quantity", "status"],
        "properties": {
            "id": { "type": "string", "minLength": 1 },
            "farmerId": { "type": "string" },
            "dealerId": { "type": "string" },
            "productName": { "type": "string" },
            "quantity": { "type": "number", "minimum": 0 },
            "unit": { "type": "string" },
            "totalPrice": { "type": "number", "minimum": 0 },
            "status": { "enum": ["pending", "confirmed", "shipped", "delivered", "cancelled"] },
            "createdAt": timestamp,
            "updatedAt": timestamp
        }
    })
}
