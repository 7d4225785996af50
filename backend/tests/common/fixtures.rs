//! Test fixtures and data factories for backend tests

#![allow(dead_code)]

use serde_json::{json, Value};
use supply_depot_backend::models::user::UserRole;

/// Test user credentials
pub struct TestUser {
    pub username: String,
    pub password: String,
    pub role: UserRole,
    pub agency_name: Option<String>,
}

impl TestUser {
    pub fn admin() -> Self {
        Self {
            username: "admin".to_string(),
            password: "admin12345".to_string(),
            role: UserRole::Admin,
            agency_name: None,
        }
    }

    pub fn agency() -> Self {
        Self {
            username: "agency".to_string(),
            password: "password123".to_string(),
            role: UserRole::Agency,
            agency_name: Some("Northern Command".to_string()),
        }
    }
}

/// Product creation body
pub fn product_body(sku: &str, price_cents: i64, stock: i32) -> Value {
    json!({
        "sku": sku,
        "name": format!("Item {}", sku),
        "unit": "box",
        "unit_price_cents": price_cents,
        "reorder_level": 5,
        "initial_stock": stock
    })
}

/// Order body with one line
pub fn order_body(product_id: &str, quantity: i32) -> Value {
    json!({
        "shipping_address": "Depot 7, Gate B",
        "items": [{ "product_id": product_id, "quantity": quantity }]
    })
}
