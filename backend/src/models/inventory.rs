//! Inventory ledger model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

/// Reason for a stock movement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "inventory_transaction_kind", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum TransactionKind {
    /// Stock taken by an order
    Order,
    /// Stock returned by a cancelled order
    Cancellation,
    /// Manual correction or restock by an admin
    Adjustment,
}

/// One row of the inventory ledger
#[derive(Debug, Clone, FromRow, Serialize, ToSchema)]
pub struct InventoryTransaction {
    pub id: Uuid,
    pub product_id: Uuid,
    pub order_id: Option<Uuid>,
    pub order_number: Option<String>,
    pub user_id: Option<Uuid>,
    pub username: Option<String>,
    pub kind: TransactionKind,
    pub quantity_change: i32,
    pub stock_after: i32,
    pub note: Option<String>,
    pub created_at: DateTime<Utc>,
}
