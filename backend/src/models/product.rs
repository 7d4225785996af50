//! Product catalog models.

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

/// Catalog category
#[derive(Debug, Clone, FromRow, Serialize, ToSchema)]
pub struct Category {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub product_count: i64,
    pub created_at: DateTime<Utc>,
}

/// Product entity, joined with its category and project names
#[derive(Debug, Clone, FromRow, Serialize, ToSchema)]
pub struct Product {
    pub id: Uuid,
    pub sku: String,
    pub name: String,
    pub description: Option<String>,
    pub category_id: Option<Uuid>,
    pub category_name: Option<String>,
    pub project_id: Option<Uuid>,
    pub project_name: Option<String>,
    pub unit: String,
    pub unit_price_cents: i64,
    pub stock_quantity: i32,
    pub reorder_level: i32,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Product {
    /// Stock at or below the reorder level.
    pub fn is_low_stock(&self) -> bool {
        self.stock_quantity <= self.reorder_level
    }
}

/// SELECT clause for [`Product`]; pair with [`PRODUCT_FROM`].
pub const PRODUCT_SELECT: &str = r#"
    SELECT p.id, p.sku, p.name, p.description,
           p.category_id, c.name AS category_name,
           p.project_id, pr.name AS project_name,
           p.unit, p.unit_price_cents, p.stock_quantity, p.reorder_level,
           p.is_active, p.created_at, p.updated_at
"#;

pub const PRODUCT_FROM: &str = r#"
    FROM products p
    LEFT JOIN categories c ON c.id = p.category_id
    LEFT JOIN projects pr ON pr.id = p.project_id
"#;
