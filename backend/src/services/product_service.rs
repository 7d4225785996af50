//! Product catalog and manual stock adjustments.

use serde::Deserialize;
use sqlx::PgPool;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::db::map_constraint_error;
use crate::error::{AppError, Result};
use crate::models::inventory::{InventoryTransaction, TransactionKind};
use crate::models::product::{Product, PRODUCT_FROM, PRODUCT_SELECT};

const PRODUCT_CONSTRAINTS: &[(&str, &str)] = &[
    ("products_sku_key", "SKU already exists"),
    ("products_category_id_fkey", "Category does not exist"),
    ("products_project_id_fkey", "Project does not exist"),
    ("products_stock_quantity_check", "Stock quantity cannot be negative"),
];

/// Catalog filters
#[derive(Debug, Default, Clone)]
pub struct ProductFilter {
    pub search: Option<String>,
    pub category_id: Option<Uuid>,
    pub project_id: Option<Uuid>,
    pub in_stock: Option<bool>,
    pub low_stock: Option<bool>,
    /// Hide inactive products (agency view)
    pub active_only: bool,
}

/// Editable product fields
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct ProductInput {
    pub sku: String,
    pub name: String,
    pub description: Option<String>,
    pub category_id: Option<Uuid>,
    pub project_id: Option<Uuid>,
    #[serde(default = "default_unit")]
    pub unit: String,
    pub unit_price_cents: i64,
    pub reorder_level: Option<i32>,
    #[serde(default = "default_active")]
    pub is_active: bool,
}

fn default_unit() -> String {
    "each".to_string()
}

fn default_active() -> bool {
    true
}

/// Product creation request
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct NewProduct {
    #[serde(flatten)]
    pub product: ProductInput,
    #[serde(default)]
    pub initial_stock: i32,
}

/// Manual stock movement
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct StockAdjustment {
    /// Positive to restock, negative to write off
    pub quantity_change: i32,
    pub note: Option<String>,
}

/// Stock level after applying `change`, or an error if it would go negative.
pub fn apply_stock_change(sku: &str, current: i32, change: i32) -> Result<i32> {
    let next = current
        .checked_add(change)
        .ok_or_else(|| AppError::Validation("Stock quantity out of range".to_string()))?;
    if next < 0 {
        return Err(AppError::BusinessRule(format!(
            "Insufficient stock for {}: adjustment of {} exceeds available {}",
            sku, change, current
        )));
    }
    Ok(next)
}

/// Service for the product catalog.
pub struct ProductService {
    db: PgPool,
    default_reorder_level: i32,
}

impl ProductService {
    pub fn new(db: PgPool, default_reorder_level: i32) -> Self {
        Self {
            db,
            default_reorder_level,
        }
    }

    pub async fn list(&self, filter: &ProductFilter, offset: i64, limit: i64) -> Result<(Vec<Product>, i64)> {
        let search_pattern = filter.search.as_ref().map(|s| format!("%{}%", s.trim()));
        let where_clause = r#"
            WHERE ($1::text IS NULL OR p.sku ILIKE $1 OR p.name ILIKE $1 OR p.description ILIKE $1)
              AND ($2::uuid IS NULL OR p.category_id = $2)
              AND ($3::uuid IS NULL OR p.project_id = $3)
              AND ($4::boolean IS NULL OR (p.stock_quantity > 0) = $4)
              AND ($5::boolean IS NULL OR (p.stock_quantity <= p.reorder_level) = $5)
              AND ($6 = false OR p.is_active = true)
        "#;

        let products: Vec<Product> = sqlx::query_as(&format!(
            "{PRODUCT_SELECT} {PRODUCT_FROM} {where_clause} ORDER BY p.name, p.sku OFFSET $7 LIMIT $8"
        ))
        .bind(&search_pattern)
        .bind(filter.category_id)
        .bind(filter.project_id)
        .bind(filter.in_stock)
        .bind(filter.low_stock)
        .bind(filter.active_only)
        .bind(offset)
        .bind(limit)
        .fetch_all(&self.db)
        .await?;

        let total: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) FROM products p {where_clause}"))
            .bind(&search_pattern)
            .bind(filter.category_id)
            .bind(filter.project_id)
            .bind(filter.in_stock)
            .bind(filter.low_stock)
            .bind(filter.active_only)
            .fetch_one(&self.db)
            .await?;

        Ok((products, total))
    }

    pub async fn get(&self, id: Uuid) -> Result<Product> {
        sqlx::query_as(&format!("{PRODUCT_SELECT} {PRODUCT_FROM} WHERE p.id = $1"))
            .bind(id)
            .fetch_optional(&self.db)
            .await?
            .ok_or_else(|| AppError::NotFound("Product not found".to_string()))
    }

    /// Create a product; a positive initial stock is recorded in the ledger.
    pub async fn create(&self, input: &NewProduct, created_by: Uuid) -> Result<Product> {
        let p = &input.product;
        let mut tx = self.db.begin().await?;

        let id: Uuid = sqlx::query_scalar(
            r#"
            INSERT INTO products
                (sku, name, description, category_id, project_id, unit,
                 unit_price_cents, stock_quantity, reorder_level, is_active)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            RETURNING id
            "#,
        )
        .bind(p.sku.trim())
        .bind(p.name.trim())
        .bind(&p.description)
        .bind(p.category_id)
        .bind(p.project_id)
        .bind(p.unit.trim())
        .bind(p.unit_price_cents)
        .bind(input.initial_stock)
        .bind(p.reorder_level.unwrap_or(self.default_reorder_level))
        .bind(p.is_active)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| map_constraint_error(e, PRODUCT_CONSTRAINTS))?;

        if input.initial_stock > 0 {
            sqlx::query(
                r#"
                INSERT INTO inventory_transactions
                    (product_id, user_id, kind, quantity_change, stock_after, note)
                VALUES ($1, $2, $3, $4, $4, 'Initial stock')
                "#,
            )
            .bind(id)
            .bind(created_by)
            .bind(TransactionKind::Adjustment)
            .bind(input.initial_stock)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        tracing::info!(product_id = %id, sku = %p.sku, "Product created");
        self.get(id).await
    }

    /// Replace the editable fields of a product. Stock is untouched.
    pub async fn update(&self, id: Uuid, input: &ProductInput) -> Result<Product> {
        let result = sqlx::query(
            r#"
            UPDATE products
            SET sku = $2, name = $3, description = $4, category_id = $5, project_id = $6,
                unit = $7, unit_price_cents = $8, reorder_level = COALESCE($9, reorder_level),
                is_active = $10, updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(input.sku.trim())
        .bind(input.name.trim())
        .bind(&input.description)
        .bind(input.category_id)
        .bind(input.project_id)
        .bind(input.unit.trim())
        .bind(input.unit_price_cents)
        .bind(input.reorder_level)
        .bind(input.is_active)
        .execute(&self.db)
        .await
        .map_err(|e| map_constraint_error(e, PRODUCT_CONSTRAINTS))?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("Product not found".to_string()));
        }
        self.get(id).await
    }

    /// Delete a product that has never been ordered.
    pub async fn delete(&self, id: Uuid) -> Result<()> {
        let ordered: bool =
            sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM order_items WHERE product_id = $1)")
                .bind(id)
                .fetch_one(&self.db)
                .await?;
        if ordered {
            return Err(AppError::BusinessRule(
                "Product is referenced by existing orders; deactivate it instead".to_string(),
            ));
        }

        let result = sqlx::query("DELETE FROM products WHERE id = $1")
            .bind(id)
            .execute(&self.db)
            .await
            .map_err(|e| map_constraint_error(e, &[]))?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("Product not found".to_string()));
        }
        tracing::info!(product_id = %id, "Product deleted");
        Ok(())
    }

    /// Apply a manual stock adjustment and record it in the ledger.
    pub async fn adjust_stock(
        &self,
        id: Uuid,
        adjustment: &StockAdjustment,
        user_id: Uuid,
    ) -> Result<Product> {
        let mut tx = self.db.begin().await?;

        let (sku, current): (String, i32) =
            sqlx::query_as("SELECT sku, stock_quantity FROM products WHERE id = $1 FOR UPDATE")
                .bind(id)
                .fetch_optional(&mut *tx)
                .await?
                .ok_or_else(|| AppError::NotFound("Product not found".to_string()))?;

        let next = apply_stock_change(&sku, current, adjustment.quantity_change)?;

        sqlx::query("UPDATE products SET stock_quantity = $2, updated_at = NOW() WHERE id = $1")
            .bind(id)
            .bind(next)
            .execute(&mut *tx)
            .await?;

        sqlx::query(
            r#"
            INSERT INTO inventory_transactions
                (product_id, user_id, kind, quantity_change, stock_after, note)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(id)
        .bind(user_id)
        .bind(TransactionKind::Adjustment)
        .bind(adjustment.quantity_change)
        .bind(next)
        .bind(&adjustment.note)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        tracing::info!(
            product_id = %id,
            sku = %sku,
            change = adjustment.quantity_change,
            stock_after = next,
            "Stock adjusted"
        );
        self.get(id).await
    }

    /// Ledger entries for one product, newest first.
    pub async fn transactions(
        &self,
        product_id: Uuid,
        offset: i64,
        limit: i64,
    ) -> Result<(Vec<InventoryTransaction>, i64)> {
        // 404 for unknown products rather than an empty page
        self.get(product_id).await?;

        let items: Vec<InventoryTransaction> = sqlx::query_as(
            r#"
            SELECT t.id, t.product_id, t.order_id, o.order_number, t.user_id, u.username,
                   t.kind, t.quantity_change, t.stock_after, t.note, t.created_at
            FROM inventory_transactions t
            LEFT JOIN orders o ON o.id = t.order_id
            LEFT JOIN users u ON u.id = t.user_id
            WHERE t.product_id = $1
            ORDER BY t.created_at DESC, t.id
            OFFSET $2 LIMIT $3
            "#,
        )
        .bind(product_id)
        .bind(offset)
        .bind(limit)
        .fetch_all(&self.db)
        .await?;

        let total: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM inventory_transactions WHERE product_id = $1")
                .bind(product_id)
                .fetch_one(&self.db)
                .await?;

        Ok((items, total))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_apply_stock_change_restock() {
        assert_eq!(apply_stock_change("RAD-1", 5, 20).unwrap(), 25);
    }

    #[test]
    fn test_apply_stock_change_to_zero_is_allowed() {
        assert_eq!(apply_stock_change("RAD-1", 5, -5).unwrap(), 0);
    }

    #[test]
    fn test_apply_stock_change_below_zero_rejected() {
        let err = apply_stock_change("RAD-1", 5, -6).unwrap_err();
        match err {
            AppError::BusinessRule(msg) => assert!(msg.contains("RAD-1")),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_apply_stock_change_overflow() {
        assert!(matches!(
            apply_stock_change("RAD-1", i32::MAX, 1),
            Err(AppError::Validation(_))
        ));
    }

    #[test]
    fn test_new_product_defaults() {
        let input: NewProduct = serde_json::from_str(
            r#"{"sku": "MED-9", "name": "Trauma kit", "unit_price_cents": 4599}"#,
        )
        .unwrap();
        assert_eq!(input.initial_stock, 0);
        assert_eq!(input.product.unit, "each");
        assert!(input.product.is_active);
        assert!(input.product.reorder_level.is_none());
    }
}
