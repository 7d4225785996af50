//! Order placement and lifecycle.
//!
//! Placing an order validates every line against current stock, decrements
//! stock, writes the order with its lines and records one ledger entry per
//! line. Cancelling reverses the stock movement. Both run in a single
//! transaction with the affected product rows locked, so two concurrent
//! orders can never oversell the same product.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use rand::Rng;
use serde::Deserialize;
use sqlx::PgPool;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::db::map_constraint_error;
use crate::error::{AppError, Result};
use crate::models::inventory::TransactionKind;
use crate::models::order::{Order, OrderDetail, OrderItem, OrderStatus, ORDER_SELECT};
use crate::services::product_service::apply_stock_change;

/// One requested line
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct OrderLineInput {
    pub product_id: Uuid,
    pub quantity: i32,
}

/// Order placement request
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct NewOrder {
    pub project_id: Option<Uuid>,
    pub shipping_address: Option<String>,
    pub notes: Option<String>,
    pub items: Vec<OrderLineInput>,
}

/// Who is acting on an order
#[derive(Debug, Clone, Copy)]
pub struct Actor {
    pub user_id: Uuid,
    pub is_admin: bool,
}

/// Filters for listing orders
#[derive(Debug, Default, Clone)]
pub struct OrderFilter {
    pub status: Option<OrderStatus>,
    pub user_id: Option<Uuid>,
    pub project_id: Option<Uuid>,
}

/// Product row locked while an order is placed
#[derive(Debug, sqlx::FromRow)]
struct LockedProduct {
    id: Uuid,
    sku: String,
    unit_price_cents: i64,
    stock_quantity: i32,
    is_active: bool,
}

/// Collapse duplicate product lines, summing their quantities.
///
/// Lines come back sorted by product id so row locks are always taken in
/// the same order.
pub fn merge_lines(items: &[OrderLineInput]) -> Result<Vec<(Uuid, i32)>> {
    let mut merged: BTreeMap<Uuid, i32> = BTreeMap::new();
    for item in items {
        let qty = merged.entry(item.product_id).or_insert(0);
        *qty = qty
            .checked_add(item.quantity)
            .ok_or_else(|| AppError::Validation("Quantity out of range".to_string()))?;
    }
    Ok(merged.into_iter().collect())
}

/// Reject a line whose quantity exceeds available stock.
pub fn check_stock(sku: &str, requested: i32, available: i32) -> Result<()> {
    if requested > available {
        return Err(AppError::BusinessRule(format!(
            "Insufficient stock for {}: requested {}, available {}",
            sku, requested, available
        )));
    }
    Ok(())
}

/// Price of a line in cents.
pub fn line_total(unit_price_cents: i64, quantity: i32) -> Result<i64> {
    unit_price_cents
        .checked_mul(i64::from(quantity))
        .ok_or_else(|| AppError::Validation("Order total out of range".to_string()))
}

/// Order number in the form `ORD-YYYYMMDD-XXXXXX`.
pub fn generate_order_number(now: DateTime<Utc>) -> String {
    const CHARSET: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZ23456789";
    let mut rng = rand::rng();
    let suffix: String = (0..6)
        .map(|_| CHARSET[rng.random_range(0..CHARSET.len())] as char)
        .collect();
    format!("ORD-{}-{}", now.format("%Y%m%d"), suffix)
}

/// Service for orders.
pub struct OrderService {
    db: PgPool,
}

impl OrderService {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Place an order on behalf of `user_id`.
    pub async fn create(&self, user_id: Uuid, input: &NewOrder) -> Result<OrderDetail> {
        let lines = merge_lines(&input.items)?;
        let mut tx = self.db.begin().await?;

        if let Some(project_id) = input.project_id {
            let exists: bool =
                sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM projects WHERE id = $1)")
                    .bind(project_id)
                    .fetch_one(&mut *tx)
                    .await?;
            if !exists {
                return Err(AppError::NotFound("Project not found".to_string()));
            }
        }

        let mut priced = Vec::with_capacity(lines.len());
        let mut total_cents: i64 = 0;
        for (product_id, quantity) in &lines {
            let product: LockedProduct = sqlx::query_as(
                r#"
                SELECT id, sku, unit_price_cents, stock_quantity, is_active
                FROM products
                WHERE id = $1
                FOR UPDATE
                "#,
            )
            .bind(product_id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Product {} not found", product_id)))?;

            if !product.is_active {
                return Err(AppError::BusinessRule(format!(
                    "Product {} is not available for ordering",
                    product.sku
                )));
            }
            check_stock(&product.sku, *quantity, product.stock_quantity)?;

            let line_cents = line_total(product.unit_price_cents, *quantity)?;
            total_cents = total_cents
                .checked_add(line_cents)
                .ok_or_else(|| AppError::Validation("Order total out of range".to_string()))?;
            priced.push((product, *quantity, line_cents));
        }

        let order_number = generate_order_number(Utc::now());
        let order_id: Uuid = sqlx::query_scalar(
            r#"
            INSERT INTO orders (order_number, user_id, project_id, status, total_cents,
                                shipping_address, notes)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING id
            "#,
        )
        .bind(&order_number)
        .bind(user_id)
        .bind(input.project_id)
        .bind(OrderStatus::Pending)
        .bind(total_cents)
        .bind(&input.shipping_address)
        .bind(&input.notes)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| {
            map_constraint_error(
                e,
                &[("orders_order_number_key", "Order number collision, please retry")],
            )
        })?;

        for (product, quantity, line_cents) in &priced {
            let stock_after: i32 = sqlx::query_scalar(
                r#"
                UPDATE products
                SET stock_quantity = stock_quantity - $2, updated_at = NOW()
                WHERE id = $1
                RETURNING stock_quantity
                "#,
            )
            .bind(product.id)
            .bind(quantity)
            .fetch_one(&mut *tx)
            .await
            .map_err(|e| {
                map_constraint_error(
                    e,
                    &[("products_stock_quantity_check", "Insufficient stock")],
                )
            })?;

            sqlx::query(
                r#"
                INSERT INTO order_items (order_id, product_id, quantity, unit_price_cents, line_total_cents)
                VALUES ($1, $2, $3, $4, $5)
                "#,
            )
            .bind(order_id)
            .bind(product.id)
            .bind(quantity)
            .bind(product.unit_price_cents)
            .bind(line_cents)
            .execute(&mut *tx)
            .await?;

            sqlx::query(
                r#"
                INSERT INTO inventory_transactions
                    (product_id, order_id, user_id, kind, quantity_change, stock_after, note)
                VALUES ($1, $2, $3, $4, $5, $6, $7)
                "#,
            )
            .bind(product.id)
            .bind(order_id)
            .bind(user_id)
            .bind(TransactionKind::Order)
            .bind(-quantity)
            .bind(stock_after)
            .bind(format!("Order {}", order_number))
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        tracing::info!(
            order_id = %order_id,
            order_number = %order_number,
            user_id = %user_id,
            lines = priced.len(),
            total_cents,
            "Order placed"
        );

        self.get(order_id, Actor { user_id, is_admin: true }).await
    }

    /// List orders. Non-admin actors only ever see their own.
    pub async fn list(
        &self,
        actor: Actor,
        filter: &OrderFilter,
        offset: i64,
        limit: i64,
    ) -> Result<(Vec<Order>, i64)> {
        let user_id = if actor.is_admin {
            filter.user_id
        } else {
            Some(actor.user_id)
        };
        let where_clause = r#"
            WHERE ($1::order_status IS NULL OR o.status = $1)
              AND ($2::uuid IS NULL OR o.user_id = $2)
              AND ($3::uuid IS NULL OR o.project_id = $3)
        "#;

        let orders: Vec<Order> = sqlx::query_as(&format!(
            "{ORDER_SELECT} {where_clause} ORDER BY o.created_at DESC, o.id OFFSET $4 LIMIT $5"
        ))
        .bind(filter.status)
        .bind(user_id)
        .bind(filter.project_id)
        .bind(offset)
        .bind(limit)
        .fetch_all(&self.db)
        .await?;

        let total: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) FROM orders o {where_clause}"))
            .bind(filter.status)
            .bind(user_id)
            .bind(filter.project_id)
            .fetch_one(&self.db)
            .await?;

        Ok((orders, total))
    }

    /// Fetch an order with its lines. Other users' orders look missing to
    /// non-admin actors.
    pub async fn get(&self, id: Uuid, actor: Actor) -> Result<OrderDetail> {
        let order: Order = sqlx::query_as(&format!("{ORDER_SELECT} WHERE o.id = $1"))
            .bind(id)
            .fetch_optional(&self.db)
            .await?
            .filter(|o: &Order| actor.is_admin || o.user_id == actor.user_id)
            .ok_or_else(|| AppError::NotFound("Order not found".to_string()))?;

        let items: Vec<OrderItem> = sqlx::query_as(
            r#"
            SELECT oi.id, oi.order_id, oi.product_id, p.sku, p.name AS product_name,
                   oi.quantity, oi.unit_price_cents, oi.line_total_cents
            FROM order_items oi
            JOIN products p ON p.id = oi.product_id
            WHERE oi.order_id = $1
            ORDER BY p.sku
            "#,
        )
        .bind(id)
        .fetch_all(&self.db)
        .await?;

        Ok(OrderDetail { order, items })
    }

    /// Move an order to `next`, restoring stock when it is cancelled.
    ///
    /// Admins may apply any allowed transition; other users may only cancel
    /// their own pending orders.
    pub async fn update_status(
        &self,
        id: Uuid,
        actor: Actor,
        next: OrderStatus,
        note: Option<&str>,
    ) -> Result<OrderDetail> {
        let mut tx = self.db.begin().await?;

        let (owner, order_number, current): (Uuid, String, OrderStatus) = sqlx::query_as(
            "SELECT user_id, order_number, status FROM orders WHERE id = $1 FOR UPDATE",
        )
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?
        .filter(|(owner, _, _)| actor.is_admin || *owner == actor.user_id)
        .ok_or_else(|| AppError::NotFound("Order not found".to_string()))?;

        if !actor.is_admin && !(current == OrderStatus::Pending && next == OrderStatus::Cancelled) {
            return Err(AppError::Authorization(
                "Only pending orders can be cancelled by their owner".to_string(),
            ));
        }
        if !current.can_transition_to(next) {
            return Err(AppError::BusinessRule(format!(
                "Cannot change order status from {} to {}",
                current, next
            )));
        }

        sqlx::query(
            "UPDATE orders SET status = $2, status_note = $3, updated_at = NOW() WHERE id = $1",
        )
        .bind(id)
        .bind(next)
        .bind(note)
        .execute(&mut *tx)
        .await?;

        if next == OrderStatus::Cancelled {
            // Product rows locked in id order, matching placement
            let lines: Vec<(Uuid, String, i32, i32)> = sqlx::query_as(
                r#"
                SELECT oi.product_id, p.sku, p.stock_quantity, oi.quantity
                FROM order_items oi
                JOIN products p ON p.id = oi.product_id
                WHERE oi.order_id = $1
                ORDER BY oi.product_id
                FOR UPDATE OF p
                "#,
            )
            .bind(id)
            .fetch_all(&mut *tx)
            .await?;

            let ledger_note = match note {
                Some(n) => format!("Order {} cancelled: {}", order_number, n),
                None => format!("Order {} cancelled", order_number),
            };

            for (product_id, sku, current, quantity) in &lines {
                let stock_after = apply_stock_change(sku, *current, *quantity)?;

                sqlx::query(
                    "UPDATE products SET stock_quantity = $2, updated_at = NOW() WHERE id = $1",
                )
                .bind(product_id)
                .bind(stock_after)
                .execute(&mut *tx)
                .await?;

                sqlx::query(
                    r#"
                    INSERT INTO inventory_transactions
                        (product_id, order_id, user_id, kind, quantity_change, stock_after, note)
                    VALUES ($1, $2, $3, $4, $5, $6, $7)
                    "#,
                )
                .bind(product_id)
                .bind(id)
                .bind(actor.user_id)
                .bind(TransactionKind::Cancellation)
                .bind(quantity)
                .bind(stock_after)
                .bind(&ledger_note)
                .execute(&mut *tx)
                .await?;
            }
        }

        tx.commit().await?;
        tracing::info!(
            order_id = %id,
            order_number = %order_number,
            from = %current,
            to = %next,
            actor = %actor.user_id,
            owner = %owner,
            "Order status changed"
        );

        self.get(id, actor).await
    }
}
