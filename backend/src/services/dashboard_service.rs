//! Dashboard summaries for admins and agencies.

use serde::Serialize;
use sqlx::PgPool;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::error::Result;
use crate::models::order::{Order, OrderStatus, ORDER_SELECT};
use crate::models::product::{Product, PRODUCT_FROM, PRODUCT_SELECT};

const RECENT_ORDERS: i64 = 5;
const LOW_STOCK_LIMIT: i64 = 10;

/// Number of orders in one status
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct StatusCount {
    pub status: OrderStatus,
    pub count: i64,
}

/// System-wide summary shown to admins
#[derive(Debug, Serialize, ToSchema)]
pub struct AdminDashboard {
    pub total_products: i64,
    pub active_products: i64,
    pub low_stock_count: i64,
    pub total_projects: i64,
    pub active_projects: i64,
    pub total_users: i64,
    pub total_orders: i64,
    pub pending_orders: i64,
    /// Value of all orders that were not cancelled
    pub order_value_cents: i64,
    pub orders_by_status: Vec<StatusCount>,
    pub low_stock_products: Vec<Product>,
    pub recent_orders: Vec<Order>,
}

/// Summary of the caller's own orders
#[derive(Debug, Serialize, ToSchema)]
pub struct AgencyDashboard {
    pub total_orders: i64,
    pub open_orders: i64,
    pub total_spent_cents: i64,
    pub available_products: i64,
    pub orders_by_status: Vec<StatusCount>,
    pub recent_orders: Vec<Order>,
}

/// Fill in zero counts so every status is always present, in lifecycle order.
pub fn complete_status_counts(rows: Vec<(OrderStatus, i64)>) -> Vec<StatusCount> {
    OrderStatus::ALL
        .iter()
        .map(|status| StatusCount {
            status: *status,
            count: rows
                .iter()
                .find(|(s, _)| s == status)
                .map(|(_, c)| *c)
                .unwrap_or(0),
        })
        .collect()
}

pub struct DashboardService {
    db: PgPool,
}

impl DashboardService {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    pub async fn admin_summary(&self) -> Result<AdminDashboard> {
        let (total_products, active_products, low_stock_count): (i64, i64, i64) = sqlx::query_as(
            r#"
            SELECT
                COUNT(*),
                COUNT(*) FILTER (WHERE is_active),
                COUNT(*) FILTER (WHERE is_active AND stock_quantity <= reorder_level)
            FROM products
            "#,
        )
        .fetch_one(&self.db)
        .await?;

        let (total_projects, active_projects): (i64, i64) = sqlx::query_as(
            "SELECT COUNT(*), COUNT(*) FILTER (WHERE status = 'active') FROM projects",
        )
        .fetch_one(&self.db)
        .await?;

        let total_users: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users")
            .fetch_one(&self.db)
            .await?;

        let order_value_cents: i64 = sqlx::query_scalar(
            "SELECT COALESCE(SUM(total_cents), 0)::BIGINT FROM orders WHERE status <> 'cancelled'",
        )
        .fetch_one(&self.db)
        .await?;

        let status_rows: Vec<(OrderStatus, i64)> =
            sqlx::query_as("SELECT status, COUNT(*) FROM orders GROUP BY status")
                .fetch_all(&self.db)
                .await?;
        let orders_by_status = complete_status_counts(status_rows);
        let total_orders = orders_by_status.iter().map(|s| s.count).sum();
        let pending_orders = count_for(&orders_by_status, OrderStatus::Pending);

        let low_stock_products: Vec<Product> = sqlx::query_as(&format!(
            r#"{PRODUCT_SELECT} {PRODUCT_FROM}
            WHERE p.is_active AND p.stock_quantity <= p.reorder_level
            ORDER BY p.stock_quantity, p.name
            LIMIT $1"#
        ))
        .bind(LOW_STOCK_LIMIT)
        .fetch_all(&self.db)
        .await?;

        let recent_orders: Vec<Order> =
            sqlx::query_as(&format!("{ORDER_SELECT} ORDER BY o.created_at DESC LIMIT $1"))
                .bind(RECENT_ORDERS)
                .fetch_all(&self.db)
                .await?;

        Ok(AdminDashboard {
            total_products,
            active_products,
            low_stock_count,
            total_projects,
            active_projects,
            total_users,
            total_orders,
            pending_orders,
            order_value_cents,
            orders_by_status,
            low_stock_products,
            recent_orders,
        })
    }

    pub async fn agency_summary(&self, user_id: Uuid) -> Result<AgencyDashboard> {
        let status_rows: Vec<(OrderStatus, i64)> = sqlx::query_as(
            "SELECT status, COUNT(*) FROM orders WHERE user_id = $1 GROUP BY status",
        )
        .bind(user_id)
        .fetch_all(&self.db)
        .await?;
        let orders_by_status = complete_status_counts(status_rows);
        let total_orders = orders_by_status.iter().map(|s| s.count).sum();
        let open_orders = orders_by_status
            .iter()
            .filter(|s| !s.status.is_terminal())
            .map(|s| s.count)
            .sum();

        let total_spent_cents: i64 = sqlx::query_scalar(
            r#"
            SELECT COALESCE(SUM(total_cents), 0)::BIGINT
            FROM orders
            WHERE user_id = $1 AND status <> 'cancelled'
            "#,
        )
        .bind(user_id)
        .fetch_one(&self.db)
        .await?;

        let available_products: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM products WHERE is_active AND stock_quantity > 0",
        )
        .fetch_one(&self.db)
        .await?;

        let recent_orders: Vec<Order> = sqlx::query_as(&format!(
            "{ORDER_SELECT} WHERE o.user_id = $1 ORDER BY o.created_at DESC LIMIT $2"
        ))
        .bind(user_id)
        .bind(RECENT_ORDERS)
        .fetch_all(&self.db)
        .await?;

        Ok(AgencyDashboard {
            total_orders,
            open_orders,
            total_spent_cents,
            available_products,
            orders_by_status,
            recent_orders,
        })
    }
}

fn count_for(counts: &[StatusCount], status: OrderStatus) -> i64 {
    counts
        .iter()
        .find(|c| c.status == status)
        .map(|c| c.count)
        .unwrap_or(0)
}
