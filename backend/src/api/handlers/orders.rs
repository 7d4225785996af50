//! Order handlers.
//!
//! Agencies place orders and see only their own; admins see every order and
//! drive it through its lifecycle.

use axum::{
    extract::{Extension, Path, Query, State},
    http::StatusCode,
    routing::{get, patch},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, OpenApi, ToSchema};
use uuid::Uuid;

use crate::api::dto::{Pagination, PaginationQuery};
use crate::api::middleware::auth::AuthExtension;
use crate::api::validation::{ApiJson, Validator};
use crate::api::SharedState;
use crate::error::Result;
use crate::models::order::{Order, OrderDetail, OrderItem, OrderStatus};
use crate::services::order_service::{Actor, NewOrder, OrderFilter, OrderLineInput};

/// Most distinct lines accepted in one order.
const MAX_ORDER_LINES: usize = 200;

pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/", get(list_orders).post(create_order))
        .route("/:id", get(get_order))
        .route("/:id/status", patch(update_order_status))
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ListOrdersQuery {
    pub status: Option<OrderStatus>,
    /// Admin only; ignored for agencies
    pub user_id: Option<Uuid>,
    pub project_id: Option<Uuid>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct OrderListResponse {
    pub items: Vec<Order>,
    pub pagination: Pagination,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateOrderStatusRequest {
    pub status: OrderStatus,
    pub note: Option<String>,
}

fn actor(auth: &AuthExtension) -> Actor {
    Actor {
        user_id: auth.user_id,
        is_admin: auth.is_admin(),
    }
}

fn validate_new_order(input: &NewOrder) -> Result<()> {
    let mut v = Validator::new();
    v.check(!input.items.is_empty(), "items", "must contain at least one item")
        .check(
            input.items.len() <= MAX_ORDER_LINES,
            "items",
            "contains too many lines",
        )
        .optional_text("shipping_address", input.shipping_address.as_deref(), 1000)
        .optional_text("notes", input.notes.as_deref(), 2000);
    for (i, item) in input.items.iter().enumerate() {
        v.positive(&format!("items[{}].quantity", i), i64::from(item.quantity));
    }
    v.finish()
}

/// Place an order
#[utoipa::path(
    post,
    path = "",
    context_path = "/api/v1/orders",
    tag = "orders",
    request_body = NewOrder,
    responses(
        (status = 201, description = "Order placed", body = OrderDetail),
        (status = 400, description = "Invalid items, inactive product or insufficient stock", body = crate::api::openapi::ErrorResponse),
        (status = 404, description = "Product or project not found", body = crate::api::openapi::ErrorResponse),
    ),
    security(("bearer_auth" = []))
)]
pub async fn create_order(
    State(state): State<SharedState>,
    Extension(auth): Extension<AuthExtension>,
    ApiJson(payload): ApiJson<NewOrder>,
) -> Result<(StatusCode, Json<OrderDetail>)> {
    validate_new_order(&payload)?;
    let order = state
        .order_service()
        .create(auth.user_id, &payload)
        .await?;
    Ok((StatusCode::CREATED, Json(order)))
}

/// List orders
#[utoipa::path(
    get,
    path = "",
    context_path = "/api/v1/orders",
    tag = "orders",
    params(ListOrdersQuery, PaginationQuery),
    responses((status = 200, description = "Orders, newest first", body = OrderListResponse)),
    security(("bearer_auth" = []))
)]
pub async fn list_orders(
    State(state): State<SharedState>,
    Extension(auth): Extension<AuthExtension>,
    Query(query): Query<ListOrdersQuery>,
    Query(page): Query<PaginationQuery>,
) -> Result<Json<OrderListResponse>> {
    let filter = OrderFilter {
        status: query.status,
        user_id: query.user_id,
        project_id: query.project_id,
    };
    let (items, total) = state
        .order_service()
        .list(actor(&auth), &filter, page.offset(), page.limit())
        .await?;

    Ok(Json(OrderListResponse {
        items,
        pagination: Pagination::from_query_and_total(&page, total),
    }))
}

/// Get an order with its lines
#[utoipa::path(
    get,
    path = "/{id}",
    context_path = "/api/v1/orders",
    tag = "orders",
    params(("id" = Uuid, Path, description = "Order ID")),
    responses(
        (status = 200, description = "Order", body = OrderDetail),
        (status = 404, description = "Order not found", body = crate::api::openapi::ErrorResponse),
    ),
    security(("bearer_auth" = []))
)]
pub async fn get_order(
    State(state): State<SharedState>,
    Extension(auth): Extension<AuthExtension>,
    Path(id): Path<Uuid>,
) -> Result<Json<OrderDetail>> {
    Ok(Json(state.order_service().get(id, actor(&auth)).await?))
}

/// Change order status
#[utoipa::path(
    patch,
    path = "/{id}/status",
    context_path = "/api/v1/orders",
    tag = "orders",
    params(("id" = Uuid, Path, description = "Order ID")),
    request_body = UpdateOrderStatusRequest,
    responses(
        (status = 200, description = "Status changed", body = OrderDetail),
        (status = 400, description = "Transition not allowed", body = crate::api::openapi::ErrorResponse),
        (status = 403, description = "Agencies may only cancel their own pending orders", body = crate::api::openapi::ErrorResponse),
        (status = 404, description = "Order not found", body = crate::api::openapi::ErrorResponse),
    ),
    security(("bearer_auth" = []))
)]
pub async fn update_order_status(
    State(state): State<SharedState>,
    Extension(auth): Extension<AuthExtension>,
    Path(id): Path<Uuid>,
    ApiJson(payload): ApiJson<UpdateOrderStatusRequest>,
) -> Result<Json<OrderDetail>> {
    Validator::new()
        .optional_text("note", payload.note.as_deref(), 1000)
        .finish()?;

    let note = payload.note.as_deref().map(str::trim).filter(|n| !n.is_empty());
    let order = state
        .order_service()
        .update_status(id, actor(&auth), payload.status, note)
        .await?;
    Ok(Json(order))
}

#[derive(OpenApi)]
#[openapi(
    paths(create_order, list_orders, get_order, update_order_status),
    components(schemas(
        Order,
        OrderItem,
        OrderDetail,
        OrderStatus,
        NewOrder,
        OrderLineInput,
        OrderListResponse,
        UpdateOrderStatusRequest,
    ))
)]
pub struct OrdersApiDoc;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AppError;

    fn order(items: Vec<OrderLineInput>) -> NewOrder {
        NewOrder {
            project_id: None,
            shipping_address: Some("Depot 4".into()),
            notes: None,
            items,
        }
    }

    #[test]
    fn test_empty_order_rejected() {
        match validate_new_order(&order(vec![])) {
            Err(AppError::InvalidInput(errors)) => assert_eq!(errors[0].field, "items"),
            other => panic!("expected field errors, got {other:?}"),
        }
    }

    #[test]
    fn test_non_positive_quantities_named_by_index() {
        let items = vec![
            OrderLineInput {
                product_id: Uuid::new_v4(),
                quantity: 2,
            },
            OrderLineInput {
                product_id: Uuid::new_v4(),
                quantity: 0,
            },
        ];
        match validate_new_order(&order(items)) {
            Err(AppError::InvalidInput(errors)) => {
                assert_eq!(errors.len(), 1);
                assert_eq!(errors[0].field, "items[1].quantity");
            }
            other => panic!("expected field errors, got {other:?}"),
        }
    }

    #[test]
    fn test_status_request_parses_lowercase() {
        let req: UpdateOrderStatusRequest =
            serde_json::from_str(r#"{"status": "cancelled", "note": "Duplicate"}"#).unwrap();
        assert_eq!(req.status, OrderStatus::Cancelled);
        assert!(serde_json::from_str::<UpdateOrderStatusRequest>(r#"{"status": "lost"}"#).is_err());
    }
}
