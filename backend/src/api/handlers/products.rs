//! Product catalog handlers.
//!
//! Every signed-in user can browse the catalog; agencies only ever see
//! active products. Catalog changes, stock adjustments and the stock ledger
//! are admin only.

use axum::{
    extract::{Extension, Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, OpenApi, ToSchema};
use uuid::Uuid;

use crate::api::dto::{Pagination, PaginationQuery};
use crate::api::middleware::auth::AuthExtension;
use crate::api::validation::{ApiJson, Validator};
use crate::api::SharedState;
use crate::error::{AppError, Result};
use crate::models::inventory::{InventoryTransaction, TransactionKind};
use crate::models::product::Product;
use crate::services::product_service::{NewProduct, ProductFilter, ProductInput, StockAdjustment};

pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/", get(list_products).post(create_product))
        .route(
            "/:id",
            get(get_product).put(update_product).delete(delete_product),
        )
        .route("/:id/stock", post(adjust_stock))
        .route("/:id/transactions", get(list_transactions))
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ListProductsQuery {
    /// Matches SKU, name or description
    pub search: Option<String>,
    pub category_id: Option<Uuid>,
    pub project_id: Option<Uuid>,
    /// Only products with stock on hand
    pub in_stock: Option<bool>,
    /// Only products at or below their reorder level
    pub low_stock: Option<bool>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ProductListResponse {
    pub items: Vec<Product>,
    pub pagination: Pagination,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct TransactionListResponse {
    pub items: Vec<InventoryTransaction>,
    pub pagination: Pagination,
}

fn check_product_fields(v: &mut Validator, input: &ProductInput) {
    v.text("sku", &input.sku, 64)
        .text("name", &input.name, 200)
        .text("unit", &input.unit, 32)
        .optional_text("description", input.description.as_deref(), 4000)
        .non_negative("unit_price_cents", input.unit_price_cents);
    if let Some(level) = input.reorder_level {
        v.non_negative("reorder_level", i64::from(level));
    }
}

fn validate_new_product(input: &NewProduct) -> Result<()> {
    let mut v = Validator::new();
    check_product_fields(&mut v, &input.product);
    v.non_negative("initial_stock", i64::from(input.initial_stock));
    v.finish()
}

fn validate_product(input: &ProductInput) -> Result<()> {
    let mut v = Validator::new();
    check_product_fields(&mut v, input);
    v.finish()
}

fn validate_adjustment(input: &StockAdjustment) -> Result<()> {
    Validator::new()
        .check(input.quantity_change != 0, "quantity_change", "must not be zero")
        .optional_text("note", input.note.as_deref(), 500)
        .finish()
}

/// List products
#[utoipa::path(
    get,
    path = "",
    context_path = "/api/v1/products",
    tag = "products",
    params(ListProductsQuery, PaginationQuery),
    responses((status = 200, description = "Products", body = ProductListResponse)),
    security(("bearer_auth" = []))
)]
pub async fn list_products(
    State(state): State<SharedState>,
    Extension(auth): Extension<AuthExtension>,
    Query(query): Query<ListProductsQuery>,
    Query(page): Query<PaginationQuery>,
) -> Result<Json<ProductListResponse>> {
    let filter = ProductFilter {
        search: query.search.filter(|s| !s.trim().is_empty()),
        category_id: query.category_id,
        project_id: query.project_id,
        in_stock: query.in_stock,
        low_stock: query.low_stock,
        active_only: !auth.is_admin(),
    };
    let (items, total) = state
        .product_service()
        .list(&filter, page.offset(), page.limit())
        .await?;

    Ok(Json(ProductListResponse {
        items,
        pagination: Pagination::from_query_and_total(&page, total),
    }))
}

/// Get product by ID
#[utoipa::path(
    get,
    path = "/{id}",
    context_path = "/api/v1/products",
    tag = "products",
    params(("id" = Uuid, Path, description = "Product ID")),
    responses(
        (status = 200, description = "Product", body = Product),
        (status = 404, description = "Product not found", body = crate::api::openapi::ErrorResponse),
    ),
    security(("bearer_auth" = []))
)]
pub async fn get_product(
    State(state): State<SharedState>,
    Extension(auth): Extension<AuthExtension>,
    Path(id): Path<Uuid>,
) -> Result<Json<Product>> {
    let product = state.product_service().get(id).await?;
    if !product.is_active && !auth.is_admin() {
        return Err(AppError::NotFound("Product not found".to_string()));
    }
    Ok(Json(product))
}

/// Create product
#[utoipa::path(
    post,
    path = "",
    context_path = "/api/v1/products",
    tag = "products",
    request_body = NewProduct,
    responses(
        (status = 201, description = "Product created", body = Product),
        (status = 400, description = "Validation error or duplicate SKU", body = crate::api::openapi::ErrorResponse),
        (status = 403, description = "Admin access required", body = crate::api::openapi::ErrorResponse),
    ),
    security(("bearer_auth" = []))
)]
pub async fn create_product(
    State(state): State<SharedState>,
    Extension(auth): Extension<AuthExtension>,
    ApiJson(payload): ApiJson<NewProduct>,
) -> Result<(StatusCode, Json<Product>)> {
    auth.require_admin()?;
    validate_new_product(&payload)?;
    let product = state
        .product_service()
        .create(&payload, auth.user_id)
        .await?;
    Ok((StatusCode::CREATED, Json(product)))
}

/// Update product
#[utoipa::path(
    put,
    path = "/{id}",
    context_path = "/api/v1/products",
    tag = "products",
    params(("id" = Uuid, Path, description = "Product ID")),
    request_body = ProductInput,
    responses(
        (status = 200, description = "Product updated", body = Product),
        (status = 400, description = "Validation error or duplicate SKU", body = crate::api::openapi::ErrorResponse),
        (status = 404, description = "Product not found", body = crate::api::openapi::ErrorResponse),
    ),
    security(("bearer_auth" = []))
)]
pub async fn update_product(
    State(state): State<SharedState>,
    Extension(auth): Extension<AuthExtension>,
    Path(id): Path<Uuid>,
    ApiJson(payload): ApiJson<ProductInput>,
) -> Result<Json<Product>> {
    auth.require_admin()?;
    validate_product(&payload)?;
    Ok(Json(state.product_service().update(id, &payload).await?))
}

/// Delete product
#[utoipa::path(
    delete,
    path = "/{id}",
    context_path = "/api/v1/products",
    tag = "products",
    params(("id" = Uuid, Path, description = "Product ID")),
    responses(
        (status = 204, description = "Product deleted"),
        (status = 400, description = "Product appears on orders", body = crate::api::openapi::ErrorResponse),
        (status = 404, description = "Product not found", body = crate::api::openapi::ErrorResponse),
    ),
    security(("bearer_auth" = []))
)]
pub async fn delete_product(
    State(state): State<SharedState>,
    Extension(auth): Extension<AuthExtension>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode> {
    auth.require_admin()?;
    state.product_service().delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Adjust stock manually
#[utoipa::path(
    post,
    path = "/{id}/stock",
    context_path = "/api/v1/products",
    tag = "products",
    params(("id" = Uuid, Path, description = "Product ID")),
    request_body = StockAdjustment,
    responses(
        (status = 200, description = "Stock adjusted", body = Product),
        (status = 400, description = "Adjustment would make stock negative", body = crate::api::openapi::ErrorResponse),
        (status = 404, description = "Product not found", body = crate::api::openapi::ErrorResponse),
    ),
    security(("bearer_auth" = []))
)]
pub async fn adjust_stock(
    State(state): State<SharedState>,
    Extension(auth): Extension<AuthExtension>,
    Path(id): Path<Uuid>,
    ApiJson(payload): ApiJson<StockAdjustment>,
) -> Result<Json<Product>> {
    auth.require_admin()?;
    validate_adjustment(&payload)?;
    let product = state
        .product_service()
        .adjust_stock(id, &payload, auth.user_id)
        .await?;
    Ok(Json(product))
}

/// Stock ledger for a product
#[utoipa::path(
    get,
    path = "/{id}/transactions",
    context_path = "/api/v1/products",
    tag = "products",
    params(("id" = Uuid, Path, description = "Product ID"), PaginationQuery),
    responses(
        (status = 200, description = "Ledger entries, newest first", body = TransactionListResponse),
        (status = 404, description = "Product not found", body = crate::api::openapi::ErrorResponse),
    ),
    security(("bearer_auth" = []))
)]
pub async fn list_transactions(
    State(state): State<SharedState>,
    Extension(auth): Extension<AuthExtension>,
    Path(id): Path<Uuid>,
    Query(page): Query<PaginationQuery>,
) -> Result<Json<TransactionListResponse>> {
    auth.require_admin()?;
    let (items, total) = state
        .product_service()
        .transactions(id, page.offset(), page.limit())
        .await?;

    Ok(Json(TransactionListResponse {
        items,
        pagination: Pagination::from_query_and_total(&page, total),
    }))
}

#[derive(OpenApi)]
#[openapi(
    paths(
        list_products,
        get_product,
        create_product,
        update_product,
        delete_product,
        adjust_stock,
        list_transactions,
    ),
    components(schemas(
        Product,
        ProductInput,
        NewProduct,
        StockAdjustment,
        ProductListResponse,
        InventoryTransaction,
        TransactionKind,
        TransactionListResponse,
    ))
)]
pub struct ProductsApiDoc;

#[cfg(test)]
mod tests {
    use super::*;

    fn product_json(extra: &str) -> String {
        format!(
            r#"{{"sku": "TENT-4P", "name": "Four-person tent", "unit_price_cents": 24999{extra}}}"#
        )
    }

    #[test]
    fn test_new_product_defaults() {
        let input: NewProduct = serde_json::from_str(&product_json("")).unwrap();
        assert_eq!(input.product.unit, "each");
        assert!(input.product.is_active);
        assert_eq!(input.initial_stock, 0);
        assert!(validate_new_product(&input).is_ok());
    }

    #[test]
    fn test_negative_price_and_stock_rejected() {
        let input: NewProduct = serde_json::from_str(
            r#"{"sku": "TENT-4P", "name": "Tent", "unit_price_cents": -5, "initial_stock": -1}"#,
        )
        .unwrap();
        match validate_new_product(&input) {
            Err(AppError::InvalidInput(errors)) => {
                let fields: Vec<_> = errors.iter().map(|e| e.field.as_str()).collect();
                assert_eq!(fields, vec!["unit_price_cents", "initial_stock"]);
            }
            other => panic!("expected field errors, got {other:?}"),
        }
    }

    #[test]
    fn test_zero_adjustment_rejected() {
        let adj = StockAdjustment {
            quantity_change: 0,
            note: None,
        };
        assert!(validate_adjustment(&adj).is_err());

        let restock = StockAdjustment {
            quantity_change: 40,
            note: Some("Quarterly delivery".into()),
        };
        assert!(validate_adjustment(&restock).is_ok());
    }
}
