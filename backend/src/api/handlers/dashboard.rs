//! Dashboard handler.

use axum::{
    extract::{Extension, State},
    routing::get,
    Json, Router,
};
use serde::Serialize;
use utoipa::{OpenApi, ToSchema};

use crate::api::middleware::auth::AuthExtension;
use crate::api::SharedState;
use crate::error::Result;
use crate::services::dashboard_service::{AdminDashboard, AgencyDashboard, StatusCount};

pub fn router() -> Router<SharedState> {
    Router::new().route("/", get(get_dashboard))
}

/// Summary for the caller's role
#[derive(Debug, Serialize, ToSchema)]
#[serde(untagged)]
pub enum DashboardResponse {
    Admin(AdminDashboard),
    Agency(AgencyDashboard),
}

/// Dashboard summary
#[utoipa::path(
    get,
    path = "",
    context_path = "/api/v1/dashboard",
    tag = "dashboard",
    responses((status = 200, description = "Admin or agency summary", body = DashboardResponse)),
    security(("bearer_auth" = []))
)]
pub async fn get_dashboard(
    State(state): State<SharedState>,
    Extension(auth): Extension<AuthExtension>,
) -> Result<Json<DashboardResponse>> {
    let service = state.dashboard_service();
    let response = if auth.is_admin() {
        DashboardResponse::Admin(service.admin_summary().await?)
    } else {
        DashboardResponse::Agency(service.agency_summary(auth.user_id).await?)
    };
    Ok(Json(response))
}

#[derive(OpenApi)]
#[openapi(
    paths(get_dashboard),
    components(schemas(DashboardResponse, AdminDashboard, AgencyDashboard, StatusCount))
)]
pub struct DashboardApiDoc;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::order::OrderStatus;

    #[test]
    fn test_agency_view_serializes_flat() {
        let response = DashboardResponse::Agency(AgencyDashboard {
            total_orders: 3,
            open_orders: 1,
            total_spent_cents: 12_500,
            available_products: 40,
            orders_by_status: vec![StatusCount {
                status: OrderStatus::Pending,
                count: 1,
            }],
            recent_orders: vec![],
        });
        let json = serde_json::to_value(&response).unwrap();
        assert!(json.get("low_stock_products").is_none());
        assert_eq!(json["total_spent_cents"], 12500);
        assert_eq!(json["orders_by_status"][0]["status"], "pending");
    }
}
