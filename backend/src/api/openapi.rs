//! OpenAPI specification generated from handler annotations via utoipa.

use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

use crate::error::FieldError;

/// Root OpenAPI document for the Supply Depot API.
///
/// Each handler module contributes its own `XxxApiDoc`, merged in
/// [`build_openapi`].
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Supply Depot API",
        description = "Inventory and order management for agency supply requests.",
        version = "0.1.0",
    ),
    servers((url = "/", description = "Current server")),
    modifiers(&SecurityAddon),
    tags(
        (name = "auth", description = "Login, tokens and the caller's profile"),
        (name = "users", description = "User administration"),
        (name = "projects", description = "Projects that products and orders belong to"),
        (name = "categories", description = "Catalog categories"),
        (name = "products", description = "Catalog, stock adjustments and stock ledger"),
        (name = "orders", description = "Order placement and status lifecycle"),
        (name = "dashboard", description = "Role-specific summaries"),
        (name = "health", description = "Health and readiness checks"),
    ),
    components(schemas(ErrorResponse, FieldError))
)]
pub struct ApiDoc;

/// Error body returned by every endpoint on failure.
#[derive(serde::Serialize, utoipa::ToSchema)]
pub struct ErrorResponse {
    /// Machine-readable error code (e.g. "NOT_FOUND", "VALIDATION_ERROR")
    pub code: String,
    /// Human-readable error message
    pub message: String,
    /// Per-field problems, present on validation failures
    pub errors: Option<Vec<FieldError>>,
}

/// Adds Bearer JWT security scheme to the OpenAPI spec.
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

/// Build the merged OpenAPI document from all handler modules.
pub fn build_openapi() -> utoipa::openapi::OpenApi {
    use super::handlers;

    let mut doc = ApiDoc::openapi();
    doc.merge(handlers::auth::AuthApiDoc::openapi());
    doc.merge(handlers::users::UsersApiDoc::openapi());
    doc.merge(handlers::projects::ProjectsApiDoc::openapi());
    doc.merge(handlers::categories::CategoriesApiDoc::openapi());
    doc.merge(handlers::products::ProductsApiDoc::openapi());
    doc.merge(handlers::orders::OrdersApiDoc::openapi());
    doc.merge(handlers::dashboard::DashboardApiDoc::openapi());
    doc.merge(handlers::health::HealthApiDoc::openapi());
    doc
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spec_json() -> serde_json::Value {
        serde_json::to_value(build_openapi()).unwrap()
    }

    #[test]
    fn test_openapi_contains_core_paths() {
        let json = spec_json();
        let paths = json["paths"].as_object().unwrap();
        for path in [
            "/api/v1/auth/login",
            "/api/v1/users/{id}/reset-password",
            "/api/v1/products/{id}/stock",
            "/api/v1/orders",
            "/api/v1/orders/{id}/status",
            "/api/v1/dashboard",
            "/health",
        ] {
            assert!(paths.contains_key(path), "missing path {path}");
        }
    }

    #[test]
    fn test_openapi_has_bearer_scheme() {
        let json = spec_json();
        assert_eq!(
            json["components"]["securitySchemes"]["bearer_auth"]["scheme"],
            "bearer"
        );
    }

    #[test]
    fn test_openapi_registers_error_schema() {
        let json = spec_json();
        assert!(json["components"]["schemas"]["ErrorResponse"].is_object());
        assert!(json["components"]["schemas"]["OrderDetail"].is_object());
    }
}
