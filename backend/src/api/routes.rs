//! Route definitions for the API.

use std::sync::Arc;

use axum::{extract::DefaultBodyLimit, middleware, routing::get, Router};
use tower_http::services::{ServeDir, ServeFile};
use utoipa_swagger_ui::SwaggerUi;

use super::handlers;
use super::middleware::auth::{admin_middleware, auth_middleware};
use super::middleware::rate_limit::{rate_limit_middleware, RateLimiter};
use super::middleware::security_headers::security_headers_middleware;
use super::middleware::tracing::correlation_id_middleware;
use super::SharedState;

/// JSON bodies are small; anything larger is rejected up front.
const BODY_LIMIT_BYTES: usize = 1024 * 1024;

/// Create the main application router
pub fn create_router(state: SharedState) -> Router {
    let openapi = super::openapi::build_openapi();

    let mut router = Router::new()
        // Health endpoints (no auth required)
        .route("/health", get(handlers::health::health_check))
        .route("/ready", get(handlers::health::readiness_check))
        .merge(SwaggerUi::new("/swagger-ui").url("/api/v1/openapi.json", openapi))
        .nest("/api/v1", api_v1_routes(&state));

    // Built frontend bundle, with index.html for client-side routes
    if let Some(dir) = state.config.static_dir.as_deref() {
        tracing::info!(static_dir = %dir, "Serving frontend bundle");
        let index = std::path::Path::new(dir).join("index.html");
        router = router.fallback_service(ServeDir::new(dir).fallback(ServeFile::new(index)));
    }

    router
        .layer(DefaultBodyLimit::max(BODY_LIMIT_BYTES))
        .layer(middleware::from_fn(security_headers_middleware))
        .layer(middleware::from_fn(correlation_id_middleware))
        .with_state(state)
}

/// API v1 routes
fn api_v1_routes(state: &SharedState) -> Router<SharedState> {
    let auth_service = Arc::new(state.auth_service());

    // Credential endpoints: 30 requests per minute per client address
    let auth_rate_limiter = Arc::new(RateLimiter::new(30, 60));

    let authenticated = middleware::from_fn_with_state(auth_service.clone(), auth_middleware);
    let admin_only = middleware::from_fn_with_state(auth_service.clone(), admin_middleware);

    Router::new()
        .nest(
            "/auth",
            handlers::auth::public_router().layer(middleware::from_fn_with_state(
                auth_rate_limiter,
                rate_limit_middleware,
            )),
        )
        .nest(
            "/auth",
            handlers::auth::protected_router().layer(authenticated.clone()),
        )
        .nest("/users", handlers::users::router().layer(admin_only))
        .nest(
            "/projects",
            handlers::projects::router().layer(authenticated.clone()),
        )
        .nest(
            "/categories",
            handlers::categories::router().layer(authenticated.clone()),
        )
        .nest(
            "/products",
            handlers::products::router().layer(authenticated.clone()),
        )
        .nest(
            "/orders",
            handlers::orders::router().layer(authenticated.clone()),
        )
        .nest(
            "/dashboard",
            handlers::dashboard::router().layer(authenticated),
        )
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{header, Request, StatusCode};
    use sqlx::postgres::PgPoolOptions;
    use tower::ServiceExt;
    use uuid::Uuid;

    use crate::api::AppState;
    use crate::config::Config;
    use crate::models::user::{User, UserRole};

    /// State whose pool never connects unless a handler reaches the database.
    fn state() -> SharedState {
        let config = Config::for_tests();
        let pool = PgPoolOptions::new()
            .connect_lazy(&config.database_url)
            .unwrap();
        Arc::new(AppState::new(config, pool))
    }

    fn bearer(state: &SharedState, role: UserRole) -> String {
        let now = chrono::Utc::now();
        let user = User {
            id: Uuid::new_v4(),
            username: "tester".to_string(),
            email: "tester@depot.example".to_string(),
            password_hash: String::new(),
            full_name: None,
            role,
            agency_name: Some("Field Office".to_string()),
            is_active: true,
            last_login_at: None,
            created_at: now,
            updated_at: now,
        };
        let tokens = state.auth_service().generate_tokens(&user).unwrap();
        format!("Bearer {}", tokens.access_token)
    }

    async fn send(
        app: Router,
        method: &str,
        uri: &str,
        token: Option<&str>,
        body: Option<&str>,
    ) -> (StatusCode, axum::http::HeaderMap, serde_json::Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(t) = token {
            builder = builder.header(header::AUTHORIZATION, t);
        }
        let body = match body {
            Some(b) => {
                builder = builder.header(header::CONTENT_TYPE, "application/json");
                Body::from(b.to_string())
            }
            None => Body::empty(),
        };
        let response = app.oneshot(builder.body(body).unwrap()).await.unwrap();
        let status = response.status();
        let headers = response.headers().clone();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json = serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null);
        (status, headers, json)
    }

    #[tokio::test]
    async fn test_orders_require_token() {
        let (status, _, json) = send(
            create_router(state()),
            "GET",
            "/api/v1/orders",
            None,
            None,
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(json["code"], "AUTH_ERROR");
    }

    #[tokio::test]
    async fn test_users_forbidden_for_agency() {
        let state = state();
        let token = bearer(&state, UserRole::Agency);
        let (status, _, _) = send(
            create_router(state),
            "GET",
            "/api/v1/users",
            Some(&token),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_empty_order_is_bad_request() {
        let state = state();
        let token = bearer(&state, UserRole::Agency);
        let (status, _, json) = send(
            create_router(state),
            "POST",
            "/api/v1/orders",
            Some(&token),
            Some(r#"{"items": []}"#),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["errors"][0]["field"], "items");
    }

    #[tokio::test]
    async fn test_malformed_json_lists_body_error() {
        let state = state();
        let token = bearer(&state, UserRole::Agency);
        let (status, _, json) = send(
            create_router(state),
            "POST",
            "/api/v1/orders",
            Some(&token),
            Some("{not json"),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["errors"][0]["field"], "body");
    }

    #[tokio::test]
    async fn test_negative_price_rejected_for_admin() {
        let state = state();
        let token = bearer(&state, UserRole::Admin);
        let body = r#"{"sku": "MRE-12", "name": "Ration pack", "unit_price_cents": -5}"#;
        let (status, _, json) = send(
            create_router(state),
            "POST",
            "/api/v1/products",
            Some(&token),
            Some(body),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        let fields: Vec<&str> = json["errors"]
            .as_array()
            .unwrap()
            .iter()
            .filter_map(|e| e["field"].as_str())
            .collect();
        assert!(fields.contains(&"unit_price_cents"));
    }

    #[tokio::test]
    async fn test_agency_cannot_create_product() {
        let state = state();
        let token = bearer(&state, UserRole::Agency);
        let body = r#"{"sku": "MRE-12", "name": "Ration pack", "unit_price_cents": 500}"#;
        let (status, _, _) = send(
            create_router(state),
            "POST",
            "/api/v1/products",
            Some(&token),
            Some(body),
        )
        .await;
        assert_eq!(status, StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_responses_carry_security_headers() {
        let (_, headers, _) = send(
            create_router(state()),
            "GET",
            "/api/v1/dashboard",
            None,
            None,
        )
        .await;
        assert_eq!(headers["x-content-type-options"], "nosniff");
        assert!(headers.contains_key("x-correlation-id"));
    }

    #[tokio::test]
    async fn test_openapi_document_served() {
        let (status, _, json) = send(
            create_router(state()),
            "GET",
            "/api/v1/openapi.json",
            None,
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["info"]["title"], "Supply Depot API");
    }
}
