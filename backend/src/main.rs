//! Supply Depot - Main Entry Point

use std::net::SocketAddr;
use std::sync::Arc;

use axum::http::{header, HeaderValue, Method};
use axum::Router;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;

use supply_depot_backend::{api, config::Config, db, error::Result, telemetry};

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Load configuration before tracing so the OTLP endpoint is known
    let config = Config::from_env()?;
    let _otel_guard = telemetry::init_tracing(config.otel_endpoint.as_deref(), "supply-depot");
    tracing::info!("Starting Supply Depot");
    tracing::debug!(?config, "Loaded configuration");

    // Connect to database
    let db_pool = db::create_pool(&config.database_url, config.db_max_connections).await?;
    tracing::info!("Connected to database");

    // Run migrations
    sqlx::migrate!("./migrations").run(&db_pool).await?;
    tracing::info!("Database migrations complete");

    let state = Arc::new(api::AppState::new(config.clone(), db_pool));

    // Provision admin user on first boot
    provision_admin_user(&state).await?;

    let app = Router::new()
        .merge(api::routes::create_router(state))
        .layer(cors_layer(&config.cors_origins))
        .layer(TraceLayer::new_for_http());

    // Start server
    let addr: SocketAddr = config.bind_address.parse()?;
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal(tokio::signal::ctrl_c()))
    .await?;

    tracing::info!("Server stopped");
    Ok(())
}

/// CORS for the configured origins, or any origin when none are listed.
fn cors_layer(origins: &[String]) -> CorsLayer {
    if origins.is_empty() {
        return CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any);
    }

    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(origin = %origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(allowed))
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION, header::ACCEPT])
}

/// Create the initial admin account when the database has none.
async fn provision_admin_user(state: &api::AppState) -> Result<()> {
    let config = &state.config;
    let generated = state
        .user_service()
        .ensure_admin(
            &config.admin_username,
            &config.admin_email,
            config.admin_password.as_deref(),
        )
        .await?;

    if let Some(password) = generated {
        tracing::warn!(
            "\n\
            ===========================================================\n\
            \n\
              Initial admin user created.\n\
            \n\
              Username:  {}\n\
              Password:  {}\n\
            \n\
              Set ADMIN_PASSWORD to choose it yourself, and change\n\
              this one via POST /api/v1/auth/change-password.\n\
            \n\
            ===========================================================",
            config.admin_username,
            password,
        );
    }
    Ok(())
}

/// Resolves when `signal` fires. Never resolves if the handler couldn't be
/// installed, so the server keeps running.
async fn shutdown_signal<F>(signal: F)
where
    F: std::future::Future<Output = std::io::Result<()>>,
{
    if let Err(e) = signal.await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_shutdown_waits_when_signal_handler_fails() {
        let failed = async { Err(std::io::Error::other("no signal handler")) };
        let waited = tokio::time::timeout(Duration::from_millis(50), shutdown_signal(failed)).await;
        assert!(waited.is_err());
    }

    #[tokio::test]
    async fn test_shutdown_resolves_on_signal() {
        let fired = async { Ok(()) };
        let waited = tokio::time::timeout(Duration::from_millis(50), shutdown_signal(fired)).await;
        assert!(waited.is_ok());
    }

    #[test]
    fn test_cors_skips_invalid_origins() {
        // Builds without panicking on a header-invalid origin
        let _ = cors_layer(&["https://depot.example".into(), "bad\norigin".into()]);
    }
}
