//! API module - HTTP handlers and middleware.

pub mod dto;
pub mod handlers;
pub mod middleware;
pub mod openapi;
pub mod routes;
pub mod validation;

use std::sync::Arc;

use sqlx::PgPool;

use crate::config::Config;
use crate::services::auth_service::AuthService;
use crate::services::category_service::CategoryService;
use crate::services::dashboard_service::DashboardService;
use crate::services::order_service::OrderService;
use crate::services::product_service::ProductService;
use crate::services::project_service::ProjectService;
use crate::services::user_service::UserService;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub db: PgPool,
}

impl AppState {
    pub fn new(config: Config, db: PgPool) -> Self {
        Self {
            config: Arc::new(config),
            db,
        }
    }

    pub fn auth_service(&self) -> AuthService {
        AuthService::new(self.db.clone(), self.config.clone())
    }

    pub fn user_service(&self) -> UserService {
        UserService::new(self.db.clone())
    }

    pub fn project_service(&self) -> ProjectService {
        ProjectService::new(self.db.clone())
    }

    pub fn category_service(&self) -> CategoryService {
        CategoryService::new(self.db.clone())
    }

    /// Product service using the configured default reorder level.
    pub fn product_service(&self) -> ProductService {
        ProductService::new(self.db.clone(), self.config.default_reorder_level)
    }

    pub fn order_service(&self) -> OrderService {
        OrderService::new(self.db.clone())
    }

    pub fn dashboard_service(&self) -> DashboardService {
        DashboardService::new(self.db.clone())
    }
}

pub type SharedState = Arc<AppState>;
