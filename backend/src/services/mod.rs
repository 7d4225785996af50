//! Business logic services.

pub mod auth_service;
pub mod category_service;
pub mod dashboard_service;
pub mod order_service;
pub mod product_service;
pub mod project_service;
pub mod user_service;
