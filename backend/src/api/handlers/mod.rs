//! HTTP request handlers.

pub mod auth;
pub mod categories;
pub mod dashboard;
pub mod health;
pub mod orders;
pub mod products;
pub mod projects;
pub mod users;
