//! Database models (SQLx).

pub mod inventory;
pub mod order;
pub mod product;
pub mod project;
pub mod user;
