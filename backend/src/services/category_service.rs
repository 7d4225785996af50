//! Catalog categories.

use serde::Deserialize;
use sqlx::PgPool;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::db::map_constraint_error;
use crate::error::{AppError, Result};
use crate::models::product::Category;

const CATEGORY_CONSTRAINTS: &[(&str, &str)] =
    &[("categories_name_key", "Category name already exists")];

const CATEGORY_SELECT: &str = r#"
    SELECT c.id, c.name, c.description,
           (SELECT COUNT(*) FROM products p WHERE p.category_id = c.id) AS product_count,
           c.created_at
    FROM categories c
"#;

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct CategoryInput {
    pub name: String,
    pub description: Option<String>,
}

pub struct CategoryService {
    db: PgPool,
}

impl CategoryService {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    pub async fn list(&self) -> Result<Vec<Category>> {
        let categories = sqlx::query_as(&format!("{CATEGORY_SELECT} ORDER BY c.name"))
            .fetch_all(&self.db)
            .await?;
        Ok(categories)
    }

    pub async fn get(&self, id: Uuid) -> Result<Category> {
        sqlx::query_as(&format!("{CATEGORY_SELECT} WHERE c.id = $1"))
            .bind(id)
            .fetch_optional(&self.db)
            .await?
            .ok_or_else(|| AppError::NotFound("Category not found".to_string()))
    }

    pub async fn create(&self, input: &CategoryInput) -> Result<Category> {
        let id: Uuid = sqlx::query_scalar(
            "INSERT INTO categories (name, description) VALUES ($1, $2) RETURNING id",
        )
        .bind(input.name.trim())
        .bind(&input.description)
        .fetch_one(&self.db)
        .await
        .map_err(|e| map_constraint_error(e, CATEGORY_CONSTRAINTS))?;

        self.get(id).await
    }

    pub async fn update(&self, id: Uuid, input: &CategoryInput) -> Result<Category> {
        let result = sqlx::query("UPDATE categories SET name = $2, description = $3 WHERE id = $1")
            .bind(id)
            .bind(input.name.trim())
            .bind(&input.description)
            .execute(&self.db)
            .await
            .map_err(|e| map_constraint_error(e, CATEGORY_CONSTRAINTS))?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("Category not found".to_string()));
        }
        self.get(id).await
    }

    pub async fn delete(&self, id: Uuid) -> Result<()> {
        let in_use: bool =
            sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM products WHERE category_id = $1)")
                .bind(id)
                .fetch_one(&self.db)
                .await?;
        if in_use {
            return Err(AppError::BusinessRule(
                "Category has products and cannot be deleted".to_string(),
            ));
        }

        let result = sqlx::query("DELETE FROM categories WHERE id = $1")
            .bind(id)
            .execute(&self.db)
            .await
            .map_err(|e| map_constraint_error(e, &[]))?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("Category not found".to_string()));
        }
        Ok(())
    }
}
