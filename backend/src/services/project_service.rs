//! Project management.

use chrono::NaiveDate;
use serde::Deserialize;
use sqlx::PgPool;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::db::map_constraint_error;
use crate::error::{AppError, Result};
use crate::models::project::{Project, ProjectStatus};

const PROJECT_CONSTRAINTS: &[(&str, &str)] = &[
    ("projects_code_key", "Project code already exists"),
    ("projects_dates_check", "End date must not precede start date"),
];

const PROJECT_SELECT: &str = r#"
    SELECT p.id, p.code, p.name, p.description, p.status, p.start_date, p.end_date,
           p.created_by,
           (SELECT COUNT(*) FROM products pr WHERE pr.project_id = p.id) AS product_count,
           p.created_at, p.updated_at
    FROM projects p
"#;

/// Fields for creating or replacing a project
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct ProjectInput {
    pub code: String,
    pub name: String,
    pub description: Option<String>,
    #[serde(default = "default_status")]
    pub status: ProjectStatus,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

fn default_status() -> ProjectStatus {
    ProjectStatus::Planning
}

/// Service for projects.
pub struct ProjectService {
    db: PgPool,
}

impl ProjectService {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    pub async fn list(
        &self,
        search: Option<&str>,
        status: Option<ProjectStatus>,
        offset: i64,
        limit: i64,
    ) -> Result<(Vec<Project>, i64)> {
        let search_pattern = search.map(|s| format!("%{}%", s.trim()));
        let where_clause = r#"
            WHERE ($1::text IS NULL OR p.code ILIKE $1 OR p.name ILIKE $1)
              AND ($2::project_status IS NULL OR p.status = $2)
        "#;

        let projects: Vec<Project> = sqlx::query_as(&format!(
            "{PROJECT_SELECT} {where_clause} ORDER BY p.created_at DESC OFFSET $3 LIMIT $4"
        ))
        .bind(&search_pattern)
        .bind(status)
        .bind(offset)
        .bind(limit)
        .fetch_all(&self.db)
        .await?;

        let total: i64 =
            sqlx::query_scalar(&format!("SELECT COUNT(*) FROM projects p {where_clause}"))
                .bind(&search_pattern)
                .bind(status)
                .fetch_one(&self.db)
                .await?;

        Ok((projects, total))
    }

    pub async fn get(&self, id: Uuid) -> Result<Project> {
        sqlx::query_as(&format!("{PROJECT_SELECT} WHERE p.id = $1"))
            .bind(id)
            .fetch_optional(&self.db)
            .await?
            .ok_or_else(|| AppError::NotFound("Project not found".to_string()))
    }

    pub async fn create(&self, input: &ProjectInput, created_by: Uuid) -> Result<Project> {
        let id: Uuid = sqlx::query_scalar(
            r#"
            INSERT INTO projects (code, name, description, status, start_date, end_date, created_by)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING id
            "#,
        )
        .bind(input.code.trim())
        .bind(input.name.trim())
        .bind(&input.description)
        .bind(input.status)
        .bind(input.start_date)
        .bind(input.end_date)
        .bind(created_by)
        .fetch_one(&self.db)
        .await
        .map_err(|e| map_constraint_error(e, PROJECT_CONSTRAINTS))?;

        tracing::info!(project_id = %id, code = %input.code, "Project created");
        self.get(id).await
    }

    pub async fn update(&self, id: Uuid, input: &ProjectInput) -> Result<Project> {
        let result = sqlx::query(
            r#"
            UPDATE projects
            SET code = $2, name = $3, description = $4, status = $5,
                start_date = $6, end_date = $7, updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(input.code.trim())
        .bind(input.name.trim())
        .bind(&input.description)
        .bind(input.status)
        .bind(input.start_date)
        .bind(input.end_date)
        .execute(&self.db)
        .await
        .map_err(|e| map_constraint_error(e, PROJECT_CONSTRAINTS))?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("Project not found".to_string()));
        }
        self.get(id).await
    }

    /// Delete a project that no product or order references.
    pub async fn delete(&self, id: Uuid) -> Result<()> {
        let (products, orders): (bool, bool) = sqlx::query_as(
            r#"
            SELECT
                EXISTS (SELECT 1 FROM products WHERE project_id = $1),
                EXISTS (SELECT 1 FROM orders WHERE project_id = $1)
            "#,
        )
        .bind(id)
        .fetch_one(&self.db)
        .await?;

        if products || orders {
            return Err(AppError::BusinessRule(
                "Project is referenced by products or orders and cannot be deleted".to_string(),
            ));
        }

        let result = sqlx::query("DELETE FROM projects WHERE id = $1")
            .bind(id)
            .execute(&self.db)
            .await
            .map_err(|e| map_constraint_error(e, &[]))?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("Project not found".to_string()));
        }
        tracing::info!(project_id = %id, "Project deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_project_input_defaults_to_planning() {
        let input: ProjectInput =
            serde_json::from_str(r#"{"code": "PRJ-7", "name": "Northern relay"}"#).unwrap();
        assert_eq!(input.status, ProjectStatus::Planning);
        assert!(input.start_date.is_none());
    }

    #[test]
    fn test_project_input_parses_dates() {
        let input: ProjectInput = serde_json::from_str(
            r#"{"code": "PRJ-8", "name": "Depot upgrade", "status": "active",
                "start_date": "2026-03-01", "end_date": "2026-09-30"}"#,
        )
        .unwrap();
        assert_eq!(input.status, ProjectStatus::Active);
        assert_eq!(input.start_date, NaiveDate::from_ymd_opt(2026, 3, 1));
    }
}
