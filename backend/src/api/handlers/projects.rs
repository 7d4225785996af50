//! Project handlers. Reads are open to any signed-in user; changes need admin.

use axum::{
    extract::{Extension, Path, Query, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, OpenApi, ToSchema};
use uuid::Uuid;

use crate::api::dto::{Pagination, PaginationQuery};
use crate::api::middleware::auth::AuthExtension;
use crate::api::validation::{ApiJson, Validator};
use crate::api::SharedState;
use crate::error::Result;
use crate::models::project::{dates_are_ordered, Project, ProjectStatus};
use crate::services::project_service::ProjectInput;

pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/", get(list_projects).post(create_project))
        .route(
            "/:id",
            get(get_project).put(update_project).delete(delete_project),
        )
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ListProjectsQuery {
    /// Matches code or name
    pub search: Option<String>,
    pub status: Option<ProjectStatus>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ProjectListResponse {
    pub items: Vec<Project>,
    pub pagination: Pagination,
}

fn validate_project(input: &ProjectInput) -> Result<()> {
    let mut v = Validator::new();
    v.text("code", &input.code, 32)
        .text("name", &input.name, 200)
        .optional_text("description", input.description.as_deref(), 2000)
        .check(
            dates_are_ordered(input.start_date, input.end_date),
            "end_date",
            "must not precede start_date",
        );
    v.finish()
}

/// List projects
#[utoipa::path(
    get,
    path = "",
    context_path = "/api/v1/projects",
    tag = "projects",
    params(ListProjectsQuery, PaginationQuery),
    responses(
        (status = 200, description = "Projects", body = ProjectListResponse),
    ),
    security(("bearer_auth" = []))
)]
pub async fn list_projects(
    State(state): State<SharedState>,
    Query(query): Query<ListProjectsQuery>,
    Query(page): Query<PaginationQuery>,
) -> Result<Json<ProjectListResponse>> {
    let search = query.search.as_deref().filter(|s| !s.trim().is_empty());
    let (items, total) = state
        .project_service()
        .list(search, query.status, page.offset(), page.limit())
        .await?;

    Ok(Json(ProjectListResponse {
        items,
        pagination: Pagination::from_query_and_total(&page, total),
    }))
}

/// Get project by ID
#[utoipa::path(
    get,
    path = "/{id}",
    context_path = "/api/v1/projects",
    tag = "projects",
    params(("id" = Uuid, Path, description = "Project ID")),
    responses(
        (status = 200, description = "Project", body = Project),
        (status = 404, description = "Project not found", body = crate::api::openapi::ErrorResponse),
    ),
    security(("bearer_auth" = []))
)]
pub async fn get_project(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Project>> {
    Ok(Json(state.project_service().get(id).await?))
}

/// Create project
#[utoipa::path(
    post,
    path = "",
    context_path = "/api/v1/projects",
    tag = "projects",
    request_body = ProjectInput,
    responses(
        (status = 201, description = "Project created", body = Project),
        (status = 400, description = "Validation error or duplicate code", body = crate::api::openapi::ErrorResponse),
        (status = 403, description = "Admin access required", body = crate::api::openapi::ErrorResponse),
    ),
    security(("bearer_auth" = []))
)]
pub async fn create_project(
    State(state): State<SharedState>,
    Extension(auth): Extension<AuthExtension>,
    ApiJson(payload): ApiJson<ProjectInput>,
) -> Result<(StatusCode, Json<Project>)> {
    auth.require_admin()?;
    validate_project(&payload)?;
    let project = state
        .project_service()
        .create(&payload, auth.user_id)
        .await?;
    Ok((StatusCode::CREATED, Json(project)))
}

/// Update project
#[utoipa::path(
    put,
    path = "/{id}",
    context_path = "/api/v1/projects",
    tag = "projects",
    params(("id" = Uuid, Path, description = "Project ID")),
    request_body = ProjectInput,
    responses(
        (status = 200, description = "Project updated", body = Project),
        (status = 400, description = "Validation error or duplicate code", body = crate::api::openapi::ErrorResponse),
        (status = 404, description = "Project not found", body = crate::api::openapi::ErrorResponse),
    ),
    security(("bearer_auth" = []))
)]
pub async fn update_project(
    State(state): State<SharedState>,
    Extension(auth): Extension<AuthExtension>,
    Path(id): Path<Uuid>,
    ApiJson(payload): ApiJson<ProjectInput>,
) -> Result<Json<Project>> {
    auth.require_admin()?;
    validate_project(&payload)?;
    Ok(Json(state.project_service().update(id, &payload).await?))
}

/// Delete project
#[utoipa::path(
    delete,
    path = "/{id}",
    context_path = "/api/v1/projects",
    tag = "projects",
    params(("id" = Uuid, Path, description = "Project ID")),
    responses(
        (status = 204, description = "Project deleted"),
        (status = 400, description = "Project still referenced", body = crate::api::openapi::ErrorResponse),
        (status = 404, description = "Project not found", body = crate::api::openapi::ErrorResponse),
    ),
    security(("bearer_auth" = []))
)]
pub async fn delete_project(
    State(state): State<SharedState>,
    Extension(auth): Extension<AuthExtension>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode> {
    auth.require_admin()?;
    state.project_service().delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[derive(OpenApi)]
#[openapi(
    paths(list_projects, get_project, create_project, update_project, delete_project),
    components(schemas(Project, ProjectStatus, ProjectInput, ProjectListResponse))
)]
pub struct ProjectsApiDoc;

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn input(code: &str, start: Option<NaiveDate>, end: Option<NaiveDate>) -> ProjectInput {
        ProjectInput {
            code: code.to_string(),
            name: "Forward depot".to_string(),
            description: None,
            status: ProjectStatus::Active,
            start_date: start,
            end_date: end,
        }
    }

    #[test]
    fn test_valid_project() {
        let start = NaiveDate::from_ymd_opt(2026, 1, 1);
        let end = NaiveDate::from_ymd_opt(2026, 12, 31);
        assert!(validate_project(&input("FD-01", start, end)).is_ok());
    }

    #[test]
    fn test_end_before_start_rejected() {
        let start = NaiveDate::from_ymd_opt(2026, 6, 1);
        let end = NaiveDate::from_ymd_opt(2026, 5, 1);
        assert!(validate_project(&input("FD-01", start, end)).is_err());
    }

    #[test]
    fn test_blank_code_rejected() {
        assert!(validate_project(&input("  ", None, None)).is_err());
    }
}
