//! Category handlers.

use axum::{
    extract::{Extension, Path, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use utoipa::OpenApi;
use uuid::Uuid;

use crate::api::middleware::auth::AuthExtension;
use crate::api::validation::{ApiJson, Validator};
use crate::api::SharedState;
use crate::error::Result;
use crate::models::product::Category;
use crate::services::category_service::CategoryInput;

pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/", get(list_categories).post(create_category))
        .route(
            "/:id",
            get(get_category)
                .put(update_category)
                .delete(delete_category),
        )
}

fn validate_category(input: &CategoryInput) -> Result<()> {
    Validator::new()
        .text("name", &input.name, 100)
        .optional_text("description", input.description.as_deref(), 1000)
        .finish()
}

/// List categories with product counts
#[utoipa::path(
    get,
    path = "",
    context_path = "/api/v1/categories",
    tag = "categories",
    responses((status = 200, description = "Categories", body = Vec<Category>)),
    security(("bearer_auth" = []))
)]
pub async fn list_categories(State(state): State<SharedState>) -> Result<Json<Vec<Category>>> {
    Ok(Json(state.category_service().list().await?))
}

/// Get category by ID
#[utoipa::path(
    get,
    path = "/{id}",
    context_path = "/api/v1/categories",
    tag = "categories",
    params(("id" = Uuid, Path, description = "Category ID")),
    responses(
        (status = 200, description = "Category", body = Category),
        (status = 404, description = "Category not found", body = crate::api::openapi::ErrorResponse),
    ),
    security(("bearer_auth" = []))
)]
pub async fn get_category(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Category>> {
    Ok(Json(state.category_service().get(id).await?))
}

/// Create category
#[utoipa::path(
    post,
    path = "",
    context_path = "/api/v1/categories",
    tag = "categories",
    request_body = CategoryInput,
    responses(
        (status = 201, description = "Category created", body = Category),
        (status = 400, description = "Validation error or duplicate name", body = crate::api::openapi::ErrorResponse),
        (status = 403, description = "Admin access required", body = crate::api::openapi::ErrorResponse),
    ),
    security(("bearer_auth" = []))
)]
pub async fn create_category(
    State(state): State<SharedState>,
    Extension(auth): Extension<AuthExtension>,
    ApiJson(payload): ApiJson<CategoryInput>,
) -> Result<(StatusCode, Json<Category>)> {
    auth.require_admin()?;
    validate_category(&payload)?;
    let category = state.category_service().create(&payload).await?;
    Ok((StatusCode::CREATED, Json(category)))
}

/// Update category
#[utoipa::path(
    put,
    path = "/{id}",
    context_path = "/api/v1/categories",
    tag = "categories",
    params(("id" = Uuid, Path, description = "Category ID")),
    request_body = CategoryInput,
    responses(
        (status = 200, description = "Category updated", body = Category),
        (status = 404, description = "Category not found", body = crate::api::openapi::ErrorResponse),
    ),
    security(("bearer_auth" = []))
)]
pub async fn update_category(
    State(state): State<SharedState>,
    Extension(auth): Extension<AuthExtension>,
    Path(id): Path<Uuid>,
    ApiJson(payload): ApiJson<CategoryInput>,
) -> Result<Json<Category>> {
    auth.require_admin()?;
    validate_category(&payload)?;
    Ok(Json(state.category_service().update(id, &payload).await?))
}

/// Delete category
#[utoipa::path(
    delete,
    path = "/{id}",
    context_path = "/api/v1/categories",
    tag = "categories",
    params(("id" = Uuid, Path, description = "Category ID")),
    responses(
        (status = 204, description = "Category deleted"),
        (status = 400, description = "Category still has products", body = crate::api::openapi::ErrorResponse),
        (status = 404, description = "Category not found", body = crate::api::openapi::ErrorResponse),
    ),
    security(("bearer_auth" = []))
)]
pub async fn delete_category(
    State(state): State<SharedState>,
    Extension(auth): Extension<AuthExtension>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode> {
    auth.require_admin()?;
    state.category_service().delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[derive(OpenApi)]
#[openapi(
    paths(list_categories, get_category, create_category, update_category, delete_category),
    components(schemas(Category, CategoryInput))
)]
pub struct CategoriesApiDoc;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_validation() {
        let ok = CategoryInput {
            name: "Medical".into(),
            description: Some("Field medical supplies".into()),
        };
        assert!(validate_category(&ok).is_ok());

        let blank = CategoryInput {
            name: String::new(),
            description: None,
        };
        assert!(validate_category(&blank).is_err());
    }
}
