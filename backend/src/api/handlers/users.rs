//! User management handlers (admin only).

use axum::{
    extract::{Extension, Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, OpenApi, ToSchema};
use uuid::Uuid;

use crate::api::dto::{Pagination, PaginationQuery};
use crate::api::middleware::auth::AuthExtension;
use crate::api::validation::{ApiJson, Validator};
use crate::api::SharedState;
use crate::error::Result;
use crate::models::user::{User, UserRole};
use crate::services::auth_service::MIN_PASSWORD_LENGTH;
use crate::services::user_service::{NewUser, UserFilter, UserUpdate};

pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/", get(list_users).post(create_user))
        .route("/:id", get(get_user).put(update_user).delete(delete_user))
        .route("/:id/reset-password", post(reset_password))
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ListUsersQuery {
    /// Matches username, email, full name or agency
    pub search: Option<String>,
    pub role: Option<UserRole>,
    pub is_active: Option<bool>,
}

/// User as exposed over the API
#[derive(Debug, Serialize, ToSchema)]
pub struct UserResponse {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub full_name: Option<String>,
    pub role: UserRole,
    pub agency_name: Option<String>,
    pub is_active: bool,
    pub last_login_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            username: user.username,
            email: user.email,
            full_name: user.full_name,
            role: user.role,
            agency_name: user.agency_name,
            is_active: user.is_active,
            last_login_at: user.last_login_at,
            created_at: user.created_at,
            updated_at: user.updated_at,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct UserListResponse {
    pub items: Vec<UserResponse>,
    pub pagination: Pagination,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CreateUserResponse {
    pub user: UserResponse,
    /// Only present when the password was generated; shown once
    #[serde(skip_serializing_if = "Option::is_none")]
    pub generated_password: Option<String>,
}

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct ResetPasswordRequest {
    /// New password; generated when omitted
    pub password: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ResetPasswordResponse {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub generated_password: Option<String>,
}

fn is_valid_username(username: &str) -> bool {
    username
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'))
}

pub(crate) fn validate_password(v: &mut Validator, field: &str, password: &str) {
    v.min_len(field, password, MIN_PASSWORD_LENGTH)
        .max_len(field, password, 128);
}

fn validate_new_user(input: &NewUser) -> Result<()> {
    let mut v = Validator::new();
    v.text("username", &input.username, 64)
        .min_len("username", input.username.trim(), 3)
        .check(
            is_valid_username(input.username.trim()),
            "username",
            "may only contain letters, digits, '.', '_' and '-'",
        )
        .email("email", &input.email)
        .max_len("email", &input.email, 255)
        .optional_text("full_name", input.full_name.as_deref(), 200)
        .optional_text("agency_name", input.agency_name.as_deref(), 200);
    if let Some(password) = &input.password {
        validate_password(&mut v, "password", password);
    }
    v.finish()
}

fn validate_user_update(input: &UserUpdate) -> Result<()> {
    let mut v = Validator::new();
    if let Some(email) = &input.email {
        v.email("email", email).max_len("email", email, 255);
    }
    v.optional_text("full_name", input.full_name.as_deref(), 200)
        .optional_text("agency_name", input.agency_name.as_deref(), 200);
    v.finish()
}

/// List users
#[utoipa::path(
    get,
    path = "",
    context_path = "/api/v1/users",
    tag = "users",
    params(ListUsersQuery, PaginationQuery),
    responses(
        (status = 200, description = "List of users", body = UserListResponse),
        (status = 403, description = "Admin access required", body = crate::api::openapi::ErrorResponse),
    ),
    security(("bearer_auth" = []))
)]
pub async fn list_users(
    State(state): State<SharedState>,
    Query(query): Query<ListUsersQuery>,
    Query(page): Query<PaginationQuery>,
) -> Result<Json<UserListResponse>> {
    let filter = UserFilter {
        search: query.search.filter(|s| !s.trim().is_empty()),
        role: query.role,
        is_active: query.is_active,
    };
    let (users, total) = state
        .user_service()
        .list(&filter, page.offset(), page.limit())
        .await?;

    Ok(Json(UserListResponse {
        items: users.into_iter().map(UserResponse::from).collect(),
        pagination: Pagination::from_query_and_total(&page, total),
    }))
}

/// Create user
#[utoipa::path(
    post,
    path = "",
    context_path = "/api/v1/users",
    tag = "users",
    request_body = NewUser,
    responses(
        (status = 201, description = "User created", body = CreateUserResponse),
        (status = 400, description = "Validation error or duplicate username/email", body = crate::api::openapi::ErrorResponse),
    ),
    security(("bearer_auth" = []))
)]
pub async fn create_user(
    State(state): State<SharedState>,
    ApiJson(payload): ApiJson<NewUser>,
) -> Result<(StatusCode, Json<CreateUserResponse>)> {
    validate_new_user(&payload)?;
    let (user, generated_password) = state.user_service().create(&payload).await?;

    Ok((
        StatusCode::CREATED,
        Json(CreateUserResponse {
            user: user.into(),
            generated_password,
        }),
    ))
}

/// Get user by ID
#[utoipa::path(
    get,
    path = "/{id}",
    context_path = "/api/v1/users",
    tag = "users",
    params(("id" = Uuid, Path, description = "User ID")),
    responses(
        (status = 200, description = "User details", body = UserResponse),
        (status = 404, description = "User not found", body = crate::api::openapi::ErrorResponse),
    ),
    security(("bearer_auth" = []))
)]
pub async fn get_user(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<Json<UserResponse>> {
    let user = state.user_service().get(id).await?;
    Ok(Json(user.into()))
}

/// Update user
#[utoipa::path(
    put,
    path = "/{id}",
    context_path = "/api/v1/users",
    tag = "users",
    params(("id" = Uuid, Path, description = "User ID")),
    request_body = UserUpdate,
    responses(
        (status = 200, description = "User updated", body = UserResponse),
        (status = 400, description = "Validation error or last active admin", body = crate::api::openapi::ErrorResponse),
        (status = 404, description = "User not found", body = crate::api::openapi::ErrorResponse),
    ),
    security(("bearer_auth" = []))
)]
pub async fn update_user(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
    ApiJson(payload): ApiJson<UserUpdate>,
) -> Result<Json<UserResponse>> {
    validate_user_update(&payload)?;
    let user = state.user_service().update(id, &payload).await?;
    Ok(Json(user.into()))
}

/// Delete user
#[utoipa::path(
    delete,
    path = "/{id}",
    context_path = "/api/v1/users",
    tag = "users",
    params(("id" = Uuid, Path, description = "User ID")),
    responses(
        (status = 204, description = "User deleted"),
        (status = 400, description = "Own account, last admin, or user has orders", body = crate::api::openapi::ErrorResponse),
        (status = 404, description = "User not found", body = crate::api::openapi::ErrorResponse),
    ),
    security(("bearer_auth" = []))
)]
pub async fn delete_user(
    State(state): State<SharedState>,
    Extension(auth): Extension<AuthExtension>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode> {
    state.user_service().delete(id, auth.user_id).await?;
    tracing::info!(user_id = %id, deleted_by = %auth.username, "User deleted");
    Ok(StatusCode::NO_CONTENT)
}

/// Reset a user's password
#[utoipa::path(
    post,
    path = "/{id}/reset-password",
    context_path = "/api/v1/users",
    tag = "users",
    params(("id" = Uuid, Path, description = "User ID")),
    request_body = ResetPasswordRequest,
    responses(
        (status = 200, description = "Password reset", body = ResetPasswordResponse),
        (status = 404, description = "User not found", body = crate::api::openapi::ErrorResponse),
    ),
    security(("bearer_auth" = []))
)]
pub async fn reset_password(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
    payload: Option<ApiJson<ResetPasswordRequest>>,
) -> Result<Json<ResetPasswordResponse>> {
    let payload = payload.map(|ApiJson(p)| p).unwrap_or_default();
    if let Some(password) = &payload.password {
        let mut v = Validator::new();
        validate_password(&mut v, "password", password);
        v.finish()?;
    }

    let generated_password = state
        .user_service()
        .reset_password(id, payload.password)
        .await?;

    Ok(Json(ResetPasswordResponse {
        message: "Password reset".to_string(),
        generated_password,
    }))
}

#[derive(OpenApi)]
#[openapi(
    paths(list_users, create_user, get_user, update_user, delete_user, reset_password),
    components(schemas(
        UserResponse,
        UserListResponse,
        CreateUserResponse,
        ResetPasswordRequest,
        ResetPasswordResponse,
        NewUser,
        UserUpdate,
        UserRole,
    ))
)]
pub struct UsersApiDoc;
