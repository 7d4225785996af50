//! Authentication and profile handlers.

use axum::{
    extract::{Extension, State},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use utoipa::{OpenApi, ToSchema};

use crate::api::dto::MessageResponse;
use crate::api::handlers::users::{validate_password, UserResponse};
use crate::api::middleware::auth::AuthExtension;
use crate::api::validation::{ApiJson, Validator};
use crate::api::SharedState;
use crate::error::Result;
use crate::models::user::User;
use crate::services::auth_service::TokenPair;
use crate::services::user_service::ProfileUpdate;

/// Create public auth routes (no auth required)
pub fn public_router() -> Router<SharedState> {
    Router::new()
        .route("/login", post(login))
        .route("/refresh", post(refresh_token))
        .route("/logout", post(logout))
}

/// Create protected auth routes (auth required)
pub fn protected_router() -> Router<SharedState> {
    Router::new()
        .route("/me", get(get_current_user).put(update_current_user))
        .route("/change-password", post(change_password))
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct LoginResponse {
    pub access_token: String,
    pub refresh_token: String,
    /// Access token lifetime in seconds
    pub expires_in: u64,
    pub token_type: String,
    pub user: UserResponse,
}

impl LoginResponse {
    fn new(user: User, tokens: TokenPair) -> Self {
        Self {
            access_token: tokens.access_token,
            refresh_token: tokens.refresh_token,
            expires_in: tokens.expires_in,
            token_type: "Bearer".to_string(),
            user: user.into(),
        }
    }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct RefreshTokenRequest {
    pub refresh_token: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct ChangePasswordRequest {
    pub current_password: String,
    pub new_password: String,
}

/// Login with credentials
#[utoipa::path(
    post,
    path = "/login",
    context_path = "/api/v1/auth",
    tag = "auth",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login successful", body = LoginResponse),
        (status = 401, description = "Invalid credentials or disabled account", body = crate::api::openapi::ErrorResponse),
        (status = 429, description = "Too many attempts", body = crate::api::openapi::ErrorResponse),
    )
)]
pub async fn login(
    State(state): State<SharedState>,
    ApiJson(payload): ApiJson<LoginRequest>,
) -> Result<Json<LoginResponse>> {
    let mut v = Validator::new();
    v.required("username", &payload.username)
        .required("password", &payload.password)
        .finish()?;

    let (user, tokens) = state
        .auth_service()
        .authenticate(payload.username.trim(), &payload.password)
        .await?;

    Ok(Json(LoginResponse::new(user, tokens)))
}

/// Exchange a refresh token for a new token pair
#[utoipa::path(
    post,
    path = "/refresh",
    context_path = "/api/v1/auth",
    tag = "auth",
    request_body = RefreshTokenRequest,
    responses(
        (status = 200, description = "Tokens refreshed", body = LoginResponse),
        (status = 401, description = "Invalid or expired refresh token", body = crate::api::openapi::ErrorResponse),
    )
)]
pub async fn refresh_token(
    State(state): State<SharedState>,
    ApiJson(payload): ApiJson<RefreshTokenRequest>,
) -> Result<Json<LoginResponse>> {
    let (user, tokens) = state
        .auth_service()
        .refresh_tokens(&payload.refresh_token)
        .await?;

    Ok(Json(LoginResponse::new(user, tokens)))
}

/// Logout. Tokens are stateless, so clients simply discard them.
#[utoipa::path(
    post,
    path = "/logout",
    context_path = "/api/v1/auth",
    tag = "auth",
    responses(
        (status = 200, description = "Logged out", body = MessageResponse),
    )
)]
pub async fn logout() -> Json<MessageResponse> {
    Json(MessageResponse::new("Logged out"))
}

/// Get the current user's profile
#[utoipa::path(
    get,
    path = "/me",
    context_path = "/api/v1/auth",
    tag = "auth",
    responses(
        (status = 200, description = "Current user", body = UserResponse),
        (status = 401, description = "Not authenticated", body = crate::api::openapi::ErrorResponse),
    ),
    security(("bearer_auth" = []))
)]
pub async fn get_current_user(
    State(state): State<SharedState>,
    Extension(auth): Extension<AuthExtension>,
) -> Result<Json<UserResponse>> {
    let user = state.user_service().get(auth.user_id).await?;
    Ok(Json(user.into()))
}

/// Update the current user's profile
#[utoipa::path(
    put,
    path = "/me",
    context_path = "/api/v1/auth",
    tag = "auth",
    request_body = ProfileUpdate,
    responses(
        (status = 200, description = "Profile updated", body = UserResponse),
        (status = 400, description = "Validation error or email in use", body = crate::api::openapi::ErrorResponse),
    ),
    security(("bearer_auth" = []))
)]
pub async fn update_current_user(
    State(state): State<SharedState>,
    Extension(auth): Extension<AuthExtension>,
    ApiJson(payload): ApiJson<ProfileUpdate>,
) -> Result<Json<UserResponse>> {
    let mut v = Validator::new();
    if let Some(email) = &payload.email {
        v.email("email", email).max_len("email", email, 255);
    }
    v.optional_text("full_name", payload.full_name.as_deref(), 200)
        .optional_text("agency_name", payload.agency_name.as_deref(), 200)
        .finish()?;

    let user = state
        .user_service()
        .update_profile(auth.user_id, &payload)
        .await?;
    Ok(Json(user.into()))
}

/// Change the current user's password
#[utoipa::path(
    post,
    path = "/change-password",
    context_path = "/api/v1/auth",
    tag = "auth",
    request_body = ChangePasswordRequest,
    responses(
        (status = 200, description = "Password changed", body = MessageResponse),
        (status = 400, description = "Current password wrong or new password too weak", body = crate::api::openapi::ErrorResponse),
    ),
    security(("bearer_auth" = []))
)]
pub async fn change_password(
    State(state): State<SharedState>,
    Extension(auth): Extension<AuthExtension>,
    ApiJson(payload): ApiJson<ChangePasswordRequest>,
) -> Result<Json<MessageResponse>> {
    let mut v = Validator::new();
    v.required("current_password", &payload.current_password);
    validate_password(&mut v, "new_password", &payload.new_password);
    v.finish()?;

    state
        .auth_service()
        .change_password(auth.user_id, &payload.current_password, &payload.new_password)
        .await?;

    Ok(Json(MessageResponse::new("Password changed")))
}

#[derive(OpenApi)]
#[openapi(
    paths(
        login,
        refresh_token,
        logout,
        get_current_user,
        update_current_user,
        change_password,
    ),
    components(schemas(
        LoginRequest,
        LoginResponse,
        RefreshTokenRequest,
        ChangePasswordRequest,
        ProfileUpdate,
        MessageResponse,
    ))
)]
pub struct AuthApiDoc;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::user::UserRole;
    use chrono::Utc;
    use uuid::Uuid;

    #[test]
    fn test_login_response_shape() {
        let now = Utc::now();
        let user = User {
            id: Uuid::new_v4(),
            username: "admin".into(),
            email: "admin@depot.example".into(),
            password_hash: "hash".into(),
            full_name: None,
            role: UserRole::Admin,
            agency_name: None,
            is_active: true,
            last_login_at: Some(now),
            created_at: now,
            updated_at: now,
        };
        let tokens = TokenPair {
            access_token: "a".into(),
            refresh_token: "r".into(),
            expires_in: 3600,
        };
        let json = serde_json::to_value(LoginResponse::new(user, tokens)).unwrap();
        assert_eq!(json["token_type"], "Bearer");
        assert_eq!(json["expires_in"], 3600);
        assert_eq!(json["user"]["role"], "admin");
        assert!(json["user"].get("password_hash").is_none());
    }

    #[test]
    fn test_login_request_requires_both_fields() {
        let parsed: std::result::Result<LoginRequest, _> =
            serde_json::from_str(r#"{"username": "admin"}"#);
        assert!(parsed.is_err());
    }
}
