//! Authentication middleware.
//!
//! Validates `Authorization: Bearer <jwt>` access tokens and attaches the
//! caller as an [`AuthExtension`] request extension.

use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::header::AUTHORIZATION,
    middleware::Next,
    response::{IntoResponse, Response},
};
use uuid::Uuid;

use crate::error::{AppError, Result};
use crate::models::user::UserRole;
use crate::services::auth_service::{AuthService, Claims};

/// Extension that holds authenticated user information
#[derive(Debug, Clone)]
pub struct AuthExtension {
    pub user_id: Uuid,
    pub username: String,
    pub role: UserRole,
}

impl AuthExtension {
    pub fn is_admin(&self) -> bool {
        self.role == UserRole::Admin
    }

    /// Fail with 403 unless the caller is an admin.
    pub fn require_admin(&self) -> Result<()> {
        if self.is_admin() {
            Ok(())
        } else {
            Err(AppError::Authorization("Admin access required".to_string()))
        }
    }
}

impl From<Claims> for AuthExtension {
    fn from(claims: Claims) -> Self {
        Self {
            user_id: claims.sub,
            username: claims.username,
            role: claims.role,
        }
    }
}

/// Pull the token out of an `Authorization` header value.
fn bearer_token(header: &str) -> Result<&str> {
    let (scheme, token) = header
        .split_once(' ')
        .ok_or_else(|| AppError::Authentication("Invalid authorization header format".into()))?;
    if !scheme.eq_ignore_ascii_case("bearer") || token.trim().is_empty() {
        return Err(AppError::Authentication(
            "Invalid authorization header format".into(),
        ));
    }
    Ok(token.trim())
}

fn authenticate(auth_service: &AuthService, request: &Request) -> Result<AuthExtension> {
    let header = request
        .headers()
        .get(AUTHORIZATION)
        .ok_or_else(|| AppError::Authentication("Missing authorization header".into()))?
        .to_str()
        .map_err(|_| AppError::Authentication("Invalid authorization header format".into()))?;

    let claims = auth_service
        .validate_access_token(bearer_token(header)?)
        .map_err(|_| AppError::Authentication("Invalid or expired token".into()))?;
    Ok(AuthExtension::from(claims))
}

/// Authentication middleware function - requires a valid access token
pub async fn auth_middleware(
    State(auth_service): State<Arc<AuthService>>,
    mut request: Request,
    next: Next,
) -> Response {
    match authenticate(&auth_service, &request) {
        Ok(auth) => {
            request.extensions_mut().insert(auth);
            next.run(request).await
        }
        Err(e) => e.into_response(),
    }
}

/// Admin-only middleware - requires an authenticated admin user
pub async fn admin_middleware(
    State(auth_service): State<Arc<AuthService>>,
    mut request: Request,
    next: Next,
) -> Response {
    let auth = match authenticate(&auth_service, &request) {
        Ok(auth) => auth,
        Err(e) => return e.into_response(),
    };

    if let Err(e) = auth.require_admin() {
        tracing::debug!(user = %auth.username, path = %request.uri().path(), "Admin route refused");
        return e.into_response();
    }

    request.extensions_mut().insert(auth);
    next.run(request).await
}
