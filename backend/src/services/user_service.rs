//! User account management.

use serde::Deserialize;
use sqlx::PgPool;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::db::map_constraint_error;
use crate::error::{AppError, Result};
use crate::models::user::{User, UserRole, USER_COLUMNS};
use crate::services::auth_service::{generate_password, AuthService};

const USER_CONSTRAINTS: &[(&str, &str)] = &[
    ("users_username_key", "Username already exists"),
    ("users_email_key", "Email already exists"),
];

/// Filters for listing users
#[derive(Debug, Default, Clone)]
pub struct UserFilter {
    pub search: Option<String>,
    pub role: Option<UserRole>,
    pub is_active: Option<bool>,
}

/// New account created by an admin
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    /// Generated and returned once when omitted
    pub password: Option<String>,
    pub full_name: Option<String>,
    pub role: UserRole,
    pub agency_name: Option<String>,
}

/// Partial update applied by an admin; omitted fields are left unchanged
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct UserUpdate {
    pub email: Option<String>,
    pub full_name: Option<String>,
    pub role: Option<UserRole>,
    pub agency_name: Option<String>,
    pub is_active: Option<bool>,
}

/// Fields a user may change on their own profile
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct ProfileUpdate {
    pub email: Option<String>,
    pub full_name: Option<String>,
    pub agency_name: Option<String>,
}

/// Service for user accounts.
pub struct UserService {
    db: PgPool,
}

impl UserService {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// List users matching the filter, ordered by username.
    pub async fn list(&self, filter: &UserFilter, offset: i64, limit: i64) -> Result<(Vec<User>, i64)> {
        let search_pattern = filter.search.as_ref().map(|s| format!("%{}%", s.trim()));
        let where_clause = r#"
            WHERE ($1::text IS NULL OR username ILIKE $1 OR email ILIKE $1
                   OR full_name ILIKE $1 OR agency_name ILIKE $1)
              AND ($2::user_role IS NULL OR role = $2)
              AND ($3::boolean IS NULL OR is_active = $3)
        "#;

        let users: Vec<User> = sqlx::query_as(&format!(
            "SELECT {USER_COLUMNS} FROM users {where_clause} ORDER BY username OFFSET $4 LIMIT $5"
        ))
        .bind(&search_pattern)
        .bind(filter.role)
        .bind(filter.is_active)
        .bind(offset)
        .bind(limit)
        .fetch_all(&self.db)
        .await?;

        let total: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) FROM users {where_clause}"))
            .bind(&search_pattern)
            .bind(filter.role)
            .bind(filter.is_active)
            .fetch_one(&self.db)
            .await?;

        Ok((users, total))
    }

    pub async fn get(&self, id: Uuid) -> Result<User> {
        sqlx::query_as(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.db)
            .await?
            .ok_or_else(|| AppError::NotFound("User not found".to_string()))
    }

    /// Create a user. Returns the generated password when none was supplied.
    pub async fn create(&self, input: &NewUser) -> Result<(User, Option<String>)> {
        let (password, generated) = match &input.password {
            Some(p) => (p.clone(), false),
            None => (generate_password(16), true),
        };
        let password_hash = AuthService::hash_password(&password)?;

        let user: User = sqlx::query_as(&format!(
            r#"
            INSERT INTO users (username, email, password_hash, full_name, role, agency_name)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(input.username.trim())
        .bind(input.email.trim())
        .bind(&password_hash)
        .bind(&input.full_name)
        .bind(input.role)
        .bind(&input.agency_name)
        .fetch_one(&self.db)
        .await
        .map_err(|e| map_constraint_error(e, USER_CONSTRAINTS))?;

        tracing::info!(user_id = %user.id, username = %user.username, role = user.role.as_str(), "User created");
        Ok((user, generated.then_some(password)))
    }

    /// Apply an admin update. Refuses to remove the last active admin.
    pub async fn update(&self, id: Uuid, input: &UserUpdate) -> Result<User> {
        let mut tx = self.db.begin().await?;

        let current: User = sqlx::query_as(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = $1 FOR UPDATE"
        ))
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

        let loses_admin = current.is_admin()
            && current.is_active
            && (input.role.is_some_and(|r| r != UserRole::Admin) || input.is_active == Some(false));
        if loses_admin {
            let active_admins = lock_active_admins(&mut tx).await?;
            if active_admins <= 1 {
                return Err(AppError::BusinessRule(
                    "Cannot demote or deactivate the last active admin".to_string(),
                ));
            }
        }

        let user: User = sqlx::query_as(&format!(
            r#"
            UPDATE users
            SET
                email = COALESCE($2, email),
                full_name = COALESCE($3, full_name),
                role = COALESCE($4, role),
                agency_name = COALESCE($5, agency_name),
                is_active = COALESCE($6, is_active),
                updated_at = NOW()
            WHERE id = $1
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(input.email.as_deref().map(str::trim))
        .bind(&input.full_name)
        .bind(input.role)
        .bind(&input.agency_name)
        .bind(input.is_active)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| map_constraint_error(e, USER_CONSTRAINTS))?;

        tx.commit().await?;
        Ok(user)
    }

    /// Update the caller's own profile.
    pub async fn update_profile(&self, id: Uuid, input: &ProfileUpdate) -> Result<User> {
        sqlx::query_as(&format!(
            r#"
            UPDATE users
            SET
                email = COALESCE($2, email),
                full_name = COALESCE($3, full_name),
                agency_name = COALESCE($4, agency_name),
                updated_at = NOW()
            WHERE id = $1 AND is_active = true
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(input.email.as_deref().map(str::trim))
        .bind(&input.full_name)
        .bind(&input.agency_name)
        .fetch_optional(&self.db)
        .await
        .map_err(|e| map_constraint_error(e, USER_CONSTRAINTS))?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))
    }

    /// Delete a user account.
    ///
    /// Admins cannot delete themselves, the last active admin, or users who
    /// have placed orders.
    pub async fn delete(&self, id: Uuid, acting_user: Uuid) -> Result<()> {
        if id == acting_user {
            return Err(AppError::BusinessRule("Cannot delete your own account".to_string()));
        }

        let mut tx = self.db.begin().await?;

        let target: User = sqlx::query_as(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = $1 FOR UPDATE"
        ))
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

        if target.is_admin() && target.is_active && lock_active_admins(&mut tx).await? <= 1 {
            return Err(AppError::BusinessRule(
                "Cannot delete the last active admin".to_string(),
            ));
        }

        let has_orders: bool =
            sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM orders WHERE user_id = $1)")
                .bind(id)
                .fetch_one(&mut *tx)
                .await?;
        if has_orders {
            return Err(AppError::BusinessRule(
                "User has placed orders; deactivate the account instead".to_string(),
            ));
        }

        sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(|e| map_constraint_error(e, &[]))?;

        tx.commit().await?;
        tracing::info!(user_id = %id, deleted_by = %acting_user, "User deleted");
        Ok(())
    }

    /// Set a new password, generating one when none is given.
    pub async fn reset_password(&self, id: Uuid, password: Option<String>) -> Result<Option<String>> {
        let (password, generated) = match password {
            Some(p) => (p, false),
            None => (generate_password(16), true),
        };
        let password_hash = AuthService::hash_password(&password)?;

        let result =
            sqlx::query("UPDATE users SET password_hash = $2, updated_at = NOW() WHERE id = $1")
                .bind(id)
                .bind(&password_hash)
                .execute(&self.db)
                .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("User not found".to_string()));
        }

        tracing::info!(user_id = %id, "Password reset by admin");
        Ok(generated.then_some(password))
    }

    /// Provision the initial admin account when no admin exists yet.
    ///
    /// Returns the password when one had to be generated.
    pub async fn ensure_admin(
        &self,
        username: &str,
        email: &str,
        password: Option<&str>,
    ) -> Result<Option<String>> {
        let has_admin: bool =
            sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM users WHERE role = 'admin')")
                .fetch_one(&self.db)
                .await?;
        if has_admin {
            return Ok(None);
        }

        let (password, generated) = match password {
            Some(p) => (p.to_string(), false),
            None => (generate_password(20), true),
        };
        let password_hash = AuthService::hash_password(&password)?;

        let inserted = sqlx::query(
            r#"
            INSERT INTO users (username, email, password_hash, full_name, role)
            VALUES ($1, $2, $3, 'Administrator', 'admin')
            ON CONFLICT (username) DO NOTHING
            "#,
        )
        .bind(username)
        .bind(email)
        .bind(&password_hash)
        .execute(&self.db)
        .await
        .map_err(|e| map_constraint_error(e, USER_CONSTRAINTS))?
        .rows_affected();

        // A non-admin already holds the name; nothing was provisioned.
        if inserted == 0 {
            return Err(AppError::Config(format!(
                "Cannot provision admin: username '{}' is taken by a non-admin account",
                username
            )));
        }

        tracing::info!(username, "Provisioned initial admin user");
        Ok(generated.then_some(password))
    }
}

/// Lock the active admin rows and return how many there are.
async fn lock_active_admins(tx: &mut sqlx::Transaction<'_, sqlx::Postgres>) -> Result<i64> {
    let ids: Vec<Uuid> = sqlx::query_scalar(
        "SELECT id FROM users WHERE role = 'admin' AND is_active = true FOR UPDATE",
    )
    .fetch_all(&mut **tx)
    .await?;
    Ok(ids.len() as i64)
}
