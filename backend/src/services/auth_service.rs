//! Authentication service.
//!
//! Handles credential checks, JWT issuance and validation, and password
//! hashing.

use std::sync::Arc;

use bcrypt::{hash, verify, DEFAULT_COST};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, TokenData, Validation};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use crate::config::Config;
use crate::error::{AppError, Result};
use crate::models::user::{User, UserRole, USER_COLUMNS};

/// Minimum accepted password length
pub const MIN_PASSWORD_LENGTH: usize = 8;

const ACCESS_TOKEN: &str = "access";
const REFRESH_TOKEN: &str = "refresh";

/// JWT claims structure
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    /// Subject (user ID)
    pub sub: Uuid,
    pub username: String,
    pub role: UserRole,
    /// Issued at (Unix timestamp)
    pub iat: i64,
    /// Expiration time (Unix timestamp)
    pub exp: i64,
    /// Token type: "access" or "refresh"
    pub token_type: String,
}

/// Token pair response
#[derive(Debug, Serialize)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
    pub expires_in: u64,
}

/// Authentication service
pub struct AuthService {
    db: PgPool,
    config: Arc<Config>,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
}

impl AuthService {
    /// Create a new authentication service
    pub fn new(db: PgPool, config: Arc<Config>) -> Self {
        let secret = config.jwt_secret.clone();
        Self {
            db,
            config,
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
        }
    }

    /// Authenticate user with username and password
    pub async fn authenticate(&self, username: &str, password: &str) -> Result<(User, TokenPair)> {
        let user: User = sqlx::query_as(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE username = $1"
        ))
        .bind(username)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::Authentication("Invalid username or password".to_string()))?;

        if !Self::verify_password(password, &user.password_hash)? {
            tracing::warn!(username, "Failed login attempt");
            return Err(AppError::Authentication(
                "Invalid username or password".to_string(),
            ));
        }

        if !user.is_active {
            return Err(AppError::Authentication("Account is disabled".to_string()));
        }

        sqlx::query("UPDATE users SET last_login_at = NOW() WHERE id = $1")
            .bind(user.id)
            .execute(&self.db)
            .await?;

        let tokens = self.generate_tokens(&user)?;
        tracing::info!(user_id = %user.id, username = %user.username, "User logged in");

        Ok((user, tokens))
    }

    /// Generate access and refresh tokens for a user
    pub fn generate_tokens(&self, user: &User) -> Result<TokenPair> {
        let now = Utc::now();
        let access_exp = now + Duration::minutes(self.config.jwt_access_token_expiry_minutes);
        let refresh_exp = now + Duration::days(self.config.jwt_refresh_token_expiry_days);

        let access_token =
            self.encode_claims(user, now.timestamp(), access_exp.timestamp(), ACCESS_TOKEN)?;
        let refresh_token =
            self.encode_claims(user, now.timestamp(), refresh_exp.timestamp(), REFRESH_TOKEN)?;

        Ok(TokenPair {
            access_token,
            refresh_token,
            expires_in: (self.config.jwt_access_token_expiry_minutes * 60).max(0) as u64,
        })
    }

    fn encode_claims(&self, user: &User, iat: i64, exp: i64, token_type: &str) -> Result<String> {
        let claims = Claims {
            sub: user.id,
            username: user.username.clone(),
            role: user.role,
            iat,
            exp,
            token_type: token_type.to_string(),
        };
        encode(&Header::default(), &claims, &self.encoding_key)
            .map_err(|e| AppError::Internal(format!("Token encoding failed: {}", e)))
    }

    /// Validate and decode an access token
    pub fn validate_access_token(&self, token: &str) -> Result<Claims> {
        let token_data = self.decode_token(token)?;

        if token_data.claims.token_type != ACCESS_TOKEN {
            return Err(AppError::Authentication("Invalid token type".to_string()));
        }

        Ok(token_data.claims)
    }

    /// Refresh tokens using a refresh token
    pub async fn refresh_tokens(&self, refresh_token: &str) -> Result<(User, TokenPair)> {
        let token_data = self.decode_token(refresh_token)?;

        if token_data.claims.token_type != REFRESH_TOKEN {
            return Err(AppError::Authentication("Invalid token type".to_string()));
        }

        // Role or activation may have changed since the token was issued.
        let user: User = sqlx::query_as(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = $1 AND is_active = true"
        ))
        .bind(token_data.claims.sub)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::Authentication("User not found".to_string()))?;

        let tokens = self.generate_tokens(&user)?;
        Ok((user, tokens))
    }

    /// Change a user's password after checking the current one.
    pub async fn change_password(
        &self,
        user_id: Uuid,
        current_password: &str,
        new_password: &str,
    ) -> Result<()> {
        let password_hash: String =
            sqlx::query_scalar("SELECT password_hash FROM users WHERE id = $1 AND is_active = true")
                .bind(user_id)
                .fetch_optional(&self.db)
                .await?
                .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

        if !Self::verify_password(current_password, &password_hash)? {
            return Err(AppError::Validation(
                "Current password is incorrect".to_string(),
            ));
        }
        if current_password == new_password {
            return Err(AppError::Validation(
                "New password must differ from the current password".to_string(),
            ));
        }

        let new_hash = Self::hash_password(new_password)?;
        sqlx::query("UPDATE users SET password_hash = $2, updated_at = NOW() WHERE id = $1")
            .bind(user_id)
            .bind(new_hash)
            .execute(&self.db)
            .await?;

        tracing::info!(user_id = %user_id, "Password changed");
        Ok(())
    }

    /// Decode and validate a token
    fn decode_token(&self, token: &str) -> Result<TokenData<Claims>> {
        decode::<Claims>(token, &self.decoding_key, &Validation::default())
            .map_err(|e| AppError::Authentication(format!("Invalid token: {}", e)))
    }

    /// Hash a password
    pub fn hash_password(password: &str) -> Result<String> {
        hash(password, DEFAULT_COST)
            .map_err(|e| AppError::Internal(format!("Password hashing failed: {}", e)))
    }

    /// Verify a password against a hash
    pub fn verify_password(password: &str, hash: &str) -> Result<bool> {
        verify(password, hash)
            .map_err(|e| AppError::Internal(format!("Password verification failed: {}", e)))
    }
}

/// Generate a random password for provisioned or reset accounts.
pub fn generate_password(length: usize) -> String {
    use rand::Rng;
    const CHARSET: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZabcdefghjkmnpqrstuvwxyz23456789!@#$%&*";
    let mut rng = rand::rng();
    (0..length)
        .map(|_| {
            let idx = rng.random_range(0..CHARSET.len());
            CHARSET[idx] as char
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::postgres::PgPoolOptions;

    fn service() -> AuthService {
        let config = Config::for_tests();
        let pool = PgPoolOptions::new()
            .connect_lazy(&config.database_url)
            .unwrap();
        AuthService::new(pool, Arc::new(config))
    }

    fn user(role: UserRole) -> User {
        User {
            id: Uuid::new_v4(),
            username: "supply-officer".into(),
            email: "officer@example.mil".into(),
            password_hash: String::new(),
            full_name: None,
            role,
            agency_name: None,
            is_active: true,
            last_login_at: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_password_hashing() {
        let password = "test_password_123";
        let hash = AuthService::hash_password(password).unwrap();
        assert!(AuthService::verify_password(password, &hash).unwrap());
        assert!(!AuthService::verify_password("wrong_password", &hash).unwrap());
    }

    #[tokio::test]
    async fn test_access_token_round_trip_carries_role() {
        let svc = service();
        let user = user(UserRole::Admin);
        let tokens = svc.generate_tokens(&user).unwrap();
        let claims = svc.validate_access_token(&tokens.access_token).unwrap();
        assert_eq!(claims.sub, user.id);
        assert_eq!(claims.role, UserRole::Admin);
        assert_eq!(claims.username, "supply-officer");
        assert_eq!(tokens.expires_in, 3600);
    }

    #[tokio::test]
    async fn test_refresh_token_rejected_as_access_token() {
        let svc = service();
        let tokens = svc.generate_tokens(&user(UserRole::Agency)).unwrap();
        let err = svc.validate_access_token(&tokens.refresh_token).unwrap_err();
        assert!(matches!(err, AppError::Authentication(_)));
    }

    #[tokio::test]
    async fn test_token_signed_with_other_secret_rejected() {
        let svc = service();
        let mut other_config = Config::for_tests();
        other_config.jwt_secret = "a-completely-different-secret".into();
        let other = AuthService::new(svc.db.clone(), Arc::new(other_config));
        let tokens = other.generate_tokens(&user(UserRole::Admin)).unwrap();
        assert!(svc.validate_access_token(&tokens.access_token).is_err());
    }

    #[tokio::test]
    async fn test_expired_token_rejected() {
        let svc = service();
        let u = user(UserRole::Agency);
        let past = Utc::now().timestamp() - 3600;
        let token = svc.encode_claims(&u, past - 60, past, ACCESS_TOKEN).unwrap();
        assert!(svc.validate_access_token(&token).is_err());
    }

    #[test]
    fn test_generate_password_length_and_charset() {
        let password = generate_password(20);
        assert_eq!(password.chars().count(), 20);
        assert!(!password.contains('0'));
        assert!(!password.contains('O'));
        assert_ne!(generate_password(20), password);
    }
}
