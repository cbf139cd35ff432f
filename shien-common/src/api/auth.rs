//! Bearer-token and password authentication helpers
//!
//! # Architecture
//!
//! - Every API request (except login and health) carries a bearer token
//!   holding the actor id, organization, role and actor type.
//! - The signing secret is stored in the database settings table and
//!   generated on first startup.
//! - Passwords are stored as argon2 hashes.
//!
//! This module contains ONLY pure functions and database operations.
//! No HTTP framework dependencies (Axum, etc.) - those are in module-specific code.

use argon2::password_hash::{rand_core::OsRng, PasswordHash, SaltString};
use argon2::{Argon2, PasswordHasher, PasswordVerifier};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use std::time::{SystemTime, UNIX_EPOCH};
use thiserror::Error;

/// Settings key holding the token signing secret
const TOKEN_SECRET_KEY: &str = "api_token_secret";

/// Authentication error types
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Invalid token: {0}")]
    InvalidToken(String),

    #[error("Token expired")]
    Expired,

    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Password hash error: {0}")]
    PasswordHash(String),

    #[error("Database error: {0}")]
    Database(String),
}

/// Actor type carried in token claims
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActorType {
    Staff,
    Client,
}

/// Staff role hierarchy
///
/// `admin` and `manager` may edit wage rules and drive the payroll
/// lifecycle; plain `staff` handles day-to-day records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StaffRole {
    Admin,
    Manager,
    Staff,
}

impl StaffRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            StaffRole::Admin => "admin",
            StaffRole::Manager => "manager",
            StaffRole::Staff => "staff",
        }
    }

    pub fn parse(s: &str) -> Option<StaffRole> {
        match s {
            "admin" => Some(StaffRole::Admin),
            "manager" => Some(StaffRole::Manager),
            "staff" => Some(StaffRole::Staff),
            _ => None,
        }
    }

    /// Elevated roles may manage wage rules and payroll runs
    pub fn is_elevated(&self) -> bool {
        matches!(self, StaffRole::Admin | StaffRole::Manager)
    }
}

/// Token claims
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Actor guid
    pub sub: String,
    /// Organization guid
    pub org: String,
    /// Staff role string, or "client" for client actors
    pub role: String,
    /// Actor type (staff or client)
    pub user_type: ActorType,
    /// Issued at (Unix epoch seconds)
    pub iat: u64,
    /// Expiration time (Unix epoch seconds)
    pub exp: u64,
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

/// Issue a signed bearer token for the given actor
pub fn issue_token(
    secret: &str,
    actor_id: &str,
    organization_id: &str,
    role: &str,
    user_type: ActorType,
    ttl_seconds: u64,
) -> Result<String, AuthError> {
    let now = unix_now();
    let claims = Claims {
        sub: actor_id.to_string(),
        org: organization_id.to_string(),
        role: role.to_string(),
        user_type,
        iat: now,
        exp: now + ttl_seconds,
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| AuthError::InvalidToken(e.to_string()))
}

/// Verify a bearer token and return its claims
pub fn verify_token(secret: &str, token: &str) -> Result<Claims, AuthError> {
    let data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map_err(|e| match e.kind() {
        jsonwebtoken::errors::ErrorKind::ExpiredSignature => AuthError::Expired,
        _ => AuthError::InvalidToken(e.to_string()),
    })?;

    Ok(data.claims)
}

/// Hash a password with argon2
pub fn hash_password(plain: &str) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(plain.as_bytes(), &salt)
        .map(|h| h.to_string())
        .map_err(|e| AuthError::PasswordHash(e.to_string()))
}

/// Verify a password against a stored argon2 hash
pub fn verify_password(plain: &str, stored_hash: &str) -> Result<(), AuthError> {
    let parsed = PasswordHash::new(stored_hash).map_err(|e| AuthError::PasswordHash(e.to_string()))?;

    Argon2::default()
        .verify_password(plain.as_bytes(), &parsed)
        .map_err(|_| AuthError::InvalidCredentials)
}

/// Load the token signing secret from the database settings table
///
/// Generated and stored on first access so every deployment gets its own
/// random secret without manual setup.
pub async fn load_token_secret(pool: &SqlitePool) -> Result<String, AuthError> {
    let existing: Option<Option<String>> =
        sqlx::query_scalar("SELECT value FROM settings WHERE key = ?")
            .bind(TOKEN_SECRET_KEY)
            .fetch_optional(pool)
            .await
            .map_err(|e| AuthError::Database(e.to_string()))?;

    if let Some(Some(secret)) = existing {
        if !secret.is_empty() {
            return Ok(secret);
        }
    }

    let secret = generate_secret();

    // INSERT OR IGNORE handles two processes initializing concurrently;
    // re-read afterwards so both end up with the same stored value.
    sqlx::query("INSERT OR IGNORE INTO settings (key, value) VALUES (?, ?)")
        .bind(TOKEN_SECRET_KEY)
        .bind(&secret)
        .execute(pool)
        .await
        .map_err(|e| AuthError::Database(e.to_string()))?;

    let stored: Option<String> = sqlx::query_scalar("SELECT value FROM settings WHERE key = ?")
        .bind(TOKEN_SECRET_KEY)
        .fetch_one(pool)
        .await
        .map_err(|e| AuthError::Database(e.to_string()))?;

    Ok(stored.unwrap_or(secret))
}

fn generate_secret() -> String {
    let bytes: [u8; 32] = rand::random();
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn password_roundtrip() {
        let hash = hash_password("kaigo-2025").unwrap();
        assert!(verify_password("kaigo-2025", &hash).is_ok());
        assert!(matches!(
            verify_password("wrong", &hash),
            Err(AuthError::InvalidCredentials)
        ));
    }

    #[test]
    fn token_roundtrip() {
        let token = issue_token("secret", "actor-1", "org-1", "manager", ActorType::Staff, 3600)
            .unwrap();
        let claims = verify_token("secret", &token).unwrap();
        assert_eq!(claims.sub, "actor-1");
        assert_eq!(claims.org, "org-1");
        assert_eq!(claims.role, "manager");
        assert_eq!(claims.user_type, ActorType::Staff);
    }

    #[test]
    fn token_rejects_wrong_secret() {
        let token = issue_token("secret-a", "actor-1", "org-1", "staff", ActorType::Staff, 3600)
            .unwrap();
        assert!(verify_token("secret-b", &token).is_err());
    }

    #[test]
    fn role_parse_and_elevation() {
        assert_eq!(StaffRole::parse("admin"), Some(StaffRole::Admin));
        assert_eq!(StaffRole::parse("nurse"), None);
        assert!(StaffRole::Manager.is_elevated());
        assert!(!StaffRole::Staff.is_elevated());
    }
}
