//! Authentication middleware and login endpoint
//!
//! Protected routes require a bearer token; the middleware validates it
//! and attaches the resolved [`Actor`] to request extensions for
//! handlers to consume. Login verifies an argon2 password hash and
//! issues the token.

use axum::{
    extract::{Request, State},
    http::{header, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use shien_common::api::auth::{issue_token, verify_password, verify_token, ActorType, StaffRole};
use shien_common::db::init::get_setting_i64;
use tracing::warn;

use crate::db::{clients, staff};
use crate::error::{ApiError, ApiResult};
use crate::AppState;

/// Resolved request actor
///
/// Every operation receives this already-authenticated identity; all
/// queries are scoped to its organization.
#[derive(Debug, Clone)]
pub struct Actor {
    pub id: String,
    pub organization_id: String,
    pub actor_type: ActorType,
    /// Set for staff actors only
    pub role: Option<StaffRole>,
}

impl Actor {
    pub fn is_staff(&self) -> bool {
        self.actor_type == ActorType::Staff
    }

    /// Staff-only operations
    pub fn require_staff(&self) -> Result<(), ApiError> {
        if self.is_staff() {
            Ok(())
        } else {
            Err(ApiError::Forbidden("staff account required".to_string()))
        }
    }

    /// Operations gated on admin/manager role
    pub fn require_elevated(&self) -> Result<(), ApiError> {
        self.require_staff()?;
        match self.role {
            Some(role) if role.is_elevated() => Ok(()),
            _ => Err(ApiError::Forbidden("admin or manager role required".to_string())),
        }
    }

    /// Staff may touch any record in their organization; clients only
    /// their own.
    pub fn require_self_or_staff(&self, client_id: &str) -> Result<(), ApiError> {
        if self.is_staff() || self.id == client_id {
            Ok(())
        } else {
            Err(ApiError::Forbidden("clients may only access their own records".to_string()))
        }
    }
}

/// Authentication middleware
///
/// Returns 401 Unauthorized when the bearer token is missing or invalid.
/// Applied to protected routes only; health and login stay public.
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AuthRejection> {
    let token = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .ok_or(AuthRejection::MissingToken)?;

    let claims = verify_token(&state.token_secret, token).map_err(|e| {
        warn!("Token validation failed: {}", e);
        AuthRejection::InvalidToken
    })?;

    let role = match claims.user_type {
        ActorType::Staff => StaffRole::parse(&claims.role),
        ActorType::Client => None,
    };

    let actor = Actor {
        id: claims.sub,
        organization_id: claims.org,
        actor_type: claims.user_type,
        role,
    };
    request.extensions_mut().insert(actor);

    Ok(next.run(request).await)
}

/// Authentication rejection for HTTP responses
#[derive(Debug)]
pub enum AuthRejection {
    MissingToken,
    InvalidToken,
}

impl IntoResponse for AuthRejection {
    fn into_response(self) -> Response {
        let message = match self {
            AuthRejection::MissingToken => "Missing bearer token",
            AuthRejection::InvalidToken => "Invalid or expired token",
        };

        let body = Json(json!({
            "error": {
                "code": "UNAUTHORIZED",
                "message": message,
            }
        }));

        (StatusCode::UNAUTHORIZED, body).into_response()
    }
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub token: String,
    pub actor_id: String,
    pub organization_id: String,
    pub user_type: ActorType,
    pub role: String,
}

/// POST /api/auth/login
///
/// Checks staff accounts first, then client accounts.
pub async fn login(
    State(state): State<AppState>,
    Json(request): Json<LoginRequest>,
) -> ApiResult<Json<LoginResponse>> {
    let ttl = get_setting_i64(&state.db, "token_ttl_seconds", 86400).await? as u64;

    if let Some(staff) = staff::find_staff_by_username(&state.db, &request.username).await? {
        verify_password(&request.password, &staff.password_hash)
            .map_err(|_| ApiError::Unauthorized("invalid credentials".to_string()))?;

        let token = issue_token(
            &state.token_secret,
            &staff.guid,
            &staff.organization_id,
            staff.role.as_str(),
            ActorType::Staff,
            ttl,
        )
        .map_err(|e| ApiError::Internal(format!("token issue failed: {}", e)))?;

        return Ok(Json(LoginResponse {
            token,
            actor_id: staff.guid,
            organization_id: staff.organization_id,
            user_type: ActorType::Staff,
            role: staff.role.as_str().to_string(),
        }));
    }

    if let Some(client) = clients::find_client_by_username(&state.db, &request.username).await? {
        let stored_hash = client
            .password_hash
            .as_deref()
            .ok_or_else(|| ApiError::Unauthorized("invalid credentials".to_string()))?;

        verify_password(&request.password, stored_hash)
            .map_err(|_| ApiError::Unauthorized("invalid credentials".to_string()))?;

        let token = issue_token(
            &state.token_secret,
            &client.guid,
            &client.organization_id,
            "client",
            ActorType::Client,
            ttl,
        )
        .map_err(|e| ApiError::Internal(format!("token issue failed: {}", e)))?;

        return Ok(Json(LoginResponse {
            token,
            actor_id: client.guid,
            organization_id: client.organization_id,
            user_type: ActorType::Client,
            role: "client".to_string(),
        }));
    }

    Err(ApiError::Unauthorized("invalid credentials".to_string()))
}
