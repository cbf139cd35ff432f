//! Client record handlers

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use chrono::NaiveDate;
use serde::Deserialize;
use serde_json::json;
use shien_common::api::auth::hash_password;

use crate::db::{audit, clients};
use crate::db::clients::Client;
use crate::error::{ApiError, ApiResult};
use crate::AppState;

use super::Actor;

#[derive(Debug, Deserialize)]
pub struct CreateClientRequest {
    pub name: String,
    pub kana: Option<String>,
    pub joined_on: Option<NaiveDate>,
    pub username: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateClientRequest {
    pub name: Option<String>,
    pub kana: Option<String>,
    pub status: Option<String>,
    pub joined_on: Option<NaiveDate>,
}

/// GET /api/clients
pub async fn list_clients(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
) -> ApiResult<Json<Vec<Client>>> {
    actor.require_staff()?;

    let clients = clients::list_clients(&state.db, &actor.organization_id).await?;
    Ok(Json(clients))
}

/// GET /api/clients/:id
pub async fn get_client(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(client_id): Path<String>,
) -> ApiResult<Json<Client>> {
    actor.require_self_or_staff(&client_id)?;

    let client = clients::find_client(&state.db, &actor.organization_id, &client_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("client {}", client_id)))?;

    Ok(Json(client))
}

/// POST /api/clients
pub async fn create_client(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Json(request): Json<CreateClientRequest>,
) -> ApiResult<(StatusCode, Json<Client>)> {
    actor.require_staff()?;

    if request.name.trim().is_empty() {
        return Err(ApiError::BadRequest("client name is required".to_string()));
    }

    let mut client = Client::new(actor.organization_id.clone(), request.name);
    client.kana = request.kana;
    client.joined_on = request.joined_on;
    client.username = request.username;
    if let Some(password) = request.password {
        let hash = hash_password(&password)
            .map_err(|e| ApiError::Internal(format!("password hash failed: {}", e)))?;
        client.password_hash = Some(hash);
    }

    clients::save_client(&state.db, &client).await?;

    audit::record(
        &state.db,
        &actor.organization_id,
        &actor.id,
        "create",
        "client",
        Some(&client.guid),
        Some(json!({"name": client.name})),
    )
    .await?;

    Ok((StatusCode::CREATED, Json(client)))
}

/// PUT /api/clients/:id
pub async fn update_client(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(client_id): Path<String>,
    Json(request): Json<UpdateClientRequest>,
) -> ApiResult<Json<Client>> {
    actor.require_staff()?;

    let mut client = clients::find_client(&state.db, &actor.organization_id, &client_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("client {}", client_id)))?;

    if let Some(status) = &request.status {
        if status != "active" && status != "inactive" {
            return Err(ApiError::BadRequest(format!("invalid client status: {}", status)));
        }
        client.status = status.clone();
    }
    if let Some(name) = request.name {
        client.name = name;
    }
    if let Some(kana) = request.kana {
        client.kana = Some(kana);
    }
    if let Some(joined_on) = request.joined_on {
        client.joined_on = Some(joined_on);
    }

    clients::save_client(&state.db, &client).await?;

    audit::record(
        &state.db,
        &actor.organization_id,
        &actor.id,
        "update",
        "client",
        Some(&client.guid),
        None,
    )
    .await?;

    Ok(Json(client))
}
