//! Work log handlers

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use chrono::NaiveDate;
use serde::Deserialize;
use serde_json::json;

use crate::db::work_logs::WorkLog;
use crate::db::{audit, clients, work_logs};
use crate::error::{ApiError, ApiResult};
use crate::AppState;

use super::{month_period, Actor};

#[derive(Debug, Deserialize)]
pub struct CreateWorkLogRequest {
    pub client_id: String,
    pub date: NaiveDate,
    pub work_type: String,
    pub quantity: f64,
    pub unit: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateWorkLogRequest {
    pub date: Option<NaiveDate>,
    pub work_type: Option<String>,
    pub quantity: Option<f64>,
    pub unit: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct WorkLogQuery {
    pub client_id: String,
    pub year: i32,
    pub month: u32,
}

/// POST /api/work-logs
pub async fn create_work_log(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Json(request): Json<CreateWorkLogRequest>,
) -> ApiResult<(StatusCode, Json<WorkLog>)> {
    actor.require_staff()?;

    if request.quantity < 0.0 {
        return Err(ApiError::BadRequest("quantity must not be negative".to_string()));
    }
    if request.work_type.trim().is_empty() {
        return Err(ApiError::BadRequest("work_type is required".to_string()));
    }

    clients::find_client(&state.db, &actor.organization_id, &request.client_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("client {}", request.client_id)))?;

    let mut log = WorkLog::new(
        actor.organization_id.clone(),
        request.client_id,
        request.date,
        request.work_type,
        request.quantity,
    );
    log.unit = request.unit;

    work_logs::save_work_log(&state.db, &log).await?;

    audit::record(
        &state.db,
        &actor.organization_id,
        &actor.id,
        "create",
        "work_log",
        Some(&log.guid),
        Some(json!({"client_id": log.client_id, "work_type": log.work_type})),
    )
    .await?;

    Ok((StatusCode::CREATED, Json(log)))
}

/// PUT /api/work-logs/:id
pub async fn update_work_log(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(log_id): Path<String>,
    Json(request): Json<UpdateWorkLogRequest>,
) -> ApiResult<Json<WorkLog>> {
    actor.require_staff()?;

    let mut log = work_logs::find_work_log(&state.db, &actor.organization_id, &log_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("work log {}", log_id)))?;

    if let Some(quantity) = request.quantity {
        if quantity < 0.0 {
            return Err(ApiError::BadRequest("quantity must not be negative".to_string()));
        }
        log.quantity = quantity;
    }
    if let Some(date) = request.date {
        log.date = date;
    }
    if let Some(work_type) = request.work_type {
        log.work_type = work_type;
    }
    if let Some(unit) = request.unit {
        log.unit = Some(unit);
    }

    work_logs::save_work_log(&state.db, &log).await?;

    audit::record(
        &state.db,
        &actor.organization_id,
        &actor.id,
        "update",
        "work_log",
        Some(&log.guid),
        None,
    )
    .await?;

    Ok(Json(log))
}

/// DELETE /api/work-logs/:id
pub async fn delete_work_log(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(log_id): Path<String>,
) -> ApiResult<StatusCode> {
    actor.require_staff()?;

    let deleted = work_logs::delete_work_log(&state.db, &actor.organization_id, &log_id).await?;
    if !deleted {
        return Err(ApiError::NotFound(format!("work log {}", log_id)));
    }

    audit::record(
        &state.db,
        &actor.organization_id,
        &actor.id,
        "delete",
        "work_log",
        Some(&log_id),
        None,
    )
    .await?;

    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/work-logs
pub async fn list_work_logs(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Query(query): Query<WorkLogQuery>,
) -> ApiResult<Json<Vec<WorkLog>>> {
    actor.require_self_or_staff(&query.client_id)?;

    let (period_start, period_end) = month_period(query.year, query.month)?;

    let logs = work_logs::list_work_logs_for_client(
        &state.db,
        &actor.organization_id,
        &query.client_id,
        period_start,
        period_end,
    )
    .await?;

    Ok(Json(logs))
}
