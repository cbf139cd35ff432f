//! Payroll run handlers

use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Extension, Json,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::BTreeMap;

use crate::db::payroll::{PayrollLine, PayrollRun};
use crate::db::{audit, clients, payroll};
use crate::error::{ApiError, ApiResult};
use crate::reports;
use crate::AppState;

use super::{month_period, Actor};

#[derive(Debug, Deserialize)]
pub struct CreateRunRequest {
    pub year: i32,
    pub month: u32,
}

#[derive(Debug, Serialize)]
pub struct RunResponse {
    pub run: PayrollRun,
    pub lines: Vec<PayrollLine>,
}

/// POST /api/payroll/runs
///
/// Creates the run and computes every line in one batch. Conflict when a
/// run already covers the period.
pub async fn create_run(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Json(request): Json<CreateRunRequest>,
) -> ApiResult<(StatusCode, Json<RunResponse>)> {
    actor.require_elevated()?;

    let (period_start, period_end) = month_period(request.year, request.month)?;

    let (run, lines) =
        payroll::create_run(&state.db, &actor.organization_id, period_start, period_end).await?;

    audit::record(
        &state.db,
        &actor.organization_id,
        &actor.id,
        "create",
        "payroll_run",
        Some(&run.guid),
        Some(json!({"period_start": run.period_start, "period_end": run.period_end, "lines": lines.len()})),
    )
    .await?;

    Ok((StatusCode::CREATED, Json(RunResponse { run, lines })))
}

/// GET /api/payroll/runs
pub async fn list_runs(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
) -> ApiResult<Json<Vec<PayrollRun>>> {
    actor.require_staff()?;

    let runs = payroll::list_runs(&state.db, &actor.organization_id).await?;
    Ok(Json(runs))
}

/// GET /api/payroll/runs/:id
pub async fn get_run(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(run_id): Path<String>,
) -> ApiResult<Json<RunResponse>> {
    actor.require_staff()?;

    let run = payroll::find_run(&state.db, &actor.organization_id, &run_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("payroll run {}", run_id)))?;
    let lines = payroll::list_lines(&state.db, &run.guid).await?;

    Ok(Json(RunResponse { run, lines }))
}

/// POST /api/payroll/runs/:id/confirm
pub async fn confirm_run(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(run_id): Path<String>,
) -> ApiResult<Json<PayrollRun>> {
    actor.require_elevated()?;

    let run = payroll::confirm_run(&state.db, &actor.organization_id, &run_id, &actor.id).await?;

    audit::record(
        &state.db,
        &actor.organization_id,
        &actor.id,
        "confirm",
        "payroll_run",
        Some(&run.guid),
        None,
    )
    .await?;

    Ok(Json(run))
}

/// POST /api/payroll/runs/:id/pay
pub async fn pay_run(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(run_id): Path<String>,
) -> ApiResult<Json<PayrollRun>> {
    actor.require_elevated()?;

    let run = payroll::mark_paid(&state.db, &actor.organization_id, &run_id).await?;

    audit::record(
        &state.db,
        &actor.organization_id,
        &actor.id,
        "pay",
        "payroll_run",
        Some(&run.guid),
        None,
    )
    .await?;

    Ok(Json(run))
}

/// GET /api/payroll/runs/:id/export.csv
pub async fn export_run_csv(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(run_id): Path<String>,
) -> ApiResult<Response> {
    actor.require_staff()?;

    let run = payroll::find_run(&state.db, &actor.organization_id, &run_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("payroll run {}", run_id)))?;
    let lines = payroll::list_lines(&state.db, &run.guid).await?;

    let client_names: BTreeMap<String, String> = clients::list_clients(&state.db, &actor.organization_id)
        .await?
        .into_iter()
        .map(|c| (c.guid, c.name))
        .collect();

    let named_lines: Vec<(PayrollLine, String)> = lines
        .into_iter()
        .map(|line| {
            let name = client_names.get(&line.client_id).cloned().unwrap_or_default();
            (line, name)
        })
        .collect();

    let csv = reports::payroll_csv(&run, &named_lines);

    let response = (
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!(
                    "attachment; filename=\"payroll_{}_{}.csv\"",
                    run.period_start, run.period_end
                ),
            ),
        ],
        csv,
    )
        .into_response();

    Ok(response)
}
