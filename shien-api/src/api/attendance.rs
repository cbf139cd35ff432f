//! Attendance handlers
//!
//! Self-reports come from clients; confirmations are the staff record
//! payroll trusts. The monthly summary aggregates confirmations only.

use axum::{
    extract::{Query, State},
    Extension, Json,
};
use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};
use serde_json::json;
use shien_common::api::auth::ActorType;
use std::collections::BTreeMap;

use crate::db::attendance::{
    AttendanceConfirmation, AttendanceReport, AttendanceStatus,
};
use crate::db::{attendance, audit, clients};
use crate::error::{ApiError, ApiResult};
use crate::AppState;

use super::{month_period, Actor};

#[derive(Debug, Deserialize)]
pub struct SubmitReportRequest {
    /// Required for staff submitting on a client's behalf; ignored for
    /// client actors, who always report for themselves
    pub client_id: Option<String>,
    pub date: NaiveDate,
    pub check_in_time: Option<NaiveTime>,
    pub check_out_time: Option<NaiveTime>,
    pub condition_note: Option<String>,
}

/// POST /api/attendance/reports
pub async fn submit_report(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Json(request): Json<SubmitReportRequest>,
) -> ApiResult<Json<AttendanceReport>> {
    let client_id = match actor.actor_type {
        ActorType::Client => actor.id.clone(),
        ActorType::Staff => request
            .client_id
            .clone()
            .ok_or_else(|| ApiError::BadRequest("client_id is required".to_string()))?,
    };

    clients::find_client(&state.db, &actor.organization_id, &client_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("client {}", client_id)))?;

    let mut report = AttendanceReport::new(actor.organization_id.clone(), client_id, request.date);
    report.check_in_time = request.check_in_time;
    report.check_out_time = request.check_out_time;
    report.condition_note = request.condition_note;

    attendance::upsert_report(&state.db, &report).await?;

    audit::record(
        &state.db,
        &actor.organization_id,
        &actor.id,
        "submit",
        "attendance_report",
        Some(&report.guid),
        Some(json!({"client_id": report.client_id, "date": report.date})),
    )
    .await?;

    Ok(Json(report))
}

#[derive(Debug, Deserialize)]
pub struct ConfirmAttendanceRequest {
    pub client_id: String,
    pub date: NaiveDate,
    pub status: String,
    pub check_in_time: Option<NaiveTime>,
    pub check_out_time: Option<NaiveTime>,
    pub actual_minutes: Option<i64>,
    pub note: Option<String>,
}

/// PUT /api/attendance/confirmations
///
/// Staff-authoritative upsert for (client, date).
pub async fn confirm_attendance(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Json(request): Json<ConfirmAttendanceRequest>,
) -> ApiResult<Json<AttendanceConfirmation>> {
    actor.require_staff()?;

    let status = AttendanceStatus::parse(&request.status)
        .ok_or_else(|| ApiError::BadRequest(format!("invalid attendance status: {}", request.status)))?;

    clients::find_client(&state.db, &actor.organization_id, &request.client_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("client {}", request.client_id)))?;

    if let Some(minutes) = request.actual_minutes {
        if minutes < 0 {
            return Err(ApiError::BadRequest("actual_minutes must not be negative".to_string()));
        }
    }

    let mut conf = AttendanceConfirmation::new(
        actor.organization_id.clone(),
        request.client_id,
        request.date,
        status,
    );
    conf.check_in_time = request.check_in_time;
    conf.check_out_time = request.check_out_time;
    conf.actual_minutes = request.actual_minutes;
    conf.note = request.note;
    conf.confirmed_by = Some(actor.id.clone());

    attendance::upsert_confirmation(&state.db, &conf).await?;

    audit::record(
        &state.db,
        &actor.organization_id,
        &actor.id,
        "confirm",
        "attendance_confirmation",
        Some(&conf.guid),
        Some(json!({"client_id": conf.client_id, "date": conf.date, "status": conf.status})),
    )
    .await?;

    Ok(Json(conf))
}

#[derive(Debug, Deserialize)]
pub struct AttendanceQuery {
    pub client_id: Option<String>,
    pub year: i32,
    pub month: u32,
}

/// GET /api/attendance/confirmations
pub async fn list_confirmations(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Query(query): Query<AttendanceQuery>,
) -> ApiResult<Json<Vec<AttendanceConfirmation>>> {
    let (period_start, period_end) = month_period(query.year, query.month)?;

    let client_id = match actor.actor_type {
        ActorType::Client => actor.id.clone(),
        ActorType::Staff => match query.client_id {
            Some(client_id) => client_id,
            None => {
                let all = attendance::list_confirmations_for_period(
                    &state.db,
                    &actor.organization_id,
                    period_start,
                    period_end,
                )
                .await?;
                return Ok(Json(all));
            }
        },
    };

    let confirmations = attendance::list_confirmations_for_client(
        &state.db,
        &actor.organization_id,
        &client_id,
        period_start,
        period_end,
    )
    .await?;

    Ok(Json(confirmations))
}

#[derive(Debug, Serialize)]
pub struct AttendanceSummaryRow {
    pub client_id: String,
    pub client_name: String,
    pub days_present: i64,
    pub days_absent: i64,
    pub days_late: i64,
    pub days_early_leave: i64,
    pub total_minutes: i64,
}

#[derive(Debug, Deserialize)]
pub struct SummaryQuery {
    pub year: i32,
    pub month: u32,
}

/// GET /api/attendance/summary
///
/// Monthly utilization per client, from confirmations only.
pub async fn attendance_summary(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Query(query): Query<SummaryQuery>,
) -> ApiResult<Json<Vec<AttendanceSummaryRow>>> {
    actor.require_staff()?;

    let (period_start, period_end) = month_period(query.year, query.month)?;
    let standard_day_minutes =
        shien_common::db::init::get_setting_i64(&state.db, "standard_day_minutes", 480).await?;

    let confirmations = attendance::list_confirmations_for_period(
        &state.db,
        &actor.organization_id,
        period_start,
        period_end,
    )
    .await?;

    let client_names: BTreeMap<String, String> = clients::list_clients(&state.db, &actor.organization_id)
        .await?
        .into_iter()
        .map(|c| (c.guid, c.name))
        .collect();

    let mut rows: BTreeMap<String, AttendanceSummaryRow> = BTreeMap::new();
    for conf in confirmations {
        let row = rows.entry(conf.client_id.clone()).or_insert_with(|| AttendanceSummaryRow {
            client_id: conf.client_id.clone(),
            client_name: client_names.get(&conf.client_id).cloned().unwrap_or_default(),
            days_present: 0,
            days_absent: 0,
            days_late: 0,
            days_early_leave: 0,
            total_minutes: 0,
        });

        match conf.status {
            AttendanceStatus::Present => {
                row.days_present += 1;
                row.total_minutes +=
                    crate::payroll::calc::credited_minutes(&conf.as_input(), standard_day_minutes);
            }
            AttendanceStatus::Absent => row.days_absent += 1,
            AttendanceStatus::Late => row.days_late += 1,
            AttendanceStatus::EarlyLeave => row.days_early_leave += 1,
        }
    }

    Ok(Json(rows.into_values().collect()))
}
