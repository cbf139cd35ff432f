//! Attendance database operations
//!
//! Two distinct records: the client's self-declared report and the
//! staff-authoritative confirmation. Confirmations are the source of
//! truth for payroll and utilization; at most one exists per
//! (client, date), upserted in place.

use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};
use shien_common::Result;
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

use crate::payroll::AttendanceInput;

/// Confirmation status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttendanceStatus {
    Present,
    Absent,
    Late,
    EarlyLeave,
}

impl AttendanceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AttendanceStatus::Present => "present",
            AttendanceStatus::Absent => "absent",
            AttendanceStatus::Late => "late",
            AttendanceStatus::EarlyLeave => "early_leave",
        }
    }

    pub fn parse(s: &str) -> Option<AttendanceStatus> {
        match s {
            "present" => Some(AttendanceStatus::Present),
            "absent" => Some(AttendanceStatus::Absent),
            "late" => Some(AttendanceStatus::Late),
            "early_leave" => Some(AttendanceStatus::EarlyLeave),
            _ => None,
        }
    }
}

/// Staff-authoritative attendance record
#[derive(Debug, Clone, Serialize)]
pub struct AttendanceConfirmation {
    pub guid: String,
    pub organization_id: String,
    pub client_id: String,
    pub date: NaiveDate,
    pub status: AttendanceStatus,
    pub check_in_time: Option<NaiveTime>,
    pub check_out_time: Option<NaiveTime>,
    pub actual_minutes: Option<i64>,
    pub note: Option<String>,
    pub confirmed_by: Option<String>,
}

impl AttendanceConfirmation {
    pub fn new(
        organization_id: String,
        client_id: String,
        date: NaiveDate,
        status: AttendanceStatus,
    ) -> Self {
        Self {
            guid: Uuid::new_v4().to_string(),
            organization_id,
            client_id,
            date,
            status,
            check_in_time: None,
            check_out_time: None,
            actual_minutes: None,
            note: None,
            confirmed_by: None,
        }
    }

    /// View used by the payroll engine
    pub fn as_input(&self) -> AttendanceInput {
        AttendanceInput {
            present: self.status == AttendanceStatus::Present,
            check_in_time: self.check_in_time,
            check_out_time: self.check_out_time,
            actual_minutes: self.actual_minutes,
        }
    }
}

/// Client self-declared attendance claim
#[derive(Debug, Clone, Serialize)]
pub struct AttendanceReport {
    pub guid: String,
    pub organization_id: String,
    pub client_id: String,
    pub date: NaiveDate,
    pub check_in_time: Option<NaiveTime>,
    pub check_out_time: Option<NaiveTime>,
    pub condition_note: Option<String>,
}

impl AttendanceReport {
    pub fn new(organization_id: String, client_id: String, date: NaiveDate) -> Self {
        Self {
            guid: Uuid::new_v4().to_string(),
            organization_id,
            client_id,
            date,
            check_in_time: None,
            check_out_time: None,
            condition_note: None,
        }
    }
}

fn confirmation_from_row(row: &sqlx::sqlite::SqliteRow) -> AttendanceConfirmation {
    let status_str: String = row.get("status");
    AttendanceConfirmation {
        guid: row.get("guid"),
        organization_id: row.get("organization_id"),
        client_id: row.get("client_id"),
        date: row.get("date"),
        status: AttendanceStatus::parse(&status_str).unwrap_or(AttendanceStatus::Absent),
        check_in_time: row.get("check_in_time"),
        check_out_time: row.get("check_out_time"),
        actual_minutes: row.get("actual_minutes"),
        note: row.get("note"),
        confirmed_by: row.get("confirmed_by"),
    }
}

/// Upsert the confirmation for (client, date)
pub async fn upsert_confirmation(pool: &SqlitePool, conf: &AttendanceConfirmation) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO attendance_confirmations (
            guid, organization_id, client_id, date, status,
            check_in_time, check_out_time, actual_minutes, note, confirmed_by
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        ON CONFLICT(client_id, date) DO UPDATE SET
            status = excluded.status,
            check_in_time = excluded.check_in_time,
            check_out_time = excluded.check_out_time,
            actual_minutes = excluded.actual_minutes,
            note = excluded.note,
            confirmed_by = excluded.confirmed_by,
            updated_at = CURRENT_TIMESTAMP
        "#,
    )
    .bind(&conf.guid)
    .bind(&conf.organization_id)
    .bind(&conf.client_id)
    .bind(conf.date)
    .bind(conf.status.as_str())
    .bind(conf.check_in_time)
    .bind(conf.check_out_time)
    .bind(conf.actual_minutes)
    .bind(&conf.note)
    .bind(&conf.confirmed_by)
    .execute(pool)
    .await?;

    Ok(())
}

/// Confirmations for one client over a period
pub async fn list_confirmations_for_client(
    pool: &SqlitePool,
    organization_id: &str,
    client_id: &str,
    period_start: NaiveDate,
    period_end: NaiveDate,
) -> Result<Vec<AttendanceConfirmation>> {
    let rows = sqlx::query(
        r#"
        SELECT guid, organization_id, client_id, date, status,
               check_in_time, check_out_time, actual_minutes, note, confirmed_by
        FROM attendance_confirmations
        WHERE organization_id = ? AND client_id = ? AND date >= ? AND date <= ?
        ORDER BY date
        "#,
    )
    .bind(organization_id)
    .bind(client_id)
    .bind(period_start)
    .bind(period_end)
    .fetch_all(pool)
    .await?;

    Ok(rows.iter().map(confirmation_from_row).collect())
}

/// All confirmations in an organization over a period
pub async fn list_confirmations_for_period(
    pool: &SqlitePool,
    organization_id: &str,
    period_start: NaiveDate,
    period_end: NaiveDate,
) -> Result<Vec<AttendanceConfirmation>> {
    let rows = sqlx::query(
        r#"
        SELECT guid, organization_id, client_id, date, status,
               check_in_time, check_out_time, actual_minutes, note, confirmed_by
        FROM attendance_confirmations
        WHERE organization_id = ? AND date >= ? AND date <= ?
        ORDER BY client_id, date
        "#,
    )
    .bind(organization_id)
    .bind(period_start)
    .bind(period_end)
    .fetch_all(pool)
    .await?;

    Ok(rows.iter().map(confirmation_from_row).collect())
}

/// Upsert the client's self-report for (client, date)
pub async fn upsert_report(pool: &SqlitePool, report: &AttendanceReport) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO attendance_reports (
            guid, organization_id, client_id, date,
            check_in_time, check_out_time, condition_note
        ) VALUES (?, ?, ?, ?, ?, ?, ?)
        ON CONFLICT(client_id, date) DO UPDATE SET
            check_in_time = excluded.check_in_time,
            check_out_time = excluded.check_out_time,
            condition_note = excluded.condition_note,
            updated_at = CURRENT_TIMESTAMP
        "#,
    )
    .bind(&report.guid)
    .bind(&report.organization_id)
    .bind(&report.client_id)
    .bind(report.date)
    .bind(report.check_in_time)
    .bind(report.check_out_time)
    .bind(&report.condition_note)
    .execute(pool)
    .await?;

    Ok(())
}

/// Self-reports for one client over a period
pub async fn list_reports_for_client(
    pool: &SqlitePool,
    organization_id: &str,
    client_id: &str,
    period_start: NaiveDate,
    period_end: NaiveDate,
) -> Result<Vec<AttendanceReport>> {
    let rows = sqlx::query(
        r#"
        SELECT guid, organization_id, client_id, date,
               check_in_time, check_out_time, condition_note
        FROM attendance_reports
        WHERE organization_id = ? AND client_id = ? AND date >= ? AND date <= ?
        ORDER BY date
        "#,
    )
    .bind(organization_id)
    .bind(client_id)
    .bind(period_start)
    .bind(period_end)
    .fetch_all(pool)
    .await?;

    Ok(rows
        .iter()
        .map(|row| AttendanceReport {
            guid: row.get("guid"),
            organization_id: row.get("organization_id"),
            client_id: row.get("client_id"),
            date: row.get("date"),
            check_in_time: row.get("check_in_time"),
            check_out_time: row.get("check_out_time"),
            condition_note: row.get("condition_note"),
        })
        .collect())
}
