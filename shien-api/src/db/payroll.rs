//! Payroll run database operations
//!
//! Run creation computes the whole batch: one line per active client
//! with at least one present day in the period. The overlap check and
//! all inserts share one transaction, so a failed computation rolls the
//! run back instead of leaving a partial batch, and the unique index on
//! (organization_id, period_start, period_end) backstops concurrent
//! creation of the identical period.

use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use shien_common::db::init::get_setting_i64;
use shien_common::Result;
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

use crate::db::{attendance, clients, wage_rules, work_logs};
use crate::error::ApiError;
use crate::payroll::{compute_line, resolve_rule, RunStatus};

/// One computed payroll batch for an organization and period
#[derive(Debug, Clone, Serialize)]
pub struct PayrollRun {
    pub guid: String,
    pub organization_id: String,
    pub period_start: NaiveDate,
    pub period_end: NaiveDate,
    pub status: RunStatus,
    pub confirmed_by: Option<String>,
    pub confirmed_at: Option<DateTime<Utc>>,
    pub paid_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// Per-client result row; immutable once created
#[derive(Debug, Clone, Serialize)]
pub struct PayrollLine {
    pub guid: String,
    pub run_id: String,
    pub client_id: String,
    pub work_days: i64,
    pub total_minutes: i64,
    pub base_amount: i64,
    pub piece_amount: i64,
    pub deductions_amount: i64,
    pub net_amount: i64,
    pub breakdown: serde_json::Value,
}

fn run_from_row(row: &sqlx::sqlite::SqliteRow) -> PayrollRun {
    let status_str: String = row.get("status");
    PayrollRun {
        guid: row.get("guid"),
        organization_id: row.get("organization_id"),
        period_start: row.get("period_start"),
        period_end: row.get("period_end"),
        status: RunStatus::parse(&status_str).unwrap_or(RunStatus::Calculating),
        confirmed_by: row.get("confirmed_by"),
        confirmed_at: row.get("confirmed_at"),
        paid_at: row.get("paid_at"),
        created_at: row.get("created_at"),
    }
}

fn line_from_row(row: &sqlx::sqlite::SqliteRow) -> PayrollLine {
    let breakdown_json: String = row.get("breakdown");
    PayrollLine {
        guid: row.get("guid"),
        run_id: row.get("run_id"),
        client_id: row.get("client_id"),
        work_days: row.get("work_days"),
        total_minutes: row.get("total_minutes"),
        base_amount: row.get("base_amount"),
        piece_amount: row.get("piece_amount"),
        deductions_amount: row.get("deductions_amount"),
        net_amount: row.get("net_amount"),
        breakdown: serde_json::from_str(&breakdown_json).unwrap_or(serde_json::Value::Null),
    }
}

/// Create a payroll run for a period and compute all lines.
///
/// Fails with Conflict when a run already overlaps the period, naming
/// the existing run's id.
pub async fn create_run(
    pool: &SqlitePool,
    organization_id: &str,
    period_start: NaiveDate,
    period_end: NaiveDate,
) -> std::result::Result<(PayrollRun, Vec<PayrollLine>), ApiError> {
    // Gather and compute everything before opening the write transaction
    let standard_day_minutes = get_setting_i64(pool, "standard_day_minutes", 480).await?;
    let active_clients = clients::list_active_clients(pool, organization_id).await?;
    let rules = wage_rules::list_rules(pool, organization_id).await?;

    let mut computed = Vec::new();
    for client in &active_clients {
        let confirmations = attendance::list_confirmations_for_client(
            pool,
            organization_id,
            &client.guid,
            period_start,
            period_end,
        )
        .await?;
        let logs = work_logs::list_work_logs_for_client(
            pool,
            organization_id,
            &client.guid,
            period_start,
            period_end,
        )
        .await?;

        let attendance_inputs: Vec<_> = confirmations.iter().map(|c| c.as_input()).collect();
        let log_inputs: Vec<_> = logs.iter().map(|l| l.as_input()).collect();
        let rule = resolve_rule(&rules, &client.guid, period_start, period_end);

        if let Some(line) = compute_line(rule, &attendance_inputs, &log_inputs, standard_day_minutes)
        {
            computed.push((client.guid.clone(), line));
        }
    }

    let run = PayrollRun {
        guid: Uuid::new_v4().to_string(),
        organization_id: organization_id.to_string(),
        period_start,
        period_end,
        status: RunStatus::Draft,
        confirmed_by: None,
        confirmed_at: None,
        paid_at: None,
        created_at: Utc::now(),
    };

    let mut tx = pool.begin().await?;

    let existing: Option<String> = sqlx::query_scalar(
        "SELECT guid FROM payroll_runs WHERE organization_id = ? AND period_start <= ? AND period_end >= ? LIMIT 1",
    )
    .bind(organization_id)
    .bind(period_end)
    .bind(period_start)
    .fetch_optional(&mut *tx)
    .await?;

    if let Some(existing_guid) = existing {
        return Err(ApiError::Conflict(format!(
            "payroll run {} already covers this period",
            existing_guid
        )));
    }

    let insert_result = sqlx::query(
        r#"
        INSERT INTO payroll_runs (guid, organization_id, period_start, period_end, status, created_at)
        VALUES (?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&run.guid)
    .bind(&run.organization_id)
    .bind(run.period_start)
    .bind(run.period_end)
    .bind(RunStatus::Calculating.as_str())
    .bind(run.created_at)
    .execute(&mut *tx)
    .await;

    if let Err(e) = insert_result {
        if e.as_database_error().map_or(false, |d| d.is_unique_violation()) {
            return Err(ApiError::Conflict(
                "a payroll run already exists for this period".to_string(),
            ));
        }
        return Err(e.into());
    }

    let mut lines = Vec::with_capacity(computed.len());
    for (client_id, computation) in computed {
        let line = PayrollLine {
            guid: Uuid::new_v4().to_string(),
            run_id: run.guid.clone(),
            client_id,
            work_days: computation.work_days,
            total_minutes: computation.total_minutes,
            base_amount: computation.base_amount,
            piece_amount: computation.piece_amount,
            deductions_amount: computation.deductions_amount,
            net_amount: computation.net_amount,
            breakdown: serde_json::to_value(&computation.breakdown)?,
        };

        sqlx::query(
            r#"
            INSERT INTO payroll_lines (
                guid, run_id, client_id, work_days, total_minutes,
                base_amount, piece_amount, deductions_amount, net_amount, breakdown
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&line.guid)
        .bind(&line.run_id)
        .bind(&line.client_id)
        .bind(line.work_days)
        .bind(line.total_minutes)
        .bind(line.base_amount)
        .bind(line.piece_amount)
        .bind(line.deductions_amount)
        .bind(line.net_amount)
        .bind(line.breakdown.to_string())
        .execute(&mut *tx)
        .await?;

        lines.push(line);
    }

    sqlx::query("UPDATE payroll_runs SET status = ?, updated_at = CURRENT_TIMESTAMP WHERE guid = ?")
        .bind(RunStatus::Draft.as_str())
        .bind(&run.guid)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;

    Ok((run, lines))
}

const RUN_COLUMNS: &str =
    "guid, organization_id, period_start, period_end, status, confirmed_by, confirmed_at, paid_at, created_at";

/// Load run by guid within an organization
pub async fn find_run(pool: &SqlitePool, organization_id: &str, guid: &str) -> Result<Option<PayrollRun>> {
    let row = sqlx::query(&format!(
        "SELECT {} FROM payroll_runs WHERE guid = ? AND organization_id = ?",
        RUN_COLUMNS
    ))
    .bind(guid)
    .bind(organization_id)
    .fetch_optional(pool)
    .await?;

    Ok(row.as_ref().map(run_from_row))
}

/// List runs in an organization, most recent period first
pub async fn list_runs(pool: &SqlitePool, organization_id: &str) -> Result<Vec<PayrollRun>> {
    let rows = sqlx::query(&format!(
        "SELECT {} FROM payroll_runs WHERE organization_id = ? ORDER BY period_start DESC",
        RUN_COLUMNS
    ))
    .bind(organization_id)
    .fetch_all(pool)
    .await?;

    Ok(rows.iter().map(run_from_row).collect())
}

/// Lines belonging to a run
pub async fn list_lines(pool: &SqlitePool, run_id: &str) -> Result<Vec<PayrollLine>> {
    let rows = sqlx::query(
        r#"
        SELECT guid, run_id, client_id, work_days, total_minutes,
               base_amount, piece_amount, deductions_amount, net_amount, breakdown
        FROM payroll_lines
        WHERE run_id = ?
        ORDER BY client_id
        "#,
    )
    .bind(run_id)
    .fetch_all(pool)
    .await?;

    Ok(rows.iter().map(line_from_row).collect())
}

/// Confirm a draft run (staff action)
///
/// The guarded UPDATE makes the transition atomic: a concurrent
/// transition loses and surfaces as Conflict.
pub async fn confirm_run(
    pool: &SqlitePool,
    organization_id: &str,
    guid: &str,
    staff_id: &str,
) -> std::result::Result<PayrollRun, ApiError> {
    let result = sqlx::query(
        "UPDATE payroll_runs SET status = 'confirmed', confirmed_by = ?, confirmed_at = ?, updated_at = CURRENT_TIMESTAMP \
         WHERE guid = ? AND organization_id = ? AND status = 'draft'",
    )
    .bind(staff_id)
    .bind(Utc::now())
    .bind(guid)
    .bind(organization_id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return match find_run(pool, organization_id, guid).await? {
            None => Err(ApiError::NotFound(format!("payroll run {}", guid))),
            Some(run) => Err(ApiError::Conflict(format!(
                "payroll run cannot move from '{}' to 'confirmed'",
                run.status
            ))),
        };
    }

    find_run(pool, organization_id, guid)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("payroll run {}", guid)))
}

/// Mark a confirmed run paid (staff action)
pub async fn mark_paid(
    pool: &SqlitePool,
    organization_id: &str,
    guid: &str,
) -> std::result::Result<PayrollRun, ApiError> {
    let result = sqlx::query(
        "UPDATE payroll_runs SET status = 'paid', paid_at = ?, updated_at = CURRENT_TIMESTAMP \
         WHERE guid = ? AND organization_id = ? AND status = 'confirmed'",
    )
    .bind(Utc::now())
    .bind(guid)
    .bind(organization_id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return match find_run(pool, organization_id, guid).await? {
            None => Err(ApiError::NotFound(format!("payroll run {}", guid))),
            Some(run) => Err(ApiError::Conflict(format!(
                "payroll run cannot move from '{}' to 'paid'",
                run.status
            ))),
        };
    }

    find_run(pool, organization_id, guid)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("payroll run {}", guid)))
}
