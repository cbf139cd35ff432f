//! Work log database operations
//!
//! One row per (client, date, work type); quantities feed piece-rate pay.

use chrono::NaiveDate;
use serde::Serialize;
use shien_common::Result;
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

use crate::payroll::WorkLogInput;

/// Work log record
#[derive(Debug, Clone, Serialize)]
pub struct WorkLog {
    pub guid: String,
    pub organization_id: String,
    pub client_id: String,
    pub date: NaiveDate,
    pub work_type: String,
    pub quantity: f64,
    pub unit: Option<String>,
}

impl WorkLog {
    pub fn new(
        organization_id: String,
        client_id: String,
        date: NaiveDate,
        work_type: String,
        quantity: f64,
    ) -> Self {
        Self {
            guid: Uuid::new_v4().to_string(),
            organization_id,
            client_id,
            date,
            work_type,
            quantity,
            unit: None,
        }
    }

    /// View used by the payroll engine
    pub fn as_input(&self) -> WorkLogInput {
        WorkLogInput {
            work_type: self.work_type.clone(),
            quantity: self.quantity,
        }
    }
}

fn work_log_from_row(row: &sqlx::sqlite::SqliteRow) -> WorkLog {
    WorkLog {
        guid: row.get("guid"),
        organization_id: row.get("organization_id"),
        client_id: row.get("client_id"),
        date: row.get("date"),
        work_type: row.get("work_type"),
        quantity: row.get("quantity"),
        unit: row.get("unit"),
    }
}

/// Save work log
pub async fn save_work_log(pool: &SqlitePool, log: &WorkLog) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO work_logs (guid, organization_id, client_id, date, work_type, quantity, unit)
        VALUES (?, ?, ?, ?, ?, ?, ?)
        ON CONFLICT(guid) DO UPDATE SET
            date = excluded.date,
            work_type = excluded.work_type,
            quantity = excluded.quantity,
            unit = excluded.unit,
            updated_at = CURRENT_TIMESTAMP
        "#,
    )
    .bind(&log.guid)
    .bind(&log.organization_id)
    .bind(&log.client_id)
    .bind(log.date)
    .bind(&log.work_type)
    .bind(log.quantity)
    .bind(&log.unit)
    .execute(pool)
    .await?;

    Ok(())
}

/// Load work log by guid within an organization
pub async fn find_work_log(
    pool: &SqlitePool,
    organization_id: &str,
    guid: &str,
) -> Result<Option<WorkLog>> {
    let row = sqlx::query(
        "SELECT guid, organization_id, client_id, date, work_type, quantity, unit FROM work_logs WHERE guid = ? AND organization_id = ?",
    )
    .bind(guid)
    .bind(organization_id)
    .fetch_optional(pool)
    .await?;

    Ok(row.as_ref().map(work_log_from_row))
}

/// Delete work log
pub async fn delete_work_log(pool: &SqlitePool, organization_id: &str, guid: &str) -> Result<bool> {
    let result = sqlx::query("DELETE FROM work_logs WHERE guid = ? AND organization_id = ?")
        .bind(guid)
        .bind(organization_id)
        .execute(pool)
        .await?;

    Ok(result.rows_affected() > 0)
}

/// Work logs for one client over a period
pub async fn list_work_logs_for_client(
    pool: &SqlitePool,
    organization_id: &str,
    client_id: &str,
    period_start: NaiveDate,
    period_end: NaiveDate,
) -> Result<Vec<WorkLog>> {
    let rows = sqlx::query(
        r#"
        SELECT guid, organization_id, client_id, date, work_type, quantity, unit
        FROM work_logs
        WHERE organization_id = ? AND client_id = ? AND date >= ? AND date <= ?
        ORDER BY date, work_type
        "#,
    )
    .bind(organization_id)
    .bind(client_id)
    .bind(period_start)
    .bind(period_end)
    .fetch_all(pool)
    .await?;

    Ok(rows.iter().map(work_log_from_row).collect())
}
