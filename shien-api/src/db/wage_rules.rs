//! Wage rule database operations
//!
//! Persists `crate::payroll::WageRule`. At most one rule may carry
//! `is_default` per (organization, client-scope); the save path clears
//! prior defaults inside the same transaction as the write.

use shien_common::Result;
use sqlx::{Row, SqlitePool};

use crate::payroll::{CalculationType, Deduction, PieceRates, WageRule};

fn rule_from_row(row: &sqlx::sqlite::SqliteRow) -> Result<WageRule> {
    let calc_str: String = row.get("calculation_type");
    let calculation_type = CalculationType::parse(&calc_str).ok_or_else(|| {
        shien_common::Error::Internal(format!("Unknown calculation type: {}", calc_str))
    })?;

    let piece_rates_json: String = row.get("piece_rates");
    let piece_rates: PieceRates = serde_json::from_str(&piece_rates_json)
        .map_err(|e| shien_common::Error::Internal(format!("Failed to parse piece_rates: {}", e)))?;

    let deductions_json: String = row.get("deductions");
    let deductions: Vec<Deduction> = serde_json::from_str(&deductions_json)
        .map_err(|e| shien_common::Error::Internal(format!("Failed to parse deductions: {}", e)))?;

    Ok(WageRule {
        guid: row.get("guid"),
        organization_id: row.get("organization_id"),
        client_id: row.get("client_id"),
        name: row.get("name"),
        calculation_type,
        hourly_rate: row.get("hourly_rate"),
        daily_rate: row.get("daily_rate"),
        piece_rates,
        deductions,
        valid_from: row.get("valid_from"),
        valid_until: row.get("valid_until"),
        is_default: row.get::<i64, _>("is_default") != 0,
        created_at: row.get("created_at"),
    })
}

const RULE_COLUMNS: &str = "guid, organization_id, client_id, name, calculation_type, \
     hourly_rate, daily_rate, piece_rates, deductions, valid_from, valid_until, is_default, created_at";

/// Save a wage rule, maintaining the single-default invariant for its scope
pub async fn save_rule(pool: &SqlitePool, rule: &WageRule) -> Result<()> {
    let piece_rates_json = serde_json::to_string(&rule.piece_rates)
        .map_err(|e| shien_common::Error::Internal(format!("Failed to serialize piece_rates: {}", e)))?;
    let deductions_json = serde_json::to_string(&rule.deductions)
        .map_err(|e| shien_common::Error::Internal(format!("Failed to serialize deductions: {}", e)))?;

    let mut tx = pool.begin().await?;

    if rule.is_default {
        // Clear any other default in the same (organization, client-scope)
        sqlx::query(
            "UPDATE wage_rules SET is_default = 0, updated_at = CURRENT_TIMESTAMP \
             WHERE organization_id = ? AND client_id IS ? AND is_default = 1 AND guid != ?",
        )
        .bind(&rule.organization_id)
        .bind(&rule.client_id)
        .bind(&rule.guid)
        .execute(&mut *tx)
        .await?;
    }

    sqlx::query(
        r#"
        INSERT INTO wage_rules (
            guid, organization_id, client_id, name, calculation_type,
            hourly_rate, daily_rate, piece_rates, deductions,
            valid_from, valid_until, is_default, created_at
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        ON CONFLICT(guid) DO UPDATE SET
            name = excluded.name,
            calculation_type = excluded.calculation_type,
            hourly_rate = excluded.hourly_rate,
            daily_rate = excluded.daily_rate,
            piece_rates = excluded.piece_rates,
            deductions = excluded.deductions,
            valid_from = excluded.valid_from,
            valid_until = excluded.valid_until,
            is_default = excluded.is_default,
            updated_at = CURRENT_TIMESTAMP
        "#,
    )
    .bind(&rule.guid)
    .bind(&rule.organization_id)
    .bind(&rule.client_id)
    .bind(&rule.name)
    .bind(rule.calculation_type.as_str())
    .bind(rule.hourly_rate)
    .bind(rule.daily_rate)
    .bind(&piece_rates_json)
    .bind(&deductions_json)
    .bind(rule.valid_from)
    .bind(rule.valid_until)
    .bind(rule.is_default as i64)
    .bind(rule.created_at)
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;

    Ok(())
}

/// Load rule by guid within an organization
pub async fn find_rule(pool: &SqlitePool, organization_id: &str, guid: &str) -> Result<Option<WageRule>> {
    let row = sqlx::query(&format!(
        "SELECT {} FROM wage_rules WHERE guid = ? AND organization_id = ?",
        RULE_COLUMNS
    ))
    .bind(guid)
    .bind(organization_id)
    .fetch_optional(pool)
    .await?;

    row.as_ref().map(rule_from_row).transpose()
}

/// All rules in an organization (resolution input)
pub async fn list_rules(pool: &SqlitePool, organization_id: &str) -> Result<Vec<WageRule>> {
    let rows = sqlx::query(&format!(
        "SELECT {} FROM wage_rules WHERE organization_id = ? ORDER BY valid_from DESC, created_at DESC",
        RULE_COLUMNS
    ))
    .bind(organization_id)
    .fetch_all(pool)
    .await?;

    rows.iter().map(rule_from_row).collect()
}
