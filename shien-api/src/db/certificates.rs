//! Certificate database operations
//!
//! The stored status column is refreshed on every write with the same
//! classifier the read endpoints use; reads never trust it.

use chrono::{Duration, NaiveDate, Utc};
use serde::Serialize;
use shien_common::Result;
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

use crate::expiry::{classify, DEFAULT_REPORT_DAYS, DEFAULT_WARNING_DAYS};

/// Certificate record (disability certificate, service eligibility, etc.)
#[derive(Debug, Clone, Serialize)]
pub struct Certificate {
    pub guid: String,
    pub organization_id: String,
    pub client_id: String,
    pub certificate_type: String,
    pub number: Option<String>,
    pub valid_from: Option<NaiveDate>,
    pub valid_until: NaiveDate,
    /// Write-time cache of the expiry classification
    pub status: String,
}

impl Certificate {
    pub fn new(
        organization_id: String,
        client_id: String,
        certificate_type: String,
        valid_until: NaiveDate,
    ) -> Self {
        Self {
            guid: Uuid::new_v4().to_string(),
            organization_id,
            client_id,
            certificate_type,
            number: None,
            valid_from: None,
            valid_until,
            status: "valid".to_string(),
        }
    }
}

fn certificate_from_row(row: &sqlx::sqlite::SqliteRow) -> Certificate {
    Certificate {
        guid: row.get("guid"),
        organization_id: row.get("organization_id"),
        client_id: row.get("client_id"),
        certificate_type: row.get("certificate_type"),
        number: row.get("number"),
        valid_from: row.get("valid_from"),
        valid_until: row.get("valid_until"),
        status: row.get("status"),
    }
}

/// Save a certificate, refreshing the cached status from `valid_until`
pub async fn save_certificate(pool: &SqlitePool, cert: &Certificate) -> Result<()> {
    let today = Utc::now().date_naive();
    let status = classify(cert.valid_until, today, DEFAULT_WARNING_DAYS, DEFAULT_REPORT_DAYS);

    sqlx::query(
        r#"
        INSERT INTO certificates (
            guid, organization_id, client_id, certificate_type, number,
            valid_from, valid_until, status
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?)
        ON CONFLICT(guid) DO UPDATE SET
            certificate_type = excluded.certificate_type,
            number = excluded.number,
            valid_from = excluded.valid_from,
            valid_until = excluded.valid_until,
            status = excluded.status,
            updated_at = CURRENT_TIMESTAMP
        "#,
    )
    .bind(&cert.guid)
    .bind(&cert.organization_id)
    .bind(&cert.client_id)
    .bind(&cert.certificate_type)
    .bind(&cert.number)
    .bind(cert.valid_from)
    .bind(cert.valid_until)
    .bind(status.as_str())
    .execute(pool)
    .await?;

    Ok(())
}

const CERT_COLUMNS: &str =
    "guid, organization_id, client_id, certificate_type, number, valid_from, valid_until, status";

/// Load certificate by guid within an organization
pub async fn find_certificate(
    pool: &SqlitePool,
    organization_id: &str,
    guid: &str,
) -> Result<Option<Certificate>> {
    let row = sqlx::query(&format!(
        "SELECT {} FROM certificates WHERE guid = ? AND organization_id = ?",
        CERT_COLUMNS
    ))
    .bind(guid)
    .bind(organization_id)
    .fetch_optional(pool)
    .await?;

    Ok(row.as_ref().map(certificate_from_row))
}

/// All certificates in an organization
pub async fn list_certificates(pool: &SqlitePool, organization_id: &str) -> Result<Vec<Certificate>> {
    let rows = sqlx::query(&format!(
        "SELECT {} FROM certificates WHERE organization_id = ? ORDER BY valid_until",
        CERT_COLUMNS
    ))
    .bind(organization_id)
    .fetch_all(pool)
    .await?;

    Ok(rows.iter().map(certificate_from_row).collect())
}

/// Certificates expiring within the report horizon (expired included)
pub async fn list_certificates_expiring(
    pool: &SqlitePool,
    organization_id: &str,
    today: NaiveDate,
    report_days: i64,
) -> Result<Vec<Certificate>> {
    let horizon = today + Duration::days(report_days);

    let rows = sqlx::query(&format!(
        "SELECT {} FROM certificates WHERE organization_id = ? AND valid_until <= ? ORDER BY valid_until",
        CERT_COLUMNS
    ))
    .bind(organization_id)
    .bind(horizon)
    .fetch_all(pool)
    .await?;

    Ok(rows.iter().map(certificate_from_row).collect())
}
