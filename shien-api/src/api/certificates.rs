//! Certificate handlers
//!
//! Responses always carry the read-time expiry classification; the
//! stored status column is only a write-time cache.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use shien_common::db::init::get_setting_i64;

use crate::db::certificates::Certificate;
use crate::db::{audit, certificates, clients};
use crate::error::{ApiError, ApiResult};
use crate::expiry::{classify, ExpiryStatus, DEFAULT_REPORT_DAYS, DEFAULT_WARNING_DAYS};
use crate::AppState;

use super::Actor;

#[derive(Debug, Serialize)]
pub struct CertificateResponse {
    #[serde(flatten)]
    pub certificate: Certificate,
    /// Recomputed from valid_until at read time
    pub current_status: ExpiryStatus,
    pub days_remaining: i64,
}

fn with_classification(cert: Certificate, today: NaiveDate, warning: i64, report: i64) -> CertificateResponse {
    let current_status = classify(cert.valid_until, today, warning, report);
    let days_remaining = (cert.valid_until - today).num_days();
    CertificateResponse { certificate: cert, current_status, days_remaining }
}

async fn thresholds(state: &AppState) -> ApiResult<(i64, i64)> {
    let warning = get_setting_i64(&state.db, "expiry_warning_days", DEFAULT_WARNING_DAYS).await?;
    let report = get_setting_i64(&state.db, "expiry_report_days", DEFAULT_REPORT_DAYS).await?;
    Ok((warning, report))
}

#[derive(Debug, Deserialize)]
pub struct CreateCertificateRequest {
    pub client_id: String,
    pub certificate_type: String,
    pub number: Option<String>,
    pub valid_from: Option<NaiveDate>,
    pub valid_until: NaiveDate,
}

#[derive(Debug, Deserialize)]
pub struct UpdateCertificateRequest {
    pub certificate_type: Option<String>,
    pub number: Option<String>,
    pub valid_from: Option<NaiveDate>,
    pub valid_until: Option<NaiveDate>,
}

/// POST /api/certificates
pub async fn create_certificate(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Json(request): Json<CreateCertificateRequest>,
) -> ApiResult<(StatusCode, Json<CertificateResponse>)> {
    actor.require_staff()?;

    clients::find_client(&state.db, &actor.organization_id, &request.client_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("client {}", request.client_id)))?;

    let mut cert = Certificate::new(
        actor.organization_id.clone(),
        request.client_id,
        request.certificate_type,
        request.valid_until,
    );
    cert.number = request.number;
    cert.valid_from = request.valid_from;

    certificates::save_certificate(&state.db, &cert).await?;

    audit::record(
        &state.db,
        &actor.organization_id,
        &actor.id,
        "create",
        "certificate",
        Some(&cert.guid),
        Some(json!({"client_id": cert.client_id, "valid_until": cert.valid_until})),
    )
    .await?;

    let (warning, report) = thresholds(&state).await?;
    let today = Utc::now().date_naive();

    Ok((StatusCode::CREATED, Json(with_classification(cert, today, warning, report))))
}

/// PUT /api/certificates/:id
pub async fn update_certificate(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(cert_id): Path<String>,
    Json(request): Json<UpdateCertificateRequest>,
) -> ApiResult<Json<CertificateResponse>> {
    actor.require_staff()?;

    let mut cert = certificates::find_certificate(&state.db, &actor.organization_id, &cert_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("certificate {}", cert_id)))?;

    if let Some(certificate_type) = request.certificate_type {
        cert.certificate_type = certificate_type;
    }
    if let Some(number) = request.number {
        cert.number = Some(number);
    }
    if let Some(valid_from) = request.valid_from {
        cert.valid_from = Some(valid_from);
    }
    if let Some(valid_until) = request.valid_until {
        cert.valid_until = valid_until;
    }

    certificates::save_certificate(&state.db, &cert).await?;

    audit::record(
        &state.db,
        &actor.organization_id,
        &actor.id,
        "update",
        "certificate",
        Some(&cert.guid),
        None,
    )
    .await?;

    let (warning, report) = thresholds(&state).await?;
    let today = Utc::now().date_naive();

    Ok(Json(with_classification(cert, today, warning, report)))
}

/// GET /api/certificates
pub async fn list_certificates(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
) -> ApiResult<Json<Vec<CertificateResponse>>> {
    actor.require_staff()?;

    let (warning, report) = thresholds(&state).await?;
    let today = Utc::now().date_naive();

    let certs = certificates::list_certificates(&state.db, &actor.organization_id).await?;
    let responses = certs
        .into_iter()
        .map(|cert| with_classification(cert, today, warning, report))
        .collect();

    Ok(Json(responses))
}

#[derive(Debug, Serialize)]
pub struct ExpiryReport {
    pub generated_on: NaiveDate,
    pub expired: Vec<CertificateResponse>,
    pub expiring_soon: Vec<CertificateResponse>,
    pub upcoming: Vec<CertificateResponse>,
}

/// GET /api/certificates/expiry-report
///
/// Everything inside the report horizon, grouped by classification.
pub async fn expiry_report(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
) -> ApiResult<Json<ExpiryReport>> {
    actor.require_staff()?;

    let (warning, report_days) = thresholds(&state).await?;
    let today = Utc::now().date_naive();

    let certs = certificates::list_certificates_expiring(
        &state.db,
        &actor.organization_id,
        today,
        report_days,
    )
    .await?;

    let mut report = ExpiryReport {
        generated_on: today,
        expired: Vec::new(),
        expiring_soon: Vec::new(),
        upcoming: Vec::new(),
    };

    for cert in certs {
        let response = with_classification(cert, today, warning, report_days);
        match response.current_status {
            ExpiryStatus::Expired => report.expired.push(response),
            ExpiryStatus::ExpiringSoon => report.expiring_soon.push(response),
            ExpiryStatus::Upcoming => report.upcoming.push(response),
            ExpiryStatus::Valid => {}
        }
    }

    Ok(Json(report))
}
