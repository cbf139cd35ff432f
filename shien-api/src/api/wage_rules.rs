//! Wage rule handlers
//!
//! Editing pricing policies requires an elevated staff role. The
//! single-default invariant per scope is maintained by the save path.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use chrono::{NaiveDate, Utc};
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

use crate::db::{audit, clients, wage_rules};
use crate::error::{ApiError, ApiResult};
use crate::payroll::{CalculationType, Deduction, PieceRates, WageRule};
use crate::AppState;

use super::Actor;

#[derive(Debug, Deserialize)]
pub struct CreateWageRuleRequest {
    /// None = facility-wide rule
    pub client_id: Option<String>,
    pub name: String,
    pub calculation_type: CalculationType,
    pub hourly_rate: Option<f64>,
    pub daily_rate: Option<f64>,
    #[serde(default)]
    pub piece_rates: Option<PieceRates>,
    #[serde(default)]
    pub deductions: Vec<Deduction>,
    pub valid_from: NaiveDate,
    pub valid_until: Option<NaiveDate>,
    #[serde(default)]
    pub is_default: bool,
}

#[derive(Debug, Deserialize)]
pub struct UpdateWageRuleRequest {
    pub name: Option<String>,
    pub calculation_type: Option<CalculationType>,
    pub hourly_rate: Option<f64>,
    pub daily_rate: Option<f64>,
    pub piece_rates: Option<PieceRates>,
    pub deductions: Option<Vec<Deduction>>,
    pub valid_from: Option<NaiveDate>,
    pub valid_until: Option<NaiveDate>,
    pub is_default: Option<bool>,
}

fn validate_interval(valid_from: NaiveDate, valid_until: Option<NaiveDate>) -> Result<(), ApiError> {
    if let Some(until) = valid_until {
        if until < valid_from {
            return Err(ApiError::BadRequest(
                "valid_until must not precede valid_from".to_string(),
            ));
        }
    }
    Ok(())
}

/// POST /api/wage-rules
pub async fn create_wage_rule(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Json(request): Json<CreateWageRuleRequest>,
) -> ApiResult<(StatusCode, Json<WageRule>)> {
    actor.require_elevated()?;

    if request.name.trim().is_empty() {
        return Err(ApiError::BadRequest("rule name is required".to_string()));
    }
    validate_interval(request.valid_from, request.valid_until)?;

    if let Some(client_id) = &request.client_id {
        clients::find_client(&state.db, &actor.organization_id, client_id)
            .await?
            .ok_or_else(|| ApiError::NotFound(format!("client {}", client_id)))?;
    }

    let rule = WageRule {
        guid: Uuid::new_v4().to_string(),
        organization_id: actor.organization_id.clone(),
        client_id: request.client_id,
        name: request.name,
        calculation_type: request.calculation_type,
        hourly_rate: request.hourly_rate,
        daily_rate: request.daily_rate,
        piece_rates: request.piece_rates.unwrap_or_default(),
        deductions: request.deductions,
        valid_from: request.valid_from,
        valid_until: request.valid_until,
        is_default: request.is_default,
        created_at: Utc::now(),
    };

    wage_rules::save_rule(&state.db, &rule).await?;

    audit::record(
        &state.db,
        &actor.organization_id,
        &actor.id,
        "create",
        "wage_rule",
        Some(&rule.guid),
        Some(json!({"name": rule.name, "calculation_type": rule.calculation_type})),
    )
    .await?;

    Ok((StatusCode::CREATED, Json(rule)))
}

/// PUT /api/wage-rules/:id
pub async fn update_wage_rule(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(rule_id): Path<String>,
    Json(request): Json<UpdateWageRuleRequest>,
) -> ApiResult<Json<WageRule>> {
    actor.require_elevated()?;

    let mut rule = wage_rules::find_rule(&state.db, &actor.organization_id, &rule_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("wage rule {}", rule_id)))?;

    if let Some(name) = request.name {
        rule.name = name;
    }
    if let Some(calculation_type) = request.calculation_type {
        rule.calculation_type = calculation_type;
    }
    if let Some(hourly_rate) = request.hourly_rate {
        rule.hourly_rate = Some(hourly_rate);
    }
    if let Some(daily_rate) = request.daily_rate {
        rule.daily_rate = Some(daily_rate);
    }
    if let Some(piece_rates) = request.piece_rates {
        rule.piece_rates = piece_rates;
    }
    if let Some(deductions) = request.deductions {
        rule.deductions = deductions;
    }
    if let Some(valid_from) = request.valid_from {
        rule.valid_from = valid_from;
    }
    if let Some(valid_until) = request.valid_until {
        rule.valid_until = Some(valid_until);
    }
    if let Some(is_default) = request.is_default {
        rule.is_default = is_default;
    }

    validate_interval(rule.valid_from, rule.valid_until)?;

    wage_rules::save_rule(&state.db, &rule).await?;

    audit::record(
        &state.db,
        &actor.organization_id,
        &actor.id,
        "update",
        "wage_rule",
        Some(&rule.guid),
        None,
    )
    .await?;

    Ok(Json(rule))
}

/// GET /api/wage-rules
pub async fn list_wage_rules(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
) -> ApiResult<Json<Vec<WageRule>>> {
    actor.require_staff()?;

    let rules = wage_rules::list_rules(&state.db, &actor.organization_id).await?;
    Ok(Json(rules))
}

/// GET /api/wage-rules/:id
pub async fn get_wage_rule(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(rule_id): Path<String>,
) -> ApiResult<Json<WageRule>> {
    actor.require_staff()?;

    let rule = wage_rules::find_rule(&state.db, &actor.organization_id, &rule_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("wage rule {}", rule_id)))?;

    Ok(Json(rule))
}
