//! Payroll line computation
//!
//! Computes one wage line for a client over a period from confirmed
//! attendance, work logs and the resolved wage rule. Amounts are integer
//! currency units; fractional intermediates round half away from zero.

use super::rules::{CalculationType, Deduction, DeductionKind, WageRule};
use chrono::NaiveTime;
use serde::{Deserialize, Serialize};

/// Minimal view of one confirmed attendance day
#[derive(Debug, Clone)]
pub struct AttendanceInput {
    /// Only days confirmed `present` count toward pay
    pub present: bool,
    pub check_in_time: Option<NaiveTime>,
    pub check_out_time: Option<NaiveTime>,
    pub actual_minutes: Option<i64>,
}

/// Minimal view of one work log row
#[derive(Debug, Clone)]
pub struct WorkLogInput {
    pub work_type: String,
    pub quantity: f64,
}

/// Computed wage line
#[derive(Debug, Clone, Serialize)]
pub struct LineComputation {
    pub work_days: i64,
    pub total_minutes: i64,
    pub base_amount: i64,
    pub piece_amount: i64,
    pub deductions_amount: i64,
    pub net_amount: i64,
    pub breakdown: Breakdown,
}

/// Serialized with each payroll line; sufficient to reconstruct the
/// calculation for display.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Breakdown {
    pub rule_id: Option<String>,
    pub rule_name: Option<String>,
    /// "hourly" | "daily" | "piece_rate" | "mixed" | "none"
    pub calculation_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hourly_rate: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub daily_rate: Option<f64>,
    pub work_days: i64,
    pub total_minutes: i64,
    pub piece_items: Vec<PieceItem>,
    pub deductions: Vec<DeductionDetail>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PieceItem {
    pub work_type: String,
    pub quantity: f64,
    pub unit_price: f64,
    pub amount: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeductionDetail {
    pub name: String,
    pub kind: DeductionKind,
    pub amount: i64,
}

fn round_amount(value: f64) -> i64 {
    value.round() as i64
}

/// Minutes credited for one present day
///
/// Priority: recorded actual minutes, else whole-minute check-in/out
/// difference, else the standard day fallback. Shared with the
/// attendance utilization summary so both report the same figure.
pub fn credited_minutes(day: &AttendanceInput, standard_day_minutes: i64) -> i64 {
    if let Some(minutes) = day.actual_minutes {
        return minutes;
    }
    if let (Some(check_in), Some(check_out)) = (day.check_in_time, day.check_out_time) {
        // Overnight shifts are not supported; a reversed pair credits zero
        return (check_out - check_in).num_minutes().max(0);
    }
    standard_day_minutes
}

fn hourly_base(total_minutes: i64, hourly_rate: f64) -> i64 {
    round_amount(total_minutes as f64 / 60.0 * hourly_rate)
}

fn daily_base(work_days: i64, daily_rate: f64) -> i64 {
    round_amount(work_days as f64 * daily_rate)
}

fn piece_components(rule: &WageRule, work_logs: &[WorkLogInput]) -> (i64, Vec<PieceItem>) {
    let mut items = Vec::new();
    let mut total = 0i64;

    for log in work_logs.iter().filter(|l| l.quantity > 0.0) {
        let unit_price = rule.piece_rates.unit_price(&log.work_type);
        let amount = round_amount(log.quantity * unit_price);
        total += amount;
        items.push(PieceItem {
            work_type: log.work_type.clone(),
            quantity: log.quantity,
            unit_price,
            amount,
        });
    }

    (total, items)
}

fn deduction_components(deductions: &[Deduction], gross: i64) -> (i64, Vec<DeductionDetail>) {
    let mut details = Vec::new();
    let mut total = 0i64;

    for spec in deductions {
        let amount = match spec.kind {
            DeductionKind::Fixed => round_amount(spec.amount),
            DeductionKind::Percentage => round_amount(gross as f64 * spec.rate / 100.0),
        };
        total += amount;
        details.push(DeductionDetail {
            name: spec.name.clone(),
            kind: spec.kind,
            amount,
        });
    }

    (total, details)
}

/// Compute one payroll line.
///
/// Returns None when the client has no present day in the period (no
/// line is produced at all). With no applicable rule the line still
/// exists, with zero amounts and calculation type "none".
pub fn compute_line(
    rule: Option<&WageRule>,
    attendance: &[AttendanceInput],
    work_logs: &[WorkLogInput],
    standard_day_minutes: i64,
) -> Option<LineComputation> {
    let present_days: Vec<&AttendanceInput> = attendance.iter().filter(|d| d.present).collect();
    let work_days = present_days.len() as i64;
    if work_days == 0 {
        return None;
    }

    let total_minutes: i64 = present_days
        .iter()
        .map(|d| credited_minutes(d, standard_day_minutes))
        .sum();

    let rule = match rule {
        Some(rule) => rule,
        None => {
            return Some(LineComputation {
                work_days,
                total_minutes,
                base_amount: 0,
                piece_amount: 0,
                deductions_amount: 0,
                net_amount: 0,
                breakdown: Breakdown {
                    rule_id: None,
                    rule_name: None,
                    calculation_type: "none".to_string(),
                    hourly_rate: None,
                    daily_rate: None,
                    work_days,
                    total_minutes,
                    piece_items: Vec::new(),
                    deductions: Vec::new(),
                },
            });
        }
    };

    let base_amount = match rule.calculation_type {
        CalculationType::Hourly => hourly_base(total_minutes, rule.hourly_rate.unwrap_or(0.0)),
        CalculationType::Daily => daily_base(work_days, rule.daily_rate.unwrap_or(0.0)),
        CalculationType::PieceRate => 0,
        CalculationType::Mixed => {
            if let Some(hourly_rate) = rule.hourly_rate {
                hourly_base(total_minutes, hourly_rate)
            } else if let Some(daily_rate) = rule.daily_rate {
                daily_base(work_days, daily_rate)
            } else {
                0
            }
        }
    };

    let (piece_amount, piece_items) = match rule.calculation_type {
        CalculationType::PieceRate | CalculationType::Mixed => piece_components(rule, work_logs),
        CalculationType::Hourly | CalculationType::Daily => (0, Vec::new()),
    };

    let gross = base_amount + piece_amount;
    let (deductions_amount, deduction_details) = deduction_components(&rule.deductions, gross);

    // Net pay never goes negative
    let net_amount = (gross - deductions_amount).max(0);

    Some(LineComputation {
        work_days,
        total_minutes,
        base_amount,
        piece_amount,
        deductions_amount,
        net_amount,
        breakdown: Breakdown {
            rule_id: Some(rule.guid.clone()),
            rule_name: Some(rule.name.clone()),
            calculation_type: rule.calculation_type.as_str().to_string(),
            hourly_rate: rule.hourly_rate,
            daily_rate: rule.daily_rate,
            work_days,
            total_minutes,
            piece_items,
            deductions: deduction_details,
        },
    })
}
