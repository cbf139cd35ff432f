//! Wage rule model and resolution
//!
//! A wage rule is a pricing policy: either bound to one client or a
//! facility-wide default. Resolution picks the single rule applied to a
//! client for a payroll period.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Wage calculation mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CalculationType {
    Hourly,
    Daily,
    PieceRate,
    Mixed,
}

impl CalculationType {
    pub fn as_str(&self) -> &'static str {
        match self {
            CalculationType::Hourly => "hourly",
            CalculationType::Daily => "daily",
            CalculationType::PieceRate => "piece_rate",
            CalculationType::Mixed => "mixed",
        }
    }

    pub fn parse(s: &str) -> Option<CalculationType> {
        match s {
            "hourly" => Some(CalculationType::Hourly),
            "daily" => Some(CalculationType::Daily),
            "piece_rate" => Some(CalculationType::PieceRate),
            "mixed" => Some(CalculationType::Mixed),
            _ => None,
        }
    }
}

/// Per-work-type unit prices
///
/// Accepts both serialized shapes found in stored rules: a table of
/// entries or an object keyed by work type.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PieceRates {
    Table(Vec<PieceRateEntry>),
    Map(BTreeMap<String, f64>),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PieceRateEntry {
    #[serde(alias = "workType")]
    pub work_type: String,
    #[serde(alias = "unitPrice", alias = "price")]
    pub unit_price: f64,
}

impl PieceRates {
    /// Unit price for a work type; unknown work types price at zero
    pub fn unit_price(&self, work_type: &str) -> f64 {
        match self {
            PieceRates::Table(entries) => entries
                .iter()
                .find(|e| e.work_type == work_type)
                .map(|e| e.unit_price)
                .unwrap_or(0.0),
            PieceRates::Map(map) => map.get(work_type).copied().unwrap_or(0.0),
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            PieceRates::Table(entries) => entries.is_empty(),
            PieceRates::Map(map) => map.is_empty(),
        }
    }
}

impl Default for PieceRates {
    fn default() -> Self {
        PieceRates::Map(BTreeMap::new())
    }
}

/// Deduction kind: fixed amount or percentage of gross
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeductionKind {
    Fixed,
    Percentage,
}

/// One deduction spec on a wage rule
///
/// `amount` applies to fixed deductions, `rate` (percent) to percentage
/// deductions; the unused field stays zero.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Deduction {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: DeductionKind,
    #[serde(default)]
    pub amount: f64,
    #[serde(default)]
    pub rate: f64,
}

/// A pricing policy
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WageRule {
    pub guid: String,
    pub organization_id: String,
    /// None = facility-wide scope
    pub client_id: Option<String>,
    pub name: String,
    pub calculation_type: CalculationType,
    pub hourly_rate: Option<f64>,
    pub daily_rate: Option<f64>,
    #[serde(default)]
    pub piece_rates: PieceRates,
    #[serde(default)]
    pub deductions: Vec<Deduction>,
    pub valid_from: NaiveDate,
    pub valid_until: Option<NaiveDate>,
    #[serde(default)]
    pub is_default: bool,
    pub created_at: DateTime<Utc>,
}

impl WageRule {
    /// Whether the validity interval covers any part of the period
    pub fn covers(&self, period_start: NaiveDate, period_end: NaiveDate) -> bool {
        self.valid_from <= period_end && self.valid_until.map_or(true, |u| u >= period_start)
    }
}

/// Select the wage rule applied to a client for a period.
///
/// Priority order, first match wins:
/// 1. Rules bound to this client whose validity covers the period,
///    latest `valid_from` first.
/// 2. Facility-wide default rules covering the period, latest
///    `valid_from` first.
///
/// Ties on `valid_from` break on `created_at` (newest wins), then guid,
/// so the result is total.
pub fn resolve_rule<'a>(
    rules: &'a [WageRule],
    client_id: &str,
    period_start: NaiveDate,
    period_end: NaiveDate,
) -> Option<&'a WageRule> {
    let newest = |a: &&WageRule, b: &&WageRule| {
        a.valid_from
            .cmp(&b.valid_from)
            .then(a.created_at.cmp(&b.created_at))
            .then(a.guid.cmp(&b.guid))
    };

    let client_rule = rules
        .iter()
        .filter(|r| r.client_id.as_deref() == Some(client_id) && r.covers(period_start, period_end))
        .max_by(newest);
    if client_rule.is_some() {
        return client_rule;
    }

    rules
        .iter()
        .filter(|r| r.client_id.is_none() && r.is_default && r.covers(period_start, period_end))
        .max_by(newest)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(s: &str) -> NaiveDate {
        s.parse().unwrap()
    }

    fn rule(guid: &str, client_id: Option<&str>, valid_from: &str, is_default: bool) -> WageRule {
        WageRule {
            guid: guid.to_string(),
            organization_id: "org-1".to_string(),
            client_id: client_id.map(|s| s.to_string()),
            name: guid.to_string(),
            calculation_type: CalculationType::Hourly,
            hourly_rate: Some(1000.0),
            daily_rate: None,
            piece_rates: PieceRates::default(),
            deductions: Vec::new(),
            valid_from: date(valid_from),
            valid_until: None,
            is_default,
            created_at: format!("{}T00:00:00Z", valid_from).parse().unwrap(),
        }
    }

    #[test]
    fn client_rule_beats_facility_default() {
        let rules = vec![
            rule("default", None, "2024-01-01", true),
            rule("client", Some("cli-1"), "2025-01-01", false),
        ];

        let resolved = resolve_rule(&rules, "cli-1", date("2025-06-01"), date("2025-06-30")).unwrap();
        assert_eq!(resolved.guid, "client");
    }

    #[test]
    fn latest_valid_from_wins_within_bucket() {
        let rules = vec![
            rule("old", Some("cli-1"), "2024-01-01", false),
            rule("new", Some("cli-1"), "2025-03-01", false),
        ];

        let resolved = resolve_rule(&rules, "cli-1", date("2025-06-01"), date("2025-06-30")).unwrap();
        assert_eq!(resolved.guid, "new");
    }

    #[test]
    fn valid_from_tie_breaks_on_created_at() {
        let mut a = rule("a", Some("cli-1"), "2025-01-01", false);
        let mut b = rule("b", Some("cli-1"), "2025-01-01", false);
        a.created_at = "2025-01-10T00:00:00Z".parse().unwrap();
        b.created_at = "2025-02-10T00:00:00Z".parse().unwrap();
        let rules = vec![a, b];

        let resolved = resolve_rule(&rules, "cli-1", date("2025-06-01"), date("2025-06-30")).unwrap();
        assert_eq!(resolved.guid, "b");
    }

    #[test]
    fn expired_client_rule_falls_back_to_default() {
        let mut expired = rule("expired", Some("cli-1"), "2024-01-01", false);
        expired.valid_until = Some(date("2024-12-31"));
        let rules = vec![expired, rule("default", None, "2024-01-01", true)];

        let resolved = resolve_rule(&rules, "cli-1", date("2025-06-01"), date("2025-06-30")).unwrap();
        assert_eq!(resolved.guid, "default");
    }

    #[test]
    fn non_default_facility_rule_never_resolves() {
        let rules = vec![rule("plain", None, "2024-01-01", false)];
        assert!(resolve_rule(&rules, "cli-1", date("2025-06-01"), date("2025-06-30")).is_none());
    }

    #[test]
    fn rule_starting_mid_period_still_covers() {
        let rules = vec![rule("mid", Some("cli-1"), "2025-06-15", false)];
        let resolved = resolve_rule(&rules, "cli-1", date("2025-06-01"), date("2025-06-30"));
        assert!(resolved.is_some());
    }

    #[test]
    fn piece_rates_accepts_table_shape() {
        let json = r#"[{"workType": "assembly", "unitPrice": 50}, {"work_type": "packing", "price": 80}]"#;
        let rates: PieceRates = serde_json::from_str(json).unwrap();
        assert_eq!(rates.unit_price("assembly"), 50.0);
        assert_eq!(rates.unit_price("packing"), 80.0);
        assert_eq!(rates.unit_price("unknown"), 0.0);
    }

    #[test]
    fn piece_rates_accepts_map_shape() {
        let json = r#"{"assembly": 50, "packing": 80}"#;
        let rates: PieceRates = serde_json::from_str(json).unwrap();
        assert_eq!(rates.unit_price("assembly"), 50.0);
        assert_eq!(rates.unit_price("unknown"), 0.0);
    }

    #[test]
    fn deduction_parses_with_type_tag() {
        let json = r#"[{"name": "meal", "type": "fixed", "amount": 300},
                       {"name": "insurance", "type": "percentage", "rate": 10}]"#;
        let deductions: Vec<Deduction> = serde_json::from_str(json).unwrap();
        assert_eq!(deductions[0].kind, DeductionKind::Fixed);
        assert_eq!(deductions[0].amount, 300.0);
        assert_eq!(deductions[1].kind, DeductionKind::Percentage);
        assert_eq!(deductions[1].rate, 10.0);
    }
}
