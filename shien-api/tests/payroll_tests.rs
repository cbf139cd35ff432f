//! Payroll run integration tests
//!
//! Drives run creation, line computation, the run lifecycle and the
//! one-run-per-period invariant against an in-memory database.

use chrono::{NaiveDate, Utc};
use shien_api::db::attendance::{AttendanceConfirmation, AttendanceStatus};
use shien_api::db::clients::Client;
use shien_api::db::work_logs::WorkLog;
use shien_api::db::{attendance, clients, payroll, wage_rules, work_logs};
use shien_api::error::ApiError;
use shien_api::payroll::{CalculationType, Deduction, DeductionKind, PieceRates, RunStatus, WageRule};
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::SqlitePool;
use std::collections::BTreeMap;
use uuid::Uuid;

const ORG: &str = "org-1";

async fn setup_pool() -> SqlitePool {
    // Single connection so every query sees the same in-memory database
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .expect("Failed to create in-memory database");

    sqlx::query("PRAGMA foreign_keys = ON").execute(&pool).await.unwrap();
    shien_common::db::init::create_all_tables(&pool).await.unwrap();
    shien_common::db::init::init_default_settings(&pool).await.unwrap();

    sqlx::query("INSERT INTO organizations (guid, name) VALUES (?, 'Test Facility')")
        .bind(ORG)
        .execute(&pool)
        .await
        .unwrap();

    sqlx::query(
        "INSERT INTO staff (guid, organization_id, username, password_hash, display_name, role) \
         VALUES ('staff-1', ?, 'manager', 'x', 'Manager', 'manager')",
    )
    .bind(ORG)
    .execute(&pool)
    .await
    .unwrap();

    pool
}

async fn seed_client(pool: &SqlitePool, name: &str) -> String {
    let client = Client::new(ORG.to_string(), name.to_string());
    clients::save_client(pool, &client).await.unwrap();
    client.guid
}

async fn seed_present_day(pool: &SqlitePool, client_id: &str, date: &str, minutes: Option<i64>) {
    let mut conf = AttendanceConfirmation::new(
        ORG.to_string(),
        client_id.to_string(),
        date.parse().unwrap(),
        AttendanceStatus::Present,
    );
    conf.actual_minutes = minutes;
    attendance::upsert_confirmation(pool, &conf).await.unwrap();
}

async fn seed_absent_day(pool: &SqlitePool, client_id: &str, date: &str) {
    let conf = AttendanceConfirmation::new(
        ORG.to_string(),
        client_id.to_string(),
        date.parse().unwrap(),
        AttendanceStatus::Absent,
    );
    attendance::upsert_confirmation(pool, &conf).await.unwrap();
}

fn mixed_rule(client_id: Option<String>, is_default: bool) -> WageRule {
    let piece_rates: BTreeMap<String, f64> =
        [("assembly".to_string(), 50.0), ("packing".to_string(), 80.0)].into();

    WageRule {
        guid: Uuid::new_v4().to_string(),
        organization_id: ORG.to_string(),
        client_id,
        name: "Standard mixed".to_string(),
        calculation_type: CalculationType::Mixed,
        hourly_rate: Some(1000.0),
        daily_rate: None,
        piece_rates: PieceRates::Map(piece_rates),
        deductions: vec![Deduction {
            name: "insurance".to_string(),
            kind: DeductionKind::Percentage,
            amount: 0.0,
            rate: 10.0,
        }],
        valid_from: "2025-01-01".parse().unwrap(),
        valid_until: None,
        is_default,
        created_at: Utc::now(),
    }
}

fn june() -> (NaiveDate, NaiveDate) {
    ("2025-06-01".parse().unwrap(), "2025-06-30".parse().unwrap())
}

#[tokio::test]
async fn run_computes_one_line_per_paid_client() {
    let pool = setup_pool().await;
    let (start, end) = june();

    // Client A: rule + attendance + work logs
    let client_a = seed_client(&pool, "Tanaka").await;
    wage_rules::save_rule(&pool, &mixed_rule(Some(client_a.clone()), false))
        .await
        .unwrap();
    seed_present_day(&pool, &client_a, "2025-06-02", Some(480)).await;
    for (work_type, quantity) in [("assembly", 10.0), ("packing", 5.0)] {
        let log = WorkLog::new(
            ORG.to_string(),
            client_a.clone(),
            "2025-06-02".parse().unwrap(),
            work_type.to_string(),
            quantity,
        );
        work_logs::save_work_log(&pool, &log).await.unwrap();
    }

    // Client B: only an absent day, must produce no line
    let client_b = seed_client(&pool, "Sato").await;
    seed_absent_day(&pool, &client_b, "2025-06-02").await;

    // Client C: present but no applicable rule, zero-amount line
    let client_c = seed_client(&pool, "Suzuki").await;
    seed_present_day(&pool, &client_c, "2025-06-03", None).await;

    let (run, lines) = payroll::create_run(&pool, ORG, start, end).await.unwrap();

    assert_eq!(run.status, RunStatus::Draft);
    assert_eq!(lines.len(), 2);

    let line_a = lines.iter().find(|l| l.client_id == client_a).unwrap();
    assert_eq!(line_a.work_days, 1);
    assert_eq!(line_a.total_minutes, 480);
    assert_eq!(line_a.base_amount, 8000);
    assert_eq!(line_a.piece_amount, 900);
    assert_eq!(line_a.deductions_amount, 890);
    assert_eq!(line_a.net_amount, 8010);
    assert_eq!(line_a.breakdown["calculation_type"], "mixed");
    assert_eq!(line_a.breakdown["rule_name"], "Standard mixed");

    assert!(lines.iter().all(|l| l.client_id != client_b));

    let line_c = lines.iter().find(|l| l.client_id == client_c).unwrap();
    assert_eq!(line_c.work_days, 1);
    // untimed day falls back to the standard 480-minute day
    assert_eq!(line_c.total_minutes, 480);
    assert_eq!(line_c.net_amount, 0);
    assert_eq!(line_c.breakdown["calculation_type"], "none");
}

#[tokio::test]
async fn facility_default_applies_when_no_client_rule() {
    let pool = setup_pool().await;
    let (start, end) = june();

    wage_rules::save_rule(&pool, &mixed_rule(None, true)).await.unwrap();

    let client = seed_client(&pool, "Watanabe").await;
    seed_present_day(&pool, &client, "2025-06-02", Some(240)).await;

    let (_, lines) = payroll::create_run(&pool, ORG, start, end).await.unwrap();
    assert_eq!(lines.len(), 1);
    // 4 hours at 1000/h, then the 10% deduction
    assert_eq!(lines[0].base_amount, 4000);
    assert_eq!(lines[0].net_amount, 3600);
}

#[tokio::test]
async fn duplicate_period_is_conflict_naming_existing_run() {
    let pool = setup_pool().await;
    let (start, end) = june();

    let client = seed_client(&pool, "Tanaka").await;
    seed_present_day(&pool, &client, "2025-06-02", Some(480)).await;

    let (run, _) = payroll::create_run(&pool, ORG, start, end).await.unwrap();

    let err = payroll::create_run(&pool, ORG, start, end).await.unwrap_err();
    match err {
        ApiError::Conflict(message) => assert!(message.contains(&run.guid)),
        other => panic!("expected Conflict, got {:?}", other),
    }

    // An overlapping (not identical) period is also refused
    let err = payroll::create_run(
        &pool,
        ORG,
        "2025-06-15".parse().unwrap(),
        "2025-07-14".parse().unwrap(),
    )
    .await
    .unwrap_err();
    assert!(matches!(err, ApiError::Conflict(_)));

    // An adjacent month is fine
    let result = payroll::create_run(
        &pool,
        ORG,
        "2025-07-01".parse().unwrap(),
        "2025-07-31".parse().unwrap(),
    )
    .await;
    assert!(result.is_ok());
}

#[tokio::test]
async fn run_lifecycle_draft_confirm_pay() {
    let pool = setup_pool().await;
    let (start, end) = june();

    let client = seed_client(&pool, "Tanaka").await;
    seed_present_day(&pool, &client, "2025-06-02", Some(480)).await;

    let (run, _) = payroll::create_run(&pool, ORG, start, end).await.unwrap();
    assert_eq!(run.status, RunStatus::Draft);

    // Paying a draft run is illegal
    let err = payroll::mark_paid(&pool, ORG, &run.guid).await.unwrap_err();
    assert!(matches!(err, ApiError::Conflict(_)));

    let confirmed = payroll::confirm_run(&pool, ORG, &run.guid, "staff-1").await.unwrap();
    assert_eq!(confirmed.status, RunStatus::Confirmed);
    assert_eq!(confirmed.confirmed_by.as_deref(), Some("staff-1"));
    assert!(confirmed.confirmed_at.is_some());

    // Confirming twice is illegal
    let err = payroll::confirm_run(&pool, ORG, &run.guid, "staff-1").await.unwrap_err();
    assert!(matches!(err, ApiError::Conflict(_)));

    let paid = payroll::mark_paid(&pool, ORG, &run.guid).await.unwrap();
    assert_eq!(paid.status, RunStatus::Paid);
    assert!(paid.paid_at.is_some());

    // Unknown run is NotFound, not Conflict
    let err = payroll::confirm_run(&pool, ORG, "missing", "staff-1").await.unwrap_err();
    assert!(matches!(err, ApiError::NotFound(_)));
}

#[tokio::test]
async fn lines_are_immutable_between_reads() {
    let pool = setup_pool().await;
    let (start, end) = june();

    let client = seed_client(&pool, "Tanaka").await;
    wage_rules::save_rule(&pool, &mixed_rule(Some(client.clone()), false))
        .await
        .unwrap();
    seed_present_day(&pool, &client, "2025-06-02", Some(480)).await;

    let (run, _) = payroll::create_run(&pool, ORG, start, end).await.unwrap();

    let first = payroll::list_lines(&pool, &run.guid).await.unwrap();
    let second = payroll::list_lines(&pool, &run.guid).await.unwrap();

    assert_eq!(first.len(), second.len());
    for (a, b) in first.iter().zip(second.iter()) {
        assert_eq!(a.guid, b.guid);
        assert_eq!(a.net_amount, b.net_amount);
        assert_eq!(a.breakdown, b.breakdown);
    }

    // Net amount identity holds on every persisted line
    for line in &first {
        assert_eq!(
            line.net_amount,
            (line.base_amount + line.piece_amount - line.deductions_amount).max(0)
        );
    }
}

#[tokio::test]
async fn inactive_clients_are_excluded() {
    let pool = setup_pool().await;
    let (start, end) = june();

    let mut client = Client::new(ORG.to_string(), "Retired".to_string());
    client.status = "inactive".to_string();
    clients::save_client(&pool, &client).await.unwrap();
    seed_present_day(&pool, &client.guid, "2025-06-02", Some(480)).await;

    let active = seed_client(&pool, "Active").await;
    seed_present_day(&pool, &active, "2025-06-02", Some(480)).await;

    let (_, lines) = payroll::create_run(&pool, ORG, start, end).await.unwrap();
    assert_eq!(lines.len(), 1);
    assert_eq!(lines[0].client_id, active);
}

#[tokio::test]
async fn saving_new_default_clears_previous_default() {
    let pool = setup_pool().await;

    let first = mixed_rule(None, true);
    wage_rules::save_rule(&pool, &first).await.unwrap();

    let second = mixed_rule(None, true);
    wage_rules::save_rule(&pool, &second).await.unwrap();

    let rules = wage_rules::list_rules(&pool, ORG).await.unwrap();
    let defaults: Vec<_> = rules.iter().filter(|r| r.is_default).collect();
    assert_eq!(defaults.len(), 1);
    assert_eq!(defaults[0].guid, second.guid);

    // A client-scoped default does not disturb the facility default
    let client_scoped = mixed_rule(Some("cli-x".to_string()), true);
    // cli-x must exist for the foreign key
    sqlx::query("INSERT INTO clients (guid, organization_id, name) VALUES ('cli-x', ?, 'X')")
        .bind(ORG)
        .execute(&pool)
        .await
        .unwrap();
    wage_rules::save_rule(&pool, &client_scoped).await.unwrap();

    let rules = wage_rules::list_rules(&pool, ORG).await.unwrap();
    let facility_defaults: Vec<_> =
        rules.iter().filter(|r| r.is_default && r.client_id.is_none()).collect();
    assert_eq!(facility_defaults.len(), 1);
}
