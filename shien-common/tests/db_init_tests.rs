//! Tests for database initialization
//!
//! Covers automatic schema creation on first run, idempotent re-open,
//! default settings seeding, and the uniqueness constraints the payroll
//! and attendance invariants rely on.

use shien_common::db::init::{create_all_tables, get_setting_i64, init_database};
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::SqlitePool;
use std::path::PathBuf;

async fn memory_pool() -> SqlitePool {
    // Single connection so every query sees the same in-memory database
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .expect("Failed to create in-memory database");
    sqlx::query("PRAGMA foreign_keys = ON")
        .execute(&pool)
        .await
        .unwrap();
    create_all_tables(&pool).await.expect("Failed to create schema");
    pool
}

#[tokio::test]
async fn test_database_creation_when_missing() {
    let test_db = format!("/tmp/shien-test-db-{}.db", std::process::id());
    let db_path = PathBuf::from(&test_db);

    let _ = std::fs::remove_file(&db_path);

    let result = init_database(&db_path).await;
    assert!(result.is_ok(), "Database initialization failed: {:?}", result.err());
    assert!(db_path.exists(), "Database file was not created");

    let _ = std::fs::remove_file(&db_path);
}

#[tokio::test]
async fn test_database_opens_existing() {
    let test_db = format!("/tmp/shien-test-db-existing-{}.db", std::process::id());
    let db_path = PathBuf::from(&test_db);

    let _ = std::fs::remove_file(&db_path);

    let pool1 = init_database(&db_path).await;
    assert!(pool1.is_ok());

    let pool2 = init_database(&db_path).await;
    assert!(pool2.is_ok(), "Failed to open existing database: {:?}", pool2.err());

    drop(pool1);
    drop(pool2);
    let _ = std::fs::remove_file(&db_path);
}

#[tokio::test]
async fn test_default_settings_initialized() {
    let test_db = format!("/tmp/shien-test-db-settings-{}.db", std::process::id());
    let db_path = PathBuf::from(&test_db);

    let _ = std::fs::remove_file(&db_path);

    let pool = init_database(&db_path).await.unwrap();

    let standard_day = get_setting_i64(&pool, "standard_day_minutes", 0).await.unwrap();
    assert_eq!(standard_day, 480);

    let warning_days = get_setting_i64(&pool, "expiry_warning_days", 0).await.unwrap();
    assert_eq!(warning_days, 30);

    let report_days = get_setting_i64(&pool, "expiry_report_days", 0).await.unwrap();
    assert_eq!(report_days, 90);

    drop(pool);
    let _ = std::fs::remove_file(&db_path);
}

#[tokio::test]
async fn test_attendance_confirmation_unique_per_client_date() {
    let pool = memory_pool().await;

    sqlx::query("INSERT INTO organizations (guid, name) VALUES ('org-1', 'Facility')")
        .execute(&pool)
        .await
        .unwrap();
    sqlx::query("INSERT INTO clients (guid, organization_id, name) VALUES ('cli-1', 'org-1', 'Tanaka')")
        .execute(&pool)
        .await
        .unwrap();

    let insert = "INSERT INTO attendance_confirmations (guid, organization_id, client_id, date, status) VALUES (?, 'org-1', 'cli-1', '2025-06-02', 'present')";

    sqlx::query(insert).bind("conf-1").execute(&pool).await.unwrap();
    let duplicate = sqlx::query(insert).bind("conf-2").execute(&pool).await;

    assert!(duplicate.is_err(), "Second confirmation for the same client/date must be rejected");
}

#[tokio::test]
async fn test_payroll_run_unique_per_period() {
    let pool = memory_pool().await;

    sqlx::query("INSERT INTO organizations (guid, name) VALUES ('org-1', 'Facility')")
        .execute(&pool)
        .await
        .unwrap();

    let insert = "INSERT INTO payroll_runs (guid, organization_id, period_start, period_end, status) VALUES (?, 'org-1', '2025-06-01', '2025-06-30', 'draft')";

    sqlx::query(insert).bind("run-1").execute(&pool).await.unwrap();
    let duplicate = sqlx::query(insert).bind("run-2").execute(&pool).await;

    assert!(duplicate.is_err(), "Second run for the identical period must be rejected");
}

#[tokio::test]
async fn test_transcript_versions_unique_per_session() {
    let pool = memory_pool().await;

    sqlx::query("INSERT INTO organizations (guid, name) VALUES ('org-1', 'Facility')")
        .execute(&pool)
        .await
        .unwrap();
    sqlx::query("INSERT INTO clients (guid, organization_id, name) VALUES ('cli-1', 'org-1', 'Sato')")
        .execute(&pool)
        .await
        .unwrap();
    sqlx::query(
        "INSERT INTO interview_sessions (guid, organization_id, client_id, session_date) VALUES ('ses-1', 'org-1', 'cli-1', '2025-06-02')",
    )
    .execute(&pool)
    .await
    .unwrap();

    let insert = "INSERT INTO transcripts (guid, session_id, version, body) VALUES (?, 'ses-1', 1, 'text')";

    sqlx::query(insert).bind("tr-1").execute(&pool).await.unwrap();
    let duplicate = sqlx::query(insert).bind("tr-2").execute(&pool).await;

    assert!(duplicate.is_err(), "Duplicate transcript version must be rejected");
}
