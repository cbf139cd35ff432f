//! Database initialization
//!
//! Creates the full schema on first run and is safe to call again on every
//! startup (all statements are IF NOT EXISTS / OR IGNORE).

use crate::Result;
use sqlx::{sqlite::SqlitePoolOptions, SqlitePool};
use std::path::Path;
use tracing::{info, warn};

/// Initialize database connection and create tables if needed
pub async fn init_database(db_path: &Path) -> Result<SqlitePool> {
    let newly_created = !db_path.exists();

    // Create parent directory if it doesn't exist
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let db_url = format!("sqlite://{}?mode=rwc", db_path.display());
    let pool = SqlitePoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .connect(&db_url)
        .await?;

    if newly_created {
        info!("Initialized new database: {}", db_path.display());
    } else {
        info!("Opened existing database: {}", db_path.display());
    }

    // Enable foreign keys
    sqlx::query("PRAGMA foreign_keys = ON").execute(&pool).await?;

    // WAL mode allows concurrent readers with one writer
    sqlx::query("PRAGMA journal_mode = WAL").execute(&pool).await?;

    sqlx::query("PRAGMA busy_timeout = 5000").execute(&pool).await?;

    create_all_tables(&pool).await?;
    init_default_settings(&pool).await?;

    Ok(pool)
}

/// Create the full schema (idempotent - safe to call multiple times)
///
/// Exposed separately so tests can build an in-memory database.
pub async fn create_all_tables(pool: &SqlitePool) -> Result<()> {
    create_settings_table(pool).await?;
    create_organizations_table(pool).await?;
    create_staff_table(pool).await?;
    create_clients_table(pool).await?;

    create_attendance_reports_table(pool).await?;
    create_attendance_confirmations_table(pool).await?;
    create_work_logs_table(pool).await?;

    create_wage_rules_table(pool).await?;
    create_payroll_runs_table(pool).await?;
    create_payroll_lines_table(pool).await?;

    create_interview_sessions_table(pool).await?;
    create_media_assets_table(pool).await?;
    create_transcripts_table(pool).await?;
    create_ai_summaries_table(pool).await?;
    create_ai_extractions_table(pool).await?;

    create_certificates_table(pool).await?;
    create_audit_logs_table(pool).await?;

    Ok(())
}

/// Create the settings table
///
/// Stores application configuration key-value pairs.
pub async fn create_settings_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS settings (
            key TEXT PRIMARY KEY,
            value TEXT,
            updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

pub async fn create_organizations_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS organizations (
            guid TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
            updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// Create the staff table
///
/// Operator accounts. `role` gates wage-rule editing and payroll
/// confirmation.
pub async fn create_staff_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS staff (
            guid TEXT PRIMARY KEY,
            organization_id TEXT NOT NULL REFERENCES organizations(guid),
            username TEXT NOT NULL UNIQUE,
            password_hash TEXT NOT NULL,
            display_name TEXT NOT NULL,
            role TEXT NOT NULL DEFAULT 'staff' CHECK (role IN ('admin', 'manager', 'staff')),
            created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
            updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_staff_org ON staff(organization_id)")
        .execute(pool)
        .await?;

    Ok(())
}

/// Create the clients table
///
/// Facility service users. Clients may also hold login credentials for
/// self-reporting attendance.
pub async fn create_clients_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS clients (
            guid TEXT PRIMARY KEY,
            organization_id TEXT NOT NULL REFERENCES organizations(guid),
            username TEXT UNIQUE,
            password_hash TEXT,
            name TEXT NOT NULL,
            kana TEXT,
            status TEXT NOT NULL DEFAULT 'active' CHECK (status IN ('active', 'inactive')),
            joined_on DATE,
            created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
            updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_clients_org ON clients(organization_id, status)")
        .execute(pool)
        .await?;

    Ok(())
}

/// Create the attendance_reports table
///
/// The client's self-declared attendance claim. Never used for payroll.
pub async fn create_attendance_reports_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS attendance_reports (
            guid TEXT PRIMARY KEY,
            organization_id TEXT NOT NULL REFERENCES organizations(guid),
            client_id TEXT NOT NULL REFERENCES clients(guid) ON DELETE CASCADE,
            date DATE NOT NULL,
            check_in_time TEXT,
            check_out_time TEXT,
            condition_note TEXT,
            created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
            updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
            UNIQUE (client_id, date)
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// Create the attendance_confirmations table
///
/// The staff-authoritative attendance record: at most one per
/// (client, date), source of truth for payroll and utilization.
pub async fn create_attendance_confirmations_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS attendance_confirmations (
            guid TEXT PRIMARY KEY,
            organization_id TEXT NOT NULL REFERENCES organizations(guid),
            client_id TEXT NOT NULL REFERENCES clients(guid) ON DELETE CASCADE,
            date DATE NOT NULL,
            status TEXT NOT NULL CHECK (status IN ('present', 'absent', 'late', 'early_leave')),
            check_in_time TEXT,
            check_out_time TEXT,
            actual_minutes INTEGER,
            note TEXT,
            confirmed_by TEXT REFERENCES staff(guid),
            created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
            updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
            UNIQUE (client_id, date),
            CHECK (actual_minutes IS NULL OR actual_minutes >= 0)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_confirmations_org_date ON attendance_confirmations(organization_id, date)",
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// Create the work_logs table
///
/// One row per (client, date, work type): quantity feeding piece-rate pay.
/// Multiple rows per client per day are allowed across distinct work types.
pub async fn create_work_logs_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS work_logs (
            guid TEXT PRIMARY KEY,
            organization_id TEXT NOT NULL REFERENCES organizations(guid),
            client_id TEXT NOT NULL REFERENCES clients(guid) ON DELETE CASCADE,
            date DATE NOT NULL,
            work_type TEXT NOT NULL,
            quantity REAL NOT NULL DEFAULT 0,
            unit TEXT,
            created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
            updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
            CHECK (quantity >= 0)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_work_logs_client_date ON work_logs(client_id, date)")
        .execute(pool)
        .await?;

    Ok(())
}

/// Create the wage_rules table
///
/// Pricing policies. `client_id` NULL means facility-wide scope;
/// `piece_rates` and `deductions` are JSON documents.
pub async fn create_wage_rules_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS wage_rules (
            guid TEXT PRIMARY KEY,
            organization_id TEXT NOT NULL REFERENCES organizations(guid),
            client_id TEXT REFERENCES clients(guid) ON DELETE CASCADE,
            name TEXT NOT NULL,
            calculation_type TEXT NOT NULL CHECK (calculation_type IN ('hourly', 'daily', 'piece_rate', 'mixed')),
            hourly_rate REAL,
            daily_rate REAL,
            piece_rates TEXT NOT NULL DEFAULT '{}',
            deductions TEXT NOT NULL DEFAULT '[]',
            valid_from DATE NOT NULL,
            valid_until DATE,
            is_default INTEGER NOT NULL DEFAULT 0,
            created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
            updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
            CHECK (hourly_rate IS NULL OR hourly_rate >= 0),
            CHECK (daily_rate IS NULL OR daily_rate >= 0),
            CHECK (valid_until IS NULL OR valid_until >= valid_from)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_wage_rules_scope ON wage_rules(organization_id, client_id)",
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// Create the payroll_runs table
///
/// One computed payroll batch per (organization, period). The UNIQUE
/// index backstops the transactional overlap check on creation.
pub async fn create_payroll_runs_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS payroll_runs (
            guid TEXT PRIMARY KEY,
            organization_id TEXT NOT NULL REFERENCES organizations(guid),
            period_start DATE NOT NULL,
            period_end DATE NOT NULL,
            status TEXT NOT NULL DEFAULT 'calculating' CHECK (status IN ('calculating', 'draft', 'confirmed', 'paid')),
            confirmed_by TEXT REFERENCES staff(guid),
            confirmed_at TIMESTAMP,
            paid_at TIMESTAMP,
            created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
            updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
            UNIQUE (organization_id, period_start, period_end),
            CHECK (period_end >= period_start)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_payroll_runs_org ON payroll_runs(organization_id, period_start)",
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// Create the payroll_lines table
///
/// Per-client result rows. Immutable once created; a new run is required
/// to recompute a period.
pub async fn create_payroll_lines_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS payroll_lines (
            guid TEXT PRIMARY KEY,
            run_id TEXT NOT NULL REFERENCES payroll_runs(guid) ON DELETE CASCADE,
            client_id TEXT NOT NULL REFERENCES clients(guid),
            work_days INTEGER NOT NULL,
            total_minutes INTEGER NOT NULL,
            base_amount INTEGER NOT NULL,
            piece_amount INTEGER NOT NULL,
            deductions_amount INTEGER NOT NULL,
            net_amount INTEGER NOT NULL,
            breakdown TEXT NOT NULL,
            created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
            UNIQUE (run_id, client_id),
            CHECK (work_days > 0),
            CHECK (total_minutes >= 0),
            CHECK (net_amount >= 0)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_payroll_lines_run ON payroll_lines(run_id)")
        .execute(pool)
        .await?;

    Ok(())
}

/// Create the interview_sessions table
pub async fn create_interview_sessions_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS interview_sessions (
            guid TEXT PRIMARY KEY,
            organization_id TEXT NOT NULL REFERENCES organizations(guid),
            client_id TEXT NOT NULL REFERENCES clients(guid) ON DELETE CASCADE,
            session_date DATE NOT NULL,
            session_type TEXT NOT NULL DEFAULT 'interview',
            title TEXT,
            status TEXT NOT NULL DEFAULT 'draft' CHECK (status IN ('draft', 'scheduled', 'recording', 'transcribing', 'processing', 'completed', 'archived')),
            recording_consent INTEGER NOT NULL DEFAULT 0,
            ai_processing_consent INTEGER NOT NULL DEFAULT 0,
            created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
            updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_sessions_org_date ON interview_sessions(organization_id, session_date)",
    )
    .execute(pool)
    .await?;

    Ok(())
}

pub async fn create_media_assets_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS media_assets (
            guid TEXT PRIMARY KEY,
            session_id TEXT NOT NULL REFERENCES interview_sessions(guid) ON DELETE CASCADE,
            file_name TEXT NOT NULL,
            content_type TEXT,
            duration_seconds REAL,
            uploaded_by TEXT REFERENCES staff(guid),
            created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_media_assets_session ON media_assets(session_id)")
        .execute(pool)
        .await?;

    Ok(())
}

/// Create the transcripts table
///
/// Append-only: versions start at 1 per session and prior versions are
/// retained, never overwritten.
pub async fn create_transcripts_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS transcripts (
            guid TEXT PRIMARY KEY,
            session_id TEXT NOT NULL REFERENCES interview_sessions(guid) ON DELETE CASCADE,
            version INTEGER NOT NULL,
            body TEXT NOT NULL,
            language TEXT,
            engine TEXT,
            created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
            UNIQUE (session_id, version),
            CHECK (version >= 1)
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

pub async fn create_ai_summaries_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS ai_summaries (
            guid TEXT PRIMARY KEY,
            session_id TEXT NOT NULL REFERENCES interview_sessions(guid) ON DELETE CASCADE,
            version INTEGER NOT NULL,
            body TEXT NOT NULL,
            created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
            UNIQUE (session_id, version),
            CHECK (version >= 1)
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

pub async fn create_ai_extractions_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS ai_extractions (
            guid TEXT PRIMARY KEY,
            session_id TEXT NOT NULL REFERENCES interview_sessions(guid) ON DELETE CASCADE,
            version INTEGER NOT NULL,
            content TEXT NOT NULL,
            created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
            UNIQUE (session_id, version),
            CHECK (version >= 1)
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// Create the certificates table
///
/// `status` is a write-time cache of the expiry classification; read
/// endpoints always recompute from `valid_until`.
pub async fn create_certificates_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS certificates (
            guid TEXT PRIMARY KEY,
            organization_id TEXT NOT NULL REFERENCES organizations(guid),
            client_id TEXT NOT NULL REFERENCES clients(guid) ON DELETE CASCADE,
            certificate_type TEXT NOT NULL,
            number TEXT,
            valid_from DATE,
            valid_until DATE NOT NULL,
            status TEXT NOT NULL DEFAULT 'valid',
            created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
            updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_certificates_expiry ON certificates(organization_id, valid_until)",
    )
    .execute(pool)
    .await?;

    Ok(())
}

pub async fn create_audit_logs_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS audit_logs (
            guid TEXT PRIMARY KEY,
            organization_id TEXT NOT NULL,
            actor_id TEXT NOT NULL,
            action TEXT NOT NULL,
            resource TEXT NOT NULL,
            resource_id TEXT,
            details TEXT,
            created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_audit_logs_org ON audit_logs(organization_id, created_at)",
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// Initialize or update default settings
///
/// Ensures all required settings exist with default values; NULL values
/// are reset to defaults.
pub async fn init_default_settings(pool: &SqlitePool) -> Result<()> {
    // Payroll settings
    ensure_setting(pool, "standard_day_minutes", "480").await?;

    // Certificate expiry thresholds (days)
    ensure_setting(pool, "expiry_warning_days", "30").await?;
    ensure_setting(pool, "expiry_report_days", "90").await?;

    // Authentication settings
    ensure_setting(pool, "token_ttl_seconds", "86400").await?;

    info!("Default settings initialized");
    Ok(())
}

/// Ensure a setting exists with the specified default value
///
/// If the setting doesn't exist, it will be created with the default.
/// If the setting exists but has a NULL value, it will be reset to the default.
pub async fn ensure_setting(pool: &SqlitePool, key: &str, default_value: &str) -> Result<()> {
    let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM settings WHERE key = ?)")
        .bind(key)
        .fetch_one(pool)
        .await?;

    if !exists {
        // INSERT OR IGNORE handles concurrent initialization races
        sqlx::query("INSERT OR IGNORE INTO settings (key, value) VALUES (?, ?)")
            .bind(key)
            .bind(default_value)
            .execute(pool)
            .await?;

        info!("Initialized setting '{}' with default value: {}", key, default_value);
        return Ok(());
    }

    let value: Option<String> = sqlx::query_scalar("SELECT value FROM settings WHERE key = ?")
        .bind(key)
        .fetch_one(pool)
        .await?;

    if value.is_none() {
        sqlx::query("UPDATE settings SET value = ? WHERE key = ?")
            .bind(default_value)
            .bind(key)
            .execute(pool)
            .await?;

        warn!("Setting '{}' was NULL, reset to default: {}", key, default_value);
    }

    Ok(())
}

/// Read an integer setting, falling back to the given default
pub async fn get_setting_i64(pool: &SqlitePool, key: &str, default: i64) -> Result<i64> {
    let value: Option<i64> =
        sqlx::query_scalar("SELECT CAST(value AS INTEGER) FROM settings WHERE key = ?")
            .bind(key)
            .fetch_optional(pool)
            .await?;

    Ok(value.unwrap_or(default))
}
