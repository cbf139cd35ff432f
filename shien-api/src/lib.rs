//! shien-api library - facility administration backend
//!
//! Client records, attendance, wage rules, payroll runs, interview
//! sessions and certificate tracking for a single facility database.

use axum::Router;
use sqlx::SqlitePool;
use tracing::{info, warn};

pub mod api;
pub mod db;
pub mod error;
pub mod expiry;
pub mod payroll;
pub mod reports;
pub mod sessions;

/// Application state shared across HTTP handlers
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool
    pub db: SqlitePool,
    /// Bearer-token signing secret
    pub token_secret: String,
}

impl AppState {
    /// Create new application state
    pub fn new(db: SqlitePool, token_secret: String) -> Self {
        Self { db, token_secret }
    }
}

/// Build application router
///
/// Health and login are public; everything else requires a bearer token.
pub fn build_router(state: AppState) -> Router {
    use axum::middleware;
    use axum::routing::{get, post, put};

    // Protected routes (require authentication)
    let protected = Router::new()
        .route(
            "/api/clients",
            get(api::clients::list_clients).post(api::clients::create_client),
        )
        .route(
            "/api/clients/:id",
            get(api::clients::get_client).put(api::clients::update_client),
        )
        .route("/api/attendance/reports", post(api::attendance::submit_report))
        .route(
            "/api/attendance/confirmations",
            put(api::attendance::confirm_attendance).get(api::attendance::list_confirmations),
        )
        .route("/api/attendance/summary", get(api::attendance::attendance_summary))
        .route(
            "/api/work-logs",
            get(api::work_logs::list_work_logs).post(api::work_logs::create_work_log),
        )
        .route(
            "/api/work-logs/:id",
            put(api::work_logs::update_work_log).delete(api::work_logs::delete_work_log),
        )
        .route(
            "/api/wage-rules",
            get(api::wage_rules::list_wage_rules).post(api::wage_rules::create_wage_rule),
        )
        .route(
            "/api/wage-rules/:id",
            get(api::wage_rules::get_wage_rule).put(api::wage_rules::update_wage_rule),
        )
        .route(
            "/api/payroll/runs",
            get(api::payroll::list_runs).post(api::payroll::create_run),
        )
        .route("/api/payroll/runs/:id", get(api::payroll::get_run))
        .route("/api/payroll/runs/:id/confirm", post(api::payroll::confirm_run))
        .route("/api/payroll/runs/:id/pay", post(api::payroll::pay_run))
        .route("/api/payroll/runs/:id/export.csv", get(api::payroll::export_run_csv))
        .route(
            "/api/sessions",
            get(api::sessions::list_sessions).post(api::sessions::create_session),
        )
        .route(
            "/api/sessions/:id",
            get(api::sessions::get_session).put(api::sessions::update_session),
        )
        .route("/api/sessions/:id/transition", post(api::sessions::transition_session))
        .route("/api/sessions/:id/consent", put(api::sessions::update_consent))
        .route(
            "/api/sessions/:id/media",
            get(api::sessions::list_media).post(api::sessions::upload_media),
        )
        .route("/api/sessions/:id/transcribe", post(api::sessions::transcribe_session))
        .route("/api/sessions/:id/summarize", post(api::sessions::summarize_session))
        .route("/api/sessions/:id/extract", post(api::sessions::extract_session))
        .route(
            "/api/certificates",
            get(api::certificates::list_certificates).post(api::certificates::create_certificate),
        )
        .route("/api/certificates/expiry-report", get(api::certificates::expiry_report))
        .route("/api/certificates/:id", put(api::certificates::update_certificate))
        .layer(middleware::from_fn_with_state(state.clone(), api::auth_middleware));

    // Public routes (no authentication)
    let public = Router::new()
        .route("/api/auth/login", axum::routing::post(api::login))
        .merge(api::health_routes());

    Router::new()
        .merge(protected)
        .merge(public)
        .layer(tower_http::trace::TraceLayer::new_for_http())
        .with_state(state)
}

/// Create the initial organization and admin account on an empty
/// database, using SHIEN_ADMIN_PASSWORD.
pub async fn bootstrap_admin(pool: &SqlitePool) -> shien_common::Result<()> {
    use shien_common::api::auth::{hash_password, StaffRole};

    if db::staff::count_staff(pool).await? > 0 {
        return Ok(());
    }

    let password = match std::env::var("SHIEN_ADMIN_PASSWORD") {
        Ok(password) if !password.is_empty() => password,
        _ => {
            warn!("No staff accounts exist; set SHIEN_ADMIN_PASSWORD to create an initial admin");
            return Ok(());
        }
    };

    let org = shien_common::db::models::Organization {
        guid: uuid::Uuid::new_v4().to_string(),
        name: "Default Facility".to_string(),
    };
    db::organizations::insert_organization(pool, &org).await?;

    let hash = hash_password(&password)
        .map_err(|e| shien_common::Error::Internal(format!("password hash failed: {}", e)))?;
    let admin = db::staff::Staff::new(
        org.guid,
        "admin".to_string(),
        hash,
        "Administrator".to_string(),
        StaffRole::Admin,
    );
    db::staff::save_staff(pool, &admin).await?;

    info!("Created initial admin account 'admin' in organization '{}'", org.name);

    Ok(())
}
