//! shien-api - administration backend for a disability-employment-support
//! facility
//!
//! Single-binary HTTP service over a SQLite database: client records,
//! attendance, wage rules, payroll computation, interview sessions and
//! certificate expiry tracking.

use anyhow::Result;
use clap::Parser;
use shien_api::{build_router, bootstrap_admin, AppState};
use shien_common::api::auth::load_token_secret;
use shien_common::config::{prepare_root_folder, resolve_root_folder};
use shien_common::db::init::init_database;
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "shien-api", about = "Facility administration backend")]
struct Args {
    /// Root data folder (overrides SHIEN_ROOT and the config file)
    #[arg(long)]
    root_folder: Option<String>,

    /// Bind address
    #[arg(long, default_value = "127.0.0.1")]
    bind: String,

    /// Listen port
    #[arg(long, default_value_t = 5780)]
    port: u16,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    info!("Starting shien-api v{}", env!("CARGO_PKG_VERSION"));

    let root_folder = resolve_root_folder(args.root_folder.as_deref(), "SHIEN_ROOT")?;
    let db_path = prepare_root_folder(&root_folder)?;
    info!("Database path: {}", db_path.display());

    let pool = init_database(&db_path).await?;
    info!("✓ Database ready");

    let token_secret = load_token_secret(&pool)
        .await
        .map_err(|e| anyhow::anyhow!("failed to load token secret: {}", e))?;
    info!("✓ Loaded token signing secret");

    bootstrap_admin(&pool).await?;

    let state = AppState::new(pool, token_secret);
    let app = build_router(state);

    let addr = format!("{}:{}", args.bind, args.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("shien-api listening on http://{}", addr);
    info!("Health check: http://{}/health", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
