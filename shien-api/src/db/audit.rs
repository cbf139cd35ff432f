//! Audit log database operations
//!
//! One row per successful mutation: who did what to which resource.

use shien_common::Result;
use sqlx::SqlitePool;
use tracing::info;
use uuid::Uuid;

/// Record an audit event
pub async fn record(
    pool: &SqlitePool,
    organization_id: &str,
    actor_id: &str,
    action: &str,
    resource: &str,
    resource_id: Option<&str>,
    details: Option<serde_json::Value>,
) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO audit_logs (guid, organization_id, actor_id, action, resource, resource_id, details)
        VALUES (?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(Uuid::new_v4().to_string())
    .bind(organization_id)
    .bind(actor_id)
    .bind(action)
    .bind(resource)
    .bind(resource_id)
    .bind(details.map(|d| d.to_string()))
    .execute(pool)
    .await?;

    info!(actor = actor_id, action = action, resource = resource, "audit");

    Ok(())
}
