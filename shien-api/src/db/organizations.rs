//! Organization database operations

use shien_common::db::models::Organization;
use shien_common::Result;
use sqlx::{Row, SqlitePool};

/// Insert an organization
pub async fn insert_organization(pool: &SqlitePool, org: &Organization) -> Result<()> {
    sqlx::query("INSERT INTO organizations (guid, name) VALUES (?, ?)")
        .bind(&org.guid)
        .bind(&org.name)
        .execute(pool)
        .await?;

    Ok(())
}

/// Load organization by guid
pub async fn find_organization(pool: &SqlitePool, guid: &str) -> Result<Option<Organization>> {
    let row = sqlx::query("SELECT guid, name FROM organizations WHERE guid = ?")
        .bind(guid)
        .fetch_optional(pool)
        .await?;

    Ok(row.map(|row| Organization {
        guid: row.get("guid"),
        name: row.get("name"),
    }))
}
