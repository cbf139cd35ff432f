//! Staff account database operations

use shien_common::api::auth::StaffRole;
use shien_common::Result;
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

/// Staff account record
#[derive(Debug, Clone)]
pub struct Staff {
    pub guid: String,
    pub organization_id: String,
    pub username: String,
    pub password_hash: String,
    pub display_name: String,
    pub role: StaffRole,
}

impl Staff {
    pub fn new(
        organization_id: String,
        username: String,
        password_hash: String,
        display_name: String,
        role: StaffRole,
    ) -> Self {
        Self {
            guid: Uuid::new_v4().to_string(),
            organization_id,
            username,
            password_hash,
            display_name,
            role,
        }
    }
}

fn staff_from_row(row: &sqlx::sqlite::SqliteRow) -> Staff {
    let role_str: String = row.get("role");
    Staff {
        guid: row.get("guid"),
        organization_id: row.get("organization_id"),
        username: row.get("username"),
        password_hash: row.get("password_hash"),
        display_name: row.get("display_name"),
        role: StaffRole::parse(&role_str).unwrap_or(StaffRole::Staff),
    }
}

/// Save staff account
pub async fn save_staff(pool: &SqlitePool, staff: &Staff) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO staff (guid, organization_id, username, password_hash, display_name, role)
        VALUES (?, ?, ?, ?, ?, ?)
        ON CONFLICT(guid) DO UPDATE SET
            password_hash = excluded.password_hash,
            display_name = excluded.display_name,
            role = excluded.role,
            updated_at = CURRENT_TIMESTAMP
        "#,
    )
    .bind(&staff.guid)
    .bind(&staff.organization_id)
    .bind(&staff.username)
    .bind(&staff.password_hash)
    .bind(&staff.display_name)
    .bind(staff.role.as_str())
    .execute(pool)
    .await?;

    Ok(())
}

/// Load staff by username (login path)
pub async fn find_staff_by_username(pool: &SqlitePool, username: &str) -> Result<Option<Staff>> {
    let row = sqlx::query(
        "SELECT guid, organization_id, username, password_hash, display_name, role FROM staff WHERE username = ?",
    )
    .bind(username)
    .fetch_optional(pool)
    .await?;

    Ok(row.as_ref().map(staff_from_row))
}

/// Load staff by guid within an organization
pub async fn find_staff(pool: &SqlitePool, organization_id: &str, guid: &str) -> Result<Option<Staff>> {
    let row = sqlx::query(
        "SELECT guid, organization_id, username, password_hash, display_name, role FROM staff WHERE guid = ? AND organization_id = ?",
    )
    .bind(guid)
    .bind(organization_id)
    .fetch_optional(pool)
    .await?;

    Ok(row.as_ref().map(staff_from_row))
}

/// Count staff accounts (bootstrap check)
pub async fn count_staff(pool: &SqlitePool) -> Result<i64> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM staff")
        .fetch_one(pool)
        .await?;
    Ok(count)
}
