//! Client (service user) database operations

use chrono::NaiveDate;
use serde::Serialize;
use shien_common::Result;
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

/// Client record
///
/// `password_hash` backs the client's own login; it is never serialized
/// into API responses.
#[derive(Debug, Clone, Serialize)]
pub struct Client {
    pub guid: String,
    pub organization_id: String,
    pub name: String,
    pub kana: Option<String>,
    pub status: String,
    pub joined_on: Option<NaiveDate>,
    pub username: Option<String>,
    #[serde(skip_serializing)]
    pub password_hash: Option<String>,
}

impl Client {
    pub fn new(organization_id: String, name: String) -> Self {
        Self {
            guid: Uuid::new_v4().to_string(),
            organization_id,
            name,
            kana: None,
            status: "active".to_string(),
            joined_on: None,
            username: None,
            password_hash: None,
        }
    }

    pub fn is_active(&self) -> bool {
        self.status == "active"
    }
}

fn client_from_row(row: &sqlx::sqlite::SqliteRow) -> Client {
    Client {
        guid: row.get("guid"),
        organization_id: row.get("organization_id"),
        name: row.get("name"),
        kana: row.get("kana"),
        status: row.get("status"),
        joined_on: row.get("joined_on"),
        username: row.get("username"),
        password_hash: row.get("password_hash"),
    }
}

const CLIENT_COLUMNS: &str =
    "guid, organization_id, name, kana, status, joined_on, username, password_hash";

/// Save client
pub async fn save_client(pool: &SqlitePool, client: &Client) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO clients (guid, organization_id, name, kana, status, joined_on, username, password_hash)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?)
        ON CONFLICT(guid) DO UPDATE SET
            name = excluded.name,
            kana = excluded.kana,
            status = excluded.status,
            joined_on = excluded.joined_on,
            username = excluded.username,
            password_hash = excluded.password_hash,
            updated_at = CURRENT_TIMESTAMP
        "#,
    )
    .bind(&client.guid)
    .bind(&client.organization_id)
    .bind(&client.name)
    .bind(&client.kana)
    .bind(&client.status)
    .bind(client.joined_on)
    .bind(&client.username)
    .bind(&client.password_hash)
    .execute(pool)
    .await?;

    Ok(())
}

/// Load client by guid within an organization
pub async fn find_client(pool: &SqlitePool, organization_id: &str, guid: &str) -> Result<Option<Client>> {
    let row = sqlx::query(&format!(
        "SELECT {} FROM clients WHERE guid = ? AND organization_id = ?",
        CLIENT_COLUMNS
    ))
    .bind(guid)
    .bind(organization_id)
    .fetch_optional(pool)
    .await?;

    Ok(row.as_ref().map(client_from_row))
}

/// Load client by username (login path)
pub async fn find_client_by_username(pool: &SqlitePool, username: &str) -> Result<Option<Client>> {
    let row = sqlx::query(&format!(
        "SELECT {} FROM clients WHERE username = ?",
        CLIENT_COLUMNS
    ))
    .bind(username)
    .fetch_optional(pool)
    .await?;

    Ok(row.as_ref().map(client_from_row))
}

/// List all clients in an organization
pub async fn list_clients(pool: &SqlitePool, organization_id: &str) -> Result<Vec<Client>> {
    let rows = sqlx::query(&format!(
        "SELECT {} FROM clients WHERE organization_id = ? ORDER BY name",
        CLIENT_COLUMNS
    ))
    .bind(organization_id)
    .fetch_all(pool)
    .await?;

    Ok(rows.iter().map(client_from_row).collect())
}

/// List active clients in an organization (payroll population)
pub async fn list_active_clients(pool: &SqlitePool, organization_id: &str) -> Result<Vec<Client>> {
    let rows = sqlx::query(&format!(
        "SELECT {} FROM clients WHERE organization_id = ? AND status = 'active' ORDER BY name",
        CLIENT_COLUMNS
    ))
    .bind(organization_id)
    .fetch_all(pool)
    .await?;

    Ok(rows.iter().map(client_from_row).collect())
}
