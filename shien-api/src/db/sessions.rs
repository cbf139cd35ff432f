//! Interview session database operations
//!
//! Derived artifacts (transcripts, summaries, extractions) are strictly
//! additive: each insert takes the next version for its session inside a
//! transaction, and the (session_id, version) unique constraints reject
//! a racing writer.

use chrono::NaiveDate;
use serde::Serialize;
use shien_common::Result;
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

use crate::sessions::state::{ConsentFlags, SessionStatus};

/// Interview session record
#[derive(Debug, Clone, Serialize)]
pub struct InterviewSession {
    pub guid: String,
    pub organization_id: String,
    pub client_id: String,
    pub session_date: NaiveDate,
    pub session_type: String,
    pub title: Option<String>,
    pub status: SessionStatus,
    pub recording_consent: bool,
    pub ai_processing_consent: bool,
}

impl InterviewSession {
    pub fn new(organization_id: String, client_id: String, session_date: NaiveDate) -> Self {
        Self {
            guid: Uuid::new_v4().to_string(),
            organization_id,
            client_id,
            session_date,
            session_type: "interview".to_string(),
            title: None,
            status: SessionStatus::Draft,
            recording_consent: false,
            ai_processing_consent: false,
        }
    }

    pub fn consent(&self) -> ConsentFlags {
        ConsentFlags {
            recording: self.recording_consent,
            ai_processing: self.ai_processing_consent,
        }
    }
}

/// Uploaded audio registration
#[derive(Debug, Clone, Serialize)]
pub struct MediaAsset {
    pub guid: String,
    pub session_id: String,
    pub file_name: String,
    pub content_type: Option<String>,
    pub duration_seconds: Option<f64>,
    pub uploaded_by: Option<String>,
}

/// Versioned transcript
#[derive(Debug, Clone, Serialize)]
pub struct Transcript {
    pub guid: String,
    pub session_id: String,
    pub version: i64,
    pub body: String,
    pub language: Option<String>,
    pub engine: Option<String>,
}

/// Versioned AI summary
#[derive(Debug, Clone, Serialize)]
pub struct AiSummary {
    pub guid: String,
    pub session_id: String,
    pub version: i64,
    pub body: String,
}

/// Versioned AI extraction
#[derive(Debug, Clone, Serialize)]
pub struct AiExtraction {
    pub guid: String,
    pub session_id: String,
    pub version: i64,
    pub content: serde_json::Value,
}

fn session_from_row(row: &sqlx::sqlite::SqliteRow) -> InterviewSession {
    let status_str: String = row.get("status");
    InterviewSession {
        guid: row.get("guid"),
        organization_id: row.get("organization_id"),
        client_id: row.get("client_id"),
        session_date: row.get("session_date"),
        session_type: row.get("session_type"),
        title: row.get("title"),
        status: SessionStatus::parse(&status_str).unwrap_or(SessionStatus::Draft),
        recording_consent: row.get::<i64, _>("recording_consent") != 0,
        ai_processing_consent: row.get::<i64, _>("ai_processing_consent") != 0,
    }
}

const SESSION_COLUMNS: &str = "guid, organization_id, client_id, session_date, session_type, \
     title, status, recording_consent, ai_processing_consent";

/// Insert a new session
pub async fn insert_session(pool: &SqlitePool, session: &InterviewSession) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO interview_sessions (
            guid, organization_id, client_id, session_date, session_type,
            title, status, recording_consent, ai_processing_consent
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&session.guid)
    .bind(&session.organization_id)
    .bind(&session.client_id)
    .bind(session.session_date)
    .bind(&session.session_type)
    .bind(&session.title)
    .bind(session.status.as_str())
    .bind(session.recording_consent as i64)
    .bind(session.ai_processing_consent as i64)
    .execute(pool)
    .await?;

    Ok(())
}

/// Load session by guid within an organization
pub async fn find_session(
    pool: &SqlitePool,
    organization_id: &str,
    guid: &str,
) -> Result<Option<InterviewSession>> {
    let row = sqlx::query(&format!(
        "SELECT {} FROM interview_sessions WHERE guid = ? AND organization_id = ?",
        SESSION_COLUMNS
    ))
    .bind(guid)
    .bind(organization_id)
    .fetch_optional(pool)
    .await?;

    Ok(row.as_ref().map(session_from_row))
}

/// List sessions in an organization, optionally for one client
pub async fn list_sessions(
    pool: &SqlitePool,
    organization_id: &str,
    client_id: Option<&str>,
) -> Result<Vec<InterviewSession>> {
    let rows = match client_id {
        Some(client_id) => {
            sqlx::query(&format!(
                "SELECT {} FROM interview_sessions WHERE organization_id = ? AND client_id = ? ORDER BY session_date DESC",
                SESSION_COLUMNS
            ))
            .bind(organization_id)
            .bind(client_id)
            .fetch_all(pool)
            .await?
        }
        None => {
            sqlx::query(&format!(
                "SELECT {} FROM interview_sessions WHERE organization_id = ? ORDER BY session_date DESC",
                SESSION_COLUMNS
            ))
            .bind(organization_id)
            .fetch_all(pool)
            .await?
        }
    };

    Ok(rows.iter().map(session_from_row).collect())
}

/// Update session metadata (date, type, title)
pub async fn update_metadata(
    pool: &SqlitePool,
    session: &InterviewSession,
) -> Result<()> {
    sqlx::query(
        "UPDATE interview_sessions SET session_date = ?, session_type = ?, title = ?, updated_at = CURRENT_TIMESTAMP \
         WHERE guid = ? AND organization_id = ?",
    )
    .bind(session.session_date)
    .bind(&session.session_type)
    .bind(&session.title)
    .bind(&session.guid)
    .bind(&session.organization_id)
    .execute(pool)
    .await?;

    Ok(())
}

/// Set consent flags
pub async fn set_consent(
    pool: &SqlitePool,
    organization_id: &str,
    guid: &str,
    recording: Option<bool>,
    ai_processing: Option<bool>,
) -> Result<()> {
    sqlx::query(
        "UPDATE interview_sessions SET \
             recording_consent = COALESCE(?, recording_consent), \
             ai_processing_consent = COALESCE(?, ai_processing_consent), \
             updated_at = CURRENT_TIMESTAMP \
         WHERE guid = ? AND organization_id = ?",
    )
    .bind(recording.map(|b| b as i64))
    .bind(ai_processing.map(|b| b as i64))
    .bind(guid)
    .bind(organization_id)
    .execute(pool)
    .await?;

    Ok(())
}

/// Move a session from one status to another with a guarded UPDATE.
///
/// Returns false when the session was no longer in `from` (a concurrent
/// transition won); the caller surfaces that as Conflict.
pub async fn transition_status(
    pool: &SqlitePool,
    organization_id: &str,
    guid: &str,
    from: SessionStatus,
    to: SessionStatus,
) -> Result<bool> {
    let result = sqlx::query(
        "UPDATE interview_sessions SET status = ?, updated_at = CURRENT_TIMESTAMP \
         WHERE guid = ? AND organization_id = ? AND status = ?",
    )
    .bind(to.as_str())
    .bind(guid)
    .bind(organization_id)
    .bind(from.as_str())
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}

/// Register an uploaded media asset
pub async fn insert_media_asset(pool: &SqlitePool, asset: &MediaAsset) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO media_assets (guid, session_id, file_name, content_type, duration_seconds, uploaded_by)
        VALUES (?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&asset.guid)
    .bind(&asset.session_id)
    .bind(&asset.file_name)
    .bind(&asset.content_type)
    .bind(asset.duration_seconds)
    .bind(&asset.uploaded_by)
    .execute(pool)
    .await?;

    Ok(())
}

/// Media assets for a session
pub async fn list_media_assets(pool: &SqlitePool, session_id: &str) -> Result<Vec<MediaAsset>> {
    let rows = sqlx::query(
        "SELECT guid, session_id, file_name, content_type, duration_seconds, uploaded_by \
         FROM media_assets WHERE session_id = ? ORDER BY created_at",
    )
    .bind(session_id)
    .fetch_all(pool)
    .await?;

    Ok(rows
        .iter()
        .map(|row| MediaAsset {
            guid: row.get("guid"),
            session_id: row.get("session_id"),
            file_name: row.get("file_name"),
            content_type: row.get("content_type"),
            duration_seconds: row.get("duration_seconds"),
            uploaded_by: row.get("uploaded_by"),
        })
        .collect())
}

pub async fn count_media_assets(pool: &SqlitePool, session_id: &str) -> Result<i64> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM media_assets WHERE session_id = ?")
        .bind(session_id)
        .fetch_one(pool)
        .await?;
    Ok(count)
}

/// Append a new transcript version (starts at 1)
pub async fn insert_transcript(
    pool: &SqlitePool,
    session_id: &str,
    body: &str,
    language: Option<&str>,
    engine: Option<&str>,
) -> Result<Transcript> {
    let mut tx = pool.begin().await?;

    let version: i64 =
        sqlx::query_scalar("SELECT COALESCE(MAX(version), 0) + 1 FROM transcripts WHERE session_id = ?")
            .bind(session_id)
            .fetch_one(&mut *tx)
            .await?;

    let transcript = Transcript {
        guid: Uuid::new_v4().to_string(),
        session_id: session_id.to_string(),
        version,
        body: body.to_string(),
        language: language.map(|s| s.to_string()),
        engine: engine.map(|s| s.to_string()),
    };

    sqlx::query(
        "INSERT INTO transcripts (guid, session_id, version, body, language, engine) VALUES (?, ?, ?, ?, ?, ?)",
    )
    .bind(&transcript.guid)
    .bind(&transcript.session_id)
    .bind(transcript.version)
    .bind(&transcript.body)
    .bind(&transcript.language)
    .bind(&transcript.engine)
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;

    Ok(transcript)
}

/// Latest transcript for a session
pub async fn latest_transcript(pool: &SqlitePool, session_id: &str) -> Result<Option<Transcript>> {
    let row = sqlx::query(
        "SELECT guid, session_id, version, body, language, engine \
         FROM transcripts WHERE session_id = ? ORDER BY version DESC LIMIT 1",
    )
    .bind(session_id)
    .fetch_optional(pool)
    .await?;

    Ok(row.map(|row| Transcript {
        guid: row.get("guid"),
        session_id: row.get("session_id"),
        version: row.get("version"),
        body: row.get("body"),
        language: row.get("language"),
        engine: row.get("engine"),
    }))
}

/// Append a new summary version (starts at 1)
pub async fn insert_summary(pool: &SqlitePool, session_id: &str, body: &str) -> Result<AiSummary> {
    let mut tx = pool.begin().await?;

    let version: i64 =
        sqlx::query_scalar("SELECT COALESCE(MAX(version), 0) + 1 FROM ai_summaries WHERE session_id = ?")
            .bind(session_id)
            .fetch_one(&mut *tx)
            .await?;

    let summary = AiSummary {
        guid: Uuid::new_v4().to_string(),
        session_id: session_id.to_string(),
        version,
        body: body.to_string(),
    };

    sqlx::query("INSERT INTO ai_summaries (guid, session_id, version, body) VALUES (?, ?, ?, ?)")
        .bind(&summary.guid)
        .bind(&summary.session_id)
        .bind(summary.version)
        .bind(&summary.body)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;

    Ok(summary)
}

/// Append a new extraction version (starts at 1)
pub async fn insert_extraction(
    pool: &SqlitePool,
    session_id: &str,
    content: &serde_json::Value,
) -> Result<AiExtraction> {
    let mut tx = pool.begin().await?;

    let version: i64 = sqlx::query_scalar(
        "SELECT COALESCE(MAX(version), 0) + 1 FROM ai_extractions WHERE session_id = ?",
    )
    .bind(session_id)
    .fetch_one(&mut *tx)
    .await?;

    let extraction = AiExtraction {
        guid: Uuid::new_v4().to_string(),
        session_id: session_id.to_string(),
        version,
        content: content.clone(),
    };

    sqlx::query("INSERT INTO ai_extractions (guid, session_id, version, content) VALUES (?, ?, ?, ?)")
        .bind(&extraction.guid)
        .bind(&extraction.session_id)
        .bind(extraction.version)
        .bind(extraction.content.to_string())
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;

    Ok(extraction)
}
