//! Interview session workflow services
//!
//! Each operation both checks and advances session state: the guards
//! live in `state`, persistence in `crate::db::sessions`, and these
//! functions wire the two together for the HTTP handlers and tests.

pub mod state;

use chrono::NaiveDate;
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::db::sessions as db;
use crate::db::sessions::{AiExtraction, AiSummary, InterviewSession, MediaAsset, Transcript};
use crate::error::ApiError;
use state::{
    check_transition, operation_consent, operation_target, SessionOperation, SessionStatus,
    TransitionError,
};

impl From<TransitionError> for ApiError {
    fn from(err: TransitionError) -> Self {
        ApiError::Conflict(err.to_string())
    }
}

/// Engine label stamped on stub-produced artifacts
const STUB_ENGINE: &str = "stub";

async fn load_session(
    pool: &SqlitePool,
    organization_id: &str,
    session_id: &str,
) -> Result<InterviewSession, ApiError> {
    db::find_session(pool, organization_id, session_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("interview session {}", session_id)))
}

/// Apply the state move an operation produced. A no-op when the
/// operation leaves the session where it was.
async fn advance(
    pool: &SqlitePool,
    session: &InterviewSession,
    target: SessionStatus,
) -> Result<SessionStatus, ApiError> {
    if target == session.status {
        return Ok(target);
    }

    let moved = db::transition_status(
        pool,
        &session.organization_id,
        &session.guid,
        session.status,
        target,
    )
    .await?;

    if !moved {
        return Err(ApiError::Conflict(format!(
            "session {} changed state concurrently",
            session.guid
        )));
    }

    Ok(target)
}

/// Explicit staff-requested transition, checked against the table
pub async fn request_transition(
    pool: &SqlitePool,
    organization_id: &str,
    session_id: &str,
    to: SessionStatus,
) -> Result<InterviewSession, ApiError> {
    let session = load_session(pool, organization_id, session_id).await?;

    check_transition(session.status, to, session.consent())?;
    advance(pool, &session, to).await?;

    load_session(pool, organization_id, session_id).await
}

/// Update consent flags (each independently settable at any time)
pub async fn update_consent(
    pool: &SqlitePool,
    organization_id: &str,
    session_id: &str,
    recording: Option<bool>,
    ai_processing: Option<bool>,
) -> Result<InterviewSession, ApiError> {
    // Existence check first so a missing session is 404, not a silent no-op
    load_session(pool, organization_id, session_id).await?;

    db::set_consent(pool, organization_id, session_id, recording, ai_processing).await?;

    load_session(pool, organization_id, session_id).await
}

/// Session metadata fields editable until the session is locked
#[derive(Debug, Clone)]
pub struct MetadataUpdate {
    pub session_date: Option<NaiveDate>,
    pub session_type: Option<String>,
    pub title: Option<String>,
}

/// Update metadata; rejected once the session is completed or archived
pub async fn update_metadata(
    pool: &SqlitePool,
    organization_id: &str,
    session_id: &str,
    update: MetadataUpdate,
) -> Result<InterviewSession, ApiError> {
    let mut session = load_session(pool, organization_id, session_id).await?;

    if session.status.is_content_locked() {
        return Err(ApiError::Conflict(format!(
            "session is {} and no longer editable",
            session.status
        )));
    }

    if let Some(date) = update.session_date {
        session.session_date = date;
    }
    if let Some(session_type) = update.session_type {
        session.session_type = session_type;
    }
    if let Some(title) = update.title {
        session.title = Some(title);
    }

    db::update_metadata(pool, &session).await?;

    load_session(pool, organization_id, session_id).await
}

/// New media asset registration payload
#[derive(Debug, Clone)]
pub struct NewMedia {
    pub file_name: String,
    pub content_type: Option<String>,
    pub duration_seconds: Option<f64>,
    pub uploaded_by: Option<String>,
}

/// Register an uploaded media asset; auto-advances draft/scheduled
/// sessions to recording.
pub async fn upload_media(
    pool: &SqlitePool,
    organization_id: &str,
    session_id: &str,
    media: NewMedia,
) -> Result<(MediaAsset, SessionStatus), ApiError> {
    let session = load_session(pool, organization_id, session_id).await?;

    let target = operation_target(SessionOperation::UploadMedia, session.status)?;
    operation_consent(SessionOperation::UploadMedia, session.consent())?;

    let asset = MediaAsset {
        guid: Uuid::new_v4().to_string(),
        session_id: session.guid.clone(),
        file_name: media.file_name,
        content_type: media.content_type,
        duration_seconds: media.duration_seconds,
        uploaded_by: media.uploaded_by,
    };
    db::insert_media_asset(pool, &asset).await?;

    let status = advance(pool, &session, target).await?;

    Ok((asset, status))
}

/// Run transcription; auto-advances to transcribing.
///
/// The speech engine is not connected in this deployment: a placeholder
/// transcript is produced so the downstream workflow stays exercisable.
pub async fn run_transcription(
    pool: &SqlitePool,
    organization_id: &str,
    session_id: &str,
) -> Result<(Transcript, SessionStatus), ApiError> {
    let session = load_session(pool, organization_id, session_id).await?;

    let target = operation_target(SessionOperation::Transcribe, session.status)?;
    operation_consent(SessionOperation::Transcribe, session.consent())?;

    let asset_count = db::count_media_assets(pool, &session.guid).await?;
    let body = format!(
        "[transcript pending] session {} on {}: {} media asset(s) queued for transcription",
        session.guid, session.session_date, asset_count
    );

    let transcript = db::insert_transcript(pool, &session.guid, &body, Some("ja"), Some(STUB_ENGINE)).await?;
    let status = advance(pool, &session, target).await?;

    Ok((transcript, status))
}

/// Run summarization over the latest transcript; auto-advances to
/// processing.
pub async fn run_summarization(
    pool: &SqlitePool,
    organization_id: &str,
    session_id: &str,
) -> Result<(AiSummary, SessionStatus), ApiError> {
    let session = load_session(pool, organization_id, session_id).await?;

    let target = operation_target(SessionOperation::Summarize, session.status)?;
    operation_consent(SessionOperation::Summarize, session.consent())?;

    let transcript = db::latest_transcript(pool, &session.guid)
        .await?
        .ok_or_else(|| ApiError::Conflict("session has no transcript to summarize".to_string()))?;

    let excerpt: String = transcript.body.chars().take(120).collect();
    let body = format!("[summary v{}] {}", transcript.version, excerpt);

    let summary = db::insert_summary(pool, &session.guid, &body).await?;
    let status = advance(pool, &session, target).await?;

    Ok((summary, status))
}

/// Run structured extraction over the latest transcript; auto-advances
/// to completed.
pub async fn run_extraction(
    pool: &SqlitePool,
    organization_id: &str,
    session_id: &str,
) -> Result<(AiExtraction, SessionStatus), ApiError> {
    let session = load_session(pool, organization_id, session_id).await?;

    let target = operation_target(SessionOperation::Extract, session.status)?;
    operation_consent(SessionOperation::Extract, session.consent())?;

    let transcript = db::latest_transcript(pool, &session.guid)
        .await?
        .ok_or_else(|| ApiError::Conflict("session has no transcript to extract from".to_string()))?;

    let content = serde_json::json!({
        "source_transcript_version": transcript.version,
        "topics": [],
        "support_needs": [],
        "action_items": [],
    });

    let extraction = db::insert_extraction(pool, &session.guid, &content).await?;
    let status = advance(pool, &session, target).await?;

    Ok((extraction, status))
}
