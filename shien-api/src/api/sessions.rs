//! Interview session handlers
//!
//! Thin HTTP shims over `crate::sessions`: the workflow services own the
//! state checks and auto-advances.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::json;
use shien_common::api::auth::ActorType;

use crate::db::sessions::{
    AiExtraction, AiSummary, InterviewSession, MediaAsset, Transcript,
};
use crate::db::{audit, clients, sessions as db_sessions};
use crate::error::{ApiError, ApiResult};
use crate::sessions as service;
use crate::sessions::state::SessionStatus;
use crate::AppState;

use super::Actor;

#[derive(Debug, Deserialize)]
pub struct CreateSessionRequest {
    pub client_id: String,
    pub session_date: NaiveDate,
    pub session_type: Option<String>,
    pub title: Option<String>,
    #[serde(default)]
    pub recording_consent: bool,
    #[serde(default)]
    pub ai_processing_consent: bool,
}

/// POST /api/sessions
pub async fn create_session(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Json(request): Json<CreateSessionRequest>,
) -> ApiResult<(StatusCode, Json<InterviewSession>)> {
    actor.require_staff()?;

    clients::find_client(&state.db, &actor.organization_id, &request.client_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("client {}", request.client_id)))?;

    let mut session = InterviewSession::new(
        actor.organization_id.clone(),
        request.client_id,
        request.session_date,
    );
    if let Some(session_type) = request.session_type {
        session.session_type = session_type;
    }
    session.title = request.title;
    session.recording_consent = request.recording_consent;
    session.ai_processing_consent = request.ai_processing_consent;

    db_sessions::insert_session(&state.db, &session).await?;

    audit::record(
        &state.db,
        &actor.organization_id,
        &actor.id,
        "create",
        "interview_session",
        Some(&session.guid),
        Some(json!({"client_id": session.client_id, "session_date": session.session_date})),
    )
    .await?;

    Ok((StatusCode::CREATED, Json(session)))
}

#[derive(Debug, Deserialize)]
pub struct SessionListQuery {
    pub client_id: Option<String>,
}

/// GET /api/sessions
pub async fn list_sessions(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Query(query): Query<SessionListQuery>,
) -> ApiResult<Json<Vec<InterviewSession>>> {
    let client_filter = match actor.actor_type {
        ActorType::Client => Some(actor.id.clone()),
        ActorType::Staff => query.client_id,
    };

    let sessions =
        db_sessions::list_sessions(&state.db, &actor.organization_id, client_filter.as_deref())
            .await?;

    Ok(Json(sessions))
}

/// GET /api/sessions/:id
pub async fn get_session(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(session_id): Path<String>,
) -> ApiResult<Json<InterviewSession>> {
    let session = db_sessions::find_session(&state.db, &actor.organization_id, &session_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("interview session {}", session_id)))?;

    actor.require_self_or_staff(&session.client_id)?;

    Ok(Json(session))
}

#[derive(Debug, Deserialize)]
pub struct UpdateSessionRequest {
    pub session_date: Option<NaiveDate>,
    pub session_type: Option<String>,
    pub title: Option<String>,
}

/// PUT /api/sessions/:id
///
/// Metadata edits; rejected once the session is completed or archived.
pub async fn update_session(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(session_id): Path<String>,
    Json(request): Json<UpdateSessionRequest>,
) -> ApiResult<Json<InterviewSession>> {
    actor.require_staff()?;

    let session = service::update_metadata(
        &state.db,
        &actor.organization_id,
        &session_id,
        service::MetadataUpdate {
            session_date: request.session_date,
            session_type: request.session_type,
            title: request.title,
        },
    )
    .await?;

    audit::record(
        &state.db,
        &actor.organization_id,
        &actor.id,
        "update",
        "interview_session",
        Some(&session.guid),
        None,
    )
    .await?;

    Ok(Json(session))
}

#[derive(Debug, Deserialize)]
pub struct TransitionRequest {
    pub to: SessionStatus,
}

/// POST /api/sessions/:id/transition
pub async fn transition_session(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(session_id): Path<String>,
    Json(request): Json<TransitionRequest>,
) -> ApiResult<Json<InterviewSession>> {
    actor.require_staff()?;

    let session =
        service::request_transition(&state.db, &actor.organization_id, &session_id, request.to)
            .await?;

    audit::record(
        &state.db,
        &actor.organization_id,
        &actor.id,
        "transition",
        "interview_session",
        Some(&session.guid),
        Some(json!({"to": request.to})),
    )
    .await?;

    Ok(Json(session))
}

#[derive(Debug, Deserialize)]
pub struct ConsentRequest {
    pub recording_consent: Option<bool>,
    pub ai_processing_consent: Option<bool>,
}

/// PUT /api/sessions/:id/consent
pub async fn update_consent(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(session_id): Path<String>,
    Json(request): Json<ConsentRequest>,
) -> ApiResult<Json<InterviewSession>> {
    actor.require_staff()?;

    let session = service::update_consent(
        &state.db,
        &actor.organization_id,
        &session_id,
        request.recording_consent,
        request.ai_processing_consent,
    )
    .await?;

    audit::record(
        &state.db,
        &actor.organization_id,
        &actor.id,
        "update_consent",
        "interview_session",
        Some(&session.guid),
        Some(json!({
            "recording_consent": session.recording_consent,
            "ai_processing_consent": session.ai_processing_consent,
        })),
    )
    .await?;

    Ok(Json(session))
}

#[derive(Debug, Deserialize)]
pub struct UploadMediaRequest {
    pub file_name: String,
    pub content_type: Option<String>,
    pub duration_seconds: Option<f64>,
}

#[derive(Debug, Serialize)]
pub struct MediaResponse {
    pub asset: MediaAsset,
    pub session_status: SessionStatus,
}

/// POST /api/sessions/:id/media
pub async fn upload_media(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(session_id): Path<String>,
    Json(request): Json<UploadMediaRequest>,
) -> ApiResult<(StatusCode, Json<MediaResponse>)> {
    actor.require_staff()?;

    let (asset, session_status) = service::upload_media(
        &state.db,
        &actor.organization_id,
        &session_id,
        service::NewMedia {
            file_name: request.file_name,
            content_type: request.content_type,
            duration_seconds: request.duration_seconds,
            uploaded_by: Some(actor.id.clone()),
        },
    )
    .await?;

    audit::record(
        &state.db,
        &actor.organization_id,
        &actor.id,
        "upload_media",
        "interview_session",
        Some(&session_id),
        Some(json!({"file_name": asset.file_name})),
    )
    .await?;

    Ok((StatusCode::CREATED, Json(MediaResponse { asset, session_status })))
}

/// GET /api/sessions/:id/media
pub async fn list_media(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(session_id): Path<String>,
) -> ApiResult<Json<Vec<MediaAsset>>> {
    actor.require_staff()?;

    db_sessions::find_session(&state.db, &actor.organization_id, &session_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("interview session {}", session_id)))?;

    let assets = db_sessions::list_media_assets(&state.db, &session_id).await?;
    Ok(Json(assets))
}

#[derive(Debug, Serialize)]
pub struct TranscriptResponse {
    pub transcript: Transcript,
    pub session_status: SessionStatus,
}

/// POST /api/sessions/:id/transcribe
pub async fn transcribe_session(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(session_id): Path<String>,
) -> ApiResult<(StatusCode, Json<TranscriptResponse>)> {
    actor.require_staff()?;

    let (transcript, session_status) =
        service::run_transcription(&state.db, &actor.organization_id, &session_id).await?;

    audit::record(
        &state.db,
        &actor.organization_id,
        &actor.id,
        "transcribe",
        "interview_session",
        Some(&session_id),
        Some(json!({"version": transcript.version})),
    )
    .await?;

    Ok((StatusCode::CREATED, Json(TranscriptResponse { transcript, session_status })))
}

#[derive(Debug, Serialize)]
pub struct SummaryResponse {
    pub summary: AiSummary,
    pub session_status: SessionStatus,
}

/// POST /api/sessions/:id/summarize
pub async fn summarize_session(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(session_id): Path<String>,
) -> ApiResult<(StatusCode, Json<SummaryResponse>)> {
    actor.require_staff()?;

    let (summary, session_status) =
        service::run_summarization(&state.db, &actor.organization_id, &session_id).await?;

    audit::record(
        &state.db,
        &actor.organization_id,
        &actor.id,
        "summarize",
        "interview_session",
        Some(&session_id),
        Some(json!({"version": summary.version})),
    )
    .await?;

    Ok((StatusCode::CREATED, Json(SummaryResponse { summary, session_status })))
}

#[derive(Debug, Serialize)]
pub struct ExtractionResponse {
    pub extraction: AiExtraction,
    pub session_status: SessionStatus,
}

/// POST /api/sessions/:id/extract
pub async fn extract_session(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(session_id): Path<String>,
) -> ApiResult<(StatusCode, Json<ExtractionResponse>)> {
    actor.require_staff()?;

    let (extraction, session_status) =
        service::run_extraction(&state.db, &actor.organization_id, &session_id).await?;

    audit::record(
        &state.db,
        &actor.organization_id,
        &actor.id,
        "extract",
        "interview_session",
        Some(&session_id),
        Some(json!({"version": extraction.version})),
    )
    .await?;

    Ok((StatusCode::CREATED, Json(ExtractionResponse { extraction, session_status })))
}
