//! Interview session workflow integration tests
//!
//! Drives the consent-gated workflow services against an in-memory
//! database: auto-advances, explicit transitions, artifact versioning
//! and the metadata lock.

use shien_api::db::sessions::InterviewSession;
use shien_api::db::{clients, sessions as db_sessions};
use shien_api::db::clients::Client;
use shien_api::error::ApiError;
use shien_api::sessions as service;
use shien_api::sessions::state::SessionStatus;
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::SqlitePool;

const ORG: &str = "org-1";

async fn setup_pool() -> SqlitePool {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .expect("Failed to create in-memory database");

    sqlx::query("PRAGMA foreign_keys = ON").execute(&pool).await.unwrap();
    shien_common::db::init::create_all_tables(&pool).await.unwrap();

    sqlx::query("INSERT INTO organizations (guid, name) VALUES (?, 'Test Facility')")
        .bind(ORG)
        .execute(&pool)
        .await
        .unwrap();

    pool
}

async fn seed_session(pool: &SqlitePool, recording: bool, ai: bool) -> InterviewSession {
    let client = Client::new(ORG.to_string(), "Tanaka".to_string());
    clients::save_client(pool, &client).await.unwrap();

    let mut session =
        InterviewSession::new(ORG.to_string(), client.guid, "2025-06-02".parse().unwrap());
    session.recording_consent = recording;
    session.ai_processing_consent = ai;
    db_sessions::insert_session(pool, &session).await.unwrap();

    session
}

fn media(file_name: &str) -> service::NewMedia {
    service::NewMedia {
        file_name: file_name.to_string(),
        content_type: Some("audio/wav".to_string()),
        duration_seconds: Some(1800.0),
        uploaded_by: None,
    }
}

#[tokio::test]
async fn upload_auto_advances_draft_to_recording() {
    let pool = setup_pool().await;
    let session = seed_session(&pool, true, true).await;

    let (_, status) = service::upload_media(&pool, ORG, &session.guid, media("a.wav"))
        .await
        .unwrap();
    assert_eq!(status, SessionStatus::Recording);

    // A second upload stays in recording
    let (_, status) = service::upload_media(&pool, ORG, &session.guid, media("b.wav"))
        .await
        .unwrap();
    assert_eq!(status, SessionStatus::Recording);

    let assets = db_sessions::list_media_assets(&pool, &session.guid).await.unwrap();
    assert_eq!(assets.len(), 2);
}

#[tokio::test]
async fn upload_without_recording_consent_is_rejected() {
    let pool = setup_pool().await;
    let session = seed_session(&pool, false, true).await;

    let err = service::upload_media(&pool, ORG, &session.guid, media("a.wav"))
        .await
        .unwrap_err();
    assert!(matches!(err, ApiError::Conflict(_)));

    // No asset was stored and the state did not move
    let assets = db_sessions::list_media_assets(&pool, &session.guid).await.unwrap();
    assert!(assets.is_empty());
    let reloaded = db_sessions::find_session(&pool, ORG, &session.guid).await.unwrap().unwrap();
    assert_eq!(reloaded.status, SessionStatus::Draft);
}

#[tokio::test]
async fn transcription_requires_ai_consent() {
    let pool = setup_pool().await;
    let session = seed_session(&pool, true, false).await;

    let err = service::run_transcription(&pool, ORG, &session.guid).await.unwrap_err();
    assert!(matches!(err, ApiError::Conflict(_)));
}

#[tokio::test]
async fn full_workflow_through_extraction() {
    let pool = setup_pool().await;
    let session = seed_session(&pool, true, true).await;

    service::upload_media(&pool, ORG, &session.guid, media("a.wav")).await.unwrap();

    let (transcript, status) =
        service::run_transcription(&pool, ORG, &session.guid).await.unwrap();
    assert_eq!(status, SessionStatus::Transcribing);
    assert_eq!(transcript.version, 1);

    let (summary, status) =
        service::run_summarization(&pool, ORG, &session.guid).await.unwrap();
    assert_eq!(status, SessionStatus::Processing);
    assert_eq!(summary.version, 1);

    let (extraction, status) = service::run_extraction(&pool, ORG, &session.guid).await.unwrap();
    assert_eq!(status, SessionStatus::Completed);
    assert_eq!(extraction.version, 1);
    assert_eq!(extraction.content["source_transcript_version"], 1);

    // Extraction is unavailable once completed
    let err = service::run_extraction(&pool, ORG, &session.guid).await.unwrap_err();
    assert!(matches!(err, ApiError::Conflict(_)));
}

#[tokio::test]
async fn transcript_versions_accumulate() {
    let pool = setup_pool().await;
    let session = seed_session(&pool, true, true).await;

    let (first, _) = service::run_transcription(&pool, ORG, &session.guid).await.unwrap();
    let (second, _) = service::run_transcription(&pool, ORG, &session.guid).await.unwrap();

    assert_eq!(first.version, 1);
    assert_eq!(second.version, 2);

    let latest = db_sessions::latest_transcript(&pool, &session.guid).await.unwrap().unwrap();
    assert_eq!(latest.version, 2);
}

#[tokio::test]
async fn summarize_without_transcript_is_rejected() {
    let pool = setup_pool().await;
    let session = seed_session(&pool, true, true).await;

    // Force the state to transcribing without producing a transcript
    let moved = db_sessions::transition_status(
        &pool,
        ORG,
        &session.guid,
        SessionStatus::Draft,
        SessionStatus::Transcribing,
    )
    .await
    .unwrap();
    assert!(moved);

    let err = service::run_summarization(&pool, ORG, &session.guid).await.unwrap_err();
    assert!(matches!(err, ApiError::Conflict(_)));
}

#[tokio::test]
async fn explicit_transition_follows_table() {
    let pool = setup_pool().await;
    let session = seed_session(&pool, true, true).await;

    let session =
        service::request_transition(&pool, ORG, &session.guid, SessionStatus::Scheduled)
            .await
            .unwrap();
    assert_eq!(session.status, SessionStatus::Scheduled);

    // scheduled -> completed is not in the table
    let err = service::request_transition(&pool, ORG, &session.guid, SessionStatus::Completed)
        .await
        .unwrap_err();
    assert!(matches!(err, ApiError::Conflict(_)));
}

#[tokio::test]
async fn completed_blocks_metadata_and_reopens_via_archive() {
    let pool = setup_pool().await;
    let session = seed_session(&pool, true, true).await;

    service::run_transcription(&pool, ORG, &session.guid).await.unwrap();
    service::run_extraction(&pool, ORG, &session.guid).await.unwrap();

    // Metadata edits are locked once completed
    let err = service::update_metadata(
        &pool,
        ORG,
        &session.guid,
        service::MetadataUpdate {
            session_date: None,
            session_type: None,
            title: Some("new title".to_string()),
        },
    )
    .await
    .unwrap_err();
    assert!(matches!(err, ApiError::Conflict(_)));

    // completed -> draft is illegal; only archived is reachable
    let err = service::request_transition(&pool, ORG, &session.guid, SessionStatus::Draft)
        .await
        .unwrap_err();
    assert!(matches!(err, ApiError::Conflict(_)));

    let session = service::request_transition(&pool, ORG, &session.guid, SessionStatus::Archived)
        .await
        .unwrap();
    assert_eq!(session.status, SessionStatus::Archived);

    // archived reopens to draft
    let session = service::request_transition(&pool, ORG, &session.guid, SessionStatus::Draft)
        .await
        .unwrap();
    assert_eq!(session.status, SessionStatus::Draft);

    // Artifacts survive the reopen
    let latest = db_sessions::latest_transcript(&pool, &session.guid).await.unwrap();
    assert!(latest.is_some());
}

#[tokio::test]
async fn consent_can_be_granted_later() {
    let pool = setup_pool().await;
    let session = seed_session(&pool, false, false).await;

    let err = service::request_transition(&pool, ORG, &session.guid, SessionStatus::Recording)
        .await
        .unwrap_err();
    assert!(matches!(err, ApiError::Conflict(_)));

    let session = service::update_consent(&pool, ORG, &session.guid, Some(true), None)
        .await
        .unwrap();
    assert!(session.recording_consent);
    assert!(!session.ai_processing_consent);

    let session = service::request_transition(&pool, ORG, &session.guid, SessionStatus::Recording)
        .await
        .unwrap();
    assert_eq!(session.status, SessionStatus::Recording);
}

#[tokio::test]
async fn missing_session_is_not_found() {
    let pool = setup_pool().await;

    let err = service::run_transcription(&pool, ORG, "missing").await.unwrap_err();
    assert!(matches!(err, ApiError::NotFound(_)));

    // A session in another organization is invisible
    let session = seed_session(&pool, true, true).await;
    let err = service::run_transcription(&pool, "other-org", &session.guid).await.unwrap_err();
    assert!(matches!(err, ApiError::NotFound(_)));
}
