//! Interview session workflow state machine
//!
//! The transition table is a single inspectable artifact; consent guards
//! and the per-operation auto-advance shortcuts sit next to it so every
//! legality question is answerable without touching HTTP or the database.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Interview session workflow state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    Draft,
    Scheduled,
    Recording,
    Transcribing,
    Processing,
    Completed,
    Archived,
}

impl SessionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionStatus::Draft => "draft",
            SessionStatus::Scheduled => "scheduled",
            SessionStatus::Recording => "recording",
            SessionStatus::Transcribing => "transcribing",
            SessionStatus::Processing => "processing",
            SessionStatus::Completed => "completed",
            SessionStatus::Archived => "archived",
        }
    }

    pub fn parse(s: &str) -> Option<SessionStatus> {
        match s {
            "draft" => Some(SessionStatus::Draft),
            "scheduled" => Some(SessionStatus::Scheduled),
            "recording" => Some(SessionStatus::Recording),
            "transcribing" => Some(SessionStatus::Transcribing),
            "processing" => Some(SessionStatus::Processing),
            "completed" => Some(SessionStatus::Completed),
            "archived" => Some(SessionStatus::Archived),
            _ => None,
        }
    }

    /// Content edits (metadata updates) are blocked once here
    pub fn is_content_locked(&self) -> bool {
        matches!(self, SessionStatus::Completed | SessionStatus::Archived)
    }
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Explicit transition table
pub fn allowed_targets(from: SessionStatus) -> &'static [SessionStatus] {
    use SessionStatus::*;
    match from {
        Draft => &[Scheduled, Recording, Archived],
        Scheduled => &[Recording, Draft, Archived],
        Recording => &[Transcribing, Draft],
        Transcribing => &[Processing, Recording],
        Processing => &[Completed, Transcribing],
        Completed => &[Archived],
        Archived => &[Draft],
    }
}

/// Consent flags held on the session
#[derive(Debug, Clone, Copy, Default)]
pub struct ConsentFlags {
    pub recording: bool,
    pub ai_processing: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransitionError {
    #[error("transition from '{from}' to '{to}' is not allowed")]
    NotAllowed { from: SessionStatus, to: SessionStatus },

    #[error("operation '{operation}' is not available in state '{status}'")]
    OperationUnavailable { operation: &'static str, status: SessionStatus },

    #[error("recording consent has not been given")]
    RecordingConsentMissing,

    #[error("AI processing consent has not been given")]
    AiProcessingConsentMissing,
}

/// Consent guards on entering a state
///
/// Applied to explicit transitions and auto-advances alike.
pub fn check_consent(target: SessionStatus, consent: ConsentFlags) -> Result<(), TransitionError> {
    match target {
        SessionStatus::Recording if !consent.recording => {
            Err(TransitionError::RecordingConsentMissing)
        }
        SessionStatus::Transcribing | SessionStatus::Processing if !consent.ai_processing => {
            Err(TransitionError::AiProcessingConsentMissing)
        }
        _ => Ok(()),
    }
}

/// Validate an explicit transition request: table legality first, then
/// consent guards. No state change on error.
pub fn check_transition(
    from: SessionStatus,
    to: SessionStatus,
    consent: ConsentFlags,
) -> Result<(), TransitionError> {
    if !allowed_targets(from).contains(&to) {
        return Err(TransitionError::NotAllowed { from, to });
    }
    check_consent(to, consent)
}

/// Operations that advance session state as a side effect
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionOperation {
    UploadMedia,
    Transcribe,
    Summarize,
    Extract,
}

impl SessionOperation {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionOperation::UploadMedia => "upload_media",
            SessionOperation::Transcribe => "transcribe",
            SessionOperation::Summarize => "summarize",
            SessionOperation::Extract => "extract",
        }
    }
}

/// Resolve the state an operation leaves the session in.
///
/// These shortcuts bypass the explicit-transition table; a result equal
/// to the current state means the operation runs without advancing.
pub fn operation_target(
    op: SessionOperation,
    current: SessionStatus,
) -> Result<SessionStatus, TransitionError> {
    use SessionStatus::*;
    let target = match op {
        SessionOperation::UploadMedia => match current {
            Draft | Scheduled | Recording => Some(Recording),
            _ => None,
        },
        SessionOperation::Transcribe => match current {
            Recording | Draft | Scheduled | Transcribing => Some(Transcribing),
            _ => None,
        },
        SessionOperation::Summarize => match current {
            Transcribing | Processing => Some(Processing),
            _ => None,
        },
        SessionOperation::Extract => match current {
            Processing | Transcribing => Some(Completed),
            _ => None,
        },
    };

    target.ok_or(TransitionError::OperationUnavailable {
        operation: op.as_str(),
        status: current,
    })
}

/// Consent required by the operation itself, independent of the target
/// state it lands in.
pub fn operation_consent(op: SessionOperation, consent: ConsentFlags) -> Result<(), TransitionError> {
    match op {
        SessionOperation::UploadMedia if !consent.recording => {
            Err(TransitionError::RecordingConsentMissing)
        }
        SessionOperation::Transcribe | SessionOperation::Summarize | SessionOperation::Extract
            if !consent.ai_processing =>
        {
            Err(TransitionError::AiProcessingConsentMissing)
        }
        _ => Ok(()),
    }
}
