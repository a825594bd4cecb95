use std::time::Duration;

use thiserror::Error;

use crate::dispatch::SessionState;

/// Failures surfaced by the session controller and the projector.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// The request was rejected before any state change or external call.
    #[error("validation failed: {0}")]
    Validation(String),

    /// The triage classifier could not produce a usable response.
    #[error("triage request failed: {0}")]
    Request(#[from] ClassifierError),

    /// A request arrived while another session was already in flight.
    #[error("a session is already {0}; reset before requesting help again")]
    Conflict(SessionState),

    #[error("invalid dispatch record: {0}")]
    InvalidRecord(String),

    /// The session was reset while the classifier call was outstanding.
    #[error("session {0} was reset before triage completed")]
    Abandoned(String),
}

#[derive(Debug, Error)]
pub enum ClassifierError {
    #[error("no classifier API key configured (set GEMINI_API_KEY)")]
    MissingApiKey,

    #[error("classifier transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("classifier returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("malformed classifier response: {0}")]
    Malformed(String),

    #[error("classifier did not answer within {0:?}")]
    Timeout(Duration),
}

impl From<serde_json::Error> for ClassifierError {
    fn from(err: serde_json::Error) -> Self {
        ClassifierError::Malformed(err.to_string())
    }
}
