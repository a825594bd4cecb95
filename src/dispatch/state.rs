use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{error::DispatchError, models::DispatchRecord};

use super::ElapsedClock;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum SessionState {
    Idle,
    Analyzing,
    Dispatched,
}

impl Default for SessionState {
    fn default() -> Self {
        SessionState::Idle
    }
}

impl SessionState {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionState::Idle => "idle",
            SessionState::Analyzing => "analyzing",
            SessionState::Dispatched => "dispatched",
        }
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Everything one emergency session owns. Record and clock exist only while dispatched.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionData {
    pub state: SessionState,
    pub session_id: Option<String>,
    pub started_at: Option<DateTime<Utc>>,
    pub record: Option<DispatchRecord>,
    pub clock: Option<ElapsedClock>,
    pub location_degraded: bool,
}

impl SessionData {
    pub fn new() -> Self {
        Self::default()
    }

    /// Idle -> Analyzing. Any other starting state is a conflict.
    pub fn begin_analysis(
        &mut self,
        session_id: String,
        start_at: DateTime<Utc>,
    ) -> Result<(), DispatchError> {
        if self.state != SessionState::Idle {
            return Err(DispatchError::Conflict(self.state));
        }

        *self = Self {
            state: SessionState::Analyzing,
            session_id: Some(session_id),
            started_at: Some(start_at),
            record: None,
            clock: None,
            location_degraded: false,
        };
        Ok(())
    }

    pub fn is_analyzing(&self, session_id: &str) -> bool {
        self.state == SessionState::Analyzing && self.session_id.as_deref() == Some(session_id)
    }

    pub fn mark_location_degraded(&mut self, session_id: &str) {
        if self.is_analyzing(session_id) {
            self.location_degraded = true;
        }
    }

    /// Analyzing -> Dispatched, starting a fresh clock. Fails if the session
    /// was reset (or replaced) while the classifier was running.
    pub fn dispatch(&mut self, record: DispatchRecord) -> Result<(), DispatchError> {
        if !self.is_analyzing(&record.session_id) {
            return Err(DispatchError::Abandoned(record.session_id));
        }

        self.state = SessionState::Dispatched;
        self.record = Some(record);
        self.clock = Some(ElapsedClock::new());
        Ok(())
    }

    /// Analyzing -> Idle after a classifier failure. No-op for a stale session id.
    pub fn abort_analysis(&mut self, session_id: &str) -> bool {
        if self.is_analyzing(session_id) {
            self.reset();
            true
        } else {
            false
        }
    }

    /// Back to Idle from anywhere. Returns false when already idle and empty.
    pub fn reset(&mut self) -> bool {
        let changed = self.state != SessionState::Idle || self.session_id.is_some();
        *self = Self::default();
        changed
    }

    pub fn elapsed_secs(&self) -> u64 {
        self.clock.map(|clock| clock.elapsed_secs()).unwrap_or(0)
    }

    /// Advances the clock toward the ETA. `None` unless dispatched.
    pub fn advance(&mut self, secs: u64) -> Option<u64> {
        let eta_secs = self.record.as_ref()?.eta_secs;
        let clock = self.clock.as_mut()?;
        Some(clock.advance(secs, eta_secs))
    }

    pub fn has_arrived(&self) -> bool {
        match (&self.record, &self.clock) {
            (Some(record), Some(clock)) => clock.has_reached(record.eta_secs),
            _ => false,
        }
    }
}
