use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::DispatchError;

use super::{Priority, TriageResponse};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Coordinates {
    pub lat: f64,
    pub lng: f64,
}

/// Where a dispatch record came from.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum RecordSource {
    Classifier,
    Fallback,
}

/// The triage outcome for one session. Built once at dispatch and never mutated.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DispatchRecord {
    pub session_id: String,
    pub priority: Priority,
    /// Total simulated transit time; always positive for a well-formed record.
    pub eta_secs: u64,
    pub vehicle_type: String,
    pub recommended_action: String,
    pub summary: String,
    pub assistant_name: String,
    pub contact_notification_message: String,
    pub coordinates: Option<Coordinates>,
    pub dispatched_at: DateTime<Utc>,
    pub source: RecordSource,
}

impl DispatchRecord {
    pub fn from_triage(
        response: TriageResponse,
        session_id: String,
        coordinates: Option<Coordinates>,
        source: RecordSource,
    ) -> Result<Self, DispatchError> {
        if response.eta_minutes <= 0 {
            return Err(DispatchError::InvalidRecord(format!(
                "etaMinutes must be positive, got {}",
                response.eta_minutes
            )));
        }

        let eta_secs = (response.eta_minutes as u64)
            .checked_mul(60)
            .ok_or_else(|| {
                DispatchError::InvalidRecord(format!(
                    "etaMinutes {} overflows the simulated clock",
                    response.eta_minutes
                ))
            })?;

        Ok(Self {
            session_id,
            priority: response.priority,
            eta_secs,
            vehicle_type: response.vehicle_type,
            recommended_action: response.recommended_action,
            summary: response.summary,
            assistant_name: response.assistant_name,
            contact_notification_message: response.contact_notification_message,
            coordinates,
            dispatched_at: Utc::now(),
            source,
        })
    }

    pub fn eta_minutes(&self) -> u64 {
        self.eta_secs / 60
    }

    pub fn is_fallback(&self) -> bool {
        self.source == RecordSource::Fallback
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn response(eta_minutes: i64) -> TriageResponse {
        TriageResponse {
            priority: Priority::Critical,
            eta_minutes,
            vehicle_type: "ALS Ambulance".into(),
            recommended_action: "Begin chest compressions.".into(),
            summary: "Suspected cardiac arrest.".into(),
            assistant_name: "ResQ-AI".into(),
            contact_notification_message: "Help is on the way.".into(),
        }
    }

    #[test]
    fn converts_minutes_to_seconds() {
        let record = DispatchRecord::from_triage(
            response(5),
            "s-1".into(),
            None,
            RecordSource::Classifier,
        )
        .unwrap();

        assert_eq!(record.eta_secs, 300);
        assert_eq!(record.eta_minutes(), 5);
        assert_eq!(record.priority, Priority::Critical);
        assert!(!record.is_fallback());
    }

    #[test]
    fn rejects_non_positive_eta() {
        for eta in [0, -3] {
            let err = DispatchRecord::from_triage(
                response(eta),
                "s-1".into(),
                None,
                RecordSource::Classifier,
            )
            .unwrap_err();
            assert!(matches!(err, DispatchError::InvalidRecord(_)));
        }
    }
}
