use crate::models::{Priority, TriageResponse};

/// Canned assessment used when the classifier is unreachable and the caller
/// opted into substitution.
pub fn fallback_response() -> TriageResponse {
    TriageResponse {
        priority: Priority::High,
        eta_minutes: 8,
        vehicle_type: "Standard Ambulance".into(),
        recommended_action: "Stay calm. Keep your phone line open. If you are in danger, move to a safe location.".into(),
        summary: "Emergency services have been notified manually due to connection issues.".into(),
        assistant_name: "Dispatch Center".into(),
        contact_notification_message: "Emergency detected. Ambulance dispatched to location. ETA ~8 mins.".into(),
    }
}
