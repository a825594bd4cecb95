use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

/// Ordinal severity assigned by the triage classifier, most severe first.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE", try_from = "String")]
pub enum Priority {
    Critical,
    High,
    Medium,
    Low,
}

impl Priority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::Critical => "CRITICAL",
            Priority::High => "HIGH",
            Priority::Medium => "MEDIUM",
            Priority::Low => "LOW",
        }
    }

    pub const ALL: [Priority; 4] = [
        Priority::Critical,
        Priority::High,
        Priority::Medium,
        Priority::Low,
    ];
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Priority {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Priority::ALL
            .into_iter()
            .find(|priority| priority.as_str().eq_ignore_ascii_case(value.trim()))
            .ok_or_else(|| format!("unknown priority '{value}'"))
    }
}

impl TryFrom<String> for Priority {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// Structured answer expected from the triage classifier. Every field is required.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TriageResponse {
    pub priority: Priority,
    /// Advisory range is 3..=15; only positivity is enforced downstream.
    pub eta_minutes: i64,
    pub vehicle_type: String,
    pub recommended_action: String,
    pub summary: String,
    pub assistant_name: String,
    /// Requested to stay within 160 characters, never enforced.
    pub contact_notification_message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn priority_parses_case_insensitively() {
        assert_eq!("critical".parse::<Priority>(), Ok(Priority::Critical));
        assert_eq!(" Low ".parse::<Priority>(), Ok(Priority::Low));
        assert!("URGENT".parse::<Priority>().is_err());
    }

    #[test]
    fn priority_orders_by_severity() {
        assert!(Priority::Critical < Priority::High);
        assert!(Priority::Medium < Priority::Low);
    }

    #[test]
    fn triage_response_reads_camel_case_json() {
        let json = r#"{
            "priority": "high",
            "etaMinutes": 7,
            "vehicleType": "BLS Ambulance",
            "recommendedAction": "Apply pressure to the wound.",
            "summary": "Laceration, conscious patient.",
            "assistantName": "ResQ-AI",
            "contactNotificationMessage": "Ambulance on the way, ETA 7 min."
        }"#;

        let response: TriageResponse = serde_json::from_str(json).unwrap();
        assert_eq!(response.priority, Priority::High);
        assert_eq!(response.eta_minutes, 7);
        assert_eq!(response.vehicle_type, "BLS Ambulance");

        let encoded = serde_json::to_value(&response).unwrap();
        assert_eq!(encoded["priority"], "HIGH");
    }

    #[test]
    fn triage_response_rejects_missing_fields() {
        let json = r#"{"priority": "LOW", "etaMinutes": 4}"#;
        assert!(serde_json::from_str::<TriageResponse>(json).is_err());
    }
}
