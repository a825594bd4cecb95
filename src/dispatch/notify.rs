use serde::{Deserialize, Serialize};

use crate::models::{DispatchRecord, UserProfile};

/// Progress of the simulated message to the caller's emergency contact.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum ContactStatus {
    NotConfigured,
    /// A contact name is on file but no phone number to send to.
    NoPhone,
    Sending,
    Sent,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ContactNotice {
    pub status: ContactStatus,
    pub contact_name: String,
    pub contact_phone: String,
    pub message: String,
}

/// Nothing is actually sent: the status flips to `Sent` once the simulated
/// clock passes `notify_after_secs`.
pub fn contact_notice(
    profile: &UserProfile,
    record: &DispatchRecord,
    elapsed_secs: u64,
    notify_after_secs: u64,
) -> ContactNotice {
    let status = if !profile.has_emergency_contact() {
        ContactStatus::NotConfigured
    } else if !profile.can_notify_contact() {
        ContactStatus::NoPhone
    } else if elapsed_secs >= notify_after_secs {
        ContactStatus::Sent
    } else {
        ContactStatus::Sending
    };

    ContactNotice {
        status,
        contact_name: profile.emergency_contact_name.trim().to_string(),
        contact_phone: profile.emergency_contact_phone.trim().to_string(),
        message: record.contact_notification_message.clone(),
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;
    use crate::models::{Priority, RecordSource};

    fn record() -> DispatchRecord {
        DispatchRecord {
            session_id: "s".into(),
            priority: Priority::Medium,
            eta_secs: 600,
            vehicle_type: "BLS Ambulance".into(),
            recommended_action: String::new(),
            summary: String::new(),
            assistant_name: "ResQ-AI".into(),
            contact_notification_message: "Sam needs help, ambulance ETA 10 min.".into(),
            coordinates: None,
            dispatched_at: Utc::now(),
            source: RecordSource::Classifier,
        }
    }

    #[test]
    fn without_phone_nothing_is_sent() {
        let profile = UserProfile {
            emergency_contact_name: " Jo ".into(),
            ..Default::default()
        };
        let notice = contact_notice(&profile, &record(), 500, 15);
        assert_eq!(notice.status, ContactStatus::NoPhone);
        assert_eq!(notice.contact_name, "Jo");
        assert!(notice.contact_phone.is_empty());
    }

    #[test]
    fn empty_profile_has_no_contact() {
        let notice = contact_notice(&UserProfile::default(), &record(), 500, 15);
        assert_eq!(notice.status, ContactStatus::NotConfigured);
    }

    #[test]
    fn flips_to_sent_after_delay() {
        let profile = UserProfile {
            emergency_contact_name: "Jo".into(),
            emergency_contact_phone: " 555-0100 ".into(),
            ..Default::default()
        };
        let record = record();

        let early = contact_notice(&profile, &record, 10, 15);
        assert_eq!(early.status, ContactStatus::Sending);
        assert_eq!(early.contact_phone, "555-0100");
        assert_eq!(early.message, record.contact_notification_message);

        assert_eq!(contact_notice(&profile, &record, 15, 15).status, ContactStatus::Sent);
    }
}
