use serde::{Deserialize, Serialize};

/// Caller details kept by the profile store. Every field may be blank.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase", default)]
pub struct UserProfile {
    pub name: String,
    pub phone: String,
    pub emergency_contact_name: String,
    pub emergency_contact_phone: String,
    pub medical_info: String,
}

impl UserProfile {
    /// Name to pass to the classifier, if one was entered.
    pub fn caller_name(&self) -> Option<&str> {
        let name = self.name.trim();
        (!name.is_empty()).then_some(name)
    }

    /// True when either contact field is filled in; the dashboard shows a card for it.
    pub fn has_emergency_contact(&self) -> bool {
        !self.emergency_contact_name.trim().is_empty() || self.can_notify_contact()
    }

    /// A message can only go out with a phone number.
    pub fn can_notify_contact(&self) -> bool {
        !self.emergency_contact_phone.trim().is_empty()
    }

    pub fn first_name(&self) -> Option<&str> {
        self.caller_name()
            .and_then(|name| name.split_whitespace().next())
    }
}
