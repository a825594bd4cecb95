use serde::{Deserialize, Serialize};

/// Simulated seconds since dispatch. Only ever moves forward; a reset replaces it.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ElapsedClock {
    elapsed_secs: u64,
}

impl ElapsedClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn elapsed_secs(&self) -> u64 {
        self.elapsed_secs
    }

    /// Advances by `secs`, never past `limit`. Returns the new reading.
    pub fn advance(&mut self, secs: u64, limit: u64) -> u64 {
        let next = self.elapsed_secs.saturating_add(secs).min(limit);
        self.elapsed_secs = self.elapsed_secs.max(next);
        self.elapsed_secs
    }

    pub fn has_reached(&self, limit: u64) -> bool {
        self.elapsed_secs >= limit
    }
}
