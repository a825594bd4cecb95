pub mod profile;
pub mod record;
pub mod triage;

pub use profile::UserProfile;
pub use record::{Coordinates, DispatchRecord, RecordSource};
pub use triage::{Priority, TriageResponse};
