pub mod clock;
pub mod controller;
pub mod events;
pub mod notify;
pub mod projector;
pub mod state;

pub use clock::ElapsedClock;
pub use controller::{ControllerSettings, FallbackPolicy, SessionController, SessionSnapshot};
pub use events::{DispatchEvent, EventBus};
pub use notify::{contact_notice, ContactNotice, ContactStatus};
pub use projector::{format_countdown, project, Projection, StatusLabel, UnitPosition};
pub use state::{SessionData, SessionState};
