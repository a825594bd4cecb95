use std::{fmt, str::FromStr, sync::Arc, time::Duration};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::{
    sync::{broadcast, Mutex},
    task::JoinHandle,
    time::{self, MissedTickBehavior},
};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::{
    config::AppConfig,
    error::{ClassifierError, DispatchError},
    location::{self, LocationProvider, DEGRADED_WARNING},
    models::{DispatchRecord, RecordSource, TriageResponse, UserProfile},
    settings::ProfileStore,
    triage::{fallback_response, TriageClassifier, TriageRequest},
};

use super::{
    contact_notice, project, ContactNotice, DispatchEvent, EventBus, Projection, SessionData,
    SessionState,
};

// Set to true to enable verbose logging in this module
const ENABLE_LOGS: bool = true;

use crate::{log_debug, log_error, log_info, log_warn};

/// What to do when the classifier fails.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum FallbackPolicy {
    /// Return the error and go back to idle.
    Surface,
    /// Dispatch the canned record instead.
    Substitute,
}

impl FromStr for FallbackPolicy {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "surface" => Ok(FallbackPolicy::Surface),
            "substitute" => Ok(FallbackPolicy::Substitute),
            other => Err(format!("unknown fallback policy '{other}'")),
        }
    }
}

impl fmt::Display for FallbackPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FallbackPolicy::Surface => f.write_str("surface"),
            FallbackPolicy::Substitute => f.write_str("substitute"),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSnapshot {
    pub state: SessionState,
    pub session_id: Option<String>,
    pub started_at: Option<DateTime<Utc>>,
    pub record: Option<DispatchRecord>,
    pub elapsed_secs: u64,
    pub location_warning: Option<String>,
    pub projection: Option<Projection>,
    pub contact: Option<ContactNotice>,
}

impl SessionSnapshot {
    fn build(
        data: &SessionData,
        profile: &UserProfile,
        contact_notify_secs: u64,
    ) -> Result<Self, DispatchError> {
        let elapsed_secs = data.elapsed_secs();
        let projection = data
            .record
            .as_ref()
            .map(|record| project(record, elapsed_secs))
            .transpose()?;
        let contact = data
            .record
            .as_ref()
            .map(|record| contact_notice(profile, record, elapsed_secs, contact_notify_secs));

        Ok(Self {
            state: data.state,
            session_id: data.session_id.clone(),
            started_at: data.started_at,
            record: data.record.clone(),
            elapsed_secs,
            location_warning: data
                .location_degraded
                .then(|| DEGRADED_WARNING.to_string()),
            projection,
            contact,
        })
    }

    pub fn has_arrived(&self) -> bool {
        self.projection
            .as_ref()
            .map(|projection| !projection.countdown_active)
            .unwrap_or(false)
    }
}

#[derive(Debug, Clone)]
pub struct ControllerSettings {
    pub classifier_timeout: Duration,
    pub location_timeout: Duration,
    pub tick_interval: Duration,
    pub seconds_per_tick: u64,
    pub contact_notify_secs: u64,
    pub heartbeat_every_ticks: u32,
    pub fallback: FallbackPolicy,
}

impl From<&AppConfig> for ControllerSettings {
    fn from(config: &AppConfig) -> Self {
        Self {
            classifier_timeout: config.classifier_timeout,
            location_timeout: config.location_timeout,
            tick_interval: config.tick_interval,
            seconds_per_tick: config.seconds_per_tick,
            contact_notify_secs: config.contact_notify_secs,
            heartbeat_every_ticks: config.heartbeat_every_ticks,
            fallback: config.fallback,
        }
    }
}

impl Default for ControllerSettings {
    fn default() -> Self {
        Self::from(&AppConfig::default())
    }
}

struct Ticker {
    handle: JoinHandle<()>,
    cancel_token: CancellationToken,
}

/// Returns an analyzing session to idle if `request_help` is dropped before it finishes.
struct AnalysisGuard {
    state: Arc<Mutex<SessionData>>,
    events: EventBus,
    session_id: String,
    armed: bool,
}

impl AnalysisGuard {
    fn new(state: Arc<Mutex<SessionData>>, events: EventBus, session_id: String) -> Self {
        Self {
            state,
            events,
            session_id,
            armed: true,
        }
    }

    fn disarm(mut self) {
        self.armed = false;
    }
}

fn abort_and_announce(data: &mut SessionData, events: &EventBus, session_id: &str) {
    if data.abort_analysis(session_id) {
        log_info!("Session {} back to idle without dispatch", session_id);
        events.emit(DispatchEvent::StateChanged {
            state: data.state,
            session_id: None,
        });
    }
}

impl Drop for AnalysisGuard {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        if let Ok(mut data) = self.state.try_lock() {
            abort_and_announce(&mut data, &self.events, &self.session_id);
            return;
        }

        // Lock is busy; finish the cleanup on the runtime.
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            log_error!("Session {} left analyzing: no runtime for cleanup", self.session_id);
            return;
        };
        let state = self.state.clone();
        let events = self.events.clone();
        let session_id = std::mem::take(&mut self.session_id);
        runtime.spawn(async move {
            let mut data = state.lock().await;
            abort_and_announce(&mut data, &events, &session_id);
        });
    }
}

/// Owns one emergency session. Every instance is independent; nothing is shared
/// between controllers.
#[derive(Clone)]
pub struct SessionController {
    state: Arc<Mutex<SessionData>>,
    classifier: Arc<dyn TriageClassifier>,
    location: Arc<dyn LocationProvider>,
    profiles: Arc<ProfileStore>,
    events: EventBus,
    ticker: Arc<Mutex<Option<Ticker>>>,
    settings: ControllerSettings,
}

impl SessionController {
    pub fn new(
        classifier: Arc<dyn TriageClassifier>,
        location: Arc<dyn LocationProvider>,
        profiles: Arc<ProfileStore>,
        settings: ControllerSettings,
    ) -> Self {
        Self {
            state: Arc::new(Mutex::new(SessionData::new())),
            classifier,
            location,
            profiles,
            events: EventBus::default(),
            ticker: Arc::new(Mutex::new(None)),
            settings,
        }
    }

    pub fn with_fallback(mut self, fallback: FallbackPolicy) -> Self {
        self.settings.fallback = fallback;
        self
    }

    pub fn subscribe(&self) -> broadcast::Receiver<DispatchEvent> {
        self.events.subscribe()
    }

    pub async fn state(&self) -> SessionState {
        self.state.lock().await.state
    }

    pub async fn snapshot(&self) -> Result<SessionSnapshot, DispatchError> {
        let profile = self.profiles.profile();
        let guard = self.state.lock().await;
        SessionSnapshot::build(&guard, &profile, self.settings.contact_notify_secs)
    }

    /// Runs one emergency request end to end: validate, locate, classify, dispatch.
    ///
    /// `caller_name` overrides the profile name when given.
    pub async fn request_help(
        &self,
        description: &str,
        caller_name: Option<String>,
    ) -> Result<DispatchRecord, DispatchError> {
        let description = description.trim();
        if description.is_empty() {
            return Err(DispatchError::Validation(
                "Please describe the emergency briefly.".into(),
            ));
        }

        let session_id = Uuid::new_v4().to_string();
        {
            let mut state = self.state.lock().await;
            state.begin_analysis(session_id.clone(), Utc::now())?;
        }
        let guard =
            AnalysisGuard::new(self.state.clone(), self.events.clone(), session_id.clone());
        log_info!("Session {} analyzing", session_id);
        self.emit_state_changed().await;

        if let Err(err) = self.profiles.reload() {
            log_warn!("Keeping cached profile: {:#}", err);
        }

        let fix = location::locate(self.location.as_ref(), self.settings.location_timeout).await;
        if fix.is_degraded() {
            self.state.lock().await.mark_location_degraded(&session_id);
        }

        let request = TriageRequest {
            description: description.to_string(),
            caller_name: caller_name
                .filter(|name| !name.trim().is_empty())
                .or_else(|| self.profiles.profile().caller_name().map(str::to_string)),
        };

        let classified = self.classify(&request).await.and_then(|response| {
            DispatchRecord::from_triage(
                response,
                session_id.clone(),
                fix.coordinates(),
                RecordSource::Classifier,
            )
            .map_err(|err| ClassifierError::Malformed(err.to_string()))
        });

        let record = match classified {
            Ok(record) => record,
            Err(err) => match self.settings.fallback {
                FallbackPolicy::Surface => {
                    log_error!("Triage failed for session {}: {}", session_id, err);
                    let mut state = self.state.lock().await;
                    abort_and_announce(&mut state, &self.events, &session_id);
                    guard.disarm();
                    return Err(DispatchError::Request(err));
                }
                FallbackPolicy::Substitute => {
                    log_warn!(
                        "Triage failed for session {}: {}; dispatching fallback record",
                        session_id,
                        err
                    );
                    DispatchRecord::from_triage(
                        fallback_response(),
                        session_id.clone(),
                        fix.coordinates(),
                        RecordSource::Fallback,
                    )?
                }
            },
        };

        {
            let mut state = self.state.lock().await;
            let dispatched = state.dispatch(record.clone());
            guard.disarm();
            if let Err(err) = dispatched {
                log_warn!("Discarding triage result: {}", err);
                return Err(err);
            }
        }

        log_info!(
            "Session {} dispatched: {} {} priority, ETA {}s",
            session_id,
            record.vehicle_type,
            record.priority,
            record.eta_secs
        );
        self.emit_state_changed().await;

        Ok(record)
    }

    async fn classify(&self, request: &TriageRequest) -> Result<TriageResponse, ClassifierError> {
        let timeout = self.settings.classifier_timeout;
        time::timeout(timeout, self.classifier.classify(request))
            .await
            .unwrap_or(Err(ClassifierError::Timeout(timeout)))
    }

    /// Advances the simulated clock by `secs` and publishes the new projection.
    /// Returns `None` when no session is dispatched.
    pub async fn advance(&self, secs: u64) -> Result<Option<SessionSnapshot>, DispatchError> {
        let profile = self.profiles.profile();
        let (snapshot, arrived_now) = {
            let mut guard = self.state.lock().await;
            let was_arrived = guard.has_arrived();
            if guard.advance(secs).is_none() {
                return Ok(None);
            }
            let snapshot =
                SessionSnapshot::build(&guard, &profile, self.settings.contact_notify_secs)?;
            (snapshot, !was_arrived && guard.has_arrived())
        };

        self.events
            .emit(DispatchEvent::Tick(Box::new(snapshot.clone())));

        if arrived_now {
            if let Some(session_id) = snapshot.session_id.clone() {
                log_info!("Session {} unit arrived", session_id);
                self.events.emit(DispatchEvent::Arrived { session_id });
            }
        }

        Ok(Some(snapshot))
    }

    /// Starts the periodic tick driver for the dispatched session. Replaces any previous driver.
    pub async fn start_ticker(&self) {
        let mut ticker_guard = self.ticker.lock().await;
        if let Some(previous) = ticker_guard.take() {
            previous.cancel_token.cancel();
            previous.handle.abort();
        }

        let cancel_token = CancellationToken::new();
        let controller = self.clone();
        let token = cancel_token.clone();
        let handle = tokio::spawn(async move { controller.tick_loop(token).await });

        *ticker_guard = Some(Ticker {
            handle,
            cancel_token,
        });
    }

    async fn tick_loop(&self, cancel_token: CancellationToken) {
        let mut interval = time::interval(self.settings.tick_interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // First tick fires immediately; the clock starts at zero.
        interval.tick().await;

        let heartbeat_every = self.settings.heartbeat_every_ticks.max(1);
        let mut ticks: u32 = 0;

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    let snapshot = match self.advance(self.settings.seconds_per_tick).await {
                        Ok(Some(snapshot)) => snapshot,
                        Ok(None) => break,
                        Err(err) => {
                            log_error!("Projection failed, stopping ticker: {}", err);
                            break;
                        }
                    };

                    ticks = ticks.wrapping_add(1);
                    if ticks % heartbeat_every == 0 {
                        if let Some(projection) = &snapshot.projection {
                            log_debug!(
                                "Heartbeat: {} {:.1}% remaining {}",
                                projection.status,
                                projection.progress_percent,
                                projection.countdown
                            );
                        }
                    }

                    if snapshot.has_arrived() {
                        break;
                    }
                }
                _ = cancel_token.cancelled() => {
                    break;
                }
            }
        }
    }

    async fn cancel_ticker(&self) {
        if let Some(ticker) = self.ticker.lock().await.take() {
            ticker.cancel_token.cancel();
            ticker.handle.abort();
        }
    }

    /// Returns to idle from any state, dropping the record and clock. Idempotent.
    pub async fn reset(&self) {
        let changed = self.state.lock().await.reset();
        self.cancel_ticker().await;
        if changed {
            log_info!("Session reset");
            self.emit_state_changed().await;
        }
    }

    async fn emit_state_changed(&self) {
        let (state, session_id) = {
            let guard = self.state.lock().await;
            (guard.state, guard.session_id.clone())
        };
        self.events
            .emit(DispatchEvent::StateChanged { state, session_id });
    }
}

#[cfg(test)]
#[path = "tests/controller_tests.rs"]
mod tests;
