use std::sync::Arc;

use async_trait::async_trait;
use resq_lib::{
    dispatch::{ControllerSettings, ContactStatus},
    location::{FixedLocation, NoLocation},
    models::{Coordinates, RecordSource, TriageResponse},
    project,
    settings::ProfileStore,
    triage::{TriageClassifier, TriageRequest},
    ClassifierError, DispatchError, DispatchEvent, FallbackPolicy, Priority, SessionController,
    SessionState, StatusLabel, UserProfile,
};

struct ScriptedClassifier(Result<TriageResponse, u16>);

#[async_trait]
impl TriageClassifier for ScriptedClassifier {
    async fn classify(&self, _request: &TriageRequest) -> Result<TriageResponse, ClassifierError> {
        match &self.0 {
            Ok(response) => Ok(response.clone()),
            Err(status) => Err(ClassifierError::Status {
                status: *status,
                body: "unavailable".into(),
            }),
        }
    }
}

fn stroke() -> TriageResponse {
    TriageResponse {
        priority: Priority::Critical,
        eta_minutes: 6,
        vehicle_type: "ALS Ambulance".into(),
        recommended_action: "Note the time symptoms started.".into(),
        summary: "Possible stroke.".into(),
        assistant_name: "ResQ-AI".into(),
        contact_notification_message: "Stroke symptoms reported, ALS unit ETA 6 min.".into(),
    }
}

fn profile() -> UserProfile {
    UserProfile {
        name: "Sam Rivera".into(),
        emergency_contact_name: "Alex".into(),
        emergency_contact_phone: "555-0142".into(),
        ..Default::default()
    }
}

#[tokio::test]
async fn full_session_lifecycle() {
    let controller = SessionController::new(
        Arc::new(ScriptedClassifier(Ok(stroke()))),
        Arc::new(FixedLocation(Coordinates {
            lat: 34.05,
            lng: -118.24,
        })),
        Arc::new(ProfileStore::in_memory(profile())),
        ControllerSettings::default(),
    );
    let mut events = controller.subscribe();

    assert_eq!(controller.state().await, SessionState::Idle);
    let record = controller.request_help("face drooping, slurred speech", None).await.unwrap();
    assert_eq!(record.eta_secs, 360);

    let mut step = 0;
    let mut last_updates: Vec<String> = Vec::new();
    let mut statuses = Vec::new();
    while step < 400 {
        let snapshot = controller.advance(12).await.unwrap().unwrap();
        let projection = snapshot.projection.unwrap();
        assert!(projection.live_updates.starts_with(&last_updates));
        last_updates = projection.live_updates.clone();
        if statuses.last() != Some(&projection.status) {
            statuses.push(projection.status);
        }
        if !projection.countdown_active {
            break;
        }
        step += 12;
    }

    assert_eq!(
        statuses,
        vec![
            StatusLabel::Dispatched,
            StatusLabel::EnRoute,
            StatusLabel::Nearby,
            StatusLabel::ArrivingNow,
            StatusLabel::Arrived,
        ]
    );
    assert_eq!(last_updates.len(), 5);

    let snapshot = controller.snapshot().await.unwrap();
    assert_eq!(snapshot.contact.unwrap().status, ContactStatus::Sent);

    controller.reset().await;
    assert_eq!(controller.state().await, SessionState::Idle);

    let mut states = Vec::new();
    let mut arrivals = 0;
    while let Ok(event) = events.try_recv() {
        match event {
            DispatchEvent::StateChanged { state, .. } => states.push(state),
            DispatchEvent::Arrived { .. } => arrivals += 1,
            DispatchEvent::Tick(_) => {}
        }
    }
    assert_eq!(
        states,
        vec![
            SessionState::Analyzing,
            SessionState::Dispatched,
            SessionState::Idle
        ]
    );
    assert_eq!(arrivals, 1);
}

#[tokio::test]
async fn fallback_choice_is_explicit() {
    let make = |policy| {
        SessionController::new(
            Arc::new(ScriptedClassifier(Err(503))),
            Arc::new(NoLocation),
            Arc::new(ProfileStore::in_memory(UserProfile::default())),
            ControllerSettings::default(),
        )
        .with_fallback(policy)
    };

    let surfaced = make(FallbackPolicy::Surface);
    let err = surfaced.request_help("bleeding", None).await.unwrap_err();
    assert!(matches!(
        err,
        DispatchError::Request(ClassifierError::Status { status: 503, .. })
    ));
    assert_eq!(surfaced.state().await, SessionState::Idle);

    let substituted = make(FallbackPolicy::Substitute);
    let record = substituted.request_help("bleeding", None).await.unwrap();
    assert_eq!(record.source, RecordSource::Fallback);
    assert_eq!(substituted.state().await, SessionState::Dispatched);
    let snapshot = substituted.snapshot().await.unwrap();
    assert!(snapshot.location_warning.is_some());
}

#[tokio::test]
async fn controllers_do_not_share_sessions() {
    let build = || {
        SessionController::new(
            Arc::new(ScriptedClassifier(Ok(stroke()))),
            Arc::new(NoLocation),
            Arc::new(ProfileStore::in_memory(UserProfile::default())),
            ControllerSettings::default(),
        )
    };
    let first = build();
    let second = build();

    first.request_help("chest pain", None).await.unwrap();
    assert_eq!(second.state().await, SessionState::Idle);
    second.request_help("broken arm", None).await.unwrap();

    first.advance(60).await.unwrap();
    assert_eq!(first.snapshot().await.unwrap().elapsed_secs, 60);
    assert_eq!(second.snapshot().await.unwrap().elapsed_secs, 0);
}

#[test]
fn projection_matches_for_identical_inputs() {
    let record = resq_lib::DispatchRecord::from_triage(
        stroke(),
        "pure".into(),
        None,
        RecordSource::Classifier,
    )
    .unwrap();

    for elapsed in 0..=400 {
        let a = project(&record, elapsed).unwrap();
        let b = project(&record, elapsed).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.progress_percent.to_bits(), b.progress_percent.to_bits());
        if elapsed >= record.eta_secs {
            assert_eq!(a.progress_percent, 100.0);
            assert_eq!(a.remaining_secs, 0);
        }
    }
}
