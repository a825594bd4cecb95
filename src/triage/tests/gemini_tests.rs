use std::sync::Arc;

use super::*;
use crate::models::Priority;
use axum::{
    extract::State,
    http::{HeaderMap, StatusCode, Uri},
    Router,
};
use tokio::{net::TcpListener, sync::Mutex};

#[derive(Debug, Clone)]
struct SeenRequest {
    path: String,
    api_key: Option<String>,
    body: Value,
}

#[derive(Clone)]
struct ServerState {
    status: StatusCode,
    reply: String,
    seen: Arc<Mutex<Vec<SeenRequest>>>,
}

async fn handle(
    State(state): State<ServerState>,
    uri: Uri,
    headers: HeaderMap,
    body: String,
) -> (StatusCode, String) {
    state.seen.lock().await.push(SeenRequest {
        path: uri.path().to_string(),
        api_key: headers
            .get("x-goog-api-key")
            .and_then(|value| value.to_str().ok())
            .map(str::to_string),
        body: serde_json::from_str(&body).unwrap_or(Value::Null),
    });
    (state.status, state.reply.clone())
}

async fn spawn_model_server(
    status: StatusCode,
    reply: String,
) -> (String, Arc<Mutex<Vec<SeenRequest>>>) {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let state = ServerState {
        status,
        reply,
        seen: seen.clone(),
    };
    let app = Router::new().fallback(handle).with_state(state);
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("local addr");
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    (format!("http://{addr}/v1beta"), seen)
}

fn candidate_reply(text: &str) -> String {
    json!({
        "candidates": [{ "content": { "role": "model", "parts": [{ "text": text }] } }]
    })
    .to_string()
}

fn triage_json() -> String {
    json!({
        "priority": "CRITICAL",
        "etaMinutes": 5,
        "vehicleType": "ALS Ambulance",
        "recommendedAction": "Start CPR if the patient stops breathing.",
        "summary": "Possible heart attack.",
        "assistantName": "ResQ-AI",
        "contactNotificationMessage": "Sam reported chest pain. ALS unit ETA 5 min."
    })
    .to_string()
}

fn request(caller_name: Option<&str>) -> TriageRequest {
    TriageRequest {
        description: "chest pain".into(),
        caller_name: caller_name.map(str::to_string),
    }
}

fn classifier(base_url: String, api_key: Option<&str>) -> GeminiClassifier {
    GeminiClassifier::new(
        base_url,
        "gemini-test",
        api_key.map(str::to_string),
        Duration::from_secs(5),
    )
    .expect("client")
}

#[tokio::test]
async fn parses_structured_triage() {
    let (base_url, seen) = spawn_model_server(StatusCode::OK, candidate_reply(&triage_json())).await;

    let response = classifier(base_url, Some("secret"))
        .classify(&request(Some("Sam")))
        .await
        .expect("classify");

    assert_eq!(response.priority, Priority::Critical);
    assert_eq!(response.eta_minutes, 5);
    assert_eq!(response.vehicle_type, "ALS Ambulance");

    let seen = seen.lock().await;
    assert_eq!(seen.len(), 1);
    assert_eq!(seen[0].path, "/v1beta/models/gemini-test:generateContent");
    assert_eq!(seen[0].api_key.as_deref(), Some("secret"));

    let body = &seen[0].body;
    assert_eq!(
        body["generationConfig"]["responseMimeType"],
        "application/json"
    );
    assert_eq!(
        body["generationConfig"]["responseSchema"]["required"]
            .as_array()
            .map(Vec::len),
        Some(7)
    );
    let prompt = body["contents"][0]["parts"][0]["text"].as_str().unwrap();
    assert!(prompt.contains("\"chest pain\""));
    assert!(prompt.contains("The caller's name is Sam."));
}

#[tokio::test]
async fn http_error_is_reported_with_status() {
    let (base_url, _) =
        spawn_model_server(StatusCode::SERVICE_UNAVAILABLE, "overloaded".into()).await;

    let err = classifier(base_url, Some("secret"))
        .classify(&request(None))
        .await
        .unwrap_err();

    assert!(
        matches!(err, ClassifierError::Status { status: 503, ref body } if body == "overloaded")
    );
}

#[tokio::test]
async fn empty_candidates_are_malformed() {
    let (base_url, _) = spawn_model_server(StatusCode::OK, json!({ "candidates": [] }).to_string()).await;

    let err = classifier(base_url, Some("secret"))
        .classify(&request(None))
        .await
        .unwrap_err();

    assert!(matches!(err, ClassifierError::Malformed(_)));
}

#[tokio::test]
async fn text_missing_fields_is_malformed() {
    let (base_url, _) = spawn_model_server(
        StatusCode::OK,
        candidate_reply(r#"{"priority":"LOW","etaMinutes":4}"#),
    )
    .await;

    let err = classifier(base_url, Some("secret"))
        .classify(&request(None))
        .await
        .unwrap_err();

    assert!(matches!(err, ClassifierError::Malformed(_)));
}

#[tokio::test]
async fn missing_key_skips_the_network() {
    let (base_url, seen) = spawn_model_server(StatusCode::OK, candidate_reply(&triage_json())).await;

    let err = classifier(base_url, None)
        .classify(&request(None))
        .await
        .unwrap_err();

    assert!(matches!(err, ClassifierError::MissingApiKey));
    assert!(seen.lock().await.is_empty());
}

#[test]
fn prompt_omits_blank_caller_name() {
    let prompt = build_prompt(&request(Some("  ")));
    assert!(!prompt.contains("caller's name"));
    assert!(prompt.starts_with("Analyze this emergency call: \"chest pain\"."));
}
