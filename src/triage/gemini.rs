use std::time::Duration;

use async_trait::async_trait;
use log::{debug, error};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::{config::AppConfig, error::ClassifierError, models::TriageResponse};

use super::{TriageClassifier, TriageRequest};

const SYSTEM_INSTRUCTION: &str = "You are ResQ-AI, an advanced emergency dispatch system. \
Your goal is to keep the user calm, assess the situation accurately, and simulate a realistic \
dispatch response.";

/// Classifier backed by the Gemini `generateContent` REST endpoint with a JSON response schema.
pub struct GeminiClassifier {
    client: reqwest::Client,
    base_url: String,
    model: String,
    api_key: Option<String>,
}

impl GeminiClassifier {
    pub fn new(
        base_url: impl Into<String>,
        model: impl Into<String>,
        api_key: Option<String>,
        timeout: Duration,
    ) -> Result<Self, ClassifierError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            model: model.into(),
            api_key,
        })
    }

    pub fn from_config(config: &AppConfig) -> Result<Self, ClassifierError> {
        Self::new(
            config.gemini_base_url.clone(),
            config.gemini_model.clone(),
            config.api_key.clone(),
            config.classifier_timeout,
        )
    }

    fn endpoint(&self) -> String {
        format!("{}/models/{}:generateContent", self.base_url, self.model)
    }
}

#[async_trait]
impl TriageClassifier for GeminiClassifier {
    async fn classify(&self, request: &TriageRequest) -> Result<TriageResponse, ClassifierError> {
        let api_key = self
            .api_key
            .as_deref()
            .filter(|key| !key.trim().is_empty())
            .ok_or(ClassifierError::MissingApiKey)?;

        debug!("Requesting triage from model {}", self.model);

        let response = self
            .client
            .post(self.endpoint())
            .header("x-goog-api-key", api_key)
            .json(&request_body(request))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!("Triage request failed with HTTP {}", status.as_u16());
            return Err(ClassifierError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let raw = response.text().await?;
        let payload: GenerateContentResponse = serde_json::from_str(&raw)?;
        let text = payload
            .first_text()
            .ok_or_else(|| ClassifierError::Malformed("no response text from model".into()))?;

        Ok(serde_json::from_str(text)?)
    }
}

pub(crate) fn build_prompt(request: &TriageRequest) -> String {
    let caller_context = match request.caller_name.as_deref().map(str::trim) {
        Some(name) if !name.is_empty() => {
            format!(" The caller's name is {name}. Address them by name if appropriate.")
        }
        _ => String::new(),
    };

    format!(
        "Analyze this emergency call: \"{}\".{} Provide a triage assessment. \
         Act as a professional emergency dispatch system.",
        request.description.trim(),
        caller_context
    )
}

fn request_body(request: &TriageRequest) -> Value {
    json!({
        "systemInstruction": { "parts": [{ "text": SYSTEM_INSTRUCTION }] },
        "contents": [{ "role": "user", "parts": [{ "text": build_prompt(request) }] }],
        "generationConfig": {
            "responseMimeType": "application/json",
            "responseSchema": response_schema(),
        }
    })
}

fn response_schema() -> Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "priority": {
                "type": "STRING",
                "enum": ["CRITICAL", "HIGH", "MEDIUM", "LOW"],
                "description": "The urgency level of the emergency based on the description."
            },
            "etaMinutes": {
                "type": "INTEGER",
                "description": "Estimated time of arrival in minutes (simulate realistic times between 3 and 15)."
            },
            "vehicleType": {
                "type": "STRING",
                "description": "Type of vehicle dispatched (e.g., ALS Ambulance, BLS Ambulance, Rapid Response Bike, Helicopter)."
            },
            "recommendedAction": {
                "type": "STRING",
                "description": "Immediate life-saving advice for the user to perform while waiting."
            },
            "summary": {
                "type": "STRING",
                "description": "A very brief, reassuring summary of the situation analysis."
            },
            "assistantName": {
                "type": "STRING",
                "description": "A friendly name for the AI dispatcher."
            },
            "contactNotificationMessage": {
                "type": "STRING",
                "description": "A concise SMS message (max 160 chars) to be sent to the user's emergency contact, informing them that help is on the way and the estimated ETA."
            }
        },
        "required": [
            "priority",
            "etaMinutes",
            "vehicleType",
            "recommendedAction",
            "summary",
            "assistantName",
            "contactNotificationMessage"
        ]
    })
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<Content>,
}

#[derive(Debug, Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
struct Part {
    text: Option<String>,
}

impl GenerateContentResponse {
    fn first_text(&self) -> Option<&str> {
        self.candidates
            .first()?
            .content
            .as_ref()?
            .parts
            .iter()
            .find_map(|part| part.text.as_deref())
            .filter(|text| !text.trim().is_empty())
    }
}

#[cfg(test)]
#[path = "tests/gemini_tests.rs"]
mod tests;
