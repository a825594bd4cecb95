pub mod fallback;
pub mod gemini;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::{error::ClassifierError, models::TriageResponse};

pub use fallback::fallback_response;
pub use gemini::GeminiClassifier;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TriageRequest {
    pub description: String,
    pub caller_name: Option<String>,
}

/// External service that turns a free-text emergency into a triage assessment.
#[async_trait]
pub trait TriageClassifier: Send + Sync {
    async fn classify(&self, request: &TriageRequest) -> Result<TriageResponse, ClassifierError>;
}
