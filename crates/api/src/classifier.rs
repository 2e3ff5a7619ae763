//! Query classification against the mentor data set.

use std::env;
use std::time::Duration;

use async_trait::async_trait;
use database::Mentor;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

use crate::config::ConfigError;

const DEFAULT_MODEL: &str = "gemini-2.0-flash";
const DEFAULT_API_URL: &str = "https://generativelanguage.googleapis.com";
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Errors from the classification call.
#[derive(Debug, Error)]
pub enum ClassifierError {
    #[error("network error: {0}")]
    Network(String),

    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("model returned no text")]
    EmptyResponse,

    #[error("configuration error: {0}")]
    Configuration(String),
}

/// Answers a prompt with a short piece of text.
#[async_trait]
pub trait Classifier: Send + Sync {
    async fn classify(&self, prompt: &str) -> Result<String, ClassifierError>;
}

/// Build the categorization prompt for `query`.
pub fn build_prompt(query: &str, mentors: &[Mentor]) -> String {
    let table = serde_json::to_string_pretty(mentors).unwrap_or_else(|_| "[]".to_string());
    format!(
        "Depending on the following query: {}, categorize the investor/mentor to specific \
         category from the data:{} and return only the name to which the category belongs to.",
        query, table
    )
}

/// Gemini model settings.
#[derive(Debug, Clone)]
pub struct GeminiConfig {
    pub api_key: SecretString,
    pub model: String,
    pub api_url: String,
    pub timeout: Duration,
}

impl GeminiConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: SecretString::from(api_key.into()),
            model: DEFAULT_MODEL.to_string(),
            api_url: DEFAULT_API_URL.to_string(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Required: `GEMINI_API_KEY`. Optional: `GEMINI_MODEL`, `GEMINI_API_URL`.
    pub fn from_env() -> Result<Self, ConfigError> {
        let api_key = env::var("GEMINI_API_KEY").map_err(|_| ConfigError::MissingApiKey)?;
        let mut config = Self::new(api_key);
        if let Ok(model) = env::var("GEMINI_MODEL") {
            config.model = model;
        }
        if let Ok(api_url) = env::var("GEMINI_API_URL") {
            config.api_url = api_url.trim_end_matches('/').to_string();
        }
        Ok(config)
    }

    /// Builder method to set the model.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    fn endpoint(&self) -> String {
        format!("{}/v1beta/models/{}:generateContent", self.api_url, self.model)
    }
}

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    contents: Vec<Content<'a>>,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    parts: Vec<RequestPart<'a>>,
}

#[derive(Debug, Serialize)]
struct RequestPart<'a> {
    text: &'a str,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    error: ApiErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ApiErrorDetail {
    message: String,
}

impl GenerateResponse {
    /// Text of the first candidate, parts concatenated.
    fn into_text(self) -> Option<String> {
        let text: String = self
            .candidates
            .into_iter()
            .next()?
            .content?
            .parts
            .into_iter()
            .filter_map(|part| part.text)
            .collect();
        let text = text.trim();
        (!text.is_empty()).then(|| text.to_string())
    }
}

/// [`Classifier`] backed by the Gemini `generateContent` API.
pub struct GeminiClassifier {
    client: Client,
    config: GeminiConfig,
}

impl GeminiClassifier {
    pub fn new(config: GeminiConfig) -> Result<Self, ClassifierError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| {
                ClassifierError::Configuration(format!("Failed to create HTTP client: {}", e))
            })?;

        info!("Gemini classifier initialized with model: {}", config.model);
        Ok(Self { client, config })
    }
}

#[async_trait]
impl Classifier for GeminiClassifier {
    async fn classify(&self, prompt: &str) -> Result<String, ClassifierError> {
        let request = GenerateRequest {
            contents: vec![Content {
                parts: vec![RequestPart { text: prompt }],
            }],
        };

        let response = self
            .client
            .post(self.config.endpoint())
            .header("x-goog-api-key", self.config.api_key.expose_secret())
            .json(&request)
            .send()
            .await
            .map_err(|e| ClassifierError::Network(format!("Failed to send request: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ApiErrorBody>(&error_text)
                .map(|body| body.error.message)
                .unwrap_or(error_text);
            return Err(ClassifierError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let body: GenerateResponse = response
            .json()
            .await
            .map_err(|e| ClassifierError::Network(format!("Failed to parse response: {}", e)))?;

        let answer = body.into_text().ok_or(ClassifierError::EmptyResponse)?;
        debug!(answer = %answer, "Classification complete");
        Ok(answer)
    }
}
