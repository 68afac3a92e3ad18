//! OpenAI-compatible planning oracle.
//!
//! Works with: Ollama, OpenAI, OpenRouter, vLLM and any endpoint exposing
//! `/v1/chat/completions`. Each planning prompt is sent as a single user
//! message; the first choice's content is the raw planner text.

use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;
use toolpilot_core::error::OracleError;
use toolpilot_core::oracle::PlanningOracle;
use tracing::{debug, warn};

const DEFAULT_TIMEOUT_SECS: u64 = 120;

/// A planning oracle backed by an OpenAI-compatible chat endpoint.
pub struct OpenAiCompatOracle {
    name: String,
    base_url: String,
    api_key: String,
    model: String,
    temperature: f32,
    max_tokens: Option<u32>,
    client: reqwest::Client,
}

impl OpenAiCompatOracle {
    /// Create a new OpenAI-compatible oracle.
    pub fn new(
        name: impl Into<String>,
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        model: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            model: model.into(),
            temperature: 0.2,
            max_tokens: None,
            client: build_client(DEFAULT_TIMEOUT_SECS),
        }
    }

    /// Create an Ollama oracle (convenience constructor).
    pub fn ollama(base_url: Option<&str>, model: impl Into<String>) -> Self {
        Self::new(
            "ollama",
            base_url.unwrap_or("http://localhost:11434/v1"),
            "ollama", // Ollama doesn't need a real key
            model,
        )
    }

    /// Create an OpenAI oracle (convenience constructor).
    pub fn openai(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self::new("openai", "https://api.openai.com/v1", api_key, model)
    }

    /// Create an OpenRouter oracle (convenience constructor).
    pub fn openrouter(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self::new("openrouter", "https://openrouter.ai/api/v1", api_key, model)
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_max_tokens(mut self, max: u32) -> Self {
        self.max_tokens = Some(max);
        self
    }

    /// Replace the HTTP client with one using the given request timeout.
    pub fn with_timeout(mut self, timeout_secs: u64) -> Self {
        self.client = build_client(timeout_secs);
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub(crate) fn request_body(&self, prompt: &str) -> serde_json::Value {
        let mut body = serde_json::json!({
            "model": self.model,
            "messages": [{ "role": "user", "content": prompt }],
            "temperature": self.temperature,
            "stream": false,
        });
        if let Some(max_tokens) = self.max_tokens {
            body["max_tokens"] = serde_json::json!(max_tokens);
        }
        body
    }

    /// Pull the completion text out of a chat completion response.
    ///
    /// Blank text is returned as-is; only a missing choice or a missing
    /// `content` field counts as an empty response.
    fn completion_text(response: ApiResponse) -> Result<String, OracleError> {
        response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or(OracleError::EmptyResponse)
    }
}

fn build_client(timeout_secs: u64) -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .build()
        .unwrap_or_else(|e| {
            warn!("Failed to build HTTP client with timeout, using defaults: {e}");
            reqwest::Client::new()
        })
}

#[async_trait]
impl PlanningOracle for OpenAiCompatOracle {
    fn name(&self) -> &str {
        &self.name
    }

    async fn plan(&self, prompt: &str) -> Result<String, OracleError> {
        let url = format!("{}/chat/completions", self.base_url);

        debug!(oracle = %self.name, model = %self.model, "Sending planning request");

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&self.request_body(prompt))
            .send()
            .await
            .map_err(|e| OracleError::Network(e.to_string()))?;

        let status = response.status().as_u16();

        if status == 429 {
            return Err(OracleError::RateLimited {
                retry_after_secs: 5,
            });
        }

        if status == 401 || status == 403 {
            return Err(OracleError::AuthenticationFailed(
                "Invalid API key or insufficient permissions".into(),
            ));
        }

        if status != 200 {
            let error_body = response.text().await.unwrap_or_default();
            warn!(status, body = %error_body, "Oracle returned error");
            return Err(OracleError::ApiError {
                status_code: status,
                message: error_body,
            });
        }

        let api_response: ApiResponse =
            response.json().await.map_err(|e| OracleError::ApiError {
                status_code: 200,
                message: format!("Failed to parse response: {e}"),
            })?;

        Self::completion_text(api_response)
    }
}

// --- API wire types ---

#[derive(Debug, Deserialize)]
struct ApiMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiResponse {
    #[serde(default)]
    choices: Vec<ApiChoice>,
}

#[derive(Debug, Deserialize)]
struct ApiChoice {
    message: ApiMessage,
}
