//! Inference client abstraction and the Ollama HTTP implementation.
//!
//! Every analysis operation talks to the model through [`InferenceClient`],
//! a single blocking request/response exchange:
//!
//! - **[`OllamaClient`]**: posts to a local Ollama instance's `/api/generate`
//!   endpoint with streaming disabled and a per-request timeout.
//! - **[`generate_structured`]**: derives a JSON schema from a Rust type,
//!   asks the backend to constrain its output to it and deserializes the answer.
//!
//! # Failure policy
//!
//! Connection errors, timeouts, non-2xx statuses and undecodable response
//! bodies all become [`AnalysisError::BackendUnavailable`]. Nothing is retried
//! at this layer or above it; a failed call fails the document that issued it.

use std::time::{Duration, Instant};

use schemars::JsonSchema;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::config::BackendConfig;
use crate::error::AnalysisError;

/// A single request/response exchange with a model-serving capability.
///
/// Implementations must be usable from several worker threads at once.
pub trait InferenceClient: Send + Sync {
    /// Generate a completion for `prompt` under `system` instructions.
    ///
    /// When `schema` is given the backend is asked to shape its output to it;
    /// validating the result is the caller's job.
    fn generate(
        &self,
        prompt: &str,
        system: &str,
        schema: Option<&serde_json::Value>,
    ) -> Result<String, AnalysisError>;
}

/// Ask for output constrained to `T`'s JSON schema and parse it.
pub fn generate_structured<T>(
    client: &dyn InferenceClient,
    prompt: &str,
    system: &str,
) -> Result<T, AnalysisError>
where
    T: DeserializeOwned + JsonSchema,
{
    let schema = serde_json::to_value(schemars::schema_for!(T))
        .map_err(|e| AnalysisError::MalformedStructuredOutput(e.to_string()))?;
    let raw = client.generate(prompt, system, Some(&schema))?;
    parse_structured(&raw)
}

/// Parse a schema-constrained response, tolerating a surrounding code fence.
pub fn parse_structured<T: DeserializeOwned>(raw: &str) -> Result<T, AnalysisError> {
    let trimmed = raw.trim();
    let body = trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .and_then(|rest| rest.strip_suffix("```"))
        .unwrap_or(trimmed);
    serde_json::from_str(body.trim())
        .map_err(|e| AnalysisError::MalformedStructuredOutput(format!("{}: {}", e, truncate(raw, 200))))
}

fn truncate(s: &str, max_chars: usize) -> String {
    match s.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}...", &s[..idx]),
        None => s.to_string(),
    }
}

// ============ Ollama Client ============

/// Blocking HTTP client for a local Ollama instance.
pub struct OllamaClient {
    base_url: String,
    model: String,
    options: SamplingOptions,
    timeout_secs: u64,
    client: reqwest::blocking::Client,
}

/// Sampling parameters forwarded verbatim as Ollama `options`.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct SamplingOptions {
    pub temperature: f64,
    pub top_p: f64,
    pub num_ctx: u32,
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    system: &'a str,
    stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    format: Option<&'a serde_json::Value>,
    options: SamplingOptions,
}

#[derive(Deserialize)]
struct GenerateResponse {
    response: String,
}

#[derive(Deserialize)]
struct TagsResponse {
    models: Vec<TagModel>,
}

#[derive(Deserialize)]
struct TagModel {
    name: String,
}

impl OllamaClient {
    /// Build a client from backend configuration.
    ///
    /// Fails only if the underlying HTTP client cannot be constructed
    /// (e.g. TLS backend initialization).
    pub fn new(config: &BackendConfig) -> Result<Self, AnalysisError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| AnalysisError::BackendUnavailable(format!("HTTP client setup: {}", e)))?;

        Ok(Self {
            base_url: config.url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            options: SamplingOptions {
                temperature: config.temperature,
                top_p: config.top_p,
                num_ctx: config.num_ctx,
            },
            timeout_secs: config.timeout_secs,
            client,
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Names of the models installed on the backend (`GET /api/tags`).
    pub fn list_models(&self) -> Result<Vec<String>, AnalysisError> {
        let url = format!("{}/api/tags", self.base_url);
        let response = self
            .client
            .get(&url)
            .send()
            .map_err(|e| self.transport_error(e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(AnalysisError::BackendUnavailable(format!(
                "Ollama API error {}: {}",
                status, body
            )));
        }

        let parsed: TagsResponse = response.json().map_err(|e| {
            AnalysisError::BackendUnavailable(format!("undecodable /api/tags response: {}", e))
        })?;
        Ok(parsed.models.into_iter().map(|m| m.name).collect())
    }

    fn transport_error(&self, e: reqwest::Error) -> AnalysisError {
        if e.is_timeout() {
            AnalysisError::BackendUnavailable(format!(
                "request timed out after {}s",
                self.timeout_secs
            ))
        } else if e.is_connect() {
            AnalysisError::BackendUnavailable(format!(
                "cannot connect to {}: {}",
                self.base_url, e
            ))
        } else {
            AnalysisError::BackendUnavailable(e.to_string())
        }
    }
}

impl InferenceClient for OllamaClient {
    fn generate(
        &self,
        prompt: &str,
        system: &str,
        schema: Option<&serde_json::Value>,
    ) -> Result<String, AnalysisError> {
        let url = format!("{}/api/generate", self.base_url);
        let body = GenerateRequest {
            model: &self.model,
            prompt,
            system,
            stream: false,
            format: schema,
            options: self.options,
        };

        let started = Instant::now();
        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .map_err(|e| self.transport_error(e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(AnalysisError::BackendUnavailable(format!(
                "Ollama API error {}: {}",
                status, body
            )));
        }

        let parsed: GenerateResponse = response.json().map_err(|e| {
            AnalysisError::BackendUnavailable(format!("undecodable /api/generate response: {}", e))
        })?;

        tracing::debug!(
            model = %self.model,
            prompt_chars = prompt.len(),
            structured = schema.is_some(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Model call completed"
        );

        Ok(parsed.response.trim().to_string())
    }
}
