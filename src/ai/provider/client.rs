//! Gemini API Client
//!
//! Backend transport for the Gemini `generateContent` and `countTokens`
//! endpoints. Failures are reported in the backend taxonomy
//! (`BackendError`); classification happens in the model adapter.

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use super::{
    ClientFactory, ClientSettings, GenerateRequest, LlmClient, LlmResult, Prompt,
    ResponseMetadata, ResponseTiming, TokenUsage,
};
use crate::ai::rules::ParamKind;
use crate::ai::vault::ResolvedCredentials;
use crate::config::GeminiSettings;
use crate::constants::gemini::{API_KEY_HEADER, PROVIDER_NAME};
use crate::types::{BackendError, MessageRole};

/// Gemini API client with secure API key handling
pub struct GeminiClient {
    /// API key stored securely - never exposed in logs or debug output
    api_key: SecretString,
    api_base: String,
    model: String,
    client: reqwest::Client,
}

impl std::fmt::Debug for GeminiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeminiClient")
            .field("api_key", &"[REDACTED]")
            .field("api_base", &self.api_base)
            .field("model", &self.model)
            .finish()
    }
}

impl GeminiClient {
    pub fn new(
        model: &str,
        credentials: &ResolvedCredentials,
        settings: &GeminiSettings,
    ) -> Result<Self, BackendError> {
        let api_key = credentials
            .api_key
            .clone()
            .filter(|k| !k.expose_secret().is_empty())
            .ok_or_else(|| BackendError::Authentication("Gemini API key is required".to_string()))?;

        let api_base = credentials
            .api_base
            .clone()
            .unwrap_or_else(|| settings.default_api_base.clone());
        let api_base = Self::validate_endpoint(&api_base)?;

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .connect_timeout(Duration::from_secs(settings.connect_timeout_secs))
            .build()
            .map_err(|e| {
                BackendError::ApiConnection(format!("Failed to create HTTP client: {}", e))
            })?;

        Ok(Self {
            api_key,
            api_base,
            model: model.to_string(),
            client,
        })
    }

    /// Only http/https endpoints; trailing slash removed
    fn validate_endpoint(endpoint: &str) -> Result<String, BackendError> {
        let url = url::Url::parse(endpoint).map_err(|e| {
            BackendError::InvalidRequest(format!("Invalid Gemini endpoint URL '{}': {}", endpoint, e))
        })?;

        if !matches!(url.scheme(), "http" | "https") {
            return Err(BackendError::InvalidRequest(format!(
                "Gemini endpoint must use http or https scheme, got: {}",
                url.scheme()
            )));
        }

        Ok(url.as_str().trim_end_matches('/').to_string())
    }

    fn endpoint(&self, operation: &str) -> String {
        format!("{}/models/{}:{}", self.api_base, self.model, operation)
    }

    fn build_request(request: &GenerateRequest) -> GenerateContentRequest {
        let (contents, system_instruction) = match &request.prompt {
            Prompt::Text(text) => (vec![Content::user(text)], None),
            Prompt::Messages(messages) => {
                let system: Vec<&str> = messages
                    .iter()
                    .filter(|m| m.role == MessageRole::System)
                    .map(|m| m.content.as_str())
                    .collect();
                let contents = messages
                    .iter()
                    .filter(|m| m.role != MessageRole::System)
                    .map(|m| Content {
                        role: Some(
                            match m.role {
                                MessageRole::Assistant => "model",
                                _ => "user",
                            }
                            .to_string(),
                        ),
                        parts: vec![Part {
                            text: m.content.clone(),
                        }],
                    })
                    .collect();
                let system_instruction = (!system.is_empty()).then(|| Content {
                    role: None,
                    parts: vec![Part {
                        text: system.join("\n"),
                    }],
                });
                (contents, system_instruction)
            }
        };

        GenerateContentRequest {
            contents,
            system_instruction,
            generation_config: GenerationConfig::from_settings(&request.settings, &request.stop),
        }
    }

    async fn post<B: Serialize, R: for<'de> Deserialize<'de>>(
        &self,
        operation: &str,
        body: &B,
    ) -> Result<R, BackendError> {
        let response = self
            .client
            .post(self.endpoint(operation))
            .header(API_KEY_HEADER, self.api_key.expose_secret())
            .header("Content-Type", "application/json")
            .json(body)
            .send()
            .await
            .map_err(BackendError::from_transport)?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(BackendError::from_http(status, &body));
        }

        response.json().await.map_err(BackendError::from_transport)
    }
}

#[async_trait]
impl LlmClient for GeminiClient {
    async fn generate(
        &self,
        request: GenerateRequest,
        cancel: &CancellationToken,
    ) -> Result<LlmResult, BackendError> {
        debug!("Sending generateContent request to Gemini (model: {})", self.model);

        let start_time = Instant::now();
        let body = Self::build_request(&request);

        let response: GenerateContentResponse = tokio::select! {
            _ = cancel.cancelled() => {
                return Err(BackendError::ApiConnection("Request cancelled".to_string()));
            }
            response = self.post("generateContent", &body) => response?,
        };

        let elapsed = start_time.elapsed();

        let candidate = match response.candidates.into_iter().next() {
            Some(candidate) => candidate,
            None => {
                return Err(match response.prompt_feedback.and_then(|f| f.block_reason) {
                    Some(reason) => {
                        BackendError::InvalidRequest(format!("Prompt blocked: {}", reason))
                    }
                    None => BackendError::Api("No candidates in Gemini response".to_string()),
                });
            }
        };

        let content = candidate
            .content
            .map(|c| c.parts.into_iter().map(|p| p.text).collect::<String>())
            .unwrap_or_default();

        let usage = response
            .usage_metadata
            .map(|u| TokenUsage::from_gemini(u.prompt_token_count, u.candidates_token_count))
            .unwrap_or_default();

        Ok(LlmResult {
            content,
            finish_reason: candidate.finish_reason,
            usage,
            timing: ResponseTiming::from_duration(elapsed),
            metadata: ResponseMetadata {
                model: self.model.clone(),
                provider: PROVIDER_NAME.to_string(),
            },
        })
    }

    async fn count_tokens(&self, text: &str) -> Result<i64, BackendError> {
        let body = CountTokensRequest {
            contents: vec![Content::user(text)],
        };
        let response: CountTokensResponse = self.post("countTokens", &body).await?;
        Ok(response.total_tokens)
    }
}

/// Builds [`GeminiClient`]s from resolved credentials
#[derive(Debug, Clone, Default)]
pub struct GeminiClientFactory {
    settings: GeminiSettings,
}

impl GeminiClientFactory {
    pub fn new(settings: GeminiSettings) -> Self {
        Self { settings }
    }
}

impl ClientFactory for GeminiClientFactory {
    fn construct(
        &self,
        model: &str,
        credentials: &ResolvedCredentials,
    ) -> Result<Arc<dyn LlmClient>, BackendError> {
        Ok(Arc::new(GeminiClient::new(model, credentials, &self.settings)?))
    }
}

// Request/Response types

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest {
    contents: Vec<Content>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<Content>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize, Deserialize)]
struct Content {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<Part>,
}

impl Content {
    fn user(text: &str) -> Self {
        Self {
            role: Some("user".to_string()),
            parts: vec![Part {
                text: text.to_string(),
            }],
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct Part {
    #[serde(default)]
    text: String,
}

#[derive(Debug, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_output_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    top_p: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    top_k: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    presence_penalty: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    frequency_penalty: Option<f64>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    stop_sequences: Vec<String>,
}

impl GenerationConfig {
    /// Flatten first-class fields and the nested bag into Gemini's config
    fn from_settings(settings: &ClientSettings, stop: &[String]) -> Self {
        Self {
            temperature: settings.effective(ParamKind::Temperature),
            max_output_tokens: settings.max_tokens,
            top_p: settings.effective(ParamKind::TopP),
            top_k: settings.top_k,
            presence_penalty: settings.effective(ParamKind::PresencePenalty),
            frequency_penalty: settings.effective(ParamKind::FrequencyPenalty),
            stop_sequences: stop.to_vec(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    prompt_feedback: Option<PromptFeedback>,
    usage_metadata: Option<UsageMetadata>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    content: Option<Content>,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    block_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UsageMetadata {
    #[serde(default)]
    prompt_token_count: u32,
    #[serde(default)]
    candidates_token_count: u32,
}

#[derive(Debug, Serialize)]
struct CountTokensRequest {
    contents: Vec<Content>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CountTokensResponse {
    #[serde(default)]
    total_tokens: i64,
}
