//! LLM Provider Abstraction
//!
//! Defines the seams between the provider registry, the per-model adapters
//! and the backend clients.
//!
//! ## Traits
//!
//! - `ModelProvider`: provider-level façade (catalog, rules, credentials)
//! - `ModelAdapter`: one logical model bound to credentials and parameters
//! - `LlmClient` / `ClientFactory`: the backend transport
//!
//! ## Modules
//!
//! - `catalog`: immutable provider and model tables
//! - `settings`: mode-dependent application of validated parameters
//! - `client`: Gemini REST client
//! - `model`: Gemini model adapter
//! - `gemini`: Gemini provider façade

mod catalog;
mod client;
mod gemini;
mod model;
mod settings;

pub use catalog::{
    COMPLETION_MODELS, GEMINI_MODELS, ModelSpec, PROVIDERS, ProviderEntry, create_provider,
    gemini_rules, list_models, max_tokens_ceiling, model_mode,
};
pub use client::{GeminiClient, GeminiClientFactory};
pub use gemini::GeminiProvider;
pub use model::{AdapterState, GeminiModel};
pub use settings::{ClientSettings, ParamApplier};

// Re-export error types from centralized location
pub use crate::types::{BackendError, ErrorClassifier, ErrorKind, LlmError};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use crate::ai::rules::{ModelParams, ParamKind, ParameterRuleSet, RequestedParams};
use crate::ai::vault::{
    DisplayCredentials, ProviderCredentials, ProviderRecord, ResolvedCredentials,
    StoredCredentials,
};
use crate::config::Edition;
use crate::types::{ModelDescriptor, ModelMode, ModelType, PromptMessage, Result, TenantId};

// =============================================================================
// LLM Result with Usage Metrics
// =============================================================================

/// Normalized generation result
#[derive(Debug, Clone)]
pub struct LlmResult {
    /// Generated text
    pub content: String,
    /// Why generation stopped, as reported by the backend
    pub finish_reason: Option<String>,
    /// Token usage metrics
    pub usage: TokenUsage,
    /// Response timing
    pub timing: ResponseTiming,
    /// Provider and model info
    pub metadata: ResponseMetadata,
}

impl LlmResult {
    /// Create result with content only (usage unknown)
    pub fn content_only(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            finish_reason: None,
            usage: TokenUsage::default(),
            timing: ResponseTiming::default(),
            metadata: ResponseMetadata::default(),
        }
    }
}

/// Token usage metrics
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    /// Input tokens (prompt)
    pub input_tokens: u32,
    /// Output tokens (response)
    pub output_tokens: u32,
}

impl TokenUsage {
    /// Total tokens used (input + output)
    pub fn total(&self) -> u32 {
        self.input_tokens + self.output_tokens
    }

    /// Create from Gemini `usageMetadata`
    pub fn from_gemini(prompt_token_count: u32, candidates_token_count: u32) -> Self {
        Self {
            input_tokens: prompt_token_count,
            output_tokens: candidates_token_count,
        }
    }
}

/// Response timing metrics
#[derive(Debug, Clone, Default)]
pub struct ResponseTiming {
    /// Total response time in milliseconds (wall clock)
    pub total_ms: u64,
}

impl ResponseTiming {
    pub fn from_duration(duration: std::time::Duration) -> Self {
        Self {
            total_ms: duration.as_millis() as u64,
        }
    }
}

/// Response metadata
#[derive(Debug, Clone, Default)]
pub struct ResponseMetadata {
    /// Model used
    pub model: String,
    /// Provider name
    pub provider: String,
}

// =============================================================================
// Backend Client
// =============================================================================

/// Prompt in the shape the backend expects
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Prompt {
    /// Single concatenated string
    Text(String),
    /// Structured multi-turn conversation
    Messages(Vec<PromptMessage>),
}

impl Prompt {
    /// Single-message exchanges and completion models get one string;
    /// multi-turn chat keeps its structure.
    pub fn from_messages(messages: &[PromptMessage], mode: ModelMode) -> Self {
        match (mode, messages) {
            (ModelMode::Chat, [_, _, ..]) => Prompt::Messages(messages.to_vec()),
            _ => Prompt::Text(
                messages
                    .iter()
                    .map(|m| m.content.as_str())
                    .collect::<Vec<_>>()
                    .join("\n"),
            ),
        }
    }
}

/// A single generation call as seen by the backend
#[derive(Debug, Clone)]
pub struct GenerateRequest {
    pub prompt: Prompt,
    pub stop: Vec<String>,
    pub settings: ClientSettings,
}

/// Backend transport bound to one model and one set of credentials
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Issue a generation call. `cancel` is propagated to the transport.
    async fn generate(
        &self,
        request: GenerateRequest,
        cancel: &CancellationToken,
    ) -> std::result::Result<LlmResult, BackendError>;

    /// Ask the backend for a token count. May be negative on misbehaving backends.
    async fn count_tokens(&self, text: &str) -> std::result::Result<i64, BackendError>;

    /// Parameters the client accepts as first-class settings
    fn exposed_params(&self) -> &[ParamKind] {
        &ParamKind::ALL
    }
}

/// Builds backend clients from resolved credentials
pub trait ClientFactory: Send + Sync {
    fn construct(
        &self,
        model: &str,
        credentials: &ResolvedCredentials,
    ) -> std::result::Result<Arc<dyn LlmClient>, BackendError>;
}

pub type SharedClientFactory = Arc<dyn ClientFactory>;

// =============================================================================
// Model Adapter
// =============================================================================

/// One logical model: validated parameters and credentials bound to a client
#[async_trait]
pub trait ModelAdapter: Send + Sync {
    /// Model name
    fn name(&self) -> &str;

    /// Provider name for logging
    fn provider(&self) -> &str;

    fn mode(&self) -> ModelMode;

    fn state(&self) -> AdapterState;

    /// Run a generation. Backend failures come back classified.
    async fn generate(
        &self,
        messages: &[PromptMessage],
        stop: &[String],
        cancel: &CancellationToken,
    ) -> Result<LlmResult>;

    /// Token count of the concatenated message contents, never negative
    async fn token_count(&self, messages: &[PromptMessage]) -> Result<u32>;

    /// Re-validate and re-apply parameters without rebuilding the client
    fn update_parameters(&self, requested: &RequestedParams);

    /// Currently validated parameters
    fn parameters(&self) -> ModelParams;

    /// Snapshot of the settings applied to the client
    fn settings(&self) -> ClientSettings;

    /// Check before requesting streamed output
    fn supports_streaming(&self) -> bool;
}

/// Shared adapter type for concurrent callers
pub type SharedAdapter = Arc<dyn ModelAdapter>;

// =============================================================================
// Provider Façade
// =============================================================================

/// Provider-level façade: catalog, parameter rules and credentials
#[async_trait]
pub trait ModelProvider: Send + Sync {
    /// Provider name for logging
    fn provider_name(&self) -> &str;

    /// Fixed model catalog; empty for unsupported model types
    fn list_models(&self, model_type: ModelType) -> Vec<ModelDescriptor>;

    fn model_mode(&self, model: &str) -> ModelMode;

    fn get_model_parameter_rules(&self, model: &str) -> ParameterRuleSet;

    /// Live round-trip against the backend
    async fn validate_provider_credentials(&self, credentials: &ProviderCredentials) -> Result<()>;

    fn validate_model_credentials(
        &self,
        model: &str,
        model_type: ModelType,
        credentials: &ProviderCredentials,
    ) -> Result<()>;

    fn encrypt_provider_credentials(
        &self,
        tenant_id: &TenantId,
        credentials: &ProviderCredentials,
    ) -> Result<StoredCredentials>;

    fn get_provider_credentials(&self, record: &ProviderRecord) -> Result<ResolvedCredentials>;

    fn get_display_credentials(&self, record: &ProviderRecord) -> Result<DisplayCredentials>;

    fn is_system_tier_supported(&self, edition: Edition) -> bool;

    /// Whether calls deduct quota
    fn billable(&self) -> bool;

    fn create_model(
        &self,
        record: &ProviderRecord,
        model: &str,
        model_type: ModelType,
        requested: &RequestedParams,
    ) -> Result<SharedAdapter>;
}

/// Shared provider type for concurrent access
pub type SharedProvider = Arc<dyn ModelProvider>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::PromptMessage;

    #[test]
    fn test_single_message_becomes_text() {
        let prompt = Prompt::from_messages(&[PromptMessage::user("hello")], ModelMode::Chat);
        assert_eq!(prompt, Prompt::Text("hello".into()));
    }

    #[test]
    fn test_multi_turn_chat_keeps_structure() {
        let messages = vec![
            PromptMessage::system("be brief"),
            PromptMessage::user("hello"),
        ];
        let prompt = Prompt::from_messages(&messages, ModelMode::Chat);
        assert_eq!(prompt, Prompt::Messages(messages));
    }

    #[test]
    fn test_completion_mode_concatenates() {
        let messages = vec![PromptMessage::user("a"), PromptMessage::user("b")];
        let prompt = Prompt::from_messages(&messages, ModelMode::Completion);
        assert_eq!(prompt, Prompt::Text("a\nb".into()));
    }

    #[test]
    fn test_empty_messages_are_empty_text() {
        let prompt = Prompt::from_messages(&[], ModelMode::Chat);
        assert_eq!(prompt, Prompt::Text(String::new()));
    }

    #[test]
    fn test_token_usage_from_gemini() {
        let usage = TokenUsage::from_gemini(100, 50);
        assert_eq!(usage.input_tokens, 100);
        assert_eq!(usage.output_tokens, 50);
        assert_eq!(usage.total(), 150);
    }
}
