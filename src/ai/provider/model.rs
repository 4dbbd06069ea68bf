//! Gemini Model Adapter
//!
//! Binds one logical model to resolved credentials, validated parameters
//! and a backend client. Parameter updates re-apply settings in place; the
//! client is built once.

use async_trait::async_trait;
use serde::Serialize;
use std::sync::{Arc, RwLock};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::{
    ClientFactory, ClientSettings, ErrorClassifier, GenerateRequest, LlmClient, LlmResult,
    ModelAdapter, ParamApplier, Prompt, gemini_rules, model_mode,
};
use crate::ai::rules::{ModelParams, ParameterRuleSet, RequestedParams};
use crate::ai::vault::ResolvedCredentials;
use crate::constants::gemini::PROVIDER_NAME;
use crate::types::{ModelError, ModelMode, PromptMessage, Result};

/// Lifecycle of an adapter.
///
/// An adapter only exists once its client is built, so it starts `Ready`;
/// a construction failure returns the classified error instead. `Failed` is
/// not terminal: a later successful generation returns the adapter to
/// `Ready`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AdapterState {
    Ready,
    Failed,
}

/// Validated parameters and the client settings derived from them.
/// Kept under one lock so an update replaces both together.
#[derive(Debug, Clone)]
struct Applied {
    params: ModelParams,
    settings: ClientSettings,
}

/// Gemini implementation of [`ModelAdapter`]
pub struct GeminiModel {
    name: String,
    mode: ModelMode,
    rules: ParameterRuleSet,
    applier: ParamApplier,
    client: Arc<dyn LlmClient>,
    applied: RwLock<Applied>,
    state: RwLock<AdapterState>,
}

impl std::fmt::Debug for GeminiModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeminiModel")
            .field("name", &self.name)
            .field("mode", &self.mode)
            .field("state", &self.state())
            .finish()
    }
}

impl GeminiModel {
    /// Validate parameters, build the client and apply settings.
    ///
    /// Client construction failures come back classified.
    pub fn new(
        name: &str,
        credentials: &ResolvedCredentials,
        requested: &RequestedParams,
        factory: &dyn ClientFactory,
    ) -> Result<Self> {
        let mode = model_mode(name);
        let rules = gemini_rules(name);
        let applier = ParamApplier::for_mode(mode);

        let client = factory
            .construct(name, credentials)
            .map_err(|e| ErrorClassifier::classify(e, PROVIDER_NAME))?;

        let applied = Self::apply(&rules, applier, client.as_ref(), requested);

        debug!("Created {} adapter for {} ({} mode)", PROVIDER_NAME, name, mode);

        Ok(Self {
            name: name.to_string(),
            mode,
            rules,
            applier,
            client,
            applied: RwLock::new(applied),
            state: RwLock::new(AdapterState::Ready),
        })
    }

    fn apply(
        rules: &ParameterRuleSet,
        applier: ParamApplier,
        client: &dyn LlmClient,
        requested: &RequestedParams,
    ) -> Applied {
        let params = rules.validate(requested);
        let mut settings = ClientSettings::default();
        applier.apply(&params, client.exposed_params(), &mut settings);
        Applied { params, settings }
    }

    fn applied(&self) -> Applied {
        self.applied
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    fn set_state(&self, state: AdapterState) {
        *self
            .state
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = state;
    }

    fn concat(messages: &[PromptMessage]) -> String {
        messages.iter().map(|m| m.content.as_str()).collect()
    }
}

#[async_trait]
impl ModelAdapter for GeminiModel {
    fn name(&self) -> &str {
        &self.name
    }

    fn provider(&self) -> &str {
        PROVIDER_NAME
    }

    fn mode(&self) -> ModelMode {
        self.mode
    }

    fn state(&self) -> AdapterState {
        *self
            .state
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    async fn generate(
        &self,
        messages: &[PromptMessage],
        stop: &[String],
        cancel: &CancellationToken,
    ) -> Result<LlmResult> {
        if cancel.is_cancelled() {
            return Err(ModelError::Cancelled(format!("{} generation", self.name)));
        }

        // Snapshot so concurrent parameter updates never tear a request
        let request = GenerateRequest {
            prompt: Prompt::from_messages(messages, self.mode),
            stop: stop.to_vec(),
            settings: self.settings(),
        };

        let outcome = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                return Err(ModelError::Cancelled(format!("{} generation", self.name)));
            }
            outcome = self.client.generate(request, cancel) => outcome,
        };

        match outcome {
            Ok(result) => {
                self.set_state(AdapterState::Ready);
                info!(
                    "{} generated {} tokens in {}ms",
                    self.name,
                    result.usage.output_tokens,
                    result.timing.total_ms
                );
                Ok(result)
            }
            Err(e) => {
                self.set_state(AdapterState::Failed);
                Err(ErrorClassifier::classify(e, PROVIDER_NAME))
            }
        }
    }

    async fn token_count(&self, messages: &[PromptMessage]) -> Result<u32> {
        let text = Self::concat(messages);
        let count = self
            .client
            .count_tokens(&text)
            .await
            .map_err(|e| ErrorClassifier::classify(e, PROVIDER_NAME))?;

        if count < 0 {
            warn!("{} backend reported negative token count {}", self.name, count);
        }
        Ok(u32::try_from(count.max(0)).unwrap_or(u32::MAX))
    }

    fn update_parameters(&self, requested: &RequestedParams) {
        let applied = Self::apply(&self.rules, self.applier, self.client.as_ref(), requested);

        *self
            .applied
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = applied;
    }

    fn parameters(&self) -> ModelParams {
        self.applied().params
    }

    fn settings(&self) -> ClientSettings {
        self.applied().settings
    }

    fn supports_streaming(&self) -> bool {
        false
    }
}
