//! Provider and Model Catalog
//!
//! Immutable tables built at compile time: the provider table and the
//! Gemini model catalog with per-model token ceilings.

use std::sync::Arc;

use crate::ai::rules::{ParamKind, ParameterRule, ParameterRuleSet};
use crate::config::Config;
use crate::constants::gemini::{DEFAULT_MAX_TOKENS_CEILING, PROVIDER_NAME};
use crate::types::{ModelDescriptor, ModelError, ModelFeature, ModelMode, ModelType, Result};

use super::{GeminiProvider, SharedProvider};

/// Static catalog entry
#[derive(Debug, Clone, Copy)]
pub struct ModelSpec {
    pub id: &'static str,
    pub display_name: &'static str,
    pub features: &'static [ModelFeature],
    /// Upper bound for max_tokens, reflecting the model's context window
    pub max_tokens: u32,
}

impl ModelSpec {
    pub fn descriptor(&self) -> ModelDescriptor {
        ModelDescriptor {
            id: self.id.to_string(),
            display_name: self.display_name.to_string(),
            mode: model_mode(self.id),
            features: self.features.to_vec(),
        }
    }
}

pub static GEMINI_MODELS: &[ModelSpec] = &[
    ModelSpec {
        id: "gemini-pro",
        display_name: "gemini-pro",
        features: &[ModelFeature::AgentThought],
        max_tokens: 4096,
    },
    ModelSpec {
        id: "gemini-pro-vision",
        display_name: "gemini-pro-vision",
        features: &[ModelFeature::AgentThought],
        max_tokens: 2048,
    },
];

/// Catalog for a model type; empty for anything but text generation
pub fn list_models(model_type: ModelType) -> Vec<ModelDescriptor> {
    match model_type {
        ModelType::TextGeneration => GEMINI_MODELS.iter().map(ModelSpec::descriptor).collect(),
        _ => Vec::new(),
    }
}

/// Models served in completion mode; everything else is chat
pub static COMPLETION_MODELS: &[&str] = &[];

/// Mode is decided by static membership in [`COMPLETION_MODELS`]
pub fn model_mode(model: &str) -> ModelMode {
    if COMPLETION_MODELS.contains(&model) {
        ModelMode::Completion
    } else {
        ModelMode::Chat
    }
}

pub fn max_tokens_ceiling(model: &str) -> u32 {
    GEMINI_MODELS
        .iter()
        .find(|spec| spec.id == model)
        .map(|spec| spec.max_tokens)
        .unwrap_or(DEFAULT_MAX_TOKENS_CEILING)
}

/// Parameter rules for a Gemini model
pub fn gemini_rules(model: &str) -> ParameterRuleSet {
    ParameterRuleSet::new()
        .with_rule(ParamKind::Temperature, ParameterRule::new(0.0, 2.0, 1.0, 2))
        .with_rule(ParamKind::TopP, ParameterRule::new(0.0, 1.0, 1.0, 2))
        .with_rule(ParamKind::PresencePenalty, ParameterRule::new(-2.0, 2.0, 0.0, 2))
        .with_rule(ParamKind::FrequencyPenalty, ParameterRule::new(-2.0, 2.0, 0.0, 2))
        .with_rule(
            ParamKind::MaxTokens,
            ParameterRule::new(10.0, f64::from(max_tokens_ceiling(model)), 16.0, 0),
        )
}

/// Provider table entry
#[derive(Debug, Clone, Copy)]
pub struct ProviderEntry {
    pub name: &'static str,
    pub display_name: &'static str,
    pub build: fn(&Config) -> Result<SharedProvider>,
}

fn build_gemini(config: &Config) -> Result<SharedProvider> {
    Ok(Arc::new(GeminiProvider::from_config(config)?))
}

pub static PROVIDERS: &[ProviderEntry] = &[ProviderEntry {
    name: PROVIDER_NAME,
    display_name: "Gemini",
    build: build_gemini,
}];

/// Create a shared provider by name
pub fn create_provider(name: &str, config: &Config) -> Result<SharedProvider> {
    let entry = PROVIDERS.iter().find(|p| p.name == name).ok_or_else(|| {
        let supported: Vec<_> = PROVIDERS.iter().map(|p| p.name).collect();
        ModelError::UnknownProvider(format!(
            "{}. Supported: {}",
            name,
            supported.join(", ")
        ))
    })?;
    (entry.build)(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::rules::RequestedParams;

    #[test]
    fn test_all_models_are_chat() {
        for spec in GEMINI_MODELS {
            assert_eq!(model_mode(spec.id), ModelMode::Chat);
            assert_eq!(spec.descriptor().features, vec![ModelFeature::AgentThought]);
        }
    }

    #[test]
    fn test_list_models_by_type() {
        assert_eq!(list_models(ModelType::TextGeneration).len(), 2);
        assert!(list_models(ModelType::Embeddings).is_empty());
    }

    #[test]
    fn test_max_tokens_ceiling() {
        assert_eq!(max_tokens_ceiling("gemini-pro"), 4096);
        assert_eq!(max_tokens_ceiling("gemini-pro-vision"), 2048);
        assert_eq!(max_tokens_ceiling("gemini-ultra"), 4097);
    }

    #[test]
    fn test_rules_are_consistent() {
        for model in ["gemini-pro", "gemini-pro-vision", "unknown"] {
            let rules = gemini_rules(model);
            assert_eq!(rules.len(), 5);
            for (kind, rule) in rules.iter() {
                assert!(rule.is_consistent(), "{model}/{kind} inconsistent");
            }
        }
    }

    #[test]
    fn test_defaults_for_every_model() {
        for spec in GEMINI_MODELS {
            let rules = gemini_rules(spec.id);
            let params = rules.validate(&RequestedParams::new());
            for (kind, rule) in rules.iter() {
                assert_eq!(params.get(kind), Some(rule.default));
            }
        }
    }

    #[test]
    fn test_gemini_pro_max_tokens_clamped() {
        let requested: RequestedParams = [("max_tokens".to_string(), 999_999.0)].into();
        let params = gemini_rules("gemini-pro").validate(&requested);
        assert_eq!(params.max_tokens(), Some(4096));
        assert_eq!(gemini_rules("gemini-pro").get(ParamKind::MaxTokens).unwrap().precision, 0);
    }

    #[test]
    fn test_unknown_provider() {
        let err = create_provider("openai", &Config::default()).err().unwrap();
        assert!(matches!(err, ModelError::UnknownProvider(_)));
        assert!(err.to_string().contains("gemini"));
    }
}
