//! Client Settings
//!
//! How validated parameters land on a backend client. Chat clients take
//! temperature and max_tokens as primary fields and the remaining sampling
//! controls as a nested bag; completion clients take every parameter they
//! expose directly. The variant is chosen once per adapter.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::ai::rules::{ModelParams, ParamKind};
use crate::types::ModelMode;

/// Parameter state carried by a backend request
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ClientSettings {
    pub temperature: Option<f64>,
    pub max_tokens: Option<u32>,
    pub top_p: Option<f64>,
    pub top_k: Option<u32>,
    pub presence_penalty: Option<f64>,
    pub frequency_penalty: Option<f64>,
    /// Secondary sampling controls (chat clients)
    pub model_kwargs: BTreeMap<ParamKind, f64>,
}

impl ClientSettings {
    /// Set a first-class field by parameter
    pub fn set(&mut self, kind: ParamKind, value: f64) {
        match kind {
            ParamKind::Temperature => self.temperature = Some(value),
            ParamKind::TopP => self.top_p = Some(value),
            ParamKind::PresencePenalty => self.presence_penalty = Some(value),
            ParamKind::FrequencyPenalty => self.frequency_penalty = Some(value),
            ParamKind::MaxTokens => self.max_tokens = Some(value.max(0.0) as u32),
        }
    }

    /// Effective value of a parameter, whether first-class or nested
    pub fn effective(&self, kind: ParamKind) -> Option<f64> {
        let direct = match kind {
            ParamKind::Temperature => self.temperature,
            ParamKind::TopP => self.top_p,
            ParamKind::PresencePenalty => self.presence_penalty,
            ParamKind::FrequencyPenalty => self.frequency_penalty,
            ParamKind::MaxTokens => self.max_tokens.map(f64::from),
        };
        direct.or_else(|| self.model_kwargs.get(&kind).copied())
    }
}

/// Mode-dependent strategy for applying parameters to a client
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamApplier {
    /// temperature/max_tokens direct, the rest nested
    Chat,
    /// every exposed parameter direct
    Completion,
}

const NESTED_CHAT_PARAMS: [ParamKind; 3] = [
    ParamKind::TopP,
    ParamKind::FrequencyPenalty,
    ParamKind::PresencePenalty,
];

impl ParamApplier {
    pub fn for_mode(mode: ModelMode) -> Self {
        match mode {
            ModelMode::Chat => Self::Chat,
            ModelMode::Completion => Self::Completion,
        }
    }

    /// Apply validated parameters. `exposed` lists the client's settable
    /// parameters; completion clients skip anything not in it.
    pub fn apply(&self, params: &ModelParams, exposed: &[ParamKind], settings: &mut ClientSettings) {
        match self {
            Self::Chat => {
                settings.temperature = params.temperature();
                settings.max_tokens = params.max_tokens();
                settings.model_kwargs = NESTED_CHAT_PARAMS
                    .iter()
                    .filter_map(|kind| params.get(*kind).map(|v| (*kind, v)))
                    .collect();
            }
            Self::Completion => {
                for (kind, value) in params.iter() {
                    if exposed.contains(&kind) {
                        settings.set(kind, value);
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::rules::{ParameterRule, ParameterRuleSet, RequestedParams};

    fn params() -> ModelParams {
        ParameterRuleSet::new()
            .with_rule(ParamKind::Temperature, ParameterRule::new(0.0, 2.0, 0.7, 2))
            .with_rule(ParamKind::TopP, ParameterRule::new(0.0, 1.0, 0.9, 2))
            .with_rule(ParamKind::PresencePenalty, ParameterRule::new(-2.0, 2.0, 0.1, 2))
            .with_rule(ParamKind::FrequencyPenalty, ParameterRule::new(-2.0, 2.0, 0.2, 2))
            .with_rule(ParamKind::MaxTokens, ParameterRule::new(10.0, 4096.0, 256.0, 0))
            .validate(&RequestedParams::new())
    }

    #[test]
    fn test_chat_split() {
        let mut settings = ClientSettings::default();
        ParamApplier::Chat.apply(&params(), &ParamKind::ALL, &mut settings);

        assert_eq!(settings.temperature, Some(0.7));
        assert_eq!(settings.max_tokens, Some(256));
        assert_eq!(settings.top_p, None);
        assert_eq!(settings.presence_penalty, None);
        assert_eq!(settings.model_kwargs.len(), 3);
        assert_eq!(settings.model_kwargs[&ParamKind::TopP], 0.9);
        assert_eq!(settings.effective(ParamKind::FrequencyPenalty), Some(0.2));
    }

    #[test]
    fn test_completion_sets_only_exposed() {
        let mut settings = ClientSettings::default();
        ParamApplier::Completion.apply(
            &params(),
            &[ParamKind::Temperature, ParamKind::TopP],
            &mut settings,
        );

        assert_eq!(settings.temperature, Some(0.7));
        assert_eq!(settings.top_p, Some(0.9));
        assert_eq!(settings.max_tokens, None);
        assert_eq!(settings.presence_penalty, None);
        assert!(settings.model_kwargs.is_empty());
    }

    #[test]
    fn test_applier_for_mode() {
        assert_eq!(ParamApplier::for_mode(ModelMode::Chat), ParamApplier::Chat);
        assert_eq!(
            ParamApplier::for_mode(ModelMode::Completion),
            ParamApplier::Completion
        );
    }
}
