//! Catalog Commands
//!
//! Usage:
//!   modelbridge models [--type text-generation] [-f json]
//!   modelbridge rules <model> [-f json]
//!   modelbridge normalize <model> [-p name=value]... [-f json]
//!
//! These read the static catalog only and need no credentials.

use serde::Serialize;

use crate::ai::provider::{gemini_rules, list_models};
use crate::ai::rules::{ParamKind, ParameterRule, RequestedParams};
use crate::cli::ui::Output;
use crate::types::{ModelType, Result};

/// List models for a model type
pub fn list(model_type: ModelType, format: &str) -> Result<()> {
    let out = Output::new();
    let models = list_models(model_type);

    if format == "json" {
        return out.json(&models);
    }

    out.header(&format!("Models ({})", model_type));
    if models.is_empty() {
        out.warning(&format!("No models for type {}", model_type));
        return Ok(());
    }

    for model in &models {
        let features: Vec<String> = model
            .features
            .iter()
            .map(|f| format!("{:?}", f))
            .collect();
        out.field(&model.id, format!("{} [{}]", model.mode, features.join(", ")));
    }
    Ok(())
}

#[derive(Serialize)]
struct RuleRow {
    name: ParamKind,
    #[serde(flatten)]
    rule: ParameterRule,
}

/// Show parameter rules for a model
pub fn rules(model: &str, format: &str) -> Result<()> {
    let out = Output::new();
    let rules = gemini_rules(model);

    if format == "json" {
        let rows: Vec<RuleRow> = rules
            .iter()
            .map(|(name, rule)| RuleRow { name, rule: *rule })
            .collect();
        return out.json(&rows);
    }

    out.section(&format!("Parameter rules: {}", model));
    for (kind, rule) in rules.iter() {
        out.field(
            kind.as_str(),
            format!(
                "[{}, {}] default {} precision {}",
                rule.min, rule.max, rule.default, rule.precision
            ),
        );
    }
    Ok(())
}

/// Validate requested parameters and print the normalized result
pub fn normalize(model: &str, requested: &RequestedParams, format: &str) -> Result<()> {
    let out = Output::new();
    let params = gemini_rules(model).validate(requested);

    if format == "json" {
        return out.json(&params);
    }

    out.section(&format!("Normalized parameters: {}", model));
    for (kind, value) in params.iter() {
        let marker = if requested.contains_key(kind.as_str()) {
            ""
        } else {
            " (default)"
        };
        out.field(kind.as_str(), format!("{}{}", value, marker));
    }

    for name in requested.keys() {
        if name.parse::<ParamKind>().is_err() {
            out.warning(&format!("Ignored unknown parameter: {}", name));
        }
    }
    Ok(())
}
