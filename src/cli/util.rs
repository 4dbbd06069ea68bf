//! CLI Common Utilities
//!
//! Argument parsers and context shared by the command handlers.

use clap::Args;
use std::path::PathBuf;

use crate::ai::provider::{SharedProvider, create_provider};
use crate::ai::rules::RequestedParams;
use crate::ai::vault::ProviderRecord;
use crate::config::{Config, ConfigLoader};
use crate::constants::gemini::PROVIDER_NAME;
use crate::types::{MessageRole, ModelError, PromptMessage, Result};

/// Command execution context
///
/// Loaded configuration plus the provider built from it.
#[derive(Clone)]
pub struct CommandContext {
    pub config: Config,
    pub provider: SharedProvider,
}

impl CommandContext {
    /// Load config and build the named provider
    pub fn load(provider: &str) -> Result<Self> {
        let config = ConfigLoader::load()?;
        let provider = create_provider(provider, &config)?;
        Ok(Self { config, provider })
    }

    /// Load with the default provider
    pub fn load_default() -> Result<Self> {
        Self::load(PROVIDER_NAME)
    }
}

/// Arguments identifying a persisted provider record
#[derive(Debug, Clone, Args)]
pub struct RecordArgs {
    /// Tenant that owns the record
    #[arg(long, short = 't')]
    pub tenant: String,

    /// Stored credential config (JSON or legacy ciphertext)
    #[arg(long, conflicts_with_all = ["stored_file", "system_tier"])]
    pub stored: Option<String>,

    /// Read stored credential config from a file
    #[arg(long, conflicts_with = "system_tier")]
    pub stored_file: Option<PathBuf>,

    /// Use the shared system-tier credentials
    #[arg(long)]
    pub system_tier: bool,
}

impl RecordArgs {
    pub fn record(&self) -> Result<ProviderRecord> {
        if self.system_tier {
            return Ok(ProviderRecord::system(self.tenant.as_str()));
        }

        let stored = match (&self.stored, &self.stored_file) {
            (Some(stored), _) => stored.clone(),
            (None, Some(path)) => std::fs::read_to_string(path)?.trim().to_string(),
            (None, None) => {
                return Err(ModelError::Config(
                    "Provide --stored, --stored-file or --system-tier".to_string(),
                ));
            }
        };

        Ok(ProviderRecord::custom(self.tenant.as_str(), stored))
    }
}

/// Parse `name=value` into a requested parameter
pub fn parse_param(s: &str) -> std::result::Result<(String, f64), String> {
    let (name, value) = s
        .split_once('=')
        .ok_or_else(|| format!("Invalid parameter '{}'. Expected name=value", s))?;
    let value = value
        .trim()
        .parse::<f64>()
        .map_err(|e| format!("Invalid value for '{}': {}", name, e))?;
    Ok((name.trim().to_string(), value))
}

/// Parse `role:content` into a prompt message
pub fn parse_message(s: &str) -> std::result::Result<PromptMessage, String> {
    let (role, content) = s
        .split_once(':')
        .ok_or_else(|| format!("Invalid message '{}'. Expected role:content", s))?;
    let role = match role.trim().to_lowercase().as_str() {
        "system" => MessageRole::System,
        "user" => MessageRole::User,
        "assistant" | "model" => MessageRole::Assistant,
        other => {
            return Err(format!(
                "Invalid role '{}'. Valid values: system, user, assistant",
                other
            ));
        }
    };
    Ok(PromptMessage::new(role, content))
}

/// Later duplicates win
pub fn requested_params(pairs: Vec<(String, f64)>) -> RequestedParams {
    pairs.into_iter().collect()
}
