//! Configuration Types
//!
//! All configuration structures with sensible defaults.
//! Secrets are read from files or the environment but never serialized back.

use secrecy::SecretString;
use serde::{Deserialize, Serialize};

use crate::ai::vault::HostedCredentials;
use crate::constants::gemini;
use crate::types::{ModelError, Result};

/// Root configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Configuration version
    pub version: String,

    /// Deployment edition
    pub edition: Edition,

    /// Gemini transport settings
    pub gemini: GeminiSettings,

    /// Credential encryption settings
    pub vault: VaultSettings,

    /// Shared credentials for system-tier provider records
    pub hosted: HostedSettings,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            version: "1.0".to_string(),
            edition: Edition::default(),
            gemini: GeminiSettings::default(),
            vault: VaultSettings::default(),
            hosted: HostedSettings::default(),
        }
    }
}

impl Config {
    /// Validate configuration values are within acceptable ranges.
    /// Returns `ModelError::Config` on validation failure.
    pub fn validate(&self) -> Result<()> {
        if self.gemini.timeout_secs == 0 {
            return Err(ModelError::Config(
                "gemini.timeout_secs must be greater than 0".to_string(),
            ));
        }

        if self.gemini.connect_timeout_secs == 0 {
            return Err(ModelError::Config(
                "gemini.connect_timeout_secs must be greater than 0".to_string(),
            ));
        }

        if url::Url::parse(&self.gemini.default_api_base).is_err() {
            return Err(ModelError::Config(format!(
                "gemini.default_api_base is not a valid URL: {}",
                self.gemini.default_api_base
            )));
        }

        if self
            .vault
            .secret_key
            .as_deref()
            .is_some_and(|k| k.trim().is_empty())
        {
            return Err(ModelError::Config(
                "vault.secret_key must not be empty".to_string(),
            ));
        }

        if self.hosted.api_base.is_some() && self.hosted.api_key.is_none() {
            return Err(ModelError::Config(
                "hosted.api_base is set but hosted.api_key is missing".to_string(),
            ));
        }

        Ok(())
    }

    /// Hosted credentials, when a hosted key is configured
    pub fn hosted_credentials(&self) -> Option<HostedCredentials> {
        let api_key = self.hosted.api_key.as_deref().filter(|k| !k.is_empty())?;
        Some(HostedCredentials {
            api_base: self.hosted.api_base.clone(),
            api_key: SecretString::from(api_key.to_string()),
        })
    }
}

// =============================================================================
// Edition
// =============================================================================

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "kebab-case")]
pub enum Edition {
    #[default]
    SelfHosted,
    Cloud,
}

impl std::fmt::Display for Edition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::SelfHosted => write!(f, "self-hosted"),
            Self::Cloud => write!(f, "cloud"),
        }
    }
}

// =============================================================================
// Gemini Transport
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct GeminiSettings {
    /// Request timeout in seconds
    pub timeout_secs: u64,

    /// Connection timeout in seconds
    pub connect_timeout_secs: u64,

    /// API root used when credentials carry no base URL
    pub default_api_base: String,
}

impl Default for GeminiSettings {
    fn default() -> Self {
        Self {
            timeout_secs: gemini::DEFAULT_TIMEOUT_SECS,
            connect_timeout_secs: gemini::DEFAULT_CONNECT_TIMEOUT_SECS,
            default_api_base: gemini::DEFAULT_API_BASE.to_string(),
        }
    }
}

// =============================================================================
// Vault & Hosted Credentials
// =============================================================================

#[derive(Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct VaultSettings {
    /// Master key for credential encryption
    #[serde(skip_serializing)]
    pub secret_key: Option<String>,
}

impl std::fmt::Debug for VaultSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VaultSettings")
            .field("secret_key", &self.secret_key.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

#[derive(Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct HostedSettings {
    pub api_base: Option<String>,

    #[serde(skip_serializing)]
    pub api_key: Option<String>,
}

impl std::fmt::Debug for HostedSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HostedSettings")
            .field("api_base", &self.api_base)
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}
