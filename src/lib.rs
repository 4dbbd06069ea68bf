//! modelbridge - Provider Abstraction for LLM Backends
//!
//! Lets an application talk to a Gemini-compatible generation service
//! through a uniform provider interface.
//!
//! ## Core Features
//!
//! - **Parameter Rules**: per-model bounds, defaults and precision
//! - **Credential Vault**: encrypt-at-rest, decrypt-for-use, mask-for-display
//! - **Portable Errors**: backend failures classified into five kinds
//! - **Model Adapters**: one logical model bound to credentials and a client
//!
//! ## Quick Start
//!
//! ```ignore
//! use modelbridge::{ConfigLoader, ModelType, PromptMessage, create_provider};
//! use modelbridge::ai::{ProviderRecord, RequestedParams};
//! use tokio_util::sync::CancellationToken;
//!
//! let config = ConfigLoader::load()?;
//! let provider = create_provider("gemini", &config)?;
//! let record = ProviderRecord::custom("tenant-1", stored_config);
//! let model = provider.create_model(
//!     &record,
//!     "gemini-pro",
//!     ModelType::TextGeneration,
//!     &RequestedParams::new(),
//! )?;
//! let result = model
//!     .generate(&[PromptMessage::user("hello")], &[], &CancellationToken::new())
//!     .await?;
//! ```
//!
//! ## Modules
//!
//! - [`ai`]: parameter rules, credential vault, providers and adapters
//! - [`types`]: error taxonomy and shared model types
//! - [`config`]: layered configuration

pub mod ai;
pub mod cli;
pub mod config;
pub mod constants;
pub mod types;

// =============================================================================
// Core Re-exports
// =============================================================================

// Configuration
pub use config::{Config, ConfigLoader, Edition, GeminiSettings};

// Error Types
pub use types::error::{BackendError, ErrorClassifier, ErrorKind, LlmError, ModelError, Result};

// Shared Types
pub use types::{
    MessageRole, ModelDescriptor, ModelFeature, ModelMode, ModelType, PromptMessage, TenantId,
};

// =============================================================================
// AI Re-exports
// =============================================================================

pub use ai::{
    // Vault
    CredentialVault,
    // Providers
    GeminiProvider,
    LlmResult,
    ModelAdapter,
    ModelProvider,
    // Rules
    ParameterRuleSet,
    SharedAdapter,
    SharedProvider,
    create_provider,
};
