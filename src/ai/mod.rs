//! AI Integration Layer
//!
//! Provider abstraction for LLM backends: parameter rules, the credential
//! vault and the Gemini provider.

pub mod cipher;
pub mod provider;
pub mod rules;
pub mod vault;

pub use cipher::{AesGcmCipher, TokenCipher};
pub use provider::{
    AdapterState, ClientFactory, ClientSettings, GeminiClient, GeminiClientFactory, GeminiModel,
    GeminiProvider, GenerateRequest, LlmClient, LlmResult, ModelAdapter, ModelProvider,
    ParamApplier, Prompt, ResponseMetadata, ResponseTiming, SharedAdapter, SharedClientFactory,
    SharedProvider, TokenUsage, create_provider,
};
pub use rules::{ModelParams, ParamKind, ParameterRule, ParameterRuleSet, RequestedParams};
pub use vault::{
    CredentialVault, DisplayCredentials, HostedCredentials, ProviderCredentials, ProviderRecord,
    ProviderType, ResolvedCredentials, StoredCredentials, StructuredCredentials,
};
